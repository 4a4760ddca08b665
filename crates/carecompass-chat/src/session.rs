use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use carecompass_client::{AbortHandle, AbortSignal, ChatReply, ChatRequest, ChatTransport};
use carecompass_persist::PersistenceClient;
use carecompass_types::{
    is_image_mime, AttachmentRef, DebugInfo, Message, Profile, Sender, Thread,
};

use crate::context::patient_context;
use crate::error::{ChatError, Result};
use crate::prompts::{
    render_system_prompt, DOCUMENT_ANALYSIS_PROMPT, DOCUMENT_ANALYSIS_REQUEST,
    IMAGE_ANALYSIS_PROMPT, IMAGE_ANALYSIS_REQUEST,
};
use crate::store::{apply_patch, ConversationStore, MessagePatch};

/// What the user typed, plus an optional already-uploaded file
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub prompt: String,
    pub attachment: Option<AttachmentRef>,
}

impl OutgoingMessage {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

/// A file to be summarised by the assistant in a fresh thread
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    /// Base64 payload sent inline to the assistant
    pub inline_base64: Option<String>,
    /// Displayable preview, stored on the user message for images only
    pub preview: Option<String>,
    pub mime_type: String,
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeOutcome {
    /// Nothing to send
    Skipped,
    Answered { thread_id: String, text: String },
    /// The assistant was unreachable. The stored answer is the fallback text.
    Fallback { thread_id: String },
    /// Stopped by the user. The partial answer was not persisted.
    Aborted { thread_id: String, partial: String },
}

impl ExchangeOutcome {
    pub fn thread_id(&self) -> Option<&str> {
        match self {
            ExchangeOutcome::Skipped => None,
            ExchangeOutcome::Answered { thread_id, .. }
            | ExchangeOutcome::Fallback { thread_id }
            | ExchangeOutcome::Aborted { thread_id, .. } => Some(thread_id),
        }
    }
}

#[derive(Debug, Default)]
struct SessionState {
    store: ConversationStore,
    active_thread: Option<String>,
}

/// Drives question/answer exchanges for one patient
///
/// At most one exchange runs at a time. The busy flag is taken before any
/// local change and released on every exit path.
pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    persistence: Arc<dyn PersistenceClient>,
    patient_id: String,
    state: Mutex<SessionState>,
    busy: AtomicBool,
    in_flight: Mutex<Option<AbortHandle>>,
}

/// Releases the busy flag and forgets the abort handle on drop
struct BusyGuard<'a> {
    session: &'a ChatSession,
    signal: AbortSignal,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.session.in_flight) = None;
        self.session.busy.store(false, Ordering::Release);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ChatSession {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        persistence: Arc<dyn PersistenceClient>,
        patient_id: impl Into<String>,
        threads: Vec<Thread>,
    ) -> Self {
        Self {
            transport,
            persistence,
            patient_id: patient_id.into(),
            state: Mutex::new(SessionState {
                store: ConversationStore::new(threads),
                active_thread: None,
            }),
            busy: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        }
    }

    /// Session seeded with the patient's stored threads
    pub async fn load(
        transport: Arc<dyn ChatTransport>,
        persistence: Arc<dyn PersistenceClient>,
        patient_id: impl Into<String>,
    ) -> Result<Self> {
        let patient_id = patient_id.into();
        let threads = persistence.list_threads(&patient_id).await?;
        tracing::debug!(patient_id = %patient_id, threads = threads.len(), "loaded threads");
        Ok(Self::new(transport, persistence, patient_id, threads))
    }

    pub fn patient_id(&self) -> &str {
        &self.patient_id
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Current snapshot of all threads
    pub fn store(&self) -> ConversationStore {
        lock(&self.state).store.clone()
    }

    pub fn active_thread(&self) -> Option<String> {
        lock(&self.state).active_thread.clone()
    }

    /// Make an existing thread the target of the next `send`
    pub fn select_thread(&self, thread_id: &str) -> bool {
        let mut state = lock(&self.state);
        if state.store.get(thread_id).is_none() {
            return false;
        }
        state.active_thread = Some(thread_id.to_string());
        true
    }

    /// The next `send` starts a fresh thread
    pub fn start_new_thread(&self) {
        lock(&self.state).active_thread = None;
    }

    /// Abort the in-flight exchange. Returns false when nothing is running.
    pub fn stop(&self) -> bool {
        match lock(&self.in_flight).as_ref() {
            Some(handle) => {
                handle.abort();
                tracing::info!(patient_id = %self.patient_id, "stop requested");
                true
            }
            None => false,
        }
    }

    /// Send one message and stream the answer
    ///
    /// The user message is persisted before the assistant is called, and the
    /// thread is persisted again once the answer is final. An aborted answer
    /// is left in the local store only.
    pub async fn send(
        &self,
        profile: &Profile,
        outgoing: OutgoingMessage,
        on_text: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ExchangeOutcome> {
        if outgoing.prompt.trim().is_empty() && outgoing.attachment.is_none() {
            tracing::debug!("empty message without attachment, nothing to send");
            return Ok(ExchangeOutcome::Skipped);
        }

        let busy = self.acquire()?;

        let context = patient_context(Some(profile));
        let debug_info = DebugInfo {
            prompt: outgoing.prompt.clone(),
            context: context.clone(),
            system_instruction: render_system_prompt(&context),
        };
        let mut user_message = Message::user(outgoing.prompt.clone()).debug_info(debug_info);
        if let Some(attachment) = &outgoing.attachment {
            user_message = user_message.attachment(attachment.clone());
        }

        let thread = apply_patch(&self.resolve_thread(), &MessagePatch::Append(user_message));
        self.commit(thread.clone());
        self.persistence.save_thread(&self.patient_id, &thread).await?;

        let mut request = ChatRequest::new(outgoing.prompt)
            .with_context(context)
            .with_history(thread.messages.clone())
            .with_patient_id(self.patient_id.clone());
        if let Some(attachment) = outgoing.attachment {
            request = request
                .with_mime_type(attachment.mime_type)
                .with_file_id(attachment.id);
        }

        self.exchange(thread, request, busy.signal.clone(), on_text).await
    }

    /// Ask the assistant to summarise a file, always in a new thread
    pub async fn analyze_file(
        &self,
        profile: &Profile,
        analysis: FileAnalysis,
        on_text: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ExchangeOutcome> {
        let busy = self.acquire()?;

        let is_image = is_image_mime(&analysis.mime_type);
        let (request_text, prompt) = if is_image {
            (IMAGE_ANALYSIS_REQUEST, IMAGE_ANALYSIS_PROMPT)
        } else {
            (DOCUMENT_ANALYSIS_REQUEST, DOCUMENT_ANALYSIS_PROMPT)
        };

        let mut user_message = Message::user(request_text);
        if let (true, Some(preview)) = (is_image, analysis.preview) {
            user_message = user_message.image(preview);
        }

        let thread = apply_patch(&Thread::start(), &MessagePatch::Append(user_message));
        lock(&self.state).active_thread = Some(thread.id.clone());
        self.commit(thread.clone());
        self.persistence.save_thread(&self.patient_id, &thread).await?;

        let mut request = ChatRequest::new(prompt)
            .with_context(patient_context(Some(profile)))
            .with_history(thread.messages.clone())
            .with_patient_id(self.patient_id.clone())
            .with_mime_type(analysis.mime_type);
        request.image = analysis.inline_base64;
        request.file_id = analysis.file_id;

        tracing::info!(
            patient_id = %self.patient_id,
            thread_id = %thread.id,
            is_image,
            "analyzing file"
        );
        self.exchange(thread, request, busy.signal.clone(), on_text).await
    }

    /// Placeholder, stream, then finalize and persist unless aborted
    async fn exchange(
        &self,
        thread: Thread,
        request: ChatRequest,
        abort: AbortSignal,
        on_text: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<ExchangeOutcome> {
        let placeholder = Message::placeholder();
        let placeholder_id = placeholder.id;
        let thread_id = thread.id.clone();
        self.patch(&thread_id, MessagePatch::Append(placeholder));

        let mut latest = String::new();
        let reply = {
            let mut on_update = |text: &str| {
                self.patch(
                    &thread_id,
                    MessagePatch::ReplaceText {
                        message_id: placeholder_id,
                        text: text.to_string(),
                    },
                );
                latest.clear();
                latest.push_str(text);
                on_text(text);
            };
            self.transport
                .stream_chat(request, abort, &mut on_update)
                .await
        };

        let text = match reply.text() {
            Some(text) => text.to_string(),
            None => {
                tracing::info!(
                    thread_id = %thread_id,
                    chars = latest.len(),
                    "exchange aborted, partial answer not persisted"
                );
                return Ok(ExchangeOutcome::Aborted {
                    thread_id,
                    partial: latest,
                });
            }
        };

        let answer = Message::with_id(placeholder_id, Sender::Assistant, text.clone());
        let finished = apply_patch(&thread, &MessagePatch::Append(answer));
        self.commit(finished.clone());
        self.persistence.save_thread(&self.patient_id, &finished).await?;

        match reply {
            ChatReply::Fallback => {
                tracing::warn!(thread_id = %thread_id, "assistant unreachable, stored fallback reply");
                Ok(ExchangeOutcome::Fallback { thread_id })
            }
            _ => Ok(ExchangeOutcome::Answered { thread_id, text }),
        }
    }

    fn acquire(&self) -> Result<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| ChatError::Busy)?;

        let handle = AbortHandle::new();
        let signal = handle.signal();
        *lock(&self.in_flight) = Some(handle);
        Ok(BusyGuard {
            session: self,
            signal,
        })
    }

    /// Active thread if it still exists, otherwise a new one that becomes active
    fn resolve_thread(&self) -> Thread {
        let mut state = lock(&self.state);
        if let Some(thread) = state
            .active_thread
            .as_deref()
            .and_then(|id| state.store.get(id))
        {
            return thread.clone();
        }

        let thread = Thread::start();
        tracing::debug!(thread_id = %thread.id, "starting new thread");
        state.active_thread = Some(thread.id.clone());
        thread
    }

    fn commit(&self, thread: Thread) {
        let mut state = lock(&self.state);
        state.store = state.store.upsert(thread);
    }

    fn patch(&self, thread_id: &str, patch: MessagePatch) {
        let mut state = lock(&self.state);
        state.store = state.store.apply(thread_id, &patch);
    }
}
