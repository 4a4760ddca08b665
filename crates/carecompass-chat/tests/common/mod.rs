#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use carecompass_chat::{
    AbortSignal, ChatReply, ChatRequest, ChatTransport, InMemoryPersistence, PersistError,
    PersistenceClient,
};
use carecompass_persist::Result as PersistResult;
use carecompass_types::{PatientExport, Profile, ProfileDraft, Thread};
use tokio::sync::Notify;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Complete,
    Fail,
    /// Emit the chunks, then wait until aborted
    HoldOpen,
}

/// Transport that replays fixed chunks as cumulative updates
pub struct ScriptedTransport {
    chunks: Vec<String>,
    ending: Ending,
    requests: Mutex<Vec<ChatRequest>>,
    pub emitted: Notify,
}

impl ScriptedTransport {
    pub fn new(chunks: &[&str], ending: Ending) -> Self {
        Self {
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
            ending,
            requests: Mutex::new(Vec::new()),
            emitted: Notify::new(),
        }
    }

    pub fn answering(chunks: &[&str]) -> Self {
        Self::new(chunks, Ending::Complete)
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn stream_chat(
        &self,
        request: ChatRequest,
        abort: AbortSignal,
        on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> ChatReply {
        self.requests.lock().unwrap().push(request);
        if self.ending == Ending::Fail {
            return ChatReply::Fallback;
        }

        let mut text = String::new();
        for chunk in &self.chunks {
            if abort.is_aborted() {
                return ChatReply::Aborted;
            }
            text.push_str(chunk);
            on_update(&text);
            tokio::task::yield_now().await;
        }

        if self.ending == Ending::HoldOpen {
            self.emitted.notify_one();
            abort.aborted().await;
            return ChatReply::Aborted;
        }
        ChatReply::Completed(text)
    }
}

/// In-memory persistence that records every thread save
#[derive(Default)]
pub struct RecordingPersistence {
    inner: InMemoryPersistence,
    thread_saves: Mutex<Vec<Thread>>,
    profile_saves: AtomicUsize,
    failing: AtomicBool,
}

impl RecordingPersistence {
    pub async fn with_profiles(profiles: Vec<Profile>) -> Self {
        Self {
            inner: InMemoryPersistence::with_profiles(profiles).await.unwrap(),
            ..Default::default()
        }
    }

    pub fn fail_saves(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn thread_saves(&self) -> Vec<Thread> {
        self.thread_saves.lock().unwrap().clone()
    }

    pub fn profile_saves(&self) -> usize {
        self.profile_saves.load(Ordering::SeqCst)
    }

    fn check(&self) -> PersistResult<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistError::Rejected {
                status: 500,
                body: "storage unavailable".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceClient for RecordingPersistence {
    async fn list_profiles(&self) -> PersistResult<Vec<Profile>> {
        self.inner.list_profiles().await
    }

    async fn save_profile(&self, profile: &Profile) -> PersistResult<()> {
        self.check()?;
        self.profile_saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_profile(profile).await
    }

    async fn list_threads(&self, patient_id: &str) -> PersistResult<Vec<Thread>> {
        self.inner.list_threads(patient_id).await
    }

    async fn save_thread(&self, patient_id: &str, thread: &Thread) -> PersistResult<()> {
        self.check()?;
        self.thread_saves.lock().unwrap().push(thread.clone());
        self.inner.save_thread(patient_id, thread).await
    }

    async fn export_patient(&self, patient_id: &str) -> PersistResult<PatientExport> {
        self.inner.export_patient(patient_id).await
    }

    async fn import_patient(&self, bundle: &PatientExport) -> PersistResult<()> {
        self.inner.import_patient(bundle).await
    }
}

pub fn sarah() -> Profile {
    let mut profile = Profile::from_draft(ProfileDraft::new("Sarah"));
    profile.id = "1".to_string();
    profile
}
