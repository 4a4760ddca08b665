use std::sync::Arc;

use carecompass_types::{Message, Thread};

/// A single change to one thread's message list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessagePatch {
    /// Append, or replace in place when the id already exists
    Append(Message),
    ReplaceText { message_id: i64, text: String },
}

/// Returns a new thread with `patch` applied. `thread` is left untouched.
pub fn apply_patch(thread: &Thread, patch: &MessagePatch) -> Thread {
    let mut next = thread.clone();
    match patch {
        MessagePatch::Append(message) => {
            match next.messages.iter_mut().find(|m| m.id == message.id) {
                Some(existing) => *existing = message.clone(),
                None => next.messages.push(message.clone()),
            }
        }
        MessagePatch::ReplaceText { message_id, text } => {
            if let Some(existing) = next.messages.iter_mut().find(|m| m.id == *message_id) {
                existing.text = text.clone();
            }
        }
    }
    next
}

/// Immutable snapshot of a profile's threads, newest first
///
/// Every update returns a new store, so a snapshot handed to a reader
/// never changes underneath it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationStore {
    threads: Arc<Vec<Thread>>,
}

impl ConversationStore {
    pub fn new(threads: Vec<Thread>) -> Self {
        Self {
            threads: Arc::new(threads),
        }
    }

    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    pub fn get(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// Replace a thread by id in place, or insert it at the front
    pub fn upsert(&self, thread: Thread) -> Self {
        let mut threads: Vec<Thread> = self.threads.as_ref().clone();
        match threads.iter_mut().find(|t| t.id == thread.id) {
            Some(existing) => *existing = thread,
            None => threads.insert(0, thread),
        }
        Self::new(threads)
    }

    /// Patch one thread. An unknown thread id yields an identical store.
    pub fn apply(&self, thread_id: &str, patch: &MessagePatch) -> Self {
        match self.get(thread_id) {
            Some(thread) => self.upsert(apply_patch(thread, patch)),
            None => self.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carecompass_types::Sender;

    fn thread_with(messages: Vec<Message>) -> Thread {
        let mut thread = Thread::start();
        thread.messages = messages;
        thread
    }

    #[test]
    fn test_append_keeps_order() {
        let first = Message::user("hi");
        let second = Message::placeholder();
        let thread = thread_with(vec![first.clone()]);

        let next = apply_patch(&thread, &MessagePatch::Append(second.clone()));

        assert_eq!(next.messages, vec![first, second]);
        assert_eq!(thread.messages.len(), 1, "input thread untouched");
    }

    #[test]
    fn test_append_existing_id_replaces_instead_of_duplicating() {
        let placeholder = Message::placeholder();
        let thread = thread_with(vec![Message::user("hi"), placeholder.clone()]);

        let final_msg = Message::with_id(placeholder.id, Sender::Assistant, "done");
        let next = apply_patch(&thread, &MessagePatch::Append(final_msg));

        assert_eq!(next.messages.len(), 2);
        assert_eq!(next.messages[1].text, "done");
    }

    #[test]
    fn test_replace_text_only_touches_target() {
        let user = Message::user("hi");
        let placeholder = Message::placeholder();
        let thread = thread_with(vec![user.clone(), placeholder.clone()]);

        let next = apply_patch(
            &thread,
            &MessagePatch::ReplaceText {
                message_id: placeholder.id,
                text: "Hel".to_string(),
            },
        );

        assert_eq!(next.messages[0], user);
        assert_eq!(next.messages[1].text, "Hel");
        assert_eq!(next.messages[1].id, placeholder.id);
    }

    #[test]
    fn test_replace_unknown_id_is_noop() {
        let thread = thread_with(vec![Message::user("hi")]);
        let next = apply_patch(
            &thread,
            &MessagePatch::ReplaceText {
                message_id: -1,
                text: "x".to_string(),
            },
        );
        assert_eq!(next, thread);
    }

    #[test]
    fn test_upsert_inserts_new_threads_at_front() {
        let older = Thread::start();
        let newer = Thread::start();

        let store = ConversationStore::default()
            .upsert(older.clone())
            .upsert(newer.clone());

        let ids: Vec<&str> = store.threads().iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![newer.id.as_str(), older.id.as_str()]);
    }

    #[test]
    fn test_upsert_existing_keeps_position() {
        let a = Thread::start();
        let b = Thread::start();
        let store = ConversationStore::new(vec![a.clone(), b.clone()]);

        let mut changed = b.clone();
        changed.messages.push(Message::user("hello"));
        let store = store.upsert(changed);

        assert_eq!(store.threads()[1].id, b.id);
        assert_eq!(store.threads()[1].messages.len(), 1);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_snapshots_are_isolated() {
        let thread = Thread::start();
        let before = ConversationStore::new(vec![thread.clone()]);

        let after = before.apply(&thread.id, &MessagePatch::Append(Message::user("hi")));

        assert!(before.get(&thread.id).unwrap().messages.is_empty());
        assert_eq!(after.get(&thread.id).unwrap().messages.len(), 1);
    }

    #[test]
    fn test_apply_to_missing_thread_is_noop() {
        let store = ConversationStore::new(vec![Thread::start()]);
        let next = store.apply("missing", &MessagePatch::Append(Message::user("hi")));
        assert_eq!(next, store);
    }
}
