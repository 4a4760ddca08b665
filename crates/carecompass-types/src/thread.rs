use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::files::StoredFile;
use crate::ids::{next_id, next_string_id};

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    /// Older clients tag assistant messages as `"ai"`
    #[serde(alias = "ai")]
    Assistant,
}

/// Reference to a stored attachment sent along with a user message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl AttachmentRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: mime_type.into(),
        }
    }
}

impl From<&StoredFile> for AttachmentRef {
    fn from(file: &StoredFile) -> Self {
        Self::new(file.id.clone(), file.name.clone(), file.mime_type.clone())
    }
}

/// What was sent to the model, kept on the user message for transparency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugInfo {
    pub prompt: String,
    pub context: String,
    pub system_instruction: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: i64,
    pub sender: Sender,
    #[serde(default)]
    pub text: String,
    /// Inline image preview (data URL or remote URL)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<DebugInfo>,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::with_id(next_id(), Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_id(next_id(), Sender::Assistant, text)
    }

    /// Empty assistant message shown while the answer streams in
    pub fn placeholder() -> Self {
        Self::assistant(String::new())
    }

    pub fn with_id(id: i64, sender: Sender, text: impl Into<String>) -> Self {
        Self {
            id,
            sender,
            text: text.into(),
            image: None,
            attachment: None,
            debug_info: None,
        }
    }

    pub fn image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn debug_info(mut self, info: DebugInfo) -> Self {
        self.debug_info = Some(info);
        self
    }

    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// One conversation session of a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Thread {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Thread {
    /// Fresh empty thread with a time-derived id
    pub fn start() -> Self {
        Self {
            id: next_string_id(),
            created_at: Utc::now(),
            messages: Vec::new(),
        }
    }

    /// First user message text, used as a title in thread listings
    pub fn title(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.is_user() && !m.text.trim().is_empty())
            .map(|m| m.text.as_str())
    }
}
