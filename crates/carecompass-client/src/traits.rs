use async_trait::async_trait;
use carecompass_types::Message;
use serde::{Deserialize, Serialize};

use crate::abort::AbortSignal;

/// Shown when the assistant could not be reached
pub const FALLBACK_REPLY: &str = "I'm having trouble connecting to the service.";

pub const DEFAULT_MIME_TYPE: &str = "image/jpeg";

/// Streams an assistant answer for one exchange
///
/// Implementations never fail. Transport problems collapse into
/// [`ChatReply::Fallback`] and cancellation into [`ChatReply::Aborted`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// `on_update` receives the cumulative answer text after every chunk
    async fn stream_chat(
        &self,
        request: ChatRequest,
        abort: AbortSignal,
        on_update: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> ChatReply;
}

/// Body of `POST /chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: String,
    /// Base64 payload without the data-URL prefix
    pub image: Option<String>,
    pub mime_type: String,
    pub context: String,
    pub history: Vec<Message>,
    pub file_id: Option<String>,
    pub patient_id: Option<String>,
}

impl ChatRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            context: String::new(),
            history: Vec::new(),
            file_id: None,
            patient_id: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    pub fn with_image(mut self, base64: impl Into<String>, mime_type: impl Into<String>) -> Self {
        self.image = Some(base64.into());
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_file_id(mut self, file_id: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    pub fn with_patient_id(mut self, patient_id: impl Into<String>) -> Self {
        self.patient_id = Some(patient_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Completed(String),
    Fallback,
    Aborted,
}

impl ChatReply {
    /// Text to store as the assistant message. Aborted replies have none.
    pub fn text(&self) -> Option<&str> {
        match self {
            ChatReply::Completed(text) => Some(text),
            ChatReply::Fallback => Some(FALLBACK_REPLY),
            ChatReply::Aborted => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_wire_shape() {
        let request = ChatRequest::new("what is metformin")
            .with_context("Patient Name: Sarah. ")
            .with_patient_id("1");

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "prompt": "what is metformin",
                "image": null,
                "mimeType": "image/jpeg",
                "context": "Patient Name: Sarah. ",
                "history": [],
                "fileId": null,
                "patientId": "1"
            })
        );
    }

    #[test]
    fn test_image_sets_mime_type() {
        let request = ChatRequest::new("look").with_image("aGVsbG8=", "image/png");
        assert_eq!(request.image.as_deref(), Some("aGVsbG8="));
        assert_eq!(request.mime_type, "image/png");
    }

    #[test]
    fn test_reply_text() {
        assert_eq!(ChatReply::Completed("hi".into()).text(), Some("hi"));
        assert_eq!(ChatReply::Fallback.text(), Some(FALLBACK_REPLY));
        assert_eq!(ChatReply::Aborted.text(), None);
    }

    #[test]
    fn test_stored_file_reference() {
        let request = ChatRequest::new("summarise")
            .with_mime_type("application/pdf")
            .with_file_id("file-9");

        assert!(request.image.is_none());
        assert_eq!(request.mime_type, "application/pdf");
        assert_eq!(request.file_id.as_deref(), Some("file-9"));
    }
}
