pub mod abort;
pub mod auth;
pub mod buffer_utils;
pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod patients;
pub mod streaming;
pub mod traits;

pub use abort::{AbortHandle, AbortSignal};
pub use auth::{Anonymous, StaticToken, TokenProvider};
pub use buffer_utils::Utf8StreamDecoder;
pub use client::ApiClient;
pub use config::{ClientConfig, DEFAULT_BASE_URL};
pub use error::{ClientError, Result};
pub use streaming::{decode_text_stream, read_text_stream, StreamRead};
pub use traits::{ChatReply, ChatRequest, ChatTransport, DEFAULT_MIME_TYPE, FALLBACK_REPLY};
