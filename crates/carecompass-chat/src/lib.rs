pub mod context;
pub mod error;
pub mod prompts;
pub mod session;
pub mod store;
pub mod workspace;

pub use context::patient_context;
pub use error::{ChatError, Result};
pub use prompts::render_system_prompt;
pub use session::{ChatSession, ExchangeOutcome, FileAnalysis, OutgoingMessage};
pub use store::{apply_patch, ConversationStore, MessagePatch};
pub use workspace::PatientWorkspace;

// Re-export the seams callers wire together
pub use carecompass_client::{AbortHandle, AbortSignal, ChatReply, ChatRequest, ChatTransport};
pub use carecompass_persist::{InMemoryPersistence, PersistError, PersistenceClient};
