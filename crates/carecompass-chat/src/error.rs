use carecompass_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("An exchange is already in flight")]
    Busy,

    #[error("No active profile")]
    NoActiveProfile,

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

pub type Result<T> = std::result::Result<T, ChatError>;
