use carecompass_persist::PersistError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<ClientError> for PersistError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api { status, body } => PersistError::Rejected { status, body },
            other => PersistError::Transport(other.to_string()),
        }
    }
}
