use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistError {
    #[error("Request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}

pub type Result<T> = std::result::Result<T, PersistError>;
