use thiserror::Error;

pub type InviteResult<T> = Result<T, InviteError>;

#[derive(Error, Debug)]
pub enum InviteError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Duplicate email: {0}")]
    DuplicateEmail(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No recipients selected")]
    NoRecipients,

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Webhook signature invalid")]
    SignatureInvalid,

    #[error("Message length {actual} exceeds the {limit}-character limit")]
    LengthExceeded { limit: usize, actual: usize },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
