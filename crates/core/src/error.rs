#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown job kind: {0}")]
    UnknownKind(String),

    #[error("Envelope error: {0}")]
    Envelope(#[from] serde_json::Error),
}
