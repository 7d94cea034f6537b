use thiserror::Error;

/// Errors raised by the local service layer (storage, serialization).
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("storage error: {0}")]
    Storage(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ServiceError {
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self { Self::Storage(format!("{context}: {err}")) }
}
