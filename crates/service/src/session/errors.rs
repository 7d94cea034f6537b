use thiserror::Error;

use crate::auth::errors::AuthError;
use crate::errors::ServiceError;

/// Failures of a session operation.
///
/// `Auth` carries the remote API's error untouched. `Storage` means the final
/// snapshot of the operation never reached durable storage: memory holds the
/// new state, storage still holds the previous one.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("session snapshot not persisted: {0}")]
    Storage(#[from] ServiceError),
}

impl SessionError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            SessionError::Auth(e) => e.code(),
            SessionError::Storage(_) => 1400,
        }
    }
}
