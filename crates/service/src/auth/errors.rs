use thiserror::Error;

/// Failures reported by the remote authentication API
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid credentials: {0}")]
    Unauthorized(String),
    #[error("access denied: {0}")]
    Forbidden(String),
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

impl AuthError {
    /// Stable numeric code for external mapping/logging
    pub fn code(&self) -> u16 {
        match self {
            AuthError::Unauthorized(_) => 1004,
            AuthError::Forbidden(_) => 1005,
            AuthError::Server { .. } => 1200,
            AuthError::Network(_) => 1300,
            AuthError::Decode(_) => 1301,
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AuthError::Decode(e.to_string())
        } else {
            AuthError::Network(e.to_string())
        }
    }
}
