use serde::{Deserialize, Serialize};

/// User profile as returned by the remote API. Its shape belongs to the server,
/// so it is carried as an untyped JSON document.
pub type UserProfile = serde_json::Value;

/// Login input, forwarded to the remote API unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Successful authentication payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    pub user: UserProfile,
}

impl LoginResponse {
    pub fn new(access_token: impl Into<String>, user: UserProfile) -> Self {
        Self { access_token: access_token.into(), refresh_token: None, expires_in: None, token_type: None, user }
    }
}

/// Optional body for the refresh endpoint; the server also reads the refresh cookie.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshInput {
    pub refresh_token: String,
}
