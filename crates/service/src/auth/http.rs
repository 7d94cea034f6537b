//! reqwest-backed client for the remote authentication API.
//!
//! Endpoints live under `{base_url}/api/v1/auth`. Login and refresh hand out a
//! refresh token; when a refresh store is attached the client keeps it there,
//! so a later process can still revoke it on logout (`X-Refresh-Token`) or
//! trade it for a new session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use configs::ApiConfig;

use super::client::AuthApi;
use super::domain::{LoginInput, LoginResponse, RefreshInput};
use super::errors::AuthError;
use crate::storage::kv_store::KvStore;

const AUTH_PREFIX: &str = "/api/v1/auth";
const REFRESH_HEADER: &str = "X-Refresh-Token";

/// HTTP implementation of [`AuthApi`].
#[derive(Clone)]
pub struct HttpAuthApi {
    http: reqwest::Client,
    base_url: String,
    refresh_store: Option<RefreshStore>,
}

#[derive(Clone)]
struct RefreshStore {
    storage: Arc<dyn KvStore>,
    key: String,
}

impl HttpAuthApi {
    /// Create a client from API settings.
    pub fn new(cfg: &ApiConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .cookie_store(true)
            .build()?;

        Ok(Self { http, base_url: cfg.base_url.trim_end_matches('/').to_string(), refresh_store: None })
    }

    /// Keep refresh tokens in `storage[key]` across processes.
    pub fn with_refresh_store(mut self, storage: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        self.refresh_store = Some(RefreshStore { storage, key: key.into() });
        self
    }

    fn endpoint(&self, name: &str) -> String {
        format!("{}{}/{}", self.base_url, AUTH_PREFIX, name)
    }

    /// Refresh token saved by the last login or refresh, if any.
    pub async fn stored_refresh_token(&self) -> Option<String> {
        let store = self.refresh_store.as_ref()?;
        match store.storage.get(&store.key).await? {
            Value::String(token) if !token.is_empty() => Some(token),
            _ => None,
        }
    }

    async fn remember_refresh_token(&self, token: Option<&str>) {
        let (Some(store), Some(token)) = (&self.refresh_store, token) else {
            return;
        };
        if let Err(e) = store.storage.set(&store.key, Value::String(token.to_owned())).await {
            warn!(event = "refresh_token_not_saved", error = %e, "cannot keep refresh token; a later logout will not revoke it");
        }
    }

    async fn forget_refresh_token(&self) {
        let Some(store) = &self.refresh_store else {
            return;
        };
        if let Err(e) = store.storage.remove(&store.key).await {
            warn!(event = "refresh_token_not_removed", error = %e, "cannot drop stored refresh token");
        }
    }

    fn logout_request(&self, refresh_token: Option<&str>) -> RequestBuilder {
        let req = self.http.post(self.endpoint("logout"));
        match refresh_token {
            Some(token) => req.header(REFRESH_HEADER, token),
            None => req,
        }
    }

    /// Exchange a refresh token for a fresh access token. Without an explicit
    /// token the stored one is used; the server also reads its refresh cookie.
    /// The rotated refresh token from the response replaces the stored one.
    #[instrument(skip(self, refresh_token), fields(explicit = refresh_token.is_some()))]
    pub async fn refresh(&self, refresh_token: Option<String>) -> Result<LoginResponse, AuthError> {
        let token = match refresh_token {
            Some(token) => Some(token),
            None => self.stored_refresh_token().await,
        };
        let mut req = self.http.post(self.endpoint("refresh"));
        if let Some(token) = token {
            req = req.json(&RefreshInput { refresh_token: token });
        }
        let resp = check_status(req.send().await?).await?;
        let body = resp.json::<LoginResponse>().await?;
        self.remember_refresh_token(body.refresh_token.as_deref()).await;
        Ok(body)
    }
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    #[instrument(skip(self, input), fields(email = %input.email))]
    async fn authenticate(&self, input: &LoginInput) -> Result<LoginResponse, AuthError> {
        let resp = self.http.post(self.endpoint("login")).json(input).send().await?;
        let resp = check_status(resp).await?;
        let body = resp.json::<LoginResponse>().await?;
        debug!(has_refresh_token = body.refresh_token.is_some(), "login response decoded");
        self.remember_refresh_token(body.refresh_token.as_deref()).await;
        Ok(body)
    }

    #[instrument(skip(self))]
    async fn invalidate_session(&self) -> Result<(), AuthError> {
        let token = self.stored_refresh_token().await;
        debug!(revoking = token.is_some(), "logging out");
        let result = match self.logout_request(token.as_deref()).send().await {
            Ok(resp) => check_status(resp).await.map(|_| ()),
            Err(e) => Err(e.into()),
        };
        // the local session ends whatever the server answered
        self.forget_refresh_token().await;
        result
    }
}

/// Error payloads the server emits; both carry a human-readable `message`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

async fn check_status(resp: Response) -> Result<Response, AuthError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let err = error_for_status(status, &body);
    warn!(status = status.as_u16(), code = err.code(), "auth api request rejected");
    Err(err)
}

/// Map a non-success response to an [`AuthError`].
pub(crate) fn error_for_status(status: StatusCode, body: &str) -> AuthError {
    let message = extract_message(body).unwrap_or_else(|| {
        status.canonical_reason().unwrap_or("request failed").to_string()
    });
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => AuthError::Unauthorized(message),
        StatusCode::FORBIDDEN => AuthError::Forbidden(message),
        _ => AuthError::Server { status: status.as_u16(), message },
    }
}

fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.message.or(parsed.error).filter(|m| !m.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::kv_store::mock::MemoryKvStore;

    fn api(base: &str) -> HttpAuthApi {
        HttpAuthApi::new(&ApiConfig { base_url: base.into(), timeout_secs: 5 }).unwrap()
    }

    #[test]
    fn endpoints_join_without_double_slash() {
        let a = api("http://localhost:8083/");
        assert_eq!(a.endpoint("login"), "http://localhost:8083/api/v1/auth/login");
        assert_eq!(a.endpoint("logout"), "http://localhost:8083/api/v1/auth/logout");
    }

    #[test]
    fn bad_request_maps_to_unauthorized_with_server_message() {
        let body = r#"{"status":400,"error":"Bad Request","message":"Invalid email or password","path":"/api/v1/auth/login"}"#;
        match error_for_status(StatusCode::BAD_REQUEST, body) {
            AuthError::Unauthorized(m) => assert_eq!(m, "Invalid email or password"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn forbidden_and_server_errors() {
        assert!(matches!(error_for_status(StatusCode::FORBIDDEN, ""), AuthError::Forbidden(_)));
        match error_for_status(StatusCode::INTERNAL_SERVER_ERROR, "oops") {
            AuthError::Server { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "Internal Server Error");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unreachable_server_is_a_network_error() {
        // port 9 (discard) on loopback is not expected to accept HTTP
        let a = api("http://127.0.0.1:9");
        let input = LoginInput { email: "a@b.com".into(), password: "x".into() };
        let err = a.authenticate(&input).await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)), "got {err:?}");
    }

    #[test]
    fn logout_request_carries_refresh_token_header() {
        let a = api("http://localhost:8083");
        let req = a.logout_request(Some("r1")).build().unwrap();
        assert_eq!(req.url().as_str(), "http://localhost:8083/api/v1/auth/logout");
        assert_eq!(req.headers().get("x-refresh-token").unwrap(), "r1");

        let req = a.logout_request(None).build().unwrap();
        assert!(req.headers().get("x-refresh-token").is_none());
    }

    #[tokio::test]
    async fn refresh_token_outlives_the_client_and_is_dropped_on_logout() {
        let storage = Arc::new(MemoryKvStore::default());
        let first = api("http://127.0.0.1:9").with_refresh_store(storage.clone(), "refresh_token");
        first.remember_refresh_token(Some("r1")).await;
        first.remember_refresh_token(None).await;
        drop(first);

        // a later process sees the same token
        let second = api("http://127.0.0.1:9").with_refresh_store(storage.clone(), "refresh_token");
        assert_eq!(second.stored_refresh_token().await.as_deref(), Some("r1"));

        let err = second.invalidate_session().await.unwrap_err();
        assert!(matches!(err, AuthError::Network(_)), "got {err:?}");
        assert!(second.stored_refresh_token().await.is_none());
        assert!(storage.snapshot("refresh_token").is_none());
    }

    #[tokio::test]
    async fn without_refresh_store_nothing_is_kept() {
        let a = api("http://127.0.0.1:9");
        a.remember_refresh_token(Some("r1")).await;
        assert!(a.stored_refresh_token().await.is_none());
    }
}
