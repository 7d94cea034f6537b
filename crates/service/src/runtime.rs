//! Runtime wiring
//!
//! Builds the production session store from configuration: file-backed
//! storage, the HTTP auth client keeping its refresh token in the same file,
//! and a rehydrated `SessionStore`.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use configs::AppConfig;

use crate::auth::http::HttpAuthApi;
use crate::session::store::SessionStore;
use crate::storage::{json_map_store::JsonMapStore, kv_store::KvStore};

/// Everything a front end needs: the store plus the concrete client for
/// operations outside the store's contract (token refresh on demand).
pub struct SessionRuntime {
    pub api: Arc<HttpAuthApi>,
    pub store: Arc<SessionStore<HttpAuthApi>>,
}

/// Open the session described by `cfg`.
pub async fn open_session(cfg: &AppConfig) -> anyhow::Result<SessionRuntime> {
    let storage: Arc<dyn KvStore> = JsonMapStore::<String, Value>::new(&cfg.storage.path).await?;
    let api = Arc::new(HttpAuthApi::new(&cfg.api)?.with_refresh_store(storage.clone(), cfg.storage.refresh_key.clone()));
    let store = Arc::new(SessionStore::open(api.clone(), storage, cfg.storage.key.clone()).await);
    info!(
        event = "session_opened",
        path = %cfg.storage.path.display(),
        base_url = %cfg.api.base_url,
        logged_in = store.check_login(),
        "session store ready"
    );
    Ok(SessionRuntime { api, store })
}
