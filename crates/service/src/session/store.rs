use std::sync::Arc;

use tokio::sync::{watch, Mutex};
use tracing::{debug, info, instrument, warn};

use crate::auth::client::AuthApi;
use crate::auth::domain::{LoginInput, LoginResponse, UserProfile};
use crate::errors::ServiceError;
use crate::session::errors::SessionError;
use crate::session::state::{PersistedSession, SessionState, SNAPSHOT_VERSION};
use crate::storage::kv_store::KvStore;

/// Authentication state container backed by durable storage.
///
/// Every mutation is applied in memory, published to subscribers and then
/// written to `storage[key]` as a full snapshot before the operation returns.
/// Mutations are serialised, so storage always receives snapshots in the order
/// subscribers observed them. An operation whose final snapshot cannot be
/// written fails with [`SessionError::Storage`].
///
/// Overlapping `login`/`logout` calls are not deduplicated: each one sets and
/// resets `auth_loading` on its own, and the last writer wins.
pub struct SessionStore<A: AuthApi> {
    api: Arc<A>,
    storage: Arc<dyn KvStore>,
    key: String,
    state: watch::Sender<SessionState>,
    write_lock: Arc<Mutex<()>>,
}

impl<A: AuthApi> SessionStore<A> {
    /// Build a store, rehydrating from `storage[key]` when a usable snapshot exists.
    pub async fn open(api: Arc<A>, storage: Arc<dyn KvStore>, key: impl Into<String>) -> Self {
        let key = key.into();
        let initial = rehydrate(storage.as_ref(), &key).await;
        let (state, _) = watch::channel(initial);
        Self { api, storage, key, state, write_lock: Arc::new(Mutex::new(())) }
    }

    /// Observe every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Copy of the current state.
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.state.borrow().access_token.clone()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn auth_status(&self) -> bool {
        self.state.borrow().auth_status
    }

    pub fn auth_loading(&self) -> bool {
        self.state.borrow().auth_loading
    }

    /// Authenticate against the remote API.
    ///
    /// On success the token, user and status are stored together and the full
    /// response is returned. On failure the remote error is returned as-is and
    /// token, user and status keep their previous values. `auth_loading` is
    /// false again once this returns or the future is dropped.
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: &LoginInput) -> Result<LoginResponse, SessionError> {
        // intermediate snapshots only need to land if the closing one does not
        let _ = self.commit("login_started", |s| s.auth_loading = true).await;
        let cleanup = self.cleanup(|s| s.auth_loading = false);

        let result = self.api.authenticate(input).await;
        match &result {
            Ok(resp) => {
                let token = resp.access_token.clone();
                let user = resp.user.clone();
                let _ = self
                    .commit("login_succeeded", move |s| {
                        s.access_token = Some(token);
                        s.user = Some(user);
                        s.auth_status = true;
                    })
                    .await;
                info!(event = "login_succeeded", "session established");
            }
            Err(e) => warn!(event = "login_failed", code = e.code(), error = %e, "login rejected"),
        }

        let settled = self.commit("login_finished", |s| s.auth_loading = false).await;
        cleanup.disarm();
        settled?;
        result.map_err(SessionError::from)
    }

    /// Adopt a token obtained elsewhere (e.g. an OAuth redirect). No network call.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use service::auth::client::mock::MockAuthApi;
    /// use service::storage::kv_store::mock::MemoryKvStore;
    /// use service::SessionStore;
    /// let api = Arc::new(MockAuthApi::default());
    /// let store = tokio_test::block_on(SessionStore::open(api.clone(), Arc::new(MemoryKvStore::default()), "app_state"));
    /// tokio_test::block_on(store.login_with_token("xyz", serde_json::json!({"id": 2}))).unwrap();
    /// assert!(store.check_login());
    /// assert_eq!(api.authenticate_calls(), 0);
    /// ```
    #[instrument(skip_all)]
    pub async fn login_with_token(&self, access_token: impl Into<String>, user: UserProfile) -> Result<(), SessionError> {
        let token = access_token.into();
        self.commit("login_with_token", move |s| {
            s.access_token = Some(token);
            s.user = Some(user);
            s.auth_status = true;
            s.auth_loading = false;
        })
        .await?;
        info!(event = "login_with_token", "session adopted from external token");
        Ok(())
    }

    /// End the session. Unless `silent`, the server is told first; local state
    /// is cleared whatever the server answered, and its error (if any) is
    /// returned afterwards. A cleared state that could not be written to
    /// storage is reported ahead of the server's error.
    #[instrument(skip(self))]
    pub async fn logout(&self, silent: bool) -> Result<(), SessionError> {
        let _ = self.commit("logout_started", |s| s.auth_loading = true).await;
        let cleanup = self.cleanup(SessionState::clear);

        let result = if silent {
            debug!("silent logout; skipping remote invalidation");
            Ok(())
        } else {
            self.api.invalidate_session().await
        };
        if let Err(e) = &result {
            warn!(event = "logout_remote_failed", code = e.code(), error = %e, "remote logout failed; clearing local session anyway");
        }

        let cleared = self.commit("logged_out", SessionState::clear).await;
        cleanup.disarm();
        cleared?;
        info!(event = "logout", silent, "session cleared");
        result.map_err(SessionError::from)
    }

    /// True iff a non-empty token is held and the session is flagged as authenticated.
    pub fn check_login(&self) -> bool {
        self.state.borrow().is_logged_in()
    }

    /// Overwrite token, user and status verbatim; `auth_loading` is left alone.
    #[instrument(skip(self, access_token, user))]
    pub async fn change_local_login_data(
        &self,
        access_token: Option<String>,
        user: Option<UserProfile>,
        auth_status: bool,
    ) -> Result<(), SessionError> {
        self.commit("local_login_data_changed", move |s| {
            s.access_token = access_token;
            s.user = user;
            s.auth_status = auth_status;
        })
        .await?;
        Ok(())
    }

    /// Apply `mutate`, publish it, then persist the full snapshot.
    async fn commit<F>(&self, event: &'static str, mutate: F) -> Result<(), ServiceError>
    where
        F: FnOnce(&mut SessionState) + Send,
    {
        let _guard = self.write_lock.lock().await;
        self.state.send_modify(mutate);
        let snapshot = self.state.borrow().clone();
        debug!(event, auth_status = snapshot.auth_status, auth_loading = snapshot.auth_loading, "state changed");
        write_snapshot(self.storage.as_ref(), &self.key, snapshot).await.map_err(|e| {
            warn!(event = "persist_failed", cause = event, key = %self.key, error = %e, "cannot write session snapshot");
            e
        })
    }

    fn cleanup(&self, reset: fn(&mut SessionState)) -> Cleanup<'_> {
        Cleanup {
            state: &self.state,
            reset,
            storage: self.storage.clone(),
            key: self.key.clone(),
            write_lock: self.write_lock.clone(),
            armed: true,
        }
    }
}

async fn write_snapshot(storage: &dyn KvStore, key: &str, state: SessionState) -> Result<(), ServiceError> {
    let value = serde_json::to_value(PersistedSession::new(state))?;
    storage.set(key, value).await
}

async fn rehydrate(storage: &dyn KvStore, key: &str) -> SessionState {
    let Some(raw) = storage.get(key).await else {
        debug!(key, "no persisted session; starting empty");
        return SessionState::default();
    };
    match serde_json::from_value::<PersistedSession>(raw) {
        Ok(p) if p.version == SNAPSHOT_VERSION => {
            let mut state = p.state;
            state.auth_loading = false;
            info!(event = "rehydrated", key, auth_status = state.auth_status, has_token = state.access_token.is_some(), "session restored");
            state
        }
        Ok(p) => {
            warn!(key, found = p.version, expected = SNAPSHOT_VERSION, "discarding session snapshot with unknown version");
            SessionState::default()
        }
        Err(e) => {
            warn!(key, error = %e, "discarding unreadable session snapshot");
            SessionState::default()
        }
    }
}

/// Restores a rest state if an operation's future is dropped before it
/// reaches its final commit. Memory is reset at once; the snapshot write is
/// queued on the current runtime behind any commit already in progress.
struct Cleanup<'a> {
    state: &'a watch::Sender<SessionState>,
    reset: fn(&mut SessionState),
    storage: Arc<dyn KvStore>,
    key: String,
    write_lock: Arc<Mutex<()>>,
    armed: bool,
}

impl Cleanup<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for Cleanup<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.state.send_modify(self.reset);

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(event = "operation_cancelled", "session operation dropped outside a runtime; reset not persisted");
            return;
        };
        let storage = self.storage.clone();
        let key = self.key.clone();
        let write_lock = self.write_lock.clone();
        let latest = self.state.subscribe();
        handle.spawn(async move {
            let _guard = write_lock.lock().await;
            // commits queued ahead of us already wrote newer state; write whatever is current
            let snapshot = latest.borrow().clone();
            if let Err(e) = write_snapshot(storage.as_ref(), &key, snapshot).await {
                warn!(event = "persist_failed", cause = "operation_cancelled", key = %key, error = %e, "cannot write session snapshot");
            }
        });
        warn!(event = "operation_cancelled", "session operation dropped mid-flight; state reset");
    }
}
