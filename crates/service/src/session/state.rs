use serde::{Deserialize, Serialize};

use crate::auth::domain::UserProfile;

/// Version written into the persisted envelope. Snapshots with any other
/// version are discarded on load.
pub const SNAPSHOT_VERSION: u32 = 0;

/// Authentication state of the current client.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub user: Option<UserProfile>,
    #[serde(default)]
    pub auth_status: bool,
    /// Written for inspection but never read back: a request cannot survive a restart.
    #[serde(default, skip_deserializing)]
    pub auth_loading: bool,
}

impl SessionState {
    /// True iff a non-empty token is held AND the explicit flag is set.
    pub fn is_logged_in(&self) -> bool {
        self.auth_status && self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub(crate) fn clear(&mut self) {
        *self = SessionState::default();
    }
}

/// Document stored under the session key: `{ "state": {...}, "version": 0 }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    pub state: SessionState,
    #[serde(default)]
    pub version: u32,
}

impl PersistedSession {
    pub fn new(state: SessionState) -> Self {
        Self { state, version: SNAPSHOT_VERSION }
    }
}
