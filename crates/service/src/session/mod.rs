//! Client-side session: state record, persisted envelope and the store that
//! mediates between the UI layer and the remote auth API.

pub mod errors;
pub mod state;
pub mod store;

pub use errors::SessionError;
pub use state::{PersistedSession, SessionState};
pub use store::SessionStore;
