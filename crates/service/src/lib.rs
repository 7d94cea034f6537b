//! Service layer for the client-side auth session.
//! - `session`: the state container the UI layer drives (login, logout, status).
//! - `auth`: the remote authentication API it wraps.
//! - `storage`: the durable key-value seam snapshots are written through.
//! - `runtime`: production wiring from configuration.

pub mod errors;
pub mod auth;
pub mod runtime;
pub mod session;
pub mod storage;

pub use session::{SessionError, SessionState, SessionStore};
