//! Auth module: the remote authentication API the session store talks to.
//!
//! `client` defines the seam (trait + scripted mock), `http` the reqwest
//! implementation, `domain` the wire types and `errors` the failure kinds.

pub mod client;
pub mod domain;
pub mod errors;
pub mod http;

pub use client::AuthApi;
pub use domain::{LoginInput, LoginResponse, UserProfile};
pub use errors::AuthError;
pub use http::HttpAuthApi;
