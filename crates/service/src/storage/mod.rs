//! Storage abstractions for the session layer
//!
//! Contains the durable key-value seam the session store writes through and
//! a reusable file-backed map that persists small documents as JSON.

pub mod json_map_store;
pub mod kv_store;

pub use json_map_store::JsonMapStore;
pub use kv_store::KvStore;
