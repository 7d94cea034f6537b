//! Cross-cutting helpers shared by the session crates and the `session` binary.

pub mod utils {
    pub mod logging;
}
