//! # spaceit_core
//!
//! Core domain logic for Space-It: credential and token authentication,
//! per-space permission evaluation, the request rate gate, and the store
//! capability the HTTP layer depends on.

pub mod access;
pub mod auth;
pub mod migrate;
pub mod models;
pub mod rate;
pub mod store;
pub mod uuid;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_not_empty() {
        assert!(!version().is_empty());
    }
}
