//! Business logic invoked by handlers and the identity resolver.

pub mod auth;
pub mod cookies;
pub mod spaces;
