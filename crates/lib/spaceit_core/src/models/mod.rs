//! Domain models.
//!
//! These are internal domain models, distinct from the API request/response
//! bodies in `spaceit_api` (which use camelCase on the wire).

pub mod audit;
pub mod auth;
pub mod spaces;
