//! Request handlers.

pub mod health;
pub mod spaces;
pub mod users;
