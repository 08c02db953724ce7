//! Request pipeline stages.

pub mod access;
pub mod audit;
pub mod auth;
pub mod content_type;
pub mod cors;
pub mod rate;
