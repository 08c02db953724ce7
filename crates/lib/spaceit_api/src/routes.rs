//! Route paths.
//!
//! Paths below are relative to [`API_PREFIX`].

/// Prefix every API route is nested under.
pub const API_PREFIX: &str = "/api/v1";

pub const HEALTH: &str = "/health";
pub const USERS: &str = "/users";
pub const SESSIONS: &str = "/sessions";
pub const SPACES: &str = "/spaces";
pub const SPACE: &str = "/spaces/{space_id}";
pub const SPACE_MEMBERS: &str = "/spaces/{space_id}/members";

/// Path parameter naming the space an access check applies to.
pub const SPACE_ID_PARAM: &str = "space_id";
