//! Per-space access levels.
//!
//! A user's capabilities on a space are three stored bits (read, write,
//! delete). Admin is not stored: it holds iff all three bits are set. A
//! missing permission record is treated as all bits false.

use std::fmt;

use http::Method;
use serde::{Deserialize, Serialize};

use crate::models::spaces::PermissionRecord;

/// Level a route requires on the targeted space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Read,
    Write,
    Delete,
    Admin,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "read",
            AccessLevel::Write => "write",
            AccessLevel::Delete => "delete",
            AccessLevel::Admin => "admin",
        }
    }

    /// Level implied by an HTTP method for method-keyed routes.
    ///
    /// `POST` needs write, `GET` and `HEAD` read, `DELETE` delete. Other
    /// methods have no level.
    pub fn for_method(method: &Method) -> Option<Self> {
        match *method {
            Method::POST => Some(AccessLevel::Write),
            Method::GET | Method::HEAD => Some(AccessLevel::Read),
            Method::DELETE => Some(AccessLevel::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why access was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No permission record exists for the (user, space) pair.
    NoGrant,
    /// A record exists but lacks the bit(s) for the level.
    MissingLevel(AccessLevel),
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NoGrant => f.write_str("access denied: insufficient permissions"),
            DenyReason::MissingLevel(level) => write!(f, "denied: {level} access required"),
        }
    }
}

/// Outcome of an access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(DenyReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }
}

impl PermissionRecord {
    /// Whether all three bits are set.
    pub fn is_admin(&self) -> bool {
        self.read && self.write && self.delete
    }

    /// Whether this record satisfies `level`.
    pub fn grants(&self, level: AccessLevel) -> bool {
        match level {
            AccessLevel::Read => self.read,
            AccessLevel::Write => self.write,
            AccessLevel::Delete => self.delete,
            AccessLevel::Admin => self.is_admin(),
        }
    }
}

/// Evaluate a (possibly missing) record against a required level.
pub fn evaluate(record: Option<&PermissionRecord>, level: AccessLevel) -> AccessDecision {
    match record {
        None => AccessDecision::Deny(DenyReason::NoGrant),
        Some(r) if r.grants(level) => AccessDecision::Allow,
        Some(_) => AccessDecision::Deny(DenyReason::MissingLevel(level)),
    }
}

/// Evaluate a record for a method-keyed route. Methods without a mapped
/// level are denied whatever the record holds.
pub fn evaluate_method(record: Option<&PermissionRecord>, method: &Method) -> AccessDecision {
    match AccessLevel::for_method(method) {
        Some(level) => evaluate(record, level),
        None => AccessDecision::Deny(DenyReason::NoGrant),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn record(read: bool, write: bool, delete: bool) -> PermissionRecord {
        let now = Utc::now();
        PermissionRecord {
            user_id: Uuid::new_v4(),
            space_id: Uuid::new_v4(),
            read,
            write,
            delete,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn single_bits_map_to_levels() {
        let r = record(true, false, false);
        assert!(evaluate(Some(&r), AccessLevel::Read).is_allowed());
        assert_eq!(
            evaluate(Some(&r), AccessLevel::Write),
            AccessDecision::Deny(DenyReason::MissingLevel(AccessLevel::Write))
        );
        assert!(!evaluate(Some(&r), AccessLevel::Delete).is_allowed());

        let w = record(false, true, false);
        assert!(evaluate(Some(&w), AccessLevel::Write).is_allowed());
        let d = record(false, false, true);
        assert!(evaluate(Some(&d), AccessLevel::Delete).is_allowed());
    }

    #[test]
    fn admin_requires_every_bit() {
        for bits in 0u8..8 {
            let r = record(bits & 1 != 0, bits & 2 != 0, bits & 4 != 0);
            assert_eq!(
                evaluate(Some(&r), AccessLevel::Admin).is_allowed(),
                bits == 7,
                "bits {bits:03b}"
            );
        }
    }

    #[test]
    fn flipping_any_bit_revokes_admin() {
        let full = record(true, true, true);
        assert!(full.grants(AccessLevel::Admin));
        for i in 0..3 {
            let mut r = full.clone();
            match i {
                0 => r.read = false,
                1 => r.write = false,
                _ => r.delete = false,
            }
            assert!(!r.grants(AccessLevel::Admin));
        }
    }

    #[test]
    fn missing_record_is_no_grant() {
        for level in [
            AccessLevel::Read,
            AccessLevel::Write,
            AccessLevel::Delete,
            AccessLevel::Admin,
        ] {
            assert_eq!(
                evaluate(None, level),
                AccessDecision::Deny(DenyReason::NoGrant)
            );
        }
    }

    #[test]
    fn method_keyed_levels() {
        let r = record(true, false, true);
        assert!(evaluate_method(Some(&r), &Method::GET).is_allowed());
        assert!(!evaluate_method(Some(&r), &Method::POST).is_allowed());
        assert!(evaluate_method(Some(&r), &Method::DELETE).is_allowed());
    }

    #[test]
    fn head_needs_read() {
        let write_only = record(false, true, false);
        assert_eq!(
            evaluate_method(Some(&write_only), &Method::HEAD),
            AccessDecision::Deny(DenyReason::MissingLevel(AccessLevel::Read))
        );
        assert!(evaluate_method(Some(&record(true, false, false)), &Method::HEAD).is_allowed());
    }

    #[test]
    fn unmapped_methods_are_denied() {
        let full = record(true, true, true);
        for method in [Method::PUT, Method::PATCH, Method::OPTIONS] {
            assert!(!evaluate_method(Some(&full), &method).is_allowed(), "{method}");
        }
        assert!(!evaluate_method(None, &Method::PUT).is_allowed());
    }

    #[test]
    fn deny_reasons_read_well() {
        assert_eq!(
            DenyReason::MissingLevel(AccessLevel::Write).to_string(),
            "denied: write access required"
        );
        assert_eq!(
            DenyReason::NoGrant.to_string(),
            "access denied: insufficient permissions"
        );
    }
}
