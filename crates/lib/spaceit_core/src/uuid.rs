//! Audit correlation identifiers.
//!
//! Request log ids are generated app-side so the same value can key the
//! response log row written after the handler. UUIDv7 keeps audit rows
//! ordered by creation time.

use uuid::Uuid;

/// Generate a new correlation id for a request/response log pair.
pub fn correlation_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correlation_id_is_v7() {
        let id = correlation_id();
        assert_eq!(id.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn correlation_ids_sort_by_creation() {
        let a = correlation_id();
        let b = correlation_id();
        assert!(b >= a);
    }
}
