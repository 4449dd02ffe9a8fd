//! Utility functions and helpers

use std::time::{SystemTime, UNIX_EPOCH};

/// Get current timestamp in milliseconds since the Unix epoch
pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Generate a unique ID
pub fn generate_id() -> uuid::Uuid {
    uuid::Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_milliseconds() {
        // 2001-09-09 in milliseconds; a seconds-based clock would be far below this
        assert!(current_timestamp() > 1_000_000_000_000);
    }

    #[test]
    fn test_id_generation() {
        let id1 = generate_id();
        let id2 = generate_id();

        assert_ne!(id1, id2);
        assert!(!id1.is_nil());
    }
}
