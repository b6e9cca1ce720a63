//! Short identifier generation for new QR codes
//!
//! Identifiers are drawn from `[A-Za-z0-9]`, so they go into URLs unescaped.
//! The generator alone does not guarantee uniqueness: callers insert with
//! [`crate::store::Store::insert`] and regenerate when the id is taken.

use rand::{distr::Alphanumeric, Rng};

pub const MIN_ID_LENGTH: usize = 6;
pub const MAX_ID_LENGTH: usize = 8;
pub const DEFAULT_ID_LENGTH: usize = 8;

/// How many fresh ids to try before giving up on an insert
pub const MAX_ID_ATTEMPTS: usize = 5;

/// Returns a random alphanumeric identifier of exactly `length` characters
pub fn generate(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Keeps a configured length inside the supported 6..=8 range
pub fn clamp_length(length: usize) -> usize {
    length.clamp(MIN_ID_LENGTH, MAX_ID_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generates_requested_length() {
        assert_eq!(generate(6).len(), 6);
        assert_eq!(generate(8).len(), 8);
    }

    #[test]
    fn ids_are_url_safe() {
        for _ in 0..100 {
            assert!(generate(8).chars().all(|c| c.is_ascii_alphanumeric()));
        }
    }

    #[test]
    fn ids_do_not_repeat_in_practice() {
        let ids: HashSet<String> = (0..1000).map(|_| generate(8)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn length_is_clamped() {
        assert_eq!(clamp_length(2), 6);
        assert_eq!(clamp_length(7), 7);
        assert_eq!(clamp_length(32), 8);
    }
}
