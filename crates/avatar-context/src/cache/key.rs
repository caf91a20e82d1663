//! Cache key derivation.

use sha2::{Digest, Sha256};

/// Scope used for the live context of a session.
pub const CURRENT_SCOPE: &str = "current";

/// Deterministic cache fingerprints.
pub struct CacheKey;

impl CacheKey {
    /// Derive a fingerprint from session, user and conversation scope.
    ///
    /// Each part is length-prefixed before hashing so that
    /// `("ab", "c")` and `("a", "bc")` never collide.
    pub fn fingerprint(session_id: &str, user_id: &str, scope: &str) -> String {
        let mut hasher = Sha256::new();
        for part in [session_id, user_id, scope] {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    /// Fingerprint of the live context for a session.
    pub fn current(session_id: &str, user_id: &str) -> String {
        Self::fingerprint(session_id, user_id, CURRENT_SCOPE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = CacheKey::fingerprint("s1", "u1", "current");
        let b = CacheKey::fingerprint("s1", "u1", "current");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_fingerprint_length_prefix_prevents_collisions() {
        let a = CacheKey::fingerprint("ab", "c", "x");
        let b = CacheKey::fingerprint("a", "bc", "x");
        assert_ne!(a, b);
    }

    #[test]
    fn test_current_uses_current_scope() {
        assert_eq!(
            CacheKey::current("s", "u"),
            CacheKey::fingerprint("s", "u", CURRENT_SCOPE)
        );
    }
}
