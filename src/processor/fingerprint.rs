//! Content fingerprints.

use sha2::{Digest, Sha256};

/// Length of a hex-encoded SHA-256 digest.
pub const FINGERPRINT_HEX_LEN: usize = 64;

/// Compute the content fingerprint: lowercase hex SHA-256 of the bytes.
pub fn fingerprint(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    hex::encode(hasher.finalize())
}

/// Check that `s` has the shape of a fingerprint (64 hex chars).
pub fn is_fingerprint(s: &str) -> bool {
    s.len() == FINGERPRINT_HEX_LEN && s.chars().all(|c| c.is_ascii_hexdigit())
}
