//! Admin bearer token hashing.
//!
//! The server keeps only the SHA-256 digest of the configured token and
//! compares digests of presented tokens against it.

use sha2::{Digest, Sha256};

/// Compute the SHA-256 hex digest of a token.
pub fn hash_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Check a presented token against a stored digest.
pub fn verify_token(presented: &str, expected_hash: &str) -> bool {
    let presented_hash = hash_token(presented);
    presented_hash.len() == expected_hash.len()
        && presented_hash
            .bytes()
            .zip(expected_hash.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}
