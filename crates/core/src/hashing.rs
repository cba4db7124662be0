//! SHA-256 hex digest used for refresh-credential fingerprints.

use sha2::{Digest, Sha256};

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    let hash = Sha256::digest(data);
    format!("{hash:x}")
}

/// One-way fingerprint of a refresh credential. Only this value is stored.
pub fn hash_credential(credential: &str) -> String {
    sha256_hex(credential.as_bytes())
}
