//! Content fingerprints using BLAKE3
//!
//! A fingerprint is only ever compared for equality against a freshly computed
//! one; it tells the store whether cached commentary still matches the file.

use blake3::Hasher;

/// Hex-encoded BLAKE3 digest of a text blob.
pub type Fingerprint = String;

/// Compute the fingerprint of `content`.
///
/// No normalization is applied: line endings and whitespace are hashed as-is,
/// so a single changed character yields a different fingerprint.
pub fn digest(content: &str) -> Fingerprint {
    digest_bytes(content.as_bytes())
}

/// Compute the fingerprint of raw bytes.
pub fn digest_bytes(content: &[u8]) -> Fingerprint {
    let mut hasher = Hasher::new();
    hasher.update(content);
    hex::encode(hasher.finalize().as_bytes())
}

/// True when `fingerprint` was produced from exactly `content`.
pub fn matches(fingerprint: &str, content: &str) -> bool {
    digest(content) == fingerprint
}
