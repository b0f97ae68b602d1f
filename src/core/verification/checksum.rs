//! Checksum calculation for data verification
//!
//! This module provides the SHA-256 digests used to confirm that the
//! round-trip copy of the relational export is byte-identical to the cloud
//! object it was read from.

use sha2::{Digest, Sha256};

/// Calculate SHA-256 checksum of raw bytes
///
/// # Returns
///
/// Returns a hex-encoded SHA-256 checksum string (64 characters).
///
/// # Examples
///
/// ```
/// use tierflow::core::verification::checksum::calculate_checksum_bytes;
///
/// let checksum = calculate_checksum_bytes(b"npi,provider_state\n");
/// assert_eq!(checksum.len(), 64);
/// ```
pub fn calculate_checksum_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("{result:x}")
}

/// Whether two payloads have the same SHA-256 digest
pub fn checksums_match(left: &[u8], right: &[u8]) -> bool {
    calculate_checksum_bytes(left) == calculate_checksum_bytes(right)
}
