//! Chunk identity helpers.

use sha2::{Digest, Sha256};

/// Calculate SHA-256 hash of text.
pub fn calculate_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stable chunk id: the first 128 bits of SHA-256 over source, position and
/// content hash.
pub fn chunk_id(source: &str, position: u32, content_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    hasher.update([0u8]);
    hasher.update(position.to_le_bytes());
    hasher.update(content_hash.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..32].to_string()
}
