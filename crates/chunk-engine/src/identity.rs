//! Content addressing for chunks.
//!
//! `chunk_id` identifies a chunk by *where* it is; `content_hash` identifies it by *what* it is.

use crate::types::ChunkLevel;
use sha2::{Digest, Sha256};

/// Stable identifier derived from location, name, and level.
///
/// Fields are NUL-separated so that `("a", "bc")` and `("ab", "c")` never collide.
#[must_use]
pub fn chunk_id(
    file_path: &str,
    start_line: usize,
    end_line: usize,
    name: &str,
    level: ChunkLevel,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(file_path.as_bytes());
    hasher.update([0]);
    hasher.update(start_line.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(end_line.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(name.as_bytes());
    hasher.update([0]);
    hasher.update(level.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Location-independent digest of chunk text.
///
/// Extracted chunks are hashed over their raw source bytes, so inputs that decode to the same
/// lossy text still hash apart.
#[must_use]
pub fn content_hash(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    format!("{:x}", hasher.finalize())
}
