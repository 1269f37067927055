pub mod article;
pub mod feed;
pub mod state;

pub use article::{Article, ArticleView};
pub use feed::{Feed, FeedType, FoundFeed};
pub use state::ArticleState;

use sha2::{Digest, Sha256};

/// Derive a stable 64-bit identity from the given key parts.
///
/// The first eight bytes of the SHA-256 digest are read big-endian, so the
/// value is identical across runs and platforms.
pub fn stable_id(parts: &[&[u8]]) -> i64 {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update((part.len() as u64).to_be_bytes());
        hasher.update(part);
    }
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes)
}
