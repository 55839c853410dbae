//! Rolling SHA-256 over a received file body.

use core::fmt::Write as _;

use crate::app::ports::{FileStore, StorageError};

/// Lowercase hex SHA-256 digest.
pub type HexDigest = heapless::String<64>;

/// Read size used when re-hashing a stored file.
const REHASH_CHUNK: usize = 256;

/// Incremental content hash. Each byte range is folded in exactly once,
/// so the digest is independent of how the body was chunked.
pub struct ContentHasher {
    state: hmac_sha256::Hash,
    bytes: u64,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self {
            state: hmac_sha256::Hash::new(),
            bytes: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.state.update(data);
        self.bytes += data.len() as u64;
    }

    /// Bytes folded in so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn finalize(self) -> HexDigest {
        to_hex(&self.state.finalize())
    }
}

impl Default for ContentHasher {
    fn default() -> Self {
        Self::new()
    }
}

fn to_hex(bytes: &[u8; 32]) -> HexDigest {
    let mut out = HexDigest::new();
    for b in bytes {
        // 32 bytes → exactly 64 hex chars, the string's capacity.
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Digest of `data` in one shot.
pub fn digest(data: &[u8]) -> HexDigest {
    to_hex(&hmac_sha256::Hash::hash(data))
}

/// Re-read a stored file from the start and hash it.
pub fn hash_stored_file(store: &dyn FileStore, name: &str) -> Result<HexDigest, StorageError> {
    let mut file = store.open_read(name)?;
    let mut hasher = ContentHasher::new();
    let mut buf = [0u8; REHASH_CHUNK];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize())
}

/// Compare a sender-supplied digest with a computed one (hex, any case).
pub fn digests_match(expected: &str, computed: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(computed)
}
