//! SHA3-256 content digest of encoded values.

use crate::types::encoding::EncodeSink;
use sha3::{Digest, Sha3_256};
use std::fmt;

pub const HASH_LEN: usize = 32;

/// 32-byte SHA3-256 digest, displayed as lowercase hex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; HASH_LEN]);

impl ContentHash {
    /// Hashes raw bytes.
    pub fn of_bytes(data: &[u8]) -> ContentHash {
        let mut hasher = HashSink::default();
        hasher.write(data);
        hasher.finalize()
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

/// [`EncodeSink`] that feeds every written byte into a SHA3-256 state.
#[derive(Default)]
pub struct HashSink {
    hasher: Sha3_256,
}

impl HashSink {
    pub fn finalize(self) -> ContentHash {
        ContentHash(self.hasher.finalize().into())
    }
}

impl EncodeSink for HashSink {
    fn write(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }
}
