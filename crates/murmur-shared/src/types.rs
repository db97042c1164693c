use serde::{Deserialize, Serialize};

use crate::constants::{AUTHOR_KEY_SIZE, EVENT_ID_SIZE, PUBKEY_SIZE};
use crate::error::CodecError;

fn decode_fixed<const N: usize>(s: &str) -> Result<[u8; N], CodecError> {
    let bytes = hex::decode(s.trim())?;
    if bytes.len() != N {
        return Err(CodecError::Length {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

// Event identity = BLAKE3 digest of the event body (32 bytes)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub [u8; EVENT_ID_SIZE]);

impl EventId {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        decode_fixed::<EVENT_ID_SIZE>(s).map(Self)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

// Author identity = Ed25519 public key (32 bytes)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Pubkey(pub [u8; PUBKEY_SIZE]);

impl Pubkey {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        decode_fixed::<PUBKEY_SIZE>(s).map(Self)
    }

    pub fn short(&self) -> String {
        self.to_hex()[..8].to_string()
    }

    /// The 64-bit author key this public key is indexed under.
    pub fn pubkey64(&self) -> Pubkey64 {
        Pubkey64::from_pubkey(self)
    }
}

impl std::fmt::Display for Pubkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Truncated author key: the last [`AUTHOR_KEY_SIZE`] bytes of a public key,
/// read big-endian.
///
/// Per-author indexes and peer addressing use this 64-bit value instead of
/// the full key. Two authors collide when their keys share the trailing
/// eight bytes; for uniformly random keys among `n` authors the collision
/// probability is roughly `n^2 / 2^65`. A collision makes the later writer
/// shadow the earlier one in the latest-per-author indexes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pubkey64(pub u64);

impl Pubkey64 {
    pub fn from_pubkey(pubkey: &Pubkey) -> Self {
        let mut tail = [0u8; AUTHOR_KEY_SIZE];
        tail.copy_from_slice(&pubkey.0[PUBKEY_SIZE - AUTHOR_KEY_SIZE..]);
        Self(u64::from_be_bytes(tail))
    }

    /// Index key form (big-endian, so byte order matches numeric order).
    pub fn to_key(&self) -> [u8; AUTHOR_KEY_SIZE] {
        self.0.to_be_bytes()
    }

    pub fn to_hex(&self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, CodecError> {
        decode_fixed::<AUTHOR_KEY_SIZE>(s).map(|b| Self(u64::from_be_bytes(b)))
    }
}

impl std::fmt::Display for Pubkey64 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
