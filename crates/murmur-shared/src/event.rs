//! Event schema and its binary codec.
//!
//! Events are the unit of storage and gossip. The binary form produced by
//! [`Event::encode`] is what the store persists; it is deterministic, so two
//! equal events always encode to identical bytes.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::constants::{KIND_FOLLOW_LIST, KIND_PROFILE};
use crate::error::CodecError;
use crate::types::{EventId, Pubkey, Pubkey64};

/// A signed, immutable event (post, profile update or follow list).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    /// Content-derived identifier
    pub id: EventId,
    /// Author's public key
    pub pubkey: Pubkey,
    /// Author-reported creation time (Unix seconds). Not monotonic.
    pub created_at: i64,
    pub kind: u16,
    pub tags: Vec<Vec<String>>,
    pub content: String,
    /// Ed25519 signature over `id`
    pub sig: Vec<u8>,
}

impl Event {
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|source| CodecError::Encode {
            what: "event",
            source,
        })
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(data).map_err(|source| CodecError::Decode {
            what: "event",
            source,
        })
    }

    pub fn author_key(&self) -> Pubkey64 {
        self.pubkey.pubkey64()
    }

    pub fn is_profile(&self) -> bool {
        self.kind == KIND_PROFILE
    }

    pub fn is_follow_list(&self) -> bool {
        self.kind == KIND_FOLLOW_LIST
    }
}

/// Bookkeeping for an event some peers have not yet acknowledged.
///
/// Records are replaced, never mutated in place: the store removes them by
/// exact encoded value, so the destination set is kept sorted to give every
/// logical record a single byte representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResendRecord {
    /// Peers still owed delivery
    pub dest_ids: BTreeSet<Pubkey64>,
    pub event_id: EventId,
    /// Copied from the event; orders the resend queue
    pub created_at: i64,
}

impl ResendRecord {
    pub fn new(dest_ids: impl IntoIterator<Item = Pubkey64>, event: &Event) -> Self {
        Self {
            dest_ids: dest_ids.into_iter().collect(),
            event_id: event.id,
            created_at: event.created_at,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|source| CodecError::Encode {
            what: "resend record",
            source,
        })
    }

    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(data).map_err(|source| CodecError::Decode {
            what: "resend record",
            source,
        })
    }
}

/// JSON body of a kind-0 profile event.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileContent {
    pub name: String,
    #[serde(default)]
    pub about: String,
    #[serde(default)]
    pub picture: String,
}

impl ProfileContent {
    pub fn to_json(&self) -> String {
        // Plain string fields always serialize.
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_event(event: &Event) -> Option<Self> {
        if !event.is_profile() {
            return None;
        }
        serde_json::from_str(&event.content).ok()
    }
}
