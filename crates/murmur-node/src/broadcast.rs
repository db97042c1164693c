//! Outbound delivery seam.
//!
//! The store only remembers who still owes an acknowledgement; actually
//! reaching peers is the job of a [`Broadcaster`]. A node without a network
//! transport runs with [`Standalone`], which has no peers and therefore
//! never leaves anything pending.

use std::collections::BTreeSet;

use murmur_shared::{Event, Pubkey64, ResendRecord};

pub trait Broadcaster: Send + Sync {
    /// Send a freshly published event to every known peer. Returns the peers
    /// that did not acknowledge it.
    fn broadcast(&self, event: &Event) -> BTreeSet<Pubkey64>;

    /// Retry delivery to the peers named in `record`. Returns the subset that
    /// is still pending.
    fn redeliver(&self, record: &ResendRecord, event: &Event) -> BTreeSet<Pubkey64>;
}

/// Broadcaster for a node with no peers.
#[derive(Debug, Default, Clone, Copy)]
pub struct Standalone;

impl Broadcaster for Standalone {
    fn broadcast(&self, event: &Event) -> BTreeSet<Pubkey64> {
        tracing::trace!(id = %event.id, "no peers to broadcast to");
        BTreeSet::new()
    }

    fn redeliver(&self, record: &ResendRecord, _event: &Event) -> BTreeSet<Pubkey64> {
        // Nobody to wait for: treat every destination as delivered.
        tracing::trace!(id = %record.event_id, "dropping destinations in standalone mode");
        BTreeSet::new()
    }
}
