//! Event builders shared by the unit tests.

use murmur_shared::constants::KIND_TEXT_NOTE;
use murmur_shared::{Event, EventId, Pubkey};

/// An unsigned event; the store never checks signatures.
pub fn event(author: u8, created_at: i64, content: &str) -> Event {
    event_of_kind(author, created_at, KIND_TEXT_NOTE, content)
}

pub fn event_of_kind(author: u8, created_at: i64, kind: u16, content: &str) -> Event {
    let mut id = [0u8; 32];
    id[0] = author;
    id[1] = kind as u8;
    id[8..16].copy_from_slice(&created_at.to_be_bytes());
    id[16..16 + content.len().min(16)]
        .copy_from_slice(&content.as_bytes()[..content.len().min(16)]);

    Event {
        id: EventId(id),
        pubkey: Pubkey([author; 32]),
        created_at,
        kind,
        tags: Vec::new(),
        content: content.to_string(),
        sig: vec![0u8; 64],
    }
}

pub fn timestamps(events: &[Event]) -> Vec<i64> {
    events.iter().map(|e| e.created_at).collect()
}
