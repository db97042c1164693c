//! Best-effort facade over the store.
//!
//! [`EventStore`] is what the broadcast and ingress layers program against.
//! Its operations never fail: a substrate error is logged and the call
//! degrades to "nothing stored" / "not found" / "empty". Callers that need
//! to tell a miss from a failure use the `try_*` methods on [`Database`]
//! directly.

use std::collections::BTreeSet;

use murmur_shared::{Event, EventId, Pubkey64, ResendRecord};

use crate::database::Database;
use crate::error::Result;
use crate::itr::SnapshotIter;

pub trait EventStore: Send + Sync {
    /// Persist a generic event into the time index, identity index and ledger.
    fn store_event(&self, event: &Event);

    /// Point the author's latest-profile entry at `event`.
    fn store_profile(&self, event: &Event);

    /// Point the author's latest-follow-list entry at `event`.
    fn store_follow_list(&self, event: &Event);

    /// [`store_event`](EventStore::store_event) plus the latest-per-author
    /// entry matching the event's kind.
    fn ingest(&self, event: &Event);

    fn get_event_by_id(&self, id: &EventId) -> Option<Event>;

    fn get_profile_local(&self, author: Pubkey64) -> Option<Event>;

    fn get_follow_list_local(&self, author: Pubkey64) -> Option<Event>;

    /// `limit == None` returns the `since..=until` window; `Some(n)` returns
    /// the `n` most recently inserted events and ignores the window.
    fn get_latest_events(&self, since: i64, until: i64, limit: Option<u64>) -> Vec<Event>;

    fn add_resend_needed_event(&self, dest_ids: &BTreeSet<Pubkey64>, event: &Event, log: bool);

    fn remove_resend_needed_event(&self, record: &ResendRecord, event: &Event);

    fn resend_needed_events(&self) -> SnapshotIter<ResendRecord>;
}

/// Log a failed store operation and fall back to the type's empty value.
fn swallow<T: Default>(op: &'static str, res: Result<T>) -> T {
    res.unwrap_or_else(|e| {
        tracing::error!(op, error = %e, "store operation failed");
        T::default()
    })
}

impl EventStore for Database {
    fn store_event(&self, event: &Event) {
        swallow("store_event", self.try_store_event(event))
    }

    fn store_profile(&self, event: &Event) {
        swallow("store_profile", self.try_store_profile(event))
    }

    fn store_follow_list(&self, event: &Event) {
        swallow("store_follow_list", self.try_store_follow_list(event))
    }

    fn ingest(&self, event: &Event) {
        swallow("ingest", self.try_ingest(event))
    }

    fn get_event_by_id(&self, id: &EventId) -> Option<Event> {
        swallow("get_event_by_id", self.try_get_event_by_id(id))
    }

    fn get_profile_local(&self, author: Pubkey64) -> Option<Event> {
        swallow("get_profile_local", self.try_get_profile_local(author))
    }

    fn get_follow_list_local(&self, author: Pubkey64) -> Option<Event> {
        swallow("get_follow_list_local", self.try_get_follow_list_local(author))
    }

    fn get_latest_events(&self, since: i64, until: i64, limit: Option<u64>) -> Vec<Event> {
        swallow(
            "get_latest_events",
            self.try_get_latest_events(since, until, limit),
        )
    }

    fn add_resend_needed_event(&self, dest_ids: &BTreeSet<Pubkey64>, event: &Event, log: bool) {
        swallow(
            "add_resend_needed_event",
            self.try_add_resend_needed_event(dest_ids, event, log).map(|_| ()),
        )
    }

    fn remove_resend_needed_event(&self, record: &ResendRecord, event: &Event) {
        swallow(
            "remove_resend_needed_event",
            self.try_remove_resend_needed_event(record, event).map(|_| ()),
        )
    }

    fn resend_needed_events(&self) -> SnapshotIter<ResendRecord> {
        swallow("resend_needed_events", self.try_resend_needed_events())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{event, event_of_kind, timestamps};
    use crate::index::{ID_INDEX, TIME_INDEX};
    use murmur_shared::constants::{KIND_FOLLOW_LIST, KIND_PROFILE};

    fn store() -> Box<dyn EventStore> {
        Box::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn test_facade_round_trip() {
        let store = store();
        let evt = event(3, 42, "via facade");
        store.store_event(&evt);

        assert_eq!(store.get_event_by_id(&evt.id), Some(evt));
        assert!(store.get_event_by_id(&EventId([0; 32])).is_none());
    }

    #[test]
    fn test_facade_profile_lifecycle() {
        let store = store();
        let p1 = event_of_kind(8, 10, KIND_PROFILE, r#"{"name":"a"}"#);
        let p2 = event_of_kind(8, 20, KIND_PROFILE, r#"{"name":"b"}"#);
        for p in [&p1, &p2] {
            store.store_event(p);
            store.store_profile(p);
        }

        assert_eq!(store.get_profile_local(p1.author_key()), Some(p2));
        assert!(store.get_profile_local(Pubkey64(1)).is_none());
    }

    #[test]
    fn test_facade_follow_list_lifecycle() {
        let store = store();
        let f1 = event_of_kind(9, 10, KIND_FOLLOW_LIST, "a");
        let f2 = event_of_kind(9, 20, KIND_FOLLOW_LIST, "a b");
        for f in [&f1, &f2] {
            store.store_event(f);
            store.store_follow_list(f);
        }

        assert_eq!(store.get_follow_list_local(f1.author_key()), Some(f2));
        assert!(store.get_follow_list_local(Pubkey64(1)).is_none());
        assert!(store.get_profile_local(f1.author_key()).is_none());
    }

    #[test]
    fn test_facade_windows() {
        let store = store();
        for ts in [10, 20, 30, 40] {
            store.store_event(&event(1, ts, "n"));
        }
        assert_eq!(timestamps(&store.get_latest_events(15, 35, None)), vec![20, 30]);
        assert_eq!(timestamps(&store.get_latest_events(0, 0, Some(1))), vec![40]);
    }

    #[test]
    fn test_facade_resend_lifecycle() {
        let store = store();
        let evt = event(1, 5, "r");
        let dests: BTreeSet<Pubkey64> = [Pubkey64(0xA), Pubkey64(0xB)].into();
        store.add_resend_needed_event(&dests, &evt, false);

        let mut it = store.resend_needed_events();
        assert!(it.advance());
        let record = it.current().cloned().unwrap();
        assert_eq!(record.dest_ids, dests);

        store.remove_resend_needed_event(&record, &evt);
        assert!(store.resend_needed_events().is_empty());
    }

    #[test]
    fn test_corrupt_data_degrades_to_empty() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.zadd(TIME_INDEX, 7.0, b"not an event")?;
            tx.put(ID_INDEX, &[9u8; 32], &7i64.to_be_bytes())
        })
        .unwrap();

        assert!(db.try_get_latest_events(0, 10, None).is_err());
        assert!(db.get_latest_events(0, 10, None).is_empty());
        assert!(db.get_event_by_id(&EventId([9; 32])).is_none());
    }
}
