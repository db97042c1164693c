//! Resend queue: events some destinations have not acknowledged yet.
//!
//! Records are members of a score-ordered set scored by the event's
//! `created_at`. A record is identified by its whole encoded value, so the
//! caller removes a record by handing back the same logical record it added.
//! Adding a record that differs only in its destination set creates a
//! second entry; the queue does no per-event deduplication.

use std::collections::BTreeSet;

use murmur_shared::{Event, Pubkey64, ResendRecord};

use crate::database::Database;
use crate::error::Result;
use crate::index::{self, RESEND_QUEUE};
use crate::itr::SnapshotIter;

impl Database {
    /// Queue `event` for redelivery to `dest_ids`. Returns the stored record,
    /// which is what [`Database::try_remove_resend_needed_event`] expects back.
    pub fn try_add_resend_needed_event(
        &self,
        dest_ids: &BTreeSet<Pubkey64>,
        event: &Event,
        log: bool,
    ) -> Result<ResendRecord> {
        let record = ResendRecord::new(dest_ids.iter().copied(), event);
        let encoded = record.encode()?;
        self.update(|tx| tx.zadd(RESEND_QUEUE, index::score(record.created_at), &encoded))?;

        if log {
            tracing::info!(
                id = %record.event_id,
                destinations = record.dest_ids.len(),
                "queued event for resend"
            );
        }
        Ok(record)
    }

    /// Drop `record` from the queue. A record whose destination set differs
    /// from the stored one is a miss, reported as `false`.
    pub fn try_remove_resend_needed_event(
        &self,
        record: &ResendRecord,
        event: &Event,
    ) -> Result<bool> {
        if record.event_id != event.id {
            tracing::warn!(
                record = %record.event_id,
                event = %event.id,
                "resend record does not belong to the given event"
            );
        }

        let encoded = record.encode()?;
        let removed = self.update(|tx| tx.zrem(RESEND_QUEUE, &encoded))?;

        tracing::debug!(id = %record.event_id, removed, "resend record removal");
        Ok(removed)
    }

    /// Swap `record` for one owed only to `remaining`, in one transaction.
    ///
    /// Returns the new record, or `None` when `record` was no longer queued;
    /// nothing is added in that case. An empty `remaining` just removes.
    pub fn try_replace_resend_needed_event(
        &self,
        record: &ResendRecord,
        remaining: &BTreeSet<Pubkey64>,
        event: &Event,
    ) -> Result<Option<ResendRecord>> {
        let old = record.encode()?;
        let narrowed = ResendRecord::new(remaining.iter().copied(), event);
        let new = narrowed.encode()?;

        let replaced = self.update(|tx| {
            if !tx.zrem(RESEND_QUEUE, &old)? {
                return Ok(false);
            }
            if !narrowed.dest_ids.is_empty() {
                tx.zadd(RESEND_QUEUE, index::score(narrowed.created_at), &new)?;
            }
            Ok(true)
        })?;

        tracing::debug!(
            id = %record.event_id,
            replaced,
            remaining = narrowed.dest_ids.len(),
            "resend record narrowed"
        );
        Ok(replaced.then_some(narrowed))
    }

    /// Snapshot of the whole queue, oldest event first.
    pub fn try_resend_needed_events(&self) -> Result<SnapshotIter<ResendRecord>> {
        let entries = self.view(|tx| tx.zrange_by_score(RESEND_QUEUE, 0.0, f64::MAX))?;

        let records = entries
            .iter()
            .map(|entry| ResendRecord::decode(&entry.member))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(SnapshotIter::new(records))
    }
}
