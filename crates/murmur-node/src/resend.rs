//! Periodic redelivery of events some peers have not confirmed.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use murmur_shared::Pubkey64;
use murmur_store::{Database, StoreError};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::broadcast::Broadcaster;

/// Outcome of one pass over the resend queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub scanned: usize,
    /// Records whose every destination confirmed; removed.
    pub delivered: usize,
    /// Records still waiting on at least one peer.
    pub pending: usize,
    /// Records pointing at an event the store no longer resolves.
    pub orphaned: usize,
}

/// Walk a snapshot of the resend queue once.
///
/// Each record is offered to the broadcaster again. A record that is fully
/// delivered is removed; one that made partial progress is replaced, in the
/// same transaction, by a record for the peers still outstanding. Removal
/// needs the event itself, so records whose event cannot be found stay
/// queued.
pub fn sweep_once(store: &Database, broadcaster: &dyn Broadcaster) -> Result<SweepStats, StoreError> {
    let mut stats = SweepStats::default();
    let mut queue = store.try_resend_needed_events()?;

    while queue.advance() {
        let Some(record) = queue.current() else {
            break;
        };
        stats.scanned += 1;

        let Some(event) = store.try_get_event_by_id(&record.event_id)? else {
            tracing::warn!(
                id = %record.event_id,
                destinations = record.dest_ids.len(),
                "resend record refers to an unknown event"
            );
            stats.orphaned += 1;
            continue;
        };

        // Only peers we were waiting on can still be owed.
        let remaining: BTreeSet<Pubkey64> = broadcaster
            .redeliver(record, &event)
            .intersection(&record.dest_ids)
            .copied()
            .collect();

        if remaining == record.dest_ids {
            stats.pending += 1;
            continue;
        }

        if store
            .try_replace_resend_needed_event(record, &remaining, &event)?
            .is_none()
        {
            // Removed by someone else since the snapshot was taken.
            continue;
        }
        if remaining.is_empty() {
            stats.delivered += 1;
        } else {
            stats.pending += 1;
        }
    }

    Ok(stats)
}

/// Run [`sweep_once`] every `every` on the blocking pool.
pub fn spawn_sweeper(
    store: Arc<Database>,
    broadcaster: Arc<dyn Broadcaster>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let store = store.clone();
            let broadcaster = broadcaster.clone();
            let result =
                tokio::task::spawn_blocking(move || sweep_once(&store, broadcaster.as_ref())).await;

            match result {
                Ok(Ok(stats)) if stats.scanned > 0 => tracing::debug!(
                    scanned = stats.scanned,
                    delivered = stats.delivered,
                    pending = stats.pending,
                    orphaned = stats.orphaned,
                    "resend sweep finished"
                ),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => tracing::error!(error = %e, "resend sweep failed"),
                Err(e) => tracing::error!(error = %e, "resend sweep task panicked"),
            }
        }
    })
}
