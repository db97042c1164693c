//! Time index, identity index and the insertion-order ledger.
//!
//! Every generic event lands in three places: its encoded body in the time
//! index (scored by `created_at`), an `id -> created_at` pointer in the
//! identity index, and a `created_at` entry appended to the ledger. The three
//! writes share one write transaction, so readers never observe a partially
//! indexed event.

use murmur_shared::{Event, EventId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::index::{self, ID_INDEX, LEDGER, TIME_INDEX};
use crate::kv::Tx;
use crate::latest;

impl Database {
    pub fn try_store_event(&self, event: &Event) -> Result<()> {
        let encoded = event.encode()?;
        self.update(|tx| write_event(tx, event, &encoded))?;

        tracing::debug!(
            id = %event.id,
            created_at = event.created_at,
            kind = event.kind,
            "stored event"
        );
        Ok(())
    }

    /// Store an event and, for profile and follow-list kinds, point the
    /// author's latest-per-author entry at it, all in one transaction.
    pub fn try_ingest(&self, event: &Event) -> Result<()> {
        let encoded = event.encode()?;
        self.update(|tx| {
            write_event(tx, event, &encoded)?;
            if event.is_profile() {
                latest::write_latest(tx, index::PROFILE_INDEX, event)?;
            } else if event.is_follow_list() {
                latest::write_latest(tx, index::FOLLOW_LIST_INDEX, event)?;
            }
            Ok(())
        })?;

        tracing::debug!(
            id = %event.id,
            author = %event.author_key(),
            kind = event.kind,
            "ingested event"
        );
        Ok(())
    }

    pub fn try_get_event_by_id(&self, id: &EventId) -> Result<Option<Event>> {
        self.view(|tx| {
            let Some(raw) = tx.get(ID_INDEX, id.as_bytes())? else {
                return Ok(None);
            };
            let ts = index::decode_ts(ID_INDEX, &raw)?;
            index::resolve_at(tx, ts, |e| e.id == *id)
        })
    }

    /// Events for a time window or a "latest N" request.
    ///
    /// With `limit == None` this returns every event whose `created_at` lies
    /// in `since..=until`, ascending.
    ///
    /// With `limit == Some(n)` the window is ignored. The lower bound becomes
    /// the timestamp of the `n`-th most recently *inserted* event (or the
    /// beginning of time when fewer than `n` events exist) and the upper
    /// bound is open. Because the bound comes from insertion order, events
    /// stored out of timestamp order can make the result hold more or fewer
    /// than `n` events.
    ///
    /// `Some(0)` yields nothing at all; it is not read as a zero offset into
    /// the ledger.
    pub fn try_get_latest_events(
        &self,
        since: i64,
        until: i64,
        limit: Option<u64>,
    ) -> Result<Vec<Event>> {
        self.view(|tx| match limit {
            None => scan(tx, index::score(since), index::score(until)),
            Some(0) => Ok(Vec::new()),
            Some(n) => {
                let floor = window_floor(tx, n)?;
                scan(tx, floor, f64::MAX)
            }
        })
    }

    /// Number of events ever stored through the generic path.
    pub fn try_ledger_len(&self) -> Result<u64> {
        self.view(|tx| tx.lsize(LEDGER))
    }
}

fn write_event(tx: &Tx<'_>, event: &Event, encoded: &[u8]) -> Result<()> {
    let ts = index::encode_ts(event.created_at);
    tx.zadd(TIME_INDEX, index::score(event.created_at), encoded)?;
    tx.put(ID_INDEX, event.id.as_bytes(), &ts)?;
    let ledger_len = tx.rpush(LEDGER, &ts)?;
    tracing::trace!(ledger_len, "appended to insertion ledger");
    Ok(())
}

fn scan(tx: &Tx<'_>, min: f64, max: f64) -> Result<Vec<Event>> {
    tx.zrange_by_score(TIME_INDEX, min, max)?
        .iter()
        .map(|entry| Event::decode(&entry.member).map_err(StoreError::from))
        .collect()
}

/// Lower score bound for the `n` most recently inserted events. `n > 0`.
fn window_floor(tx: &Tx<'_>, n: u64) -> Result<f64> {
    let len = tx.lsize(LEDGER)?;
    if len <= n {
        return Ok(f64::MIN);
    }

    // n < len, so the tail offset fits.
    let offset = -(n as i64);
    match tx.lrange(LEDGER, offset, offset)?.first() {
        Some(raw) => Ok(index::score(index::decode_ts(LEDGER, raw)?)),
        None => {
            tracing::warn!(len, limit = n, "ledger shorter than reported; returning everything");
            Ok(f64::MIN)
        }
    }
}
