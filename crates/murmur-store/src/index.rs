//! Bucket layout and the pointer format shared by the secondary indexes.
//!
//! | bucket                | structure          | key / member          | value / score   |
//! |-----------------------|--------------------|-----------------------|-----------------|
//! | `events_by_time`      | score-ordered set  | encoded [`Event`]     | `created_at`    |
//! | `event_time_by_id`    | ordered map        | event id (32 bytes)   | `created_at`    |
//! | `latest_profile`      | ordered map        | author key (8 bytes)  | `created_at`    |
//! | `latest_follow_list`  | ordered map        | author key (8 bytes)  | `created_at`    |
//! | `insertion_ledger`    | append-only list   | -                     | `created_at`    |
//! | `resend_queue`        | score-ordered set  | encoded [`ResendRecord`] | `created_at` |
//!
//! Secondary indexes never hold event bodies, only the creation timestamp,
//! which is then resolved against `events_by_time`. Timestamps are stored as
//! 8-byte big-endian signed integers.
//!
//! [`ResendRecord`]: murmur_shared::ResendRecord

use murmur_shared::Event;

use crate::error::{Result, StoreError};
use crate::kv::Tx;

pub const TIME_INDEX: &str = "events_by_time";
pub const ID_INDEX: &str = "event_time_by_id";
pub const PROFILE_INDEX: &str = "latest_profile";
pub const FOLLOW_LIST_INDEX: &str = "latest_follow_list";
pub const LEDGER: &str = "insertion_ledger";
pub const RESEND_QUEUE: &str = "resend_queue";

pub(crate) fn encode_ts(ts: i64) -> [u8; 8] {
    ts.to_be_bytes()
}

pub(crate) fn decode_ts(bucket: &'static str, bytes: &[u8]) -> Result<i64> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| StoreError::CorruptIndex {
        bucket,
        len: bytes.len(),
    })?;
    Ok(i64::from_be_bytes(arr))
}

pub(crate) fn score(ts: i64) -> f64 {
    ts as f64
}

/// Resolve a timestamp pointer against the time index.
///
/// Several events may share a timestamp, so the candidates at that score are
/// decoded in insertion order and the first one accepted by `wanted` wins.
/// Candidates that fail to decode are skipped.
/// `None` means the time index holds no matching event (the pointer has
/// drifted from the primary store).
pub(crate) fn resolve_at<F>(tx: &Tx<'_>, ts: i64, wanted: F) -> Result<Option<Event>>
where
    F: Fn(&Event) -> bool,
{
    let at = score(ts);
    for entry in tx.zrange_by_score(TIME_INDEX, at, at)? {
        let event = match Event::decode(&entry.member) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(created_at = ts, error = %e, "skipping undecodable event");
                continue;
            }
        };
        if wanted(&event) {
            return Ok(Some(event));
        }
    }

    tracing::warn!(created_at = ts, "index points at a timestamp with no matching event");
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ts_roundtrip_including_negative() {
        for ts in [0, 1, -1, i64::MIN, i64::MAX, 1_700_000_000] {
            assert_eq!(decode_ts(LEDGER, &encode_ts(ts)).unwrap(), ts);
        }
    }

    #[test]
    fn test_resolve_skips_corrupt_neighbour() {
        let db = crate::Database::open_in_memory().unwrap();
        let healthy = crate::fixtures::event(2, 70, "healthy");
        db.update(|tx| tx.zadd(TIME_INDEX, score(70), b"garbage at the same second"))
            .unwrap();
        db.try_store_event(&healthy).unwrap();

        let found = db
            .view(|tx| resolve_at(tx, 70, |e| e.id == healthy.id))
            .unwrap();
        assert_eq!(found, Some(healthy.clone()));
        assert_eq!(db.try_get_event_by_id(&healthy.id).unwrap(), Some(healthy));
    }

    #[test]
    fn test_decode_ts_rejects_wrong_length() {
        assert!(matches!(
            decode_ts(ID_INDEX, &[1, 2, 3]),
            Err(StoreError::CorruptIndex { bucket: ID_INDEX, len: 3 })
        ));
    }
}
