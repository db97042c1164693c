//! Ordered key-value substrate.
//!
//! Three primitive structures, each addressed by a bucket name:
//!
//! - **ordered map** (`get` / `put`): byte keys in lexicographic order,
//!   `put` overwrites.
//! - **score-ordered set** (`zadd` / `zrem` / `zrange_by_score`): members
//!   are unique per bucket, re-adding a member only moves its score. Range
//!   scans return members by ascending score; members sharing a score come
//!   back in first-insertion order.
//! - **append-only list** (`rpush` / `lsize` / `lrange`): dense indices from
//!   zero, ranges accept negative tail-relative indices (`-1` is the last
//!   element).
//!
//! A [`Tx`] is only ever handed out by [`Database::view`] or
//! [`Database::update`].
//!
//! [`Database::view`]: crate::Database::view
//! [`Database::update`]: crate::Database::update

use rusqlite::{params, OptionalExtension, Transaction};

use crate::error::{Result, StoreError};

const LIST_TAIL_SQL: &str =
    "SELECT idx FROM kv_list WHERE bucket = ?1 ORDER BY idx DESC LIMIT 1";

/// A member of a score-ordered set together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub score: f64,
    pub member: Vec<u8>,
}

/// A transaction scope over the substrate.
pub struct Tx<'conn> {
    inner: Transaction<'conn>,
    writable: bool,
}

impl<'conn> Tx<'conn> {
    pub(crate) fn read(inner: Transaction<'conn>) -> Self {
        Self {
            inner,
            writable: false,
        }
    }

    pub(crate) fn write(inner: Transaction<'conn>) -> Self {
        Self {
            inner,
            writable: true,
        }
    }

    pub(crate) fn commit(self) -> Result<()> {
        self.inner.commit()?;
        Ok(())
    }

    fn ensure_writable(&self, bucket: &'static str) -> Result<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StoreError::ReadOnly(bucket))
        }
    }

    // -----------------------------------------------------------------------
    // Ordered map
    // -----------------------------------------------------------------------

    pub fn get(&self, bucket: &'static str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let value: Option<Vec<u8>> = self
            .inner
            .prepare_cached("SELECT value FROM kv_btree WHERE bucket = ?1 AND key = ?2")?
            .query_row(params![bucket, key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn put(&self, bucket: &'static str, key: &[u8], value: &[u8]) -> Result<()> {
        self.ensure_writable(bucket)?;
        self.inner
            .prepare_cached(
                "INSERT INTO kv_btree (bucket, key, value) VALUES (?1, ?2, ?3)
                 ON CONFLICT (bucket, key) DO UPDATE SET value = excluded.value",
            )?
            .execute(params![bucket, key, value])?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Score-ordered set
    // -----------------------------------------------------------------------

    pub fn zadd(&self, bucket: &'static str, score: f64, member: &[u8]) -> Result<()> {
        self.ensure_writable(bucket)?;
        self.inner
            .prepare_cached(
                "INSERT INTO kv_zset (bucket, member, score) VALUES (?1, ?2, ?3)
                 ON CONFLICT (bucket, member) DO UPDATE SET score = excluded.score",
            )?
            .execute(params![bucket, member, score])?;
        Ok(())
    }

    /// Remove `member` by exact byte match. Returns whether it was present.
    pub fn zrem(&self, bucket: &'static str, member: &[u8]) -> Result<bool> {
        self.ensure_writable(bucket)?;
        let affected = self
            .inner
            .prepare_cached("DELETE FROM kv_zset WHERE bucket = ?1 AND member = ?2")?
            .execute(params![bucket, member])?;
        Ok(affected > 0)
    }

    /// Members with `min <= score <= max`, ascending by score.
    pub fn zrange_by_score(
        &self,
        bucket: &'static str,
        min: f64,
        max: f64,
    ) -> Result<Vec<ScoredMember>> {
        let mut stmt = self.inner.prepare_cached(
            "SELECT score, member FROM kv_zset
             WHERE bucket = ?1 AND score >= ?2 AND score <= ?3
             ORDER BY score ASC, seq ASC",
        )?;

        let rows = stmt.query_map(params![bucket, min, max], |row| {
            Ok(ScoredMember {
                score: row.get(0)?,
                member: row.get(1)?,
            })
        })?;

        let mut members = Vec::new();
        for row in rows {
            members.push(row?);
        }
        Ok(members)
    }

    #[cfg(test)]
    pub(crate) fn zcard(&self, bucket: &'static str) -> Result<u64> {
        let n: i64 = self
            .inner
            .prepare_cached("SELECT COUNT(*) FROM kv_zset WHERE bucket = ?1")?
            .query_row(params![bucket], |row| row.get(0))?;
        Ok(n as u64)
    }

    // -----------------------------------------------------------------------
    // Append-only list
    // -----------------------------------------------------------------------

    /// Append `value` to the tail. Returns the new length.
    pub fn rpush(&self, bucket: &'static str, value: &[u8]) -> Result<u64> {
        self.ensure_writable(bucket)?;
        let len = self.lsize(bucket)?;
        self.inner
            .prepare_cached("INSERT INTO kv_list (bucket, idx, value) VALUES (?1, ?2, ?3)")?
            .execute(params![bucket, len as i64, value])?;
        Ok(len + 1)
    }

    /// Indices are dense from zero, so the length is one past the tail
    /// index: a single primary-key seek, independent of list size.
    pub fn lsize(&self, bucket: &'static str) -> Result<u64> {
        let tail: Option<i64> = self
            .inner
            .prepare_cached(LIST_TAIL_SQL)?
            .query_row(params![bucket], |row| row.get(0))
            .optional()?;
        Ok(tail.map_or(0, |idx| idx as u64 + 1))
    }

    /// Elements `start..=stop`. Negative indices count from the tail;
    /// out-of-range bounds are clamped and an empty range yields nothing.
    pub fn lrange(&self, bucket: &'static str, start: i64, stop: i64) -> Result<Vec<Vec<u8>>> {
        let len = self.lsize(bucket)? as i64;
        let Some((first, last)) = resolve_range(len, start, stop) else {
            return Ok(Vec::new());
        };

        let mut stmt = self.inner.prepare_cached(
            "SELECT value FROM kv_list
             WHERE bucket = ?1 AND idx >= ?2 AND idx <= ?3
             ORDER BY idx ASC",
        )?;
        let rows = stmt.query_map(params![bucket, first, last], |row| row.get::<_, Vec<u8>>(0))?;

        let mut values = Vec::new();
        for row in rows {
            values.push(row?);
        }
        Ok(values)
    }
}

/// Turn a possibly tail-relative inclusive range into absolute indices
/// within a list of `len` elements.
fn resolve_range(len: i64, start: i64, stop: i64) -> Option<(i64, i64)> {
    let start = if start < 0 { (len + start).max(0) } else { start };
    let stop = if stop < 0 { len + stop } else { stop.min(len - 1) };

    if len == 0 || start > stop || start >= len {
        None
    } else {
        Some((start, stop))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    const MAP: &str = "test_map";
    const SET: &str = "test_set";
    const LIST: &str = "test_list";

    #[test]
    fn test_put_overwrites() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.put(MAP, b"k", b"one")?;
            tx.put(MAP, b"k", b"two")
        })
        .unwrap();

        let got = db.view(|tx| tx.get(MAP, b"k")).unwrap();
        assert_eq!(got.as_deref(), Some(&b"two"[..]));
        assert!(db.view(|tx| tx.get(MAP, b"missing")).unwrap().is_none());
    }

    #[test]
    fn test_buckets_are_isolated() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| tx.put("a", b"k", b"v")).unwrap();
        assert!(db.view(|tx| tx.get("b", b"k")).unwrap().is_none());
    }

    #[test]
    fn test_zrange_orders_by_score_then_insertion() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.zadd(SET, 30.0, b"c")?;
            tx.zadd(SET, 10.0, b"a")?;
            tx.zadd(SET, 20.0, b"b2")?;
            tx.zadd(SET, 20.0, b"b1")
        })
        .unwrap();

        let members: Vec<Vec<u8>> = db
            .view(|tx| tx.zrange_by_score(SET, f64::MIN, f64::MAX))
            .unwrap()
            .into_iter()
            .map(|m| m.member)
            .collect();
        assert_eq!(
            members,
            vec![b"a".to_vec(), b"b2".to_vec(), b"b1".to_vec(), b"c".to_vec()]
        );
    }

    #[test]
    fn test_zrange_bounds_are_inclusive() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            for (score, m) in [(1.0, b"1"), (2.0, b"2"), (3.0, b"3")] {
                tx.zadd(SET, score, m)?;
            }
            Ok(())
        })
        .unwrap();

        let hits = db.view(|tx| tx.zrange_by_score(SET, 2.0, 3.0)).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].score, 2.0);

        let exact = db.view(|tx| tx.zrange_by_score(SET, 2.0, 2.0)).unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].member, b"2".to_vec());
    }

    #[test]
    fn test_zadd_same_member_moves_score() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| {
            tx.zadd(SET, 1.0, b"m")?;
            tx.zadd(SET, 5.0, b"m")
        })
        .unwrap();

        let all = db.view(|tx| tx.zrange_by_score(SET, f64::MIN, f64::MAX)).unwrap();
        assert_eq!(all, vec![ScoredMember { score: 5.0, member: b"m".to_vec() }]);
        assert_eq!(db.view(|tx| tx.zcard(SET)).unwrap(), 1);
    }

    #[test]
    fn test_zrem_exact_match() {
        let db = Database::open_in_memory().unwrap();
        db.update(|tx| tx.zadd(SET, 1.0, b"member")).unwrap();

        assert!(!db.update(|tx| tx.zrem(SET, b"membe")).unwrap());
        assert!(db.update(|tx| tx.zrem(SET, b"member")).unwrap());
        assert_eq!(db.view(|tx| tx.zcard(SET)).unwrap(), 0);
    }

    #[test]
    fn test_rpush_and_lrange() {
        let db = Database::open_in_memory().unwrap();
        let len = db
            .update(|tx| {
                for v in [b"a", b"b", b"c", b"d", b"e"] {
                    tx.rpush(LIST, v)?;
                }
                tx.lsize(LIST)
            })
            .unwrap();
        assert_eq!(len, 5);

        let range = |start, stop| db.view(|tx| tx.lrange(LIST, start, stop)).unwrap();
        assert_eq!(range(0, 0), vec![b"a".to_vec()]);
        assert_eq!(range(-1, -1), vec![b"e".to_vec()]);
        assert_eq!(range(-3, -3), vec![b"c".to_vec()]);
        assert_eq!(range(-2, -1), vec![b"d".to_vec(), b"e".to_vec()]);
        assert_eq!(range(3, 100).len(), 2);
        assert_eq!(range(-100, 1).len(), 2);
        assert!(range(4, 2).is_empty());
        assert!(range(10, 12).is_empty());
    }

    #[test]
    fn test_list_length_is_an_index_seek() {
        let db = Database::open_in_memory().unwrap();
        let plan: Vec<String> = db
            .view(|tx| {
                let mut stmt = tx.inner.prepare(&format!("EXPLAIN QUERY PLAN {LIST_TAIL_SQL}"))?;
                let rows = stmt.query_map(params![LIST], |row| row.get::<_, String>(3))?;
                Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
            })
            .unwrap();

        assert!(plan.iter().any(|step| step.starts_with("SEARCH")), "{plan:?}");
        assert!(!plan.iter().any(|step| step.starts_with("SCAN")), "{plan:?}");
    }

    #[test]
    fn test_list_length_tracks_pushes_per_bucket() {
        let db = Database::open_in_memory().unwrap();
        let lens = db
            .update(|tx| {
                let mut lens = Vec::new();
                for i in 0u32..50 {
                    lens.push(tx.rpush(LIST, &i.to_be_bytes())?);
                }
                tx.rpush("other_list", b"x")?;
                Ok(lens)
            })
            .unwrap();

        assert_eq!(lens, (1..=50).collect::<Vec<u64>>());
        assert_eq!(db.view(|tx| tx.lsize(LIST)).unwrap(), 50);
        assert_eq!(db.view(|tx| tx.lsize("other_list")).unwrap(), 1);
        assert_eq!(
            db.view(|tx| tx.lrange(LIST, -1, -1)).unwrap(),
            vec![49u32.to_be_bytes().to_vec()]
        );
    }

    #[test]
    fn test_lrange_on_empty_list() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.view(|tx| tx.lrange(LIST, 0, -1)).unwrap().is_empty());
        assert_eq!(db.view(|tx| tx.lsize(LIST)).unwrap(), 0);
    }

    #[test]
    fn test_resolve_range() {
        assert_eq!(resolve_range(5, -3, -3), Some((2, 2)));
        assert_eq!(resolve_range(5, 0, -1), Some((0, 4)));
        assert_eq!(resolve_range(5, -9, -9), None);
        assert_eq!(resolve_range(0, 0, 0), None);
    }
}
