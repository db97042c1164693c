//! v001 -- Key-value substrate.
//!
//! Creates the three primitive structures every index is built from: an
//! ordered map, a score-ordered set and an append-only list. Each row carries
//! the name of the bucket it belongs to.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Ordered map: (bucket, key) -> value
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS kv_btree (
    bucket TEXT NOT NULL,
    key    BLOB NOT NULL,
    value  BLOB NOT NULL,

    PRIMARY KEY (bucket, key)
) WITHOUT ROWID;

-- ----------------------------------------------------------------
-- Score-ordered set: members are unique per bucket, `seq` keeps the
-- first-insertion order for members sharing a score
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS kv_zset (
    seq    INTEGER PRIMARY KEY AUTOINCREMENT,
    bucket TEXT NOT NULL,
    member BLOB NOT NULL,
    score  REAL NOT NULL,

    UNIQUE (bucket, member)
);

CREATE INDEX IF NOT EXISTS idx_kv_zset_score
    ON kv_zset(bucket, score, seq);

-- ----------------------------------------------------------------
-- Append-only list: (bucket, idx) -> value, idx dense from 0
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS kv_list (
    bucket TEXT NOT NULL,
    idx    INTEGER NOT NULL,
    value  BLOB NOT NULL,

    PRIMARY KEY (bucket, idx)
) WITHOUT ROWID;
"#;

/// Apply the substrate migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
