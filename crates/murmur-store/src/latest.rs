//! Latest-per-author indexes for profiles and follow lists.
//!
//! Each index maps an author's 64-bit key to the `created_at` of the most
//! recently stored event of that category. Storing overwrites; there is at
//! most one entry per author. The event body itself lives only in the time
//! index, so a lookup resolves the pointer there.

use murmur_shared::{Event, Pubkey64};

use crate::database::Database;
use crate::error::Result;
use crate::index::{self, FOLLOW_LIST_INDEX, PROFILE_INDEX};
use crate::kv::Tx;

impl Database {
    pub fn try_store_profile(&self, event: &Event) -> Result<()> {
        self.update(|tx| write_latest(tx, PROFILE_INDEX, event))
    }

    pub fn try_store_follow_list(&self, event: &Event) -> Result<()> {
        self.update(|tx| write_latest(tx, FOLLOW_LIST_INDEX, event))
    }

    pub fn try_get_profile_local(&self, author: Pubkey64) -> Result<Option<Event>> {
        self.read_latest(PROFILE_INDEX, author)
    }

    pub fn try_get_follow_list_local(&self, author: Pubkey64) -> Result<Option<Event>> {
        self.read_latest(FOLLOW_LIST_INDEX, author)
    }

    fn read_latest(&self, bucket: &'static str, author: Pubkey64) -> Result<Option<Event>> {
        self.view(|tx| {
            let Some(raw) = tx.get(bucket, &author.to_key())? else {
                return Ok(None);
            };
            let ts = index::decode_ts(bucket, &raw)?;
            index::resolve_at(tx, ts, |e| e.author_key() == author)
        })
    }
}

/// Point `event`'s author entry in `bucket` at `event.created_at`,
/// replacing whatever was there.
pub(crate) fn write_latest(tx: &Tx<'_>, bucket: &'static str, event: &Event) -> Result<()> {
    let author = event.author_key();
    tx.put(bucket, &author.to_key(), &index::encode_ts(event.created_at))?;

    tracing::debug!(
        bucket,
        author = %author,
        created_at = event.created_at,
        "updated latest-per-author index"
    );
    Ok(())
}
