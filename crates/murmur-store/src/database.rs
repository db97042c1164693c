//! Database connection management.
//!
//! The [`Database`] struct owns a [`rusqlite::Connection`] and guarantees that
//! migrations are run before any other operation. All access goes through
//! [`Database::view`] and [`Database::update`], which hand the closure a
//! [`Tx`] scoped to a single SQLite transaction.
//!
//! The connection sits behind a mutex, so the handle can be shared across
//! threads (`Arc<Database>`); transactions from different callers are
//! serialized.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use directories::ProjectDirs;
use murmur_shared::constants::DEFAULT_DB_CACHE_KIB;
use murmur_shared::Pubkey64;
use rusqlite::{Connection, TransactionBehavior};

use crate::error::{Result, StoreError};
use crate::kv::Tx;
use crate::migrations;

/// File name of the event database inside a node's data directory.
const DB_FILE_NAME: &str = "murmur.db";

/// Tunables applied when the database is opened.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    /// SQLite page cache budget in KiB.
    pub cache_kib: u32,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            cache_kib: DEFAULT_DB_CACHE_KIB,
        }
    }
}

/// Wrapper around a [`rusqlite::Connection`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) the event database of the node whose author key is
    /// `owner`, in the platform data directory:
    /// - Linux:   `~/.local/share/murmur/<owner-hex>/murmur.db`
    /// - macOS:   `~/Library/Application Support/org.murmur.murmur/<owner-hex>/murmur.db`
    /// - Windows: `{FOLDERID_RoamingAppData}\murmur\murmur\data\<owner-hex>\murmur.db`
    pub fn new(owner: Pubkey64, options: &StoreOptions) -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("org", "murmur", "murmur").ok_or(StoreError::NoDataDir)?;

        Self::open_in(project_dirs.data_dir(), owner, options)
    }

    /// Open (or create) the database of `owner` under an explicit base
    /// directory. Each node keeps its data in a sub-directory named after
    /// its author key so several nodes can share one base directory.
    pub fn open_in(base_dir: &Path, owner: Pubkey64, options: &StoreOptions) -> Result<Self> {
        let node_dir = base_dir.join(owner.to_hex());
        std::fs::create_dir_all(&node_dir)?;

        let db_path = node_dir.join(DB_FILE_NAME);

        tracing::info!(path = %db_path.display(), owner = %owner, "opening event database");

        Self::open_at(&db_path, options)
    }

    /// Open (or create) a database at an explicit path.
    pub fn open_at(path: &Path, options: &StoreOptions) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::from_connection(conn, options)
    }

    /// Open a throwaway in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::from_connection(conn, &StoreOptions::default())
    }

    fn from_connection(conn: Connection, options: &StoreOptions) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        // Negative cache_size is interpreted by SQLite as KiB.
        conn.pragma_update(None, "cache_size", -i64::from(options.cache_kib))?;

        migrations::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Run `f` inside a read transaction. Writes through the handed-out
    /// [`Tx`] fail with [`StoreError::ReadOnly`].
    pub fn view<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tx<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = Tx::read(conn.transaction_with_behavior(TransactionBehavior::Deferred)?);
        // Dropping the transaction rolls it back; nothing was written.
        f(&tx)
    }

    /// Run `f` inside a write transaction. The transaction commits when `f`
    /// returns `Ok` and rolls back otherwise.
    pub fn update<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Tx<'_>) -> Result<T>,
    {
        let mut conn = self.lock()?;
        let tx = Tx::write(conn.transaction_with_behavior(TransactionBehavior::Immediate)?);
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Return the filesystem path of the open database (if any).
    pub fn path(&self) -> Option<PathBuf> {
        let conn = self.lock().ok()?;
        conn.path()
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
    }
}
