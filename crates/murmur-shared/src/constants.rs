/// Application name
pub const APP_NAME: &str = "Murmur";

/// Event identifier size in bytes (BLAKE3 digest)
pub const EVENT_ID_SIZE: usize = 32;

/// Ed25519 public key size in bytes
pub const PUBKEY_SIZE: usize = 32;

/// Ed25519 secret key size in bytes
pub const SECRET_KEY_SIZE: usize = 32;

/// Number of trailing public key bytes used as the per-author index key
pub const AUTHOR_KEY_SIZE: usize = 8;

/// Event kind: profile metadata (JSON `{name, about, picture}`)
pub const KIND_PROFILE: u16 = 0;

/// Event kind: plain text note
pub const KIND_TEXT_NOTE: u16 = 1;

/// Event kind: follow list
pub const KIND_FOLLOW_LIST: u16 = 3;

/// Default HTTP ingress address
pub const DEFAULT_HTTP_ADDR: &str = "127.0.0.1:20080";

/// Default SQLite page cache budget in KiB (32 MiB)
pub const DEFAULT_DB_CACHE_KIB: u32 = 32 * 1024;

/// Default interval between resend sweeps in seconds
pub const DEFAULT_RESEND_INTERVAL_SECS: u64 = 30;

/// Key derivation context for event identifiers (BLAKE3)
pub const KDF_CONTEXT_EVENT_ID: &str = "murmur-event-id-v1";
