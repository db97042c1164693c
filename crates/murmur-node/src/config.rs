//! Node configuration loaded from environment variables.
//!
//! All settings have sensible defaults so a node can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use murmur_shared::constants::{
    DEFAULT_DB_CACHE_KIB, DEFAULT_HTTP_ADDR, DEFAULT_RESEND_INTERVAL_SECS, SECRET_KEY_SIZE,
};
use murmur_shared::identity::Identity;
use murmur_shared::CodecError;

/// Node configuration.
#[derive(Clone)]
pub struct NodeConfig {
    /// Socket address for the HTTP ingress API.
    /// Env: `HTTP_ADDR`
    /// Default: `127.0.0.1:20080`
    pub http_addr: SocketAddr,

    /// Base directory for node data. The database lives in a sub-directory
    /// named after the node's author key.
    /// Env: `DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Ed25519 secret key of this node (hex-encoded, 64 chars).
    /// Env: `SECRET_KEY`
    /// Default: a fresh key per run.
    pub secret_key: Option<[u8; SECRET_KEY_SIZE]>,

    /// SQLite page cache budget in KiB.
    /// Env: `DB_CACHE_KIB`
    /// Default: 32 MiB.
    pub db_cache_kib: u32,

    /// Delay between resend sweeps.
    /// Env: `RESEND_INTERVAL_SECS`
    /// Default: 30 seconds.
    pub resend_interval: Duration,
}

impl std::fmt::Debug for NodeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeConfig")
            .field("http_addr", &self.http_addr)
            .field("data_dir", &self.data_dir)
            .field("secret_key", &self.secret_key.map(|_| "<redacted>"))
            .field("db_cache_kib", &self.db_cache_kib)
            .field("resend_interval", &self.resend_interval)
            .finish()
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            http_addr: DEFAULT_HTTP_ADDR
                .parse()
                .unwrap_or_else(|_| ([127, 0, 0, 1], 20080).into()),
            data_dir: None,
            secret_key: None,
            db_cache_kib: DEFAULT_DB_CACHE_KIB,
            resend_interval: Duration::from_secs(DEFAULT_RESEND_INTERVAL_SECS),
        }
    }
}

impl NodeConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Some(dir) = lookup("DATA_DIR") {
            if !dir.is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(hex_key) = lookup("SECRET_KEY") {
            match parse_hex_secret(&hex_key) {
                Ok(key) => config.secret_key = Some(key),
                Err(e) => {
                    tracing::warn!(error = %e, "Invalid SECRET_KEY, a fresh key will be generated");
                }
            }
        }

        if let Some(val) = lookup("DB_CACHE_KIB") {
            match val.parse::<u32>() {
                Ok(n) if n > 0 => config.db_cache_kib = n,
                _ => tracing::warn!(value = %val, "Invalid DB_CACHE_KIB, using default"),
            }
        }

        if let Some(val) = lookup("RESEND_INTERVAL_SECS") {
            match val.parse::<u64>() {
                Ok(n) if n > 0 => config.resend_interval = Duration::from_secs(n),
                _ => tracing::warn!(value = %val, "Invalid RESEND_INTERVAL_SECS, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// The node identity: the configured key, or a new one.
    pub fn identity(&self) -> Identity {
        match &self.secret_key {
            Some(secret) => Identity::from_secret_bytes(secret),
            None => {
                let identity = Identity::generate();
                tracing::warn!(
                    pubkey = %identity.pubkey(),
                    "No SECRET_KEY configured, generated an ephemeral identity"
                );
                identity
            }
        }
    }
}

/// Parse a 64-character hex string into a 32-byte secret.
fn parse_hex_secret(hex_key: &str) -> Result<[u8; SECRET_KEY_SIZE], CodecError> {
    Identity::from_secret_hex(hex_key).map(|identity| *identity.secret_bytes())
}
