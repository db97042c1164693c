//! # murmur-store
//!
//! Local event store for a Murmur node, backed by SQLite.
//!
//! Events and their secondary indexes (by time, by id, latest profile and
//! follow list per author, insertion ledger, resend queue) are all built on
//! a small ordered key-value substrate (see [`kv`]). The crate exposes a
//! synchronous [`Database`] handle with fallible `try_*` operations and the
//! best-effort [`EventStore`] facade used by the rest of the node.

pub mod database;
pub mod events;
pub mod index;
pub mod itr;
pub mod kv;
pub mod latest;
pub mod manager;
pub mod migrations;
pub mod resend;

mod error;

#[cfg(test)]
mod fixtures;

pub use database::{Database, StoreOptions};
pub use error::{Result, StoreError};
pub use itr::SnapshotIter;
pub use manager::EventStore;
