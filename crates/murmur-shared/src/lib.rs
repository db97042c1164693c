//! # murmur-shared
//!
//! Types shared by every Murmur crate: the event schema and its binary
//! codec, identifier types, node identity and protocol constants.

pub mod constants;
pub mod error;
pub mod event;
pub mod identity;
pub mod types;

pub use error::{CodecError, IdentityError};
pub use event::{Event, ProfileContent, ResendRecord};
pub use types::{EventId, Pubkey, Pubkey64};
