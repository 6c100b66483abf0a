//! Foundation types for xkey.
//!
//! This crate provides the value types shared by every other xkey crate: the
//! fixed-length digest of a secondary key, the host's opaque object handle,
//! and the expiry record the purge engine reads and rearms.
//!
//! # Key Types
//!
//! - [`KeyDigest`]: 32-byte digest of a secondary key, ordered byte-wise
//! - [`ObjectHandle`]: Stable host-assigned identity of one cached object
//! - [`Expiry`]: Origin time plus ttl/grace/keep windows, in seconds
//! - [`PurgeMode`]: Hard or soft invalidation

pub mod digest;
pub mod expiry;
pub mod handle;

pub use digest::{KeyDigest, DIGEST_LEN};
pub use expiry::{Expiry, PurgeMode};
pub use handle::ObjectHandle;
