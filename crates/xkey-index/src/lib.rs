//! Secondary-key index for xkey.
//!
//! Tags cached objects with application-defined keys and finds every object
//! sharing a key in one lookup. Two ordered trees, one by key digest and one
//! by object handle, index buckets of association links; both must always
//! reach the same links. Retired nodes go through a small bounded pool so a
//! steady insert/remove load does not churn the allocator.
//!
//! # Key Types
//!
//! - [`XkeyIndex`] -- The dual index with tag, untag, purge and drain
//! - [`Pool`] -- Bounded free list of retired nodes
//! - [`IndexStats`] -- Live and parked node counts
//! - [`IndexError`] -- Consistency violations reported by [`XkeyIndex::verify`]

pub mod arena;
pub mod bucket;
pub mod error;
pub mod index;
pub mod pool;
pub mod stats;

pub use bucket::{KeyBucket, KeyBucketId, Link, LinkId, ObjectBucket, ObjectBucketId};
pub use error::{IndexError, IndexResult};
pub use index::XkeyIndex;
pub use pool::{Pool, Recycle, DEFAULT_POOL_CAPACITY};
pub use stats::IndexStats;
