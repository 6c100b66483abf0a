//! Error types for the index crate.
//!
//! Mutation paths never return these: a broken invariant there is fatal and
//! panics. They are produced by [`XkeyIndex::verify`], which audits the whole
//! structure and reports the first violation it finds.
//!
//! [`XkeyIndex::verify`]: crate::XkeyIndex::verify

use xkey_types::{KeyDigest, ObjectHandle};

/// Consistency violations found by an index audit.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IndexError {
    /// A key bucket is reachable from the key tree but has no links.
    #[error("empty key bucket for digest {0}")]
    EmptyKeyBucket(KeyDigest),

    /// An object bucket is reachable from the object tree but has no links.
    #[error("empty object bucket for {0}")]
    EmptyObjectBucket(ObjectHandle),

    /// A tree entry and the bucket it points at disagree on their key.
    #[error("{tree} tree entry {key} points at a bucket keyed {found}")]
    TreeKeyMismatch {
        tree: &'static str,
        key: String,
        found: String,
    },

    /// A key bucket's chain is malformed.
    #[error("broken link chain for digest {digest}: {reason}")]
    BrokenChain { digest: KeyDigest, reason: String },

    /// A link's back-references disagree with the bucket holding it.
    #[error("link {link} inconsistent: {reason}")]
    LinkMismatch { link: usize, reason: String },

    /// Arena nodes not reachable from either tree.
    #[error("{count} orphaned {kind} node(s)")]
    Orphaned { kind: &'static str, count: usize },

    /// The link sets reachable from the two trees differ.
    #[error("link sets differ: {via_keys} via key tree, {via_objects} via object tree, {total} allocated")]
    LinkSetMismatch {
        via_keys: usize,
        via_objects: usize,
        total: usize,
    },
}

/// Convenience alias for index results.
pub type IndexResult<T> = Result<T, IndexError>;
