use std::fmt;

use serde::Serialize;

/// Occupancy snapshot of an index and its pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    /// Live key buckets (distinct digests).
    pub key_buckets: usize,
    /// Live object buckets (distinct tagged objects).
    pub object_buckets: usize,
    /// Live links.
    pub links: usize,
    /// Parked key buckets.
    pub pooled_key_buckets: usize,
    /// Parked object buckets.
    pub pooled_object_buckets: usize,
    /// Parked links.
    pub pooled_links: usize,
}

impl IndexStats {
    /// Returns `true` if nothing is live and nothing is parked.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Total parked nodes across all kinds.
    pub fn pooled(&self) -> usize {
        self.pooled_key_buckets + self.pooled_object_buckets + self.pooled_links
    }
}

impl fmt::Display for IndexStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "keys={} objects={} links={} pooled={}/{}/{}",
            self.key_buckets,
            self.object_buckets,
            self.links,
            self.pooled_key_buckets,
            self.pooled_object_buckets,
            self.pooled_links
        )
    }
}
