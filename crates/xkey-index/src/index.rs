//! The dual ordered index and its mutation protocol.
//!
//! [`XkeyIndex`] keeps two ordered trees over slab-allocated buckets:
//!
//! - the key tree maps a [`KeyDigest`] to the [`KeyBucket`] holding every
//!   link tagged with that digest;
//! - the object tree maps an [`ObjectHandle`] to the [`ObjectBucket`] holding
//!   every link of that object.
//!
//! # Invariants
//!
//! After every public call:
//!
//! - A key bucket exists iff at least one link references its digest.
//! - An object bucket exists iff at least one link references its object.
//! - Every link is on exactly one key chain and in exactly one object list,
//!   and both trees reach the same set of links.
//!
//! The index holds no lock of its own. Callers serialize access.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;
use xkey_host::CachedObject;
use xkey_types::{KeyDigest, ObjectHandle, PurgeMode};

use crate::arena::{Arena, SlotId};
use crate::bucket::{KeyBucket, KeyBucketId, Link, LinkId, ObjectBucket, ObjectBucketId};
use crate::error::{IndexError, IndexResult};
use crate::pool::{Pool, DEFAULT_POOL_CAPACITY};
use crate::stats::IndexStats;

/// Bidirectional multimap between secondary-key digests and cached objects.
pub struct XkeyIndex {
    keys: BTreeMap<KeyDigest, KeyBucketId>,
    objects: BTreeMap<ObjectHandle, ObjectBucketId>,
    key_buckets: Arena<KeyBucketId, KeyBucket>,
    object_buckets: Arena<ObjectBucketId, ObjectBucket>,
    links: Arena<LinkId, Link>,
    key_pool: Pool<KeyBucket>,
    object_pool: Pool<ObjectBucket>,
    link_pool: Pool<Link>,
    /// Bumped by every purge; object buckets visited carry the current value.
    purge_epoch: u64,
}

impl std::fmt::Debug for XkeyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XkeyIndex")
            .field("keys", &self.keys.len())
            .field("objects", &self.objects.len())
            .field("links", &self.links.len())
            .field("pool_capacity", &self.pool_capacity())
            .finish()
    }
}

impl XkeyIndex {
    /// Create an empty index with the default pool capacity.
    pub fn new() -> Self {
        Self::with_pool_capacity(DEFAULT_POOL_CAPACITY)
    }

    /// Create an empty index parking at most `capacity` nodes per kind.
    pub fn with_pool_capacity(capacity: usize) -> Self {
        Self {
            keys: BTreeMap::new(),
            objects: BTreeMap::new(),
            key_buckets: Arena::new(),
            object_buckets: Arena::new(),
            links: Arena::new(),
            key_pool: Pool::new(capacity),
            object_pool: Pool::new(capacity),
            link_pool: Pool::new(capacity),
            purge_epoch: 0,
        }
    }

    /// Per-kind pool capacity.
    pub fn pool_capacity(&self) -> usize {
        self.key_pool.capacity()
    }

    /// Number of distinct digests with at least one link.
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Number of distinct objects with at least one link.
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Number of live links.
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Returns `true` if no links are live.
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn contains_key(&self, digest: &KeyDigest) -> bool {
        self.keys.contains_key(digest)
    }

    pub fn contains_object(&self, handle: ObjectHandle) -> bool {
        self.objects.contains_key(&handle)
    }

    // ---------------------------------------------------------------
    // Key tree
    // ---------------------------------------------------------------

    /// Look up the bucket for a digest.
    pub fn find_key(&self, digest: &KeyDigest) -> Option<KeyBucketId> {
        self.keys.get(digest).copied()
    }

    /// Return the bucket for a digest, creating an empty one if needed.
    ///
    /// A freshly created bucket is empty until a link is appended; callers
    /// must append one before returning control.
    pub fn insert_key(&mut self, digest: KeyDigest) -> KeyBucketId {
        if let Some(id) = self.find_key(&digest) {
            return id;
        }
        let mut bucket = self.key_pool.acquire();
        bucket.digest = digest;
        let id = self.key_buckets.insert(bucket);
        self.keys.insert(digest, id);
        id
    }

    /// Remove an empty bucket from the key tree and retire it.
    ///
    /// # Panics
    ///
    /// Panics if the bucket still has links or is not in the tree.
    pub fn erase_key(&mut self, id: KeyBucketId) {
        assert!(
            self.key_buckets[id].is_empty(),
            "erasing non-empty key bucket {id:?}"
        );
        let bucket = self.key_buckets.remove(id);
        let removed = self.keys.remove(&bucket.digest);
        assert_eq!(removed, Some(id), "key bucket {id:?} missing from key tree");
        self.key_pool.release(bucket);
    }

    // ---------------------------------------------------------------
    // Object tree
    // ---------------------------------------------------------------

    /// Look up the bucket for an object.
    pub fn find_object(&self, handle: ObjectHandle) -> Option<ObjectBucketId> {
        self.objects.get(&handle).copied()
    }

    /// Return the bucket for an object, creating an empty one if needed.
    pub fn insert_object(&mut self, object: &Arc<dyn CachedObject>) -> ObjectBucketId {
        let handle = object.handle();
        if let Some(id) = self.find_object(handle) {
            return id;
        }
        let mut bucket = self.object_pool.acquire();
        bucket.object = Some(Arc::clone(object));
        let id = self.object_buckets.insert(bucket);
        self.objects.insert(handle, id);
        id
    }

    /// Remove an empty bucket from the object tree and retire it.
    ///
    /// # Panics
    ///
    /// Panics if the bucket still has links or is not in the tree.
    pub fn erase_object(&mut self, id: ObjectBucketId) {
        assert!(
            self.object_buckets[id].is_empty(),
            "erasing non-empty object bucket {id:?}"
        );
        let bucket = self.object_buckets.remove(id);
        let handle = bucket.handle();
        let removed = self.objects.remove(&handle);
        assert_eq!(removed, Some(id), "object bucket {id:?} missing from object tree");
        self.object_pool.release(bucket);
    }

    // ---------------------------------------------------------------
    // Tagging protocol
    // ---------------------------------------------------------------

    /// Associate an object with one key digest.
    ///
    /// Every call adds a new link, even for a pair that is already tagged.
    pub fn tag(&mut self, object: &Arc<dyn CachedObject>, digest: KeyDigest) -> LinkId {
        let object_bucket = self.insert_object(object);
        let key_bucket = self.insert_key(digest);

        let mut link = self.link_pool.acquire();
        link.object = Some(object.handle());
        link.key_bucket = Some(key_bucket);
        link.object_bucket = Some(object_bucket);
        link.key_prev = self.key_buckets[key_bucket].tail;
        link.key_next = None;
        let id = self.links.insert(link);

        let bucket = &mut self.key_buckets[key_bucket];
        match bucket.tail.replace(id) {
            Some(prev) => self.links[prev].key_next = Some(id),
            None => bucket.head = Some(id),
        }
        bucket.len += 1;

        self.object_buckets[object_bucket].links.push(id);
        id
    }

    /// Tag an object with each digest in turn. Returns the number of links
    /// added.
    pub fn tag_all<I>(&mut self, object: &Arc<dyn CachedObject>, digests: I) -> usize
    where
        I: IntoIterator<Item = KeyDigest>,
    {
        let mut added = 0;
        for digest in digests {
            self.tag(object, digest);
            added += 1;
        }
        if added > 0 {
            debug!(object = %object.handle(), links = added, "tagged object");
        }
        added
    }

    // ---------------------------------------------------------------
    // Untagging protocol
    // ---------------------------------------------------------------

    /// Drop every link of an object, pruning buckets that become empty.
    ///
    /// Returns the number of links released; zero (and no state change) if
    /// the object was never tagged.
    pub fn untag(&mut self, handle: ObjectHandle) -> usize {
        let Some(object_bucket) = self.find_object(handle) else {
            return 0;
        };

        let mut links = std::mem::take(&mut self.object_buckets[object_bucket].links);
        for &id in &links {
            let key_bucket = self.detach_from_key(id);
            if self.key_buckets[key_bucket].is_empty() {
                self.erase_key(key_bucket);
            }

            let mut link = self.links.remove(id);
            assert_eq!(
                link.object_bucket.take(),
                Some(object_bucket),
                "link {id:?} listed under a foreign object bucket"
            );
            link.object = None;
            self.link_pool.release(link);
        }
        let released = links.len();

        // Hand the emptied buffer back so its capacity is pooled with the bucket.
        links.clear();
        let bucket = &mut self.object_buckets[object_bucket];
        assert!(bucket.links.is_empty(), "object bucket gained links during untag");
        bucket.links = links;
        self.erase_object(object_bucket);

        debug!(object = %handle, links = released, "untagged object");
        released
    }

    /// Unthread a link from its key chain and return the bucket it left.
    fn detach_from_key(&mut self, id: LinkId) -> KeyBucketId {
        let link = &mut self.links[id];
        let key_bucket = link
            .key_bucket
            .take()
            .unwrap_or_else(|| panic!("link {id:?} is not on a key chain"));
        let prev = link.key_prev.take();
        let next = link.key_next.take();

        match prev {
            Some(p) => self.links[p].key_next = next,
            None => {
                assert_eq!(self.key_buckets[key_bucket].head, Some(id), "chain head mismatch");
                self.key_buckets[key_bucket].head = next;
            }
        }
        match next {
            Some(n) => self.links[n].key_prev = prev,
            None => {
                assert_eq!(self.key_buckets[key_bucket].tail, Some(id), "chain tail mismatch");
                self.key_buckets[key_bucket].tail = prev;
            }
        }

        let bucket = &mut self.key_buckets[key_bucket];
        assert!(bucket.len > 0, "key chain length underflow");
        bucket.len -= 1;
        key_bucket
    }

    // ---------------------------------------------------------------
    // Invalidation
    // ---------------------------------------------------------------

    /// Request expiry rearm on every eligible object tagged with `digest`.
    ///
    /// Busy objects are never touched. In [`PurgeMode::Soft`] objects still
    /// within their ttl at `now` are skipped. Each distinct object is
    /// considered once, however many links tie it to the key. Returns the
    /// number of objects rearmed. Buckets and links are not modified; only
    /// the visit marks on object buckets move forward.
    pub fn purge(&mut self, digest: &KeyDigest, mode: PurgeMode, now: f64) -> u64 {
        let Some(key_bucket) = self.find_key(digest) else {
            return 0;
        };

        self.purge_epoch += 1;
        let epoch = self.purge_epoch;
        let mut purged = 0;
        let mut cursor = self.key_buckets[key_bucket].head;
        while let Some(id) = cursor {
            let link = &self.links[id];
            cursor = link.key_next;

            let object_bucket = link
                .object_bucket
                .unwrap_or_else(|| panic!("link {id:?} has no object bucket"));
            let bucket = &mut self.object_buckets[object_bucket];
            if bucket.purge_mark == epoch {
                continue;
            }
            bucket.purge_mark = epoch;
            let object = bucket.object();
            if object.is_busy() {
                continue;
            }

            let expiry = object.expiry();
            let rearmed = match mode {
                PurgeMode::Hard => expiry.hard_purged(),
                PurgeMode::Soft => {
                    if !expiry.is_stale(now) {
                        continue;
                    }
                    expiry.soft_purged(now)
                }
            };
            object.rearm(rearmed);
            purged += 1;
        }

        debug!(digest = %digest.short_hex(), %mode, purged, "purge walked key bucket");
        purged
    }

    // ---------------------------------------------------------------
    // Teardown
    // ---------------------------------------------------------------

    /// Free every bucket, link and parked node, whatever their state.
    ///
    /// Returns the occupancy that was dropped.
    pub fn drain(&mut self) -> IndexStats {
        let dropped = self.stats();
        self.keys.clear();
        self.objects.clear();
        self.key_buckets.clear();
        self.object_buckets.clear();
        self.links.clear();
        self.key_pool.clear();
        self.object_pool.clear();
        self.link_pool.clear();
        dropped
    }

    // ---------------------------------------------------------------
    // Introspection
    // ---------------------------------------------------------------

    /// Occupancy snapshot.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            key_buckets: self.key_buckets.len(),
            object_buckets: self.object_buckets.len(),
            links: self.links.len(),
            pooled_key_buckets: self.key_pool.len(),
            pooled_object_buckets: self.object_pool.len(),
            pooled_links: self.link_pool.len(),
        }
    }

    /// Objects linked to a digest, one entry per link, in tagging order.
    pub fn key_objects(&self, digest: &KeyDigest) -> Vec<ObjectHandle> {
        let Some(key_bucket) = self.find_key(digest) else {
            return Vec::new();
        };
        let mut handles = Vec::with_capacity(self.key_buckets[key_bucket].len());
        let mut cursor = self.key_buckets[key_bucket].head;
        while let Some(id) = cursor {
            let link = &self.links[id];
            handles.extend(link.object);
            cursor = link.key_next;
        }
        handles
    }

    /// Digests linked to an object, one entry per link, in tagging order.
    pub fn object_keys(&self, handle: ObjectHandle) -> Vec<KeyDigest> {
        let Some(object_bucket) = self.find_object(handle) else {
            return Vec::new();
        };
        self.object_buckets[object_bucket]
            .links
            .iter()
            .filter_map(|&id| self.links[id].key_bucket)
            .map(|kb| self.key_buckets[kb].digest)
            .collect()
    }

    /// Audit the whole structure against the index invariants.
    pub fn verify(&self) -> IndexResult<()> {
        let mut via_keys = BTreeSet::new();
        for (digest, &id) in &self.keys {
            let bucket = self.key_buckets.get(id).ok_or_else(|| IndexError::TreeKeyMismatch {
                tree: "key",
                key: digest.to_hex(),
                found: "vacant slot".into(),
            })?;
            if bucket.digest != *digest {
                return Err(IndexError::TreeKeyMismatch {
                    tree: "key",
                    key: digest.to_hex(),
                    found: bucket.digest.to_hex(),
                });
            }
            if bucket.is_empty() {
                return Err(IndexError::EmptyKeyBucket(*digest));
            }

            let broken = |reason: String| IndexError::BrokenChain {
                digest: *digest,
                reason,
            };
            let mut prev = None;
            let mut cursor = bucket.head;
            let mut walked = 0;
            while let Some(link_id) = cursor {
                let link = self
                    .links
                    .get(link_id)
                    .ok_or_else(|| broken(format!("dangling link {link_id:?}")))?;
                if link.key_bucket != Some(id) {
                    return Err(IndexError::LinkMismatch {
                        link: link_id.slot(),
                        reason: format!("on chain of {id:?} but references {:?}", link.key_bucket),
                    });
                }
                if link.key_prev != prev {
                    return Err(broken(format!("bad back pointer at {link_id:?}")));
                }
                if !via_keys.insert(link_id) {
                    return Err(broken(format!("{link_id:?} reached twice")));
                }
                walked += 1;
                prev = cursor;
                cursor = link.key_next;
            }
            if bucket.tail != prev {
                return Err(broken("tail does not match last link".into()));
            }
            if walked != bucket.len {
                return Err(broken(format!("length {} but walked {walked}", bucket.len)));
            }
        }

        let mut via_objects = BTreeSet::new();
        for (&handle, &id) in &self.objects {
            let bucket = self
                .object_buckets
                .get(id)
                .ok_or_else(|| IndexError::TreeKeyMismatch {
                    tree: "object",
                    key: handle.to_string(),
                    found: "vacant slot".into(),
                })?;
            let owner = bucket.object.as_ref().map(|o| o.handle());
            if owner != Some(handle) {
                return Err(IndexError::TreeKeyMismatch {
                    tree: "object",
                    key: handle.to_string(),
                    found: owner.map_or_else(|| "none".into(), |h| h.to_string()),
                });
            }
            if bucket.is_empty() {
                return Err(IndexError::EmptyObjectBucket(handle));
            }
            for &link_id in &bucket.links {
                let mismatch = |reason: &str| IndexError::LinkMismatch {
                    link: link_id.slot(),
                    reason: reason.into(),
                };
                let link = self
                    .links
                    .get(link_id)
                    .ok_or_else(|| mismatch("dangling id in object bucket"))?;
                if link.object_bucket != Some(id) || link.object != Some(handle) {
                    return Err(mismatch("object back-reference disagrees with bucket"));
                }
                if !via_objects.insert(link_id) {
                    return Err(mismatch("listed twice in object buckets"));
                }
            }
        }

        let orphaned_keys = self
            .key_buckets
            .iter()
            .filter(|(id, bucket)| self.keys.get(&bucket.digest) != Some(id))
            .count();
        if orphaned_keys > 0 {
            return Err(IndexError::Orphaned {
                kind: "key bucket",
                count: orphaned_keys,
            });
        }
        let orphaned_objects = self
            .object_buckets
            .iter()
            .filter(|(id, bucket)| {
                let handle = bucket.object.as_ref().map(|o| o.handle());
                handle.and_then(|h| self.objects.get(&h)) != Some(id)
            })
            .count();
        if orphaned_objects > 0 {
            return Err(IndexError::Orphaned {
                kind: "object bucket",
                count: orphaned_objects,
            });
        }
        if via_keys != via_objects || via_keys.len() != self.links.len() {
            return Err(IndexError::LinkSetMismatch {
                via_keys: via_keys.len(),
                via_objects: via_objects.len(),
                total: self.links.len(),
            });
        }
        Ok(())
    }
}

impl Default for XkeyIndex {
    fn default() -> Self {
        Self::new()
    }
}
