//! Node kinds stored in the index arenas.
//!
//! A [`Link`] is one accepted (object, key) tagging. It sits on exactly one
//! [`KeyBucket`] chain and in exactly one [`ObjectBucket`] list. Key-bucket
//! chains are intrusive (threaded through `key_prev`/`key_next` on the links)
//! so a link can leave its key bucket in O(1). Object buckets keep an owned
//! `Vec` since they are only appended to and drained whole.

use std::fmt;
use std::sync::Arc;

use xkey_host::CachedObject;
use xkey_types::{KeyDigest, ObjectHandle};

use crate::arena::SlotId;
use crate::pool::Recycle;

macro_rules! slot_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl SlotId for $name {
            fn from_slot(slot: usize) -> Self {
                Self(u32::try_from(slot).expect("index arena exhausted"))
            }

            fn slot(self) -> usize {
                self.0 as usize
            }
        }
    };
}

slot_id!(
    /// Id of a [`KeyBucket`] in the key arena.
    KeyBucketId
);
slot_id!(
    /// Id of an [`ObjectBucket`] in the object arena.
    ObjectBucketId
);
slot_id!(
    /// Id of a [`Link`] in the link arena.
    LinkId
);

/// All links tagged with one key digest, in insertion order.
#[derive(Debug, Default)]
pub struct KeyBucket {
    pub(crate) digest: KeyDigest,
    pub(crate) head: Option<LinkId>,
    pub(crate) tail: Option<LinkId>,
    pub(crate) len: usize,
}

impl KeyBucket {
    pub fn digest(&self) -> &KeyDigest {
        &self.digest
    }

    /// Number of links on the chain.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Recycle for KeyBucket {
    fn in_use(&self) -> bool {
        self.len != 0 || self.head.is_some() || self.tail.is_some()
    }

    fn recycle(&mut self) {
        self.digest = KeyDigest::zero();
    }
}

/// All links of one cached object, in tagging order.
#[derive(Default)]
pub struct ObjectBucket {
    pub(crate) object: Option<Arc<dyn CachedObject>>,
    pub(crate) links: Vec<LinkId>,
    /// Epoch of the last purge that visited this bucket.
    pub(crate) purge_mark: u64,
}

impl ObjectBucket {
    /// Handle of the owning object.
    ///
    /// # Panics
    ///
    /// Panics on a pooled bucket.
    pub fn handle(&self) -> ObjectHandle {
        self.object().handle()
    }

    /// The owning object.
    pub(crate) fn object(&self) -> &Arc<dyn CachedObject> {
        self.object
            .as_ref()
            .expect("object bucket without an object")
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

impl Recycle for ObjectBucket {
    fn in_use(&self) -> bool {
        !self.links.is_empty()
    }

    fn recycle(&mut self) {
        // The link buffer keeps its capacity for the next object.
        self.object = None;
    }
}

impl fmt::Debug for ObjectBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectBucket")
            .field("object", &self.object.as_ref().map(|o| o.handle()))
            .field("links", &self.links.len())
            .finish()
    }
}

/// One (object, key) association.
#[derive(Debug, Default)]
pub struct Link {
    pub(crate) object: Option<ObjectHandle>,
    pub(crate) key_bucket: Option<KeyBucketId>,
    pub(crate) object_bucket: Option<ObjectBucketId>,
    pub(crate) key_prev: Option<LinkId>,
    pub(crate) key_next: Option<LinkId>,
}

impl Recycle for Link {
    fn in_use(&self) -> bool {
        self.object.is_some() || self.key_bucket.is_some() || self.object_bucket.is_some()
    }

    fn recycle(&mut self) {
        self.key_prev = None;
        self.key_next = None;
    }
}
