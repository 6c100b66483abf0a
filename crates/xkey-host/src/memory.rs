use std::collections::BTreeMap;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use tracing::{debug, warn};
use xkey_types::{Expiry, ObjectHandle};

use crate::event::{ListenerHandle, ObjectEvent};
use crate::traits::{CachedObject, ObjectListener, ObjectNotifier};

/// A cached object held by [`InMemoryCache`].
pub struct MemoryObject {
    handle: ObjectHandle,
    headers: Vec<String>,
    busy: AtomicBool,
    expiry: Mutex<Expiry>,
    rearms: AtomicUsize,
}

impl MemoryObject {
    /// Create a detached object. Most callers go through
    /// [`InMemoryCache::insert`] instead.
    pub fn new(handle: ObjectHandle, headers: Vec<String>, expiry: Expiry) -> Self {
        Self {
            handle,
            headers,
            busy: AtomicBool::new(false),
            expiry: Mutex::new(expiry),
            rearms: AtomicUsize::new(0),
        }
    }

    /// Mark the object busy (mid-fetch) or done.
    pub fn set_busy(&self, busy: bool) {
        self.busy.store(busy, Ordering::Release);
    }

    /// Number of times the object has been rearmed.
    pub fn rearm_count(&self) -> usize {
        self.rearms.load(Ordering::Acquire)
    }
}

impl CachedObject for MemoryObject {
    fn handle(&self) -> ObjectHandle {
        self.handle
    }

    fn headers(&self) -> &[String] {
        &self.headers
    }

    fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn expiry(&self) -> Expiry {
        *self.expiry.lock().expect("expiry lock poisoned")
    }

    fn rearm(&self, expiry: Expiry) {
        *self.expiry.lock().expect("expiry lock poisoned") = expiry;
        self.rearms.fetch_add(1, Ordering::AcqRel);
    }
}

impl std::fmt::Debug for MemoryObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryObject")
            .field("handle", &self.handle)
            .field("headers", &self.headers.len())
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// In-memory host cache.
///
/// Holds objects in a `BTreeMap` keyed by handle and delivers lifecycle
/// events synchronously to every registered listener. Listeners are invoked
/// after the registry lock is released, so a listener may take its own locks
/// and a concurrent `deregister` never waits on an in-flight event.
pub struct InMemoryCache {
    objects: RwLock<BTreeMap<ObjectHandle, Arc<MemoryObject>>>,
    listeners: RwLock<Vec<(ListenerHandle, Arc<dyn ObjectListener>)>>,
    next_object: AtomicU64,
    next_listener: AtomicU64,
}

impl InMemoryCache {
    /// Create an empty cache with no listeners.
    pub fn new() -> Self {
        Self {
            objects: RwLock::new(BTreeMap::new()),
            listeners: RwLock::new(Vec::new()),
            next_object: AtomicU64::new(1),
            next_listener: AtomicU64::new(1),
        }
    }

    /// Store a fetched object and emit [`ObjectEvent::Inserted`].
    pub fn insert(&self, headers: Vec<String>, expiry: Expiry) -> Arc<MemoryObject> {
        self.admit(headers, expiry, ObjectEvent::Inserted)
    }

    /// Store an injected object and emit [`ObjectEvent::Injected`].
    pub fn inject(&self, headers: Vec<String>, expiry: Expiry) -> Arc<MemoryObject> {
        self.admit(headers, expiry, ObjectEvent::Injected)
    }

    /// End an object's life: emit [`ObjectEvent::Removed`] and drop it.
    ///
    /// Returns `false` if no object with that handle is stored.
    pub fn remove(&self, handle: ObjectHandle) -> bool {
        let removed = self
            .objects
            .write()
            .expect("object map lock poisoned")
            .remove(&handle);
        match removed {
            Some(object) => {
                self.dispatch(object, ObjectEvent::Removed);
                true
            }
            None => false,
        }
    }

    /// Look up a stored object.
    pub fn get(&self, handle: ObjectHandle) -> Option<Arc<MemoryObject>> {
        self.objects
            .read()
            .expect("object map lock poisoned")
            .get(&handle)
            .cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.read().expect("object map lock poisoned").len()
    }

    /// Returns `true` if no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.read().expect("listener lock poisoned").len()
    }

    fn admit(&self, headers: Vec<String>, expiry: Expiry, event: ObjectEvent) -> Arc<MemoryObject> {
        let handle = ObjectHandle::new(self.next_object.fetch_add(1, Ordering::Relaxed));
        let object = Arc::new(MemoryObject::new(handle, headers, expiry));
        self.objects
            .write()
            .expect("object map lock poisoned")
            .insert(handle, Arc::clone(&object));
        self.dispatch(Arc::clone(&object), event);
        object
    }

    fn dispatch(&self, object: Arc<MemoryObject>, event: ObjectEvent) {
        let listeners: Vec<Arc<dyn ObjectListener>> = self
            .listeners
            .read()
            .expect("listener lock poisoned")
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        let object: Arc<dyn CachedObject> = object;
        for listener in listeners {
            listener.on_event(&object, event);
        }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectNotifier for InMemoryCache {
    fn register(&self, listener: Arc<dyn ObjectListener>) -> ListenerHandle {
        let raw = self.next_listener.fetch_add(1, Ordering::Relaxed);
        let handle = ListenerHandle::new(NonZeroU64::new(raw).expect("listener ids start at 1"));
        self.listeners
            .write()
            .expect("listener lock poisoned")
            .push((handle, listener));
        debug!(listener = handle.get(), "listener registered");
        handle
    }

    fn deregister(&self, handle: ListenerHandle) {
        let mut listeners = self.listeners.write().expect("listener lock poisoned");
        let before = listeners.len();
        listeners.retain(|(h, _)| *h != handle);
        if listeners.len() == before {
            warn!(listener = handle.get(), "deregister of unknown listener");
        } else {
            debug!(listener = handle.get(), "listener deregistered");
        }
    }
}

impl std::fmt::Debug for InMemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCache")
            .field("object_count", &self.len())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}
