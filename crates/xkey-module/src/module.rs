use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info, warn};
use xkey_crypto::KeyHasher;
use xkey_host::{CachedObject, Clock, ListenerHandle, ObjectNotifier};
use xkey_index::{IndexStats, XkeyIndex};
use xkey_types::{ObjectHandle, PurgeMode};

use crate::config::XkeyConfig;
use crate::error::ModuleResult;
use crate::headers::{split_keys, HeaderMatcher};
use crate::listener::XkeyListener;

/// State guarded by the module lock.
struct State {
    index: XkeyIndex,
    listener: Option<ListenerHandle>,
    /// Bumped on every registration. Only the current listener may mutate
    /// the index.
    generation: u64,
}

impl State {
    fn accepts(&self, generation: u64) -> bool {
        self.listener.is_some() && self.generation == generation
    }
}

/// Everything the registered listener and the public entry points share.
pub(crate) struct Shared {
    state: Mutex<State>,
    /// Written only while `state` is locked; read lock-free.
    activations: AtomicUsize,
    hasher: KeyHasher,
    headers: HeaderMatcher,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().expect("xkey state lock poisoned")
    }

    /// Tag an object with every key found in its key headers.
    ///
    /// Events from a listener other than the registered one are dropped: the
    /// index they belonged to has already been drained.
    pub(crate) fn tag_object(&self, object: &Arc<dyn CachedObject>, generation: u64) {
        let mut digests = Vec::new();
        for value in self.headers.values(object.headers()) {
            let before = digests.len();
            digests.extend(split_keys(value).map(|key| self.hasher.digest_str(key)));
            if digests.len() == before {
                warn!(object = %object.handle(), "key header without keys");
            }
        }
        if digests.is_empty() {
            return;
        }
        let mut state = self.lock();
        if !state.accepts(generation) {
            debug!(object = %object.handle(), generation, "dropped late insert event");
            return;
        }
        state.index.tag_all(object, digests);
    }

    /// Drop every association of an object at the end of its life.
    pub(crate) fn untag_object(&self, handle: ObjectHandle, generation: u64) {
        let mut state = self.lock();
        if !state.accepts(generation) {
            debug!(object = %handle, generation, "dropped late remove event");
            return;
        }
        state.index.untag(handle);
    }

    fn purge(&self, key: Option<&str>, mode: PurgeMode, now: f64) -> u64 {
        let Some(key) = key.filter(|k| !k.is_empty()) else {
            return 0;
        };
        let digest = self.hasher.digest_str(key);
        let purged = self.lock().index.purge(&digest, mode, now);
        debug!(key, %mode, purged, "purge");
        purged
    }
}

/// The xkey context a host embeds.
///
/// Every entry point takes the one module lock for its whole duration. Purges
/// call the host's rearm primitive under that lock. Activation and
/// deactivation also hold it across `ObjectNotifier::register` and
/// `deregister`, so a notifier must not block on in-flight event dispatch
/// or call back into this context from those two calls. Events delivered
/// after the last deactivation are dropped.
pub struct Xkey {
    shared: Arc<Shared>,
    notifier: Arc<dyn ObjectNotifier>,
    clock: Arc<dyn Clock>,
    config: XkeyConfig,
}

impl std::fmt::Debug for Xkey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Xkey")
            .field("activations", &self.activations())
            .field("config", &self.config)
            .finish()
    }
}

impl Xkey {
    /// Build an inactive context. Nothing is registered until [`activate`].
    ///
    /// [`activate`]: Xkey::activate
    pub fn create(
        notifier: Arc<dyn ObjectNotifier>,
        clock: Arc<dyn Clock>,
        config: XkeyConfig,
    ) -> ModuleResult<Self> {
        config.validate()?;
        let hasher = match &config.digest_domain {
            Some(domain) => KeyHasher::with_domain(domain.clone()),
            None => KeyHasher::new(),
        };
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                index: XkeyIndex::with_pool_capacity(config.pool_capacity),
                listener: None,
                generation: 0,
            }),
            activations: AtomicUsize::new(0),
            hasher,
            headers: HeaderMatcher::new(&config.header_names),
        });
        Ok(Self {
            shared,
            notifier,
            clock,
            config,
        })
    }

    /// Take one activation. The first one registers the object listener.
    pub fn activate(&self) {
        let mut state = self.shared.lock();
        let active = self.shared.activations.load(Ordering::Acquire);
        if active == 0 {
            state.generation += 1;
            let listener = Arc::new(XkeyListener::new(
                Arc::clone(&self.shared),
                state.generation,
            ));
            let handle = self.notifier.register(listener);
            state.listener = Some(handle);
            info!(
                listener = handle.get(),
                generation = state.generation,
                "registered object listener"
            );
        }
        self.shared.activations.store(active + 1, Ordering::Release);
    }

    /// Drop one activation. The last one deregisters the listener and frees
    /// the whole index, whether or not tagged objects are still alive.
    ///
    /// # Panics
    ///
    /// Panics if there is no outstanding activation.
    pub fn deactivate(&self) {
        let mut state = self.shared.lock();
        let active = self.shared.activations.load(Ordering::Acquire);
        assert!(active > 0, "xkey deactivated more often than activated");
        self.shared.activations.store(active - 1, Ordering::Release);
        if active > 1 {
            return;
        }

        let handle = state
            .listener
            .take()
            .expect("active xkey without a registered listener");
        self.notifier.deregister(handle);
        let dropped = state.index.drain();
        info!(listener = handle.get(), %dropped, "deregistered object listener, index drained");
    }

    /// Release every outstanding activation and consume the context.
    pub fn shutdown(self) {
        self.release_all();
    }

    fn release_all(&self) {
        while self.is_active() {
            self.deactivate();
        }
    }

    /// Whether the object listener is currently registered.
    pub fn is_active(&self) -> bool {
        self.activations() > 0
    }

    /// Outstanding activations.
    pub fn activations(&self) -> usize {
        self.shared.activations.load(Ordering::Acquire)
    }

    /// Hard purge: every non-busy object tagged with `key` becomes stale
    /// immediately, with no grace. Returns the number of objects purged.
    pub fn purge(&self, key: Option<&str>) -> u64 {
        self.purge_with(PurgeMode::Hard, key)
    }

    /// Soft purge: non-busy objects tagged with `key` that are already past
    /// their ttl are rearmed to expire now, keeping grace and keep.
    pub fn softpurge(&self, key: Option<&str>) -> u64 {
        self.purge_with(PurgeMode::Soft, key)
    }

    /// Purge in the given mode. `None` or an empty key matches nothing.
    pub fn purge_with(&self, mode: PurgeMode, key: Option<&str>) -> u64 {
        self.shared.purge(key, mode, self.clock.now())
    }

    /// Occupancy of the index and its pools.
    pub fn stats(&self) -> IndexStats {
        self.shared.lock().index.stats()
    }

    /// Audit the index.
    pub fn verify(&self) -> ModuleResult<()> {
        Ok(self.shared.lock().index.verify()?)
    }

    /// The configuration this context was created with.
    pub fn config(&self) -> &XkeyConfig {
        &self.config
    }
}

impl Drop for Xkey {
    fn drop(&mut self) {
        if self.is_active() {
            warn!(activations = self.activations(), "xkey dropped while active; tearing down");
            self.release_all();
        }
    }
}
