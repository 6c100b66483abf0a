//! End-to-end behaviour of an `Xkey` context driven by the in-memory host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use xkey_host::{
    CachedObject, InMemoryCache, ManualClock, ObjectEvent, ObjectListener, ObjectNotifier,
};
use xkey_module::{Xkey, XkeyConfig};
use xkey_types::{Expiry, ObjectHandle};

const NOW: f64 = 1_000.0;

struct Harness {
    cache: Arc<InMemoryCache>,
    clock: Arc<ManualClock>,
    xkey: Xkey,
}

fn harness_with(config: XkeyConfig) -> Harness {
    let cache = Arc::new(InMemoryCache::new());
    let clock = Arc::new(ManualClock::new(NOW));
    let xkey = Xkey::create(cache.clone(), clock.clone(), config).unwrap();
    xkey.activate();
    Harness { cache, clock, xkey }
}

fn harness() -> Harness {
    harness_with(XkeyConfig::default())
}

fn fresh() -> Expiry {
    Expiry::new(NOW, 120.0, 10.0, 5.0)
}

#[test]
fn purge_reaches_only_tagged_key() {
    let h = harness();
    let obj = h.cache.insert(vec!["xkey: foo".into()], fresh());

    assert_eq!(h.xkey.purge(Some("bar")), 0);
    assert_eq!(obj.rearm_count(), 0);

    assert_eq!(h.xkey.purge(Some("foo")), 1);
    assert_eq!(obj.expiry(), Expiry::new(NOW, 0.0, 0.0, 0.0));
}

#[test]
fn legacy_header_name_is_recognised() {
    let h = harness();
    h.cache.insert(vec!["X-HashTwo: foo bar".into()], fresh());
    assert_eq!(h.xkey.purge(Some("bar")), 1);
}

#[test]
fn multiple_headers_are_all_scanned() {
    let h = harness();
    h.cache.insert(
        vec![
            "xkey: a".into(),
            "Content-Type: text/plain".into(),
            "XKEY: b".into(),
        ],
        fresh(),
    );
    assert_eq!(h.xkey.stats().key_buckets, 2);
    assert_eq!(h.xkey.stats().links, 2);
}

#[test]
fn injected_objects_are_tagged() {
    let h = harness();
    h.cache.inject(vec!["xkey: foo".into()], fresh());
    assert_eq!(h.xkey.purge(Some("foo")), 1);
}

#[test]
fn removal_untags_one_object_only() {
    let h = harness();
    let first = h.cache.insert(vec!["xkey: foo".into()], fresh());
    h.cache.insert(vec!["xkey: foo".into()], fresh());

    assert!(h.cache.remove(first.handle()));
    assert_eq!(h.xkey.purge(Some("foo")), 1);
    assert_eq!(h.xkey.stats().object_buckets, 1);
    h.xkey.verify().unwrap();
}

#[test]
fn removing_last_object_prunes_its_keys() {
    let h = harness();
    let obj = h.cache.insert(vec!["xkey: foo bar".into()], fresh());
    assert_eq!(h.xkey.stats().key_buckets, 2);

    h.cache.remove(obj.handle());
    let stats = h.xkey.stats();
    assert_eq!(stats.key_buckets, 0);
    assert_eq!(stats.object_buckets, 0);
    assert_eq!(stats.links, 0);
    assert_eq!(h.xkey.purge(Some("foo")), 0);
}

#[test]
fn untagged_objects_never_enter_the_index() {
    let h = harness();
    let obj = h.cache.insert(vec!["Cache-Control: max-age=60".into()], fresh());
    assert!(h.xkey.stats().is_empty());
    h.cache.remove(obj.handle());
    assert!(h.xkey.stats().is_empty());
}

#[test]
fn busy_objects_are_skipped() {
    let h = harness();
    let obj = h.cache.insert(vec!["xkey: foo".into()], fresh());
    obj.set_busy(true);
    assert_eq!(h.xkey.purge(Some("foo")), 0);
    assert_eq!(obj.rearm_count(), 0);

    obj.set_busy(false);
    assert_eq!(h.xkey.purge(Some("foo")), 1);
}

#[test]
fn softpurge_leaves_fresh_objects_alone() {
    let h = harness();
    let obj = h.cache.insert(vec!["xkey: foo".into()], fresh());
    assert_eq!(h.xkey.softpurge(Some("foo")), 0);
    assert_eq!(obj.expiry(), fresh());
}

#[test]
fn softpurge_skips_object_whose_age_equals_ttl() {
    let h = harness();
    let obj = h.cache.insert(vec!["xkey: foo".into()], Expiry::new(NOW, 60.0, 10.0, 0.0));
    h.clock.advance(60.0);

    assert_eq!(h.xkey.softpurge(Some("foo")), 0);
    assert_eq!(obj.rearm_count(), 0);

    h.clock.advance(1.0);
    assert_eq!(h.xkey.softpurge(Some("foo")), 1);
}

#[test]
fn softpurge_demotes_stale_objects_keeping_grace() {
    let h = harness();
    let obj = h.cache.insert(vec!["xkey: foo".into()], fresh());
    h.clock.advance(130.0);

    assert_eq!(h.xkey.softpurge(Some("foo")), 1);
    assert_eq!(obj.expiry(), Expiry::new(NOW + 130.0, 0.0, 10.0, 5.0));
}

#[test]
fn hard_and_soft_differ_on_the_same_object() {
    let h = harness();
    let soft = h.cache.insert(vec!["xkey: s".into()], fresh());
    let hard = h.cache.insert(vec!["xkey: h".into()], fresh());

    assert_eq!(h.xkey.softpurge(Some("s")), 0);
    assert_eq!(h.xkey.purge(Some("h")), 1);
    assert_eq!(soft.expiry().ttl, 120.0);
    assert_eq!(hard.expiry().ttl, 0.0);
    assert_eq!(hard.expiry().grace, 0.0);
}

#[test]
fn repeated_key_counts_object_once() {
    let h = harness();
    let obj = h.cache.insert(vec!["xkey: foo foo".into()], fresh());
    assert_eq!(h.xkey.stats().links, 2);
    assert_eq!(h.xkey.purge(Some("foo")), 1);
    assert_eq!(obj.rearm_count(), 1);
}

#[test]
fn purge_does_not_change_the_index() {
    let h = harness();
    h.cache.insert(vec!["xkey: foo".into()], fresh());
    let before = h.xkey.stats();
    h.xkey.purge(Some("foo"));
    assert_eq!(h.xkey.stats(), before);
}

#[test]
fn last_deactivation_drains_and_reactivation_starts_empty() {
    let h = harness();
    let obj = h.cache.insert(vec!["xkey: foo".into()], fresh());
    assert!(!h.xkey.stats().is_empty());

    h.xkey.deactivate();
    assert!(!h.xkey.is_active());
    assert_eq!(h.cache.listener_count(), 0);
    assert!(h.xkey.stats().is_empty());
    assert_eq!(h.xkey.stats().pooled(), 0);

    // The object is still alive in the cache but no longer indexed.
    h.xkey.activate();
    assert_eq!(h.xkey.purge(Some("foo")), 0);
    assert_eq!(obj.rearm_count(), 0);

    // Removal of an object the index forgot is harmless.
    h.cache.remove(obj.handle());
    h.xkey.verify().unwrap();
}

#[test]
fn events_while_inactive_are_not_seen() {
    let h = harness();
    h.xkey.deactivate();
    h.cache.insert(vec!["xkey: foo".into()], fresh());
    h.xkey.activate();
    assert_eq!(h.xkey.purge(Some("foo")), 0);
}

/// Parks the first Inserted dispatch until released, so later listeners in
/// the same dispatch run after whatever the test does in between.
struct Gate {
    entered: Barrier,
    release: Barrier,
    armed: AtomicBool,
}

impl Gate {
    fn new() -> Self {
        Self {
            entered: Barrier::new(2),
            release: Barrier::new(2),
            armed: AtomicBool::new(true),
        }
    }
}

impl ObjectListener for Gate {
    fn on_event(&self, _object: &Arc<dyn CachedObject>, event: ObjectEvent) {
        if event == ObjectEvent::Inserted && self.armed.swap(false, Ordering::AcqRel) {
            self.entered.wait();
            self.release.wait();
        }
    }
}

/// Start an insert whose dispatch reaches the gate before the xkey listener.
fn gated_insert(cache: &Arc<InMemoryCache>, gate: &Arc<Gate>) -> thread::JoinHandle<ObjectHandle> {
    let cache = Arc::clone(cache);
    let handle = thread::spawn(move || cache.insert(vec!["xkey: foo".into()], fresh()).handle());
    gate.entered.wait();
    handle
}

fn gated_harness() -> (Harness, Arc<Gate>) {
    let cache = Arc::new(InMemoryCache::new());
    let gate = Arc::new(Gate::new());
    cache.register(gate.clone());
    let clock = Arc::new(ManualClock::new(NOW));
    let xkey = Xkey::create(cache.clone(), clock.clone(), XkeyConfig::default()).unwrap();
    xkey.activate();
    (Harness { cache, clock, xkey }, gate)
}

#[test]
fn insert_in_flight_across_deactivation_is_dropped() {
    let (h, gate) = gated_harness();
    let inserting = gated_insert(&h.cache, &gate);

    h.xkey.deactivate();
    gate.release.wait();
    let handle = inserting.join().expect("insert thread should not panic");

    assert!(h.xkey.stats().is_empty());

    let obj = h.cache.get(handle).unwrap();
    h.cache.remove(obj.handle());
    h.xkey.activate();
    assert_eq!(h.xkey.purge(Some("foo")), 0);
    assert_eq!(obj.rearm_count(), 0);
    h.xkey.verify().unwrap();
}

#[test]
fn insert_in_flight_across_reactivation_is_dropped() {
    let (h, gate) = gated_harness();
    let inserting = gated_insert(&h.cache, &gate);

    h.xkey.deactivate();
    h.xkey.activate();
    gate.release.wait();
    inserting.join().expect("insert thread should not panic");

    // The event was dispatched to the old registration only.
    assert!(h.xkey.stats().is_empty());
    assert_eq!(h.xkey.purge(Some("foo")), 0);
}

#[test]
fn nested_activations_keep_the_index() {
    let h = harness();
    h.xkey.activate();
    h.cache.insert(vec!["xkey: foo".into()], fresh());

    h.xkey.deactivate();
    assert!(h.xkey.is_active());
    assert_eq!(h.xkey.purge(Some("foo")), 1);
}

#[test]
fn custom_header_names_and_domain() {
    let config = XkeyConfig {
        header_names: vec!["Surrogate-Key".into()],
        digest_domain: Some("edge".into()),
        ..Default::default()
    };
    let h = harness_with(config);
    h.cache.insert(vec!["xkey: ignored".into()], fresh());
    h.cache.insert(vec!["surrogate-key: foo".into()], fresh());

    assert_eq!(h.xkey.purge(Some("ignored")), 0);
    assert_eq!(h.xkey.purge(Some("foo")), 1);
}

#[test]
fn pooling_disabled_still_works() {
    let config = XkeyConfig {
        pool_capacity: 0,
        ..Default::default()
    };
    let h = harness_with(config);
    for _ in 0..3 {
        let obj = h.cache.insert(vec!["xkey: a b c".into()], fresh());
        h.cache.remove(obj.handle());
    }
    assert_eq!(h.xkey.stats().pooled(), 0);
    assert!(h.xkey.stats().is_empty());
}

#[test]
fn concurrent_inserts_removes_and_purges() {
    let h = harness();
    let cache = h.cache.clone();
    let xkey = Arc::new(h.xkey);

    let workers: Vec<_> = (0..4)
        .map(|t| {
            let cache = Arc::clone(&cache);
            let xkey = Arc::clone(&xkey);
            thread::spawn(move || {
                for i in 0..100 {
                    let header = format!("xkey: shared t{t} k{}", i % 7);
                    let obj = cache.insert(vec![header], Expiry::new(NOW, 60.0, 0.0, 0.0));
                    xkey.purge(Some("shared"));
                    if i % 3 != 0 {
                        cache.remove(obj.handle());
                    }
                }
            })
        })
        .collect();

    for w in workers {
        w.join().expect("worker should not panic");
    }

    xkey.verify().unwrap();
    let survivors = cache.len();
    assert_eq!(xkey.stats().object_buckets, survivors);
    assert_eq!(xkey.stats().links, survivors * 3);
}
