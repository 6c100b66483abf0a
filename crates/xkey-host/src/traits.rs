use std::sync::Arc;

use xkey_types::{Expiry, ObjectHandle};

use crate::event::{ListenerHandle, ObjectEvent};

/// One cached object, as exposed by the host.
///
/// Implementations must satisfy these rules:
/// - `handle()` is stable for the object's whole life and unique among live
///   objects.
/// - `headers()` yields the stored response header lines, `name: value`.
/// - `rearm()` is non-blocking and must not call back into xkey.
pub trait CachedObject: Send + Sync {
    /// The host's identity for this object.
    fn handle(&self) -> ObjectHandle;

    /// Stored response header lines.
    fn headers(&self) -> &[String];

    /// Whether the object is still being populated by an in-flight fetch.
    fn is_busy(&self) -> bool;

    /// Current expiry record.
    fn expiry(&self) -> Expiry;

    /// Replace the object's expiry record.
    fn rearm(&self, expiry: Expiry);
}

/// Receiver of object lifecycle events.
///
/// Invoked synchronously on the host thread that triggered the event.
pub trait ObjectListener: Send + Sync {
    fn on_event(&self, object: &Arc<dyn CachedObject>, event: ObjectEvent);
}

/// The host's object-lifecycle notifier.
pub trait ObjectNotifier: Send + Sync {
    /// Register a listener for Inserted, Injected and Removed events.
    fn register(&self, listener: Arc<dyn ObjectListener>) -> ListenerHandle;

    /// Deregister a listener. Events dispatched after this returns do not
    /// reach it, but an event already being dispatched on another thread may
    /// still arrive. Listeners must tolerate such late events.
    fn deregister(&self, handle: ListenerHandle);
}
