//! Host cache capabilities consumed by xkey.
//!
//! xkey never owns cached objects. It consumes four capabilities of the host
//! cache: an object-lifecycle notifier, header enumeration, a busy flag, and
//! the expiry rearm primitive. This crate defines them as traits and ships an
//! in-memory host used by tests, the CLI, and embedders.
//!
//! # Key Types
//!
//! - [`CachedObject`]: One cached object as seen by xkey
//! - [`ObjectNotifier`] / [`ObjectListener`]: Lifecycle event registration
//! - [`ObjectEvent`]: Inserted, Injected, Removed
//! - [`Clock`]: Source of "now" for soft purges
//! - [`InMemoryCache`]: Reference host backed by a `BTreeMap`

pub mod clock;
pub mod event;
pub mod memory;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use event::{ListenerHandle, ObjectEvent};
pub use memory::{InMemoryCache, MemoryObject};
pub use traits::{CachedObject, ObjectListener, ObjectNotifier};
