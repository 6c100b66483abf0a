use std::fmt;
use std::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// Object lifecycle events delivered to registered listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectEvent {
    /// The object entered the cache through a regular fetch.
    Inserted,
    /// The object was injected into the cache directly.
    Injected,
    /// The object reached end-of-life. Delivered exactly once per object.
    Removed,
}

impl fmt::Display for ObjectEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectEvent::Inserted => write!(f, "inserted"),
            ObjectEvent::Injected => write!(f, "injected"),
            ObjectEvent::Removed => write!(f, "removed"),
        }
    }
}

/// Registration handle returned by [`ObjectNotifier::register`].
///
/// [`ObjectNotifier::register`]: crate::ObjectNotifier::register
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerHandle(NonZeroU64);

impl ListenerHandle {
    /// Wrap a raw, non-zero registration id.
    pub const fn new(raw: NonZeroU64) -> Self {
        Self(raw)
    }

    /// The raw registration id.
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_display() {
        assert_eq!(ObjectEvent::Inserted.to_string(), "inserted");
        assert_eq!(ObjectEvent::Injected.to_string(), "injected");
        assert_eq!(ObjectEvent::Removed.to_string(), "removed");
    }

    #[test]
    fn listener_handle_roundtrip() {
        let raw = NonZeroU64::new(3).unwrap();
        assert_eq!(ListenerHandle::new(raw).get(), 3);
    }
}
