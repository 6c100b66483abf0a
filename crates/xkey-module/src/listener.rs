use std::sync::Arc;

use xkey_host::{CachedObject, ObjectEvent, ObjectListener};

use crate::module::Shared;

/// Bridges host lifecycle events into the index.
///
/// Each registration gets its own listener stamped with the registration
/// generation, so events from a deregistered listener can be told apart.
pub(crate) struct XkeyListener {
    shared: Arc<Shared>,
    generation: u64,
}

impl XkeyListener {
    pub(crate) fn new(shared: Arc<Shared>, generation: u64) -> Self {
        Self { shared, generation }
    }
}

impl ObjectListener for XkeyListener {
    fn on_event(&self, object: &Arc<dyn CachedObject>, event: ObjectEvent) {
        match event {
            ObjectEvent::Inserted | ObjectEvent::Injected => {
                self.shared.tag_object(object, self.generation)
            }
            ObjectEvent::Removed => self.shared.untag_object(object.handle(), self.generation),
        }
    }
}
