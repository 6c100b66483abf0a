//! Lifecycle adapter for the xkey secondary-key index.
//!
//! [`Xkey`] is the one owned context a host embeds. Activation is reference
//! counted: the first activation registers a listener with the host's object
//! notifier, the last deactivation deregisters it and tears the index down.
//! While registered, inserted and injected objects are tagged with the keys
//! found in their key headers, and removed objects are untagged. Purges go
//! straight to the index and rearm the expiry of matching objects.

pub mod config;
pub mod error;
pub mod headers;
mod listener;
pub mod module;

pub use config::XkeyConfig;
pub use error::{ModuleError, ModuleResult};
pub use headers::HeaderMatcher;
pub use module::Xkey;
