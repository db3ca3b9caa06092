//! The seam between watchers and the components that own them.
//!
//! Watchers never depend on the component layer directly. Everything a
//! watcher, the scheduler or the error reporter needs from a component goes
//! through [`Owner`].

use std::rc::Rc;

use super::value::Value;
use super::watcher::Watcher;
use crate::error::{Error, Result};

/// A component-like owner of watchers.
pub trait Owner {
    /// Unique, creation-ordered instance id.
    fn uid(&self) -> u64;

    /// Name used in warnings and log lines.
    fn display_name(&self) -> String;

    /// Called by [`Watcher::new`] before the first evaluation. Render
    /// watchers become the owner's render watcher, every other kind is
    /// added to its watcher list.
    fn attach_watcher(&self, watcher: &Watcher);

    /// Called on teardown unless the owner is being destroyed.
    fn detach_watcher(&self, watcher: &Watcher);

    fn is_being_destroyed(&self) -> bool;

    fn is_mounted(&self) -> bool;

    fn is_destroyed(&self) -> bool;

    /// Tracked read of an instance property, used by path getters.
    fn lookup(&self, key: &str) -> Value;

    /// The nearest enclosing owner, for error propagation.
    fn parent_owner(&self) -> Option<Rc<dyn Owner>>;

    /// Offer an error raised at or below this owner to its error-capture
    /// hooks. `Ok(false)` stops propagation.
    fn capture_error(&self, err: &Error, source: &Rc<dyn Owner>, info: &str) -> Result<bool>;

    /// Post-flush notification that the owner's render watcher ran.
    fn after_update(&self);

    /// Post-flush notification that the owner was re-activated by a
    /// keep-alive parent.
    fn after_activate(&self);
}
