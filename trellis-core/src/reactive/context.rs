//! Tracking Context
//!
//! The tracking context records which subscriber is currently evaluating.
//! When a [`Dependency`](super::Dependency) is read, it registers the
//! current subscriber as a dependent.
//!
//! # Implementation
//!
//! Each [`Runtime`](super::Runtime) owns one [`Tracker`]: a stack of optional
//! targets. Entering a scope pushes a target and the returned guard pops it
//! again, so the stack stays balanced even when a getter unwinds. Pushing
//! `None` suspends tracking, which is how data initializers and lifecycle
//! hooks run without subscribing whatever watcher happens to be evaluating
//! around them.
//!
//! Nested scopes are the normal case: a render watcher reads a computed
//! property, whose watcher pushes itself while it re-evaluates.

use std::cell::RefCell;
use std::rc::Rc;

use super::subscriber::{Subscriber, WatcherId};

/// The per-runtime stack of tracking targets.
#[derive(Default)]
pub struct Tracker {
    stack: RefCell<Vec<Option<Rc<dyn Subscriber>>>>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `target` the current tracking target until the guard drops.
    ///
    /// Passing `None` disables tracking for the duration of the scope.
    pub fn enter(&self, target: Option<Rc<dyn Subscriber>>) -> TrackingScope<'_> {
        let id = target.as_ref().map(|target| target.id());
        self.stack.borrow_mut().push(target);
        TrackingScope { tracker: self, id }
    }

    /// Run `f` with tracking disabled.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = self.enter(None);
        f()
    }

    /// The subscriber that reads should register with, if any.
    pub fn current(&self) -> Option<Rc<dyn Subscriber>> {
        self.stack.borrow().last().cloned().flatten()
    }

    /// Whether a tracking target is installed at the top of the stack.
    pub fn is_tracking(&self) -> bool {
        matches!(self.stack.borrow().last(), Some(Some(_)))
    }

    /// Number of open scopes, tracked or not.
    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }
}

/// Guard returned by [`Tracker::enter`]. Pops its entry when dropped.
pub struct TrackingScope<'a> {
    tracker: &'a Tracker,
    id: Option<WatcherId>,
}

impl Drop for TrackingScope<'_> {
    fn drop(&mut self) {
        let popped = self.tracker.stack.borrow_mut().pop();

        // Scopes must close in the order they were opened.
        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.as_ref().map(|target| target.id()),
                self.id,
                "tracking scope mismatch"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Dependency;

    struct Probe(WatcherId);

    impl Subscriber for Probe {
        fn id(&self) -> WatcherId {
            self.0
        }
        fn update(&self) {}
        fn add_dep(&self, _dep: &Dependency) {}
    }

    fn probe(raw: u64) -> Rc<dyn Subscriber> {
        Rc::new(Probe(WatcherId::from_raw(raw)))
    }

    #[test]
    fn scope_installs_and_removes_target() {
        let tracker = Tracker::new();
        assert!(!tracker.is_tracking());

        {
            let _scope = tracker.enter(Some(probe(1)));
            assert!(tracker.is_tracking());
            assert_eq!(tracker.current().map(|s| s.id()), Some(WatcherId::from_raw(1)));
        }

        assert!(!tracker.is_tracking());
        assert_eq!(tracker.depth(), 0);
    }

    #[test]
    fn nested_scopes_restore_outer_target() {
        let tracker = Tracker::new();
        let _outer = tracker.enter(Some(probe(1)));
        {
            let _inner = tracker.enter(Some(probe(2)));
            assert_eq!(tracker.current().map(|s| s.id()), Some(WatcherId::from_raw(2)));
        }
        assert_eq!(tracker.current().map(|s| s.id()), Some(WatcherId::from_raw(1)));
    }

    #[test]
    fn untracked_suspends_outer_target() {
        let tracker = Tracker::new();
        let _outer = tracker.enter(Some(probe(7)));

        let inside = tracker.untracked(|| tracker.current().is_none());
        assert!(inside);
        assert!(tracker.is_tracking());
    }
}
