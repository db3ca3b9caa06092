//! Subscriber types for the reactive system.
//!
//! A subscriber is any computation a [`Dependency`] can notify. In practice
//! that is a [`Watcher`](super::Watcher) of one of three kinds: render,
//! computed, or user.

use super::dep::Dependency;

/// Identifier for a subscriber.
///
/// Ids are handed out by the owning runtime in creation order and double as
/// the flush order: a parent's watchers are always created before its
/// children's, and user watchers before the render watcher of the same
/// component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WatcherId(u64);

impl WatcherId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A subscriber to reactive values.
///
/// Dependencies hold subscribers weakly, so dropping the last handle to a
/// subscriber is enough to stop it receiving notifications.
pub trait Subscriber {
    /// The subscriber's unique, creation-ordered id.
    fn id(&self) -> WatcherId;

    /// Called when one of the subscriber's dependencies changed.
    fn update(&self);

    /// Record that `dep` was read while this subscriber was the tracking
    /// target.
    fn add_dep(&self, dep: &Dependency);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_order_by_creation() {
        let first = WatcherId::from_raw(1);
        let second = WatcherId::from_raw(2);

        assert!(first < second);
        assert_eq!(second.raw(), 2);
    }
}
