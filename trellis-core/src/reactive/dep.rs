//! Dependency
//!
//! A Dependency is a publish point: reading the value it guards registers
//! the current tracking target as a subscriber, and writing the value
//! notifies every subscriber.
//!
//! # How Dependencies Work
//!
//! 1. `depend()` asks the runtime's [`Tracker`](super::Tracker) for the
//!    current target and calls `add_dep` on it. The subscriber decides
//!    whether it is a new edge and calls back into `subscribe`.
//!
//! 2. `notify()` snapshots the subscriber list before calling any of them,
//!    so subscribers may subscribe or unsubscribe while being notified.
//!
//! 3. In synchronous mode the snapshot is sorted by watcher id so
//!    notification order is deterministic.
//!
//! Dependencies carry a handle to their runtime. Tracking is therefore never
//! ambient: two runtimes on one thread never see each other's targets.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::runtime::Runtime;
use super::subscriber::{Subscriber, WatcherId};

/// Counter for generating unique dependency ids.
static DEP_ID_COUNTER: AtomicU64 = AtomicU64::new(0);

fn next_dep_id() -> DepId {
    DepId(DEP_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
}

/// Unique identifier for a dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DepId(u64);

/// A publish point for one piece of reactive state.
#[derive(Clone)]
pub struct Dependency {
    inner: Rc<DepInner>,
}

struct DepInner {
    id: DepId,
    rt: Runtime,
    subscribers: RefCell<IndexMap<WatcherId, Weak<dyn Subscriber>>>,
}

impl Dependency {
    pub fn new(rt: &Runtime) -> Self {
        Self {
            inner: Rc::new(DepInner {
                id: next_dep_id(),
                rt: rt.clone(),
                subscribers: RefCell::new(IndexMap::new()),
            }),
        }
    }

    pub fn id(&self) -> DepId {
        self.inner.id
    }

    /// The runtime this dependency reports to.
    pub fn runtime(&self) -> &Runtime {
        &self.inner.rt
    }

    /// Register the current tracking target, if any, as a dependent.
    pub fn depend(&self) {
        if let Some(target) = self.inner.rt.tracker().current() {
            target.add_dep(self);
        }
    }

    /// Add `subscriber` to the notification list. Idempotent per id.
    pub fn subscribe(&self, id: WatcherId, subscriber: Weak<dyn Subscriber>) {
        self.inner.subscribers.borrow_mut().insert(id, subscriber);
    }

    /// Remove the subscriber with the given id.
    pub fn unsubscribe(&self, id: WatcherId) {
        self.inner.subscribers.borrow_mut().shift_remove(&id);
    }

    /// Notify every live subscriber.
    pub fn notify(&self) {
        let mut subscribers: SmallVec<[Rc<dyn Subscriber>; 8]> = self
            .inner
            .subscribers
            .borrow()
            .values()
            .filter_map(Weak::upgrade)
            .collect();

        if !self.inner.rt.is_async() {
            subscribers.sort_by_key(|subscriber| subscriber.id());
        }

        for subscriber in subscribers {
            subscriber.update();
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .borrow()
            .values()
            .filter(|subscriber| subscriber.strong_count() > 0)
            .count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.subscriber_count() > 0
    }

    /// Whether `id` is currently subscribed.
    pub fn is_subscribed(&self, id: WatcherId) -> bool {
        self.inner.subscribers.borrow().contains_key(&id)
    }

    pub fn ptr_eq(&self, other: &Dependency) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("id", &self.inner.id)
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use std::cell::Cell;

    struct Recorder {
        id: WatcherId,
        me: Weak<Recorder>,
        updates: Cell<usize>,
        log: Rc<RefCell<Vec<u64>>>,
    }

    impl Recorder {
        fn new(raw: u64, log: &Rc<RefCell<Vec<u64>>>) -> Rc<Self> {
            Rc::new_cyclic(|me| Recorder {
                id: WatcherId::from_raw(raw),
                me: me.clone(),
                updates: Cell::new(0),
                log: log.clone(),
            })
        }
    }

    impl Subscriber for Recorder {
        fn id(&self) -> WatcherId {
            self.id
        }

        fn update(&self) {
            self.updates.set(self.updates.get() + 1);
            self.log.borrow_mut().push(self.id.raw());
        }

        fn add_dep(&self, dep: &Dependency) {
            let me: Weak<dyn Subscriber> = self.me.clone();
            dep.subscribe(self.id, me);
        }
    }

    #[test]
    fn depend_registers_current_target_once() {
        let rt = Runtime::new(Config::default());
        let dep = Dependency::new(&rt);
        let log = Rc::new(RefCell::new(Vec::new()));
        let recorder = Recorder::new(1, &log);

        {
            let target: Rc<dyn Subscriber> = recorder.clone();
            let _scope = rt.tracker().enter(Some(target));
            dep.depend();
            dep.depend();
        }

        assert_eq!(dep.subscriber_count(), 1);
        dep.notify();
        assert_eq!(recorder.updates.get(), 1);
    }

    #[test]
    fn depend_without_target_is_a_no_op() {
        let rt = Runtime::new(Config::default());
        let dep = Dependency::new(&rt);
        dep.depend();
        assert!(!dep.has_subscribers());
    }

    #[test]
    fn synchronous_mode_notifies_in_id_order() {
        let rt = Runtime::new(Config::synchronous());
        let dep = Dependency::new(&rt);
        let log = Rc::new(RefCell::new(Vec::new()));
        let late = Recorder::new(9, &log);
        let early = Recorder::new(2, &log);

        late.add_dep(&dep);
        early.add_dep(&dep);
        dep.notify();

        assert_eq!(*log.borrow(), vec![2, 9]);
    }

    #[test]
    fn dropped_subscribers_are_skipped() {
        let rt = Runtime::new(Config::default());
        let dep = Dependency::new(&rt);
        let log = Rc::new(RefCell::new(Vec::new()));
        {
            let gone = Recorder::new(3, &log);
            gone.add_dep(&dep);
        }
        dep.notify();
        assert!(log.borrow().is_empty());
        assert_eq!(dep.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_removes_edge() {
        let rt = Runtime::new(Config::default());
        let dep = Dependency::new(&rt);
        let log = Rc::new(RefCell::new(Vec::new()));
        let recorder = Recorder::new(4, &log);
        recorder.add_dep(&dep);
        assert!(dep.is_subscribed(WatcherId::from_raw(4)));

        dep.unsubscribe(WatcherId::from_raw(4));
        dep.notify();
        assert_eq!(recorder.updates.get(), 0);
    }
}
