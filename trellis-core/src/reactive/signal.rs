//! Signal Implementation
//!
//! A Signal is a typed reactive cell: a single value guarded by one
//! [`Dependency`]. It is the statically typed counterpart of a reactive
//! property on an observed [`Object`](super::Object), and is convenient for
//! host-side state that does not need to live in the dynamic value tree.
//!
//! # How Signals Work
//!
//! 1. Reading a signal while a watcher evaluates subscribes the watcher.
//!
//! 2. Setting a different value notifies every subscriber. Setting an equal
//!    value is a no-op.

use std::cell::RefCell;
use std::fmt::{self, Debug};
use std::rc::Rc;

use super::dep::{DepId, Dependency};
use super::runtime::Runtime;

/// A reactive signal holding a value of type `T`.
///
/// # Example
///
/// ```rust,ignore
/// let count = Signal::new(&rt, 0);
///
/// // Read the value (tracked)
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// ```
pub struct Signal<T> {
    value: Rc<RefCell<T>>,
    dep: Dependency,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    pub fn new(rt: &Runtime, value: T) -> Self {
        Self {
            value: Rc::new(RefCell::new(value)),
            dep: Dependency::new(rt),
        }
    }

    pub fn id(&self) -> DepId {
        self.dep.id()
    }

    /// Get the current value, registering the current watcher.
    pub fn get(&self) -> T {
        self.dep.depend();
        self.value.borrow().clone()
    }

    /// Get the current value without tracking.
    pub fn get_untracked(&self) -> T {
        self.value.borrow().clone()
    }

    /// Borrow the value for the duration of `f`, registering the current
    /// watcher.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.dep.depend();
        f(&self.value.borrow())
    }

    /// Set a new value and notify subscribers if it differs.
    pub fn set(&self, value: T) {
        {
            let mut current = self.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        self.dep.notify();
    }

    /// Update the value using a function of the current value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = f(&self.value.borrow());
        self.set(next);
    }

    pub fn subscriber_count(&self) -> usize {
        self.dep.subscriber_count()
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            value: Rc::clone(&self.value),
            dep: self.dep.clone(),
        }
    }
}

impl<T: Debug> Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.dep.id())
            .field("value", &*self.value.borrow())
            .field("subscriber_count", &self.dep.subscriber_count())
            .finish()
    }
}
