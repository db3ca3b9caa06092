//! Reactive Primitives
//!
//! This module implements the change-tracking core: dependencies, observed
//! values, and watchers. Components, the scheduler and the patch engine are
//! all built on top of it.
//!
//! # Concepts
//!
//! ## Dependencies
//!
//! A [`Dependency`] guards one piece of state. Reading the state while a
//! watcher evaluates records an edge; writing it notifies every watcher on
//! the other end of an edge.
//!
//! ## Values
//!
//! Component state is a dynamic [`Value`] tree. [`observe`] converts the
//! containers in a tree so that every property read and every array
//! mutation goes through a dependency. [`Signal`] is the typed alternative
//! for a single cell.
//!
//! ## Watchers
//!
//! A [`Watcher`] evaluates a getter with itself as the tracking target, so it
//! learns exactly what it read. Render, computed and user watchers are
//! configured through [`WatcherOptions`].
//!
//! # Implementation Notes
//!
//! Tracking state is owned by a [`Runtime`] rather than being global: each
//! dependency carries a runtime handle and consults that runtime's
//! [`Tracker`].

mod context;
mod dep;
mod observer;
mod owner;
mod runtime;
mod signal;
mod subscriber;
mod traverse;
mod value;
mod watcher;

pub use context::{Tracker, TrackingScope};
pub use dep::{DepId, Dependency};
pub use observer::{define_reactive, del, observe, set, PropKey};
pub use owner::Owner;
pub use runtime::{ErrorHandler, Runtime, WarnHandler, WeakRuntime};
pub use signal::Signal;
pub use subscriber::{Subscriber, WatcherId};
pub use traverse::traverse;
pub use value::{Array, Object, Value};
pub use watcher::{Callback, Getter, GetterFn, Watcher, WatcherOptions};

pub(crate) use value::format_number;
