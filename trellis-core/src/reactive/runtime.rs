//! Reactive Runtime
//!
//! The runtime is the explicit context that connects dependencies, watchers
//! and the scheduler. Everything that would otherwise be process-global
//! lives here:
//!
//! - the tracking stack,
//! - the flush queue and its tick source,
//! - watcher and instance id counters,
//! - the configuration and the error and warning handlers.
//!
//! # How It Works
//!
//! 1. Dependencies and watchers keep a cloned [`Runtime`] handle, so reads
//!    always register with the tracker of the runtime they belong to.
//!
//! 2. When a dependency notifies a queued watcher, the runtime hands it to
//!    the scheduler, which arranges a flush on the next tick.
//!
//! 3. Errors raised by user code are routed through [`Runtime::handle_error`],
//!    which walks the owner chain before falling back to the global handler.
//!
//! # Threading
//!
//! The runtime is single-threaded by construction (`Rc`, not `Arc`). Run one
//! runtime per thread.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::fmt;
use std::rc::{Rc, Weak};

use super::context::Tracker;
use super::dep::DepId;
use super::owner::Owner;
use super::subscriber::WatcherId;
use super::watcher::Watcher;
use crate::config::Config;
use crate::error::{Error, Warning};
use crate::scheduler::{QueueTicker, Scheduler, Ticker};

/// Global error handler: the error, the owner it came from and a short
/// description of where it was raised.
pub type ErrorHandler = Rc<dyn Fn(&Error, Option<&Rc<dyn Owner>>, &str)>;

/// Global warning handler: the warning and the name of the component that
/// triggered it, if known.
pub type WarnHandler = Rc<dyn Fn(&Warning, Option<&str>)>;

/// Handle to a reactive runtime. Cloning shares the runtime.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

/// Non-owning handle to a runtime, held by scheduled jobs.
#[derive(Clone)]
pub struct WeakRuntime(Weak<RuntimeInner>);

impl WeakRuntime {
    pub fn upgrade(&self) -> Option<Runtime> {
        self.0.upgrade().map(|inner| Runtime { inner })
    }
}

struct RuntimeInner {
    config: RefCell<Config>,
    tracker: Tracker,
    scheduler: Scheduler,
    ticker: RefCell<Rc<dyn Ticker>>,
    tick_callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
    tick_pending: Cell<bool>,
    error_handler: RefCell<Option<ErrorHandler>>,
    warn_handler: RefCell<Option<WarnHandler>>,
    next_watcher: Cell<u64>,
    next_uid: Cell<u64>,
    seen: RefCell<HashSet<DepId>>,
}

impl Runtime {
    /// Create a runtime that schedules ticks on an in-process queue drained
    /// by [`Runtime::drain`].
    pub fn new(config: Config) -> Self {
        Self::with_ticker(config, Rc::new(QueueTicker::default()))
    }

    /// Create a runtime with a custom tick source.
    pub fn with_ticker(config: Config, ticker: Rc<dyn Ticker>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner {
                config: RefCell::new(config),
                tracker: Tracker::new(),
                scheduler: Scheduler::new(),
                ticker: RefCell::new(ticker),
                tick_callbacks: RefCell::new(Vec::new()),
                tick_pending: Cell::new(false),
                error_handler: RefCell::new(None),
                warn_handler: RefCell::new(None),
                next_watcher: Cell::new(0),
                next_uid: Cell::new(0),
                seen: RefCell::new(HashSet::new()),
            }),
        }
    }

    pub fn downgrade(&self) -> WeakRuntime {
        WeakRuntime(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Runtime) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    pub fn config(&self) -> Config {
        self.inner.config.borrow().clone()
    }

    pub fn set_config(&self, config: Config) {
        *self.inner.config.borrow_mut() = config;
    }

    pub fn is_async(&self) -> bool {
        self.inner.config.borrow().async_flush
    }

    pub fn is_silent(&self) -> bool {
        self.inner.config.borrow().silent
    }

    pub fn max_update_count(&self) -> u32 {
        self.inner.config.borrow().max_update_count
    }

    pub fn is_ignored_element(&self, tag: &str) -> bool {
        self.inner.config.borrow().is_ignored_element(tag)
    }

    pub fn performance(&self) -> bool {
        self.inner.config.borrow().performance
    }

    pub fn set_error_handler(&self, handler: impl Fn(&Error, Option<&Rc<dyn Owner>>, &str) + 'static) {
        *self.inner.error_handler.borrow_mut() = Some(Rc::new(handler));
    }

    pub fn set_warn_handler(&self, handler: impl Fn(&Warning, Option<&str>) + 'static) {
        *self.inner.warn_handler.borrow_mut() = Some(Rc::new(handler));
    }

    // ------------------------------------------------------------------
    // Tracking and ids
    // ------------------------------------------------------------------

    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    pub(crate) fn next_watcher_id(&self) -> WatcherId {
        let id = self.inner.next_watcher.get() + 1;
        self.inner.next_watcher.set(id);
        WatcherId::from_raw(id)
    }

    pub(crate) fn next_uid(&self) -> u64 {
        let uid = self.inner.next_uid.get();
        self.inner.next_uid.set(uid + 1);
        uid
    }

    /// Borrow the scratch set used by deep traversal. Nested traversals get
    /// a fresh set.
    pub(crate) fn take_seen(&self) -> HashSet<DepId> {
        std::mem::take(&mut *self.inner.seen.borrow_mut())
    }

    pub(crate) fn restore_seen(&self, mut seen: HashSet<DepId>) {
        seen.clear();
        *self.inner.seen.borrow_mut() = seen;
    }

    // ------------------------------------------------------------------
    // Scheduling
    // ------------------------------------------------------------------

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Hand a watcher to the flush queue.
    pub fn queue_watcher(&self, watcher: Watcher) {
        self.inner.scheduler.queue_watcher(self, watcher);
    }

    /// Queue an owner whose `activated` hook should run after the flush.
    pub fn queue_activated(&self, owner: Rc<dyn Owner>) {
        self.inner.scheduler.queue_activated(owner);
    }

    /// Run `callback` on the next tick. Callbacks registered before the tick
    /// fires run together, in registration order.
    pub fn next_tick(&self, callback: impl FnOnce() + 'static) {
        self.inner.tick_callbacks.borrow_mut().push(Box::new(callback));
        if !self.inner.tick_pending.replace(true) {
            let weak = self.downgrade();
            let ticker = self.inner.ticker.borrow().clone();
            ticker.schedule(Box::new(move || {
                if let Some(rt) = weak.upgrade() {
                    rt.flush_callbacks();
                }
            }));
        }
    }

    fn flush_callbacks(&self) {
        self.inner.tick_pending.set(false);
        let callbacks = std::mem::take(&mut *self.inner.tick_callbacks.borrow_mut());
        for callback in callbacks {
            callback();
        }
    }

    /// Run pending ticks until none remain. Returns the number of ticks run.
    ///
    /// Only meaningful for tick sources that queue in-process, such as the
    /// default [`QueueTicker`].
    pub fn drain(&self) -> usize {
        let mut total = 0;
        loop {
            let ticker = self.inner.ticker.borrow().clone();
            let ran = ticker.run_pending();
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    /// Report an error raised by user code.
    ///
    /// Each ancestor of `owner` is offered the error in turn, starting with
    /// its parent; a capture hook returning `false` stops propagation.
    /// Otherwise the global error handler runs, or the error is logged.
    pub fn handle_error(&self, err: &Error, owner: Option<&Rc<dyn Owner>>, info: &str) {
        if let Some(source) = owner {
            let mut current = source.parent_owner();
            while let Some(cur) = current {
                match cur.capture_error(err, source, info) {
                    Ok(true) => {}
                    Ok(false) => return,
                    Err(hook_err) => {
                        self.global_handle_error(&hook_err, Some(&cur), "errorCaptured hook")
                    }
                }
                current = cur.parent_owner();
            }
        }
        self.global_handle_error(err, owner, info);
    }

    fn global_handle_error(&self, err: &Error, owner: Option<&Rc<dyn Owner>>, info: &str) {
        let handler = self.inner.error_handler.borrow().clone();
        match handler {
            Some(handler) => handler(err, owner, info),
            None if !self.is_silent() => {
                let component = owner.map(|owner| owner.display_name());
                tracing::error!(error = %err, info, component = ?component, "unhandled error");
            }
            None => {}
        }
    }

    /// Emit a development warning.
    pub fn warn(&self, warning: Warning, owner: Option<&dyn Owner>) {
        let component = owner.map(|owner| owner.display_name());
        let handler = self.inner.warn_handler.borrow().clone();
        match handler {
            Some(handler) => handler(&warning, component.as_deref()),
            None if !self.is_silent() => {
                tracing::warn!(component = ?component, "{warning}");
            }
            None => {}
        }
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &*self.inner.config.borrow())
            .field("tracking_depth", &self.inner.tracker.depth())
            .field("queued", &self.inner.scheduler.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_tick_batches_callbacks() {
        let rt = Runtime::new(Config::default());
        let log = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let log = log.clone();
            rt.next_tick(move || log.borrow_mut().push(i));
        }
        assert!(log.borrow().is_empty());

        assert_eq!(rt.drain(), 1);
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn callbacks_registered_during_a_tick_run_on_the_next_one() {
        let rt = Runtime::new(Config::default());
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_rt = rt.clone();
        let inner_log = log.clone();
        rt.next_tick(move || {
            inner_log.borrow_mut().push("outer");
            let log = inner_log.clone();
            inner_rt.next_tick(move || log.borrow_mut().push("inner"));
        });

        assert_eq!(rt.drain(), 2);
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
    }

    #[test]
    fn watcher_ids_increase() {
        let rt = Runtime::new(Config::default());
        let a = rt.next_watcher_id();
        let b = rt.next_watcher_id();
        assert!(a < b);
    }

    #[test]
    fn warnings_reach_the_handler() {
        let rt = Runtime::new(Config::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        rt.set_warn_handler(move |warning, _| sink.borrow_mut().push(warning.clone()));

        rt.warn(Warning::MultipleRootNodes, None);
        assert_eq!(*seen.borrow(), vec![Warning::MultipleRootNodes]);
    }

    #[test]
    fn errors_without_owner_reach_the_global_handler() {
        let rt = Runtime::new(Config::default());
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        rt.set_error_handler(move |err, _, info| {
            sink.borrow_mut().push(format!("{info}: {err}"))
        });

        rt.handle_error(&Error::msg("boom"), None, "nextTick");
        assert_eq!(*seen.borrow(), vec!["nextTick: boom".to_string()]);
    }
}
