//! Update Scheduler
//!
//! The scheduler batches watcher runs. Any number of changes made in one
//! tick cause at most one run per watcher, in a single flush on the next
//! tick.
//!
//! # Algorithm
//!
//! 1. Queueing a watcher is deduplicated by id. The first enqueue of a tick
//!    schedules a flush through the runtime's tick source.
//!
//! 2. The flush sorts the queue by watcher id, so that:
//!    - parents update before children (parents are created first),
//!    - user watchers run before the render watcher of their component,
//!    - a component destroyed by its parent's run is skipped.
//!
//! 3. Watchers queued while flushing are spliced in by id after the cursor,
//!    so they still run in this flush. A watcher that keeps re-queueing
//!    itself is cut off after `max_update_count` runs.
//!
//! 4. Once the queue is exhausted the state resets, then `activated` hooks
//!    run for components re-attached by keep-alive and `updated` hooks run
//!    for mounted components, children first.

mod tick;

pub use tick::{Job, QueueTicker, Ticker, TokioTicker};

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::Warning;
use crate::reactive::{Owner, Runtime, Watcher, WatcherId};

/// The flush queue. One per [`Runtime`].
#[derive(Default)]
pub struct Scheduler {
    queue: RefCell<Vec<Watcher>>,
    activated: RefCell<Vec<Rc<dyn Owner>>>,
    has: RefCell<HashSet<WatcherId>>,
    circular: RefCell<HashMap<WatcherId, u32>>,
    waiting: Cell<bool>,
    flushing: Cell<bool>,
    index: Cell<usize>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `watcher` to the queue unless it is already pending.
    pub fn queue_watcher(&self, rt: &Runtime, watcher: Watcher) {
        let id = watcher.id();
        if !self.has.borrow_mut().insert(id) {
            return;
        }

        {
            let mut queue = self.queue.borrow_mut();
            if !self.flushing.get() {
                queue.push(watcher);
            } else {
                // Splice in by id, but never before the watcher being run.
                let index = self.index.get();
                let mut i = queue.len();
                while i > index + 1 && queue[i - 1].id() > id {
                    i -= 1;
                }
                queue.insert(i, watcher);
            }
        }

        if !self.waiting.replace(true) {
            if !rt.is_async() {
                self.flush(rt);
                return;
            }
            let weak = rt.downgrade();
            rt.next_tick(move || {
                if let Some(rt) = weak.upgrade() {
                    rt.scheduler().flush(&rt);
                }
            });
        }
    }

    /// Queue an owner for its post-flush `activated` notification.
    pub fn queue_activated(&self, owner: Rc<dyn Owner>) {
        self.activated.borrow_mut().push(owner);
    }

    /// Run every queued watcher, then the post-flush hooks.
    pub fn flush(&self, rt: &Runtime) {
        self.flushing.set(true);
        self.queue.borrow_mut().sort_by_key(Watcher::id);

        let max_updates = rt.max_update_count();
        let mut index = 0;
        loop {
            self.index.set(index);
            let watcher = match self.queue.borrow().get(index) {
                Some(watcher) => watcher.clone(),
                None => break,
            };

            watcher.call_before();
            let id = watcher.id();
            self.has.borrow_mut().remove(&id);
            if let Err(err) = watcher.run() {
                let info = if watcher.is_render() {
                    "render watcher"
                } else {
                    "scheduler flush"
                };
                rt.handle_error(&err, watcher.owner().as_ref(), info);
            }

            if self.has.borrow().contains(&id) {
                let runs = {
                    let mut circular = self.circular.borrow_mut();
                    let runs = circular.entry(id).or_insert(0);
                    *runs += 1;
                    *runs
                };
                if runs > max_updates {
                    let owner = watcher.owner();
                    rt.warn(
                        Warning::InfiniteUpdateLoop {
                            expression: watcher.is_user().then(|| watcher.expression().to_string()),
                        },
                        owner.as_deref(),
                    );
                    break;
                }
            }
            index += 1;
        }

        let activated = std::mem::take(&mut *self.activated.borrow_mut());
        let updated = std::mem::take(&mut *self.queue.borrow_mut());
        self.reset();
        tracing::debug!(
            watchers = updated.len(),
            activated = activated.len(),
            "flushed scheduler queue"
        );

        for owner in activated.iter().rev() {
            owner.after_activate();
        }
        for watcher in updated.iter().rev() {
            if watcher.is_render() {
                if let Some(owner) = watcher.owner() {
                    if owner.is_mounted() {
                        owner.after_update();
                    }
                }
            }
        }
    }

    fn reset(&self) {
        self.index.set(0);
        self.queue.borrow_mut().clear();
        self.activated.borrow_mut().clear();
        self.has.borrow_mut().clear();
        self.circular.borrow_mut().clear();
        self.waiting.set(false);
        self.flushing.set(false);
    }

    pub fn is_flushing(&self) -> bool {
        self.flushing.get()
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting.get()
    }

    /// Watchers queued and not yet run.
    pub fn pending_count(&self) -> usize {
        self.has.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::reactive::{observe, Getter, Value, WatcherOptions};
    use serde_json::json;

    fn logging_watcher(rt: &Runtime, data: &Value, key: &'static str, log: &Rc<RefCell<Vec<String>>>) -> Watcher {
        let source = data.clone();
        let log = log.clone();
        Watcher::new(
            rt,
            None,
            Getter::func(move || {
                let value = source.get(key);
                log.borrow_mut().push(format!("{key}={value}"));
                Ok(value)
            }),
            None,
            WatcherOptions::default(),
        )
        .unwrap()
    }

    #[test]
    fn changes_in_one_tick_run_once() {
        let rt = Runtime::new(Config::default());
        let data = Value::from_json(json!({ "a": 0 }));
        observe(&rt, &data);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _watcher = logging_watcher(&rt, &data, "a", &log);
        log.borrow_mut().clear();

        let obj = data.as_object().unwrap();
        for n in 1..=5 {
            obj.set("a", Value::from(n));
        }
        assert!(log.borrow().is_empty());
        assert_eq!(rt.scheduler().pending_count(), 1);

        rt.drain();
        assert_eq!(*log.borrow(), vec!["a=5".to_string()]);
        assert!(!rt.scheduler().is_waiting());
    }

    #[test]
    fn flush_runs_in_id_order() {
        let rt = Runtime::new(Config::default());
        let data = Value::from_json(json!({ "a": 0, "b": 0 }));
        observe(&rt, &data);
        let log = Rc::new(RefCell::new(Vec::new()));
        let _first = logging_watcher(&rt, &data, "a", &log);
        let _second = logging_watcher(&rt, &data, "b", &log);
        log.borrow_mut().clear();

        let obj = data.as_object().unwrap();
        obj.set("b", Value::from(1));
        obj.set("a", Value::from(1));
        rt.drain();

        assert_eq!(*log.borrow(), vec!["a=1".to_string(), "b=1".to_string()]);
    }

    #[test]
    fn watchers_queued_during_flush_run_in_same_flush() {
        let rt = Runtime::new(Config::default());
        let data = Value::from_json(json!({ "a": 0, "b": 0 }));
        observe(&rt, &data);
        let log = Rc::new(RefCell::new(Vec::new()));

        // The first watcher writes `b` whenever `a` changes.
        let source = data.clone();
        let _writer = Watcher::new(
            &rt,
            None,
            Getter::func(move || {
                let a = source.get("a");
                source.as_object().unwrap().set("b", a.clone());
                Ok(a)
            }),
            None,
            WatcherOptions::default(),
        )
        .unwrap();
        let _reader = logging_watcher(&rt, &data, "b", &log);
        log.borrow_mut().clear();

        data.as_object().unwrap().set("a", Value::from(7));
        assert_eq!(rt.drain(), 1);
        assert_eq!(*log.borrow(), vec!["b=7".to_string()]);
    }

    #[test]
    fn runaway_watcher_is_cut_off() {
        let config = Config {
            max_update_count: 10,
            ..Config::default()
        };
        let rt = Runtime::new(config);
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let sink = warnings.clone();
        rt.set_warn_handler(move |warning, _| sink.borrow_mut().push(warning.clone()));

        let data = Value::from_json(json!({ "n": 0 }));
        observe(&rt, &data);
        let target = data.clone();
        let source = data.clone();
        let _looping = Watcher::new(
            &rt,
            None,
            Getter::func(move || {
                let n = source.get("n").as_f64().unwrap_or_default();
                target.as_object().unwrap().set("n", Value::from(n + 1.0));
                Ok(Value::Null)
            }),
            None,
            WatcherOptions::user().expression("n"),
        )
        .unwrap();

        data.as_object().unwrap().set("n", Value::from(100));
        rt.drain();

        assert_eq!(
            *warnings.borrow(),
            vec![Warning::InfiniteUpdateLoop {
                expression: Some("n".into())
            }]
        );
        assert!(!rt.scheduler().is_flushing());
        assert!(!rt.scheduler().is_waiting());
    }
}
