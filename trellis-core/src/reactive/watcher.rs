//! Watcher Implementation
//!
//! A Watcher evaluates a getter while tracking what it reads, and reacts
//! when any of those reads change. Three kinds share this one type:
//!
//! - **Render** watchers re-render and patch a component. They are queued
//!   and report to their owner after each flush.
//! - **Computed** watchers are lazy: a change only marks them dirty, and the
//!   next read re-evaluates. While something depends on a computed watcher
//!   it switches to eager mode and re-evaluates on change, notifying its
//!   own dependents only when the result actually changed.
//! - **User** watchers invoke a callback with the new and old values. Their
//!   getter and callback errors are reported instead of propagated.
//!
//! # Dependency Bookkeeping
//!
//! Every evaluation collects a fresh dependency set. Afterwards the watcher
//! unsubscribes from anything it no longer read and swaps the sets, so a
//! branch that stopped being taken stops causing updates.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::dep::{DepId, Dependency};
use super::owner::Owner;
use super::runtime::Runtime;
use super::subscriber::{Subscriber, WatcherId};
use super::traverse::traverse;
use super::value::Value;
use crate::error::{Result, Warning};

/// A getter closure.
pub type GetterFn = Rc<dyn Fn() -> Result<Value>>;

/// A change callback, invoked with `(new, old)`.
pub type Callback = Rc<dyn Fn(&Value, &Value) -> Result<()>>;

/// What a watcher evaluates.
#[derive(Clone)]
pub enum Getter {
    /// An arbitrary closure.
    Func(GetterFn),
    /// A dot-delimited path looked up on the owner.
    Path(SmallVec<[String; 4]>),
}

impl Getter {
    pub fn func(f: impl Fn() -> Result<Value> + 'static) -> Self {
        Getter::Func(Rc::new(f))
    }

    /// Parse a dot-delimited path such as `a.b.c`. Returns `None` for
    /// anything that is not a simple path.
    pub fn path(expression: &str) -> Option<Self> {
        let valid = |segment: &str| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        };
        let segments: SmallVec<[String; 4]> =
            expression.split('.').map(str::to_string).collect();
        if segments.iter().all(|segment| valid(segment)) {
            Some(Getter::Path(segments))
        } else {
            None
        }
    }
}

/// Watcher behavior flags.
#[derive(Clone, Default)]
pub struct WatcherOptions {
    /// Traverse the result so nested reads are tracked too.
    pub deep: bool,
    /// Report getter and callback errors instead of propagating them.
    pub user: bool,
    /// Evaluate lazily on read.
    pub computed: bool,
    /// Run immediately on change instead of queueing.
    pub sync: bool,
    /// The watcher renders its owner.
    pub render: bool,
    /// Called by the scheduler right before the watcher runs.
    pub before: Option<Rc<dyn Fn()>>,
    /// Source text, used in diagnostics.
    pub expression: Option<String>,
}

impl WatcherOptions {
    pub fn user() -> Self {
        Self {
            user: true,
            ..Self::default()
        }
    }

    pub fn computed() -> Self {
        Self {
            computed: true,
            ..Self::default()
        }
    }

    pub fn render() -> Self {
        Self {
            render: true,
            ..Self::default()
        }
    }

    pub fn deep(mut self, deep: bool) -> Self {
        self.deep = deep;
        self
    }

    pub fn sync(mut self, sync: bool) -> Self {
        self.sync = sync;
        self
    }

    pub fn before(mut self, before: impl Fn() + 'static) -> Self {
        self.before = Some(Rc::new(before));
        self
    }

    pub fn expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = Some(expression.into());
        self
    }
}

/// Handle to a watcher. Cloning shares the watcher.
#[derive(Clone)]
pub struct Watcher {
    inner: Rc<WatcherInner>,
}

struct WatcherInner {
    id: WatcherId,
    me: Weak<WatcherInner>,
    rt: Runtime,
    owner: Option<Weak<dyn Owner>>,
    getter: Getter,
    callback: Option<Callback>,
    deep: bool,
    user: bool,
    computed: bool,
    sync: bool,
    render: bool,
    before: Option<Rc<dyn Fn()>>,
    expression: String,
    active: Cell<bool>,
    dirty: Cell<bool>,
    evaluations: Cell<usize>,
    value: RefCell<Value>,
    /// Computed watchers publish through their own dependency.
    dep: Option<Dependency>,
    deps: RefCell<IndexMap<DepId, Dependency>>,
    new_deps: RefCell<IndexMap<DepId, Dependency>>,
}

impl Watcher {
    /// Create a watcher. Non-computed watchers evaluate immediately.
    ///
    /// A path getter that fails to parse is replaced with one that always
    /// yields `Null`, after a warning.
    pub fn new(
        rt: &Runtime,
        owner: Option<Rc<dyn Owner>>,
        getter: Getter,
        callback: Option<Callback>,
        options: WatcherOptions,
    ) -> Result<Self> {
        let id = rt.next_watcher_id();
        let expression = options.expression.clone().unwrap_or_else(|| match &getter {
            Getter::Path(segments) => segments.join("."),
            Getter::Func(_) => String::new(),
        });
        let weak_owner = owner.as_ref().map(Rc::downgrade);

        let inner = Rc::new_cyclic(|me| WatcherInner {
            id,
            me: me.clone(),
            rt: rt.clone(),
            owner: weak_owner,
            getter,
            callback,
            deep: options.deep,
            user: options.user,
            computed: options.computed,
            sync: options.sync,
            render: options.render,
            before: options.before,
            expression,
            active: Cell::new(true),
            dirty: Cell::new(options.computed),
            evaluations: Cell::new(0),
            value: RefCell::new(Value::Null),
            dep: options.computed.then(|| Dependency::new(rt)),
            deps: RefCell::new(IndexMap::new()),
            new_deps: RefCell::new(IndexMap::new()),
        });
        let watcher = Watcher { inner };

        if let Some(owner) = &owner {
            owner.attach_watcher(&watcher);
        }

        if !watcher.inner.computed {
            let value = watcher.get()?;
            *watcher.inner.value.borrow_mut() = value;
        }

        Ok(watcher)
    }

    /// Create a watcher from a path expression, warning when it is invalid.
    pub fn with_path(
        rt: &Runtime,
        owner: Option<Rc<dyn Owner>>,
        expression: &str,
        callback: Option<Callback>,
        options: WatcherOptions,
    ) -> Result<Self> {
        let getter = match Getter::path(expression) {
            Some(getter) => getter,
            None => {
                rt.warn(
                    Warning::InvalidWatchPath(expression.to_string()),
                    owner.as_deref(),
                );
                Getter::func(|| Ok(Value::Null))
            }
        };
        Self::new(rt, owner, getter, callback, options.expression(expression))
    }

    pub fn id(&self) -> WatcherId {
        self.inner.id
    }

    pub fn owner(&self) -> Option<Rc<dyn Owner>> {
        self.inner.owner.as_ref().and_then(Weak::upgrade)
    }

    /// The last evaluated value.
    pub fn value(&self) -> Value {
        self.inner.value.borrow().clone()
    }

    pub fn expression(&self) -> &str {
        &self.inner.expression
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.get()
    }

    pub fn is_user(&self) -> bool {
        self.inner.user
    }

    pub fn is_render(&self) -> bool {
        self.inner.render
    }

    pub fn is_computed(&self) -> bool {
        self.inner.computed
    }

    pub fn is_deep(&self) -> bool {
        self.inner.deep
    }

    /// How many times the getter has run.
    pub fn evaluations(&self) -> usize {
        self.inner.evaluations.get()
    }

    /// Number of dependencies recorded by the last evaluation.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.borrow().len()
    }

    /// Whether the last evaluation read `dep`.
    pub fn depends_on(&self, dep: &Dependency) -> bool {
        self.inner.deps.borrow().contains_key(&dep.id())
    }

    /// The computed watcher's own publish point.
    pub fn dep(&self) -> Option<&Dependency> {
        self.inner.dep.as_ref()
    }

    pub fn ptr_eq(&self, other: &Watcher) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn call_before(&self) {
        if let Some(before) = &self.inner.before {
            before();
        }
    }

    fn report(&self, err: &crate::error::Error, info: &str) {
        self.inner
            .rt
            .handle_error(err, self.owner().as_ref(), info);
    }

    /// Evaluate the getter with this watcher as the tracking target.
    ///
    /// Deep watchers traverse the result before tracking ends. Getter errors
    /// from user watchers are reported and yield `Null`.
    pub fn get(&self) -> Result<Value> {
        let inner = &self.inner;
        let result = {
            let target: Rc<dyn Subscriber> = inner.clone();
            let _scope = inner.rt.tracker().enter(Some(target));
            inner.evaluations.set(inner.evaluations.get() + 1);
            let result = self.evaluate_getter();
            if inner.deep {
                if let Ok(value) = &result {
                    traverse(&inner.rt, value);
                }
            }
            result
        };
        self.cleanup_deps();

        match result {
            Ok(value) => Ok(value),
            Err(err) if inner.user => {
                self.report(&err, &format!("getter for watcher \"{}\"", inner.expression));
                Ok(Value::Null)
            }
            Err(err) => Err(err),
        }
    }

    fn evaluate_getter(&self) -> Result<Value> {
        match &self.inner.getter {
            Getter::Func(f) => f(),
            Getter::Path(segments) => {
                let (Some(owner), Some((first, rest))) = (self.owner(), segments.split_first())
                else {
                    return Ok(Value::Null);
                };
                let mut value = owner.lookup(first);
                for segment in rest {
                    if !value.is_structured() {
                        return Ok(Value::Null);
                    }
                    value = value.get(segment);
                }
                Ok(value)
            }
        }
    }

    /// Drop subscriptions that the last evaluation did not renew.
    fn cleanup_deps(&self) {
        let inner = &self.inner;
        {
            let new_deps = inner.new_deps.borrow();
            for (id, dep) in inner.deps.borrow().iter() {
                if !new_deps.contains_key(id) {
                    dep.unsubscribe(inner.id);
                }
            }
        }
        std::mem::swap(
            &mut *inner.deps.borrow_mut(),
            &mut *inner.new_deps.borrow_mut(),
        );
        inner.new_deps.borrow_mut().clear();
    }

    /// Scheduler entry point: re-evaluate and invoke the callback.
    pub fn run(&self) -> Result<()> {
        if !self.inner.active.get() {
            return Ok(());
        }
        let callback = self.inner.callback.clone();
        self.get_and_invoke(|new, old| match &callback {
            Some(callback) => callback(new, old),
            None => Ok(()),
        })
    }

    /// Re-evaluate and invoke `callback` when the value changed, is
    /// structured, or the watcher is deep.
    fn get_and_invoke(&self, callback: impl FnOnce(&Value, &Value) -> Result<()>) -> Result<()> {
        let value = self.get()?;
        let fire = {
            let current = self.inner.value.borrow();
            !value.same(&current) || value.is_structured() || self.inner.deep
        };
        if fire {
            let old = self.inner.value.replace(value.clone());
            self.inner.dirty.set(false);
            match callback(&value, &old) {
                Ok(()) => {}
                Err(err) if self.inner.user => self.report(
                    &err,
                    &format!("callback for watcher \"{}\"", self.inner.expression),
                ),
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Computed read: re-evaluate if dirty and return the cached value.
    pub fn evaluate(&self) -> Result<Value> {
        if self.inner.dirty.get() {
            let value = self.get()?;
            *self.inner.value.borrow_mut() = value;
            self.inner.dirty.set(false);
        }
        Ok(self.value())
    }

    /// Let whatever is evaluating now depend on this computed watcher.
    pub fn depend(&self) {
        if let Some(dep) = &self.inner.dep {
            dep.depend();
        }
    }

    /// Queue (or run) the watcher as if a dependency changed.
    pub fn update(&self) {
        Subscriber::update(&*self.inner);
    }

    /// Unsubscribe from everything and deactivate. Idempotent.
    pub fn teardown(&self) {
        let inner = &self.inner;
        if !inner.active.get() {
            return;
        }
        if let Some(owner) = self.owner() {
            if !owner.is_being_destroyed() {
                owner.detach_watcher(self);
            }
        }
        for dep in inner.deps.borrow().values() {
            dep.unsubscribe(inner.id);
        }
        inner.active.set(false);
    }
}

impl Subscriber for WatcherInner {
    fn id(&self) -> WatcherId {
        self.id
    }

    fn update(&self) {
        let Some(inner) = self.me.upgrade() else {
            return;
        };
        let watcher = Watcher { inner };

        if self.computed {
            let Some(dep) = self.dep.clone() else {
                return;
            };
            if !dep.has_subscribers() {
                // Nobody is listening: stay lazy until the next read.
                self.dirty.set(true);
            } else if let Err(err) = watcher.get_and_invoke(|_, _| {
                dep.notify();
                Ok(())
            }) {
                watcher.report(&err, &format!("computed \"{}\"", self.expression));
            }
        } else if self.sync {
            if let Err(err) = watcher.run() {
                watcher.report(&err, "sync watcher");
            }
        } else {
            self.rt.queue_watcher(watcher);
        }
    }

    fn add_dep(&self, dep: &Dependency) {
        let id = dep.id();
        if self.new_deps.borrow().contains_key(&id) {
            return;
        }
        self.new_deps.borrow_mut().insert(id, dep.clone());
        if !self.deps.borrow().contains_key(&id) {
            let me: Weak<dyn Subscriber> = self.me.clone();
            dep.subscribe(self.id, me);
        }
    }
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.inner.id)
            .field("expression", &self.inner.expression)
            .field("active", &self.inner.active.get())
            .field("dirty", &self.inner.dirty.get())
            .field("deps", &self.inner.deps.borrow().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::Error;
    use crate::reactive::observe;
    use serde_json::json;

    fn state(rt: &Runtime, json: serde_json::Value) -> Value {
        let value = Value::from_json(json);
        observe(rt, &value);
        value
    }

    fn counter() -> (Rc<Cell<usize>>, impl Fn() -> usize) {
        let count = Rc::new(Cell::new(0));
        let read = count.clone();
        (count, move || read.get())
    }

    #[test]
    fn dependencies_are_pruned_when_a_branch_is_skipped() {
        let rt = Runtime::new(Config::synchronous());
        let data = state(&rt, json!({ "flag": true, "a": 1, "b": 2 }));
        let (runs, runs_now) = counter();

        let getter_data = data.clone();
        let runs_in = runs.clone();
        let watcher = Watcher::new(
            &rt,
            None,
            Getter::func(move || {
                runs_in.set(runs_in.get() + 1);
                if getter_data.get("flag").is_truthy() {
                    Ok(getter_data.get("a"))
                } else {
                    Ok(getter_data.get("b"))
                }
            }),
            None,
            WatcherOptions::default().sync(true),
        )
        .unwrap();

        let obj = data.as_object().unwrap().clone();
        assert!(watcher.depends_on(&obj.property_dep("a").unwrap()));

        obj.set("flag", Value::from(false));
        assert_eq!(runs_now(), 2);
        assert!(!watcher.depends_on(&obj.property_dep("a").unwrap()));
        assert!(!obj.property_dep("a").unwrap().has_subscribers());

        obj.set("a", Value::from(100));
        assert_eq!(runs_now(), 2);

        obj.set("b", Value::from(3));
        assert_eq!(runs_now(), 3);
        assert_eq!(watcher.value(), Value::from(3));
    }

    #[test]
    fn computed_is_lazy_without_subscribers() {
        let rt = Runtime::new(Config::synchronous());
        let data = state(&rt, json!({ "n": 1 }));

        let source = data.clone();
        let computed = Watcher::new(
            &rt,
            None,
            Getter::func(move || {
                let n = source.get("n").as_f64().unwrap_or_default();
                Ok(Value::from(n * 2.0))
            }),
            None,
            WatcherOptions::computed(),
        )
        .unwrap();

        assert_eq!(computed.evaluations(), 0);
        assert!(computed.is_dirty());

        let obj = data.as_object().unwrap().clone();
        obj.set("n", Value::from(2));
        obj.set("n", Value::from(3));
        assert_eq!(computed.evaluations(), 0);

        assert_eq!(computed.evaluate().unwrap(), Value::from(6));
        assert_eq!(computed.evaluate().unwrap(), Value::from(6));
        assert_eq!(computed.evaluations(), 1);

        obj.set("n", Value::from(4));
        assert!(computed.is_dirty());
        assert_eq!(computed.evaluations(), 1);
    }

    #[test]
    fn eager_computed_only_notifies_on_change() {
        let rt = Runtime::new(Config::synchronous());
        let data = state(&rt, json!({ "n": 1 }));

        let source = data.clone();
        let parity = Watcher::new(
            &rt,
            None,
            Getter::func(move || {
                let n = source.get("n").as_i64().unwrap_or_default();
                Ok(Value::from(n % 2 == 0))
            }),
            None,
            WatcherOptions::computed(),
        )
        .unwrap();

        let (renders, renders_now) = counter();
        let computed = parity.clone();
        let renders_in = renders.clone();
        let _render = Watcher::new(
            &rt,
            None,
            Getter::func(move || {
                renders_in.set(renders_in.get() + 1);
                computed.depend();
                computed.evaluate()
            }),
            None,
            WatcherOptions::default().sync(true),
        )
        .unwrap();
        assert_eq!(renders_now(), 1);

        let obj = data.as_object().unwrap().clone();
        obj.set("n", Value::from(3));
        assert_eq!(renders_now(), 1, "parity unchanged, dependent not notified");

        obj.set("n", Value::from(4));
        assert_eq!(renders_now(), 2);
    }

    #[test]
    fn user_callback_receives_new_and_old_values() {
        let rt = Runtime::new(Config::synchronous());
        let data = state(&rt, json!({ "n": 1 }));
        let seen = Rc::new(RefCell::new(Vec::new()));

        let source = data.clone();
        let sink = seen.clone();
        let _watcher = Watcher::new(
            &rt,
            None,
            Getter::func(move || Ok(source.get("n"))),
            Some(Rc::new(move |new: &Value, old: &Value| {
                sink.borrow_mut().push((new.clone(), old.clone()));
                Ok(())
            })),
            WatcherOptions::user().sync(true),
        )
        .unwrap();

        let obj = data.as_object().unwrap().clone();
        obj.set("n", Value::from(1));
        obj.set("n", Value::from(2));

        assert_eq!(*seen.borrow(), vec![(Value::from(2), Value::from(1))]);
    }

    #[test]
    fn deep_watcher_sees_nested_mutation() {
        let rt = Runtime::new(Config::synchronous());
        let data = state(&rt, json!({ "nested": { "list": [1, 2] } }));
        let (fired, fired_now) = counter();

        let source = data.clone();
        let fired_in = fired.clone();
        let _watcher = Watcher::new(
            &rt,
            None,
            Getter::func(move || Ok(source.get("nested"))),
            Some(Rc::new(move |_: &Value, _: &Value| {
                fired_in.set(fired_in.get() + 1);
                Ok(())
            })),
            WatcherOptions::user().deep(true).sync(true),
        )
        .unwrap();

        let list = data.get_path(&["nested", "list"]);
        list.as_array().unwrap().push(Value::from(3));
        assert_eq!(fired_now(), 1);
    }

    #[test]
    fn user_getter_errors_are_reported_and_yield_null() {
        let rt = Runtime::new(Config::synchronous());
        let reported = Rc::new(RefCell::new(Vec::new()));
        let sink = reported.clone();
        rt.set_error_handler(move |err, _, info| {
            sink.borrow_mut().push(format!("{info}: {err}"));
        });

        let watcher = Watcher::new(
            &rt,
            None,
            Getter::func(|| Err(Error::msg("nope"))),
            None,
            WatcherOptions::user().expression("broken"),
        )
        .unwrap();

        assert_eq!(watcher.value(), Value::Null);
        assert_eq!(
            *reported.borrow(),
            vec!["getter for watcher \"broken\": nope".to_string()]
        );
    }

    #[test]
    fn non_user_getter_errors_propagate() {
        let rt = Runtime::new(Config::synchronous());
        let result = Watcher::new(
            &rt,
            None,
            Getter::func(|| Err(Error::msg("render failed"))),
            None,
            WatcherOptions::default(),
        );
        assert_eq!(result.unwrap_err(), Error::msg("render failed"));
    }

    #[test]
    fn teardown_is_idempotent_and_unsubscribes() {
        let rt = Runtime::new(Config::synchronous());
        let data = state(&rt, json!({ "n": 1 }));
        let source = data.clone();
        let watcher = Watcher::new(
            &rt,
            None,
            Getter::func(move || Ok(source.get("n"))),
            None,
            WatcherOptions::default(),
        )
        .unwrap();

        let dep = data.as_object().unwrap().property_dep("n").unwrap();
        assert!(dep.has_subscribers());
        watcher.teardown();
        watcher.teardown();
        assert!(!dep.has_subscribers());
        assert!(!watcher.is_active());
    }

    #[test]
    fn invalid_paths_warn_and_read_null() {
        let rt = Runtime::new(Config::synchronous());
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let sink = warnings.clone();
        rt.set_warn_handler(move |warning, _| sink.borrow_mut().push(warning.clone()));

        let watcher =
            Watcher::with_path(&rt, None, "a[0]", None, WatcherOptions::user()).unwrap();
        assert_eq!(watcher.value(), Value::Null);
        assert_eq!(
            *warnings.borrow(),
            vec![Warning::InvalidWatchPath("a[0]".to_string())]
        );
    }

    #[test]
    fn path_parsing() {
        assert!(Getter::path("a.b.c").is_some());
        assert!(Getter::path("$store._x").is_some());
        assert!(Getter::path("a..b").is_none());
        assert!(Getter::path("a + b").is_none());
    }
}
