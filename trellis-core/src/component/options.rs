//! Component Options
//!
//! [`ComponentOptions`] is the definition of a component: its props, state
//! initializer, computed properties, watchers, render function and
//! lifecycle hooks. Definitions are immutable once built and shared through
//! `Rc`; every instance of a component points at the same options.
//!
//! Each options value gets a unique `cid`. The application caches the
//! result of merging a definition with the global options by `cid`.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::render::{RenderContext, Rendered};
use super::Component;
use crate::error::{Error, Result};
use crate::reactive::Value;
use crate::vdom::modules::Directive;
use crate::vdom::tags::{camelize, capitalize};

/// Counter for component definition ids.
static CID_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_cid() -> u64 {
    CID_COUNTER.fetch_add(1, Ordering::Relaxed)
}

pub type HookFn = Rc<dyn Fn(&Component) -> Result<()>>;
pub type DataFn = Rc<dyn Fn(&Component) -> Result<serde_json::Value>>;
pub type ComputedFn = Rc<dyn Fn(&Component) -> Result<Value>>;
pub type WatchHandler = Rc<dyn Fn(&Component, &Value, &Value) -> Result<()>>;
pub type ProvideFn = Rc<dyn Fn(&Component) -> Result<Value>>;
pub type RenderFn = Rc<dyn Fn(&RenderContext<'_>) -> Result<Rendered>>;
pub type RenderErrorFn = Rc<dyn Fn(&RenderContext<'_>, &Error) -> Result<Rendered>>;

/// An error-capture hook: receives the error and where it was raised.
/// Returning `Ok(false)` stops propagation to further ancestors.
pub type ErrorCapturedFn = Rc<dyn Fn(&Component, &Error, &str) -> Result<bool>>;

/// Lifecycle hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hook {
    BeforeCreate,
    Created,
    BeforeMount,
    Mounted,
    BeforeUpdate,
    Updated,
    Activated,
    Deactivated,
    BeforeDestroy,
    Destroyed,
}

impl Hook {
    pub fn name(&self) -> &'static str {
        match self {
            Hook::BeforeCreate => "beforeCreate",
            Hook::Created => "created",
            Hook::BeforeMount => "beforeMount",
            Hook::Mounted => "mounted",
            Hook::BeforeUpdate => "beforeUpdate",
            Hook::Updated => "updated",
            Hook::Activated => "activated",
            Hook::Deactivated => "deactivated",
            Hook::BeforeDestroy => "beforeDestroy",
            Hook::Destroyed => "destroyed",
        }
    }
}

/// A declared prop.
#[derive(Clone, Default)]
pub struct PropDef {
    default: Value,
    default_fn: Option<Rc<dyn Fn() -> Value>>,
}

impl PropDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// A default shared by every instance. Use [`PropDef::with_default_fn`]
    /// for containers so each instance gets its own.
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    pub fn with_default_fn(mut self, f: impl Fn() -> Value + 'static) -> Self {
        self.default_fn = Some(Rc::new(f));
        self
    }

    pub(crate) fn default_value(&self) -> Value {
        match &self.default_fn {
            Some(f) => f(),
            None => self.default.clone(),
        }
    }
}

/// A declared injection: the provided key to look up in ancestors and the
/// value to fall back on when no ancestor provides it.
#[derive(Clone, Default)]
pub struct InjectDef {
    pub(crate) from: Option<String>,
    pub(crate) default: Option<Value>,
}

impl InjectDef {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look the value up under `key` instead of the injection's own name.
    pub fn from(mut self, key: impl Into<String>) -> Self {
        self.from = Some(key.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// A declared watcher.
#[derive(Clone)]
pub struct WatchDef {
    pub handler: WatchHandler,
    pub deep: bool,
    pub immediate: bool,
    pub sync: bool,
}

impl WatchDef {
    pub fn new(handler: impl Fn(&Component, &Value, &Value) -> Result<()> + 'static) -> Self {
        Self {
            handler: Rc::new(handler),
            deep: false,
            immediate: false,
            sync: false,
        }
    }

    pub fn deep(mut self) -> Self {
        self.deep = true;
        self
    }

    pub fn immediate(mut self) -> Self {
        self.immediate = true;
        self
    }

    pub fn sync(mut self) -> Self {
        self.sync = true;
        self
    }
}

/// A component definition.
#[derive(Clone)]
pub struct ComponentOptions {
    pub(crate) cid: u64,
    pub(crate) name: Option<String>,
    pub(crate) props: IndexMap<String, PropDef>,
    pub(crate) data: Vec<DataFn>,
    pub(crate) computed: IndexMap<String, ComputedFn>,
    pub(crate) provide: Vec<ProvideFn>,
    pub(crate) inject: IndexMap<String, InjectDef>,
    pub(crate) watch: IndexMap<String, Vec<WatchDef>>,
    pub(crate) render: Option<RenderFn>,
    pub(crate) render_error: Option<RenderErrorFn>,
    pub(crate) hooks: IndexMap<Hook, Vec<HookFn>>,
    pub(crate) error_captured: Vec<ErrorCapturedFn>,
    pub(crate) components: IndexMap<String, Rc<ComponentOptions>>,
    pub(crate) directives: IndexMap<String, Rc<dyn Directive>>,
    pub(crate) scope_id: Option<String>,
    pub(crate) is_abstract: bool,
}

impl Default for ComponentOptions {
    fn default() -> Self {
        Self {
            cid: next_cid(),
            name: None,
            props: IndexMap::new(),
            data: Vec::new(),
            computed: IndexMap::new(),
            provide: Vec::new(),
            inject: IndexMap::new(),
            watch: IndexMap::new(),
            render: None,
            render_error: None,
            hooks: IndexMap::new(),
            error_captured: Vec::new(),
            components: IndexMap::new(),
            directives: IndexMap::new(),
            scope_id: None,
            is_abstract: false,
        }
    }
}

impl ComponentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, def: PropDef) -> Self {
        self.props.insert(name.into(), def);
        self
    }

    /// State initializer. Runs once per instance, untracked.
    pub fn data(
        mut self,
        f: impl Fn(&Component) -> Result<serde_json::Value> + 'static,
    ) -> Self {
        self.data.push(Rc::new(f));
        self
    }

    /// State initializer from a JSON literal, copied for every instance.
    pub fn data_json(self, json: serde_json::Value) -> Self {
        self.data(move |_| Ok(json.clone()))
    }

    /// Values offered to every descendant. `f` runs once per instance,
    /// after state is initialized, and returns an object; later providers
    /// in a merged definition win on shared keys.
    pub fn provide(mut self, f: impl Fn(&Component) -> Result<Value> + 'static) -> Self {
        self.provide.push(Rc::new(f));
        self
    }

    /// Receive the value the nearest ancestor provides under `key`.
    pub fn inject(self, key: impl Into<String>) -> Self {
        self.inject_with(key, InjectDef::new())
    }

    pub fn inject_with(mut self, key: impl Into<String>, def: InjectDef) -> Self {
        self.inject.insert(key.into(), def);
        self
    }

    pub fn computed(
        mut self,
        name: impl Into<String>,
        f: impl Fn(&Component) -> Result<Value> + 'static,
    ) -> Self {
        self.computed.insert(name.into(), Rc::new(f));
        self
    }

    pub fn watch(
        self,
        expression: impl Into<String>,
        handler: impl Fn(&Component, &Value, &Value) -> Result<()> + 'static,
    ) -> Self {
        self.watch_with(expression, WatchDef::new(handler))
    }

    pub fn watch_with(mut self, expression: impl Into<String>, def: WatchDef) -> Self {
        self.watch.entry(expression.into()).or_default().push(def);
        self
    }

    pub fn render(
        mut self,
        f: impl Fn(&RenderContext<'_>) -> Result<Rendered> + 'static,
    ) -> Self {
        self.render = Some(Rc::new(f));
        self
    }

    /// Fallback render used when the render function fails.
    pub fn render_error(
        mut self,
        f: impl Fn(&RenderContext<'_>, &Error) -> Result<Rendered> + 'static,
    ) -> Self {
        self.render_error = Some(Rc::new(f));
        self
    }

    pub fn hook(mut self, hook: Hook, f: impl Fn(&Component) -> Result<()> + 'static) -> Self {
        self.hooks.entry(hook).or_default().push(Rc::new(f));
        self
    }

    pub fn error_captured(
        mut self,
        f: impl Fn(&Component, &Error, &str) -> Result<bool> + 'static,
    ) -> Self {
        self.error_captured.push(Rc::new(f));
        self
    }

    /// Register a local component.
    pub fn component(mut self, name: impl Into<String>, options: impl Into<Rc<ComponentOptions>>) -> Self {
        self.components.insert(name.into(), options.into());
        self
    }

    pub fn directive(mut self, name: impl Into<String>, directive: impl Directive + 'static) -> Self {
        self.directives.insert(name.into(), Rc::new(directive));
        self
    }

    /// Scoped-style attribute stamped on every element this component
    /// renders.
    pub fn scope_id(mut self, scope_id: impl Into<String>) -> Self {
        self.scope_id = Some(scope_id.into());
        self
    }

    /// Abstract components (such as keep-alive) render a child without
    /// appearing in the parent chain.
    pub fn abstract_component(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn cid(&self) -> u64 {
        self.cid
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn has_prop(&self, name: &str) -> bool {
        self.props.contains_key(name)
    }

    pub fn prop_names(&self) -> impl Iterator<Item = &str> {
        self.props.keys().map(String::as_str)
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub(crate) fn hooks_for(&self, hook: Hook) -> Vec<HookFn> {
        self.hooks.get(&hook).cloned().unwrap_or_default()
    }

    /// Look a component up by its exact, camelized, or capitalized name.
    pub fn resolve_component(&self, name: &str) -> Option<Rc<ComponentOptions>> {
        resolve_asset(&self.components, name).cloned()
    }

    pub fn resolve_directive(&self, name: &str) -> Option<Rc<dyn Directive>> {
        resolve_asset(&self.directives, name).cloned()
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("cid", &self.cid)
            .field("name", &self.name)
            .field("props", &self.props.keys().collect::<Vec<_>>())
            .field("computed", &self.computed.keys().collect::<Vec<_>>())
            .field("components", &self.components.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn resolve_asset<'a, T>(assets: &'a IndexMap<String, T>, name: &str) -> Option<&'a T> {
    if let Some(asset) = assets.get(name) {
        return Some(asset);
    }
    let camelized = camelize(name);
    if let Some(asset) = assets.get(&camelized) {
        return Some(asset);
    }
    assets.get(&capitalize(&camelized))
}

/// Merge a child definition over a parent one.
///
/// - hooks, watchers and error-capture hooks concatenate, parent first,
/// - props, computed, components and directives extend, child wins,
/// - state initializers chain so the child's keys win and the parent's fill
///   in what the child leaves out,
/// - everything else is taken from the child when it sets it.
pub fn merge_options(parent: &ComponentOptions, child: &ComponentOptions) -> ComponentOptions {
    let mut merged = ComponentOptions {
        cid: next_cid(),
        name: child.name.clone().or_else(|| parent.name.clone()),
        props: parent.props.clone(),
        data: parent.data.clone(),
        computed: parent.computed.clone(),
        provide: parent.provide.clone(),
        inject: parent.inject.clone(),
        watch: parent.watch.clone(),
        render: child.render.clone().or_else(|| parent.render.clone()),
        render_error: child.render_error.clone().or_else(|| parent.render_error.clone()),
        hooks: parent.hooks.clone(),
        error_captured: parent.error_captured.clone(),
        components: parent.components.clone(),
        directives: parent.directives.clone(),
        scope_id: child.scope_id.clone().or_else(|| parent.scope_id.clone()),
        is_abstract: child.is_abstract || parent.is_abstract,
    };

    merged.props.extend(child.props.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.data.extend(child.data.iter().cloned());
    merged
        .computed
        .extend(child.computed.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.provide.extend(child.provide.iter().cloned());
    merged
        .inject
        .extend(child.inject.iter().map(|(k, v)| (k.clone(), v.clone())));
    for (expression, defs) in &child.watch {
        merged
            .watch
            .entry(expression.clone())
            .or_default()
            .extend(defs.iter().cloned());
    }
    for (hook, fns) in &child.hooks {
        merged.hooks.entry(*hook).or_default().extend(fns.iter().cloned());
    }
    merged.error_captured.extend(child.error_captured.iter().cloned());
    merged
        .components
        .extend(child.components.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
        .directives
        .extend(child.directives.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Merge state objects: keys already in `to` win, nested objects merge.
pub(crate) fn merge_data(to: &mut serde_json::Value, from: serde_json::Value) {
    let (serde_json::Value::Object(to), serde_json::Value::Object(from)) = (to, from) else {
        return;
    };
    for (key, from_value) in from {
        match to.get_mut(&key) {
            None => {
                to.insert(key, from_value);
            }
            Some(to_value) => {
                if to_value.is_object() && from_value.is_object() {
                    merge_data(to_value, from_value);
                }
            }
        }
    }
}
