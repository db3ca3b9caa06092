//! Components
//!
//! A [`Component`] is a live instance of a [`ComponentOptions`] definition.
//! It owns the reactive state (props, data, computed properties and user
//! watchers), a render watcher that re-renders and patches whenever
//! something the last render read changes, and its place in the instance
//! tree.
//!
//! # Lifecycle
//!
//! 1. `create` links the instance to its parent, resolves slot content and
//!    initializes state, calling `beforeCreate` and `created` around it.
//! 2. `mount` installs the render watcher. Its first evaluation renders and
//!    patches the instance into the target tree.
//! 3. Each flush that re-runs the render watcher calls `beforeUpdate` and,
//!    after the whole flush, `updated`.
//! 4. `destroy` tears all watchers down and patches the rendered tree away.
//!
//! Lifecycle hooks and state initializers run untracked, so reads inside
//! them never subscribe the watcher that happens to be evaluating.

mod async_component;
pub(crate) mod hooks;
mod keep_alive;
mod options;
mod render;

pub use async_component::{AsyncComponent, AsyncState};
pub use keep_alive::keep_alive;
pub use options::{
    merge_options, ComponentOptions, ComputedFn, DataFn, ErrorCapturedFn, Hook, HookFn, InjectDef,
    PropDef, ProvideFn, RenderErrorFn, RenderFn, WatchDef, WatchHandler,
};
pub use render::{RenderContext, Rendered};

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

use indexmap::IndexMap;

use crate::app::AppContext;
use crate::error::{Error, Result, Warning};
use crate::reactive::{
    observe, Callback, Getter, Object, Owner, Runtime, Value, Watcher, WatcherOptions,
};
use crate::vdom::{EventHandler, NodeId, PatchTarget, ScopedSlot, VNode, VNodeRef};

use keep_alive::KeepAliveCache;
use options::merge_data;

/// A registered reference: an element or a child component.
#[derive(Clone)]
pub enum RefTarget {
    Element(NodeId),
    Component(Component),
}

impl RefTarget {
    pub fn as_element(&self) -> Option<NodeId> {
        match self {
            RefTarget::Element(node) => Some(*node),
            RefTarget::Component(_) => None,
        }
    }

    pub fn as_component(&self) -> Option<&Component> {
        match self {
            RefTarget::Component(vm) => Some(vm),
            RefTarget::Element(_) => None,
        }
    }
}

impl PartialEq for RefTarget {
    fn eq(&self, other: &RefTarget) -> bool {
        match (self, other) {
            (RefTarget::Element(a), RefTarget::Element(b)) => a == b,
            (RefTarget::Component(a), RefTarget::Component(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for RefTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RefTarget::Element(node) => write!(f, "Element({node})"),
            RefTarget::Component(vm) => write!(f, "Component({})", vm.name()),
        }
    }
}

/// Handle returned by [`Component::watch`]; cancels the watcher.
pub struct Unwatch {
    watcher: Watcher,
}

impl Unwatch {
    pub fn watcher(&self) -> &Watcher {
        &self.watcher
    }

    pub fn unwatch(self) {
        self.watcher.teardown();
    }
}

/// A live component instance. Cloning shares the instance.
#[derive(Clone)]
pub struct Component {
    inner: Rc<ComponentInner>,
}

/// Non-owning handle to a component.
#[derive(Clone)]
pub struct WeakComponent(Weak<ComponentInner>);

impl WeakComponent {
    pub fn upgrade(&self) -> Option<Component> {
        self.0.upgrade().map(|inner| Component { inner })
    }
}

pub(crate) struct ComponentInner {
    uid: u64,
    me: Weak<ComponentInner>,
    app: Rc<AppContext>,
    options: Rc<ComponentOptions>,
    parent: Option<WeakComponent>,
    children: RefCell<Vec<Component>>,
    refs: RefCell<IndexMap<String, Vec<RefTarget>>>,
    props: Object,
    injected: Object,
    /// What this instance offers its descendants, once `provide` ran.
    provided: RefCell<Option<Object>>,
    data: RefCell<Value>,
    computed: RefCell<IndexMap<String, Watcher>>,
    render_watcher: RefCell<Option<Watcher>>,
    watchers: RefCell<Vec<Watcher>>,
    /// Root of the last rendered tree.
    vnode: RefCell<Option<VNodeRef>>,
    /// The node standing for this instance in the parent's tree.
    placeholder: RefCell<Option<VNodeRef>>,
    render_children: RefCell<Vec<VNodeRef>>,
    slots: RefCell<IndexMap<String, Vec<VNodeRef>>>,
    scoped_slots: RefCell<IndexMap<String, ScopedSlot>>,
    events: RefCell<IndexMap<String, Vec<EventHandler>>>,
    parent_listeners: RefCell<IndexMap<String, EventHandler>>,
    el: Cell<Option<NodeId>>,
    hydrating: Cell<bool>,
    updating_props: Cell<bool>,
    is_mounted: Cell<bool>,
    is_being_destroyed: Cell<bool>,
    is_destroyed: Cell<bool>,
    /// `None` until the instance is first deactivated or activated.
    inactive: Cell<Option<bool>>,
    direct_inactive: Cell<bool>,
    keep_alive: RefCell<KeepAliveCache>,
}

impl Component {
    /// Create and initialize an instance. `options` must already be merged
    /// with the application's global options.
    pub(crate) fn create(
        app: &Rc<AppContext>,
        options: Rc<ComponentOptions>,
        parent: Option<&Component>,
        placeholder: Option<VNodeRef>,
    ) -> Component {
        // Abstract instances are skipped when linking into the parent chain.
        let mut parent = parent.cloned();
        if !options.is_abstract {
            while let Some(p) = parent.clone() {
                match p.parent() {
                    Some(grand) if p.inner.options.is_abstract => parent = Some(grand),
                    _ => break,
                }
            }
        }

        let rt = app.runtime().clone();
        let uid = rt.next_uid();
        let inner = Rc::new_cyclic(|me| ComponentInner {
            uid,
            me: me.clone(),
            app: app.clone(),
            options: options.clone(),
            parent: parent.as_ref().map(Component::downgrade),
            children: RefCell::new(Vec::new()),
            refs: RefCell::new(IndexMap::new()),
            props: Object::new(),
            injected: Object::new(),
            provided: RefCell::new(None),
            data: RefCell::new(Value::Null),
            computed: RefCell::new(IndexMap::new()),
            render_watcher: RefCell::new(None),
            watchers: RefCell::new(Vec::new()),
            vnode: RefCell::new(None),
            placeholder: RefCell::new(placeholder.clone()),
            render_children: RefCell::new(Vec::new()),
            slots: RefCell::new(IndexMap::new()),
            scoped_slots: RefCell::new(IndexMap::new()),
            events: RefCell::new(IndexMap::new()),
            parent_listeners: RefCell::new(IndexMap::new()),
            el: Cell::new(None),
            hydrating: Cell::new(false),
            updating_props: Cell::new(false),
            is_mounted: Cell::new(false),
            is_being_destroyed: Cell::new(false),
            is_destroyed: Cell::new(false),
            inactive: Cell::new(None),
            direct_inactive: Cell::new(false),
            keep_alive: RefCell::new(KeepAliveCache::default()),
        });
        let vm = Component { inner };

        if let Some(parent) = &parent {
            if !options.is_abstract {
                parent.inner.children.borrow_mut().push(vm.clone());
            }
        }

        let mut props_data = IndexMap::new();
        if let Some(placeholder) = &placeholder {
            if let Some(opts) = placeholder.component_options() {
                props_data = opts.props_data.clone();
                *vm.inner.parent_listeners.borrow_mut() = opts.listeners.clone();
                *vm.inner.render_children.borrow_mut() = opts.children.clone();
            }
        }
        vm.resolve_slots();

        tracing::trace!(uid, component = %vm.name(), "creating component");
        vm.call_hook(Hook::BeforeCreate);
        vm.init_injections();
        vm.init_props(&props_data);
        vm.init_data();
        vm.init_computed();
        vm.init_watch();
        vm.init_provide();
        vm.call_hook(Hook::Created);
        vm
    }

    // ------------------------------------------------------------------
    // State initialization
    // ------------------------------------------------------------------

    /// Resolve each injection against the nearest providing ancestor.
    /// Injected values are shallow, like props.
    fn init_injections(&self) {
        let rt = self.runtime().clone();
        for (key, def) in &self.inner.options.inject {
            let from = def.from.as_deref().unwrap_or(key.as_str());
            let mut source = self.parent();
            let mut found = None;
            while let Some(vm) = source {
                if let Some(provided) = vm.inner.provided.borrow().as_ref() {
                    if provided.contains_key(from) {
                        found = Some(provided.get_untracked(from));
                    }
                }
                if found.is_some() {
                    break;
                }
                source = vm.parent();
            }
            let value = match found.or_else(|| def.default.clone()) {
                Some(value) => value,
                None => {
                    self.warn(Warning::InjectionNotFound(key.clone()));
                    continue;
                }
            };
            self.inner.injected.define_reactive(&rt, key, value, true);
        }
    }

    fn init_provide(&self) {
        if self.inner.options.provide.is_empty() {
            return;
        }
        let provided = Object::new();
        self.runtime().tracker().untracked(|| {
            for provide in &self.inner.options.provide {
                match provide(self) {
                    Ok(Value::Object(obj)) => {
                        for (key, value) in obj.entries_untracked() {
                            provided.set(&key, value);
                        }
                    }
                    Ok(_) => self.report_error(
                        &Error::msg("provide functions should return an object"),
                        "provide()",
                    ),
                    Err(err) => self.report_error(&err, "provide()"),
                }
            }
        });
        *self.inner.provided.borrow_mut() = Some(provided);
    }

    fn init_props(&self, props_data: &IndexMap<String, Value>) {
        let rt = self.runtime();
        for (key, def) in &self.inner.options.props {
            let value = props_data
                .get(key)
                .cloned()
                .unwrap_or_else(|| def.default_value());
            // Props are shallow: the parent owns (and observes) the value.
            self.inner.props.define_reactive(rt, key, value, true);
        }
    }

    fn init_data(&self) {
        let rt = self.runtime().clone();
        let mut state = serde_json::Value::Object(serde_json::Map::new());
        rt.tracker().untracked(|| {
            // Later initializers come from more specific definitions and win.
            for init in self.inner.options.data.iter().rev() {
                match init(self) {
                    Ok(json) if json.is_object() => merge_data(&mut state, json),
                    Ok(_) => self.report_error(
                        &Error::msg("data functions should return an object"),
                        "data()",
                    ),
                    Err(err) => self.report_error(&err, "data()"),
                }
            }
        });

        let data = Value::from_json(state);
        if let Some(obj) = data.as_object() {
            for key in obj.keys_untracked() {
                if self.inner.options.props.contains_key(&key) {
                    self.report_error(
                        &Error::msg(format!(
                            "the data property \"{key}\" is already declared as a prop"
                        )),
                        "data()",
                    );
                }
            }
        }
        observe(&rt, &data);
        *self.inner.data.borrow_mut() = data;
    }

    fn init_computed(&self) {
        let rt = self.runtime().clone();
        for (key, f) in &self.inner.options.computed {
            let weak = self.downgrade();
            let f = f.clone();
            let getter = Getter::func(move || match weak.upgrade() {
                Some(vm) => f(&vm),
                None => Ok(Value::Null),
            });
            let result = Watcher::new(
                &rt,
                Some(self.as_owner()),
                getter,
                None,
                WatcherOptions::computed().expression(key.clone()),
            );
            match result {
                Ok(watcher) => {
                    self.inner.computed.borrow_mut().insert(key.clone(), watcher);
                }
                Err(err) => self.report_error(&err, &format!("computed \"{key}\"")),
            }
        }
    }

    fn init_watch(&self) {
        for (expression, defs) in &self.inner.options.watch {
            for def in defs {
                let result = self.create_watcher(
                    WatchSource::Path(expression.clone()),
                    def,
                );
                if let Err(err) = result {
                    self.report_error(&err, &format!("watcher \"{expression}\""));
                }
            }
        }
    }

    fn create_watcher(&self, source: WatchSource, def: &WatchDef) -> Result<Watcher> {
        let rt = self.runtime().clone();
        let weak = self.downgrade();
        let handler = def.handler.clone();
        let callback: Callback = Rc::new(move |new, old| match weak.upgrade() {
            Some(vm) => handler(&vm, new, old),
            None => Ok(()),
        });
        let options = WatcherOptions::user().deep(def.deep).sync(def.sync);
        let watcher = match source {
            WatchSource::Path(expression) => {
                Watcher::with_path(&rt, Some(self.as_owner()), &expression, Some(callback), options)?
            }
            WatchSource::Func(f) => {
                let weak = self.downgrade();
                let getter = Getter::func(move || match weak.upgrade() {
                    Some(vm) => f(&vm),
                    None => Ok(Value::Null),
                });
                Watcher::new(&rt, Some(self.as_owner()), getter, Some(callback), options)?
            }
        };

        if def.immediate {
            let value = watcher.value();
            if let Err(err) = (def.handler)(self, &value, &Value::Null) {
                self.report_error(
                    &err,
                    &format!("callback for immediate watcher \"{}\"", watcher.expression()),
                );
            }
        }
        Ok(watcher)
    }

    /// Watch a dot-delimited path on the instance.
    pub fn watch(&self, expression: &str, def: WatchDef) -> Result<Unwatch> {
        let watcher = self.create_watcher(WatchSource::Path(expression.to_string()), &def)?;
        Ok(Unwatch { watcher })
    }

    /// Watch the result of a function of the instance.
    pub fn watch_fn(
        &self,
        getter: impl Fn(&Component) -> Result<Value> + 'static,
        def: WatchDef,
    ) -> Result<Unwatch> {
        let watcher = self.create_watcher(WatchSource::Func(Rc::new(getter)), &def)?;
        Ok(Unwatch { watcher })
    }

    // ------------------------------------------------------------------
    // Instance properties
    // ------------------------------------------------------------------

    /// Read a prop, state key, or computed property. Reads are tracked.
    ///
    /// Unknown keys read as `Null`; computed errors are reported and read as
    /// `Null`.
    pub fn get(&self, key: &str) -> Value {
        match self.try_get(key) {
            Ok(value) => value,
            Err(Error::UndefinedProperty(_)) => Value::Null,
            Err(err) => {
                self.report_error(&err, &format!("computed \"{key}\""));
                Value::Null
            }
        }
    }

    pub fn try_get(&self, key: &str) -> Result<Value> {
        let inner = &self.inner;
        if inner.options.props.contains_key(key) {
            return Ok(inner.props.get(key));
        }
        let data = inner.data.borrow().clone();
        if let Some(obj) = data.as_object() {
            if obj.contains_key(key) {
                return Ok(obj.get(key));
            }
        }
        let computed = inner.computed.borrow().get(key).cloned();
        match computed {
            Some(watcher) => {
                watcher.depend();
                watcher.evaluate()
            }
            None if inner.injected.contains_key(key) => Ok(inner.injected.get(key)),
            None => Err(Error::UndefinedProperty(key.to_string())),
        }
    }

    /// Write a prop or state key.
    ///
    /// Writing a prop from outside a parent re-render warns, since the next
    /// parent render overwrites it. Keys that were never declared are not
    /// added.
    pub fn set(&self, key: &str, value: impl Into<Value>) {
        let value = value.into();
        let inner = &self.inner;
        if inner.options.props.contains_key(key) {
            if !inner.updating_props.get() {
                self.warn(Warning::PropMutation(key.to_string()));
            }
            inner.props.set(key, value);
            return;
        }
        let data = inner.data.borrow().clone();
        match data.as_object() {
            Some(obj) if obj.contains_key(key) => obj.set(key, value),
            _ if inner.injected.contains_key(key) => {
                self.warn(Warning::InjectionMutation(key.to_string()));
                inner.injected.set(key, value);
            }
            _ => self.warn(Warning::AvoidReplacingData(key.to_string())),
        }
    }

    /// The root state object.
    pub fn data(&self) -> Value {
        self.inner.data.borrow().clone()
    }

    pub fn props(&self) -> Object {
        self.inner.props.clone()
    }

    pub(crate) fn set_prop_from_parent(&self, key: &str, value: Value) {
        self.inner.updating_props.set(true);
        self.inner.props.set(key, value);
        self.inner.updating_props.set(false);
    }

    // ------------------------------------------------------------------
    // Mounting and rendering
    // ------------------------------------------------------------------

    /// Install the render watcher, rendering and patching for the first
    /// time. With `hydrating`, `el` is adopted instead of replaced.
    pub(crate) fn mount(&self, el: Option<NodeId>, hydrating: bool) -> Result<()> {
        let inner = &self.inner;
        inner.el.set(el);
        if inner.options.render.is_none() {
            self.report_error(&Error::MissingRender(self.name()), "mount");
        }
        self.call_hook(Hook::BeforeMount);

        inner.hydrating.set(hydrating);
        let weak = self.downgrade();
        let getter = Getter::func(move || {
            if let Some(vm) = weak.upgrade() {
                vm.render_and_patch();
            }
            Ok(Value::Null)
        });
        let before = self.downgrade();
        let options = WatcherOptions::render().before(move || {
            if let Some(vm) = before.upgrade() {
                if vm.is_mounted() && !vm.is_destroyed() {
                    vm.call_hook(Hook::BeforeUpdate);
                }
            }
        });
        Watcher::new(self.runtime(), Some(self.as_owner()), getter, None, options)?;

        // Child instances are marked mounted by their placeholder's insert
        // hook, once they are actually in the tree.
        if inner.placeholder.borrow().is_none() {
            inner.is_mounted.set(true);
            self.call_hook(Hook::Mounted);
        }
        Ok(())
    }

    fn render_and_patch(&self) {
        let hydrating = self.inner.hydrating.replace(false);
        if self.runtime().performance() {
            let start = Instant::now();
            let vnode = self.render();
            let rendered = start.elapsed();
            self.update(vnode, hydrating);
            tracing::debug!(
                component = %self.name(),
                render_us = rendered.as_micros() as u64,
                patch_us = (start.elapsed() - rendered).as_micros() as u64,
                "render"
            );
        } else {
            let vnode = self.render();
            self.update(vnode, hydrating);
        }
    }

    /// Run the render function and normalize its result to a single root.
    fn render(&self) -> VNodeRef {
        let inner = &self.inner;
        let placeholder = inner.placeholder.borrow().clone();
        if let Some(data) = placeholder.as_ref().and_then(|p| p.data()) {
            *inner.scoped_slots.borrow_mut() = data.scoped_slots.clone();
        }

        let ctx = RenderContext::new(self);
        let rendered = match &inner.options.render {
            None => Some(Rendered::Empty),
            Some(render) => match render(&ctx) {
                Ok(rendered) => Some(rendered),
                Err(err) => {
                    self.report_error(&err, "render");
                    match &inner.options.render_error {
                        Some(fallback) => match fallback(&ctx, &err) {
                            Ok(rendered) => Some(rendered),
                            Err(err) => {
                                self.report_error(&err, "renderError");
                                None
                            }
                        },
                        None => None,
                    }
                }
            },
        };

        let vnode = match rendered {
            // Keep showing the last good tree.
            None => inner.vnode.borrow().clone().unwrap_or_else(VNode::empty),
            Some(Rendered::Node(vnode)) => vnode,
            Some(Rendered::Nodes(mut nodes)) if nodes.len() == 1 => nodes.remove(0),
            Some(Rendered::Nodes(nodes)) => {
                if !nodes.is_empty() {
                    self.warn(Warning::MultipleRootNodes);
                }
                VNode::empty()
            }
            Some(Rendered::Empty) => VNode::empty(),
        };
        vnode.set_parent(placeholder.as_ref());
        vnode
    }

    /// Patch `vnode` against the previous render.
    fn update(&self, vnode: VNodeRef, hydrating: bool) {
        let inner = &self.inner;
        let patcher = inner.app.patcher().clone();
        let prev = inner.vnode.replace(Some(vnode.clone()));

        let el = {
            let _active = patcher.activate(self);
            match prev {
                None => patcher.patch(
                    inner.el.get().map(PatchTarget::Element),
                    Some(vnode),
                    hydrating,
                    false,
                ),
                Some(prev) => {
                    patcher.patch(Some(PatchTarget::VNode(prev)), Some(vnode), false, false)
                }
            }
        };
        inner.el.set(el);

        // A parent whose root is this instance shares its element.
        let placeholder = inner.placeholder.borrow().clone();
        if let (Some(placeholder), Some(parent)) = (placeholder, self.parent()) {
            let parent_root = parent.inner.vnode.borrow().clone();
            if parent_root.is_some_and(|root| Rc::ptr_eq(&root, &placeholder)) {
                parent.inner.el.set(el);
            }
        }
    }

    /// Re-render on the next flush even if nothing tracked changed.
    pub fn force_update(&self) {
        let watcher = self.inner.render_watcher.borrow().clone();
        if let Some(watcher) = watcher {
            watcher.update();
        }
    }

    /// Tear the instance down: watchers, rendered tree and listeners.
    pub fn destroy(&self) {
        let inner = &self.inner;
        if inner.is_being_destroyed.get() {
            return;
        }
        self.call_hook(Hook::BeforeDestroy);
        inner.is_being_destroyed.set(true);

        if let Some(parent) = self.parent() {
            if !parent.is_being_destroyed() && !inner.options.is_abstract {
                parent
                    .inner
                    .children
                    .borrow_mut()
                    .retain(|child| !child.ptr_eq(self));
            }
        }

        let render_watcher = inner.render_watcher.borrow().clone();
        if let Some(watcher) = render_watcher {
            watcher.teardown();
        }
        let watchers = std::mem::take(&mut *inner.watchers.borrow_mut());
        for watcher in watchers {
            watcher.teardown();
        }

        inner.is_destroyed.set(true);
        let vnode = inner.vnode.borrow().clone();
        if let Some(vnode) = vnode {
            inner
                .app
                .patcher()
                .patch(Some(PatchTarget::VNode(vnode)), None, false, false);
        }
        self.call_hook(Hook::Destroyed);
        self.off(None);
        inner.placeholder.borrow_mut().take();
        tracing::debug!(uid = inner.uid, component = %self.name(), "destroyed component");
    }

    // ------------------------------------------------------------------
    // Hooks, events and diagnostics
    // ------------------------------------------------------------------

    /// Run the hooks registered for `hook`, untracked. Errors are reported.
    pub(crate) fn call_hook(&self, hook: Hook) {
        let hooks = self.inner.options.hooks_for(hook);
        if hooks.is_empty() {
            return;
        }
        tracing::trace!(uid = self.inner.uid, hook = hook.name(), "calling hook");
        self.runtime().tracker().untracked(|| {
            for f in hooks {
                if let Err(err) = f(self) {
                    self.report_error(&err, &format!("{} hook", hook.name()));
                }
            }
        });
    }

    pub fn on(&self, event: impl Into<String>, handler: impl Fn(&Value) + 'static) {
        self.inner
            .events
            .borrow_mut()
            .entry(event.into())
            .or_default()
            .push(Rc::new(handler));
    }

    /// Remove the handlers for `event`, or every handler when `None`.
    pub fn off(&self, event: Option<&str>) {
        match event {
            Some(event) => {
                self.inner.events.borrow_mut().shift_remove(event);
            }
            None => self.inner.events.borrow_mut().clear(),
        }
    }

    /// Invoke the instance's own handlers for `event`, then the listener the
    /// parent attached in its render.
    pub fn emit(&self, event: &str, payload: &Value) {
        let mut handlers = self
            .inner
            .events
            .borrow()
            .get(event)
            .cloned()
            .unwrap_or_default();
        if let Some(listener) = self.inner.parent_listeners.borrow().get(event) {
            handlers.push(listener.clone());
        }
        for handler in handlers {
            handler(payload);
        }
    }

    pub(crate) fn set_parent_listeners(&self, listeners: IndexMap<String, EventHandler>) {
        *self.inner.parent_listeners.borrow_mut() = listeners;
    }

    /// Report an error raised on behalf of this instance.
    pub fn report_error(&self, err: &Error, info: &str) {
        self.runtime().handle_error(err, Some(&self.as_owner()), info);
    }

    pub(crate) fn warn(&self, warning: Warning) {
        self.runtime().warn(warning, Some(&*self.inner));
    }

    /// Run `f` on the next tick.
    pub fn next_tick(&self, f: impl FnOnce() + 'static) {
        self.runtime().next_tick(f);
    }

    // ------------------------------------------------------------------
    // Slots and refs
    // ------------------------------------------------------------------

    /// Group the content passed by the parent by slot name.
    pub(crate) fn resolve_slots(&self) {
        let children = self.inner.render_children.borrow().clone();
        let context = self.parent();
        let mut slots: IndexMap<String, Vec<VNodeRef>> = IndexMap::new();
        for child in children {
            let same_context = match (child.context(), &context) {
                (Some(ctx), Some(parent)) => ctx.ptr_eq(parent),
                (None, _) => true,
                _ => false,
            };
            let named = child.data().and_then(|data| data.slot.clone());
            match named {
                Some(name) if same_context => {
                    let slot = slots.entry(name).or_default();
                    if child.tag() == Some("template") {
                        slot.extend(child.children());
                    } else {
                        slot.push(child);
                    }
                }
                _ => slots.entry("default".to_string()).or_default().push(child),
            }
        }
        // A slot of nothing but whitespace and comments is no slot.
        slots.retain(|_, nodes| !nodes.iter().all(|node| is_whitespace(node)));
        *self.inner.slots.borrow_mut() = slots;
    }

    pub fn slot(&self, name: &str) -> Vec<VNodeRef> {
        self.inner
            .slots
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn scoped_slot(&self, name: &str) -> Option<ScopedSlot> {
        self.inner.scoped_slots.borrow().get(name).cloned()
    }

    /// The single target registered under `name`, or the first of a list.
    pub fn ref_target(&self, name: &str) -> Option<RefTarget> {
        self.inner
            .refs
            .borrow()
            .get(name)
            .and_then(|targets| targets.first().cloned())
    }

    /// Every target registered under `name`.
    pub fn ref_list(&self, name: &str) -> Vec<RefTarget> {
        self.inner
            .refs
            .borrow()
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    pub(crate) fn add_ref(&self, name: &str, target: RefTarget, in_for: bool) {
        let mut refs = self.inner.refs.borrow_mut();
        if in_for {
            let list = refs.entry(name.to_string()).or_default();
            if !list.contains(&target) {
                list.push(target);
            }
        } else {
            refs.insert(name.to_string(), vec![target]);
        }
    }

    pub(crate) fn remove_ref(&self, name: &str, target: &RefTarget) {
        let mut refs = self.inner.refs.borrow_mut();
        if let Some(list) = refs.get_mut(name) {
            list.retain(|t| t != target);
            if list.is_empty() {
                refs.shift_remove(name);
            }
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn uid(&self) -> u64 {
        self.inner.uid
    }

    /// `<Name>` for named components, `<Root>` for the root, `<Anonymous>`
    /// otherwise.
    pub fn name(&self) -> String {
        self.inner.display_name()
    }

    pub fn options(&self) -> &Rc<ComponentOptions> {
        &self.inner.options
    }

    pub fn runtime(&self) -> &Runtime {
        self.inner.app.runtime()
    }

    pub(crate) fn app(&self) -> &Rc<AppContext> {
        &self.inner.app
    }

    pub fn parent(&self) -> Option<Component> {
        self.inner.parent.as_ref().and_then(WeakComponent::upgrade)
    }

    pub fn root(&self) -> Component {
        let mut root = self.clone();
        while let Some(parent) = root.parent() {
            root = parent;
        }
        root
    }

    pub fn children(&self) -> Vec<Component> {
        self.inner.children.borrow().clone()
    }

    /// The root live node of the rendered tree.
    pub fn el(&self) -> Option<NodeId> {
        self.inner.el.get()
    }

    /// Root of the last rendered tree.
    pub fn vnode(&self) -> Option<VNodeRef> {
        self.inner.vnode.borrow().clone()
    }

    pub fn placeholder(&self) -> Option<VNodeRef> {
        self.inner.placeholder.borrow().clone()
    }

    pub(crate) fn set_placeholder(&self, placeholder: &VNodeRef) {
        *self.inner.placeholder.borrow_mut() = Some(placeholder.clone());
        let root = self.inner.vnode.borrow().clone();
        if let Some(root) = root {
            root.set_parent(Some(placeholder));
        }
    }

    pub(crate) fn render_children(&self) -> Vec<VNodeRef> {
        self.inner.render_children.borrow().clone()
    }

    pub(crate) fn set_render_children(&self, children: Vec<VNodeRef>) {
        *self.inner.render_children.borrow_mut() = children;
    }

    pub(crate) fn has_scoped_slots(&self) -> bool {
        !self.inner.scoped_slots.borrow().is_empty()
    }

    pub fn render_watcher(&self) -> Option<Watcher> {
        self.inner.render_watcher.borrow().clone()
    }

    pub fn is_mounted(&self) -> bool {
        self.inner.is_mounted.get()
    }

    pub(crate) fn set_mounted(&self) {
        self.inner.is_mounted.set(true);
    }

    pub fn is_being_destroyed(&self) -> bool {
        self.inner.is_being_destroyed.get()
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.is_destroyed.get()
    }

    /// Whether a keep-alive ancestor currently has this instance detached.
    pub fn is_inactive(&self) -> bool {
        self.inner.inactive.get() == Some(true)
    }

    pub(crate) fn inactive_state(&self) -> Option<bool> {
        self.inner.inactive.get()
    }

    pub(crate) fn set_inactive(&self, inactive: bool) {
        self.inner.inactive.set(Some(inactive));
    }

    pub(crate) fn direct_inactive(&self) -> bool {
        self.inner.direct_inactive.get()
    }

    pub(crate) fn set_direct_inactive(&self, inactive: bool) {
        self.inner.direct_inactive.set(inactive);
    }

    pub(crate) fn keep_alive_cache(&self) -> &RefCell<KeepAliveCache> {
        &self.inner.keep_alive
    }

    pub fn as_owner(&self) -> Rc<dyn Owner> {
        self.inner.clone()
    }

    pub fn downgrade(&self) -> WeakComponent {
        WeakComponent(Rc::downgrade(&self.inner))
    }

    pub fn ptr_eq(&self, other: &Component) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("uid", &self.inner.uid)
            .field("name", &self.name())
            .field("mounted", &self.is_mounted())
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}

enum WatchSource {
    Path(String),
    Func(Rc<dyn Fn(&Component) -> Result<Value>>),
}

fn is_whitespace(node: &VNodeRef) -> bool {
    (node.is_comment() && node.async_factory.is_none()) || node.text_content() == Some(" ")
}

impl ComponentInner {
    fn component(&self) -> Option<Component> {
        self.me.upgrade().map(|inner| Component { inner })
    }
}

impl Owner for ComponentInner {
    fn uid(&self) -> u64 {
        self.uid
    }

    fn display_name(&self) -> String {
        match (&self.options.name, &self.parent) {
            (Some(name), _) => format!("<{name}>"),
            (None, None) => "<Root>".to_string(),
            (None, Some(_)) => "<Anonymous>".to_string(),
        }
    }

    fn attach_watcher(&self, watcher: &Watcher) {
        if watcher.is_render() {
            *self.render_watcher.borrow_mut() = Some(watcher.clone());
        } else {
            self.watchers.borrow_mut().push(watcher.clone());
        }
    }

    fn detach_watcher(&self, watcher: &Watcher) {
        self.watchers.borrow_mut().retain(|w| !w.ptr_eq(watcher));
    }

    fn is_being_destroyed(&self) -> bool {
        self.is_being_destroyed.get()
    }

    fn is_mounted(&self) -> bool {
        self.is_mounted.get()
    }

    fn is_destroyed(&self) -> bool {
        self.is_destroyed.get()
    }

    fn lookup(&self, key: &str) -> Value {
        self.component().map(|vm| vm.get(key)).unwrap_or_default()
    }

    fn parent_owner(&self) -> Option<Rc<dyn Owner>> {
        self.parent
            .as_ref()
            .and_then(WeakComponent::upgrade)
            .map(|parent| parent.as_owner())
    }

    fn capture_error(&self, err: &Error, _source: &Rc<dyn Owner>, info: &str) -> Result<bool> {
        let Some(vm) = self.component() else {
            return Ok(true);
        };
        for hook in &self.options.error_captured {
            if !hook(&vm, err, info)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn after_update(&self) {
        if self.is_destroyed.get() {
            return;
        }
        if let Some(vm) = self.component() {
            vm.call_hook(Hook::Updated);
        }
    }

    fn after_activate(&self) {
        if let Some(vm) = self.component() {
            vm.set_inactive(true);
            hooks::activate_child_component(&vm, true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::config::Config;
    use crate::dom::MemoryDom;
    use crate::vdom::VNodeData;
    use serde_json::json;

    fn app() -> (App, Rc<MemoryDom>) {
        let dom = Rc::new(MemoryDom::new());
        let app = App::new(Runtime::new(Config::default()), dom.clone());
        (app, dom)
    }

    #[test]
    fn state_props_and_computed_resolve_in_order() {
        let (app, _dom) = app();
        let options = ComponentOptions::new()
            .data_json(json!({ "count": 2 }))
            .computed("doubled", |vm| {
                Ok(Value::from(vm.get("count").as_f64().unwrap_or(0.0) * 2.0))
            })
            .render(|ctx| Ok(ctx.h("p", (), ctx.get("doubled")).into()));

        let vm = app.mount(options, None).unwrap();
        assert_eq!(vm.get("count"), Value::from(2));
        assert_eq!(vm.get("doubled"), Value::from(4));
        assert!(vm.get("missing").is_null());
        assert!(matches!(vm.try_get("missing"), Err(Error::UndefinedProperty(_))));
    }

    #[test]
    fn hooks_run_in_lifecycle_order() {
        let (app, _dom) = app();
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut options = ComponentOptions::new().render(|ctx| Ok(ctx.h("div", (), ()).into()));
        for hook in [
            Hook::BeforeCreate,
            Hook::Created,
            Hook::BeforeMount,
            Hook::Mounted,
            Hook::BeforeDestroy,
            Hook::Destroyed,
        ] {
            let log = log.clone();
            options = options.hook(hook, move |_| {
                log.borrow_mut().push(hook.name());
                Ok(())
            });
        }

        let vm = app.mount(options, None).unwrap();
        vm.destroy();
        vm.destroy();

        assert_eq!(
            *log.borrow(),
            vec!["beforeCreate", "created", "beforeMount", "mounted", "beforeDestroy", "destroyed"]
        );
        assert!(vm.render_watcher().is_some_and(|w| !w.is_active()));
    }

    #[test]
    fn undeclared_keys_are_not_added() {
        let (app, _dom) = app();
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let sink = warnings.clone();
        app.runtime()
            .set_warn_handler(move |w, _| sink.borrow_mut().push(w.clone()));

        let vm = app
            .mount(
                ComponentOptions::new()
                    .data_json(json!({ "a": 1 }))
                    .render(|ctx| Ok(ctx.h("div", (), ()).into())),
                None,
            )
            .unwrap();
        vm.set("b", 2);

        assert!(vm.get("b").is_null());
        assert_eq!(
            *warnings.borrow(),
            vec![Warning::AvoidReplacingData("b".to_string())]
        );
    }

    #[test]
    fn watch_with_immediate_and_unwatch() {
        let (app, _dom) = app();
        let vm = app
            .mount(
                ComponentOptions::new()
                    .data_json(json!({ "n": 1 }))
                    .render(|ctx| Ok(ctx.h("div", (), ()).into())),
                None,
            )
            .unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let handle = vm
            .watch(
                "n",
                WatchDef::new(move |_, new, old| {
                    sink.borrow_mut().push((new.clone(), old.clone()));
                    Ok(())
                })
                .immediate(),
            )
            .unwrap();

        vm.set("n", 2);
        app.tick();
        handle.unwatch();
        vm.set("n", 3);
        app.tick();

        assert_eq!(
            *seen.borrow(),
            vec![
                (Value::from(1), Value::Null),
                (Value::from(2), Value::from(1)),
            ]
        );
    }

    #[test]
    fn events_reach_own_handlers() {
        let (app, _dom) = app();
        let vm = app
            .mount(
                ComponentOptions::new().render(|ctx| Ok(ctx.h("div", VNodeData::new(), ()).into())),
                None,
            )
            .unwrap();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        vm.on("ping", move |payload| {
            counter.set(counter.get() + payload.as_i64().unwrap_or(0))
        });

        vm.emit("ping", &Value::from(2));
        vm.off(Some("ping"));
        vm.emit("ping", &Value::from(2));
        assert_eq!(hits.get(), 2);
    }

    #[test]
    fn render_error_keeps_previous_tree() {
        let (app, dom) = app();
        let reported = Rc::new(RefCell::new(Vec::new()));
        let sink = reported.clone();
        app.runtime()
            .set_error_handler(move |err, _, info| sink.borrow_mut().push((err.clone(), info.to_string())));

        let vm = app
            .mount(
                ComponentOptions::new()
                    .data_json(json!({ "ok": true }))
                    .render(|ctx| {
                        if ctx.get("ok").is_truthy() {
                            Ok(ctx.h("p", (), "fine").into())
                        } else {
                            Err(Error::msg("boom"))
                        }
                    }),
                None,
            )
            .unwrap();
        let before = dom.to_html(vm.el().unwrap());

        vm.set("ok", false);
        app.tick();

        assert_eq!(dom.to_html(vm.el().unwrap()), before);
        assert_eq!(
            *reported.borrow(),
            vec![(Error::msg("boom"), "render".to_string())]
        );
    }

    #[test]
    fn empty_path_getters_read_null() {
        use crate::reactive::{Getter, Watcher, WatcherOptions};

        let (app, _dom) = app();
        let vm = app
            .mount(
                ComponentOptions::new()
                    .data_json(json!({ "a": 1 }))
                    .render(|ctx| Ok(ctx.h("p", (), ()).into())),
                None,
            )
            .unwrap();
        let watcher = Watcher::new(
            app.runtime(),
            Some(vm.as_owner()),
            Getter::Path(Default::default()),
            None,
            WatcherOptions::user(),
        )
        .unwrap();
        assert!(watcher.value().is_null());
    }
}
