//! Application Root
//!
//! An [`App`] ties a [`Runtime`] to a rendering backend and holds what is
//! registered globally: components, directives and mixins. Every definition
//! instantiated through the app is first merged with those globals, so a
//! globally registered component resolves from any template.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use trellis_core::{App, ComponentOptions, Config, MemoryDom, Runtime};
//!
//! let dom = Rc::new(MemoryDom::new());
//! let app = App::new(Runtime::new(Config::default()), dom.clone());
//! let root = dom.create_root("div");
//!
//! let vm = app.mount(
//!     ComponentOptions::new()
//!         .data_json(serde_json::json!({ "msg": "hello" }))
//!         .render(|ctx| Ok(ctx.h("p", (), ctx.get("msg")).into())),
//!     Some(root),
//! )?;
//!
//! vm.set("msg", "bye");
//! app.tick();
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::component::{merge_options, Component, ComponentOptions};
use crate::error::Result;
use crate::reactive::{observe, Runtime, Value};
use crate::vdom::modules::{platform_modules, Directive};
use crate::vdom::{NodeId, NodeOps, Patcher};

/// State shared by every instance of one application.
pub(crate) struct AppContext {
    rt: Runtime,
    patcher: Rc<Patcher>,
    /// Global components, directives and mixins, folded into one
    /// definition that every other definition is merged over.
    globals: RefCell<ComponentOptions>,
    /// Merged definitions keyed by the cid of the unmerged one.
    resolved: RefCell<HashMap<u64, Rc<ComponentOptions>>>,
}

impl AppContext {
    pub(crate) fn runtime(&self) -> &Runtime {
        &self.rt
    }

    pub(crate) fn patcher(&self) -> &Rc<Patcher> {
        &self.patcher
    }

    /// The definition `options` merged with the current globals. Repeated
    /// calls return the same `Rc` until the globals change.
    pub(crate) fn resolve_options(&self, options: &Rc<ComponentOptions>) -> Rc<ComponentOptions> {
        let cid = options.cid();
        if let Some(resolved) = self.resolved.borrow().get(&cid) {
            return resolved.clone();
        }
        let merged = Rc::new(merge_options(&self.globals.borrow(), options));
        tracing::trace!(cid, merged = merged.cid(), "resolved component options");
        self.resolved.borrow_mut().insert(cid, merged.clone());
        merged
    }

    fn update_globals(&self, f: impl FnOnce(ComponentOptions) -> ComponentOptions) {
        let current = std::mem::take(&mut *self.globals.borrow_mut());
        *self.globals.borrow_mut() = f(current);
        self.resolved.borrow_mut().clear();
    }
}

/// A UI application: a runtime, a backend, and global registrations.
#[derive(Clone)]
pub struct App {
    inner: Rc<AppContext>,
}

impl App {
    pub fn new(rt: Runtime, ops: Rc<dyn NodeOps>) -> Self {
        let patcher = Rc::new(Patcher::new(rt.clone(), ops, platform_modules()));
        Self {
            inner: Rc::new(AppContext {
                rt,
                patcher,
                globals: RefCell::new(ComponentOptions::new()),
                resolved: RefCell::new(HashMap::new()),
            }),
        }
    }

    pub fn runtime(&self) -> &Runtime {
        &self.inner.rt
    }

    pub fn patcher(&self) -> &Rc<Patcher> {
        &self.inner.patcher
    }

    /// Register a component under `name` for every template in the app.
    pub fn component(&self, name: impl Into<String>, options: impl Into<Rc<ComponentOptions>>) -> &Self {
        let name = name.into();
        tracing::debug!(component = %name, "registering global component");
        let options = options.into();
        self.inner.update_globals(|globals| globals.component(name, options));
        self
    }

    /// Register a directive under `name` for every template in the app.
    pub fn directive(&self, name: impl Into<String>, directive: impl Directive + 'static) -> &Self {
        let name = name.into();
        tracing::debug!(directive = %name, "registering global directive");
        self.inner.update_globals(|globals| globals.directive(name, directive));
        self
    }

    /// Merge `mixin` into every definition instantiated afterwards.
    pub fn mixin(&self, mixin: ComponentOptions) -> &Self {
        self.inner
            .update_globals(|globals| merge_options(&globals, &mixin));
        self
    }

    /// Make `value` reactive outside of any component and return it.
    pub fn observable(&self, value: Value) -> Value {
        observe(&self.inner.rt, &value);
        value
    }

    /// Create a root instance and render it. With `el`, the rendered tree
    /// replaces that element; without, it is created detached and can be
    /// reached through [`Component::el`].
    pub fn mount(
        &self,
        options: impl Into<Rc<ComponentOptions>>,
        el: Option<NodeId>,
    ) -> Result<Component> {
        self.instantiate(options.into(), el, false)
    }

    /// Create a root instance that adopts the pre-rendered tree at `el`
    /// instead of creating a new one. When the tree does not match what
    /// the instance renders, it is discarded and rendered from scratch.
    pub fn hydrate(&self, options: impl Into<Rc<ComponentOptions>>, el: NodeId) -> Result<Component> {
        self.instantiate(options.into(), Some(el), true)
    }

    fn instantiate(
        &self,
        options: Rc<ComponentOptions>,
        el: Option<NodeId>,
        hydrating: bool,
    ) -> Result<Component> {
        let options = self.inner.resolve_options(&options);
        let vm = Component::create(&self.inner, options, None, None);
        tracing::debug!(component = %vm.name(), uid = vm.uid(), hydrating, "mounting root");
        vm.mount(el, hydrating)?;
        Ok(vm)
    }

    /// Run every pending tick: flushes, `next_tick` callbacks, and
    /// anything they schedule. Returns the number of jobs run.
    pub fn tick(&self) -> usize {
        self.inner.rt.drain()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Hook;
    use crate::config::Config;
    use crate::dom::MemoryDom;
    use std::cell::Cell;

    fn app() -> (App, Rc<MemoryDom>) {
        let dom = Rc::new(MemoryDom::new());
        (App::new(Runtime::new(Config::default()), dom.clone()), dom)
    }

    #[test]
    fn resolved_options_are_cached_until_globals_change() {
        let (app, _dom) = app();
        let options = Rc::new(ComponentOptions::new().name("Card"));
        let first = app.inner.resolve_options(&options);
        let second = app.inner.resolve_options(&options);
        assert!(Rc::ptr_eq(&first, &second));

        app.component("Other", ComponentOptions::new());
        let third = app.inner.resolve_options(&options);
        assert!(!Rc::ptr_eq(&first, &third));
        assert!(third.resolve_component("Other").is_some());
        assert_eq!(third.get_name(), Some("Card"));
    }

    #[test]
    fn mixins_apply_to_roots() {
        let (app, _dom) = app();
        let created = Rc::new(Cell::new(0));
        let counter = created.clone();
        app.mixin(ComponentOptions::new().hook(Hook::Created, move |_| {
            counter.set(counter.get() + 1);
            Ok(())
        }));

        app.mount(
            ComponentOptions::new().render(|ctx| Ok(ctx.h("div", (), ()).into())),
            None,
        )
        .unwrap();
        assert_eq!(created.get(), 1);
    }

    #[test]
    fn mounting_into_an_element_replaces_it() {
        let (app, dom) = app();
        let root = dom.create_root("div");
        let vm = app
            .mount(
                ComponentOptions::new().render(|ctx| Ok(ctx.h("section", (), "hi").into())),
                Some(root),
            )
            .unwrap();
        let el = vm.el().unwrap();
        assert_eq!(dom.parent(el), Some(dom.document()));
        assert_eq!(dom.parent(root), None);
        assert_eq!(dom.to_html(el), "<section>hi</section>");
    }
}
