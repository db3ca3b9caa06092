//! Render-function context.

use std::rc::Rc;

use super::Component;
use crate::error::Result;
use crate::reactive::Value;
use crate::vdom::{create_element, Child, ElementData, Normalization, Tag, VNode, VNodeRef};

/// What a render function returns.
pub enum Rendered {
    Node(VNodeRef),
    /// Several roots. Only a single-element list is accepted.
    Nodes(Vec<VNodeRef>),
    Empty,
}

impl From<VNodeRef> for Rendered {
    fn from(vnode: VNodeRef) -> Self {
        Rendered::Node(vnode)
    }
}

impl From<Vec<VNodeRef>> for Rendered {
    fn from(vnodes: Vec<VNodeRef>) -> Self {
        Rendered::Nodes(vnodes)
    }
}

impl From<Option<VNodeRef>> for Rendered {
    fn from(vnode: Option<VNodeRef>) -> Self {
        vnode.map_or(Rendered::Empty, Rendered::Node)
    }
}

/// Handed to render functions. Reads through it are tracked by the render
/// watcher.
pub struct RenderContext<'a> {
    vm: &'a Component,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(vm: &'a Component) -> Self {
        Self { vm }
    }

    pub fn component(&self) -> &Component {
        self.vm
    }

    /// Tracked read of a prop, state key, or computed property.
    pub fn get(&self, key: &str) -> Value {
        self.vm.get(key)
    }

    pub fn try_get(&self, key: &str) -> Result<Value> {
        self.vm.try_get(key)
    }

    /// Create a node, normalizing children deeply.
    pub fn h(
        &self,
        tag: impl Into<Tag>,
        data: impl Into<ElementData>,
        children: impl Into<Child>,
    ) -> VNodeRef {
        create_element(self.vm, tag.into(), data.into(), children.into(), Normalization::Full)
    }

    /// Create a node with an explicit normalization mode.
    pub fn create_element(
        &self,
        tag: impl Into<Tag>,
        data: impl Into<ElementData>,
        children: impl Into<Child>,
        normalization: Normalization,
    ) -> VNodeRef {
        create_element(self.vm, tag.into(), data.into(), children.into(), normalization)
    }

    pub fn text(&self, text: impl Into<String>) -> VNodeRef {
        VNode::text(text)
    }

    pub fn empty(&self) -> VNodeRef {
        VNode::empty()
    }

    /// Content passed into a named slot, or the default slot for
    /// `"default"`.
    pub fn slot(&self, name: &str) -> Vec<VNodeRef> {
        self.vm.slot(name)
    }

    /// Render a scoped slot with `props`. Falls back to the plain slot of
    /// the same name.
    pub fn scoped_slot(&self, name: &str, props: &Value) -> Option<Vec<VNodeRef>> {
        match self.vm.scoped_slot(name) {
            Some(slot) => Some(slot(props)),
            None => {
                let nodes = self.vm.slot(name);
                (!nodes.is_empty()).then_some(nodes)
            }
        }
    }

    /// Bind `handler` to an instance method-style closure that receives the
    /// component.
    pub fn handler(&self, f: impl Fn(&Component, &Value) + 'static) -> Rc<dyn Fn(&Value)> {
        let weak = self.vm.downgrade();
        Rc::new(move |payload| {
            if let Some(vm) = weak.upgrade() {
                f(&vm, payload);
            }
        })
    }
}
