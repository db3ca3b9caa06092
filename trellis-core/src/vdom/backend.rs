//! Backend Abstractions
//!
//! The patcher never touches a concrete tree. It drives a [`NodeOps`]
//! implementation through opaque [`NodeId`] handles, and lets pluggable
//! [`Module`]s manage the per-node aspects it does not understand itself
//! (attributes, classes, listeners, directives, refs).

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use super::vnode::{EventHandler, VNode, VNodeRef};

/// Opaque handle to a live node owned by a [`NodeOps`] backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u64);

impl NodeId {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What kind of live node a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Element,
    Text,
    Comment,
}

/// Primitive operations on the target tree.
///
/// Insertion follows DOM semantics: `insert_before` with no reference node
/// appends, and inserting a node that already has a parent moves it.
pub trait NodeOps {
    /// Create an element. The vnode is available for backends that need to
    /// look at its data up front.
    fn create_element(&self, tag: &str, vnode: &VNode) -> NodeId;
    fn create_element_ns(&self, namespace: &str, tag: &str) -> NodeId;
    fn create_text_node(&self, text: &str) -> NodeId;
    fn create_comment(&self, text: &str) -> NodeId;

    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>);
    fn remove_child(&self, parent: NodeId, child: NodeId);
    fn append_child(&self, parent: NodeId, child: NodeId);

    fn parent_node(&self, node: NodeId) -> Option<NodeId>;
    fn next_sibling(&self, node: NodeId) -> Option<NodeId>;
    fn first_child(&self, node: NodeId) -> Option<NodeId>;
    fn has_child_nodes(&self, node: NodeId) -> bool {
        self.first_child(node).is_some()
    }

    /// Tag name of an element, `None` for text and comment nodes.
    fn tag_name(&self, node: NodeId) -> Option<String>;
    fn kind(&self, node: NodeId) -> Option<NodeKind>;
    /// Character data of a text or comment node.
    fn text(&self, node: NodeId) -> Option<String>;

    fn set_text_content(&self, node: NodeId, text: &str);
    fn set_style_scope(&self, node: NodeId, scope_id: &str);

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String>;
    fn set_attribute(&self, node: NodeId, name: &str, value: &str);
    fn remove_attribute(&self, node: NodeId, name: &str);
    fn has_attribute(&self, node: NodeId, name: &str) -> bool {
        self.get_attribute(node, name).is_some()
    }

    /// Attach `handler` for `event`, replacing any handler attached earlier
    /// for the same event.
    fn add_listener(&self, node: NodeId, event: &str, handler: EventHandler);
    fn remove_listener(&self, node: NodeId, event: &str);
}

/// Shared countdown that removes a node once every participant agreed.
///
/// The patcher creates one per removed element with one listener per module
/// plus one for itself. Each participant calls [`RemoveCallback::done`] when
/// it no longer needs the node in place, which lets a module hold a node
/// back (for a leave animation, say) while the rest of the patch proceeds.
#[derive(Clone)]
pub struct RemoveCallback {
    inner: Rc<RemoveState>,
}

struct RemoveState {
    ops: Rc<dyn NodeOps>,
    node: Option<NodeId>,
    listeners: Cell<usize>,
}

impl RemoveCallback {
    pub(crate) fn new(ops: Rc<dyn NodeOps>, node: Option<NodeId>, listeners: usize) -> Self {
        Self {
            inner: Rc::new(RemoveState {
                ops,
                node,
                listeners: Cell::new(listeners),
            }),
        }
    }

    pub(crate) fn add_listeners(&self, count: usize) {
        let state = &self.inner;
        state.listeners.set(state.listeners.get() + count);
    }

    /// Signal that this participant is finished. The node is detached when
    /// the last participant signals.
    pub fn done(&self) {
        let state = &self.inner;
        let remaining = state.listeners.get().saturating_sub(1);
        state.listeners.set(remaining);
        if remaining == 0 {
            if let Some(node) = state.node {
                if let Some(parent) = state.ops.parent_node(node) {
                    state.ops.remove_child(parent, node);
                }
            }
        }
    }

    /// Participants that have not signalled yet.
    pub fn pending(&self) -> usize {
        self.inner.listeners.get()
    }
}

/// A per-node extension of the patcher.
///
/// Every hook has a no-op default except `remove`, whose default signals
/// completion immediately.
pub trait Module {
    fn name(&self) -> &'static str;

    fn create(&self, _ops: &dyn NodeOps, _vnode: &VNodeRef) {}

    /// A kept-alive component was re-inserted.
    fn activate(&self, _ops: &dyn NodeOps, _vnode: &VNodeRef) {}

    fn update(&self, _ops: &dyn NodeOps, _old: &VNodeRef, _vnode: &VNodeRef) {}

    fn remove(&self, _ops: &dyn NodeOps, _vnode: &VNodeRef, rm: &RemoveCallback) {
        rm.done();
    }

    fn destroy(&self, _ops: &dyn NodeOps, _vnode: &VNodeRef) {}
}
