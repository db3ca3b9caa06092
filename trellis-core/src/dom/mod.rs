//! In-Memory Document
//!
//! [`MemoryDom`] is a [`NodeOps`] backend that keeps the live tree in
//! memory. It is what tests and headless renderers patch into, and it
//! records every mutation in an operation log ([`DomOp`]) that can be
//! shipped to another process and replayed.
//!
//! # Overview
//!
//! - Nodes are stored in an arena indexed by [`NodeId`]. Ids are allocated
//!   sequentially, so replaying a log into a fresh document recreates the
//!   same ids.
//! - A document node (id `0`) is always present. [`MemoryDom::create_root`]
//!   attaches a mount point to it.
//! - Listeners are stored per node and fired by [`MemoryDom::dispatch`].

mod node;
mod op;

use std::cell::{Cell, RefCell};

pub use node::{Markup, Node};
pub use op::{from_json, from_msgpack, to_json, to_msgpack, DomOp};

use crate::error::Result;
use crate::vdom::{EventHandler, NodeId, NodeKind, NodeOps, VNode};
use crate::reactive::Value;

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

pub struct MemoryDom {
    nodes: RefCell<Vec<Node>>,
    ops: RefCell<Vec<DomOp>>,
    recording: Cell<bool>,
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    pub fn new() -> Self {
        let document = Node::element(NodeId::from_raw(0), "#document", None);
        Self {
            nodes: RefCell::new(vec![document]),
            ops: RefCell::new(Vec::new()),
            recording: Cell::new(true),
        }
    }

    /// Rebuild a document from a recorded log.
    pub fn replay(ops: &[DomOp]) -> Self {
        let dom = Self::new();
        for op in ops {
            dom.apply(op);
        }
        dom
    }

    pub fn document(&self) -> NodeId {
        NodeId::from_raw(0)
    }

    /// Create an element attached to the document, to mount into.
    pub fn create_root(&self, tag: &str) -> NodeId {
        let id = self.alloc(|id| Node::element(id, tag, None));
        self.record(DomOp::CreateElement {
            id,
            tag: tag.to_string(),
            namespace: None,
        });
        self.append_child(self.document(), id);
        id
    }

    /// Materialize `markup` under `parent`, or detached when `None`.
    /// Nothing is recorded: the markup stands for content that was already
    /// there.
    pub fn build(&self, parent: Option<NodeId>, markup: &Markup) -> NodeId {
        let id = match markup {
            Markup::Element { tag, attrs, children } => {
                let id = self.alloc(|id| Node::element(id, tag, None));
                {
                    let mut nodes = self.nodes.borrow_mut();
                    let node = &mut nodes[index(id)];
                    for (name, value) in attrs {
                        node.attributes_mut().insert(name.clone(), value.clone());
                    }
                }
                for child in children {
                    self.build(Some(id), child);
                }
                id
            }
            Markup::Text(text) => self.alloc(|id| Node::text(id, text)),
            Markup::Comment(text) => self.alloc(|id| Node::comment(id, text)),
        };
        if let Some(parent) = parent {
            self.attach(parent, id, None);
        }
        id
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    pub fn with_node<R>(&self, id: NodeId, f: impl FnOnce(&Node) -> R) -> Option<R> {
        self.nodes.borrow().get(index(id)).map(f)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.with_node(id, Node::parent).flatten()
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.with_node(id, |node| node.children().to_vec())
            .unwrap_or_default()
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        self.with_node(id, |node| node.attributes().get(name).cloned())
            .flatten()
    }

    pub fn has_listener(&self, id: NodeId, event: &str) -> bool {
        self.with_node(id, |node| node.has_listener(event))
            .unwrap_or(false)
    }

    /// Concatenated text of `id` and its descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let (kind, children) = match self.with_node(id, |n| (n.kind(), n.children().to_vec())) {
            Some(found) => found,
            None => return,
        };
        match kind {
            NodeKind::Text => {
                if let Some(text) = self.with_node(id, |n| n.data().to_string()) {
                    out.push_str(&text);
                }
            }
            NodeKind::Comment => {}
            NodeKind::Element => {
                for child in children {
                    self.collect_text(child, out);
                }
            }
        }
    }

    /// Serialize the subtree at `id` as HTML.
    pub fn to_html(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_html(id, &mut out);
        out
    }

    fn write_html(&self, id: NodeId, out: &mut String) {
        let nodes = self.nodes.borrow();
        let Some(node) = nodes.get(index(id)) else {
            return;
        };
        match node.kind() {
            NodeKind::Text => out.push_str(&escape(node.data())),
            NodeKind::Comment => {
                out.push_str("<!--");
                out.push_str(node.data());
                out.push_str("-->");
            }
            NodeKind::Element => {
                let tag = node.tag().unwrap_or_default().to_string();
                out.push('<');
                out.push_str(&tag);
                for (name, value) in node.attributes() {
                    out.push(' ');
                    out.push_str(name);
                    if !value.is_empty() {
                        out.push_str("=\"");
                        out.push_str(&escape(value).replace('"', "&quot;"));
                        out.push('"');
                    }
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                let children = node.children().to_vec();
                drop(nodes);
                for child in children {
                    self.write_html(child, out);
                }
                out.push_str("</");
                out.push_str(&tag);
                out.push('>');
            }
        }
    }

    /// Fire the listener for `event` on `id`. Returns whether one ran.
    pub fn dispatch(&self, id: NodeId, event: &str, payload: &Value) -> bool {
        // Release the arena before running user code, which may patch.
        let handler = self.with_node(id, |node| node.listener(event)).flatten();
        match handler {
            Some(handler) => {
                tracing::trace!(node = %id, event, "dispatching event");
                handler(payload);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Operation log
    // ------------------------------------------------------------------

    /// Drain the recorded operations.
    pub fn take_ops(&self) -> Vec<DomOp> {
        std::mem::take(&mut *self.ops.borrow_mut())
    }

    pub fn clear_ops(&self) {
        self.ops.borrow_mut().clear();
    }

    pub fn op_count(&self) -> usize {
        self.ops.borrow().len()
    }

    /// Stop or resume recording.
    pub fn set_recording(&self, recording: bool) {
        self.recording.set(recording);
    }

    /// Encode the pending operations as MessagePack and drain them.
    pub fn flush_msgpack(&self) -> Result<Vec<u8>> {
        let ops = self.take_ops();
        to_msgpack(&ops)
    }

    fn record(&self, op: DomOp) {
        if self.recording.get() {
            tracing::trace!(?op, "dom op");
            self.ops.borrow_mut().push(op);
        }
    }

    fn apply(&self, op: &DomOp) {
        match op {
            DomOp::CreateElement { tag, namespace, .. } => {
                match namespace {
                    Some(ns) => self.create_element_ns(ns, tag),
                    None => self.create_element(tag, &VNode::new_element(tag.clone(), None, None, None)),
                };
            }
            DomOp::CreateText { text, .. } => {
                self.create_text_node(text);
            }
            DomOp::CreateComment { text, .. } => {
                self.create_comment(text);
            }
            DomOp::InsertBefore { parent, node, reference } => {
                self.insert_before(*parent, *node, *reference)
            }
            DomOp::AppendChild { parent, child } => self.append_child(*parent, *child),
            DomOp::RemoveChild { parent, child } => self.remove_child(*parent, *child),
            DomOp::SetText { node, text } => self.set_text_content(*node, text),
            DomOp::SetAttribute { node, name, value } => self.set_attribute(*node, name, value),
            DomOp::RemoveAttribute { node, name } => self.remove_attribute(*node, name),
            DomOp::AddListener { .. } | DomOp::RemoveListener { .. } => {}
        }
    }

    // ------------------------------------------------------------------
    // Arena
    // ------------------------------------------------------------------

    fn alloc(&self, make: impl FnOnce(NodeId) -> Node) -> NodeId {
        let mut nodes = self.nodes.borrow_mut();
        let id = NodeId::from_raw(nodes.len() as u64);
        nodes.push(make(id));
        id
    }

    fn detach(&self, id: NodeId) {
        let mut nodes = self.nodes.borrow_mut();
        let Some(parent) = nodes.get(index(id)).and_then(Node::parent) else {
            return;
        };
        if let Some(parent) = nodes.get_mut(index(parent)) {
            parent.children_mut().retain(|child| *child != id);
        }
        nodes[index(id)].set_parent(None);
    }

    /// Move `id` under `parent`, before `reference` when it is a child of
    /// `parent`, last otherwise.
    fn attach(&self, parent: NodeId, id: NodeId, reference: Option<NodeId>) {
        self.detach(id);
        let mut nodes = self.nodes.borrow_mut();
        if index(parent) >= nodes.len() || index(id) >= nodes.len() {
            return;
        }
        let children = nodes[index(parent)].children_mut();
        let position = reference.and_then(|r| children.iter().position(|child| *child == r));
        match position {
            Some(position) => children.insert(position, id),
            None => children.push(id),
        }
        nodes[index(id)].set_parent(Some(parent));
    }
}

impl NodeOps for MemoryDom {
    fn create_element(&self, tag: &str, _vnode: &VNode) -> NodeId {
        let id = self.alloc(|id| Node::element(id, tag, None));
        self.record(DomOp::CreateElement {
            id,
            tag: tag.to_string(),
            namespace: None,
        });
        id
    }

    fn create_element_ns(&self, namespace: &str, tag: &str) -> NodeId {
        let id = self.alloc(|id| Node::element(id, tag, Some(namespace)));
        self.record(DomOp::CreateElement {
            id,
            tag: tag.to_string(),
            namespace: Some(namespace.to_string()),
        });
        id
    }

    fn create_text_node(&self, text: &str) -> NodeId {
        let id = self.alloc(|id| Node::text(id, text));
        self.record(DomOp::CreateText {
            id,
            text: text.to_string(),
        });
        id
    }

    fn create_comment(&self, text: &str) -> NodeId {
        let id = self.alloc(|id| Node::comment(id, text));
        self.record(DomOp::CreateComment {
            id,
            text: text.to_string(),
        });
        id
    }

    fn insert_before(&self, parent: NodeId, node: NodeId, reference: Option<NodeId>) {
        self.attach(parent, node, reference);
        self.record(DomOp::InsertBefore {
            parent,
            node,
            reference,
        });
    }

    fn remove_child(&self, parent: NodeId, child: NodeId) {
        if self.parent(child) != Some(parent) {
            return;
        }
        self.detach(child);
        self.record(DomOp::RemoveChild { parent, child });
    }

    fn append_child(&self, parent: NodeId, child: NodeId) {
        self.attach(parent, child, None);
        self.record(DomOp::AppendChild { parent, child });
    }

    fn parent_node(&self, node: NodeId) -> Option<NodeId> {
        self.parent(node)
    }

    fn next_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|child| *child == node)?;
        siblings.get(position + 1).copied()
    }

    fn first_child(&self, node: NodeId) -> Option<NodeId> {
        self.children(node).first().copied()
    }

    fn tag_name(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |n| n.tag().map(str::to_string)).flatten()
    }

    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.with_node(node, Node::kind)
    }

    fn text(&self, node: NodeId) -> Option<String> {
        self.with_node(node, |n| match n.kind() {
            NodeKind::Element => None,
            NodeKind::Text | NodeKind::Comment => Some(n.data().to_string()),
        })
        .flatten()
    }

    /// Replaces the children of an element with one text node, or the data
    /// of a text or comment node.
    fn set_text_content(&self, node: NodeId, text: &str) {
        match self.kind(node) {
            None => return,
            Some(NodeKind::Element) => {
                for child in self.children(node) {
                    self.detach(child);
                }
                if !text.is_empty() {
                    let id = self.alloc(|id| Node::text(id, text));
                    self.attach(node, id, None);
                }
            }
            Some(NodeKind::Text | NodeKind::Comment) => {
                if let Some(n) = self.nodes.borrow_mut().get_mut(index(node)) {
                    n.set_data(text);
                }
            }
        }
        self.record(DomOp::SetText {
            node,
            text: text.to_string(),
        });
    }

    fn set_style_scope(&self, node: NodeId, scope_id: &str) {
        self.set_attribute(node, scope_id, "");
    }

    fn get_attribute(&self, node: NodeId, name: &str) -> Option<String> {
        self.attribute(node, name)
    }

    fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(index(node)) {
            n.attributes_mut().insert(name.to_string(), value.to_string());
        }
        self.record(DomOp::SetAttribute {
            node,
            name: name.to_string(),
            value: value.to_string(),
        });
    }

    fn remove_attribute(&self, node: NodeId, name: &str) {
        let removed = self
            .nodes
            .borrow_mut()
            .get_mut(index(node))
            .and_then(|n| n.attributes_mut().shift_remove(name));
        if removed.is_some() {
            self.record(DomOp::RemoveAttribute {
                node,
                name: name.to_string(),
            });
        }
    }

    fn add_listener(&self, node: NodeId, event: &str, handler: EventHandler) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(index(node)) {
            n.listeners_mut().insert(event.to_string(), handler);
        }
        self.record(DomOp::AddListener {
            node,
            event: event.to_string(),
        });
    }

    fn remove_listener(&self, node: NodeId, event: &str) {
        if let Some(n) = self.nodes.borrow_mut().get_mut(index(node)) {
            n.listeners_mut().shift_remove(event);
        }
        self.record(DomOp::RemoveListener {
            node,
            event: event.to_string(),
        });
    }
}

fn index(id: NodeId) -> usize {
    id.raw() as usize
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn insert_before_moves_existing_children() {
        let dom = MemoryDom::new();
        let root = dom.create_root("ul");
        let a = dom.create_text_node("a");
        let b = dom.create_text_node("b");
        dom.append_child(root, a);
        dom.append_child(root, b);
        dom.insert_before(root, b, Some(a));
        assert_eq!(dom.children(root), vec![b, a]);
        assert_eq!(dom.next_sibling(b), Some(a));
        assert_eq!(dom.text_content(root), "ba");
    }

    #[test]
    fn html_serialization_escapes_and_skips_void_closers() {
        let dom = MemoryDom::new();
        let root = dom.build(
            None,
            &Markup::element("p")
                .attr("title", "a\"b")
                .attr("data-v-1", "")
                .children([Markup::text("1 < 2"), Markup::element("br"), Markup::comment("c")]),
        );
        assert_eq!(
            dom.to_html(root),
            r#"<p title="a&quot;b" data-v-1>1 &lt; 2<br><!--c--></p>"#
        );
    }

    #[test]
    fn set_text_content_replaces_children() {
        let dom = MemoryDom::new();
        let root = dom.build(None, &Markup::element("div").child(Markup::element("span")));
        dom.set_text_content(root, "plain");
        assert_eq!(dom.to_html(root), "<div>plain</div>");
    }

    #[test]
    fn dispatch_runs_the_current_listener() {
        let dom = MemoryDom::new();
        let root = dom.create_root("button");
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        dom.add_listener(root, "click", Rc::new(move |_: &Value| counter.set(counter.get() + 1)));
        assert!(dom.dispatch(root, "click", &Value::Null));
        assert!(!dom.dispatch(root, "input", &Value::Null));
        dom.remove_listener(root, "click");
        assert!(!dom.dispatch(root, "click", &Value::Null));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn replaying_the_log_rebuilds_the_tree() {
        let dom = MemoryDom::new();
        let root = dom.create_root("div");
        let span = dom.create_element_ns("http://www.w3.org/2000/svg", "g");
        dom.set_attribute(span, "id", "x");
        dom.append_child(root, span);
        let text = dom.create_text_node("hi");
        dom.insert_before(root, text, Some(span));
        dom.set_text_content(text, "ho");

        let bytes = dom.flush_msgpack().unwrap();
        let copy = MemoryDom::replay(&from_msgpack(&bytes).unwrap());
        assert_eq!(copy.to_html(root), dom.to_html(root));
        assert_eq!(copy.to_html(root), r#"<div>ho<g id="x"></g></div>"#);
    }
}
