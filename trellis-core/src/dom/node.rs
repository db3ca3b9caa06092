//! Live Nodes
//!
//! This module defines the node records stored by [`super::MemoryDom`] and
//! the [`Markup`] builder used to seed a document with pre-rendered content.

use std::fmt;

use indexmap::IndexMap;

use crate::vdom::{EventHandler, NodeId, NodeKind};

/// A node in the in-memory document.
pub struct Node {
    /// Unique identifier for this node.
    id: NodeId,

    /// Element, text or comment.
    kind: NodeKind,

    /// Tag name for elements.
    tag: Option<String>,

    /// Namespace URI for elements created in a foreign namespace.
    namespace: Option<String>,

    /// Character data for text and comment nodes.
    text: String,

    /// Attributes in the order they were first set.
    attributes: IndexMap<String, String>,

    parent: Option<NodeId>,
    children: Vec<NodeId>,

    /// One handler per event name.
    listeners: IndexMap<String, EventHandler>,
}

impl Node {
    fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            tag: None,
            namespace: None,
            text: String::new(),
            attributes: IndexMap::new(),
            parent: None,
            children: Vec::new(),
            listeners: IndexMap::new(),
        }
    }

    /// Create an element node.
    pub fn element(id: NodeId, tag: &str, namespace: Option<&str>) -> Self {
        Self {
            tag: Some(tag.to_string()),
            namespace: namespace.map(str::to_string),
            ..Self::new(id, NodeKind::Element)
        }
    }

    /// Create a text node.
    pub fn text(id: NodeId, text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::new(id, NodeKind::Text)
        }
    }

    /// Create a comment node.
    pub fn comment(id: NodeId, text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::new(id, NodeKind::Comment)
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn data(&self) -> &str {
        &self.text
    }

    pub(crate) fn set_data(&mut self, text: &str) {
        self.text = text.to_string();
    }

    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    pub(crate) fn attributes_mut(&mut self) -> &mut IndexMap<String, String> {
        &mut self.attributes
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeId> {
        &mut self.children
    }

    pub(crate) fn listener(&self, event: &str) -> Option<EventHandler> {
        self.listeners.get(event).cloned()
    }

    pub(crate) fn listeners_mut(&mut self) -> &mut IndexMap<String, EventHandler> {
        &mut self.listeners
    }

    pub fn has_listener(&self, event: &str) -> bool {
        self.listeners.contains_key(event)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("tag", &self.tag)
            .field("text", &self.text)
            .field("children", &self.children)
            .field("listeners", &self.listeners.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Pre-rendered markup, as a server would send it.
#[derive(Debug, Clone, PartialEq)]
pub enum Markup {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<Markup>,
    },
    Text(String),
    Comment(String),
}

impl Markup {
    pub fn element(tag: impl Into<String>) -> Self {
        Markup::Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Markup::Text(text.into())
    }

    pub fn comment(text: impl Into<String>) -> Self {
        Markup::Comment(text.into())
    }

    /// Add an attribute. No-op on text and comments.
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        if let Markup::Element { attrs, .. } = &mut self {
            attrs.push((name.into(), value.into()));
        }
        self
    }

    /// Append a child. No-op on text and comments.
    pub fn child(mut self, child: Markup) -> Self {
        if let Markup::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }

    pub fn children(self, children: impl IntoIterator<Item = Markup>) -> Self {
        children.into_iter().fold(self, Markup::child)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_nodes_carry_tag_and_namespace() {
        let node = Node::element(NodeId::from_raw(3), "svg", Some("ns"));
        assert_eq!(node.kind(), NodeKind::Element);
        assert_eq!(node.tag(), Some("svg"));
        assert_eq!(node.namespace(), Some("ns"));
        assert!(node.children().is_empty());
    }

    #[test]
    fn markup_builder_ignores_children_on_text() {
        let text = Markup::text("a").child(Markup::text("b")).attr("x", "y");
        assert_eq!(text, Markup::Text("a".into()));

        let el = Markup::element("p").attr("id", "x").children([Markup::text("a")]);
        let Markup::Element { attrs, children, .. } = el else {
            panic!("expected an element");
        };
        assert_eq!(attrs, vec![("id".to_string(), "x".to_string())]);
        assert_eq!(children.len(), 1);
    }
}
