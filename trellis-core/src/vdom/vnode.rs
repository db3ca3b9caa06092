//! Virtual Nodes
//!
//! A [`VNode`] describes one node of a rendered tree: an element, a text
//! node, a comment, or a placeholder for a child component. Render functions
//! produce a fresh tree on every run; the patcher compares it against the
//! previous one and records the live node it touched in [`VNode::elm`].
//!
//! Trees are shared through [`VNodeRef`] (`Rc<VNode>`). The fields the
//! patcher fills in after creation (`elm`, `ns`, the component instance,
//! hook lists) use interior mutability, everything else is fixed at
//! construction.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;

use super::backend::NodeId;
use crate::component::{AsyncComponent, Component, ComponentOptions, WeakComponent};
use crate::error::Warning;
use crate::reactive::{format_number, Value};

pub type VNodeRef = Rc<VNode>;

/// A DOM event listener.
pub type EventHandler = Rc<dyn Fn(&Value)>;

/// A slot rendered by the child with props supplied by the child.
pub type ScopedSlot = Rc<dyn Fn(&Value) -> Vec<VNodeRef>>;

pub(crate) type InsertHook = Rc<dyn Fn(&VNodeRef)>;
pub(crate) type PostpatchHook = Rc<dyn Fn(&VNodeRef, &VNodeRef)>;

/// A sibling key. Only strings and numbers make valid keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Str(Rc<str>),
    Num(i64),
}

impl Key {
    /// Convert a primitive value into a key. Structured values and `null`
    /// are not keys.
    pub fn from_value(value: &Value) -> Option<Key> {
        match value {
            Value::String(s) => Some(Key::Str(s.clone())),
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(Key::Num(*n as i64)),
            Value::Number(n) => Some(Key::Str(format_number(*n).into())),
            Value::Bool(b) => Some(Key::Str(b.to_string().into())),
            Value::Null | Value::Object(_) | Value::Array(_) => None,
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Str(s) => f.write_str(s),
            Key::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.into())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s.into())
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Num(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Num(n.into())
    }
}

impl From<usize> for Key {
    fn from(n: usize) -> Self {
        Key::Num(n as i64)
    }
}

/// One directive applied to an element, as written in the render function.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveBinding {
    pub name: String,
    pub value: Value,
    pub old_value: Value,
    pub arg: Option<String>,
    pub modifiers: Vec<String>,
}

impl DirectiveBinding {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            old_value: Value::Null,
            arg: None,
            modifiers: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.arg = Some(arg.into());
        self
    }

    pub fn modifier(mut self, modifier: impl Into<String>) -> Self {
        self.modifiers.push(modifier.into());
        self
    }

    /// Identity of the binding across renders: name plus modifiers.
    pub fn raw_name(&self) -> String {
        let mut raw = self.name.clone();
        for modifier in &self.modifiers {
            raw.push('.');
            raw.push_str(modifier);
        }
        raw
    }
}

/// Everything a render function can attach to a node besides its tag and
/// children.
#[derive(Clone, Default)]
pub struct VNodeData {
    pub key: Option<Key>,
    pub slot: Option<String>,
    pub ref_name: Option<String>,
    pub ref_in_for: bool,
    pub is: Option<super::element::Tag>,
    pub pre: bool,
    pub static_class: Option<String>,
    pub class: Option<Value>,
    pub style: Option<Value>,
    pub props: IndexMap<String, Value>,
    pub attrs: IndexMap<String, Value>,
    pub dom_props: IndexMap<String, Value>,
    pub on: IndexMap<String, EventHandler>,
    pub native_on: IndexMap<String, EventHandler>,
    pub directives: Vec<DirectiveBinding>,
    pub scoped_slots: IndexMap<String, ScopedSlot>,
    pub transition: Option<Value>,
    pub keep_alive: Cell<bool>,
}

impl VNodeData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn dom_prop(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.dom_props.insert(name.into(), value.into());
        self
    }

    pub fn class(mut self, class: impl Into<Value>) -> Self {
        self.class = Some(class.into());
        self
    }

    pub fn static_class(mut self, class: impl Into<String>) -> Self {
        self.static_class = Some(class.into());
        self
    }

    pub fn style(mut self, style: impl Into<Value>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn on(mut self, event: impl Into<String>, handler: impl Fn(&Value) + 'static) -> Self {
        self.on.insert(event.into(), Rc::new(handler));
        self
    }

    /// Attach an existing handler, keeping its identity across renders.
    pub fn on_handler(mut self, event: impl Into<String>, handler: EventHandler) -> Self {
        self.on.insert(event.into(), handler);
        self
    }

    pub fn native_on(mut self, event: impl Into<String>, handler: impl Fn(&Value) + 'static) -> Self {
        self.native_on.insert(event.into(), Rc::new(handler));
        self
    }

    pub fn directive(mut self, binding: DirectiveBinding) -> Self {
        self.directives.push(binding);
        self
    }

    pub fn ref_name(mut self, name: impl Into<String>) -> Self {
        self.ref_name = Some(name.into());
        self
    }

    pub fn ref_in_for(mut self, in_for: bool) -> Self {
        self.ref_in_for = in_for;
        self
    }

    pub fn slot(mut self, name: impl Into<String>) -> Self {
        self.slot = Some(name.into());
        self
    }

    pub fn is(mut self, tag: impl Into<super::element::Tag>) -> Self {
        self.is = Some(tag.into());
        self
    }

    pub fn pre(mut self, pre: bool) -> Self {
        self.pre = pre;
        self
    }

    pub fn scoped_slot(
        mut self,
        name: impl Into<String>,
        slot: impl Fn(&Value) -> Vec<VNodeRef> + 'static,
    ) -> Self {
        self.scoped_slots.insert(name.into(), Rc::new(slot));
        self
    }

    pub fn transition(mut self, transition: impl Into<Value>) -> Self {
        self.transition = Some(transition.into());
        self
    }

    /// Read node data from a dynamic object. Unknown keys are ignored; a
    /// non-primitive `key` is dropped with a warning.
    pub fn from_value(value: &Value, mut warn: impl FnMut(Warning)) -> Self {
        let mut data = VNodeData::default();
        let Some(obj) = value.as_object() else {
            return data;
        };
        let map = |key: &str| -> IndexMap<String, Value> {
            obj.get_untracked(key)
                .as_object()
                .map(|o| o.entries_untracked().into_iter().collect())
                .unwrap_or_default()
        };

        let key = obj.get_untracked("key");
        if !key.is_null() {
            match Key::from_value(&key) {
                Some(key) => data.key = Some(key),
                None => warn(Warning::NonPrimitiveKey),
            }
        }
        data.slot = obj.get_untracked("slot").as_str().map(str::to_string);
        data.ref_name = obj.get_untracked("ref").as_str().map(str::to_string);
        data.ref_in_for = obj.get_untracked("refInFor").is_truthy();
        data.static_class = obj.get_untracked("staticClass").as_str().map(str::to_string);
        data.pre = obj.get_untracked("pre").is_truthy();
        let class = obj.get_untracked("class");
        data.class = (!class.is_null()).then_some(class);
        let style = obj.get_untracked("style");
        data.style = (!style.is_null()).then_some(style);
        if let Some(is) = obj.get_untracked("is").as_str() {
            data.is = Some(super::element::Tag::Name(is.to_string()));
        }
        data.attrs = map("attrs");
        data.props = map("props");
        data.dom_props = map("domProps");
        data
    }
}

/// What a component placeholder carries for the child it stands for.
#[derive(Clone)]
pub struct ComponentVNodeOptions {
    pub(crate) ctor: Rc<ComponentOptions>,
    pub(crate) props_data: IndexMap<String, Value>,
    pub(crate) listeners: IndexMap<String, EventHandler>,
    pub(crate) children: Vec<VNodeRef>,
    pub(crate) tag: Option<String>,
}

impl ComponentVNodeOptions {
    pub fn ctor(&self) -> &Rc<ComponentOptions> {
        &self.ctor
    }

    pub fn props_data(&self) -> &IndexMap<String, Value> {
        &self.props_data
    }

    pub fn children(&self) -> &[VNodeRef] {
        &self.children
    }
}

/// A node of the virtual tree.
pub struct VNode {
    pub(crate) tag: Option<String>,
    pub(crate) data: Option<VNodeData>,
    pub(crate) children: RefCell<Option<Vec<VNodeRef>>>,
    pub(crate) text: Option<String>,
    pub(crate) elm: Cell<Option<NodeId>>,
    pub(crate) ns: RefCell<Option<String>>,
    pub(crate) context: Option<WeakComponent>,
    pub(crate) key: Option<Key>,
    pub(crate) component_options: Option<ComponentVNodeOptions>,
    pub(crate) component_instance: RefCell<Option<Component>>,
    /// The component placeholder this node is the rendered root of.
    pub(crate) parent: RefCell<Option<Weak<VNode>>>,
    pub(crate) is_static: Cell<bool>,
    pub(crate) is_root_insert: Cell<bool>,
    pub(crate) is_comment: bool,
    pub(crate) is_cloned: bool,
    pub(crate) is_once: Cell<bool>,
    pub(crate) async_factory: Option<AsyncComponent>,
    pub(crate) is_async_placeholder: Cell<bool>,
    pub(crate) pending_insert: RefCell<Vec<VNodeRef>>,
    pub(crate) insert_hooks: RefCell<Vec<InsertHook>>,
    pub(crate) postpatch_hooks: RefCell<Vec<PostpatchHook>>,
}

impl VNode {
    fn blank() -> Self {
        Self {
            tag: None,
            data: None,
            children: RefCell::new(None),
            text: None,
            elm: Cell::new(None),
            ns: RefCell::new(None),
            context: None,
            key: None,
            component_options: None,
            component_instance: RefCell::new(None),
            parent: RefCell::new(None),
            is_static: Cell::new(false),
            is_root_insert: Cell::new(true),
            is_comment: false,
            is_cloned: false,
            is_once: Cell::new(false),
            async_factory: None,
            is_async_placeholder: Cell::new(false),
            pending_insert: RefCell::new(Vec::new()),
            insert_hooks: RefCell::new(Vec::new()),
            postpatch_hooks: RefCell::new(Vec::new()),
        }
    }

    /// An element with a child list.
    pub fn element(
        tag: impl Into<String>,
        data: Option<VNodeData>,
        children: Vec<VNodeRef>,
    ) -> VNodeRef {
        Rc::new(Self::new_element(tag.into(), data, Some(children), None))
    }

    /// An element without a child list.
    pub fn leaf(tag: impl Into<String>, data: Option<VNodeData>) -> VNodeRef {
        Rc::new(Self::new_element(tag.into(), data, None, None))
    }

    pub fn text(text: impl Into<String>) -> VNodeRef {
        Rc::new(Self::new_text(text.into()))
    }

    pub fn comment(text: impl Into<String>) -> VNodeRef {
        Rc::new(Self::new_comment(text.into()))
    }

    /// An empty comment, rendered where nothing should appear.
    pub fn empty() -> VNodeRef {
        Self::comment("")
    }

    pub(crate) fn new_element(
        tag: String,
        data: Option<VNodeData>,
        children: Option<Vec<VNodeRef>>,
        context: Option<WeakComponent>,
    ) -> Self {
        Self {
            key: data.as_ref().and_then(|data| data.key.clone()),
            tag: Some(tag),
            data,
            children: RefCell::new(children),
            context,
            ..Self::blank()
        }
    }

    pub(crate) fn new_text(text: String) -> Self {
        Self {
            text: Some(text),
            ..Self::blank()
        }
    }

    pub(crate) fn new_comment(text: String) -> Self {
        Self {
            text: Some(text),
            is_comment: true,
            ..Self::blank()
        }
    }

    pub(crate) fn new_component(
        tag: String,
        data: VNodeData,
        context: Option<WeakComponent>,
        options: ComponentVNodeOptions,
        async_factory: Option<AsyncComponent>,
    ) -> Self {
        Self {
            key: data.key.clone(),
            tag: Some(tag),
            data: Some(data),
            context,
            component_options: Some(options),
            async_factory,
            ..Self::blank()
        }
    }

    /// The comment node rendered while an async component is pending.
    pub(crate) fn new_async_placeholder(
        factory: AsyncComponent,
        data: Option<VNodeData>,
        context: Option<WeakComponent>,
    ) -> Self {
        Self {
            key: data.as_ref().and_then(|data| data.key.clone()),
            text: Some(String::new()),
            is_comment: true,
            data,
            context,
            async_factory: Some(factory),
            ..Self::blank()
        }
    }

    /// Shallow copy used when a node that is already mounted somewhere has to
    /// be mounted again. The copy shares data and children with the original.
    pub fn clone_vnode(&self) -> VNode {
        Self {
            tag: self.tag.clone(),
            data: self.data.clone(),
            children: RefCell::new(self.children.borrow().clone()),
            text: self.text.clone(),
            elm: Cell::new(self.elm.get()),
            ns: RefCell::new(self.ns.borrow().clone()),
            context: self.context.clone(),
            key: self.key.clone(),
            component_options: self.component_options.clone(),
            is_static: Cell::new(self.is_static.get()),
            is_comment: self.is_comment,
            is_cloned: true,
            async_factory: self.async_factory.clone(),
            ..Self::blank()
        }
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn data(&self) -> Option<&VNodeData> {
        self.data.as_ref()
    }

    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn text_content(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// The live node this vnode was last patched onto.
    pub fn elm(&self) -> Option<NodeId> {
        self.elm.get()
    }

    pub fn ns(&self) -> Option<String> {
        self.ns.borrow().clone()
    }

    /// The child list, or an empty list when the node has none.
    pub fn children(&self) -> Vec<VNodeRef> {
        self.children.borrow().clone().unwrap_or_default()
    }

    pub(crate) fn child_list(&self) -> Option<Vec<VNodeRef>> {
        self.children.borrow().clone()
    }

    pub fn has_child_list(&self) -> bool {
        self.children.borrow().is_some()
    }

    pub fn is_comment(&self) -> bool {
        self.is_comment
    }

    pub fn is_text(&self) -> bool {
        self.tag.is_none() && !self.is_comment
    }

    pub fn is_component(&self) -> bool {
        self.component_options.is_some()
    }

    pub fn is_static(&self) -> bool {
        self.is_static.get()
    }

    pub fn is_cloned(&self) -> bool {
        self.is_cloned
    }

    pub fn is_async_placeholder(&self) -> bool {
        self.is_async_placeholder.get()
    }

    pub fn component_options(&self) -> Option<&ComponentVNodeOptions> {
        self.component_options.as_ref()
    }

    pub fn component_instance(&self) -> Option<Component> {
        self.component_instance.borrow().clone()
    }

    /// The component whose render function produced this node.
    pub fn context(&self) -> Option<Component> {
        self.context.as_ref().and_then(WeakComponent::upgrade)
    }

    /// The component placeholder this node is the root of.
    pub fn parent_placeholder(&self) -> Option<VNodeRef> {
        self.parent.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn is_keep_alive(&self) -> bool {
        self.data
            .as_ref()
            .map(|data| data.keep_alive.get())
            .unwrap_or(false)
    }

    pub(crate) fn set_parent(&self, parent: Option<&VNodeRef>) {
        *self.parent.borrow_mut() = parent.map(Rc::downgrade);
    }

    pub(crate) fn set_component_instance(&self, instance: Option<Component>) {
        *self.component_instance.borrow_mut() = instance;
    }

    pub(crate) fn replace_child(&self, index: usize, child: VNodeRef) {
        if let Some(children) = self.children.borrow_mut().as_mut() {
            if index < children.len() {
                children[index] = child;
            }
        }
    }

    pub(crate) fn push_insert_hook(&self, hook: InsertHook) {
        self.insert_hooks.borrow_mut().push(hook);
    }

    pub(crate) fn push_postpatch_hook(&self, hook: PostpatchHook) {
        self.postpatch_hooks.borrow_mut().push(hook);
    }

    /// Run the hooks merged into this node's insert slot (directive
    /// `inserted` callbacks), not the component's own insert handling.
    pub(crate) fn run_insert_hooks(self: &Rc<Self>) {
        let hooks = self.insert_hooks.borrow().clone();
        for hook in hooks {
            hook(self);
        }
    }

    pub(crate) fn run_postpatch_hooks(self: &Rc<Self>, old: &VNodeRef) {
        let hooks = self.postpatch_hooks.borrow().clone();
        for hook in hooks {
            hook(old, self);
        }
    }

    pub(crate) fn has_insert_hooks(&self) -> bool {
        !self.insert_hooks.borrow().is_empty()
    }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("VNode");
        if let Some(tag) = &self.tag {
            s.field("tag", tag);
        }
        if let Some(key) = &self.key {
            s.field("key", key);
        }
        if let Some(text) = &self.text {
            s.field("text", text);
        }
        if let Some(children) = self.children.borrow().as_ref() {
            s.field("children", children);
        }
        s.field("elm", &self.elm.get()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_come_from_primitives_only() {
        assert_eq!(Key::from_value(&Value::from(3)), Some(Key::Num(3)));
        assert_eq!(Key::from_value(&Value::from("a")), Some(Key::from("a")));
        assert_eq!(Key::from_value(&Value::array([])), None);
        assert_eq!(Key::from_value(&Value::Null), None);
    }

    #[test]
    fn element_takes_key_from_data() {
        let vnode = VNode::element("li", Some(VNodeData::new().key("x")), vec![VNode::text("x")]);
        assert_eq!(vnode.key(), Some(&Key::from("x")));
        assert_eq!(vnode.children().len(), 1);
        assert!(vnode.children()[0].is_text());
    }

    #[test]
    fn clone_shares_children_and_marks_cloned() {
        let child = VNode::text("a");
        let vnode = VNode::element("p", None, vec![child.clone()]);
        vnode.elm.set(Some(NodeId::from_raw(4)));

        let copy = vnode.clone_vnode();
        assert!(copy.is_cloned());
        assert_eq!(copy.elm(), Some(NodeId::from_raw(4)));
        assert!(Rc::ptr_eq(&copy.children()[0], &child));
    }

    #[test]
    fn data_from_value_warns_on_object_key() {
        let raw = Value::from_json(serde_json::json!({
            "key": { "nested": true },
            "attrs": { "id": "main" },
            "staticClass": "box"
        }));
        let mut warnings = Vec::new();
        let data = VNodeData::from_value(&raw, |w| warnings.push(w));

        assert_eq!(warnings, vec![Warning::NonPrimitiveKey]);
        assert!(data.key.is_none());
        assert_eq!(data.attrs.get("id"), Some(&Value::from("main")));
        assert_eq!(data.static_class.as_deref(), Some("box"));
    }

    #[test]
    fn directive_raw_name_includes_modifiers() {
        let binding = DirectiveBinding::new("focus", true).modifier("lazy").modifier("once");
        assert_eq!(binding.raw_name(), "focus.lazy.once");
    }
}
