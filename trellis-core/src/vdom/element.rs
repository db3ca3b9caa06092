//! Element Construction
//!
//! [`create_element`] is what render functions call to build nodes. It
//! resolves the tag to a native element, a registered component, or an
//! async component placeholder, normalizes the children into a flat list of
//! nodes, and propagates namespaces into foreign-markup subtrees.

use std::rc::Rc;

use indexmap::IndexMap;

use super::tags::{get_tag_namespace, hyphenate, is_reserved_tag, COMPONENT_TAG_PREFIX};
use super::vnode::{ComponentVNodeOptions, ScopedSlot, VNode, VNodeData, VNodeRef};
use crate::component::{AsyncComponent, AsyncState, Component, ComponentOptions};
use crate::error::Warning;
use crate::reactive::{traverse, Value};

/// What to create.
#[derive(Clone)]
pub enum Tag {
    Name(String),
    Component(Rc<ComponentOptions>),
    Async(AsyncComponent),
    None,
}

impl Tag {
    /// No tag, or an empty name.
    pub fn is_none(&self) -> bool {
        match self {
            Tag::None => true,
            Tag::Name(name) => name.is_empty(),
            Tag::Component(_) | Tag::Async(_) => false,
        }
    }
}

impl From<&str> for Tag {
    fn from(name: &str) -> Self {
        Tag::Name(name.to_string())
    }
}

impl From<String> for Tag {
    fn from(name: String) -> Self {
        Tag::Name(name)
    }
}

impl From<Option<&str>> for Tag {
    fn from(name: Option<&str>) -> Self {
        name.map_or(Tag::None, Tag::from)
    }
}

impl From<Rc<ComponentOptions>> for Tag {
    fn from(options: Rc<ComponentOptions>) -> Self {
        Tag::Component(options)
    }
}

impl From<ComponentOptions> for Tag {
    fn from(options: ComponentOptions) -> Self {
        Tag::Component(Rc::new(options))
    }
}

impl From<AsyncComponent> for Tag {
    fn from(factory: AsyncComponent) -> Self {
        Tag::Async(factory)
    }
}

/// Node data as handed to [`create_element`].
pub enum ElementData {
    None,
    Data(VNodeData),
    /// Data described by a dynamic object, read with
    /// [`VNodeData::from_value`].
    Raw(Value),
}

impl From<()> for ElementData {
    fn from(_: ()) -> Self {
        ElementData::None
    }
}

impl From<VNodeData> for ElementData {
    fn from(data: VNodeData) -> Self {
        ElementData::Data(data)
    }
}

impl From<Option<VNodeData>> for ElementData {
    fn from(data: Option<VNodeData>) -> Self {
        data.map_or(ElementData::None, ElementData::Data)
    }
}

impl From<Value> for ElementData {
    fn from(value: Value) -> Self {
        ElementData::Raw(value)
    }
}

/// Children as handed to [`create_element`], before normalization.
#[derive(Clone)]
pub enum Child {
    Node(VNodeRef),
    Text(String),
    Value(Value),
    List(Vec<Child>),
    /// Default scoped-slot content, rendered by the child component.
    Slot(ScopedSlot),
    Empty,
}

impl Child {
    pub fn slot(f: impl Fn(&Value) -> Vec<VNodeRef> + 'static) -> Self {
        Child::Slot(Rc::new(f))
    }
}

impl From<VNodeRef> for Child {
    fn from(vnode: VNodeRef) -> Self {
        Child::Node(vnode)
    }
}

impl From<&str> for Child {
    fn from(text: &str) -> Self {
        Child::Text(text.to_string())
    }
}

impl From<String> for Child {
    fn from(text: String) -> Self {
        Child::Text(text)
    }
}

impl From<Value> for Child {
    fn from(value: Value) -> Self {
        Child::Value(value)
    }
}

impl From<&Value> for Child {
    fn from(value: &Value) -> Self {
        Child::Value(value.clone())
    }
}

impl From<()> for Child {
    fn from(_: ()) -> Self {
        Child::Empty
    }
}

impl From<Option<VNodeRef>> for Child {
    fn from(vnode: Option<VNodeRef>) -> Self {
        vnode.map_or(Child::Empty, Child::Node)
    }
}

impl<T: Into<Child>> From<Vec<T>> for Child {
    fn from(items: Vec<T>) -> Self {
        Child::List(items.into_iter().map(Into::into).collect())
    }
}

/// How much work children normalization does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Children are already nodes; nested lists are flattened.
    None,
    /// Flatten one level of nesting.
    Simple,
    /// Flatten fully, turn primitives into text nodes and merge adjacent
    /// text.
    Full,
}

/// Create a node in the render context of `context`.
///
/// Returns an empty comment node when there is nothing to create: no tag,
/// or raw data that is itself observed state.
pub fn create_element(
    context: &Component,
    tag: Tag,
    data: ElementData,
    children: Child,
    normalization: Normalization,
) -> VNodeRef {
    let mut data = match data {
        ElementData::None => None,
        ElementData::Data(data) => Some(data),
        ElementData::Raw(value) if value.is_observed() => {
            context.warn(Warning::ObservedVNodeData);
            return VNode::empty();
        }
        ElementData::Raw(Value::Null) => None,
        ElementData::Raw(value) => Some(VNodeData::from_value(&value, |w| context.warn(w))),
    };

    let mut tag = tag;
    if let Some(is) = data.as_mut().and_then(|data| data.is.take()) {
        tag = is;
    }
    if tag.is_none() {
        return VNode::empty();
    }

    // A leading slot function is the default scoped slot, not a child.
    let children = match children {
        Child::Slot(slot) => {
            data.get_or_insert_with(VNodeData::default)
                .scoped_slots
                .insert("default".to_string(), slot);
            Child::Empty
        }
        Child::List(mut items) if matches!(items.first(), Some(Child::Slot(_))) => {
            if let Child::Slot(slot) = items.remove(0) {
                data.get_or_insert_with(VNodeData::default)
                    .scoped_slots
                    .insert("default".to_string(), slot);
            }
            Child::Empty
        }
        children => children,
    };
    let children = normalize_children(children, normalization);

    let context_ns = context.placeholder().and_then(|placeholder| placeholder.ns());
    let (vnode, ns) = match tag {
        Tag::Name(name) => {
            let ns = context_ns.or_else(|| get_tag_namespace(&name).map(str::to_string));
            let pre = data.as_ref().is_some_and(|data| data.pre);
            let ctor = if is_reserved_tag(&name) || pre {
                None
            } else {
                context.options().resolve_component(&name)
            };
            let vnode = match ctor {
                Some(ctor) => create_component(context, ctor, data.take(), children, Some(name), None),
                // Unknown tags are validated at patch time, once slot
                // normalization has had a chance to assign a namespace.
                None => Rc::new(VNode::new_element(
                    name,
                    data.take(),
                    children,
                    Some(context.downgrade()),
                )),
            };
            (vnode, ns)
        }
        Tag::Component(ctor) => (
            create_component(context, ctor, data.take(), children, None, None),
            context_ns,
        ),
        Tag::Async(factory) => (
            create_async(context, factory, data.take(), children),
            context_ns,
        ),
        Tag::None => return VNode::empty(),
    };

    if let Some(ns) = ns {
        apply_ns(&vnode, Some(&ns), false);
    }
    if let Some(data) = vnode.data() {
        register_deep_bindings(context, data);
    }
    vnode
}

/// Build a component placeholder for `ctor`.
fn create_component(
    context: &Component,
    ctor: Rc<ComponentOptions>,
    data: Option<VNodeData>,
    children: Option<Vec<VNodeRef>>,
    tag: Option<String>,
    async_factory: Option<AsyncComponent>,
) -> VNodeRef {
    let ctor = context.app().resolve_options(&ctor);
    let mut data = data.unwrap_or_default();

    let props_data = extract_props(&mut data, &ctor);
    // Component listeners go to the instance; native ones to its root
    // element.
    let listeners = std::mem::take(&mut data.on);
    data.on = std::mem::take(&mut data.native_on);

    if ctor.is_abstract() {
        data = VNodeData {
            slot: data.slot.take(),
            ..VNodeData::default()
        };
    }

    let name = ctor.get_name().map(str::to_string).or_else(|| tag.clone());
    let vnode_tag = match &name {
        Some(name) => format!("{COMPONENT_TAG_PREFIX}{}-{name}", ctor.cid()),
        None => format!("{COMPONENT_TAG_PREFIX}{}", ctor.cid()),
    };
    let options = ComponentVNodeOptions {
        ctor,
        props_data,
        listeners,
        children: children.unwrap_or_default(),
        tag,
    };
    Rc::new(VNode::new_component(
        vnode_tag,
        data,
        Some(context.downgrade()),
        options,
        async_factory,
    ))
}

fn create_async(
    context: &Component,
    factory: AsyncComponent,
    data: Option<VNodeData>,
    children: Option<Vec<VNodeRef>>,
) -> VNodeRef {
    let ctor = match factory.state() {
        AsyncState::Resolved(ctor) => Some(ctor),
        AsyncState::Failed(_) => factory.error_component(),
        AsyncState::Pending => {
            factory.register_owner(context);
            factory.loading_component()
        }
    };
    match ctor {
        Some(ctor) => create_component(context, ctor, data, children, None, Some(factory)),
        None => Rc::new(VNode::new_async_placeholder(
            factory,
            data,
            Some(context.downgrade()),
        )),
    }
}

/// Split declared props out of the node data. Values under `props` are
/// kept in place, values under `attrs` are moved so they do not also
/// render as attributes. Each prop is looked up by its own name first and
/// by its hyphenated form second.
fn extract_props(data: &mut VNodeData, ctor: &ComponentOptions) -> IndexMap<String, Value> {
    let mut res = IndexMap::new();
    for key in ctor.prop_names() {
        let alt = hyphenate(key);
        let found = take_prop(&mut data.props, key, &alt, true)
            .or_else(|| take_prop(&mut data.attrs, key, &alt, false));
        if let Some(value) = found {
            res.insert(key.to_string(), value);
        }
    }
    res
}

fn take_prop(
    map: &mut IndexMap<String, Value>,
    key: &str,
    alt: &str,
    preserve: bool,
) -> Option<Value> {
    for name in [key, alt] {
        if map.contains_key(name) {
            return if preserve {
                map.get(name).cloned()
            } else {
                map.shift_remove(name)
            };
        }
    }
    None
}

/// Flatten and convert children to nodes.
pub(crate) fn normalize_children(
    children: Child,
    normalization: Normalization,
) -> Option<Vec<VNodeRef>> {
    let merge_text = normalization == Normalization::Full;
    match children {
        Child::Empty => None,
        children => {
            let mut out = Vec::new();
            push_child(&mut out, children, merge_text);
            Some(out)
        }
    }
}

fn push_child(out: &mut Vec<VNodeRef>, child: Child, merge_text: bool) {
    match child {
        Child::Empty | Child::Slot(_) => {}
        Child::Node(vnode) => {
            if merge_text && vnode.is_text() {
                push_text(out, vnode.text_content().unwrap_or_default(), Some(vnode.clone()));
            } else {
                out.push(vnode);
            }
        }
        Child::Text(text) => push_text_or_node(out, &text, merge_text),
        Child::Value(value) => match value {
            Value::Null | Value::Bool(_) => {}
            Value::Array(items) => {
                for item in items.to_vec() {
                    push_child(out, Child::Value(item), merge_text);
                }
            }
            other => push_text_or_node(out, &other.to_string(), merge_text),
        },
        Child::List(items) => {
            for item in items {
                push_child(out, item, merge_text);
            }
        }
    }
}

fn push_text_or_node(out: &mut Vec<VNodeRef>, text: &str, merge_text: bool) {
    if merge_text {
        push_text(out, text, None);
    } else {
        out.push(VNode::text(text));
    }
}

/// Append text, merging it into a preceding text node. Empty text that
/// cannot be merged is dropped.
fn push_text(out: &mut Vec<VNodeRef>, text: &str, existing: Option<VNodeRef>) {
    if let Some(last) = out.last() {
        if last.is_text() {
            let merged = format!("{}{}", last.text_content().unwrap_or_default(), text);
            let len = out.len();
            out[len - 1] = VNode::text(merged);
            return;
        }
    }
    if let Some(vnode) = existing {
        out.push(vnode);
    } else if !text.is_empty() {
        out.push(VNode::text(text));
    }
}

/// Stamp `ns` on an element subtree. `foreignObject` switches its children
/// back to HTML, and a forced pass overrides any namespace below it except
/// on nested `svg` roots.
pub(crate) fn apply_ns(vnode: &VNodeRef, ns: Option<&str>, force: bool) {
    *vnode.ns.borrow_mut() = ns.map(str::to_string);
    let (ns, force) = if vnode.tag() == Some("foreignObject") {
        (None, true)
    } else {
        (ns, force)
    };
    for child in vnode.children() {
        if child.tag().is_some() && (child.ns().is_none() || (force && child.tag() != Some("svg"))) {
            apply_ns(&child, ns, force);
        }
    }
}

/// Walk reactive `style` and `class` bindings so slot content re-renders
/// its author when they change.
fn register_deep_bindings(context: &Component, data: &VNodeData) {
    let rt = context.runtime();
    for value in [&data.style, &data.class].into_iter().flatten() {
        if value.is_structured() {
            traverse(rt, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::App;
    use crate::config::Config;
    use crate::dom::MemoryDom;
    use crate::reactive::{observe, Runtime};
    use crate::vdom::tags::SVG_NAMESPACE;
    use std::cell::RefCell;

    fn context() -> (App, Component, Rc<RefCell<Vec<Warning>>>) {
        let rt = Runtime::new(Config::default());
        let warnings = Rc::new(RefCell::new(Vec::new()));
        let sink = warnings.clone();
        rt.set_warn_handler(move |w, _| sink.borrow_mut().push(w.clone()));
        let app = App::new(rt, Rc::new(MemoryDom::new()));
        app.component(
            "TodoItem",
            ComponentOptions::new()
                .name("TodoItem")
                .prop("label", crate::component::PropDef::new())
                .render(|ctx| Ok(ctx.h("li", (), ctx.get("label")).into())),
        );
        let vm = app
            .mount(
                ComponentOptions::new().render(|ctx| Ok(ctx.h("div", (), ()).into())),
                None,
            )
            .unwrap();
        (app, vm, warnings)
    }

    #[test]
    fn full_normalization_merges_text() {
        let (_app, vm, _) = context();
        let vnode = create_element(
            &vm,
            "p".into(),
            ().into(),
            Child::from(vec![
                Child::from("a"),
                Child::Value(Value::from(1)),
                Child::List(vec![Child::from("b"), Child::Value(Value::Null)]),
                Child::Node(VNode::leaf("br", None)),
                Child::from("c"),
            ]),
            Normalization::Full,
        );
        let texts: Vec<_> = vnode
            .children()
            .iter()
            .map(|c| c.text_content().unwrap_or("<el>").to_string())
            .collect();
        assert_eq!(texts, vec!["a1b", "<el>", "c"]);
    }

    #[test]
    fn simple_normalization_keeps_text_nodes_apart() {
        let (_app, vm, _) = context();
        let vnode = create_element(
            &vm,
            "p".into(),
            ().into(),
            Child::from(vec!["a", "b"]),
            Normalization::Simple,
        );
        assert_eq!(vnode.children().len(), 2);
    }

    #[test]
    fn observed_data_is_rejected() {
        let (_app, vm, warnings) = context();
        let data = Value::from_json(serde_json::json!({ "attrs": { "id": "x" } }));
        observe(vm.runtime(), &data);

        let vnode = create_element(&vm, "div".into(), data.into(), ().into(), Normalization::Full);
        assert!(vnode.is_comment());
        assert_eq!(*warnings.borrow(), vec![Warning::ObservedVNodeData]);
    }

    #[test]
    fn registered_tags_become_component_placeholders() {
        let (_app, vm, _) = context();
        let vnode = create_element(
            &vm,
            "todo-item".into(),
            VNodeData::new().attr("label", "milk").attr("title", "t").into(),
            ().into(),
            Normalization::Full,
        );
        assert!(vnode.is_component());
        assert!(vnode.tag().unwrap().starts_with(COMPONENT_TAG_PREFIX));
        assert!(vnode.tag().unwrap().ends_with("-TodoItem"));

        let opts = vnode.component_options().unwrap();
        assert_eq!(opts.props_data().get("label"), Some(&Value::from("milk")));
        let attrs = &vnode.data().unwrap().attrs;
        assert!(!attrs.contains_key("label"));
        assert!(attrs.contains_key("title"));
    }

    #[test]
    fn is_overrides_tag_and_missing_tag_is_empty() {
        let (_app, vm, _) = context();
        let vnode = create_element(
            &vm,
            "div".into(),
            VNodeData::new().is("span").into(),
            ().into(),
            Normalization::Full,
        );
        assert_eq!(vnode.tag(), Some("span"));

        let empty = create_element(&vm, Tag::None, ().into(), ().into(), Normalization::Full);
        assert!(empty.is_comment());
    }

    #[test]
    fn leading_slot_function_becomes_default_scoped_slot() {
        let (_app, vm, _) = context();
        let vnode = create_element(
            &vm,
            "todo-item".into(),
            ().into(),
            Child::List(vec![Child::slot(|_| vec![VNode::text("x")]), Child::from("ignored")]),
            Normalization::Full,
        );
        assert!(vnode.data().unwrap().scoped_slots.contains_key("default"));
        assert!(vnode.component_options().unwrap().children().is_empty());
    }

    #[test]
    fn svg_namespace_stops_at_foreign_object() {
        let (_app, vm, _) = context();
        let inner = VNode::element("div", None, vec![]);
        let foreign = VNode::element("foreignObject", None, vec![inner.clone()]);
        let svg = create_element(
            &vm,
            "svg".into(),
            ().into(),
            Child::Node(foreign.clone()),
            Normalization::Full,
        );
        assert_eq!(svg.ns().as_deref(), Some(SVG_NAMESPACE));
        assert_eq!(foreign.ns().as_deref(), Some(SVG_NAMESPACE));
        assert_eq!(inner.ns(), None);
    }

    #[test]
    fn unresolved_async_component_renders_placeholder() {
        let (_app, vm, _) = context();
        let factory = AsyncComponent::new();
        let vnode = create_element(&vm, factory.clone().into(), ().into(), ().into(), Normalization::Full);
        assert!(vnode.is_comment());
        assert!(vnode.async_factory.as_ref().is_some_and(|f| f.ptr_eq(&factory)));
    }
}
