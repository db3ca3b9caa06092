//! Attributes and DOM properties.

use indexmap::IndexMap;

use crate::reactive::Value;
use crate::vdom::backend::{Module, NodeId, NodeOps};
use crate::vdom::tags::{is_boolean_attr, is_enumerated_attr};
use crate::vdom::VNodeRef;

/// Keeps `data.attrs` in sync with element attributes.
#[derive(Debug, Default)]
pub struct AttrsModule;

impl Module for AttrsModule {
    fn name(&self) -> &'static str {
        "attrs"
    }

    fn create(&self, ops: &dyn NodeOps, vnode: &VNodeRef) {
        update_attrs(ops, None, vnode);
    }

    fn update(&self, ops: &dyn NodeOps, old: &VNodeRef, vnode: &VNodeRef) {
        update_attrs(ops, Some(old), vnode);
    }
}

fn update_attrs(ops: &dyn NodeOps, old: Option<&VNodeRef>, vnode: &VNodeRef) {
    let empty = IndexMap::new();
    let old_attrs = old.and_then(|old| old.data()).map_or(&empty, |data| &data.attrs);
    let attrs = vnode.data().map_or(&empty, |data| &data.attrs);
    if old_attrs.is_empty() && attrs.is_empty() {
        return;
    }
    let Some(elm) = vnode.elm() else {
        return;
    };
    let tag = vnode.tag().unwrap_or_default();

    for (key, value) in attrs {
        if old_attrs.get(key) != Some(value) {
            set_attr(ops, elm, tag, key, value);
        }
    }
    for key in old_attrs.keys() {
        if !attrs.contains_key(key) {
            ops.remove_attribute(elm, key);
        }
    }
}

/// `null` and `false` mean "no attribute".
fn is_falsy_attr_value(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Bool(false))
}

pub(crate) fn set_attr(ops: &dyn NodeOps, elm: NodeId, tag: &str, key: &str, value: &Value) {
    if is_boolean_attr(key) {
        if is_falsy_attr_value(value) {
            ops.remove_attribute(elm, key);
        } else {
            // <embed allowfullscreen> only accepts the literal "true".
            let value = if key == "allowfullscreen" && tag.eq_ignore_ascii_case("embed") {
                "true"
            } else {
                key
            };
            ops.set_attribute(elm, key, value);
        }
    } else if is_enumerated_attr(key) {
        let value = if is_falsy_attr_value(value) || value.as_str() == Some("false") {
            "false"
        } else if key == "contenteditable"
            && matches!(value.as_str(), Some("events" | "caret" | "typing"))
        {
            value.as_str().unwrap_or("true")
        } else {
            "true"
        };
        ops.set_attribute(elm, key, value);
    } else if is_falsy_attr_value(value) {
        ops.remove_attribute(elm, key);
    } else {
        ops.set_attribute(elm, key, &value.to_string());
    }
}

/// Keeps `data.dom_props` in sync. `textContent` and `innerHTML` replace
/// the element's content; every other property is reflected as an
/// attribute, which is all a backend without live properties can offer.
#[derive(Debug, Default)]
pub struct DomPropsModule;

impl Module for DomPropsModule {
    fn name(&self) -> &'static str {
        "dom-props"
    }

    fn create(&self, ops: &dyn NodeOps, vnode: &VNodeRef) {
        update_dom_props(ops, None, vnode);
    }

    fn update(&self, ops: &dyn NodeOps, old: &VNodeRef, vnode: &VNodeRef) {
        update_dom_props(ops, Some(old), vnode);
    }
}

fn update_dom_props(ops: &dyn NodeOps, old: Option<&VNodeRef>, vnode: &VNodeRef) {
    let empty = IndexMap::new();
    let old_props = old.and_then(|old| old.data()).map_or(&empty, |data| &data.dom_props);
    let props = vnode.data().map_or(&empty, |data| &data.dom_props);
    if old_props.is_empty() && props.is_empty() {
        return;
    }
    let Some(elm) = vnode.elm() else {
        return;
    };

    for key in old_props.keys() {
        if !props.contains_key(key) && !is_content_prop(key) {
            ops.remove_attribute(elm, key);
        }
    }
    for (key, value) in props {
        if is_content_prop(key) {
            // Content props own the children; compare against the live
            // node so a re-render after user edits still writes.
            let text = value.to_string();
            let live = ops.first_child(elm).and_then(|child| ops.text(child));
            if live.as_deref() != Some(text.as_str()) {
                ops.set_text_content(elm, &text);
            }
        } else if old_props.get(key) != Some(value) || ops.get_attribute(elm, key).is_none() {
            if value.is_null() {
                ops.remove_attribute(elm, key);
            } else {
                ops.set_attribute(elm, key, &value.to_string());
            }
        }
    }
}

fn is_content_prop(key: &str) -> bool {
    matches!(key, "textContent" | "innerHTML")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::vdom::{VNode, VNodeData};

    fn mounted(dom: &MemoryDom, data: VNodeData) -> VNodeRef {
        let vnode = VNode::leaf("input", Some(data));
        vnode.elm.set(Some(dom.create_element("input", &vnode)));
        vnode
    }

    #[test]
    fn boolean_and_enumerated_attrs_normalize() {
        let dom = MemoryDom::new();
        let vnode = mounted(
            &dom,
            VNodeData::new()
                .attr("disabled", true)
                .attr("draggable", "")
                .attr("spellcheck", false)
                .attr("hidden", false)
                .attr("id", "name"),
        );
        AttrsModule.create(&dom, &vnode);
        let elm = vnode.elm().unwrap();
        assert_eq!(dom.attribute(elm, "disabled").as_deref(), Some("disabled"));
        assert_eq!(dom.attribute(elm, "draggable").as_deref(), Some("true"));
        assert_eq!(dom.attribute(elm, "spellcheck").as_deref(), Some("false"));
        assert_eq!(dom.attribute(elm, "hidden"), None);
        assert_eq!(dom.attribute(elm, "id").as_deref(), Some("name"));
    }

    #[test]
    fn stale_attrs_are_removed() {
        let dom = MemoryDom::new();
        let old = mounted(&dom, VNodeData::new().attr("id", "a").attr("title", "t"));
        AttrsModule.create(&dom, &old);

        let new = VNode::leaf("input", Some(VNodeData::new().attr("id", "b")));
        new.elm.set(old.elm());
        AttrsModule.update(&dom, &old, &new);

        let elm = new.elm().unwrap();
        assert_eq!(dom.attribute(elm, "id").as_deref(), Some("b"));
        assert_eq!(dom.attribute(elm, "title"), None);
    }

    #[test]
    fn text_content_prop_replaces_children() {
        let dom = MemoryDom::new();
        let vnode = VNode::leaf("p", Some(VNodeData::new().dom_prop("textContent", "hi")));
        vnode.elm.set(Some(dom.create_element("p", &vnode)));
        DomPropsModule.create(&dom, &vnode);
        assert_eq!(dom.to_html(vnode.elm().unwrap()), "<p>hi</p>");
    }
}
