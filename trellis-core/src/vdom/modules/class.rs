//! Class and style bindings.
//!
//! Both are rendered from the whole chain a live element belongs to: the
//! node itself, the roots of any child components it hosts, and the
//! placeholders of any parent components it is the root of. Classes
//! concatenate; styles merge with the outermost declaration winning.

use indexmap::IndexMap;

use crate::reactive::Value;
use crate::vdom::backend::{Module, NodeOps};
use crate::vdom::tags::hyphenate;
use crate::vdom::{VNodeData, VNodeRef};

#[derive(Debug, Default)]
pub struct ClassModule;

impl Module for ClassModule {
    fn name(&self) -> &'static str {
        "class"
    }

    fn create(&self, ops: &dyn NodeOps, vnode: &VNodeRef) {
        update_class(ops, None, vnode);
    }

    fn update(&self, ops: &dyn NodeOps, old: &VNodeRef, vnode: &VNodeRef) {
        update_class(ops, Some(old), vnode);
    }
}

fn has_class(data: Option<&VNodeData>) -> bool {
    data.is_some_and(|data| data.static_class.is_some() || data.class.is_some())
}

fn update_class(ops: &dyn NodeOps, old: Option<&VNodeRef>, vnode: &VNodeRef) {
    if !has_class(vnode.data()) && !has_class(old.and_then(|old| old.data())) {
        return;
    }
    let Some(elm) = vnode.elm() else {
        return;
    };
    let class = gen_class_for_vnode(vnode);
    if ops.get_attribute(elm, "class").as_deref() != Some(class.as_str()) {
        if class.is_empty() {
            ops.remove_attribute(elm, "class");
        } else {
            ops.set_attribute(elm, "class", &class);
        }
    }
}

/// Data of every node sharing `vnode`'s element, innermost first.
fn data_chain(vnode: &VNodeRef) -> Vec<VNodeData> {
    let mut inner = Vec::new();
    let mut child = vnode.clone();
    while let Some(root) = child.component_instance().and_then(|vm| vm.vnode()) {
        if let Some(data) = root.data() {
            inner.push(data.clone());
        }
        child = root;
    }
    inner.reverse();

    let mut chain = inner;
    if let Some(data) = vnode.data() {
        chain.push(data.clone());
    }
    let mut parent = vnode.parent_placeholder();
    while let Some(node) = parent {
        if let Some(data) = node.data() {
            chain.push(data.clone());
        }
        parent = node.parent_placeholder();
    }
    chain
}

/// The class attribute for `vnode`: static classes first, then dynamic
/// ones.
pub fn gen_class_for_vnode(vnode: &VNodeRef) -> String {
    let chain = data_chain(vnode);
    let statics = chain.iter().filter_map(|data| data.static_class.clone());
    let dynamics = chain
        .iter()
        .filter_map(|data| data.class.as_ref().map(stringify_class));
    let mut out = String::new();
    for class in statics.chain(dynamics) {
        concat(&mut out, &class);
    }
    out
}

fn concat(out: &mut String, class: &str) {
    if class.is_empty() {
        return;
    }
    if !out.is_empty() {
        out.push(' ');
    }
    out.push_str(class);
}

/// Strings pass through, arrays join their items, objects list their
/// truthy keys.
pub fn stringify_class(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_string(),
        Value::Array(items) => {
            let mut out = String::new();
            for item in items.to_vec() {
                concat(&mut out, &stringify_class(&item));
            }
            out
        }
        Value::Object(obj) => {
            let mut out = String::new();
            for (key, value) in obj.entries() {
                if value.is_truthy() {
                    concat(&mut out, &key);
                }
            }
            out
        }
        _ => String::new(),
    }
}

#[derive(Debug, Default)]
pub struct StyleModule;

impl Module for StyleModule {
    fn name(&self) -> &'static str {
        "style"
    }

    fn create(&self, ops: &dyn NodeOps, vnode: &VNodeRef) {
        update_style(ops, None, vnode);
    }

    fn update(&self, ops: &dyn NodeOps, old: &VNodeRef, vnode: &VNodeRef) {
        update_style(ops, Some(old), vnode);
    }
}

fn has_style(data: Option<&VNodeData>) -> bool {
    data.is_some_and(|data| data.style.is_some())
}

fn update_style(ops: &dyn NodeOps, old: Option<&VNodeRef>, vnode: &VNodeRef) {
    if !has_style(vnode.data()) && !has_style(old.and_then(|old| old.data())) {
        return;
    }
    let Some(elm) = vnode.elm() else {
        return;
    };
    let style = render_style(&get_style(vnode));
    let current = ops.get_attribute(elm, "style");
    if style.is_empty() {
        if current.is_some() {
            ops.remove_attribute(elm, "style");
        }
    } else if current.as_deref() != Some(style.as_str()) {
        ops.set_attribute(elm, "style", &style);
    }
}

/// Merged declarations for `vnode`, outer bindings overriding inner ones.
pub fn get_style(vnode: &VNodeRef) -> IndexMap<String, String> {
    let mut merged = IndexMap::new();
    for data in data_chain(vnode) {
        if let Some(style) = &data.style {
            normalize_style(style, &mut merged);
        }
    }
    merged
}

/// Fold a style binding into `out`. Objects map properties to values,
/// arrays merge their items in order, strings are parsed as
/// `prop: value; ...` declarations.
fn normalize_style(value: &Value, out: &mut IndexMap<String, String>) {
    match value {
        Value::Object(obj) => {
            for (key, value) in obj.entries() {
                let name = if key.starts_with("--") { key } else { hyphenate(&key) };
                if value.is_null() || value.as_str() == Some("") {
                    out.shift_remove(&name);
                } else {
                    out.insert(name, value.to_string());
                }
            }
        }
        Value::Array(items) => {
            for item in items.to_vec() {
                normalize_style(&item, out);
            }
        }
        Value::String(text) => {
            for declaration in text.split(';') {
                if let Some((name, value)) = declaration.split_once(':') {
                    out.insert(name.trim().to_string(), value.trim().to_string());
                }
            }
        }
        _ => {}
    }
}

fn render_style(style: &IndexMap<String, String>) -> String {
    style
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::vdom::VNode;
    use serde_json::json;

    #[test]
    fn class_values_stringify() {
        let value = Value::from_json(json!(["a", { "b": true, "c": false }, ["d"]]));
        assert_eq!(stringify_class(&value), "a b d");
    }

    #[test]
    fn static_classes_come_first() {
        let vnode = VNode::leaf(
            "div",
            Some(VNodeData::new().static_class("box").class(Value::from_json(json!({ "on": true })))),
        );
        assert_eq!(gen_class_for_vnode(&vnode), "box on");
    }

    #[test]
    fn style_objects_hyphenate_and_strings_parse() {
        let dom = MemoryDom::new();
        let vnode = VNode::leaf(
            "div",
            Some(VNodeData::new().style(Value::from_json(json!([
                { "fontSize": "12px", "color": "red" },
                "color: blue; margin: 0"
            ])))),
        );
        vnode.elm.set(Some(dom.create_element("div", &vnode)));
        StyleModule.create(&dom, &vnode);
        assert_eq!(
            dom.attribute(vnode.elm().unwrap(), "style").as_deref(),
            Some("font-size:12px;color:blue;margin:0")
        );
    }
}
