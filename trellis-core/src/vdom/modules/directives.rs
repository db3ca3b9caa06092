//! Custom directives.
//!
//! A [`Directive`] is a set of callbacks attached to an element through a
//! [`DirectiveBinding`] in its node data. The directive is looked up by name
//! in the rendering component's options (which include globally registered
//! directives).
//!
//! | callback            | when                                                 |
//! |---------------------|------------------------------------------------------|
//! | `bind`              | the element was created, before it is attached       |
//! | `inserted`          | the element is in its parent tree                    |
//! | `update`            | the containing node was patched, before its children |
//! | `component_updated` | the containing node and its children were patched    |
//! | `unbind`            | the binding went away or the element is destroyed    |

use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::Warning;
use crate::vdom::backend::{Module, NodeId, NodeOps};
use crate::vdom::{DirectiveBinding, VNodeRef};

/// Callbacks of a custom directive. Every callback defaults to a no-op.
pub trait Directive {
    fn bind(&self, _el: NodeId, _binding: &DirectiveBinding, _vnode: &VNodeRef) {}

    fn inserted(&self, _el: NodeId, _binding: &DirectiveBinding, _vnode: &VNodeRef) {}

    fn update(&self, _el: NodeId, _binding: &DirectiveBinding, _vnode: &VNodeRef, _old: &VNodeRef) {}

    fn component_updated(
        &self,
        _el: NodeId,
        _binding: &DirectiveBinding,
        _vnode: &VNodeRef,
        _old: &VNodeRef,
    ) {
    }

    fn unbind(&self, _el: NodeId, _binding: &DirectiveBinding, _vnode: &VNodeRef) {}
}

/// A directive defined by two closures, the common case of "do this on
/// bind and on every update".
pub struct FnDirective {
    bind: Box<dyn Fn(NodeId, &DirectiveBinding)>,
    update: Box<dyn Fn(NodeId, &DirectiveBinding)>,
}

impl FnDirective {
    /// Run `f` on bind and update.
    pub fn new(f: impl Fn(NodeId, &DirectiveBinding) + Clone + 'static) -> Self {
        Self {
            bind: Box::new(f.clone()),
            update: Box::new(f),
        }
    }
}

impl Directive for FnDirective {
    fn bind(&self, el: NodeId, binding: &DirectiveBinding, _vnode: &VNodeRef) {
        (self.bind)(el, binding);
    }

    fn update(&self, el: NodeId, binding: &DirectiveBinding, _vnode: &VNodeRef, _old: &VNodeRef) {
        (self.update)(el, binding);
    }
}

#[derive(Debug, Default)]
pub struct DirectivesModule;

impl Module for DirectivesModule {
    fn name(&self) -> &'static str {
        "directives"
    }

    fn create(&self, _ops: &dyn NodeOps, vnode: &VNodeRef) {
        update_directives(None, Some(vnode));
    }

    fn update(&self, _ops: &dyn NodeOps, old: &VNodeRef, vnode: &VNodeRef) {
        update_directives(Some(old), Some(vnode));
    }

    fn destroy(&self, _ops: &dyn NodeOps, vnode: &VNodeRef) {
        update_directives(Some(vnode), None);
    }
}

type Resolved = IndexMap<String, (DirectiveBinding, Rc<dyn Directive>)>;

/// Resolve the bindings of `vnode` against its context, keyed by raw name.
fn normalize_directives(vnode: &VNodeRef) -> Resolved {
    let mut res = IndexMap::new();
    let Some(data) = vnode.data() else {
        return res;
    };
    if data.directives.is_empty() {
        return res;
    }
    let Some(vm) = vnode.context() else {
        return res;
    };
    for binding in &data.directives {
        match vm.options().resolve_directive(&binding.name) {
            Some(def) => {
                res.insert(binding.raw_name(), (binding.clone(), def));
            }
            None => vm.warn(Warning::UnresolvedDirective(binding.name.clone())),
        }
    }
    res
}

fn update_directives(old: Option<&VNodeRef>, vnode: Option<&VNodeRef>) {
    let has_dirs =
        |node: Option<&VNodeRef>| node.and_then(|n| n.data()).is_some_and(|d| !d.directives.is_empty());
    if !has_dirs(old) && !has_dirs(vnode) {
        return;
    }
    let old_dirs = old.map(normalize_directives).unwrap_or_default();
    let new_dirs = vnode.map(normalize_directives).unwrap_or_default();

    if let Some(vnode) = vnode {
        let Some(el) = vnode.elm() else {
            return;
        };
        let mut with_insert = Vec::new();
        let mut with_postpatch = Vec::new();
        for (key, (binding, def)) in &new_dirs {
            match (old_dirs.get(key), old) {
                (Some((old_binding, _)), Some(old_vnode)) => {
                    let mut binding = binding.clone();
                    binding.old_value = old_binding.value.clone();
                    def.update(el, &binding, vnode, old_vnode);
                    with_postpatch.push((binding, def.clone()));
                }
                _ => {
                    def.bind(el, binding, vnode);
                    with_insert.push((binding.clone(), def.clone()));
                }
            }
        }

        if !with_insert.is_empty() {
            if old.is_none() {
                // Created: wait until the element is attached.
                vnode.push_insert_hook(Rc::new(move |vnode: &VNodeRef| {
                    if let Some(el) = vnode.elm() {
                        for (binding, def) in &with_insert {
                            def.inserted(el, binding, vnode);
                        }
                    }
                }));
            } else {
                for (binding, def) in &with_insert {
                    def.inserted(el, binding, vnode);
                }
            }
        }
        if !with_postpatch.is_empty() {
            vnode.push_postpatch_hook(Rc::new(move |old: &VNodeRef, vnode: &VNodeRef| {
                if let Some(el) = vnode.elm() {
                    for (binding, def) in &with_postpatch {
                        def.component_updated(el, binding, vnode, old);
                    }
                }
            }));
        }
    }

    if let Some(old) = old {
        let Some(el) = old.elm() else {
            return;
        };
        for (key, (binding, def)) in &old_dirs {
            if !new_dirs.contains_key(key) {
                def.unbind(el, binding, old);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn fn_directive_runs_on_bind_and_update() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let directive = FnDirective::new(move |_, binding| sink.borrow_mut().push(binding.value.clone()));
        let vnode = crate::vdom::VNode::leaf("div", None);
        let binding = DirectiveBinding::new("focus", 1);
        directive.bind(NodeId::from_raw(1), &binding, &vnode);
        directive.update(NodeId::from_raw(1), &binding, &vnode, &vnode);
        assert_eq!(seen.borrow().len(), 2);
    }
}
