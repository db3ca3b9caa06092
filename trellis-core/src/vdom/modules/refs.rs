//! `ref` registration on the rendering component.

use crate::component::RefTarget;
use crate::vdom::backend::{Module, NodeOps};
use crate::vdom::VNodeRef;

#[derive(Debug, Default)]
pub struct RefsModule;

impl Module for RefsModule {
    fn name(&self) -> &'static str {
        "ref"
    }

    fn create(&self, _ops: &dyn NodeOps, vnode: &VNodeRef) {
        register_ref(vnode, false);
    }

    fn update(&self, _ops: &dyn NodeOps, old: &VNodeRef, vnode: &VNodeRef) {
        let name = |node: &VNodeRef| node.data().and_then(|data| data.ref_name.clone());
        if name(old) != name(vnode) {
            register_ref(old, true);
            register_ref(vnode, false);
        }
    }

    fn destroy(&self, _ops: &dyn NodeOps, vnode: &VNodeRef) {
        register_ref(vnode, true);
    }
}

/// Add `vnode` to (or remove it from) its context's refs. Component
/// placeholders register the instance, anything else its element.
pub(crate) fn register_ref(vnode: &VNodeRef, remove: bool) {
    let Some(data) = vnode.data() else {
        return;
    };
    let (Some(name), Some(vm)) = (data.ref_name.as_deref(), vnode.context()) else {
        return;
    };
    let target = match (vnode.component_instance(), vnode.elm()) {
        (Some(instance), _) => RefTarget::Component(instance),
        (None, Some(elm)) => RefTarget::Element(elm),
        (None, None) => return,
    };
    if remove {
        vm.remove_ref(name, &target);
    } else {
        vm.add_ref(name, target, data.ref_in_for);
    }
}
