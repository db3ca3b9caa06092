//! Component placeholder hooks.
//!
//! The patcher calls these at the points where a placeholder node is
//! created, re-patched, inserted and destroyed. They connect the node tree
//! to the instance tree.

use crate::vdom::{Patcher, VNodeRef};

use super::{Component, Hook};

/// Create and mount the instance for a placeholder, or re-use the cached
/// instance of a kept-alive one.
pub(crate) fn init(patcher: &Patcher, vnode: &VNodeRef, hydrating: bool) {
    if let Some(child) = vnode.component_instance() {
        if !child.is_destroyed() && vnode.is_keep_alive() {
            prepatch(vnode, vnode);
            return;
        }
    }
    let Some(opts) = vnode.component_options() else {
        return;
    };
    let Some(parent) = patcher.active_instance().or_else(|| vnode.context()) else {
        return;
    };

    let app = parent.app().clone();
    let child = Component::create(&app, opts.ctor.clone(), Some(&parent), Some(vnode.clone()));
    vnode.set_component_instance(Some(child.clone()));
    let el = if hydrating { vnode.elm() } else { None };
    if let Err(err) = child.mount(el, hydrating) {
        child.report_error(&err, "mount");
    }
}

/// Hand the instance from the old placeholder to the new one and push the
/// new props, listeners and slot content into it.
pub(crate) fn prepatch(old: &VNodeRef, vnode: &VNodeRef) {
    let (Some(opts), Some(child)) = (vnode.component_options(), old.component_instance()) else {
        return;
    };
    vnode.set_component_instance(Some(child.clone()));
    update_child_component(&child, vnode, opts.children.clone());
}

pub(crate) fn insert(vnode: &VNodeRef) {
    let Some(child) = vnode.component_instance() else {
        return;
    };
    if !child.is_mounted() {
        child.set_mounted();
        child.call_hook(Hook::Mounted);
    }
    if vnode.is_keep_alive() {
        let context_mounted = vnode.context().is_some_and(|ctx| ctx.is_mounted());
        if context_mounted {
            // Activation waits for the flush so the whole subtree is in place.
            child.set_inactive(false);
            child.runtime().queue_activated(child.as_owner());
        } else {
            activate_child_component(&child, true);
        }
    }
}

pub(crate) fn destroy(vnode: &VNodeRef) {
    let Some(child) = vnode.component_instance() else {
        return;
    };
    if child.is_destroyed() {
        return;
    }
    if vnode.is_keep_alive() {
        deactivate_child_component(&child, true);
    } else {
        child.destroy();
    }
}

/// Update an instance after its parent re-rendered it with a new
/// placeholder.
pub(crate) fn update_child_component(vm: &Component, placeholder: &VNodeRef, children: Vec<VNodeRef>) {
    let Some(opts) = placeholder.component_options() else {
        return;
    };
    let new_scoped_slots = placeholder
        .data()
        .is_some_and(|data| !data.scoped_slots.is_empty());
    let has_slot_content = !children.is_empty()
        || !vm.render_children().is_empty()
        || new_scoped_slots
        || vm.has_scoped_slots();

    vm.set_placeholder(placeholder);
    vm.set_render_children(children);

    for (key, def) in &vm.options().props {
        let value = opts
            .props_data
            .get(key)
            .cloned()
            .unwrap_or_else(|| def.default_value());
        vm.set_prop_from_parent(key, value);
    }
    vm.set_parent_listeners(opts.listeners.clone());

    // Slot content is not reactive, so the child must re-render to see it.
    if has_slot_content {
        vm.resolve_slots();
        vm.force_update();
    }
}

fn is_in_inactive_tree(vm: &Component) -> bool {
    let mut current = vm.parent();
    while let Some(parent) = current {
        if parent.is_inactive() {
            return true;
        }
        current = parent.parent();
    }
    false
}

pub(crate) fn activate_child_component(vm: &Component, direct: bool) {
    if direct {
        vm.set_direct_inactive(false);
        if is_in_inactive_tree(vm) {
            return;
        }
    } else if vm.direct_inactive() {
        return;
    }
    if vm.inactive_state() != Some(false) {
        vm.set_inactive(false);
        for child in vm.children() {
            activate_child_component(&child, false);
        }
        vm.call_hook(Hook::Activated);
    }
}

pub(crate) fn deactivate_child_component(vm: &Component, direct: bool) {
    if direct {
        vm.set_direct_inactive(true);
        if is_in_inactive_tree(vm) {
            return;
        }
    }
    if !vm.is_inactive() {
        vm.set_inactive(true);
        for child in vm.children() {
            deactivate_child_component(&child, false);
        }
        vm.call_hook(Hook::Deactivated);
    }
}
