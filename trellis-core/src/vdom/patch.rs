//! Patch Engine
//!
//! The [`Patcher`] turns a rendered [`VNode`] tree into live nodes through a
//! [`NodeOps`] backend, and on later renders brings the live tree in line
//! with the new virtual tree using as few backend operations as it can.
//!
//! # Algorithm
//!
//! Two nodes are patched in place when [`same_vnode`] says they describe
//! the same thing (same key, same tag, same comment-ness, both with or both
//! without data, and compatible `<input>` types). Anything else is replaced.
//!
//! Children lists are reconciled with the classic four-pointer walk: the
//! heads and tails of the old and new lists are compared pairwise, moving
//! matched nodes where needed. When no end matches, the new head is looked
//! up by key in a lazily built map over the remaining old nodes (or by a
//! linear `same_vnode` scan when it has no key). Leftovers are created or
//! removed once either list runs out.
//!
//! # Hooks
//!
//! Modules receive `create`, `update`, `remove` and `destroy` callbacks for
//! every node with data. Component placeholders additionally run the
//! component hooks (init, prepatch, insert, destroy). Insert hooks are
//! queued and run once the whole tree is attached, so `mounted` always sees
//! its subtree in place.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::backend::{Module, NodeId, NodeKind, NodeOps, RemoveCallback};
use super::modules::refs::register_ref;
use super::tags::{is_text_input_type, is_unknown_element, COMPONENT_TAG_PREFIX, SSR_ATTR};
use super::vnode::{Key, VNode, VNodeRef};
use crate::component::{hooks, Component};
use crate::error::Warning;
use crate::reactive::{Runtime, Value};

mod hydrate;

/// What a new tree is patched against.
#[derive(Clone, Debug)]
pub enum PatchTarget {
    /// The previously rendered tree.
    VNode(VNodeRef),
    /// A live element to replace, or to adopt when hydrating.
    Element(NodeId),
}

/// Slot of a child in its parent's child list, so a node that has to be
/// cloned can be swapped in place.
type Owner<'a> = Option<(&'a VNodeRef, usize)>;

pub struct Patcher {
    ops: Rc<dyn NodeOps>,
    modules: Vec<Rc<dyn Module>>,
    rt: Runtime,
    active: RefCell<Vec<Component>>,
    hydration_bailed: Cell<bool>,
    in_pre: Cell<usize>,
}

/// Keeps a component on the active-instance stack while it patches.
pub struct ActiveInstance<'a> {
    patcher: &'a Patcher,
}

impl Drop for ActiveInstance<'_> {
    fn drop(&mut self) {
        self.patcher.active.borrow_mut().pop();
    }
}

impl Patcher {
    pub fn new(rt: Runtime, ops: Rc<dyn NodeOps>, modules: Vec<Rc<dyn Module>>) -> Self {
        Self {
            ops,
            modules,
            rt,
            active: RefCell::new(Vec::new()),
            hydration_bailed: Cell::new(false),
            in_pre: Cell::new(0),
        }
    }

    pub fn ops(&self) -> &Rc<dyn NodeOps> {
        &self.ops
    }

    pub fn runtime(&self) -> &Runtime {
        &self.rt
    }

    /// Mark `vm` as the instance whose tree is being patched until the
    /// guard drops. Child instances created meanwhile get it as parent.
    pub fn activate(&self, vm: &Component) -> ActiveInstance<'_> {
        self.active.borrow_mut().push(vm.clone());
        ActiveInstance { patcher: self }
    }

    pub fn active_instance(&self) -> Option<Component> {
        self.active.borrow().last().cloned()
    }

    /// Patch `vnode` against `old` and return the resulting root node.
    ///
    /// - no `vnode`: tear `old` down (destroy hooks only, nodes stay),
    /// - no `old`: create a detached tree,
    /// - same node: patch in place,
    /// - otherwise: create the new tree next to the old one, then remove the
    ///   old one. A live element carrying the server-rendered marker, or any
    ///   element when `hydrating`, is adopted instead when it matches.
    pub fn patch(
        &self,
        old: Option<PatchTarget>,
        vnode: Option<VNodeRef>,
        hydrating: bool,
        remove_only: bool,
    ) -> Option<NodeId> {
        let Some(vnode) = vnode else {
            if let Some(PatchTarget::VNode(old)) = old {
                self.invoke_destroy_hook(&old);
            }
            return None;
        };

        let mut queue = Vec::new();
        let mut is_initial = false;
        match old {
            None => {
                is_initial = true;
                self.create_elm(&vnode, &mut queue, None, None, false, None);
            }
            Some(PatchTarget::VNode(old)) if same_vnode(&old, &vnode) => {
                self.patch_vnode(&old, &vnode, &mut queue, None, remove_only);
            }
            Some(target) => {
                let old = match target {
                    PatchTarget::VNode(old) => old,
                    PatchTarget::Element(el) => {
                        let ssr = self.ops.kind(el) == Some(NodeKind::Element)
                            && self.ops.has_attribute(el, SSR_ATTR);
                        if ssr {
                            self.ops.remove_attribute(el, SSR_ATTR);
                        }
                        if ssr || hydrating {
                            if self.hydrate(el, &vnode, &mut queue, false) {
                                self.invoke_insert_hook(&vnode, queue, true);
                                return Some(el);
                            }
                            self.rt.warn(Warning::HydrationMismatch, None);
                        }
                        self.empty_node_at(el)
                    }
                };

                let old_elm = old.elm();
                let parent_elm = old_elm.and_then(|el| self.ops.parent_node(el));
                let ref_elm = old_elm.and_then(|el| self.ops.next_sibling(el));
                self.create_elm(&vnode, &mut queue, parent_elm, ref_elm, false, None);

                // The new root replaces the old one as the element of every
                // placeholder it is the root of.
                let patchable = self.is_patchable(&vnode);
                let mut ancestor = vnode.parent_placeholder();
                while let Some(node) = ancestor {
                    for module in &self.modules {
                        module.destroy(&*self.ops, &node);
                    }
                    node.elm.set(vnode.elm());
                    if patchable {
                        for module in &self.modules {
                            module.create(&*self.ops, &node);
                        }
                        node.run_insert_hooks();
                    } else {
                        register_ref(&node, false);
                    }
                    ancestor = node.parent_placeholder();
                }

                if parent_elm.is_some() {
                    self.remove_vnodes(&[Some(old)], 0, 0);
                } else if old.tag().is_some() {
                    self.invoke_destroy_hook(&old);
                }
            }
        }

        self.invoke_insert_hook(&vnode, queue, is_initial);
        vnode.elm()
    }

    fn empty_node_at(&self, el: NodeId) -> VNodeRef {
        let tag = self.ops.tag_name(el).unwrap_or_default().to_lowercase();
        let vnode = VNode::new_element(tag, None, Some(Vec::new()), None);
        vnode.elm.set(Some(el));
        Rc::new(vnode)
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Create the live tree for `vnode` and insert it under `parent_elm`.
    /// Returns the node actually mounted, which is a clone when `vnode` was
    /// already mounted elsewhere.
    pub(crate) fn create_elm(
        &self,
        vnode: &VNodeRef,
        queue: &mut Vec<VNodeRef>,
        parent_elm: Option<NodeId>,
        ref_elm: Option<NodeId>,
        nested: bool,
        owner: Owner<'_>,
    ) -> VNodeRef {
        let vnode = match owner {
            Some((parent, index)) if vnode.elm().is_some() => {
                let copy = Rc::new(vnode.clone_vnode());
                parent.replace_child(index, copy.clone());
                copy
            }
            _ => vnode.clone(),
        };
        vnode.is_root_insert.set(!nested);

        if self.create_component(&vnode, queue, parent_elm, ref_elm) {
            return vnode;
        }

        match vnode.tag() {
            Some(tag) => {
                let pre = vnode.data().is_some_and(|data| data.pre);
                if pre {
                    self.in_pre.set(self.in_pre.get() + 1);
                }
                if self.in_pre.get() == 0
                    && vnode.ns().is_none()
                    && !tag.starts_with(COMPONENT_TAG_PREFIX)
                    && !self.rt.is_ignored_element(tag)
                    && is_unknown_element(tag)
                {
                    self.warn(&vnode, Warning::UnknownElement(tag.to_string()));
                }

                let elm = match vnode.ns() {
                    Some(ns) => self.ops.create_element_ns(&ns, tag),
                    None => self.ops.create_element(tag, &vnode),
                };
                vnode.elm.set(Some(elm));
                self.set_scope(&vnode);
                self.create_children(&vnode, queue);
                if vnode.data().is_some() {
                    self.invoke_create_hooks(&vnode, queue);
                }
                self.insert(parent_elm, elm, ref_elm);

                if pre {
                    self.in_pre.set(self.in_pre.get() - 1);
                }
            }
            None => {
                let text = vnode.text_content().unwrap_or_default();
                let elm = if vnode.is_comment() {
                    self.ops.create_comment(text)
                } else {
                    self.ops.create_text_node(text)
                };
                vnode.elm.set(Some(elm));
                self.insert(parent_elm, elm, ref_elm);
            }
        }
        vnode
    }

    fn create_component(
        &self,
        vnode: &VNodeRef,
        queue: &mut Vec<VNodeRef>,
        parent_elm: Option<NodeId>,
        ref_elm: Option<NodeId>,
    ) -> bool {
        if !vnode.is_component() {
            return false;
        }
        let is_reactivated = vnode.component_instance().is_some() && vnode.is_keep_alive();
        hooks::init(self, vnode, false);
        if vnode.component_instance().is_none() {
            return false;
        }
        self.init_component(vnode, queue);
        if let Some(elm) = vnode.elm() {
            self.insert(parent_elm, elm, ref_elm);
        }
        if is_reactivated {
            self.reactivate_component(vnode, queue, parent_elm, ref_elm);
        }
        true
    }

    pub(crate) fn init_component(&self, vnode: &VNodeRef, queue: &mut Vec<VNodeRef>) {
        let pending = std::mem::take(&mut *vnode.pending_insert.borrow_mut());
        queue.extend(pending);
        let instance = vnode.component_instance();
        vnode.elm.set(instance.and_then(|vm| vm.el()));
        if self.is_patchable(vnode) {
            self.invoke_create_hooks(vnode, queue);
            self.set_scope(vnode);
        } else {
            // An empty root: only the ref and the insert hook apply.
            register_ref(vnode, false);
            queue.push(vnode.clone());
        }
    }

    fn reactivate_component(
        &self,
        vnode: &VNodeRef,
        queue: &mut Vec<VNodeRef>,
        parent_elm: Option<NodeId>,
        ref_elm: Option<NodeId>,
    ) {
        // Modules that animate (transitions) need a chance to run again on
        // the re-inserted root.
        let mut inner = vnode.clone();
        while let Some(vm) = inner.component_instance() {
            let Some(root) = vm.vnode() else {
                break;
            };
            inner = root;
            if inner.data().is_some_and(|data| data.transition.is_some()) {
                for module in &self.modules {
                    module.activate(&*self.ops, &inner);
                }
                queue.push(inner.clone());
                break;
            }
        }
        if let Some(elm) = vnode.elm() {
            self.insert(parent_elm, elm, ref_elm);
        }
    }

    fn insert(&self, parent: Option<NodeId>, elm: NodeId, reference: Option<NodeId>) {
        let Some(parent) = parent else {
            return;
        };
        match reference {
            Some(reference) => {
                if self.ops.parent_node(reference) == Some(parent) {
                    self.ops.insert_before(parent, elm, Some(reference));
                }
            }
            None => self.ops.append_child(parent, elm),
        }
    }

    fn create_children(&self, vnode: &VNodeRef, queue: &mut Vec<VNodeRef>) {
        let Some(children) = vnode.child_list() else {
            return;
        };
        self.check_duplicate_keys(&children);
        for (index, child) in children.iter().enumerate() {
            self.create_elm(child, queue, vnode.elm(), None, true, Some((vnode, index)));
        }
    }

    pub(crate) fn invoke_create_hooks(&self, vnode: &VNodeRef, queue: &mut Vec<VNodeRef>) {
        for module in &self.modules {
            module.create(&*self.ops, vnode);
        }
        if vnode.is_component() || vnode.has_insert_hooks() {
            queue.push(vnode.clone());
        }
    }

    /// Stamp the scope id of every component this node belongs to, and of
    /// the instance currently patching when the node is slot content.
    fn set_scope(&self, vnode: &VNodeRef) {
        let Some(elm) = vnode.elm() else {
            return;
        };
        let mut ancestor = Some(vnode.clone());
        while let Some(node) = ancestor {
            if let Some(scope_id) = node.context().and_then(|ctx| ctx.options().scope_id.clone()) {
                self.ops.set_style_scope(elm, &scope_id);
            }
            ancestor = node.parent_placeholder();
        }
        if let Some(active) = self.active_instance() {
            let is_context = vnode.context().is_some_and(|ctx| ctx.ptr_eq(&active));
            if !is_context {
                if let Some(scope_id) = &active.options().scope_id {
                    self.ops.set_style_scope(elm, scope_id);
                }
            }
        }
    }

    fn add_vnodes(
        &self,
        parent_elm: Option<NodeId>,
        ref_elm: Option<NodeId>,
        parent: &VNodeRef,
        vnodes: &[VNodeRef],
        start: usize,
        end: usize,
        queue: &mut Vec<VNodeRef>,
    ) {
        for index in start..=end {
            if let Some(vnode) = vnodes.get(index) {
                self.create_elm(vnode, queue, parent_elm, ref_elm, false, Some((parent, index)));
            }
        }
    }

    // ------------------------------------------------------------------
    // Removal
    // ------------------------------------------------------------------

    /// Remove `vnodes[start..=end]`. Destroy hooks run before the nodes are
    /// detached.
    fn remove_vnodes(&self, vnodes: &[Option<VNodeRef>], start: usize, end: usize) {
        for vnode in vnodes.iter().take(end + 1).skip(start).flatten() {
            if vnode.tag().is_some() {
                self.invoke_destroy_hook(vnode);
                self.remove_and_invoke_remove_hook(vnode, None);
            } else if let Some(elm) = vnode.elm() {
                self.remove_node(elm);
            }
        }
    }

    fn remove_and_invoke_remove_hook(&self, vnode: &VNodeRef, rm: Option<RemoveCallback>) {
        if rm.is_none() && vnode.data().is_none() {
            if let Some(elm) = vnode.elm() {
                self.remove_node(elm);
            }
            return;
        }
        let listeners = self.modules.len() + 1;
        let rm = match rm {
            Some(rm) => {
                rm.add_listeners(listeners);
                rm
            }
            None => RemoveCallback::new(self.ops.clone(), vnode.elm(), listeners),
        };
        // A component's root shares the element and may hold removal back.
        if let Some(root) = vnode.component_instance().and_then(|vm| vm.vnode()) {
            if root.data().is_some() {
                self.remove_and_invoke_remove_hook(&root, Some(rm.clone()));
            }
        }
        for module in &self.modules {
            module.remove(&*self.ops, vnode, &rm);
        }
        rm.done();
    }

    fn remove_node(&self, elm: NodeId) {
        if let Some(parent) = self.ops.parent_node(elm) {
            self.ops.remove_child(parent, elm);
        }
    }

    pub(crate) fn invoke_destroy_hook(&self, vnode: &VNodeRef) {
        if vnode.data().is_some() {
            if vnode.is_component() {
                hooks::destroy(vnode);
            }
            for module in &self.modules {
                module.destroy(&*self.ops, vnode);
            }
        }
        for child in vnode.children() {
            self.invoke_destroy_hook(&child);
        }
    }

    // ------------------------------------------------------------------
    // Diffing
    // ------------------------------------------------------------------

    fn update_children(
        &self,
        parent_elm: Option<NodeId>,
        old_ch: Vec<VNodeRef>,
        parent: &VNodeRef,
        queue: &mut Vec<VNodeRef>,
        remove_only: bool,
    ) {
        let mut old_ch: Vec<Option<VNodeRef>> = old_ch.into_iter().map(Some).collect();
        let mut new_ch = parent.children();
        let mut old_start: isize = 0;
        let mut old_end: isize = old_ch.len() as isize - 1;
        let mut new_start: isize = 0;
        let mut new_end: isize = new_ch.len() as isize - 1;
        let mut old_key_to_idx: Option<HashMap<Key, usize>> = None;
        // Transition groups remove without moving.
        let can_move = !remove_only;

        self.check_duplicate_keys(&new_ch);

        while old_start <= old_end && new_start <= new_end {
            let Some(old_start_vnode) = old_ch[old_start as usize].clone() else {
                old_start += 1;
                continue;
            };
            let Some(old_end_vnode) = old_ch[old_end as usize].clone() else {
                old_end -= 1;
                continue;
            };
            let new_start_vnode = new_ch[new_start as usize].clone();
            let new_end_vnode = new_ch[new_end as usize].clone();

            if same_vnode(&old_start_vnode, &new_start_vnode) {
                new_ch[new_start as usize] = self.patch_vnode(
                    &old_start_vnode,
                    &new_start_vnode,
                    queue,
                    Some((parent, new_start as usize)),
                    remove_only,
                );
                old_start += 1;
                new_start += 1;
            } else if same_vnode(&old_end_vnode, &new_end_vnode) {
                new_ch[new_end as usize] = self.patch_vnode(
                    &old_end_vnode,
                    &new_end_vnode,
                    queue,
                    Some((parent, new_end as usize)),
                    remove_only,
                );
                old_end -= 1;
                new_end -= 1;
            } else if same_vnode(&old_start_vnode, &new_end_vnode) {
                // Moved right.
                new_ch[new_end as usize] = self.patch_vnode(
                    &old_start_vnode,
                    &new_end_vnode,
                    queue,
                    Some((parent, new_end as usize)),
                    remove_only,
                );
                if can_move {
                    if let (Some(parent_elm), Some(elm)) = (parent_elm, old_start_vnode.elm()) {
                        let reference = old_end_vnode.elm().and_then(|el| self.ops.next_sibling(el));
                        self.ops.insert_before(parent_elm, elm, reference);
                    }
                }
                old_start += 1;
                new_end -= 1;
            } else if same_vnode(&old_end_vnode, &new_start_vnode) {
                // Moved left.
                new_ch[new_start as usize] = self.patch_vnode(
                    &old_end_vnode,
                    &new_start_vnode,
                    queue,
                    Some((parent, new_start as usize)),
                    remove_only,
                );
                if can_move {
                    if let (Some(parent_elm), Some(elm)) = (parent_elm, old_end_vnode.elm()) {
                        self.ops.insert_before(parent_elm, elm, old_start_vnode.elm());
                    }
                }
                old_end -= 1;
                new_start += 1;
            } else {
                let map = old_key_to_idx.get_or_insert_with(|| {
                    create_key_to_old_idx(&old_ch, old_start as usize, old_end as usize)
                });
                let idx_in_old = match new_start_vnode.key() {
                    Some(key) => map.get(key).copied(),
                    None => find_idx_in_old(
                        &new_start_vnode,
                        &old_ch,
                        old_start as usize,
                        old_end as usize,
                    ),
                };
                let to_move = idx_in_old.and_then(|idx| old_ch[idx].clone().map(|vnode| (idx, vnode)));
                match to_move {
                    Some((idx, vnode_to_move)) if same_vnode(&vnode_to_move, &new_start_vnode) => {
                        new_ch[new_start as usize] = self.patch_vnode(
                            &vnode_to_move,
                            &new_start_vnode,
                            queue,
                            Some((parent, new_start as usize)),
                            remove_only,
                        );
                        old_ch[idx] = None;
                        if can_move {
                            if let (Some(parent_elm), Some(elm)) = (parent_elm, vnode_to_move.elm()) {
                                self.ops.insert_before(parent_elm, elm, old_start_vnode.elm());
                            }
                        }
                    }
                    // New node, or same key on a different element.
                    _ => {
                        new_ch[new_start as usize] = self.create_elm(
                            &new_start_vnode,
                            queue,
                            parent_elm,
                            old_start_vnode.elm(),
                            false,
                            Some((parent, new_start as usize)),
                        );
                    }
                }
                new_start += 1;
            }
        }

        if old_start > old_end {
            let ref_elm = new_ch
                .get((new_end + 1) as usize)
                .and_then(|vnode| vnode.elm());
            if new_start <= new_end {
                self.add_vnodes(
                    parent_elm,
                    ref_elm,
                    parent,
                    &new_ch,
                    new_start as usize,
                    new_end as usize,
                    queue,
                );
            }
        } else if new_start > new_end {
            self.remove_vnodes(&old_ch, old_start as usize, old_end as usize);
        }
    }

    /// Patch `vnode` in place of `old`. Returns the node that ends up in
    /// the tree.
    pub(crate) fn patch_vnode(
        &self,
        old: &VNodeRef,
        vnode: &VNodeRef,
        queue: &mut Vec<VNodeRef>,
        owner: Owner<'_>,
        remove_only: bool,
    ) -> VNodeRef {
        if Rc::ptr_eq(old, vnode) {
            return vnode.clone();
        }
        let vnode = match owner {
            Some((parent, index)) if vnode.elm().is_some() => {
                let copy = Rc::new(vnode.clone_vnode());
                parent.replace_child(index, copy.clone());
                copy
            }
            _ => vnode.clone(),
        };

        let elm = old.elm();
        vnode.elm.set(elm);

        if old.is_async_placeholder() {
            let resolved = vnode
                .async_factory
                .as_ref()
                .is_some_and(|factory| factory.resolved().is_some());
            match elm {
                Some(elm) if resolved => {
                    self.hydrate(elm, &vnode, queue, false);
                }
                _ => vnode.is_async_placeholder.set(true),
            }
            return vnode;
        }

        // Static subtrees are reused wholesale.
        if vnode.is_static()
            && old.is_static()
            && vnode.key() == old.key()
            && (vnode.is_cloned() || vnode.is_once.get())
        {
            vnode.set_component_instance(old.component_instance());
            return vnode;
        }

        if vnode.is_component() {
            hooks::prepatch(old, &vnode);
        }

        if (old.data().is_some() || vnode.data().is_some()) && self.is_patchable(&vnode) {
            for module in &self.modules {
                module.update(&*self.ops, old, &vnode);
            }
        }

        if vnode.text_content().is_none() {
            match (old.child_list(), vnode.child_list()) {
                (Some(old_ch), Some(_)) => {
                    self.update_children(elm, old_ch, &vnode, queue, remove_only);
                }
                (None, Some(ch)) => {
                    self.check_duplicate_keys(&ch);
                    if old.text_content().is_some() {
                        if let Some(elm) = elm {
                            self.ops.set_text_content(elm, "");
                        }
                    }
                    if !ch.is_empty() {
                        self.add_vnodes(elm, None, &vnode, &ch, 0, ch.len() - 1, queue);
                    }
                }
                (Some(old_ch), None) => {
                    if !old_ch.is_empty() {
                        let old_ch: Vec<_> = old_ch.into_iter().map(Some).collect();
                        self.remove_vnodes(&old_ch, 0, old_ch.len() - 1);
                    }
                }
                (None, None) => {
                    if old.text_content().is_some() {
                        if let Some(elm) = elm {
                            self.ops.set_text_content(elm, "");
                        }
                    }
                }
            }
        } else if old.text_content() != vnode.text_content() {
            if let Some(elm) = elm {
                self.ops
                    .set_text_content(elm, vnode.text_content().unwrap_or_default());
            }
        }

        vnode.run_postpatch_hooks(old);
        vnode
    }

    /// Run queued insert hooks. For the initial patch of a component root
    /// the queue is handed to the placeholder instead, and runs once the
    /// parent tree is attached.
    pub(crate) fn invoke_insert_hook(&self, vnode: &VNodeRef, queue: Vec<VNodeRef>, initial: bool) {
        if initial {
            if let Some(placeholder) = vnode.parent_placeholder() {
                placeholder.pending_insert.borrow_mut().extend(queue);
                return;
            }
        }
        for node in queue {
            if node.is_component() {
                hooks::insert(&node);
            }
            node.run_insert_hooks();
        }
    }

    /// Whether `vnode` (through any chain of component roots) ends in a real
    /// element.
    pub(crate) fn is_patchable(&self, vnode: &VNodeRef) -> bool {
        let mut node = vnode.clone();
        while let Some(vm) = node.component_instance() {
            match vm.vnode() {
                Some(root) => node = root,
                None => return false,
            }
        }
        node.tag().is_some()
    }

    fn check_duplicate_keys(&self, children: &[VNodeRef]) {
        let mut seen = HashSet::new();
        for child in children {
            if let Some(key) = child.key() {
                if !seen.insert(key.clone()) {
                    self.warn(child, Warning::DuplicateKey(key.clone()));
                }
            }
        }
    }

    pub(crate) fn warn(&self, vnode: &VNodeRef, warning: Warning) {
        match vnode.context() {
            Some(vm) => vm.warn(warning),
            None => self.rt.warn(warning, None),
        }
    }
}

/// Whether `a` can be patched into `b` in place.
pub fn same_vnode(a: &VNode, b: &VNode) -> bool {
    let same_factory = match (&a.async_factory, &b.async_factory) {
        (None, None) => true,
        (Some(x), Some(y)) => x.ptr_eq(y),
        _ => false,
    };
    if a.key() != b.key() || !same_factory {
        return false;
    }
    let same_shape = a.tag() == b.tag()
        && a.is_comment() == b.is_comment()
        && a.data().is_some() == b.data().is_some()
        && same_input_type(a, b);
    same_shape
        || (a.is_async_placeholder()
            && b.async_factory.as_ref().is_some_and(|factory| !factory.has_failed()))
}

/// `<input>` elements only match when their types are interchangeable.
fn same_input_type(a: &VNode, b: &VNode) -> bool {
    if a.tag() != Some("input") {
        return true;
    }
    let input_type = |vnode: &VNode| -> Option<String> {
        vnode
            .data()
            .and_then(|data| data.attrs.get("type"))
            .filter(|value| !value.is_null())
            .map(Value::to_string)
    };
    let (type_a, type_b) = (input_type(a), input_type(b));
    type_a == type_b
        || (type_a.as_deref().is_some_and(is_text_input_type)
            && type_b.as_deref().is_some_and(is_text_input_type))
}

fn create_key_to_old_idx(children: &[Option<VNodeRef>], start: usize, end: usize) -> HashMap<Key, usize> {
    let mut map = HashMap::new();
    for (index, child) in children.iter().enumerate().take(end + 1).skip(start) {
        if let Some(key) = child.as_ref().and_then(|child| child.key()) {
            map.insert(key.clone(), index);
        }
    }
    map
}

fn find_idx_in_old(
    node: &VNodeRef,
    old_ch: &[Option<VNodeRef>],
    start: usize,
    end: usize,
) -> Option<usize> {
    (start..=end).find(|&index| {
        old_ch
            .get(index)
            .and_then(Option::as_ref)
            .is_some_and(|old| same_vnode(node, old))
    })
}
