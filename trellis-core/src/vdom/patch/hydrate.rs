//! Adopting server-rendered markup.
//!
//! Hydration walks an existing live tree alongside a freshly rendered
//! virtual tree. Matching nodes are adopted as the vnode's `elm` instead of
//! being created, so only listeners, directives and other non-markup data
//! have to be applied. Any structural mismatch makes the walk fail, and the
//! caller falls back to a full client-side render.

use super::Patcher;
use crate::component::hooks;
use crate::reactive::traverse;
use crate::vdom::backend::{NodeId, NodeKind};
use crate::vdom::tags::{is_unknown_element, COMPONENT_TAG_PREFIX};
use crate::vdom::vnode::{VNode, VNodeData, VNodeRef};

impl Patcher {
    /// Adopt `elm` for `vnode` and, recursively, its children. Returns
    /// `false` on the first mismatch.
    pub(crate) fn hydrate(
        &self,
        elm: NodeId,
        vnode: &VNodeRef,
        queue: &mut Vec<VNodeRef>,
        in_pre: bool,
    ) -> bool {
        let in_pre = in_pre || vnode.data().is_some_and(|data| data.pre);
        vnode.elm.set(Some(elm));

        // Pending async components keep the server markup until they
        // resolve.
        if vnode.is_comment() && vnode.async_factory.is_some() {
            vnode.is_async_placeholder.set(true);
            return true;
        }
        if !self.assert_node_match(elm, vnode, in_pre) {
            tracing::debug!(node = %elm, ?vnode, "hydration node mismatch");
            return false;
        }

        if vnode.is_component() {
            hooks::init(self, vnode, true);
            if vnode.component_instance().is_some() {
                self.init_component(vnode, queue);
                return true;
            }
        }

        if vnode.tag().is_some() {
            if let Some(children) = vnode.child_list() {
                if !self.ops.has_child_nodes(elm) {
                    self.create_children(vnode, queue);
                } else {
                    let mut child_node = self.ops.first_child(elm);
                    let mut matched = true;
                    for child in &children {
                        match child_node {
                            Some(node) if self.hydrate(node, child, queue, in_pre) => {
                                child_node = self.ops.next_sibling(node);
                            }
                            _ => {
                                matched = false;
                                break;
                            }
                        }
                    }
                    // Extra live children are a mismatch too.
                    if !matched || child_node.is_some() {
                        if !self.hydration_bailed.replace(true) {
                            tracing::debug!(
                                parent = %elm,
                                expected = children.len(),
                                "mismatching child nodes during hydration"
                            );
                        }
                        return false;
                    }
                }
            }
            if let Some(data) = vnode.data() {
                if has_unrendered_data(data) {
                    self.invoke_create_hooks(vnode, queue);
                } else if let Some(class) = &data.class {
                    // Keep deep class bindings reactive.
                    traverse(&self.rt, class);
                }
            }
        } else {
            let text = vnode.text_content().unwrap_or_default();
            if self.ops.text(elm).as_deref() != Some(text) {
                self.ops.set_text_content(elm, text);
            }
        }
        true
    }

    fn assert_node_match(&self, node: NodeId, vnode: &VNode, in_pre: bool) -> bool {
        match vnode.tag() {
            Some(tag) => {
                tag.starts_with(COMPONENT_TAG_PREFIX)
                    || ((in_pre || vnode.ns().is_some() || !is_unknown_element(tag)
                        || self.rt.is_ignored_element(tag))
                        && self
                            .ops
                            .tag_name(node)
                            .is_some_and(|name| name.eq_ignore_ascii_case(tag)))
            }
            None => {
                let expected = if vnode.is_comment() {
                    NodeKind::Comment
                } else {
                    NodeKind::Text
                };
                self.ops.kind(node) == Some(expected)
            }
        }
    }
}

/// Whether `data` carries anything the server could not have rendered into
/// markup. Attributes, classes and the key are already in place.
fn has_unrendered_data(data: &VNodeData) -> bool {
    !data.on.is_empty()
        || !data.native_on.is_empty()
        || !data.directives.is_empty()
        || !data.dom_props.is_empty()
        || !data.props.is_empty()
        || !data.scoped_slots.is_empty()
        || data.style.is_some()
        || data.ref_name.is_some()
        || data.slot.is_some()
        || data.transition.is_some()
        || data.pre
}
