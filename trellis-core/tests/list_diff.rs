//! Children reconciliation through the public patcher API.

use std::cell::RefCell;
use std::rc::Rc;

use trellis_core::config::Config;
use trellis_core::dom::{DomOp, MemoryDom};
use trellis_core::reactive::Runtime;
use trellis_core::vdom::modules::platform_modules;
use trellis_core::vdom::{
    Key, Module, NodeId, NodeOps, PatchTarget, Patcher, RemoveCallback, VNode, VNodeData, VNodeRef,
};
use trellis_core::Warning;

fn setup() -> (Rc<MemoryDom>, Patcher) {
    let dom = Rc::new(MemoryDom::new());
    let patcher = Patcher::new(Runtime::new(Config::default()), dom.clone(), platform_modules());
    (dom, patcher)
}

fn keyed_list(keys: &[i64]) -> VNodeRef {
    VNode::element(
        "ul",
        None,
        keys.iter()
            .map(|key| {
                VNode::element(
                    "li",
                    Some(VNodeData::new().key(*key)),
                    vec![VNode::text(key.to_string())],
                )
            })
            .collect(),
    )
}

fn plain_list(items: &[&str]) -> VNodeRef {
    VNode::element(
        "ul",
        None,
        items
            .iter()
            .map(|item| VNode::element("li", None, vec![VNode::text(*item)]))
            .collect(),
    )
}

fn html_for(keys: &[i64]) -> String {
    let items: String = keys.iter().map(|key| format!("<li>{key}</li>")).collect();
    format!("<ul>{items}</ul>")
}

fn created_elements(ops: &[DomOp]) -> usize {
    ops.iter()
        .filter(|op| matches!(op, DomOp::CreateElement { .. }))
        .count()
}

fn removed(ops: &[DomOp]) -> Vec<NodeId> {
    ops.iter()
        .filter_map(|op| match op {
            DomOp::RemoveChild { child, .. } => Some(*child),
            _ => None,
        })
        .collect()
}

#[test]
fn keyed_diff_moves_creates_and_removes() {
    let (dom, patcher) = setup();
    let old = keyed_list(&[1, 2, 3]);
    let ul = patcher.patch(None, Some(old.clone()), false, false).unwrap();
    let before = dom.children(ul);
    dom.clear_ops();

    patcher.patch(Some(PatchTarget::VNode(old)), Some(keyed_list(&[3, 1, 4])), false, false);

    let ops = dom.take_ops();
    assert_eq!(dom.to_html(ul), html_for(&[3, 1, 4]));
    let after = dom.children(ul);
    assert_eq!(after[0], before[2]);
    assert_eq!(after[1], before[0]);
    assert_eq!(created_elements(&ops), 1);
    assert_eq!(removed(&ops), vec![before[1]]);
}

#[test]
fn reversal_reuses_every_element() {
    let (dom, patcher) = setup();
    let keys: Vec<i64> = (0..8).collect();
    let old = keyed_list(&keys);
    let ul = patcher.patch(None, Some(old.clone()), false, false).unwrap();
    let mut before = dom.children(ul);
    dom.clear_ops();

    let reversed: Vec<i64> = keys.iter().rev().copied().collect();
    patcher.patch(Some(PatchTarget::VNode(old)), Some(keyed_list(&reversed)), false, false);

    let ops = dom.take_ops();
    before.reverse();
    assert_eq!(dom.children(ul), before);
    assert_eq!(dom.to_html(ul), html_for(&reversed));
    assert_eq!(created_elements(&ops), 0);
    assert!(removed(&ops).is_empty());
}

#[test]
fn rotation_and_insertion_in_the_middle() {
    let (dom, patcher) = setup();
    let old = keyed_list(&[1, 2, 3, 4, 5]);
    let ul = patcher.patch(None, Some(old.clone()), false, false).unwrap();

    let rotated = keyed_list(&[2, 3, 9, 4, 5, 1]);
    patcher.patch(Some(PatchTarget::VNode(old)), Some(rotated.clone()), false, false);
    assert_eq!(dom.to_html(ul), html_for(&[2, 3, 9, 4, 5, 1]));

    patcher.patch(Some(PatchTarget::VNode(rotated)), Some(keyed_list(&[])), false, false);
    assert_eq!(dom.to_html(ul), "<ul></ul>");
}

#[test]
fn unkeyed_children_patch_in_place() {
    let (dom, patcher) = setup();
    let old = plain_list(&["a", "b", "c"]);
    let ul = patcher.patch(None, Some(old.clone()), false, false).unwrap();
    let before = dom.children(ul);
    dom.clear_ops();

    patcher.patch(Some(PatchTarget::VNode(old)), Some(plain_list(&["c", "b"])), false, false);

    let ops = dom.take_ops();
    assert_eq!(dom.to_html(ul), "<ul><li>c</li><li>b</li></ul>");
    assert_eq!(dom.children(ul), before[..2].to_vec());
    assert_eq!(created_elements(&ops), 0);
    assert_eq!(removed(&ops), vec![before[2]]);
}

#[test]
fn key_collisions_warn_but_still_render() {
    let (dom, patcher) = setup();
    let warnings = Rc::new(RefCell::new(Vec::new()));
    let sink = warnings.clone();
    patcher
        .runtime()
        .set_warn_handler(move |w, _| sink.borrow_mut().push(w.clone()));

    let old = keyed_list(&[1, 2]);
    let ul = patcher.patch(None, Some(old.clone()), false, false).unwrap();
    patcher.patch(Some(PatchTarget::VNode(old)), Some(keyed_list(&[2, 2, 1])), false, false);

    assert_eq!(*warnings.borrow(), vec![Warning::DuplicateKey(Key::from(2i64))]);
    assert_eq!(dom.children(ul).len(), 3);
    assert_eq!(dom.to_html(ul), html_for(&[2, 2, 1]));
}

#[test]
fn same_key_with_a_different_tag_is_replaced() {
    let (dom, patcher) = setup();
    let old = VNode::element(
        "div",
        None,
        vec![VNode::element("li", Some(VNodeData::new().key(1i64)), vec![VNode::text("a")])],
    );
    let div = patcher.patch(None, Some(old.clone()), false, false).unwrap();
    let before = dom.children(div);
    dom.clear_ops();

    let new = VNode::element(
        "div",
        None,
        vec![VNode::element("p", Some(VNodeData::new().key(1i64)), vec![VNode::text("a")])],
    );
    patcher.patch(Some(PatchTarget::VNode(old)), Some(new), false, false);

    let ops = dom.take_ops();
    assert_eq!(dom.to_html(div), "<div><p>a</p></div>");
    assert_eq!(created_elements(&ops), 1);
    assert_eq!(removed(&ops), before);
}

#[test]
fn patching_an_identical_tree_is_a_no_op() {
    let (dom, patcher) = setup();
    let old = keyed_list(&[1, 2, 3]);
    let ul = patcher.patch(None, Some(old.clone()), false, false).unwrap();
    let html = dom.to_html(ul);
    dom.clear_ops();

    let same = keyed_list(&[1, 2, 3]);
    patcher.patch(Some(PatchTarget::VNode(old)), Some(same.clone()), false, false);
    assert!(dom.take_ops().is_empty());

    patcher.patch(Some(PatchTarget::VNode(same)), Some(keyed_list(&[1, 2, 3])), false, false);
    assert!(dom.take_ops().is_empty());
    assert_eq!(dom.to_html(ul), html);
}

/// Holds every removal back until released, like a leave transition.
#[derive(Default)]
struct LeaveTransition {
    held: RefCell<Vec<RemoveCallback>>,
}

impl Module for LeaveTransition {
    fn name(&self) -> &'static str {
        "leave"
    }

    fn remove(&self, _ops: &dyn NodeOps, _vnode: &VNodeRef, rm: &RemoveCallback) {
        self.held.borrow_mut().push(rm.clone());
    }
}

#[test]
fn removal_waits_for_every_module() {
    let dom = Rc::new(MemoryDom::new());
    let leave = Rc::new(LeaveTransition::default());
    let mut modules = platform_modules();
    modules.push(leave.clone());
    let patcher = Patcher::new(Runtime::new(Config::default()), dom.clone(), modules);

    let old = keyed_list(&[1, 2]);
    let ul = patcher.patch(None, Some(old.clone()), false, false).unwrap();
    let before = dom.children(ul);

    patcher.patch(Some(PatchTarget::VNode(old)), Some(keyed_list(&[1])), false, false);
    assert_eq!(dom.children(ul), before);

    let held = leave.held.borrow_mut().pop().unwrap();
    assert_eq!(held.pending(), 1);
    held.done();
    assert_eq!(held.pending(), 0);
    assert_eq!(dom.children(ul), vec![before[0]]);
    assert_eq!(dom.to_html(ul), html_for(&[1]));
}

#[test]
fn remove_only_patches_without_moving() {
    let (dom, patcher) = setup();
    let old = keyed_list(&[1, 2, 3]);
    let ul = patcher.patch(None, Some(old.clone()), false, false).unwrap();
    let before = dom.children(ul);
    dom.clear_ops();

    patcher.patch(Some(PatchTarget::VNode(old)), Some(keyed_list(&[3, 1])), false, true);

    let ops = dom.take_ops();
    assert!(!ops.iter().any(|op| matches!(op, DomOp::InsertBefore { .. })));
    assert_eq!(removed(&ops), vec![before[1]]);
    assert_eq!(dom.children(ul), vec![before[0], before[2]]);
    assert_eq!(dom.to_html(ul), html_for(&[1, 3]));
}
