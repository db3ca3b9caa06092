//! DOM event listeners.

use std::rc::Rc;

use indexmap::IndexMap;

use crate::vdom::backend::{Module, NodeOps};
use crate::vdom::{EventHandler, VNodeRef};

/// Attaches `data.on` handlers to the element. On component placeholders
/// `on` holds the `native_on` handlers, bound to the component's root.
#[derive(Debug, Default)]
pub struct EventsModule;

impl Module for EventsModule {
    fn name(&self) -> &'static str {
        "events"
    }

    fn create(&self, ops: &dyn NodeOps, vnode: &VNodeRef) {
        update_listeners(ops, None, Some(vnode));
    }

    fn update(&self, ops: &dyn NodeOps, old: &VNodeRef, vnode: &VNodeRef) {
        update_listeners(ops, Some(old), Some(vnode));
    }

    fn destroy(&self, ops: &dyn NodeOps, vnode: &VNodeRef) {
        update_listeners(ops, Some(vnode), None);
    }
}

fn update_listeners(ops: &dyn NodeOps, old: Option<&VNodeRef>, vnode: Option<&VNodeRef>) {
    let empty = IndexMap::new();
    let old_on: &IndexMap<String, EventHandler> =
        old.and_then(|old| old.data()).map_or(&empty, |data| &data.on);
    let on = vnode.and_then(|vnode| vnode.data()).map_or(&empty, |data| &data.on);
    if old_on.is_empty() && on.is_empty() {
        return;
    }
    let Some(elm) = vnode.or(old).and_then(|node| node.elm()) else {
        return;
    };

    for (event, handler) in on {
        let unchanged = old_on
            .get(event)
            .is_some_and(|old_handler| Rc::ptr_eq(old_handler, handler));
        if !unchanged {
            ops.add_listener(elm, event, handler.clone());
        }
    }
    for event in old_on.keys() {
        if !on.contains_key(event) {
            ops.remove_listener(elm, event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::reactive::Value;
    use crate::vdom::{VNode, VNodeData};
    use std::cell::Cell;

    #[test]
    fn listeners_follow_the_data() {
        let dom = MemoryDom::new();
        let clicks = Rc::new(Cell::new(0));
        let counter = clicks.clone();
        let vnode = VNode::leaf(
            "button",
            Some(VNodeData::new().on("click", move |_| counter.set(counter.get() + 1))),
        );
        let elm = dom.create_element("button", &vnode);
        vnode.elm.set(Some(elm));
        EventsModule.create(&dom, &vnode);

        dom.dispatch(elm, "click", &Value::Null);
        assert_eq!(clicks.get(), 1);

        EventsModule.destroy(&dom, &vnode);
        dom.dispatch(elm, "click", &Value::Null);
        assert_eq!(clicks.get(), 1);
    }
}
