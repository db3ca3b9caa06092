//! Virtual DOM
//!
//! Render functions describe their output as a tree of [`VNode`]s built
//! with [`create_element`]. The [`Patcher`] reconciles successive trees
//! against a live tree owned by a [`NodeOps`] backend, delegating per-node
//! aspects such as attributes and listeners to [`Module`]s.

mod backend;
mod element;
pub mod modules;
mod patch;
pub mod tags;
mod vnode;

pub use backend::{Module, NodeId, NodeKind, NodeOps, RemoveCallback};
pub use element::{create_element, Child, ElementData, Normalization, Tag};
pub use patch::{same_vnode, ActiveInstance, PatchTarget, Patcher};
pub use vnode::{
    ComponentVNodeOptions, DirectiveBinding, EventHandler, Key, ScopedSlot, VNode, VNodeData,
    VNodeRef,
};
