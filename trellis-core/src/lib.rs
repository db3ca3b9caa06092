//! Trellis Core
//!
//! This crate provides the core runtime for the Trellis reactive UI framework.
//! It implements:
//!
//! - Reactive state with automatic dependency tracking
//! - A batched update scheduler
//! - A virtual DOM with keyed reconciliation and hydration
//! - Components, slots, keep-alive and async components
//! - An in-memory document with a serializable operation log
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `reactive`: Observable values, dependencies and watchers
//! - `scheduler`: The flush queue and tick sources
//! - `vdom`: Virtual nodes, the patcher and its per-node modules
//! - `component`: Component definitions and instances
//! - `dom`: The in-memory backend and its operation log
//! - `app`: Global registration and mounting
//!
//! Everything is single-threaded. Values are shared through `Rc` and the
//! runtime is driven by a [`scheduler::Ticker`], either an explicit queue
//! (the default, drained by [`App::tick`]) or a tokio `LocalSet`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::rc::Rc;
//! use trellis_core::{App, ComponentOptions, Config, MemoryDom, Runtime};
//!
//! let dom = Rc::new(MemoryDom::new());
//! let app = App::new(Runtime::new(Config::default()), dom.clone());
//!
//! let vm = app.mount(
//!     ComponentOptions::new()
//!         .data_json(serde_json::json!({ "count": 0 }))
//!         .render(|ctx| Ok(ctx.h("button", (), ctx.get("count")).into())),
//!     Some(dom.create_root("div")),
//! )?;
//!
//! vm.set("count", 1);
//! app.tick();
//! // The button now reads "1".
//! ```

pub mod app;
pub mod component;
pub mod config;
pub mod dom;
pub mod error;
pub mod reactive;
pub mod scheduler;
pub mod vdom;

pub use app::App;
pub use component::{Component, ComponentOptions, Hook, PropDef, RenderContext, Rendered};
pub use config::Config;
pub use dom::{DomOp, Markup, MemoryDom};
pub use error::{Error, Result, Warning};
pub use reactive::{Runtime, Value};
pub use vdom::{create_element, Child, NodeId, VNode, VNodeData, VNodeRef};

/// Crate version, as recorded in the op-log header of remote renderers.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
