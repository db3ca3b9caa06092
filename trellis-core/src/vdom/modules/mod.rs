//! Patch modules
//!
//! Each module owns one aspect of a live element that the core patcher
//! leaves alone. They run in the order returned by [`platform_modules`].

mod attrs;
mod class;
mod directives;
mod events;
pub(crate) mod refs;

use std::rc::Rc;

pub use attrs::{AttrsModule, DomPropsModule};
pub use class::{gen_class_for_vnode, get_style, stringify_class, ClassModule, StyleModule};
pub use directives::{Directive, DirectivesModule, FnDirective};
pub use events::EventsModule;
pub use refs::RefsModule;

use super::backend::Module;

/// The standard module set: attributes, classes, listeners, DOM properties
/// and styles, then refs and directives.
pub fn platform_modules() -> Vec<Rc<dyn Module>> {
    vec![
        Rc::new(AttrsModule),
        Rc::new(ClassModule),
        Rc::new(EventsModule),
        Rc::new(DomPropsModule),
        Rc::new(StyleModule),
        Rc::new(RefsModule),
        Rc::new(DirectivesModule),
    ]
}
