//! Errors and development diagnostics.
//!
//! Two kinds of problems surface from the runtime:
//!
//! - [`Error`] values travel through `Result` returns. User code (render
//!   functions, watcher getters and callbacks, lifecycle hooks) reports
//!   failures by returning one, and the runtime routes it to the centralized
//!   reporter (`Runtime::handle_error`) when it cannot be propagated.
//! - [`Warning`] values are non-fatal diagnostics: the runtime recovers and
//!   carries on, but the condition usually points at a caller bug.

use thiserror::Error;

use crate::vdom::Key;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by the runtime or by user callbacks.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// A free-form error raised by user code.
    #[error("{0}")]
    Message(String),

    /// A property was read that the instance does not define.
    #[error("property `{0}` is not defined on the instance")]
    UndefinedProperty(String),

    /// A component was mounted without a render function.
    #[error("component `{0}` has no render function")]
    MissingRender(String),

    /// Configuration could not be parsed.
    #[error("invalid config: {0}")]
    Config(String),

    /// A recorded operation log could not be encoded or decoded.
    #[error("op log codec failed: {0}")]
    Codec(String),
}

impl Error {
    /// Build a free-form error.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(err: rmp_serde::encode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(err: rmp_serde::decode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Development diagnostics. None of these abort the current operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Warning {
    #[error("Duplicate keys detected: '{0}'. This may cause an update error.")]
    DuplicateKey(Key),

    #[error(
        "Avoid using observed data object as vnode data. \
         Always create fresh vnode data objects in each render!"
    )]
    ObservedVNodeData,

    #[error("Avoid using non-primitive value as key, use string/number value instead.")]
    NonPrimitiveKey,

    #[error(
        "Multiple root nodes returned from render function. \
         Render function should return a single root node."
    )]
    MultipleRootNodes,

    #[error(
        "Unknown custom element: <{0}> - did you register the component correctly? \
         For recursive components, make sure to provide the \"name\" option."
    )]
    UnknownElement(String),

    #[error(
        "The client-side rendered virtual DOM tree is not matching server-rendered content. \
         Bailing hydration and performing full client-side render."
    )]
    HydrationMismatch,

    #[error("You may have an infinite update loop {}", loop_origin(.expression))]
    InfiniteUpdateLoop { expression: Option<String> },

    #[error(
        "Failed watching path: \"{0}\". Watcher only accepts simple dot-delimited paths. \
         For full control, use a function instead."
    )]
    InvalidWatchPath(String),

    #[error(
        "Avoid mutating a prop directly since the value will be overwritten whenever \
         the parent component re-renders. Prop being mutated: \"{0}\""
    )]
    PropMutation(String),

    #[error(
        "Avoid adding reactive properties to an instance or replacing its root data at \
         runtime. Declare \"{0}\" upfront in the data option."
    )]
    AvoidReplacingData(String),

    #[error("Failed to resolve directive: {0}")]
    UnresolvedDirective(String),

    #[error("Injection \"{0}\" not found")]
    InjectionNotFound(String),

    #[error(
        "Avoid mutating an injected value directly since the changes will be overwritten \
         whenever the provided component re-renders. Injection being mutated: \"{0}\""
    )]
    InjectionMutation(String),
}

fn loop_origin(expression: &Option<String>) -> String {
    match expression {
        Some(expression) => format!("in watcher with expression \"{expression}\""),
        None => "in a component render function.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_loop_message_names_its_origin() {
        let user = Warning::InfiniteUpdateLoop {
            expression: Some("count".into()),
        };
        assert!(user.to_string().ends_with("in watcher with expression \"count\""));

        let render = Warning::InfiniteUpdateLoop { expression: None };
        assert!(render.to_string().ends_with("in a component render function."));
    }

    #[test]
    fn json_errors_become_config_errors() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(Error::from(err), Error::Config(_)));
    }
}
