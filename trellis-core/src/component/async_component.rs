//! Async Components
//!
//! An [`AsyncComponent`] stands in for a component definition that is not
//! available yet. Until it resolves, render functions that use it produce a
//! placeholder comment (or the loading component, if one was given). Every
//! component that rendered the placeholder is remembered and re-rendered
//! once the factory resolves or fails.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::options::ComponentOptions;
use super::{Component, WeakComponent};
use crate::error::Error;

/// Resolution state of an async component.
#[derive(Clone)]
pub enum AsyncState {
    Pending,
    Resolved(Rc<ComponentOptions>),
    Failed(Error),
}

/// A shared, resolvable component factory.
#[derive(Clone)]
pub struct AsyncComponent {
    inner: Rc<AsyncInner>,
}

struct AsyncInner {
    state: RefCell<AsyncState>,
    owners: RefCell<Vec<WeakComponent>>,
    loading: Option<Rc<ComponentOptions>>,
    error: Option<Rc<ComponentOptions>>,
}

impl AsyncComponent {
    pub fn new() -> Self {
        Self::with_fallbacks(None, None)
    }

    /// A factory that renders `loading` while pending and `error` once it
    /// fails.
    pub fn with_fallbacks(
        loading: Option<Rc<ComponentOptions>>,
        error: Option<Rc<ComponentOptions>>,
    ) -> Self {
        Self {
            inner: Rc::new(AsyncInner {
                state: RefCell::new(AsyncState::Pending),
                owners: RefCell::new(Vec::new()),
                loading,
                error,
            }),
        }
    }

    pub fn state(&self) -> AsyncState {
        self.inner.state.borrow().clone()
    }

    pub fn resolved(&self) -> Option<Rc<ComponentOptions>> {
        match &*self.inner.state.borrow() {
            AsyncState::Resolved(options) => Some(options.clone()),
            _ => None,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(&*self.inner.state.borrow(), AsyncState::Pending)
    }

    pub fn has_failed(&self) -> bool {
        matches!(&*self.inner.state.borrow(), AsyncState::Failed(_))
    }

    pub(crate) fn loading_component(&self) -> Option<Rc<ComponentOptions>> {
        self.inner.loading.clone()
    }

    pub(crate) fn error_component(&self) -> Option<Rc<ComponentOptions>> {
        self.inner.error.clone()
    }

    /// Remember `owner` so it re-renders when the factory settles.
    pub(crate) fn register_owner(&self, owner: &Component) {
        let mut owners = self.inner.owners.borrow_mut();
        if !owners
            .iter()
            .any(|weak| weak.upgrade().is_some_and(|c| c.ptr_eq(owner)))
        {
            owners.push(owner.downgrade());
        }
    }

    /// Settle with a component definition. Later calls are ignored.
    pub fn resolve(&self, options: impl Into<Rc<ComponentOptions>>) {
        if !self.is_pending() {
            return;
        }
        *self.inner.state.borrow_mut() = AsyncState::Resolved(options.into());
        tracing::debug!("async component resolved");
        self.force_render();
    }

    /// Settle with an error. Owners re-render, showing the error component
    /// if one was given and nothing otherwise.
    pub fn reject(&self, err: Error) {
        if !self.is_pending() {
            return;
        }
        *self.inner.state.borrow_mut() = AsyncState::Failed(err);
        self.force_render();
    }

    fn force_render(&self) {
        let owners = std::mem::take(&mut *self.inner.owners.borrow_mut());
        for owner in owners.iter().filter_map(WeakComponent::upgrade) {
            if let AsyncState::Failed(err) = &*self.inner.state.borrow() {
                owner.report_error(err, "async component");
            }
            owner.force_update();
        }
    }

    pub fn ptr_eq(&self, other: &AsyncComponent) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Default for AsyncComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AsyncComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.inner.state.borrow() {
            AsyncState::Pending => "pending",
            AsyncState::Resolved(_) => "resolved",
            AsyncState::Failed(_) => "failed",
        };
        f.debug_struct("AsyncComponent").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settles_once() {
        let factory = AsyncComponent::new();
        assert!(factory.is_pending());

        factory.resolve(ComponentOptions::new().name("first"));
        factory.resolve(ComponentOptions::new().name("second"));
        factory.reject(Error::msg("late"));

        assert_eq!(factory.resolved().unwrap().get_name(), Some("first"));
        assert!(!factory.has_failed());
    }

    #[test]
    fn rejection_is_recorded() {
        let factory = AsyncComponent::new();
        factory.reject(Error::msg("offline"));
        assert!(factory.has_failed());
        assert!(factory.resolved().is_none());
    }
}
