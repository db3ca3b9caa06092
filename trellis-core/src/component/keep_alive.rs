//! The built-in keep-alive component.
//!
//! Keep-alive renders its first component child and caches that child's
//! instance by key. Switching away deactivates the instance instead of
//! destroying it; switching back re-inserts the cached instance and fires
//! `activated`. The cache is least-recently-used when `max` is set.

use indexmap::IndexMap;

use super::options::{ComponentOptions, Hook, PropDef, WatchDef};
use super::render::{RenderContext, Rendered};
use super::Component;
use crate::error::Result;
use crate::reactive::Value;
use crate::vdom::VNodeRef;

/// Cached component placeholders, oldest first.
#[derive(Default)]
pub(crate) struct KeepAliveCache {
    entries: IndexMap<String, VNodeRef>,
}

impl KeepAliveCache {
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Options for a keep-alive component. Register it under a name of your
/// choice (conventionally `keep-alive`).
///
/// Props: `include` and `exclude` (a comma-separated string or a list of
/// names) and `max` (cache size).
pub fn keep_alive() -> ComponentOptions {
    ComponentOptions::new()
        .name("keep-alive")
        .abstract_component()
        .prop("include", PropDef::new())
        .prop("exclude", PropDef::new())
        .prop("max", PropDef::new())
        .render(render)
        .hook(Hook::Mounted, |vm| {
            for (prop, keep_matching) in [("include", true), ("exclude", false)] {
                vm.watch(
                    prop,
                    WatchDef::new(move |vm, pattern, _| {
                        prune_cache(vm, |name| matches(pattern, name) == keep_matching);
                        Ok(())
                    }),
                )?;
            }
            Ok(())
        })
        .hook(Hook::Destroyed, |vm| {
            let keys: Vec<String> = vm.keep_alive_cache().borrow().entries.keys().cloned().collect();
            for key in keys {
                prune_entry(vm, &key, None);
            }
            Ok(())
        })
}

fn render(ctx: &RenderContext<'_>) -> Result<Rendered> {
    let vm = ctx.component();
    let slot = vm.slot("default");
    let Some(vnode) = slot.iter().find(|node| node.is_component()).cloned() else {
        return Ok(slot.first().cloned().into());
    };
    let Some(opts) = vnode.component_options() else {
        return Ok(vnode.into());
    };

    let name = component_name(&vnode);
    let include = ctx.get("include");
    let exclude = ctx.get("exclude");
    let excluded = (!include.is_null() && !name.as_deref().is_some_and(|n| matches(&include, n)))
        || (!exclude.is_null() && name.as_deref().is_some_and(|n| matches(&exclude, n)));
    if excluded {
        return Ok(vnode.into());
    }

    let key = match vnode.key() {
        Some(key) => key.to_string(),
        None => format!(
            "{}::{}",
            opts.ctor.cid(),
            opts.tag.clone().unwrap_or_default()
        ),
    };

    let overflow = {
        let mut cache = vm.keep_alive_cache().borrow_mut();
        if let Some(cached) = cache.entries.shift_remove(&key) {
            vnode.set_component_instance(cached.component_instance());
        }
        cache.entries.insert(key, vnode.clone());
        let max = ctx.get("max").as_f64().map(|max| max as usize);
        match max {
            Some(max) if cache.len() > max => cache.entries.keys().next().cloned(),
            _ => None,
        }
    };
    if let Some(oldest) = overflow {
        prune_entry(vm, &oldest, vm.vnode());
    }

    if let Some(data) = vnode.data() {
        data.keep_alive.set(true);
    }
    Ok(vnode.into())
}

fn component_name(vnode: &VNodeRef) -> Option<String> {
    let opts = vnode.component_options()?;
    opts.ctor
        .get_name()
        .map(str::to_string)
        .or_else(|| opts.tag.clone())
}

/// Whether `name` is listed in `pattern`.
fn matches(pattern: &Value, name: &str) -> bool {
    match pattern {
        Value::String(list) => list.split(',').any(|item| item.trim() == name),
        Value::Array(items) => items
            .items_untracked()
            .iter()
            .any(|item| item.as_str() == Some(name)),
        _ => false,
    }
}

fn prune_cache(vm: &Component, keep: impl Fn(&str) -> bool) {
    let doomed: Vec<String> = vm
        .keep_alive_cache()
        .borrow()
        .entries
        .iter()
        .filter(|(_, vnode)| component_name(vnode).is_some_and(|name| !keep(&name)))
        .map(|(key, _)| key.clone())
        .collect();
    for key in doomed {
        prune_entry(vm, &key, vm.vnode());
    }
}

/// Drop a cache entry, destroying its instance unless it is the one being
/// shown.
fn prune_entry(vm: &Component, key: &str, current: Option<VNodeRef>) {
    let cached = vm.keep_alive_cache().borrow_mut().entries.shift_remove(key);
    let Some(cached) = cached else {
        return;
    };
    let showing = current.is_some_and(|current| current.tag() == cached.tag());
    if !showing {
        if let Some(instance) = cached.component_instance() {
            instance.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patterns_match_lists_and_strings() {
        assert!(matches(&Value::from("a, b"), "b"));
        assert!(!matches(&Value::from("a,b"), "c"));
        assert!(matches(&Value::array([Value::from("x")]), "x"));
        assert!(!matches(&Value::Null, "x"));
    }
}
