//! Deep traversal for `deep` watchers.
//!
//! Reading every nested property while a watcher is the tracking target
//! subscribes it to all of them. Observed containers are visited once per
//! traversal, keyed by their object-level dependency, which also makes
//! cyclic structures safe.

use std::collections::HashSet;

use super::dep::DepId;
use super::runtime::Runtime;
use super::value::Value;

/// Touch every reachable property of `value`.
pub fn traverse(rt: &Runtime, value: &Value) {
    let mut seen = rt.take_seen();
    walk(value, &mut seen);
    rt.restore_seen(seen);
}

fn walk(value: &Value, seen: &mut HashSet<DepId>) {
    match value {
        Value::Array(arr) => {
            if let Some(dep) = arr.observer_dep() {
                if !seen.insert(dep.id()) {
                    return;
                }
            }
            for index in (0..arr.len()).rev() {
                walk(&arr.get(index), seen);
            }
        }
        Value::Object(obj) => {
            if let Some(dep) = obj.observer_dep() {
                if !seen.insert(dep.id()) {
                    return;
                }
            }
            for key in obj.keys_untracked().iter().rev() {
                walk(&obj.get(key), seen);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::reactive::{observe, Getter, Object, Watcher, WatcherOptions};

    #[test]
    fn traversal_subscribes_to_nested_properties() {
        let rt = Runtime::new(Config::synchronous());
        let value = Value::from_json(serde_json::json!({ "a": { "b": { "c": 1 } } }));
        observe(&rt, &value);

        let source = value.clone();
        let watcher = Watcher::new(
            &rt,
            None,
            Getter::func(move || Ok(source.clone())),
            None,
            WatcherOptions::default().deep(true),
        )
        .unwrap();

        let innermost = value.get_path(&["a", "b"]);
        let dep = innermost.as_object().unwrap().property_dep("c").unwrap();
        assert!(watcher.depends_on(&dep));
    }

    #[test]
    fn cycles_are_visited_once() {
        let rt = Runtime::new(Config::default());
        let obj = Object::new();
        obj.set("self", Value::Object(obj.clone()));
        let value = Value::Object(obj);
        observe(&rt, &value);

        traverse(&rt, &value);
    }
}
