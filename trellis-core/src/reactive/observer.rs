//! Observation
//!
//! Functions that turn plain containers into observed ones and that add or
//! remove reactive properties after the fact.

use super::dep::Dependency;
use super::runtime::Runtime;
use super::value::{Object, Value};

/// A property name or an array index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropKey {
    Name(String),
    Index(usize),
}

impl From<&str> for PropKey {
    fn from(name: &str) -> Self {
        PropKey::Name(name.to_string())
    }
}

impl From<String> for PropKey {
    fn from(name: String) -> Self {
        PropKey::Name(name)
    }
}

impl From<usize> for PropKey {
    fn from(index: usize) -> Self {
        PropKey::Index(index)
    }
}

impl PropKey {
    fn name(&self) -> String {
        match self {
            PropKey::Name(name) => name.clone(),
            PropKey::Index(index) => index.to_string(),
        }
    }
}

/// Observe `value` in place and return its object-level dependency.
///
/// Idempotent: an already observed container is returned as is, which also
/// terminates the walk on cyclic structures. Primitives are not observable.
pub fn observe(rt: &Runtime, value: &Value) -> Option<Dependency> {
    match value {
        Value::Object(obj) => {
            if obj.mark_observed(rt) {
                for (key, child) in obj.plain_entries() {
                    obj.define_reactive(rt, &key, child, false);
                }
            }
            obj.observer_dep().cloned()
        }
        Value::Array(arr) => {
            if arr.mark_observed(rt) {
                for item in arr.items_untracked() {
                    observe(rt, &item);
                }
            }
            arr.observer_dep().cloned()
        }
        _ => None,
    }
}

/// Define a reactive property on `obj`, observing `value`.
pub fn define_reactive(rt: &Runtime, obj: &Object, key: &str, value: Value) {
    obj.define_reactive(rt, key, value, false);
}

/// Set a property on a container, adding a reactive slot when the key is
/// new.
///
/// - Arrays: one mutation that observes the value and notifies the array
///   once. Indices past the end pad with `Null`.
/// - Objects with the key already present: an ordinary write.
/// - Unobserved objects: a plain write.
/// - Observed objects with a new key: a reactive slot is defined and the
///   object-level dependency is notified.
///
/// Returns the value that was set.
pub fn set(target: &Value, key: impl Into<PropKey>, value: Value) -> Value {
    let key = key.into();
    match (target, &key) {
        (Value::Array(arr), PropKey::Index(index)) => {
            arr.write(*index, value.clone());
            value
        }
        (Value::Object(obj), _) => {
            let name = key.name();
            if obj.contains_key(&name) {
                obj.set(&name, value.clone());
                return value;
            }
            match obj.observer_dep().cloned() {
                None => obj.set(&name, value.clone()),
                Some(dep) => {
                    obj.define_reactive(dep.runtime(), &name, value.clone(), false);
                    dep.notify();
                }
            }
            value
        }
        _ => value,
    }
}

/// Remove a property (or array element) and notify the container.
///
/// Removing an absent key is a no-op.
pub fn del(target: &Value, key: impl Into<PropKey>) {
    let key = key.into();
    match (target, &key) {
        (Value::Array(arr), PropKey::Index(index)) => {
            arr.splice(*index, 1, []);
        }
        (Value::Object(obj), _) => {
            let name = key.name();
            if obj.remove(&name).is_none() {
                return;
            }
            if let Some(dep) = obj.observer_dep() {
                dep.notify();
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use serde_json::json;

    #[test]
    fn observe_is_recursive_and_idempotent() {
        let rt = Runtime::new(Config::default());
        let value = Value::from_json(json!({ "a": { "b": [ { "c": 1 } ] } }));

        let first = observe(&rt, &value).unwrap();
        let second = observe(&rt, &value).unwrap();
        assert!(first.ptr_eq(&second));

        let obj = value.as_object().unwrap();
        assert!(obj.is_reactive("a"));
        let inner = obj.get_untracked("a");
        assert!(inner.is_observed());
        let arr = inner.get("b");
        assert!(arr.is_observed());
        assert!(arr.get("0").is_observed());
    }

    #[test]
    fn primitives_are_not_observable() {
        let rt = Runtime::new(Config::default());
        assert!(observe(&rt, &Value::from(1)).is_none());
    }

    #[test]
    fn cyclic_objects_terminate() {
        let rt = Runtime::new(Config::default());
        let obj = Object::new();
        obj.set("me", Value::Object(obj.clone()));
        assert!(observe(&rt, &Value::Object(obj.clone())).is_some());
        assert!(obj.is_reactive("me"));
    }

    #[test]
    fn set_on_plain_object_is_a_plain_write() {
        let target = Value::object([("a", Value::from(1))]);
        set(&target, "b", Value::from(2));
        let obj = target.as_object().unwrap();
        assert_eq!(obj.get_untracked("b"), Value::from(2));
        assert!(!obj.is_reactive("b"));
    }

    #[test]
    fn set_on_observed_object_defines_reactive_slot() {
        let rt = Runtime::new(Config::default());
        let target = Value::object([("a", Value::from(1))]);
        observe(&rt, &target);

        set(&target, "b", Value::object([("x", Value::from(1))]));
        let obj = target.as_object().unwrap();
        assert!(obj.is_reactive("b"));
        assert!(obj.get_untracked("b").is_observed());
    }

    #[test]
    fn set_past_array_end_pads() {
        let target = Value::array([Value::from(1)]);
        set(&target, 3usize, Value::from(4));
        let items = target.as_array().unwrap().items_untracked();
        assert_eq!(items, vec![Value::from(1), Value::Null, Value::Null, Value::from(4)]);
    }

    #[test]
    fn set_past_array_end_notifies_once() {
        use crate::reactive::{Getter, Watcher, WatcherOptions};
        use std::cell::RefCell;
        use std::rc::Rc;

        let rt = Runtime::new(Config::synchronous());
        let list = Value::from_json(json!([1]));
        observe(&rt, &list);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let reader = list.clone();
        let _watcher = Watcher::new(
            &rt,
            None,
            Getter::func(move || Ok(Value::from(reader.as_array().map_or(0, |arr| arr.len())))),
            Some(Rc::new(move |new: &Value, _: &Value| {
                sink.borrow_mut().push(new.clone());
                Ok(())
            })),
            WatcherOptions::user(),
        )
        .unwrap();

        set(&list, 3usize, Value::from("z"));
        assert_eq!(*seen.borrow(), vec![Value::from(4)]);
        assert_eq!(list.as_array().unwrap().get(3), Value::from("z"));
    }

    #[test]
    fn del_removes_keys_and_elements() {
        let obj = Value::object([("a", Value::from(1)), ("b", Value::from(2))]);
        del(&obj, "a");
        del(&obj, "missing");
        assert_eq!(obj.as_object().unwrap().keys_untracked(), vec!["b"]);

        let arr = Value::array([Value::from(1), Value::from(2)]);
        del(&arr, 0usize);
        assert_eq!(arr.as_array().unwrap().items_untracked(), vec![Value::from(2)]);
    }
}
