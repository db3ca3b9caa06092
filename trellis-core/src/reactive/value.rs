//! Dynamic Values
//!
//! Component state is dynamically shaped, so it is stored as a [`Value`]
//! tree. Structured values ([`Object`] and [`Array`]) are shared handles:
//! cloning a `Value` clones the handle, not the contents.
//!
//! # Observation
//!
//! Containers start out plain. [`observe`](super::observe) marks a container
//! as observed by giving it an object-level [`Dependency`] and converts every
//! property of an object into a reactive slot with its own dependency.
//!
//! Reading a reactive slot while a watcher is evaluating subscribes the
//! watcher to:
//!
//! - the slot's dependency,
//! - the object-level dependency of the value stored in the slot, so that
//!   key additions and removals on that value reach the reader,
//! - and, for arrays, the object-level dependency of every nested element.
//!
//! Arrays have no per-index slots. Reads of an observed array register with
//! the array's own dependency, and the mutating methods notify it once per
//! call. [`Array::assign`] is a raw write that notifies nobody.

use std::cell::{OnceCell, RefCell};
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::dep::Dependency;
use super::observer::observe;
use super::runtime::Runtime;

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(Object),
    Array(Array),
}

impl Value {
    /// Build a plain object value from key/value pairs.
    pub fn object<K, I>(entries: I) -> Value
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Value::Object(Object::from_entries(entries))
    }

    /// Build a plain array value.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Value {
        Value::Array(Array::from_vec(items.into_iter().collect()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Objects and arrays.
    pub fn is_structured(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Strings, numbers and booleans.
    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::Bool(_) | Value::Number(_) | Value::String(_))
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Object(_) | Value::Array(_) => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The number as an integer, if it has no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) if n.fract() == 0.0 && n.is_finite() => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Array> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Identity comparison used for change detection.
    ///
    /// Primitives compare by value with `NaN` equal to itself. Structured
    /// values compare by handle identity.
    pub fn same(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Array(a), Value::Array(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// Tracked read of a property (objects) or index (arrays).
    pub fn get(&self, key: &str) -> Value {
        match self {
            Value::Object(obj) => obj.get(key),
            Value::Array(arr) => match key.parse::<usize>() {
                Ok(index) => arr.get(index),
                Err(_) if key == "length" => Value::from(arr.len()),
                Err(_) => Value::Null,
            },
            _ => Value::Null,
        }
    }

    /// Tracked read along a dot path.
    pub fn get_path<S: AsRef<str>>(&self, path: &[S]) -> Value {
        let mut current = self.clone();
        for segment in path {
            if !current.is_structured() {
                return Value::Null;
            }
            current = current.get(segment.as_ref());
        }
        current
    }

    /// The object-level dependency of an observed container.
    pub fn observer(&self) -> Option<Dependency> {
        match self {
            Value::Object(obj) => obj.observer_dep().cloned(),
            Value::Array(arr) => arr.observer_dep().cloned(),
            _ => None,
        }
    }

    pub fn is_observed(&self) -> bool {
        match self {
            Value::Object(obj) => obj.is_observed(),
            Value::Array(arr) => arr.is_observed(),
            _ => false,
        }
    }

    /// Convert JSON into a fresh, unobserved value tree.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.into()),
            serde_json::Value::Array(items) => {
                Value::array(items.into_iter().map(Value::from_json))
            }
            serde_json::Value::Object(map) => Value::object(
                map.into_iter().map(|(key, value)| (key, Value::from_json(value))),
            ),
        }
    }

    /// Snapshot the value as JSON without registering dependencies.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serde_json::Value::from(*n as i64)
            }
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::Array(arr) => {
                serde_json::Value::Array(arr.items_untracked().iter().map(Value::to_json).collect())
            }
            Value::Object(obj) => serde_json::Value::Object(
                obj.entries_untracked()
                    .into_iter()
                    .map(|(key, value)| (key, value.to_json()))
                    .collect(),
            ),
        }
    }
}

pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{n:.0}")
    } else {
        format!("{n}")
    }
}

/// Text rendering as used for interpolation: `null` renders empty,
/// containers render as pretty JSON.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => f.write_str(s),
            Value::Object(_) | Value::Array(_) => {
                let json = serde_json::to_string_pretty(&self.to_json()).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(obj) => f
                .debug_map()
                .entries(obj.entries_untracked())
                .finish(),
            Value::Array(arr) => f.debug_list().entries(arr.items_untracked()).finish(),
        }
    }
}

/// Structural equality. Unlike [`Value::same`], containers compare by
/// contents and `NaN` is never equal.
impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                a.ptr_eq(b) || a.entries_untracked() == b.entries_untracked()
            }
            (Value::Array(a), Value::Array(b)) => {
                a.ptr_eq(b) || a.items_untracked() == b.items_untracked()
            }
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n.into())
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(obj: Object) -> Self {
        Value::Object(obj)
    }
}

impl From<Array> for Value {
    fn from(arr: Array) -> Self {
        Value::Array(arr)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(Array::from_vec(items))
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        Value::from_json(json)
    }
}

// ----------------------------------------------------------------------------
// Objects
// ----------------------------------------------------------------------------

/// A shared, insertion-ordered map of values.
#[derive(Clone, Default)]
pub struct Object(Rc<ObjectInner>);

#[derive(Default)]
struct ObjectInner {
    slots: RefCell<IndexMap<String, Slot>>,
    observer: OnceCell<Dependency>,
}

#[derive(Clone)]
enum Slot {
    Plain(Value),
    Reactive(Rc<Property>),
}

/// A reactive slot: the value plus the dependency guarding it.
struct Property {
    dep: Dependency,
    value: RefCell<Value>,
    shallow: bool,
}

impl Property {
    fn read(&self) -> Value {
        let value = self.value.borrow().clone();
        if self.dep.runtime().tracker().is_tracking() {
            self.dep.depend();
            if let Some(child) = value.observer() {
                child.depend();
                if let Value::Array(arr) = &value {
                    depend_array(arr);
                }
            }
        }
        value
    }

    fn write(&self, value: Value) {
        if self.value.borrow().same(&value) {
            return;
        }
        if !self.shallow {
            observe(self.dep.runtime(), &value);
        }
        *self.value.borrow_mut() = value;
        self.dep.notify();
    }
}

/// Register the object-level dependency of every nested element, since
/// array elements have no slots of their own.
fn depend_array(arr: &Array) {
    for item in arr.items_untracked() {
        if let Some(dep) = item.observer() {
            dep.depend();
        }
        if let Value::Array(inner) = &item {
            depend_array(inner);
        }
    }
}

impl Object {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        let slots = entries
            .into_iter()
            .map(|(key, value)| (key.into(), Slot::Plain(value)))
            .collect();
        Object(Rc::new(ObjectInner {
            slots: RefCell::new(slots),
            observer: OnceCell::new(),
        }))
    }

    /// Tracked read. Missing keys read as `Null` and are not tracked.
    pub fn get(&self, key: &str) -> Value {
        let slot = self.0.slots.borrow().get(key).cloned();
        match slot {
            Some(Slot::Plain(value)) => value,
            Some(Slot::Reactive(prop)) => prop.read(),
            None => Value::Null,
        }
    }

    pub fn get_untracked(&self, key: &str) -> Value {
        match self.0.slots.borrow().get(key) {
            Some(Slot::Plain(value)) => value.clone(),
            Some(Slot::Reactive(prop)) => prop.value.borrow().clone(),
            None => Value::Null,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.slots.borrow().contains_key(key)
    }

    /// Write a property.
    ///
    /// Writing a reactive slot notifies its subscribers unless the value is
    /// unchanged. Writing an unknown key adds a plain, untracked property;
    /// use [`set`](super::set) to add a reactive one.
    pub fn set(&self, key: &str, value: Value) {
        let slot = self.0.slots.borrow().get(key).cloned();
        match slot {
            Some(Slot::Reactive(prop)) => prop.write(value),
            _ => {
                self.0
                    .slots
                    .borrow_mut()
                    .insert(key.to_string(), Slot::Plain(value));
            }
        }
    }

    /// Keys in insertion order. Registers with the object-level dependency.
    pub fn keys(&self) -> Vec<String> {
        self.track();
        self.keys_untracked()
    }

    pub fn keys_untracked(&self) -> Vec<String> {
        self.0.slots.borrow().keys().cloned().collect()
    }

    /// Tracked snapshot of every entry.
    pub fn entries(&self) -> Vec<(String, Value)> {
        self.keys()
            .into_iter()
            .map(|key| {
                let value = self.get(&key);
                (key, value)
            })
            .collect()
    }

    pub fn entries_untracked(&self) -> Vec<(String, Value)> {
        self.0
            .slots
            .borrow()
            .iter()
            .map(|(key, slot)| {
                let value = match slot {
                    Slot::Plain(value) => value.clone(),
                    Slot::Reactive(prop) => prop.value.borrow().clone(),
                };
                (key.clone(), value)
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.slots.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_observed(&self) -> bool {
        self.0.observer.get().is_some()
    }

    /// Whether `key` is backed by a reactive slot.
    pub fn is_reactive(&self, key: &str) -> bool {
        matches!(self.0.slots.borrow().get(key), Some(Slot::Reactive(_)))
    }

    /// The dependency guarding `key`, if the slot is reactive.
    pub fn property_dep(&self, key: &str) -> Option<Dependency> {
        match self.0.slots.borrow().get(key) {
            Some(Slot::Reactive(prop)) => Some(prop.dep.clone()),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &Object) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    fn track(&self) {
        if let Some(dep) = self.0.observer.get() {
            dep.depend();
        }
    }

    pub(crate) fn observer_dep(&self) -> Option<&Dependency> {
        self.0.observer.get()
    }

    /// Give the object its object-level dependency. Returns `false` if it
    /// already had one.
    pub(crate) fn mark_observed(&self, rt: &Runtime) -> bool {
        let mut fresh = false;
        self.0.observer.get_or_init(|| {
            fresh = true;
            Dependency::new(rt)
        });
        fresh
    }

    /// Entries that are not yet reactive, in insertion order.
    pub(crate) fn plain_entries(&self) -> Vec<(String, Value)> {
        self.0
            .slots
            .borrow()
            .iter()
            .filter_map(|(key, slot)| match slot {
                Slot::Plain(value) => Some((key.clone(), value.clone())),
                Slot::Reactive(_) => None,
            })
            .collect()
    }

    /// Install a reactive slot for `key`, keeping its position if present.
    pub(crate) fn define_reactive(&self, rt: &Runtime, key: &str, value: Value, shallow: bool) {
        if !shallow {
            observe(rt, &value);
        }
        let prop = Rc::new(Property {
            dep: Dependency::new(rt),
            value: RefCell::new(value),
            shallow,
        });
        self.0
            .slots
            .borrow_mut()
            .insert(key.to_string(), Slot::Reactive(prop));
    }

    pub(crate) fn remove(&self, key: &str) -> Option<Value> {
        self.0.slots.borrow_mut().shift_remove(key).map(|slot| match slot {
            Slot::Plain(value) => value,
            Slot::Reactive(prop) => prop.value.borrow().clone(),
        })
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries_untracked()).finish()
    }
}

// ----------------------------------------------------------------------------
// Arrays
// ----------------------------------------------------------------------------

/// A shared, growable list of values.
#[derive(Clone, Default)]
pub struct Array(Rc<ArrayInner>);

#[derive(Default)]
struct ArrayInner {
    items: RefCell<Vec<Value>>,
    observer: OnceCell<Dependency>,
}

impl Array {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(items: Vec<Value>) -> Self {
        Array(Rc::new(ArrayInner {
            items: RefCell::new(items),
            observer: OnceCell::new(),
        }))
    }

    fn track(&self) {
        if let Some(dep) = self.0.observer.get() {
            dep.depend();
        }
    }

    /// Apply a mutation, observe whatever it inserted, then notify once.
    fn mutate<R>(&self, f: impl FnOnce(&mut Vec<Value>) -> (R, Vec<Value>)) -> R {
        let (result, inserted) = f(&mut self.0.items.borrow_mut());
        if let Some(dep) = self.0.observer.get() {
            for value in &inserted {
                observe(dep.runtime(), value);
            }
            dep.notify();
        }
        result
    }

    pub fn len(&self) -> usize {
        self.track();
        self.0.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tracked read; out-of-range indices read as `Null`.
    pub fn get(&self, index: usize) -> Value {
        self.track();
        self.0.items.borrow().get(index).cloned().unwrap_or_default()
    }

    /// Tracked snapshot of the elements.
    pub fn to_vec(&self) -> Vec<Value> {
        self.track();
        self.0.items.borrow().clone()
    }

    pub fn items_untracked(&self) -> Vec<Value> {
        self.0.items.borrow().clone()
    }

    /// Append and return the new length.
    pub fn push(&self, value: Value) -> usize {
        self.mutate(|items| {
            items.push(value.clone());
            (items.len(), vec![value])
        })
    }

    pub fn pop(&self) -> Option<Value> {
        self.mutate(|items| (items.pop(), Vec::new()))
    }

    pub fn shift(&self) -> Option<Value> {
        self.mutate(|items| {
            let first = if items.is_empty() {
                None
            } else {
                Some(items.remove(0))
            };
            (first, Vec::new())
        })
    }

    /// Prepend and return the new length.
    pub fn unshift(&self, values: impl IntoIterator<Item = Value>) -> usize {
        let values: Vec<Value> = values.into_iter().collect();
        self.mutate(|items| {
            items.splice(0..0, values.iter().cloned());
            (items.len(), values)
        })
    }

    /// Remove `delete_count` elements at `start`, insert `insert` in their
    /// place, and return the removed elements. `start` is clamped to the
    /// length.
    pub fn splice(
        &self,
        start: usize,
        delete_count: usize,
        insert: impl IntoIterator<Item = Value>,
    ) -> Vec<Value> {
        let insert: Vec<Value> = insert.into_iter().collect();
        self.mutate(|items| {
            let start = start.min(items.len());
            let end = start + delete_count.min(items.len() - start);
            let removed = items.splice(start..end, insert.iter().cloned()).collect();
            (removed, insert)
        })
    }

    pub fn sort_by(&self, compare: impl FnMut(&Value, &Value) -> Ordering) {
        self.mutate(|items| {
            items.sort_by(compare);
            ((), Vec::new())
        })
    }

    pub fn reverse(&self) {
        self.mutate(|items| {
            items.reverse();
            ((), Vec::new())
        })
    }

    /// Index write as one mutation: pads with `Null` past the end, observes
    /// the value and notifies once.
    pub(crate) fn write(&self, index: usize, value: Value) {
        self.mutate(|items| {
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            items[index] = value.clone();
            ((), vec![value])
        })
    }

    /// Raw index write. Pads with `Null` past the end and notifies nobody;
    /// go through [`set`](super::set) for a reactive write.
    pub fn assign(&self, index: usize, value: Value) {
        let mut items = self.0.items.borrow_mut();
        if index >= items.len() {
            items.resize(index + 1, Value::Null);
        }
        items[index] = value;
    }

    pub fn is_observed(&self) -> bool {
        self.0.observer.get().is_some()
    }

    pub fn ptr_eq(&self, other: &Array) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn observer_dep(&self) -> Option<&Dependency> {
        self.0.observer.get()
    }

    pub(crate) fn mark_observed(&self, rt: &Runtime) -> bool {
        let mut fresh = false;
        self.0.observer.get_or_init(|| {
            fresh = true;
            Dependency::new(rt)
        });
        fresh
    }
}

impl fmt::Debug for Array {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items_untracked()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn same_value_treats_nan_as_equal() {
        let nan = Value::Number(f64::NAN);
        assert!(nan.same(&Value::Number(f64::NAN)));
        assert!(Value::from(1).same(&Value::from(1.0)));
        assert!(!Value::from("1").same(&Value::from(1)));
    }

    #[test]
    fn structured_values_compare_by_identity() {
        let a = Value::array([Value::from(1)]);
        let b = Value::array([Value::from(1)]);
        assert!(!a.same(&b));
        assert!(a.same(&a.clone()));
        assert_eq!(a, b);
    }

    #[test]
    fn display_follows_interpolation_rules() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::from(3.0).to_string(), "3");
        assert_eq!(Value::from(2.5).to_string(), "2.5");
        assert_eq!(Value::from(-0.0).to_string(), "0");
        assert_eq!(Value::from(true).to_string(), "true");
        assert_eq!(Value::from_json(json!([1])).to_string(), "[\n  1\n]");
    }

    #[test]
    fn json_conversion_keeps_key_order() {
        let value = Value::from_json(json!({ "b": 1, "a": [true, null] }));
        let obj = value.as_object().unwrap();
        assert_eq!(obj.keys_untracked(), vec!["b", "a"]);
        assert_eq!(value.to_json(), json!({ "b": 1, "a": [true, null] }));
        assert_eq!(Value::from(2.5).to_json(), json!(2.5));
    }

    #[test]
    fn get_path_walks_nested_containers() {
        let value = Value::from_json(json!({ "a": { "b": [10, 20] } }));
        assert_eq!(value.get_path(&["a", "b", "1"]), Value::from(20));
        assert_eq!(value.get_path(&["a", "missing", "x"]), Value::Null);
        assert_eq!(value.get_path(&["a", "b", "length"]), Value::from(2));
    }

    #[test]
    fn splice_clamps_and_returns_removed() {
        let arr = Array::from_vec(vec![1.into(), 2.into(), 3.into()]);
        let removed = arr.splice(1, 10, [Value::from(9)]);
        assert_eq!(removed, vec![Value::from(2), Value::from(3)]);
        assert_eq!(arr.items_untracked(), vec![Value::from(1), Value::from(9)]);

        arr.splice(99, 0, [Value::from(5)]);
        assert_eq!(arr.items_untracked().len(), 3);
    }

    #[test]
    fn assign_pads_with_null() {
        let arr = Array::new();
        arr.assign(2, Value::from("x"));
        assert_eq!(arr.items_untracked(), vec![Value::Null, Value::Null, Value::from("x")]);
    }

    #[test]
    fn truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::from("").is_truthy());
        assert!(!Value::Number(f64::NAN).is_truthy());
        assert!(Value::object(Vec::<(String, Value)>::new()).is_truthy());
    }
}
