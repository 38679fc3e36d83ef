//! Deep equality and structural cloning over JSON values.
//!
//! `is_equal` works over the JSON value space only: primitives, arrays and
//! plain objects. Numbers compare by value, so `1` and `1.0` are equal.
//!
//! `SharedJson` is a JSON value whose objects are reference counted and may
//! be shared between several parents, or even reference themselves.
//! `SharedJson::clone_deep` copies such a graph while preserving its shape.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use serde::Serialize;
use serde_json::{Map, Number, Value};

use crate::error::CoreError;

/// Structural equality of two JSON values.
pub fn is_equal(a: &Value, b: &Value) -> bool {
    if std::ptr::eq(a, b) {
        return true;
    }

    match (a, b) {
        // null first, so it is never treated as an object
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => numbers_equal(x, y),
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(l, r)| is_equal(l, r))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x
                    .iter()
                    .all(|(key, l)| y.get(key).is_some_and(|r| is_equal(l, r)))
        }
        _ => false,
    }
}

fn numbers_equal(x: &Number, y: &Number) -> bool {
    if let (Some(a), Some(b)) = (x.as_i64(), y.as_i64()) {
        return a == b;
    }
    if let (Some(a), Some(b)) = (x.as_u64(), y.as_u64()) {
        return a == b;
    }
    x.as_f64() == y.as_f64()
}

/// Structural equality of two serializable values, compared as JSON.
///
/// Values that fail to serialize are never equal.
pub fn deep_equal<T: Serialize + ?Sized>(a: &T, b: &T) -> bool {
    match (serde_json::to_value(a), serde_json::to_value(b)) {
        (Ok(a), Ok(b)) => is_equal(&a, &b),
        _ => false,
    }
}

/// A JSON object that may be shared between parents.
#[derive(Clone, Default)]
pub struct SharedObject(Arc<RwLock<BTreeMap<String, SharedJson>>>);

impl SharedObject {
    /// Create an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property.
    pub fn insert(&self, key: impl Into<String>, value: SharedJson) {
        self.0
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), value);
    }

    /// Get a property. Objects are returned by reference, not copied.
    pub fn get(&self, key: &str) -> Option<SharedJson> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the object has no properties.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles point to the same object.
    pub fn ptr_eq(&self, other: &SharedObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    fn entries(&self) -> Vec<(String, SharedJson)> {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl fmt::Debug for SharedObject {
    // Objects may be cyclic, so only the identity is printed.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SharedObject({:#x}, {} keys)", self.id(), self.len())
    }
}

/// A JSON value whose objects may be shared or cyclic.
#[derive(Debug, Clone, Default)]
pub enum SharedJson {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<SharedJson>),
    Object(SharedObject),
}

impl SharedJson {
    /// Get the object handle, if this is an object.
    pub fn as_object(&self) -> Option<&SharedObject> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Deep copy of this value.
    ///
    /// Every source object is cloned exactly once: repeated references to the
    /// same object point to the same clone, and cycles are reproduced instead
    /// of recursed into forever.
    pub fn clone_deep(&self) -> SharedJson {
        let mut seen = HashMap::new();
        clone_inner(self, &mut seen)
    }

    /// Convert to a tree-shaped JSON value.
    ///
    /// Shared objects are duplicated; a cycle yields `CoreError::CyclicValue`.
    pub fn to_value(&self) -> Result<Value, CoreError> {
        let mut ancestors = Vec::new();
        to_value_inner(self, &mut ancestors)
    }
}

fn clone_inner(source: &SharedJson, seen: &mut HashMap<usize, SharedObject>) -> SharedJson {
    match source {
        SharedJson::Array(items) => {
            SharedJson::Array(items.iter().map(|item| clone_inner(item, seen)).collect())
        }
        SharedJson::Object(obj) => {
            if let Some(cloned) = seen.get(&obj.id()) {
                return SharedJson::Object(cloned.clone());
            }

            let cloned = SharedObject::new();
            seen.insert(obj.id(), cloned.clone());
            // entries are snapshotted so no lock is held while recursing
            for (key, value) in obj.entries() {
                let value = clone_inner(&value, seen);
                cloned.insert(key, value);
            }
            SharedJson::Object(cloned)
        }
        primitive => primitive.clone(),
    }
}

fn to_value_inner(source: &SharedJson, ancestors: &mut Vec<usize>) -> Result<Value, CoreError> {
    Ok(match source {
        SharedJson::Null => Value::Null,
        SharedJson::Bool(b) => Value::Bool(*b),
        SharedJson::Number(n) => Value::Number(n.clone()),
        SharedJson::String(s) => Value::String(s.clone()),
        SharedJson::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| to_value_inner(item, ancestors))
                .collect::<Result<_, _>>()?,
        ),
        SharedJson::Object(obj) => {
            if ancestors.contains(&obj.id()) {
                return Err(CoreError::CyclicValue);
            }
            ancestors.push(obj.id());
            let mut map = Map::new();
            for (key, value) in obj.entries() {
                map.insert(key, to_value_inner(&value, ancestors)?);
            }
            ancestors.pop();
            Value::Object(map)
        }
    })
}

impl From<Value> for SharedJson {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => {
                let obj = SharedObject::new();
                for (key, value) in map {
                    obj.insert(key, Self::from(value));
                }
                Self::Object(obj)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // === Equality Tests ===

    #[test]
    fn test_is_equal_reflexive() {
        for value in [
            json!(null),
            json!(true),
            json!(1.5),
            json!("s"),
            json!([1, [2, 3]]),
            json!({ "a": { "b": [null] } }),
        ] {
            assert!(is_equal(&value, &value));
            assert!(is_equal(&value, &value.clone()));
        }
    }

    #[test]
    fn test_is_equal_ignores_key_order() {
        let a: Value = serde_json::from_str(r#"{"a":1,"b":2}"#).unwrap();
        let b: Value = serde_json::from_str(r#"{"b":2,"a":1}"#).unwrap();
        assert!(is_equal(&a, &b));
    }

    #[test]
    fn test_is_equal_nested_arrays() {
        assert!(is_equal(&json!([1, [2, 3]]), &json!([1, [2, 3]])));
        assert!(!is_equal(&json!([1, [2, 3]]), &json!([1, [3, 2]])));
        assert!(!is_equal(&json!([1, 2]), &json!([1, 2, 3])));
    }

    #[test]
    fn test_is_equal_different_key_sets() {
        assert!(!is_equal(&json!({ "a": 1 }), &json!({ "a": 1, "b": 2 })));
        assert!(!is_equal(&json!({ "a": 1 }), &json!({ "b": 1 })));
    }

    #[test]
    fn test_is_equal_null_and_types() {
        assert!(!is_equal(&json!(null), &json!({})));
        assert!(!is_equal(&json!({}), &json!(null)));
        assert!(!is_equal(&json!([]), &json!({})));
        assert!(!is_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn test_is_equal_numbers_by_value() {
        assert!(is_equal(&json!(1), &json!(1.0)));
        assert!(!is_equal(&json!(1), &json!(2)));
        assert!(!is_equal(&json!(-1), &json!(u64::MAX)));
    }

    #[test]
    fn test_deep_equal_typed() {
        #[derive(Serialize)]
        struct Point {
            x: i32,
        }
        assert!(deep_equal(&Point { x: 1 }, &Point { x: 1 }));
        assert!(!deep_equal(&Point { x: 1 }, &Point { x: 2 }));
    }

    // === Cloning Tests ===

    #[test]
    fn test_clone_deep_preserves_shared_references() {
        let nested = SharedObject::new();
        nested.insert("v", SharedJson::from(json!(1)));
        let root = SharedObject::new();
        root.insert("left", SharedJson::Object(nested.clone()));
        root.insert("right", SharedJson::Object(nested.clone()));

        let cloned = SharedJson::Object(root.clone()).clone_deep();
        let cloned = cloned.as_object().unwrap();
        let left = cloned.get("left").unwrap();
        let right = cloned.get("right").unwrap();
        let (left, right) = (left.as_object().unwrap(), right.as_object().unwrap());

        assert!(left.ptr_eq(right));
        assert!(!left.ptr_eq(&nested));
        assert!(!cloned.ptr_eq(&root));
    }

    #[test]
    fn test_clone_deep_is_independent() {
        let source = SharedJson::from(json!({ "a": { "b": 1 } }));
        let cloned = source.clone_deep();

        let inner = source.as_object().unwrap().get("a").unwrap();
        inner.as_object().unwrap().insert("b", SharedJson::from(json!(2)));

        assert_eq!(cloned.to_value().unwrap(), json!({ "a": { "b": 1 } }));
        assert_eq!(source.to_value().unwrap(), json!({ "a": { "b": 2 } }));
    }

    #[test]
    fn test_clone_deep_self_reference_terminates() {
        let root = SharedObject::new();
        root.insert("name", SharedJson::String("root".into()));
        root.insert("me", SharedJson::Object(root.clone()));

        let cloned = SharedJson::Object(root.clone()).clone_deep();
        let cloned = cloned.as_object().unwrap();
        let me = cloned.get("me").unwrap();

        assert!(me.as_object().unwrap().ptr_eq(cloned));
        assert!(!cloned.ptr_eq(&root));
    }

    #[test]
    fn test_clone_deep_shared_inside_arrays() {
        let shared = SharedObject::new();
        let source = SharedJson::Array(vec![
            SharedJson::Object(shared.clone()),
            SharedJson::Object(shared),
        ]);

        let SharedJson::Array(items) = source.clone_deep() else {
            panic!("expected array");
        };
        assert!(items[0].as_object().unwrap().ptr_eq(items[1].as_object().unwrap()));
    }

    #[test]
    fn test_to_value_duplicates_shared_and_rejects_cycles() {
        let nested = SharedObject::new();
        nested.insert("v", SharedJson::Bool(true));
        let root = SharedObject::new();
        root.insert("a", SharedJson::Object(nested.clone()));
        root.insert("b", SharedJson::Object(nested));
        assert_eq!(
            SharedJson::Object(root.clone()).to_value().unwrap(),
            json!({ "a": { "v": true }, "b": { "v": true } })
        );

        root.insert("loop", SharedJson::Object(root.clone()));
        assert!(matches!(
            SharedJson::Object(root).to_value(),
            Err(CoreError::CyclicValue)
        ));
    }
}
