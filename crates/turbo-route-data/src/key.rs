//! Route data keys and partial key matching.

use std::fmt;
use std::rc::Rc;

use serde::Serialize;
use serde_json::{Map, Value};

/// Where a route data instance gets its key from.
///
/// A key of `None`, or one that serializes to `null` or `false`, means
/// "do not fetch".
pub enum KeySource<S> {
    /// A fixed key.
    Static(Option<S>),
    /// A key recomputed on every load.
    Derived(Rc<dyn Fn() -> Option<S>>),
}

impl<S: Clone> KeySource<S> {
    /// Create a source that always yields `key`.
    pub fn fixed(key: S) -> Self {
        Self::Static(Some(key))
    }

    /// Create a source recomputed on every load.
    pub fn derived(f: impl Fn() -> Option<S> + 'static) -> Self {
        Self::Derived(Rc::new(f))
    }

    /// Evaluate the source.
    pub fn resolve(&self) -> Option<S> {
        match self {
            Self::Static(key) => key.clone(),
            Self::Derived(f) => f(),
        }
    }
}

impl<S: Clone> Clone for KeySource<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(key) => Self::Static(key.clone()),
            Self::Derived(f) => Self::Derived(Rc::clone(f)),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for KeySource<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(key) => f.debug_tuple("Static").field(key).finish(),
            Self::Derived(_) => f.write_str("Derived(..)"),
        }
    }
}

/// Serialize a key into its comparable form.
///
/// Returns `Ok(None)` for keys that mean "do not fetch".
pub fn key_value<S: Serialize>(key: &S) -> Result<Option<Value>, serde_json::Error> {
    let value = serde_json::to_value(key)?;
    Ok(match value {
        Value::Null | Value::Bool(false) => None,
        other => Some(other),
    })
}

/// Structural shape of a key node.
enum Shape<'a> {
    Scalar(&'a Value),
    Sequence(&'a [Value]),
    Record(&'a Map<String, Value>),
}

impl<'a> Shape<'a> {
    fn of(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => Shape::Sequence(items),
            Value::Object(fields) => Shape::Record(fields),
            scalar => Shape::Scalar(scalar),
        }
    }
}

/// Check whether `pattern` partially matches `candidate`.
///
/// Both sides are treated as sequences (a non-array is a one-element
/// sequence). The pattern is sparse: every index or field it names must
/// match, anything it leaves out is ignored. The relation is asymmetric, so
/// pass the narrower value as `pattern`.
///
/// ```
/// use serde_json::json;
/// use turbo_route_data::partial_match;
///
/// assert!(partial_match(&json!({"id": 1, "tab": "reviews"}), &json!({"id": 1})));
/// assert!(!partial_match(&json!({"id": 1}), &json!({"id": 2})));
/// assert!(!partial_match(&json!(["product", 1]), &json!([])));
/// ```
pub fn partial_match(candidate: &Value, pattern: &Value) -> bool {
    sequence_matches(as_sequence(candidate), as_sequence(pattern))
}

fn as_sequence(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    }
}

fn sequence_matches(candidate: &[Value], pattern: &[Value]) -> bool {
    if !candidate.is_empty() && pattern.is_empty() {
        return false;
    }
    pattern
        .iter()
        .enumerate()
        .all(|(i, p)| candidate.get(i).is_some_and(|c| node_matches(c, p)))
}

fn node_matches(candidate: &Value, pattern: &Value) -> bool {
    match (Shape::of(candidate), Shape::of(pattern)) {
        (Shape::Scalar(c), Shape::Scalar(p)) => scalar_eq(c, p),
        (Shape::Sequence(c), Shape::Sequence(p)) => sequence_matches(c, p),
        (Shape::Record(c), Shape::Record(p)) => p
            .iter()
            .all(|(field, p)| c.get(field).is_some_and(|c| node_matches(c, p))),
        _ => false,
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) if x.is_f64() || y.is_f64() => {
            x.as_f64() == y.as_f64()
        }
        _ => a == b,
    }
}
