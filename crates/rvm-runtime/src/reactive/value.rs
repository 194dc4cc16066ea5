#![forbid(unsafe_code)]

//! Values stored in the observed data graph.

use indexmap::IndexMap;
use serde_json::{Map, Number};

use super::node::ObservedNode;
use super::tracker::Tracker;

/// A field value: either a primitive, or an observed object/array.
///
/// Equality on `Node` is identity: two handles are equal only if they refer
/// to the same observed node.
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Node(ObservedNode),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Node(a), Self::Node(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// Short type name used in error messages.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Node(node) if node.is_array() => "array",
            Self::Node(_) => "object",
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_node(&self) -> Option<&ObservedNode> {
        match self {
            Self::Node(node) => Some(node),
            _ => None,
        }
    }

    /// Deep, untracked snapshot as JSON. A node reachable along several
    /// paths is emitted at each of them.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::Node(node) if node.is_array() => serde_json::Value::Array(
                node.values_untracked().iter().map(Self::to_json).collect(),
            ),
            Self::Node(node) => serde_json::Value::Object(
                node.entries_untracked()
                    .into_iter()
                    .map(|(key, value)| (key, value.to_json()))
                    .collect::<Map<_, _>>(),
            ),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        serde_json::Value::Number(Number::from(n as i64))
    } else {
        Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<ObservedNode> for Value {
    fn from(node: ObservedNode) -> Self {
        Self::Node(node)
    }
}

/// Conversion into an observed [`Value`] against a given tracker.
///
/// This is the `observe` operation: primitives pass through unchanged, raw
/// JSON objects and arrays are wrapped (recursively) into observed nodes, and
/// an existing [`Value::Node`] is kept as the same node when it already
/// belongs to `tracker`. A node owned by another tracker is copied into a
/// fresh node graph observed by `tracker`; reads on the foreign node would
/// consult the wrong capture slot.
pub trait IntoObserved {
    fn into_observed(self, tracker: &Tracker) -> Value;
}

impl IntoObserved for Value {
    fn into_observed(self, tracker: &Tracker) -> Value {
        match self {
            Self::Node(node) => node.into_observed(tracker),
            other => other,
        }
    }
}

impl IntoObserved for ObservedNode {
    fn into_observed(self, tracker: &Tracker) -> Value {
        if self.tracker().ptr_eq(tracker) {
            Value::Node(self)
        } else {
            self.to_json().into_observed(tracker)
        }
    }
}

impl IntoObserved for serde_json::Value {
    fn into_observed(self, tracker: &Tracker) -> Value {
        match self {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Node(ObservedNode::array(
                tracker,
                items.into_iter().map(|v| v.into_observed(tracker)).collect(),
            )),
            serde_json::Value::Object(map) => {
                let fields: IndexMap<String, Value> = map
                    .into_iter()
                    .map(|(k, v)| (k, v.into_observed(tracker)))
                    .collect();
                Value::Node(ObservedNode::object(tracker, fields))
            }
        }
    }
}

impl IntoObserved for &serde_json::Value {
    fn into_observed(self, tracker: &Tracker) -> Value {
        self.clone().into_observed(tracker)
    }
}

macro_rules! into_observed_via_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoObserved for $ty {
                fn into_observed(self, _tracker: &Tracker) -> Value {
                    Value::from(self)
                }
            }
        )*
    };
}

into_observed_via_from!(bool, f64, i32, u32, i64, &str, String);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn primitives_pass_through() {
        let tracker = Tracker::default();
        assert_eq!(tracker.observe(5), Value::Number(5.0));
        assert_eq!(tracker.observe("x"), Value::String("x".into()));
        assert_eq!(tracker.observe(json!(5)), Value::Number(5.0));
        assert_eq!(tracker.observe(json!("x")), Value::String("x".into()));
        assert_eq!(tracker.observe(json!(null)), Value::Null);
        assert_eq!(tracker.observe(json!(true)), Value::Bool(true));
    }

    #[test]
    fn objects_are_wrapped_recursively() {
        let tracker = Tracker::default();
        let value = tracker.observe(json!({"a": 1, "b": {"c": [1, {"d": 2}]}}));
        let root = value.as_node().expect("object becomes a node");
        let b = root.get_untracked("b").unwrap();
        let b = b.as_node().expect("nested object is a node");
        let c = b.get_untracked("c").unwrap();
        let c = c.as_node().expect("array is a node");
        assert!(c.is_array());
        let d_holder = c.get_untracked("1").unwrap();
        assert!(d_holder.as_node().is_some());
        assert_eq!(root.get_untracked("a"), Some(Value::Number(1.0)));
    }

    #[test]
    fn existing_node_is_kept() {
        let tracker = Tracker::default();
        let value = tracker.observe(json!({"a": 1}));
        let again = tracker.observe(value.clone());
        assert_eq!(value, again);
    }

    #[test]
    fn node_equality_is_identity() {
        let tracker = Tracker::default();
        let a = tracker.observe(json!({"x": 1}));
        let b = tracker.observe(json!({"x": 1}));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn to_json_snapshot() {
        let tracker = Tracker::default();
        let raw = json!({"a": 1, "b": {"c": [1, 2.5, "s", null, false]}});
        let value = tracker.observe(raw.clone());
        assert_eq!(value.to_json(), raw);
    }

    #[test]
    fn foreign_node_is_copied_into_tracker() {
        let home = Tracker::default();
        let away = Tracker::default();
        let original = home.observe(json!({"y": {"z": 1}}));

        let copied = away.observe(original.clone());
        assert_ne!(copied, original);
        let node = copied.as_node().unwrap();
        assert!(node.tracker().ptr_eq(&away));
        let nested = node.get_untracked("y").unwrap();
        assert!(nested.as_node().unwrap().tracker().ptr_eq(&away));
        assert_eq!(copied.to_json(), json!({"y": {"z": 1}}));
    }

    #[test]
    fn shared_subtree_serializes_at_each_position() {
        let tracker = Tracker::default();
        let shared = tracker.observe(json!({"n": 1}));
        let holder = tracker.observe(json!({}));
        let node = holder.as_node().unwrap();
        node.set("left", shared.clone()).unwrap();
        node.set("right", shared).unwrap();
        assert_eq!(
            holder.to_json(),
            json!({"left": {"n": 1}, "right": {"n": 1}})
        );
    }

    #[test]
    fn kind_names() {
        let tracker = Tracker::default();
        assert_eq!(tracker.observe(json!([])).kind(), "array");
        assert_eq!(tracker.observe(json!({})).kind(), "object");
        assert_eq!(Value::from(1.5).kind(), "number");
        assert_eq!(Value::Null.kind(), "null");
    }
}
