#![forbid(unsafe_code)]

//! Observed objects and arrays.
//!
//! # Design
//!
//! [`ObservedNode`] is an explicit wrapper in place of a transparent proxy:
//! it owns the raw fields plus one lazily created [`SubscriberRegistry`] per
//! field name, and exposes accessor methods.
//!
//! - [`get`](ObservedNode::get) registers the tracker's active consumer (if
//!   any) with the field's registry, then returns the stored value.
//! - [`set`](ObservedNode::set) observes the new value, stores it, and
//!   notifies the field's registry before returning.
//!
//! Arrays are nodes whose fields are decimal indices plus a read-only
//! `length`. Writing index `len` appends (and also notifies `length`).
//!
//! # Failure Modes
//!
//! - **Out-of-range or non-numeric array index on write**:
//!   [`ReactiveError::IndexOutOfBounds`].
//! - **Writing `length`**: [`ReactiveError::ReadOnly`].
//! - **Missing field on read**: `None`; the read still registers, so a later
//!   write creating the field notifies the reader.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use rvm_core::{ReactiveError, Result};

use super::registry::{NotifyReport, SubscriberRegistry};
use super::tracker::Tracker;
use super::value::{IntoObserved, Value};

const LENGTH: &str = "length";

enum Fields {
    Object(IndexMap<String, Value>),
    Array(Vec<Value>),
}

struct NodeInner {
    tracker: Tracker,
    fields: RefCell<Fields>,
    registries: RefCell<AHashMap<String, SubscriberRegistry>>,
}

/// A handle to one observed object or array. Cloning shares the node.
#[derive(Clone)]
pub struct ObservedNode {
    inner: Rc<NodeInner>,
}

impl fmt::Debug for ObservedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields = self.inner.fields.borrow();
        let (kind, keys): (&str, Vec<String>) = match &*fields {
            Fields::Object(map) => ("object", map.keys().cloned().collect()),
            Fields::Array(items) => ("array", (0..items.len()).map(|i| i.to_string()).collect()),
        };
        f.debug_struct("ObservedNode")
            .field("kind", &kind)
            .field("keys", &keys)
            .field("registries", &self.inner.registries.borrow().len())
            .finish()
    }
}

impl ObservedNode {
    /// Wrap already-observed fields as an object node.
    #[must_use]
    pub fn object(tracker: &Tracker, fields: IndexMap<String, Value>) -> Self {
        Self::with_fields(tracker, Fields::Object(fields))
    }

    /// Wrap already-observed items as an array node.
    #[must_use]
    pub fn array(tracker: &Tracker, items: Vec<Value>) -> Self {
        Self::with_fields(tracker, Fields::Array(items))
    }

    #[must_use]
    pub fn empty_object(tracker: &Tracker) -> Self {
        Self::object(tracker, IndexMap::new())
    }

    fn with_fields(tracker: &Tracker, fields: Fields) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                tracker: tracker.clone(),
                fields: RefCell::new(fields),
                registries: RefCell::new(AHashMap::new()),
            }),
        }
    }

    #[must_use]
    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    #[must_use]
    pub fn is_array(&self) -> bool {
        matches!(&*self.inner.fields.borrow(), Fields::Array(_))
    }

    /// Read `key`, registering the active consumer (if any) first.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.track(key);
        self.get_untracked(key)
    }

    /// Read `key` without registering anything.
    #[must_use]
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        match &*self.inner.fields.borrow() {
            Fields::Object(map) => map.get(key).cloned(),
            Fields::Array(items) if key == LENGTH => Some(Value::from(items.len() as f64)),
            Fields::Array(items) => parse_index(key).and_then(|i| items.get(i).cloned()),
        }
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        match &*self.inner.fields.borrow() {
            Fields::Object(map) => map.contains_key(key),
            Fields::Array(items) => {
                key == LENGTH || parse_index(key).is_some_and(|i| i < items.len())
            }
        }
    }

    /// Store `value` (observed) at `key` and notify `key`'s subscribers.
    ///
    /// Notification is unconditional: writing an equal value still notifies.
    /// Storing this node, or a node that contains it, inside itself fails
    /// with [`ReactiveError::CyclicAssignment`] and changes nothing.
    pub fn set(&self, key: &str, value: impl IntoObserved) -> Result<NotifyReport> {
        let value = value.into_observed(&self.inner.tracker);
        if self.reachable_from(&value) {
            return Err(ReactiveError::CyclicAssignment {
                key: key.to_owned(),
            });
        }
        let appended = {
            let mut fields = self.inner.fields.borrow_mut();
            match &mut *fields {
                Fields::Object(map) => {
                    map.insert(key.to_owned(), value);
                    false
                }
                Fields::Array(items) => {
                    if key == LENGTH {
                        return Err(ReactiveError::ReadOnly {
                            key: key.to_owned(),
                        });
                    }
                    let len = items.len();
                    match parse_index(key) {
                        Some(i) if i < len => {
                            items[i] = value;
                            false
                        }
                        Some(i) if i == len => {
                            items.push(value);
                            true
                        }
                        _ => {
                            return Err(ReactiveError::IndexOutOfBounds {
                                index: key.to_owned(),
                                len,
                            });
                        }
                    }
                }
            }
        };

        let mut report = self.notify(key);
        if appended {
            let length = self.notify(LENGTH);
            report.absorb(length);
        }
        Ok(report)
    }

    /// Append to an array node. Equivalent to `set(len, value)`.
    pub fn push(&self, value: impl IntoObserved) -> Result<NotifyReport> {
        let len = self.len();
        self.set(&len.to_string(), value)
    }

    /// Number of fields (objects) or items (arrays), untracked.
    #[must_use]
    pub fn len(&self) -> usize {
        match &*self.inner.fields.borrow() {
            Fields::Object(map) => map.len(),
            Fields::Array(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field names in insertion order (indices for arrays), untracked.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        match &*self.inner.fields.borrow() {
            Fields::Object(map) => map.keys().cloned().collect(),
            Fields::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    #[must_use]
    pub fn entries_untracked(&self) -> Vec<(String, Value)> {
        match &*self.inner.fields.borrow() {
            Fields::Object(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Fields::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
        }
    }

    #[must_use]
    pub fn values_untracked(&self) -> Vec<Value> {
        match &*self.inner.fields.borrow() {
            Fields::Object(map) => map.values().cloned().collect(),
            Fields::Array(items) => items.clone(),
        }
    }

    /// Registered subscribers for `key` (0 if the registry was never created).
    #[must_use]
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.inner
            .registries
            .borrow()
            .get(key)
            .map_or(0, SubscriberRegistry::len)
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        Value::Node(self.clone()).to_json()
    }

    fn addr(&self) -> usize {
        Rc::as_ptr(&self.inner) as usize
    }

    /// Whether this node is `value` or sits somewhere inside it.
    fn reachable_from(&self, value: &Value) -> bool {
        let Value::Node(start) = value else {
            return false;
        };
        let mut seen = AHashSet::new();
        let mut stack = vec![start.clone()];
        while let Some(node) = stack.pop() {
            if node.ptr_eq(self) {
                return true;
            }
            if !seen.insert(node.addr()) {
                continue;
            }
            stack.extend(node.values_untracked().into_iter().filter_map(|v| match v {
                Value::Node(child) => Some(child),
                _ => None,
            }));
        }
        false
    }

    fn registry(&self, key: &str) -> SubscriberRegistry {
        self.inner
            .registries
            .borrow_mut()
            .entry(key.to_owned())
            .or_default()
            .clone()
    }

    fn track(&self, key: &str) {
        let Some(active) = self.inner.tracker.active() else {
            return;
        };
        if self.registry(key).register(&active) {
            self.inner.tracker.record_registration();
            tracing::trace!(
                message = "reactive.register",
                consumer = active.id().raw(),
                field = key
            );
        }
    }

    fn notify(&self, key: &str) -> NotifyReport {
        let registry = self.registry(key);
        tracing::debug!(
            message = "reactive.notify",
            field = key,
            subscribers = registry.len()
        );
        registry.notify_all(&self.inner.tracker)
    }
}

fn parse_index(key: &str) -> Option<usize> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse().ok()
}
