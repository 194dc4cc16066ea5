#![forbid(unsafe_code)]

//! The reactive root: observed data, computed fields, and the merged view.
//!
//! # Design
//!
//! [`ReactiveRoot`] is a cheaply cloneable handle. Building one:
//!
//! 1. Creates the root's [`Tracker`].
//! 2. Observes the raw data (a JSON object) into an [`ObservedNode`].
//! 3. For each computed definition, in declaration order, creates a
//!    [`Watcher`] whose getter is the definition itself. The capturing dry
//!    read seeds the computed cache; the callback overwrites the cache entry
//!    on every recomputation.
//!
//! The computed cache is an observed node too, so a watcher that reads a
//! computed name is notified when the cached value is replaced.
//!
//! # Lookup precedence
//!
//! [`lookup`](ReactiveRoot::lookup) resolves a name against own fields, then
//! data, then the computed cache, and reports which one answered as a
//! [`Lookup`]. Writes through [`set`](ReactiveRoot::set) always go to data;
//! a data field with a computed field's name shadows it from then on.
//!
//! # Own fields
//!
//! `$data` and `$computed` expose the data node and computed cache. Extra
//! own fields may be declared on the builder. Own fields are fixed at build
//! time and are not tracked.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use rvm_core::{EngineConfig, Path, PathFailure, ReactiveError, Result};

use super::node::ObservedNode;
use super::registry::NotifyReport;
use super::tracker::{ConsumerFailure, EngineStats, FailureHook, Tracker};
use super::value::{IntoObserved, Value};
use super::watcher::{Callback, Getter, Watcher};

pub const OWN_DATA: &str = "$data";
pub const OWN_COMPUTED: &str = "$computed";

type ComputedFn = Rc<dyn Fn(&ReactiveRoot) -> Result<Value>>;

/// Which layer of the merged view answered a lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Own(Value),
    Data(Value),
    Computed(Value),
    NotFound,
}

impl Lookup {
    #[must_use]
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Own(v) | Self::Data(v) | Self::Computed(v) => Some(v),
            Self::NotFound => None,
        }
    }

    #[must_use]
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }
}

struct RootInner {
    tracker: Tracker,
    own: IndexMap<String, Value>,
    data: ObservedNode,
    computed: ObservedNode,
    computed_names: RefCell<Vec<String>>,
    watchers: RefCell<Vec<Rc<Watcher>>>,
}

/// Merged view over own fields, observed data, and computed fields.
#[derive(Clone)]
pub struct ReactiveRoot {
    inner: Rc<RootInner>,
}

/// Non-owning handle to a [`ReactiveRoot`], for callbacks and bindings that
/// must not keep the root alive.
#[derive(Clone)]
pub struct WeakReactiveRoot {
    inner: Weak<RootInner>,
}

impl WeakReactiveRoot {
    #[must_use]
    pub fn upgrade(&self) -> Option<ReactiveRoot> {
        self.inner.upgrade().map(|inner| ReactiveRoot { inner })
    }
}

impl fmt::Debug for WeakReactiveRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakReactiveRoot")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

impl fmt::Debug for ReactiveRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveRoot")
            .field("data", &self.inner.data.keys())
            .field("computed", &*self.inner.computed_names.borrow())
            .field("own", &self.inner.own.keys().collect::<Vec<_>>())
            .field("watchers", &self.watcher_count())
            .finish()
    }
}

impl ReactiveRoot {
    #[must_use]
    pub fn builder() -> ReactiveRootBuilder {
        ReactiveRootBuilder::default()
    }

    // ── Merged view ─────────────────────────────────────────────────────

    /// Resolve `name` against own fields, data, then computed cache.
    ///
    /// Data and computed reads register the active consumer, including for
    /// a name that is absent (so its later creation notifies).
    pub fn lookup(&self, name: &str) -> Lookup {
        if let Some(value) = self.inner.own.get(name) {
            return Lookup::Own(value.clone());
        }
        if let Some(value) = self.inner.data.get(name) {
            return Lookup::Data(value);
        }
        match self.inner.computed.get(name) {
            Some(value) => Lookup::Computed(value),
            None => Lookup::NotFound,
        }
    }

    pub fn get(&self, name: &str) -> Result<Value> {
        self.lookup(name)
            .into_value()
            .ok_or_else(|| ReactiveError::unknown(name))
    }

    pub fn get_f64(&self, name: &str) -> Result<f64> {
        let value = self.get(name)?;
        value.as_f64().ok_or_else(|| ReactiveError::TypeMismatch {
            name: name.to_owned(),
            expected: "number",
            found: value.kind(),
        })
    }

    pub fn get_string(&self, name: &str) -> Result<String> {
        match self.get(name)? {
            Value::String(s) => Ok(s),
            other => Err(ReactiveError::TypeMismatch {
                name: name.to_owned(),
                expected: "string",
                found: other.kind(),
            }),
        }
    }

    /// Write `name` on the data graph and notify its subscribers.
    pub fn set(&self, name: &str, value: impl IntoObserved) -> Result<NotifyReport> {
        tracing::debug!(message = "reactive.root.set", field = name);
        self.inner.data.set(name, value)
    }

    /// Resolve a dotted path, one segment at a time. The first segment goes
    /// through [`lookup`](Self::lookup); the rest are node reads.
    pub fn resolve(&self, path: &Path) -> Result<Value> {
        self.walk(path, path.segments())
    }

    /// Parse and resolve a dotted path.
    pub fn resolve_str(&self, path: &str) -> Result<Value> {
        self.resolve(&Path::parse(path)?)
    }

    /// Write through a dotted path: the parent is resolved untracked, then
    /// the last segment is written on it.
    pub fn set_path(&self, path: &Path, value: impl IntoObserved) -> Result<NotifyReport> {
        let (parent, last) = path.split_last();
        if parent.is_empty() {
            return self.set(last, value);
        }
        let target = self.tracker().untracked(|| self.walk(path, parent))?;
        match target {
            Value::Node(node) => node.set(last, value),
            other => Err(ReactiveError::invalid_path(
                path.to_string(),
                last,
                PathFailure::NotAnObject { found: other.kind() },
            )),
        }
    }

    fn walk(&self, path: &Path, segments: &[String]) -> Result<Value> {
        let Some((first, rest)) = segments.split_first() else {
            return Err(ReactiveError::PathSyntax {
                path: path.to_string(),
                reason: "path is empty".to_owned(),
            });
        };
        let mut current = self.lookup(first).into_value().ok_or_else(|| {
            ReactiveError::invalid_path(path.to_string(), first.as_str(), PathFailure::Missing)
        })?;
        for segment in rest {
            let node = match &current {
                Value::Node(node) => node.clone(),
                other => {
                    return Err(ReactiveError::invalid_path(
                        path.to_string(),
                        segment.as_str(),
                        PathFailure::NotAnObject { found: other.kind() },
                    ));
                }
            };
            current = node.get(segment).ok_or_else(|| {
                ReactiveError::invalid_path(path.to_string(), segment.as_str(), PathFailure::Missing)
            })?;
        }
        Ok(current)
    }

    // ── Watchers ────────────────────────────────────────────────────────

    /// Subscribe `callback` to a dotted path. The callback runs on every
    /// change, not on construction.
    pub fn watch(&self, path: &str, callback: impl Fn(Value) + 'static) -> Result<Rc<Watcher>> {
        self.try_watch(path, move |value| {
            callback(value);
            Ok(())
        })
    }

    /// Like [`watch`](Self::watch) with a fallible callback. Errors are
    /// contained and reported to the failure hook.
    pub fn try_watch(
        &self,
        path: &str,
        callback: impl Fn(Value) -> Result<()> + 'static,
    ) -> Result<Rc<Watcher>> {
        let parsed = Path::parse(path)?;
        let label = format!("watch:{parsed}");
        let getter: Getter = Box::new(move |root: &ReactiveRoot| root.resolve(&parsed));
        Watcher::create(self, label, getter, Box::new(callback)).map(|(watcher, _)| watcher)
    }

    /// Like [`try_watch`](Self::try_watch) but also delivers the dry-read
    /// value to the callback once, before returning.
    pub fn watch_immediate(
        &self,
        path: &str,
        callback: impl Fn(Value) -> Result<()> + 'static,
    ) -> Result<Rc<Watcher>> {
        let parsed = Path::parse(path)?;
        let label = format!("watch:{parsed}");
        let getter: Getter = Box::new(move |root: &ReactiveRoot| root.resolve(&parsed));
        let callback: Rc<dyn Fn(Value) -> Result<()>> = Rc::new(callback);
        let stored = Rc::clone(&callback);
        let (watcher, initial) =
            Watcher::create(self, label, getter, Box::new(move |value: Value| stored(value)))?;
        callback(initial)?;
        Ok(watcher)
    }

    /// Subscribe an arbitrary getter. Whatever the getter reads during
    /// construction becomes the watcher's dependency set.
    pub fn watch_with(
        &self,
        label: impl Into<String>,
        getter: impl Fn(&ReactiveRoot) -> Result<Value> + 'static,
        callback: impl Fn(Value) -> Result<()> + 'static,
    ) -> Result<Rc<Watcher>> {
        Watcher::create(self, label.into(), Box::new(getter), Box::new(callback))
            .map(|(watcher, _)| watcher)
    }

    pub(crate) fn adopt(&self, watcher: Rc<Watcher>) {
        self.inner.watchers.borrow_mut().push(watcher);
    }

    fn install_computed(&self, name: String, definition: ComputedFn) -> Result<()> {
        let cache = self.inner.computed.clone();
        let key = name.clone();
        let getter: Getter = Box::new(move |root: &ReactiveRoot| definition(root));
        let callback: Callback = Box::new(move |value: Value| cache.set(&key, value).map(|_| ()));

        let (_, seed) = Watcher::create(self, format!("computed:{name}"), getter, callback)?;
        self.inner.computed.set(&name, seed)?;
        self.inner.computed_names.borrow_mut().push(name);
        Ok(())
    }

    // ── Accessors ───────────────────────────────────────────────────────

    #[must_use]
    pub fn data(&self) -> &ObservedNode {
        &self.inner.data
    }

    #[must_use]
    pub fn computed_cache(&self) -> &ObservedNode {
        &self.inner.computed
    }

    /// Cached value of a computed field, untracked.
    #[must_use]
    pub fn computed_value(&self, name: &str) -> Option<Value> {
        self.inner.computed.get_untracked(name)
    }

    #[must_use]
    pub fn computed_names(&self) -> Vec<String> {
        self.inner.computed_names.borrow().clone()
    }

    #[must_use]
    pub fn tracker(&self) -> &Tracker {
        &self.inner.tracker
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        self.inner.tracker.config()
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.inner.tracker.stats()
    }

    #[must_use]
    pub fn watcher_count(&self) -> usize {
        self.inner.watchers.borrow().len()
    }

    /// Untracked JSON snapshot of the data graph.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        self.inner.data.to_json()
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakReactiveRoot {
        WeakReactiveRoot {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Builder for [`ReactiveRoot`].
pub struct ReactiveRootBuilder {
    data: serde_json::Value,
    computed: Vec<(String, ComputedFn)>,
    own: Vec<(String, serde_json::Value)>,
    config: EngineConfig,
    hook: Option<FailureHook>,
}

impl Default for ReactiveRootBuilder {
    fn default() -> Self {
        Self {
            data: serde_json::Value::Object(serde_json::Map::new()),
            computed: Vec::new(),
            own: Vec::new(),
            config: EngineConfig::default(),
            hook: None,
        }
    }
}

impl fmt::Debug for ReactiveRootBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveRootBuilder")
            .field("data", &self.data)
            .field(
                "computed",
                &self.computed.iter().map(|(n, _)| n).collect::<Vec<_>>(),
            )
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ReactiveRootBuilder {
    /// Raw data. Must be a JSON object (`null` is treated as empty).
    #[must_use]
    pub fn data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// Declare a computed field. Definitions are evaluated in declaration
    /// order, so a definition may read computed fields declared before it.
    #[must_use]
    pub fn computed<F, V>(mut self, name: impl Into<String>, definition: F) -> Self
    where
        F: Fn(&ReactiveRoot) -> Result<V> + 'static,
        V: IntoObserved,
    {
        let definition: ComputedFn = Rc::new(move |root: &ReactiveRoot| {
            definition(root).map(|value| value.into_observed(root.tracker()))
        });
        self.computed.push((name.into(), definition));
        self
    }

    /// Declare an own field, resolved before data and computed fields.
    #[must_use]
    pub fn own_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.own.push((name.into(), value));
        self
    }

    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn failure_hook(mut self, hook: impl Fn(&ConsumerFailure) + 'static) -> Self {
        self.hook = Some(Rc::new(hook));
        self
    }

    /// Observe the data and install every computed field. Any error from a
    /// computed definition's first evaluation fails the build.
    pub fn build(self) -> Result<ReactiveRoot> {
        let tracker = Tracker::new(self.config);
        tracker.set_failure_hook(self.hook);

        let data = match tracker.observe(self.data) {
            Value::Node(node) if !node.is_array() => node,
            Value::Null => ObservedNode::empty_object(&tracker),
            other => {
                return Err(ReactiveError::DataNotObject {
                    found: other.kind(),
                });
            }
        };
        let computed = ObservedNode::empty_object(&tracker);

        let mut own = IndexMap::new();
        own.insert(OWN_DATA.to_owned(), Value::Node(data.clone()));
        own.insert(OWN_COMPUTED.to_owned(), Value::Node(computed.clone()));
        for (name, raw) in self.own {
            own.insert(name, tracker.observe(raw));
        }

        let root = ReactiveRoot {
            inner: Rc::new(RootInner {
                tracker,
                own,
                data,
                computed,
                computed_names: RefCell::new(Vec::new()),
                watchers: RefCell::new(Vec::new()),
            }),
        };

        for (name, definition) in self.computed {
            root.install_computed(name, definition)?;
        }

        tracing::debug!(
            message = "reactive.root.built",
            data_fields = root.inner.data.len(),
            computed_fields = root.inner.computed.len(),
            watchers = root.watcher_count()
        );
        Ok(root)
    }
}
