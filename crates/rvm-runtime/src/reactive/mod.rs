#![forbid(unsafe_code)]

//! Dependency-tracking reactivity.
//!
//! This module records which computations read which fields of a mutable data
//! graph and re-runs exactly those computations when the fields are written:
//!
//! - [`Tracker`]: the capture context. Holds the single "active consumer"
//!   slot, the failure hook, and engine counters.
//! - [`SubscriberRegistry`]: the consumers interested in one field of one
//!   node.
//! - [`ObservedNode`] / [`Value`]: the observed data graph. Every object or
//!   array in the graph is an `ObservedNode`; primitives are stored as-is.
//! - [`Watcher`]: one computation (a path binding or a computed field).
//! - [`ReactiveRoot`]: owns data, computed cache, and watchers, and is the
//!   merged view handed to binders.
//!
//! # Architecture
//!
//! Everything is single-threaded and `Rc<RefCell<..>>`-based, so none of the
//! engine types are `Send`. A watcher captures its dependencies by running
//! its getter inside [`Tracker::capture`]; each node read during that window
//! registers the watcher with the registry of the field being read. A write
//! stores the (observed) value and synchronously notifies that field's
//! registry.
//!
//! # Invariants
//!
//! 1. Every object-valued field of an observed node is itself an observed
//!    node; wrapping happens at assignment, not on read.
//! 2. A consumer appears at most once in any registry.
//! 3. Registries notify in registration order, and a write returns only after
//!    every notified `update()` (including nested writes) has completed.
//! 4. The active slot is only set inside a capture window, and is cleared for
//!    the duration of every notification.
//! 5. A failing consumer never prevents the remaining consumers of the same
//!    write from running.
//!
//! # Known limitation
//!
//! A watcher's dependency set is the set of fields read during its
//! construction. Later updates re-read without capture, so a getter whose
//! control flow reaches new fields after a write does not start tracking
//! them. The same holds for replacement objects: after `b` is replaced, a
//! watcher on `b.c` still fires on writes to `b`, but direct writes to the new
//! object's `c` are not seen by it.

pub mod node;
pub mod registry;
pub mod root;
pub mod tracker;
pub mod value;
pub mod watcher;

pub use node::ObservedNode;
pub use registry::{Consumer, ConsumerId, NotifyReport, SubscriberRegistry, UpdateOutcome};
pub use root::{Lookup, ReactiveRoot, ReactiveRootBuilder, WeakReactiveRoot};
pub use tracker::{ConsumerFailure, EngineStats, FailureHook, Tracker};
pub use value::{IntoObserved, Value};
pub use watcher::Watcher;
