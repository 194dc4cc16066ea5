#![forbid(unsafe_code)]

//! Runtime: the dependency-tracking reactive engine.
//!
//! See [`reactive`] for the architecture. The most common entry point is
//! [`ReactiveRoot::builder`].

pub mod reactive;

pub use reactive::{
    Consumer, ConsumerFailure, ConsumerId, EngineStats, FailureHook, IntoObserved, Lookup,
    NotifyReport, ObservedNode, ReactiveRoot, ReactiveRootBuilder, SubscriberRegistry, Tracker,
    UpdateOutcome, Value, Watcher, WeakReactiveRoot,
};
pub use rvm_core::{EngineConfig, Path, PathFailure, ReactiveError, Result};
