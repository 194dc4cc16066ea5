#![forbid(unsafe_code)]

//! The capture context shared by one reactive root and all of its nodes.
//!
//! # Design
//!
//! [`Tracker`] owns the "active consumer" slot. Instead of a process-wide
//! global, the slot lives behind an `Rc` that the root hands to every node it
//! observes, so two roots never see each other's captures.
//!
//! The slot is only ever changed through RAII scopes:
//!
//! - [`Tracker::capture`] installs a consumer for the duration of a closure.
//! - [`Tracker::untracked`] clears the slot for the duration of a closure.
//!
//! Both restore the previous slot value on exit, including on unwind, so a
//! watcher created from inside another watcher's getter does not clobber the
//! outer capture.
//!
//! # Failure Modes
//!
//! - **Failing consumer**: reported through [`Tracker::report_failure`],
//!   which logs at `warn`, bumps `failures`, and invokes the failure hook.
//! - **Panicking failure hook**: not caught; it unwinds through the write.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use rvm_core::{EngineConfig, ReactiveError};

use super::registry::{Consumer, ConsumerId};
use super::value::{IntoObserved, Value};

/// A consumer failure contained during notification.
#[derive(Debug)]
pub struct ConsumerFailure {
    pub consumer: ConsumerId,
    pub label: String,
    pub error: ReactiveError,
}

/// Observability hook for contained consumer failures.
pub type FailureHook = Rc<dyn Fn(&ConsumerFailure)>;

/// Monotonic engine counters (for diagnostics and tests).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Capture windows opened.
    pub captures: u64,
    /// New (consumer, field) registrations.
    pub registrations: u64,
    /// `update()` calls made by notification whose computation ran.
    pub notifications: u64,
    /// Failed `update()` calls contained by notification.
    pub failures: u64,
}

struct TrackerInner {
    active: RefCell<Option<Rc<dyn Consumer>>>,
    config: EngineConfig,
    hook: RefCell<Option<FailureHook>>,
    stats: Cell<EngineStats>,
}

/// Shared capture context. Cloning shares the same slot.
#[derive(Clone)]
pub struct Tracker {
    inner: Rc<TrackerInner>,
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("active", &self.active().map(|c| c.id()))
            .field("config", &self.inner.config)
            .field("stats", &self.stats())
            .finish()
    }
}

impl Default for Tracker {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Tracker {
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            inner: Rc::new(TrackerInner {
                active: RefCell::new(None),
                config,
                hook: RefCell::new(None),
                stats: Cell::new(EngineStats::default()),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Replace the failure hook. `None` restores log-only reporting.
    pub fn set_failure_hook(&self, hook: Option<FailureHook>) {
        *self.inner.hook.borrow_mut() = hook;
    }

    /// Observe a raw value against this tracker. Primitives pass through
    /// unchanged; objects and arrays become [`ObservedNode`]s.
    ///
    /// [`ObservedNode`]: super::node::ObservedNode
    pub fn observe(&self, raw: impl IntoObserved) -> Value {
        raw.into_observed(self)
    }

    /// The consumer currently capturing reads, if any.
    #[must_use]
    pub fn active(&self) -> Option<Rc<dyn Consumer>> {
        self.inner.active.borrow().clone()
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.inner.active.borrow().is_some()
    }

    /// Run `f` with `consumer` installed as the active consumer.
    pub fn capture<R>(&self, consumer: Rc<dyn Consumer>, f: impl FnOnce() -> R) -> R {
        tracing::trace!(
            message = "reactive.capture",
            consumer = consumer.id().raw(),
            label = consumer.label()
        );
        self.bump(|s| s.captures += 1);
        let _scope = SlotScope::enter(&self.inner.active, Some(consumer));
        f()
    }

    /// Run `f` with no active consumer.
    pub fn untracked<R>(&self, f: impl FnOnce() -> R) -> R {
        let _scope = SlotScope::enter(&self.inner.active, None);
        f()
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.inner.stats.get()
    }

    pub(crate) fn record_registration(&self) {
        self.bump(|s| s.registrations += 1);
    }

    pub(crate) fn record_notification(&self) {
        self.bump(|s| s.notifications += 1);
    }

    /// Log a contained failure and hand it to the failure hook.
    pub fn report_failure(&self, failure: ConsumerFailure) {
        self.bump(|s| s.failures += 1);
        tracing::warn!(
            message = "reactive.consumer_failed",
            consumer = failure.consumer.raw(),
            label = %failure.label,
            error = %failure.error
        );
        let hook = self.inner.hook.borrow().clone();
        if let Some(hook) = hook {
            hook(&failure);
        }
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn bump(&self, f: impl FnOnce(&mut EngineStats)) {
        let mut stats = self.inner.stats.get();
        f(&mut stats);
        self.inner.stats.set(stats);
    }
}

/// Restores the slot's previous occupant on drop.
struct SlotScope<'a> {
    slot: &'a RefCell<Option<Rc<dyn Consumer>>>,
    previous: Option<Rc<dyn Consumer>>,
}

impl<'a> SlotScope<'a> {
    fn enter(
        slot: &'a RefCell<Option<Rc<dyn Consumer>>>,
        next: Option<Rc<dyn Consumer>>,
    ) -> Self {
        let previous = slot.replace(next);
        Self { slot, previous }
    }
}

impl Drop for SlotScope<'_> {
    fn drop(&mut self) {
        *self.slot.borrow_mut() = self.previous.take();
    }
}
