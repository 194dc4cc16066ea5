#![forbid(unsafe_code)]

//! Dependency-recording consumers.
//!
//! # Design
//!
//! A [`Watcher`] pairs a getter (resolve a path, or evaluate a computed
//! definition) with a callback that receives the getter's result. On
//! construction the getter runs once inside [`Tracker::capture`]; that dry
//! read is the only time dependencies are recorded. Every later
//! [`update`](Consumer::update) re-runs the getter without capture and hands
//! the fresh value to the callback.
//!
//! Watchers are owned by their [`ReactiveRoot`]; registries and the watcher's
//! back-reference to the root are weak, so the root can be dropped without
//! leaking the graph.
//!
//! # Failure Modes
//!
//! - **Getter or callback error in `update()`**: returned to the notifying
//!   registry, which reports it and moves on to the next subscriber.
//! - **Re-notified while running** (the callback wrote one of the watcher's
//!   own dependencies): the watcher is marked pending and re-runs once the
//!   current run returns, up to `max_reentrant_runs` times, then fails with
//!   [`ReactiveError::ReentrancyLimit`].
//! - **Root dropped**: `update()` becomes a no-op.
//!
//! [`Tracker::capture`]: super::tracker::Tracker::capture

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use rvm_core::{ReactiveError, Result};

use super::registry::{Consumer, ConsumerId, UpdateOutcome};
use super::root::{ReactiveRoot, WeakReactiveRoot};
use super::value::Value;

/// Produces the watched value from the merged view.
pub type Getter = Box<dyn Fn(&ReactiveRoot) -> Result<Value>>;

/// Receives each freshly resolved value.
pub type Callback = Box<dyn Fn(Value) -> Result<()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Pending,
}

/// One computation subscribed to the fields it read during construction.
pub struct Watcher {
    id: ConsumerId,
    label: String,
    root: WeakReactiveRoot,
    getter: Getter,
    callback: Callback,
    state: Cell<RunState>,
    runs: Cell<u64>,
}

impl fmt::Debug for Watcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("state", &self.state.get())
            .field("runs", &self.runs.get())
            .finish_non_exhaustive()
    }
}

impl Watcher {
    /// Build a watcher, perform its capturing dry read, and hand ownership to
    /// `root`. Returns the watcher and the value seen by the dry read.
    pub(crate) fn create(
        root: &ReactiveRoot,
        label: String,
        getter: Getter,
        callback: Callback,
    ) -> Result<(Rc<Self>, Value)> {
        let watcher = Rc::new(Self {
            id: ConsumerId::next(),
            label,
            root: root.downgrade(),
            getter,
            callback,
            state: Cell::new(RunState::Idle),
            runs: Cell::new(0),
        });

        let consumer: Rc<dyn Consumer> = Rc::clone(&watcher) as Rc<dyn Consumer>;
        let value = root
            .tracker()
            .capture(consumer, || (watcher.getter)(root))?;

        tracing::debug!(
            message = "reactive.watcher.created",
            consumer = watcher.id.raw(),
            label = %watcher.label
        );
        root.adopt(Rc::clone(&watcher));
        Ok((watcher, value))
    }

    #[must_use]
    pub fn id(&self) -> ConsumerId {
        self.id
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// How many times the getter has run since construction (dry read
    /// excluded).
    #[must_use]
    pub fn runs(&self) -> u64 {
        self.runs.get()
    }

    /// Evaluate the getter now, without capture and without the callback.
    pub fn current(&self) -> Result<Value> {
        let root = self
            .root
            .upgrade()
            .ok_or_else(|| ReactiveError::unknown(self.label.clone()))?;
        root.tracker().untracked(|| (self.getter)(&root))
    }
}

/// Returns the watcher to `Idle` however the run ends.
struct RunScope<'a>(&'a Cell<RunState>);

impl Drop for RunScope<'_> {
    fn drop(&mut self) {
        self.0.set(RunState::Idle);
    }
}

impl Consumer for Watcher {
    fn id(&self) -> ConsumerId {
        self.id
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn update(&self) -> Result<UpdateOutcome> {
        let Some(root) = self.root.upgrade() else {
            return Ok(UpdateOutcome::Detached);
        };

        if self.state.get() != RunState::Idle {
            self.state.set(RunState::Pending);
            tracing::trace!(
                message = "reactive.watcher.deferred",
                consumer = self.id.raw(),
                label = %self.label
            );
            return Ok(UpdateOutcome::Deferred);
        }

        self.state.set(RunState::Running);
        let _scope = RunScope(&self.state);
        let limit = root.config().max_reentrant_runs;
        let mut round = 0;
        loop {
            round += 1;
            self.runs.set(self.runs.get() + 1);
            let value = root.tracker().untracked(|| (self.getter)(&root))?;
            (self.callback)(value)?;

            if self.state.get() != RunState::Pending {
                return Ok(UpdateOutcome::Ran);
            }
            if round >= limit {
                return Err(ReactiveError::ReentrancyLimit {
                    label: self.label.clone(),
                    limit,
                });
            }
            self.state.set(RunState::Running);
        }
    }
}
