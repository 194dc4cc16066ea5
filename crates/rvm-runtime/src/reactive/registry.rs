#![forbid(unsafe_code)]

//! Per-field subscriber registries.
//!
//! # Design
//!
//! A [`SubscriberRegistry`] is a shared, insertion-ordered list of consumers.
//! Entries are held as `Weak` references: the owning [`ReactiveRoot`] keeps
//! its watchers alive, and an entry whose consumer is gone is skipped and
//! pruned during notification.
//!
//! # Performance
//!
//! | Operation      | Complexity                  |
//! |----------------|-----------------------------|
//! | `register()`   | O(S) where S = subscribers  |
//! | `notify_all()` | O(S) plus the updates       |
//!
//! Registration is a linear identity scan; registries are per field, so S
//! stays small in practice.
//!
//! [`ReactiveRoot`]: super::root::ReactiveRoot

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use rvm_core::{ReactiveError, Result};

use super::tracker::{ConsumerFailure, Tracker};

static NEXT_CONSUMER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a consumer. Unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerId(u64);

impl ConsumerId {
    /// Allocate a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_CONSUMER_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// Something a registry can notify.
pub trait Consumer {
    fn id(&self) -> ConsumerId;

    /// Human-readable name used in logs and failure reports.
    fn label(&self) -> &str;

    /// Re-run the computation after a dependency was written.
    fn update(&self) -> Result<UpdateOutcome>;
}

/// What a successful [`Consumer::update`] call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The computation ran.
    Ran,
    /// The consumer was already running; it queued a re-run instead.
    Deferred,
    /// The consumer's owner is gone and nothing ran.
    Detached,
}

struct Entry {
    id: ConsumerId,
    consumer: Weak<dyn Consumer>,
}

/// Outcome of one [`SubscriberRegistry::notify_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Consumers whose computation ran.
    pub updated: usize,
    /// Consumers that were mid-run and queued a re-run.
    pub deferred: usize,
    pub failed: usize,
}

impl NotifyReport {
    /// Fold another pass's counts into this one.
    pub fn absorb(&mut self, other: Self) {
        self.updated += other.updated;
        self.deferred += other.deferred;
        self.failed += other.failed;
    }
}

/// The consumers interested in one field. Cloning shares the same list.
#[derive(Clone, Default)]
pub struct SubscriberRegistry {
    entries: Rc<RefCell<Vec<Entry>>>,
}

impl fmt::Debug for SubscriberRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<u64> = self.entries.borrow().iter().map(|e| e.id.raw()).collect();
        f.debug_struct("SubscriberRegistry")
            .field("subscribers", &ids)
            .finish()
    }
}

impl SubscriberRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `consumer` unless it is already registered. Returns whether it
    /// was added.
    pub fn register(&self, consumer: &Rc<dyn Consumer>) -> bool {
        let id = consumer.id();
        let mut entries = self.entries.borrow_mut();
        if entries.iter().any(|e| e.id == id) {
            return false;
        }
        entries.push(Entry {
            id,
            consumer: Rc::downgrade(consumer),
        });
        true
    }

    #[must_use]
    pub fn contains(&self, id: ConsumerId) -> bool {
        self.entries.borrow().iter().any(|e| e.id == id)
    }

    /// Registered entries, including dead ones not yet pruned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Call `update()` on every live consumer in registration order.
    ///
    /// The list is snapshotted first, so consumers registered while this
    /// pass runs are first notified by the next write. The capture slot is
    /// cleared for the whole pass. Failures are reported to `tracker` and do
    /// not stop the pass. Only updates that actually ran count towards
    /// `updated` and the tracker's notification total.
    pub fn notify_all(&self, tracker: &Tracker) -> NotifyReport {
        let live: Vec<Rc<dyn Consumer>> = {
            let mut entries = self.entries.borrow_mut();
            entries.retain(|e| e.consumer.strong_count() > 0);
            entries.iter().filter_map(|e| e.consumer.upgrade()).collect()
        };

        let mut report = NotifyReport::default();
        tracker.untracked(|| {
            for consumer in &live {
                match run_update(consumer.as_ref(), tracker.config().catch_panics) {
                    Ok(UpdateOutcome::Ran) => {
                        report.updated += 1;
                        tracker.record_notification();
                    }
                    Ok(UpdateOutcome::Deferred) => report.deferred += 1,
                    Ok(UpdateOutcome::Detached) => {}
                    Err(error) => {
                        report.failed += 1;
                        tracker.report_failure(ConsumerFailure {
                            consumer: consumer.id(),
                            label: consumer.label().to_owned(),
                            error,
                        });
                    }
                }
            }
        });
        report
    }
}

fn run_update(consumer: &dyn Consumer, catch_panics: bool) -> Result<UpdateOutcome> {
    if !catch_panics {
        return consumer.update();
    }
    panic::catch_unwind(AssertUnwindSafe(|| consumer.update())).unwrap_or_else(|payload| {
        Err(ReactiveError::CallbackPanicked {
            message: panic_message(payload.as_ref()),
        })
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct Counter {
        id: ConsumerId,
        hits: Rc<Cell<u32>>,
        fail: bool,
    }

    impl Consumer for Counter {
        fn id(&self) -> ConsumerId {
            self.id
        }

        fn label(&self) -> &str {
            "counter"
        }

        fn update(&self) -> Result<UpdateOutcome> {
            self.hits.set(self.hits.get() + 1);
            if self.fail {
                Err(ReactiveError::callback("counter refused"))
            } else {
                Ok(UpdateOutcome::Ran)
            }
        }
    }

    fn counter(hits: &Rc<Cell<u32>>, fail: bool) -> Rc<dyn Consumer> {
        Rc::new(Counter {
            id: ConsumerId::next(),
            hits: Rc::clone(hits),
            fail,
        })
    }

    #[test]
    fn register_is_idempotent() {
        let registry = SubscriberRegistry::new();
        let hits = Rc::new(Cell::new(0));
        let c = counter(&hits, false);

        assert!(registry.register(&c));
        assert!(!registry.register(&c));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(c.id()));

        registry.notify_all(&Tracker::default());
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn ids_are_unique() {
        let a = ConsumerId::next();
        let b = ConsumerId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn notification_order_is_registration_order() {
        let registry = SubscriberRegistry::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        struct Named(ConsumerId, char, Rc<RefCell<Vec<char>>>);
        impl Consumer for Named {
            fn id(&self) -> ConsumerId {
                self.0
            }
            fn label(&self) -> &str {
                "named"
            }
            fn update(&self) -> Result<UpdateOutcome> {
                self.2.borrow_mut().push(self.1);
                Ok(UpdateOutcome::Ran)
            }
        }

        let subs: Vec<Rc<dyn Consumer>> = ['A', 'B', 'C']
            .into_iter()
            .map(|ch| Rc::new(Named(ConsumerId::next(), ch, Rc::clone(&log))) as Rc<dyn Consumer>)
            .collect();
        for sub in &subs {
            registry.register(sub);
        }

        registry.notify_all(&Tracker::default());
        assert_eq!(*log.borrow(), vec!['A', 'B', 'C']);
    }

    #[test]
    fn failure_does_not_stop_fan_out() {
        let registry = SubscriberRegistry::new();
        let bad_hits = Rc::new(Cell::new(0));
        let good_hits = Rc::new(Cell::new(0));
        let bad = counter(&bad_hits, true);
        let good = counter(&good_hits, false);
        registry.register(&bad);
        registry.register(&good);

        let tracker = Tracker::default();
        let report = registry.notify_all(&tracker);

        assert_eq!(
            report,
            NotifyReport {
                updated: 1,
                deferred: 0,
                failed: 1
            }
        );
        assert_eq!(bad_hits.get(), 1);
        assert_eq!(good_hits.get(), 1);
        assert_eq!(tracker.stats().failures, 1);
        assert_eq!(tracker.stats().notifications, 1);
    }

    #[test]
    fn panicking_consumer_is_contained() {
        struct Panics(ConsumerId);
        impl Consumer for Panics {
            fn id(&self) -> ConsumerId {
                self.0
            }
            fn label(&self) -> &str {
                "panics"
            }
            fn update(&self) -> Result<UpdateOutcome> {
                panic!("update exploded")
            }
        }

        let registry = SubscriberRegistry::new();
        let hits = Rc::new(Cell::new(0));
        let panics: Rc<dyn Consumer> = Rc::new(Panics(ConsumerId::next()));
        let after = counter(&hits, false);
        registry.register(&panics);
        registry.register(&after);

        let tracker = Tracker::default();
        let messages = Rc::new(RefCell::new(Vec::new()));
        let messages_clone = Rc::clone(&messages);
        tracker.set_failure_hook(Some(Rc::new(move |f: &ConsumerFailure| {
            messages_clone.borrow_mut().push(f.error.to_string());
        })));

        let report = registry.notify_all(&tracker);
        assert_eq!(report.failed, 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(
            *messages.borrow(),
            vec!["callback panicked: update exploded".to_string()]
        );
    }

    #[test]
    fn dead_entries_are_skipped_and_pruned() {
        let registry = SubscriberRegistry::new();
        let hits = Rc::new(Cell::new(0));
        let keep = counter(&hits, false);
        {
            let dropped = counter(&hits, false);
            registry.register(&dropped);
        }
        registry.register(&keep);
        assert_eq!(registry.len(), 2);

        let report = registry.notify_all(&Tracker::default());
        assert_eq!(report.updated, 1);
        assert_eq!(hits.get(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn notify_runs_untracked() {
        struct SeesSlot(ConsumerId, Tracker, Rc<Cell<bool>>);
        impl Consumer for SeesSlot {
            fn id(&self) -> ConsumerId {
                self.0
            }
            fn label(&self) -> &str {
                "sees-slot"
            }
            fn update(&self) -> Result<UpdateOutcome> {
                self.2.set(self.1.is_capturing());
                Ok(UpdateOutcome::Ran)
            }
        }

        let tracker = Tracker::default();
        let saw_capture = Rc::new(Cell::new(true));
        let sub: Rc<dyn Consumer> = Rc::new(SeesSlot(
            ConsumerId::next(),
            tracker.clone(),
            Rc::clone(&saw_capture),
        ));
        let registry = SubscriberRegistry::new();
        registry.register(&sub);

        let outer = counter(&Rc::new(Cell::new(0)), false);
        tracker.capture(outer, || registry.notify_all(&tracker));
        assert!(!saw_capture.get());
    }

    #[test]
    fn deferred_and_detached_are_not_counted_as_updates() {
        struct Fixed(ConsumerId, UpdateOutcome);
        impl Consumer for Fixed {
            fn id(&self) -> ConsumerId {
                self.0
            }
            fn label(&self) -> &str {
                "fixed"
            }
            fn update(&self) -> Result<UpdateOutcome> {
                Ok(self.1)
            }
        }

        let registry = SubscriberRegistry::new();
        let subs: Vec<Rc<dyn Consumer>> = [
            UpdateOutcome::Ran,
            UpdateOutcome::Deferred,
            UpdateOutcome::Detached,
        ]
        .into_iter()
        .map(|outcome| Rc::new(Fixed(ConsumerId::next(), outcome)) as Rc<dyn Consumer>)
        .collect();
        for sub in &subs {
            registry.register(sub);
        }

        let tracker = Tracker::default();
        let report = registry.notify_all(&tracker);
        assert_eq!(
            report,
            NotifyReport {
                updated: 1,
                deferred: 1,
                failed: 0
            }
        );
        assert_eq!(tracker.stats().notifications, 1);
        assert_eq!(tracker.stats().failures, 0);
    }
}
