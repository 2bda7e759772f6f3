#![forbid(unsafe_code)]

//! Synchronous change notifications.
//!
//! # Design
//!
//! [`NotificationCenter`] is a cloneable handle to one shared subscriber
//! list. Subscribers are held weakly; the strong reference lives in the
//! [`Subscription`] guard returned by [`NotificationCenter::subscribe`], so
//! dropping the guard is the only way to unsubscribe.
//!
//! # Invariants
//!
//! 1. Subscribers run in registration order, on the caller's thread, before
//!    `notify` returns.
//! 2. Dead subscribers are pruned lazily during `notify`.
//!
//! # Failure Modes
//!
//! - **Re-entrant subscribe**: subscribing from inside a callback is allowed;
//!   the new subscriber only sees later events.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use pdm_core::{FieldHandle, ObjectId};
use tracing::trace;

/// Something observers may want to redraw for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PdmEvent {
    /// A field's content changed through a command.
    FieldChanged {
        field: FieldHandle,
        old: String,
        new: String,
    },
    ObjectAdded {
        parent: FieldHandle,
        object: ObjectId,
    },
    /// `object` was removed from `parent`; the id is no longer alive.
    ObjectRemoved {
        parent: FieldHandle,
        object: ObjectId,
    },
    SelectionChanged {
        level: i32,
    },
    UndoStackChanged {
        can_undo: bool,
        can_redo: bool,
    },
}

type CallbackRc = Rc<dyn Fn(&PdmEvent)>;
type CallbackWeak = Weak<dyn Fn(&PdmEvent)>;

/// Shared, single-threaded event fan-out.
#[derive(Clone, Default)]
pub struct NotificationCenter {
    subscribers: Rc<RefCell<Vec<CallbackWeak>>>,
}

impl fmt::Debug for NotificationCenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationCenter")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl NotificationCenter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `callback` for every future event.
    ///
    /// The callback stays registered for as long as the returned guard lives.
    #[must_use = "dropping the Subscription unsubscribes immediately"]
    pub fn subscribe(&self, callback: impl Fn(&PdmEvent) + 'static) -> Subscription {
        let strong: CallbackRc = Rc::new(callback);
        self.subscribers.borrow_mut().push(Rc::downgrade(&strong));
        Subscription { _guard: strong }
    }

    /// Deliver `event` to every live subscriber.
    pub fn notify(&self, event: &PdmEvent) {
        let callbacks: Vec<CallbackRc> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|w| w.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        trace!(target: "pdm.notify", ?event, receivers = callbacks.len(), "notify");
        for callback in &callbacks {
            callback(event);
        }
    }

    /// Registered subscribers, including dead ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

/// RAII guard for a subscriber callback.
pub struct Subscription {
    _guard: CallbackRc,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Collects every event it sees. Handy for assertions.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Rc<RefCell<Vec<PdmEvent>>>,
}

impl EventLog {
    /// Start recording everything `center` publishes.
    #[must_use]
    pub fn attach(center: &NotificationCenter) -> (Self, Subscription) {
        let log = Self::default();
        let sink = Rc::clone(&log.events);
        let subscription = center.subscribe(move |event| sink.borrow_mut().push(event.clone()));
        (log, subscription)
    }

    #[must_use]
    pub fn events(&self) -> Vec<PdmEvent> {
        self.events.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }

    /// Number of `SelectionChanged` events for `level`.
    #[must_use]
    pub fn selection_changes(&self, level: i32) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| matches!(e, PdmEvent::SelectionChanged { level: l } if *l == level))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn subscribers_run_in_registration_order() {
        let center = NotificationCenter::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (Rc::clone(&order), Rc::clone(&order));
        let _s1 = center.subscribe(move |_| a.borrow_mut().push(1));
        let _s2 = center.subscribe(move |_| b.borrow_mut().push(2));

        center.notify(&PdmEvent::SelectionChanged { level: 0 });
        assert_eq!(*order.borrow(), vec![1, 2]);
    }

    #[test]
    fn dropping_the_guard_unsubscribes() {
        let center = NotificationCenter::new();
        let hits = Rc::new(Cell::new(0));
        let counter = Rc::clone(&hits);
        let sub = center.subscribe(move |_| counter.set(counter.get() + 1));

        center.notify(&PdmEvent::SelectionChanged { level: 1 });
        drop(sub);
        center.notify(&PdmEvent::SelectionChanged { level: 1 });
        assert_eq!(hits.get(), 1);
        assert_eq!(center.subscriber_count(), 0);
    }

    #[test]
    fn clones_share_subscribers() {
        let center = NotificationCenter::new();
        let (log, _sub) = EventLog::attach(&center);
        let other = center.clone();

        other.notify(&PdmEvent::UndoStackChanged {
            can_undo: true,
            can_redo: false,
        });
        assert_eq!(log.len(), 1);
        assert_eq!(log.selection_changes(0), 0);
    }
}
