//! `Observable<T>`: a value container that notifies subscribers of
//! old/new transitions.
//!
//! Single-threaded and synchronous, like the rest of the reactive layer: a
//! `set` delivers the change to every subscriber (and, depth-first, to
//! everything those subscribers change) before returning. Value changes and
//! failures travel on the same channel, [`ObservableEvent`].

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::cause::Cause;
use super::listeners::{Listeners, Subscription};
use crate::error::Error;

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A value transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent<T> {
    pub old: T,
    pub new: T,
    pub cause: Cause,
}

/// A failure reported on an observable's error channel.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureEvent {
    pub error: Error,
    pub cause: Cause,
}

/// Everything a subscriber can receive.
#[derive(Debug, Clone, PartialEq)]
pub enum ObservableEvent<T> {
    Changed(ChangeEvent<T>),
    Failed(FailureEvent),
}

impl<T> ObservableEvent<T> {
    /// The cause of this event, whichever kind it is.
    pub fn cause(&self) -> &Cause {
        match self {
            ObservableEvent::Changed(change) => &change.cause,
            ObservableEvent::Failed(failure) => &failure.cause,
        }
    }
}

// ---------------------------------------------------------------------------
// Observable
// ---------------------------------------------------------------------------

struct ObservableInner<T: 'static> {
    value: RefCell<T>,
    last_error: RefCell<Option<Error>>,
    listeners: Listeners<ObservableEvent<T>>,
}

/// A shared, observable value. Clones refer to the same value.
pub struct Observable<T: 'static> {
    inner: Rc<ObservableInner<T>>,
}

impl<T: 'static> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &*self.inner.value.borrow())
            .field("subscribers", &self.inner.listeners.len())
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                last_error: RefCell::new(None),
                listeners: Listeners::new(),
            }),
        }
    }

    /// Current value (cloned).
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the current value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Replace the value, starting a new causal chain. Returns `false` (and
    /// notifies nobody) if the value is unchanged and no failure is pending.
    pub fn set(&self, value: T) -> bool {
        self.set_with_cause(value, Cause::root("value set"))
    }

    /// Replace the value as a consequence of `cause`.
    pub fn set_with_cause(&self, value: T, cause: Cause) -> bool {
        if *self.inner.value.borrow() == value && self.inner.last_error.borrow().is_none() {
            return false;
        }
        let old = self.inner.value.replace(value.clone());
        self.publish(old, value, cause)
    }

    /// Store `new` and deliver an `old -> new` transition computed elsewhere.
    ///
    /// Nothing is delivered when the two are equal, except when `new` clears
    /// a reported failure: subscribers that saw `Failed` always see the
    /// recovery, even as an `old == new` change.
    pub(crate) fn publish(&self, old: T, new: T, cause: Cause) -> bool {
        *self.inner.value.borrow_mut() = new.clone();
        let recovered = self.inner.last_error.borrow_mut().take().is_some();
        if old == new && !recovered {
            return false;
        }
        self.inner
            .listeners
            .fire(&ObservableEvent::Changed(ChangeEvent { old, new, cause }));
        true
    }

    /// Report a failure on the error channel. The last good value is kept.
    pub fn fail(&self, error: Error, cause: Cause) {
        *self.inner.last_error.borrow_mut() = Some(error.clone());
        self.inner
            .listeners
            .fire(&ObservableEvent::Failed(FailureEvent { error, cause }));
    }

    /// The failure reported since the last successful value, if any.
    pub fn last_error(&self) -> Option<Error> {
        self.inner.last_error.borrow().clone()
    }

    /// Receive every event: value changes and failures.
    pub fn subscribe(&self, f: impl FnMut(&ObservableEvent<T>) + 'static) -> Subscription {
        self.inner.listeners.add(f)
    }

    /// Receive value changes only.
    pub fn on_change(&self, mut f: impl FnMut(&ChangeEvent<T>) + 'static) -> Subscription {
        self.inner.listeners.add(move |event| {
            if let ObservableEvent::Changed(change) = event {
                f(change);
            }
        })
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.listeners.len()
    }

    /// Whether both handles refer to the same value.
    pub fn ptr_eq(&self, other: &Observable<T>) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}
