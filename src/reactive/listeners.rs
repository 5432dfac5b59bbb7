//! Listener registry with revocable subscriptions.
//!
//! Delivery is synchronous, in registration order, and tolerates listeners
//! that subscribe, revoke, or fire further events from inside their callback.
//! A listener is not re-entered by an event it provoked itself.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

struct ListenerEntry<E> {
    id: u64,
    /// Taken out while the callback runs so no borrow is held across it.
    callback: Option<Box<dyn FnMut(&E)>>,
}

struct ListenerSet<E> {
    next_id: u64,
    entries: Vec<ListenerEntry<E>>,
}

/// Object-safe view of a listener set used by [`Subscription`].
trait Revocable {
    fn remove(&self, id: u64) -> bool;
    fn contains(&self, id: u64) -> bool;
}

impl<E> Revocable for RefCell<ListenerSet<E>> {
    fn remove(&self, id: u64) -> bool {
        let removed = {
            let mut set = self.borrow_mut();
            set.entries
                .iter()
                .position(|e| e.id == id)
                .map(|idx| set.entries.remove(idx))
        };
        // Drop the callback outside the borrow: it may own other observables.
        removed.is_some()
    }

    fn contains(&self, id: u64) -> bool {
        self.borrow().entries.iter().any(|e| e.id == id)
    }
}

/// A set of callbacks receiving `&E`. Clones share the same set.
pub struct Listeners<E: 'static> {
    set: Rc<RefCell<ListenerSet<E>>>,
}

impl<E: 'static> Clone for Listeners<E> {
    fn clone(&self) -> Self {
        Self {
            set: Rc::clone(&self.set),
        }
    }
}

impl<E: 'static> Default for Listeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> fmt::Debug for Listeners<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listeners").field("len", &self.len()).finish()
    }
}

impl<E: 'static> Listeners<E> {
    pub fn new() -> Self {
        Self {
            set: Rc::new(RefCell::new(ListenerSet {
                next_id: 0,
                entries: Vec::new(),
            })),
        }
    }

    /// Register a callback. It stays registered until the returned
    /// [`Subscription`] is revoked.
    pub fn add(&self, callback: impl FnMut(&E) + 'static) -> Subscription {
        let id = {
            let mut set = self.set.borrow_mut();
            let id = set.next_id;
            set.next_id += 1;
            set.entries.push(ListenerEntry {
                id,
                callback: Some(Box::new(callback)),
            });
            id
        };
        let weak: Weak<dyn Revocable> = Rc::downgrade(&self.set) as Weak<dyn Revocable>;
        Subscription {
            set: Some(weak),
            id,
        }
    }

    /// Deliver `event` to every listener registered when delivery starts.
    pub fn fire(&self, event: &E) {
        let ids: Vec<u64> = self.set.borrow().entries.iter().map(|e| e.id).collect();
        for id in ids {
            let callback = {
                let mut set = self.set.borrow_mut();
                set.entries
                    .iter_mut()
                    .find(|e| e.id == id)
                    .and_then(|e| e.callback.take())
            };
            // Revoked before its turn, or already running further up the stack.
            let Some(mut callback) = callback else {
                continue;
            };

            callback(event);

            let orphan = {
                let mut set = self.set.borrow_mut();
                match set.entries.iter_mut().find(|e| e.id == id) {
                    Some(entry) => {
                        entry.callback = Some(callback);
                        None
                    }
                    None => Some(callback),
                }
            };
            drop(orphan);
        }
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.set.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// Handle to a registered listener.
///
/// Dropping a subscription does **not** revoke it; call [`Subscription::revoke`].
pub struct Subscription {
    set: Option<Weak<dyn Revocable>>,
    id: u64,
}

impl Subscription {
    /// A subscription to nothing. Always inactive.
    pub fn detached() -> Self {
        Self { set: None, id: 0 }
    }

    /// Stop delivery to this listener. Safe to call during delivery and more
    /// than once.
    pub fn revoke(&self) {
        if let Some(set) = self.set.as_ref().and_then(Weak::upgrade) {
            set.remove(self.id);
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.set
            .as_ref()
            .and_then(Weak::upgrade)
            .is_some_and(|set| set.contains(self.id))
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
