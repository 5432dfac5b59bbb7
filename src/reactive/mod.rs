//! Reactive state: observables, causal chains, subscriptions.
//!
//! - [`Observable`]: a shared value that notifies old/new transitions.
//! - [`Cause`]: causal chain attached to every change.
//! - [`Listeners`] / [`Subscription`]: revocable, re-entrancy tolerant
//!   callback registry the other subsystems build on.

pub mod cause;
pub mod listeners;
pub mod observable;

pub use cause::{Cause, EventId};
pub use listeners::{Listeners, Subscription};
pub use observable::{ChangeEvent, FailureEvent, Observable, ObservableEvent};
