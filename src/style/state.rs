//! Named boolean states, the engine that owns them, and their controllers.
//!
//! A state is declared once per engine through [`StateEngine::add_state`],
//! which hands back the only [`StateController`] able to flip it. Listeners
//! can watch one state by name or every state.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::error::{Error, Result};
use crate::reactive::{Cause, Listeners, Subscription};

/// A named boolean condition with a priority. Higher priorities make rules
/// referencing the state more specific.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
    name: String,
    priority: i32,
}

impl State {
    pub fn new(name: impl Into<String>, priority: i32) -> Self {
        Self {
            name: name.into(),
            priority,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

// ---------------------------------------------------------------------------
// StateSet
// ---------------------------------------------------------------------------

/// A snapshot of an engine: every declared state with its priority and
/// whether it is active.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StateSet {
    states: BTreeMap<String, (i32, bool)>,
}

impl StateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or overwrite a state in the snapshot.
    pub fn with(mut self, state: &State, active: bool) -> Self {
        self.states
            .insert(state.name.clone(), (state.priority, active));
        self
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Whether `name` is declared and active.
    pub fn is_active(&self, name: &str) -> bool {
        self.states.get(name).is_some_and(|(_, active)| *active)
    }

    pub fn priority(&self, name: &str) -> Option<i32> {
        self.states.get(name).map(|(priority, _)| *priority)
    }

    /// Names of the active states, sorted.
    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.states
            .iter()
            .filter(|(_, (_, active))| *active)
            .map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateTransition {
    /// The state was added to the engine (inactive).
    Declared,
    Activated,
    Deactivated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateEvent {
    pub state: State,
    pub transition: StateTransition,
    pub cause: Cause,
}

/// Which states a listener hears about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateScope {
    Named(String),
    Any,
}

impl StateScope {
    pub fn named(name: impl Into<String>) -> Self {
        StateScope::Named(name.into())
    }

    fn matches(&self, state: &State) -> bool {
        match self {
            StateScope::Named(name) => name == state.name(),
            StateScope::Any => true,
        }
    }
}

// ---------------------------------------------------------------------------
// StateEngine
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EngineInner {
    states: RefCell<BTreeMap<String, (State, bool)>>,
    listeners: Listeners<StateEvent>,
}

/// Owner of a set of declared states. Clones share the same engine.
#[derive(Clone, Default)]
pub struct StateEngine {
    inner: Rc<EngineInner>,
}

impl fmt::Debug for StateEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateEngine")
            .field("states", &self.snapshot())
            .finish()
    }
}

impl StateEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `state` and return its controller.
    ///
    /// A name can be declared once per engine; a second declaration fails
    /// with [`Error::InvalidArgument`].
    pub fn add_state(&self, state: State) -> Result<StateController> {
        {
            let mut states = self.inner.states.borrow_mut();
            if states.contains_key(state.name()) {
                return Err(Error::invalid_argument(format!(
                    "state `{}` already has a controller",
                    state.name()
                )));
            }
            states.insert(state.name.clone(), (state.clone(), false));
        }
        trace!(state = state.name(), "state declared");
        let cause = Cause::root(format!("state `{state}` declared"));
        self.inner.listeners.fire(&StateEvent {
            state: state.clone(),
            transition: StateTransition::Declared,
            cause,
        });
        Ok(StateController {
            engine: self.clone(),
            state,
        })
    }

    /// Whether `name` is declared and currently active.
    pub fn is(&self, name: &str) -> bool {
        self.inner
            .states
            .borrow()
            .get(name)
            .is_some_and(|(_, active)| *active)
    }

    pub fn state(&self, name: &str) -> Option<State> {
        self.inner
            .states
            .borrow()
            .get(name)
            .map(|(state, _)| state.clone())
    }

    pub fn snapshot(&self) -> StateSet {
        let states = self.inner.states.borrow();
        StateSet {
            states: states
                .iter()
                .map(|(name, (state, active))| (name.clone(), (state.priority, *active)))
                .collect(),
        }
    }

    /// Listen to transitions of the states in `scope`.
    pub fn listen(
        &self,
        scope: StateScope,
        mut f: impl FnMut(&StateEvent) + 'static,
    ) -> Subscription {
        self.inner.listeners.add(move |event: &StateEvent| {
            if scope.matches(&event.state) {
                f(event);
            }
        })
    }

    fn set_active(&self, state: &State, active: bool, cause: Cause) -> bool {
        {
            let mut states = self.inner.states.borrow_mut();
            let Some((_, current)) = states.get_mut(state.name()) else {
                return false;
            };
            if *current == active {
                return false;
            }
            *current = active;
        }
        let transition = if active {
            StateTransition::Activated
        } else {
            StateTransition::Deactivated
        };
        trace!(state = state.name(), ?transition, "state changed");
        self.inner.listeners.fire(&StateEvent {
            state: state.clone(),
            transition,
            cause,
        });
        true
    }
}

// ---------------------------------------------------------------------------
// StateController
// ---------------------------------------------------------------------------

/// The single handle allowed to flip one declared state.
#[derive(Debug)]
pub struct StateController {
    engine: StateEngine,
    state: State,
}

impl StateController {
    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn is_active(&self) -> bool {
        self.engine.is(self.state.name())
    }

    /// Activate or deactivate the state. Returns `false` if nothing changed.
    pub fn set(&self, active: bool) -> bool {
        let verb = if active { "activated" } else { "deactivated" };
        self.set_with_cause(active, Cause::root(format!("state `{}` {verb}", self.state)))
    }

    pub fn set_with_cause(&self, active: bool, cause: Cause) -> bool {
        self.engine.set_active(&self.state, active, cause)
    }

    /// Flip the state; returns the new value.
    pub fn toggle(&self) -> bool {
        let active = !self.is_active();
        self.set(active);
        active
    }
}
