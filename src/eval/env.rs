//! Evaluation environments: named observable variables.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use crate::eval::value::Value;
use crate::reactive::{Cause, Observable};

thread_local! {
    static NEXT_ENV: Cell<u64> = const { Cell::new(1) };
}

/// Identity of an [`Environment`]; clones share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EnvId(u64);

/// The set of variables an expression is evaluated against.
///
/// Every variable is an [`Observable`], so rebinding a name to a new value
/// propagates through every observable evaluation that reads it.
#[derive(Debug, Clone)]
pub struct Environment {
    id: EnvId,
    vars: Rc<RefCell<HashMap<String, Observable<Value>>>>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        let id = NEXT_ENV.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            id: EnvId(id),
            vars: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn id(&self) -> EnvId {
        self.id
    }

    /// Bind `name` to an existing observable, replacing any earlier binding.
    pub fn define(&self, name: impl Into<String>, value: Observable<Value>) {
        self.vars.borrow_mut().insert(name.into(), value);
    }

    /// Set `name` to `value`, creating the variable if it does not exist.
    /// Existing observers of the variable see the change.
    pub fn bind(&self, name: impl Into<String>, value: impl Into<Value>) -> Observable<Value> {
        let name = name.into();
        let value = value.into();
        let existing = self.vars.borrow().get(&name).cloned();
        match existing {
            Some(var) => {
                var.set(value);
                var
            }
            None => {
                let var = Observable::new(value);
                self.vars.borrow_mut().insert(name, var.clone());
                var
            }
        }
    }

    /// Like [`bind`](Self::bind), attributing the change to `cause`.
    /// Returns whether the value changed.
    pub fn bind_with_cause(&self, name: &str, value: Value, cause: Cause) -> bool {
        let existing = self.lookup(name);
        match existing {
            Some(var) => var.set_with_cause(value, cause),
            None => {
                self.define(name, Observable::new(value));
                true
            }
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Observable<Value>> {
        self.vars.borrow().get(name).cloned()
    }

    /// Current value of `name`.
    pub fn get(&self, name: &str) -> Option<Value> {
        self.lookup(name).map(|var| var.get())
    }

    /// Bound names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.vars.borrow().keys().cloned().collect();
        names.sort();
        names
    }
}
