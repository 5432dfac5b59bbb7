//! Incremental, observable evaluation of expression graphs.
//!
//! An [`ObservableEvaluator`] turns a node into an `Observable<Value>` that
//! follows its dependents. When one dependent changes, the node is
//! recomputed twice through a [`SpoofingEvaluator`]: once with the
//! dependent's old value and once with its new value, every other dependent
//! answering from its cached observable. The resulting pair is published on
//! the node's own observable with a cause derived from the dependent's event.
//!
//! Dependents are applied one at a time. When a variable feeds two
//! dependents of the same node (`a = x + 1`, `b = x * 2`, node `a + b`), one
//! change of `x` publishes twice, and the first value mixes the new `a` with
//! the old `b`.
//!
//! Only typing is checked up front. A node whose value cannot be computed
//! yet still gets an observable: it holds the zero value of its type and
//! starts with the failure on its error channel.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::eval::env::{EnvId, Environment};
use crate::eval::evaluator::{EvaluationResult, Evaluator, StandardEvaluator};
use crate::eval::spoof::SpoofingEvaluator;
use crate::eval::value::{Value, ValueType};
use crate::expr::{ExprGraph, ExprId, ExprKind};
use crate::reactive::{Cause, Observable, ObservableEvent, Subscription};

type CacheKey = (ExprId, EnvId, Option<ValueType>);

/// An evaluation session over one expression graph.
///
/// Observables are memoized per (node, environment, requested type), so a
/// node shared by several parents is observed once. Every subscription the
/// session creates is revoked by [`dispose`](Self::dispose) or on drop.
pub struct ObservableEvaluator {
    graph: Rc<ExprGraph>,
    cache: RefCell<HashMap<CacheKey, Observable<Value>>>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl ObservableEvaluator {
    pub fn new(graph: Rc<ExprGraph>) -> Self {
        Self {
            graph,
            cache: RefCell::new(HashMap::new()),
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    pub fn graph(&self) -> &ExprGraph {
        &self.graph
    }

    /// One-shot evaluation against the environment's current values.
    pub fn evaluate(
        &self,
        node: ExprId,
        env: &Environment,
        as_type: Option<ValueType>,
        with_values: bool,
    ) -> Result<EvaluationResult> {
        StandardEvaluator.evaluate(&self.graph, node, env, as_type, with_values)
    }

    /// An observable tracking `node` in `env`, converted to `as_type` when
    /// given.
    ///
    /// Fails synchronously only if the node cannot be typed. Evaluation
    /// failures, including one in the first evaluation, are delivered on the
    /// observable's error channel.
    pub fn evaluate_observable(
        &self,
        node: ExprId,
        env: &Environment,
        as_type: Option<ValueType>,
    ) -> Result<Observable<Value>> {
        // Static pass: reject mistyped expressions before subscribing.
        self.evaluate(node, env, as_type, false)?;
        match as_type {
            None => self.observe(node, env),
            Some(target) => self.observe_as(node, env, target),
        }
    }

    /// Revoke every subscription and forget every memoized observable.
    /// Observables already handed out keep their last value.
    pub fn dispose(&self) {
        for subscription in self.subscriptions.borrow_mut().drain(..) {
            subscription.revoke();
        }
        self.cache.borrow_mut().clear();
    }

    /// Number of memoized observables in this session.
    pub fn observed_count(&self) -> usize {
        self.cache.borrow().len()
    }

    fn cached(&self, key: &CacheKey) -> Option<Observable<Value>> {
        self.cache.borrow().get(key).cloned()
    }

    fn observe(&self, node: ExprId, env: &Environment) -> Result<Observable<Value>> {
        let key = (node, env.id(), None);
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }

        let expr = self.graph.node(node)?;
        let observable = match expr.kind() {
            ExprKind::Literal(value) => Observable::new(value.clone()),
            ExprKind::Variable(name) => env
                .lookup(name)
                .ok_or_else(|| Error::evaluation(format!("unknown variable `{name}`")))?,
            _ => {
                let dependents = expr.dependents().to_vec();
                let observed = dependents
                    .iter()
                    .map(|&dep| Ok((dep, self.observe(dep, env)?)))
                    .collect::<Result<Vec<_>>>()?;
                self.derive(node, env, observed)?
            }
        };

        self.cache.borrow_mut().insert(key, observable.clone());
        Ok(observable)
    }

    /// Build the observable of a non-leaf node from its observed dependents.
    fn derive(
        &self,
        node: ExprId,
        env: &Environment,
        observed: Vec<(ExprId, Observable<Value>)>,
    ) -> Result<Observable<Value>> {
        let initial = match observed.iter().find_map(|(_, dep)| dep.last_error()) {
            Some(error) => Err(error),
            None => Recompute::current(node, &observed)
                .evaluate(&self.graph, node, env, None, true)
                .and_then(EvaluationResult::into_value),
        };
        let (own, failure) = match initial {
            Ok(value) => (Observable::new(value), None),
            Err(error) if error.is_internal() => return Err(error),
            Err(error) => {
                let value_type = self.evaluate(node, env, None, false)?.value_type();
                (Observable::new(Value::zero(value_type)), Some(error))
            }
        };

        let recompute = Rc::new(Recompute {
            graph: Rc::clone(&self.graph),
            node,
            env: env.clone(),
            observed,
            own: own.clone(),
        });

        let mut seen = Vec::new();
        for (dep, dep_observable) in &recompute.observed {
            if seen.contains(dep) {
                continue;
            }
            seen.push(*dep);
            let dep = *dep;
            let handler = Rc::clone(&recompute);
            let subscription = dep_observable.subscribe(move |event| handler.on_event(dep, event));
            self.subscriptions.borrow_mut().push(subscription);
        }

        if let Some(error) = failure {
            debug!(node = ?node, %error, "initial evaluation failed");
            own.fail(error, Cause::root(format!("{node:?} evaluated")));
        }
        Ok(own)
    }

    fn observe_as(
        &self,
        node: ExprId,
        env: &Environment,
        target: ValueType,
    ) -> Result<Observable<Value>> {
        let key = (node, env.id(), Some(target));
        if let Some(hit) = self.cached(&key) {
            return Ok(hit);
        }
        let source = self.observe(node, env)?;
        let converted = Observable::new(source.get().coerce(target)?);
        if let Some(error) = source.last_error() {
            converted.fail(error, Cause::root(format!("{node:?} converted to {target}")));
        }

        let sink = converted.clone();
        let subscription = source.subscribe(move |event| match event {
            ObservableEvent::Changed(change) => {
                let cause = change.cause.derive(format!("converted to {target}"));
                match change.new.clone().coerce(target) {
                    Ok(new) => {
                        sink.publish(sink.get(), new, cause);
                    }
                    Err(error) => sink.fail(error, cause),
                }
            }
            ObservableEvent::Failed(failure) => sink.fail(
                failure.error.clone(),
                failure.cause.derive(format!("converted to {target}")),
            ),
        });
        self.subscriptions.borrow_mut().push(subscription);
        self.cache.borrow_mut().insert(key, converted.clone());
        Ok(converted)
    }
}

impl Drop for ObservableEvaluator {
    fn drop(&mut self) {
        self.dispose();
    }
}

// ---------------------------------------------------------------------------
// Recomputation
// ---------------------------------------------------------------------------

/// Everything one node needs to recompute itself from a dependent's event.
struct Recompute {
    graph: Rc<ExprGraph>,
    node: ExprId,
    env: Environment,
    observed: Vec<(ExprId, Observable<Value>)>,
    own: Observable<Value>,
}

impl Recompute {
    /// A spoof answering every dependent with its cached current value.
    fn current(node: ExprId, observed: &[(ExprId, Observable<Value>)]) -> SpoofingEvaluator {
        let mut spoof = SpoofingEvaluator::new(node);
        for (dep, observable) in observed {
            spoof.inject_value(*dep, observable.get());
        }
        spoof
    }

    fn with_override(&self, dep: ExprId, value: &Value) -> Result<Value> {
        let mut spoof = Self::current(self.node, &self.observed);
        spoof.inject_value(dep, value.clone());
        spoof
            .evaluate(&self.graph, self.node, &self.env, None, true)?
            .into_value()
    }

    fn on_event(&self, dep: ExprId, event: &ObservableEvent<Value>) {
        match event {
            ObservableEvent::Changed(change) => {
                let cause = change
                    .cause
                    .derive(format!("{:?} recomputed from {dep:?}", self.node));
                let before = self.with_override(dep, &change.old);
                let after = self.with_override(dep, &change.new);
                match after {
                    Ok(new) => {
                        let old = before.unwrap_or_else(|_| self.own.get());
                        self.own.publish(old, new, cause);
                    }
                    Err(error) => self.report(error, cause),
                }
            }
            ObservableEvent::Failed(failure) => {
                let cause = failure
                    .cause
                    .derive(format!("{:?} failed through {dep:?}", self.node));
                self.own.fail(failure.error.clone(), cause);
            }
        }
    }

    fn report(&self, error: Error, cause: Cause) {
        if error.is_internal() {
            panic!("observable evaluation of {:?}: {error}", self.node);
        }
        debug!(node = ?self.node, %error, "expression evaluation failed");
        self.own.fail(error, cause);
    }
}
