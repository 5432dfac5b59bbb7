//! Evaluation with injected dependent results.
//!
//! A [`SpoofingEvaluator`] computes exactly one node (the target). Its
//! dependents are never evaluated: their results are supplied up front. This
//! is how a change is recomputed from a dependent's old and new values
//! without re-reading the rest of the graph.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::eval::env::Environment;
use crate::eval::evaluator::{evaluate_with, EvaluationResult, Evaluator};
use crate::eval::value::{Value, ValueType};
use crate::expr::{ExprGraph, ExprId};

#[derive(Debug, Clone)]
pub struct SpoofingEvaluator {
    target: ExprId,
    injected: HashMap<ExprId, EvaluationResult>,
}

impl SpoofingEvaluator {
    pub fn new(target: ExprId) -> Self {
        Self {
            target,
            injected: HashMap::new(),
        }
    }

    /// Answer for `node` with `result` instead of evaluating it.
    pub fn inject(&mut self, node: ExprId, result: EvaluationResult) -> &mut Self {
        self.injected.insert(node, result);
        self
    }

    /// Shorthand for injecting a value.
    pub fn inject_value(&mut self, node: ExprId, value: Value) -> &mut Self {
        self.inject(node, EvaluationResult::Value(value))
    }

    pub fn target(&self) -> ExprId {
        self.target
    }
}

impl Evaluator for SpoofingEvaluator {
    fn evaluate(
        &self,
        graph: &ExprGraph,
        node: ExprId,
        env: &Environment,
        as_type: Option<ValueType>,
        with_values: bool,
    ) -> Result<EvaluationResult> {
        if let Some(result) = self.injected.get(&node) {
            let result = match result {
                EvaluationResult::Value(v) if !with_values => EvaluationResult::Type(v.value_type()),
                other => other.clone(),
            };
            return match as_type {
                Some(target) => result.coerce(target),
                None => Ok(result),
            };
        }
        if node == self.target {
            return evaluate_with(self, graph, node, env, as_type, with_values);
        }
        Err(Error::internal(format!(
            "no injected result for dependent {node:?} of {:?}",
            self.target
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinaryOp;

    #[test]
    fn uses_injected_dependents() {
        let mut graph = ExprGraph::new();
        let a = graph.variable("a");
        let b = graph.variable("b");
        let sum = graph.binary(BinaryOp::Add, a, b).unwrap();

        // The environment has no variables: only injected results are read.
        let env = Environment::new();
        let mut spoof = SpoofingEvaluator::new(sum);
        spoof.inject_value(a, Value::Int(40)).inject_value(b, Value::Int(2));
        let result = spoof.evaluate(&graph, sum, &env, None, true).unwrap();
        assert_eq!(result, EvaluationResult::Value(Value::Int(42)));
    }

    #[test]
    fn missing_injection_is_internal() {
        let mut graph = ExprGraph::new();
        let a = graph.variable("a");
        let one = graph.literal(1);
        let sum = graph.binary(BinaryOp::Add, a, one).unwrap();

        let mut spoof = SpoofingEvaluator::new(sum);
        spoof.inject_value(a, Value::Int(1));
        let err = spoof
            .evaluate(&graph, sum, &Environment::new(), None, true)
            .unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn type_only_through_injected_values() {
        let mut graph = ExprGraph::new();
        let a = graph.variable("a");
        let neg = graph.unary(crate::expr::UnaryOp::Neg, a).unwrap();
        let mut spoof = SpoofingEvaluator::new(neg);
        spoof.inject_value(a, Value::Float(1.5));
        let result = spoof
            .evaluate(&graph, neg, &Environment::new(), None, false)
            .unwrap();
        assert_eq!(result, EvaluationResult::Type(ValueType::Float));
    }
}
