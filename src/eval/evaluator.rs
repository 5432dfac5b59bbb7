//! The `Evaluator` seam and the standard recursive evaluator.

use crate::error::{Error, Result};
use crate::eval::env::Environment;
use crate::eval::ops;
use crate::eval::value::{Value, ValueType};
use crate::expr::{ExprGraph, ExprId, ExprKind};

/// What an evaluation produced: a type only (`with_values == false`) or a
/// concrete value.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationResult {
    Type(ValueType),
    Value(Value),
}

impl EvaluationResult {
    pub fn value_type(&self) -> ValueType {
        match self {
            EvaluationResult::Type(t) => *t,
            EvaluationResult::Value(v) => v.value_type(),
        }
    }

    /// The computed value. Asking a type-only result for a value is a wiring
    /// error.
    pub fn into_value(self) -> Result<Value> {
        match self {
            EvaluationResult::Value(v) => Ok(v),
            EvaluationResult::Type(t) => Err(Error::internal(format!(
                "a type-only result ({t}) was used as a value"
            ))),
        }
    }

    /// Convert to `target`, failing if the type does not coerce.
    pub fn coerce(self, target: ValueType) -> Result<EvaluationResult> {
        match self {
            EvaluationResult::Value(v) => v.coerce(target).map(EvaluationResult::Value),
            EvaluationResult::Type(t) if t.can_coerce_to(target) => {
                Ok(EvaluationResult::Type(target))
            }
            EvaluationResult::Type(t) => Err(Error::evaluation(format!(
                "cannot convert {t} to {target}"
            ))),
        }
    }
}

/// Computes the type or value of a node in an environment.
pub trait Evaluator {
    /// Evaluate `node`. With `with_values == false` only the result type is
    /// computed. With `as_type` set, the result is converted to that type.
    fn evaluate(
        &self,
        graph: &ExprGraph,
        node: ExprId,
        env: &Environment,
        as_type: Option<ValueType>,
        with_values: bool,
    ) -> Result<EvaluationResult>;
}

/// Evaluate one node, resolving its dependents through `evaluator`.
///
/// Every evaluator shares this node-level logic and differs only in how it
/// answers for dependents.
pub fn evaluate_with<E: Evaluator + ?Sized>(
    evaluator: &E,
    graph: &ExprGraph,
    node: ExprId,
    env: &Environment,
    as_type: Option<ValueType>,
    with_values: bool,
) -> Result<EvaluationResult> {
    let expr = graph.node(node)?;
    let result = match expr.kind() {
        ExprKind::Literal(v) if with_values => EvaluationResult::Value(v.clone()),
        ExprKind::Literal(v) => EvaluationResult::Type(v.value_type()),
        ExprKind::Variable(name) => {
            let value = env
                .get(name)
                .ok_or_else(|| Error::evaluation(format!("unknown variable `{name}`")))?;
            if with_values {
                EvaluationResult::Value(value)
            } else {
                EvaluationResult::Type(value.value_type())
            }
        }
        kind => {
            let deps = expr
                .dependents()
                .iter()
                .map(|&dep| evaluator.evaluate(graph, dep, env, None, with_values))
                .collect::<Result<Vec<_>>>()?;
            if with_values {
                let values = deps
                    .into_iter()
                    .map(EvaluationResult::into_value)
                    .collect::<Result<Vec<_>>>()?;
                EvaluationResult::Value(ops::apply(kind, &values)?)
            } else {
                let types: Vec<ValueType> = deps.iter().map(EvaluationResult::value_type).collect();
                EvaluationResult::Type(ops::result_type(kind, &types)?)
            }
        }
    };
    match as_type {
        Some(target) => result.coerce(target),
        None => Ok(result),
    }
}

/// Plain recursive evaluation against the environment's current values.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEvaluator;

impl Evaluator for StandardEvaluator {
    fn evaluate(
        &self,
        graph: &ExprGraph,
        node: ExprId,
        env: &Environment,
        as_type: Option<ValueType>,
        with_values: bool,
    ) -> Result<EvaluationResult> {
        evaluate_with(self, graph, node, env, as_type, with_values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{BinaryOp, Function};

    fn eval(graph: &ExprGraph, node: ExprId, env: &Environment) -> Result<Value> {
        StandardEvaluator
            .evaluate(graph, node, env, None, true)?
            .into_value()
    }

    #[test]
    fn evaluates_nested_expression() {
        let mut graph = ExprGraph::new();
        let a = graph.variable("a");
        let two = graph.literal(2);
        let sum = graph.binary(BinaryOp::Add, a, two).unwrap();
        let ten = graph.literal(10);
        let min = graph.call(Function::Min, vec![sum, ten]).unwrap();

        let env = Environment::new();
        env.bind("a", 3);
        assert_eq!(eval(&graph, min, &env).unwrap(), Value::Int(5));
        env.bind("a", 30);
        assert_eq!(eval(&graph, min, &env).unwrap(), Value::Int(10));
    }

    #[test]
    fn type_only_evaluation() {
        let mut graph = ExprGraph::new();
        let a = graph.variable("a");
        let half = graph.literal(0.5);
        let product = graph.binary(BinaryOp::Mul, a, half).unwrap();
        let env = Environment::new();
        env.bind("a", 4);

        let result = StandardEvaluator
            .evaluate(&graph, product, &env, None, false)
            .unwrap();
        assert_eq!(result, EvaluationResult::Type(ValueType::Float));
        assert!(result.into_value().unwrap_err().is_internal());
    }

    #[test]
    fn as_type_converts_or_fails() {
        let mut graph = ExprGraph::new();
        let one = graph.literal(1);
        let env = Environment::new();
        let as_float = StandardEvaluator
            .evaluate(&graph, one, &env, Some(ValueType::Float), true)
            .unwrap();
        assert_eq!(as_float, EvaluationResult::Value(Value::Float(1.0)));
        assert!(StandardEvaluator
            .evaluate(&graph, one, &env, Some(ValueType::Bool), true)
            .is_err());
    }

    #[test]
    fn unknown_variable_is_an_evaluation_failure() {
        let mut graph = ExprGraph::new();
        let missing = graph.variable("missing");
        let err = eval(&graph, missing, &Environment::new()).unwrap_err();
        assert!(matches!(err, Error::EvaluationFailure { .. }));
    }
}
