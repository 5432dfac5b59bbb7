//! Operator table shared by type inference and value evaluation.
//!
//! [`result_type`] and [`apply`] must agree: for dependents of types `ts`,
//! `apply` on values of those types yields a value of `result_type(ts)` or
//! fails.

use crate::error::{Error, Result};
use crate::eval::value::{Value, ValueType};
use crate::expr::node::{BinaryOp, ExprKind, Function, UnaryOp};

/// Infer the type a non-leaf node produces from its dependents' types.
pub(crate) fn result_type(kind: &ExprKind, deps: &[ValueType]) -> Result<ValueType> {
    use ValueType as T;
    match kind {
        ExprKind::Literal(v) => Ok(v.value_type()),
        ExprKind::Variable(name) => Err(Error::internal(format!(
            "variable `{name}` has no static operator type"
        ))),
        ExprKind::Unary(UnaryOp::Neg) => match deps {
            [t] if t.is_numeric() => Ok(*t),
            _ => Err(mismatch("-", deps)),
        },
        ExprKind::Unary(UnaryOp::Not) => match deps {
            [T::Bool] => Ok(T::Bool),
            _ => Err(mismatch("!", deps)),
        },
        ExprKind::Binary(op) => binary_type(*op, deps),
        ExprKind::Conditional => match deps {
            [T::Bool, a, b] if a == b => Ok(*a),
            [T::Bool, a, b] if a.is_numeric() && b.is_numeric() => Ok(T::Float),
            _ => Err(mismatch("?:", deps)),
        },
        ExprKind::Cast(target) => match deps {
            [t] if t.can_coerce_to(*target) => Ok(*target),
            _ => Err(mismatch("cast", deps)),
        },
        ExprKind::Call(function) => call_type(*function, deps),
    }
}

fn binary_type(op: BinaryOp, deps: &[ValueType]) -> Result<ValueType> {
    use ValueType as T;
    let [a, b] = deps else {
        return Err(mismatch(op.symbol(), deps));
    };
    match op {
        BinaryOp::Add if *a == T::Str || *b == T::Str => Ok(T::Str),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            numeric_type(op.symbol(), deps)
        }
        BinaryOp::Eq | BinaryOp::Ne => Ok(T::Bool),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            if (a.is_numeric() && b.is_numeric()) || (*a == T::Str && *b == T::Str) {
                Ok(T::Bool)
            } else {
                Err(mismatch(op.symbol(), deps))
            }
        }
        BinaryOp::And | BinaryOp::Or => match (a, b) {
            (T::Bool, T::Bool) => Ok(T::Bool),
            _ => Err(mismatch(op.symbol(), deps)),
        },
    }
}

fn call_type(function: Function, deps: &[ValueType]) -> Result<ValueType> {
    match function {
        Function::Abs => match deps {
            [t] if t.is_numeric() => Ok(*t),
            _ => Err(mismatch(function.name(), deps)),
        },
        Function::Min | Function::Max | Function::Clamp => numeric_type(function.name(), deps),
    }
}

/// `Int` if every operand is `Int`, `Float` if all are numeric.
fn numeric_type(op: &str, deps: &[ValueType]) -> Result<ValueType> {
    if deps.is_empty() || !deps.iter().all(|t| t.is_numeric()) {
        return Err(mismatch(op, deps));
    }
    if deps.iter().all(|t| *t == ValueType::Int) {
        Ok(ValueType::Int)
    } else {
        Ok(ValueType::Float)
    }
}

fn mismatch(op: &str, deps: &[ValueType]) -> Error {
    let types: Vec<String> = deps.iter().map(ToString::to_string).collect();
    Error::evaluation(format!(
        "operator `{op}` does not accept ({})",
        types.join(", ")
    ))
}

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

/// Compute a non-leaf node's value from its dependents' values.
pub(crate) fn apply(kind: &ExprKind, deps: &[Value]) -> Result<Value> {
    let types: Vec<ValueType> = deps.iter().map(Value::value_type).collect();
    let ty = result_type(kind, &types)?;
    match kind {
        ExprKind::Literal(v) => Ok(v.clone()),
        ExprKind::Variable(name) => Err(Error::internal(format!(
            "variable `{name}` cannot be applied"
        ))),
        ExprKind::Unary(UnaryOp::Neg) => match &deps[0] {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| Error::evaluation("integer overflow in negation")),
            Value::Float(x) => Ok(Value::Float(-x)),
            other => Err(mismatch("-", &[other.value_type()])),
        },
        ExprKind::Unary(UnaryOp::Not) => Ok(Value::Bool(!deps[0].as_bool().unwrap_or(false))),
        ExprKind::Binary(op) => apply_binary(*op, &deps[0], &deps[1], ty),
        ExprKind::Conditional => {
            let branch = if deps[0].as_bool().unwrap_or(false) {
                &deps[1]
            } else {
                &deps[2]
            };
            branch.clone().coerce(ty)
        }
        ExprKind::Cast(target) => deps[0].clone().coerce(*target),
        ExprKind::Call(function) => apply_call(*function, deps, ty),
    }
}

fn apply_binary(op: BinaryOp, a: &Value, b: &Value, ty: ValueType) -> Result<Value> {
    match op {
        BinaryOp::Add if ty == ValueType::Str => Ok(Value::Str(format!("{a}{b}"))),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            arithmetic(op, a, b)
        }
        BinaryOp::Eq => Ok(Value::Bool(loose_eq(a, b))),
        BinaryOp::Ne => Ok(Value::Bool(!loose_eq(a, b))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (a, b) {
                (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
                _ => a.as_f64().zip(b.as_f64()).and_then(|(x, y)| x.partial_cmp(&y)),
            };
            let Some(ordering) = ordering else {
                return Err(Error::evaluation(format!("cannot compare `{a}` and `{b}`")));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::And => Ok(Value::Bool(a.as_bool() == Some(true) && b.as_bool() == Some(true))),
        BinaryOp::Or => Ok(Value::Bool(a.as_bool() == Some(true) || b.as_bool() == Some(true))),
    }
}

fn arithmetic(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    if let (Value::Int(x), Value::Int(y)) = (a, b) {
        let (x, y) = (*x, *y);
        let result = match op {
            BinaryOp::Add => x.checked_add(y),
            BinaryOp::Sub => x.checked_sub(y),
            BinaryOp::Mul => x.checked_mul(y),
            BinaryOp::Div | BinaryOp::Rem if y == 0 => {
                return Err(Error::evaluation("division by zero"));
            }
            BinaryOp::Div => x.checked_div(y),
            _ => x.checked_rem(y),
        };
        return result
            .map(Value::Int)
            .ok_or_else(|| Error::evaluation(format!("integer overflow in `{x} {} {y}`", op.symbol())));
    }

    let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) else {
        return Err(mismatch(op.symbol(), &[a.value_type(), b.value_type()]));
    };
    let result = match op {
        BinaryOp::Add => x + y,
        BinaryOp::Sub => x - y,
        BinaryOp::Mul => x * y,
        BinaryOp::Div | BinaryOp::Rem if y == 0.0 => {
            return Err(Error::evaluation("division by zero"));
        }
        BinaryOp::Div => x / y,
        _ => x % y,
    };
    Ok(Value::Float(result))
}

/// Equality that treats `Int(2)` and `Float(2.0)` as equal.
fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn apply_call(function: Function, deps: &[Value], ty: ValueType) -> Result<Value> {
    let to_value = |x: f64| -> Value {
        if ty == ValueType::Int {
            Value::Int(x as i64)
        } else {
            Value::Float(x)
        }
    };
    let nums: Vec<f64> = deps.iter().filter_map(Value::as_f64).collect();
    if nums.len() != deps.len() {
        return Err(mismatch(
            function.name(),
            &deps.iter().map(Value::value_type).collect::<Vec<_>>(),
        ));
    }
    match function {
        Function::Abs => match &deps[0] {
            Value::Int(i) => i
                .checked_abs()
                .map(Value::Int)
                .ok_or_else(|| Error::evaluation("integer overflow in abs")),
            _ => Ok(Value::Float(nums[0].abs())),
        },
        Function::Min => Ok(to_value(nums.iter().copied().fold(f64::INFINITY, f64::min))),
        Function::Max => Ok(to_value(nums.iter().copied().fold(f64::NEG_INFINITY, f64::max))),
        Function::Clamp => {
            let (value, low, high) = (nums[0], nums[1], nums[2]);
            if low > high {
                return Err(Error::evaluation(format!(
                    "clamp bounds are inverted: {low} > {high}"
                )));
            }
            Ok(to_value(value.clamp(low, high)))
        }
    }
}
