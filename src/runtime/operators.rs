//! Arithmetic, comparison and equality for already-evaluated operands.
//! `&&` and `||` short-circuit and live in the evaluator instead.

use super::utils::values_equal;
use crate::ast::{BinaryOp, UnaryOp};
use crate::error::EvalError;
use crate::types::Value;
use std::cmp::Ordering;

pub fn unary(op: UnaryOp, v: Value) -> Result<Value, EvalError> {
    match (op, v) {
        (_, Value::Error(e)) => Err(e),
        (UnaryOp::Minus, Value::Number(n)) => Ok(Value::Number(-n)),
        (UnaryOp::Minus, _) => Err(EvalError::expected("number")),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOp::Not, _) => Err(EvalError::expected("boolean")),
    }
}

/// Applies a non-logical binary operator. Error operands win, left first.
pub fn binary(op: BinaryOp, a: Value, b: Value) -> Result<Value, EvalError> {
    if let Value::Error(e) = a {
        return Err(e);
    }
    if let Value::Error(e) = b {
        return Err(e);
    }
    match op {
        BinaryOp::Add => add(a, b),
        BinaryOp::Sub => numeric(&a, &b, |x, y| Ok(x - y)),
        BinaryOp::Mul => numeric(&a, &b, |x, y| Ok(x * y)),
        BinaryOp::Div => numeric(&a, &b, |x, y| {
            if y == 0.0 {
                Err(EvalError::semantic("division by zero"))
            } else {
                Ok(x / y)
            }
        }),
        BinaryOp::Mod => numeric(&a, &b, |x, y| {
            if y == 0.0 {
                Err(EvalError::semantic("division by zero"))
            } else {
                Ok(x % y)
            }
        }),
        BinaryOp::Eq => equals(&a, &b).map(Value::Boolean),
        BinaryOp::Ne => equals(&a, &b).map(|eq| Value::Boolean(!eq)),
        BinaryOp::Gt => compare(&a, &b).map(|o| Value::Boolean(o == Ordering::Greater)),
        BinaryOp::Lt => compare(&a, &b).map(|o| Value::Boolean(o == Ordering::Less)),
        BinaryOp::Ge => compare(&a, &b).map(|o| Value::Boolean(o != Ordering::Less)),
        BinaryOp::Le => compare(&a, &b).map(|o| Value::Boolean(o != Ordering::Greater)),
        BinaryOp::And | BinaryOp::Or => logical(op, &a, &b),
    }
}

/// Strict boolean combination of two evaluated operands.
pub fn logical(op: BinaryOp, a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (a, b) {
        (Value::Boolean(x), Value::Boolean(y)) => Ok(Value::Boolean(match op {
            BinaryOp::And => *x && *y,
            _ => *x || *y,
        })),
        _ => Err(EvalError::expected("boolean")),
    }
}

fn numeric<F>(a: &Value, b: &Value, f: F) -> Result<Value, EvalError>
where
    F: FnOnce(f64, f64) -> Result<f64, EvalError>,
{
    match (a.coerce_number(), b.coerce_number()) {
        (Some(x), Some(y)) => f(x, y).map(Value::Number),
        _ => Err(EvalError::expected("number")),
    }
}

fn is_scalar(v: &Value) -> bool {
    matches!(v, Value::String(_) | Value::Number(_) | Value::Boolean(_) | Value::Date(_) | Value::Null)
}

/// `+` concatenates when both sides are strings, or when one side is a string
/// and either side fails numeric coercion. Otherwise it adds.
fn add(a: Value, b: Value) -> Result<Value, EvalError> {
    let a_str = matches!(a, Value::String(_));
    let b_str = matches!(b, Value::String(_));
    let concat = (a_str && b_str)
        || ((a_str || b_str) && (a.coerce_number().is_none() || b.coerce_number().is_none()));
    if concat {
        if !is_scalar(&a) || !is_scalar(&b) {
            return Err(EvalError::type_error(format!(
                "cannot add {} and {}",
                a.type_name(),
                b.type_name()
            )));
        }
        return Ok(Value::String(format!("{}{}", a, b)));
    }
    numeric(&a, &b, |x, y| Ok(x + y))
}

/// `==` semantics: null equals only null, Number against String compares
/// numerically (non-numeric strings are a type error), other mixed kinds are
/// unequal.
pub fn equals(a: &Value, b: &Value) -> Result<bool, EvalError> {
    match (a, b) {
        (Value::Null, Value::Null) => Ok(true),
        (Value::Null, _) | (_, Value::Null) => Ok(false),
        (Value::Number(x), Value::String(_)) => b.coerce_number().map(|y| *x == y).ok_or_else(|| EvalError::expected("number")),
        (Value::String(_), Value::Number(y)) => a.coerce_number().map(|x| x == *y).ok_or_else(|| EvalError::expected("number")),
        _ if a.kind() == b.kind() => Ok(values_equal(a, b)),
        _ => Ok(false),
    }
}

/// Ordering for relational operators. Two strings compare lexicographically
/// unless both are numeric.
pub fn compare(a: &Value, b: &Value) -> Result<Ordering, EvalError> {
    if let (Value::String(x), Value::String(y)) = (a, b) {
        if a.coerce_number().is_none() || b.coerce_number().is_none() {
            return Ok(x.cmp(y));
        }
    }
    if let (Value::Date(x), Value::Date(y)) = (a, b) {
        return Ok(x.cmp(y));
    }
    match (a.coerce_number(), b.coerce_number()) {
        (Some(x), Some(y)) => x.partial_cmp(&y).ok_or_else(|| EvalError::semantic("cannot compare NaN")),
        (Some(_), None) | (None, Some(_)) => Err(EvalError::expected("number")),
        (None, None) => Err(EvalError::type_error(format!(
            "cannot compare {} and {}",
            a.type_name(),
            b.type_name()
        ))),
    }
}
