use super::evaluator::Evaluator;
use crate::ast::{Control, Expr, Lambda};
use crate::context::{Bindings, EvaluationContext};
use crate::error::EvalError;
use crate::types::Value;

/// Lazily evaluated control forms. Each iteration binds its parameters in a
/// fresh child frame of `ctx`; the first Error produced by a body ends the loop.
pub fn eval_control(
    ev: &Evaluator<'_>,
    control: Control,
    args: &[Expr],
    body: Option<&Lambda>,
    ctx: &dyn EvaluationContext,
) -> Result<Value, EvalError> {
    match (control, body) {
        (Control::If, _) => eval_if(ev, args, ctx),
        (Control::With, Some(lambda)) => {
            let value = eager(ev, &args[0], ctx)?;
            Ok(bind(ev, lambda, &[value], ctx))
        }
        (Control::ForEach, Some(lambda)) => {
            let items = array_arg(control, eager(ev, &args[0], ctx)?)?;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(checked(bind(ev, lambda, &[item], ctx))?);
            }
            Ok(Value::Array(out))
        }
        (Control::ForEachIndex, Some(lambda)) => {
            let items = array_arg(control, eager(ev, &args[0], ctx)?)?;
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                out.push(checked(bind(ev, lambda, &[Value::Number(i as f64), item], ctx))?);
            }
            Ok(Value::Array(out))
        }
        (Control::ForRange, Some(lambda)) => eval_for_range(ev, args, lambda, ctx),
        (Control::Filter, Some(lambda)) => {
            let items = array_arg(control, eager(ev, &args[0], ctx)?)?;
            let mut out = Vec::new();
            for item in items {
                match bind(ev, lambda, std::slice::from_ref(&item), ctx) {
                    Value::Boolean(true) => out.push(item),
                    Value::Boolean(false) => {}
                    Value::Error(e) => return Err(e),
                    _ => return Err(EvalError::type_error("filter condition must be boolean")),
                }
            }
            Ok(Value::Array(out))
        }
        (Control::ForNonBlank, Some(lambda)) => {
            // Errors count as blank here; this is the form's fallback path.
            let value = ev.eval(&args[0], ctx);
            if value.is_blank() || value.is_error() {
                Ok(ev.eval(&args[1], ctx))
            } else {
                Ok(bind(ev, lambda, &[value], ctx))
            }
        }
        (_, None) => Err(EvalError::semantic(format!("{} is missing its body", control.name()))),
    }
}

fn eval_if(ev: &Evaluator<'_>, args: &[Expr], ctx: &dyn EvaluationContext) -> Result<Value, EvalError> {
    match eager(ev, &args[0], ctx)? {
        Value::Boolean(true) => Ok(ev.eval(&args[1], ctx)),
        Value::Boolean(false) => Ok(ev.eval(&args[2], ctx)),
        _ => Err(EvalError::type_error("if condition must be boolean")),
    }
}

fn eval_for_range(
    ev: &Evaluator<'_>,
    args: &[Expr],
    lambda: &Lambda,
    ctx: &dyn EvaluationContext,
) -> Result<Value, EvalError> {
    let mut bounds = [0.0; 3];
    for (slot, arg) in bounds.iter_mut().zip(args) {
        *slot = match eager(ev, arg, ctx)? {
            Value::Number(n) => n,
            _ => return Err(EvalError::type_error("forRange expects numeric bounds")),
        };
    }
    let [from, to, step] = bounds;
    if step == 0.0 || step.is_nan() {
        return Err(EvalError::semantic("forRange step must not be zero"));
    }
    let mut out = Vec::new();
    let mut i = from;
    while (step > 0.0 && i < to) || (step < 0.0 && i > to) {
        let next = i + step;
        if next == i {
            return Err(EvalError::semantic(format!("forRange step {} is too small to advance past {}", step, i)));
        }
        out.push(checked(bind(ev, lambda, &[Value::Number(i)], ctx))?);
        i = next;
    }
    Ok(Value::Array(out))
}

/// Evaluates the body with `values` bound to the lambda's parameters.
fn bind(ev: &Evaluator<'_>, lambda: &Lambda, values: &[Value], ctx: &dyn EvaluationContext) -> Value {
    let mut frame = Bindings::child_of(ctx);
    for (name, value) in lambda.params.iter().zip(values) {
        frame.set(name.as_str(), value.clone());
    }
    ev.eval(&lambda.body, &frame)
}

fn eager(ev: &Evaluator<'_>, expr: &Expr, ctx: &dyn EvaluationContext) -> Result<Value, EvalError> {
    checked(ev.eval(expr, ctx))
}

fn checked(v: Value) -> Result<Value, EvalError> {
    match v {
        Value::Error(e) => Err(e),
        other => Ok(other),
    }
}

fn array_arg(control: Control, v: Value) -> Result<Vec<Value>, EvalError> {
    match v {
        Value::Array(items) => Ok(items),
        other => Err(EvalError::type_error(format!(
            "{} expects an array, got {}",
            control.name(),
            other.type_name()
        ))),
    }
}
