use super::operators::compare;
use super::utils::{clamp_index, number_arg, slice_bounds, string_arg, values_equal};
use crate::context::EvaluationContext;
use crate::error::{ErrorKind, EvalError};
use crate::registry::{FunctionDescriptor, FunctionRegistry, FunctionResult, Param, ANY, ARRAY, NUMBER, SEQUENCE, STRING};
use crate::types::{Value, ValueKind};
use std::cmp::Ordering;

const SEQUENCE_OR_OBJECT: Param = Param::Kinds(&[ValueKind::String, ValueKind::Array, ValueKind::Object]);

pub fn register(reg: &mut FunctionRegistry) {
    reg.define(FunctionDescriptor::new("length", length).params([SEQUENCE]));
    reg.define(FunctionDescriptor::new("join", join).params([ARRAY, STRING]));
    reg.define(FunctionDescriptor::new("slice", slice).params([SEQUENCE, NUMBER]).optional([NUMBER]));
    reg.define(
        FunctionDescriptor::new("get", get)
            .params([SEQUENCE_OR_OBJECT, ANY])
            .optional([NUMBER])
            .describe("get(o, from, [to]) indexes or slices a string or array, or reads an object field"),
    );
    reg.define(FunctionDescriptor::new("reverse", reverse).params([SEQUENCE]));
    reg.define(FunctionDescriptor::new("sort", sort).params([ARRAY]));
    reg.define(FunctionDescriptor::new("uniques", uniques).params([ARRAY]));
    reg.define(FunctionDescriptor::new("inArray", |a: &[Value], _: &dyn EvaluationContext| {
        let items = array(&a[0])?;
        Ok(Value::Boolean(items.iter().any(|v| values_equal(v, &a[1]))))
    }).params([ARRAY, ANY]));
    reg.define(FunctionDescriptor::new("indexOf", |a: &[Value], _: &dyn EvaluationContext| position(a, false)).params([SEQUENCE, ANY]));
    reg.define(FunctionDescriptor::new("lastIndexOf", |a: &[Value], _: &dyn EvaluationContext| position(a, true)).params([SEQUENCE, ANY]));
}

fn array(v: &Value) -> Result<&[Value], EvalError> {
    match v {
        Value::Array(items) => Ok(items),
        _ => Err(EvalError::expected("array")),
    }
}

fn length(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    Ok(Value::Number(match &args[0] {
        Value::String(s) => s.chars().count(),
        other => array(other)?.len(),
    } as f64))
}

/// Blank elements are skipped.
fn join(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let sep = string_arg(&args[1])?;
    let parts: Vec<String> = array(&args[0])?
        .iter()
        .filter(|v| !v.is_blank())
        .map(Value::to_string)
        .collect();
    Ok(Value::String(parts.join(sep)))
}

fn slice(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let from = number_arg(&args[1])?;
    let to = args.get(2).map(number_arg).transpose()?;
    Ok(match &args[0] {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (start, end) = slice_bounds(chars.len(), from, to);
            Value::String(chars[start..end].iter().collect())
        }
        other => {
            let items = array(other)?;
            let (start, end) = slice_bounds(items.len(), from, to);
            Value::Array(items[start..end].to_vec())
        }
    })
}

fn get(args: &[Value], ctx: &dyn EvaluationContext) -> FunctionResult {
    match (&args[0], &args[1]) {
        (Value::Object(obj), key) => obj.index(key).ok_or_else(|| {
            EvalError::new(ErrorKind::Field, format!("{} has no field '{}'", obj.type_name(), key))
        }),
        (_, Value::Number(_)) if args.len() == 3 => slice(args, ctx),
        (seq, Value::Number(n)) => {
            let i = clamp_index(len_of(seq)?, n.trunc() as isize)
                .ok_or_else(|| EvalError::new(ErrorKind::Index, format!("index {} out of range", args[1])))?;
            Ok(match seq {
                Value::String(s) => s.chars().nth(i).map(|c| Value::String(c.to_string())).unwrap_or(Value::Null),
                other => array(other)?[i].clone(),
            })
        }
        _ => Err(EvalError::expected("number")),
    }
}

fn len_of(v: &Value) -> Result<usize, EvalError> {
    match v {
        Value::String(s) => Ok(s.chars().count()),
        other => Ok(array(other)?.len()),
    }
}

fn reverse(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    Ok(match &args[0] {
        Value::String(s) => Value::String(s.chars().rev().collect()),
        other => Value::Array(array(other)?.iter().rev().cloned().collect()),
    })
}

/// Sorts strings, numbers or dates. Mixed kinds are a type error.
fn sort(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let mut items = array(&args[0])?.to_vec();
    if let Some(first) = items.first() {
        let kind = first.kind();
        if !matches!(kind, ValueKind::String | ValueKind::Number | ValueKind::Date) {
            return Err(EvalError::type_error(format!("cannot sort {} values", first.type_name())));
        }
        if items.iter().any(|v| v.kind() != kind) {
            return Err(EvalError::type_error("cannot sort an array of mixed types"));
        }
    }
    let mut failure = None;
    items.sort_by(|a, b| match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => compare(a, b).unwrap_or_else(|e| {
            failure.get_or_insert(e);
            Ordering::Equal
        }),
    });
    match failure {
        Some(e) => Err(e),
        None => Ok(Value::Array(items)),
    }
}

/// Keeps the first occurrence of each value, in order.
fn uniques(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let mut out: Vec<Value> = Vec::new();
    for item in array(&args[0])? {
        if !out.iter().any(|seen| values_equal(seen, item)) {
            out.push(item.clone());
        }
    }
    Ok(Value::Array(out))
}

/// Character or element position of the needle, -1 when absent.
fn position(args: &[Value], last: bool) -> FunctionResult {
    let found = match &args[0] {
        Value::String(s) => {
            let needle = string_arg(&args[1])?;
            let byte = if last { s.rfind(needle) } else { s.find(needle) };
            byte.map(|b| s[..b].chars().count())
        }
        other => {
            let items = array(other)?;
            if last {
                items.iter().rposition(|v| values_equal(v, &args[1]))
            } else {
                items.iter().position(|v| values_equal(v, &args[1]))
            }
        }
    };
    Ok(Value::Number(found.map(|i| i as f64).unwrap_or(-1.0)))
}
