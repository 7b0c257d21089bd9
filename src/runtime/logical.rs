use super::utils::bool_arg;
use crate::context::EvaluationContext;
use crate::registry::{FunctionDescriptor, FunctionRegistry, FunctionResult, ANY, BOOLEAN};
use crate::types::{parse_number, Value};

pub fn register(reg: &mut FunctionRegistry) {
    for name in ["and", "or", "xor"] {
        reg.define(
            FunctionDescriptor::new(name, move |a: &[Value], _: &dyn EvaluationContext| exec_logical(name, a))
                .arity(1, None)
                .variadic(BOOLEAN),
        );
    }
    reg.define(FunctionDescriptor::new("not", |a: &[Value], _: &dyn EvaluationContext| exec_logical("not", a)).params([BOOLEAN]));

    // Introspection: these see Error arguments instead of propagating them.
    for name in [
        "isNull",
        "isNotNull",
        "isBlank",
        "isNonBlank",
        "isError",
        "isNumeric",
        "isEmptyString",
        "errorMessage",
        "type",
    ] {
        reg.define(
            FunctionDescriptor::new(name, move |a: &[Value], _: &dyn EvaluationContext| exec_logical(name, a))
                .params([ANY])
                .accepts_errors(),
        );
    }
    reg.define(
        FunctionDescriptor::new("coalesce", |a: &[Value], _: &dyn EvaluationContext| exec_logical("coalesce", a))
            .arity(1, None)
            .variadic(ANY)
            .accepts_errors()
            .describe("coalesce(a, b, ...) returns the first argument that is neither null nor an error"),
    );
}

pub fn exec_logical(name: &str, args: &[Value]) -> FunctionResult {
    let v = &args[0];
    Ok(Value::Boolean(match name {
        "and" => {
            let mut result = true;
            for arg in args {
                result &= bool_arg(arg)?;
            }
            result
        }
        "or" => {
            let mut result = false;
            for arg in args {
                result |= bool_arg(arg)?;
            }
            result
        }
        "xor" => {
            let mut result = false;
            for arg in args {
                result ^= bool_arg(arg)?;
            }
            result
        }
        "not" => !bool_arg(v)?,
        "isNull" => v.is_null(),
        "isNotNull" => !v.is_null() && !v.is_error(),
        // errors hold no data, so they count as blank
        "isBlank" => v.is_blank() || v.is_error(),
        "isNonBlank" => !v.is_blank() && !v.is_error(),
        "isError" => v.is_error(),
        "isNumeric" => match v {
            Value::Number(n) => !n.is_nan(),
            Value::String(s) => parse_number(s).is_some(),
            _ => false,
        },
        "isEmptyString" => matches!(v, Value::String(s) if s.is_empty()),
        "errorMessage" => {
            return Ok(match v {
                Value::Error(e) => Value::String(e.message.clone()),
                _ => Value::Null,
            })
        }
        "type" => return Ok(Value::string(v.type_name())),
        "coalesce" => {
            return Ok(args
                .iter()
                .find(|a| !a.is_null() && !a.is_error())
                .cloned()
                .unwrap_or(Value::Null))
        }
        _ => return Err(crate::error::EvalError::semantic(format!("unknown logical function {}", name))),
    }))
}
