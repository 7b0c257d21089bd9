use super::utils::number_arg;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::registry::{FunctionDescriptor, FunctionRegistry, FunctionResult, ARRAY, NUMBER};
use crate::types::Value;

const UNARY: &[&str] = &["abs", "ceil", "floor", "round", "exp", "ln", "log", "even", "odd", "sqrt"];
const BINARY: &[&str] = &["mod", "pow"];

pub fn register(reg: &mut FunctionRegistry) {
    for &name in UNARY {
        reg.define(FunctionDescriptor::new(name, move |a: &[Value], _: &dyn EvaluationContext| exec_math(name, a)).params([NUMBER]));
    }
    for &name in BINARY {
        reg.define(FunctionDescriptor::new(name, move |a: &[Value], _: &dyn EvaluationContext| exec_math(name, a)).params([NUMBER, NUMBER]));
    }
    for name in ["min", "max"] {
        reg.define(
            FunctionDescriptor::new(name, move |a: &[Value], _: &dyn EvaluationContext| exec_math(name, a))
                .arity(1, None)
                .variadic(NUMBER),
        );
    }
    reg.define(
        FunctionDescriptor::new("sum", |a: &[Value], _: &dyn EvaluationContext| exec_math("sum", a))
            .params([ARRAY])
            .describe("sum(array) adds the numbers of an array"),
    );
}

pub fn exec_math(name: &str, args: &[Value]) -> FunctionResult {
    match name {
        "abs" => Ok(Value::Number(number_arg(&args[0])?.abs())),
        "ceil" => Ok(Value::Number(number_arg(&args[0])?.ceil())),
        "floor" => Ok(Value::Number(number_arg(&args[0])?.floor())),
        // half-up, so -2.5 rounds to -2
        "round" => Ok(Value::Number((number_arg(&args[0])? + 0.5).floor())),
        "exp" => Ok(Value::Number(number_arg(&args[0])?.exp())),
        "ln" => positive(number_arg(&args[0])?, "ln").map(|n| Value::Number(n.ln())),
        "log" => positive(number_arg(&args[0])?, "log").map(|n| Value::Number(n.log10())),
        "sqrt" => {
            let n = number_arg(&args[0])?;
            if n < 0.0 {
                return Err(EvalError::semantic("sqrt of a negative number"));
            }
            Ok(Value::Number(n.sqrt()))
        }
        "even" => Ok(Value::Number(away_to_multiple(number_arg(&args[0])?, false))),
        "odd" => Ok(Value::Number(away_to_multiple(number_arg(&args[0])?, true))),
        "mod" => {
            let a = number_arg(&args[0])?.trunc() as i64;
            let b = number_arg(&args[1])?.trunc() as i64;
            if b == 0 {
                return Err(EvalError::semantic("division by zero"));
            }
            Ok(Value::Number(a.wrapping_rem(b) as f64))
        }
        "pow" => Ok(Value::Number(number_arg(&args[0])?.powf(number_arg(&args[1])?))),
        "min" | "max" => {
            let mut best = number_arg(&args[0])?;
            for arg in &args[1..] {
                let n = number_arg(arg)?;
                best = if name == "min" { best.min(n) } else { best.max(n) };
            }
            Ok(Value::Number(best))
        }
        "sum" => match &args[0] {
            Value::Array(items) => items
                .iter()
                .try_fold(0.0, |acc, v| number_arg(v).map(|n| acc + n))
                .map(Value::Number),
            _ => Err(EvalError::expected("array")),
        },
        _ => Err(EvalError::semantic(format!("unknown math function {}", name))),
    }
}

fn positive(n: f64, name: &str) -> Result<f64, EvalError> {
    if n <= 0.0 {
        Err(EvalError::semantic(format!("{} expects a positive number", name)))
    } else {
        Ok(n)
    }
}

/// Rounds away from zero to the nearest even (or odd) integer.
fn away_to_multiple(n: f64, odd: bool) -> f64 {
    let sign = if n < 0.0 { -1.0 } else { 1.0 };
    let mut m = n.abs().ceil();
    let is_odd = m % 2.0 == 1.0;
    if is_odd != odd {
        m += 1.0;
    }
    sign * m
}

#[cfg(test)]
mod tests {
    use super::*;

    fn n(x: f64) -> Value {
        Value::Number(x)
    }

    #[test]
    fn rounding_family() {
        assert_eq!(exec_math("round", &[n(2.5)]), Ok(n(3.0)));
        assert_eq!(exec_math("round", &[n(-2.5)]), Ok(n(-2.0)));
        assert_eq!(exec_math("even", &[n(1.5)]), Ok(n(2.0)));
        assert_eq!(exec_math("even", &[n(3.0)]), Ok(n(4.0)));
        assert_eq!(exec_math("odd", &[n(2.0)]), Ok(n(3.0)));
        assert_eq!(exec_math("odd", &[n(0.0)]), Ok(n(1.0)));
        assert_eq!(exec_math("odd", &[n(-1.5)]), Ok(n(-3.0)));
    }

    #[test]
    fn domain_errors() {
        assert!(exec_math("ln", &[n(0.0)]).is_err());
        assert!(exec_math("mod", &[n(5.0), n(0.0)]).is_err());
        assert_eq!(exec_math("mod", &[n(7.0), n(3.0)]), Ok(n(1.0)));
    }

    #[test]
    fn sum_requires_numbers() {
        assert_eq!(exec_math("sum", &[Value::Array(vec![n(1.0), n(2.5)])]), Ok(n(3.5)));
        assert!(exec_math("sum", &[Value::Array(vec![n(1.0), Value::string("x")])]).is_err());
        assert_eq!(exec_math("max", &[n(1.0), n(9.0), n(4.0)]), Ok(n(9.0)));
    }
}
