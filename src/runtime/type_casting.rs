use super::datetime::{java_pattern_to_chrono, parse_date};
use super::utils::string_arg;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::registry::{FunctionDescriptor, FunctionRegistry, FunctionResult, Param, ANY, STRING};
use crate::types::{parse_number, Value, ValueKind};
use std::fmt::Write;

pub fn register(reg: &mut FunctionRegistry) {
    reg.define(FunctionDescriptor::new("toString", to_string).params([ANY]).optional([STRING]));
    reg.define(FunctionDescriptor::new("toNumber", to_number).params([ANY]));
    reg.define(
        FunctionDescriptor::new("toDate", to_date)
            .arity(1, None)
            .params([Param::Kinds(&[ValueKind::String, ValueKind::Date])])
            .variadic(STRING)
            .describe("toDate(s, [format, ...]) tries each yyyy-MM-dd style format in turn"),
    );
}

fn to_string(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    match (&args[0], args.get(1)) {
        (v, None) => Ok(Value::String(v.to_string())),
        (Value::Date(d), Some(format)) => {
            let fmt = java_pattern_to_chrono(string_arg(format)?);
            let mut out = String::new();
            write!(out, "{}", d.format(&fmt))
                .map_err(|_| EvalError::semantic(format!("invalid date format '{}'", format)))?;
            Ok(Value::String(out))
        }
        (other, Some(_)) => Err(EvalError::type_error(format!(
            "toString format applies to dates, got {}",
            other.type_name()
        ))),
    }
}

fn to_number(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    match &args[0] {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::String(s) => parse_number(s)
            .map(Value::Number)
            .ok_or_else(|| EvalError::semantic(format!("cannot parse '{}' as a number", s))),
        other => Err(EvalError::type_error(format!("cannot convert {} to number", other.type_name()))),
    }
}

fn to_date(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    match &args[0] {
        Value::Date(d) => Ok(Value::Date(*d)),
        Value::String(s) => {
            let patterns = args[1..]
                .iter()
                .map(|p| string_arg(p).map(str::to_string))
                .collect::<Result<Vec<_>, _>>()?;
            parse_date(s, &patterns)
                .map(Value::Date)
                .ok_or_else(|| EvalError::semantic(format!("cannot parse '{}' as a date", s)))
        }
        _ => Err(EvalError::expected("string or date")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Bindings;
    use chrono::{TimeZone, Utc};

    #[test]
    fn formats_dates_with_patterns() {
        let d = Value::Date(Utc.with_ymd_and_hms(2024, 7, 4, 15, 30, 0).unwrap());
        let out = to_string(&[d, Value::string("yyyy/MM/dd HH:mm")], &Bindings::new());
        assert_eq!(out, Ok(Value::string("2024/07/04 15:30")));
    }

    #[test]
    fn number_conversion() {
        let ctx = Bindings::new();
        assert_eq!(to_number(&[Value::string(" 12.5 ")], &ctx), Ok(Value::Number(12.5)));
        assert!(to_number(&[Value::string("12px")], &ctx).is_err());
        assert!(to_number(&[Value::Null], &ctx).is_err());
    }
}
