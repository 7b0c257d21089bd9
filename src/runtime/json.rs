use super::utils::string_arg;
use crate::context::EvaluationContext;
use crate::error::EvalError;
use crate::registry::{FunctionDescriptor, FunctionRegistry, FunctionResult, ANY, STRING};
use crate::types::Value;

pub fn register(reg: &mut FunctionRegistry) {
    reg.define(FunctionDescriptor::new("parseJson", parse_json).params([STRING]));
    reg.define(FunctionDescriptor::new("jsonize", jsonize).params([ANY]));
}

/// Objects come back as opaque handles readable with `.field` and `["key"]`.
fn parse_json(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    let text = string_arg(&args[0])?;
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from_json)
        .map_err(|e| EvalError::semantic("cannot parse JSON").caused_by(EvalError::semantic(e.to_string())))
}

fn jsonize(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
    serde_json::to_string(&args[0])
        .map(Value::String)
        .map_err(|e| EvalError::semantic(e.to_string()))
}
