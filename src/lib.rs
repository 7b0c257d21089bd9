pub mod ast;
pub mod batch;
pub mod cache;
pub mod context;
pub mod error;
pub mod host;
pub mod lexer;
pub mod parser;
pub mod registry;
pub mod runtime;
pub mod types;

pub use ast::Expr;
pub use batch::{BatchConfig, BatchDriver, CancellationToken, RowResult};
pub use cache::ExpressionCache;
pub use context::{Bindings, EvaluationContext};
pub use error::{ErrorKind, EvalError, RegistryError, SyntaxError};
pub use host::Row;
pub use registry::{Function, FunctionDescriptor, FunctionRegistry, Param};
pub use runtime::Evaluator;
pub use types::{HostObject, Value, ValueKind};

use std::collections::HashMap;
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref STANDARD_REGISTRY: Arc<FunctionRegistry> = Arc::new(FunctionRegistry::with_builtins());
}

/// Shared registry holding the standard function library.
pub fn standard_registry() -> Arc<FunctionRegistry> {
    Arc::clone(&STANDARD_REGISTRY)
}

/// Parse an expression, accepting an optional leading `grel:` language prefix.
pub fn parse(input: &str) -> Result<Expr, SyntaxError> {
    let trimmed = input.trim_start();
    match trimmed.strip_prefix("grel:") {
        // positions count from the start of the full input
        Some(rest) => parser::parse(rest).map_err(|mut e| {
            e.position += input[..input.len() - rest.len()].chars().count();
            e
        }),
        None => parser::parse(input),
    }
}

/// Parse and evaluate with no variables bound.
pub fn evaluate(input: &str) -> Result<Value, SyntaxError> {
    evaluate_with(input, &HashMap::new())
}

/// Parse and evaluate against the standard library and `vars`.
pub fn evaluate_with(input: &str, vars: &HashMap<String, Value>) -> Result<Value, SyntaxError> {
    let expr = parse(input)?;
    Ok(Evaluator::new(&STANDARD_REGISTRY).eval(&expr, vars))
}
