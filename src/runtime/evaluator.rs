use super::controls;
use super::operators;
use super::utils::clamp_index;
use crate::ast::{BinaryOp, Expr, Literal};
use crate::context::EvaluationContext;
use crate::error::{ErrorKind, EvalError};
use crate::registry::FunctionRegistry;
use crate::types::Value;

/// Tree-walking evaluator. Holds no state besides the registry reference, so
/// one instance may evaluate many rows, including from several threads.
#[derive(Clone, Copy)]
pub struct Evaluator<'r> {
    registry: &'r FunctionRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r FunctionRegistry) -> Self {
        Self { registry }
    }

    /// Evaluates `expr`. Never fails: problems come back as `Value::Error`.
    pub fn eval(&self, expr: &Expr, ctx: &dyn EvaluationContext) -> Value {
        match expr {
            Expr::Literal(lit) => literal(lit),
            Expr::Variable(name) => match ctx.get_variable(name) {
                Some(v) => v.clone(),
                None => Value::Error(EvalError::new(
                    ErrorKind::UnknownVariable,
                    format!("unknown variable '{}'", name),
                )),
            },
            Expr::Field { base, name } => {
                let base = self.eval(base, ctx);
                field(base, name).unwrap_or_else(Value::Error)
            }
            Expr::Index { base, index } => {
                let base = self.eval(base, ctx);
                if base.is_error() {
                    return base;
                }
                let index = self.eval(index, ctx);
                self::index(base, index).unwrap_or_else(Value::Error)
            }
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let v = self.eval(item, ctx);
                    if v.is_error() {
                        return v;
                    }
                    out.push(v);
                }
                Value::Array(out)
            }
            Expr::Call { name, args } => self.call(name, args, ctx),
            Expr::Control { control, args, body } => {
                controls::eval_control(self, *control, args, body.as_ref(), ctx).unwrap_or_else(Value::Error)
            }
            Expr::Unary(op, operand) => {
                operators::unary(*op, self.eval(operand, ctx)).unwrap_or_else(Value::Error)
            }
            Expr::Binary(left, op @ (BinaryOp::And | BinaryOp::Or), right) => {
                self.short_circuit(*op, left, right, ctx).unwrap_or_else(Value::Error)
            }
            Expr::Binary(left, op, right) => {
                let a = self.eval(left, ctx);
                if a.is_error() {
                    return a;
                }
                let b = self.eval(right, ctx);
                operators::binary(*op, a, b).unwrap_or_else(Value::Error)
            }
            Expr::Ternary { cond, then, otherwise } => match self.eval(cond, ctx) {
                Value::Boolean(true) => self.eval(then, ctx),
                Value::Boolean(false) => self.eval(otherwise, ctx),
                err @ Value::Error(_) => err,
                _ => Value::Error(EvalError::expected("boolean")),
            },
        }
    }

    /// Arguments are evaluated left to right before the name is resolved.
    fn call(&self, name: &str, args: &[Expr], ctx: &dyn EvaluationContext) -> Value {
        let values: Vec<Value> = args.iter().map(|a| self.eval(a, ctx)).collect();
        match self.registry.lookup(name) {
            Some(descriptor) => {
                log::trace!("calling {} with {} arguments", name, values.len());
                descriptor.invoke(&values, ctx)
            }
            None => Value::Error(EvalError::new(
                ErrorKind::UnknownFunction,
                format!("unknown function '{}'", name),
            )),
        }
    }

    fn short_circuit(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        ctx: &dyn EvaluationContext,
    ) -> Result<Value, EvalError> {
        let a = match self.eval(left, ctx) {
            Value::Boolean(b) => b,
            Value::Error(e) => return Err(e),
            _ => return Err(EvalError::expected("boolean")),
        };
        match (op, a) {
            (BinaryOp::And, false) => return Ok(Value::Boolean(false)),
            (BinaryOp::Or, true) => return Ok(Value::Boolean(true)),
            _ => {}
        }
        match self.eval(right, ctx) {
            Value::Error(e) => Err(e),
            b => operators::logical(op, &Value::Boolean(a), &b),
        }
    }
}

fn literal(lit: &Literal) -> Value {
    match lit {
        Literal::Number(n) => Value::Number(*n),
        Literal::String(s) => Value::String(s.clone()),
        Literal::Boolean(b) => Value::Boolean(*b),
        Literal::Null => Value::Null,
        Literal::Regex(r) => Value::Regex(r.clone()),
    }
}

fn field(base: Value, name: &str) -> Result<Value, EvalError> {
    match base {
        Value::Error(e) => Err(e),
        Value::Object(obj) => obj.field(name).ok_or_else(|| {
            EvalError::new(ErrorKind::Field, format!("{} has no field '{}'", obj.type_name(), name))
        }),
        other => Err(EvalError::new(
            ErrorKind::Field,
            format!("cannot access field '{}' of {}", name, other.type_name()),
        )),
    }
}

fn index(base: Value, index: Value) -> Result<Value, EvalError> {
    if let Value::Error(e) = index {
        return Err(e);
    }
    let position = |len: usize| -> Result<usize, EvalError> {
        let n = index.coerce_number().ok_or_else(|| EvalError::expected("number as index"))?;
        clamp_index(len, n.trunc() as isize).ok_or_else(|| {
            EvalError::new(ErrorKind::Index, format!("index {} out of range for length {}", index, len))
        })
    };
    match &base {
        Value::Array(items) => Ok(items[position(items.len())?].clone()),
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(Value::String(chars[position(chars.len())?].to_string()))
        }
        Value::Object(obj) => obj.index(&index).ok_or_else(|| {
            EvalError::new(ErrorKind::Field, format!("{} has no entry {}", obj.type_name(), index))
        }),
        other => Err(EvalError::new(ErrorKind::Index, format!("cannot index into {}", other.type_name()))),
    }
}
