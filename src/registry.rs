use crate::context::EvaluationContext;
use crate::error::{ErrorKind, EvalError, RegistryError};
use crate::types::{Value, ValueKind};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub type FunctionResult = Result<Value, EvalError>;

/// Body of a named function. Receives fully evaluated arguments that have
/// already passed the descriptor's arity and kind checks.
///
/// Any `Fn(&[Value], &dyn EvaluationContext) -> FunctionResult` closure or
/// fn item implements this trait.
pub trait Function: Send + Sync {
    fn call(&self, args: &[Value], ctx: &dyn EvaluationContext) -> FunctionResult;
}

impl<F> Function for F
where
    F: Fn(&[Value], &dyn EvaluationContext) -> FunctionResult + Send + Sync,
{
    fn call(&self, args: &[Value], ctx: &dyn EvaluationContext) -> FunctionResult {
        self(args, ctx)
    }
}

/// Accepted kinds for one argument position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Param {
    Any,
    Kinds(&'static [ValueKind]),
}

pub const ANY: Param = Param::Any;
pub const STRING: Param = Param::Kinds(&[ValueKind::String]);
pub const NUMBER: Param = Param::Kinds(&[ValueKind::Number]);
pub const BOOLEAN: Param = Param::Kinds(&[ValueKind::Boolean]);
pub const ARRAY: Param = Param::Kinds(&[ValueKind::Array]);
pub const DATE: Param = Param::Kinds(&[ValueKind::Date]);
pub const PATTERN: Param = Param::Kinds(&[ValueKind::String, ValueKind::Regex]);
pub const TEXT_LIKE: Param = Param::Kinds(&[ValueKind::String, ValueKind::Number, ValueKind::Boolean, ValueKind::Date]);
pub const SEQUENCE: Param = Param::Kinds(&[ValueKind::String, ValueKind::Array]);

impl Param {
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            Param::Any => true,
            Param::Kinds(kinds) => kinds.contains(&value.kind()),
        }
    }

    fn describe(&self) -> String {
        match self {
            Param::Any => "any value".to_string(),
            Param::Kinds(kinds) => {
                let names: Vec<&str> = kinds.iter().map(|k| k.name()).collect();
                names.join(" or ")
            }
        }
    }
}

/// Registered function: name, arity, per-position kinds and the body.
#[derive(Clone)]
pub struct FunctionDescriptor {
    pub name: String,
    pub min_args: usize,
    /// `None` means variadic.
    pub max_args: Option<usize>,
    pub params: Vec<Param>,
    /// Kind check for positions past `params`.
    pub rest: Param,
    /// Introspection functions see `Value::Error` arguments instead of
    /// having the first one returned for them.
    pub accepts_errors: bool,
    pub description: Option<String>,
    function: Arc<dyn Function>,
}

impl fmt::Debug for FunctionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDescriptor")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .field("params", &self.params)
            .field("accepts_errors", &self.accepts_errors)
            .finish()
    }
}

impl FunctionDescriptor {
    pub fn new<N, F>(name: N, function: F) -> Self
    where
        N: Into<String>,
        F: Fn(&[Value], &dyn EvaluationContext) -> FunctionResult + Send + Sync + 'static,
    {
        Self::with_function(name, Arc::new(function))
    }

    /// Descriptor around a type implementing `Function` directly.
    pub fn with_function<N: Into<String>>(name: N, function: Arc<dyn Function>) -> Self {
        Self {
            name: name.into(),
            min_args: 0,
            max_args: Some(0),
            params: Vec::new(),
            rest: Param::Any,
            accepts_errors: false,
            description: None,
            function,
        }
    }

    pub fn arity(mut self, min: usize, max: Option<usize>) -> Self {
        self.min_args = min;
        self.max_args = max;
        self
    }

    /// Fixed arity with one kind per position.
    pub fn params<P: Into<Vec<Param>>>(mut self, params: P) -> Self {
        self.params = params.into();
        self.min_args = self.params.len();
        self.max_args = Some(self.params.len());
        self
    }

    /// Optional trailing positions after the required `params`.
    pub fn optional<P: Into<Vec<Param>>>(mut self, optional: P) -> Self {
        let optional = optional.into();
        self.max_args = Some(self.params.len() + optional.len());
        self.params.extend(optional);
        self
    }

    /// Makes the function variadic; extra positions are checked against `rest`.
    pub fn variadic(mut self, rest: Param) -> Self {
        self.max_args = None;
        self.rest = rest;
        self
    }

    pub fn accepts_errors(mut self) -> Self {
        self.accepts_errors = true;
        self
    }

    pub fn describe<D: Into<String>>(mut self, description: D) -> Self {
        self.description = Some(description.into());
        self
    }

    fn validate(&self) -> Result<(), RegistryError> {
        if self.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if let Some(max) = self.max_args {
            if self.min_args > max {
                return Err(RegistryError::InvalidArity { name: self.name.clone(), min: self.min_args, max });
            }
            if self.params.len() > max {
                return Err(RegistryError::TooManyKinds { name: self.name.clone(), declared: self.params.len(), max });
            }
        }
        Ok(())
    }

    fn param_at(&self, position: usize) -> &Param {
        self.params.get(position).unwrap_or(&self.rest)
    }

    /// Arity and kind checks. The body is not run when these fail.
    pub fn check(&self, args: &[Value]) -> Result<(), EvalError> {
        let n = args.len();
        let too_many = self.max_args.is_some_and(|max| n > max);
        if n < self.min_args || too_many {
            let expected = match self.max_args {
                Some(max) if max == self.min_args => format!("{}", max),
                Some(max) => format!("between {} and {}", self.min_args, max),
                None => format!("at least {}", self.min_args),
            };
            return Err(EvalError::new(
                ErrorKind::Arity,
                format!("type error: {} expects {} arguments, got {}", self.name, expected, n),
            ));
        }
        for (i, arg) in args.iter().enumerate() {
            let param = self.param_at(i);
            if !param.accepts(arg) {
                return Err(EvalError::type_error(format!(
                    "{} expects {} as argument {}, got {}",
                    self.name,
                    param.describe(),
                    i + 1,
                    arg.type_name()
                )));
            }
        }
        Ok(())
    }

    /// Checks then runs the body, folding failures into `Value::Error`.
    pub fn invoke(&self, args: &[Value], ctx: &dyn EvaluationContext) -> Value {
        if !self.accepts_errors {
            if let Some(err) = args.iter().find(|a| a.is_error()) {
                return err.clone();
            }
        }
        if let Err(e) = self.check(args) {
            return Value::Error(e);
        }
        self.function.call(args, ctx).unwrap_or_else(Value::Error)
    }
}

/// Name to descriptor map. Built once, then shared read-only (typically in
/// an `Arc`) by every evaluation. Names are case-sensitive and unique.
#[derive(Default, Clone, Debug)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDescriptor>,
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self { functions: HashMap::new() }
    }

    /// Registry preloaded with the standard function library.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        crate::runtime::builtin_functions::register_builtins(&mut registry);
        log::debug!("loaded {} builtin functions", registry.len());
        registry
    }

    pub fn register(&mut self, descriptor: FunctionDescriptor) -> Result<(), RegistryError> {
        descriptor.validate()?;
        if self.functions.contains_key(&descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name));
        }
        log::debug!("registered function {}", descriptor.name);
        self.functions.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Insert used for the builtin library, whose names are known unique.
    pub(crate) fn define(&mut self, descriptor: FunctionDescriptor) {
        debug_assert!(descriptor.validate().is_ok(), "invalid builtin {}", descriptor.name);
        debug_assert!(!self.functions.contains_key(&descriptor.name), "duplicate builtin {}", descriptor.name);
        self.functions.insert(descriptor.name.clone(), descriptor);
    }

    pub fn lookup(&self, name: &str) -> Option<&FunctionDescriptor> {
        self.functions.get(name)
    }

    pub fn has_function(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Bindings;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn echo(args: &[Value], _ctx: &dyn EvaluationContext) -> FunctionResult {
        Ok(Value::Number(args.len() as f64))
    }

    #[test]
    fn register_rejects_duplicates_and_bad_arity() {
        let mut reg = FunctionRegistry::new();
        reg.register(FunctionDescriptor::new("echo", echo).arity(1, Some(2))).unwrap();
        assert_eq!(
            reg.register(FunctionDescriptor::new("echo", echo)),
            Err(RegistryError::Duplicate("echo".into()))
        );
        assert!(matches!(
            reg.register(FunctionDescriptor::new("bad", echo).arity(3, Some(1))),
            Err(RegistryError::InvalidArity { min: 3, max: 1, .. })
        ));
        assert_eq!(reg.register(FunctionDescriptor::new("", echo)), Err(RegistryError::EmptyName));
        assert!(reg.has_function("echo"));
        assert!(!reg.has_function("ECHO"));
    }

    #[test]
    fn failed_checks_do_not_run_the_body() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let d = FunctionDescriptor::new("count", move |_: &[Value], _: &dyn EvaluationContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Null)
        })
        .params([STRING])
        .optional([BOOLEAN]);

        let ctx = Bindings::new();
        let arity = d.invoke(&[], &ctx);
        assert_eq!(arity.as_error().map(|e| e.kind), Some(ErrorKind::Arity));
        let kind = d.invoke(&[Value::string("x"), Value::Number(1.0)], &ctx);
        assert_eq!(
            kind.as_error().map(|e| e.message.as_str()),
            Some("type error: count expects boolean as argument 2, got number")
        );
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        d.invoke(&[Value::string("x"), Value::Boolean(true)], &ctx);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn error_arguments_short_circuit_unless_accepted() {
        let ctx = Bindings::new();
        let err = Value::Error(EvalError::semantic("upstream"));
        let plain = FunctionDescriptor::new("plain", echo).params([ANY]);
        assert_eq!(plain.invoke(&[err.clone()], &ctx), err);
        let introspect = FunctionDescriptor::new("introspect", echo).params([ANY]).accepts_errors();
        assert_eq!(introspect.invoke(&[err], &ctx), Value::Number(1.0));
    }

    #[test]
    fn variadic_rest_kind() {
        let d = FunctionDescriptor::new("nums", echo).arity(1, None).variadic(NUMBER);
        assert!(d.check(&[Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)]).is_ok());
        assert!(d.check(&[Value::Number(1.0), Value::string("2")]).is_err());
        assert!(d.check(&[]).is_err());
    }
}
