use std::fmt::{Display, Formatter};

/// Failure to tokenize or parse an expression. Raised before any row is
/// evaluated; there is no partial result.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub message: String,
    /// 0-based character column of the offending character or token.
    pub position: usize,
    /// The offending character or token text, when known.
    pub found: Option<String>,
}

impl SyntaxError {
    pub fn new<M: Into<String>>(message: M, position: usize) -> Self {
        Self { message: message.into(), position, found: None }
    }

    pub fn with_found<F: Into<String>>(mut self, found: F) -> Self {
        self.found = Some(found.into());
        self
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.found {
            Some(found) => write!(f, "{} (found '{}') at position {}", self.message, found, self.position),
            None => write!(f, "{} at position {}", self.message, self.position),
        }
    }
}

impl std::error::Error for SyntaxError {}

/// Category of an evaluation-time error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Type,
    Arity,
    UnknownFunction,
    UnknownVariable,
    Index,
    Field,
    Semantic,
}

/// Recoverable evaluation failure. Travels as `Value::Error` rather than
/// unwinding, so one bad cell never stops a batch.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub cause: Option<Box<EvalError>>,
}

impl EvalError {
    pub fn new<M: Into<String>>(kind: ErrorKind, message: M) -> Self {
        Self { kind, message: message.into(), cause: None }
    }

    pub fn type_error<M: Into<String>>(message: M) -> Self {
        Self::new(ErrorKind::Type, format!("type error: {}", message.into()))
    }

    pub fn expected(what: &str) -> Self {
        Self::type_error(format!("expected {}", what))
    }

    pub fn semantic<M: Into<String>>(message: M) -> Self {
        Self::new(ErrorKind::Semantic, message)
    }

    pub fn caused_by(mut self, cause: EvalError) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    pub fn is_type_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Type | ErrorKind::Arity)
    }
}

impl Display for EvalError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " (caused by: {})", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for EvalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.cause.as_deref().map(|c| c as &(dyn std::error::Error + 'static))
    }
}

/// Rejected function registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("function name cannot be empty")]
    EmptyName,
    #[error("function '{0}' is already registered")]
    Duplicate(String),
    #[error("function '{name}': min_args {min} is greater than max_args {max}")]
    InvalidArity { name: String, min: usize, max: usize },
    #[error("function '{name}': declares {declared} parameter kinds but accepts at most {max} arguments")]
    TooManyKinds { name: String, declared: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_display() {
        let e = SyntaxError::new("Unterminated string literal", 4).with_found("\"");
        assert_eq!(e.to_string(), "Unterminated string literal (found '\"') at position 4");
        assert_eq!(SyntaxError::new("Unexpected end", 2).to_string(), "Unexpected end at position 2");
    }

    #[test]
    fn eval_error_cause_chain() {
        let inner = EvalError::semantic("bad pattern");
        let outer = EvalError::semantic("match failed").caused_by(inner.clone());
        assert_eq!(outer.message, "match failed");
        assert_eq!(outer.cause.as_deref(), Some(&inner));
        assert_eq!(outer.to_string(), "match failed (caused by: bad pattern)");
        assert_eq!(EvalError::expected("number").message, "type error: expected number");
    }
}
