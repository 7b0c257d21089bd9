use crate::error::EvalError;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;

/// Runtime value flowing through evaluation. Exactly one variant at a time;
/// values are never mutated in place by the evaluator.
#[derive(Debug, Clone)]
pub enum Value {
    String(String),
    Number(f64),
    Boolean(bool),
    Date(DateTime<Utc>),
    Array(Vec<Value>),
    Regex(RegexValue),
    Error(EvalError),
    Null,
    /// Opaque handle to a host structure such as a cell or row.
    Object(Arc<dyn HostObject>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Date,
    Array,
    Regex,
    Error,
    Null,
    Object,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Date => "date",
            ValueKind::Array => "array",
            ValueKind::Regex => "regex",
            ValueKind::Error => "error",
            ValueKind::Null => "null",
            ValueKind::Object => "object",
        }
    }
}

/// Structure supplied by the host (cells, rows, parsed JSON objects).
/// Implementations must be immutable snapshots or exclusively owned per worker.
pub trait HostObject: Send + Sync + Debug {
    fn type_name(&self) -> &'static str;

    /// `base.name` access; `None` means the field does not exist.
    fn field(&self, name: &str) -> Option<Value>;

    /// `base[key]` access; defaults to field lookup for string keys.
    fn index(&self, key: &Value) -> Option<Value> {
        match key {
            Value::String(s) => self.field(s),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value;
}

/// Compiled regular expression, from a `/.../` literal or built by a function.
#[derive(Clone)]
pub struct RegexValue {
    pub source: String,
    pub case_insensitive: bool,
    pub compiled: Arc<Regex>,
}

impl RegexValue {
    pub fn new(source: &str, case_insensitive: bool) -> Result<Self, regex::Error> {
        let compiled = regex::RegexBuilder::new(source)
            .case_insensitive(case_insensitive)
            .build()?;
        Ok(Self { source: source.to_string(), case_insensitive, compiled: Arc::new(compiled) })
    }
}

impl PartialEq for RegexValue {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.case_insensitive == other.case_insensitive
    }
}

impl Debug for RegexValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, if self.case_insensitive { "i" } else { "" })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b) || a.to_json() == b.to_json(),
            _ => false,
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Number(_) => ValueKind::Number,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Date(_) => ValueKind::Date,
            Value::Array(_) => ValueKind::Array,
            Value::Regex(_) => ValueKind::Regex,
            Value::Error(_) => ValueKind::Error,
            Value::Null => ValueKind::Null,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Name reported by the `type()` function.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Object(o) => o.type_name(),
            other => other.kind().name(),
        }
    }

    pub fn string<S: Into<String>>(s: S) -> Self {
        Value::String(s.into())
    }

    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Array(items.into_iter().map(|s| Value::String(s.into())).collect())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&EvalError> {
        match self {
            Value::Error(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null or the empty string.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null => true,
            Value::String(s) => s.is_empty(),
            _ => false,
        }
    }

    /// Numeric view used by arithmetic and relational operators: numbers as-is,
    /// strings only when they parse as a number in full.
    pub fn coerce_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::String(s) => parse_number(s),
            _ => None,
        }
    }

    /// Convert host JSON into a value. Objects become opaque `JsonObject` handles.
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Array(items.into_iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Object(Arc::new(crate::host::JsonObject::new(map))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(format_number(*n))),
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Date(d) => serde_json::Value::String(format_date(d)),
            Value::Array(items) => serde_json::Value::Array(items.iter().map(Value::to_json).collect()),
            Value::Regex(r) => serde_json::Value::String(r.source.clone()),
            Value::Error(e) => serde_json::json!({ "error": e.message }),
            Value::Null => serde_json::Value::Null,
            Value::Object(o) => o.to_json(),
        }
    }
}

impl From<EvalError> for Value {
    fn from(e: EvalError) -> Self {
        Value::Error(e)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

/// Parses a string that is a number in full (surrounding whitespace allowed).
/// Rejects `inf`/`NaN` spellings that `f64::from_str` would otherwise accept.
pub fn parse_number(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() || !t.bytes().any(|b| b.is_ascii_digit()) {
        return None;
    }
    if !t.bytes().all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E')) {
        return None;
    }
    t.parse::<f64>().ok()
}

pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

pub fn format_date(d: &DateTime<Utc>) -> String {
    d.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// String form used by `toString`, concatenation and splitting.
impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => f.write_str(&format_date(d)),
            Value::Array(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
            Value::Regex(r) => f.write_str(&r.source),
            Value::Error(e) => write!(f, "{}", e),
            Value::Null => Ok(()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Date(d) => serializer.serialize_str(&format_date(d)),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Regex(r) => serializer.serialize_str(&r.source),
            Value::Error(e) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("error", &e.message)?;
                map.end()
            }
            Value::Null => serializer.serialize_none(),
            Value::Object(o) => o.to_json().serialize(serializer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EvalError;

    #[test]
    fn numeric_strings_coerce_in_full_only() {
        assert_eq!(Value::string("42").coerce_number(), Some(42.0));
        assert_eq!(Value::string(" 1.5e2 ").coerce_number(), Some(150.0));
        assert_eq!(Value::string("12abc").coerce_number(), None);
        assert_eq!(Value::string("NaN").coerce_number(), None);
        assert_eq!(Value::string("").coerce_number(), None);
        assert_eq!(Value::Boolean(true).coerce_number(), None);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Number(3.0).to_string(), "3");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::strings(["a", "b"]).to_string(), "[\"a\",\"b\"]");
    }

    #[test]
    fn serializes_errors_distinguishably() {
        let v = Value::Array(vec![Value::Number(1.0), Value::Error(EvalError::semantic("boom")), Value::Null]);
        assert_eq!(serde_json::to_string(&v).unwrap(), "[1.0,{\"error\":\"boom\"},null]");
    }

    #[test]
    fn json_round_trip_through_host_object() {
        let json = serde_json::json!({"name": "Ada", "tags": ["x"]});
        let v = Value::from_json(json.clone());
        assert_eq!(v.type_name(), "object");
        assert_eq!(v.to_json(), json);
    }
}
