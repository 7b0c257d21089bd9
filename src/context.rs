use crate::host::{Cell, Cells, Row, RowHandle};
use crate::types::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Environment the evaluator reads variables from.
pub trait EvaluationContext {
    fn get_variable(&self, name: &str) -> Option<&Value>;
}

/// One frame of variable bindings with an optional parent. Iteration forms
/// create a child frame per element and drop it afterwards; frames are never
/// shared between iterations.
#[derive(Default)]
pub struct Bindings<'p> {
    parent: Option<&'p dyn EvaluationContext>,
    vars: HashMap<String, Value>,
}

impl Bindings<'static> {
    pub fn new() -> Self {
        Self { parent: None, vars: HashMap::new() }
    }

    pub fn from_map(vars: HashMap<String, Value>) -> Self {
        Self { parent: None, vars }
    }

    /// Standard bindings for evaluating against one cell of a row:
    /// `value`, `cell`, `cells`, `row`, `rowIndex` and `columnName`.
    pub fn for_cell(row: &Arc<Row>, column: &str) -> Self {
        let value = row.cell(column).cloned().unwrap_or(Value::Null);
        Bindings::new()
            .with("value", value.clone())
            .with("cell", Value::Object(Arc::new(Cell::new(value))))
            .with("cells", Value::Object(Arc::new(Cells::new(Arc::clone(row)))))
            .with("row", Value::Object(Arc::new(RowHandle::new(Arc::clone(row)))))
            .with("rowIndex", Value::Number(row.index as f64))
            .with("columnName", Value::String(column.to_string()))
    }
}

impl<'p> Bindings<'p> {
    /// Empty frame whose lookups fall back to `parent`.
    pub fn child_of(parent: &'p dyn EvaluationContext) -> Self {
        Self { parent: Some(parent), vars: HashMap::new() }
    }

    pub fn with<N: Into<String>>(mut self, name: N, value: Value) -> Self {
        self.vars.insert(name.into(), value);
        self
    }

    pub fn set<N: Into<String>>(&mut self, name: N, value: Value) {
        self.vars.insert(name.into(), value);
    }

    /// Names bound in this frame only.
    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }
}

impl EvaluationContext for Bindings<'_> {
    fn get_variable(&self, name: &str) -> Option<&Value> {
        match self.vars.get(name) {
            Some(v) => Some(v),
            None => self.parent.and_then(|p| p.get_variable(name)),
        }
    }
}

impl EvaluationContext for HashMap<String, Value> {
    fn get_variable(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }
}
