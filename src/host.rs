//! Host-side structures exposed to expressions as opaque objects.

use crate::types::{HostObject, Value};
use std::sync::Arc;

/// One row of a table: an index, two flags and a cell value per column.
#[derive(Debug, Clone)]
pub struct Row {
    pub index: usize,
    pub starred: bool,
    pub flagged: bool,
    columns: Arc<Vec<String>>,
    cells: Vec<Value>,
}

impl Row {
    pub fn new<I, S>(index: usize, columns: I, cells: Vec<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_columns(index, Arc::new(columns.into_iter().map(Into::into).collect()), cells)
    }

    /// Builds a row sharing an existing column list.
    pub fn with_columns(index: usize, columns: Arc<Vec<String>>, mut cells: Vec<Value>) -> Self {
        cells.resize(columns.len(), Value::Null);
        Self { index, starred: false, flagged: false, columns, cells }
    }

    /// Row from a JSON object keyed by column name. Keys outside `columns`
    /// are ignored; missing columns are null.
    pub fn from_json(index: usize, columns: Arc<Vec<String>>, object: &serde_json::Map<String, serde_json::Value>) -> Self {
        let cells = columns
            .iter()
            .map(|c| object.get(c).cloned().map(Value::from_json).unwrap_or(Value::Null))
            .collect();
        Self::with_columns(index, columns, cells)
    }

    pub fn starred(mut self, starred: bool) -> Self {
        self.starred = starred;
        self
    }

    pub fn flagged(mut self, flagged: bool) -> Self {
        self.flagged = flagged;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cell(&self, column: &str) -> Option<&Value> {
        self.columns.iter().position(|c| c == column).and_then(|i| self.cells.get(i))
    }

    fn to_json(&self) -> serde_json::Value {
        let map = self
            .columns
            .iter()
            .zip(&self.cells)
            .map(|(c, v)| (c.clone(), v.to_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// `cell` binding: the current cell, exposing `value`.
#[derive(Debug)]
pub struct Cell {
    value: Value,
}

impl Cell {
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl HostObject for Cell {
    fn type_name(&self) -> &'static str {
        "cell"
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "value" => Some(self.value.clone()),
            _ => None,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({ "value": self.value.to_json() })
    }
}

/// `cells` binding: every cell of the row, addressed by column name.
/// Empty columns still yield a cell whose value is null.
#[derive(Debug)]
pub struct Cells {
    row: Arc<Row>,
}

impl Cells {
    pub fn new(row: Arc<Row>) -> Self {
        Self { row }
    }
}

impl HostObject for Cells {
    fn type_name(&self) -> &'static str {
        "cells"
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.row.cell(name).map(|v| Value::Object(Arc::new(Cell::new(v.clone()))))
    }

    fn to_json(&self) -> serde_json::Value {
        let map = self
            .row
            .columns()
            .iter()
            .zip(&self.row.cells)
            .map(|(c, v)| (c.clone(), serde_json::json!({ "value": v.to_json() })))
            .collect();
        serde_json::Value::Object(map)
    }
}

/// `row` binding.
#[derive(Debug)]
pub struct RowHandle {
    row: Arc<Row>,
}

impl RowHandle {
    pub fn new(row: Arc<Row>) -> Self {
        Self { row }
    }
}

impl HostObject for RowHandle {
    fn type_name(&self) -> &'static str {
        "row"
    }

    fn field(&self, name: &str) -> Option<Value> {
        Some(match name {
            "index" => Value::Number(self.row.index as f64),
            "starred" => Value::Boolean(self.row.starred),
            "flagged" => Value::Boolean(self.row.flagged),
            "cells" => Value::Object(Arc::new(Cells::new(Arc::clone(&self.row)))),
            "columnNames" => Value::strings(self.row.columns().iter().cloned()),
            _ => return None,
        })
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "index": self.row.index,
            "starred": self.row.starred,
            "flagged": self.row.flagged,
            "cells": self.row.to_json(),
        })
    }
}

/// Parsed JSON object; fields convert lazily on access.
#[derive(Debug)]
pub struct JsonObject {
    map: serde_json::Map<String, serde_json::Value>,
}

impl JsonObject {
    pub fn new(map: serde_json::Map<String, serde_json::Value>) -> Self {
        Self { map }
    }
}

impl HostObject for JsonObject {
    fn type_name(&self) -> &'static str {
        "object"
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.map.get(name).cloned().map(Value::from_json)
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(self.map.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Arc<Row> {
        Arc::new(Row::new(3, ["name", "city"], vec![Value::string("Ada")]).starred(true))
    }

    #[test]
    fn missing_trailing_cells_are_null() {
        let row = sample();
        assert_eq!(row.cell("city"), Some(&Value::Null));
        assert_eq!(row.cell("country"), None);
    }

    #[test]
    fn row_fields() {
        let handle = RowHandle::new(sample());
        assert_eq!(handle.field("index"), Some(Value::Number(3.0)));
        assert_eq!(handle.field("starred"), Some(Value::Boolean(true)));
        assert_eq!(handle.field("flagged"), Some(Value::Boolean(false)));
        assert_eq!(handle.field("columnNames"), Some(Value::strings(["name", "city"])));
        assert_eq!(handle.field("nope"), None);
    }

    #[test]
    fn cells_by_column_name() {
        let cells = Cells::new(sample());
        let Some(Value::Object(cell)) = cells.field("name") else { panic!("expected a cell") };
        assert_eq!(cell.field("value"), Some(Value::string("Ada")));
        assert!(cells.index(&Value::string("missing")).is_none());
    }

    #[test]
    fn row_from_json_object() {
        let columns = Arc::new(vec!["a".to_string(), "b".to_string()]);
        let json = serde_json::json!({"a": 1, "c": true});
        let row = Row::from_json(0, columns, json.as_object().unwrap());
        assert_eq!(row.cell("a"), Some(&Value::Number(1.0)));
        assert_eq!(row.cell("b"), Some(&Value::Null));
    }
}
