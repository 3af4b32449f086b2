//! Tabular record model shared by both ledgers.
//!
//! A `Table` is an ordered list of column names plus rows of raw `Cell`s.
//! Every row carries exactly one cell per column; a column absent from a
//! source object is stored as `Cell::Empty`. Tables load from a JSON array
//! of objects or from JSON Lines and keep first-seen column order on output.

use std::fmt;
use std::path::Path;

use indexmap::IndexMap;
use serde_json::{Map, Value};

/// A single raw spreadsheet value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Absent value: JSON `null`, a missing column, or a NaN number
    Empty,
    Bool(bool),
    /// A JSON number written without fraction or exponent
    Integer(i64),
    Number(f64),
    Text(String),
}

impl Cell {
    /// Build a numeric cell, folding NaN into `Empty`.
    pub fn number(value: f64) -> Self {
        if value.is_nan() { Cell::Empty } else { Cell::Number(value) }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// Interpret the cell as a finite number.
    ///
    /// Integers and numbers pass through; text is trimmed and parsed. Booleans, empty
    /// cells and non-finite values yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Integer(i) => Some(*i as f64),
            Cell::Number(n) if n.is_finite() => Some(*n),
            Cell::Text(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => Cell::Empty,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Cell::Integer(i),
                None => n.as_f64().map_or(Cell::Empty, Cell::number),
            },
            Value::String(s) => Cell::Text(s.clone()),
            // Nested values are kept verbatim as compact JSON text
            other => Cell::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Cell::Empty => Value::Null,
            Cell::Bool(b) => Value::Bool(*b),
            Cell::Integer(i) => Value::from(*i),
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Text(s) => Value::String(s.clone()),
        }
    }
}

/// Display text: empty cells render as "", whole numbers without a trailing `.0`.
impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Bool(b) => write!(f, "{b}"),
            Cell::Integer(i) => write!(f, "{i}"),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Integer(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(value: Option<T>) -> Self {
        value.map_or(Cell::Empty, Into::into)
    }
}

/// Errors raised while loading or assembling a table
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid JSON on line {line}: {source}")]
    JsonLine {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("expected a JSON array of row objects")]
    NotAnArray,

    #[error("row {row} is not a JSON object")]
    NotAnObject { row: usize },

    #[error("row has {found} cells but the table has {expected} columns")]
    RowWidth { expected: usize, found: usize },
}

/// On-disk encoding of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    /// A single JSON array of row objects
    Json,
    /// One JSON object per line
    Jsonl,
}

impl TableFormat {
    /// Pick a format from a file extension; anything unknown is JSON.
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("jsonl") | Some("ndjson") => TableFormat::Jsonl,
            _ => TableFormat::Json,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Json => "json",
            TableFormat::Jsonl => "jsonl",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns, rows: Vec::new() }
    }

    /// Build a table from explicit rows, checking every row's width.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, TableError> {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Build a table from row objects, collecting the union of keys in
    /// first-seen order.
    pub fn from_objects<'a, I>(objects: I) -> Self
    where
        I: IntoIterator<Item = &'a Map<String, Value>>,
    {
        let objects: Vec<&Map<String, Value>> = objects.into_iter().collect();

        let mut columns: IndexMap<&str, ()> = IndexMap::new();
        for obj in &objects {
            for key in obj.keys() {
                columns.entry(key.as_str()).or_default();
            }
        }

        let rows = objects
            .iter()
            .map(|obj| {
                columns
                    .keys()
                    .map(|col| obj.get(*col).map_or(Cell::Empty, Cell::from_json))
                    .collect()
            })
            .collect();

        Self {
            columns: columns.keys().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Parse a JSON array of row objects.
    pub fn parse_json(text: &str) -> Result<Self, TableError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_json_value(&value)
    }

    /// Parse JSON Lines; blank lines are skipped.
    pub fn parse_jsonl(text: &str) -> Result<Self, TableError> {
        let mut objects = Vec::new();
        for (i, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let value: Value = serde_json::from_str(line)
                .map_err(|source| TableError::JsonLine { line: i + 1, source })?;
            match value {
                Value::Object(obj) => objects.push(obj),
                _ => return Err(TableError::NotAnObject { row: objects.len() + 1 }),
            }
        }
        Ok(Self::from_objects(&objects))
    }

    pub fn parse(text: &str, format: TableFormat) -> Result<Self, TableError> {
        match format {
            TableFormat::Json => Self::parse_json(text),
            TableFormat::Jsonl => Self::parse_jsonl(text),
        }
    }

    pub fn from_json_value(value: &Value) -> Result<Self, TableError> {
        let Value::Array(items) = value else {
            return Err(TableError::NotAnArray);
        };

        let mut objects = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::Object(obj) => objects.push(obj),
                _ => return Err(TableError::NotAnObject { row: i + 1 }),
            }
        }
        Ok(Self::from_objects(objects))
    }

    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), TableError> {
        if row.len() != self.columns.len() {
            return Err(TableError::RowWidth {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    /// Copy the rows named by `order` into a new table with the same columns.
    ///
    /// Indices out of range are skipped.
    pub fn select_rows(&self, order: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: order
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// Append a column, or overwrite an existing column of the same name in
    /// place. Rows beyond the end of `cells` get `Cell::Empty`; surplus cells
    /// are dropped.
    pub fn set_column<I>(&mut self, name: &str, cells: I)
    where
        I: IntoIterator<Item = Cell>,
    {
        let cells = cells.into_iter().chain(std::iter::repeat(Cell::Empty));

        match self.column_index(name) {
            Some(idx) => {
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row[idx] = cell;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, cell) in self.rows.iter_mut().zip(cells) {
                    row.push(cell);
                }
            }
        }
    }

    /// Rows as JSON objects in column order.
    pub fn to_objects(&self) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(col, cell)| (col.clone(), cell.to_json()))
                    .collect()
            })
            .collect()
    }

    pub fn to_json_string(&self) -> Result<String, TableError> {
        Ok(serde_json::to_string_pretty(&self.to_objects())?)
    }

    pub fn to_jsonl_string(&self) -> Result<String, TableError> {
        let mut out = String::new();
        for obj in self.to_objects() {
            out.push_str(&serde_json::to_string(&obj)?);
            out.push('\n');
        }
        Ok(out)
    }

    pub fn render(&self, format: TableFormat) -> Result<String, TableError> {
        match format {
            TableFormat::Json => self.to_json_string(),
            TableFormat::Jsonl => self.to_jsonl_string(),
        }
    }
}
