//! In-memory column-oriented table.
//!
//! Every column holds one [`Value`] per row, and all columns have the same
//! length. Row operations (`take_rows`, `retain_rows`) produce new tables so
//! callers never observe a half-filtered state.

pub mod io;

use enigma_abstraction::Value;
use std::collections::BTreeMap;
use thiserror::Error;

pub use io::{TableFormat, read_csv, read_parquet, read_table, write_csv, write_parquet, write_table};

/// One row keyed by column name.
pub type Record = BTreeMap<String, Value>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch { column: String, expected: usize, actual: usize },

    #[error("duplicate column '{0}'")]
    DuplicateColumn(String),

    #[error("table has no columns")]
    NoColumns,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self { name: name.into(), values }
    }

    pub fn has_missing(&self) -> bool {
        self.values.iter().any(Value::is_missing)
    }

    /// True when every present value is numeric and at least one is present.
    pub fn is_numeric(&self) -> bool {
        let mut present = self.values.iter().filter(|v| !v.is_missing()).peekable();
        present.peek().is_some() && present.all(Value::is_numeric)
    }

    /// Mean of the present numeric values.
    pub fn mean(&self) -> Option<f64> {
        let (sum, count) = self
            .values
            .iter()
            .filter(|v| v.is_numeric())
            .filter_map(Value::as_f64)
            .fold((0.0, 0usize), |(s, c), x| (s + x, c + 1));
        (count > 0).then(|| sum / count as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table, checking lengths and name uniqueness.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut table = Self::new();
        for column in columns {
            table.push_column(column)?;
        }
        Ok(table)
    }

    /// Builds a table from records. Columns appear in first-seen order and
    /// keys a record lacks become `Null`.
    pub fn from_records(records: &[Record]) -> Self {
        let mut names: Vec<&String> = Vec::new();
        for record in records {
            for key in record.keys() {
                if !names.contains(&key) {
                    names.push(key);
                }
            }
        }
        let columns = names
            .into_iter()
            .map(|name| {
                let values = records.iter().map(|r| r.get(name).cloned().unwrap_or_default()).collect();
                Column::new(name.clone(), values)
            })
            .collect();
        Self { columns, n_rows: records.len() }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    /// Appends a column. The first column fixes the row count.
    pub fn push_column(&mut self, column: Column) -> Result<(), TableError> {
        if self.has_column(&column.name) {
            return Err(TableError::DuplicateColumn(column.name));
        }
        if self.columns.is_empty() {
            self.n_rows = column.values.len();
        } else if column.values.len() != self.n_rows {
            return Err(TableError::LengthMismatch {
                column: column.name,
                expected: self.n_rows,
                actual: column.values.len(),
            });
        }
        self.columns.push(column);
        Ok(())
    }

    /// Replaces the column with the same name, or appends it.
    pub fn set_column(&mut self, column: Column) -> Result<(), TableError> {
        if column.values.len() != self.n_rows && !self.columns.is_empty() {
            return Err(TableError::LengthMismatch {
                column: column.name,
                expected: self.n_rows,
                actual: column.values.len(),
            });
        }
        match self.column_mut(&column.name) {
            Some(existing) => {
                existing.values = column.values;
                Ok(())
            }
            None => self.push_column(column),
        }
    }

    /// Keeps the named columns in the given order; unknown names are skipped.
    pub fn select(&self, names: &[&str]) -> Self {
        let columns: Vec<Column> = names.iter().filter_map(|n| self.column(n).cloned()).collect();
        let n_rows = if columns.is_empty() { 0 } else { self.n_rows };
        Self { columns, n_rows }
    }

    /// New table holding `indices` in the given order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|c| Column::new(c.name.clone(), indices.iter().map(|&i| c.values[i].clone()).collect()))
            .collect();
        Self { columns, n_rows: indices.len() }
    }

    /// New table holding rows for which `keep(row_index)` is true.
    pub fn retain_rows(&self, keep: impl Fn(usize) -> bool) -> Self {
        let indices: Vec<usize> = (0..self.n_rows).filter(|&i| keep(i)).collect();
        self.take_rows(&indices)
    }

    /// Whether any cell in row `idx` is missing.
    pub fn row_has_missing(&self, idx: usize) -> bool {
        self.columns.iter().any(|c| c.values[idx].is_missing())
    }

    pub fn record(&self, idx: usize) -> Record {
        self.columns.iter().map(|c| (c.name.clone(), c.values[idx].clone())).collect()
    }

    pub fn records(&self) -> Vec<Record> {
        (0..self.n_rows).map(|i| self.record(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::from_columns(vec![
            Column::new("a", vec![Value::Int(1), Value::Null, Value::Int(3)]),
            Column::new("b", vec![Value::from("x"), Value::from("y"), Value::from("z")]),
        ])
        .unwrap()
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let err = Table::from_columns(vec![
            Column::new("a", vec![Value::Int(1)]),
            Column::new("b", vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, TableError::LengthMismatch { .. }));
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let mut table = sample();
        assert_eq!(
            table.push_column(Column::new("a", vec![Value::Null; 3])),
            Err(TableError::DuplicateColumn("a".to_string()))
        );
    }

    #[test]
    fn test_from_records_fills_absent_keys() {
        let mut r1 = Record::new();
        r1.insert("a".to_string(), Value::Int(1));
        let mut r2 = Record::new();
        r2.insert("b".to_string(), Value::Int(2));

        let table = Table::from_records(&[r1, r2]);
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.column("a").unwrap().values, vec![Value::Int(1), Value::Null]);
        assert_eq!(table.column("b").unwrap().values, vec![Value::Null, Value::Int(2)]);
    }

    #[test]
    fn test_select_and_take_rows() {
        let table = sample();
        let picked = table.select(&["b", "a", "missing"]);
        assert_eq!(picked.column_names(), vec!["b", "a"]);

        let rows = table.take_rows(&[2, 0]);
        assert_eq!(rows.n_rows(), 2);
        assert_eq!(rows.column("a").unwrap().values, vec![Value::Int(3), Value::Int(1)]);
    }

    #[test]
    fn test_retain_rows_without_missing() {
        let table = sample();
        let clean = table.retain_rows(|i| !table.row_has_missing(i));
        assert_eq!(clean.n_rows(), 2);
    }

    #[test]
    fn test_column_numeric_and_mean() {
        let table = sample();
        let a = table.column("a").unwrap();
        assert!(a.is_numeric());
        assert!((a.mean().unwrap() - 2.0).abs() < 1e-12);
        assert!(!table.column("b").unwrap().is_numeric());
        assert!(!Column::new("empty", vec![Value::Null]).is_numeric());
    }

    #[test]
    fn test_set_column_replaces() {
        let mut table = sample();
        table.set_column(Column::new("a", vec![Value::Int(0); 3])).unwrap();
        assert_eq!(table.n_cols(), 2);
        assert_eq!(table.column("a").unwrap().values[1], Value::Int(0));
        assert!(table.set_column(Column::new("c", vec![Value::Int(0)])).is_err());
    }
}
