//! Model abstraction layer for Enigma.
//!
//! This crate defines the types shared by every model implementation and the
//! pipelines that feed them: the tabular cell [`Value`], the dense
//! [`FeatureMatrix`] handed to a model, and the [`Classifier`] trait.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Represents an error that can occur when fitting or querying a model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// `predict` or `to_bytes` was called before `fit`.
    #[error("Model has not been fitted")]
    NotFitted,

    /// The input data cannot be used by the model (empty, ragged, non-finite).
    #[error("Invalid model input: {0}")]
    InvalidInput(String),

    /// The feature columns differ from the ones the model was fitted on.
    #[error("Feature mismatch: model was fitted on {expected:?}, got {actual:?}")]
    FeatureMismatch {
        /// Columns seen at fit time.
        expected: Vec<String>,
        /// Columns supplied now.
        actual: Vec<String>,
    },

    /// No factory is registered for the requested model kind.
    #[error("Unknown model kind: {0}")]
    UnknownKind(String),

    /// A hyper-parameter is missing or out of range.
    #[error("Invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Parameter name as it appears in configuration.
        name: String,
        /// What is wrong with it.
        message: String,
    },

    /// An error occurred while encoding or decoding a model blob.
    #[error("Serialization Error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// A single tabular cell.
///
/// Serialized untagged so that JSON records and prediction outputs read as
/// plain scalars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Missing value.
    #[default]
    Null,
    /// Boolean cell.
    Bool(bool),
    /// Integer cell.
    Int(i64),
    /// Floating point cell. `NaN` counts as missing.
    Float(f64),
    /// Text cell.
    Str(String),
}

impl Value {
    /// Returns true for `Null` and for floating point `NaN`.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Float(f) => f.is_nan(),
            _ => false,
        }
    }

    /// Returns true for integer and float cells that are not missing.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int(_)) || matches!(self, Self::Float(f) if !f.is_nan())
    }

    /// Numeric view of the cell, used when building a [`FeatureMatrix`].
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) if !f.is_nan() => Some(*f),
            Self::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
        }
    }

    /// Converts a JSON scalar. Arrays and objects have no cell representation.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => Some(Self::Null),
            serde_json::Value::Bool(b) => Some(Self::Bool(*b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Self::Int)
                .or_else(|| n.as_f64().map(Self::Float)),
            serde_json::Value::String(s) => Some(Self::Str(s.clone())),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Dense, row-major numeric input for a model.
///
/// Column names travel with the data so implementations can check that the
/// ordering matches what they were fitted on.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    data: Vec<f64>,
    n_rows: usize,
}

impl FeatureMatrix {
    /// Builds a matrix from row vectors.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidInput` if any row width differs from the
    /// number of columns.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        let width = columns.len();
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(width * n_rows);
        for (idx, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(ModelError::InvalidInput(format!(
                    "row {idx} has {} values, expected {width}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Ok(Self { columns, data, n_rows })
    }

    /// Column names in the order the values are laid out.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// Values of row `idx`.
    ///
    /// # Panics
    /// Panics if `idx >= n_rows()`.
    pub fn row(&self, idx: usize) -> &[f64] {
        let width = self.n_cols();
        &self.data[idx * width..(idx + 1) * width]
    }

    /// Iterates rows in order.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows).map(move |idx| self.row(idx))
    }
}

/// A trainable classifier with an opaque persisted form.
///
/// All models must be `Send + Sync` so a fitted model can be shared across
/// threads behind an `Arc` once training is done.
pub trait Classifier: Send + Sync + fmt::Debug {
    /// Registry key of the implementation (e.g. "baseline").
    fn kind(&self) -> &str;

    /// Fits the model on `features` with one label per row.
    ///
    /// # Errors
    /// Returns a `ModelError` if the inputs are empty, ragged, or contain
    /// non-finite values.
    fn fit(&mut self, features: &FeatureMatrix, labels: &[Value]) -> Result<(), ModelError>;

    /// Predicts one label per row, in row order.
    ///
    /// # Errors
    /// Returns a `ModelError` if the model is not fitted or the columns do not
    /// match the fitted ones.
    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Value>, ModelError>;

    /// Serializes the fitted model into a self-describing blob.
    ///
    /// # Errors
    /// Returns a `ModelError` if the model is not fitted or encoding fails.
    fn to_bytes(&self) -> Result<Vec<u8>, ModelError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_missing() {
        assert!(Value::Null.is_missing());
        assert!(Value::Float(f64::NAN).is_missing());
        assert!(!Value::Float(0.0).is_missing());
        assert!(!Value::Str(String::new()).is_missing());
    }

    #[test]
    fn test_value_untagged_json() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 3, 2.5, "x"]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Bool(true),
                Value::Int(3),
                Value::Float(2.5),
                Value::Str("x".to_string())
            ]
        );
        assert_eq!(serde_json::to_string(&Value::Int(1)).unwrap(), "1");
    }

    #[test]
    fn test_value_from_json_rejects_containers() {
        assert_eq!(Value::from_json(&serde_json::json!([1, 2])), None);
        assert_eq!(Value::from_json(&serde_json::json!(7)), Some(Value::Int(7)));
    }

    #[test]
    fn test_feature_matrix_rejects_ragged_rows() {
        let err = FeatureMatrix::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![3.0]],
        )
        .unwrap_err();
        assert!(matches!(err, ModelError::InvalidInput(_)));
    }

    #[test]
    fn test_feature_matrix_rows() {
        let m = FeatureMatrix::from_rows(
            vec!["a".to_string(), "b".to_string()],
            vec![vec![1.0, 2.0], vec![3.0, 4.0]],
        )
        .unwrap();
        assert_eq!(m.n_rows(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.rows().count(), 2);
    }
}
