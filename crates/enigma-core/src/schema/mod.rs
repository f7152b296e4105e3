//! Feature schema and the preprocessing pipeline that enforces it.

mod pipeline;

pub use pipeline::{NoopObserver, SchemaPipeline, Stage, StageObserver};

use crate::config::{Config, ConfigError};
use enigma_abstraction::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Missing required features in dataset: {0:?}")]
    MissingColumns(Vec<String>),

    #[error("Failed type casting for '{column}' to {target}: {message}")]
    Cast { column: String, target: CastType, message: String },
}

/// Target of a declared column cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CastType {
    Int,
    Float,
    Str,
    Bool,
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Str => "str",
            Self::Bool => "bool",
        })
    }
}

impl FromStr for CastType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "int" | "int32" | "int64" | "integer" => Ok(Self::Int),
            "float" | "float32" | "float64" | "double" => Ok(Self::Float),
            "str" | "string" | "object" => Ok(Self::Str),
            "bool" | "boolean" => Ok(Self::Bool),
            other => Err(format!("unknown cast type '{other}'")),
        }
    }
}

impl CastType {
    /// Converts one cell. Missing values stay missing except for `Int`, which
    /// has no missing representation.
    pub fn cast(self, value: &Value) -> Result<Value, String> {
        if value.is_missing() {
            return match self {
                Self::Int => Err("missing value cannot be cast to int".to_string()),
                Self::Float => Ok(Value::Float(f64::NAN)),
                Self::Str | Self::Bool => Ok(Value::Null),
            };
        }
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),

            (Self::Int, Value::Int(i)) => Ok(Value::Int(*i)),
            (Self::Int, Value::Float(f)) => {
                if f.is_finite() && f.abs() < 9.2e18 {
                    Ok(Value::Int(f.trunc() as i64))
                } else {
                    Err(format!("{f} is out of range for int"))
                }
            }
            (Self::Int, Value::Bool(b)) => Ok(Value::Int(i64::from(*b))),
            (Self::Int, Value::Str(s)) => s.trim().parse::<i64>().map(Value::Int).map_err(|e| format!("'{s}': {e}")),

            (Self::Float, Value::Str(s)) => {
                s.trim().parse::<f64>().map(Value::Float).map_err(|e| format!("'{s}': {e}"))
            }
            (Self::Float, v) => v.as_f64().map(Value::Float).ok_or_else(|| format!("cannot cast {v}")),

            (Self::Str, v) => Ok(Value::Str(v.to_string())),

            (Self::Bool, Value::Bool(b)) => Ok(Value::Bool(*b)),
            (Self::Bool, Value::Int(i)) => Ok(Value::Bool(*i != 0)),
            (Self::Bool, Value::Float(f)) => Ok(Value::Bool(*f != 0.0)),
            (Self::Bool, Value::Str(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(format!("'{s}' is not a boolean")),
            },
        }
    }
}

/// Declared shape of the model input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSchema {
    /// Required feature columns, in model order.
    pub features: Vec<String>,
    /// Label column, kept in the output when present.
    pub label: Option<String>,
    /// Per-column replacement for missing values.
    pub fill_values: BTreeMap<String, Value>,
    /// Per-column type casts.
    pub cast_types: BTreeMap<String, CastType>,
    /// Drop rows with any missing value instead of filling.
    pub dropna: bool,
}

impl FeatureSchema {
    pub fn new(features: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self { features: features.into_iter().map(Into::into).collect(), ..Self::default() }
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_fill(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fill_values.insert(column.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_cast(mut self, column: impl Into<String>, cast: CastType) -> Self {
        self.cast_types.insert(column.into(), cast);
        self
    }

    #[must_use]
    pub fn with_dropna(mut self, dropna: bool) -> Self {
        self.dropna = dropna;
        self
    }

    /// Reads `data.features`, `data.label_col`, and the `preprocess` section.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let features: Vec<String> = config.require("data.features")?;
        if features.is_empty() {
            return Err(ConfigError::MissingKey("data.features".to_string()));
        }
        let label: Option<String> = config.get_as("data.label_col")?;

        let raw_fills: BTreeMap<String, serde_json::Value> = config.get_as_or("preprocess.fill_values", BTreeMap::new())?;
        let fill_values = raw_fills
            .into_iter()
            .map(|(column, raw)| {
                Value::from_json(&raw).map(|v| (column.clone(), v)).ok_or_else(|| ConfigError::InvalidValue {
                    key: format!("preprocess.fill_values.{column}"),
                    message: "fill value must be a scalar".to_string(),
                })
            })
            .collect::<Result<_, _>>()?;

        let raw_casts: BTreeMap<String, String> = config.get_as_or("preprocess.cast_types", BTreeMap::new())?;
        let cast_types = raw_casts
            .into_iter()
            .map(|(column, name)| {
                name.parse::<CastType>().map(|c| (column.clone(), c)).map_err(|message| ConfigError::InvalidValue {
                    key: format!("preprocess.cast_types.{column}"),
                    message,
                })
            })
            .collect::<Result<_, _>>()?;

        let dropna = config.get_as_or("preprocess.dropna", false)?;
        Ok(Self { features, label, fill_values, cast_types, dropna })
    }
}
