use super::InferenceError;
use crate::config::{Config, ConfigError};
use crate::error::Result;
use crate::table::{Record, Table};
use enigma_abstraction::{Classifier, FeatureMatrix, Value};
use enigma_models::ModelFactory;
use enigma_training::ArtifactRegistry;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Default registry name for the production classifier.
pub const DEFAULT_REGISTRY_NAME: &str = "baseline_classifier";

/// What to predict on.
#[derive(Debug, Clone, PartialEq)]
pub enum PredictionInput {
    Record(Record),
    Records(Vec<Record>),
    Table(Table),
}

impl PredictionInput {
    pub fn into_table(self) -> Table {
        match self {
            Self::Record(record) => Table::from_records(std::slice::from_ref(&record)),
            Self::Records(records) => Table::from_records(&records),
            Self::Table(table) => table,
        }
    }

    /// A JSON object is one record; an array of objects is many.
    pub fn from_json(value: &serde_json::Value) -> std::result::Result<Self, InferenceError> {
        match value {
            serde_json::Value::Object(_) => json_record(value).map(Self::Record),
            serde_json::Value::Array(items) => items.iter().map(json_record).collect::<std::result::Result<_, _>>().map(Self::Records),
            other => Err(InferenceError::InvalidInput(format!(
                "expected an object or a list of objects, got {other}"
            ))),
        }
    }
}

fn json_record(value: &serde_json::Value) -> std::result::Result<Record, InferenceError> {
    let serde_json::Value::Object(map) = value else {
        return Err(InferenceError::InvalidInput(format!("expected an object, got {value}")));
    };
    map.iter()
        .map(|(key, v)| {
            Value::from_json(v)
                .map(|cell| (key.clone(), cell))
                .ok_or_else(|| InferenceError::InvalidInput(format!("field '{key}' is not a scalar")))
        })
        .collect()
}

impl From<Record> for PredictionInput {
    fn from(record: Record) -> Self {
        Self::Record(record)
    }
}

impl From<Vec<Record>> for PredictionInput {
    fn from(records: Vec<Record>) -> Self {
        Self::Records(records)
    }
}

impl From<Table> for PredictionInput {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

/// Registry coordinates of the model an engine serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub name: String,
    pub version: u32,
}

impl fmt::Display for ArtifactRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} v{}", self.name, self.version)
    }
}

/// Wraps a fitted model with the feature order it was trained on.
///
/// Cloning is cheap and clones share the model, so one engine can be handed
/// to many threads.
#[derive(Debug, Clone)]
pub struct InferenceEngine {
    model: Arc<dyn Classifier>,
    expected_features: Arc<[String]>,
    artifact: Option<ArtifactRef>,
}

impl InferenceEngine {
    pub fn new(
        model: Arc<dyn Classifier>,
        expected_features: Vec<String>,
    ) -> std::result::Result<Self, InferenceError> {
        if expected_features.is_empty() {
            return Err(InferenceError::NoFeatures);
        }
        Ok(Self { model, expected_features: expected_features.into(), artifact: None })
    }

    /// Loads the newest version of `model.registry_name` and takes the
    /// feature order from `data.features`.
    pub fn from_config(config: &Config, registry: &ArtifactRegistry, factory: &ModelFactory) -> Result<Self> {
        let features: Vec<String> = config.require("data.features")?;
        if features.is_empty() {
            return Err(ConfigError::MissingKey("data.features".to_string()).into());
        }
        let name: String = config.get_as_or("model.registry_name", DEFAULT_REGISTRY_NAME.to_string())?;

        let artifact = registry.load(&name, None)?;
        let model = factory.decode(&artifact.bytes)?;
        info!(model = %name, version = artifact.version, kind = model.kind(), "Inference engine ready");

        let mut engine = Self::new(Arc::from(model), features)?;
        engine.artifact = Some(ArtifactRef { name: artifact.name, version: artifact.version });
        Ok(engine)
    }

    pub fn expected_features(&self) -> &[String] {
        &self.expected_features
    }

    pub fn artifact(&self) -> Option<&ArtifactRef> {
        self.artifact.as_ref()
    }

    pub fn model(&self) -> &dyn Classifier {
        self.model.as_ref()
    }

    /// One prediction per input row, in input order.
    ///
    /// Columns are reordered to the training order before the model sees
    /// them; extra columns are ignored.
    pub fn predict(&self, input: impl Into<PredictionInput>) -> std::result::Result<Vec<Value>, InferenceError> {
        let table = input.into().into_table();
        let matrix = build_feature_matrix(&table, &self.expected_features)?;
        let predictions = self.model.predict(&matrix)?;
        if predictions.len() != matrix.n_rows() {
            return Err(InferenceError::PredictionCount { expected: matrix.n_rows(), actual: predictions.len() });
        }
        debug!(rows = predictions.len(), "Predictions produced");
        Ok(predictions)
    }
}

/// Dense matrix of `features` taken from `table` in that order.
pub fn build_feature_matrix(table: &Table, features: &[String]) -> std::result::Result<FeatureMatrix, InferenceError> {
    let missing: Vec<String> = features.iter().filter(|f| !table.has_column(f)).cloned().collect();
    if !missing.is_empty() {
        return Err(InferenceError::MissingFeatures(missing));
    }

    let columns: Vec<_> = features.iter().filter_map(|f| table.column(f)).collect();
    let rows = (0..table.n_rows())
        .map(|row| {
            columns
                .iter()
                .map(|column| {
                    let value = &column.values[row];
                    value.as_f64().ok_or_else(|| InferenceError::NonNumeric {
                        column: column.name.clone(),
                        row,
                        found: value.type_name().to_string(),
                    })
                })
                .collect::<std::result::Result<Vec<f64>, _>>()
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(FeatureMatrix::from_rows(features.to_vec(), rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use enigma_abstraction::ModelError;
    use std::sync::Mutex;

    /// Returns the first column of each row and remembers what it was given.
    #[derive(Debug, Default)]
    struct FirstColumn {
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl Classifier for FirstColumn {
        fn kind(&self) -> &str {
            "first_column"
        }

        fn fit(&mut self, _features: &FeatureMatrix, _labels: &[Value]) -> std::result::Result<(), ModelError> {
            Ok(())
        }

        fn predict(&self, features: &FeatureMatrix) -> std::result::Result<Vec<Value>, ModelError> {
            self.seen.lock().unwrap().push(features.columns().to_vec());
            Ok(features.rows().map(|r| Value::Float(r[0])).collect())
        }

        fn to_bytes(&self) -> std::result::Result<Vec<u8>, ModelError> {
            Ok(Vec::new())
        }
    }

    fn record(pairs: &[(&str, Value)]) -> Record {
        pairs.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect()
    }

    #[test]
    fn test_reorders_columns_to_training_order() {
        let model = Arc::new(FirstColumn::default());
        let engine = InferenceEngine::new(model.clone(), vec!["b".to_string(), "a".to_string()]).unwrap();

        let out = engine
            .predict(record(&[("a", Value::Int(1)), ("b", Value::Int(2)), ("c", Value::Int(3))]))
            .unwrap();

        assert_eq!(out, vec![Value::Float(2.0)]);
        assert_eq!(model.seen.lock().unwrap()[0], vec!["b", "a"]);
    }

    #[test]
    fn test_missing_feature_reported() {
        let engine = InferenceEngine::new(Arc::new(FirstColumn::default()), vec!["a".into(), "b".into()]).unwrap();
        let err = engine.predict(record(&[("a", Value::Int(1))])).unwrap_err();
        assert_eq!(err, InferenceError::MissingFeatures(vec!["b".to_string()]));
    }

    #[test]
    fn test_non_numeric_feature_rejected() {
        let engine = InferenceEngine::new(Arc::new(FirstColumn::default()), vec!["a".into()]).unwrap();
        let err = engine
            .predict(vec![record(&[("a", Value::Int(1))]), record(&[("a", Value::from("x"))])])
            .unwrap_err();
        assert!(matches!(err, InferenceError::NonNumeric { row: 1, .. }));
    }

    #[test]
    fn test_empty_feature_list_rejected() {
        assert_eq!(
            InferenceEngine::new(Arc::new(FirstColumn::default()), Vec::new()).unwrap_err(),
            InferenceError::NoFeatures
        );
    }

    #[test]
    fn test_input_from_json() {
        let one = PredictionInput::from_json(&serde_json::json!({"a": 1, "b": 2.5})).unwrap();
        assert_eq!(one.into_table().n_rows(), 1);

        let many = PredictionInput::from_json(&serde_json::json!([{"a": 1}, {"a": 2}])).unwrap();
        assert_eq!(many.into_table().n_rows(), 2);

        assert!(PredictionInput::from_json(&serde_json::json!(3)).is_err());
        assert!(PredictionInput::from_json(&serde_json::json!({"a": [1]})).is_err());
    }

    #[test]
    fn test_clones_share_model() {
        let model = Arc::new(FirstColumn::default());
        let engine = InferenceEngine::new(model.clone(), vec!["a".into()]).unwrap();
        let clone = engine.clone();
        clone.predict(record(&[("a", Value::Int(1))])).unwrap();
        engine.predict(record(&[("a", Value::Int(2))])).unwrap();
        assert_eq!(model.seen.lock().unwrap().len(), 2);
    }
}
