use crate::config::Config;
use crate::error::{EnigmaError, Result};
use crate::inference::{InferenceEngine, PredictionInput};
use crate::schema::SchemaPipeline;
use crate::table::{Column, Table, TableFormat, read_table, write_table};
use enigma_abstraction::Value;
use enigma_models::ModelFactory;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the column appended by batch inference.
pub const PREDICTION_COLUMN: &str = "prediction";

/// Result of a batch run: the input rows with predictions appended.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutput {
    pub table: Table,
    /// Where the table was written, if an output path was given.
    pub output_path: Option<PathBuf>,
}

/// Preprocessing plus the engine, for real-time and batch prediction.
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    preprocessor: SchemaPipeline,
    engine: InferenceEngine,
}

impl InferencePipeline {
    pub fn new(preprocessor: SchemaPipeline, engine: InferenceEngine) -> Self {
        Self { preprocessor, engine }
    }

    /// Loads the latest registered model named by the configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let preprocessor = SchemaPipeline::from_config(config)?;
        let registry = super::open_registry(config)?;
        let engine = InferenceEngine::from_config(config, &registry, &ModelFactory::with_defaults())?;
        Ok(Self::new(preprocessor, engine))
    }

    pub fn engine(&self) -> &InferenceEngine {
        &self.engine
    }

    /// Transforms `input` and predicts, one value per input row.
    pub fn predict(&self, input: impl Into<PredictionInput>) -> Result<Vec<Value>> {
        let table = input.into().into_table();
        self.predict_table(&table)
    }

    fn predict_table(&self, table: &Table) -> Result<Vec<Value>> {
        let processed = self.preprocessor.transform(table)?;
        let predictions = self.engine.predict(processed)?;
        if predictions.len() != table.n_rows() {
            return Err(EnigmaError::RowCountMismatch { rows: table.n_rows(), predictions: predictions.len() });
        }
        Ok(predictions)
    }

    /// Predicts every row of a CSV or Parquet file.
    ///
    /// The output keeps the original, untransformed columns and row order and
    /// appends a `prediction` column. An output path without an extension is
    /// written as CSV.
    pub fn batch_predict(&self, input_path: &Path, output_path: Option<&Path>) -> Result<BatchOutput> {
        TableFormat::from_path(input_path)?;
        let output_path = output_path.map(|p| {
            if p.extension().is_none() { p.with_extension("csv") } else { p.to_path_buf() }
        });
        if let Some(path) = &output_path {
            TableFormat::from_path(path)?;
        }

        let original = read_table(input_path)?;
        info!(path = %input_path.display(), rows = original.n_rows(), "Running batch inference");
        let predictions = self.predict_table(&original)?;

        let mut table = original;
        table.set_column(Column::new(PREDICTION_COLUMN, predictions))?;

        if let Some(path) = &output_path {
            write_table(&table, path)?;
            info!(path = %path.display(), rows = table.n_rows(), "Batch predictions written");
        }
        Ok(BatchOutput { table, output_path })
    }
}

