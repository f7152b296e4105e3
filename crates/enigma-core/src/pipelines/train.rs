use crate::config::{Config, ConfigError};
use crate::error::Result;
use crate::inference::{DEFAULT_REGISTRY_NAME, build_feature_matrix};
use crate::schema::{SchemaError, SchemaPipeline};
use crate::table::{Table, read_table};
use enigma_abstraction::Value;
use enigma_models::{BASELINE_KIND, ModelFactory, ModelParams};
use enigma_training::{
    ArtifactMetadata, ArtifactRegistry, DEFAULT_SEED, EvaluationMetrics, ProgressEvent, ProgressSink,
    SplitFractions, TrainStage, TracingProgressSink, TrainingError, TrainingRunId, evaluate, split_indices,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Everything the train flow reads from configuration, resolved up front.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSettings {
    pub dataset_path: Option<PathBuf>,
    pub fractions: SplitFractions,
    pub seed: u64,
    pub model_kind: String,
    pub model_params: ModelParams,
    pub registry_name: String,
}

impl Default for TrainSettings {
    fn default() -> Self {
        Self {
            dataset_path: None,
            fractions: SplitFractions::default(),
            seed: DEFAULT_SEED,
            model_kind: BASELINE_KIND.to_string(),
            model_params: ModelParams::new(),
            registry_name: DEFAULT_REGISTRY_NAME.to_string(),
        }
    }
}

impl TrainSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        let defaults = Self::default();
        let test: f64 = config.get_as_or("data.test_size", defaults.fractions.test())?;
        let val: f64 = config.get_as_or("data.val_size", defaults.fractions.val())?;
        let fractions = SplitFractions::try_new(test, val).map_err(|e| ConfigError::InvalidValue {
            key: "data.test_size/data.val_size".to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            dataset_path: config.get_as("data.dataset_path")?,
            fractions,
            seed: config.get_as_or("data.random_state", defaults.seed)?,
            model_kind: config.get_as_or("model.name", defaults.model_kind)?,
            model_params: config.get_as_or("model.lr_params", defaults.model_params)?,
            registry_name: config.get_as_or("model.registry_name", defaults.registry_name)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSizes {
    pub train: usize,
    pub val: usize,
    pub test: usize,
}

/// Combined outcome of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainReport {
    pub run_id: TrainingRunId,
    pub model_metadata: ArtifactMetadata,
    pub validation_metrics: EvaluationMetrics,
    pub test_metrics: EvaluationMetrics,
    pub split_sizes: SplitSizes,
}

/// Load, split, preprocess, fit, evaluate, register.
///
/// Each split goes through the schema pipeline on its own, so statistics
/// used for imputation never cross from one split into another.
pub struct TrainPipeline {
    settings: TrainSettings,
    preprocessor: SchemaPipeline,
    factory: ModelFactory,
    registry: ArtifactRegistry,
    progress: Box<dyn ProgressSink>,
}

impl TrainPipeline {
    pub fn new(
        settings: TrainSettings,
        preprocessor: SchemaPipeline,
        factory: ModelFactory,
        registry: ArtifactRegistry,
    ) -> Self {
        Self { settings, preprocessor, factory, registry, progress: Box::new(TracingProgressSink) }
    }

    /// Builds the pipeline from configuration. `data.label_col` is required.
    pub fn from_config(config: &Config) -> Result<Self> {
        let preprocessor = SchemaPipeline::from_config(config)?;
        if preprocessor.schema().label.is_none() {
            return Err(ConfigError::MissingKey("data.label_col".to_string()).into());
        }
        Ok(Self::new(
            TrainSettings::from_config(config)?,
            preprocessor,
            ModelFactory::with_defaults(),
            super::open_registry(config)?,
        ))
    }

    #[must_use]
    pub fn with_progress(mut self, sink: Box<dyn ProgressSink>) -> Self {
        self.progress = sink;
        self
    }

    pub fn settings(&self) -> &TrainSettings {
        &self.settings
    }

    pub fn registry(&self) -> &ArtifactRegistry {
        &self.registry
    }

    /// Reads `data.dataset_path` and trains on it.
    pub fn run(&self) -> Result<TrainReport> {
        let path = self
            .settings
            .dataset_path
            .as_deref()
            .ok_or_else(|| ConfigError::MissingKey("data.dataset_path".to_string()))?;
        let run_id = self.start();
        let dataset = read_table(path)?;
        self.stage(&run_id, TrainStage::LoadData, format!("{} rows from {}", dataset.n_rows(), path.display()));
        self.train(run_id, &dataset)
    }

    /// Trains on an already-loaded dataset.
    pub fn run_on(&self, dataset: &Table) -> Result<TrainReport> {
        let run_id = self.start();
        self.stage(&run_id, TrainStage::LoadData, format!("{} rows in memory", dataset.n_rows()));
        self.train(run_id, dataset)
    }

    fn start(&self) -> TrainingRunId {
        let run_id = TrainingRunId::new();
        self.progress.on_event(ProgressEvent::Started { run_id: run_id.clone() });
        run_id
    }

    fn train(&self, run_id: TrainingRunId, dataset: &Table) -> Result<TrainReport> {
        let schema = self.preprocessor.schema();
        let label = schema.label.clone().ok_or_else(|| ConfigError::MissingKey("data.label_col".to_string()))?;
        if !dataset.has_column(&label) {
            return Err(SchemaError::MissingColumns(vec![label]).into());
        }

        let split = split_indices(dataset.n_rows(), self.settings.fractions, self.settings.seed)?;
        let split_sizes = SplitSizes { train: split.train.len(), val: split.val.len(), test: split.test.len() };
        self.stage(
            &run_id,
            TrainStage::Split,
            format!("train={} val={} test={}", split_sizes.train, split_sizes.val, split_sizes.test),
        );

        let train = self.preprocessor.transform(&dataset.take_rows(&split.train))?;
        let val = self.preprocessor.transform(&dataset.take_rows(&split.val))?;
        let test = self.preprocessor.transform(&dataset.take_rows(&split.test))?;
        self.stage(&run_id, TrainStage::Preprocess, format!("{} training rows after preprocessing", train.n_rows()));

        let mut model = self.factory.create(&self.settings.model_kind, &self.settings.model_params)?;
        let x_train = build_feature_matrix(&train, &schema.features)?;
        model.fit(&x_train, &labels(&train, &label)?)?;
        self.stage(&run_id, TrainStage::Fit, format!("fitted '{}' model", model.kind()));

        let validation_metrics = self.evaluate_split(model.as_ref(), &val, &label)?;
        let test_metrics = self.evaluate_split(model.as_ref(), &test, &label)?;
        info!(accuracy = validation_metrics.accuracy, "Validation report:\n{}", validation_metrics.report);
        info!(accuracy = test_metrics.accuracy, "Test report:\n{}", test_metrics.report);
        self.stage(
            &run_id,
            TrainStage::Evaluate,
            format!("val_accuracy={:.4} test_accuracy={:.4}", validation_metrics.accuracy, test_metrics.accuracy),
        );

        let model_metadata = self.registry.save(&model.to_bytes()?, &self.settings.registry_name)?;
        self.stage(
            &run_id,
            TrainStage::Register,
            format!("saved {} v{}", model_metadata.model_name, model_metadata.version),
        );
        self.progress.on_event(ProgressEvent::Finished { run_id: run_id.clone() });

        Ok(TrainReport { run_id, model_metadata, validation_metrics, test_metrics, split_sizes })
    }

    fn evaluate_split(
        &self,
        model: &dyn enigma_abstraction::Classifier,
        split: &Table,
        label: &str,
    ) -> Result<EvaluationMetrics> {
        let features = build_feature_matrix(split, &self.preprocessor.schema().features)?;
        let predicted = model.predict(&features)?;
        Ok(evaluate(&labels(split, label)?, &predicted)?)
    }

    fn stage(&self, run_id: &TrainingRunId, stage: TrainStage, message: String) {
        self.progress.on_event(ProgressEvent::Stage { run_id: run_id.clone(), stage, message });
    }
}

fn labels(table: &Table, label: &str) -> Result<Vec<Value>> {
    let column = table
        .column(label)
        .ok_or_else(|| SchemaError::MissingColumns(vec![label.to_string()]))?;
    let missing = column.values.iter().filter(|v| v.is_missing()).count();
    if missing > 0 {
        return Err(TrainingError::Dataset(format!("label column '{label}' has {missing} missing values")).into());
    }
    Ok(column.values.clone())
}
