use super::{FeatureSchema, SchemaError};
use crate::config::{Config, ConfigError};
use crate::table::{Column, Table};
use enigma_abstraction::Value;
use tracing::{debug, info, warn};

/// Transformation steps, in the order [`SchemaPipeline::transform`] runs them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    EnforceTypes,
    HandleMissing,
    Project,
}

/// Notified before each transformation step runs.
///
/// Validation is not a stage: if it fails, no observer call happens.
pub trait StageObserver {
    fn on_stage(&mut self, stage: Stage, table: &Table);
}

#[derive(Debug, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage(&mut self, _stage: Stage, _table: &Table) {}
}

/// Validates, casts, and imputes a table against a [`FeatureSchema`].
///
/// The same pipeline is used at training and at inference time, so the two
/// paths cannot drift apart.
#[derive(Debug, Clone)]
pub struct SchemaPipeline {
    schema: FeatureSchema,
}

impl SchemaPipeline {
    pub fn new(schema: FeatureSchema) -> Self {
        Self { schema }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        FeatureSchema::from_config(config).map(Self::new)
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    /// Fails with every required feature the table lacks.
    pub fn validate_columns(&self, table: &Table) -> Result<(), SchemaError> {
        let missing: Vec<String> =
            self.schema.features.iter().filter(|f| !table.has_column(f)).cloned().collect();
        if missing.is_empty() {
            Ok(())
        } else {
            warn!(missing = ?missing, "Input is missing required features");
            Err(SchemaError::MissingColumns(missing))
        }
    }

    /// Applies declared casts. Casts for absent columns are skipped.
    pub fn enforce_types(&self, mut table: Table) -> Result<Table, SchemaError> {
        for (name, target) in &self.schema.cast_types {
            let Some(column) = table.column_mut(name) else {
                debug!(column = %name, "Cast target not present, skipping");
                continue;
            };
            let cast: Result<Vec<Value>, String> = column.values.iter().map(|v| target.cast(v)).collect();
            column.values = cast.map_err(|message| SchemaError::Cast {
                column: name.clone(),
                target: *target,
                message,
            })?;
        }
        Ok(table)
    }

    /// Drops incomplete rows, or fills them.
    ///
    /// Fill mode applies `fill_values` first, then gives each numeric feature
    /// column without a rule its column mean. Non-numeric columns without a
    /// rule keep their gaps.
    pub fn handle_missing(&self, mut table: Table) -> Table {
        if self.schema.dropna {
            let before = table.n_rows();
            let kept = table.retain_rows(|i| !table.row_has_missing(i));
            if kept.n_rows() < before {
                info!(dropped = before - kept.n_rows(), "Dropped rows with missing values");
            }
            return kept;
        }

        for (name, fill) in &self.schema.fill_values {
            if let Some(column) = table.column_mut(name) {
                fill_missing(column, fill);
            }
        }

        for name in &self.schema.features {
            let Some(column) = table.column_mut(name) else { continue };
            if !column.has_missing() || self.schema.fill_values.contains_key(name) {
                continue;
            }
            match column.mean().filter(|_| column.is_numeric()) {
                Some(mean) => {
                    info!(column = %name, mean, "Imputed missing values with column mean");
                    fill_missing(column, &Value::Float(mean));
                }
                None => warn!(column = %name, "Missing values left in non-numeric column"),
            }
        }
        table
    }

    /// Features in declared order, followed by the label when present.
    pub fn project(&self, table: &Table) -> Table {
        let mut names: Vec<&str> = self.schema.features.iter().map(String::as_str).collect();
        if let Some(label) = self.schema.label.as_deref().filter(|l| table.has_column(l)) {
            if !names.contains(&label) {
                names.push(label);
            }
        }
        table.select(&names)
    }

    pub fn transform(&self, table: &Table) -> Result<Table, SchemaError> {
        self.transform_observed(table, &mut NoopObserver)
    }

    /// Runs validate, enforce types, handle missing, project. The input is
    /// never modified.
    pub fn transform_observed(
        &self,
        table: &Table,
        observer: &mut dyn StageObserver,
    ) -> Result<Table, SchemaError> {
        self.validate_columns(table)?;

        observer.on_stage(Stage::EnforceTypes, table);
        let typed = self.enforce_types(table.clone())?;

        observer.on_stage(Stage::HandleMissing, &typed);
        let filled = self.handle_missing(typed);

        observer.on_stage(Stage::Project, &filled);
        let projected = self.project(&filled);
        debug!(rows = projected.n_rows(), cols = projected.n_cols(), "Schema transform complete");
        Ok(projected)
    }
}

fn fill_missing(column: &mut Column, fill: &Value) {
    for value in &mut column.values {
        if value.is_missing() {
            *value = fill.clone();
        }
    }
}
