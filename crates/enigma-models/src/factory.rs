//! Model factory for creating classifier instances from configuration.
//!
//! Kinds are looked up in a table of named factories instead of a chain of
//! string comparisons, so new kinds can be registered without touching the
//! pipelines. Persisted blobs carry their kind, which lets the same table
//! decode them again.

use crate::baseline::{BASELINE_KIND, BaselineClassifier, LogisticParams};
use enigma_abstraction::{Classifier, ModelError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, error};

/// Free-form hyper-parameters, as read from configuration.
pub type ModelParams = serde_json::Map<String, serde_json::Value>;

/// Builds an unfitted model from hyper-parameters.
pub type BuildFn = fn(&ModelParams) -> Result<Box<dyn Classifier>, ModelError>;

/// Rebuilds a fitted model from the `state` field of a [`ModelEnvelope`].
pub type DecodeFn = fn(serde_json::Value) -> Result<Box<dyn Classifier>, ModelError>;

/// On-disk wrapper around a model's own state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelEnvelope {
    pub kind: String,
    pub state: serde_json::Value,
}

impl ModelEnvelope {
    /// Serializes `state` tagged with `kind`.
    pub fn encode<T: Serialize>(kind: &str, state: &T) -> Result<Vec<u8>, ModelError> {
        let envelope = Self { kind: kind.to_string(), state: serde_json::to_value(state)? };
        Ok(serde_json::to_vec(&envelope)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, ModelError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[derive(Clone, Copy)]
struct FactoryEntry {
    build: BuildFn,
    decode: DecodeFn,
}

/// Table of model kinds.
#[derive(Clone, Default)]
pub struct ModelFactory {
    entries: BTreeMap<String, FactoryEntry>,
}

impl std::fmt::Debug for ModelFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelFactory").field("kinds", &self.entries.keys().collect::<Vec<_>>()).finish()
    }
}

fn build_baseline(params: &ModelParams) -> Result<Box<dyn Classifier>, ModelError> {
    Ok(Box::new(BaselineClassifier::new(LogisticParams::from_params(params)?)))
}

fn decode_baseline(state: serde_json::Value) -> Result<Box<dyn Classifier>, ModelError> {
    Ok(Box::new(BaselineClassifier::from_state(state)?))
}

impl ModelFactory {
    /// Creates an empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory with every built-in kind registered.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut factory = Self::new();
        factory.register(BASELINE_KIND, build_baseline, decode_baseline);
        factory.register("logistic", build_baseline, decode_baseline);
        factory
    }

    /// Registers (or replaces) a kind. Keys are case-insensitive.
    pub fn register(&mut self, kind: &str, build: BuildFn, decode: DecodeFn) {
        self.entries.insert(kind.to_lowercase(), FactoryEntry { build, decode });
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    fn entry(&self, kind: &str) -> Result<FactoryEntry, ModelError> {
        self.entries.get(&kind.to_lowercase()).copied().ok_or_else(|| {
            error!(model_kind = %kind, "Unrecognized model kind");
            ModelError::UnknownKind(kind.to_string())
        })
    }

    /// Creates an unfitted model of `kind`.
    ///
    /// # Errors
    /// Returns `ModelError::UnknownKind` for unregistered kinds and
    /// `ModelError::InvalidParameter` for bad hyper-parameters.
    pub fn create(&self, kind: &str, params: &ModelParams) -> Result<Box<dyn Classifier>, ModelError> {
        debug!(model_kind = %kind, params = ?params, "Creating model instance");
        (self.entry(kind)?.build)(params)
    }

    /// Decodes a blob produced by [`Classifier::to_bytes`].
    pub fn decode(&self, bytes: &[u8]) -> Result<Box<dyn Classifier>, ModelError> {
        let envelope = ModelEnvelope::decode(bytes)?;
        debug!(model_kind = %envelope.kind, bytes = bytes.len(), "Decoding model blob");
        (self.entry(&envelope.kind)?.decode)(envelope.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_registered() {
        let factory = ModelFactory::with_defaults();
        let kinds: Vec<_> = factory.kinds().collect();
        assert_eq!(kinds, vec!["baseline", "logistic"]);
    }

    #[test]
    fn test_create_is_case_insensitive() {
        let factory = ModelFactory::with_defaults();
        let model = factory.create("Baseline", &ModelParams::new()).unwrap();
        assert_eq!(model.kind(), "baseline");
    }

    #[test]
    fn test_unknown_kind() {
        let factory = ModelFactory::with_defaults();
        let err = factory.create("xgboost", &ModelParams::new()).unwrap_err();
        assert_eq!(err, ModelError::UnknownKind("xgboost".to_string()));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let factory = ModelFactory::with_defaults();
        assert!(matches!(factory.decode(b"not json"), Err(ModelError::Serialization(_))));
    }

    #[test]
    fn test_decode_unknown_kind() {
        let factory = ModelFactory::with_defaults();
        let bytes = ModelEnvelope::encode("forest", &serde_json::json!({})).unwrap();
        assert!(matches!(factory.decode(&bytes), Err(ModelError::UnknownKind(_))));
    }
}
