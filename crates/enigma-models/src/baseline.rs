//! Baseline classifier: per-feature standardisation followed by multinomial
//! logistic regression fitted with full-batch gradient descent.

use crate::factory::{ModelEnvelope, ModelParams};
use enigma_abstraction::{Classifier, FeatureMatrix, ModelError, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Registry key for [`BaselineClassifier`].
pub const BASELINE_KIND: &str = "baseline";

/// Hyper-parameters read from `model.lr_params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParams {
    /// Inverse L2 regularisation strength.
    #[serde(rename = "C")]
    pub c: f64,
    pub max_iter: usize,
    pub learning_rate: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self { c: 1.0, max_iter: 500, learning_rate: 0.1 }
    }
}

impl LogisticParams {
    /// Reads known keys from `params`, keeping defaults for absent ones.
    ///
    /// Unknown keys are ignored so configs written for other kinds still load.
    pub fn from_params(params: &ModelParams) -> Result<Self, ModelError> {
        let mut out = Self::default();
        for (key, value) in params {
            match key.as_str() {
                "C" | "c" => out.c = positive_f64(key, value)?,
                "learning_rate" => out.learning_rate = positive_f64(key, value)?,
                "max_iter" => {
                    out.max_iter = value
                        .as_u64()
                        .filter(|v| *v > 0)
                        .ok_or_else(|| invalid(key, "must be a positive integer"))?
                        as usize;
                }
                other => debug!(param = %other, "Ignoring unknown baseline parameter"),
            }
        }
        Ok(out)
    }
}

fn positive_f64(key: &str, value: &serde_json::Value) -> Result<f64, ModelError> {
    value
        .as_f64()
        .filter(|v| v.is_finite() && *v > 0.0)
        .ok_or_else(|| invalid(key, "must be a positive number"))
}

fn invalid(name: &str, message: &str) -> ModelError {
    ModelError::InvalidParameter { name: name.to_string(), message: message.to_string() }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedState {
    columns: Vec<String>,
    means: Vec<f64>,
    scales: Vec<f64>,
    classes: Vec<Value>,
    /// One weight row per class.
    weights: Vec<Vec<f64>>,
    intercepts: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedBaseline {
    params: LogisticParams,
    fitted: FittedState,
}

/// Standard-scaled softmax regression.
#[derive(Debug, Clone, Default)]
pub struct BaselineClassifier {
    params: LogisticParams,
    state: Option<FittedState>,
}

impl BaselineClassifier {
    #[must_use]
    pub fn new(params: LogisticParams) -> Self {
        Self { params, state: None }
    }

    pub fn params(&self) -> &LogisticParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    /// Class labels in the order used internally.
    pub fn classes(&self) -> Option<&[Value]> {
        self.state.as_ref().map(|s| s.classes.as_slice())
    }

    /// Rebuilds a fitted model from the `state` part of a blob envelope.
    pub fn from_state(state: serde_json::Value) -> Result<Self, ModelError> {
        let persisted: PersistedBaseline = serde_json::from_value(state)?;
        Ok(Self { params: persisted.params, state: Some(persisted.fitted) })
    }
}

fn validate_finite(features: &FeatureMatrix) -> Result<(), ModelError> {
    for (idx, row) in features.rows().enumerate() {
        if let Some(col) = row.iter().position(|v| !v.is_finite()) {
            return Err(ModelError::InvalidInput(format!(
                "non-finite value in column '{}' at row {idx}",
                features.columns()[col]
            )));
        }
    }
    Ok(())
}

fn softmax_in_place(z: &mut [f64]) {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let mut sum = 0.0;
    for v in z.iter_mut() {
        *v = (*v - max).exp();
        sum += *v;
    }
    for v in z.iter_mut() {
        *v /= sum;
    }
}

impl FittedState {
    fn scaled(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }

    fn logits(&self, x: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.intercepts)
            .map(|(w, b)| b + w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f64>())
            .collect()
    }
}

impl Classifier for BaselineClassifier {
    fn kind(&self) -> &str {
        BASELINE_KIND
    }

    fn fit(&mut self, features: &FeatureMatrix, labels: &[Value]) -> Result<(), ModelError> {
        if features.is_empty() {
            return Err(ModelError::InvalidInput("cannot fit on an empty feature matrix".to_string()));
        }
        if labels.len() != features.n_rows() {
            return Err(ModelError::InvalidInput(format!(
                "{} labels for {} rows",
                labels.len(),
                features.n_rows()
            )));
        }
        if let Some(idx) = labels.iter().position(Value::is_missing) {
            return Err(ModelError::InvalidInput(format!("missing label at row {idx}")));
        }
        validate_finite(features)?;

        let n = features.n_rows();
        let d = features.n_cols();
        let nf = n as f64;

        // Stable class ordering keyed on the rendered label.
        let classes: Vec<Value> = labels
            .iter()
            .map(|l| (l.to_string(), l.clone()))
            .collect::<BTreeMap<_, _>>()
            .into_values()
            .collect();
        let class_index: BTreeMap<String, usize> =
            classes.iter().enumerate().map(|(i, c)| (c.to_string(), i)).collect();
        let targets: Vec<usize> = labels.iter().map(|l| class_index[&l.to_string()]).collect();

        let mut means = vec![0.0; d];
        for row in features.rows() {
            for (m, x) in means.iter_mut().zip(row) {
                *m += x / nf;
            }
        }
        let mut scales = vec![0.0; d];
        for row in features.rows() {
            for ((s, x), m) in scales.iter_mut().zip(row).zip(&means) {
                *s += (x - m).powi(2) / nf;
            }
        }
        for s in &mut scales {
            *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
        }

        let k = classes.len();
        let mut state = FittedState {
            columns: features.columns().to_vec(),
            means,
            scales,
            classes,
            weights: vec![vec![0.0; d]; k],
            intercepts: vec![0.0; k],
        };
        let scaled: Vec<Vec<f64>> = features.rows().map(|r| state.scaled(r)).collect();

        let lr = self.params.learning_rate;
        let penalty = 1.0 / (self.params.c * nf);
        for _ in 0..self.params.max_iter {
            let mut grad_w = vec![vec![0.0; d]; k];
            let mut grad_b = vec![0.0; k];
            for (x, &y) in scaled.iter().zip(&targets) {
                let mut p = state.logits(x);
                softmax_in_place(&mut p);
                for (class, prob) in p.iter().enumerate() {
                    let g = prob - if class == y { 1.0 } else { 0.0 };
                    grad_b[class] += g / nf;
                    for (gw, xi) in grad_w[class].iter_mut().zip(x) {
                        *gw += g * xi / nf;
                    }
                }
            }
            for class in 0..k {
                for (w, gw) in state.weights[class].iter_mut().zip(&grad_w[class]) {
                    *w -= lr * (gw + penalty * *w);
                }
                state.intercepts[class] -= lr * grad_b[class];
            }
        }

        info!(rows = n, features = d, classes = k, "Baseline classifier fitted");
        self.state = Some(state);
        Ok(())
    }

    fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Value>, ModelError> {
        let state = self.state.as_ref().ok_or(ModelError::NotFitted)?;
        if features.n_cols() != state.columns.len() {
            return Err(ModelError::FeatureMismatch {
                expected: state.columns.clone(),
                actual: features.columns().to_vec(),
            });
        }
        validate_finite(features)?;

        Ok(features
            .rows()
            .map(|row| {
                let logits = state.logits(&state.scaled(row));
                let best = logits
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |acc, (i, v)| if *v > acc.1 { (i, *v) } else { acc })
                    .0;
                state.classes[best].clone()
            })
            .collect())
    }

    fn to_bytes(&self) -> Result<Vec<u8>, ModelError> {
        let fitted = self.state.clone().ok_or(ModelError::NotFitted)?;
        ModelEnvelope::encode(BASELINE_KIND, &PersistedBaseline { params: self.params.clone(), fitted })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cols() -> Vec<String> {
        vec!["x".to_string(), "y".to_string()]
    }

    fn separable() -> (FeatureMatrix, Vec<Value>) {
        let rows = vec![
            vec![0.0, 0.1],
            vec![0.2, 0.0],
            vec![0.1, 0.3],
            vec![5.0, 5.1],
            vec![5.2, 4.9],
            vec![4.8, 5.3],
        ];
        let labels = vec![0, 0, 0, 1, 1, 1].into_iter().map(Value::Int).collect();
        (FeatureMatrix::from_rows(cols(), rows).unwrap(), labels)
    }

    #[test]
    fn test_fit_predict_separable() {
        let (x, y) = separable();
        let mut model = BaselineClassifier::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_predict_before_fit() {
        let (x, _) = separable();
        let model = BaselineClassifier::default();
        assert_eq!(model.predict(&x).unwrap_err(), ModelError::NotFitted);
    }

    #[test]
    fn test_predict_width_mismatch() {
        let (x, y) = separable();
        let mut model = BaselineClassifier::default();
        model.fit(&x, &y).unwrap();

        let narrow = FeatureMatrix::from_rows(vec!["x".to_string()], vec![vec![1.0]]).unwrap();
        assert!(matches!(model.predict(&narrow), Err(ModelError::FeatureMismatch { .. })));
    }

    #[test]
    fn test_fit_rejects_missing_labels() {
        let (x, mut y) = separable();
        y[2] = Value::Null;
        let mut model = BaselineClassifier::default();
        assert!(matches!(model.fit(&x, &y), Err(ModelError::InvalidInput(_))));
    }

    #[test]
    fn test_string_labels_sorted() {
        let (x, _) = separable();
        let y: Vec<Value> = ["safe", "safe", "safe", "attack", "attack", "attack"]
            .into_iter()
            .map(Value::from)
            .collect();
        let mut model = BaselineClassifier::default();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.classes().unwrap(), &[Value::from("attack"), Value::from("safe")]);
        assert_eq!(model.predict(&x).unwrap(), y);
    }

    #[test]
    fn test_params_from_map() {
        let params: ModelParams =
            serde_json::from_str(r#"{"C": 0.5, "max_iter": 20, "solver": "lbfgs"}"#).unwrap();
        let p = LogisticParams::from_params(&params).unwrap();
        assert!((p.c - 0.5).abs() < f64::EPSILON);
        assert_eq!(p.max_iter, 20);
        assert!((p.learning_rate - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_params_reject_negative_c() {
        let params: ModelParams = serde_json::from_str(r#"{"C": -1}"#).unwrap();
        assert!(matches!(
            LogisticParams::from_params(&params),
            Err(ModelError::InvalidParameter { .. })
        ));
    }
}
