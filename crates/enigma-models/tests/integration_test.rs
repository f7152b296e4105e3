//! Integration tests for model kinds and blob round trips.

use enigma_abstraction::{Classifier, FeatureMatrix, Value};
use enigma_models::{BaselineClassifier, LogisticParams, ModelFactory, ModelParams};

fn three_class() -> (FeatureMatrix, Vec<Value>) {
    let mut rows = Vec::new();
    let mut labels = Vec::new();
    for i in 0..30 {
        let jitter = f64::from(i % 5) * 0.05;
        let (x, y, label) = match i % 3 {
            0 => (0.0 + jitter, 0.0, "low"),
            1 => (5.0 + jitter, 0.0, "mid"),
            _ => (0.0, 5.0 + jitter, "high"),
        };
        rows.push(vec![x, y]);
        labels.push(Value::from(label));
    }
    let matrix = FeatureMatrix::from_rows(vec!["a".to_string(), "b".to_string()], rows).unwrap();
    (matrix, labels)
}

#[test]
fn test_factory_round_trip_preserves_predictions() {
    let factory = ModelFactory::with_defaults();
    let (x, y) = three_class();

    let mut model = factory.create("baseline", &ModelParams::new()).unwrap();
    model.fit(&x, &y).unwrap();
    let before = model.predict(&x).unwrap();

    let bytes = model.to_bytes().unwrap();
    let restored = factory.decode(&bytes).unwrap();

    assert_eq!(restored.kind(), "baseline");
    assert_eq!(restored.predict(&x).unwrap(), before);
    assert_eq!(before, y);
}

#[test]
fn test_identical_models_encode_identically() {
    let (x, y) = three_class();
    let mut a = BaselineClassifier::new(LogisticParams::default());
    let mut b = BaselineClassifier::new(LogisticParams::default());
    a.fit(&x, &y).unwrap();
    b.fit(&x, &y).unwrap();

    assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
}

#[test]
fn test_unfitted_model_cannot_be_encoded() {
    let model = BaselineClassifier::default();
    assert!(model.to_bytes().is_err());
}

#[test]
fn test_alias_kind_builds_baseline() {
    let factory = ModelFactory::with_defaults();
    let params: ModelParams = serde_json::from_str(r#"{"max_iter": 50}"#).unwrap();
    let model = factory.create("logistic", &params).unwrap();
    assert_eq!(model.kind(), "baseline");
}
