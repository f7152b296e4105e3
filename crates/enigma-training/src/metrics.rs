//! Classification metrics for evaluating a fitted model on a held-out split.

use crate::error::{TrainingError, TrainingResult};
use enigma_abstraction::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class precision/recall/f1 plus macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Keyed by the rendered class label.
    pub classes: BTreeMap<String, ClassMetrics>,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    pub accuracy: f64,
    pub report: ClassificationReport,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Compares predictions with ground truth row by row.
pub fn evaluate(truth: &[Value], predicted: &[Value]) -> TrainingResult<EvaluationMetrics> {
    if truth.len() != predicted.len() {
        return Err(TrainingError::Dataset(format!(
            "{} labels but {} predictions",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.is_empty() {
        return Err(TrainingError::Dataset("cannot evaluate on an empty split".to_string()));
    }

    #[derive(Default)]
    struct Counts {
        true_pos: usize,
        predicted: usize,
        actual: usize,
    }

    let mut counts: BTreeMap<String, Counts> = BTreeMap::new();
    let mut correct = 0;
    for (t, p) in truth.iter().zip(predicted) {
        let (t, p) = (t.to_string(), p.to_string());
        if t == p {
            correct += 1;
            counts.entry(t.clone()).or_default().true_pos += 1;
        }
        counts.entry(t).or_default().actual += 1;
        counts.entry(p).or_default().predicted += 1;
    }

    let total = truth.len();
    let classes: BTreeMap<String, ClassMetrics> = counts
        .into_iter()
        .map(|(label, c)| {
            let precision = ratio(c.true_pos, c.predicted);
            let recall = ratio(c.true_pos, c.actual);
            let f1_score = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            (label, ClassMetrics { precision, recall, f1_score, support: c.actual })
        })
        .collect();

    let k = classes.len() as f64;
    let mut macro_avg = ClassMetrics { support: total, ..ClassMetrics::default() };
    let mut weighted_avg = ClassMetrics { support: total, ..ClassMetrics::default() };
    for m in classes.values() {
        let w = m.support as f64 / total as f64;
        macro_avg.precision += m.precision / k;
        macro_avg.recall += m.recall / k;
        macro_avg.f1_score += m.f1_score / k;
        weighted_avg.precision += m.precision * w;
        weighted_avg.recall += m.recall * w;
        weighted_avg.f1_score += m.f1_score * w;
    }

    Ok(EvaluationMetrics {
        accuracy: ratio(correct, total),
        report: ClassificationReport { classes, macro_avg, weighted_avg },
    })
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>14} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        for (label, m) in &self.classes {
            report_row(f, label, m)?;
        }
        report_row(f, "macro avg", &self.macro_avg)?;
        report_row(f, "weighted avg", &self.weighted_avg)
    }
}

fn report_row(f: &mut fmt::Formatter<'_>, label: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{label:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        m.precision, m.recall, m.f1_score, m.support
    )
}
