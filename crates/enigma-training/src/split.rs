//! Reproducible train/validation/test splitting.

use crate::error::{TrainingError, TrainingResult};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Default seed, matching `data.random_state`.
pub const DEFAULT_SEED: u64 = 42;

/// Requested validation and test proportions. Train gets the rest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitFractions {
    test: f64,
    val: f64,
}

impl SplitFractions {
    /// Both fractions must lie in `(0, 1)` and sum to less than 1.
    pub fn try_new(test: f64, val: f64) -> TrainingResult<Self> {
        let in_range = |f: f64| f > 0.0 && f < 1.0;
        if !in_range(test) || !in_range(val) {
            return Err(TrainingError::InvalidSpec(format!(
                "split fractions must be in (0, 1), got test={test} val={val}"
            )));
        }
        if test + val >= 1.0 {
            return Err(TrainingError::InvalidSpec(format!(
                "test + val must be < 1, got {}",
                test + val
            )));
        }
        Ok(Self { test, val })
    }

    pub fn test(&self) -> f64 {
        self.test
    }

    pub fn val(&self) -> f64 {
        self.val
    }

    pub fn train(&self) -> f64 {
        1.0 - self.test - self.val
    }

    pub fn holdout(&self) -> f64 {
        self.test + self.val
    }

    /// Share of the holdout that goes to validation in the second stage.
    pub fn relative_val(&self) -> f64 {
        self.val / self.holdout()
    }
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self { test: 0.2, val: 0.1 }
    }
}

/// Row indices of each partition. Together they cover every input row once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub val: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `items` with `seed` and takes `round(len * fraction)` of them.
///
/// Returns `(selected, rest)`.
pub fn shuffle_split<T: Clone>(items: &[T], fraction: f64, seed: u64) -> (Vec<T>, Vec<T>) {
    let mut shuffled = items.to_vec();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    shuffled.shuffle(&mut rng);

    let take = ((items.len() as f64) * fraction).round() as usize;
    let rest = shuffled.split_off(take.min(shuffled.len()));
    (shuffled, rest)
}

/// Two-stage split of `n_rows` rows.
///
/// Stage one separates train from a combined holdout of `test + val`. Stage
/// two splits the holdout using `val / (test + val)` for validation, so the
/// final proportions match the requested ones instead of compounding.
pub fn split_indices(n_rows: usize, fractions: SplitFractions, seed: u64) -> TrainingResult<SplitIndices> {
    if n_rows == 0 {
        return Err(TrainingError::Dataset("dataset must not be empty".to_string()));
    }
    let all: Vec<usize> = (0..n_rows).collect();
    let (holdout, train) = shuffle_split(&all, fractions.holdout(), seed);
    let (val, test) = shuffle_split(&holdout, fractions.relative_val(), seed);
    Ok(SplitIndices { train, val, test })
}
