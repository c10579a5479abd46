//! Cross-validation implementations

use std::sync::Arc;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{Classifier, TrainingSet};
use crate::data::Dataset;
use crate::error::{MultiViewError, Result};

/// Cross-validation strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CVStrategy {
    /// K-Fold cross-validation
    KFold { n_splits: usize, shuffle: bool },
    /// Stratified K-Fold (maintains class distribution)
    StratifiedKFold { n_splits: usize, shuffle: bool },
}

impl Default for CVStrategy {
    fn default() -> Self {
        CVStrategy::StratifiedKFold { n_splits: 10, shuffle: true }
    }
}

/// A single train/test split
#[derive(Debug, Clone)]
pub struct CVSplit {
    pub train_indices: Vec<usize>,
    pub test_indices: Vec<usize>,
    pub fold_idx: usize,
}

/// Held-out prediction for one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Position of the instance in the dataset
    pub index: usize,
    /// Fold in which the instance was held out
    pub fold: usize,
    pub actual: usize,
    pub predicted: usize,
}

/// Evaluates a classifier by training on some folds and predicting the rest
pub trait CrossValidate {
    /// Returns one record per held-out instance, sorted by instance index
    fn cross_validate<C, F>(&self, dataset: &Dataset, factory: F) -> Result<Vec<PredictionRecord>>
    where
        C: Classifier,
        F: Fn() -> Result<C> + Sync;
}

/// Cross-validation splitter
#[derive(Debug, Clone)]
pub struct CrossValidator {
    strategy: CVStrategy,
    random_state: Option<u64>,
}

impl CrossValidator {
    /// Create a new cross-validator
    pub fn new(strategy: CVStrategy) -> Self {
        Self {
            strategy,
            random_state: None,
        }
    }

    /// Stratified, shuffled k-fold with a fixed seed
    pub fn stratified(n_splits: usize, seed: u64) -> Self {
        Self::new(CVStrategy::StratifiedKFold { n_splits, shuffle: true }).with_random_state(seed)
    }

    /// Set random state for reproducibility
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    pub fn n_splits(&self) -> usize {
        match self.strategy {
            CVStrategy::KFold { n_splits, .. } | CVStrategy::StratifiedKFold { n_splits, .. } => {
                n_splits
            }
        }
    }

    /// Generate train/test splits
    pub fn split(&self, n_samples: usize, y: Option<&[usize]>) -> Result<Vec<CVSplit>> {
        match &self.strategy {
            CVStrategy::KFold { n_splits, shuffle } => {
                check_fold_count(n_samples, *n_splits)?;
                let mut indices: Vec<usize> = (0..n_samples).collect();
                if *shuffle {
                    indices.shuffle(&mut self.rng());
                }
                Ok(contiguous_folds(&indices, *n_splits))
            }
            CVStrategy::StratifiedKFold { n_splits, shuffle } => {
                let y = y.ok_or_else(|| {
                    MultiViewError::CrossValidation("StratifiedKFold requires target array".to_string())
                })?;
                if y.len() != n_samples {
                    return Err(MultiViewError::mismatch("stratification labels", n_samples, y.len()));
                }
                check_fold_count(n_samples, *n_splits)?;
                self.stratified_k_fold_split(y, *n_splits, *shuffle)
            }
        }
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Shuffle, group by class, then deal round-robin so every contiguous
    /// fold receives a near-equal share of each class
    fn stratified_k_fold_split(&self, y: &[usize], n_splits: usize, shuffle: bool) -> Result<Vec<CVSplit>> {
        let mut indices: Vec<usize> = (0..y.len()).collect();
        if shuffle {
            indices.shuffle(&mut self.rng());
        }

        // Classes in order of first appearance
        let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
        for idx in indices {
            match groups.iter_mut().find(|(class, _)| *class == y[idx]) {
                Some((_, members)) => members.push(idx),
                None => groups.push((y[idx], vec![idx])),
            }
        }
        let grouped: Vec<usize> = groups.into_iter().flat_map(|(_, members)| members).collect();

        let mut dealt = Vec::with_capacity(grouped.len());
        for start in 0..n_splits {
            dealt.extend(grouped.iter().skip(start).step_by(n_splits).copied());
        }

        Ok(contiguous_folds(&dealt, n_splits))
    }
}

impl CrossValidate for CrossValidator {
    fn cross_validate<C, F>(&self, dataset: &Dataset, factory: F) -> Result<Vec<PredictionRecord>>
    where
        C: Classifier,
        F: Fn() -> Result<C> + Sync,
    {
        let splits = self.split(dataset.n_instances(), Some(dataset.labels()))?;

        let per_fold: Vec<Vec<PredictionRecord>> = splits
            .par_iter()
            .map(|split| -> Result<Vec<PredictionRecord>> {
                debug!(
                    fold = split.fold_idx,
                    n_train = split.train_indices.len(),
                    n_test = split.test_indices.len(),
                    "Evaluating fold"
                );

                let train = Arc::new(TrainingSet::from_indices(dataset, &split.train_indices)?);
                let mut model = factory()?;
                model.fit(train)?;

                split
                    .test_indices
                    .iter()
                    .map(|&index| -> Result<PredictionRecord> {
                        Ok(PredictionRecord {
                            index,
                            fold: split.fold_idx,
                            actual: dataset.labels()[index],
                            predicted: model.predict(dataset.features().row(index))?,
                        })
                    })
                    .collect()
            })
            .collect::<Result<_>>()?;

        let mut records: Vec<PredictionRecord> = per_fold.into_iter().flatten().collect();
        records.sort_by_key(|r| r.index);
        Ok(records)
    }
}

fn check_fold_count(n_samples: usize, n_splits: usize) -> Result<()> {
    if n_splits < 2 {
        return Err(MultiViewError::Config(format!(
            "number of folds must be at least 2, got {}",
            n_splits
        )));
    }
    if n_samples < n_splits {
        return Err(MultiViewError::Config(format!(
            "n_samples ({}) must be >= number of folds ({})",
            n_samples, n_splits
        )));
    }
    Ok(())
}

/// Cut an ordering into contiguous test folds; the first `n % k` folds get
/// one extra instance
fn contiguous_folds(order: &[usize], n_splits: usize) -> Vec<CVSplit> {
    let n_samples = order.len();
    let base = n_samples / n_splits;
    let remainder = n_samples % n_splits;

    let mut splits = Vec::with_capacity(n_splits);
    let mut current = 0;

    for fold_idx in 0..n_splits {
        let fold_size = if fold_idx < remainder { base + 1 } else { base };
        let test_indices = order[current..current + fold_size].to_vec();
        let train_indices = order[..current]
            .iter()
            .chain(order[current + fold_size..].iter())
            .copied()
            .collect();

        splits.push(CVSplit {
            train_indices,
            test_indices,
            fold_idx,
        });
        current += fold_size;
    }

    splits
}

/// Cross-validation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CVResults {
    /// Scores for each fold
    pub scores: Vec<f64>,
    /// Mean score across folds
    pub mean_score: f64,
    /// Standard deviation of scores
    pub std_score: f64,
    /// Number of folds
    pub n_folds: usize,
}

impl CVResults {
    /// Create CV results from fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let n_folds = scores.len();
        if n_folds == 0 {
            return Self {
                scores,
                mean_score: 0.0,
                std_score: 0.0,
                n_folds,
            };
        }

        let mean_score = scores.iter().sum::<f64>() / n_folds as f64;
        let variance = scores.iter().map(|s| (s - mean_score).powi(2)).sum::<f64>() / n_folds as f64;
        let std_score = variance.sqrt();

        Self {
            scores,
            mean_score,
            std_score,
            n_folds,
        }
    }

    /// Per-fold accuracy (fraction correct) of held-out predictions
    pub fn from_records(records: &[PredictionRecord]) -> Self {
        let n_folds = records.iter().map(|r| r.fold + 1).max().unwrap_or(0);
        let mut correct = vec![0usize; n_folds];
        let mut total = vec![0usize; n_folds];
        for r in records {
            total[r.fold] += 1;
            if r.actual == r.predicted {
                correct[r.fold] += 1;
            }
        }

        let scores = correct
            .iter()
            .zip(&total)
            .filter(|(_, &t)| t > 0)
            .map(|(&c, &t)| c as f64 / t as f64)
            .collect();
        Self::from_scores(scores)
    }
}
