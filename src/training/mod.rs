//! Model training module
//!
//! Provides the learner primitive and the evaluation harness used by the
//! per-view ensemble:
//! - K-Nearest Neighbors with Weka-style attribute normalisation
//! - Stratified and plain k-fold cross-validation

pub mod cross_validation;
pub mod knn;

pub use cross_validation::{
    CVResults, CVSplit, CVStrategy, CrossValidate, CrossValidator, PredictionRecord,
};
pub use knn::{DistanceMetric, KNNClassifier, KNNConfig};

use std::sync::Arc;

use ndarray::{Array2, ArrayView1, Axis};

use crate::data::Dataset;
use crate::error::{MultiViewError, Result};

/// Training instances of one fold, shared by every ensemble member
#[derive(Debug, Clone)]
pub struct TrainingSet {
    features: Array2<f64>,
    labels: Vec<usize>,
    weights: Vec<f64>,
    nominal: Vec<bool>,
    n_classes: usize,
}

impl TrainingSet {
    /// Use every instance of the dataset
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            features: dataset.features().clone(),
            labels: dataset.labels().to_vec(),
            weights: dataset.weights().to_vec(),
            nominal: dataset.attributes().iter().map(|a| a.is_nominal()).collect(),
            n_classes: dataset.n_classes(),
        }
    }

    /// Select the given rows of the dataset
    pub fn from_indices(dataset: &Dataset, indices: &[usize]) -> Result<Self> {
        let n = dataset.n_instances();
        if let Some(&bad) = indices.iter().find(|&&i| i >= n) {
            return Err(MultiViewError::CrossValidation(format!(
                "training index {} out of range for {} instances",
                bad, n
            )));
        }

        Ok(Self {
            features: dataset.features().select(Axis(0), indices),
            labels: indices.iter().map(|&i| dataset.labels()[i]).collect(),
            weights: indices.iter().map(|&i| dataset.weights()[i]).collect(),
            nominal: dataset.attributes().iter().map(|a| a.is_nominal()).collect(),
            n_classes: dataset.n_classes(),
        })
    }

    pub fn n_instances(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.nominal.len()
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn features(&self) -> &Array2<f64> {
        &self.features
    }

    pub fn labels(&self) -> &[usize] {
        &self.labels
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn is_nominal(&self, attribute: usize) -> bool {
        self.nominal[attribute]
    }
}

/// A learner that estimates a class distribution for unseen instances
pub trait Learner: Send + Sync {
    /// Fit the learner to a shared training set
    fn fit(&mut self, train: Arc<TrainingSet>) -> Result<()>;

    /// Class distribution for one instance, indexed by class
    fn distribution(&self, x: ArrayView1<f64>) -> Result<Vec<f64>>;
}

/// A classifier that the cross-validation harness can evaluate
///
/// `predict` takes `&mut self` because combiners may carry a random state
/// that advances with each prediction.
pub trait Classifier {
    fn fit(&mut self, train: Arc<TrainingSet>) -> Result<()>;

    fn predict(&mut self, x: ArrayView1<f64>) -> Result<usize>;
}
