//! Labeled datasets
//!
//! A [`Dataset`] is one view of the instance set: a dense feature matrix, the
//! schema of its feature attributes and a nominal class attribute. Nominal
//! feature values are stored as their declaration index; missing values are
//! stored as `NaN`.

mod arff;
mod loader;

pub use arff::{parse_arff, read_arff};
pub use loader::{dataset_from_frame, DataLoader, DatasetSummary, SourceFormat};

use crate::error::{MultiViewError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Kind of a dataset attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeKind {
    /// Real-valued attribute
    Numeric,
    /// Categorical attribute with its declared values, in index order
    Nominal(Vec<String>),
}

/// A named attribute of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,
    pub kind: AttributeKind,
}

impl Attribute {
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Numeric,
        }
    }

    pub fn nominal<S: Into<String>>(name: impl Into<String>, values: Vec<S>) -> Self {
        Self {
            name: name.into(),
            kind: AttributeKind::Nominal(values.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_nominal(&self) -> bool {
        matches!(self.kind, AttributeKind::Nominal(_))
    }

    /// Declared values of a nominal attribute (empty for numeric ones)
    pub fn values(&self) -> &[String] {
        match &self.kind {
            AttributeKind::Nominal(values) => values,
            AttributeKind::Numeric => &[],
        }
    }
}

/// One view's labeled instances
#[derive(Debug, Clone)]
pub struct Dataset {
    name: String,
    attributes: Vec<Attribute>,
    class_attribute: Attribute,
    features: Array2<f64>,
    labels: Vec<usize>,
    weights: Vec<f64>,
}

impl Dataset {
    /// Build a dataset, checking that the matrix, schema and labels agree
    pub fn new(
        name: impl Into<String>,
        attributes: Vec<Attribute>,
        class_attribute: Attribute,
        features: Array2<f64>,
        labels: Vec<usize>,
    ) -> Result<Self> {
        let name = name.into();

        if features.ncols() != attributes.len() {
            return Err(MultiViewError::mismatch(
                format!("{} feature columns", name),
                attributes.len(),
                features.ncols(),
            ));
        }
        if features.nrows() != labels.len() {
            return Err(MultiViewError::mismatch(
                format!("{} class labels", name),
                features.nrows(),
                labels.len(),
            ));
        }

        let n_classes = class_attribute.values().len();
        if n_classes == 0 {
            return Err(MultiViewError::DatasetLoad(format!(
                "{}: class attribute '{}' must be nominal with at least one value",
                name, class_attribute.name
            )));
        }
        if let Some(&bad) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(MultiViewError::DatasetLoad(format!(
                "{}: class label {} out of range for {} classes",
                name, bad, n_classes
            )));
        }

        for (j, attr) in attributes.iter().enumerate() {
            if let AttributeKind::Nominal(values) = &attr.kind {
                let n_values = values.len() as f64;
                let invalid = features
                    .column(j)
                    .iter()
                    .any(|&v| !v.is_nan() && (v < 0.0 || v >= n_values || v.fract() != 0.0));
                if invalid {
                    return Err(MultiViewError::DatasetLoad(format!(
                        "{}: nominal attribute '{}' holds a value outside its {} declared values",
                        name,
                        attr.name,
                        values.len()
                    )));
                }
            }
        }

        let weights = vec![1.0; labels.len()];
        Ok(Self {
            name,
            attributes,
            class_attribute,
            features,
            labels,
            weights,
        })
    }

    /// Attach per-instance weights; every instance weighs 1 by default
    pub fn with_weights(mut self, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != self.labels.len() {
            return Err(MultiViewError::mismatch(
                format!("{} instance weights", self.name),
                self.labels.len(),
                weights.len(),
            ));
        }
        if let Some(&bad) = weights.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(MultiViewError::DatasetLoad(format!(
                "{}: instance weight {} must be finite and non-negative",
                self.name, bad
            )));
        }
        self.weights = weights;
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn n_instances(&self) -> usize {
        self.labels.len()
    }

    pub fn n_features(&self) -> usize {
        self.attributes.len()
    }

    pub fn n_classes(&self) -> usize {
        self.class_attribute.values().len()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn class_attribute(&self) -> &Attribute {
        &self.class_attribute
    }

    pub fn class_names(&self) -> &[String] {
        self.class_attribute.values()
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

    /// Number of instances per class index
    pub fn class_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes()];
        for &label in &self.labels {
            counts[label] += 1;
        }
        counts
    }
}
