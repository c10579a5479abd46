//! Run configuration

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MultiViewError, Result};
use crate::training::DistanceMetric;

/// Configuration of a multi-view run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiViewConfig {
    /// Number of cross-validation folds
    pub n_folds: usize,

    /// Seed for fold assignment and vote tie-breaks
    pub seed: u64,

    /// Distance metric of the k-NN members
    pub metric: DistanceMetric,

    /// Dataset files, one per view, in view order
    pub views: Vec<PathBuf>,
}

impl Default for MultiViewConfig {
    fn default() -> Self {
        Self {
            n_folds: 10,
            seed: 1,
            metric: DistanceMetric::Euclidean,
            views: Vec::new(),
        }
    }
}

impl MultiViewConfig {
    /// Create a config for the given views with default settings
    pub fn new<P: Into<PathBuf>>(views: impl IntoIterator<Item = P>) -> Self {
        Self {
            views: views.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn with_folds(mut self, n_folds: usize) -> Self {
        self.n_folds = n_folds;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn add_view(mut self, path: impl Into<PathBuf>) -> Self {
        self.views.push(path.into());
        self
    }

    /// Check fold count and metric; the view list is checked when views are loaded
    pub fn validate(&self) -> Result<()> {
        if self.n_folds < 2 {
            return Err(MultiViewError::Config(format!(
                "number of folds must be at least 2, got {}",
                self.n_folds
            )));
        }
        if let DistanceMetric::Minkowski(p) = self.metric {
            if p.is_nan() || p < 1.0 {
                return Err(MultiViewError::invalid_param("metric", p, "Minkowski p must be >= 1"));
            }
        }
        Ok(())
    }

    /// Load a config from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| MultiViewError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&json)?;
        Ok(config)
    }

    /// Save the config to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}
