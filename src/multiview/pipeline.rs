//! Multi-view driver
//!
//! Loads each view in order, sizes its ensemble as `floor(sqrt(N))`,
//! classifies it, and once every view is done checks that they agree on the
//! instances before fusing their predictions.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{fuse, neighbor_count, ViewClassifier, ViewPredictions};
use crate::config::MultiViewConfig;
use crate::data::{DataLoader, Dataset};
use crate::error::{MultiViewError, Result};

/// Per-view part of a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewSummary {
    pub view: usize,
    pub name: String,
    pub ensemble_size: usize,
    pub accuracy: f64,
    pub fold_mean: f64,
    pub fold_std: f64,
}

impl From<&ViewPredictions> for ViewSummary {
    fn from(v: &ViewPredictions) -> Self {
        Self {
            view: v.view,
            name: v.name.clone(),
            ensemble_size: v.ensemble_size,
            accuracy: v.accuracy,
            fold_mean: v.folds.mean_score,
            fold_std: v.folds.std_score,
        }
    }
}

/// Outcome of a multi-view run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiViewReport {
    pub views: Vec<ViewSummary>,
    pub n_instances: usize,
    pub n_classes: usize,
    /// Fused class per instance
    pub fused: Vec<usize>,
    pub actual: Vec<usize>,
    pub correct: usize,
    /// Fused accuracy in percent, two decimals
    pub accuracy: f64,
    pub elapsed_secs: f64,
}

impl MultiViewReport {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs per-view classification followed by cross-view fusion
#[derive(Debug, Clone)]
pub struct MultiViewPipeline {
    config: MultiViewConfig,
    loader: DataLoader,
}

impl MultiViewPipeline {
    pub fn new(config: MultiViewConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            loader: DataLoader::new(),
        })
    }

    pub fn with_loader(mut self, loader: DataLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn config(&self) -> &MultiViewConfig {
        &self.config
    }

    /// Load every configured view from disk and run both stages
    pub fn run(&self) -> Result<MultiViewReport> {
        if self.config.views.is_empty() {
            return Err(MultiViewError::Config("at least one view is required".to_string()));
        }

        let start = Instant::now();
        let mut views: Vec<ViewPredictions> = Vec::with_capacity(self.config.views.len());

        for (i, path) in self.config.views.iter().enumerate() {
            let dataset = self.loader.load(path)?;
            info!(
                view = i + 1,
                path = %path.display(),
                instances = dataset.n_instances(),
                features = dataset.n_features(),
                classes = dataset.n_classes(),
                "Loaded view"
            );
            let predictions = self.classify(i + 1, &dataset, views.first())?;
            views.push(predictions);
        }

        self.finish(views, start)
    }

    /// Run both stages on views that are already in memory
    pub fn run_on(&self, datasets: &[Dataset]) -> Result<MultiViewReport> {
        if datasets.is_empty() {
            return Err(MultiViewError::Config("at least one view is required".to_string()));
        }

        let start = Instant::now();
        let mut views: Vec<ViewPredictions> = Vec::with_capacity(datasets.len());
        for (i, dataset) in datasets.iter().enumerate() {
            let predictions = self.classify(i + 1, dataset, views.first())?;
            views.push(predictions);
        }

        self.finish(views, start)
    }

    fn classify(
        &self,
        view: usize,
        dataset: &Dataset,
        first: Option<&ViewPredictions>,
    ) -> Result<ViewPredictions> {
        // Fail before the expensive part when the shapes already disagree
        if let Some(first) = first {
            if dataset.n_instances() != first.n_instances() {
                return Err(MultiViewError::mismatch(
                    format!("instance count of view {} ({})", view, dataset.name()),
                    first.n_instances(),
                    dataset.n_instances(),
                ));
            }
            if dataset.n_classes() != first.n_classes {
                return Err(MultiViewError::mismatch(
                    format!("class count of view {} ({})", view, dataset.name()),
                    first.n_classes,
                    dataset.n_classes(),
                ));
            }
        }

        let k = neighbor_count(dataset.n_instances())?;
        ViewClassifier::new(self.config.n_folds, self.config.seed)
            .with_metric(self.config.metric)
            .classify(dataset, view, k)
    }

    fn finish(&self, views: Vec<ViewPredictions>, start: Instant) -> Result<MultiViewReport> {
        check_alignment(&views)?;

        let reference = &views[0];
        let predicted: Vec<&[usize]> = views.iter().map(|v| v.predicted.as_slice()).collect();
        let fusion = fuse(&predicted, &reference.actual, reference.n_classes)?;

        let best_single = views.iter().map(|v| v.accuracy).fold(f64::NEG_INFINITY, f64::max);
        if fusion.accuracy < best_single {
            warn!(
                fused = fusion.accuracy,
                best_single,
                "Fused accuracy is below the best single view"
            );
        }

        let elapsed_secs = start.elapsed().as_secs_f64();
        info!(
            views = views.len(),
            correct = fusion.correct,
            accuracy = fusion.accuracy,
            elapsed_secs,
            "Multi-view classification complete"
        );

        Ok(MultiViewReport {
            views: views.iter().map(ViewSummary::from).collect(),
            n_instances: reference.n_instances(),
            n_classes: reference.n_classes,
            fused: fusion.fused,
            actual: reference.actual.clone(),
            correct: fusion.correct,
            accuracy: fusion.accuracy,
            elapsed_secs,
        })
    }
}

/// Check that every view describes the same instances with the same labels
pub fn check_alignment(views: &[ViewPredictions]) -> Result<()> {
    let first = views
        .first()
        .ok_or_else(|| MultiViewError::Config("no views to align".to_string()))?;

    for other in &views[1..] {
        if other.n_classes != first.n_classes {
            return Err(MultiViewError::mismatch(
                format!("class count of view {}", other.view),
                first.n_classes,
                other.n_classes,
            ));
        }
        if other.actual.len() != first.actual.len() {
            return Err(MultiViewError::mismatch(
                format!("actual labels of view {}", other.view),
                first.actual.len(),
                other.actual.len(),
            ));
        }
        if let Some(i) = first.actual.iter().zip(&other.actual).position(|(a, b)| a != b) {
            return Err(MultiViewError::mismatch(
                format!(
                    "actual label of instance {} in view {} (view {} disagrees)",
                    i, other.view, first.view
                ),
                first.actual[i],
                other.actual[i],
            ));
        }
        if other.predicted.len() != other.actual.len() {
            return Err(MultiViewError::mismatch(
                format!("predictions of view {}", other.view),
                other.actual.len(),
                other.predicted.len(),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::CVResults;

    fn predictions(view: usize, predicted: Vec<usize>, actual: Vec<usize>) -> ViewPredictions {
        ViewPredictions {
            view,
            name: format!("view{}", view),
            ensemble_size: 2,
            n_classes: 2,
            predicted,
            actual,
            accuracy: 0.0,
            folds: CVResults::from_scores(vec![]),
        }
    }

    #[test]
    fn test_alignment_ok() {
        let views = vec![
            predictions(1, vec![0, 1, 1, 1], vec![0, 1, 0, 1]),
            predictions(2, vec![0, 0, 0, 1], vec![0, 1, 0, 1]),
        ];
        assert!(check_alignment(&views).is_ok());
    }

    #[test]
    fn test_alignment_detects_label_disagreement() {
        let views = vec![
            predictions(1, vec![0, 1], vec![0, 1]),
            predictions(2, vec![0, 1], vec![1, 1]),
        ];
        let err = check_alignment(&views).unwrap_err();
        assert!(matches!(err, MultiViewError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_alignment_detects_length_disagreement() {
        let views = vec![
            predictions(1, vec![0, 1], vec![0, 1]),
            predictions(2, vec![0], vec![0]),
        ];
        assert!(matches!(
            check_alignment(&views),
            Err(MultiViewError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_alignment_requires_views() {
        assert!(matches!(check_alignment(&[]), Err(MultiViewError::Config(_))));
    }

    #[test]
    fn test_run_requires_view_files() {
        let pipeline = MultiViewPipeline::new(MultiViewConfig::default()).unwrap();
        assert!(matches!(pipeline.run(), Err(MultiViewError::Config(_))));
        assert!(matches!(pipeline.run_on(&[]), Err(MultiViewError::Config(_))));
    }

    #[test]
    fn test_pipeline_rejects_bad_folds() {
        assert!(MultiViewPipeline::new(MultiViewConfig::default().with_folds(1)).is_err());
    }
}
