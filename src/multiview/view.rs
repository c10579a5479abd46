//! Per-view ensemble classification

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::data::Dataset;
use crate::ensemble::{MajorityVote, VotingClassifier};
use crate::error::{MultiViewError, Result};
use crate::training::{
    CVResults, CrossValidate, CrossValidator, DistanceMetric, KNNClassifier, KNNConfig,
    PredictionRecord,
};

use super::round2;

/// Seed used when none is configured
pub const DEFAULT_SEED: u64 = 1;

/// Cross-validated predictions of one view, in instance order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewPredictions {
    /// 1-based view index
    pub view: usize,
    pub name: String,
    /// Number of ensemble members (largest neighbour count)
    pub ensemble_size: usize,
    pub n_classes: usize,
    pub predicted: Vec<usize>,
    pub actual: Vec<usize>,
    /// Percentage of instances this view alone classifies correctly
    pub accuracy: f64,
    pub folds: CVResults,
}

impl ViewPredictions {
    pub fn n_instances(&self) -> usize {
        self.actual.len()
    }
}

/// Classifies one view with a k-NN voting ensemble under cross-validation
#[derive(Debug, Clone)]
pub struct ViewClassifier<H = CrossValidator> {
    harness: H,
    seed: u64,
    metric: DistanceMetric,
}

impl ViewClassifier<CrossValidator> {
    /// Stratified `n_folds` cross-validation with the given seed
    pub fn new(n_folds: usize, seed: u64) -> Self {
        Self::with_harness(CrossValidator::stratified(n_folds, seed), seed)
    }
}

impl<H: CrossValidate> ViewClassifier<H> {
    /// Use a custom evaluation harness; `seed` drives the vote tie-breaks
    pub fn with_harness(harness: H, seed: u64) -> Self {
        Self {
            harness,
            seed,
            metric: DistanceMetric::default(),
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    /// Fresh, unfitted ensemble with neighbour counts `1..=k`
    pub fn build_ensemble(&self, k: usize) -> Result<VotingClassifier<KNNClassifier, MajorityVote>> {
        knn_ensemble(k, self.metric, self.seed)
    }

    /// Cross-validate an ensemble of `k` members on `dataset`
    ///
    /// `view` is the 1-based position of the dataset among the views.
    pub fn classify(&self, dataset: &Dataset, view: usize, k: usize) -> Result<ViewPredictions> {
        if k == 0 {
            return Err(MultiViewError::Config(format!(
                "view {} ({}): ensemble size must be at least 1",
                view,
                dataset.name()
            )));
        }
        if dataset.n_classes() == 0 {
            return Err(MultiViewError::Config(format!(
                "view {} ({}): dataset declares no classes",
                view,
                dataset.name()
            )));
        }

        debug!(view, name = dataset.name(), k, "Building view ensemble");
        let (metric, seed) = (self.metric, self.seed);
        let records = self
            .harness
            .cross_validate(dataset, move || knn_ensemble(k, metric, seed))?;

        let (predicted, actual) = reorder(dataset, &records)?;
        let correct = predicted.iter().zip(&actual).filter(|(p, a)| p == a).count();
        let accuracy = round2(correct as f64 / actual.len() as f64 * 100.0);
        let folds = CVResults::from_records(&records);

        info!(
            view,
            name = dataset.name(),
            instances = actual.len(),
            ensemble_size = k,
            accuracy,
            fold_std = folds.std_score,
            "View classified"
        );

        Ok(ViewPredictions {
            view,
            name: dataset.name().to_string(),
            ensemble_size: k,
            n_classes: dataset.n_classes(),
            predicted,
            actual,
            accuracy,
            folds,
        })
    }
}

fn knn_ensemble(
    k: usize,
    metric: DistanceMetric,
    seed: u64,
) -> Result<VotingClassifier<KNNClassifier, MajorityVote>> {
    let members = (1..=k)
        .map(|n_neighbors| KNNClassifier::new(KNNConfig { n_neighbors, metric }))
        .collect();
    VotingClassifier::new(members, MajorityVote::new(seed))
}

/// Put harness records back in instance order, checking that every instance
/// was held out exactly once with its true label
fn reorder(dataset: &Dataset, records: &[PredictionRecord]) -> Result<(Vec<usize>, Vec<usize>)> {
    let n = dataset.n_instances();
    let n_classes = dataset.n_classes();
    if records.len() != n {
        return Err(MultiViewError::CrossValidation(format!(
            "{}: expected {} predictions, harness returned {}",
            dataset.name(),
            n,
            records.len()
        )));
    }

    let mut predicted: Vec<Option<usize>> = vec![None; n];
    for record in records {
        if record.index >= n {
            return Err(MultiViewError::CrossValidation(format!(
                "{}: prediction for unknown instance {}",
                dataset.name(),
                record.index
            )));
        }
        if record.actual != dataset.labels()[record.index] {
            return Err(MultiViewError::CrossValidation(format!(
                "{}: instance {} reported with class {} but is labeled {}",
                dataset.name(),
                record.index,
                record.actual,
                dataset.labels()[record.index]
            )));
        }
        if record.predicted >= n_classes {
            return Err(MultiViewError::CrossValidation(format!(
                "{}: instance {} predicted as class {} of {}",
                dataset.name(),
                record.index,
                record.predicted,
                n_classes
            )));
        }

        let slot = &mut predicted[record.index];
        if slot.is_some() {
            return Err(MultiViewError::CrossValidation(format!(
                "{}: instance {} predicted more than once",
                dataset.name(),
                record.index
            )));
        }
        *slot = Some(record.predicted);
    }

    let predicted = predicted
        .into_iter()
        .enumerate()
        .map(|(i, p)| {
            p.ok_or_else(|| {
                MultiViewError::CrossValidation(format!(
                    "{}: instance {} was never held out",
                    dataset.name(),
                    i
                ))
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    Ok((predicted, dataset.labels().to_vec()))
}

/// Classify one view with stratified cross-validation and the default seed
pub fn classify_view(dataset: &Dataset, n_folds: usize, view: usize, k: usize) -> Result<ViewPredictions> {
    ViewClassifier::new(n_folds, DEFAULT_SEED).classify(dataset, view, k)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Attribute;
    use crate::training::Classifier;
    use ndarray::Array2;

    fn two_blobs(n_per_class: usize) -> Dataset {
        let n = 2 * n_per_class;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| {
            let base = if i < n_per_class { 0.0 } else { 10.0 };
            base + ((i * 7 + j * 3) % 5) as f64 * 0.3
        });
        let y = (0..n).map(|i| usize::from(i >= n_per_class)).collect();
        Dataset::new(
            "blobs",
            vec![Attribute::numeric("a"), Attribute::numeric("b")],
            Attribute::nominal("class", vec!["near", "far"]),
            x,
            y,
        )
        .unwrap()
    }

    /// Harness that loses the last record
    struct DroppingHarness;

    impl CrossValidate for DroppingHarness {
        fn cross_validate<C, F>(&self, dataset: &Dataset, factory: F) -> Result<Vec<PredictionRecord>>
        where
            C: Classifier,
            F: Fn() -> Result<C> + Sync,
        {
            let mut records = CrossValidator::stratified(2, 1).cross_validate(dataset, factory)?;
            records.pop();
            Ok(records)
        }
    }

    /// Harness that reports every instance twice
    struct DuplicatingHarness;

    impl CrossValidate for DuplicatingHarness {
        fn cross_validate<C, F>(&self, dataset: &Dataset, _factory: F) -> Result<Vec<PredictionRecord>>
        where
            C: Classifier,
            F: Fn() -> Result<C> + Sync,
        {
            let half = dataset.n_instances() / 2;
            Ok((0..dataset.n_instances())
                .map(|i| PredictionRecord {
                    index: i % half,
                    fold: 0,
                    actual: dataset.labels()[i % half],
                    predicted: 0,
                })
                .collect())
        }
    }

    #[test]
    fn test_classify_view_lengths_and_order() {
        let ds = two_blobs(15);
        let result = classify_view(&ds, 10, 1, 5).unwrap();

        assert_eq!(result.predicted.len(), ds.n_instances());
        assert_eq!(result.actual, ds.labels());
        assert_eq!(result.ensemble_size, 5);
        assert_eq!(result.accuracy, 100.0);
        assert_eq!(result.folds.n_folds, 10);
    }

    #[test]
    fn test_classify_view_is_deterministic() {
        let ds = two_blobs(12);
        let a = ViewClassifier::new(5, 1).classify(&ds, 1, 4).unwrap();
        let b = ViewClassifier::new(5, 1).classify(&ds, 1, 4).unwrap();
        assert_eq!(a.predicted, b.predicted);
        assert_eq!(a.actual, b.actual);
    }

    #[test]
    fn test_invalid_configuration() {
        let ds = two_blobs(3);
        assert!(matches!(classify_view(&ds, 10, 1, 0), Err(MultiViewError::Config(_))));
        assert!(matches!(classify_view(&ds, 1, 1, 2), Err(MultiViewError::Config(_))));
        // More folds than instances
        assert!(matches!(classify_view(&ds, 10, 1, 2), Err(MultiViewError::Config(_))));
    }

    #[test]
    fn test_incomplete_harness_output() {
        let ds = two_blobs(4);
        let err = ViewClassifier::with_harness(DroppingHarness, 1)
            .classify(&ds, 1, 2)
            .unwrap_err();
        assert!(matches!(err, MultiViewError::CrossValidation(_)));
    }

    #[test]
    fn test_duplicate_harness_output() {
        let ds = two_blobs(4);
        let err = ViewClassifier::with_harness(DuplicatingHarness, 1)
            .classify(&ds, 1, 2)
            .unwrap_err();
        assert!(matches!(err, MultiViewError::CrossValidation(_)));
    }

    #[test]
    fn test_build_ensemble_sizes() {
        let classifier = ViewClassifier::new(10, 1);
        let ensemble = classifier.build_ensemble(4).unwrap();
        let ks: Vec<usize> = ensemble.members().iter().map(|m| m.n_neighbors()).collect();
        assert_eq!(ks, vec![1, 2, 3, 4]);
    }
}
