//! K-Nearest Neighbors implementation
//!
//! Instance-based classifier in the style of Weka's IBk: numeric attributes
//! are rescaled to [0, 1] using the training ranges, nominal attributes
//! contribute 0 or 1, and every neighbour tied with the k-th distance takes
//! part in the vote.

use std::cmp::Ordering;
use std::sync::Arc;

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::{Classifier, Learner, TrainingSet};
use crate::error::{MultiViewError, Result};

/// Distance metric for KNN
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Euclidean distance (L2)
    Euclidean,
    /// Manhattan distance (L1)
    Manhattan,
    /// Minkowski distance with parameter p
    Minkowski(f64),
}

impl Default for DistanceMetric {
    fn default() -> Self {
        Self::Euclidean
    }
}

impl std::str::FromStr for DistanceMetric {
    type Err = MultiViewError;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.to_ascii_lowercase();
        match lower.as_str() {
            "euclidean" | "l2" => Ok(Self::Euclidean),
            "manhattan" | "l1" => Ok(Self::Manhattan),
            _ => {
                let p = lower
                    .strip_prefix("minkowski:")
                    .and_then(|p| p.parse::<f64>().ok())
                    .filter(|p| *p >= 1.0)
                    .ok_or_else(|| {
                        MultiViewError::invalid_param(
                            "metric",
                            s,
                            "expected euclidean, manhattan or minkowski:<p> with p >= 1",
                        )
                    })?;
                Ok(Self::Minkowski(p))
            }
        }
    }
}

/// KNN configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KNNConfig {
    /// Number of neighbors
    pub n_neighbors: usize,
    /// Distance metric
    pub metric: DistanceMetric,
}

impl Default for KNNConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 1,
            metric: DistanceMetric::Euclidean,
        }
    }
}

/// Observed range of a numeric attribute
#[derive(Debug, Clone, Copy)]
struct AttributeRange {
    min: f64,
    max: f64,
}

impl AttributeRange {
    /// Rescale to [0, 1]; attributes without a usable range map to 0
    fn normalize(&self, v: f64) -> f64 {
        if self.min.is_nan() || self.max == self.min {
            0.0
        } else {
            (v - self.min) / (self.max - self.min)
        }
    }
}

/// A training instance selected as neighbour
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
    pub label: usize,
}

/// K-Nearest Neighbors Classifier
#[derive(Debug, Clone)]
pub struct KNNClassifier {
    config: KNNConfig,
    train: Option<Arc<TrainingSet>>,
    ranges: Vec<AttributeRange>,
}

impl KNNClassifier {
    pub fn new(config: KNNConfig) -> Self {
        Self {
            config,
            train: None,
            ranges: Vec::new(),
        }
    }

    /// Create with default config and specified k
    pub fn with_k(k: usize) -> Self {
        Self::new(KNNConfig {
            n_neighbors: k,
            ..Default::default()
        })
    }

    pub fn n_neighbors(&self) -> usize {
        self.config.n_neighbors
    }

    /// Nearest training instances, including every tie at the k-th distance
    pub fn neighbors(&self, x: ArrayView1<f64>) -> Result<Vec<Neighbor>> {
        let train = self.train.as_ref().ok_or(MultiViewError::ModelNotFitted)?;
        if x.len() != train.n_features() {
            return Err(MultiViewError::mismatch(
                "query instance attributes",
                train.n_features(),
                x.len(),
            ));
        }

        let mut candidates: Vec<Neighbor> = train
            .features()
            .rows()
            .into_iter()
            .enumerate()
            .map(|(index, row)| Neighbor {
                index,
                distance: self.distance(train, x, row),
                label: train.labels()[index],
            })
            .collect();

        let k = self.config.n_neighbors.min(candidates.len());
        if k == candidates.len() {
            return Ok(candidates);
        }

        let by_distance = |a: &Neighbor, b: &Neighbor| -> Ordering {
            a.distance.total_cmp(&b.distance).then(a.index.cmp(&b.index))
        };
        candidates.select_nth_unstable_by(k - 1, by_distance);
        let kth = candidates[k - 1].distance;

        let (nearest, rest) = candidates.split_at(k);
        let mut neighbors = nearest.to_vec();
        neighbors.extend(rest.iter().filter(|n| n.distance == kth));
        Ok(neighbors)
    }

    fn distance(&self, train: &TrainingSet, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        let diffs = (0..a.len()).map(|j| self.difference(train, j, a[j], b[j]));

        match self.config.metric {
            DistanceMetric::Euclidean => diffs.map(|d| d * d).sum::<f64>().sqrt(),
            DistanceMetric::Manhattan => diffs.map(f64::abs).sum(),
            DistanceMetric::Minkowski(p) => {
                diffs.map(|d| d.abs().powf(p)).sum::<f64>().powf(1.0 / p)
            }
        }
    }

    /// Per-attribute difference, with missing values treated as maximally distant
    fn difference(&self, train: &TrainingSet, j: usize, a: f64, b: f64) -> f64 {
        if train.is_nominal(j) {
            return if a.is_nan() || b.is_nan() || a != b { 1.0 } else { 0.0 };
        }

        let range = &self.ranges[j];
        match (a.is_nan(), b.is_nan()) {
            (true, true) => 1.0,
            (false, false) => range.normalize(a) - range.normalize(b),
            (a_missing, _) => {
                let known = if a_missing { range.normalize(b) } else { range.normalize(a) };
                if known < 0.5 {
                    1.0 - known
                } else {
                    known
                }
            }
        }
    }
}

impl Learner for KNNClassifier {
    fn fit(&mut self, train: Arc<TrainingSet>) -> Result<()> {
        if self.config.n_neighbors == 0 {
            return Err(MultiViewError::invalid_param("n_neighbors", 0, "must be at least 1"));
        }
        if train.n_instances() == 0 {
            return Err(MultiViewError::invalid_param(
                "training_set",
                0,
                "must contain at least one instance",
            ));
        }

        self.ranges = train
            .features()
            .columns()
            .into_iter()
            .map(|col| {
                col.iter()
                    .filter(|v| !v.is_nan())
                    .fold(AttributeRange { min: f64::NAN, max: f64::NAN }, |r, &v| {
                        AttributeRange {
                            min: if r.min.is_nan() { v } else { r.min.min(v) },
                            max: if r.max.is_nan() { v } else { r.max.max(v) },
                        }
                    })
            })
            .collect();
        self.train = Some(train);
        Ok(())
    }

    fn distribution(&self, x: ArrayView1<f64>) -> Result<Vec<f64>> {
        let train = self.train.as_ref().ok_or(MultiViewError::ModelNotFitted)?;

        // Each neighbour votes with its instance weight
        let neighbors = self.neighbors(x)?;
        let mut counts = vec![0.0; train.n_classes()];
        for neighbor in &neighbors {
            counts[neighbor.label] += train.weights()[neighbor.index];
        }

        let total: f64 = counts.iter().sum();
        if total > 0.0 {
            counts.iter_mut().for_each(|c| *c /= total);
        }
        Ok(counts)
    }
}

impl Classifier for KNNClassifier {
    fn fit(&mut self, train: Arc<TrainingSet>) -> Result<()> {
        Learner::fit(self, train)
    }

    /// Most probable class; the lowest index wins a tie
    fn predict(&mut self, x: ArrayView1<f64>) -> Result<usize> {
        let dist = self.distribution(x)?;
        let mut best = 0;
        for (class, &p) in dist.iter().enumerate() {
            if p > dist[best] {
                best = class;
            }
        }
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Attribute, Dataset};
    use ndarray::{array, Array2};

    fn create_classification_data() -> Dataset {
        // Two well separated clusters
        let x = Array2::from_shape_vec((20, 2), vec![
            1.0, 1.0, 1.5, 1.5, 2.0, 2.0, 2.5, 2.5, 1.0, 2.0,
            1.5, 2.5, 2.0, 1.5, 2.5, 1.0, 1.2, 1.8, 1.8, 1.2,
            8.0, 8.0, 8.5, 8.5, 9.0, 9.0, 9.5, 9.5, 8.0, 9.0,
            8.5, 9.5, 9.0, 8.5, 9.5, 8.0, 8.2, 8.8, 8.8, 8.2,
        ]).unwrap();
        let y = vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1];

        Dataset::new(
            "clusters",
            vec![Attribute::numeric("a"), Attribute::numeric("b")],
            Attribute::nominal("class", vec!["low", "high"]),
            x,
            y,
        )
        .unwrap()
    }

    fn fitted(k: usize, ds: &Dataset) -> KNNClassifier {
        let mut knn = KNNClassifier::with_k(k);
        Learner::fit(&mut knn, Arc::new(TrainingSet::from_dataset(ds))).unwrap();
        knn
    }

    #[test]
    fn test_knn_classifier() {
        let ds = create_classification_data();
        let mut knn = fitted(3, &ds);

        let correct = (0..ds.n_instances())
            .filter(|&i| knn.predict(ds.features().row(i)).unwrap() == ds.labels()[i])
            .count();

        assert_eq!(correct, 20, "separable clusters should be classified perfectly");
    }

    #[test]
    fn test_distance_uses_normalised_ranges() {
        let ds = Dataset::new(
            "ranges",
            vec![Attribute::numeric("small"), Attribute::numeric("large")],
            Attribute::nominal("c", vec!["a", "b"]),
            array![[0.0, 0.0], [1.0, 1000.0]],
            vec![0, 1],
        )
        .unwrap();
        let knn = fitted(1, &ds);
        let train = knn.train.clone().unwrap();

        let d = knn.distance(&train, ds.features().row(0), ds.features().row(1));
        assert!((d - 2.0_f64.sqrt()).abs() < 1e-12, "both attributes span [0, 1] after scaling");
    }

    #[test]
    fn test_missing_value_difference() {
        let ds = Dataset::new(
            "missing",
            vec![Attribute::numeric("x"), Attribute::nominal("n", vec!["p", "q"])],
            Attribute::nominal("c", vec!["a", "b"]),
            array![[0.0, 0.0], [10.0, 1.0]],
            vec![0, 1],
        )
        .unwrap();
        let knn = fitted(1, &ds);
        let train = knn.train.clone().unwrap();

        assert_eq!(knn.difference(&train, 0, f64::NAN, f64::NAN), 1.0);
        assert!((knn.difference(&train, 0, f64::NAN, 2.0) - 0.8).abs() < 1e-12);
        assert!((knn.difference(&train, 0, 9.0, f64::NAN) - 0.9).abs() < 1e-12);
        assert_eq!(knn.difference(&train, 1, 0.0, 0.0), 0.0);
        assert_eq!(knn.difference(&train, 1, 0.0, 1.0), 1.0);
        assert_eq!(knn.difference(&train, 1, f64::NAN, 1.0), 1.0);
    }

    #[test]
    fn test_ties_at_kth_distance_are_included() {
        // Query at 0 has neighbours at distance 1 on both sides
        let ds = Dataset::new(
            "ties",
            vec![Attribute::numeric("x")],
            Attribute::nominal("c", vec!["a", "b", "c"]),
            array![[-1.0], [1.0], [5.0]],
            vec![0, 1, 2],
        )
        .unwrap();
        let knn = fitted(1, &ds);

        let neighbors = knn.neighbors(array![0.0].view()).unwrap();
        assert_eq!(neighbors.len(), 2);

        let dist = knn.distribution(array![0.0].view()).unwrap();
        assert_eq!(dist, vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_neighbours_vote_with_instance_weight() {
        let ds = Dataset::new(
            "weighted",
            vec![Attribute::numeric("x")],
            Attribute::nominal("c", vec!["a", "b"]),
            array![[0.0], [1.0], [1.1]],
            vec![0, 1, 1],
        )
        .unwrap();

        let mut unweighted = fitted(3, &ds);
        let dist = unweighted.distribution(array![0.4].view()).unwrap();
        assert!((dist[0] - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(unweighted.predict(array![0.4].view()).unwrap(), 1);

        let weighted = ds.with_weights(vec![50.0, 1.0, 1.0]).unwrap();
        let mut knn = fitted(3, &weighted);
        let dist = knn.distribution(array![0.4].view()).unwrap();
        assert!((dist[0] - 50.0 / 52.0).abs() < 1e-12);
        assert!((dist[1] - 2.0 / 52.0).abs() < 1e-12);
        assert_eq!(knn.predict(array![0.4].view()).unwrap(), 0);
    }

    #[test]
    fn test_k_clamped_to_training_size() {
        let ds = create_classification_data();
        let knn = fitted(100, &ds);
        let neighbors = knn.neighbors(ds.features().row(0)).unwrap();
        assert_eq!(neighbors.len(), 20);
    }

    #[test]
    fn test_predict_tie_prefers_lowest_class() {
        let ds = Dataset::new(
            "tie",
            vec![Attribute::numeric("x")],
            Attribute::nominal("c", vec!["a", "b"]),
            array![[-1.0], [1.0]],
            vec![1, 0],
        )
        .unwrap();
        let mut knn = fitted(2, &ds);
        assert_eq!(knn.predict(array![0.0].view()).unwrap(), 0);
    }

    #[test]
    fn test_unfitted_model() {
        let knn = KNNClassifier::with_k(1);
        assert!(matches!(
            knn.distribution(array![0.0].view()),
            Err(MultiViewError::ModelNotFitted)
        ));
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("Euclidean".parse::<DistanceMetric>().unwrap(), DistanceMetric::Euclidean);
        assert_eq!("l1".parse::<DistanceMetric>().unwrap(), DistanceMetric::Manhattan);
        assert_eq!(
            "minkowski:3".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Minkowski(3.0)
        );
        assert!("cosine".parse::<DistanceMetric>().is_err());
        assert!("minkowski:0.5".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn test_manhattan_distance() {
        let ds = Dataset::new(
            "m",
            vec![Attribute::numeric("a"), Attribute::numeric("b")],
            Attribute::nominal("c", vec!["x"]),
            array![[0.0, 0.0], [4.0, 4.0]],
            vec![0, 0],
        )
        .unwrap();
        let mut knn = KNNClassifier::new(KNNConfig {
            n_neighbors: 1,
            metric: DistanceMetric::Manhattan,
        });
        Learner::fit(&mut knn, Arc::new(TrainingSet::from_dataset(&ds))).unwrap();
        let train = knn.train.clone().unwrap();

        let d = knn.distance(&train, array![1.0, 3.0].view(), array![0.0, 0.0].view());
        assert!((d - 1.0).abs() < 1e-12);
    }
}
