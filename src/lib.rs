//! Multi-view k-nearest-neighbour classification
//!
//! Several independently measured feature sets ("views") of the same
//! instances are classified separately and then fused:
//! 1. every view is classified by a majority-vote ensemble of k-NN learners
//!    with `k = 1..=floor(sqrt(N))`, evaluated by stratified cross-validation;
//! 2. the per-view predictions are fused by a cross-view majority vote and
//!    scored against the actual labels.
//!
//! # Modules
//!
//! - [`data`] - Labeled datasets, ARFF and CSV loading
//! - [`training`] - k-NN learner and cross-validation harness
//! - [`ensemble`] - Majority-vote combiner and voting classifier
//! - [`multiview`] - Per-view classification, fusion and the driver
//! - [`config`] - Run configuration
//! - [`cli`] - Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use multiview_knn::prelude::*;
//!
//! let config = MultiViewConfig::new(["datasets/phone.arff", "datasets/watch.arff"]);
//! let report = MultiViewPipeline::new(config)?.run()?;
//! println!("Accuracy = {}", report.accuracy);
//! # Ok::<(), MultiViewError>(())
//! ```

pub mod error;

pub mod config;
pub mod data;
pub mod ensemble;
pub mod multiview;
pub mod training;

pub mod cli;

pub use error::{MultiViewError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::MultiViewConfig;
    pub use crate::data::{Attribute, AttributeKind, DataLoader, Dataset};
    pub use crate::ensemble::{MajorityVote, VoteCombiner, VotingClassifier};
    pub use crate::error::{MultiViewError, Result};
    pub use crate::multiview::{
        classify_view, fuse, neighbor_count, FusionResult, MultiViewPipeline, MultiViewReport,
        ViewClassifier, ViewPredictions,
    };
    pub use crate::training::{
        Classifier, CrossValidate, CrossValidator, DistanceMetric, KNNClassifier, Learner,
        TrainingSet,
    };
}
