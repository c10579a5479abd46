//! Multi-view classification
//!
//! Each view is classified on its own by an ensemble of k-NN learners with
//! neighbour counts `1..=K`, evaluated through stratified cross-validation.
//! The per-view predictions are then fused by a cross-view majority vote.
//!
//! - [`view`]: per-view ensemble classification
//! - [`fusion`]: cross-view vote and accuracy
//! - [`pipeline`]: loads the views and drives both stages

pub mod fusion;
pub mod pipeline;
pub mod view;

pub use fusion::{fuse, fused_vote, round2, FusionResult};
pub use pipeline::{check_alignment, MultiViewPipeline, MultiViewReport, ViewSummary};
pub use view::{classify_view, ViewClassifier, ViewPredictions};

use crate::error::{MultiViewError, Result};

/// Ensemble size for a view with `n_instances` instances: `floor(sqrt(N))`
pub fn neighbor_count(n_instances: usize) -> Result<usize> {
    if n_instances == 0 {
        return Err(MultiViewError::Config(
            "cannot size an ensemble for an empty view".to_string(),
        ));
    }

    let mut k = (n_instances as f64).sqrt() as usize;
    // Guard against float error on large perfect squares
    while k.checked_mul(k).map_or(true, |sq| sq > n_instances) {
        k -= 1;
    }
    while (k + 1).checked_mul(k + 1).map_or(false, |sq| sq <= n_instances) {
        k += 1;
    }
    Ok(k)
}
