//! Cross-view fusion
//!
//! Every view casts one vote per instance for the class it predicted. The
//! winner is found by scanning classes in ascending order and taking any
//! class whose count is greater than *or equal to* the best so far, so the
//! highest class index wins among tied classes.

use serde::{Deserialize, Serialize};

use crate::error::{MultiViewError, Result};

/// Outcome of fusing the per-view predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    /// Fused class per instance, in instance order
    pub fused: Vec<usize>,
    /// Number of instances whose fused class equals the actual class
    pub correct: usize,
    /// Percentage of correct instances, rounded to two decimals
    pub accuracy: f64,
}

/// Fuse per-view predictions and score them against the actual labels
pub fn fuse<P: AsRef<[usize]>>(
    predicted_by_view: &[P],
    actual: &[usize],
    n_classes: usize,
) -> Result<FusionResult> {
    if predicted_by_view.is_empty() {
        return Err(MultiViewError::Config("fusion needs at least one view".to_string()));
    }
    if n_classes == 0 {
        return Err(MultiViewError::Config("fusion needs at least one class".to_string()));
    }
    if actual.is_empty() {
        return Err(MultiViewError::Config("fusion needs at least one instance".to_string()));
    }

    let n = actual.len();
    for (view, predicted) in predicted_by_view.iter().enumerate() {
        let predicted = predicted.as_ref();
        if predicted.len() != n {
            return Err(MultiViewError::mismatch(
                format!("predictions of view {}", view + 1),
                n,
                predicted.len(),
            ));
        }
        if let Some(&bad) = predicted.iter().find(|&&c| c >= n_classes) {
            return Err(MultiViewError::mismatch(
                format!("predicted class of view {}", view + 1),
                format!("< {}", n_classes),
                bad,
            ));
        }
    }
    if let Some(&bad) = actual.iter().find(|&&c| c >= n_classes) {
        return Err(MultiViewError::mismatch("actual class", format!("< {}", n_classes), bad));
    }

    let mut fused = Vec::with_capacity(n);
    let mut tally = vec![0usize; n_classes];
    let mut correct = 0;

    for (i, &truth) in actual.iter().enumerate() {
        tally.iter_mut().for_each(|t| *t = 0);
        for predicted in predicted_by_view {
            tally[predicted.as_ref()[i]] += 1;
        }

        let decision = fused_vote(&tally);
        if decision == truth {
            correct += 1;
        }
        fused.push(decision);
    }

    Ok(FusionResult {
        fused,
        correct,
        accuracy: round2(correct as f64 / n as f64 * 100.0),
    })
}

/// Winning class of one vote tally; the highest index wins a tie
pub fn fused_vote(tally: &[usize]) -> usize {
    let mut decision = 0;
    let mut max = 0;
    for (class, &count) in tally.iter().enumerate() {
        if count >= max {
            max = count;
            decision = class;
        }
    }
    decision
}

/// Round to two decimals, resolving halves to the even neighbour
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}
