//! Voting ensemble methods

use std::sync::Arc;

use ndarray::ArrayView1;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::error::{MultiViewError, Result};
use crate::training::{Classifier, Learner, TrainingSet};

/// Turns the class distributions of several members into one class
pub trait VoteCombiner: Send {
    fn combine(&mut self, distributions: &[Vec<f64>]) -> Result<usize>;
}

/// Hard majority voting
///
/// Every member votes for each class tied at its highest probability (when
/// that probability is positive). Classes tied for the most votes are
/// resolved uniformly at random from a seeded generator, so a freshly built
/// combiner always resolves the same sequence of ties the same way.
#[derive(Debug, Clone)]
pub struct MajorityVote {
    seed: u64,
    rng: ChaCha8Rng,
}

impl MajorityVote {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Restart the tie-breaking sequence
    pub fn reset(&mut self) {
        self.rng = ChaCha8Rng::seed_from_u64(self.seed);
    }

    /// Votes per class; fails if the members disagree on the class count
    pub fn tally(distributions: &[Vec<f64>]) -> Result<Vec<usize>> {
        let n_classes = distributions
            .first()
            .map(Vec::len)
            .ok_or_else(|| MultiViewError::Config("no member distributions to combine".to_string()))?;

        let mut votes = vec![0usize; n_classes];
        for (member, dist) in distributions.iter().enumerate() {
            if dist.len() != n_classes {
                return Err(MultiViewError::mismatch(
                    format!("class distribution of member {}", member),
                    n_classes,
                    dist.len(),
                ));
            }

            let max = dist.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if max > 0.0 {
                for (class, &p) in dist.iter().enumerate() {
                    if p == max {
                        votes[class] += 1;
                    }
                }
            }
        }
        Ok(votes)
    }
}

impl VoteCombiner for MajorityVote {
    fn combine(&mut self, distributions: &[Vec<f64>]) -> Result<usize> {
        let votes = Self::tally(distributions)?;
        let best = votes.iter().copied().max().unwrap_or(0);
        let tied: Vec<usize> = votes
            .iter()
            .enumerate()
            .filter(|(_, &v)| v == best)
            .map(|(class, _)| class)
            .collect();

        match tied.len() {
            0 => Err(MultiViewError::Config("cannot vote over zero classes".to_string())),
            1 => Ok(tied[0]),
            n => Ok(tied[self.rng.gen_range(0..n)]),
        }
    }
}

/// Voting classifier ensemble
///
/// Members share the fold's training set and are combined per instance.
#[derive(Debug, Clone)]
pub struct VotingClassifier<L, V> {
    members: Vec<L>,
    combiner: V,
}

impl<L: Learner, V: VoteCombiner> VotingClassifier<L, V> {
    pub fn new(members: Vec<L>, combiner: V) -> Result<Self> {
        if members.is_empty() {
            return Err(MultiViewError::invalid_param(
                "members",
                0,
                "an ensemble needs at least one member",
            ));
        }
        Ok(Self { members, combiner })
    }

    pub fn members(&self) -> &[L] {
        &self.members
    }

    pub fn n_members(&self) -> usize {
        self.members.len()
    }

    /// Class distribution of every member for one instance
    pub fn member_distributions(&self, x: ArrayView1<f64>) -> Result<Vec<Vec<f64>>> {
        self.members.iter().map(|m| m.distribution(x)).collect()
    }
}

impl<L: Learner, V: VoteCombiner> Classifier for VotingClassifier<L, V> {
    fn fit(&mut self, train: Arc<TrainingSet>) -> Result<()> {
        for member in &mut self.members {
            member.fit(Arc::clone(&train))?;
        }
        Ok(())
    }

    fn predict(&mut self, x: ArrayView1<f64>) -> Result<usize> {
        let distributions = self.member_distributions(x)?;
        self.combiner.combine(&distributions)
    }
}
