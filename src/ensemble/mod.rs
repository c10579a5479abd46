//! Ensemble methods module
//!
//! Provides hard majority voting over a set of learners that share one
//! training set.

mod voting;

pub use voting::{MajorityVote, VoteCombiner, VotingClassifier};
