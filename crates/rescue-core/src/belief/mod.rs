//! Bayesian belief over which area holds the target.
//!
//! - `update`: the `Belief` distribution and the non-detection revision rule.

mod update;

pub use update::{Belief, BeliefError, DEGENERATE_EPSILON, PROBABILITY_SUM_TOLERANCE};
