//! Non-detection updates of the per-area target probabilities.

use crate::model::area::AreaId;
use serde::Serialize;
use thiserror::Error;

/// Remaining probability mass below this is treated as zero.
pub const DEGENERATE_EPSILON: f64 = 1e-12;

/// Allowed drift from 1.0 when validating priors.
pub const PROBABILITY_SUM_TOLERANCE: f64 = 1e-6;

/// Probability that the target lies in each area, indexed by [`AreaId::index`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Belief {
    probs: [f64; AreaId::COUNT],
}

impl Belief {
    pub fn new(priors: [f64; AreaId::COUNT]) -> Result<Self, BeliefError> {
        let valid = priors.iter().all(|p| p.is_finite() && (0.0..=1.0).contains(p));
        let sum: f64 = priors.iter().sum();
        if !valid || (sum - 1.0).abs() > PROBABILITY_SUM_TOLERANCE {
            return Err(BeliefError::InvalidPrior { priors });
        }
        Ok(Self {
            probs: priors.map(|p| p / sum),
        })
    }

    pub fn prob(&self, area: AreaId) -> f64 {
        self.probs[area.index()]
    }

    pub fn probs(&self) -> [f64; AreaId::COUNT] {
        self.probs
    }

    /// Applies Bayes' rule for "searched with effectiveness `e_i` and not found":
    /// `p_i' = p_i (1 - e_i) / Σ p_j (1 - e_j)`.
    ///
    /// On error the belief is left untouched.
    pub fn revise(&mut self, effectiveness: [f64; AreaId::COUNT]) -> Result<(), BeliefError> {
        if let Some(area) = AreaId::ALL.into_iter().find(|area| {
            let e = effectiveness[area.index()];
            !e.is_finite() || !(0.0..=1.0).contains(&e)
        }) {
            return Err(BeliefError::EffectivenessOutOfRange {
                area,
                value: effectiveness[area.index()],
            });
        }

        let unexplained: [f64; AreaId::COUNT] =
            std::array::from_fn(|i| self.probs[i] * (1.0 - effectiveness[i]));
        let denom: f64 = unexplained.iter().sum();
        if !denom.is_finite() || denom <= DEGENERATE_EPSILON {
            return Err(BeliefError::Degenerate {
                probs: self.probs,
                effectiveness,
            });
        }

        self.probs = unexplained.map(|mass| mass / denom);
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BeliefError {
    #[error("priors {priors:?} must be within [0, 1] and sum to 1")]
    InvalidPrior { priors: [f64; AreaId::COUNT] },
    #[error("effectiveness {value} for area {area} is outside [0, 1]")]
    EffectivenessOutOfRange { area: AreaId, value: f64 },
    #[error(
        "no probability mass left after a miss (probabilities {probs:?}, effectiveness {effectiveness:?})"
    )]
    Degenerate {
        probs: [f64; AreaId::COUNT],
        effectiveness: [f64; AreaId::COUNT],
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn assert_normalised(belief: &Belief) {
        let sum: f64 = belief.probs().iter().sum();
        assert!((sum - 1.0).abs() < 1e-9, "sum drifted to {sum}");
    }

    #[test]
    fn unsearched_area_gains_probability() {
        let mut belief = Belief::new([0.2, 0.5, 0.3]).expect("valid priors");
        belief.revise([0.6, 0.0, 0.4]).expect("revision succeeds");
        assert!(belief.prob(AreaId::Two) > 0.5);
        assert!(belief.prob(AreaId::One) < 0.2);
        assert!(belief.prob(AreaId::Three) < 0.3);
        assert_normalised(&belief);
    }

    #[test]
    fn matches_hand_computed_posterior() {
        let mut belief = Belief::new([0.2, 0.5, 0.3]).expect("valid priors");
        belief.revise([0.5, 0.0, 0.5]).expect("revision succeeds");
        let denom = 0.2 * 0.5 + 0.5 + 0.3 * 0.5;
        assert!((belief.prob(AreaId::One) - 0.1 / denom).abs() < 1e-12);
        assert!((belief.prob(AreaId::Two) - 0.5 / denom).abs() < 1e-12);
        assert!((belief.prob(AreaId::Three) - 0.15 / denom).abs() < 1e-12);
    }

    #[test]
    fn zero_effectiveness_is_a_no_op() {
        let mut belief = Belief::new([0.2, 0.5, 0.3]).expect("valid priors");
        let before = belief.probs();
        belief.revise([0.0; 3]).expect("revision succeeds");
        for (after, before) in belief.probs().iter().zip(before) {
            assert!((after - before).abs() < 1e-12);
        }
    }

    #[test]
    fn collapse_to_zero_mass_is_degenerate() {
        let mut belief = Belief::new([1.0, 0.0, 0.0]).expect("valid priors");
        let err = belief.revise([1.0, 0.0, 0.0]).expect_err("denominator is zero");
        assert!(matches!(err, BeliefError::Degenerate { .. }));
        assert_eq!(belief.probs(), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn rejects_effectiveness_out_of_range() {
        let mut belief = Belief::new([0.2, 0.5, 0.3]).expect("valid priors");
        let err = belief.revise([0.2, 1.5, 0.1]).expect_err("out of range");
        assert_eq!(
            err,
            BeliefError::EffectivenessOutOfRange {
                area: AreaId::Two,
                value: 1.5
            }
        );
    }

    #[test]
    fn rejects_priors_not_summing_to_one() {
        assert!(matches!(
            Belief::new([0.2, 0.2, 0.2]),
            Err(BeliefError::InvalidPrior { .. })
        ));
        assert!(matches!(
            Belief::new([1.2, -0.1, -0.1]),
            Err(BeliefError::InvalidPrior { .. })
        ));
    }

    #[test]
    fn randomised_revisions_stay_normalised() {
        let mut rng = SmallRng::seed_from_u64(42);
        let mut belief = Belief::new([0.2, 0.5, 0.3]).expect("valid priors");
        for _ in 0..200 {
            let mut effectiveness = [0.0; 3];
            for slot in effectiveness.iter_mut() {
                if rng.gen_bool(0.7) {
                    *slot = rng.gen_range(0.2..=0.9);
                }
            }
            belief.revise(effectiveness).expect("never degenerate below 1");
            assert_normalised(&belief);
        }
    }
}
