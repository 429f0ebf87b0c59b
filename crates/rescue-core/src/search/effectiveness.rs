//! Per-round search effectiveness draws.

use crate::model::area::AreaId;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_EFFECTIVENESS_LOW: f64 = 0.2;
pub const DEFAULT_EFFECTIVENESS_HIGH: f64 = 0.9;

/// Closed interval effectiveness values are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectivenessRange {
    pub low: f64,
    pub high: f64,
}

impl Default for EffectivenessRange {
    fn default() -> Self {
        Self {
            low: DEFAULT_EFFECTIVENESS_LOW,
            high: DEFAULT_EFFECTIVENESS_HIGH,
        }
    }
}

impl EffectivenessRange {
    /// Requires `0 <= low <= high < 1`.
    pub fn validate(&self) -> Result<(), SamplerError> {
        let ok = self.low.is_finite()
            && self.high.is_finite()
            && self.low >= 0.0
            && self.low <= self.high
            && self.high < 1.0;
        if ok {
            Ok(())
        } else {
            Err(SamplerError::InvalidRange {
                low: self.low,
                high: self.high,
            })
        }
    }
}

/// Draws one independent effectiveness value per area each round.
#[derive(Debug, Clone, Copy)]
pub struct EffectivenessSampler {
    range: EffectivenessRange,
}

impl Default for EffectivenessSampler {
    fn default() -> Self {
        Self {
            range: EffectivenessRange::default(),
        }
    }
}

impl EffectivenessSampler {
    pub fn new(range: EffectivenessRange) -> Result<Self, SamplerError> {
        range.validate()?;
        Ok(Self { range })
    }

    /// Returns effectiveness for areas 1..3, indexed by [`AreaId::index`].
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> [f64; AreaId::COUNT] {
        let EffectivenessRange { low, high } = self.range;
        std::array::from_fn(|_| {
            if low == high {
                low
            } else {
                rng.gen_range(low..=high)
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SamplerError {
    #[error("effectiveness range [{low}, {high}] must satisfy 0 <= low <= high < 1")]
    InvalidRange { low: f64, high: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn samples_stay_within_default_range() {
        let sampler = EffectivenessSampler::default();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..500 {
            for value in sampler.sample(&mut rng) {
                assert!((0.2..=0.9).contains(&value), "out of range: {value}");
            }
        }
    }

    #[test]
    fn areas_draw_independently() {
        let sampler = EffectivenessSampler::default();
        let mut rng = StdRng::seed_from_u64(99);
        let draws: Vec<_> = (0..20).map(|_| sampler.sample(&mut rng)).collect();
        assert!(draws.iter().any(|e| e[0] != e[1] || e[1] != e[2]));
    }

    #[test]
    fn same_seed_same_draws() {
        let sampler = EffectivenessSampler::default();
        let a = sampler.sample(&mut StdRng::seed_from_u64(3));
        let b = sampler.sample(&mut StdRng::seed_from_u64(3));
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_range_returns_constant() {
        let sampler =
            EffectivenessSampler::new(EffectivenessRange { low: 0.5, high: 0.5 }).expect("valid");
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sampler.sample(&mut rng), [0.5; 3]);
    }

    #[test]
    fn rejects_ranges_reaching_one() {
        for (low, high) in [(0.2, 1.0), (0.6, 0.4), (-0.1, 0.5), (0.1, f64::NAN)] {
            let err = EffectivenessSampler::new(EffectivenessRange { low, high });
            assert!(matches!(err, Err(SamplerError::InvalidRange { .. })));
        }
    }
}
