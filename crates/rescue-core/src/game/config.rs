use crate::belief::{Belief, BeliefError};
use crate::game::target::{PlacementError, TargetPlacer};
use crate::model::area::{AreaId, Coord};
use crate::model::geometry::AreaGeometry;
use crate::search::effectiveness::{EffectivenessRange, EffectivenessSampler, SamplerError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prior probabilities for areas 1..3 from the SAROPS planning run.
pub const DEFAULT_PRIORS: [f64; AreaId::COUNT] = [0.2, 0.5, 0.3];

/// Everything a session needs besides its seed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub geometries: [AreaGeometry; AreaId::COUNT],
    pub priors: [f64; AreaId::COUNT],
    pub effectiveness: EffectivenessRange,
    /// Mode of the triangular placement draw; `None` means the midpoint.
    pub placement_mode: Option<f64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            geometries: AreaGeometry::cape_python(),
            priors: DEFAULT_PRIORS,
            effectiveness: EffectivenessRange::default(),
            placement_mode: None,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SessionConfigError> {
        self.components().map(|_| ())
    }

    pub(crate) fn components(
        &self,
    ) -> Result<(Belief, EffectivenessSampler, TargetPlacer), SessionConfigError> {
        for area in AreaId::ALL {
            let geometry = &self.geometries[area.index()];
            if geometry.width == 0 || geometry.height == 0 {
                return Err(SessionConfigError::EmptyArea { area });
            }
        }
        let belief = Belief::new(self.priors)?;
        let sampler = EffectivenessSampler::new(self.effectiveness)?;
        let placer = TargetPlacer::new(self.placement_mode)?;
        Ok((belief, sampler, placer))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionConfigError {
    #[error("area {area} has an empty grid")]
    EmptyArea { area: AreaId },
    #[error("target {local} lies outside area {area}")]
    TargetOutOfBounds { area: AreaId, local: Coord },
    #[error(transparent)]
    Prior(#[from] BeliefError),
    #[error(transparent)]
    Effectiveness(#[from] SamplerError),
    #[error(transparent)]
    Placement(#[from] PlacementError),
}
