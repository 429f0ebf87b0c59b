//! Hidden target placement.

use crate::model::area::{AreaId, Coord};
use crate::model::geometry::AreaGeometry;
use rand::Rng;
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

/// Where the sailor actually is. Fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Target {
    area: AreaId,
    local: Coord,
    global: Coord,
}

impl Target {
    pub fn new(area: AreaId, local: Coord, geometry: &AreaGeometry) -> Self {
        Self {
            area,
            local,
            global: geometry.to_global(local),
        }
    }

    pub fn area(&self) -> AreaId {
        self.area
    }

    /// Position within the owning area's grid.
    pub fn local(&self) -> Coord {
        self.local
    }

    /// Position on the chart, for display.
    pub fn global(&self) -> Coord {
        self.global
    }
}

/// Continuous triangular distribution over `[low, high]` peaking at `mode`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangular {
    low: f64,
    high: f64,
    mode: f64,
}

impl Triangular {
    pub fn new(low: f64, high: f64, mode: f64) -> Result<Self, PlacementError> {
        let finite = low.is_finite() && high.is_finite() && mode.is_finite();
        if !finite || low >= high || mode < low || mode > high {
            return Err(PlacementError::InvalidMode { low, high, mode });
        }
        Ok(Self { low, high, mode })
    }

    /// Inverse-CDF draw.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let u: f64 = rng.r#gen();
        let span = self.high - self.low;
        let split = (self.mode - self.low) / span;
        if u < split {
            self.low + (span * (self.mode - self.low) * u).sqrt()
        } else {
            self.high - (span * (self.high - self.mode) * (1.0 - u)).sqrt()
        }
    }

    pub fn cdf(&self, x: f64) -> f64 {
        if x <= self.low {
            return 0.0;
        }
        if x >= self.high {
            return 1.0;
        }
        let span = self.high - self.low;
        if x <= self.mode {
            (x - self.low).powi(2) / (span * (self.mode - self.low))
        } else {
            1.0 - (self.high - x).powi(2) / (span * (self.high - self.mode))
        }
    }
}

/// Chooses the target's area and cell.
///
/// The area number is the floor of a triangular draw over `[1, n + 1)`. With the default
/// mode at the midpoint the middle area is the most likely pick and the edge areas share
/// the remainder evenly.
#[derive(Debug, Clone, Copy)]
pub struct TargetPlacer {
    distribution: Triangular,
}

impl Default for TargetPlacer {
    fn default() -> Self {
        Self {
            distribution: Triangular {
                low: Self::LOW,
                high: Self::HIGH,
                mode: (Self::LOW + Self::HIGH) / 2.0,
            },
        }
    }
}

impl TargetPlacer {
    const LOW: f64 = 1.0;
    const HIGH: f64 = AreaId::COUNT as f64 + 1.0;

    /// `mode` defaults to the midpoint of `[1, n + 1]` when `None`.
    pub fn new(mode: Option<f64>) -> Result<Self, PlacementError> {
        match mode {
            None => Ok(Self::default()),
            Some(mode) => Ok(Self {
                distribution: Triangular::new(Self::LOW, Self::HIGH, mode)?,
            }),
        }
    }

    /// Probability that each area receives the target.
    pub fn area_weights(&self) -> [f64; AreaId::COUNT] {
        std::array::from_fn(|index| {
            let lower = Self::LOW + index as f64;
            self.distribution.cdf(lower + 1.0) - self.distribution.cdf(lower)
        })
    }

    pub fn place<R: Rng + ?Sized>(
        &self,
        geometries: &[AreaGeometry; AreaId::COUNT],
        rng: &mut R,
    ) -> Target {
        let draw = self.distribution.sample(rng);
        let area = area_for_draw(draw);
        let geometry = &geometries[area.index()];
        let local = Coord::new(
            rng.gen_range(0..geometry.width),
            rng.gen_range(0..geometry.height),
        );
        let target = Target::new(area, local, geometry);

        if tracing::enabled!(Level::DEBUG) {
            event!(
                target: "rescue_core::placement",
                Level::DEBUG,
                draw,
                area = area.number(),
                local_x = local.x,
                local_y = local.y,
                global_x = target.global.x,
                global_y = target.global.y,
            );
        }

        target
    }
}

fn area_for_draw(draw: f64) -> AreaId {
    match draw.floor() as i64 {
        i64::MIN..=1 => AreaId::One,
        2 => AreaId::Two,
        _ => AreaId::Three,
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlacementError {
    #[error("triangular mode {mode} must lie within [{low}, {high}]")]
    InvalidMode { low: f64, high: f64, mode: f64 },
}
