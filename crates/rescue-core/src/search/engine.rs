//! Coordinate-level search passes.

use crate::game::target::Target;
use crate::model::area::{Area, AreaGrid, AreaId, Coord};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    Found,
    NotFound,
}

impl SearchOutcome {
    pub fn is_found(self) -> bool {
        matches!(self, SearchOutcome::Found)
    }
}

impl fmt::Display for SearchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchOutcome::Found => f.write_str("Found"),
            SearchOutcome::NotFound => f.write_str("Not Found"),
        }
    }
}

/// Result of one pass over one area.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    area: AreaId,
    outcome: SearchOutcome,
    covered: Vec<Coord>,
}

impl SearchResult {
    pub fn area(&self) -> AreaId {
        self.area
    }

    pub fn outcome(&self) -> SearchOutcome {
        self.outcome
    }

    /// Cells examined by this pass, none of which had been searched before it.
    pub fn covered(&self) -> &[Coord] {
        &self.covered
    }
}

#[derive(Debug, Default)]
pub struct SearchEngine;

impl SearchEngine {
    /// Runs one pass over `area`, covering `floor(unsearched * effectiveness)` random
    /// cells that no earlier pass has reached.
    pub fn search<R: Rng + ?Sized>(
        area: &mut Area,
        target: &Target,
        effectiveness: f64,
        rng: &mut R,
    ) -> SearchResult {
        let covered = Self::sweep(area.grid_mut(), effectiveness, rng);
        let outcome = if target.area() == area.id() && covered.contains(&target.local()) {
            SearchOutcome::Found
        } else {
            SearchOutcome::NotFound
        };
        SearchResult {
            area: area.id(),
            outcome,
            covered,
        }
    }

    /// Grid-level part of a pass: shuffle the unsearched cells, keep a prefix and mark it.
    pub fn sweep<R: Rng + ?Sized>(
        grid: &mut AreaGrid,
        effectiveness: f64,
        rng: &mut R,
    ) -> Vec<Coord> {
        let mut remaining = grid.unsearched();
        remaining.shuffle(rng);
        let fraction = if effectiveness.is_nan() {
            0.0
        } else {
            effectiveness.clamp(0.0, 1.0)
        };
        let take = ((remaining.len() as f64 * fraction).floor() as usize).min(remaining.len());
        remaining.truncate(take);
        grid.mark_searched(remaining.iter().copied());
        remaining
    }
}

/// Share of the whole grid covered by the given passes together.
pub fn combined_coverage(grid: &AreaGrid, passes: &[&SearchResult]) -> f64 {
    if grid.cell_count() == 0 {
        return 0.0;
    }
    let union: BTreeSet<Coord> = passes
        .iter()
        .flat_map(|pass| pass.covered.iter().copied())
        .collect();
    union.len() as f64 / grid.cell_count() as f64
}
