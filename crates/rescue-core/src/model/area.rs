use super::geometry::AreaGeometry;
use core::fmt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One of the three search areas. Numbered from 1 as on the chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum AreaId {
    One = 1,
    Two = 2,
    Three = 3,
}

impl AreaId {
    pub const COUNT: usize = 3;

    pub const ALL: [AreaId; 3] = [AreaId::One, AreaId::Two, AreaId::Three];

    /// Looks up an area by its 1-based chart number.
    pub const fn from_number(number: usize) -> Option<Self> {
        match number {
            1 => Some(AreaId::One),
            2 => Some(AreaId::Two),
            3 => Some(AreaId::Three),
            _ => None,
        }
    }

    pub const fn from_index(index: usize) -> Option<Self> {
        Self::from_number(index + 1)
    }

    /// Zero-based slot for per-area arrays.
    pub const fn index(self) -> usize {
        self as usize - 1
    }

    pub const fn number(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for AreaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Grid cell coordinate. Local to an area unless stated otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: u32,
    pub y: u32,
}

impl Coord {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Coordinate space of one area plus the cells already covered by earlier passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaGrid {
    width: u32,
    height: u32,
    searched: BTreeSet<Coord>,
}

impl AreaGrid {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            searched: BTreeSet::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Every coordinate in the grid, row by row.
    pub fn coords(&self) -> impl Iterator<Item = Coord> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).map(move |x| Coord::new(x, y)))
    }

    pub fn contains(&self, coord: Coord) -> bool {
        coord.x < self.width && coord.y < self.height
    }

    /// Cells no pass has covered yet, in row order.
    pub fn unsearched(&self) -> Vec<Coord> {
        self.coords()
            .filter(|coord| !self.searched.contains(coord))
            .collect()
    }

    /// Adds `coords` to the searched set and returns how many were new.
    ///
    /// Coordinates outside the grid are ignored.
    pub fn mark_searched<I>(&mut self, coords: I) -> usize
    where
        I: IntoIterator<Item = Coord>,
    {
        let mut added = 0;
        for coord in coords {
            if self.contains(coord) && self.searched.insert(coord) {
                added += 1;
            }
        }
        added
    }

    pub fn searched(&self) -> &BTreeSet<Coord> {
        &self.searched
    }

    pub fn searched_count(&self) -> usize {
        self.searched.len()
    }

    pub fn unsearched_count(&self) -> usize {
        self.cell_count() - self.searched.len()
    }

    pub fn is_exhausted(&self) -> bool {
        self.unsearched_count() == 0
    }

    pub fn searched_fraction(&self) -> f64 {
        if self.cell_count() == 0 {
            return 1.0;
        }
        self.searched.len() as f64 / self.cell_count() as f64
    }
}

/// A search area: its chart box, its grid and this round's effectiveness.
#[derive(Debug, Clone)]
pub struct Area {
    id: AreaId,
    geometry: AreaGeometry,
    grid: AreaGrid,
    effectiveness: f64,
}

impl Area {
    pub fn new(id: AreaId, geometry: AreaGeometry) -> Self {
        Self {
            id,
            geometry,
            grid: AreaGrid::new(geometry.width, geometry.height),
            effectiveness: 0.0,
        }
    }

    pub fn id(&self) -> AreaId {
        self.id
    }

    pub fn geometry(&self) -> &AreaGeometry {
        &self.geometry
    }

    pub fn grid(&self) -> &AreaGrid {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut AreaGrid {
        &mut self.grid
    }

    pub fn effectiveness(&self) -> f64 {
        self.effectiveness
    }

    pub(crate) fn set_effectiveness(&mut self, effectiveness: f64) {
        self.effectiveness = effectiveness.clamp(0.0, 1.0);
    }
}
