use super::area::Coord;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Search area rectangles on the Cape Python chart, as `[left, top, right, bottom]`.
pub const CAPE_PYTHON_CORNERS: [[u32; 4]; 3] = [
    [130, 265, 180, 315],
    [80, 255, 130, 305],
    [105, 205, 155, 255],
];

/// Sailor's last known position on the chart.
pub const LAST_KNOWN_POSITION: Coord = Coord::new(50, 30);

/// Placement of one search area on the chart.
///
/// Only `width`/`height` matter to the simulation; the origin is used to translate
/// local grid coordinates into chart coordinates for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaGeometry {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl AreaGeometry {
    pub const fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Builds a geometry from a `[left, top, right, bottom]` box (right/bottom exclusive).
    pub fn from_corners(corners: [u32; 4]) -> Result<Self, GeometryError> {
        let [left, top, right, bottom] = corners;
        if right <= left || bottom <= top {
            return Err(GeometryError::EmptyBox { corners });
        }
        Ok(Self::new(left, top, right - left, bottom - top))
    }

    pub fn cape_python() -> [AreaGeometry; 3] {
        let mut out = [AreaGeometry::new(0, 0, 1, 1); 3];
        for (slot, corners) in out.iter_mut().zip(CAPE_PYTHON_CORNERS) {
            let [left, top, right, bottom] = corners;
            *slot = AreaGeometry::new(left, top, right - left, bottom - top);
        }
        out
    }

    pub fn origin(&self) -> Coord {
        Coord::new(self.left, self.top)
    }

    pub fn corners(&self) -> [u32; 4] {
        [
            self.left,
            self.top,
            self.left + self.width,
            self.top + self.height,
        ]
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Translates a local grid coordinate into chart coordinates.
    pub fn to_global(&self, local: Coord) -> Coord {
        Coord::new(self.left + local.x, self.top + local.y)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("area box {corners:?} has no cells (right/bottom must exceed left/top)")]
    EmptyBox { corners: [u32; 4] },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cape_python_areas_are_fifty_by_fifty() {
        for geometry in AreaGeometry::cape_python() {
            assert_eq!(geometry.width, 50);
            assert_eq!(geometry.height, 50);
            assert_eq!(geometry.cell_count(), 2_500);
        }
    }

    #[test]
    fn corners_roundtrip() {
        for corners in CAPE_PYTHON_CORNERS {
            let geometry = AreaGeometry::from_corners(corners).expect("valid box");
            assert_eq!(geometry.corners(), corners);
        }
    }

    #[test]
    fn rejects_empty_box() {
        let err = AreaGeometry::from_corners([10, 10, 10, 20]).expect_err("zero width");
        assert_eq!(
            err,
            GeometryError::EmptyBox {
                corners: [10, 10, 10, 20]
            }
        );
    }

    #[test]
    fn local_to_global_offsets_by_origin() {
        let geometry = AreaGeometry::new(80, 255, 50, 50);
        assert_eq!(geometry.to_global(Coord::new(3, 4)), Coord::new(83, 259));
    }
}
