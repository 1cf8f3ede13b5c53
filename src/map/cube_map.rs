//! Bounded cube array that rolls with the platform.
//!
//! Cells are addressed by `CubeIndex`; each cell points at a bucket in an
//! arena through an indirection table. Rolling the grid permutes the table and
//! clears the buckets that fall off the edge, so points are never copied.
//! A per-axis center offset maps world coordinates onto the moving grid.

use nalgebra::Vector3;
use tracing::debug;

use crate::cloud::{FeaturePoint, PointCloud, VoxelDownsampler};

use super::types::{
    Axis, CUBE_HALF, CUBE_SIZE, CubeCoord, CubeIndex, FeatureKind, GRID_CELLS, GRID_DIMS,
    GRID_HEIGHT, GRID_WIDTH, ROLL_MARGIN, RollDirection,
};

/// Initial cube coordinate of the world origin.
const INITIAL_CENTER: [i32; 3] = [10, 5, 10];

/// Point buckets of one cell, one per feature class.
#[derive(Debug, Default, Clone)]
pub struct VoxelCube {
    surface: PointCloud,
    corner: PointCloud,
}

impl VoxelCube {
    pub fn points(&self, kind: FeatureKind) -> &[FeaturePoint] {
        match kind {
            FeatureKind::Surface => &self.surface,
            FeatureKind::Corner => &self.corner,
        }
    }

    fn points_mut(&mut self, kind: FeatureKind) -> &mut PointCloud {
        match kind {
            FeatureKind::Surface => &mut self.surface,
            FeatureKind::Corner => &mut self.corner,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.surface.is_empty() && self.corner.is_empty()
    }

    fn clear(&mut self) {
        self.surface.clear();
        self.corner.clear();
    }
}

/// The sliding cube map.
pub struct SlidingVoxelMap {
    /// Bucket arena. Never grows after construction.
    cubes: Vec<VoxelCube>,
    /// Cell index → arena handle.
    slots: Vec<usize>,
    /// Cube coordinate of the cell containing the world origin.
    center: [i32; 3],
    /// Reused by every downsample pass.
    scratch: PointCloud,
}

impl SlidingVoxelMap {
    pub fn new() -> Self {
        Self {
            cubes: vec![VoxelCube::default(); GRID_CELLS],
            slots: (0..GRID_CELLS).collect(),
            center: INITIAL_CENTER,
            scratch: PointCloud::new(),
        }
    }

    /// Cube coordinate of the world origin's cell.
    pub fn center_offset(&self) -> CubeCoord {
        CubeCoord::from_array(self.center)
    }

    /// Cube coordinate holding a world point. The result may be out of bounds.
    pub fn world_to_cube(&self, p: &Vector3<f64>) -> CubeCoord {
        let axis = |v: f64, center: i32| ((v + CUBE_HALF) / CUBE_SIZE).floor() as i32 + center;
        CubeCoord::new(
            axis(p.x, self.center[0]),
            axis(p.y, self.center[1]),
            axis(p.z, self.center[2]),
        )
    }

    /// World position of a cell's center.
    pub fn cube_center(&self, coord: CubeCoord) -> Vector3<f64> {
        Vector3::new(
            CUBE_SIZE * f64::from(coord.i - self.center[0]),
            CUBE_SIZE * f64::from(coord.j - self.center[1]),
            CUBE_SIZE * f64::from(coord.k - self.center[2]),
        )
    }

    pub fn cube(&self, index: CubeIndex) -> &VoxelCube {
        &self.cubes[self.slots[index.0]]
    }

    pub fn num_points(&self, kind: FeatureKind) -> usize {
        self.cubes.iter().map(|c| c.points(kind).len()).sum()
    }

    /// Shift every cell one layer along `axis`.
    ///
    /// The layer that falls off one edge is cleared and reappears at the
    /// opposite edge. The center offset moves with the contents, so a world
    /// point still resolves to the cell holding it.
    pub fn roll(&mut self, axis: Axis, direction: RollDirection) {
        let a = axis.as_usize();
        let len = GRID_DIMS[a];
        let (b, c) = match axis {
            Axis::I => (1, 2),
            Axis::J => (0, 2),
            Axis::K => (0, 1),
        };

        for u in 0..GRID_DIMS[b] {
            for v in 0..GRID_DIMS[c] {
                let cell = |t: usize| {
                    let mut ijk = [0usize; 3];
                    ijk[a] = t;
                    ijk[b] = u;
                    ijk[c] = v;
                    ijk[0] + GRID_WIDTH * ijk[1] + GRID_WIDTH * GRID_HEIGHT * ijk[2]
                };

                match direction {
                    RollDirection::Positive => {
                        let vacated = self.slots[cell(len - 1)];
                        for t in (1..len).rev() {
                            self.slots[cell(t)] = self.slots[cell(t - 1)];
                        }
                        self.slots[cell(0)] = vacated;
                        self.cubes[vacated].clear();
                    }
                    RollDirection::Negative => {
                        let vacated = self.slots[cell(0)];
                        for t in 0..len - 1 {
                            self.slots[cell(t)] = self.slots[cell(t + 1)];
                        }
                        self.slots[cell(len - 1)] = vacated;
                        self.cubes[vacated].clear();
                    }
                }
            }
        }

        match direction {
            RollDirection::Positive => self.center[a] += 1,
            RollDirection::Negative => self.center[a] -= 1,
        }
    }

    /// Roll until the cube holding `position` is at least [`ROLL_MARGIN`]
    /// cells from every boundary, and return that cube.
    ///
    /// Large jumps cascade into several rolls per axis.
    pub fn recenter(&mut self, position: &Vector3<f64>) -> CubeCoord {
        let mut coord = self.world_to_cube(position).to_array();
        let mut rolls = 0;

        for axis in Axis::ALL {
            let a = axis.as_usize();
            let upper = GRID_DIMS[a] as i32 - ROLL_MARGIN;
            while coord[a] < ROLL_MARGIN {
                self.roll(axis, RollDirection::Positive);
                coord[a] += 1;
                rolls += 1;
            }
            while coord[a] >= upper {
                self.roll(axis, RollDirection::Negative);
                coord[a] -= 1;
                rolls += 1;
            }
        }

        if rolls > 0 {
            debug!(
                "[CubeMap] rolled {} layers, center offset now {:?}",
                rolls, self.center
            );
        }
        CubeCoord::from_array(coord)
    }

    /// Append a world point to the cube containing it.
    ///
    /// Returns the cell written to, or `None` if the point lies outside the grid
    /// and was dropped.
    pub fn insert(&mut self, kind: FeatureKind, point: FeaturePoint) -> Option<CubeIndex> {
        let index = self.world_to_cube(&point.position).index()?;
        self.cubes[self.slots[index.0]].points_mut(kind).push(point);
        Some(index)
    }

    /// Re-bound the density of one cell's `kind` bucket.
    pub fn downsample_cube(
        &mut self,
        index: CubeIndex,
        kind: FeatureKind,
        filter: &VoxelDownsampler,
    ) {
        let bucket = self.cubes[self.slots[index.0]].points_mut(kind);
        filter.filter_into(bucket, &mut self.scratch);
        std::mem::swap(bucket, &mut self.scratch);
        self.scratch.clear();
    }

    /// Concatenate the `kind` points of the given cells.
    pub fn gather(&self, kind: FeatureKind, cells: &[CubeIndex]) -> PointCloud {
        let total = cells.iter().map(|&c| self.cube(c).points(kind).len()).sum();
        let mut out = PointCloud::with_capacity(total);
        for &c in cells {
            out.extend_from_slice(self.cube(c).points(kind));
        }
        out
    }

    /// Every `kind` point in the grid, in cell order.
    pub fn all_points(&self, kind: FeatureKind) -> PointCloud {
        let cells: Vec<CubeIndex> = (0..GRID_CELLS).map(CubeIndex).collect();
        self.gather(kind, &cells)
    }
}

impl Default for SlidingVoxelMap {
    fn default() -> Self {
        Self::new()
    }
}
