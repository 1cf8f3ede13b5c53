//! Grid geometry and cell addressing for the cube map.

/// Edge length of one cube (meters).
pub const CUBE_SIZE: f64 = 50.0;

/// Half of [`CUBE_SIZE`]; cube `c` spans `[50c - 25, 50c + 25)` around the origin cell.
pub const CUBE_HALF: f64 = CUBE_SIZE / 2.0;

/// Number of cubes along I (x).
pub const GRID_WIDTH: usize = 21;
/// Number of cubes along J (y).
pub const GRID_HEIGHT: usize = 11;
/// Number of cubes along K (z).
pub const GRID_DEPTH: usize = 21;

pub const GRID_CELLS: usize = GRID_WIDTH * GRID_HEIGHT * GRID_DEPTH;

/// Grid dimensions in axis order.
pub const GRID_DIMS: [usize; 3] = [GRID_WIDTH, GRID_HEIGHT, GRID_DEPTH];

/// Minimum distance, in cells, between the platform's cube and any boundary
/// after recentering.
pub const ROLL_MARGIN: i32 = 3;

/// Half-extent of the neighbourhood searched for correspondences (5×5×5).
pub const WINDOW_RADIUS: i32 = 2;

/// Integer cube coordinate. May be out of bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubeCoord {
    pub i: i32,
    pub j: i32,
    pub k: i32,
}

impl CubeCoord {
    pub fn new(i: i32, j: i32, k: i32) -> Self {
        Self { i, j, k }
    }

    pub fn from_array(c: [i32; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }

    pub fn to_array(self) -> [i32; 3] {
        [self.i, self.j, self.k]
    }

    pub fn in_bounds(&self) -> bool {
        self.to_array()
            .iter()
            .zip(GRID_DIMS.iter())
            .all(|(&c, &dim)| c >= 0 && (c as usize) < dim)
    }

    /// Linear cell index `i + W·j + W·H·k`, or `None` outside the grid.
    pub fn index(&self) -> Option<CubeIndex> {
        if !self.in_bounds() {
            return None;
        }
        let (i, j, k) = (self.i as usize, self.j as usize, self.k as usize);
        Some(CubeIndex(i + GRID_WIDTH * j + GRID_WIDTH * GRID_HEIGHT * k))
    }
}

/// Linear index of a cell in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CubeIndex(pub usize);

impl CubeIndex {
    pub fn coord(&self) -> CubeCoord {
        let i = self.0 % GRID_WIDTH;
        let j = (self.0 / GRID_WIDTH) % GRID_HEIGHT;
        let k = self.0 / (GRID_WIDTH * GRID_HEIGHT);
        CubeCoord::new(i as i32, j as i32, k as i32)
    }
}

impl std::fmt::Display for CubeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let c = self.coord();
        write!(f, "Cube({},{},{})", c.i, c.j, c.k)
    }
}

/// Grid axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    I,
    J,
    K,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::I, Axis::J, Axis::K];

    pub fn as_usize(self) -> usize {
        match self {
            Axis::I => 0,
            Axis::J => 1,
            Axis::K => 2,
        }
    }
}

/// Direction in which cube contents shift during a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollDirection {
    /// Contents move toward higher indices; layer 0 is vacated.
    Positive,
    /// Contents move toward lower indices; the last layer is vacated.
    Negative,
}

/// Feature class stored in a cube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FeatureKind {
    Surface,
    Corner,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_index_is_bijection() {
        let mut seen = HashSet::new();
        for k in 0..GRID_DEPTH as i32 {
            for j in 0..GRID_HEIGHT as i32 {
                for i in 0..GRID_WIDTH as i32 {
                    let c = CubeCoord::new(i, j, k);
                    let idx = c.index().unwrap();
                    assert!(idx.0 < GRID_CELLS);
                    assert_eq!(idx.coord(), c);
                    assert!(seen.insert(idx));
                }
            }
        }
        assert_eq!(seen.len(), GRID_CELLS);
    }

    #[test]
    fn test_out_of_bounds_has_no_index() {
        assert!(CubeCoord::new(-1, 0, 0).index().is_none());
        assert!(CubeCoord::new(0, GRID_HEIGHT as i32, 0).index().is_none());
        assert!(CubeCoord::new(0, 0, GRID_DEPTH as i32).index().is_none());
    }

    #[test]
    fn test_cube_index_display() {
        let idx = CubeCoord::new(10, 5, 10).index().unwrap();
        assert_eq!(format!("{}", idx), "Cube(10,5,10)");
    }
}
