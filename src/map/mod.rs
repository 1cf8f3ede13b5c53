//! The sliding cube map: a bounded 3D array of point buckets that follows the
//! platform through the world.

pub mod cube_map;
pub mod types;
pub mod window;

pub use cube_map::{SlidingVoxelMap, VoxelCube};
pub use types::{
    Axis, CUBE_SIZE, CubeCoord, CubeIndex, FeatureKind, GRID_CELLS, GRID_DEPTH, GRID_HEIGHT,
    GRID_WIDTH, ROLL_MARGIN, RollDirection,
};
pub use window::MapWindow;
