//! Point clouds and the voxel centroid filter.

pub mod color;
pub mod downsample;
pub mod point;

pub use color::{ColorPoint, colorize};
pub use downsample::VoxelDownsampler;
pub use point::{FeaturePoint, FeatureSet, PointCloud};
