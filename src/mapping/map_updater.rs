//! Folding a registered frame back into the cube map.

use std::collections::BTreeSet;

use tracing::debug;

use crate::cloud::{FeatureSet, VoxelDownsampler};
use crate::config::FilterConfig;
use crate::imu::GlobalState;
use crate::map::{CubeIndex, FeatureKind, SlidingVoxelMap};

/// What one update did to the map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub inserted: usize,
    /// Points that fell outside the grid.
    pub dropped: usize,
    pub touched_cubes: usize,
}

pub struct MapUpdater {
    surface_filter: VoxelDownsampler,
    corner_filter: VoxelDownsampler,
}

impl MapUpdater {
    pub fn new(filter: &FilterConfig) -> Self {
        Self {
            surface_filter: VoxelDownsampler::new(filter.surface_leaf_size),
            corner_filter: VoxelDownsampler::new(filter.corner_leaf_size),
        }
    }

    /// Insert `frame` (body frame) at the pose in `state`, then re-downsample
    /// the buckets that received points.
    pub fn update(
        &self,
        map: &mut SlidingVoxelMap,
        frame: &FeatureSet,
        state: &GlobalState,
    ) -> UpdateStats {
        let mut stats = UpdateStats::default();
        let mut touched: BTreeSet<(CubeIndex, FeatureKind)> = BTreeSet::new();

        let inputs = [
            (FeatureKind::Surface, &frame.surface),
            (FeatureKind::Corner, &frame.corner),
        ];
        for (kind, cloud) in inputs {
            for point in cloud {
                let world = point.map_position(|p| state.body_to_map(p));
                match map.insert(kind, world) {
                    Some(index) => {
                        touched.insert((index, kind));
                        stats.inserted += 1;
                    }
                    None => stats.dropped += 1,
                }
            }
        }

        for &(index, kind) in &touched {
            let filter = match kind {
                FeatureKind::Surface => &self.surface_filter,
                FeatureKind::Corner => &self.corner_filter,
            };
            map.downsample_cube(index, kind, filter);
        }

        stats.touched_cubes = touched
            .iter()
            .map(|(index, _)| *index)
            .collect::<BTreeSet<_>>()
            .len();

        if stats.dropped > 0 {
            debug!(
                "[MapUpdate] {} points outside the grid dropped",
                stats.dropped
            );
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::FeaturePoint;
    use nalgebra::Vector3;

    #[test]
    fn test_points_land_at_refined_pose() {
        let mut map = SlidingVoxelMap::new();
        let updater = MapUpdater::new(&FilterConfig::default());
        let mut state = GlobalState::identity(0.0);
        state.translation = Vector3::new(60.0, 0.0, 0.0);

        let frame = FeatureSet::surface_only(vec![FeaturePoint::new(1.0, 2.0, 3.0, 0.5)]);
        let stats = updater.update(&mut map, &frame, &state);

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.touched_cubes, 1);
        let points = map.all_points(FeatureKind::Surface);
        assert_eq!(points.len(), 1);
        assert!((points[0].position - Vector3::new(61.0, 2.0, 3.0)).norm() < 1e-9);
    }

    #[test]
    fn test_touched_cubes_are_bounded() {
        let mut map = SlidingVoxelMap::new();
        let updater = MapUpdater::new(&FilterConfig::default());
        let state = GlobalState::identity(0.0);

        // 1000 points inside one 0.2 voxel collapse to a single centroid.
        let cloud: Vec<FeaturePoint> = (0..1000)
            .map(|n| {
                let f = n as f64 * 1e-4;
                FeaturePoint::new(1.01 + f, 1.01 + f, 1.01 + f, 0.0)
            })
            .collect();
        updater.update(&mut map, &FeatureSet::surface_only(cloud), &state);

        assert_eq!(map.num_points(FeatureKind::Surface), 1);
    }

    #[test]
    fn test_out_of_grid_points_dropped() {
        let mut map = SlidingVoxelMap::new();
        let updater = MapUpdater::new(&FilterConfig::default());
        let state = GlobalState::identity(0.0);

        let frame = FeatureSet::new(
            vec![FeaturePoint::new(1.0e4, 0.0, 0.0, 0.0)],
            vec![FeaturePoint::new(0.5, 0.5, 0.5, 0.0)],
        );
        let stats = updater.update(&mut map, &frame, &state);

        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.dropped, 1);
        assert_eq!(map.num_points(FeatureKind::Corner), 1);
        assert_eq!(map.num_points(FeatureKind::Surface), 0);
    }
}
