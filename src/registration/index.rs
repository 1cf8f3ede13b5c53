//! kNN index over one cycle's map window.

use kiddo::{ImmutableKdTree, SquaredEuclidean};
use nalgebra::Vector3;

use crate::cloud::FeaturePoint;

/// A neighbor returned by [`MapIndex::nearest`].
#[derive(Debug, Clone, Copy)]
pub struct Neighbor {
    pub position: Vector3<f64>,
    pub sq_dist: f64,
}

/// Immutable kNN index, rebuilt every cycle from the valid cubes.
///
/// Built in one pass over the whole window, so long runs of equal
/// coordinates (a level floor, an axis-aligned wall) are fine.
pub struct MapIndex {
    tree: Option<ImmutableKdTree<f64, 3>>,
    points: Vec<Vector3<f64>>,
}

impl MapIndex {
    pub fn build(cloud: &[FeaturePoint]) -> Self {
        let points: Vec<Vector3<f64>> = cloud.iter().map(|p| p.position).collect();
        let coords: Vec<[f64; 3]> = points.iter().map(|p| [p.x, p.y, p.z]).collect();
        let tree = (!coords.is_empty()).then(|| ImmutableKdTree::new_from_slice(&coords));
        Self { tree, points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Up to `k` nearest points, closest first.
    pub fn nearest(&self, query: &Vector3<f64>, k: usize) -> Vec<Neighbor> {
        let Some(tree) = &self.tree else {
            return Vec::new();
        };
        tree.nearest_n::<SquaredEuclidean>(&[query.x, query.y, query.z], k)
            .into_iter()
            .map(|n| Neighbor {
                position: self.points[n.item as usize],
                sq_dist: n.distance,
            })
            .collect()
    }
}
