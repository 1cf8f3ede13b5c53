//! Point-to-plane and point-to-line correspondence search.
//!
//! Each frame point is moved into the map frame with the current estimate,
//! matched against its 5 nearest map points, and kept only if a local model
//! fits those neighbors well and the weighted residual is trustworthy. The
//! search fans out over a fixed worker pool; every worker writes only its own
//! output slot and a sequential pass compacts the accepted slots in frame order.

use nalgebra::{UnitQuaternion, Vector3};
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::cloud::FeaturePoint;
use crate::config::MatchingConfig;
use crate::error::Result;

use super::index::MapIndex;
use super::line::fit_line;
use super::plane::fit_plane;

/// Neighbors used for every local model fit.
pub const NUM_NEIGHBORS: usize = 5;

/// A weighted point-to-model constraint.
///
/// `normal` and `residual` already carry the confidence weight `s`, so the
/// solver can use them directly as Jacobian row and right-hand side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    /// The frame point in the body frame.
    pub point_body: Vector3<f64>,
    /// `s · n`, with `n` the unit model normal in the map frame.
    pub normal: Vector3<f64>,
    /// `s · d`, with `d` the signed distance to the model.
    pub residual: f64,
}

/// Correspondence search over a fixed worker pool.
pub struct CorrespondenceEngine {
    config: MatchingConfig,
    pool: ThreadPool,
}

impl CorrespondenceEngine {
    pub fn new(config: MatchingConfig) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.num_workers)
            .thread_name(|i| format!("correspondence-{}", i))
            .build()?;
        Ok(Self { config, pool })
    }

    /// Point-to-plane constraints for the surface features of a frame.
    pub fn match_surfaces(
        &self,
        index: &MapIndex,
        frame: &[FeaturePoint],
        rotation: &UnitQuaternion<f64>,
        translation: &Vector3<f64>,
    ) -> Vec<Correspondence> {
        self.run(frame, |p| {
            self.match_surface_point(index, p, rotation, translation)
        })
    }

    /// Point-to-line constraints for the corner features of a frame.
    pub fn match_edges(
        &self,
        index: &MapIndex,
        frame: &[FeaturePoint],
        rotation: &UnitQuaternion<f64>,
        translation: &Vector3<f64>,
    ) -> Vec<Correspondence> {
        self.run(frame, |p| self.match_edge_point(index, p, rotation, translation))
    }

    fn run<F>(&self, frame: &[FeaturePoint], matcher: F) -> Vec<Correspondence>
    where
        F: Fn(&Vector3<f64>) -> Option<Correspondence> + Sync,
    {
        let slots: Vec<Option<Correspondence>> = self.pool.install(|| {
            frame
                .par_iter()
                .map(|p| matcher(&p.position))
                .collect()
        });
        slots.into_iter().flatten().collect()
    }

    fn match_surface_point(
        &self,
        index: &MapIndex,
        point_body: &Vector3<f64>,
        rotation: &UnitQuaternion<f64>,
        translation: &Vector3<f64>,
    ) -> Option<Correspondence> {
        let point_map = rotation * point_body + translation;
        let neighbors = index.nearest(&point_map, NUM_NEIGHBORS);
        if neighbors.len() < NUM_NEIGHBORS
            || neighbors[NUM_NEIGHBORS - 1].sq_dist >= self.config.surface_max_sq_dist
        {
            return None;
        }

        let positions: Vec<Vector3<f64>> = neighbors.iter().map(|n| n.position).collect();
        let plane = fit_plane(&positions)?;
        if plane.max_residual(&positions) > self.config.plane_threshold {
            return None;
        }

        let distance = plane.signed_distance(&point_map);
        // Far points tolerate larger residuals.
        let weight = 1.0 - 0.9 * distance.abs() / point_map.norm().sqrt().sqrt();
        if weight.is_nan() || weight <= self.config.min_weight {
            return None;
        }

        Some(Correspondence {
            point_body: *point_body,
            normal: weight * plane.normal,
            residual: weight * distance,
        })
    }

    fn match_edge_point(
        &self,
        index: &MapIndex,
        point_body: &Vector3<f64>,
        rotation: &UnitQuaternion<f64>,
        translation: &Vector3<f64>,
    ) -> Option<Correspondence> {
        let point_map = rotation * point_body + translation;
        let neighbors = index.nearest(&point_map, NUM_NEIGHBORS);
        if neighbors.len() < NUM_NEIGHBORS
            || neighbors[NUM_NEIGHBORS - 1].sq_dist >= self.config.edge_max_sq_dist
        {
            return None;
        }

        let positions: Vec<Vector3<f64>> = neighbors.iter().map(|n| n.position).collect();
        let line = fit_line(&positions, self.config.edge_eigen_ratio)?;
        let (distance, normal) = line.distance_and_normal(&point_map);

        let weight = 1.0 - 0.9 * distance;
        if weight.is_nan() || weight <= self.config.min_weight {
            return None;
        }

        Some(Correspondence {
            point_body: *point_body,
            normal: weight * normal,
            residual: weight * distance,
        })
    }
}
