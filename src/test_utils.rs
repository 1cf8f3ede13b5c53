//! Synthetic scenes shared by the unit tests.
//!
//! Planes are tilted off the coordinate axes and sampled at random positions.
//! None of the planes pass near the origin, which the implicit
//! `a·x + b·y + c·z = -1` plane fit cannot represent.

use nalgebra::Vector3;
use rand::Rng;

use crate::cloud::{FeaturePoint, PointCloud};

/// A rectangular planar patch.
#[derive(Debug, Clone, Copy)]
pub struct PlanePatch {
    pub anchor: Vector3<f64>,
    pub normal: Vector3<f64>,
    pub u: Vector3<f64>,
    pub v: Vector3<f64>,
    /// Half-extents along `u` and `v`.
    pub extent: [f64; 2],
}

impl PlanePatch {
    pub fn new(anchor: Vector3<f64>, normal: Vector3<f64>, extent: [f64; 2]) -> Self {
        let normal = normal.normalize();
        let helper = if normal.z.abs() < 0.9 {
            Vector3::z()
        } else {
            Vector3::x()
        };
        let u = normal.cross(&helper).normalize();
        let v = normal.cross(&u);
        Self {
            anchor,
            normal,
            u,
            v,
            extent,
        }
    }

    pub fn sample<R: Rng>(&self, rng: &mut R, n: usize) -> PointCloud {
        plane_patch(rng, n, self.anchor, self.u, self.v, self.extent)
    }
}

/// `n` random points on `anchor + a·u + b·v` with `|a| < extent[0]`, `|b| < extent[1]`.
pub fn plane_patch<R: Rng>(
    rng: &mut R,
    n: usize,
    anchor: Vector3<f64>,
    u: Vector3<f64>,
    v: Vector3<f64>,
    extent: [f64; 2],
) -> PointCloud {
    (0..n)
        .map(|_| {
            let a = rng.gen_range(-extent[0]..extent[0]);
            let b = rng.gen_range(-extent[1]..extent[1]);
            FeaturePoint::from_position(anchor + a * u + b * v, rng.gen_range(0.0..1.0))
        })
        .collect()
}

/// Slightly tilted floor 1.5 m below the origin.
pub fn tilted_floor() -> PlanePatch {
    PlanePatch::new(
        Vector3::new(0.0, 0.0, -1.5),
        Vector3::new(0.05, 0.03, 1.0),
        [2.0, 2.0],
    )
}

/// Floor plus two walls, pairwise well separated so every point's
/// neighbourhood lies on a single plane. Together they constrain all six
/// pose degrees of freedom.
pub fn three_planes() -> [PlanePatch; 3] {
    [
        tilted_floor(),
        PlanePatch::new(
            Vector3::new(3.0, 0.0, 0.5),
            Vector3::new(1.0, 0.1, 0.05),
            [1.5, 1.5],
        ),
        PlanePatch::new(
            Vector3::new(0.0, 4.0, 0.5),
            Vector3::new(0.08, 1.0, -0.04),
            [1.5, 1.5],
        ),
    ]
}

/// `per_plane` random points on each of [`three_planes`].
pub fn three_plane_scene<R: Rng>(rng: &mut R, per_plane: usize) -> PointCloud {
    three_planes()
        .iter()
        .flat_map(|plane| plane.sample(rng, per_plane))
        .collect()
}

/// `n` random points along a thin rod `base + a·dir`, `|a| < half_length`,
/// jittered by up to `thickness` on every axis.
pub fn rod<R: Rng>(
    rng: &mut R,
    n: usize,
    base: Vector3<f64>,
    dir: Vector3<f64>,
    half_length: f64,
    thickness: f64,
) -> PointCloud {
    let dir = dir.normalize();
    (0..n)
        .map(|_| {
            let a = rng.gen_range(-half_length..half_length);
            let jitter = Vector3::from_fn(|_, _| rng.gen_range(-thickness..thickness));
            FeaturePoint::from_position(base + a * dir + jitter, rng.gen_range(0.0..1.0))
        })
        .collect()
}

/// Three mutually skew rods, kept clear of each other so every neighbourhood
/// lies on one rod.
pub fn three_rod_scene<R: Rng>(rng: &mut R, per_rod: usize) -> PointCloud {
    [
        (Vector3::new(1.0, 1.0, 0.0), Vector3::new(1.0, 0.1, 0.05)),
        (Vector3::new(-1.5, 2.0, 0.5), Vector3::new(0.05, 0.1, 1.0)),
        (Vector3::new(0.5, -2.0, 0.0), Vector3::new(0.1, 1.0, 0.2)),
    ]
    .iter()
    .flat_map(|(base, dir)| rod(rng, per_rod, *base, *dir, 1.5, 1e-3))
    .collect()
}
