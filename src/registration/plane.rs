//! Local plane model for surface correspondences.

use nalgebra::{DMatrix, DVector, Vector3};

/// Singular values below this are treated as zero in the least-squares solve.
const SVD_EPS: f64 = 1e-12;

/// Plane `normal · p + offset = 0` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub offset: f64,
}

impl Plane {
    #[inline]
    pub fn signed_distance(&self, p: &Vector3<f64>) -> f64 {
        self.normal.dot(p) + self.offset
    }

    /// Largest absolute distance of any of `points` from the plane.
    pub fn max_residual(&self, points: &[Vector3<f64>]) -> f64 {
        points
            .iter()
            .map(|p| self.signed_distance(p).abs())
            .fold(0.0, f64::max)
    }
}

/// Least-squares fit of `a·x + b·y + c·z = -1` through `points`.
///
/// The implicit form cannot represent planes through the origin; such fits
/// come back with a large residual and are rejected by the caller's
/// threshold. Returns `None` for fewer than three points or a singular system.
pub fn fit_plane(points: &[Vector3<f64>]) -> Option<Plane> {
    if points.len() < 3 {
        return None;
    }

    let a = DMatrix::from_fn(points.len(), 3, |r, c| points[r][c]);
    let b = DVector::from_element(points.len(), -1.0);
    let x = a.svd(true, true).solve(&b, SVD_EPS).ok()?;

    let abc = Vector3::new(x[0], x[1], x[2]);
    let norm = abc.norm();
    if !norm.is_finite() || norm < SVD_EPS {
        return None;
    }

    Some(Plane {
        normal: abc / norm,
        offset: 1.0 / norm,
    })
}
