//! SO(3) helpers for the scan-to-map solver.
//!
//! The solver parameterizes rotation increments as axis-angle vectors applied
//! on the right: `R ← R · Exp(δθ)`.

use nalgebra::{UnitQuaternion, Vector3};

/// Exponential map so(3) → SO(3) as a unit quaternion.
///
/// A zero vector maps to the identity.
fn exp_so3(phi: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::from_scaled_axis(*phi)
}

/// Right-perturbs `rotation` by `delta`, re-normalizing against drift.
pub fn boxplus(rotation: &UnitQuaternion<f64>, delta: &Vector3<f64>) -> UnitQuaternion<f64> {
    UnitQuaternion::new_normalize((rotation * exp_so3(delta)).into_inner())
}
