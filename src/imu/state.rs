//! Full navigation state of the platform at one LiDAR frame.

use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::SE3;

use super::sample::{GRAVITY, ImuBias};
use super::types::StateCovariance;

/// Navigation state at `timestamp_s`.
///
/// The external estimator hands one of these over as a prior every cycle; the
/// mapping loop refines rotation, translation and velocity in place and
/// publishes the result. Biases, gravity and covariance pass through.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalState {
    pub timestamp_s: f64,
    /// Body-to-map rotation.
    pub rotation: UnitQuaternion<f64>,
    /// Body position in the map frame.
    pub translation: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub bias: ImuBias,
    pub gravity: Vector3<f64>,
    pub covariance: StateCovariance,
}

impl GlobalState {
    /// State at rest at the map origin.
    pub fn identity(timestamp_s: f64) -> Self {
        Self {
            timestamp_s,
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
            velocity: Vector3::zeros(),
            bias: ImuBias::zero(),
            gravity: GRAVITY,
            covariance: StateCovariance::identity(),
        }
    }

    /// State with the given pose and all other fields at rest.
    pub fn from_pose(timestamp_s: f64, pose: SE3) -> Self {
        Self {
            rotation: pose.rotation,
            translation: pose.translation,
            ..Self::identity(timestamp_s)
        }
    }

    pub fn pose(&self) -> SE3 {
        SE3::new(self.rotation, self.translation)
    }

    /// Body-frame point expressed in the map frame.
    #[inline]
    pub fn body_to_map(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }
}

impl Default for GlobalState {
    fn default() -> Self {
        Self::identity(0.0)
    }
}
