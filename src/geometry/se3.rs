//! Rigid body transforms.

use nalgebra::{UnitQuaternion, Vector3};

/// Rigid transform T = [R | t] mapping points from the body frame into the map frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    pub fn new(rotation: UnitQuaternion<f64>, translation: Vector3<f64>) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    /// Build from a w-first quaternion and a translation.
    pub fn from_quaternion(qw: f64, qx: f64, qy: f64, qz: f64, translation: Vector3<f64>) -> Self {
        let q = nalgebra::Quaternion::new(qw, qx, qy, qz);
        Self {
            rotation: UnitQuaternion::from_quaternion(q),
            translation,
        }
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    #[inline]
    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }
}

impl Default for SE3 {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_inverse_undoes_transform() {
        let t = SE3::new(
            UnitQuaternion::from_euler_angles(0.1, 0.2, -0.3),
            Vector3::new(1.0, -2.0, 0.5),
        );
        let p = Vector3::new(0.3, -4.0, 2.0);

        assert_relative_eq!(
            t.inverse().transform_point(&t.transform_point(&p)),
            p,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_rotation_applies_before_translation() {
        let t = SE3::new(
            UnitQuaternion::from_euler_angles(0.0, 0.0, std::f64::consts::FRAC_PI_2),
            Vector3::new(1.0, 0.0, 0.0),
        );

        // (1,0,0) rotates to (0,1,0), then shifts along x.
        assert_relative_eq!(
            t.transform_point(&Vector3::new(1.0, 0.0, 0.0)),
            Vector3::new(1.0, 1.0, 0.0),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_from_quaternion_normalizes() {
        let t = SE3::from_quaternion(2.0, 0.0, 0.0, 0.0, Vector3::zeros());
        assert_relative_eq!(t.rotation.angle(), 0.0, epsilon = 1e-12);
    }
}
