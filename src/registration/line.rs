//! Local line model for corner (edge) correspondences.

use nalgebra::{Matrix3, SymmetricEigen, Unit, Vector3};

/// Half-length of the segment used to evaluate point-to-line distance.
const SEGMENT_HALF: f64 = 0.1;

/// Line through `point` along `direction`.
#[derive(Debug, Clone, Copy)]
pub struct Line {
    pub point: Vector3<f64>,
    pub direction: Unit<Vector3<f64>>,
}

impl Line {
    /// Distance from `p` to the line and the unit vector pointing from the line
    /// toward `p`. The vector is zero when `p` lies on the line.
    pub fn distance_and_normal(&self, p: &Vector3<f64>) -> (f64, Vector3<f64>) {
        let x1 = self.point + SEGMENT_HALF * self.direction.into_inner();
        let x2 = self.point - SEGMENT_HALF * self.direction.into_inner();

        let area = (p - x1).cross(&(p - x2)).norm();
        let distance = area / (x1 - x2).norm();

        let along = (p - self.point).dot(&self.direction);
        let foot = self.point + along * self.direction.into_inner();
        let offset = p - foot;
        let normal = if offset.norm() > 1e-12 {
            offset.normalize()
        } else {
            Vector3::zeros()
        };
        (distance, normal)
    }
}

/// Principal-axis line through `points`.
///
/// Accepted only when the largest covariance eigenvalue exceeds
/// `eigen_ratio` times the second largest.
pub fn fit_line(points: &[Vector3<f64>], eigen_ratio: f64) -> Option<Line> {
    if points.len() < 2 {
        return None;
    }

    let n = points.len() as f64;
    let centroid = points.iter().sum::<Vector3<f64>>() / n;
    let cov = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p - centroid;
        acc + d * d.transpose()
    }) / n;

    let eigen = SymmetricEigen::new(cov);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

    let largest = eigen.eigenvalues[order[0]];
    let second = eigen.eigenvalues[order[1]];
    if largest <= eigen_ratio * second {
        return None;
    }

    let direction = Unit::try_new(eigen.eigenvectors.column(order[0]).into_owned(), 1e-12)?;
    Some(Line {
        point: centroid,
        direction,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_line_along_edge() {
        let points: Vec<Vector3<f64>> = (0..5)
            .map(|i| {
                let t = 0.2 * i as f64;
                // Slight wobble keeps the covariance full rank.
                Vector3::new(1.0 + t, 2.0 + 0.002 * (i % 2) as f64, 0.5)
            })
            .collect();

        let line = fit_line(&points, 3.0).unwrap();

        assert_relative_eq!(line.direction.x.abs(), 1.0, epsilon = 1e-3);
        let (d, normal) = line.distance_and_normal(&Vector3::new(1.4, 2.3, 0.5));
        assert_relative_eq!(d, 0.3, epsilon = 2e-3);
        assert_relative_eq!(normal.y, 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rejects_blob() {
        let points = vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(0.3, 0.0, 0.0),
            Vector3::new(0.0, 0.3, 0.0),
            Vector3::new(0.3, 0.3, 0.0),
            Vector3::new(0.15, 0.15, 0.3),
        ];
        assert!(fit_line(&points, 3.0).is_none());
    }
}
