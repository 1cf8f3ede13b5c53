//! Degeneracy detection on the 6×6 normal matrix.
//!
//! Directions of the pose increment that the correspondences barely observe
//! show up as small eigenvalues of `AᵀA`. The projector built here removes the
//! increment's component along those directions so the solver only moves the
//! pose where the geometry constrains it.

use nalgebra::SymmetricEigen;

use crate::imu::types::{Matrix6, Vector6};

/// Projection onto the well-constrained subspace of a normal matrix.
#[derive(Debug, Clone)]
pub struct DegeneracyProjector {
    projector: Matrix6,
    /// Eigenvalues, largest first.
    eigenvalues: [f64; 6],
    degenerate: bool,
}

impl DegeneracyProjector {
    /// Decompose `ata` and drop eigen-directions below their thresholds.
    ///
    /// Eigenvalues are scanned from the smallest upward; scanning stops at the
    /// first one that meets its threshold. `thresholds[i]` applies to the
    /// i-th largest eigenvalue.
    pub fn from_normal_matrix(ata: &Matrix6, thresholds: &[f64; 6]) -> Self {
        let eigen = SymmetricEigen::new(*ata);
        let mut order = [0usize, 1, 2, 3, 4, 5];
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        // Rows of `v` are eigenvectors, largest eigenvalue first.
        let mut v = Matrix6::zeros();
        let mut eigenvalues = [0.0; 6];
        for (row, &col) in order.iter().enumerate() {
            v.set_row(row, &eigen.eigenvectors.column(col).transpose());
            eigenvalues[row] = eigen.eigenvalues[col];
        }

        let mut v_kept = v;
        let mut degenerate = false;
        for i in (0..6).rev() {
            if eigenvalues[i] < thresholds[i] {
                v_kept.row_mut(i).fill(0.0);
                degenerate = true;
            } else {
                break;
            }
        }

        // `v` is orthonormal, so its inverse is its transpose.
        Self {
            projector: v.transpose() * v_kept,
            eigenvalues,
            degenerate,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        self.degenerate
    }

    pub fn eigenvalues(&self) -> &[f64; 6] {
        &self.eigenvalues
    }

    pub fn project(&self, delta: &Vector6) -> Vector6 {
        self.projector * delta
    }
}
