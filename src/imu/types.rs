//! Type aliases for the navigation state error space.
//!
//! The state is ordered [δθ, δp, δv, δbg, δba, δg], 3 components each.

use nalgebra::{SMatrix, SVector};

/// Dimension of the navigation state error vector.
pub const STATE_DIM: usize = 18;

/// 18×18 covariance of the navigation state.
pub type StateCovariance = SMatrix<f64, STATE_DIM, STATE_DIM>;

/// 6-dimensional pose increment [δθ, δp].
pub type Vector6 = SVector<f64, 6>;

/// 6×6 normal matrix of the pose increment.
pub type Matrix6 = SMatrix<f64, 6, 6>;
