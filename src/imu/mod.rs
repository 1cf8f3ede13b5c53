//! Inertial navigation state handed over by the external estimator.

pub mod sample;
pub mod state;
pub mod types;

pub use sample::{GRAVITY, ImuBias};
pub use state::GlobalState;
pub use types::{STATE_DIM, StateCovariance};
