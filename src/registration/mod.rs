//! Scan-to-map registration: kNN index, local model fits, correspondence
//! search and the Gauss-Newton solver.

pub mod correspondence;
pub mod degeneracy;
pub mod index;
pub mod line;
pub mod plane;
pub mod result;
pub mod solver;

pub use correspondence::{Correspondence, CorrespondenceEngine};
pub use degeneracy::DegeneracyProjector;
pub use index::MapIndex;
pub use result::{IterationOutcome, SolveReport, SolverState, TimingStats};
pub use solver::{MotionAnchor, NormalEquations, RegistrationSolver};
