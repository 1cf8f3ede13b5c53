//! Solver results and diagnostics.
//!
//! These types describe what happened while refining one frame:
//! - terminal solver state
//! - iteration bookkeeping (applied / skipped)
//! - correspondence counts and the final increment size
//! - timing information for profiling

/// Solver state machine.
///
/// `Init → Iterating → {Converged, MaxIterations, AbortedSparseMap}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverState {
    Init,
    Iterating,
    /// The increment fell below both convergence thresholds.
    Converged,
    /// The iteration budget ran out, including iterations skipped for lack of
    /// correspondences.
    MaxIterations,
    /// The map window was too sparse to build an index; the prior is kept.
    AbortedSparseMap,
}

impl Default for SolverState {
    fn default() -> Self {
        Self::Init
    }
}

/// Outcome of a single iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    Applied,
    /// Too few correspondences; the estimate is untouched but the iteration
    /// still counts against the budget.
    SkippedDeficit,
}

/// Summary of one registration.
#[derive(Debug, Clone, Default)]
pub struct SolveReport {
    pub state: SolverState,
    /// Iterations consumed, applied or skipped.
    pub iterations: usize,
    pub applied_iterations: usize,
    pub skipped_iterations: usize,
    pub is_degenerate: bool,
    /// Accepted correspondences in the last iteration.
    pub num_correspondences: usize,
    pub window_surface_points: usize,
    pub window_corner_points: usize,
    /// Size of the last applied increment.
    pub delta_rotation_deg: f64,
    pub delta_translation_cm: f64,
    pub match_ms: f64,
    pub solve_ms: f64,
}

/// Timing breakdown for one mapping cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingStats {
    pub total_ms: f64,
    pub select_ms: f64,
    pub match_ms: f64,
    pub solve_ms: f64,
    pub update_ms: f64,
}

impl TimingStats {
    pub fn zero() -> Self {
        Self::default()
    }
}
