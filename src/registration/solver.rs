//! Gauss-Newton scan-to-map pose refinement.
//!
//! Each iteration rebuilds correspondences against the current estimate,
//! assembles the normal equations of the point-to-model residuals, and applies
//! the increment `R ← R·Exp(δθ)`, `t ← t + δt`. Degenerate geometry is handled
//! by projecting every increment onto the subspace that the first assembled
//! iteration found to be well constrained.

use std::time::Instant;

use nalgebra::{UnitQuaternion, Vector3};
use tracing::debug;

use crate::cloud::FeatureSet;
use crate::config::SolverConfig;
use crate::geometry::boxplus;
use crate::imu::GlobalState;
use crate::imu::types::{Matrix6, Vector6};

use super::correspondence::{Correspondence, CorrespondenceEngine};
use super::degeneracy::DegeneracyProjector;
use super::index::MapIndex;
use super::result::{IterationOutcome, SolveReport, SolverState};

/// Singular values below this are treated as zero when solving `AᵀA·x = Aᵀb`.
const SOLVE_EPS: f64 = 1e-12;

/// Position and time of the previous cycle's published state, used to
/// re-derive velocity from the refined translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionAnchor {
    pub translation: Vector3<f64>,
    pub timestamp_s: f64,
}

/// Normal equations `AᵀA·x = Aᵀb` of one iteration.
#[derive(Debug, Clone)]
pub struct NormalEquations {
    pub ata: Matrix6,
    pub atb: Vector6,
    pub rows: usize,
}

impl NormalEquations {
    /// Rows are `[(p × Rᵀn)ᵀ, nᵀ]` with right-hand side `-s·d`.
    pub fn assemble(correspondences: &[Correspondence], rotation: &UnitQuaternion<f64>) -> Self {
        let r_inv = rotation.inverse();
        let mut ata = Matrix6::zeros();
        let mut atb = Vector6::zeros();

        for c in correspondences {
            let rot_part = c.point_body.cross(&(r_inv * c.normal));
            let row = Vector6::new(
                rot_part.x, rot_part.y, rot_part.z, c.normal.x, c.normal.y, c.normal.z,
            );
            ata += row * row.transpose();
            atb += row * (-c.residual);
        }

        Self {
            ata,
            atb,
            rows: correspondences.len(),
        }
    }

    /// Least-squares increment `[δθ, δt]`.
    pub fn solve(&self) -> Option<Vector6> {
        self.ata.svd(true, true).solve(&self.atb, SOLVE_EPS).ok()
    }
}

/// Iterative scan-to-map registration.
pub struct RegistrationSolver {
    config: SolverConfig,
    enable_corner: bool,
}

impl RegistrationSolver {
    pub fn new(config: SolverConfig, enable_corner: bool) -> Self {
        Self {
            config,
            enable_corner,
        }
    }

    /// Refine `state` by registering `frame` (body frame) against `window`
    /// (map frame).
    ///
    /// `state` is only modified by applied iterations; on a sparse-map abort it
    /// comes back untouched. Velocity is re-derived from `previous` when at
    /// least one iteration was applied.
    pub fn solve(
        &self,
        engine: &CorrespondenceEngine,
        window: &FeatureSet,
        frame: &FeatureSet,
        state: &mut GlobalState,
        previous: Option<&MotionAnchor>,
    ) -> SolveReport {
        let mut report = SolveReport {
            window_surface_points: window.surface.len(),
            window_corner_points: window.corner.len(),
            ..SolveReport::default()
        };

        if window.surface.len() < self.config.min_map_points {
            report.state = SolverState::AbortedSparseMap;
            return report;
        }

        let surface_index = MapIndex::build(&window.surface);
        let edge_index = (self.enable_corner
            && window.corner.len() > self.config.min_corner_map_points
            && !frame.corner.is_empty())
        .then(|| MapIndex::build(&window.corner));

        report.state = SolverState::Iterating;
        let mut projector: Option<DegeneracyProjector> = None;

        for _ in 0..self.config.max_iterations {
            report.iterations += 1;

            let match_start = Instant::now();
            let mut correspondences = engine.match_surfaces(
                &surface_index,
                &frame.surface,
                &state.rotation,
                &state.translation,
            );
            if let Some(index) = &edge_index {
                correspondences.extend(engine.match_edges(
                    index,
                    &frame.corner,
                    &state.rotation,
                    &state.translation,
                ));
            }
            report.match_ms += match_start.elapsed().as_secs_f64() * 1000.0;
            report.num_correspondences = correspondences.len();

            let solve_start = Instant::now();
            let outcome = self.iterate(&correspondences, state, &mut projector, &mut report);
            report.solve_ms += solve_start.elapsed().as_secs_f64() * 1000.0;

            match outcome {
                IterationOutcome::SkippedDeficit => {
                    report.skipped_iterations += 1;
                    continue;
                }
                IterationOutcome::Applied => report.applied_iterations += 1,
            }

            if report.delta_rotation_deg < self.config.convergence_rotation_deg
                && report.delta_translation_cm < self.config.convergence_translation_cm
            {
                report.state = SolverState::Converged;
                break;
            }
        }

        if report.state == SolverState::Iterating {
            report.state = SolverState::MaxIterations;
        }
        report.is_degenerate = projector.as_ref().is_some_and(|p| p.is_degenerate());

        if report.applied_iterations > 0 {
            if let Some(prev) = previous {
                let dt = state.timestamp_s - prev.timestamp_s;
                if dt > 0.0 {
                    state.velocity = (state.translation - prev.translation) / dt;
                }
            }
        }

        debug!(
            "[Solver] {:?} after {} iters ({} skipped), {} corrs, dR={:.4}deg dT={:.4}cm{}",
            report.state,
            report.iterations,
            report.skipped_iterations,
            report.num_correspondences,
            report.delta_rotation_deg,
            report.delta_translation_cm,
            if report.is_degenerate { ", degenerate" } else { "" }
        );

        report
    }

    /// One Gauss-Newton step. Either applies a full increment or leaves
    /// `state` alone.
    fn iterate(
        &self,
        correspondences: &[Correspondence],
        state: &mut GlobalState,
        projector: &mut Option<DegeneracyProjector>,
        report: &mut SolveReport,
    ) -> IterationOutcome {
        if correspondences.len() < self.config.min_correspondences {
            return IterationOutcome::SkippedDeficit;
        }

        let normal = NormalEquations::assemble(correspondences, &state.rotation);
        let Some(mut delta) = normal.solve() else {
            return IterationOutcome::SkippedDeficit;
        };

        let projector = projector.get_or_insert_with(|| {
            DegeneracyProjector::from_normal_matrix(&normal.ata, &self.config.eigen_thresholds)
        });
        if projector.is_degenerate() {
            delta = projector.project(&delta);
        }

        let rot = Vector3::new(delta[0], delta[1], delta[2]);
        let trans = Vector3::new(delta[3], delta[4], delta[5]);
        state.rotation = boxplus(&state.rotation, &rot);
        state.translation += trans;

        report.delta_rotation_deg = rot.map(f64::to_degrees).norm();
        report.delta_translation_cm = (trans * 100.0).norm();
        IterationOutcome::Applied
    }
}
