//! Laser Mapper - one scan-to-map registration cycle per (frame, prior) pair.
//!
//! Each cycle:
//! 1. Recenters the cube grid around the prior position
//! 2. Selects the surround/valid cells and gathers the map window
//! 3. Downsamples the frame
//! 4. Refines the prior against the window
//! 5. Inserts the frame at the refined pose
//! 6. Accumulates the colourised frame and logs keyframes
//!
//! All mutable mapping state lives here and is owned by a single thread.

use std::path::Path;
use std::time::Instant;

use nalgebra::Vector3;
use tracing::{debug, warn};

use crate::cloud::{colorize, ColorPoint, FeatureSet, VoxelDownsampler};
use crate::config::MappingConfig;
use crate::error::Result;
use crate::imu::GlobalState;
use crate::io::persistence::{save_map, PersistReport};
use crate::map::{FeatureKind, MapWindow, SlidingVoxelMap};
use crate::registration::{
    CorrespondenceEngine, MotionAnchor, RegistrationSolver, SolverState, TimingStats,
};
use crate::system::messages::{LidarFrame, MapSnapshot, MappingOutput, Odometry};

use super::keyframes::{KeyframeLog, KeyframeRecord};
use super::map_updater::MapUpdater;

/// Distance along the body +Y axis of the point orienting the view cone.
const FORWARD_REF_DISTANCE: f64 = 10.0;

pub struct LaserMapper {
    config: MappingConfig,
    map: SlidingVoxelMap,
    surface_filter: VoxelDownsampler,
    corner_filter: VoxelDownsampler,
    window_filter: VoxelDownsampler,
    engine: CorrespondenceEngine,
    solver: RegistrationSolver,
    updater: MapUpdater,
    keyframes: KeyframeLog,
    /// Colourised frames in the map frame, in arrival order.
    full_map: Vec<ColorPoint>,
    previous: Option<MotionAnchor>,
    cycles: u64,
}

impl LaserMapper {
    pub fn new(config: MappingConfig) -> Result<Self> {
        config.validate()?;

        let engine = CorrespondenceEngine::new(config.matching.clone())?;
        let solver = RegistrationSolver::new(config.solver.clone(), config.matching.enable_corner);

        Ok(Self {
            map: SlidingVoxelMap::new(),
            surface_filter: VoxelDownsampler::new(config.filter.surface_leaf_size),
            corner_filter: VoxelDownsampler::new(config.filter.corner_leaf_size),
            window_filter: VoxelDownsampler::new(config.filter.map_leaf_size),
            engine,
            solver,
            updater: MapUpdater::new(&config.filter),
            keyframes: KeyframeLog::new(config.output.keyframe_interval),
            full_map: Vec::new(),
            previous: None,
            cycles: 0,
            config,
        })
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    pub fn map(&self) -> &SlidingVoxelMap {
        &self.map
    }

    pub fn keyframes(&self) -> &[KeyframeRecord] {
        self.keyframes.records()
    }

    pub fn full_map(&self) -> &[ColorPoint] {
        &self.full_map
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Run one mapping cycle.
    ///
    /// Always returns a terminal state; a sparse map keeps the prior pose and
    /// still grows the map.
    pub fn process(&mut self, frame: LidarFrame, prior: GlobalState) -> MappingOutput {
        let cycle_start = Instant::now();
        let mut timing = TimingStats::zero();
        let mut state = prior;

        let select_start = Instant::now();
        let forward_ref = state.body_to_map(&Vector3::new(0.0, FORWARD_REF_DISTANCE, 0.0));
        let center = self.map.recenter(&state.translation);
        let window = self
            .map
            .select_window(center, &state.translation, &forward_ref);
        let window_clouds = self.gather_window(&window);
        let frame_down = self.downsample_frame(&frame.features);
        timing.select_ms = select_start.elapsed().as_secs_f64() * 1000.0;

        let report = self.solver.solve(
            &self.engine,
            &window_clouds,
            &frame_down,
            &mut state,
            self.previous.as_ref(),
        );
        timing.match_ms = report.match_ms;
        timing.solve_ms = report.solve_ms;

        if report.state == SolverState::AbortedSparseMap {
            warn!(
                "[Mapper] cycle {}: map window too sparse ({} surface points), keeping prior",
                self.cycles, report.window_surface_points
            );
        }

        let update_start = Instant::now();
        let update = self.updater.update(&mut self.map, &frame_down, &state);
        timing.update_ms = update_start.elapsed().as_secs_f64() * 1000.0;

        if self.config.output.accumulate_full_map {
            self.full_map.extend(
                frame_down
                    .surface
                    .iter()
                    .map(|p| colorize(&p.map_position(|x| state.body_to_map(x)))),
            );
        }

        let snapshot = self
            .config
            .output
            .publish_map_snapshot
            .then(|| MapSnapshot {
                timestamp_s: frame.timestamp_s,
                num_cubes: window.surround.len(),
                clouds: FeatureSet::new(
                    self.map.gather(FeatureKind::Surface, &window.surround),
                    self.map.gather(FeatureKind::Corner, &window.surround),
                ),
            });

        let odometry = Odometry::from_state(frame.timestamp_s, &state);
        let keyframe = self.keyframes.on_cycle(&odometry);

        self.previous = Some(MotionAnchor {
            translation: state.translation,
            timestamp_s: state.timestamp_s,
        });

        timing.total_ms = cycle_start.elapsed().as_secs_f64() * 1000.0;
        debug!(
            "[Mapper] cycle {}: {:?}, {} valid/{} surround cubes, {} inserted, select {:.2}ms match {:.2}ms solve {:.2}ms update {:.2}ms total {:.2}ms",
            self.cycles,
            report.state,
            window.valid.len(),
            window.surround.len(),
            update.inserted,
            timing.select_ms,
            timing.match_ms,
            timing.solve_ms,
            timing.update_ms,
            timing.total_ms
        );

        let output = MappingOutput {
            cycle: self.cycles,
            state,
            odometry,
            report,
            timing,
            snapshot,
            keyframe,
        };
        self.cycles += 1;
        output
    }

    /// Write the map, accumulated cloud and keyframe log under `dir`.
    pub fn persist(&self, dir: &Path) -> Result<PersistReport> {
        save_map(
            dir,
            &self.map.all_points(FeatureKind::Surface),
            &self.map.all_points(FeatureKind::Corner),
            &self.full_map,
            self.keyframes.records(),
        )
    }

    fn gather_window(&self, window: &MapWindow) -> FeatureSet {
        let surface = self
            .window_filter
            .filter(&self.map.gather(FeatureKind::Surface, &window.valid));
        let corner = if self.config.matching.enable_corner {
            self.map.gather(FeatureKind::Corner, &window.valid)
        } else {
            Vec::new()
        };
        FeatureSet::new(surface, corner)
    }

    fn downsample_frame(&self, features: &FeatureSet) -> FeatureSet {
        let corner = if self.config.matching.enable_corner {
            self.corner_filter.filter(&features.corner)
        } else {
            Vec::new()
        };
        FeatureSet::new(self.surface_filter.filter(&features.surface), corner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::test_utils::{plane_patch, tilted_floor};
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn config() -> MappingConfig {
        MappingConfig {
            filter: FilterConfig {
                corner_leaf_size: 0.1,
                surface_leaf_size: 0.1,
                map_leaf_size: 0.1,
            },
            ..MappingConfig::default()
        }
    }

    fn floor_frame(t: f64) -> LidarFrame {
        let points = tilted_floor().sample(&mut StdRng::seed_from_u64(7), 200);
        LidarFrame::new(t, FeatureSet::surface_only(points))
    }

    #[test]
    fn test_first_frame_seeds_map_then_registers_in_place() {
        let mut mapper = LaserMapper::new(config()).unwrap();

        let first = mapper.process(floor_frame(0.0), GlobalState::identity(0.0));
        assert_eq!(first.report.state, SolverState::AbortedSparseMap);
        assert_eq!(first.state, GlobalState::identity(0.0));
        let seeded = mapper.map().num_points(FeatureKind::Surface);
        assert!(seeded > 160 && seeded <= 200, "map holds {} points", seeded);

        let second = mapper.process(floor_frame(0.1), GlobalState::identity(0.1));
        assert_eq!(second.report.state, SolverState::Converged);
        assert_eq!(second.report.iterations, 1);
        assert!(second.report.delta_rotation_deg < 1e-6);
        assert!(second.report.delta_translation_cm < 1e-6);
        assert!(second.state.translation.norm() < 1e-8);
        assert!(second.state.rotation.angle() < 1e-8);
        assert_relative_eq!(second.state.velocity.norm(), 0.0, epsilon = 1e-6);

        // Re-inserting the same frame leaves the map density unchanged.
        assert_eq!(mapper.map().num_points(FeatureKind::Surface), seeded);
        assert_eq!(mapper.cycles(), 2);
    }

    #[test]
    fn test_outputs_carry_odometry_and_snapshot() {
        let mut mapper = LaserMapper::new(config()).unwrap();
        let mut prior = GlobalState::identity(0.0);
        prior.translation = Vector3::new(0.5, 0.0, 0.0);

        let out = mapper.process(floor_frame(0.0), prior.clone());

        assert_eq!(out.cycle, 0);
        assert_eq!(out.odometry.parent_frame, "camera_init");
        assert_eq!(out.odometry.child_frame, "aft_mapped");
        assert_relative_eq!(out.odometry.translation, prior.translation);

        let snapshot = out.snapshot.unwrap();
        assert_eq!(snapshot.num_cubes, 125);
        assert_eq!(
            snapshot.clouds.surface.len(),
            mapper.map().num_points(FeatureKind::Surface)
        );
        // The map re-downsamples what the accumulated cloud keeps verbatim.
        assert!(mapper.full_map().len() >= snapshot.clouds.surface.len());
    }

    #[test]
    fn test_keyframe_every_interval() {
        let mut cfg = config();
        cfg.output.keyframe_interval = 3;
        let mut mapper = LaserMapper::new(cfg).unwrap();

        let mut logged = 0;
        for n in 0..7 {
            let t = n as f64 * 0.1;
            if mapper
                .process(floor_frame(t), GlobalState::identity(t))
                .keyframe
                .is_some()
            {
                logged += 1;
            }
        }
        assert_eq!(logged, 2);
        assert_eq!(mapper.keyframes().len(), 2);
    }

    #[test]
    fn test_level_floor_registers_without_panicking() {
        // Every point shares z = -1.5 exactly, before and after downsampling.
        let points = plane_patch(
            &mut StdRng::seed_from_u64(8),
            3000,
            Vector3::new(0.0, 0.0, -1.5),
            Vector3::x(),
            Vector3::y(),
            [2.0, 2.0],
        );
        let frame = |t: f64| LidarFrame::new(t, FeatureSet::surface_only(points.clone()));
        let mut mapper = LaserMapper::new(config()).unwrap();

        let first = mapper.process(frame(0.0), GlobalState::identity(0.0));
        assert_eq!(first.report.state, SolverState::AbortedSparseMap);

        let second = mapper.process(frame(0.1), GlobalState::identity(0.1));
        assert_eq!(second.report.state, SolverState::Converged);
        assert!(second.report.is_degenerate);
        assert!(second.state.translation.norm() < 1e-8);
        assert!(second.state.rotation.angle() < 1e-8);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = config();
        cfg.filter.surface_leaf_size = 0.0;
        assert!(LaserMapper::new(cfg).is_err());
    }
}
