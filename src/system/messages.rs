//! Inter-thread message types.
//!
//! Inputs flow from the driver into the mapping thread; one `MappingOutput`
//! flows back per completed cycle.

use nalgebra::{UnitQuaternion, Vector3};

use crate::cloud::FeatureSet;
use crate::imu::GlobalState;
use crate::mapping::KeyframeRecord;
use crate::registration::{SolveReport, TimingStats};

/// Frame id of the fixed map frame.
pub const MAP_FRAME_ID: &str = "camera_init";

/// Frame id of the refined body frame.
pub const BODY_FRAME_ID: &str = "aft_mapped";

/// One LiDAR feature frame in the body frame.
#[derive(Debug, Clone, Default)]
pub struct LidarFrame {
    /// Timestamp in seconds.
    pub timestamp_s: f64,
    pub features: FeatureSet,
}

impl LidarFrame {
    pub fn new(timestamp_s: f64, features: FeatureSet) -> Self {
        Self {
            timestamp_s,
            features,
        }
    }
}

/// Input to the mapping thread. Frames and priors arrive independently and
/// are paired inside the thread.
#[derive(Debug, Clone)]
pub enum MappingInput {
    Frame(LidarFrame),
    Prior(GlobalState),
}

/// Refined pose published after every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Odometry {
    pub timestamp_s: f64,
    pub translation: Vector3<f64>,
    pub orientation: UnitQuaternion<f64>,
    pub parent_frame: &'static str,
    pub child_frame: &'static str,
}

impl Odometry {
    pub fn from_state(timestamp_s: f64, state: &GlobalState) -> Self {
        Self {
            timestamp_s,
            translation: state.translation,
            orientation: state.rotation,
            parent_frame: MAP_FRAME_ID,
            child_frame: BODY_FRAME_ID,
        }
    }
}

/// Copy of the surround cubes' contents, in the map frame.
#[derive(Debug, Clone, Default)]
pub struct MapSnapshot {
    pub timestamp_s: f64,
    /// Number of surround cubes gathered.
    pub num_cubes: usize,
    pub clouds: FeatureSet,
}

/// Everything one mapping cycle produces.
#[derive(Debug, Clone)]
pub struct MappingOutput {
    /// Zero-based cycle counter.
    pub cycle: u64,
    pub state: GlobalState,
    pub odometry: Odometry,
    pub report: SolveReport,
    pub timing: TimingStats,
    pub snapshot: Option<MapSnapshot>,
    /// Set on cycles that appended to the keyframe log.
    pub keyframe: Option<KeyframeRecord>,
}
