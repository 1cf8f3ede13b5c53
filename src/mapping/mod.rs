//! The mapping loop: input pairing, per-cycle registration, map maintenance.

pub mod keyframes;
mod laser_mapper;
pub mod map_updater;
pub mod sync;

pub use keyframes::{KeyframeLog, KeyframeRecord};
pub use laser_mapper::LaserMapper;
pub use map_updater::{MapUpdater, UpdateStats};
pub use sync::{InputSynchronizer, SyncStatus};
