//! Mapping system orchestration and thread management.
//!
//! This module contains the top-level `MappingSystem` that spawns the mapping
//! thread, along with shared state and inter-thread messaging types.

mod mapping_system;
pub mod messages;
pub mod shared_state;

pub use mapping_system::MappingSystem;
pub use messages::{LidarFrame, MapSnapshot, MappingInput, MappingOutput, Odometry};
pub use shared_state::SharedState;
