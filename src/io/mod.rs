//! Dataset loading and map export.

pub mod persistence;
pub mod replay;

pub use persistence::{save_map, PersistReport};
pub use replay::{ReplayDataset, ReplayEvent};
