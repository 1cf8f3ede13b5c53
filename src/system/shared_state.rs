//! State shared between the mapping thread and its observers.
//!
//! The mapping thread is the only writer. Readers get copies, never
//! references into mapping-owned data.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::imu::GlobalState;

pub struct SharedState {
    /// Last refined state published by the mapping thread.
    latest_state: RwLock<Option<GlobalState>>,

    /// Completed mapping cycles.
    cycles: AtomicU64,

    /// Request the mapping thread to drain its input and exit.
    shutdown_requested: AtomicBool,
}

impl SharedState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn publish(&self, state: &GlobalState) {
        *self.latest_state.write() = Some(state.clone());
        self.cycles.fetch_add(1, Ordering::SeqCst);
    }

    pub fn latest_state(&self) -> Option<GlobalState> {
        self.latest_state.read().clone()
    }

    pub fn cycles(&self) -> u64 {
        self.cycles.load(Ordering::SeqCst)
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self {
            latest_state: RwLock::new(None),
            cycles: AtomicU64::new(0),
            shutdown_requested: AtomicBool::new(false),
        }
    }
}
