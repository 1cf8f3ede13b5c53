//! Pairing of LiDAR frames with pose priors.
//!
//! Frames and priors are produced by independent upstream stages and buffered
//! here until a pair can be formed. Nothing is ever reordered; the timestamp
//! policy may discard an unmatched head, the count policy never discards.

use std::collections::VecDeque;

use tracing::info;

use crate::config::{PairingPolicy, SyncConfig};
use crate::imu::GlobalState;
use crate::system::messages::LidarFrame;

/// Result of one pairing attempt.
#[derive(Debug, Clone)]
pub enum SyncStatus {
    Ready(LidarFrame, GlobalState),
    /// At least one buffer is empty.
    Waiting,
    /// Both buffers hold data but cannot be paired yet (count policy only).
    Desync { frames: usize, priors: usize },
}

pub struct InputSynchronizer {
    config: SyncConfig,
    frames: VecDeque<LidarFrame>,
    priors: VecDeque<GlobalState>,
    dropped_frames: usize,
    dropped_priors: usize,
}

impl InputSynchronizer {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            frames: VecDeque::new(),
            priors: VecDeque::new(),
            dropped_frames: 0,
            dropped_priors: 0,
        }
    }

    pub fn push_frame(&mut self, frame: LidarFrame) {
        self.frames.push_back(frame);
    }

    pub fn push_prior(&mut self, prior: GlobalState) {
        self.priors.push_back(prior);
    }

    /// Buffered (frames, priors).
    pub fn pending(&self) -> (usize, usize) {
        (self.frames.len(), self.priors.len())
    }

    /// Heads discarded so far as (frames, priors).
    pub fn dropped(&self) -> (usize, usize) {
        (self.dropped_frames, self.dropped_priors)
    }

    /// Try to take the next (frame, prior) pair off the buffers.
    pub fn next_pair(&mut self) -> SyncStatus {
        match self.config.policy {
            PairingPolicy::Count => self.pair_by_count(),
            PairingPolicy::Timestamp => self.pair_by_timestamp(),
        }
    }

    fn pair_by_count(&mut self) -> SyncStatus {
        if self.frames.is_empty() || self.priors.is_empty() {
            return SyncStatus::Waiting;
        }
        if self.frames.len() != self.priors.len() {
            return SyncStatus::Desync {
                frames: self.frames.len(),
                priors: self.priors.len(),
            };
        }
        self.pop_pair()
    }

    fn pair_by_timestamp(&mut self) -> SyncStatus {
        loop {
            let (Some(frame), Some(prior)) = (self.frames.front(), self.priors.front()) else {
                return SyncStatus::Waiting;
            };

            let dt = frame.timestamp_s - prior.timestamp_s;
            if dt.abs() <= self.config.tolerance_s {
                return self.pop_pair();
            }

            if dt > 0.0 {
                info!(
                    "[Sync] dropping prior at {:.3}s, no frame within {:.3}s (next frame {:.3}s)",
                    prior.timestamp_s, self.config.tolerance_s, frame.timestamp_s
                );
                self.priors.pop_front();
                self.dropped_priors += 1;
            } else {
                info!(
                    "[Sync] dropping frame at {:.3}s, no prior within {:.3}s (next prior {:.3}s)",
                    frame.timestamp_s, self.config.tolerance_s, prior.timestamp_s
                );
                self.frames.pop_front();
                self.dropped_frames += 1;
            }
        }
    }

    fn pop_pair(&mut self) -> SyncStatus {
        match (self.frames.pop_front(), self.priors.pop_front()) {
            (Some(frame), Some(prior)) => SyncStatus::Ready(frame, prior),
            _ => SyncStatus::Waiting,
        }
    }
}
