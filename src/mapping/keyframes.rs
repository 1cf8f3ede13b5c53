//! Sparse trajectory log written on shutdown.

use nalgebra::{UnitQuaternion, Vector3};

use crate::system::messages::Odometry;

/// One logged pose: orientation and position of the body in the map frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyframeRecord {
    pub timestamp_s: f64,
    pub orientation: UnitQuaternion<f64>,
    pub position: Vector3<f64>,
}

impl KeyframeRecord {
    /// `[qx, qy, qz, qw, px, py, pz]`, the on-disk order.
    pub fn to_row(&self) -> [f64; 7] {
        let q = self.orientation.as_ref();
        [
            q.i,
            q.j,
            q.k,
            q.w,
            self.position.x,
            self.position.y,
            self.position.z,
        ]
    }
}

/// Appends a record every `interval` cycles.
#[derive(Debug, Clone)]
pub struct KeyframeLog {
    interval: usize,
    since_last: usize,
    records: Vec<KeyframeRecord>,
}

impl KeyframeLog {
    pub fn new(interval: usize) -> Self {
        Self {
            interval: interval.max(1),
            since_last: 0,
            records: Vec::new(),
        }
    }

    /// Count one cycle; log its odometry if the interval has elapsed.
    pub fn on_cycle(&mut self, odometry: &Odometry) -> Option<KeyframeRecord> {
        self.since_last += 1;
        if self.since_last < self.interval {
            return None;
        }
        self.since_last = 0;

        let record = KeyframeRecord {
            timestamp_s: odometry.timestamp_s,
            orientation: odometry.orientation,
            position: odometry.translation,
        };
        self.records.push(record);
        Some(record)
    }

    pub fn records(&self) -> &[KeyframeRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
