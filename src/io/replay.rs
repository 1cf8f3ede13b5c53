//! Recorded sequence loader for offline replay.
//!
//! Layout under the dataset root:
//! - `frames.csv`: `timestamp_s, surface_file[, corner_file]`, paths relative
//!   to the root
//! - per-frame point files: `x, y, z, intensity`
//! - `poses.csv`: `timestamp_s, px, py, pz, qw, qx, qy, qz[, vx, vy, vz]`,
//!   the pose priors
//!
//! Lines starting with `#` are comments.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use csv::ReaderBuilder;
use nalgebra::Vector3;
use tracing::warn;

use crate::cloud::{FeaturePoint, FeatureSet, PointCloud};
use crate::geometry::SE3;
use crate::imu::GlobalState;
use crate::system::messages::LidarFrame;

#[derive(Debug, Clone)]
pub struct FrameEntry {
    pub timestamp_s: f64,
    pub surface_file: String,
    pub corner_file: Option<String>,
}

/// One replay input in time order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayEvent {
    Frame(usize),
    Prior(usize),
}

#[derive(Debug)]
pub struct ReplayDataset {
    root: PathBuf,
    pub frames: Vec<FrameEntry>,
    pub priors: Vec<GlobalState>,
}

impl ReplayDataset {
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let frames = load_frame_list(&root.join("frames.csv"))?;
        let priors = load_priors(&root.join("poses.csv"))?;

        if frames.is_empty() {
            bail!("No frames listed in {}", root.join("frames.csv").display());
        }
        if priors.len() != frames.len() {
            warn!(
                "{} frames but {} pose priors; unmatched inputs will be dropped or deferred",
                frames.len(),
                priors.len()
            );
        }

        Ok(Self {
            root,
            frames,
            priors,
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Load the point files of frame `idx`.
    pub fn frame(&self, idx: usize) -> Result<LidarFrame> {
        let entry = self
            .frames
            .get(idx)
            .with_context(|| format!("No frame at index {}", idx))?;

        let surface = load_points(&self.root.join(&entry.surface_file))?;
        let corner = match &entry.corner_file {
            Some(file) => load_points(&self.root.join(file))?,
            None => PointCloud::new(),
        };
        Ok(LidarFrame::new(
            entry.timestamp_s,
            FeatureSet::new(surface, corner),
        ))
    }

    /// Frames and priors merged by timestamp; priors go first on ties.
    pub fn events(&self) -> Vec<ReplayEvent> {
        let mut events = Vec::with_capacity(self.frames.len() + self.priors.len());
        let (mut f, mut p) = (0, 0);
        while f < self.frames.len() || p < self.priors.len() {
            let take_prior = match (self.frames.get(f), self.priors.get(p)) {
                (Some(frame), Some(prior)) => prior.timestamp_s <= frame.timestamp_s,
                (None, Some(_)) => true,
                _ => false,
            };
            if take_prior {
                events.push(ReplayEvent::Prior(p));
                p += 1;
            } else {
                events.push(ReplayEvent::Frame(f));
                f += 1;
            }
        }
        events
    }
}

fn reader(csv_path: &Path) -> Result<csv::Reader<std::fs::File>> {
    ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .flexible(true)
        .from_path(csv_path)
        .with_context(|| format!("Failed to open {}", csv_path.display()))
}

fn load_frame_list(csv_path: &Path) -> Result<Vec<FrameEntry>> {
    let mut rdr = reader(csv_path)?;

    let mut entries = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 2 {
            continue;
        }
        let corner_file = rec
            .get(2)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        entries.push(FrameEntry {
            timestamp_s: rec[0].trim().parse()?,
            surface_file: rec[1].trim().to_string(),
            corner_file,
        });
    }
    Ok(entries)
}

fn load_priors(csv_path: &Path) -> Result<Vec<GlobalState>> {
    let mut rdr = reader(csv_path)?;

    let mut priors = Vec::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 8 {
            continue;
        }
        let ts: f64 = rec[0].trim().parse()?;
        let position = Vector3::new(
            rec[1].trim().parse()?,
            rec[2].trim().parse()?,
            rec[3].trim().parse()?,
        );

        // w-first quaternion
        let qw: f64 = rec[4].trim().parse()?;
        let qx: f64 = rec[5].trim().parse()?;
        let qy: f64 = rec[6].trim().parse()?;
        let qz: f64 = rec[7].trim().parse()?;
        let mut state = GlobalState::from_pose(ts, SE3::from_quaternion(qw, qx, qy, qz, position));

        if rec.len() >= 11 {
            state.velocity = Vector3::new(
                rec[8].trim().parse()?,
                rec[9].trim().parse()?,
                rec[10].trim().parse()?,
            );
        }
        priors.push(state);
    }
    Ok(priors)
}

fn load_points(csv_path: &Path) -> Result<PointCloud> {
    let mut rdr = reader(csv_path)?;

    let mut points = PointCloud::new();
    for rec in rdr.records() {
        let rec = rec?;
        if rec.len() < 3 {
            continue;
        }
        let intensity = match rec.get(3) {
            Some(s) => s.trim().parse()?,
            None => 0.0,
        };
        points.push(FeaturePoint::new(
            rec[0].trim().parse()?,
            rec[1].trim().parse()?,
            rec[2].trim().parse()?,
            intensity,
        ));
    }
    Ok(points)
}
