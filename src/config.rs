//! Mapping configuration.
//!
//! Loaded from YAML. Every field has a default, so a file only needs to list
//! what it overrides:
//!
//! ```yaml
//! filter:
//!   surface_leaf_size: 0.3
//! matching:
//!   enable_corner: true
//! output:
//!   map_file_path: /tmp/run42
//! sync:
//!   policy: count
//! ```

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{MappingError, Result};

/// Voxel leaf sizes (meters).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Leaf for the incoming corner cloud and the corner map layer.
    pub corner_leaf_size: f64,
    /// Leaf for the incoming surface cloud and the surface map layer.
    pub surface_leaf_size: f64,
    /// Leaf applied to the gathered map window before the kNN index is built.
    pub map_leaf_size: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            corner_leaf_size: 0.1,
            surface_leaf_size: 0.2,
            map_leaf_size: 0.1,
        }
    }
}

/// Correspondence gating.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Largest squared neighbor distance accepted for a plane fit (m²).
    pub surface_max_sq_dist: f64,
    /// Max distance of any neighbor from its fitted plane (m).
    pub plane_threshold: f64,
    /// Correspondences with weight at or below this are dropped.
    pub min_weight: f64,
    /// Largest squared neighbor distance accepted for a line fit (m²).
    pub edge_max_sq_dist: f64,
    /// Required ratio between the two largest neighbor covariance eigenvalues.
    pub edge_eigen_ratio: f64,
    /// Run the corner (edge) pipeline alongside the surface one.
    pub enable_corner: bool,
    /// Size of the correspondence worker pool.
    pub num_workers: usize,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            surface_max_sq_dist: 0.5,
            plane_threshold: 0.05,
            min_weight: 0.1,
            edge_max_sq_dist: 1.5,
            edge_eigen_ratio: 3.0,
            enable_corner: false,
            num_workers: 4,
        }
    }
}

/// Gauss-Newton loop settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    pub max_iterations: usize,
    /// Iterations with fewer accepted correspondences are skipped.
    pub min_correspondences: usize,
    /// Windows with fewer surface points abort the solve.
    pub min_map_points: usize,
    /// The corner pipeline only runs when the corner window is larger than this.
    pub min_corner_map_points: usize,
    /// Per-axis eigenvalue floor for degeneracy detection, smallest axis last.
    pub eigen_thresholds: [f64; 6],
    /// Rotation increment below which the loop stops (degrees).
    pub convergence_rotation_deg: f64,
    /// Translation increment below which the loop stops (centimeters).
    pub convergence_translation_cm: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            min_correspondences: 50,
            min_map_points: 100,
            min_corner_map_points: 10,
            eigen_thresholds: [1.0; 6],
            convergence_rotation_deg: 0.02,
            convergence_translation_cm: 0.03,
        }
    }
}

/// What gets published and persisted.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory receiving the PCD files and the keyframe trajectory on shutdown.
    pub map_file_path: PathBuf,
    /// A keyframe is recorded every this many cycles.
    pub keyframe_interval: usize,
    pub publish_map_snapshot: bool,
    /// Keep every registered frame for the colorized full map.
    pub accumulate_full_map: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            map_file_path: PathBuf::from("output"),
            keyframe_interval: 15,
            publish_map_snapshot: true,
            accumulate_full_map: true,
        }
    }
}

/// How frames are paired with pose priors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingPolicy {
    /// Pair buffer heads whenever both buffers hold the same number of entries.
    Count,
    /// Pair heads whose timestamps agree within `tolerance_s`.
    Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub policy: PairingPolicy,
    pub tolerance_s: f64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            policy: PairingPolicy::Timestamp,
            // 0.6 of a 10 Hz frame interval.
            tolerance_s: 0.06,
        }
    }
}

/// Top-level configuration of the mapping loop.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MappingConfig {
    pub filter: FilterConfig,
    pub matching: MatchingConfig,
    pub solver: SolverConfig,
    pub output: OutputConfig,
    pub sync: SyncConfig,
}

impl MappingConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| MappingError::io(path, e))?;
        let config: Self = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let leaves = [
            ("corner_leaf_size", self.filter.corner_leaf_size),
            ("surface_leaf_size", self.filter.surface_leaf_size),
            ("map_leaf_size", self.filter.map_leaf_size),
        ];
        for (name, leaf) in leaves {
            if leaf.is_nan() || leaf <= 0.0 {
                return Err(MappingError::InvalidConfig(format!(
                    "{} must be positive, got {}",
                    name, leaf
                )));
            }
        }
        if self.matching.num_workers == 0 {
            return Err(MappingError::InvalidConfig(
                "num_workers must be at least 1".to_string(),
            ));
        }
        if self.solver.max_iterations == 0 {
            return Err(MappingError::InvalidConfig(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        if self.output.keyframe_interval == 0 {
            return Err(MappingError::InvalidConfig(
                "keyframe_interval must be at least 1".to_string(),
            ));
        }
        if self.sync.tolerance_s < 0.0 {
            return Err(MappingError::InvalidConfig(format!(
                "sync tolerance must not be negative, got {}",
                self.sync.tolerance_s
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MappingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.solver.max_iterations, 15);
        assert_eq!(config.matching.num_workers, 4);
        assert_eq!(config.sync.policy, PairingPolicy::Timestamp);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config = MappingConfig::from_yaml_str(
            "filter:\n  surface_leaf_size: 0.3\nmatching:\n  enable_corner: true\nsync:\n  policy: count\n",
        )
        .unwrap();

        assert_eq!(config.filter.surface_leaf_size, 0.3);
        assert_eq!(config.filter.corner_leaf_size, 0.1);
        assert!(config.matching.enable_corner);
        assert_eq!(config.sync.policy, PairingPolicy::Count);
        assert_eq!(config.output.keyframe_interval, 15);
    }

    #[test]
    fn test_rejects_non_positive_leaf() {
        let err = MappingConfig::from_yaml_str("filter:\n  map_leaf_size: 0.0\n").unwrap_err();
        assert!(matches!(err, MappingError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_malformed_yaml() {
        let err = MappingConfig::from_yaml_str("solver: [1, 2").unwrap_err();
        assert!(matches!(err, MappingError::ConfigParse(_)));
    }
}
