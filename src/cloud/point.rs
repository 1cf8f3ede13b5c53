use nalgebra::Vector3;

/// A LiDAR feature point with its return intensity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeaturePoint {
    pub position: Vector3<f64>,
    pub intensity: f64,
}

impl FeaturePoint {
    pub fn new(x: f64, y: f64, z: f64, intensity: f64) -> Self {
        Self {
            position: Vector3::new(x, y, z),
            intensity,
        }
    }

    pub fn from_position(position: Vector3<f64>, intensity: f64) -> Self {
        Self {
            position,
            intensity,
        }
    }

    /// Same point with its position mapped through `f`.
    #[inline]
    pub fn map_position(&self, f: impl Fn(&Vector3<f64>) -> Vector3<f64>) -> Self {
        Self {
            position: f(&self.position),
            intensity: self.intensity,
        }
    }
}

pub type PointCloud = Vec<FeaturePoint>;

/// Surface and corner features of one frame, window or snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    pub surface: PointCloud,
    pub corner: PointCloud,
}

impl FeatureSet {
    pub fn new(surface: PointCloud, corner: PointCloud) -> Self {
        Self { surface, corner }
    }

    pub fn surface_only(surface: PointCloud) -> Self {
        Self {
            surface,
            corner: PointCloud::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.surface.len() + self.corner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surface.is_empty() && self.corner.is_empty()
    }
}
