//! Selection of the cells used for matching in one cycle.
//!
//! The 5×5×5 block around the platform's cube is "surround". A cell is also
//! "valid" when at least one of its corners lies inside the sensor cone: seen
//! from the platform, the angle between the corner and the body +Y axis must
//! lie strictly between 30° and 150°.

use nalgebra::Vector3;

use super::cube_map::SlidingVoxelMap;
use super::types::{CUBE_HALF, CubeCoord, CubeIndex, WINDOW_RADIUS};

/// Cosine of the cone half-width measured from the reference axis (30°).
const CONE_COS: f64 = 0.866_025_403_784_438_6;

/// Cells selected for one cycle.
#[derive(Debug, Clone, Default)]
pub struct MapWindow {
    /// Cells whose points feed the kNN index.
    pub valid: Vec<CubeIndex>,
    /// Every in-bounds cell of the neighbourhood; used for map snapshots.
    pub surround: Vec<CubeIndex>,
}

/// Whether `corner` falls inside the sensor cone.
///
/// `forward_ref` is a point on the body +Y axis expressed in the map frame.
/// By the law of cosines the test reduces to comparing squared distances, so
/// no angle is ever computed.
pub fn corner_in_view(
    position: &Vector3<f64>,
    forward_ref: &Vector3<f64>,
    corner: &Vector3<f64>,
) -> bool {
    let ref_dist = (forward_ref - position).norm();
    let sq1 = (corner - position).norm_squared();
    let sq2 = (corner - forward_ref).norm_squared();

    let base = ref_dist * ref_dist + sq1 - sq2;
    let band = 2.0 * CONE_COS * ref_dist * sq1.sqrt();
    base - band < 0.0 && base + band > 0.0
}

impl SlidingVoxelMap {
    /// Pick the surround and valid cells around `center`.
    pub fn select_window(
        &self,
        center: CubeCoord,
        position: &Vector3<f64>,
        forward_ref: &Vector3<f64>,
    ) -> MapWindow {
        let mut window = MapWindow::default();

        for di in -WINDOW_RADIUS..=WINDOW_RADIUS {
            for dj in -WINDOW_RADIUS..=WINDOW_RADIUS {
                for dk in -WINDOW_RADIUS..=WINDOW_RADIUS {
                    let coord = CubeCoord::new(center.i + di, center.j + dj, center.k + dk);
                    let Some(index) = coord.index() else {
                        continue;
                    };

                    let mid = self.cube_center(coord);
                    let in_view = corner_offsets()
                        .any(|offset| corner_in_view(position, forward_ref, &(mid + offset)));

                    if in_view {
                        window.valid.push(index);
                    }
                    window.surround.push(index);
                }
            }
        }

        window
    }
}

fn corner_offsets() -> impl Iterator<Item = Vector3<f64>> {
    (0..8).map(|n| {
        let sign = |bit: usize| if n & bit == 0 { -CUBE_HALF } else { CUBE_HALF };
        Vector3::new(sign(1), sign(2), sign(4))
    })
}
