//! Reflectivity coloring for the accumulated full-resolution map.
//!
//! The fractional part of a point's intensity encodes reflectivity; scaled by
//! 10000 it indexes a blue → green → yellow → red ramp.

use nalgebra::Vector3;

use super::point::FeaturePoint;

/// A map-frame point with an RGB color.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorPoint {
    pub position: Vector3<f64>,
    pub rgb: [u8; 3],
}

impl ColorPoint {
    /// PCL's packed `rgb` field: 0x00RRGGBB.
    pub fn packed_rgb(&self) -> u32 {
        let [r, g, b] = self.rgb;
        (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
    }
}

/// Ramp color for a reflectivity value.
pub fn reflectivity_rgb(reflection: i64) -> [u8; 3] {
    let channel = |v: i64| v.clamp(0, 255) as u8;
    if reflection < 30 {
        [0, channel(reflection * 255 / 30), 255]
    } else if reflection < 90 {
        [0, 255, channel((90 - reflection) * 255 / 60)]
    } else if reflection < 150 {
        [channel((reflection - 90) * 255 / 60), 255, 0]
    } else {
        [255, channel((255 - reflection) * 255 / 105), 0]
    }
}

/// Color a map-frame point by its intensity.
pub fn colorize(point: &FeaturePoint) -> ColorPoint {
    let fraction = point.intensity - point.intensity.floor();
    let reflection = (fraction * 10000.0) as i64;
    ColorPoint {
        position: point.position,
        rgb: reflectivity_rgb(reflection),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_bands() {
        assert_eq!(reflectivity_rgb(0), [0, 0, 255]);
        assert_eq!(reflectivity_rgb(15), [0, 127, 255]);
        assert_eq!(reflectivity_rgb(30), [0, 255, 255]);
        assert_eq!(reflectivity_rgb(90), [0, 255, 0]);
        assert_eq!(reflectivity_rgb(150), [255, 255, 0]);
        assert_eq!(reflectivity_rgb(255), [255, 0, 0]);
    }

    #[test]
    fn test_high_reflectivity_saturates() {
        assert_eq!(reflectivity_rgb(9000), [255, 0, 0]);
    }

    #[test]
    fn test_colorize_uses_fractional_intensity() {
        // Integer part is the scan line, fraction the reflectivity.
        let p = FeaturePoint::new(1.0, 2.0, 3.0, 12.05);
        let c = colorize(&p);

        assert_eq!(c.rgb[0], 255);
        assert_eq!(c.position, p.position);
    }

    #[test]
    fn test_packed_rgb() {
        let c = ColorPoint {
            position: Vector3::zeros(),
            rgb: [0x12, 0x34, 0x56],
        };
        assert_eq!(c.packed_rgb(), 0x123456);
    }
}
