//! Map and trajectory export.
//!
//! Clouds are written as binary PCD v0.7 with little-endian `f32` fields.
//! The colour cloud stores PCL's packed `rgb` (0x00RRGGBB reinterpreted as a
//! float). Keyframes go to a plain text file, one `qx qy qz qw px py pz` line
//! each.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, WriteBytesExt};
use tracing::info;

use crate::cloud::{ColorPoint, FeaturePoint};
use crate::error::{MappingError, Result};
use crate::mapping::KeyframeRecord;

pub const SURFACE_FILE: &str = "surf.pcd";
pub const CORNER_FILE: &str = "corner.pcd";
pub const FULL_MAP_FILE: &str = "all_points.pcd";
pub const KEYFRAME_FILE: &str = "key_frame.txt";

/// What `save_map` wrote.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// False when there was nothing to save.
    pub written: bool,
    pub surface_points: usize,
    pub corner_points: usize,
    pub full_map_points: usize,
    pub keyframes: usize,
}

/// Save the map clouds, accumulated colour cloud and keyframe log under `dir`.
///
/// Writes nothing and succeeds when all three clouds are empty.
pub fn save_map(
    dir: &Path,
    surface: &[FeaturePoint],
    corner: &[FeaturePoint],
    full_map: &[ColorPoint],
    keyframes: &[KeyframeRecord],
) -> Result<PersistReport> {
    if surface.is_empty() && corner.is_empty() && full_map.is_empty() {
        info!("[Persist] no points accumulated, nothing saved");
        return Ok(PersistReport::default());
    }

    fs::create_dir_all(dir).map_err(|e| MappingError::io(dir, e))?;
    write_pcd_xyzi(&dir.join(SURFACE_FILE), surface)?;
    write_pcd_xyzi(&dir.join(CORNER_FILE), corner)?;
    write_pcd_xyzrgb(&dir.join(FULL_MAP_FILE), full_map)?;
    write_keyframes(&dir.join(KEYFRAME_FILE), keyframes)?;

    let report = PersistReport {
        written: true,
        surface_points: surface.len(),
        corner_points: corner.len(),
        full_map_points: full_map.len(),
        keyframes: keyframes.len(),
    };
    info!(
        "[Persist] saved {} surface, {} corner, {} colour points and {} keyframes to {}",
        report.surface_points,
        report.corner_points,
        report.full_map_points,
        report.keyframes,
        dir.display()
    );
    Ok(report)
}

pub fn write_pcd_xyzi(path: &Path, points: &[FeaturePoint]) -> Result<()> {
    write_pcd(path, "intensity", points.len(), |out| {
        for p in points {
            write_position(out, &p.position)?;
            out.write_f32::<LittleEndian>(p.intensity as f32)?;
        }
        Ok(())
    })
}

pub fn write_pcd_xyzrgb(path: &Path, points: &[ColorPoint]) -> Result<()> {
    write_pcd(path, "rgb", points.len(), |out| {
        for p in points {
            write_position(out, &p.position)?;
            out.write_u32::<LittleEndian>(p.packed_rgb())?;
        }
        Ok(())
    })
}

pub fn write_keyframes(path: &Path, keyframes: &[KeyframeRecord]) -> Result<()> {
    let write = || -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        for kf in keyframes {
            let row = kf.to_row();
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(out, "{}", line.join(" "))?;
        }
        out.flush()
    };
    write().map_err(|e| MappingError::io(path, e))
}

/// Four `f32` fields per point: x, y, z and `fourth`.
fn write_pcd<F>(path: &Path, fourth: &str, count: usize, body: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> std::io::Result<()>,
{
    let write = || -> std::io::Result<()> {
        let mut out = BufWriter::new(File::create(path)?);
        write!(
            out,
            "# .PCD v0.7 - Point Cloud Data file format\n\
             VERSION 0.7\n\
             FIELDS x y z {fourth}\n\
             SIZE 4 4 4 4\n\
             TYPE F F F F\n\
             COUNT 1 1 1 1\n\
             WIDTH {count}\n\
             HEIGHT 1\n\
             VIEWPOINT 0 0 0 1 0 0 0\n\
             POINTS {count}\n\
             DATA binary\n"
        )?;
        body(&mut out)?;
        out.flush()
    };
    write().map_err(|e| MappingError::io(path, e))
}

fn write_position<W: Write>(out: &mut W, p: &nalgebra::Vector3<f64>) -> std::io::Result<()> {
    out.write_f32::<LittleEndian>(p.x as f32)?;
    out.write_f32::<LittleEndian>(p.y as f32)?;
    out.write_f32::<LittleEndian>(p.z as f32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;
    use nalgebra::{UnitQuaternion, Vector3};
    use std::io::{BufRead, BufReader, Read};

    /// Header lines and the binary payload of a PCD file.
    fn read_pcd(path: &Path) -> (Vec<String>, Vec<u8>) {
        let mut reader = BufReader::new(File::open(path).unwrap());
        let mut header = Vec::new();
        loop {
            let mut line = String::new();
            reader.read_line(&mut line).unwrap();
            let line = line.trim_end().to_string();
            let done = line.starts_with("DATA");
            header.push(line);
            if done {
                break;
            }
        }
        let mut payload = Vec::new();
        reader.read_to_end(&mut payload).unwrap();
        (header, payload)
    }

    #[test]
    fn test_empty_map_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let report = save_map(&out, &[], &[], &[], &[]).unwrap();

        assert!(!report.written);
        assert!(!out.exists());
    }

    #[test]
    fn test_xyzi_binary_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cloud.pcd");
        let points = vec![
            FeaturePoint::new(1.0, -2.0, 3.5, 0.25),
            FeaturePoint::new(0.0, 0.5, -1.0, 12.0),
        ];

        write_pcd_xyzi(&path, &points).unwrap();
        let (header, payload) = read_pcd(&path);

        assert!(header.contains(&"FIELDS x y z intensity".to_string()));
        assert!(header.contains(&"POINTS 2".to_string()));
        assert_eq!(header.last().unwrap(), "DATA binary");
        assert_eq!(payload.len(), 2 * 16);

        let mut cursor = &payload[16..];
        let values: Vec<f32> = (0..4)
            .map(|_| cursor.read_f32::<LittleEndian>().unwrap())
            .collect();
        assert_eq!(values, vec![0.0, 0.5, -1.0, 12.0]);
    }

    #[test]
    fn test_rgb_is_packed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color.pcd");
        let point = ColorPoint {
            position: Vector3::new(1.0, 2.0, 3.0),
            rgb: [0x12, 0x34, 0x56],
        };

        write_pcd_xyzrgb(&path, &[point]).unwrap();
        let (header, payload) = read_pcd(&path);

        assert!(header.contains(&"FIELDS x y z rgb".to_string()));
        let mut cursor = &payload[12..];
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0x0012_3456);
    }

    #[test]
    fn test_save_map_writes_all_files() {
        let dir = tempfile::tempdir().unwrap();
        let surface = vec![FeaturePoint::new(1.0, 1.0, 1.0, 0.1)];
        let keyframes = vec![KeyframeRecord {
            timestamp_s: 1.5,
            orientation: UnitQuaternion::identity(),
            position: Vector3::new(4.0, 5.0, 6.0),
        }];

        let report = save_map(dir.path(), &surface, &[], &[], &keyframes).unwrap();

        assert!(report.written);
        assert_eq!(report.surface_points, 1);
        for name in [SURFACE_FILE, CORNER_FILE, FULL_MAP_FILE, KEYFRAME_FILE] {
            assert!(dir.path().join(name).exists(), "{} missing", name);
        }

        let text = fs::read_to_string(dir.path().join(KEYFRAME_FILE)).unwrap();
        assert_eq!(text, "0 0 0 1 4 5 6\n");
    }
}
