//! Voxel-grid centroid downsampling.
//!
//! Space is bucketed into cubes of edge `leaf_size`; every non-empty bucket
//! is replaced by the centroid of its points (position and intensity).
//! Output is ordered by bucket key, which makes the result independent of
//! input order and makes a second pass with the same leaf a no-op.

use std::collections::BTreeMap;

use nalgebra::Vector3;

use super::point::{FeaturePoint, PointCloud};

type VoxelKey = (i64, i64, i64);

#[derive(Default)]
struct Accumulator {
    position: Vector3<f64>,
    intensity: f64,
    count: usize,
}

/// Centroid voxel filter with a fixed leaf size.
#[derive(Debug, Clone, Copy)]
pub struct VoxelDownsampler {
    leaf_size: f64,
}

impl VoxelDownsampler {
    /// `leaf_size` must be positive; the config layer validates it.
    pub fn new(leaf_size: f64) -> Self {
        Self { leaf_size }
    }

    pub fn filter(&self, input: &[FeaturePoint]) -> PointCloud {
        let mut out = PointCloud::with_capacity(input.len());
        self.filter_into(input, &mut out);
        out
    }

    /// Filter `input` into `out`, which is cleared first.
    pub fn filter_into(&self, input: &[FeaturePoint], out: &mut PointCloud) {
        out.clear();
        if input.is_empty() {
            return;
        }

        let mut buckets: BTreeMap<VoxelKey, Accumulator> = BTreeMap::new();
        for p in input {
            let acc = buckets.entry(self.key(&p.position)).or_default();
            acc.position += p.position;
            acc.intensity += p.intensity;
            acc.count += 1;
        }

        out.extend(buckets.into_values().map(|acc| {
            let n = acc.count as f64;
            FeaturePoint::from_position(acc.position / n, acc.intensity / n)
        }));
    }

    #[inline]
    fn key(&self, p: &Vector3<f64>) -> VoxelKey {
        (
            (p.x / self.leaf_size).floor() as i64,
            (p.y / self.leaf_size).floor() as i64,
            (p.z / self.leaf_size).floor() as i64,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::{Rng, SeedableRng};

    fn random_cloud(n: usize, seed: u64) -> PointCloud {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n)
            .map(|_| {
                FeaturePoint::new(
                    rng.gen_range(-3.0..3.0),
                    rng.gen_range(-3.0..3.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(0.0..100.0),
                )
            })
            .collect()
    }

    #[test]
    fn test_empty_input() {
        let filter = VoxelDownsampler::new(0.2);
        assert!(filter.filter(&[]).is_empty());
    }

    #[test]
    fn test_single_bucket_centroid() {
        let filter = VoxelDownsampler::new(1.0);
        let cloud = vec![
            FeaturePoint::new(0.1, 0.1, 0.1, 10.0),
            FeaturePoint::new(0.3, 0.5, 0.7, 20.0),
            FeaturePoint::new(0.5, 0.3, 0.4, 30.0),
        ];

        let out = filter.filter(&cloud);

        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].position, Vector3::new(0.3, 0.3, 0.4), epsilon = 1e-12);
        assert_relative_eq!(out[0].intensity, 20.0);
    }

    #[test]
    fn test_negative_coordinates_use_floor() {
        let filter = VoxelDownsampler::new(1.0);
        let cloud = vec![
            FeaturePoint::new(-0.2, 0.5, 0.5, 0.0),
            FeaturePoint::new(0.2, 0.5, 0.5, 0.0),
        ];

        // -0.2 and 0.2 straddle the bucket boundary at zero.
        assert_eq!(filter.filter(&cloud).len(), 2);
    }

    #[test]
    fn test_idempotent() {
        let filter = VoxelDownsampler::new(0.25);
        let once = filter.filter(&random_cloud(5000, 7));
        let twice = filter.filter(&once);

        assert!(once.len() < 5000);
        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(twice.iter()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.intensity, b.intensity);
        }
    }

    #[test]
    fn test_order_independent() {
        let filter = VoxelDownsampler::new(0.5);
        let cloud = random_cloud(2000, 11);
        let mut shuffled = cloud.clone();
        shuffled.shuffle(&mut StdRng::seed_from_u64(3));

        let a = filter.filter(&cloud);
        let b = filter.filter(&shuffled);

        assert_eq!(a.len(), b.len());
        for (pa, pb) in a.iter().zip(b.iter()) {
            assert_relative_eq!(pa.position, pb.position, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_filter_into_reuses_buffer() {
        let filter = VoxelDownsampler::new(0.5);
        let mut scratch = vec![FeaturePoint::new(100.0, 100.0, 100.0, 1.0)];

        filter.filter_into(&random_cloud(100, 5), &mut scratch);

        assert!(scratch.iter().all(|p| p.position.x < 10.0));
    }
}
