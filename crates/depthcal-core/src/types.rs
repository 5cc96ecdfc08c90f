use serde::{Deserialize, Serialize};

use crate::{Pt3, Real};

/// A metrically-known world-space feature point from the tracking subsystem.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparsePoint {
    /// World-space position in meters.
    pub position: Pt3,
    /// Tracker confidence for this point.
    pub confidence: Real,
}

impl SparsePoint {
    pub fn new(x: Real, y: Real, z: Real, confidence: Real) -> Self {
        Self {
            position: Pt3::new(x, y, z),
            confidence,
        }
    }

    /// Parse a flat `[x, y, z, confidence, x, y, z, confidence, ...]` buffer.
    ///
    /// A trailing partial record is ignored.
    pub fn from_flat(values: &[Real]) -> Vec<Self> {
        values
            .chunks_exact(4)
            .map(|c| Self::new(c[0], c[1], c[2], c[3]))
            .collect()
    }
}

/// One ground-truth / prediction pair used by the depth calibrator.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    /// Metric inverse depth, `1 / distance_to_camera`.
    pub ground_truth: Real,
    /// Normalized disparity sampled from the raster.
    pub prediction: Real,
}

impl CalibrationSample {
    pub fn new(ground_truth: Real, prediction: Real) -> Self {
        Self {
            ground_truth,
            prediction,
        }
    }
}

/// A camera-space point together with the metric depth it was built from.
///
/// `depth` is the distance along the viewing ray, `position.z` the distance
/// along the optical axis.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DepthPoint {
    pub position: Pt3,
    pub depth: Real,
}

impl DepthPoint {
    pub fn new(position: Pt3, depth: Real) -> Self {
        Self { position, depth }
    }

    /// Euclidean distance between two camera-space points.
    pub fn distance_to(&self, other: &DepthPoint) -> Real {
        (self.position - other.position).norm()
    }

    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|c| c.is_finite()) && self.depth.is_finite()
    }
}

/// Size of the rendered camera view in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Whether a screen coordinate lies in `[0, width) × [0, height)`.
    pub fn contains(&self, x: Real, y: Real) -> bool {
        x >= 0.0 && y >= 0.0 && x < self.width as Real && y < self.height as Real
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_buffer_parsing_drops_partial_tail() {
        let pts = SparsePoint::from_flat(&[1.0, 2.0, 3.0, 0.9, 4.0, 5.0, 6.0, 0.5, 7.0]);
        assert_eq!(pts.len(), 2);
        assert_eq!(pts[1].position, Pt3::new(4.0, 5.0, 6.0));
        assert_eq!(pts[1].confidence, 0.5);
    }

    #[test]
    fn viewport_is_half_open() {
        let vp = Viewport::new(640, 480);
        assert!(vp.contains(0.0, 0.0));
        assert!(vp.contains(639.9, 479.9));
        assert!(!vp.contains(640.0, 10.0));
        assert!(!vp.contains(10.0, 480.0));
        assert!(!vp.contains(-0.1, 10.0));
        assert!(!vp.contains(Real::NAN, 10.0));
    }

    #[test]
    fn depth_point_distance() {
        let a = DepthPoint::new(Pt3::new(0.0, 0.0, 1.0), 1.0);
        let b = DepthPoint::new(Pt3::new(0.0, 0.0, 1.5), 1.5);
        assert!((a.distance_to(&b) - 0.5).abs() < 1e-12);
    }
}
