//! Camera-space positions of detections and nearest-neighbour risk tiers.

use depthcal_core::{
    back_project, to_depth_raster_coords, BackProjectionConvention, DepthPoint, DepthRaster,
    PinholeIntrinsics, Pt2, Real, Viewport,
};
use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CalibrationResult, DetectionBox};

/// Camera-space position of one detection plus its metric ray depth.
pub type Detection3D = DepthPoint;

/// Proximity band of a detection's nearest neighbour.
///
/// The bands are open: a distance of exactly 1.0 or 2.0 m belongs to none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Safe,
    Warning,
    Danger,
}

impl RiskTier {
    /// Below this distance (m) a pair is dangerous.
    pub const DANGER_DISTANCE: Real = 1.0;
    /// Above this distance (m) a pair is safe.
    pub const SAFE_DISTANCE: Real = 2.0;

    /// Tier of a detection from its nearest-neighbour distance.
    pub fn classify(distance: Real) -> Option<Self> {
        if distance > Self::SAFE_DISTANCE {
            Some(RiskTier::Safe)
        } else if distance > Self::DANGER_DISTANCE && distance < Self::SAFE_DISTANCE {
            Some(RiskTier::Warning)
        } else if distance < Self::DANGER_DISTANCE {
            Some(RiskTier::Danger)
        } else {
            None
        }
    }

    /// Tier of a connecting edge. Only close pairs get an edge, and here the
    /// lower boundary is inclusive: `[1.0, 2.0)` is a warning edge.
    pub fn classify_edge(distance: Real) -> Option<Self> {
        if distance < Self::DANGER_DISTANCE {
            Some(RiskTier::Danger)
        } else if distance >= Self::DANGER_DISTANCE && distance < Self::SAFE_DISTANCE {
            Some(RiskTier::Warning)
        } else {
            None
        }
    }

    /// Colour name used by the renderer and in exports.
    pub fn color_name(self) -> &'static str {
        match self {
            RiskTier::Safe => "GREEN",
            RiskTier::Warning => "YELLOW",
            RiskTier::Danger => "RED",
        }
    }
}

/// Format a distance for display: truncated toward zero to two decimals,
/// trailing zeros dropped.
pub fn format_distance(distance: Real) -> String {
    if !distance.is_finite() {
        return distance.to_string();
    }
    let truncated = (distance * 100.0).trunc() / 100.0;
    let text = format!("{truncated:.2}");
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Nearest other detection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub index: usize,
    pub distance: Real,
}

/// One detection after back-projection and classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackedDetection {
    pub index: usize,
    pub point: Detection3D,
    /// `None` with fewer than two detections.
    pub nearest: Option<Neighbor>,
    /// `None` with fewer than two detections or on a band boundary.
    pub tier: Option<RiskTier>,
}

/// An unordered pair of detection indices, stored with `first < second`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProximityPair {
    pub first: usize,
    pub second: usize,
    pub distance: Real,
}

impl ProximityPair {
    pub fn new(a: usize, b: usize, distance: Real) -> Self {
        Self {
            first: a.min(b),
            second: a.max(b),
            distance,
        }
    }

    pub fn connects(&self, a: usize, b: usize) -> bool {
        self.first == a.min(b) && self.second == a.max(b)
    }

    pub fn edge_tier(&self) -> Option<RiskTier> {
        RiskTier::classify_edge(self.distance)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProximityReport {
    pub detections: Vec<TrackedDetection>,
    /// Every nearest-neighbour link, one entry per unordered pair.
    pub links: Vec<ProximityPair>,
    /// Links close enough to be drawn as an edge (see [`RiskTier::classify_edge`]).
    pub pairs: Vec<ProximityPair>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProximityOptions {
    pub convention: BackProjectionConvention,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProximityError {
    #[error("camera intrinsics are not set")]
    MissingIntrinsics,
    #[error("invalid camera intrinsics {0:?}")]
    InvalidIntrinsics(PinholeIntrinsics),
    #[error("calibrated depth is not set")]
    MissingDepth,
}

/// Nearest neighbours, tiers and deduplicated pairs for camera-space points.
///
/// For each `i` the neighbour is the first `j != i` with the smallest
/// distance. The relation is not symmetric; the link `(i, j)` is recorded
/// once per unordered pair, with the distance of the detection that added it.
/// Links at 2 m or more stay in `links` but are not reported as pairs.
pub fn proximity_from_points(points: &[Detection3D]) -> ProximityReport {
    if points.len() < 2 {
        debug!("{} detection(s), skipping pairwise distances", points.len());
        return ProximityReport {
            detections: points
                .iter()
                .enumerate()
                .map(|(index, p)| TrackedDetection {
                    index,
                    point: *p,
                    nearest: None,
                    tier: None,
                })
                .collect(),
            ..ProximityReport::default()
        };
    }

    let mut detections = Vec::with_capacity(points.len());
    let mut links: Vec<ProximityPair> = Vec::new();

    for (i, p) in points.iter().enumerate() {
        let mut nearest: Option<Neighbor> = None;
        for (j, q) in points.iter().enumerate() {
            if i == j {
                continue;
            }
            let distance = p.distance_to(q);
            if distance < nearest.map_or(Real::INFINITY, |n| n.distance) {
                nearest = Some(Neighbor { index: j, distance });
            }
        }

        if let Some(n) = nearest {
            if !links.iter().any(|link| link.connects(i, n.index)) {
                links.push(ProximityPair::new(i, n.index, n.distance));
            }
        }

        detections.push(TrackedDetection {
            index: i,
            point: *p,
            nearest,
            tier: nearest.and_then(|n| RiskTier::classify(n.distance)),
        });
    }

    let pairs = links
        .iter()
        .filter(|link| link.edge_tier().is_some())
        .copied()
        .collect();

    ProximityReport {
        detections,
        links,
        pairs,
    }
}

/// Back-projects detections through a calibrated disparity raster.
///
/// Detection boxes are in screen pixels; the raster may have a different
/// resolution, in which case [`set_viewport`](Self::set_viewport) tells the
/// tracker how to map between them. Without a viewport the raster is assumed
/// to match the screen.
#[derive(Debug, Clone, Default)]
pub struct ProximityTracker {
    intrinsics: Option<PinholeIntrinsics>,
    depth: Option<(DepthRaster, CalibrationResult)>,
    viewport: Option<Viewport>,
    options: ProximityOptions,
}

impl ProximityTracker {
    pub fn new(options: ProximityOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn set_intrinsics(&mut self, fx: Real, fy: Real, cx: Real, cy: Real) {
        self.intrinsics = Some(PinholeIntrinsics::new(fx, fy, cx, cy));
    }

    /// Normalized disparity raster plus the calibration mapping it to
    /// inverse depth.
    pub fn set_calibrated_depth(&mut self, raster: DepthRaster, scale: Real, shift: Real) {
        self.depth = Some((raster, CalibrationResult::new(scale, shift)));
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    pub fn options(&self) -> &ProximityOptions {
        &self.options
    }

    /// Camera-space position of one detection's centroid.
    pub fn locate(&self, detection: &DetectionBox) -> Result<Detection3D, ProximityError> {
        let k = self.valid_intrinsics()?;
        let (raster, calibration) = self.depth.as_ref().ok_or(ProximityError::MissingDepth)?;
        Ok(self.locate_with(detection, k, raster, calibration))
    }

    /// Back-project every detection and classify nearest-neighbour risk.
    pub fn compute_proximity(
        &self,
        detections: &[DetectionBox],
    ) -> Result<ProximityReport, ProximityError> {
        let k = self.valid_intrinsics()?;
        let (raster, calibration) = self.depth.as_ref().ok_or(ProximityError::MissingDepth)?;
        let points: Vec<Detection3D> = detections
            .iter()
            .map(|d| self.locate_with(d, k, raster, calibration))
            .collect();
        Ok(proximity_from_points(&points))
    }

    /// Metric depth at a screen pixel.
    pub fn depth_at(&self, u: usize, v: usize) -> Result<Real, ProximityError> {
        let (raster, calibration) = self.depth.as_ref().ok_or(ProximityError::MissingDepth)?;
        Ok(self.sample_depth(u, v, raster, calibration))
    }

    fn valid_intrinsics(&self) -> Result<&PinholeIntrinsics, ProximityError> {
        let k = self
            .intrinsics
            .as_ref()
            .ok_or(ProximityError::MissingIntrinsics)?;
        if !k.is_valid() {
            return Err(ProximityError::InvalidIntrinsics(*k));
        }
        Ok(k)
    }

    fn sample_depth(
        &self,
        u: usize,
        v: usize,
        raster: &DepthRaster,
        calibration: &CalibrationResult,
    ) -> Real {
        let (ru, rv) = match self.viewport {
            Some(vp) if !vp.is_empty() => to_depth_raster_coords(
                &Pt2::new(u as Real, v as Real),
                raster.width() as Real / vp.width as Real,
                raster.height() as Real / vp.height as Real,
            )
            .unwrap_or((0, 0)),
            _ => (u, v),
        };
        calibration.metric_depth(raster.get_clamped(ru, rv))
    }

    fn locate_with(
        &self,
        detection: &DetectionBox,
        k: &PinholeIntrinsics,
        raster: &DepthRaster,
        calibration: &CalibrationResult,
    ) -> Detection3D {
        let (u, v) = detection.centroid_pixel();
        let depth = self.sample_depth(u, v, raster, calibration);
        back_project(u as Real, v as Real, depth, k, self.options.convention)
    }
}
