//! One-shot pipeline for a single frame: normalize, calibrate, locate,
//! classify.

use depthcal_core::{DepthRaster, PinholeIntrinsics, Pt3, Real, SparsePoint};
use log::info;
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    format_distance, CalibrationConfigError, CalibrationOptions, CalibrationState,
    CalibrationStatus, CameraSnapshot, DepthCalibrator, DetectionBox, DetectionFilter,
    ProximityError, ProximityOptions, ProximityTracker, RiskTier,
};

/// Everything observed in one frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameInput {
    /// Raw (un-normalized) disparity from the depth model.
    pub disparity: DepthRaster,
    /// Sparse world points with confidence.
    pub points: Vec<SparsePoint>,
    pub camera: CameraSnapshot,
    /// Screen-space intrinsics.
    pub intrinsics: PinholeIntrinsics,
    #[serde(default)]
    pub detections: Vec<DetectionBox>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub calibration: CalibrationOptions,
    pub detection_filter: DetectionFilter,
    pub proximity: ProximityOptions,
    /// Seed for the RANSAC sampler when the caller does not supply one.
    pub seed: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationOptions::default(),
            detection_filter: DetectionFilter::default(),
            proximity: ProximityOptions::default(),
            seed: 1_234_567,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameError {
    #[error("camera viewport is empty")]
    EmptyViewport,
    #[error("invalid intrinsics: {0:?}")]
    InvalidIntrinsics(PinholeIntrinsics),
    #[error(transparent)]
    Config(#[from] CalibrationConfigError),
    #[error(transparent)]
    Proximity(#[from] ProximityError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSummary {
    pub scale: Real,
    pub shift: Real,
    /// True when this frame produced a new fit.
    pub fresh: bool,
    pub status: CalibrationStatus,
    pub num_samples: usize,
    pub consensus_size: usize,
    pub iterations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionReport {
    /// Index among the accepted detections.
    pub index: usize,
    /// Index in the frame's raw detection list.
    pub source_index: usize,
    pub label: String,
    pub confidence: Real,
    /// `[left, top, right, bottom]` in screen pixels.
    pub bbox: [Real; 4],
    pub position: Pt3,
    pub depth: Real,
    pub depth_label: String,
    pub nearest: Option<usize>,
    pub nearest_distance: Option<Real>,
    pub tier: Option<RiskTier>,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairReport {
    pub first: usize,
    pub second: usize,
    pub distance: Real,
    pub distance_label: String,
    pub edge_tier: Option<RiskTier>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub calibration: CalibrationSummary,
    pub intrinsics: PinholeIntrinsics,
    pub detections: Vec<DetectionReport>,
    pub pairs: Vec<PairReport>,
}

#[derive(Debug, Clone)]
pub struct FrameOutput {
    pub report: FrameReport,
    /// Calibration state to thread into the next frame.
    pub state: CalibrationState,
    pub normalized: DepthRaster,
}

/// Process one frame end to end.
///
/// Calibration failures are not errors: the previous state is kept and the
/// summary reports `fresh == false`.
pub fn run_frame<R: Rng + ?Sized>(
    input: &FrameInput,
    config: &PipelineConfig,
    state: CalibrationState,
    rng: &mut R,
) -> Result<FrameOutput, FrameError> {
    if input.camera.viewport.is_empty() {
        return Err(FrameError::EmptyViewport);
    }
    if !input.intrinsics.is_valid() {
        return Err(FrameError::InvalidIntrinsics(input.intrinsics));
    }

    let calibrator = DepthCalibrator::new(config.calibration.clone())?;
    let normalized = input.disparity.normalized();
    let outcome = calibrator.calibrate(state, &normalized, &input.points, &input.camera, rng);
    let result = outcome.result();

    let accepted = config.detection_filter.accepted_indices(&input.detections);
    let boxes: Vec<DetectionBox> = accepted
        .iter()
        .map(|&i| input.detections[i].clone())
        .collect();

    let k = input.intrinsics;
    let mut tracker = ProximityTracker::new(config.proximity);
    tracker.set_intrinsics(k.fx, k.fy, k.cx, k.cy);
    tracker.set_viewport(input.camera.viewport);
    tracker.set_calibrated_depth(normalized.clone(), result.scale, result.shift);
    let proximity = tracker.compute_proximity(&boxes)?;

    let detections = proximity
        .detections
        .iter()
        .zip(accepted.iter().zip(&boxes))
        .map(|(tracked, (&source_index, b))| DetectionReport {
            index: tracked.index,
            source_index,
            label: b.label.clone(),
            confidence: b.confidence,
            bbox: [b.left, b.top, b.right, b.bottom],
            position: tracked.point.position,
            depth: tracked.point.depth,
            depth_label: format_distance(tracked.point.depth),
            nearest: tracked.nearest.map(|n| n.index),
            nearest_distance: tracked.nearest.map(|n| n.distance),
            tier: tracked.tier,
            color: tracked.tier.map(|t| t.color_name().to_string()),
        })
        .collect();

    let pairs: Vec<PairReport> = proximity
        .pairs
        .iter()
        .map(|p| PairReport {
            first: p.first,
            second: p.second,
            distance: p.distance,
            distance_label: format_distance(p.distance),
            edge_tier: p.edge_tier(),
        })
        .collect();

    info!(
        "frame: {} of {} detections accepted, {} close pairs, calibration {:?}",
        boxes.len(),
        input.detections.len(),
        pairs.len(),
        outcome.status
    );

    let report = FrameReport {
        calibration: CalibrationSummary {
            scale: result.scale,
            shift: result.shift,
            fresh: outcome.is_fresh(),
            status: outcome.status,
            num_samples: outcome.num_samples,
            consensus_size: outcome.consensus.len(),
            iterations: outcome.iterations,
        },
        intrinsics: k,
        detections,
        pairs,
    };

    Ok(FrameOutput {
        report,
        state: outcome.state,
        normalized,
    })
}
