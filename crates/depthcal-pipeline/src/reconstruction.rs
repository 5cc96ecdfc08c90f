//! Metric point clouds from a calibrated disparity raster.

use depthcal_core::{
    back_project, BackProjectionConvention, DepthPoint, DepthRaster, PinholeIntrinsics, Real,
};

use crate::{CalibrationResult, DetectionBox};

/// Back-project every `stride`-th raster pixel (in both directions).
///
/// `intrinsics` must be expressed in raster pixels (see
/// [`PinholeIntrinsics::scaled`]). Pixels whose calibrated depth is not finite
/// and positive are skipped. A stride of zero is treated as one.
pub fn reconstruct_point_cloud(
    raster: &DepthRaster,
    calibration: &CalibrationResult,
    intrinsics: &PinholeIntrinsics,
    convention: BackProjectionConvention,
    stride: usize,
) -> Vec<DepthPoint> {
    let stride = stride.max(1);
    let mut cloud = Vec::with_capacity((raster.width() / stride + 1) * (raster.height() / stride + 1));
    for v in (0..raster.height()).step_by(stride) {
        for u in (0..raster.width()).step_by(stride) {
            let Some(disparity) = raster.get(u, v) else {
                continue;
            };
            let depth = calibration.metric_depth(disparity);
            if !(depth.is_finite() && depth > 0.0) {
                continue;
            }
            cloud.push(back_project(u as Real, v as Real, depth, intrinsics, convention));
        }
    }
    cloud
}

/// Back-project the corners of a detection box at one depth, in drawing
/// order (left-top, right-top, right-bottom, left-bottom).
///
/// Screen-space intrinsics are expected since the box is in screen pixels.
pub fn box_outline(
    detection: &DetectionBox,
    depth: Real,
    intrinsics: &PinholeIntrinsics,
    convention: BackProjectionConvention,
) -> [DepthPoint; 4] {
    detection
        .corners()
        .map(|c| back_project(c.x, c.y, depth, intrinsics, convention))
}
