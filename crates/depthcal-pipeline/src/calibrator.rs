//! Robust affine calibration of a normalized disparity raster against sparse
//! metric points.
//!
//! The only cross-frame state is the last valid [`CalibrationResult`], carried
//! in a [`CalibrationState`] that the caller passes in and gets back.

use std::time::Duration;

use depthcal_core::{
    distance_to_camera, ransac, to_depth_raster_coords, world_to_screen_pixel,
    CalibrationSample, DepthRaster, Estimator, Mat4, Pt3, RansacOptions, Real, SparsePoint,
    TieBreak, Viewport,
};
use depthcal_linear::{fit_affine, AffineFitError, AffineModel};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Affine map from normalized disparity to metric inverse depth,
/// `1/depth = disparity · scale + shift`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationResult {
    pub scale: Real,
    pub shift: Real,
}

impl Default for CalibrationResult {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CalibrationResult {
    /// Value used before any successful fit.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        shift: 0.0,
    };

    pub fn new(scale: Real, shift: Real) -> Self {
        Self { scale, shift }
    }

    /// Metric inverse depth for a disparity value.
    pub fn inverse_depth(&self, disparity: Real) -> Real {
        disparity * self.scale + self.shift
    }

    /// Metric depth `1 / (disparity · scale + shift)`.
    pub fn metric_depth(&self, disparity: Real) -> Real {
        1.0 / self.inverse_depth(disparity)
    }
}

impl From<AffineModel> for CalibrationResult {
    fn from(m: AffineModel) -> Self {
        Self {
            scale: m.scale,
            shift: m.shift,
        }
    }
}

/// Calibration carried from one frame to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    /// Last published calibration (identity before the first fit).
    pub result: CalibrationResult,
    /// Number of frames that produced a fresh fit so far.
    #[serde(default)]
    pub fitted_frames: usize,
}

impl CalibrationState {
    /// Whether any frame has ever produced a fit.
    pub fn has_fit(&self) -> bool {
        self.fitted_frames > 0
    }
}

/// How a calibration call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalibrationStatus {
    /// At least one candidate was accepted; the result is fresh.
    Fitted,
    /// No sparse point projected onto the screen; prior result kept.
    NoSamples,
    /// Samples existed but every candidate was singular or invalid; prior
    /// result kept.
    NoValidModel,
}

/// Everything a calibration call produced.
#[derive(Debug, Clone)]
pub struct CalibrationOutcome {
    /// State to thread into the next call.
    pub state: CalibrationState,
    pub status: CalibrationStatus,
    /// Number of valid calibration samples.
    pub num_samples: usize,
    /// Sample indices of the best consensus set.
    pub consensus: Vec<usize>,
    pub iterations: usize,
    /// How many times the published value changed during the call.
    pub adoptions: usize,
    /// Candidates skipped as singular or invalid.
    pub rejected: usize,
}

impl CalibrationOutcome {
    /// Whether the returned calibration was fitted in this call.
    pub fn is_fresh(&self) -> bool {
        self.status == CalibrationStatus::Fitted
    }

    pub fn result(&self) -> CalibrationResult {
        self.state.result
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationConfigError {
    #[error("iterations must be positive")]
    NoIterations,
    #[error("inlier fraction must lie in (0, 1], got {0}")]
    InlierFraction(Real),
    #[error("normalized threshold must lie in (0, 1], got {0}")]
    Threshold(Real),
}

/// RANSAC parameters for the disparity calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationOptions {
    /// Number of RANSAC iterations.
    pub iterations: usize,
    /// Threshold on the min–max normalized squared residual.
    pub normalized_threshold: Real,
    /// Fraction of the samples drawn as the fitting subset.
    pub inlier_fraction: Real,
    /// Rule for equal consensus sizes.
    pub tie_break: TieBreak,
    /// Optional wall-clock budget for the RANSAC loop in milliseconds.
    pub time_budget_ms: Option<u64>,
}

impl Default for CalibrationOptions {
    fn default() -> Self {
        Self {
            iterations: 200,
            normalized_threshold: 0.08,
            inlier_fraction: 0.3,
            tie_break: TieBreak::LastWins,
            time_budget_ms: None,
        }
    }
}

impl CalibrationOptions {
    /// Fewer iterations with a looser threshold.
    pub fn lightweight() -> Self {
        Self {
            iterations: 100,
            normalized_threshold: 0.1,
            inlier_fraction: 0.33,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CalibrationConfigError> {
        if self.iterations == 0 {
            return Err(CalibrationConfigError::NoIterations);
        }
        if !(self.inlier_fraction > 0.0 && self.inlier_fraction <= 1.0) {
            return Err(CalibrationConfigError::InlierFraction(self.inlier_fraction));
        }
        if !(self.normalized_threshold > 0.0 && self.normalized_threshold <= 1.0) {
            return Err(CalibrationConfigError::Threshold(self.normalized_threshold));
        }
        Ok(())
    }

    pub fn ransac_options(&self) -> RansacOptions {
        RansacOptions {
            max_iters: self.iterations,
            subset_fraction: self.inlier_fraction,
            normalized_threshold: self.normalized_threshold,
            tie_break: self.tie_break,
            time_budget: self.time_budget_ms.map(Duration::from_millis),
        }
    }
}

/// Camera snapshot taken together with the sparse points of one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraSnapshot {
    /// Camera center in world coordinates.
    pub translation: Pt3,
    /// World-to-camera matrix, column-major.
    pub view: Mat4,
    /// Perspective matrix, column-major.
    pub projection: Mat4,
    /// Rendered view size in pixels.
    pub viewport: Viewport,
}

/// Affine disparity → inverse-depth model for the RANSAC engine.
pub struct DisparityEstimator;

impl Estimator for DisparityEstimator {
    type Datum = CalibrationSample;
    type Model = AffineModel;

    fn fit(data: &[CalibrationSample], sample_indices: &[usize]) -> Option<AffineModel> {
        let pairs = sample_indices
            .iter()
            .map(|&i| (data[i].prediction, data[i].ground_truth));
        match fit_affine(pairs) {
            Ok(model) if model.scale > 0.0 => Some(model),
            Ok(model) => {
                debug!("rejecting candidate with scale {}", model.scale);
                None
            }
            Err(AffineFitError::SingularSystem { det }) => {
                debug!("rejecting singular subset (det = {det})");
                None
            }
            Err(err) => {
                debug!("rejecting candidate: {err}");
                None
            }
        }
    }

    fn residual(model: &AffineModel, datum: &CalibrationSample) -> f64 {
        model.squared_residual(datum.prediction, datum.ground_truth)
    }

    fn is_publishable(model: &AffineModel) -> bool {
        model.scale.is_finite()
    }
}

/// Build calibration samples from the sparse points visible on screen.
///
/// `normalized` is the min–max normalized disparity raster of the same frame.
/// Projections are truncated to integer screen pixels before the viewport
/// check and the raster scaling, the same way detection centroids are.
/// Points behind the camera, off screen, at the camera center, or landing on a
/// non-finite raster value are skipped.
pub fn collect_samples(
    normalized: &DepthRaster,
    points: &[SparsePoint],
    camera: &CameraSnapshot,
) -> Vec<CalibrationSample> {
    let vp = camera.viewport;
    if vp.is_empty() {
        return Vec::new();
    }
    let width = vp.width as Real;
    let height = vp.height as Real;
    let scale_x = normalized.width() as Real / width;
    let scale_y = normalized.height() as Real / height;

    points
        .iter()
        .filter_map(|sp| {
            let screen =
                world_to_screen_pixel(&sp.position, &camera.view, &camera.projection, width, height)?;
            if !vp.contains(screen.x, screen.y) {
                return None;
            }
            let distance = distance_to_camera(&sp.position, &camera.translation);
            if !(distance > 0.0) {
                return None;
            }
            let (u, v) = to_depth_raster_coords(&screen, scale_x, scale_y)?;
            let prediction = normalized.get(u, v)?;
            prediction
                .is_finite()
                .then(|| CalibrationSample::new(1.0 / distance, prediction))
        })
        .collect()
}

/// RANSAC calibrator for one frame at a time.
#[derive(Debug, Clone)]
pub struct DepthCalibrator {
    options: CalibrationOptions,
}

impl DepthCalibrator {
    pub fn new(options: CalibrationOptions) -> Result<Self, CalibrationConfigError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &CalibrationOptions {
        &self.options
    }

    /// Calibrate one frame.
    ///
    /// Never fails: degenerate frames return `previous` unchanged with a
    /// status explaining why.
    pub fn calibrate<R: Rng + ?Sized>(
        &self,
        previous: CalibrationState,
        normalized: &DepthRaster,
        points: &[SparsePoint],
        camera: &CameraSnapshot,
        rng: &mut R,
    ) -> CalibrationOutcome {
        let samples = collect_samples(normalized, points, camera);
        debug!(
            "{} of {} sparse points usable for calibration",
            samples.len(),
            points.len()
        );
        self.calibrate_samples(previous, &samples, rng)
    }

    /// Run the RANSAC fit on precomputed samples.
    pub fn calibrate_samples<R: Rng + ?Sized>(
        &self,
        previous: CalibrationState,
        samples: &[CalibrationSample],
        rng: &mut R,
    ) -> CalibrationOutcome {
        if samples.is_empty() {
            warn!("no calibration samples on screen, keeping previous calibration");
            return CalibrationOutcome {
                state: previous,
                status: CalibrationStatus::NoSamples,
                num_samples: 0,
                consensus: Vec::new(),
                iterations: 0,
                adoptions: 0,
                rejected: 0,
            };
        }

        let res = ransac::<DisparityEstimator, _>(samples, &self.options.ransac_options(), rng);

        let (state, status) = match res.model {
            Some(model) if res.success => {
                let result = CalibrationResult::from(model);
                info!(
                    "calibrated scale {:.5} shift {:.5} (consensus {}/{})",
                    result.scale,
                    result.shift,
                    res.consensus.len(),
                    samples.len()
                );
                (
                    CalibrationState {
                        result,
                        fitted_frames: previous.fitted_frames + 1,
                    },
                    CalibrationStatus::Fitted,
                )
            }
            _ => {
                warn!(
                    "no valid model from {} samples ({} candidates rejected), keeping previous calibration",
                    samples.len(),
                    res.rejected
                );
                (previous, CalibrationStatus::NoValidModel)
            }
        };

        CalibrationOutcome {
            state,
            status,
            num_samples: samples.len(),
            consensus: res.consensus,
            iterations: res.iters,
            adoptions: res.adoptions,
            rejected: res.rejected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn calibrator() -> DepthCalibrator {
        DepthCalibrator::new(CalibrationOptions::default()).unwrap()
    }

    #[test]
    fn identity_before_first_fit() {
        let state = CalibrationState::default();
        assert_eq!(state.result, CalibrationResult::new(1.0, 0.0));
        assert!(!state.has_fit());
    }

    #[test]
    fn metric_depth_inverts_affine() {
        let c = CalibrationResult::new(2.0, 0.5);
        assert!((c.metric_depth(0.75) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn options_validation() {
        assert!(CalibrationOptions::default().validate().is_ok());
        assert!(CalibrationOptions::lightweight().validate().is_ok());
        let bad = CalibrationOptions {
            inlier_fraction: 0.0,
            ..CalibrationOptions::default()
        };
        assert_eq!(
            DepthCalibrator::new(bad).unwrap_err(),
            CalibrationConfigError::InlierFraction(0.0)
        );
        let bad = CalibrationOptions {
            iterations: 0,
            ..CalibrationOptions::default()
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn no_samples_keeps_previous() {
        let previous = CalibrationState {
            result: CalibrationResult::new(3.0, 0.2),
            fitted_frames: 4,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let out = calibrator().calibrate_samples(previous, &[], &mut rng);
        assert_eq!(out.status, CalibrationStatus::NoSamples);
        assert_eq!(out.state, previous);
        assert!(!out.is_fresh());
    }

    #[test]
    fn singular_samples_keep_previous() {
        // identical predictions: every subset is singular
        let samples: Vec<_> = (0..30)
            .map(|i| CalibrationSample::new(0.1 * i as Real, 0.5))
            .collect();
        let previous = CalibrationState {
            result: CalibrationResult::new(1.5, 0.1),
            fitted_frames: 1,
        };
        let mut rng = StdRng::seed_from_u64(0);
        let out = calibrator().calibrate_samples(previous, &samples, &mut rng);
        assert_eq!(out.status, CalibrationStatus::NoValidModel);
        assert_eq!(out.state, previous);
        assert_eq!(out.rejected, out.iterations);
    }

    #[test]
    fn negative_slope_is_rejected() {
        let samples: Vec<_> = (0..30)
            .map(|i| {
                let p = i as Real / 30.0;
                CalibrationSample::new(1.0 - 0.5 * p, p)
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(0);
        let out = calibrator().calibrate_samples(CalibrationState::default(), &samples, &mut rng);
        assert_eq!(out.status, CalibrationStatus::NoValidModel);
        assert_eq!(out.result(), CalibrationResult::IDENTITY);
    }

    #[test]
    fn exact_samples_are_recovered() {
        let samples: Vec<_> = (0..50)
            .map(|i| {
                let p = i as Real / 50.0;
                CalibrationSample::new(1.7 * p + 0.12, p)
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(5);
        let out = calibrator().calibrate_samples(CalibrationState::default(), &samples, &mut rng);
        assert!(out.is_fresh());
        assert!((out.result().scale - 1.7).abs() < 1e-9);
        assert!((out.result().shift - 0.12).abs() < 1e-9);
        assert_eq!(out.state.fitted_frames, 1);
        assert!(out.consensus.len() <= samples.len());
    }

    #[test]
    fn samples_use_truncated_screen_pixels() {
        let camera = CameraSnapshot {
            translation: Pt3::new(0.0, 0.0, 5.0),
            view: Mat4::identity(),
            projection: Mat4::identity(),
            viewport: Viewport::new(10, 10),
        };
        let raster = DepthRaster::from_fn(7, 7, |u, _| u as Real * 0.25);
        let points = [
            // screen x = 2.9 -> pixel 2 -> raster u = (2 * 0.7) as usize = 1
            SparsePoint::new(-0.42, 0.0, 0.0, 1.0),
            // screen x = -0.5 -> pixel 0, still on screen
            SparsePoint::new(-1.1, 0.0, 0.0, 1.0),
        ];
        let samples = collect_samples(&raster, &points, &camera);
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].prediction, 0.25);
        assert_eq!(samples[1].prediction, 0.0);
        assert!((samples[0].ground_truth - 1.0 / Pt3::new(-0.42, 0.0, -5.0).coords.norm()).abs() < 1e-12);
    }

    #[test]
    fn options_roundtrip_through_json_with_defaults() {
        let opts: CalibrationOptions = serde_json::from_str(r#"{"iterations": 10}"#).unwrap();
        assert_eq!(opts.iterations, 10);
        assert_eq!(opts.normalized_threshold, 0.08);
        assert_eq!(opts.tie_break, TieBreak::LastWins);
    }
}
