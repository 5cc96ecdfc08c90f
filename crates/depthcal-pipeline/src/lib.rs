//! Per-frame depth calibration and proximity tracking.
//!
//! [`DepthCalibrator`] fits the affine map from normalized disparity to
//! inverse metric depth against sparse world points, [`ProximityTracker`]
//! places detections in camera space and classifies nearest-neighbour risk,
//! and [`run_frame`] chains both for one frame.

mod calibrator;
mod detection;
mod frame;
pub mod io;
mod proximity;
mod reconstruction;

pub use calibrator::*;
pub use detection::*;
pub use frame::*;
pub use proximity::*;
pub use reconstruction::*;
