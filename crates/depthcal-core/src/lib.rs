//! Core math and geometry primitives for metric depth calibration.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec3`, `Pt3`, `Mat4`, ...),
//! - a pinhole intrinsics model with a configurable back-projection convention,
//! - the geometric projector (world → screen → depth raster, pixel → camera),
//! - a disparity raster with min–max normalization,
//! - a subset-consensus RANSAC engine (`ransac`, [`Estimator`]).
//!
//! Coordinate chain used by the calibrator:
//! `raster(u, v) = scale ∘ viewport ∘ ndc(projection · view · world)`

/// Linear algebra type aliases and helpers.
pub mod math;
/// Camera intrinsics.
pub mod models;
/// Coordinate transforms between world, screen, raster and camera space.
pub mod projector;
/// Dense disparity rasters.
pub mod raster;
/// Subset-consensus RANSAC engine and traits.
pub mod ransac;
/// Synthetic scenes for tests and demos.
pub mod synthetic;
/// Shared data records.
pub mod types;

pub use math::*;
pub use models::*;
pub use projector::*;
pub use raster::*;
pub use ransac::*;
pub use types::*;
