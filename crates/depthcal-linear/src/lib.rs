//! Closed-form linear solvers used by the depth calibrator.

mod affine;

pub use affine::*;
