use depthcal_core::Real;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum AffineFitError {
    #[error("normal equations are singular (det = {det})")]
    SingularSystem { det: Real },
    #[error("fitted scale {scale} / shift {shift} is not finite")]
    NonFinite { scale: Real, shift: Real },
}

/// `y ≈ scale · x + shift`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineModel {
    pub scale: Real,
    pub shift: Real,
}

impl AffineModel {
    pub fn apply(&self, x: Real) -> Real {
        x * self.scale + self.shift
    }

    /// Squared residual `(scale · x + shift - y)²`.
    pub fn squared_residual(&self, x: Real, y: Real) -> Real {
        let r = self.apply(x) - y;
        r * r
    }
}

/// Least-squares fit of `y = scale · x + shift` via the 2×2 normal equations.
///
/// ```text
/// | Σx²  Σx | |scale|   | Σxy |
/// | Σx   n  | |shift| = | Σy  |
/// ```
///
/// The determinant must be strictly positive; a non-positive determinant
/// (fewer than two distinct `x`) is reported as [`AffineFitError::SingularSystem`].
pub fn fit_affine<I>(pairs: I) -> Result<AffineModel, AffineFitError>
where
    I: IntoIterator<Item = (Real, Real)>,
{
    let mut a00 = 0.0;
    let mut a01 = 0.0;
    let mut a11 = 0.0;
    let mut b0 = 0.0;
    let mut b1 = 0.0;

    for (x, y) in pairs {
        a00 += x * x;
        a01 += x;
        a11 += 1.0;
        b0 += x * y;
        b1 += y;
    }

    let det = a00 * a11 - a01 * a01;
    if !(det > 0.0) {
        return Err(AffineFitError::SingularSystem { det });
    }

    let scale = (a11 * b0 - a01 * b1) / det;
    let shift = (-a01 * b0 + a00 * b1) / det;
    if !scale.is_finite() || !shift.is_finite() {
        return Err(AffineFitError::NonFinite { scale, shift });
    }

    Ok(AffineModel { scale, shift })
}
