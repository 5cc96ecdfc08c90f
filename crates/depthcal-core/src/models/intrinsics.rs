use serde::{Deserialize, Serialize};

use crate::{Mat4, Real, Vec2};

/// Sign convention used when turning a pixel offset into a ray slope.
///
/// The sparse-point source fixes the handedness of camera space, so this is a
/// configuration constant rather than a per-call choice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackProjectionConvention {
    /// `x/z = (cx - u) / fx`, `y/z = (cy - v) / fy`.
    #[default]
    PrincipalMinusPixel,
    /// `x/z = (u - cx) / fx`, `y/z = (v - cy) / fy` (OpenCV camera frame).
    PixelMinusPrincipal,
}

impl BackProjectionConvention {
    /// Signed offset of a pixel coordinate from the principal point.
    #[inline]
    pub fn offset(self, pixel: Real, principal: Real) -> Real {
        match self {
            BackProjectionConvention::PrincipalMinusPixel => principal - pixel,
            BackProjectionConvention::PixelMinusPrincipal => pixel - principal,
        }
    }
}

/// Pinhole intrinsics in pixels, without skew.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PinholeIntrinsics {
    /// Focal length in pixels along X.
    pub fx: Real,
    /// Focal length in pixels along Y.
    pub fy: Real,
    /// Principal point X coordinate in pixels.
    pub cx: Real,
    /// Principal point Y coordinate in pixels.
    pub cy: Real,
}

impl PinholeIntrinsics {
    pub fn new(fx: Real, fy: Real, cx: Real, cy: Real) -> Self {
        Self { fx, fy, cx, cy }
    }

    /// Derive pixel intrinsics from an OpenGL-style perspective matrix and a
    /// viewport of `width × height` pixels.
    ///
    /// Uses `fx = P00·w/2`, `fy = P11·h/2` and shifts the principal point by
    /// the off-axis terms `P02`, `P12`.
    pub fn from_gl_projection(projection: &Mat4, width: Real, height: Real) -> Self {
        let fx = projection[(0, 0)] * width / 2.0;
        let fy = projection[(1, 1)] * height / 2.0;
        let cx = (1.0 - projection[(0, 2)]) * width / 2.0;
        let cy = (1.0 + projection[(1, 2)]) * height / 2.0;
        Self { fx, fy, cx, cy }
    }

    /// Intrinsics for an image resampled by `(sx, sy)`, e.g. from screen
    /// pixels to depth-raster pixels.
    pub fn scaled(&self, sx: Real, sy: Real) -> Self {
        Self {
            fx: self.fx * sx,
            fy: self.fy * sy,
            cx: self.cx * sx,
            cy: self.cy * sy,
        }
    }

    /// Ray slopes `(x/z, y/z)` for a pixel under the given convention.
    pub fn ray_slopes(&self, u: Real, v: Real, convention: BackProjectionConvention) -> Vec2 {
        Vec2::new(
            convention.offset(u, self.cx) / self.fx,
            convention.offset(v, self.cy) / self.fy,
        )
    }

    /// Whether both focal lengths are finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.fx.is_finite()
            && self.fy.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.fx > 0.0
            && self.fy > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conventions_are_mirror_images() {
        let k = PinholeIntrinsics::new(500.0, 400.0, 320.0, 240.0);
        let a = k.ray_slopes(420.0, 140.0, BackProjectionConvention::PrincipalMinusPixel);
        let b = k.ray_slopes(420.0, 140.0, BackProjectionConvention::PixelMinusPrincipal);
        assert!((a.x + 0.2).abs() < 1e-12);
        assert!((a.y - 0.25).abs() < 1e-12);
        assert!((a + b).norm() < 1e-12);
    }

    #[test]
    fn from_symmetric_projection() {
        let mut p = Mat4::zeros();
        p[(0, 0)] = 2.0;
        p[(1, 1)] = 1.5;
        let k = PinholeIntrinsics::from_gl_projection(&p, 640.0, 480.0);
        assert_eq!(k.fx, 640.0);
        assert_eq!(k.fy, 360.0);
        assert_eq!(k.cx, 320.0);
        assert_eq!(k.cy, 240.0);
        assert!(k.is_valid());
    }

    #[test]
    fn scaling_preserves_ray_slopes() {
        let k = PinholeIntrinsics::new(500.0, 400.0, 320.0, 240.0);
        let half = k.scaled(0.5, 0.5);
        let a = k.ray_slopes(100.0, 50.0, BackProjectionConvention::default());
        let b = half.ray_slopes(50.0, 25.0, BackProjectionConvention::default());
        assert!((a - b).norm() < 1e-12);
    }

    #[test]
    fn zero_focal_is_invalid() {
        assert!(!PinholeIntrinsics::new(0.0, 1.0, 0.0, 0.0).is_valid());
    }
}
