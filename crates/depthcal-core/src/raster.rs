use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Real;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RasterError {
    #[error("raster has zero size ({width}x{height})")]
    Empty { width: usize, height: usize },
    #[error("raster size {width}x{height} overflows")]
    TooLarge { width: usize, height: usize },
    #[error("raster data has {got} values, expected {expected}")]
    SizeMismatch { expected: usize, got: usize },
}

/// A dense row-major `width × height` grid of disparity values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RasterRepr", into = "RasterRepr")]
pub struct DepthRaster {
    width: usize,
    height: usize,
    data: Vec<Real>,
}

#[derive(Serialize, Deserialize)]
struct RasterRepr {
    width: usize,
    height: usize,
    data: Vec<Real>,
}

impl TryFrom<RasterRepr> for DepthRaster {
    type Error = RasterError;

    fn try_from(r: RasterRepr) -> Result<Self, Self::Error> {
        DepthRaster::new(r.width, r.height, r.data)
    }
}

impl From<DepthRaster> for RasterRepr {
    fn from(r: DepthRaster) -> Self {
        RasterRepr {
            width: r.width,
            height: r.height,
            data: r.data,
        }
    }
}

impl DepthRaster {
    pub fn new(width: usize, height: usize, data: Vec<Real>) -> Result<Self, RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::Empty { width, height });
        }
        let expected = width
            .checked_mul(height)
            .ok_or(RasterError::TooLarge { width, height })?;
        if data.len() != expected {
            return Err(RasterError::SizeMismatch {
                expected,
                got: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A raster with every pixel set to `value`. Zero dimensions are clamped
    /// to one pixel.
    pub fn filled(width: usize, height: usize, value: Real) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Build a raster by evaluating `f(u, v)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> Real) -> Self {
        let mut raster = Self::filled(width, height, 0.0);
        for v in 0..raster.height {
            for u in 0..raster.width {
                raster.data[v * raster.width + u] = f(u, v);
            }
        }
        raster
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[Real] {
        &self.data
    }

    /// Value at column `u`, row `v`, or `None` outside the grid.
    pub fn get(&self, u: usize, v: usize) -> Option<Real> {
        if u >= self.width || v >= self.height {
            return None;
        }
        Some(self.data[v * self.width + u])
    }

    /// Value at the nearest in-bounds pixel.
    pub fn get_clamped(&self, u: usize, v: usize) -> Real {
        let u = u.min(self.width - 1);
        let v = v.min(self.height - 1);
        self.data[v * self.width + u]
    }

    pub fn set(&mut self, u: usize, v: usize, value: Real) {
        if u < self.width && v < self.height {
            self.data[v * self.width + u] = value;
        }
    }

    /// Minimum and maximum over finite values, or `None` if there are none.
    pub fn min_max(&self) -> Option<(Real, Real)> {
        self.data
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Min–max normalize into `[0, 1]`: `(v - min) / (max - min)`.
    ///
    /// A constant raster (or one without finite values) maps to all zeros.
    /// Non-finite pixels stay non-finite.
    pub fn normalized(&self) -> DepthRaster {
        let (lo, hi) = match self.min_max() {
            Some((lo, hi)) if hi > lo => (lo, hi),
            _ => {
                return Self {
                    width: self.width,
                    height: self.height,
                    data: self
                        .data
                        .iter()
                        .map(|v| if v.is_finite() { 0.0 } else { *v })
                        .collect(),
                }
            }
        };
        let range = hi - lo;
        Self {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(|v| (v - lo) / range).collect(),
        }
    }
}
