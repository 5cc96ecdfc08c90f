//! Synthetic cameras and scenes.
//!
//! Public so that integration tests across the workspace can share them; not
//! meant for production use. Cameras follow the OpenGL convention used by the
//! tracker: camera space looks down `-Z` with `+Y` up.

use nalgebra::{Perspective3, Translation3, UnitQuaternion, Vector3};
use rand::Rng;

use crate::{
    distance_to_camera, to_depth_raster_coords, world_to_screen_pixel, DepthRaster, Iso3, Mat4,
    PinholeIntrinsics, Pt3, Real, SparsePoint, Viewport,
};

/// A tracked camera with view/projection matrices and a viewport.
#[derive(Clone, Debug)]
pub struct SyntheticCamera {
    /// Camera-to-world transform.
    pub pose: Iso3,
    /// World-to-camera matrix (`pose⁻¹`).
    pub view: Mat4,
    /// OpenGL perspective matrix.
    pub projection: Mat4,
    pub viewport: Viewport,
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        let pose = Iso3::from_parts(
            Translation3::new(0.2, 1.4, 0.5),
            UnitQuaternion::from_euler_angles(0.05, 0.3, -0.02),
        );
        Self::new(pose, Viewport::new(640, 480), 60.0_f64.to_radians())
    }
}

impl SyntheticCamera {
    pub fn new(pose: Iso3, viewport: Viewport, fovy: Real) -> Self {
        let aspect = viewport.width as Real / viewport.height as Real;
        let projection = Perspective3::new(aspect, fovy, 0.05, 100.0).to_homogeneous();
        Self {
            view: pose.inverse().to_homogeneous(),
            pose,
            projection,
            viewport,
        }
    }

    /// Camera center in world coordinates.
    pub fn translation(&self) -> Pt3 {
        Pt3::from(self.pose.translation.vector)
    }

    /// Map a point from (OpenGL) camera space into world space.
    pub fn world_from_camera(&self, p: &Pt3) -> Pt3 {
        self.pose * p
    }

    /// Pixel intrinsics matching the projection matrix and viewport.
    pub fn intrinsics(&self) -> PinholeIntrinsics {
        PinholeIntrinsics::from_gl_projection(
            &self.projection,
            self.viewport.width as Real,
            self.viewport.height as Real,
        )
    }

    /// Random world points in front of the camera, between `near` and `far`
    /// meters along the optical axis and inside the field of view.
    pub fn sample_visible_points<R: Rng + ?Sized>(
        &self,
        n: usize,
        near: Real,
        far: Real,
        rng: &mut R,
    ) -> Vec<Pt3> {
        let k = self.intrinsics();
        let w = self.viewport.width as Real;
        let h = self.viewport.height as Real;
        (0..n)
            .map(|_| {
                let u = rng.random_range(1.0..w - 1.0);
                let v = rng.random_range(1.0..h - 1.0);
                let d = rng.random_range(near..far);
                // OpenGL camera: x right, y up, looking down -z
                let x = (u - k.cx) / k.fx * d;
                let y = (k.cy - v) / k.fy * d;
                self.world_from_camera(&Pt3::new(x, y, -d))
            })
            .collect()
    }
}

/// A disparity raster consistent with a known affine calibration at a set of
/// sparse points.
#[derive(Clone, Debug)]
pub struct SyntheticScene {
    pub camera: SyntheticCamera,
    /// Raw (not normalized) disparity raster.
    pub raster: DepthRaster,
    /// Points whose raster pixel carries the exact calibrated disparity.
    pub points: Vec<SparsePoint>,
}

impl SyntheticScene {
    /// Write `(1/distance - shift) / scale` at the raster pixel of every
    /// visible point. Points landing on an already written pixel are dropped.
    ///
    /// The rest of the raster is filled with `background`.
    pub fn render(
        camera: SyntheticCamera,
        world_points: &[Pt3],
        raster_size: (usize, usize),
        scale: Real,
        shift: Real,
        background: Real,
    ) -> Self {
        let (rw, rh) = raster_size;
        let mut raster = DepthRaster::filled(rw, rh, background);
        let mut written = vec![false; rw * rh];
        let sx = rw as Real / camera.viewport.width as Real;
        let sy = rh as Real / camera.viewport.height as Real;
        let center = camera.translation();
        let mut points = Vec::new();

        for p in world_points {
            let Some(screen) = world_to_screen_pixel(
                p,
                &camera.view,
                &camera.projection,
                camera.viewport.width as Real,
                camera.viewport.height as Real,
            ) else {
                continue;
            };
            if !camera.viewport.contains(screen.x, screen.y) {
                continue;
            }
            let Some((u, v)) = to_depth_raster_coords(&screen, sx, sy) else {
                continue;
            };
            if u >= rw || v >= rh || written[v * rw + u] {
                continue;
            }
            written[v * rw + u] = true;
            let inv_depth = 1.0 / distance_to_camera(p, &center);
            raster.set(u, v, (inv_depth - shift) / scale);
            points.push(SparsePoint {
                position: *p,
                confidence: 1.0,
            });
        }

        Self {
            camera,
            raster,
            points,
        }
    }
}

/// Offset a copy of the points along the camera ray so their sampled
/// disparity no longer matches their distance. Every `period`-th point is
/// corrupted, starting at index 0.
pub fn corrupt_points(points: &[SparsePoint], center: &Pt3, period: usize, factor: Real) -> Vec<SparsePoint> {
    points
        .iter()
        .enumerate()
        .map(|(i, sp)| {
            if period == 0 || i % period != 0 {
                return *sp;
            }
            let ray: Vector3<Real> = sp.position - center;
            SparsePoint {
                position: center + ray * factor,
                confidence: sp.confidence,
            }
        })
        .collect()
}
