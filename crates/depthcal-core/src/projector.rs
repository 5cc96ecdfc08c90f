//! Stateless coordinate transforms.
//!
//! Spaces:
//! - world: tracker frame, meters;
//! - screen: rendered view, pixels, origin top-left, `y` down;
//! - raster: disparity raster, integer pixels at the network resolution;
//! - camera: back-projected metric coordinates, see [`BackProjectionConvention`].

use crate::{
    to_homogeneous, BackProjectionConvention, DepthPoint, Mat4, PinholeIntrinsics, Pt2, Pt3, Real,
    Vec4,
};

/// Project a world point into screen pixels through `projection · view`.
///
/// Clip space `[-1, 1]²` maps to `[0, width) × [0, height)` with the NDC `y`
/// axis flipped. When the homogeneous divisor is zero the result is not
/// finite; use [`world_to_screen_checked`] to filter those points.
pub fn world_to_screen(
    point: &Pt3,
    view: &Mat4,
    projection: &Mat4,
    width: Real,
    height: Real,
) -> Pt2 {
    let clip = projection * view * to_homogeneous(point);
    clip_to_screen(&clip, width, height)
}

/// Like [`world_to_screen`], but returns `None` for points at or behind the
/// camera plane (`w <= 0`) and for non-finite results.
pub fn world_to_screen_checked(
    point: &Pt3,
    view: &Mat4,
    projection: &Mat4,
    width: Real,
    height: Real,
) -> Option<Pt2> {
    let clip = projection * view * to_homogeneous(point);
    if !(clip.w > 0.0) {
        return None;
    }
    let screen = clip_to_screen(&clip, width, height);
    (screen.x.is_finite() && screen.y.is_finite()).then_some(screen)
}

/// Like [`world_to_screen_checked`], truncated to the integer screen pixel.
///
/// Truncation runs toward zero, so sub-pixel negatives such as `-0.5` land on
/// pixel 0 and pass the viewport check.
pub fn world_to_screen_pixel(
    point: &Pt3,
    view: &Mat4,
    projection: &Mat4,
    width: Real,
    height: Real,
) -> Option<Pt2> {
    world_to_screen_checked(point, view, projection, width, height).map(|s| s.map(Real::trunc))
}

fn clip_to_screen(clip: &Vec4, width: Real, height: Real) -> Pt2 {
    let ndc_x = clip.x / clip.w;
    let ndc_y = clip.y / clip.w;
    Pt2::new((ndc_x + 1.0) / 2.0 * width, (1.0 - ndc_y) / 2.0 * height)
}

/// Unproject a screen pixel with an NDC depth back to world space.
///
/// `inverse_view_projection` is `(projection · view)⁻¹`. Returns `None` when
/// the homogeneous divisor vanishes.
pub fn screen_to_world(
    screen: &Pt2,
    ndc_depth: Real,
    width: Real,
    height: Real,
    inverse_view_projection: &Mat4,
) -> Option<Pt3> {
    let nx = 2.0 * screen.x / width - 1.0;
    let ny = 1.0 - 2.0 * screen.y / height;
    let world = inverse_view_projection * Vec4::new(nx, ny, ndc_depth, 1.0);
    if world.w == 0.0 || !world.w.is_finite() {
        return None;
    }
    Some(Pt3::new(world.x / world.w, world.y / world.w, world.z / world.w))
}

/// Scale a screen pixel into the depth raster's resolution.
///
/// `scale_x = raster_width / view_width`, `scale_y = raster_height /
/// view_height`. Coordinates are truncated to integer pixels; negative or
/// non-finite inputs yield `None`.
pub fn to_depth_raster_coords(screen: &Pt2, scale_x: Real, scale_y: Real) -> Option<(usize, usize)> {
    let u = screen.x * scale_x;
    let v = screen.y * scale_y;
    if !(u >= 0.0 && v >= 0.0) || !u.is_finite() || !v.is_finite() {
        return None;
    }
    Some((u as usize, v as usize))
}

/// Pinhole unprojection of pixel `(u, v)` at metric ray depth `metric_depth`.
///
/// `z = depth / sqrt(1 + (x/z)² + (y/z)²)`, so `metric_depth` is the distance
/// along the viewing ray, not along the optical axis.
pub fn back_project(
    u: Real,
    v: Real,
    metric_depth: Real,
    intrinsics: &PinholeIntrinsics,
    convention: BackProjectionConvention,
) -> DepthPoint {
    let slopes = intrinsics.ray_slopes(u, v, convention);
    let z = metric_depth / (1.0 + slopes.x * slopes.x + slopes.y * slopes.y).sqrt();
    DepthPoint::new(Pt3::new(slopes.x * z, slopes.y * z, z), metric_depth)
}

/// Distance from the camera center to a world point.
pub fn distance_to_camera(point: &Pt3, camera_translation: &Pt3) -> Real {
    (point - camera_translation).norm()
}
