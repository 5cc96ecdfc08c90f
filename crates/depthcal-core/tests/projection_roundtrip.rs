//! Round trip between the tracker's world → screen projection and the pinhole
//! back-projection used for detections.

use depthcal_core::{
    back_project, synthetic::SyntheticCamera, world_to_screen, BackProjectionConvention, Pt3,
    Real,
};
use nalgebra::{Translation3, UnitQuaternion};
use rand::{rngs::StdRng, SeedableRng};

fn camera() -> SyntheticCamera {
    let pose = depthcal_core::Iso3::from_parts(
        Translation3::new(-0.4, 1.1, 2.0),
        UnitQuaternion::from_euler_angles(-0.1, 0.7, 0.05),
    );
    SyntheticCamera::new(pose, depthcal_core::Viewport::new(640, 480), 55.0_f64.to_radians())
}

#[test]
fn back_projection_recovers_opencv_camera_coordinates() {
    let cam = camera();
    let k = cam.intrinsics();
    let mut rng = StdRng::seed_from_u64(11);

    for world in cam.sample_visible_points(25, 0.4, 8.0, &mut rng) {
        // OpenGL camera frame: looking down -z, y up
        let gl = cam.pose.inverse() * world;
        let ray_depth = gl.coords.norm();

        let screen = world_to_screen(&world, &cam.view, &cam.projection, 640.0, 480.0);
        let p = back_project(
            screen.x,
            screen.y,
            ray_depth,
            &k,
            BackProjectionConvention::PixelMinusPrincipal,
        );

        // x right, y down, z forward
        let expected = Pt3::new(gl.x, -gl.y, -gl.z);
        assert!(
            (p.position - expected).norm() < 1e-9,
            "{:?} vs {:?}",
            p.position,
            expected
        );
        assert_eq!(p.depth, ray_depth);
    }
}

#[test]
fn default_convention_mirrors_the_horizontal_axis() {
    let cam = camera();
    let k = cam.intrinsics();
    let mut rng = StdRng::seed_from_u64(12);

    for world in cam.sample_visible_points(10, 0.4, 8.0, &mut rng) {
        let gl = cam.pose.inverse() * world;
        let ray_depth: Real = gl.coords.norm();
        let screen = world_to_screen(&world, &cam.view, &cam.projection, 640.0, 480.0);
        let p = back_project(
            screen.x,
            screen.y,
            ray_depth,
            &k,
            BackProjectionConvention::PrincipalMinusPixel,
        );
        let expected = Pt3::new(-gl.x, gl.y, -gl.z);
        assert!((p.position - expected).norm() < 1e-9);
    }
}
