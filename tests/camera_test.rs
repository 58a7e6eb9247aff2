use std::f32::consts::FRAC_PI_2;

use cgmath::{EuclideanSpace, InnerSpace, Vector3, Vector4};
use globe_viewer::{
    camera::{MAX_FOV_DEGREES, MAX_LATITUDE, MIN_FOV_DEGREES, OrbitCamera, spherical_to_cartesian},
    config::CameraConfig,
    error::ViewerError,
};

use crate::common::test_utils::{assert_close, assert_vec3_close};

mod common;

fn camera() -> OrbitCamera {
    OrbitCamera::new(&CameraConfig::default(), 4.0 / 3.0).unwrap()
}

#[test]
fn starts_on_the_positive_z_axis_at_the_configured_height() {
    let camera = camera();
    assert_close(camera.height(), 50.0);
    assert_vec3_close(camera.position().to_vec(), Vector3::new(0.0, 0.0, 50.0));
}

#[test]
fn position_follows_longitude_and_latitude() {
    let mut camera = camera();
    camera.set_longitude(FRAC_PI_2);
    assert_vec3_close(camera.position().to_vec(), Vector3::new(50.0, 0.0, 0.0));

    camera.set_latitude(0.5);
    let expected = spherical_to_cartesian(FRAC_PI_2, 0.5, 50.0);
    assert_vec3_close(camera.position().to_vec(), expected.to_vec());
    assert!((camera.position().to_vec().magnitude() - 50.0).abs() < 1e-3);
    assert_close(camera.position().y, 50.0 * 0.5f32.sin());
}

#[test]
fn latitude_is_clamped_off_the_poles() {
    let mut camera = camera();
    camera.set_latitude(3.0);
    assert_close(camera.latitude(), MAX_LATITUDE);
    camera.set_latitude(-10.0);
    assert_close(camera.latitude(), -MAX_LATITUDE);

    let config = CameraConfig {
        latitude: 2.0,
        ..CameraConfig::default()
    };
    let camera = OrbitCamera::new(&config, 1.0).unwrap();
    assert_close(camera.latitude(), MAX_LATITUDE);
}

#[test]
fn positive_delta_zooms_in_by_a_bounded_step() {
    let mut camera = camera();
    camera.zoom(120.0);
    // 120 * 0.005 = 0.6, one unit or more away from the lower bound
    assert_close(camera.height(), 49.4);

    camera.zoom(-1000.0);
    assert_close(camera.height(), 50.4);
}

#[test]
fn zoom_slows_down_next_to_a_bound_and_never_passes_it() {
    let mut camera = camera();
    camera.set_height(25.5);
    camera.zoom(1000.0);
    assert_close(camera.height(), 25.0);
    camera.zoom(1000.0);
    assert_close(camera.height(), 25.0);

    camera.set_height(69.75);
    camera.zoom(-100.0);
    // speed 0.5 times the remaining 0.25
    assert_close(camera.height(), 69.875);

    for _ in 0..10_000 {
        camera.zoom(-1.0e6);
    }
    assert!(camera.height() <= camera.max_height());
    assert!(camera.height() > 69.99);
}

#[test]
fn zero_and_non_finite_deltas_are_ignored() {
    let mut camera = camera();
    camera.zoom(0.0);
    camera.zoom(f32::NAN);
    camera.zoom(f32::INFINITY);
    assert_close(camera.height(), 50.0);
}

#[test]
fn reset_restores_the_start_pose() {
    let mut camera = camera();
    camera.set_longitude(1.0);
    camera.set_latitude(-0.7);
    camera.zoom(500.0);

    camera.reset();
    assert_close(camera.longitude(), 0.0);
    assert_close(camera.latitude(), 0.0);
    assert_close(camera.height(), 50.0);
    assert_vec3_close(camera.position().to_vec(), Vector3::new(0.0, 0.0, 50.0));
}

#[test]
fn field_of_view_is_clamped() {
    let mut camera = camera();
    assert!((camera.fov() - 45.0).abs() < 1e-4);
    camera.set_fov(0.1);
    assert!((camera.fov() - MIN_FOV_DEGREES).abs() < 1e-4);
    camera.set_fov(170.0);
    assert!((camera.fov() - MAX_FOV_DEGREES).abs() < 1e-4);
}

#[test]
fn view_matrix_looks_at_the_origin() {
    let mut camera = camera();
    camera.set_longitude(0.8);
    camera.set_latitude(0.3);

    let view = camera.view_matrix();
    let origin = view * Vector4::new(0.0, 0.0, 0.0, 1.0);
    assert!((origin.x).abs() < 1e-4);
    assert!((origin.y).abs() < 1e-4);
    assert!((origin.z + 50.0).abs() < 1e-3);

    let eye = camera.position();
    let eye_in_view = view * Vector4::new(eye.x, eye.y, eye.z, 1.0);
    assert!(eye_in_view.truncate().magnitude() < 1e-3);
}

#[test]
fn projection_uses_the_aspect_ratio() {
    let mut camera = camera();
    let before = camera.projection_matrix();
    camera.set_aspect_ratio(2.0);
    let after = camera.projection_matrix();
    assert_close(after.x.x * 2.0, after.y.y);
    assert_close(before.y.y, after.y.y);
}

#[test]
fn inverted_or_non_finite_height_bounds_are_rejected() {
    let inverted = CameraConfig {
        min_height: 70.0,
        max_height: 25.0,
        ..CameraConfig::default()
    };
    assert!(matches!(
        OrbitCamera::new(&inverted, 1.0),
        Err(ViewerError::InvalidParameter(_))
    ));

    for bound in [f32::NAN, f32::INFINITY] {
        let config = CameraConfig {
            max_height: bound,
            ..CameraConfig::default()
        };
        assert!(matches!(
            OrbitCamera::new(&config, 1.0),
            Err(ViewerError::InvalidParameter(_))
        ));
    }

    let pinned = CameraConfig {
        min_height: 40.0,
        max_height: 40.0,
        height: 40.0,
        ..CameraConfig::default()
    };
    let mut camera = OrbitCamera::new(&pinned, 1.0).unwrap();
    camera.zoom(120.0);
    camera.zoom(-120.0);
    assert_close(camera.height(), 40.0);
}
