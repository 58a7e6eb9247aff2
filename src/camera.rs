//! Orbit camera around the world origin.
//!
//! The camera is parameterised by spherical coordinates (longitude, latitude, height) with Y as
//! the polar axis. Its Cartesian position is derived eagerly by every setter and never stored
//! independently, so the view matrix is always a pure function of those coordinates.

use cgmath::{Deg, Matrix4, Point3, Rad, Vector3};

use crate::{config::CameraConfig, error::Result};

/// cgmath builds OpenGL style clip space (z in -1..1), wgpu expects z in 0..1.
#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

/// Latitude is kept off the poles so the fixed up vector never aligns with the view direction.
pub const MAX_LATITUDE: f32 = 1.5;
pub const MIN_FOV_DEGREES: f32 = 1.0;
pub const MAX_FOV_DEGREES: f32 = 90.0;
pub const Z_NEAR: f32 = 0.01;
pub const Z_FAR: f32 = 10000.0;

#[derive(Debug, Clone)]
pub struct OrbitCamera {
    longitude: f32,
    latitude: f32,
    height: f32,
    min_height: f32,
    max_height: f32,
    fov: Rad<f32>,
    aspect_ratio: f32,
    zoom_sensitivity: f32,
    position: Point3<f32>,
    start: (f32, f32, f32),
}

impl OrbitCamera {
    /// Fails with [`crate::error::ViewerError::InvalidParameter`] if `config` has non-finite
    /// values or `min_height > max_height`.
    pub fn new(config: &CameraConfig, aspect_ratio: f32) -> Result<Self> {
        config.validate()?;
        let mut camera = Self {
            longitude: config.longitude,
            latitude: config.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE),
            height: config.height,
            min_height: config.min_height,
            max_height: config.max_height,
            fov: Rad(0.0),
            aspect_ratio,
            zoom_sensitivity: config.zoom_sensitivity,
            position: Point3::new(0.0, 0.0, 0.0),
            start: (config.longitude, config.latitude, config.height),
        };
        camera.set_fov(config.fov_degrees);
        camera.recalculate_position();
        Ok(camera)
    }

    pub fn longitude(&self) -> f32 {
        self.longitude
    }

    pub fn latitude(&self) -> f32 {
        self.latitude
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    pub fn min_height(&self) -> f32 {
        self.min_height
    }

    pub fn max_height(&self) -> f32 {
        self.max_height
    }

    pub fn position(&self) -> Point3<f32> {
        self.position
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.aspect_ratio
    }

    /// Field of view in degrees.
    pub fn fov(&self) -> f32 {
        Deg::from(self.fov).0
    }

    pub fn set_longitude(&mut self, longitude: f32) {
        self.longitude = longitude;
        self.recalculate_position();
    }

    /// Sets the latitude, clamped to `[-MAX_LATITUDE, MAX_LATITUDE]`.
    pub fn set_latitude(&mut self, latitude: f32) {
        self.latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        self.recalculate_position();
    }

    pub fn set_height(&mut self, height: f32) {
        self.height = height;
        self.recalculate_position();
    }

    /// Sets the field of view in degrees, clamped to `[MIN_FOV_DEGREES, MAX_FOV_DEGREES]`.
    pub fn set_fov(&mut self, degrees: f32) {
        self.fov = Deg(degrees.clamp(MIN_FOV_DEGREES, MAX_FOV_DEGREES)).into();
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Moves the camera towards `min_height` for positive `delta` and towards `max_height` for
    /// negative `delta`.
    ///
    /// The step shrinks with the remaining distance to the bound being approached and never
    /// exceeds one unit, so the height approaches the bound asymptotically and cannot pass it.
    pub fn zoom(&mut self, delta: f32) {
        if delta == 0.0 || !delta.is_finite() {
            return;
        }
        let (target, direction) = if delta > 0.0 {
            (self.min_height, -1.0)
        } else {
            (self.max_height, 1.0)
        };
        let remaining = (self.height - target).abs().min(1.0);
        let speed = (delta.abs() * self.zoom_sensitivity).min(1.0);
        self.height = (self.height + direction * speed * remaining)
            .clamp(self.min_height, self.max_height);
        self.recalculate_position();
    }

    /// Restores the configured start pose.
    pub fn reset(&mut self) {
        let (longitude, latitude, height) = self.start;
        self.longitude = longitude;
        self.latitude = latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE);
        self.height = height;
        self.recalculate_position();
    }

    /// Look-at matrix from the current position towards the origin with +Y up.
    pub fn view_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, Point3::new(0.0, 0.0, 0.0), Vector3::unit_y())
    }

    pub fn projection_matrix(&self) -> Matrix4<f32> {
        cgmath::perspective(self.fov, self.aspect_ratio, Z_NEAR, Z_FAR)
    }

    fn recalculate_position(&mut self) {
        self.position = spherical_to_cartesian(self.longitude, self.latitude, self.height);
    }
}

pub fn spherical_to_cartesian(longitude: f32, latitude: f32, height: f32) -> Point3<f32> {
    Point3::new(
        height * latitude.cos() * longitude.sin(),
        height * latitude.sin(),
        height * latitude.cos() * longitude.cos(),
    )
}
