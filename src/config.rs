//! Viewer configuration with defaults matching the stock globe scene.
//!
//! Every section is `#[serde(default)]`, so a RON file only needs to name the values it
//! overrides:
//!
//! ```ron
//! (
//!     camera: (min_height: 30.0),
//!     scene: (rasterization: 64),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    data_structures::geometry,
    error::{Result, ViewerError},
};

/// Top-level viewer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    pub window: WindowConfig,
    pub camera: CameraConfig,
    pub scene: SceneConfig,
    pub lighting: LightingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Globe Viewer".to_string(),
            width: 1280,
            height: 720,
        }
    }
}

/// Orbit camera start pose and limits. Angles are radians, the field of view is degrees.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    pub longitude: f32,
    pub latitude: f32,
    pub height: f32,
    pub min_height: f32,
    pub max_height: f32,
    pub fov_degrees: f32,
    /// Height change per wheel unit before the distance-to-bound factor is applied.
    pub zoom_sensitivity: f32,
    /// Radians of latitude/longitude per dragged pixel.
    pub drag_sensitivity: f32,
}

impl CameraConfig {
    /// Rejects non-finite values and height bounds that do not form a range.
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("longitude", self.longitude),
            ("latitude", self.latitude),
            ("height", self.height),
            ("min_height", self.min_height),
            ("max_height", self.max_height),
            ("fov_degrees", self.fov_degrees),
            ("zoom_sensitivity", self.zoom_sensitivity),
            ("drag_sensitivity", self.drag_sensitivity),
        ];
        if let Some((name, value)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ViewerError::InvalidParameter(format!(
                "camera {name} must be finite, got {value}"
            )));
        }
        if self.min_height > self.max_height {
            return Err(ViewerError::InvalidParameter(format!(
                "camera min_height {} exceeds max_height {}",
                self.min_height, self.max_height
            )));
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            longitude: 0.0,
            latitude: 0.0,
            height: 50.0,
            min_height: 25.0,
            max_height: 70.0,
            fov_degrees: 45.0,
            zoom_sensitivity: 0.005,
            drag_sensitivity: 0.001,
        }
    }
}

/// Radii, tessellation and texture paths of the globe scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    pub rasterization: u32,
    pub space_radius: f32,
    pub earth_radius: f32,
    pub cloud_radius: f32,
    pub space_texture: String,
    pub earth_diffuse_texture: String,
    pub earth_specular_texture: String,
    pub cloud_texture: String,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            rasterization: 256,
            space_radius: 8000.0,
            earth_radius: 20.0,
            cloud_radius: 20.1,
            space_texture: "textures/milky_way.jpg".to_string(),
            earth_diffuse_texture: "textures/earth_diffuse.jpg".to_string(),
            earth_specular_texture: "textures/earth_specular.png".to_string(),
            cloud_texture: "textures/earth_clouds.png".to_string(),
        }
    }
}

/// The single light and material preset shared by every node.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    pub light_position: [f32; 3],
    pub ambient: f32,
    pub diffuse: f32,
    pub specular: f32,
    pub material_specular: [f32; 3],
    pub shininess: f32,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            light_position: [-1000.0, 1.0, 0.0],
            ambient: 0.02,
            diffuse: 2.0,
            specular: 0.5,
            material_specular: [1.0, 1.0, 1.0],
            shininess: 32.0,
        }
    }
}

impl ViewerConfig {
    /// Parses and validates a RON document.
    pub fn from_ron_str(contents: &str) -> Result<Self> {
        let config: Self = ron::from_str(contents).map_err(ViewerError::ConfigParse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.camera.validate()?;
        geometry::check_rasterization(self.scene.rasterization)
    }

    /// Loads `path`, falling back to the defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(ViewerError::ConfigRead)?;
        let config = Self::from_ron_str(&contents)?;
        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}
