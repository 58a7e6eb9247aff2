//! Shader program contract and the fixed attribute and uniform names the renderer uses.

use cgmath::{Matrix4, Vector3};

pub const ATTRIB_POSITION: &str = "aPosition";
pub const ATTRIB_NORMAL: &str = "aNormal";
pub const ATTRIB_TEX_COORD: &str = "aTexCoord";

pub const UNIFORM_MODEL: &str = "model";
pub const UNIFORM_VIEW: &str = "view";
pub const UNIFORM_PROJECTION: &str = "projection";
pub const UNIFORM_VIEW_POS: &str = "viewPos";

pub const MATERIAL_DIFFUSE: &str = "material.diffuse";
pub const MATERIAL_SPECULAR: &str = "material.specular";
pub const MATERIAL_SPECULAR_COLOR: &str = "material.specularColor";
pub const MATERIAL_SHININESS: &str = "material.shininess";

pub const LIGHT_POSITION: &str = "light.position";
pub const LIGHT_AMBIENT: &str = "light.ambient";
pub const LIGHT_DIFFUSE: &str = "light.diffuse";
pub const LIGHT_SPECULAR: &str = "light.specular";

/// Vertex and fragment sources handed to [`RenderBackend::create_program`](super::backend::RenderBackend::create_program).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShaderSource {
    pub label: String,
    pub vertex: String,
    pub fragment: String,
}

impl ShaderSource {
    /// The single lit, textured program every shape is drawn with. Both stages live in one WGSL
    /// module.
    pub fn globe() -> Self {
        let module = include_str!("../pipelines/globe.wgsl").to_string();
        Self {
            label: "Globe Shader".to_string(),
            vertex: module.clone(),
            fragment: module,
        }
    }
}

/// A linked program exposing attribute lookup and named uniform setters.
///
/// Unknown names are ignored, the way a GL program ignores uniform locations of -1.
pub trait ShaderProgram {
    fn attrib_location(&self, name: &str) -> Option<u32>;

    fn set_int(&self, name: &str, value: i32);

    fn set_float(&self, name: &str, value: f32);

    fn set_vec3(&self, name: &str, value: Vector3<f32>);

    fn set_mat4(&self, name: &str, value: &Matrix4<f32>);
}
