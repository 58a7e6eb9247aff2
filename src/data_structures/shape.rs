//! Renderable shapes: generated geometry, a pose and texture slots.

use std::collections::HashMap;

use cgmath::{Deg, Matrix4, Vector3, Zero};

use crate::{
    data_structures::geometry::{self, FLOATS_PER_VERTEX, INDEX_SIZE, MeshData, VERTEX_STRIDE},
    error::{Result, ViewerError},
    render::backend::VertexArrayHandle,
    resources::{TextureHandle, TextureRole},
};

/// Euler rotation in degrees (applied X, then Y, then Z) followed by a translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub angle: [f32; 3],
    pub position: Vector3<f32>,
}

impl Pose {
    pub fn new(angle: [f32; 3], position: Vector3<f32>) -> Self {
        Self { angle, position }
    }

    /// Model matrix: rotate about X, then Y, then Z, then translate.
    pub fn to_matrix(&self) -> Matrix4<f32> {
        Matrix4::from_translation(self.position)
            * Matrix4::from_angle_z(Deg(self.angle[2]))
            * Matrix4::from_angle_y(Deg(self.angle[1]))
            * Matrix4::from_angle_x(Deg(self.angle[0]))
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self {
            angle: [0.0; 3],
            position: Vector3::zero(),
        }
    }
}

/// Which generator produced the geometry, with the parameters needed to regenerate it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    Sphere { rasterization: u32, radius: f32 },
    Cube { length: f32, width: f32, height: f32 },
    Quad { length: f32, width: f32 },
}

impl Primitive {
    fn generate(&self) -> Result<MeshData> {
        match *self {
            Primitive::Sphere {
                rasterization,
                radius,
            } => geometry::sphere(rasterization, radius),
            Primitive::Cube {
                length,
                width,
                height,
            } => geometry::cube(length, width, height),
            Primitive::Quad { length, width } => geometry::quad(length, width),
        }
    }
}

#[derive(Debug)]
pub struct Shape {
    primitive: Primitive,
    mesh: MeshData,
    /// Bumped every time the mesh is regenerated.
    generation: u64,
    pose: Pose,
    textures: HashMap<TextureRole, TextureHandle>,
    vertex_array: Option<VertexArrayHandle>,
}

impl Shape {
    pub fn new(primitive: Primitive) -> Result<Self> {
        let mesh = primitive.generate()?;
        Ok(Self {
            primitive,
            mesh,
            generation: 0,
            pose: Pose::default(),
            textures: HashMap::new(),
            vertex_array: None,
        })
    }

    pub fn sphere(rasterization: u32, radius: f32) -> Result<Self> {
        Self::new(Primitive::Sphere {
            rasterization,
            radius,
        })
    }

    pub fn cube(length: f32, width: f32, height: f32) -> Result<Self> {
        Self::new(Primitive::Cube {
            length,
            width,
            height,
        })
    }

    pub fn quad(length: f32, width: f32) -> Result<Self> {
        Self::new(Primitive::Quad { length, width })
    }

    pub fn primitive(&self) -> Primitive {
        self.primitive
    }

    /// Changes whenever the vertex or index data is regenerated, even if the counts stay the
    /// same.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn vertices(&self) -> &[f32] {
        &self.mesh.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.mesh.indices
    }

    pub fn mesh(&self) -> &MeshData {
        &self.mesh
    }

    pub fn vertex_count(&self) -> usize {
        self.mesh.vertices.len() / FLOATS_PER_VERTEX
    }

    pub fn index_count(&self) -> usize {
        self.mesh.indices.len()
    }

    pub fn vertex_buffer_size(&self) -> u64 {
        self.vertex_count() as u64 * VERTEX_STRIDE
    }

    pub fn index_buffer_size(&self) -> u64 {
        self.index_count() as u64 * INDEX_SIZE
    }

    /// Regenerates the sphere at a new tessellation.
    ///
    /// The buffer sizes change, so a renderer that already packed this shape must be
    /// reinitialized before the next frame.
    pub fn set_rasterization(&mut self, rasterization: u32) -> Result<()> {
        match self.primitive {
            Primitive::Sphere { radius, .. } => self.regenerate(Primitive::Sphere {
                rasterization,
                radius,
            }),
            other => Err(ViewerError::InvalidParameter(format!(
                "rasterization only applies to spheres, not {other:?}"
            ))),
        }
    }

    /// Regenerates the sphere at a new radius. Counts are unchanged but every position moves,
    /// so a packed renderer must be reinitialized as well.
    pub fn set_radius(&mut self, radius: f32) -> Result<()> {
        match self.primitive {
            Primitive::Sphere { rasterization, .. } => self.regenerate(Primitive::Sphere {
                rasterization,
                radius,
            }),
            other => Err(ViewerError::InvalidParameter(format!(
                "radius only applies to spheres, not {other:?}"
            ))),
        }
    }

    fn regenerate(&mut self, primitive: Primitive) -> Result<()> {
        // Generate first so a rejected parameter leaves the shape untouched.
        self.mesh = primitive.generate()?;
        self.primitive = primitive;
        self.generation += 1;
        Ok(())
    }

    pub fn pose(&self) -> &Pose {
        &self.pose
    }

    pub fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.pose.angle[0] += dx;
        self.pose.angle[1] += dy;
        self.pose.angle[2] += dz;
    }

    pub fn rotate_to(&mut self, x: f32, y: f32, z: f32) {
        self.pose.angle = [x, y, z];
    }

    pub fn translate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.pose.position += Vector3::new(dx, dy, dz);
    }

    pub fn translate_to(&mut self, x: f32, y: f32, z: f32) {
        self.pose.position = Vector3::new(x, y, z);
    }

    pub fn reset_rotation(&mut self) {
        self.pose.angle = [0.0; 3];
    }

    pub fn reset_translation(&mut self) {
        self.pose.position = Vector3::zero();
    }

    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.pose.to_matrix()
    }

    /// Assigns `texture` to `role`, replacing any previous handle for that role.
    pub fn set_texture(&mut self, role: TextureRole, texture: TextureHandle) {
        self.textures.insert(role, texture);
    }

    pub fn texture(&self, role: TextureRole) -> Option<TextureHandle> {
        self.textures.get(&role).copied()
    }

    pub fn vertex_array(&self) -> Option<VertexArrayHandle> {
        self.vertex_array
    }

    pub(crate) fn set_vertex_array(&mut self, vertex_array: Option<VertexArrayHandle>) {
        self.vertex_array = vertex_array;
    }
}
