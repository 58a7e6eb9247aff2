//! The immediate-mode GPU surface the [`Renderer`](super::Renderer) drives.
//!
//! The renderer only needs a handful of GL-shaped operations: allocate one vertex and one
//! index buffer, upload into them at byte offsets, describe vertex arrays over the shared
//! vertex buffer, bind textures to units and issue indexed draws. Keeping that surface behind a
//! trait lets the packing and traversal logic run against a recording backend in tests.

use crate::{
    error::Result,
    render::shader::{ShaderProgram, ShaderSource},
    resources::TextureHandle,
};

/// Opaque id of a vertex array issued by a [`RenderBackend`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexArrayHandle(pub u32);

/// One float attribute read from the shared vertex buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Shader location returned by [`ShaderProgram::attrib_location`].
    pub location: u32,
    /// Number of `f32` components.
    pub components: u32,
    /// Byte offset inside one vertex.
    pub offset: u64,
}

/// How a shape's vertices are read from the shared vertex buffer.
///
/// `pack_offset` is the byte position the shape's vertices were uploaded to. Indices are
/// rebased to address the whole buffer, so backends bind the buffer from its start and keep
/// `pack_offset` for bookkeeping only.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VertexArrayLayout {
    pub stride: u64,
    pub pack_offset: u64,
    pub attributes: Vec<VertexAttribute>,
}

pub trait RenderBackend {
    type Program: ShaderProgram;

    /// Compiles and links a program. Failure is reported as
    /// [`ViewerError::ResourceExhausted`](crate::error::ViewerError::ResourceExhausted).
    fn create_program(&mut self, source: &ShaderSource) -> Result<Self::Program>;

    /// Replaces the shared vertex and index buffers with zeroed buffers of the given byte sizes.
    fn allocate_buffers(&mut self, vertex_bytes: u64, index_bytes: u64) -> Result<()>;

    fn vertex_sub_data(&mut self, byte_offset: u64, data: &[f32]) -> Result<()>;

    fn index_sub_data(&mut self, byte_offset: u64, data: &[u32]) -> Result<()>;

    fn create_vertex_array(&mut self, layout: &VertexArrayLayout) -> Result<VertexArrayHandle>;

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    /// Frees both shared buffers.
    fn release_buffers(&mut self);

    fn set_viewport(&mut self, width: u32, height: u32);

    /// Starts a frame cleared to opaque black with a cleared depth buffer.
    fn begin_frame(&mut self) -> Result<()>;

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle);

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle);

    /// Draws `count` indices starting at `index_byte_offset` into the shared index buffer, using
    /// the model matrix currently set on `program`.
    fn draw_elements(&mut self, program: &Self::Program, count: u32, index_byte_offset: u64);

    /// Finishes the frame. Uniforms set on `program` after the last draw call apply to every
    /// draw of the frame.
    fn end_frame(&mut self, program: &Self::Program) -> Result<()>;
}
