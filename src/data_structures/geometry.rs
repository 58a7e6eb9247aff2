//! Procedural primitive geometry.
//!
//! Every generator emits the same interleaved layout, eight `f32` per vertex:
//! position (x, y, z), normal (nx, ny, nz), texture coordinate (u, v). Indices are a
//! zero-based triangle list into the generator's own vertex array.

use std::f32::consts::PI;

use cgmath::{InnerSpace, Vector3};

use crate::error::{Result, ViewerError};

pub const FLOATS_PER_VERTEX: usize = 8;
/// Byte stride of one interleaved vertex.
pub const VERTEX_STRIDE: u64 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as u64;
pub const INDEX_SIZE: u64 = std::mem::size_of::<u32>() as u64;
/// Finest sphere tessellation accepted; (r + 1)² vertices stay well inside `u32` indices.
pub const RASTERIZATION_LIMIT: u32 = 4096;

/// One vertex as laid out in the shared vertex buffer.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShapeVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub tex_coords: [f32; 2],
}

impl ShapeVertex {
    pub fn desc() -> wgpu::VertexBufferLayout<'static> {
        use std::mem;
        wgpu::VertexBufferLayout {
            array_stride: mem::size_of::<ShapeVertex>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &[
                wgpu::VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 3]>() as wgpu::BufferAddress,
                    shader_location: 1,
                    format: wgpu::VertexFormat::Float32x3,
                },
                wgpu::VertexAttribute {
                    offset: mem::size_of::<[f32; 6]>() as wgpu::BufferAddress,
                    shader_location: 2,
                    format: wgpu::VertexFormat::Float32x2,
                },
            ],
        }
    }

    fn push_to(&self, out: &mut Vec<f32>) {
        out.extend_from_slice(&self.position);
        out.extend_from_slice(&self.normal);
        out.extend_from_slice(&self.tex_coords);
    }
}

/// Interleaved vertices plus a local triangle list.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / FLOATS_PER_VERTEX
    }

    /// Reads vertex `idx` back out of the interleaved array.
    pub fn vertex(&self, idx: usize) -> Option<ShapeVertex> {
        let start = idx * FLOATS_PER_VERTEX;
        let v = self.vertices.get(start..start + FLOATS_PER_VERTEX)?;
        Some(ShapeVertex {
            position: [v[0], v[1], v[2]],
            normal: [v[3], v[4], v[5]],
            tex_coords: [v[6], v[7]],
        })
    }
}

/// UV sphere with `(rasterization + 1)^2` vertices.
///
/// Stack `i` sweeps the polar angle `i * 2π / rasterization`, ring `j` the azimuth. Triangles
/// are only emitted for the first `rasterization / 2` stacks, which covers polar angles 0..π;
/// the remaining vertex rows retrace the sphere and stay unreferenced. The first stack emits
/// one triangle per cell since its top edge collapses into the pole.
pub fn sphere(rasterization: u32, radius: f32) -> Result<MeshData> {
    check_rasterization(rasterization)?;
    check_dimension("sphere radius", radius)?;

    let r = rasterization;
    let alpha = 2.0 * PI / r as f32;
    let row = (r + 1) as usize;

    let mut vertices = Vec::new();
    vertices
        .try_reserve_exact(row * row * FLOATS_PER_VERTEX)
        .map_err(|e| {
            ViewerError::ResourceExhausted(format!("sphere at rasterization {r}: {e}"))
        })?;
    for i in 0..=r {
        let theta = i as f32 * alpha;
        for j in 0..=r {
            let phi = j as f32 * alpha;
            let position = Vector3::new(
                radius * theta.sin() * phi.sin(),
                radius * theta.sin() * phi.cos(),
                radius * theta.cos(),
            );
            let normal = position.normalize();
            ShapeVertex {
                position: position.into(),
                normal: normal.into(),
                tex_coords: [j as f32 / r as f32, 2.0 * i as f32 / r as f32],
            }
            .push_to(&mut vertices);
        }
    }

    let mut indices = Vec::new();
    for i in 0..r / 2 {
        for j in 0..r {
            let k1 = i * (r + 1) + j;
            let k2 = k1 + r + 1;
            if i != 0 {
                indices.extend_from_slice(&[k1, k2, k1 + 1]);
            }
            if i != r - 1 {
                indices.extend_from_slice(&[k1 + 1, k2, k2 + 1]);
            }
        }
    }

    Ok(MeshData { vertices, indices })
}

/// Accepts `1..=RASTERIZATION_LIMIT`.
pub fn check_rasterization(rasterization: u32) -> Result<()> {
    if !(1..=RASTERIZATION_LIMIT).contains(&rasterization) {
        return Err(ViewerError::InvalidParameter(format!(
            "sphere rasterization must be within 1..={RASTERIZATION_LIMIT}, got {rasterization}"
        )));
    }
    Ok(())
}

/// Axis-aligned box centred on the origin: `length` along X, `height` along Y, `width` along Z.
///
/// The eight corners are shared between faces, so each normal points out of its corner.
pub fn cube(length: f32, width: f32, height: f32) -> Result<MeshData> {
    check_dimension("cube length", length)?;
    check_dimension("cube width", width)?;
    check_dimension("cube height", height)?;

    let (l, w, h) = (length / 2.0, width / 2.0, height / 2.0);
    let corners: [([f32; 3], [f32; 2]); 8] = [
        ([-l, -h, w], [0.0, 0.0]),
        ([l, -h, w], [1.0, 0.0]),
        ([l, h, w], [1.0, 1.0]),
        ([-l, h, w], [0.0, 1.0]),
        ([-l, -h, -w], [0.0, 1.0]),
        ([l, -h, -w], [1.0, 1.0]),
        ([l, h, -w], [1.0, 0.0]),
        ([-l, h, -w], [0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(corners.len() * FLOATS_PER_VERTEX);
    for (position, tex_coords) in corners {
        ShapeVertex {
            position,
            normal: Vector3::from(position).normalize().into(),
            tex_coords,
        }
        .push_to(&mut vertices);
    }

    #[rustfmt::skip]
    let indices = vec![
        0, 1, 3,  1, 2, 3,
        5, 1, 2,  5, 6, 2,
        4, 5, 6,  4, 7, 6,
        0, 3, 7,  0, 4, 7,
        0, 1, 5,  0, 4, 5,
        3, 2, 6,  3, 7, 6,
    ];

    Ok(MeshData { vertices, indices })
}

/// Flat rectangle in the z = 0 plane facing +Z, two triangles with unshared corners.
pub fn quad(length: f32, width: f32) -> Result<MeshData> {
    check_dimension("quad length", length)?;
    check_dimension("quad width", width)?;

    let (l, w) = (length / 2.0, width / 2.0);
    let corners: [([f32; 3], [f32; 2]); 6] = [
        ([-l, -w, 0.0], [1.0, 1.0]),
        ([l, -w, 0.0], [1.0, 0.0]),
        ([l, w, 0.0], [0.0, 0.0]),
        ([-l, -w, 0.0], [1.0, 1.0]),
        ([l, w, 0.0], [0.0, 0.0]),
        ([-l, w, 0.0], [0.0, 1.0]),
    ];

    let mut vertices = Vec::with_capacity(corners.len() * FLOATS_PER_VERTEX);
    for (position, tex_coords) in corners {
        ShapeVertex {
            position,
            normal: [0.0, 0.0, 1.0],
            tex_coords,
        }
        .push_to(&mut vertices);
    }

    Ok(MeshData {
        vertices,
        indices: (0..6).collect(),
    })
}

fn check_dimension(what: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ViewerError::InvalidParameter(format!(
            "{what} must be a positive finite number, got {value}"
        )))
    }
}
