//! Flattening a scene graph into one vertex array and one rebased index array.
//!
//! Packing walks [`SceneGraph::pre_order`] and records where every shape landed. The draw
//! traversal replays the same slots, so the byte offset used for a shape's draw call is always
//! the one its indices were written at.

use crate::{
    data_structures::{
        geometry::{INDEX_SIZE, VERTEX_STRIDE},
        scene_graph::{NodeId, SceneGraph},
    },
    error::{Result, ViewerError},
};

/// Where one shape's data lives inside the shared buffers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackSlot {
    pub node: NodeId,
    /// Byte offset of the shape's first vertex in the vertex buffer.
    pub vertex_offset: u64,
    /// Byte offset of the shape's first index in the index buffer.
    pub index_offset: u64,
    /// Number of vertices packed before this shape; added to every local index.
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub index_count: u32,
    /// [`crate::data_structures::shape::Shape::generation`] at pack time.
    pub generation: u64,
}

impl PackSlot {
    pub fn vertex_range(&self) -> std::ops::Range<u32> {
        self.first_vertex..self.first_vertex + self.vertex_count
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct PackedScene {
    pub slots: Vec<PackSlot>,
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl PackedScene {
    /// Packs every shape of `graph` in pre-order.
    ///
    /// Fails with [`ViewerError::InvalidGraph`] if the graph is not a tree and with
    /// [`ViewerError::ResourceExhausted`] if the rebased indices no longer fit in `u32`.
    pub fn pack(graph: &SceneGraph) -> Result<Self> {
        let shape_nodes = graph.shape_nodes()?;

        let mut packed = PackedScene {
            slots: Vec::with_capacity(shape_nodes.len()),
            vertices: Vec::with_capacity((graph.vertex_buffer_size()? / 4) as usize),
            indices: Vec::with_capacity((graph.index_buffer_size()? / INDEX_SIZE) as usize),
        };

        let mut vertex_offset = 0u64;
        let mut index_offset = 0u64;
        let mut first_vertex = 0u32;
        for node in shape_nodes {
            let Some(shape) = graph.node(node).and_then(|n| n.shape()) else {
                continue;
            };
            let vertex_count = to_u32(shape.vertex_count(), "vertex count")?;
            let index_count = to_u32(shape.index_count(), "index count")?;

            packed.vertices.extend_from_slice(shape.vertices());
            for &index in shape.indices() {
                let rebased = first_vertex.checked_add(index).ok_or_else(|| {
                    ViewerError::ResourceExhausted(format!(
                        "rebased index of '{}' overflows u32",
                        graph.node(node).map(|n| n.name()).unwrap_or_default()
                    ))
                })?;
                packed.indices.push(rebased);
            }

            packed.slots.push(PackSlot {
                node,
                vertex_offset,
                index_offset,
                first_vertex,
                vertex_count,
                index_count,
                generation: shape.generation(),
            });

            vertex_offset += shape.vertex_buffer_size();
            index_offset += shape.index_buffer_size();
            first_vertex = first_vertex.checked_add(vertex_count).ok_or_else(|| {
                ViewerError::ResourceExhausted("packed vertex count overflows u32".to_string())
            })?;
        }

        Ok(packed)
    }

    pub fn vertex_bytes(&self) -> u64 {
        self.vertices.len() as u64 * 4
    }

    pub fn index_bytes(&self) -> u64 {
        self.indices.len() as u64 * INDEX_SIZE
    }

    pub fn slot(&self, node: NodeId) -> Option<&PackSlot> {
        self.slots.iter().find(|slot| slot.node == node)
    }

    /// The slice of packed vertex floats belonging to `slot`.
    pub fn slot_vertices(&self, slot: &PackSlot) -> &[f32] {
        let start = (slot.vertex_offset / 4) as usize;
        let len = slot.vertex_count as usize * (VERTEX_STRIDE / 4) as usize;
        &self.vertices[start..start + len]
    }

    /// The rebased indices belonging to `slot`.
    pub fn slot_indices(&self, slot: &PackSlot) -> &[u32] {
        let start = (slot.index_offset / INDEX_SIZE) as usize;
        &self.indices[start..start + slot.index_count as usize]
    }
}

fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| ViewerError::ResourceExhausted(format!("{what} {value} does not fit in u32")))
}
