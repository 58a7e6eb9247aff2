//! Packing the scene graph into shared GPU buffers and drawing it every frame.
//!
//! The [`Renderer`] is generic over a [`RenderBackend`], so the same packing and traversal run
//! against wgpu in the viewer and against a recording backend in tests.
//!
//! # Frame structure
//!
//! 1. [`Renderer::initialize`] packs every shape in pre-order (see [`packing`]) and creates one
//!    vertex array per shape over the shared vertex buffer.
//! 2. [`Renderer::render`] walks the graph in the same order, binds each shape's textures
//!    according to its node's [`TexturePolicy`], sets the model matrix and draws the shape's
//!    index range. View, projection, light and material uniforms are set once after the
//!    traversal.

pub mod backend;
pub mod packing;
pub mod shader;
pub mod wgpu_backend;

use std::rc::Rc;

use cgmath::Vector3;

use crate::{
    camera::OrbitCamera,
    config::LightingConfig,
    data_structures::{
        geometry::{FLOATS_PER_VERTEX, VERTEX_STRIDE},
        scene_graph::{SceneGraph, TexturePolicy},
        shape::Shape,
    },
    error::{Result, ViewerError},
    layers::LayerView,
    render::{
        backend::{RenderBackend, VertexArrayHandle, VertexArrayLayout, VertexAttribute},
        packing::PackedScene,
        shader::{self as names, ShaderProgram, ShaderSource},
    },
    resources::{TextureHandle, TextureRole},
};

type VisibilityRule = fn(&dyn LayerView) -> bool;

fn always_visible(_: &dyn LayerView) -> bool {
    true
}

fn primary_body_visible(layers: &dyn LayerView) -> bool {
    layers.show_primary_body_texture()
}

fn cloud_shell_visible(layers: &dyn LayerView) -> bool {
    layers.show_cloud_texture()
}

const TEXTURE_POLICIES: [(TexturePolicy, VisibilityRule); 3] = [
    (TexturePolicy::Default, always_visible),
    (TexturePolicy::PrimaryBody, primary_body_visible),
    (TexturePolicy::CloudShell, cloud_shell_visible),
];

/// Whether a node with `policy` shows its diffuse and specular textures under `layers`.
pub fn textures_visible(policy: TexturePolicy, layers: &dyn LayerView) -> bool {
    TEXTURE_POLICIES
        .iter()
        .find(|(candidate, _)| *candidate == policy)
        .is_none_or(|(_, rule)| rule(layers))
}

pub struct Renderer<B: RenderBackend> {
    backend: B,
    program: Option<B::Program>,
    layers: Rc<dyn LayerView>,
    lighting: LightingConfig,
    placeholder: TextureHandle,
    packed: Option<PackedScene>,
    vertex_arrays: Vec<VertexArrayHandle>,
    viewport: (u32, u32),
}

impl<B: RenderBackend> Renderer<B> {
    /// `placeholder` is bound whenever a layer is hidden and no shape-specific transparent
    /// texture exists, and whenever a texture role is empty.
    pub fn new(
        backend: B,
        layers: Rc<dyn LayerView>,
        lighting: LightingConfig,
        placeholder: TextureHandle,
    ) -> Self {
        Self {
            backend,
            program: None,
            layers,
            lighting,
            placeholder,
            packed: None,
            vertex_arrays: Vec::new(),
            viewport: (0, 0),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn program(&self) -> Option<&B::Program> {
        self.program.as_ref()
    }

    pub fn is_packed(&self) -> bool {
        self.packed.is_some()
    }

    pub fn packed(&self) -> Option<&PackedScene> {
        self.packed.as_ref()
    }

    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Compiles the program on first use, sets the viewport and packs `graph`.
    pub fn initialize(&mut self, width: u32, height: u32, graph: &mut SceneGraph) -> Result<()> {
        if self.program.is_none() {
            self.program = Some(self.backend.create_program(&ShaderSource::globe())?);
        }
        self.resize(width, height);
        if self.packed.is_some() {
            self.dispose(graph);
        }
        self.pack(graph)
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = (width, height);
        self.backend.set_viewport(width, height);
    }

    /// Releases every buffer and vertex array and packs `graph` again. Required after any edit
    /// that changes a shape's vertex or index count.
    pub fn reinitialize(&mut self, graph: &mut SceneGraph) -> Result<()> {
        self.dispose(graph);
        let (width, height) = self.viewport;
        self.initialize(width, height, graph)
    }

    /// Frees the shared buffers and all vertex arrays. The program is kept for a later
    /// [`Renderer::initialize`].
    pub fn dispose(&mut self, graph: &mut SceneGraph) {
        for vertex_array in self.vertex_arrays.drain(..) {
            self.backend.delete_vertex_array(vertex_array);
        }
        graph
            .shapes_mut()
            .for_each(|shape| shape.set_vertex_array(None));
        if self.packed.take().is_some() {
            self.backend.release_buffers();
            log::debug!("Released scene buffers");
        }
    }

    fn pack(&mut self, graph: &mut SceneGraph) -> Result<()> {
        let packed = PackedScene::pack(graph)?;

        self.backend
            .allocate_buffers(packed.vertex_bytes(), packed.index_bytes())?;
        for slot in &packed.slots {
            self.backend
                .vertex_sub_data(slot.vertex_offset, packed.slot_vertices(slot))?;
        }
        for slot in &packed.slots {
            self.backend
                .index_sub_data(slot.index_offset, packed.slot_indices(slot))?;
        }

        let attributes = self.vertex_attributes();
        for slot in &packed.slots {
            let vertex_array = self.backend.create_vertex_array(&VertexArrayLayout {
                stride: VERTEX_STRIDE,
                pack_offset: slot.vertex_offset,
                attributes: attributes.clone(),
            })?;
            self.vertex_arrays.push(vertex_array);
            if let Some(shape) = graph.node_mut(slot.node).and_then(|n| n.shape_mut()) {
                shape.set_vertex_array(Some(vertex_array));
            }
        }

        log::info!(
            "Packed {} shapes: {} vertices, {} indices ({} + {} bytes)",
            packed.slots.len(),
            packed.vertices.len() / FLOATS_PER_VERTEX,
            packed.indices.len(),
            packed.vertex_bytes(),
            packed.index_bytes()
        );
        self.packed = Some(packed);
        Ok(())
    }

    fn vertex_attributes(&self) -> Vec<VertexAttribute> {
        let location = |name: &str, fallback: u32| {
            self.program
                .as_ref()
                .and_then(|program| program.attrib_location(name))
                .unwrap_or(fallback)
        };
        vec![
            VertexAttribute {
                location: location(names::ATTRIB_POSITION, 0),
                components: 3,
                offset: 0,
            },
            VertexAttribute {
                location: location(names::ATTRIB_NORMAL, 1),
                components: 3,
                offset: 3 * 4,
            },
            VertexAttribute {
                location: location(names::ATTRIB_TEX_COORD, 2),
                components: 2,
                offset: 6 * 4,
            },
        ]
    }

    /// Draws one frame of `graph` as seen from `camera`.
    ///
    /// Does nothing but log a warning before the first [`Renderer::initialize`]. Fails with
    /// [`ViewerError::InvalidGraph`] if the graph no longer matches what was packed.
    pub fn render(&mut self, graph: &SceneGraph, camera: &OrbitCamera) -> Result<()> {
        let (Some(packed), Some(program)) = (self.packed.as_ref(), self.program.as_ref()) else {
            log::warn!("Render requested before the scene was packed, skipping frame");
            return Ok(());
        };

        let order = graph.shape_nodes()?;
        if order.len() != packed.slots.len() {
            return Err(ViewerError::InvalidGraph(format!(
                "{} shapes packed but {} in the scene, reinitialize the renderer",
                packed.slots.len(),
                order.len()
            )));
        }

        self.backend.begin_frame()?;

        let mut index_offset = 0u64;
        for (node_id, slot) in order.into_iter().zip(&packed.slots) {
            let Some(node) = graph.node(node_id) else {
                continue;
            };
            let Some(shape) = node.shape() else {
                continue;
            };
            if slot.node != node_id
                || slot.index_count as usize != shape.index_count()
                || slot.generation != shape.generation()
            {
                return Err(ViewerError::InvalidGraph(format!(
                    "shape '{}' changed since packing, reinitialize the renderer",
                    node.name()
                )));
            }
            let Some(vertex_array) = shape.vertex_array() else {
                return Err(ViewerError::InvalidGraph(format!(
                    "shape '{}' has no vertex array",
                    node.name()
                )));
            };

            self.backend.bind_vertex_array(vertex_array);
            if textures_visible(node.policy(), self.layers.as_ref()) {
                for role in [TextureRole::Diffuse, TextureRole::Specular] {
                    let texture = self.texture_or_placeholder(shape, role);
                    self.backend.bind_texture(role.unit(), texture);
                }
            } else {
                let transparent = self.texture_or_placeholder(shape, TextureRole::Transparent);
                self.backend.bind_texture(TextureRole::Diffuse.unit(), transparent);
                self.backend.bind_texture(TextureRole::Specular.unit(), transparent);
            }

            program.set_mat4(names::UNIFORM_MODEL, &shape.model_matrix());
            self.backend
                .draw_elements(program, slot.index_count, index_offset);
            index_offset += shape.index_buffer_size();
        }

        let position = camera.position();
        program.set_mat4(names::UNIFORM_VIEW, &camera.view_matrix());
        program.set_mat4(names::UNIFORM_PROJECTION, &camera.projection_matrix());
        program.set_vec3(
            names::UNIFORM_VIEW_POS,
            Vector3::new(position.x, position.y, position.z),
        );

        let lighting = &self.lighting;
        program.set_int(names::MATERIAL_DIFFUSE, TextureRole::Diffuse.unit() as i32);
        program.set_int(names::MATERIAL_SPECULAR, TextureRole::Specular.unit() as i32);
        program.set_vec3(
            names::MATERIAL_SPECULAR_COLOR,
            Vector3::from(lighting.material_specular),
        );
        program.set_float(names::MATERIAL_SHININESS, lighting.shininess);
        program.set_vec3(
            names::LIGHT_POSITION,
            Vector3::from(lighting.light_position),
        );
        program.set_float(names::LIGHT_AMBIENT, lighting.ambient);
        program.set_float(names::LIGHT_DIFFUSE, lighting.diffuse);
        program.set_float(names::LIGHT_SPECULAR, lighting.specular);

        self.backend.end_frame(program)
    }

    /// The shape's texture for `role`, falling back to its transparent texture and then to the
    /// renderer's placeholder.
    fn texture_or_placeholder(&self, shape: &Shape, role: TextureRole) -> TextureHandle {
        shape
            .texture(role)
            .or_else(|| shape.texture(TextureRole::Transparent))
            .unwrap_or(self.placeholder)
    }
}
