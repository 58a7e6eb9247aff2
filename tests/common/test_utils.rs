#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    rc::Rc,
};

use cgmath::{Matrix4, SquareMatrix, Vector3};
use globe_viewer::{
    config::{LightingConfig, SceneConfig},
    data_structures::scene_graph::SceneGraph,
    error::{Result, ViewerError},
    layers::LayerConfiguration,
    render::{
        Renderer,
        backend::{RenderBackend, VertexArrayHandle, VertexArrayLayout},
        shader::{self, ShaderProgram, ShaderSource},
    },
    resources::{TextureHandle, TextureProvider, TextureRole},
    scene::SceneBuilder,
};

pub const EPSILON: f32 = 1e-5;

pub fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < EPSILON
}

pub fn assert_close(actual: f32, expected: f32) {
    assert!(
        approx_eq(actual, expected),
        "expected {expected}, got {actual}"
    );
}

pub fn assert_vec3_close(actual: Vector3<f32>, expected: Vector3<f32>) {
    assert!(
        approx_eq(actual.x, expected.x)
            && approx_eq(actual.y, expected.y)
            && approx_eq(actual.z, expected.z),
        "expected {expected:?}, got {actual:?}"
    );
}

pub fn assert_matrix_close(actual: &Matrix4<f32>, expected: &Matrix4<f32>) {
    let a: &[[f32; 4]; 4] = actual.as_ref();
    let e: &[[f32; 4]; 4] = expected.as_ref();
    for c in 0..4 {
        for r in 0..4 {
            assert!(
                (a[c][r] - e[c][r]).abs() < 1e-4,
                "column {c} row {r}: expected {expected:?}, got {actual:?}"
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Uniform {
    Int(i32),
    Float(f32),
    Vec3(Vector3<f32>),
    Mat4(Matrix4<f32>),
}

/// A program that remembers every uniform written to it.
#[derive(Debug, Default)]
pub struct RecordingProgram {
    pub uniforms: RefCell<HashMap<String, Uniform>>,
    pub writes: Cell<usize>,
}

impl RecordingProgram {
    pub fn uniform(&self, name: &str) -> Option<Uniform> {
        self.uniforms.borrow().get(name).cloned()
    }

    pub fn mat4(&self, name: &str) -> Option<Matrix4<f32>> {
        match self.uniform(name) {
            Some(Uniform::Mat4(m)) => Some(m),
            _ => None,
        }
    }

    fn set(&self, name: &str, value: Uniform) {
        self.writes.set(self.writes.get() + 1);
        self.uniforms.borrow_mut().insert(name.to_string(), value);
    }
}

impl ShaderProgram for RecordingProgram {
    fn attrib_location(&self, name: &str) -> Option<u32> {
        match name {
            shader::ATTRIB_POSITION => Some(0),
            shader::ATTRIB_NORMAL => Some(1),
            shader::ATTRIB_TEX_COORD => Some(2),
            _ => None,
        }
    }

    fn set_int(&self, name: &str, value: i32) {
        self.set(name, Uniform::Int(value));
    }

    fn set_float(&self, name: &str, value: f32) {
        self.set(name, Uniform::Float(value));
    }

    fn set_vec3(&self, name: &str, value: Vector3<f32>) {
        self.set(name, Uniform::Vec3(value));
    }

    fn set_mat4(&self, name: &str, value: &Matrix4<f32>) {
        self.set(name, Uniform::Mat4(*value));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateProgram(String),
    AllocateBuffers { vertex_bytes: u64, index_bytes: u64 },
    VertexSubData { byte_offset: u64, floats: usize },
    IndexSubData { byte_offset: u64, indices: usize },
    CreateVertexArray(VertexArrayHandle),
    DeleteVertexArray(VertexArrayHandle),
    ReleaseBuffers,
    SetViewport(u32, u32),
    BeginFrame,
    BindVertexArray(VertexArrayHandle),
    BindTexture { unit: u32, texture: TextureHandle },
    DrawElements { count: u32, index_byte_offset: u64 },
    EndFrame,
}

/// What was bound when a draw call was issued.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub vertex_array: Option<VertexArrayHandle>,
    pub textures: [Option<TextureHandle>; 2],
    pub model: Matrix4<f32>,
    pub count: u32,
    pub index_byte_offset: u64,
}

/// A backend that keeps CPU copies of its buffers and records every call.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<Call>,
    pub vertex_buffer: Vec<f32>,
    pub index_buffer: Vec<u32>,
    pub vertex_arrays: HashMap<VertexArrayHandle, VertexArrayLayout>,
    pub draws: Vec<DrawRecord>,
    /// Allocations larger than this many bytes fail with `ResourceExhausted`.
    pub buffer_limit: Option<u64>,
    next_vertex_array: u32,
    bound_vertex_array: Option<VertexArrayHandle>,
    bound_textures: [Option<TextureHandle>; 2],
    frame_draws: Vec<DrawRecord>,
}

impl RecordingBackend {
    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|call| matches(call)).count()
    }
}

impl RenderBackend for RecordingBackend {
    type Program = RecordingProgram;

    fn create_program(&mut self, source: &ShaderSource) -> Result<RecordingProgram> {
        self.calls.push(Call::CreateProgram(source.label.clone()));
        Ok(RecordingProgram::default())
    }

    fn allocate_buffers(&mut self, vertex_bytes: u64, index_bytes: u64) -> Result<()> {
        if let Some(limit) = self.buffer_limit {
            if vertex_bytes > limit || index_bytes > limit {
                return Err(ViewerError::ResourceExhausted(format!(
                    "{vertex_bytes}/{index_bytes} bytes over the {limit} byte limit"
                )));
            }
        }
        self.calls.push(Call::AllocateBuffers {
            vertex_bytes,
            index_bytes,
        });
        self.vertex_buffer = vec![0.0; (vertex_bytes / 4) as usize];
        self.index_buffer = vec![0; (index_bytes / 4) as usize];
        Ok(())
    }

    fn vertex_sub_data(&mut self, byte_offset: u64, data: &[f32]) -> Result<()> {
        self.calls.push(Call::VertexSubData {
            byte_offset,
            floats: data.len(),
        });
        let start = (byte_offset / 4) as usize;
        self.vertex_buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn index_sub_data(&mut self, byte_offset: u64, data: &[u32]) -> Result<()> {
        self.calls.push(Call::IndexSubData {
            byte_offset,
            indices: data.len(),
        });
        let start = (byte_offset / 4) as usize;
        self.index_buffer[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn create_vertex_array(&mut self, layout: &VertexArrayLayout) -> Result<VertexArrayHandle> {
        self.next_vertex_array += 1;
        let handle = VertexArrayHandle(self.next_vertex_array);
        self.calls.push(Call::CreateVertexArray(handle));
        self.vertex_arrays.insert(handle, layout.clone());
        Ok(handle)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.calls.push(Call::DeleteVertexArray(vertex_array));
        self.vertex_arrays.remove(&vertex_array);
    }

    fn release_buffers(&mut self) {
        self.calls.push(Call::ReleaseBuffers);
        self.vertex_buffer.clear();
        self.index_buffer.clear();
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.calls.push(Call::SetViewport(width, height));
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.calls.push(Call::BeginFrame);
        self.bound_vertex_array = None;
        self.bound_textures = [None; 2];
        self.frame_draws.clear();
        Ok(())
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.calls.push(Call::BindVertexArray(vertex_array));
        self.bound_vertex_array = Some(vertex_array);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        self.calls.push(Call::BindTexture { unit, texture });
        self.bound_textures[unit as usize] = Some(texture);
    }

    fn draw_elements(&mut self, program: &RecordingProgram, count: u32, index_byte_offset: u64) {
        self.calls.push(Call::DrawElements {
            count,
            index_byte_offset,
        });
        self.frame_draws.push(DrawRecord {
            vertex_array: self.bound_vertex_array,
            textures: self.bound_textures,
            model: program
                .mat4(shader::UNIFORM_MODEL)
                .unwrap_or_else(Matrix4::identity),
            count,
            index_byte_offset,
        });
    }

    fn end_frame(&mut self, _program: &RecordingProgram) -> Result<()> {
        self.calls.push(Call::EndFrame);
        self.draws = std::mem::take(&mut self.frame_draws);
        Ok(())
    }
}

/// Hands out sequential handles for known paths; everything else is missing.
#[derive(Debug)]
pub struct FakeTextures {
    pub available: HashSet<String>,
    /// Paths that decode but are too large for the device.
    pub oversized: HashSet<String>,
    pub loaded: HashMap<(String, TextureRole), TextureHandle>,
    next: u32,
    placeholder: Option<TextureHandle>,
}

impl FakeTextures {
    pub fn with_paths(paths: &[&str]) -> Self {
        Self {
            available: paths.iter().map(|p| p.to_string()).collect(),
            oversized: HashSet::new(),
            loaded: HashMap::new(),
            next: 0,
            placeholder: None,
        }
    }

    /// Every texture the default scene configuration names.
    pub fn for_scene(config: &SceneConfig) -> Self {
        Self::with_paths(&[
            config.space_texture.as_str(),
            config.earth_diffuse_texture.as_str(),
            config.earth_specular_texture.as_str(),
            config.cloud_texture.as_str(),
        ])
    }

    pub fn handle(&self, path: &str, role: TextureRole) -> Option<TextureHandle> {
        self.loaded.get(&(path.to_string(), role)).copied()
    }

    fn issue(&mut self) -> TextureHandle {
        self.next += 1;
        TextureHandle(self.next)
    }
}

impl TextureProvider for FakeTextures {
    fn load(&mut self, path: &str, role: TextureRole) -> Result<TextureHandle> {
        if !self.available.contains(path) {
            return Err(ViewerError::AssetMissing(path.to_string()));
        }
        if self.oversized.contains(path) {
            return Err(ViewerError::ResourceExhausted(format!("{path} exceeds the texture limit")));
        }
        let handle = self.issue();
        self.loaded.insert((path.to_string(), role), handle);
        Ok(handle)
    }

    fn transparent_placeholder(&mut self) -> Result<TextureHandle> {
        if let Some(placeholder) = self.placeholder {
            return Ok(placeholder);
        }
        let handle = self.issue();
        self.placeholder = Some(handle);
        Ok(handle)
    }
}

/// A scene config small enough to inspect by hand.
pub fn small_scene_config(rasterization: u32) -> SceneConfig {
    SceneConfig {
        rasterization,
        ..SceneConfig::default()
    }
}

pub struct Fixture {
    pub graph: SceneGraph,
    pub textures: FakeTextures,
    pub layers: Rc<LayerConfiguration>,
    pub renderer: Renderer<RecordingBackend>,
}

/// Builds the globe scene on fake textures and a packed recording renderer.
pub fn packed_fixture(config: SceneConfig) -> Fixture {
    let mut textures = FakeTextures::for_scene(&config);
    let mut graph = SceneBuilder::new(config)
        .build(&mut textures)
        .expect("scene builds");
    let placeholder = textures
        .transparent_placeholder()
        .expect("placeholder available");
    let layers = Rc::new(LayerConfiguration::new());
    let mut renderer = Renderer::new(
        RecordingBackend::default(),
        layers.clone(),
        LightingConfig::default(),
        placeholder,
    );
    renderer
        .initialize(800, 600, &mut graph)
        .expect("scene packs");
    Fixture {
        graph,
        textures,
        layers,
        renderer,
    }
}
