//! wgpu implementation of the render backend, shader program and texture provider contracts.
//!
//! wgpu has no immediate mode, so draw calls are recorded between
//! [`RenderBackend::begin_frame`] and [`RenderBackend::end_frame`] together with the model
//! matrix and textures bound at the time, then replayed in one render pass. Uniforms set on the
//! program after the traversal (view, projection, lighting) therefore apply to the whole frame.

use std::{
    cell::{Cell, RefCell},
    collections::HashMap,
    iter,
};

use cgmath::{Matrix4, SquareMatrix, Vector3};

use crate::{
    camera::OPENGL_TO_WGPU_MATRIX,
    context::Context,
    data_structures::texture::{self, Texture},
    error::{Result, ViewerError},
    pipelines::globe::{
        GlobalsUniform, GlobeLayouts, MODEL_SLOT_SIZE, ModelUniform, mk_globe_pipeline,
    },
    render::{
        backend::{RenderBackend, VertexArrayHandle, VertexArrayLayout},
        shader::{self as names, ShaderProgram, ShaderSource},
    },
    resources::{self, TextureCache, TextureHandle, TextureProvider, TextureRole},
};

/// The globe render pipeline plus the uniform values set on it by name.
#[derive(Debug)]
pub struct WgpuProgram {
    pipeline: wgpu::RenderPipeline,
    model: Cell<Matrix4<f32>>,
    globals: RefCell<GlobalsUniform>,
}

impl WgpuProgram {
    pub fn model_matrix(&self) -> Matrix4<f32> {
        self.model.get()
    }

    pub fn globals(&self) -> GlobalsUniform {
        *self.globals.borrow()
    }
}

impl ShaderProgram for WgpuProgram {
    fn attrib_location(&self, name: &str) -> Option<u32> {
        match name {
            names::ATTRIB_POSITION => Some(0),
            names::ATTRIB_NORMAL => Some(1),
            names::ATTRIB_TEX_COORD => Some(2),
            _ => None,
        }
    }

    fn set_int(&self, name: &str, value: i32) {
        // Samplers are fixed by the bind group layout: diffuse at binding 0, specular at 2.
        let expected = match name {
            names::MATERIAL_DIFFUSE => 0,
            names::MATERIAL_SPECULAR => 1,
            _ => return,
        };
        if value != expected {
            log::warn!("{} must sample texture unit {}, got {}", name, expected, value);
        }
    }

    fn set_float(&self, name: &str, value: f32) {
        let mut globals = self.globals.borrow_mut();
        match name {
            names::LIGHT_AMBIENT => globals.light_strength[0] = value,
            names::LIGHT_DIFFUSE => globals.light_strength[1] = value,
            names::LIGHT_SPECULAR => globals.light_strength[2] = value,
            names::MATERIAL_SHININESS => globals.material[3] = value,
            _ => {}
        }
    }

    fn set_vec3(&self, name: &str, value: Vector3<f32>) {
        let mut globals = self.globals.borrow_mut();
        let target = match name {
            names::UNIFORM_VIEW_POS => &mut globals.view_pos,
            names::LIGHT_POSITION => &mut globals.light_position,
            names::MATERIAL_SPECULAR_COLOR => &mut globals.material,
            _ => return,
        };
        target[..3].copy_from_slice(&[value.x, value.y, value.z]);
    }

    fn set_mat4(&self, name: &str, value: &Matrix4<f32>) {
        match name {
            names::UNIFORM_MODEL => self.model.set(*value),
            names::UNIFORM_VIEW => self.globals.borrow_mut().view = (*value).into(),
            names::UNIFORM_PROJECTION => {
                self.globals.borrow_mut().projection = (OPENGL_TO_WGPU_MATRIX * *value).into()
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct DrawCall {
    vertex_array: VertexArrayHandle,
    material: (TextureHandle, TextureHandle),
    model: Matrix4<f32>,
    first_index: u32,
    count: u32,
}

pub struct WgpuBackend {
    ctx: Context,
    layouts: GlobeLayouts,
    sampler: wgpu::Sampler,
    globals_buffer: wgpu::Buffer,
    globals_bind_group: wgpu::BindGroup,
    model_buffer: wgpu::Buffer,
    model_bind_group: wgpu::BindGroup,
    model_slots: u64,
    vertex_buffer: Option<wgpu::Buffer>,
    index_buffer: Option<wgpu::Buffer>,
    vertex_arrays: HashMap<VertexArrayHandle, VertexArrayLayout>,
    next_vertex_array: u32,
    textures: Vec<Texture>,
    texture_cache: TextureCache<Texture>,
    placeholder: Option<TextureHandle>,
    materials: HashMap<(TextureHandle, TextureHandle), wgpu::BindGroup>,
    assets: HashMap<String, Vec<u8>>,
    bound_vertex_array: Option<VertexArrayHandle>,
    bound_textures: [Option<TextureHandle>; 2],
    draws: Vec<DrawCall>,
}

impl WgpuBackend {
    /// `assets` holds preloaded file contents keyed by asset name; anything missing from it is
    /// read from disk on demand.
    pub fn new(ctx: Context, assets: HashMap<String, Vec<u8>>) -> Self {
        let device = &ctx.device;
        let layouts = GlobeLayouts::new(device);
        let sampler = texture::create_default_sampler(device);

        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Globals Buffer"),
            size: std::mem::size_of::<GlobalsUniform>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.globals,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
            label: Some("globals_bind_group"),
        });
        let (model_buffer, model_bind_group) = Self::model_resources(device, &layouts, 4);

        Self {
            ctx,
            layouts,
            sampler,
            globals_buffer,
            globals_bind_group,
            model_buffer,
            model_bind_group,
            model_slots: 4,
            vertex_buffer: None,
            index_buffer: None,
            vertex_arrays: HashMap::new(),
            next_vertex_array: 1,
            textures: Vec::new(),
            texture_cache: TextureCache::default(),
            placeholder: None,
            materials: HashMap::new(),
            assets,
            bound_vertex_array: None,
            bound_textures: [None; 2],
            draws: Vec::new(),
        }
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut Context {
        &mut self.ctx
    }

    fn model_resources(
        device: &wgpu::Device,
        layouts: &GlobeLayouts,
        slots: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Model Buffer"),
            size: slots * MODEL_SLOT_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &layouts.model,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as u64),
                }),
            }],
            label: Some("model_bind_group"),
        });
        (buffer, bind_group)
    }

    fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> Result<wgpu::Buffer> {
        let max = self.ctx.device.limits().max_buffer_size;
        // write_buffer needs sizes that are a multiple of 4.
        let size = size.max(4).next_multiple_of(wgpu::COPY_BUFFER_ALIGNMENT);
        if size > max {
            return Err(ViewerError::ResourceExhausted(format!(
                "{label} needs {size} bytes, device allows {max}"
            )));
        }
        Ok(self.ctx.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }

    fn write(
        buffer: Option<&wgpu::Buffer>,
        queue: &wgpu::Queue,
        offset: u64,
        bytes: &[u8],
    ) -> Result<()> {
        let buffer = buffer.ok_or_else(|| {
            ViewerError::ResourceExhausted("upload before buffers were allocated".to_string())
        })?;
        if offset + bytes.len() as u64 > buffer.size() {
            return Err(ViewerError::ResourceExhausted(format!(
                "upload of {} bytes at {} overruns a {} byte buffer",
                bytes.len(),
                offset,
                buffer.size()
            )));
        }
        queue.write_buffer(buffer, offset, bytes);
        Ok(())
    }

    fn push_texture(&mut self, texture: Texture) -> TextureHandle {
        self.textures.push(texture);
        TextureHandle(self.textures.len() as u32 - 1)
    }

    fn ensure_material(&mut self, material: (TextureHandle, TextureHandle)) -> bool {
        if self.materials.contains_key(&material) {
            return true;
        }
        let (Some(diffuse), Some(specular)) = (
            self.textures.get(material.0.0 as usize),
            self.textures.get(material.1.0 as usize),
        ) else {
            log::warn!("Unknown texture handle in {:?}, draw skipped", material);
            return false;
        };
        let bind_group = resources::texture::material_bind_group(
            &self.ctx.device,
            &self.layouts.material,
            &self.sampler,
            diffuse,
            specular,
        );
        self.materials.insert(material, bind_group);
        true
    }

    fn ensure_model_slots(&mut self, slots: u64) {
        if slots <= self.model_slots {
            return;
        }
        let slots = slots.next_power_of_two();
        let (buffer, bind_group) = Self::model_resources(&self.ctx.device, &self.layouts, slots);
        self.model_buffer = buffer;
        self.model_bind_group = bind_group;
        self.model_slots = slots;
    }

    fn acquire_frame(&mut self) -> Result<Option<wgpu::SurfaceTexture>> {
        match self.ctx.surface.get_current_texture() {
            Ok(output) => Ok(Some(output)),
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                let size = self.ctx.window.inner_size();
                self.ctx.resize(size.width, size.height);
                log::warn!("Surface lost or outdated, frame skipped");
                Ok(None)
            }
            Err(wgpu::SurfaceError::OutOfMemory) => Err(ViewerError::ResourceExhausted(
                "out of memory acquiring the surface texture".to_string(),
            )),
            Err(e) => {
                log::warn!("Unable to acquire surface texture: {}", e);
                Ok(None)
            }
        }
    }
}

impl RenderBackend for WgpuBackend {
    type Program = WgpuProgram;

    fn create_program(&mut self, source: &ShaderSource) -> Result<WgpuProgram> {
        // Both stages are entry points of the same WGSL module.
        if source.vertex != source.fragment {
            return Err(ViewerError::ResourceExhausted(format!(
                "{}: separate vertex and fragment modules are not supported",
                source.label
            )));
        }
        let pipeline = mk_globe_pipeline(
            &self.ctx.device,
            self.ctx.config.format,
            &self.layouts,
            &source.label,
            &source.vertex,
        );
        log::info!("Created program {}", source.label);
        Ok(WgpuProgram {
            pipeline,
            model: Cell::new(Matrix4::identity()),
            globals: RefCell::new(GlobalsUniform::default()),
        })
    }

    fn allocate_buffers(&mut self, vertex_bytes: u64, index_bytes: u64) -> Result<()> {
        let vertex = self.create_buffer(
            "Scene Vertex Buffer",
            vertex_bytes,
            wgpu::BufferUsages::VERTEX,
        )?;
        let index =
            self.create_buffer("Scene Index Buffer", index_bytes, wgpu::BufferUsages::INDEX)?;
        self.vertex_buffer = Some(vertex);
        self.index_buffer = Some(index);
        Ok(())
    }

    fn vertex_sub_data(&mut self, byte_offset: u64, data: &[f32]) -> Result<()> {
        Self::write(
            self.vertex_buffer.as_ref(),
            &self.ctx.queue,
            byte_offset,
            bytemuck::cast_slice(data),
        )
    }

    fn index_sub_data(&mut self, byte_offset: u64, data: &[u32]) -> Result<()> {
        Self::write(
            self.index_buffer.as_ref(),
            &self.ctx.queue,
            byte_offset,
            bytemuck::cast_slice(data),
        )
    }

    fn create_vertex_array(&mut self, layout: &VertexArrayLayout) -> Result<VertexArrayHandle> {
        let handle = VertexArrayHandle(self.next_vertex_array);
        self.next_vertex_array += 1;
        self.vertex_arrays.insert(handle, layout.clone());
        Ok(handle)
    }

    fn delete_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.vertex_arrays.remove(&vertex_array);
    }

    fn release_buffers(&mut self) {
        if let Some(buffer) = self.vertex_buffer.take() {
            buffer.destroy();
        }
        if let Some(buffer) = self.index_buffer.take() {
            buffer.destroy();
        }
    }

    fn set_viewport(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    fn begin_frame(&mut self) -> Result<()> {
        self.draws.clear();
        self.bound_vertex_array = None;
        self.bound_textures = [None; 2];
        Ok(())
    }

    fn bind_vertex_array(&mut self, vertex_array: VertexArrayHandle) {
        self.bound_vertex_array = Some(vertex_array);
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureHandle) {
        match self.bound_textures.get_mut(unit as usize) {
            Some(slot) => *slot = Some(texture),
            None => log::warn!("Texture unit {} is not sampled by the globe shader", unit),
        }
    }

    fn draw_elements(&mut self, program: &WgpuProgram, count: u32, index_byte_offset: u64) {
        let Some(vertex_array) = self.bound_vertex_array else {
            log::warn!("Draw without a bound vertex array skipped");
            return;
        };
        let (Some(diffuse), Some(specular)) = (
            self.bound_textures[0].or(self.placeholder),
            self.bound_textures[1].or(self.placeholder),
        ) else {
            log::warn!("Draw without bound textures skipped");
            return;
        };
        if !self.ensure_material((diffuse, specular)) {
            return;
        }
        self.draws.push(DrawCall {
            vertex_array,
            material: (diffuse, specular),
            model: program.model_matrix(),
            first_index: (index_byte_offset / 4) as u32,
            count,
        });
    }

    fn end_frame(&mut self, program: &WgpuProgram) -> Result<()> {
        let draws = std::mem::take(&mut self.draws);
        if !self.ctx.is_surface_configured() {
            return Ok(());
        }
        if self.vertex_buffer.is_none() || self.index_buffer.is_none() {
            log::warn!("Frame ended without scene buffers");
            return Ok(());
        }

        self.ctx.queue.write_buffer(
            &self.globals_buffer,
            0,
            bytemuck::cast_slice(&[program.globals()]),
        );

        let slots = draws.len() as u64;
        self.ensure_model_slots(slots);
        let mut models = vec![0u8; (slots.max(1) * MODEL_SLOT_SIZE) as usize];
        for (i, draw) in draws.iter().enumerate() {
            let uniform = ModelUniform {
                model: draw.model.into(),
            };
            let start = i * MODEL_SLOT_SIZE as usize;
            let bytes = bytemuck::bytes_of(&uniform);
            models[start..start + bytes.len()].copy_from_slice(bytes);
        }
        self.ctx.queue.write_buffer(&self.model_buffer, 0, &models);

        let Some(output) = self.acquire_frame()? else {
            return Ok(());
        };
        let (Some(vertex_buffer), Some(index_buffer)) =
            (self.vertex_buffer.as_ref(), self.index_buffer.as_ref())
        else {
            return Ok(());
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.ctx.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
                multiview_mask: None,
            });

            render_pass.set_pipeline(&program.pipeline);
            render_pass.set_bind_group(0, &self.globals_bind_group, &[]);
            // Indices are rebased against the whole buffer, so every vertex array reads it
            // from the start.
            render_pass.set_vertex_buffer(0, vertex_buffer.slice(..));
            render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);

            for (i, draw) in draws.iter().enumerate() {
                if !self.vertex_arrays.contains_key(&draw.vertex_array) {
                    log::warn!("Vertex array {:?} was deleted, draw skipped", draw.vertex_array);
                    continue;
                }
                let Some(material) = self.materials.get(&draw.material) else {
                    continue;
                };
                let offset = (i as u64 * MODEL_SLOT_SIZE) as u32;
                render_pass.set_bind_group(1, &self.model_bind_group, &[offset]);
                render_pass.set_bind_group(2, material, &[]);
                render_pass.draw_indexed(draw.first_index..draw.first_index + draw.count, 0, 0..1);
            }
        }

        self.ctx.queue.submit(iter::once(encoder.finish()));
        self.ctx.window.pre_present_notify();
        output.present();
        Ok(())
    }
}

impl TextureProvider for WgpuBackend {
    fn load(&mut self, path: &str, role: TextureRole) -> Result<TextureHandle> {
        if let Some(handle) = self.texture_cache.handle(path, role) {
            return Ok(handle);
        }
        let (device, queue, assets) = (&self.ctx.device, &self.ctx.queue, &self.assets);
        let texture = self
            .texture_cache
            .upload_with(path, || {
                let read_now;
                let bytes = match assets.get(path) {
                    Some(bytes) => bytes.as_slice(),
                    None => {
                        read_now = futures::executor::block_on(resources::load_binary(path))
                            .map_err(|e| ViewerError::AssetMissing(e.to_string()))?;
                        read_now.as_slice()
                    }
                };
                resources::texture::load_texture(device, queue, bytes, path)
            })?
            .view_as(resources::texture::view_format(role));
        let handle = self.push_texture(texture);
        self.texture_cache.insert_handle(path, role, handle);
        log::info!("Loaded {:?} texture {}", role, path);
        Ok(handle)
    }

    fn transparent_placeholder(&mut self) -> Result<TextureHandle> {
        if let Some(placeholder) = self.placeholder {
            return Ok(placeholder);
        }
        let texture = Texture::create_solid(
            [0, 0, 0, 0],
            1,
            1,
            "transparent placeholder",
            &self.ctx.device,
            &self.ctx.queue,
        );
        let handle = self.push_texture(texture);
        self.placeholder = Some(handle);
        Ok(handle)
    }
}
