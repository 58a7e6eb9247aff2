//! GPU textures and texture creation utilities.
//!
//! This module provides [`Texture`], a wrapper around a wgpu texture with its view and
//! sampler, plus helpers for the depth buffer and solid-colour stand-ins.

use image::GenericImageView;

use crate::error::{Result, ViewerError};

/// A GPU texture with a view and optional sampler.
#[derive(Clone, Debug)]
pub struct Texture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
}

impl Texture {
    /// Standard depth buffer texture format (32-bit float).
    pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

    /// Create a depth texture for depth-testing during rendering.
    ///
    /// # Arguments
    ///
    /// * `size` is [width, height] of the texture in pixels
    /// * `label` is used as a debug label for the GPU resource
    pub fn create_depth_texture(device: &wgpu::Device, size: [u32; 2], label: &str) -> Self {
        let size = wgpu::Extent3d {
            width: size[0].max(1),
            height: size[1].max(1),
            depth_or_array_layers: 1,
        };
        let desc = wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: Self::DEPTH_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[Self::DEPTH_FORMAT],
        };
        let texture = device.create_texture(&desc);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            texture,
            view,
            sampler: None,
        }
    }

    /// A `width` x `height` texture filled with one RGBA colour.
    ///
    /// `[0, 0, 0, 0]` gives the fully transparent placeholder bound for hidden layers.
    pub fn create_solid(
        rgba: [u8; 4],
        width: u32,
        height: u32,
        label: &str,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
    ) -> Texture {
        let image = image::RgbaImage::from_pixel(width.max(1), height.max(1), image::Rgba(rgba));
        Self::upload(
            device,
            queue,
            &image,
            Some(label),
            wgpu::TextureFormat::Rgba8Unorm,
            &[],
        )
    }

    /// Decode an image file (PNG or JPEG) and upload it once.
    ///
    /// The texture is stored as `Rgba8Unorm` and may also be viewed as `Rgba8UnormSrgb`, so the
    /// same upload serves colour and data roles through [`Texture::view_as`].
    pub fn from_bytes(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bytes: &[u8],
        label: &str,
    ) -> Result<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| ViewerError::AssetMissing(format!("{label}: {e}")))?;
        Self::from_image(device, queue, &img, Some(label))
    }

    /// Fails with [`ViewerError::ResourceExhausted`] if either side exceeds the device's
    /// `max_texture_dimension_2d`.
    pub fn from_image(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        img: &image::DynamicImage,
        label: Option<&str>,
    ) -> Result<Self> {
        let max = device.limits().max_texture_dimension_2d;
        check_dimensions(img.dimensions(), max, label)?;
        log::debug!("Uploading texture {:?} ({:?})", label, img.dimensions());
        Ok(Self::upload(
            device,
            queue,
            &img.to_rgba8(),
            label,
            wgpu::TextureFormat::Rgba8Unorm,
            &[wgpu::TextureFormat::Rgba8UnormSrgb],
        ))
    }

    /// Another view of the same GPU texture, reinterpreted as `format`.
    pub fn view_as(&self, format: wgpu::TextureFormat) -> Texture {
        let view = self.texture.create_view(&wgpu::TextureViewDescriptor {
            format: Some(format),
            ..Default::default()
        });
        Texture {
            texture: self.texture.clone(),
            view,
            sampler: self.sampler.clone(),
        }
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        rgba: &image::RgbaImage,
        label: Option<&str>,
        format: wgpu::TextureFormat,
        view_formats: &[wgpu::TextureFormat],
    ) -> Self {
        let dimensions = rgba.dimensions();
        let size = wgpu::Extent3d {
            width: dimensions.0,
            height: dimensions.1,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label,
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats,
        });

        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                aspect: wgpu::TextureAspect::All,
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
            },
            rgba,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * dimensions.0),
                rows_per_image: Some(dimensions.1),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = Some(create_default_sampler(device));

        Self {
            texture,
            view,
            sampler,
        }
    }
}

pub fn create_default_sampler(device: &wgpu::Device) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        address_mode_u: wgpu::AddressMode::Repeat,
        address_mode_v: wgpu::AddressMode::Repeat,
        address_mode_w: wgpu::AddressMode::Repeat,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::MipmapFilterMode::Linear,
        ..Default::default()
    })
}

/// Images larger than the device's 2D texture limit cannot be allocated.
pub fn check_dimensions(
    (width, height): (u32, u32),
    max: u32,
    label: Option<&str>,
) -> Result<()> {
    if width > max || height > max {
        return Err(ViewerError::ResourceExhausted(format!(
            "texture {} is {width}x{height}, the device allows at most {max}x{max}",
            label.unwrap_or("<unnamed>")
        )));
    }
    Ok(())
}
