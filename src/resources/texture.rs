use crate::{data_structures::texture::Texture, error::Result, resources::TextureRole};

/// Bind group layout of a shape's material: diffuse texture and sampler at bindings 0 and 1,
/// specular texture and sampler at bindings 2 and 3.
pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    let texture = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            multisampled: false,
            view_dimension: wgpu::TextureViewDimension::D2,
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
        },
        count: None,
    };
    let sampler = |binding| wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
    };
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[texture(0), sampler(1), texture(2), sampler(3)],
        label: Some("Material texture_bind_group_layout"),
    })
}

pub fn material_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    fallback_sampler: &wgpu::Sampler,
    diffuse: &Texture,
    specular: &Texture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&diffuse.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(
                    diffuse.sampler.as_ref().unwrap_or(fallback_sampler),
                ),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::TextureView(&specular.view),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::Sampler(
                    specular.sampler.as_ref().unwrap_or(fallback_sampler),
                ),
            },
        ],
        label: Some("Material bind group"),
    })
}

/// Format a role samples its texture as. Specular maps are linear data, colour is sRGB.
pub fn view_format(role: TextureRole) -> wgpu::TextureFormat {
    match role {
        TextureRole::Specular => wgpu::TextureFormat::Rgba8Unorm,
        TextureRole::Diffuse | TextureRole::Transparent => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

/// Decodes `bytes` and uploads it once; callers take per-role views with [`view_format`].
pub fn load_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    bytes: &[u8],
    file_name: &str,
) -> Result<Texture> {
    Texture::from_bytes(device, queue, bytes, file_name)
}
