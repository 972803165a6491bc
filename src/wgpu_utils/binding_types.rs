// src/wgpu_utils/binding_types.rs
//! WGPU binding type utilities

pub fn uniform() -> wgpu::BindingType {
    wgpu::BindingType::Buffer {
        ty: wgpu::BufferBindingType::Uniform,
        has_dynamic_offset: false,
        min_binding_size: None,
    }
}

pub fn sampler(filtering: wgpu::SamplerBindingType) -> wgpu::BindingType {
    wgpu::BindingType::Sampler(filtering)
}

pub fn texture_2d() -> wgpu::BindingType {
    wgpu::BindingType::Texture {
        sample_type: wgpu::TextureSampleType::Float { filterable: true },
        view_dimension: wgpu::TextureViewDimension::D2,
        multisampled: false,
    }
}

/// Binding number of the uniform block.
pub const UNIFORM_BINDING: u32 = 0;

/// Binding numbers of the texture and sampler behind sampler `index`.
///
/// The uniform block sits at binding 0; sampler `i` uses `1 + 2i` for the
/// texture view and `2 + 2i` for the sampler.
pub fn sampler_bindings(index: usize) -> (u32, u32) {
    let texture = 1 + 2 * index as u32;
    (texture, texture + 1)
}

/// Layout entries for a program: one uniform block plus a texture/sampler
/// pair per sampler uniform.
pub fn program_layout_entries(sampler_count: usize) -> Vec<wgpu::BindGroupLayoutEntry> {
    let visibility = wgpu::ShaderStages::VERTEX_FRAGMENT;
    let mut entries = vec![wgpu::BindGroupLayoutEntry {
        binding: UNIFORM_BINDING,
        visibility,
        ty: uniform(),
        count: None,
    }];
    for index in 0..sampler_count {
        let (texture, sampler_binding) = sampler_bindings(index);
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: texture,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: texture_2d(),
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: sampler_binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}
