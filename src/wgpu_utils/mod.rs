// src/wgpu_utils/mod.rs
//! Small wgpu helpers shared by the viewer pipeline

pub mod uniform_buffer;

pub use uniform_buffer::UniformBuffer;

/// Layout entry for a plain uniform buffer without dynamic offsets
pub fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}
