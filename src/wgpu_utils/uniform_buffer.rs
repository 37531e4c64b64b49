// src/wgpu_utils/uniform_buffer.rs
use std::marker::PhantomData;

/// Remembers the last bytes uploaded so unchanged frames cost no write
#[derive(Debug, Default)]
pub(crate) struct UploadCache {
    last: Option<Vec<u8>>,
}

impl UploadCache {
    /// Returns `true` and remembers `bytes` when they differ from the last upload
    pub fn needs_upload(&mut self, bytes: &[u8]) -> bool {
        if self.last.as_deref() == Some(bytes) {
            return false;
        }
        self.last = Some(bytes.to_vec());
        true
    }
}

/// A uniform buffer holding exactly one `Content`
pub struct UniformBuffer<Content> {
    buffer: wgpu::Buffer,
    cache: UploadCache,
    content: PhantomData<Content>,
}

impl<Content: bytemuck::Pod> UniformBuffer<Content> {
    fn label() -> String {
        let type_name = std::any::type_name::<Content>();
        let short = type_name.rsplit("::").next().unwrap_or(type_name);
        format!("Uniform<{short}>")
    }

    pub fn new(device: &wgpu::Device) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&Self::label()),
            size: std::mem::size_of::<Content>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Self {
            buffer,
            cache: UploadCache::default(),
            content: PhantomData,
        }
    }

    pub fn update_content(&mut self, queue: &wgpu::Queue, content: Content) {
        let bytes = bytemuck::bytes_of(&content);
        if self.cache.needs_upload(bytes) {
            queue.write_buffer(&self.buffer, 0, bytes);
        }
    }

    pub fn binding_resource(&self) -> wgpu::BindingResource {
        self.buffer.as_entire_binding()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_content_is_uploaded_once() {
        let mut cache = UploadCache::default();
        assert!(cache.needs_upload(&[1, 2, 3]));
        assert!(!cache.needs_upload(&[1, 2, 3]));
        assert!(cache.needs_upload(&[1, 2, 4]));
    }

    #[test]
    fn test_first_upload_always_happens() {
        let mut cache = UploadCache::default();
        assert!(cache.needs_upload(&[0; 16]));
    }
}
