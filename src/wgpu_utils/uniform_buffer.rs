// src/wgpu_utils/uniform_buffer.rs
//! Named uniform blocks: std140 packing on the CPU and a GPU buffer that
//! skips uploads when nothing changed.

use crate::gfx::context::{UniformKind, UniformValue};

/// A declared uniform: name and type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformDecl {
    pub name: String,
    pub kind: UniformKind,
}

impl UniformDecl {
    pub fn new(name: impl Into<String>, kind: UniformKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Position of one uniform inside the block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformSlot {
    pub name: String,
    pub kind: UniformKind,
    pub offset: usize,
}

/// std140 alignment and size, in bytes.
fn std140(kind: UniformKind) -> (usize, usize) {
    match kind {
        UniformKind::Bool | UniformKind::Int | UniformKind::Float => (4, 4),
        UniformKind::Vec3 => (16, 12),
        UniformKind::Vec4 => (16, 16),
        UniformKind::Mat4 => (16, 64),
    }
}

fn align_to(value: usize, alignment: usize) -> usize {
    value.div_ceil(alignment) * alignment
}

/// Uniforms laid out in declaration order with std140 rules, the same order
/// the fields of the shader's uniform struct must follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UniformLayout {
    slots: Vec<UniformSlot>,
    size: usize,
}

impl UniformLayout {
    pub fn new(decls: &[UniformDecl]) -> Self {
        let mut offset = 0;
        let slots = decls
            .iter()
            .map(|decl| {
                let (alignment, size) = std140(decl.kind);
                let slot = UniformSlot {
                    name: decl.name.clone(),
                    kind: decl.kind,
                    offset: align_to(offset, alignment),
                };
                offset = slot.offset + size;
                slot
            })
            .collect();

        Self {
            slots,
            // A struct's size rounds up to its 16-byte alignment
            size: align_to(offset, 16),
        }
    }

    pub fn slot(&self, name: &str) -> Option<&UniformSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    pub fn slots(&self) -> &[UniformSlot] {
        &self.slots
    }

    /// Block size in bytes, a multiple of 16.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Zeroed storage for the whole block.
    pub fn allocate(&self) -> Vec<u8> {
        vec![0; self.size]
    }

    /// Writes `value` into `block` at the slot's offset.
    pub fn write(&self, block: &mut [u8], slot: &UniformSlot, value: &UniformValue) {
        value.write_std140(&mut block[slot.offset..]);
    }
}

/// A uniform buffer on the GPU fed from a std140 byte block.
pub struct UniformBuffer {
    buffer: wgpu::Buffer,
    previous_content: Vec<u8>,
}

impl UniformBuffer {
    /// Create a new uniform buffer of at least `size` bytes
    pub fn new(device: &wgpu::Device, size: usize, label: &str) -> Self {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("UniformBuffer: {label}")),
            // Zero-sized bindings are invalid
            size: size.max(16) as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        UniformBuffer {
            buffer,
            previous_content: Vec::new(),
        }
    }

    /// Uploads `content` unless it equals what was uploaded last time.
    /// Returns whether a write was queued.
    pub fn update_content(&mut self, queue: &wgpu::Queue, content: &[u8]) -> bool {
        if content.is_empty() || self.previous_content == content {
            return false;
        }
        queue.write_buffer(&self.buffer, 0, content);
        self.previous_content = content.to_vec();
        true
    }

    /// Get binding resource
    pub fn binding_resource(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }

    pub fn size(&self) -> u64 {
        self.buffer.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_block() -> UniformLayout {
        UniformLayout::new(&[
            UniformDecl::new("mix", UniformKind::Float),
            UniformDecl::new("tint", UniformKind::Vec3),
            UniformDecl::new("flag", UniformKind::Bool),
            UniformDecl::new("view", UniformKind::Mat4),
            UniformDecl::new("color", UniformKind::Vec4),
        ])
    }

    #[test]
    fn test_std140_offsets() {
        let layout = camera_block();
        let offsets: Vec<usize> = layout.slots().iter().map(|s| s.offset).collect();
        // vec3 aligns to 16; a scalar may follow it in its last 4 bytes
        assert_eq!(offsets, vec![0, 16, 28, 32, 96]);
        assert_eq!(layout.size(), 112);
    }

    #[test]
    fn test_size_rounds_to_sixteen() {
        let layout = UniformLayout::new(&[UniformDecl::new("t", UniformKind::Float)]);
        assert_eq!(layout.size(), 16);
        assert_eq!(UniformLayout::new(&[]).size(), 0);
    }

    #[test]
    fn test_write_lands_at_slot_offset() {
        let layout = camera_block();
        let mut block = layout.allocate();
        let slot = layout.slot("color").unwrap().clone();
        layout.write(&mut block, &slot, &UniformValue::Vec4([1.0, 2.0, 3.0, 4.0]));

        let floats: Vec<f32> = block
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(&floats[24..28], &[1.0, 2.0, 3.0, 4.0]);
        assert!(floats[..24].iter().all(|&f| f == 0.0));
        assert!(layout.slot("missing").is_none());
    }
}
