//! # Rendering Context
//!
//! Every operation that touches GPU binding state goes through a
//! [`RenderContext`] value passed in by the caller. The current vertex array,
//! the current program and the texture units all live inside that value, so
//! binding one buffer only invalidates state the caller can see.
//!
//! Two implementations ship with the crate:
//!
//! - [`RecordingContext`](super::recording::RecordingContext) records every
//!   call and never touches a GPU. Headless runs and the tests use it.
//! - [`WgpuContext`](super::wgpu_context::WgpuContext) uploads to a real
//!   `wgpu` device and replays the recorded draws into a render pass.
//!
//! Resource handles returned by a context are plain ids. The owning wrappers
//! ([`GeometryBuffer`], [`ShaderProgram`], [`Texture`]) push their id onto the
//! context's [`ReleaseQueue`] when dropped; the context frees the GPU side on
//! its next [`RenderContext::collect_garbage`].
//!
//! [`GeometryBuffer`]: super::geometry::GeometryBuffer
//! [`ShaderProgram`]: super::resources::ShaderProgram
//! [`Texture`]: super::resources::Texture

use std::{cell::RefCell, fmt, rc::Rc};

use cgmath::{Matrix4, Vector3, Vector4};

use super::{
    geometry::VertexLayout,
    resources::{shader_program::ProgramDesc, texture_resource::TextureImage},
};
use crate::error::GfxError;

macro_rules! resource_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Wraps a raw id handed out by a context implementation.
            pub const fn from_raw(raw: u32) -> Self {
                Self(raw)
            }

            pub const fn raw(self) -> u32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

resource_id!(
    /// Vertex buffer, optional index buffer and attribute layout, bound together.
    VertexArrayId
);
resource_id!(
    /// A linked shader program.
    ProgramId
);
resource_id!(
    /// A sampled 2D texture.
    TextureId
);

/// Any resource a context can release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    VertexArray(VertexArrayId),
    Program(ProgramId),
    Texture(TextureId),
}

/// How the vertices of a draw call are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Points,
    Lines,
    LineStrip,
    Triangles,
    TriangleStrip,
}

impl Primitive {
    pub fn topology(self) -> wgpu::PrimitiveTopology {
        match self {
            Primitive::Points => wgpu::PrimitiveTopology::PointList,
            Primitive::Lines => wgpu::PrimitiveTopology::LineList,
            Primitive::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            Primitive::Triangles => wgpu::PrimitiveTopology::TriangleList,
            Primitive::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }

    pub fn is_strip(self) -> bool {
        matches!(self, Primitive::LineStrip | Primitive::TriangleStrip)
    }
}

/// Hint to the allocator about how often the buffer contents change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    #[default]
    Static,
    Dynamic,
}

/// Type of a declared shader uniform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformKind {
    Bool,
    Int,
    Float,
    Vec3,
    Vec4,
    Mat4,
}

/// A value written to a named uniform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Column-major, matching cgmath and WGSL.
    Mat4([[f32; 4]; 4]),
}

impl UniformValue {
    pub fn kind(&self) -> UniformKind {
        match self {
            UniformValue::Bool(_) => UniformKind::Bool,
            UniformValue::Int(_) => UniformKind::Int,
            UniformValue::Float(_) => UniformKind::Float,
            UniformValue::Vec3(_) => UniformKind::Vec3,
            UniformValue::Vec4(_) => UniformKind::Vec4,
            UniformValue::Mat4(_) => UniformKind::Mat4,
        }
    }

    /// Writes the value in its std140 representation. Booleans become a
    /// 32-bit integer, as in WGSL and GLSL uniform blocks.
    pub fn write_std140(&self, dst: &mut [u8]) {
        match self {
            UniformValue::Bool(v) => dst[..4].copy_from_slice(&u32::from(*v).to_ne_bytes()),
            UniformValue::Int(v) => dst[..4].copy_from_slice(&v.to_ne_bytes()),
            UniformValue::Float(v) => dst[..4].copy_from_slice(&v.to_ne_bytes()),
            UniformValue::Vec3(v) => dst[..12].copy_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Vec4(v) => dst[..16].copy_from_slice(bytemuck::cast_slice(v)),
            UniformValue::Mat4(m) => dst[..64].copy_from_slice(bytemuck::cast_slice(m)),
        }
    }
}

impl From<Matrix4<f32>> for UniformValue {
    fn from(m: Matrix4<f32>) -> Self {
        UniformValue::Mat4(m.into())
    }
}

impl From<Vector3<f32>> for UniformValue {
    fn from(v: Vector3<f32>) -> Self {
        UniformValue::Vec3(v.into())
    }
}

impl From<Vector4<f32>> for UniformValue {
    fn from(v: Vector4<f32>) -> Self {
        UniformValue::Vec4(v.into())
    }
}

/// Everything a context needs to build a vertex array.
///
/// The slices are already trimmed to exactly `vertex_count * stride` floats
/// and `element_count` indices.
#[derive(Debug, Clone, Copy)]
pub struct VertexArrayDesc<'a> {
    pub label: &'a str,
    pub layout: &'a VertexLayout,
    pub vertices: &'a [f32],
    pub indices: Option<&'a [u32]>,
    pub usage: BufferUsage,
}

/// Resources dropped by their owners, waiting for the context to free them.
///
/// Shared between a context and every handle it created. Single-threaded,
/// like the context itself.
#[derive(Debug, Clone, Default)]
pub struct ReleaseQueue(Rc<RefCell<Vec<Resource>>>);

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, resource: Resource) {
        self.0.borrow_mut().push(resource);
    }

    pub fn drain(&self) -> Vec<Resource> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }
}

/// The explicit rendering-context handle.
///
/// Mirrors the small slice of a classic immediate-mode graphics API that the
/// geometry, camera and shader wrappers need. Failures that the caller can
/// act on are returned; everything else (unknown uniform names, draws with
/// nothing bound) is logged and skipped.
pub trait RenderContext {
    fn create_vertex_array(&mut self, desc: &VertexArrayDesc<'_>) -> Result<VertexArrayId, GfxError>;

    /// Makes `id` the vertex array used by the following draw calls.
    fn bind_vertex_array(&mut self, id: VertexArrayId);

    /// Non-indexed draw over `[first, first + count)` of the bound vertex array.
    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32);

    /// Indexed draw of `count` indices starting at index offset 0.
    fn draw_elements(&mut self, primitive: Primitive, count: u32);

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramId, GfxError>;

    fn use_program(&mut self, id: ProgramId);

    /// Writes a uniform of `program`. Sampler names take an `Int` texture unit.
    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue);

    fn create_texture(&mut self, image: &TextureImage<'_>) -> Result<TextureId, GfxError>;

    /// Binds `texture` to texture unit `unit`.
    fn bind_texture(&mut self, unit: u32, texture: TextureId);

    /// Frees the GPU side of `resource` immediately.
    fn release(&mut self, resource: Resource);

    fn release_queue(&self) -> ReleaseQueue;

    /// Frees everything dropped since the last collection.
    fn collect_garbage(&mut self) -> usize {
        let dropped = self.release_queue().drain();
        let count = dropped.len();
        for resource in dropped {
            self.release(resource);
        }
        if count > 0 {
            log::debug!("released {count} dropped GPU resources");
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::SquareMatrix;

    #[test]
    fn test_release_queue_is_shared_between_clones() {
        let queue = ReleaseQueue::new();
        let handle_side = queue.clone();
        handle_side.push(Resource::Texture(TextureId::from_raw(3)));
        handle_side.push(Resource::Program(ProgramId::from_raw(1)));

        assert_eq!(queue.len(), 2);
        let drained = queue.drain();
        assert_eq!(drained[0], Resource::Texture(TextureId::from_raw(3)));
        assert!(handle_side.is_empty());
    }

    #[test]
    fn test_matrix_uniform_is_column_major() {
        let mut m = Matrix4::<f32>::identity();
        m.w.x = 5.0; // translation lives in the last column
        let value = UniformValue::from(m);

        let mut bytes = [0u8; 64];
        value.write_std140(&mut bytes);
        assert_eq!(&bytes[48..52], &5.0f32.to_ne_bytes());
        assert_eq!(value.kind(), UniformKind::Mat4);
    }

    #[test]
    fn test_bool_uniform_is_four_bytes() {
        let mut bytes = [0xffu8; 8];
        UniformValue::Bool(true).write_std140(&mut bytes);
        assert_eq!(&bytes[..4], &1u32.to_ne_bytes());
        assert_eq!(&bytes[4..], &[0xff; 4]);
    }
}
