//! # Geometry Buffers
//!
//! [`GeometryBuffer`] owns one vertex array on a [`RenderContext`]: a vertex
//! buffer interpreted through a [`VertexLayout`], plus an optional index
//! buffer of `u32`s. It draws either a range of vertices or the first `n`
//! indices.
//!
//! ## Usage
//!
//! ```rust
//! use pinhole::gfx::context::{BufferUsage, Primitive};
//! use pinhole::gfx::geometry::{textured_quad, GeometryBuffer};
//! use pinhole::gfx::recording::RecordingContext;
//!
//! let mut ctx = RecordingContext::new();
//! let quad = textured_quad();
//! let buffer = quad.upload(&mut ctx, "quad", BufferUsage::Static).unwrap();
//! buffer.draw_indexed(&mut ctx, Primitive::Triangles, 6).unwrap();
//! assert_eq!(ctx.draw_calls().count(), 1);
//! ```

pub mod primitives;
pub mod vertex_layout;

pub use primitives::*;
pub use vertex_layout::{VertexAttribute, VertexLayout};

use super::context::{
    BufferUsage, Primitive, ReleaseQueue, RenderContext, Resource, VertexArrayDesc, VertexArrayId,
};
use crate::error::GfxError;

/// Interleaved vertex data with its layout and optional indices.
#[derive(Debug, Clone, Default)]
pub struct GeometryData {
    /// Interleaved `f32` vertex records
    pub vertices: Vec<f32>,
    /// Attribute widths of one record
    pub widths: Vec<u32>,
    /// Triangle indices, empty for non-indexed meshes
    pub indices: Vec<u32>,
}

impl GeometryData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of whole vertex records in `vertices`.
    pub fn vertex_count(&self) -> usize {
        let stride: u32 = self.widths.iter().sum();
        if stride == 0 {
            0
        } else {
            self.vertices.len() / stride as usize
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Uploads the whole mesh as a [`GeometryBuffer`].
    pub fn upload<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        label: &str,
        usage: BufferUsage,
    ) -> Result<GeometryBuffer, GfxError> {
        GeometryBuffer::with_label(
            ctx,
            label,
            self.vertex_count() as u32,
            &self.widths,
            &self.vertices,
            self.indices.len() as u32,
            &self.indices,
            usage,
        )
    }
}

/// A vertex array owned by the caller: vertex buffer, optional index
/// buffer and attribute layout.
///
/// Dropping it queues the GPU allocations for release on the context that
/// created it.
#[derive(Debug)]
pub struct GeometryBuffer {
    id: VertexArrayId,
    layout: VertexLayout,
    vertex_count: u32,
    element_count: u32,
    usage: BufferUsage,
    release: ReleaseQueue,
}

impl GeometryBuffer {
    /// Uploads `vertex_count` records laid out as `widths`, and
    /// `element_count` indices when it is non-zero.
    ///
    /// Only the first `vertex_count * stride` floats and `element_count`
    /// indices are uploaded.
    ///
    /// # Errors
    /// - [`GfxError::InvalidLayout`] for an empty or out-of-range layout
    /// - [`GfxError::DataTooShort`] when either slice is shorter than declared
    pub fn new<C: RenderContext + ?Sized>(
        ctx: &mut C,
        vertex_count: u32,
        widths: &[u32],
        vertices: &[f32],
        element_count: u32,
        elements: &[u32],
        usage: BufferUsage,
    ) -> Result<Self, GfxError> {
        Self::with_label(
            ctx,
            "GeometryBuffer",
            vertex_count,
            widths,
            vertices,
            element_count,
            elements,
            usage,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_label<C: RenderContext + ?Sized>(
        ctx: &mut C,
        label: &str,
        vertex_count: u32,
        widths: &[u32],
        vertices: &[f32],
        element_count: u32,
        elements: &[u32],
        usage: BufferUsage,
    ) -> Result<Self, GfxError> {
        let layout = VertexLayout::new(widths)?;

        let float_count = vertex_count as usize * layout.stride() as usize;
        if vertices.len() < float_count {
            return Err(GfxError::DataTooShort {
                what: "vertex",
                expected: float_count,
                actual: vertices.len(),
            });
        }

        let indices = if element_count > 0 {
            let count = element_count as usize;
            if elements.len() < count {
                return Err(GfxError::DataTooShort {
                    what: "element",
                    expected: count,
                    actual: elements.len(),
                });
            }
            Some(&elements[..count])
        } else {
            None
        };

        let id = ctx.create_vertex_array(&VertexArrayDesc {
            label,
            layout: &layout,
            vertices: &vertices[..float_count],
            indices,
            usage,
        })?;

        log::debug!(
            "created vertex array {id} '{label}': {vertex_count} vertices, stride {}, {element_count} elements",
            layout.stride()
        );

        Ok(Self {
            id,
            layout,
            vertex_count,
            element_count,
            usage,
            release: ctx.release_queue(),
        })
    }

    /// Draws vertices `[first, first + count)` without indices.
    pub fn draw_arrays<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        primitive: Primitive,
        first: u32,
        count: u32,
    ) {
        ctx.bind_vertex_array(self.id);
        ctx.draw_arrays(primitive, first, count);
    }

    /// Draws the first `count` indices.
    ///
    /// # Errors
    /// [`GfxError::NoIndexBuffer`] when the buffer was built without
    /// elements. The error is logged and nothing is drawn.
    pub fn draw_indexed<C: RenderContext + ?Sized>(
        &self,
        ctx: &mut C,
        primitive: Primitive,
        count: u32,
    ) -> Result<(), GfxError> {
        if self.element_count == 0 {
            log::error!("vertex array {}: no available element buffer to draw", self.id);
            return Err(GfxError::NoIndexBuffer);
        }
        ctx.bind_vertex_array(self.id);
        ctx.draw_elements(primitive, count);
        Ok(())
    }

    pub fn id(&self) -> VertexArrayId {
        self.id
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Number of indices, 0 for a non-indexed buffer.
    pub fn element_count(&self) -> u32 {
        self.element_count
    }

    pub fn usage(&self) -> BufferUsage {
        self.usage
    }
}

impl Drop for GeometryBuffer {
    fn drop(&mut self) {
        self.release.push(Resource::VertexArray(self.id));
    }
}
