//! # Pinhole Prelude
//!
//! Commonly used types in one import:
//!
//! ```rust
//! use pinhole::prelude::*;
//!
//! let mut ctx = RecordingContext::new();
//! let quad = textured_quad().upload(&mut ctx, "quad", BufferUsage::Static).unwrap();
//! quad.draw_indexed(&mut ctx, Primitive::Triangles, 6).unwrap();
//! ```

// Error handling and logging setup
pub use crate::error::GfxError;
pub use crate::init_logging;

// Rendering context and backends
pub use crate::gfx::context::{BufferUsage, Primitive, RenderContext, UniformKind, UniformValue};
pub use crate::gfx::recording::RecordingContext;
pub use crate::gfx::wgpu_context::{RenderTarget, WgpuContext};

// Geometry, shaders and textures
pub use crate::gfx::geometry::{textured_cube, textured_quad, GeometryBuffer, GeometryData, VertexLayout};
pub use crate::gfx::resources::{ChannelFormat, ProgramDesc, ShaderProgram, Texture, TextureImage};

// Camera and per-frame input
pub use crate::frame::{FrameContext, FrameTimer};
pub use crate::gfx::camera::{CameraSettings, ClipSpace, MoveDirection, OrbitCamera};

// Re-export common external dependencies
pub use cgmath::{Deg, Matrix4, Vector3, Vector4};
