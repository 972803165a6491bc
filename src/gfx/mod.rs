//! # Graphics Module
//!
//! Camera, geometry buffers, shader programs and textures, all driven
//! through an explicit [`RenderContext`].
//!
//! ## Architecture Overview
//!
//! - **Rendering Context** ([`context`]) - the trait every GPU call goes through
//! - **Backends** ([`recording`], [`wgpu_context`]) - a command recorder and a wgpu renderer
//! - **Geometry** ([`geometry`]) - vertex layouts, interleaved buffers and built-in meshes
//! - **Camera System** ([`camera`]) - first-person camera with yaw/pitch look
//! - **Resources** ([`resources`]) - shader programs and textures
//!
//! ## Usage
//!
//! ```
//! use pinhole::gfx::{
//!     camera::OrbitCamera,
//!     context::{BufferUsage, Primitive, UniformKind},
//!     geometry::textured_cube,
//!     recording::RecordingContext,
//!     resources::{ProgramDesc, ShaderProgram},
//! };
//!
//! let mut ctx = RecordingContext::new();
//! let cube = textured_cube().upload(&mut ctx, "cube", BufferUsage::Static).unwrap();
//! let program = ShaderProgram::new(
//!     &mut ctx,
//!     &ProgramDesc::new("cube", "/* wgsl */")
//!         .with_uniform("model", UniformKind::Mat4)
//!         .with_uniform("view", UniformKind::Mat4)
//!         .with_uniform("projection", UniformKind::Mat4),
//! )
//! .unwrap();
//!
//! let camera = OrbitCamera::new(800.0 / 600.0);
//! program.use_program(&mut ctx);
//! camera.push_to_shader(&mut ctx, &program, "view", "projection", "model");
//! cube.draw_indexed(&mut ctx, Primitive::Triangles, 36).unwrap();
//! assert_eq!(ctx.draw_calls().count(), 1);
//! ```
//!
//! [`RenderContext`]: context::RenderContext

pub mod camera;
pub mod context;
pub mod geometry;
pub mod recording;
pub mod resources;
pub mod wgpu_context;

// Re-export commonly used types
pub use camera::OrbitCamera;
pub use context::{Primitive, RenderContext};
pub use geometry::GeometryBuffer;
pub use recording::RecordingContext;
pub use wgpu_context::{RenderTarget, WgpuContext};
