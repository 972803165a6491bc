// src/gfx/resources/mod.rs
//! GPU resource management
//!
//! Shader programs and textures owned by the caller and released through
//! the context that created them.

pub mod shader_program;
pub mod texture_resource;

// Re-export main types
pub use shader_program::{ProgramDesc, ProgramInterface, ShaderProgram, UniformTarget};
pub use texture_resource::{ChannelFormat, Texture, TextureImage, TextureResource};
