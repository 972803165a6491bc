// src/wgpu_utils/mod.rs
//! WGPU utility functions and helpers
//!
//! std140 uniform blocks and bind group layout helpers shared by the wgpu
//! backend.

pub mod binding_types;
pub mod uniform_buffer;

// Re-export main types
pub use binding_types::*;
pub use uniform_buffer::{UniformBuffer, UniformDecl, UniformLayout, UniformSlot};
