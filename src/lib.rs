// src/lib.rs
//! Pinhole
//!
//! A first-person camera and a declarative vertex-array core for small
//! renderers built on wgpu and winit.

pub mod error;
pub mod frame;
pub mod gfx;
pub mod prelude;
pub mod wgpu_utils;

// Re-export main types for convenience
pub use error::GfxError;
pub use frame::FrameContext;

/// Initializes `env_logger`, honouring `RUST_LOG` and defaulting to `info`.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init();
}
