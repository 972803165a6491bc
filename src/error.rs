//! Crate-level error types.

use thiserror::Error;

/// Errors produced while creating or drawing GPU resources.
///
/// None of these are fatal: the failing call logs the problem and hands the
/// error back so the caller can decide whether the frame is still worth
/// rendering.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GfxError {
    /// A vertex layout with no attributes, or an attribute wider than a vec4.
    #[error("invalid vertex layout {widths:?}: {reason}")]
    InvalidLayout { widths: Vec<u32>, reason: &'static str },

    /// Uploaded data is shorter than the declared element count requires.
    #[error("{what} data too short: expected {expected} values, got {actual}")]
    DataTooShort {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// An image with a zero or unsupported size.
    #[error("invalid {width}x{height} image: {reason}")]
    InvalidImage {
        width: u32,
        height: u32,
        reason: &'static str,
    },

    /// An indexed draw was requested on a buffer built without indices.
    #[error("no available element buffer to draw")]
    NoIndexBuffer,

    /// Shader compilation or program linking failed.
    #[error("shader '{label}' failed to compile: {message}")]
    ShaderCompile { label: String, message: String },
}
