//! Shader programs with named uniforms
//!
//! A program is declared up front: its source, the uniforms of its uniform
//! block in field order, and the names of its texture samplers. Uniforms are
//! then addressed by name, and samplers are pointed at texture units with
//! [`ShaderProgram::bind_texture_unit`].

use cgmath::{Matrix4, Vector3, Vector4};

use crate::{
    error::GfxError,
    gfx::context::{ProgramId, ReleaseQueue, RenderContext, Resource, UniformKind, UniformValue},
    wgpu_utils::uniform_buffer::{UniformDecl, UniformLayout, UniformSlot},
};

/// Configuration for creating a shader program
///
/// For the wgpu backend `source` is WGSL with a `vs_main` and an `fs_main`
/// entry point, the uniform struct at `@group(0) @binding(0)` and sampler
/// `i` as a texture at binding `1 + 2i` with its sampler at `2 + 2i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramDesc {
    pub label: String,
    pub source: String,
    pub uniforms: Vec<UniformDecl>,
    pub samplers: Vec<String>,
}

impl ProgramDesc {
    pub fn new(label: &str, source: &str) -> Self {
        Self {
            label: label.to_owned(),
            source: source.to_owned(),
            uniforms: Vec::new(),
            samplers: Vec::new(),
        }
    }

    /// Declares the next field of the uniform block
    pub fn with_uniform(mut self, name: &str, kind: UniformKind) -> Self {
        self.uniforms.push(UniformDecl::new(name, kind));
        self
    }

    pub fn with_sampler(mut self, name: &str) -> Self {
        self.samplers.push(name.to_owned());
        self
    }

    pub fn interface(&self) -> ProgramInterface {
        ProgramInterface {
            label: self.label.clone(),
            layout: UniformLayout::new(&self.uniforms),
            samplers: self.samplers.clone(),
        }
    }
}

/// Where a uniform write ends up.
#[derive(Debug, Clone, PartialEq)]
pub enum UniformTarget {
    /// A field of the uniform block
    Block(UniformSlot),
    /// Sampler `index` now reads from texture unit `unit`
    Sampler { index: usize, unit: u32 },
}

/// The name-addressable surface of a linked program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInterface {
    pub label: String,
    pub layout: UniformLayout,
    pub samplers: Vec<String>,
}

impl ProgramInterface {
    /// Resolves a write by name, checking its type.
    ///
    /// Unknown names and mismatched types are logged and yield `None`, the
    /// same way a graphics driver ignores a uniform location of -1.
    pub fn resolve(&self, name: &str, value: &UniformValue) -> Option<UniformTarget> {
        if let Some(slot) = self.layout.slot(name) {
            if slot.kind != value.kind() {
                log::warn!(
                    "program '{}': uniform '{name}' is {:?}, ignoring {:?} value",
                    self.label,
                    slot.kind,
                    value.kind()
                );
                return None;
            }
            return Some(UniformTarget::Block(slot.clone()));
        }

        if let Some(index) = self.samplers.iter().position(|s| s == name) {
            return match value {
                UniformValue::Int(unit) if *unit >= 0 => Some(UniformTarget::Sampler {
                    index,
                    unit: *unit as u32,
                }),
                _ => {
                    log::warn!(
                        "program '{}': sampler '{name}' needs a non-negative texture unit, got {value:?}",
                        self.label
                    );
                    None
                }
            };
        }

        log::warn!("program '{}': no uniform named '{name}'", self.label);
        None
    }
}

/// A linked shader program owned by the caller.
#[derive(Debug)]
pub struct ShaderProgram {
    id: ProgramId,
    label: String,
    release: ReleaseQueue,
}

impl ShaderProgram {
    /// Compiles and links `desc`.
    ///
    /// # Errors
    /// [`GfxError::ShaderCompile`] when the backend rejects the source. The
    /// failure is also logged.
    pub fn new<C: RenderContext + ?Sized>(ctx: &mut C, desc: &ProgramDesc) -> Result<Self, GfxError> {
        let id = ctx
            .create_program(desc)
            .inspect_err(|err| log::error!("{err}"))?;
        log::debug!("program {id}: '{}'", desc.label);
        Ok(Self {
            id,
            label: desc.label.clone(),
            release: ctx.release_queue(),
        })
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Makes this the program used by the following draw calls.
    pub fn use_program<C: RenderContext + ?Sized>(&self, ctx: &mut C) {
        ctx.use_program(self.id);
    }

    pub fn set_bool<C: RenderContext + ?Sized>(&self, ctx: &mut C, name: &str, value: bool) {
        ctx.set_uniform(self.id, name, UniformValue::Bool(value));
    }

    pub fn set_int<C: RenderContext + ?Sized>(&self, ctx: &mut C, name: &str, value: i32) {
        ctx.set_uniform(self.id, name, UniformValue::Int(value));
    }

    pub fn set_float<C: RenderContext + ?Sized>(&self, ctx: &mut C, name: &str, value: f32) {
        ctx.set_uniform(self.id, name, UniformValue::Float(value));
    }

    pub fn set_vec3<C: RenderContext + ?Sized>(&self, ctx: &mut C, name: &str, value: Vector3<f32>) {
        ctx.set_uniform(self.id, name, value.into());
    }

    pub fn set_vec4<C: RenderContext + ?Sized>(&self, ctx: &mut C, name: &str, value: Vector4<f32>) {
        ctx.set_uniform(self.id, name, value.into());
    }

    pub fn set_matrix4<C: RenderContext + ?Sized>(&self, ctx: &mut C, name: &str, value: Matrix4<f32>) {
        ctx.set_uniform(self.id, name, value.into());
    }

    /// Points sampler `name` at texture unit `unit`.
    pub fn bind_texture_unit<C: RenderContext + ?Sized>(&self, ctx: &mut C, name: &str, unit: u32) {
        self.use_program(ctx);
        match i32::try_from(unit) {
            Ok(unit) => ctx.set_uniform(self.id, name, UniformValue::Int(unit)),
            Err(_) => log::warn!(
                "program '{}': texture unit {unit} for sampler '{name}' is out of range",
                self.label
            ),
        }
    }
}

impl Drop for ShaderProgram {
    fn drop(&mut self) {
        self.release.push(Resource::Program(self.id));
    }
}
