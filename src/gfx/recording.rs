//! # Recording Context
//!
//! A [`RenderContext`] that keeps every call as a [`Command`] and tracks the
//! resulting binding state, without a GPU. Headless tools use it to inspect
//! what a frame would submit; the tests use it to check draw calls, uniform
//! values and resource lifetimes.

use std::collections::HashMap;

use super::{
    context::{
        BufferUsage, Primitive, ProgramId, ReleaseQueue, RenderContext, Resource, TextureId,
        UniformValue, VertexArrayDesc, VertexArrayId,
    },
    geometry::VertexLayout,
    resources::{
        shader_program::{ProgramDesc, ProgramInterface, UniformTarget},
        texture_resource::{ChannelFormat, TextureImage},
    },
};
use crate::error::GfxError;

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    CreateVertexArray {
        id: VertexArrayId,
        stride: u32,
        vertex_bytes: usize,
        index_count: usize,
    },
    BindVertexArray(VertexArrayId),
    DrawArrays {
        primitive: Primitive,
        first: u32,
        count: u32,
    },
    DrawElements {
        primitive: Primitive,
        count: u32,
    },
    CreateProgram {
        id: ProgramId,
        label: String,
    },
    UseProgram(ProgramId),
    SetUniform {
        program: ProgramId,
        name: String,
        value: UniformValue,
    },
    CreateTexture {
        id: TextureId,
        width: u32,
        height: u32,
        format: ChannelFormat,
    },
    BindTexture {
        unit: u32,
        texture: TextureId,
    },
    Release(Resource),
}

impl Command {
    pub fn is_draw(&self) -> bool {
        matches!(self, Command::DrawArrays { .. } | Command::DrawElements { .. })
    }
}

/// What the recorder knows about a live vertex array.
#[derive(Debug, Clone, PartialEq)]
pub struct VertexArrayRecord {
    pub label: String,
    pub layout: VertexLayout,
    pub vertex_bytes: usize,
    pub index_count: usize,
    pub usage: BufferUsage,
}

#[derive(Debug)]
struct ProgramRecord {
    interface: ProgramInterface,
    values: HashMap<String, UniformValue>,
    sampler_units: HashMap<usize, u32>,
}

/// A [`RenderContext`] that records instead of rendering.
#[derive(Debug, Default)]
pub struct RecordingContext {
    next_id: u32,
    commands: Vec<Command>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayRecord>,
    programs: HashMap<ProgramId, ProgramRecord>,
    textures: HashMap<TextureId, (u32, u32)>,
    bound_vertex_array: Option<VertexArrayId>,
    current_program: Option<ProgramId>,
    texture_units: HashMap<u32, TextureId>,
    release_queue: ReleaseQueue,
}

impl RecordingContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Forgets recorded commands; binding state and resources are kept.
    pub fn clear_commands(&mut self) {
        self.commands.clear();
    }

    pub fn draw_calls(&self) -> impl Iterator<Item = &Command> {
        self.commands.iter().filter(|c| c.is_draw())
    }

    pub fn vertex_array(&self, id: VertexArrayId) -> Option<&VertexArrayRecord> {
        self.vertex_arrays.get(&id)
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.bound_vertex_array
    }

    pub fn current_program(&self) -> Option<ProgramId> {
        self.current_program
    }

    pub fn bound_texture(&self, unit: u32) -> Option<TextureId> {
        self.texture_units.get(&unit).copied()
    }

    /// Last value written to a block uniform of `program`.
    pub fn uniform(&self, program: ProgramId, name: &str) -> Option<UniformValue> {
        self.programs.get(&program)?.values.get(name).copied()
    }

    /// Texture unit the sampler `name` of `program` reads from.
    pub fn sampler_unit(&self, program: ProgramId, name: &str) -> Option<u32> {
        let record = self.programs.get(&program)?;
        let index = record.interface.samplers.iter().position(|s| s == name)?;
        record.sampler_units.get(&index).copied()
    }

    fn draw_ready(&self) -> bool {
        match self.bound_vertex_array {
            Some(id) if self.vertex_arrays.contains_key(&id) => true,
            Some(id) => {
                log::error!("draw skipped: vertex array {id} was released");
                false
            }
            None => {
                log::error!("draw skipped: no vertex array bound");
                false
            }
        }
    }
}

impl RenderContext for RecordingContext {
    fn create_vertex_array(&mut self, desc: &VertexArrayDesc<'_>) -> Result<VertexArrayId, GfxError> {
        let id = VertexArrayId::from_raw(self.allocate_id());
        let record = VertexArrayRecord {
            label: desc.label.to_owned(),
            layout: desc.layout.clone(),
            vertex_bytes: std::mem::size_of_val(desc.vertices),
            index_count: desc.indices.map_or(0, <[u32]>::len),
            usage: desc.usage,
        };
        self.commands.push(Command::CreateVertexArray {
            id,
            stride: record.layout.stride(),
            vertex_bytes: record.vertex_bytes,
            index_count: record.index_count,
        });
        self.vertex_arrays.insert(id, record);
        Ok(id)
    }

    fn bind_vertex_array(&mut self, id: VertexArrayId) {
        self.bound_vertex_array = Some(id);
        self.commands.push(Command::BindVertexArray(id));
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        if self.draw_ready() {
            self.commands.push(Command::DrawArrays {
                primitive,
                first,
                count,
            });
        }
    }

    fn draw_elements(&mut self, primitive: Primitive, count: u32) {
        if self.draw_ready() {
            self.commands.push(Command::DrawElements { primitive, count });
        }
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramId, GfxError> {
        if desc.source.trim().is_empty() {
            return Err(GfxError::ShaderCompile {
                label: desc.label.clone(),
                message: "empty shader source".to_owned(),
            });
        }

        let id = ProgramId::from_raw(self.allocate_id());
        self.programs.insert(
            id,
            ProgramRecord {
                interface: desc.interface(),
                values: HashMap::new(),
                sampler_units: HashMap::new(),
            },
        );
        self.commands.push(Command::CreateProgram {
            id,
            label: desc.label.clone(),
        });
        Ok(id)
    }

    fn use_program(&mut self, id: ProgramId) {
        self.current_program = Some(id);
        self.commands.push(Command::UseProgram(id));
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        let Some(record) = self.programs.get_mut(&program) else {
            log::warn!("set_uniform on unknown program {program}");
            return;
        };
        match record.interface.resolve(name, &value) {
            Some(UniformTarget::Block(slot)) => {
                record.values.insert(slot.name, value);
            }
            Some(UniformTarget::Sampler { index, unit }) => {
                record.sampler_units.insert(index, unit);
            }
            None => return,
        }
        self.commands.push(Command::SetUniform {
            program,
            name: name.to_owned(),
            value,
        });
    }

    fn create_texture(&mut self, image: &TextureImage<'_>) -> Result<TextureId, GfxError> {
        image.validate()?;
        let id = TextureId::from_raw(self.allocate_id());
        self.textures.insert(id, (image.width, image.height));
        self.commands.push(Command::CreateTexture {
            id,
            width: image.width,
            height: image.height,
            format: image.format,
        });
        Ok(id)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.texture_units.insert(unit, texture);
        self.commands.push(Command::BindTexture { unit, texture });
    }

    fn release(&mut self, resource: Resource) {
        let known = match resource {
            Resource::VertexArray(id) => {
                if self.bound_vertex_array == Some(id) {
                    self.bound_vertex_array = None;
                }
                self.vertex_arrays.remove(&id).is_some()
            }
            Resource::Program(id) => {
                if self.current_program == Some(id) {
                    self.current_program = None;
                }
                self.programs.remove(&id).is_some()
            }
            Resource::Texture(id) => {
                self.texture_units.retain(|_, bound| *bound != id);
                self.textures.remove(&id).is_some()
            }
        };
        if known {
            self.commands.push(Command::Release(resource));
        } else {
            log::warn!("release of unknown resource {resource:?}");
        }
    }

    fn release_queue(&self) -> ReleaseQueue {
        self.release_queue.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{
        context::UniformKind,
        geometry::{textured_quad, GeometryBuffer},
        resources::{ShaderProgram, Texture},
    };

    #[test]
    fn test_draw_without_binding_is_skipped() {
        let mut ctx = RecordingContext::new();
        ctx.draw_arrays(Primitive::Triangles, 0, 3);
        ctx.draw_elements(Primitive::Triangles, 3);
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn test_released_vertex_array_is_unbound() {
        let mut ctx = RecordingContext::new();
        let buffer = textured_quad()
            .upload(&mut ctx, "quad", BufferUsage::Static)
            .unwrap();
        buffer.draw_arrays(&mut ctx, Primitive::Triangles, 0, 3);
        assert_eq!(ctx.bound_vertex_array(), Some(buffer.id()));

        drop(buffer);
        ctx.collect_garbage();
        assert_eq!(ctx.bound_vertex_array(), None);
    }

    #[test]
    fn test_garbage_collection_releases_every_kind() {
        let mut ctx = RecordingContext::new();
        let pixels = [0u8; 12];
        let program = ShaderProgram::new(
            &mut ctx,
            &ProgramDesc::new("p", "src").with_uniform("t", UniformKind::Float),
        )
        .unwrap();
        let texture = Texture::new(
            &mut ctx,
            &TextureImage::new(2, 2, ChannelFormat::Rgb, &pixels),
        )
        .unwrap();
        let buffer = GeometryBuffer::new(
            &mut ctx,
            1,
            &[3],
            &[0.0, 0.0, 0.0],
            0,
            &[],
            BufferUsage::Static,
        )
        .unwrap();
        texture.activate(&mut ctx, 0);

        drop((program, texture, buffer));
        assert_eq!(ctx.release_queue().len(), 3);
        assert_eq!(ctx.collect_garbage(), 3);

        assert_eq!(ctx.live_programs(), 0);
        assert_eq!(ctx.live_textures(), 0);
        assert_eq!(ctx.live_vertex_arrays(), 0);
        assert_eq!(ctx.bound_texture(0), None);
        assert_eq!(ctx.collect_garbage(), 0);
    }
}
