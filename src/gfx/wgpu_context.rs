//! # wgpu Context
//!
//! A [`RenderContext`] on top of a `wgpu` device. Uploads happen
//! immediately; draw calls are recorded together with a snapshot of the
//! program's uniform block and texture bindings, and replayed into a single
//! render pass by [`WgpuContext::render`].
//!
//! Programs are WGSL modules with a `vs_main` and an `fs_main` entry point.
//! Their bind group 0 holds the uniform block at binding 0 followed by one
//! texture/sampler pair per declared sampler (see
//! [`sampler_bindings`](crate::wgpu_utils::sampler_bindings)). Vertex
//! attribute `i` of the bound layout is `@location(i)`.

use std::{collections::HashMap, iter, sync::Arc};

use wgpu::util::DeviceExt;

use super::{
    context::{
        BufferUsage, Primitive, ProgramId, ReleaseQueue, RenderContext, Resource, TextureId,
        UniformValue, VertexArrayDesc, VertexArrayId,
    },
    geometry::VertexLayout,
    resources::{
        shader_program::{ProgramDesc, ProgramInterface, UniformTarget},
        texture_resource::{ChannelFormat, TextureImage, TextureResource},
    },
};
use crate::{
    error::GfxError,
    wgpu_utils::{program_layout_entries, sampler_bindings, UniformBuffer, UNIFORM_BINDING},
};

/// Where [`WgpuContext::render`] draws to.
pub struct RenderTarget<'a> {
    pub color: &'a wgpu::TextureView,
    /// Required when the context was created with a depth format, ignored
    /// when it was created without one.
    pub depth: Option<&'a wgpu::TextureView>,
    /// Clear color; `None` keeps the previous contents.
    pub clear: Option<wgpu::Color>,
}

struct GpuVertexArray {
    layout: VertexLayout,
    vertex_buffer: wgpu::Buffer,
    index_buffer: Option<wgpu::Buffer>,
    vertex_count: u32,
    index_count: u32,
}

struct GpuProgram {
    interface: ProgramInterface,
    module: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    block: Vec<u8>,
    /// Texture unit per sampler, 0 until set.
    sampler_units: Vec<u32>,
    uniform_pool: Vec<UniformBuffer>,
}

#[derive(Debug, Clone, Copy)]
enum DrawRange {
    Arrays { first: u32, count: u32 },
    Elements { count: u32 },
}

struct PendingDraw {
    program: ProgramId,
    vertex_array: VertexArrayId,
    primitive: Primitive,
    range: DrawRange,
    uniforms: Vec<u8>,
    textures: Vec<Option<TextureId>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PipelineKey {
    program: ProgramId,
    widths: Vec<u32>,
    primitive: Primitive,
}

struct PreparedDraw {
    key: PipelineKey,
    bind_group: wgpu::BindGroup,
    vertex_array: VertexArrayId,
    range: DrawRange,
}

pub struct WgpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    color_format: wgpu::TextureFormat,
    depth_format: Option<wgpu::TextureFormat>,

    next_id: u32,
    vertex_arrays: HashMap<VertexArrayId, GpuVertexArray>,
    programs: HashMap<ProgramId, GpuProgram>,
    textures: HashMap<TextureId, TextureResource>,
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
    fallback_texture: TextureResource,

    bound_vertex_array: Option<VertexArrayId>,
    current_program: Option<ProgramId>,
    texture_units: HashMap<u32, TextureId>,
    pending: Vec<PendingDraw>,
    release_queue: ReleaseQueue,
}

impl WgpuContext {
    /// Creates a context drawing into `color_format` targets, with a depth
    /// test when `depth_format` is set.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        color_format: wgpu::TextureFormat,
        depth_format: Option<wgpu::TextureFormat>,
    ) -> Self {
        let white = [u8::MAX; 4];
        let fallback_texture = TextureResource::from_image(
            &device,
            &queue,
            &TextureImage::new(1, 1, ChannelFormat::Rgba, &white),
            "Fallback Texture",
        );

        Self {
            device,
            queue,
            color_format,
            depth_format,
            next_id: 0,
            vertex_arrays: HashMap::new(),
            programs: HashMap::new(),
            textures: HashMap::new(),
            pipelines: HashMap::new(),
            fallback_texture,
            bound_vertex_array: None,
            current_program: None,
            texture_units: HashMap::new(),
            pending: Vec::new(),
            release_queue: ReleaseQueue::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn color_format(&self) -> wgpu::TextureFormat {
        self.color_format
    }

    pub fn depth_format(&self) -> Option<wgpu::TextureFormat> {
        self.depth_format
    }

    /// Number of draws waiting for [`render`](Self::render).
    pub fn pending_draws(&self) -> usize {
        self.pending.len()
    }

    fn allocate_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    /// Checks the bound state and records a draw with the current uniforms.
    fn record_draw(&mut self, primitive: Primitive, range: DrawRange) {
        let Some(vertex_array) = self.bound_vertex_array else {
            log::error!("draw skipped: no vertex array bound");
            return;
        };
        let Some(program_id) = self.current_program else {
            log::error!("draw skipped: no program in use");
            return;
        };
        let (Some(gpu_array), Some(program)) = (
            self.vertex_arrays.get(&vertex_array),
            self.programs.get(&program_id),
        ) else {
            log::error!("draw skipped: vertex array {vertex_array} or program {program_id} was released");
            return;
        };

        let range = match range {
            DrawRange::Arrays { first, count } => {
                let end = first.saturating_add(count).min(gpu_array.vertex_count);
                if end < first.saturating_add(count) {
                    log::warn!(
                        "draw of vertices {first}..{} clamped to {} vertices",
                        first.saturating_add(count),
                        gpu_array.vertex_count
                    );
                }
                DrawRange::Arrays {
                    first,
                    count: end.saturating_sub(first),
                }
            }
            DrawRange::Elements { count } => {
                if gpu_array.index_buffer.is_none() {
                    log::error!("draw skipped: vertex array {vertex_array} has no index buffer");
                    return;
                }
                if count > gpu_array.index_count {
                    log::warn!(
                        "indexed draw of {count} clamped to {} indices",
                        gpu_array.index_count
                    );
                }
                DrawRange::Elements {
                    count: count.min(gpu_array.index_count),
                }
            }
        };
        let empty = match range {
            DrawRange::Arrays { count, .. } | DrawRange::Elements { count } => count == 0,
        };
        if empty {
            return;
        }

        let textures = program
            .sampler_units
            .iter()
            .map(|unit| self.texture_units.get(unit).copied())
            .collect();

        self.pending.push(PendingDraw {
            program: program_id,
            vertex_array,
            primitive,
            range,
            uniforms: program.block.clone(),
            textures,
        });
    }

    fn create_pipeline(&self, key: &PipelineKey) -> Option<wgpu::RenderPipeline> {
        let program = self.programs.get(&key.program)?;
        let layout = VertexLayout::new(&key.widths).ok()?;
        let attributes = layout.wgpu_attributes();
        let label = format!("{} Pipeline", program.interface.label);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&program.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &program.module,
                    entry_point: Some("vs_main"),
                    buffers: &[wgpu::VertexBufferLayout {
                        array_stride: layout.stride_bytes(),
                        step_mode: wgpu::VertexStepMode::Vertex,
                        attributes: &attributes,
                    }],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: key.primitive.topology(),
                    strip_index_format: key
                        .primitive
                        .is_strip()
                        .then_some(wgpu::IndexFormat::Uint32),
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: self.depth_format.map(|format| wgpu::DepthStencilState {
                    format,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::Less,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState {
                    count: 1,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &program.module,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.color_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            log::error!("failed to build pipeline '{label}': {error}");
            return None;
        }
        log::debug!("built pipeline '{label}' for {:?} {:?}", key.widths, key.primitive);
        Some(pipeline)
    }

    /// Turns a pending draw into a bind group and a cached pipeline.
    fn prepare(&mut self, draw: PendingDraw, uniform_index: usize) -> Option<PreparedDraw> {
        let widths = self
            .vertex_arrays
            .get(&draw.vertex_array)?
            .layout
            .widths()
            .to_vec();
        let key = PipelineKey {
            program: draw.program,
            widths,
            primitive: draw.primitive,
        };
        if !self.pipelines.contains_key(&key) {
            let pipeline = self.create_pipeline(&key)?;
            self.pipelines.insert(key.clone(), pipeline);
        }

        let device = &self.device;
        let queue = &self.queue;
        let textures = &self.textures;
        let fallback = &self.fallback_texture;
        let program = self.programs.get_mut(&draw.program)?;

        while program.uniform_pool.len() <= uniform_index {
            let label = format!("{} #{}", program.interface.label, program.uniform_pool.len());
            program
                .uniform_pool
                .push(UniformBuffer::new(device, program.interface.layout.size(), &label));
        }
        let uniform_buffer = &mut program.uniform_pool[uniform_index];
        uniform_buffer.update_content(queue, &draw.uniforms);

        let mut entries = vec![wgpu::BindGroupEntry {
            binding: UNIFORM_BINDING,
            resource: uniform_buffer.binding_resource(),
        }];
        for (index, texture) in draw.textures.iter().enumerate() {
            let resource = match texture {
                Some(id) => textures.get(id).unwrap_or_else(|| {
                    log::warn!("texture {id} was released, sampling the fallback");
                    fallback
                }),
                None => fallback,
            };
            let (texture_binding, sampler_binding) = sampler_bindings(index);
            entries.push(wgpu::BindGroupEntry {
                binding: texture_binding,
                resource: wgpu::BindingResource::TextureView(&resource.view),
            });
            entries.push(wgpu::BindGroupEntry {
                binding: sampler_binding,
                resource: wgpu::BindingResource::Sampler(&resource.sampler),
            });
        }

        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&program.interface.label),
            layout: &program.bind_group_layout,
            entries: &entries,
        });

        Some(PreparedDraw {
            key,
            bind_group,
            vertex_array: draw.vertex_array,
            range: draw.range,
        })
    }

    /// Replays every pending draw into one render pass on `target` and
    /// submits it. Returns the number of draws executed.
    pub fn render(&mut self, target: &RenderTarget<'_>) -> usize {
        let pending = std::mem::take(&mut self.pending);

        let depth_view = match (self.depth_format, target.depth) {
            (Some(_), None) => {
                log::error!("render skipped: the context needs a depth attachment");
                return 0;
            }
            (None, Some(_)) => {
                log::warn!("depth attachment ignored: the context was created without a depth format");
                None
            }
            (_, depth) => depth,
        };

        let mut uniform_counters: HashMap<ProgramId, usize> = HashMap::new();
        let mut prepared = Vec::with_capacity(pending.len());
        for draw in pending {
            let counter = uniform_counters.entry(draw.program).or_default();
            let index = *counter;
            *counter += 1;
            match self.prepare(draw, index) {
                Some(draw) => prepared.push(draw),
                None => log::warn!("draw dropped: its resources were released or its pipeline failed"),
            }
        }

        let load = match target.clear {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        let mut executed = 0;
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target.color,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: depth_view.map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Clear(1.0),
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for draw in &prepared {
                let (Some(pipeline), Some(gpu_array)) = (
                    self.pipelines.get(&draw.key),
                    self.vertex_arrays.get(&draw.vertex_array),
                ) else {
                    continue;
                };

                render_pass.set_pipeline(pipeline);
                render_pass.set_bind_group(0, &draw.bind_group, &[]);
                render_pass.set_vertex_buffer(0, gpu_array.vertex_buffer.slice(..));

                match (draw.range, &gpu_array.index_buffer) {
                    (DrawRange::Arrays { first, count }, _) => {
                        render_pass.draw(first..first + count, 0..1);
                    }
                    (DrawRange::Elements { count }, Some(index_buffer)) => {
                        render_pass.set_index_buffer(index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                        render_pass.draw_indexed(0..count, 0, 0..1);
                    }
                    (DrawRange::Elements { .. }, None) => continue,
                }
                executed += 1;
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        executed
    }

    /// Creates a depth texture matching this context's depth format.
    pub fn create_depth_texture(&self, width: u32, height: u32) -> Option<TextureResource> {
        self.depth_format?;
        Some(TextureResource::create_depth_texture(
            &self.device,
            width,
            height,
            "depth_texture",
        ))
    }
}

impl RenderContext for WgpuContext {
    fn create_vertex_array(&mut self, desc: &VertexArrayDesc<'_>) -> Result<VertexArrayId, GfxError> {
        let extra_usage = match desc.usage {
            BufferUsage::Static => wgpu::BufferUsages::empty(),
            BufferUsage::Dynamic => wgpu::BufferUsages::COPY_DST,
        };

        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{} Vertex Buffer", desc.label)),
                contents: bytemuck::cast_slice(desc.vertices),
                usage: wgpu::BufferUsages::VERTEX | extra_usage,
            });
        let index_buffer = desc.indices.map(|indices| {
            self.device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&format!("{} Index Buffer", desc.label)),
                    contents: bytemuck::cast_slice(indices),
                    usage: wgpu::BufferUsages::INDEX | extra_usage,
                })
        });

        let id = VertexArrayId::from_raw(self.allocate_id());
        self.vertex_arrays.insert(
            id,
            GpuVertexArray {
                layout: desc.layout.clone(),
                vertex_buffer,
                index_buffer,
                vertex_count: (desc.vertices.len() / desc.layout.stride() as usize) as u32,
                index_count: desc.indices.map_or(0, <[u32]>::len) as u32,
            },
        );
        Ok(id)
    }

    fn bind_vertex_array(&mut self, id: VertexArrayId) {
        self.bound_vertex_array = Some(id);
    }

    fn draw_arrays(&mut self, primitive: Primitive, first: u32, count: u32) {
        self.record_draw(primitive, DrawRange::Arrays { first, count });
    }

    fn draw_elements(&mut self, primitive: Primitive, count: u32) {
        self.record_draw(primitive, DrawRange::Elements { count });
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramId, GfxError> {
        if desc.source.trim().is_empty() {
            return Err(GfxError::ShaderCompile {
                label: desc.label.clone(),
                message: "empty shader source".to_owned(),
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&desc.label),
                source: wgpu::ShaderSource::Wgsl(desc.source.as_str().into()),
            });
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(GfxError::ShaderCompile {
                label: desc.label.clone(),
                message: error.to_string(),
            });
        }

        let interface = desc.interface();
        let bind_group_layout = self
            .device
            .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(&format!("{} Bind Group Layout", desc.label)),
                entries: &program_layout_entries(interface.samplers.len()),
            });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&format!("{} Pipeline Layout", desc.label)),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let id = ProgramId::from_raw(self.allocate_id());
        self.programs.insert(
            id,
            GpuProgram {
                block: interface.layout.allocate(),
                sampler_units: vec![0; interface.samplers.len()],
                interface,
                module,
                bind_group_layout,
                pipeline_layout,
                uniform_pool: Vec::new(),
            },
        );
        Ok(id)
    }

    fn use_program(&mut self, id: ProgramId) {
        self.current_program = Some(id);
    }

    fn set_uniform(&mut self, program: ProgramId, name: &str, value: UniformValue) {
        let Some(gpu_program) = self.programs.get_mut(&program) else {
            log::warn!("set_uniform on unknown program {program}");
            return;
        };
        match gpu_program.interface.resolve(name, &value) {
            Some(UniformTarget::Block(slot)) => {
                gpu_program
                    .interface
                    .layout
                    .write(&mut gpu_program.block, &slot, &value);
            }
            Some(UniformTarget::Sampler { index, unit }) => {
                gpu_program.sampler_units[index] = unit;
            }
            None => {}
        }
    }

    fn create_texture(&mut self, image: &TextureImage<'_>) -> Result<TextureId, GfxError> {
        image.validate()?;
        let max_dimension = self.device.limits().max_texture_dimension_2d;
        if image.width > max_dimension || image.height > max_dimension {
            return Err(GfxError::InvalidImage {
                width: image.width,
                height: image.height,
                reason: "larger than the device's maximum 2D texture size",
            });
        }

        let label = format!("Texture {}", self.next_id + 1);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let resource = TextureResource::from_image(&self.device, &self.queue, image, &label);
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            log::error!("failed to create '{label}': {error}");
            return Err(GfxError::InvalidImage {
                width: image.width,
                height: image.height,
                reason: "rejected by the device",
            });
        }

        let id = TextureId::from_raw(self.allocate_id());
        self.textures.insert(id, resource);
        Ok(id)
    }

    fn bind_texture(&mut self, unit: u32, texture: TextureId) {
        self.texture_units.insert(unit, texture);
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
                self.pipelines.retain(|key, _| key.program != id);
                self.programs.remove(&id).is_some()
            }
            Resource::Texture(id) => {
                self.texture_units.retain(|_, bound| *bound != id);
                self.textures.remove(&id).is_some()
            }
        };
        if !known {
            log::warn!("release of unknown resource {resource:?}");
        }
    }

    fn release_queue(&self) -> ReleaseQueue {
        self.release_queue.clone()
    }
}
