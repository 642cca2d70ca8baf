//! wgpu draw target.
//!
//! Draw calls are recorded while the frame is walked and encoded into render
//! passes by [`Renderer::submit`]. A clear starts a new pass; scissor changes
//! apply to every draw that follows.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{BindGroup, BindGroupLayout, Buffer, RenderPipeline, Sampler, TextureFormat};

use super::batch::QuadBatch;
use super::context::RenderContext;
use super::gpu::{clear_color, DrawUniforms};
use super::gpu_context::GpuContext;
use super::pipeline::{
    create_quad_pipeline, create_texture_layout, create_uniform_layout, PipelineKey,
};
use super::target::{DrawState, DrawTarget, ScissorRect};
use crate::color::Color;
use crate::error::{RenderError, Result};

struct DrawCall {
    pipeline: PipelineKey,
    vertex_buffer: Arc<Buffer>,
    index_buffer: Arc<Buffer>,
    index_count: u32,
    uniforms: BindGroup,
    texture: Option<BindGroup>,
}

enum RenderCommand {
    Clear(wgpu::Color),
    Scissor(Option<ScissorRect>),
    Draw(DrawCall),
}

pub struct Renderer {
    context: Rc<RenderContext>,
    gpu: Rc<GpuContext>,
    generation: u64,
    format: TextureFormat,
    uniform_layout: BindGroupLayout,
    texture_layout: BindGroupLayout,
    sampler: Sampler,
    pipelines: HashMap<PipelineKey, RenderPipeline>,
    commands: Vec<RenderCommand>,
}

impl Renderer {
    /// Create a renderer for the context's current device, drawing into
    /// targets of `format`.
    pub fn new(context: Rc<RenderContext>, format: TextureFormat) -> Result<Self> {
        let gpu = context.gpu().ok_or(RenderError::NoDevice)?;
        let device = &gpu.device;

        let uniform_layout = create_uniform_layout(device);
        let texture_layout = create_texture_layout(device);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Quad Batch Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::MipmapFilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            generation: context.generation(),
            context,
            gpu,
            format,
            uniform_layout,
            texture_layout,
            sampler,
            pipelines: HashMap::new(),
            commands: Vec::new(),
        })
    }

    pub fn gpu(&self) -> &Rc<GpuContext> {
        &self.gpu
    }

    /// Whether the device this renderer was built for has been replaced.
    pub fn is_stale(&self) -> bool {
        self.generation != self.context.generation()
    }

    fn texture_bind_group(&self, batch: &QuadBatch) -> Option<BindGroup> {
        let texture = batch.texture()?;
        let Some(storage) = texture.root().gpu_texture() else {
            log::warn!(
                "Texture {:?} has no GPU storage; skipping draw",
                texture.root_id()
            );
            return None;
        };

        Some(self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Batch Texture Bind Group"),
            layout: &self.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&storage.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        }))
    }

    /// Encode every recorded command into `view`, which is `width` x `height`
    /// pixels. The command list is emptied.
    pub fn submit(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        width: u32,
        height: u32,
    ) {
        let commands = std::mem::take(&mut self.commands);
        let mut pass: Option<wgpu::RenderPass<'static>> = None;
        let mut scissor: Option<ScissorRect> = None;

        for command in &commands {
            match command {
                RenderCommand::Clear(color) => {
                    drop(pass.take());
                    let mut new_pass = Self::begin_pass(encoder, view, wgpu::LoadOp::Clear(*color));
                    Self::apply_scissor(&mut new_pass, scissor, width, height);
                    pass = Some(new_pass);
                }
                RenderCommand::Scissor(rect) => {
                    scissor = *rect;
                    if let Some(pass) = pass.as_mut() {
                        Self::apply_scissor(pass, scissor, width, height);
                    }
                }
                RenderCommand::Draw(call) => {
                    if scissor.is_some_and(|rect| rect.is_empty()) {
                        continue;
                    }
                    let Some(pipeline) = self.pipelines.get(&call.pipeline) else {
                        continue;
                    };
                    let pass = pass.get_or_insert_with(|| {
                        let mut new_pass = Self::begin_pass(encoder, view, wgpu::LoadOp::Load);
                        Self::apply_scissor(&mut new_pass, scissor, width, height);
                        new_pass
                    });

                    pass.set_pipeline(pipeline);
                    pass.set_bind_group(0, &call.uniforms, &[]);
                    if let Some(texture) = &call.texture {
                        pass.set_bind_group(1, texture, &[]);
                    }
                    pass.set_vertex_buffer(0, call.vertex_buffer.slice(..));
                    pass.set_index_buffer(call.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
                    pass.draw_indexed(0..call.index_count, 0, 0..1);
                }
            }
        }
    }

    fn begin_pass(
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
    ) -> wgpu::RenderPass<'static> {
        encoder
            .begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Quad Batch Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            })
            .forget_lifetime()
    }

    fn apply_scissor(
        pass: &mut wgpu::RenderPass<'static>,
        rect: Option<ScissorRect>,
        width: u32,
        height: u32,
    ) {
        match rect {
            Some(rect) if !rect.is_empty() => {
                pass.set_scissor_rect(rect.x, rect.y, rect.width, rect.height)
            }
            _ => pass.set_scissor_rect(0, 0, width, height),
        }
    }
}

impl DrawTarget for Renderer {
    fn clear(&mut self, color: Color, alpha: f32) {
        self.commands.push(RenderCommand::Clear(clear_color(color, alpha)));
    }

    fn set_scissor(&mut self, rect: Option<ScissorRect>) {
        self.commands.push(RenderCommand::Scissor(rect));
    }

    fn draw(&mut self, batch: &mut QuadBatch, state: &DrawState) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }

        let texture = self.texture_bind_group(batch);
        if batch.texture().is_some() && texture.is_none() {
            return Ok(());
        }

        let key = PipelineKey {
            textured: texture.is_some(),
            factors: state.factors,
        };
        if !self.pipelines.contains_key(&key) {
            let pipeline = create_quad_pipeline(
                &self.gpu.device,
                self.format,
                key,
                &self.uniform_layout,
                &self.texture_layout,
            );
            self.pipelines.insert(key, pipeline);
        }

        let uniforms = DrawUniforms::new(&state.mvp, state.alpha, batch.premultiplied_alpha());
        let uniform_buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad Batch Uniform Buffer"),
                contents: bytemuck::cast_slice(&[uniforms]),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let uniform_group = self.gpu.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Quad Batch Uniform Bind Group"),
            layout: &self.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let index_count = batch.index_count() as u32;
        let buffers = batch.sync(&self.gpu, self.context.generation());
        self.commands.push(RenderCommand::Draw(DrawCall {
            pipeline: key,
            vertex_buffer: buffers.vertex.clone(),
            index_buffer: buffers.index.clone(),
            index_count,
            uniforms: uniform_group,
            texture,
        }));
        Ok(())
    }
}
