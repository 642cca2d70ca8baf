//! Quad batches and the compiler that merges a display tree into them.
//!
//! A batch is an ordered run of quads sharing one texture, one alpha
//! convention, one blend mode and one tint state. All quads live in a single
//! vertex buffer and are drawn with one indexed draw call.

use std::rc::Rc;
use std::sync::Arc;

use wgpu::util::DeviceExt;
use wgpu::{Buffer, BufferUsages};

use super::blend::BlendMode;
use super::constants::{
    INDICES_PER_QUAD, INITIAL_BATCH_CAPACITY, MAX_NUM_QUADS, QUAD_INDICES, VERTICES_PER_QUAD,
};
use super::gpu_context::GpuContext;
use super::quad::Quad;
use super::texture::Texture;
use super::tree::{DisplayNode, NodeKind};
use super::vertex_data::{Vertex, VertexData};
use crate::error::{RenderError, Result};
use crate::rect::Rect;
use crate::transform::Matrix;

/// GPU buffers owned by one batch.
pub struct BatchBuffers {
    pub vertex: Arc<Buffer>,
    pub index: Arc<Buffer>,
    capacity: usize,
    generation: u64,
}

pub struct QuadBatch {
    vertex_data: VertexData,
    indices: Vec<u16>,
    num_quads: usize,
    capacity: usize,
    texture: Option<Rc<Texture>>,
    tinted: bool,
    blend_mode: BlendMode,
    sync_required: bool,
    buffers: Option<BatchBuffers>,
}

impl Default for QuadBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl QuadBatch {
    pub fn new() -> Self {
        let mut batch = Self {
            vertex_data: VertexData::new(0, true),
            indices: Vec::new(),
            num_quads: 0,
            capacity: 0,
            texture: None,
            tinted: false,
            blend_mode: BlendMode::NORMAL,
            sync_required: true,
            buffers: None,
        };
        batch.resize(INITIAL_BATCH_CAPACITY);
        batch
    }

    pub fn num_quads(&self) -> usize {
        self.num_quads
    }

    pub fn is_empty(&self) -> bool {
        self.num_quads == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn texture(&self) -> Option<&Rc<Texture>> {
        self.texture.as_ref()
    }

    pub fn tinted(&self) -> bool {
        self.tinted
    }

    pub fn premultiplied_alpha(&self) -> bool {
        self.vertex_data.premultiplied_alpha()
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    pub fn vertex_data(&self) -> &VertexData {
        &self.vertex_data
    }

    pub fn indices(&self) -> &[u16] {
        &self.indices
    }

    /// Number of indices a draw of this batch consumes.
    pub fn index_count(&self) -> usize {
        self.num_quads * INDICES_PER_QUAD
    }

    pub fn sync_required(&self) -> bool {
        self.sync_required
    }

    /// Resize to room for `capacity` quads, dropping quads past the new end.
    pub fn set_capacity(&mut self, capacity: usize) -> Result<()> {
        if capacity == 0 || capacity > MAX_NUM_QUADS {
            return Err(RenderError::InvalidCapacity(capacity));
        }
        self.resize(capacity);
        Ok(())
    }

    /// `capacity` is clamped to `MAX_NUM_QUADS`.
    fn resize(&mut self, capacity: usize) {
        let capacity = capacity.min(MAX_NUM_QUADS);
        let kept = self.capacity.min(capacity);
        self.capacity = capacity;
        self.num_quads = self.num_quads.min(capacity);
        self.vertex_data.set_num_vertices(capacity * VERTICES_PER_QUAD);

        // Slot bases are produced as u16 directly; the quad limit keeps them in range.
        self.indices.truncate(kept * INDICES_PER_QUAD);
        let bases = (0..=u16::MAX)
            .step_by(VERTICES_PER_QUAD)
            .skip(kept)
            .take(capacity - kept);
        for base in bases {
            self.indices.extend(QUAD_INDICES.iter().map(|offset| base + offset));
        }

        self.sync_required = true;
    }

    fn expand(&mut self) {
        let capacity = if self.capacity < 8 {
            INITIAL_BATCH_CAPACITY
        } else {
            (self.capacity * 2).min(MAX_NUM_QUADS)
        };
        log::debug!("Growing quad batch from {} to {} quads", self.capacity, capacity);
        self.resize(capacity);
    }

    /// Empty the batch. Capacity and GPU buffers are kept for reuse.
    pub fn reset(&mut self) {
        self.num_quads = 0;
        self.texture = None;
        self.tinted = false;
        self.sync_required = true;
    }

    /// Whether adding `num_quads` quads with the given state would need a new
    /// batch. Never mutates the batch.
    pub fn is_state_change(
        &self,
        tinted: bool,
        texture: Option<&Rc<Texture>>,
        alpha: f32,
        premultiplied_alpha: bool,
        blend_mode: BlendMode,
        num_quads: usize,
    ) -> bool {
        if self.num_quads == 0 {
            return false;
        }
        if self.num_quads + num_quads > MAX_NUM_QUADS {
            return true;
        }

        match (&self.texture, texture) {
            (None, None) => {
                self.premultiplied_alpha() != premultiplied_alpha || self.blend_mode != blend_mode
            }
            (Some(current), Some(texture)) => {
                (tinted || alpha != 1.0) != self.tinted
                    || current.root_id() != texture.root_id()
                    || self.blend_mode != blend_mode
            }
            _ => true,
        }
    }

    /// Append a quad, transformed by `matrix` and faded by `alpha`.
    ///
    /// Fails with [`RenderError::BatchOverflow`] once the batch holds
    /// `MAX_NUM_QUADS` quads.
    pub fn add_quad(
        &mut self,
        quad: &Quad,
        alpha: f32,
        blend_mode: BlendMode,
        matrix: Option<&Matrix>,
    ) -> Result<()> {
        let quad_index = self.num_quads;
        if quad_index + 1 > MAX_NUM_QUADS {
            return Err(RenderError::BatchOverflow(quad_index + 1));
        }
        if quad_index + 1 > self.capacity {
            self.expand();
        }
        if quad_index == 0 {
            self.adopt_state(quad.texture(), quad.premultiplied_alpha(), blend_mode);
        }

        let vertex_index = quad_index * VERTICES_PER_QUAD;
        quad.copy_vertex_data_to(&mut self.vertex_data, vertex_index);
        self.finish_append(vertex_index, VERTICES_PER_QUAD, alpha, matrix);

        self.tinted |= alpha != 1.0 || quad.tinted();
        self.num_quads += 1;
        Ok(())
    }

    /// Append every quad of another batch.
    pub fn add_batch(
        &mut self,
        batch: &QuadBatch,
        alpha: f32,
        blend_mode: BlendMode,
        matrix: Option<&Matrix>,
    ) -> Result<()> {
        self.add_batch_range(batch, 0, batch.num_quads, alpha, blend_mode, matrix)
    }

    /// Append `count` quads of another batch, starting at quad `first`.
    pub fn add_batch_range(
        &mut self,
        batch: &QuadBatch,
        first: usize,
        count: usize,
        alpha: f32,
        blend_mode: BlendMode,
        matrix: Option<&Matrix>,
    ) -> Result<()> {
        let count = count.min(batch.num_quads.saturating_sub(first));
        if count == 0 {
            return Ok(());
        }
        let total = self.num_quads + count;
        if total > MAX_NUM_QUADS {
            return Err(RenderError::BatchOverflow(total));
        }
        if total > self.capacity {
            self.resize(total);
        }
        if self.num_quads == 0 {
            self.adopt_state(batch.texture(), batch.premultiplied_alpha(), blend_mode);
        }

        let vertex_index = self.num_quads * VERTICES_PER_QUAD;
        let vertex_count = count * VERTICES_PER_QUAD;
        batch.vertex_data.copy_range_to(
            &mut self.vertex_data,
            vertex_index,
            first * VERTICES_PER_QUAD,
            vertex_count,
        );
        self.finish_append(vertex_index, vertex_count, alpha, matrix);

        self.tinted |= alpha != 1.0 || batch.tinted;
        self.num_quads = total;
        Ok(())
    }

    fn adopt_state(
        &mut self,
        texture: Option<&Rc<Texture>>,
        premultiplied_alpha: bool,
        blend_mode: BlendMode,
    ) {
        self.texture = texture.cloned();
        self.blend_mode = blend_mode;
        self.vertex_data.set_premultiplied_alpha(premultiplied_alpha, false);
    }

    fn finish_append(&mut self, start: usize, count: usize, alpha: f32, matrix: Option<&Matrix>) {
        if let Some(matrix) = matrix {
            self.vertex_data.transform_vertices(matrix, start, count);
        }
        if alpha != 1.0 {
            self.vertex_data.scale_alpha(alpha, start, count);
        }
        self.sync_required = true;
    }

    pub fn bounds(&self, matrix: Option<&Matrix>) -> Rect {
        self.vertex_data.bounds(matrix, 0, self.num_quads * VERTICES_PER_QUAD)
    }

    /// Make sure GPU buffers exist and hold the current vertices.
    ///
    /// Buffers are created on first use and recreated when the capacity or
    /// the device generation changed. The whole vertex buffer is uploaded
    /// when dirty; indices are only written at creation.
    pub fn sync(&mut self, gpu: &GpuContext, generation: u64) -> &BatchBuffers {
        let capacity = self.capacity;
        let current = matches!(
            &self.buffers,
            Some(buffers) if buffers.capacity == capacity && buffers.generation == generation
        );
        if !current {
            self.buffers = None;
            self.sync_required = true;
        }

        let indices = &self.indices;
        let buffers = self
            .buffers
            .get_or_insert_with(|| Self::create_buffers(gpu, capacity, indices, generation));

        if self.sync_required {
            gpu.queue.write_buffer(
                &buffers.vertex,
                0,
                bytemuck::cast_slice(self.vertex_data.vertices()),
            );
            self.sync_required = false;
        }
        buffers
    }

    fn create_buffers(
        gpu: &GpuContext,
        capacity: usize,
        indices: &[u16],
        generation: u64,
    ) -> BatchBuffers {
        log::debug!("Creating quad batch buffers for {} quads", capacity);

        let vertex = gpu.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Quad Batch Vertex Buffer"),
            size: (capacity * VERTICES_PER_QUAD * std::mem::size_of::<Vertex>()) as u64,
            usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let index = gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Quad Batch Index Buffer"),
                contents: bytemuck::cast_slice(indices),
                usage: BufferUsages::INDEX,
            });

        BatchBuffers {
            vertex: Arc::new(vertex),
            index: Arc::new(index),
            capacity,
            generation,
        }
    }

    /// Release the GPU buffers; they are recreated on the next sync.
    pub fn purge_buffers(&mut self) {
        self.buffers = None;
        self.sync_required = true;
    }

    /// Compile `node` into `batches`, reusing the batches already there and
    /// dropping the ones left over.
    ///
    /// The root's own transform and alpha are ignored; its blend mode becomes
    /// the ambient mode (and may stay `AUTO`, to be resolved when drawing).
    pub fn compile(node: &DisplayNode, batches: &mut Vec<QuadBatch>) -> Result<()> {
        Self::compile_node(node, batches, None, &Matrix::IDENTITY, 1.0, BlendMode::AUTO)?;
        Ok(())
    }

    fn compile_node(
        node: &DisplayNode,
        batches: &mut Vec<QuadBatch>,
        batch_index: Option<usize>,
        matrix: &Matrix,
        alpha: f32,
        blend_mode: BlendMode,
    ) -> Result<usize> {
        let is_root = batch_index.is_none();
        let (mut batch_index, object_alpha, blend_mode) = match batch_index {
            Some(index) => (index, node.alpha, blend_mode),
            None => {
                match batches.first_mut() {
                    Some(first) => first.reset(),
                    None => batches.push(QuadBatch::new()),
                }
                (0, 1.0, node.blend_mode)
            }
        };

        match &node.kind {
            NodeKind::Container { children, .. } => {
                for child in children.iter().filter(|child| child.has_visible_area()) {
                    let child_matrix = child.local_matrix().appended(matrix);
                    batch_index = Self::compile_node(
                        child,
                        batches,
                        Some(batch_index),
                        &child_matrix,
                        alpha * object_alpha,
                        child.blend_mode.resolve(blend_mode),
                    )?;
                }
            }
            NodeKind::Quad(quad) => {
                let alpha = alpha * object_alpha;
                batch_index = Self::batch_for(
                    batches,
                    batch_index,
                    quad.tinted(),
                    quad.texture(),
                    alpha,
                    quad.premultiplied_alpha(),
                    blend_mode,
                    1,
                );
                batches[batch_index].add_quad(quad, alpha, blend_mode, Some(matrix))?;
            }
            NodeKind::Batch(batch) => {
                let alpha = alpha * object_alpha;
                batch_index = Self::batch_for(
                    batches,
                    batch_index,
                    batch.tinted(),
                    batch.texture(),
                    alpha,
                    batch.premultiplied_alpha(),
                    blend_mode,
                    batch.num_quads(),
                );
                batches[batch_index].add_batch(batch, alpha, blend_mode, Some(matrix))?;
            }
        }

        if is_root {
            batches.truncate(batch_index + 1);
        }
        Ok(batch_index)
    }

    /// Index of the batch the next primitive goes into, starting a fresh one
    /// on a state change.
    #[allow(clippy::too_many_arguments)]
    fn batch_for(
        batches: &mut Vec<QuadBatch>,
        batch_index: usize,
        tinted: bool,
        texture: Option<&Rc<Texture>>,
        alpha: f32,
        premultiplied_alpha: bool,
        blend_mode: BlendMode,
        num_quads: usize,
    ) -> usize {
        if !batches[batch_index].is_state_change(
            tinted,
            texture,
            alpha,
            premultiplied_alpha,
            blend_mode,
            num_quads,
        ) {
            return batch_index;
        }

        let next = batch_index + 1;
        if batches.len() <= next {
            batches.push(QuadBatch::new());
        }
        batches[next].reset();
        next
    }
}
