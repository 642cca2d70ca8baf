//! Per-frame rendering state: the state stack, the clip stack, the pool of
//! live batches and the draw-call counter.

use std::rc::Rc;

use super::batch::QuadBatch;
use super::blend::BlendMode;
use super::context::RenderContext;
use super::quad::Quad;
use super::state::RenderState;
use super::target::{DrawState, DrawTarget, ScissorRect};
use crate::color::Color;
use crate::error::{RenderError, Result};
use crate::rect::Rect;
use crate::transform::Matrix;

pub struct RenderSupport<T: DrawTarget> {
    context: Rc<RenderContext>,
    target: T,
    projection: Matrix,
    /// Render target size in pixels
    target_width: u32,
    target_height: u32,
    /// Grows on demand and never shrinks; `state_index` is the top.
    states: Vec<RenderState>,
    state_index: usize,
    clip_rects: Vec<Rect>,
    batches: Vec<QuadBatch>,
    batch_index: usize,
    draw_count: usize,
}

impl<T: DrawTarget> RenderSupport<T> {
    pub fn new(context: Rc<RenderContext>, target: T) -> Self {
        Self {
            context,
            target,
            projection: Matrix::IDENTITY,
            target_width: 1,
            target_height: 1,
            states: vec![RenderState::default()],
            state_index: 0,
            clip_rects: Vec::new(),
            batches: vec![QuadBatch::new()],
            batch_index: 0,
            draw_count: 0,
        }
    }

    pub fn context(&self) -> &Rc<RenderContext> {
        &self.context
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut T {
        &mut self.target
    }

    pub fn into_target(self) -> T {
        self.target
    }

    /// Reset stacks and counters for a new frame.
    pub fn next_frame(&mut self) {
        self.trim_batches();
        self.state_index = 0;
        self.states[0] = RenderState::default();
        self.clip_rects.clear();
        self.batch_index = 0;
        self.batches[0].reset();
        self.draw_count = 0;
    }

    /// Drop pooled batches when a frame used less than half of a large pool.
    fn trim_batches(&mut self) {
        let used = self.batch_index + 1;
        let total = self.batches.len();
        if total >= self.context.config().batch_pool_trim_threshold && total > 2 * used {
            log::debug!("Trimming batch pool from {} to {}", total, 2 * used);
            self.batches.truncate(2 * used);
        }
    }

    pub fn pooled_batches(&self) -> usize {
        self.batches.len()
    }

    /// Project the stage rectangle `(x, y, width, height)` onto a render
    /// target of `target_width` x `target_height` pixels.
    pub fn set_projection(
        &mut self,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        target_width: u32,
        target_height: u32,
    ) {
        self.projection = Matrix::ortho(x, y, width, height);
        self.target_width = target_width;
        self.target_height = target_height;
    }

    pub fn projection(&self) -> &Matrix {
        &self.projection
    }

    fn state(&self) -> &RenderState {
        &self.states[self.state_index]
    }

    pub fn model_view(&self) -> Matrix {
        self.state().model_view
    }

    pub fn alpha(&self) -> f32 {
        self.state().alpha
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.state().blend_mode
    }

    /// Model-view followed by the projection.
    pub fn mvp_matrix(&self) -> Matrix {
        self.state().model_view.appended(&self.projection)
    }

    pub fn state_depth(&self) -> usize {
        self.state_index
    }

    pub fn push_state(&mut self, matrix: &Matrix, alpha: f32, blend_mode: BlendMode) {
        let next = RenderState::derived(self.state(), matrix, alpha, blend_mode);
        self.state_index += 1;
        if self.states.len() <= self.state_index {
            self.states.push(next);
        } else {
            self.states[self.state_index] = next;
        }
    }

    pub fn pop_state(&mut self) -> Result<()> {
        if self.state_index == 0 {
            return Err(RenderError::StateStackUnderflow);
        }
        self.state_index -= 1;
        Ok(())
    }

    pub fn draw_count(&self) -> usize {
        self.draw_count
    }

    /// Count draws issued outside the batch pool.
    pub fn add_draw_calls(&mut self, count: usize) {
        self.draw_count += count;
    }

    pub fn clear(&mut self, color: Color, alpha: f32) {
        self.target.clear(color, alpha);
    }

    /// Add a quad to the live batch, flushing it first on a state change.
    pub fn batch_quad(&mut self, quad: &Quad) -> Result<()> {
        let state = *self.state();
        let current = &self.batches[self.batch_index];
        if current.is_state_change(
            quad.tinted(),
            quad.texture(),
            state.alpha,
            quad.premultiplied_alpha(),
            state.blend_mode,
            1,
        ) {
            self.finish_quad_batch()?;
        }

        self.batches[self.batch_index].add_quad(
            quad,
            state.alpha,
            state.blend_mode,
            Some(&state.model_view),
        )
    }

    /// Draw the live batch (if it holds anything) and move on to the next one.
    pub fn finish_quad_batch(&mut self) -> Result<()> {
        if self.batches[self.batch_index].is_empty() {
            return Ok(());
        }

        let projection = self.projection;
        let batch = &mut self.batches[self.batch_index];
        let blend_mode = batch.blend_mode();
        let factors = self
            .context
            .blend_factors(blend_mode, batch.premultiplied_alpha())?;
        self.target.draw(
            batch,
            &DrawState {
                mvp: projection,
                alpha: 1.0,
                blend_mode,
                factors,
            },
        )?;
        self.draw_count += 1;

        self.batch_index += 1;
        if self.batches.len() <= self.batch_index {
            self.batches.push(QuadBatch::new());
        }
        self.batches[self.batch_index].reset();
        Ok(())
    }

    /// Draw a batch built by the caller with the current state.
    pub fn render_quad_batch(&mut self, batch: &mut QuadBatch) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.finish_quad_batch()?;
        self.add_draw_calls(1);
        let (mvp, alpha, blend_mode) = (self.mvp_matrix(), self.alpha(), self.blend_mode());
        self.draw_batch(batch, &mvp, alpha, blend_mode)
    }

    /// Replay batches compiled from a subtree. `AUTO` batches take the
    /// current blend mode.
    pub fn render_flattened(&mut self, batches: &mut [QuadBatch]) -> Result<()> {
        self.finish_quad_batch()?;
        self.add_draw_calls(batches.len());

        let (mvp, alpha, blend_mode) = (self.mvp_matrix(), self.alpha(), self.blend_mode());
        for batch in batches.iter_mut() {
            let mode = batch.blend_mode().resolve(blend_mode);
            self.draw_batch(batch, &mvp, alpha, mode)?;
        }
        Ok(())
    }

    /// Submit a single batch without touching the counters.
    pub fn draw_batch(
        &mut self,
        batch: &mut QuadBatch,
        mvp: &Matrix,
        alpha: f32,
        blend_mode: BlendMode,
    ) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        let factors = self
            .context
            .blend_factors(blend_mode, batch.premultiplied_alpha())?;
        self.target.draw(
            batch,
            &DrawState {
                mvp: *mvp,
                alpha,
                blend_mode,
                factors,
            },
        )
    }

    /// Push a clip rectangle given in stage coordinates. With `intersect` it
    /// is cut down to the current clip. Returns the rectangle now in effect.
    pub fn push_clip_rect(&mut self, rect: Rect, intersect: bool) -> Result<Rect> {
        let rect = match self.clip_rects.last() {
            Some(current) if intersect => rect.intersection(current),
            _ => rect,
        };
        self.clip_rects.push(rect);
        self.apply_clip_rect()?;
        Ok(rect)
    }

    pub fn pop_clip_rect(&mut self) -> Result<()> {
        if self.clip_rects.pop().is_none() {
            return Err(RenderError::ClipStackUnderflow);
        }
        self.apply_clip_rect()
    }

    pub fn clip_depth(&self) -> usize {
        self.clip_rects.len()
    }

    /// Flush, then hand the active clip to the target as a scissor box.
    pub fn apply_clip_rect(&mut self) -> Result<()> {
        self.finish_quad_batch()?;
        let scissor = self.clip_rects.last().map(|rect| self.scissor_for(rect));
        self.target.set_scissor(scissor);
        Ok(())
    }

    /// Map a stage rectangle to target pixels through the projection.
    ///
    /// The projection puts the stage's top edge at NDC `+1`; pixel rows grow
    /// downwards from the target's top-left corner, so `y` is flipped here.
    fn scissor_for(&self, rect: &Rect) -> ScissorRect {
        let width = self.target_width as f32;
        let height = self.target_height as f32;

        let (left, top) = self.projection.transform_point(rect.x, rect.y);
        let (right, bottom) = self.projection.transform_point(rect.right(), rect.bottom());
        let to_pixel_x = |ndc: f32| (ndc * 0.5 + 0.5) * width;
        let to_pixel_y = |ndc: f32| (0.5 - ndc * 0.5) * height;

        let clip = Rect::bounds_of_points(&[
            (to_pixel_x(left), to_pixel_y(top)),
            (to_pixel_x(right), to_pixel_y(bottom)),
        ]);
        let scissor = if rect.is_empty() {
            Rect::new(clip.x, clip.y, 0.0, 0.0)
        } else {
            clip.intersection(&Rect::new(0.0, 0.0, width, height))
        };

        if scissor.width <= 0.0 || scissor.height <= 0.0 {
            log::debug!("Clip rect {:?} collapsed to an empty scissor", rect);
            return ScissorRect::default();
        }

        let x = scissor.x.round();
        let y = scissor.y.round();
        ScissorRect {
            x: x as u32,
            y: y as u32,
            width: (scissor.right().round() - x) as u32,
            height: (scissor.bottom().round() - y) as u32,
        }
    }

    /// Release the GPU buffers of every pooled batch.
    pub fn purge_buffers(&mut self) {
        for batch in &mut self.batches {
            batch.purge_buffers();
        }
    }
}
