//! Draw targets receive the flushed batches of a frame.
//!
//! [`Renderer`](super::render::Renderer) encodes them for wgpu;
//! [`RecordingTarget`] keeps a log of the submissions and is used wherever no
//! device is available.

use super::batch::QuadBatch;
use super::blend::{BlendFactors, BlendMode};
use super::texture::TextureId;
use crate::color::Color;
use crate::error::Result;
use crate::transform::Matrix;

/// Scissor box in render-target pixels, origin at the top-left.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScissorRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl ScissorRect {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Everything besides the batch itself that a draw call needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawState {
    pub mvp: Matrix,
    pub alpha: f32,
    /// Resolved mode, never `AUTO`
    pub blend_mode: BlendMode,
    pub factors: BlendFactors,
}

pub trait DrawTarget {
    fn clear(&mut self, color: Color, alpha: f32);

    /// `None` disables scissoring.
    fn set_scissor(&mut self, rect: Option<ScissorRect>);

    /// Issue one indexed draw for all quads of `batch`.
    fn draw(&mut self, batch: &mut QuadBatch, state: &DrawState) -> Result<()>;
}

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedDraw {
    pub num_quads: usize,
    pub texture: Option<TextureId>,
    pub tinted: bool,
    pub premultiplied_alpha: bool,
    pub state: DrawState,
    /// First vertex position, for telling draws apart
    pub first_position: (f32, f32),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Recorded {
    Clear { color: Color, alpha: f32 },
    Scissor(Option<ScissorRect>),
    Draw(RecordedDraw),
}

/// A draw target without a device that records every submission.
#[derive(Debug, Default)]
pub struct RecordingTarget {
    pub commands: Vec<Recorded>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draws(&self) -> impl Iterator<Item = &RecordedDraw> {
        self.commands.iter().filter_map(|command| match command {
            Recorded::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn draw_count(&self) -> usize {
        self.draws().count()
    }

    /// The scissor state in effect after all recorded commands.
    pub fn current_scissor(&self) -> Option<ScissorRect> {
        self.commands
            .iter()
            .rev()
            .find_map(|command| match command {
                Recorded::Scissor(rect) => Some(*rect),
                _ => None,
            })
            .flatten()
    }

    pub fn clear_log(&mut self) {
        self.commands.clear();
    }
}

impl DrawTarget for RecordingTarget {
    fn clear(&mut self, color: Color, alpha: f32) {
        self.commands.push(Recorded::Clear { color, alpha });
    }

    fn set_scissor(&mut self, rect: Option<ScissorRect>) {
        self.commands.push(Recorded::Scissor(rect));
    }

    fn draw(&mut self, batch: &mut QuadBatch, state: &DrawState) -> Result<()> {
        self.commands.push(Recorded::Draw(RecordedDraw {
            num_quads: batch.num_quads(),
            texture: batch.texture().map(|texture| texture.root_id()),
            tinted: batch.tinted(),
            premultiplied_alpha: batch.premultiplied_alpha(),
            state: *state,
            first_position: batch.vertex_data().position(0),
        }));
        Ok(())
    }
}
