//! A batching 2D scene-graph renderer.
//!
//! A tree of [`DisplayNode`](renderer::DisplayNode)s is walked every frame and
//! merged into as few GPU draw calls as possible: consecutive quads sharing
//! texture, alpha convention, blend mode and tint state end up in one
//! [`QuadBatch`](renderer::QuadBatch). Static subtrees can be compiled once
//! with [`DisplayNode::flatten`](renderer::DisplayNode::flatten) and replayed.

pub mod color;
pub mod config;
pub mod error;
pub mod rect;
pub mod renderer;
pub mod stage;
pub mod transform;

pub use config::RenderConfig;
pub use error::{RenderError, Result};

pub mod prelude {
    pub use crate::color::Color;
    pub use crate::config::RenderConfig;
    pub use crate::error::{RenderError, Result};
    pub use crate::rect::Rect;
    pub use crate::renderer::{
        BlendMode, DisplayNode, DrawTarget, NodeKind, Quad, QuadBatch, RecordingTarget,
        RenderContext, RenderSupport, Renderer, Texture, TextureAtlas, TextureOptions,
    };
    pub use crate::stage::{FrameStats, Stage};
    pub use crate::transform::Matrix;
}
