//! The root of a display tree and the per-frame entry point.

use crate::color::Color;
use crate::error::Result;
use crate::renderer::{DisplayNode, DrawTarget, RenderSupport};

/// Counters reported after a frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub draw_calls: usize,
}

pub struct Stage {
    /// Stage size in points
    pub width: f32,
    pub height: f32,
    /// Background, cleared at the start of every frame
    pub color: Color,
    pub root: DisplayNode,
}

impl Stage {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            color: Color::BLACK,
            root: DisplayNode::container(),
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn add_child(&mut self, child: DisplayNode) {
        self.root.add_child(child);
    }

    /// Render one frame into a target of `target_width` x `target_height` pixels.
    pub fn render<T: DrawTarget>(
        &mut self,
        support: &mut RenderSupport<T>,
        target_width: u32,
        target_height: u32,
    ) -> Result<FrameStats> {
        support.next_frame();
        support.set_projection(0.0, 0.0, self.width, self.height, target_width, target_height);
        support.clear(self.color, 1.0);

        if self.root.has_visible_area() {
            let root = &mut self.root;
            support.push_state(&root.local_matrix(), root.alpha, root.blend_mode);
            root.render(support)?;
            support.pop_state()?;
        }
        support.finish_quad_batch()?;

        Ok(FrameStats {
            draw_calls: support.draw_count(),
        })
    }
}
