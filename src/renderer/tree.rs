//! Display tree data structures.

use super::batch::QuadBatch;
use super::blend::BlendMode;
use super::quad::Quad;
use super::support::RenderSupport;
use super::target::DrawTarget;
use crate::error::Result;
use crate::rect::Rect;
use crate::transform::Matrix;

/// What a node draws.
pub enum NodeKind {
    Container {
        children: Vec<DisplayNode>,
        /// Clip applied to the children, in the container's local coordinates
        clip_rect: Option<Rect>,
        /// Batches compiled by [`DisplayNode::flatten`], replayed instead of
        /// walking the children
        flattened: Option<Vec<QuadBatch>>,
    },
    Quad(Quad),
    /// A batch built ahead of time by the caller
    Batch(QuadBatch),
}

/// A positioned, transformed node of the display tree.
pub struct DisplayNode {
    pub name: Option<String>,
    pub x: f32,
    pub y: f32,
    pub pivot_x: f32,
    pub pivot_y: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    /// Rotation in radians
    pub rotation: f32,
    pub alpha: f32,
    pub visible: bool,
    /// `AUTO` inherits the parent's mode
    pub blend_mode: BlendMode,
    pub kind: NodeKind,
}

impl DisplayNode {
    fn with_kind(kind: NodeKind) -> Self {
        Self {
            name: None,
            x: 0.0,
            y: 0.0,
            pivot_x: 0.0,
            pivot_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            rotation: 0.0,
            alpha: 1.0,
            visible: true,
            blend_mode: BlendMode::AUTO,
            kind,
        }
    }

    pub fn container() -> Self {
        Self::with_kind(NodeKind::Container {
            children: Vec::new(),
            clip_rect: None,
            flattened: None,
        })
    }

    pub fn quad(quad: Quad) -> Self {
        Self::with_kind(NodeKind::Quad(quad))
    }

    pub fn batch(batch: QuadBatch) -> Self {
        Self::with_kind(NodeKind::Batch(batch))
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_pivot(mut self, x: f32, y: f32) -> Self {
        self.pivot_x = x;
        self.pivot_y = y;
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32) -> Self {
        self.scale_x = x;
        self.scale_y = y;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_blend_mode(mut self, blend_mode: BlendMode) -> Self {
        self.blend_mode = blend_mode;
        self
    }

    /// Clip the children of a container. No effect on other kinds.
    pub fn with_clip_rect(mut self, rect: Rect) -> Self {
        if let NodeKind::Container { clip_rect, .. } = &mut self.kind {
            *clip_rect = Some(rect);
        }
        self
    }

    /// Append a child. Returns `false` (and drops the child) when this node is
    /// not a container.
    pub fn add_child(&mut self, child: DisplayNode) -> bool {
        match &mut self.kind {
            NodeKind::Container { children, .. } => {
                children.push(child);
                true
            }
            _ => false,
        }
    }

    pub fn with_child(mut self, child: DisplayNode) -> Self {
        self.add_child(child);
        self
    }

    pub fn children(&self) -> &[DisplayNode] {
        match &self.kind {
            NodeKind::Container { children, .. } => children,
            _ => &[],
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<DisplayNode>> {
        match &mut self.kind {
            NodeKind::Container { children, .. } => Some(children),
            _ => None,
        }
    }

    /// Transform into the parent's coordinates: pivot, scale, rotation, position.
    pub fn local_matrix(&self) -> Matrix {
        let mut matrix = Matrix::translation(-self.pivot_x, -self.pivot_y);
        matrix.scale(self.scale_x, self.scale_y);
        matrix.rotate(self.rotation);
        matrix.translate(self.x, self.y);
        matrix
    }

    /// Whether anything of this node could end up on screen.
    pub fn has_visible_area(&self) -> bool {
        self.alpha != 0.0 && self.visible && self.scale_x != 0.0 && self.scale_y != 0.0
    }

    /// Bounds in the parent's coordinates.
    pub fn bounds(&self) -> Rect {
        self.bounds_with(&self.local_matrix())
    }

    /// Bounds after mapping local coordinates with `matrix`.
    pub fn bounds_with(&self, matrix: &Matrix) -> Rect {
        match &self.kind {
            NodeKind::Quad(quad) => quad.bounds(Some(matrix)),
            NodeKind::Batch(batch) => batch.bounds(Some(matrix)),
            NodeKind::Container { children, .. } => children
                .iter()
                .map(|child| child.bounds_with(&child.local_matrix().appended(matrix)))
                .reduce(|bounds, child| bounds.union(&child))
                .unwrap_or(Rect::new(matrix.tx, matrix.ty, 0.0, 0.0)),
        }
    }

    /// Compile the subtree into cached batches. Later changes to the children
    /// are not picked up until the node is flattened again. Leaves are left
    /// alone.
    pub fn flatten(&mut self) -> Result<()> {
        let mut batches = match &mut self.kind {
            NodeKind::Container { flattened, .. } => flattened.take().unwrap_or_default(),
            _ => return Ok(()),
        };
        QuadBatch::compile(self, &mut batches)?;
        if let NodeKind::Container { flattened, .. } = &mut self.kind {
            *flattened = Some(batches);
        }
        Ok(())
    }

    pub fn unflatten(&mut self) {
        if let NodeKind::Container { flattened, .. } = &mut self.kind {
            *flattened = None;
        }
    }

    pub fn is_flattened(&self) -> bool {
        matches!(
            &self.kind,
            NodeKind::Container {
                flattened: Some(_),
                ..
            }
        )
    }

    /// Draw this node. The caller has already pushed the node's own state.
    pub fn render<T: DrawTarget>(&mut self, support: &mut RenderSupport<T>) -> Result<()> {
        match &mut self.kind {
            NodeKind::Quad(quad) => support.batch_quad(quad),
            NodeKind::Batch(batch) => support.render_quad_batch(batch),
            NodeKind::Container {
                children,
                clip_rect,
                flattened,
            } => {
                if let Some(rect) = clip_rect {
                    let stage_rect = support.model_view().transform_rect_bounds(rect);
                    let clipped = support.push_clip_rect(stage_rect, true)?;
                    if clipped.is_empty() {
                        return support.pop_clip_rect();
                    }
                }

                match flattened {
                    Some(batches) => support.render_flattened(batches)?,
                    None => {
                        for child in children.iter_mut().filter(|child| child.has_visible_area()) {
                            support.push_state(
                                &child.local_matrix(),
                                child.alpha,
                                child.blend_mode,
                            );
                            child.render(support)?;
                            support.pop_state()?;
                        }
                    }
                }

                if clip_rect.is_some() {
                    support.pop_clip_rect()?;
                }
                Ok(())
            }
        }
    }
}
