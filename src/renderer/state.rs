use super::blend::BlendMode;
use crate::transform::Matrix;

/// One frame of the render state stack.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderState {
    pub model_view: Matrix,
    pub alpha: f32,
    /// Never `AUTO` once derived from a parent frame
    pub blend_mode: BlendMode,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            model_view: Matrix::IDENTITY,
            alpha: 1.0,
            blend_mode: BlendMode::NORMAL,
        }
    }
}

impl RenderState {
    /// Child frame: `matrix` is applied before the parent's model-view,
    /// alpha multiplies and `AUTO` inherits the parent's blend mode.
    pub fn derived(
        parent: &RenderState,
        matrix: &Matrix,
        alpha: f32,
        blend_mode: BlendMode,
    ) -> Self {
        Self {
            model_view: matrix.appended(&parent.model_view),
            alpha: parent.alpha * alpha,
            blend_mode: blend_mode.resolve(parent.blend_mode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_state() {
        let parent = RenderState {
            model_view: Matrix::scaling(2.0, 2.0),
            alpha: 0.5,
            blend_mode: BlendMode::ADD,
        };

        let offset = Matrix::translation(10.0, 0.0);
        let child = RenderState::derived(&parent, &offset, 0.5, BlendMode::AUTO);
        assert_eq!(child.model_view.transform_point(0.0, 0.0), (20.0, 0.0));
        assert_eq!(child.alpha, 0.25);
        assert_eq!(child.blend_mode, BlendMode::ADD);

        let screen = RenderState::derived(&child, &Matrix::IDENTITY, 1.0, BlendMode::SCREEN);
        assert_eq!(screen.blend_mode, BlendMode::SCREEN);
    }
}
