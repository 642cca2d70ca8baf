//! The four-vertex drawable primitive.

use std::rc::Rc;

use super::texture::Texture;
use super::vertex_data::VertexData;
use crate::color::Color;
use crate::rect::Rect;
use crate::transform::Matrix;

/// A rectangle made of four vertices ordered top-left, top-right,
/// bottom-left, bottom-right, optionally mapped with a texture.
#[derive(Clone)]
pub struct Quad {
    vertex_data: VertexData,
    texture: Option<Rc<Texture>>,
    /// Cached: any vertex differs from opaque white
    tinted: bool,
}

impl Quad {
    pub fn new(width: f32, height: f32, color: Color) -> Self {
        let mut vertex_data = VertexData::new(4, true);
        vertex_data.set_position(1, width, 0.0);
        vertex_data.set_position(2, 0.0, height);
        vertex_data.set_position(3, width, height);
        vertex_data.set_uniform_color(color);

        let mut quad = Self {
            vertex_data,
            texture: None,
            tinted: false,
        };
        quad.update_tinted();
        quad
    }

    /// A quad showing `texture`, sized to its frame (or to the texture itself).
    pub fn from_texture(texture: Rc<Texture>) -> Self {
        let (width, height) = match texture.frame() {
            Some(frame) => (frame.width, frame.height),
            None => (texture.width(), texture.height()),
        };

        let mut quad = Self::new(width, height, Color::WHITE);
        quad.vertex_data.set_tex_coords(1, 1.0, 0.0);
        quad.vertex_data.set_tex_coords(2, 0.0, 1.0);
        quad.vertex_data.set_tex_coords(3, 1.0, 1.0);
        quad.set_texture(Some(texture));
        quad
    }

    pub fn vertex_data(&self) -> &VertexData {
        &self.vertex_data
    }

    pub fn texture(&self) -> Option<&Rc<Texture>> {
        self.texture.as_ref()
    }

    /// Swap the texture. The vertex colors adopt the texture's alpha convention.
    pub fn set_texture(&mut self, texture: Option<Rc<Texture>>) {
        let premultiplied_alpha = texture
            .as_ref()
            .map_or(true, |texture| texture.premultiplied_alpha());
        self.vertex_data.set_premultiplied_alpha(premultiplied_alpha, true);
        self.texture = texture;
    }

    pub fn premultiplied_alpha(&self) -> bool {
        self.vertex_data.premultiplied_alpha()
    }

    pub fn tinted(&self) -> bool {
        self.tinted
    }

    pub fn color(&self) -> Color {
        self.vertex_data.color(0)
    }

    pub fn set_color(&mut self, color: Color) {
        self.vertex_data.set_uniform_color(color);
        self.update_tinted();
    }

    pub fn color_at(&self, index: usize) -> Color {
        self.vertex_data.color(index)
    }

    pub fn set_color_at(&mut self, index: usize, color: Color) {
        self.vertex_data.set_color(index, color);
        self.update_tinted();
    }

    pub fn alpha_at(&self, index: usize) -> f32 {
        self.vertex_data.alpha(index)
    }

    pub fn set_alpha_at(&mut self, index: usize, alpha: f32) {
        self.vertex_data.set_alpha(index, alpha);
        self.update_tinted();
    }

    /// Set the alpha of all four vertices.
    pub fn set_vertex_alpha(&mut self, alpha: f32) {
        self.vertex_data.set_uniform_alpha(alpha);
        self.update_tinted();
    }

    pub fn tex_coords(&self, index: usize) -> (f32, f32) {
        self.vertex_data.tex_coords(index)
    }

    pub fn set_tex_coords(&mut self, index: usize, u: f32, v: f32) {
        self.vertex_data.set_tex_coords(index, u, v);
    }

    pub fn bounds(&self, matrix: Option<&Matrix>) -> Rect {
        self.vertex_data.bounds(matrix, 0, 4)
    }

    /// Copy the four vertices into `target` starting at `target_index`,
    /// remapped onto the backing texture.
    pub fn copy_vertex_data_to(&self, target: &mut VertexData, target_index: usize) {
        self.vertex_data.copy_to(target, target_index);
        if let Some(texture) = &self.texture {
            texture.adjust_vertex_data(target, target_index);
        }
    }

    fn update_tinted(&mut self) {
        self.tinted = self.vertex_data.is_tinted();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::context::RenderContext;
    use crate::renderer::texture::TextureOptions;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn test_vertex_order() {
        let quad = Quad::new(10.0, 20.0, Color::WHITE);
        let data = quad.vertex_data();
        assert_eq!(data.position(0), (0.0, 0.0));
        assert_eq!(data.position(1), (10.0, 0.0));
        assert_eq!(data.position(2), (0.0, 20.0));
        assert_eq!(data.position(3), (10.0, 20.0));
        assert!(quad.premultiplied_alpha());
    }

    #[test]
    fn test_tinted_tracks_color_and_alpha() {
        let mut quad = Quad::new(1.0, 1.0, Color::WHITE);
        assert!(!quad.tinted());

        quad.set_color(Color::RED);
        assert!(quad.tinted());

        quad.set_color(Color::WHITE);
        assert!(!quad.tinted());

        quad.set_alpha_at(3, 0.5);
        assert!(quad.tinted());
        assert!(approx_eq(quad.alpha_at(3), 128.0 / 255.0));
    }

    #[test]
    fn test_textured_quad_copies_remapped_tex_coords() {
        let context = RenderContext::new(Default::default());
        let atlas = Texture::empty(&context, 100, 200, TextureOptions::default()).unwrap();
        let area = Rect::new(10.0, 20.0, 30.0, 40.0);
        let region = Texture::sub(&atlas, Some(area), None, false, 1.0);

        let quad = Quad::from_texture(region);
        assert!(approx_eq(quad.bounds(None).width, 30.0));
        assert!(approx_eq(quad.bounds(None).height, 40.0));

        let mut target = VertexData::new(8, true);
        quad.copy_vertex_data_to(&mut target, 4);
        let (u, v) = target.tex_coords(4);
        assert!(approx_eq(u, 0.1) && approx_eq(v, 0.1));
        let (u, v) = target.tex_coords(7);
        assert!(approx_eq(u, 0.4) && approx_eq(v, 0.3));

        // the quad itself keeps local coordinates
        assert_eq!(quad.tex_coords(3), (1.0, 1.0));
    }

    #[test]
    fn test_texture_sets_alpha_convention() {
        let context = RenderContext::new(Default::default());
        let options = TextureOptions {
            premultiplied_alpha: false,
            ..Default::default()
        };
        let straight = Texture::empty(&context, 8, 8, options).unwrap();
        let quad = Quad::from_texture(straight);
        assert!(!quad.premultiplied_alpha());
        assert!(!quad.tinted());
    }
}
