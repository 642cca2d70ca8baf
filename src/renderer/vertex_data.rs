//! Packed per-vertex attribute storage.
//!
//! Colors are stored as RGBA bytes. When the store uses premultiplied alpha
//! the RGB bytes hold `color * alpha`; the accessors hide that convention and
//! always deal in straight colors.

use crate::color::Color;
use crate::rect::Rect;
use crate::transform::Matrix;

/// A single vertex as uploaded to the GPU (20 bytes).
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
    /// RGBA bytes, premultiplied when the owning store says so
    pub color: [u8; 4],
}

impl Vertex {
    /// Origin vertex in opaque white; the value new slots are filled with.
    pub const BLANK: Self = Self {
        position: [0.0, 0.0],
        tex_coords: [0.0, 0.0],
        color: [255, 255, 255, 255],
    };
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn premultiply(color: [u8; 4]) -> [u8; 4] {
    let alpha = color[3] as f32 / 255.0;
    [
        (color[0] as f32 * alpha).round() as u8,
        (color[1] as f32 * alpha).round() as u8,
        (color[2] as f32 * alpha).round() as u8,
        color[3],
    ]
}

fn unpremultiply(color: [u8; 4]) -> [u8; 4] {
    if color[3] == 0 {
        return color;
    }
    let alpha = color[3] as f32 / 255.0;
    [
        (color[0] as f32 / alpha).round().min(255.0) as u8,
        (color[1] as f32 / alpha).round().min(255.0) as u8,
        (color[2] as f32 / alpha).round().min(255.0) as u8,
        color[3],
    ]
}

#[derive(Clone, Debug)]
pub struct VertexData {
    vertices: Vec<Vertex>,
    premultiplied_alpha: bool,
}

impl VertexData {
    pub fn new(num_vertices: usize, premultiplied_alpha: bool) -> Self {
        Self {
            vertices: vec![Vertex::BLANK; num_vertices],
            premultiplied_alpha,
        }
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Grow (with blank vertices) or shrink the store.
    pub fn set_num_vertices(&mut self, num_vertices: usize) {
        self.vertices.resize(num_vertices, Vertex::BLANK);
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn premultiplied_alpha(&self) -> bool {
        self.premultiplied_alpha
    }

    /// Switch the alpha convention. With `update_vertices` every stored color
    /// is converted; otherwise only the flag changes.
    pub fn set_premultiplied_alpha(&mut self, premultiplied_alpha: bool, update_vertices: bool) {
        if premultiplied_alpha == self.premultiplied_alpha {
            return;
        }

        if update_vertices {
            let convert = if premultiplied_alpha {
                premultiply
            } else {
                unpremultiply
            };
            for vertex in &mut self.vertices {
                vertex.color = convert(vertex.color);
            }
        }
        self.premultiplied_alpha = premultiplied_alpha;
    }

    pub fn position(&self, index: usize) -> (f32, f32) {
        let [x, y] = self.vertices[index].position;
        (x, y)
    }

    pub fn set_position(&mut self, index: usize, x: f32, y: f32) {
        self.vertices[index].position = [x, y];
    }

    pub fn tex_coords(&self, index: usize) -> (f32, f32) {
        let [u, v] = self.vertices[index].tex_coords;
        (u, v)
    }

    pub fn set_tex_coords(&mut self, index: usize, u: f32, v: f32) {
        self.vertices[index].tex_coords = [u, v];
    }

    pub fn color(&self, index: usize) -> Color {
        let mut color = self.vertices[index].color;
        if self.premultiplied_alpha {
            color = unpremultiply(color);
        }
        Color::from_rgb(color[0], color[1], color[2])
    }

    pub fn set_color(&mut self, index: usize, color: Color) {
        let alpha = self.vertices[index].color[3];
        let mut bytes = [color.r(), color.g(), color.b(), alpha];
        if self.premultiplied_alpha {
            bytes = premultiply(bytes);
        }
        self.vertices[index].color = bytes;
    }

    pub fn alpha(&self, index: usize) -> f32 {
        self.vertices[index].color[3] as f32 / 255.0
    }

    /// Set the alpha of one vertex, keeping its straight color.
    pub fn set_alpha(&mut self, index: usize, alpha: f32) {
        let mut bytes = self.vertices[index].color;
        if self.premultiplied_alpha {
            bytes = unpremultiply(bytes);
        }
        bytes[3] = to_byte(alpha);
        if self.premultiplied_alpha {
            bytes = premultiply(bytes);
        }
        self.vertices[index].color = bytes;
    }

    pub fn set_uniform_color(&mut self, color: Color) {
        for index in 0..self.vertices.len() {
            self.set_color(index, color);
        }
    }

    pub fn set_uniform_alpha(&mut self, alpha: f32) {
        for index in 0..self.vertices.len() {
            self.set_alpha(index, alpha);
        }
    }

    /// Multiply the alpha of `count` vertices starting at `start`.
    /// Premultiplied colors are scaled along with their alpha.
    pub fn scale_alpha(&mut self, factor: f32, start: usize, count: usize) {
        if factor == 1.0 {
            return;
        }

        let scale = |byte: u8| (byte as f32 * factor).round().clamp(0.0, 255.0) as u8;
        for vertex in &mut self.vertices[start..start + count] {
            let [r, g, b, a] = vertex.color;
            vertex.color = if self.premultiplied_alpha {
                [scale(r), scale(g), scale(b), scale(a)]
            } else {
                [r, g, b, scale(a)]
            };
        }
    }

    /// Transform the positions of `count` vertices starting at `start`.
    pub fn transform_vertices(&mut self, matrix: &Matrix, start: usize, count: usize) {
        for vertex in &mut self.vertices[start..start + count] {
            let [x, y] = vertex.position;
            let (tx, ty) = matrix.transform_point(x, y);
            vertex.position = [tx, ty];
        }
    }

    /// Bounding box of a vertex range, optionally after transformation.
    pub fn bounds(&self, matrix: Option<&Matrix>, start: usize, count: usize) -> Rect {
        if count == 0 {
            return Rect::default();
        }

        let mut min = (f32::MAX, f32::MAX);
        let mut max = (f32::MIN, f32::MIN);
        for vertex in &self.vertices[start..start + count] {
            let [x, y] = vertex.position;
            let (x, y) = match matrix {
                Some(m) => m.transform_point(x, y),
                None => (x, y),
            };
            min = (min.0.min(x), min.1.min(y));
            max = (max.0.max(x), max.1.max(y));
        }
        Rect::new(min.0, min.1, max.0 - min.0, max.1 - min.1)
    }

    /// Copy `count` vertices starting at `start` into `target` at `target_index`,
    /// converting colors when the alpha conventions differ.
    pub fn copy_range_to(
        &self,
        target: &mut VertexData,
        target_index: usize,
        start: usize,
        count: usize,
    ) {
        let destination = &mut target.vertices[target_index..target_index + count];
        destination.copy_from_slice(&self.vertices[start..start + count]);

        if self.premultiplied_alpha != target.premultiplied_alpha {
            let convert = if target.premultiplied_alpha {
                premultiply
            } else {
                unpremultiply
            };
            for vertex in destination {
                vertex.color = convert(vertex.color);
            }
        }
    }

    pub fn copy_to(&self, target: &mut VertexData, target_index: usize) {
        self.copy_range_to(target, target_index, 0, self.vertices.len());
    }

    /// Append all vertices of `other`, growing this store.
    pub fn append(&mut self, other: &VertexData) {
        let start = self.vertices.len();
        self.set_num_vertices(start + other.num_vertices());
        other.copy_to(self, start);
    }

    /// Whether any vertex differs from opaque white.
    pub fn is_tinted(&self) -> bool {
        self.vertices
            .iter()
            .any(|vertex| vertex.color != [255, 255, 255, 255])
    }
}
