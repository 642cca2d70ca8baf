//! GPU-facing data layouts and conversions.

use wgpu::{VertexAttribute, VertexBufferLayout, VertexFormat, VertexStepMode};

use super::blend::{BlendFactor, BlendFactors};
use super::vertex_data::Vertex;
use crate::color::Color;
use crate::transform::Matrix;

impl Vertex {
    pub fn desc() -> VertexBufferLayout<'static> {
        VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: VertexStepMode::Vertex,
            attributes: &[
                // position
                VertexAttribute {
                    offset: 0,
                    shader_location: 0,
                    format: VertexFormat::Float32x2,
                },
                // tex_coords
                VertexAttribute {
                    offset: 8,
                    shader_location: 1,
                    format: VertexFormat::Float32x2,
                },
                // color (RGBA bytes)
                VertexAttribute {
                    offset: 16,
                    shader_location: 2,
                    format: VertexFormat::Unorm8x4,
                },
            ],
        }
    }
}

/// Per-draw uniforms.
#[repr(C)]
#[derive(Copy, Clone, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    pub mvp: [[f32; 4]; 4],
    /// Multiplied with every vertex color
    pub tint: [f32; 4],
}

impl DrawUniforms {
    pub fn new(mvp: &Matrix, alpha: f32, premultiplied_alpha: bool) -> Self {
        // Premultiplied colors fade by scaling every channel.
        let tint = if premultiplied_alpha {
            [alpha; 4]
        } else {
            [1.0, 1.0, 1.0, alpha]
        };
        Self {
            mvp: mvp.to_mat4(),
            tint,
        }
    }
}

impl From<BlendFactor> for wgpu::BlendFactor {
    fn from(factor: BlendFactor) -> Self {
        match factor {
            BlendFactor::Zero => wgpu::BlendFactor::Zero,
            BlendFactor::One => wgpu::BlendFactor::One,
            BlendFactor::SrcColor => wgpu::BlendFactor::Src,
            BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
            BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
            BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
            BlendFactor::DstColor => wgpu::BlendFactor::Dst,
            BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
            BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
            BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
        }
    }
}

/// The same factor pair for color and alpha.
pub fn blend_state(factors: BlendFactors) -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: factors.src.into(),
        dst_factor: factors.dst.into(),
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

pub fn clear_color(color: Color, alpha: f32) -> wgpu::Color {
    let [r, g, b] = color.to_f32();
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: alpha as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_layout_matches_struct() {
        let layout = Vertex::desc();
        assert_eq!(layout.array_stride, 20);
        let offsets: Vec<u64> = layout.attributes.iter().map(|a| a.offset).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
    }

    #[test]
    fn test_tint_follows_alpha_convention() {
        let mvp = Matrix::IDENTITY;
        assert_eq!(DrawUniforms::new(&mvp, 0.5, true).tint, [0.5; 4]);
        assert_eq!(DrawUniforms::new(&mvp, 0.5, false).tint, [1.0, 1.0, 1.0, 0.5]);
    }

    #[test]
    fn test_blend_state_conversion() {
        let state = blend_state(BlendFactors::new(BlendFactor::One, BlendFactor::OneMinusSrcAlpha));
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(state.alpha.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    }
}
