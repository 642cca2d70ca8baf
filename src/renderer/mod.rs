pub mod atlas;
pub mod batch;
pub mod blend;
pub mod constants;
pub mod context;
pub mod gpu;
mod gpu_context;
pub mod pipeline;
pub mod quad;
mod render;
pub mod state;
pub mod support;
pub mod target;
pub mod texture;
pub mod tree;
pub mod vertex_data;

pub use atlas::{AtlasRegion, TextureAtlas};
pub use batch::{BatchBuffers, QuadBatch};
pub use blend::{BlendFactor, BlendFactors, BlendMode, BlendModeRegistry};
pub use context::{GpuResource, RenderContext};
pub use gpu_context::GpuContext;
pub use quad::Quad;
pub use render::Renderer;
pub use state::RenderState;
pub use support::RenderSupport;
pub use target::{DrawState, DrawTarget, RecordedDraw, Recorded, RecordingTarget, ScissorRect};
pub use texture::{
    ConcreteTexture, GpuTexture, RestoreAction, SubTexture, Texture, TextureId, TextureOptions,
};
pub use tree::{DisplayNode, NodeKind};
pub use vertex_data::{Vertex, VertexData};
