//! Textures and texture views.
//!
//! A [`ConcreteTexture`] owns pixels and GPU storage. A [`SubTexture`] is a
//! view onto a region of another texture; its UV space `[0, 1]²` is mapped into
//! the parent's UV space by an affine matrix. Chaining those matrices up to the
//! backing texture gives the view's root transform, so vertices can sample the
//! backing texture directly.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use wgpu::{Extent3d, TextureDimension, TextureFormat, TextureUsages};

use super::context::{GpuResource, RenderContext};
use super::gpu_context::GpuContext;
use super::vertex_data::VertexData;
use crate::color::Color;
use crate::error::{RenderError, Result};
use crate::rect::Rect;
use crate::transform::Matrix;

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a backing texture. Views share the id of their root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(u64);

impl TextureId {
    fn next() -> Self {
        Self(NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Clone, Debug)]
pub struct TextureOptions {
    /// Pixels per point
    pub scale: f32,
    /// Whether the pixel payload is stored with premultiplied alpha
    pub premultiplied_alpha: bool,
    /// Allow the texture to be used as a color attachment
    pub render_target: bool,
    /// Fill used for textures without a pixel payload
    pub clear_color: Color,
    pub clear_alpha: f32,
}

impl Default for TextureOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            premultiplied_alpha: true,
            render_target: false,
            clear_color: Color::BLACK,
            clear_alpha: 0.0,
        }
    }
}

/// GPU storage of a concrete texture.
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

/// What a concrete texture does when its device comes back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestoreAction {
    /// Re-upload the last pixel payload
    Upload,
    /// No payload is kept; fill with the clear color
    Clear,
}

pub struct ConcreteTexture {
    id: TextureId,
    width: u32,
    height: u32,
    options: TextureOptions,
    pixels: RefCell<Option<RgbaImage>>,
    gpu: RefCell<Option<Arc<GpuTexture>>>,
}

impl ConcreteTexture {
    fn new(
        width: u32,
        height: u32,
        pixels: Option<RgbaImage>,
        options: TextureOptions,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::TextureSize { width, height });
        }
        Ok(Self {
            id: TextureId::next(),
            width,
            height,
            options,
            pixels: RefCell::new(pixels),
            gpu: RefCell::new(None),
        })
    }

    pub fn id(&self) -> TextureId {
        self.id
    }

    /// Width in pixels
    pub fn native_width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn native_height(&self) -> u32 {
        self.height
    }

    pub fn scale(&self) -> f32 {
        self.options.scale
    }

    pub fn premultiplied_alpha(&self) -> bool {
        self.options.premultiplied_alpha
    }

    pub fn is_render_target(&self) -> bool {
        self.options.render_target
    }

    pub fn restore_action(&self) -> RestoreAction {
        if self.pixels.borrow().is_some() {
            RestoreAction::Upload
        } else {
            RestoreAction::Clear
        }
    }

    /// Current GPU storage, if any.
    pub fn gpu_texture(&self) -> Option<Arc<GpuTexture>> {
        self.gpu.borrow().clone()
    }

    pub fn has_gpu_storage(&self) -> bool {
        self.gpu.borrow().is_some()
    }

    /// Replace the pixel payload. Uploads right away when GPU storage exists.
    pub fn replace_pixels(&self, pixels: RgbaImage, gpu: Option<&GpuContext>) -> Result<()> {
        let (width, height) = pixels.dimensions();
        if width != self.width || height != self.height {
            return Err(RenderError::TextureSize { width, height });
        }
        *self.pixels.borrow_mut() = Some(pixels);
        match gpu {
            Some(gpu) if self.has_gpu_storage() => self.upload(gpu),
            _ => Ok(()),
        }
    }

    /// (Re)create GPU storage and fill it from the payload or the clear color.
    pub fn upload(&self, gpu: &GpuContext) -> Result<()> {
        let size = Extent3d {
            width: self.width,
            height: self.height,
            depth_or_array_layers: 1,
        };

        let mut usage = TextureUsages::TEXTURE_BINDING | TextureUsages::COPY_DST;
        if self.options.render_target {
            usage |= TextureUsages::RENDER_ATTACHMENT;
        }

        let texture = gpu.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Kestrel Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: TextureDimension::D2,
            format: TextureFormat::Rgba8Unorm,
            usage,
            view_formats: &[],
        });

        let cleared;
        let pixels = self.pixels.borrow();
        let bytes: &[u8] = match pixels.as_ref() {
            Some(image) => image.as_raw(),
            None => {
                cleared = self.clear_pixels();
                cleared.as_slice()
            }
        };

        gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            bytes,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * self.width),
                rows_per_image: Some(self.height),
            },
            size,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        *self.gpu.borrow_mut() = Some(Arc::new(GpuTexture { texture, view }));
        Ok(())
    }

    fn clear_pixels(&self) -> Vec<u8> {
        let alpha = self.options.clear_alpha.clamp(0.0, 1.0);
        let [r, g, b] = self.options.clear_color.to_f32();
        let channel = |value: f32| {
            let value = if self.options.premultiplied_alpha {
                value * alpha
            } else {
                value
            };
            (value * 255.0).round() as u8
        };
        let texel = [channel(r), channel(g), channel(b), (alpha * 255.0).round() as u8];
        texel.repeat((self.width * self.height) as usize)
    }
}

impl GpuResource for ConcreteTexture {
    fn on_device_lost(&self) {
        // Views and attachments bound to the old device are unusable now.
        self.gpu.borrow_mut().take();
    }

    fn on_device_restored(&self, gpu: &GpuContext) {
        log::debug!(
            "Restoring texture {:?} ({:?})",
            self.id,
            self.restore_action()
        );
        if let Err(err) = self.upload(gpu) {
            log::error!("Failed to restore texture {:?}: {}", self.id, err);
        }
    }
}

/// A view onto a region of a parent texture.
pub struct SubTexture {
    parent: Rc<Texture>,
    region: Rect,
    frame: Option<Rect>,
    rotated: bool,
    width: f32,
    height: f32,
    scale: f32,
    transformation: Matrix,
    transformation_to_root: Matrix,
}

impl SubTexture {
    /// Create a view. `region` is given in the parent's points and defaults to
    /// the parent's full extent. A rotated region is stored rotated by 90°
    /// clockwise in the parent.
    pub fn new(
        parent: Rc<Texture>,
        region: Option<Rect>,
        frame: Option<Rect>,
        rotated: bool,
        scale_modifier: f32,
    ) -> Self {
        let mut sub = Self {
            parent,
            region: Rect::default(),
            frame: None,
            rotated: false,
            width: 0.0,
            height: 0.0,
            scale: 1.0,
            transformation: Matrix::IDENTITY,
            transformation_to_root: Matrix::IDENTITY,
        };
        sub.setup(region, frame, rotated, scale_modifier);
        sub
    }

    /// Point this view at a different parent and region.
    pub fn repoint(
        &mut self,
        parent: Rc<Texture>,
        region: Option<Rect>,
        frame: Option<Rect>,
        rotated: bool,
        scale_modifier: f32,
    ) {
        self.parent = parent;
        self.setup(region, frame, rotated, scale_modifier);
    }

    fn setup(
        &mut self,
        region: Option<Rect>,
        frame: Option<Rect>,
        rotated: bool,
        scale_modifier: f32,
    ) {
        let parent_width = self.parent.width();
        let parent_height = self.parent.height();
        let region = region.unwrap_or(Rect::new(0.0, 0.0, parent_width, parent_height));

        self.region = region;
        self.frame = frame;
        self.rotated = rotated;
        let (width, height) = if rotated {
            (region.height, region.width)
        } else {
            (region.width, region.height)
        };
        self.width = width / scale_modifier;
        self.height = height / scale_modifier;
        self.scale = self.parent.scale() * scale_modifier;

        let mut matrix = Matrix::IDENTITY;
        if rotated {
            matrix.translate(0.0, -1.0);
            matrix.rotate(std::f32::consts::FRAC_PI_2);
        }
        matrix.scale(region.width / parent_width, region.height / parent_height);
        matrix.translate(region.x / parent_width, region.y / parent_height);
        self.transformation = matrix;
        self.transformation_to_root = match self.parent.as_ref() {
            Texture::Sub(parent) => matrix.appended(&parent.transformation_to_root),
            Texture::Concrete(_) => matrix,
        };

        if let Some(frame) = frame {
            if frame_lies_inside(&frame, self.width, self.height) {
                log::warn!(
                    "Texture frame {:?} lies inside the {}x{} texture area; \
                     trimmed frames should enclose it",
                    frame,
                    self.width,
                    self.height
                );
            }
        }
    }

    pub fn parent(&self) -> &Rc<Texture> {
        &self.parent
    }

    pub fn region(&self) -> Rect {
        self.region
    }

    pub fn rotated(&self) -> bool {
        self.rotated
    }

    /// Matrix from this view's UV space into its parent's.
    pub fn transformation(&self) -> &Matrix {
        &self.transformation
    }

    pub fn transformation_to_root(&self) -> &Matrix {
        &self.transformation_to_root
    }
}

/// Whether a frame's far edge falls short of the view size. Such frames only
/// produce a warning.
pub fn frame_lies_inside(frame: &Rect, width: f32, height: f32) -> bool {
    frame.right() < width || frame.bottom() < height
}

pub enum Texture {
    Concrete(ConcreteTexture),
    Sub(SubTexture),
}

impl Texture {
    /// Create a texture from a decoded RGBA image.
    pub fn from_image(
        context: &RenderContext,
        image: RgbaImage,
        options: TextureOptions,
    ) -> Result<Rc<Texture>> {
        let (width, height) = image.dimensions();
        let concrete = ConcreteTexture::new(width, height, Some(image), options)?;
        Self::register(context, concrete)
    }

    /// Create a texture without a payload, filled with the clear color.
    pub fn empty(
        context: &RenderContext,
        width: u32,
        height: u32,
        options: TextureOptions,
    ) -> Result<Rc<Texture>> {
        let concrete = ConcreteTexture::new(width, height, None, options)?;
        Self::register(context, concrete)
    }

    fn register(context: &RenderContext, concrete: ConcreteTexture) -> Result<Rc<Texture>> {
        if let Some(gpu) = context.gpu() {
            concrete.upload(&gpu)?;
        }
        let texture = Rc::new(Texture::Concrete(concrete));
        let weak: Weak<Texture> = Rc::downgrade(&texture);
        context.register_resource(weak);
        Ok(texture)
    }

    /// Create a view onto a region of `parent`.
    pub fn sub(
        parent: &Rc<Texture>,
        region: Option<Rect>,
        frame: Option<Rect>,
        rotated: bool,
        scale_modifier: f32,
    ) -> Rc<Texture> {
        Rc::new(Texture::Sub(SubTexture::new(
            parent.clone(),
            region,
            frame,
            rotated,
            scale_modifier,
        )))
    }

    /// The backing texture of the view chain.
    pub fn root(&self) -> &ConcreteTexture {
        match self {
            Texture::Concrete(concrete) => concrete,
            Texture::Sub(sub) => sub.parent.root(),
        }
    }

    pub fn root_id(&self) -> TextureId {
        self.root().id()
    }

    /// Width in points
    pub fn width(&self) -> f32 {
        match self {
            Texture::Concrete(concrete) => concrete.width as f32 / concrete.scale(),
            Texture::Sub(sub) => sub.width,
        }
    }

    /// Height in points
    pub fn height(&self) -> f32 {
        match self {
            Texture::Concrete(concrete) => concrete.height as f32 / concrete.scale(),
            Texture::Sub(sub) => sub.height,
        }
    }

    pub fn native_width(&self) -> f32 {
        self.width() * self.scale()
    }

    pub fn native_height(&self) -> f32 {
        self.height() * self.scale()
    }

    pub fn scale(&self) -> f32 {
        match self {
            Texture::Concrete(concrete) => concrete.scale(),
            Texture::Sub(sub) => sub.scale,
        }
    }

    pub fn frame(&self) -> Option<Rect> {
        match self {
            Texture::Concrete(_) => None,
            Texture::Sub(sub) => sub.frame,
        }
    }

    pub fn premultiplied_alpha(&self) -> bool {
        self.root().premultiplied_alpha()
    }

    pub fn root_transform(&self) -> Matrix {
        match self {
            Texture::Concrete(_) => Matrix::IDENTITY,
            Texture::Sub(sub) => sub.transformation_to_root,
        }
    }

    /// Map a UV coordinate of this view onto the backing texture.
    pub fn local_to_global(&self, u: f32, v: f32) -> (f32, f32) {
        self.root_transform().transform_point(u, v)
    }

    /// Map a UV coordinate of the backing texture into this view.
    pub fn global_to_local(&self, u: f32, v: f32) -> (f32, f32) {
        self.root_transform().inverted().transform_point(u, v)
    }

    pub fn adjust_tex_coords(&self, vertex_data: &mut VertexData, start: usize, count: usize) {
        let matrix = self.root_transform();
        if matrix.is_identity() {
            return;
        }
        for index in start..start + count {
            let (u, v) = vertex_data.tex_coords(index);
            let (u, v) = matrix.transform_point(u, v);
            vertex_data.set_tex_coords(index, u, v);
        }
    }

    /// Shift the four quad vertices at `start` so that the trimmed texture
    /// content lands where its frame says.
    pub fn adjust_positions_for_frame(&self, vertex_data: &mut VertexData, start: usize) {
        let Some(frame) = self.frame() else {
            return;
        };

        let delta_right = frame.width + frame.x - self.width();
        let delta_bottom = frame.height + frame.y - self.height();
        let offsets = [
            (frame.x, frame.y),
            (delta_right, frame.y),
            (frame.x, delta_bottom),
            (delta_right, delta_bottom),
        ];
        for (i, (dx, dy)) in offsets.into_iter().enumerate() {
            let (x, y) = vertex_data.position(start + i);
            vertex_data.set_position(start + i, x - dx, y - dy);
        }
    }

    /// Prepare copied quad vertices for sampling this texture.
    pub fn adjust_vertex_data(&self, vertex_data: &mut VertexData, start: usize) {
        self.adjust_positions_for_frame(vertex_data, start);
        self.adjust_tex_coords(vertex_data, start, 4);
    }
}

impl GpuResource for Texture {
    fn on_device_lost(&self) {
        if let Texture::Concrete(concrete) = self {
            concrete.on_device_lost();
        }
    }

    fn on_device_restored(&self, gpu: &GpuContext) {
        if let Texture::Concrete(concrete) = self {
            concrete.on_device_restored(gpu);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    fn texture(width: u32, height: u32) -> Rc<Texture> {
        let context = RenderContext::new(Default::default());
        Texture::empty(&context, width, height, TextureOptions::default()).unwrap()
    }

    #[test]
    fn test_region_maps_into_parent() {
        let parent = texture(100, 200);
        let sub = Texture::sub(&parent, Some(Rect::new(10.0, 20.0, 30.0, 40.0)), None, false, 1.0);

        let (u, v) = sub.local_to_global(0.0, 0.0);
        assert!(approx_eq(u, 0.10));
        assert!(approx_eq(v, 0.10));
        let (u, v) = sub.local_to_global(1.0, 1.0);
        assert!(approx_eq(u, 0.40));
        assert!(approx_eq(v, 0.30));

        let (u, v) = sub.global_to_local(0.40, 0.30);
        assert!(approx_eq(u, 1.0));
        assert!(approx_eq(v, 1.0));
    }

    #[test]
    fn test_size_and_scale() {
        let parent = texture(100, 200);
        let sub = Texture::sub(&parent, Some(Rect::new(0.0, 0.0, 30.0, 40.0)), None, false, 2.0);
        assert!(approx_eq(sub.width(), 15.0));
        assert!(approx_eq(sub.height(), 20.0));
        assert!(approx_eq(sub.scale(), 2.0));
        assert!(approx_eq(sub.native_width(), 30.0));
    }

    #[test]
    fn test_default_region_is_identity() {
        let parent = texture(64, 32);
        let sub = Texture::sub(&parent, None, None, false, 1.0);
        assert!(sub.root_transform().is_identity());
        assert!(approx_eq(sub.width(), 64.0));
    }

    #[test]
    fn test_rotated_region() {
        let parent = texture(100, 100);
        // region stored sideways: 20 wide, 40 high in the parent
        let sub = Texture::sub(&parent, Some(Rect::new(10.0, 10.0, 20.0, 40.0)), None, true, 1.0);
        assert!(approx_eq(sub.width(), 40.0));
        assert!(approx_eq(sub.height(), 20.0));

        // Top-left of the view sits at the region's top-right corner.
        let (u, v) = sub.local_to_global(0.0, 0.0);
        assert!(approx_eq(u, 0.30));
        assert!(approx_eq(v, 0.10));
        let (u, v) = sub.local_to_global(1.0, 1.0);
        assert!(approx_eq(u, 0.10));
        assert!(approx_eq(v, 0.50));
    }

    #[test]
    fn test_nested_chain_composes_to_root() {
        let root = texture(100, 100);
        let outer = Texture::sub(&root, Some(Rect::new(50.0, 0.0, 50.0, 50.0)), None, false, 1.0);
        let inner = Texture::sub(&outer, Some(Rect::new(0.0, 25.0, 25.0, 25.0)), None, false, 1.0);

        assert_eq!(inner.root_id(), root.root_id());
        let (u, v) = inner.local_to_global(0.0, 0.0);
        assert!(approx_eq(u, 0.50));
        assert!(approx_eq(v, 0.25));
        let (u, v) = inner.local_to_global(1.0, 1.0);
        assert!(approx_eq(u, 0.75));
        assert!(approx_eq(v, 0.50));
    }

    #[test]
    fn test_frame_check_compares_far_edges() {
        // A trimmed frame with a negative offset encloses the view.
        assert!(!frame_lies_inside(&Rect::new(-2.0, -3.0, 40.0, 50.0), 36.0, 45.0));
        // Far edges short of the view size trigger the warning...
        assert!(frame_lies_inside(&Rect::new(0.0, 0.0, 30.0, 50.0), 36.0, 45.0));
        assert!(frame_lies_inside(&Rect::new(0.0, 0.0, 40.0, 40.0), 36.0, 45.0));
        // ...while a frame offset to the right passes even though it does not
        // cover the view's left edge.
        assert!(!frame_lies_inside(&Rect::new(10.0, 0.0, 36.0, 45.0), 36.0, 45.0));
    }

    #[test]
    fn test_frame_adjusts_positions() {
        let parent = texture(64, 64);
        let frame = Rect::new(-2.0, -3.0, 40.0, 50.0);
        let region = Rect::new(0.0, 0.0, 36.0, 45.0);
        let sub = Texture::sub(&parent, Some(region), Some(frame), false, 1.0);

        let mut data = VertexData::new(4, true);
        data.set_position(1, 40.0, 0.0);
        data.set_position(2, 0.0, 50.0);
        data.set_position(3, 40.0, 50.0);
        sub.adjust_positions_for_frame(&mut data, 0);

        assert_eq!(data.position(0), (2.0, 3.0));
        assert_eq!(data.position(1), (38.0, 3.0));
        assert_eq!(data.position(2), (2.0, 48.0));
        assert_eq!(data.position(3), (38.0, 48.0));
    }

    #[test]
    fn test_repoint_recomputes_chain() {
        let parent = texture(100, 100);
        let region = Rect::new(0.0, 0.0, 50.0, 50.0);
        let mut sub = SubTexture::new(parent.clone(), Some(region), None, false, 1.0);
        sub.repoint(parent, Some(Rect::new(50.0, 50.0, 50.0, 50.0)), None, false, 1.0);
        let (u, v) = sub.transformation_to_root().transform_point(0.0, 0.0);
        assert!(approx_eq(u, 0.5));
        assert!(approx_eq(v, 0.5));
    }

    #[test]
    fn test_restore_action() {
        let context = RenderContext::new(Default::default());
        let blank = Texture::empty(&context, 4, 4, TextureOptions::default()).unwrap();
        assert_eq!(blank.root().restore_action(), RestoreAction::Clear);

        let image = RgbaImage::new(4, 4);
        let loaded = Texture::from_image(&context, image, TextureOptions::default()).unwrap();
        assert_eq!(loaded.root().restore_action(), RestoreAction::Upload);
        assert_ne!(blank.root_id(), loaded.root_id());
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let context = RenderContext::new(Default::default());
        let result = Texture::empty(&context, 0, 4, TextureOptions::default());
        assert!(matches!(result, Err(RenderError::TextureSize { width: 0, height: 4 })));
    }
}
