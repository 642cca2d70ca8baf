//! Renders a small scene into an offscreen texture and logs the draw counts.
//!
//! Run with `RUST_LOG=info cargo run --example headless`.

use std::rc::Rc;

use image::{Rgba, RgbaImage};
use kestrel::prelude::*;

const WIDTH: u32 = 640;
const HEIGHT: u32 = 360;

fn checkerboard(size: u32) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        if (x / 8 + y / 8) % 2 == 0 {
            Rgba([230, 230, 230, 255])
        } else {
            Rgba([40, 40, 40, 255])
        }
    })
}

fn build_stage(context: &RenderContext) -> Result<Stage> {
    let sheet = Texture::from_image(context, checkerboard(64), TextureOptions::default())?;
    let mut atlas = TextureAtlas::new(sheet);
    atlas.add_region("tile_a", Rect::new(0.0, 0.0, 32.0, 32.0), None, false);
    atlas.add_region("tile_b", Rect::new(32.0, 0.0, 32.0, 32.0), None, false);
    atlas.add_region("tile_c", Rect::new(0.0, 32.0, 32.0, 32.0), None, true);

    let mut stage = Stage::new(WIDTH as f32, HEIGHT as f32).with_color(Color::from_rgb(20, 24, 32));

    // static background, compiled once
    let mut floor = DisplayNode::container().with_name("floor");
    for (i, tile) in atlas.textures_with_prefix("tile_").into_iter().cycle().take(40).enumerate() {
        let x = (i % 20) as f32 * 32.0;
        let y = HEIGHT as f32 - 64.0 + (i / 20) as f32 * 32.0;
        floor.add_child(DisplayNode::quad(Quad::from_texture(tile)).with_position(x, y));
    }
    floor.flatten()?;
    stage.add_child(floor);

    let mut panel = DisplayNode::container()
        .with_name("panel")
        .with_position(40.0, 40.0)
        .with_clip_rect(Rect::new(0.0, 0.0, 200.0, 120.0));
    for i in 0..12 {
        let color = if i % 2 == 0 { Color::RED } else { Color::BLUE };
        panel.add_child(
            DisplayNode::quad(Quad::new(30.0, 30.0, color))
                .with_position(i as f32 * 20.0, (i % 3) as f32 * 45.0)
                .with_alpha(0.8),
        );
    }
    stage.add_child(panel);

    stage.add_child(
        DisplayNode::quad(Quad::new(120.0, 120.0, Color::GREEN))
            .with_name("glow")
            .with_pivot(60.0, 60.0)
            .with_position(480.0, 140.0)
            .with_rotation(std::f32::consts::FRAC_PI_4)
            .with_blend_mode(BlendMode::ADD),
    );

    Ok(stage)
}

fn main() -> Result<()> {
    env_logger::init();

    let context = Rc::new(RenderContext::headless(RenderConfig::default())?);
    let format = wgpu::TextureFormat::Rgba8Unorm;
    let renderer = Renderer::new(context.clone(), format)?;
    let gpu = renderer.gpu().clone();

    let target = gpu.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Target"),
        size: wgpu::Extent3d {
            width: WIDTH,
            height: HEIGHT,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let mut stage = build_stage(&context)?;
    let mut support = RenderSupport::new(context.clone(), renderer);

    for frame in 0..3 {
        let stats = stage.render(&mut support, WIDTH, HEIGHT)?;

        let mut encoder = gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Headless Frame Encoder"),
            });
        support.target_mut().submit(&mut encoder, &view, WIDTH, HEIGHT);
        gpu.queue.submit(std::iter::once(encoder.finish()));

        log::info!(
            "Frame {}: {} draw calls, {} pooled batches",
            frame,
            stats.draw_calls,
            support.pooled_batches()
        );
    }

    Ok(())
}
