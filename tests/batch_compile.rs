use std::rc::Rc;

use kestrel::color::Color;
use kestrel::rect::Rect;
use kestrel::renderer::constants::MAX_NUM_QUADS;
use kestrel::renderer::{
    BlendMode, DisplayNode, Quad, QuadBatch, RenderContext, Texture, TextureOptions,
};
use kestrel::transform::Matrix;

fn red_quad() -> DisplayNode {
    DisplayNode::quad(Quad::new(10.0, 10.0, Color::RED))
}

fn atlas(context: &RenderContext) -> Rc<Texture> {
    Texture::empty(context, 64, 64, TextureOptions::default()).unwrap()
}

fn compile(node: &DisplayNode) -> Vec<QuadBatch> {
    let mut batches = Vec::new();
    QuadBatch::compile(node, &mut batches).unwrap();
    batches
}

#[test]
fn uniform_tree_compiles_to_one_batch() {
    let mut root = DisplayNode::container();
    for i in 0..10 {
        root.add_child(red_quad().with_position(i as f32 * 10.0, 0.0));
    }
    let nested = DisplayNode::container()
        .with_position(0.0, 50.0)
        .with_child(red_quad())
        .with_child(red_quad().with_position(10.0, 0.0));
    root.add_child(nested);

    let batches = compile(&root);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].num_quads(), 12);
}

#[test]
fn regions_of_one_texture_share_a_batch() {
    let context = RenderContext::new(Default::default());
    let atlas = atlas(&context);
    let left = Texture::sub(&atlas, Some(Rect::new(0.0, 0.0, 32.0, 64.0)), None, false, 1.0);
    let right = Texture::sub(&atlas, Some(Rect::new(32.0, 0.0, 32.0, 64.0)), None, false, 1.0);

    let root = DisplayNode::container()
        .with_child(DisplayNode::quad(Quad::from_texture(left)))
        .with_child(DisplayNode::quad(Quad::from_texture(right)).with_position(40.0, 0.0));

    let batches = compile(&root);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].num_quads(), 2);
    assert_eq!(
        batches[0].texture().map(|t| t.root_id()),
        Some(atlas.root_id())
    );

    // second quad samples the right half of the atlas
    let (u, v) = batches[0].vertex_data().tex_coords(4);
    assert_eq!((u, v), (0.5, 0.0));
}

#[test]
fn interleaved_states_keep_draw_order() {
    let context = RenderContext::new(Default::default());
    let texture = atlas(&context);

    let root = DisplayNode::container()
        .with_child(red_quad().with_blend_mode(BlendMode::NORMAL))
        .with_child(
            DisplayNode::quad(Quad::from_texture(texture.clone()))
                .with_blend_mode(BlendMode::NORMAL),
        )
        .with_child(red_quad().with_blend_mode(BlendMode::NORMAL));

    let batches = compile(&root);
    assert_eq!(batches.len(), 3);
    assert!(batches[0].texture().is_none());
    assert_eq!(
        batches[1].texture().map(|t| t.root_id()),
        Some(texture.root_id())
    );
    assert!(batches[2].texture().is_none());
    for batch in &batches {
        assert_eq!(batch.num_quads(), 1);
        assert_eq!(batch.blend_mode(), BlendMode::NORMAL);
    }
}

#[test]
fn batches_split_at_quad_limit() {
    let mut root = DisplayNode::container();
    for _ in 0..MAX_NUM_QUADS + 1 {
        root.add_child(red_quad());
    }

    let batches = compile(&root);
    assert_eq!(batches.len(), 2);
    assert_eq!(batches[0].num_quads(), MAX_NUM_QUADS);
    assert_eq!(batches[1].num_quads(), 1);
}

#[test]
fn invisible_children_are_skipped() {
    let mut hidden = red_quad();
    hidden.visible = false;

    let root = DisplayNode::container()
        .with_child(red_quad())
        .with_child(hidden)
        .with_child(red_quad().with_alpha(0.0))
        .with_child(red_quad().with_scale(0.0, 2.0))
        .with_child(red_quad());

    let batches = compile(&root);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].num_quads(), 2);
}

#[test]
fn root_transform_and_alpha_are_ignored() {
    let root = DisplayNode::container()
        .with_position(500.0, 500.0)
        .with_alpha(0.5)
        .with_child(
            DisplayNode::quad(Quad::new(10.0, 10.0, Color::WHITE)).with_position(5.0, 0.0),
        );

    let batches = compile(&root);
    assert_eq!(batches.len(), 1);
    assert!(!batches[0].tinted());
    assert_eq!(batches[0].vertex_data().position(0), (5.0, 0.0));
    assert_eq!(batches[0].vertex_data().alpha(0), 1.0);
}

#[test]
fn nested_alpha_and_transform_are_baked() {
    let inner = DisplayNode::container()
        .with_position(10.0, 0.0)
        .with_scale(2.0, 2.0)
        .with_alpha(0.5)
        .with_child(
            DisplayNode::quad(Quad::new(10.0, 10.0, Color::WHITE)).with_position(1.0, 1.0),
        );
    let root = DisplayNode::container().with_child(inner);

    let batches = compile(&root);
    let data = batches[0].vertex_data();
    assert_eq!(data.position(0), (12.0, 2.0));
    assert_eq!(data.position(3), (32.0, 22.0));
    assert!(batches[0].tinted());
    assert_eq!(data.vertices()[0].color, [128, 128, 128, 128]);
}

#[test]
fn blend_modes_resolve_against_ancestors() {
    let root = DisplayNode::container()
        .with_child(red_quad())
        .with_child(
            DisplayNode::container()
                .with_blend_mode(BlendMode::ADD)
                .with_child(red_quad())
                .with_child(red_quad().with_blend_mode(BlendMode::SCREEN)),
        );

    let batches = compile(&root);
    let modes: Vec<_> = batches.iter().map(|batch| batch.blend_mode()).collect();
    assert_eq!(modes, vec![BlendMode::AUTO, BlendMode::ADD, BlendMode::SCREEN]);

    let normal_root = DisplayNode::container()
        .with_blend_mode(BlendMode::NORMAL)
        .with_child(red_quad());
    assert_eq!(compile(&normal_root)[0].blend_mode(), BlendMode::NORMAL);
}

#[test]
fn compile_reuses_and_truncates_batches() {
    let mut batches: Vec<QuadBatch> = (0..5).map(|_| QuadBatch::new()).collect();
    let root = DisplayNode::container().with_child(red_quad());

    QuadBatch::compile(&root, &mut batches).unwrap();
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].num_quads(), 1);

    // compiling again starts from a reset first batch
    QuadBatch::compile(&root, &mut batches).unwrap();
    assert_eq!(batches[0].num_quads(), 1);
}

#[test]
fn leaf_root_is_compiled_without_its_transform() {
    let root = red_quad().with_position(100.0, 100.0);
    let batches = compile(&root);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].vertex_data().position(0), (0.0, 0.0));
}

#[test]
fn precompiled_batches_merge_into_compatible_batches() {
    let mut prebuilt = QuadBatch::new();
    for i in 0..3 {
        let quad = Quad::new(4.0, 4.0, Color::RED);
        let matrix = Matrix::translation(i as f32 * 4.0, 0.0);
        prebuilt.add_quad(&quad, 1.0, BlendMode::AUTO, Some(&matrix)).unwrap();
    }

    let root = DisplayNode::container()
        .with_child(red_quad())
        .with_child(DisplayNode::batch(prebuilt).with_position(0.0, 20.0));

    let batches = compile(&root);
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].num_quads(), 4);
    assert_eq!(batches[0].vertex_data().position(12), (8.0, 20.0));
}

fn prebuilt(num_quads: usize) -> QuadBatch {
    let mut batch = QuadBatch::new();
    let quad = Quad::new(1.0, 1.0, Color::RED);
    for _ in 0..num_quads {
        batch.add_quad(&quad, 1.0, BlendMode::AUTO, None).unwrap();
    }
    batch
}

#[test]
fn compiled_batches_never_exceed_quad_limit() {
    let half = MAX_NUM_QUADS / 2 + 1;
    let root = DisplayNode::container()
        .with_child(red_quad())
        .with_child(DisplayNode::batch(prebuilt(MAX_NUM_QUADS)))
        .with_child(DisplayNode::batch(prebuilt(half)))
        .with_child(DisplayNode::batch(prebuilt(half)));

    let sizes: Vec<_> = compile(&root).iter().map(QuadBatch::num_quads).collect();
    assert_eq!(sizes, vec![1, MAX_NUM_QUADS, half, half]);
}

#[test]
fn prebuilt_batches_stop_growing_at_quad_limit() {
    let mut batch = prebuilt(MAX_NUM_QUADS);
    let quad = Quad::new(1.0, 1.0, Color::RED);
    assert!(batch.add_quad(&quad, 1.0, BlendMode::AUTO, None).is_err());
    assert_eq!(batch.capacity(), MAX_NUM_QUADS);

    // every slot still addresses its own four vertices
    let last = batch.indices().len() - 6;
    assert_eq!(batch.indices()[last], ((MAX_NUM_QUADS - 1) * 4) as u16);
}
