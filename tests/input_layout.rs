// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Input layout matching through whole draw binds.

use binds_and_layouts::bindings::Buffer;
use binds_and_layouts::config::{BindConfig, PipelineLimits};
use binds_and_layouts::images::input_layout::CompositeHashKey;
use binds_and_layouts::images::shader::{InputSignature, SignatureElement};
use binds_and_layouts::images::vertex_layout::{VertexElementFormat, VertexFormatRegistry, VertexLayout};
use binds_and_layouts::images::{InputLayoutCache, Pipeline, Shader};
use binds_and_layouts::native::{NativeCall, NativeHandle, RecordingBinder};
use std::sync::Arc;

fn signature(names: &[&str]) -> InputSignature {
    InputSignature::new(names.iter().map(|name| SignatureElement::new(name, 0)).collect())
}

fn vertex_shader(raw: u64, names: &[&str]) -> Arc<Shader> {
    Arc::new(Shader::vertex("vs", NativeHandle::new(raw), signature(names)))
}

fn layouts_created(binder: &RecordingBinder) -> usize {
    binder.count(|c| matches!(c, NativeCall::CreateInputLayout { .. }))
}

#[test]
fn empty_second_slot_keeps_matching() {
    let mut registry = VertexFormatRegistry::new();
    let mut layout = VertexLayout::new();
    layout
        .add_element("POSITION", 0, VertexElementFormat::F32x3)
        .add_element("NORMAL", 0, VertexElementFormat::F32x3);
    let format = registry.register(layout);

    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();
    pipeline
        .input_assembler_mut()
        .set_vertex_buffer(0, Some(Arc::new(Buffer::vertex("mesh", NativeHandle::new(1), format, 240))));
    pipeline.vertex_mut().set_shader(Some(vertex_shader(2, &["POSITION", "NORMAL"])));
    pipeline.bind_draw(&mut binder, &mut layouts);

    let layout = pipeline.input_layout().expect("layout bound");
    assert!(!layout.is_placeholder());
    assert!(layout.key(0).is_occupied());
    assert_eq!(layout.key(1), CompositeHashKey::UNOCCUPIED);
    assert!(layouts.matches(
        pipeline.input_assembler().vertex_buffers(),
        pipeline.vertex().input_signature().expect("vertex shader")
    ));
}

#[test]
fn interleaved_inputs_are_reslotted() {
    let mut registry = VertexFormatRegistry::new();
    let mut geometry = VertexLayout::new();
    geometry
        .add_element("POSITION", 0, VertexElementFormat::F32x3)
        .add_element("NORMAL", 0, VertexElementFormat::F32x3);
    let mut uvs = VertexLayout::new();
    uvs.add_element("TEXCOORD", 0, VertexElementFormat::F32x2);
    let geometry = registry.register(geometry);
    let uvs = registry.register(uvs);

    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();
    let stage = pipeline.input_assembler_mut();
    stage.set_vertex_buffer(0, Some(Arc::new(Buffer::vertex("geometry", NativeHandle::new(1), geometry, 240))));
    stage.set_vertex_buffer(1, Some(Arc::new(Buffer::vertex("uvs", NativeHandle::new(2), uvs, 80))));
    pipeline
        .vertex_mut()
        .set_shader(Some(vertex_shader(3, &["POSITION", "TEXCOORD", "NORMAL"])));
    pipeline.bind_draw(&mut binder, &mut layouts);

    let descriptor = pipeline.input_layout().expect("layout bound").descriptor();
    let slots: Vec<(u32, u32)> = descriptor.elements.iter().map(|e| (e.input_slot, e.offset)).collect();
    assert_eq!(slots, vec![(0, 0), (1, 0), (0, 12)]);
}

#[test]
fn identical_keys_reuse_the_native_layout() {
    let mut registry = VertexFormatRegistry::new();
    let mut layout = VertexLayout::new();
    layout.add_element("POSITION", 0, VertexElementFormat::F32x3);
    let format = registry.register(layout);
    let flat = vertex_shader(10, &["POSITION"]);

    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();

    // two pipelines, each with its own buffer of the same format
    let mut first = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
    first
        .input_assembler_mut()
        .set_vertex_buffer(0, Some(Arc::new(Buffer::vertex("a", NativeHandle::new(1), format.clone(), 48))));
    first.vertex_mut().set_shader(Some(Arc::clone(&flat)));
    first.bind_draw(&mut binder, &mut layouts);

    let mut second = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
    second
        .input_assembler_mut()
        .set_vertex_buffer(0, Some(Arc::new(Buffer::vertex("b", NativeHandle::new(2), format, 48))));
    second.vertex_mut().set_shader(Some(flat));
    second.bind_draw(&mut binder, &mut layouts);

    assert_eq!(layouts_created(&binder), 1);
    assert_eq!(layouts.len(), 1);
    assert_eq!(layouts.stats().created, 1);
    assert_eq!(layouts.stats().reused, 1);
    assert_eq!(second.stats().layouts_reused, 1);
    assert_eq!(
        first.input_layout().map(|l| l.native()),
        second.input_layout().map(|l| l.native())
    );
}

#[test]
fn switching_shaders_switches_layouts() {
    let mut registry = VertexFormatRegistry::new();
    let mut layout = VertexLayout::new();
    layout
        .add_element("POSITION", 0, VertexElementFormat::F32x3)
        .add_element("COLOR", 0, VertexElementFormat::Unorm8x4);
    let format = registry.register(layout);
    let positions_only = vertex_shader(20, &["POSITION"]);
    let colored = vertex_shader(21, &["POSITION", "COLOR"]);

    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();
    pipeline
        .input_assembler_mut()
        .set_vertex_buffer(0, Some(Arc::new(Buffer::vertex("mesh", NativeHandle::new(1), format, 160))));

    for shader in [&positions_only, &colored, &positions_only, &colored] {
        pipeline.vertex_mut().set_shader(Some(Arc::clone(shader)));
        pipeline.bind_draw(&mut binder, &mut layouts);
    }
    assert_eq!(layouts_created(&binder), 2);
    assert_eq!(binder.count(|c| matches!(c, NativeCall::SetInputLayout(_))), 4);
}

#[test]
fn mismatch_falls_back_once_per_combination() {
    let mut registry = VertexFormatRegistry::new();
    let mut layout = VertexLayout::new();
    layout.add_element("POSITION", 0, VertexElementFormat::F32x3);
    let format = registry.register(layout);
    let needs_normals = vertex_shader(30, &["POSITION", "NORMAL"]);

    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();
    for _ in 0..3 {
        let mut pipeline = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
        pipeline.input_assembler_mut().set_vertex_buffer(
            0,
            Some(Arc::new(Buffer::vertex("flat", NativeHandle::new(1), format.clone(), 36))),
        );
        pipeline.vertex_mut().set_shader(Some(Arc::clone(&needs_normals)));
        pipeline.bind_draw(&mut binder, &mut layouts);
        assert!(pipeline.input_layout().expect("fallback bound").is_placeholder());
    }
    assert_eq!(layouts_created(&binder), 1);
    assert_eq!(layouts.stats().mismatches, 1);
}

#[test]
fn zero_input_shader_uses_placeholder() {
    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();
    pipeline.vertex_mut().set_shader(Some(vertex_shader(40, &[])));
    pipeline.bind_draw(&mut binder, &mut layouts);
    let layout = pipeline.input_layout().expect("placeholder bound");
    assert!(layout.is_placeholder());
    assert!(layout.keys().is_empty());
    assert_eq!(layouts.stats().mismatches, 0);
}
