// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! End-to-end bind passes through a recording binder.
//!
//! These exercise a whole [`Pipeline`] the way a renderer would: set requests, bind, draw,
//! mutate resources from the side, and bind again.

use binds_and_layouts::bindings::visible_to::{SlotKind, StageKind, TextureUsage};
use binds_and_layouts::bindings::{Bindable, Buffer, RangePolicy, SamplerCache, Texture};
use binds_and_layouts::bindings::sampler::{AddressMode, SamplerDescription};
use binds_and_layouts::config::{BindConfig, PipelineLimits};
use binds_and_layouts::images::shader::{InputSignature, SignatureElement};
use binds_and_layouts::images::vertex_layout::{IndexFormat, VertexElementFormat, VertexFormatRegistry, VertexLayout};
use binds_and_layouts::images::{InputLayoutCache, Pipeline, Shader};
use binds_and_layouts::native::{IndexBufferBinding, NativeCall, NativeHandle, RecordingBinder, VertexBufferBinding};
use std::sync::Arc;

fn position_format(registry: &mut VertexFormatRegistry) -> Arc<binds_and_layouts::images::vertex_layout::VertexFormat> {
    let mut layout = VertexLayout::new();
    layout.add_element("POSITION", 0, VertexElementFormat::F32x3);
    registry.register(layout)
}

fn vertex_shader(raw: u64) -> Arc<Shader> {
    Arc::new(Shader::vertex(
        "vs",
        NativeHandle::new(raw),
        InputSignature::new(vec![SignatureElement::new("POSITION", 0)]),
    ))
}

#[test]
fn four_slot_group_binds_one_range() {
    let mut registry = VertexFormatRegistry::new();
    let format = position_format(&mut registry);
    let limits = PipelineLimits {
        vertex_buffers: 4,
        ..PipelineLimits::default()
    };
    let mut pipeline = Pipeline::new(&limits, &BindConfig::default());
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();

    let a = Arc::new(Buffer::vertex("a", NativeHandle::new(10), format.clone(), 120));
    let b = Arc::new(Buffer::vertex("b", NativeHandle::new(11), format, 120));
    pipeline.input_assembler_mut().set_vertex_buffer(1, Some(a));
    pipeline.input_assembler_mut().set_vertex_buffer(2, Some(b));
    pipeline.bind_draw(&mut binder, &mut layouts);

    let vertex_buffers = pipeline.input_assembler().vertex_buffers();
    assert_eq!(vertex_buffers.first_changed(), 1);
    assert_eq!(vertex_buffers.last_changed(), 2);
    let ranged: Vec<&NativeCall> = binder
        .calls()
        .iter()
        .filter(|c| matches!(c, NativeCall::SetVertexBuffers { .. }))
        .collect();
    assert_eq!(
        ranged,
        vec![&NativeCall::SetVertexBuffers {
            first: 1,
            bindings: vec![
                VertexBufferBinding {
                    buffer: Some(NativeHandle::new(10)),
                    stride: 12,
                    offset: 0,
                },
                VertexBufferBinding {
                    buffer: Some(NativeHandle::new(11)),
                    stride: 12,
                    offset: 0,
                },
            ],
        }]
    );
}

#[test]
fn content_version_change_rebinds() {
    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();
    let constants = Arc::new(Buffer::constant("per-frame", NativeHandle::new(3), 256));
    for _ in 0..3 {
        drop(constants.write());
    }
    pipeline.vertex_mut().set_constant_buffer(0, Some(Arc::clone(&constants)));
    pipeline.bind_draw(&mut binder, &mut layouts);
    assert_eq!(pipeline.vertex().constant_buffers().slots()[0].bound_version(), 3);
    binder.take_calls();

    // an unrelated resource changing does not cause a bind
    let unrelated = Buffer::constant("other", NativeHandle::new(4), 16);
    drop(unrelated.write());
    assert!(!pipeline.bind_draw(&mut binder, &mut layouts));

    drop(constants.write());
    pipeline.vertex_mut().set_constant_buffer(0, Some(Arc::clone(&constants)));
    assert!(pipeline.bind_draw(&mut binder, &mut layouts));
    assert_eq!(pipeline.vertex().constant_buffers().slots()[0].bound_version(), 4);
    assert_eq!(
        binder.take_calls(),
        vec![NativeCall::SetConstantBuffers {
            stage: StageKind::Vertex,
            first: 0,
            buffers: vec![Some(NativeHandle::new(3))],
        }]
    );
}

#[test]
fn unbinding_detaches_from_resource() {
    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();
    let albedo = Arc::new(Texture::new("albedo", NativeHandle::new(20), TextureUsage::SAMPLED, 64, 64));

    pipeline.fragment_mut().set_shader_resource(0, Some(Arc::clone(&albedo)));
    pipeline.vertex_mut().set_shader_resource(0, Some(Arc::clone(&albedo)));
    pipeline.bind_draw(&mut binder, &mut layouts);
    assert_eq!(albedo.tracker().attachment_count(), 2);

    pipeline.fragment_mut().set_shader_resource(0, None);
    pipeline.bind_draw(&mut binder, &mut layouts);
    let remaining = albedo.tracker().attachments();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].stage, StageKind::Vertex);
    assert_eq!(remaining[0].kind, SlotKind::ShaderResource);
}

#[test]
fn rejected_resources_do_not_stop_the_pass() {
    let config = BindConfig {
        log_rejections: false,
        ..BindConfig::default()
    };
    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &config);
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();

    // a sampled-only texture cannot be a render target
    let sampled = Arc::new(Texture::new("sampled", NativeHandle::new(30), TextureUsage::SAMPLED, 8, 8));
    let depth = Arc::new(Texture::new("depth", NativeHandle::new(31), TextureUsage::DEPTH_STENCIL, 8, 8));
    pipeline.output_merger_mut().set_render_target(0, Some(Arc::clone(&sampled)));
    pipeline.output_merger_mut().set_depth_stencil(Some(depth));

    pipeline.bind_draw(&mut binder, &mut layouts);
    pipeline.bind_draw(&mut binder, &mut layouts);
    assert_eq!(pipeline.stats().rejections, 2);
    assert!(!sampled.tracker().is_attached());
    assert_eq!(binder.count(|c| matches!(c, NativeCall::SetRenderTargets { .. })), 0);
    assert_eq!(
        binder.count(|c| *c == NativeCall::SetDepthStencil(Some(NativeHandle::new(31)))),
        1
    );
    let rejection = pipeline.output_merger().render_targets().slots()[0]
        .last_rejection()
        .expect("rejection recorded");
    assert!(rejection.to_string().contains("sampled"));
}

#[test]
fn index_buffer_and_topology_bind_once() {
    let mut registry = VertexFormatRegistry::new();
    let format = position_format(&mut registry);
    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &BindConfig::default());
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();

    let indices = Arc::new(Buffer::index("indices", NativeHandle::new(40), IndexFormat::Uint32, 36));
    let vertices = Arc::new(Buffer::vertex("vertices", NativeHandle::new(41), format, 96));
    let stage = pipeline.input_assembler_mut();
    stage.set_index_buffer(Some(indices));
    stage.set_vertex_buffer(0, Some(vertices));
    pipeline.vertex_mut().set_shader(Some(vertex_shader(42)));

    pipeline.bind_draw(&mut binder, &mut layouts);
    let calls = binder.take_calls();
    assert_eq!(
        &calls[..2],
        &[
            NativeCall::SetTopology(Default::default()),
            NativeCall::SetIndexBuffer(Some(IndexBufferBinding {
                buffer: NativeHandle::new(40),
                format: IndexFormat::Uint32,
            })),
        ]
    );
    assert!(!pipeline.bind_draw(&mut binder, &mut layouts));
}

#[test]
fn strict_policy_sends_single_changes_individually() {
    let config = BindConfig {
        range_policy: RangePolicy::StrictLegacy,
        ..BindConfig::default()
    };
    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &config);
    let mut binder = RecordingBinder::new();
    let mut samplers = SamplerCache::new();
    let repeat = samplers.get_or_create(
        SamplerDescription {
            address: AddressMode::Repeat,
            ..SamplerDescription::default()
        },
        |_| NativeHandle::new(50),
    );
    assert_eq!(pipeline.compute().samplers().policy(), RangePolicy::StrictLegacy);
    pipeline.compute_mut().set_sampler(3, Some(repeat));
    assert!(pipeline.bind_dispatch(&mut binder));
    assert_eq!(
        binder.calls(),
        &[NativeCall::SetSamplers {
            stage: StageKind::Compute,
            first: 3,
            samplers: vec![Some(NativeHandle::new(50))],
        }]
    );
}

#[test]
fn refusal_clears_the_displaced_native_slot() {
    let config = BindConfig {
        log_rejections: false,
        ..BindConfig::default()
    };
    let mut registry = VertexFormatRegistry::new();
    let format = position_format(&mut registry);
    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &config);
    let mut binder = RecordingBinder::new();

    let globals = Arc::new(Buffer::constant("globals", NativeHandle::new(1), 64));
    let vertices = Arc::new(Buffer::vertex("vertices", NativeHandle::new(2), format, 48));
    pipeline.compute_mut().set_constant_buffer(0, Some(Arc::clone(&globals)));
    assert!(pipeline.bind_dispatch(&mut binder));
    binder.take_calls();

    // a vertex-only buffer cannot take the constant slot
    pipeline.compute_mut().set_constant_buffer(0, Some(vertices));
    assert!(pipeline.bind_dispatch(&mut binder));
    assert!(!globals.tracker().is_attached());
    assert_eq!(
        binder.calls(),
        &[NativeCall::SetConstantBuffers {
            stage: StageKind::Compute,
            first: 0,
            buffers: vec![None],
        }]
    );
    assert_eq!(pipeline.stats().rejections, 1);

    binder.take_calls();
    assert!(!pipeline.bind_dispatch(&mut binder));
    assert!(binder.calls().is_empty());
}

#[test]
fn refused_vertex_buffer_reconsults_the_input_layout() {
    let config = BindConfig {
        log_rejections: false,
        ..BindConfig::default()
    };
    let mut registry = VertexFormatRegistry::new();
    let format = position_format(&mut registry);
    let mut pipeline = Pipeline::new(&PipelineLimits::default(), &config);
    let mut layouts = InputLayoutCache::new();
    let mut binder = RecordingBinder::new();

    let vertices = Arc::new(Buffer::vertex("vertices", NativeHandle::new(2), format, 48));
    pipeline.input_assembler_mut().set_vertex_buffer(0, Some(Arc::clone(&vertices)));
    pipeline.vertex_mut().set_shader(Some(vertex_shader(3)));
    assert!(pipeline.bind_draw(&mut binder, &mut layouts));
    let bound_layout = pipeline.input_layout().map(Arc::clone).expect("layout bound");
    binder.take_calls();

    let globals = Arc::new(Buffer::constant("globals", NativeHandle::new(1), 64));
    pipeline.input_assembler_mut().set_vertex_buffer(0, Some(globals));
    assert!(pipeline.bind_draw(&mut binder, &mut layouts));
    assert!(!vertices.tracker().is_attached());
    assert_eq!(
        binder.count(|c| *c
            == NativeCall::SetVertexBuffers {
                first: 0,
                bindings: vec![VertexBufferBinding::UNBOUND],
            }),
        1
    );
    assert_eq!(binder.count(|c| matches!(c, NativeCall::SetInputLayout(_))), 1);
    let fallback = pipeline.input_layout().expect("placeholder bound");
    assert!(fallback.is_placeholder());
    assert!(!Arc::ptr_eq(fallback, &bound_layout));
}
