// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The logical stages of the graphics pipeline and their bind passes.
//!
//! Each stage owns the slots it is responsible for and binds them in a fixed order:
//!
//! | stage | order |
//! |---|---|
//! | [`InputAssemblerStage`] | topology, index buffer, vertex buffers |
//! | [`ShaderStage`] | shader, constant buffers, shader resources, samplers |
//! | [`OutputMergerStage`] | render targets, depth-stencil, blend factor, stencil reference |
//!
//! A stage never fails.  A resource that refuses its slot leaves the slot unbound and the
//! pass carries on with the next one.

use crate::bindings::bind_slot::{BindSlot, BindStats};
use crate::bindings::buffer::Buffer;
use crate::bindings::resource::Bindable;
use crate::bindings::resource_tracking::{PipelineId, SlotRef};
use crate::bindings::sampler::Sampler;
use crate::bindings::scalar_state::ScalarState;
use crate::bindings::slot_group::BindSlotGroup;
use crate::bindings::texture::Texture;
use crate::bindings::visible_to::{SlotKind, StageKind};
use crate::config::{BindConfig, PipelineLimits};
use crate::error::BindRejected;
use crate::images::shader::{InputSignature, Shader};
use crate::native::{IndexBufferBinding, NativeBinder, NativeHandle, VertexBufferBinding};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
}

/// One stage of the pipeline.
pub trait PipelineStage {
    fn kind(&self) -> StageKind;

    /// Binds every changed slot of the stage through `binder`.
    ///
    /// Returns true if any native call was issued.
    fn bind(&mut self, binder: &mut dyn NativeBinder, stats: &mut BindStats) -> bool;

    /// Forgets all bound state and requests, detaching every resource.
    fn reset(&mut self);

    /// The first refusal still recorded on any slot of the stage.
    fn first_rejection(&self) -> Option<&BindRejected>;
}

/// Binds `group` and sends each changed range with `send`.
///
/// Under [`crate::bindings::slot_group::RangePolicy::StrictLegacy`] the group leaves a
/// single changed slot to its caller; it is sent here as a one-slot call.
fn bind_group<R, F>(group: &mut BindSlotGroup<R>, stats: &mut BindStats, mut send: F) -> bool
where
    R: Bindable,
    F: FnMut(u32, &[BindSlot<R>]),
{
    if group.bind_all(stats, |range, slots| send(range.first, slots)) {
        return true;
    }
    let Some(range) = group.changed_range() else {
        return false;
    };
    send(range.first, &group.slots()[range.as_range()]);
    stats.native_calls += 1;
    true
}

fn group<R: Bindable>(
    pipeline: PipelineId,
    stage: StageKind,
    kind: SlotKind,
    count: u32,
    limit: u32,
    config: &BindConfig,
) -> BindSlotGroup<R> {
    let mut group = BindSlotGroup::new(pipeline, stage, kind, count, limit).with_policy(config.range_policy);
    group.set_log_rejections(config.log_rejections);
    group
}

fn single<R: Bindable>(pipeline: PipelineId, stage: StageKind, kind: SlotKind, config: &BindConfig) -> BindSlot<R> {
    let mut slot = BindSlot::new(
        SlotRef {
            pipeline,
            stage,
            kind,
            index: 0,
        },
        false,
    );
    slot.set_log_rejections(config.log_rejections);
    slot
}

fn handle<R: Bindable>(slot: &BindSlot<R>) -> Option<NativeHandle> {
    slot.bound().map(|r| r.native())
}

/// Topology, index buffer and vertex buffers.
#[derive(Debug)]
pub struct InputAssemblerStage {
    topology: ScalarState<PrimitiveTopology>,
    index_buffer: BindSlot<Buffer>,
    vertex_buffers: BindSlotGroup<Buffer>,
    scratch: Vec<VertexBufferBinding>,
}

impl InputAssemblerStage {
    pub(crate) fn new(pipeline: PipelineId, limits: &PipelineLimits, config: &BindConfig) -> Self {
        let stage = StageKind::InputAssembler;
        InputAssemblerStage {
            topology: ScalarState::new(PrimitiveTopology::default()),
            index_buffer: single(pipeline, stage, SlotKind::IndexBuffer, config),
            vertex_buffers: group(
                pipeline,
                stage,
                SlotKind::VertexBuffer,
                limits.vertex_buffers,
                PipelineLimits::MAX.vertex_buffers,
                config,
            ),
            scratch: Vec::with_capacity(limits.vertex_buffers as usize),
        }
    }

    pub fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.topology.set(topology);
    }

    pub fn topology(&self) -> PrimitiveTopology {
        self.topology.get()
    }

    pub fn set_index_buffer(&mut self, buffer: Option<Arc<Buffer>>) {
        self.index_buffer.set(buffer);
    }

    /// # Panics
    ///
    /// Panics if `index` is beyond the configured vertex-buffer count.
    pub fn set_vertex_buffer(&mut self, index: u32, buffer: Option<Arc<Buffer>>) {
        self.vertex_buffers.set(index, buffer);
    }

    pub fn index_buffer(&self) -> &BindSlot<Buffer> {
        &self.index_buffer
    }

    pub fn vertex_buffers(&self) -> &BindSlotGroup<Buffer> {
        &self.vertex_buffers
    }

    pub fn vertex_buffers_mut(&mut self) -> &mut BindSlotGroup<Buffer> {
        &mut self.vertex_buffers
    }

    /// Whether the last bind pass changed any vertex-buffer slot.
    pub fn vertex_buffers_changed(&self) -> bool {
        self.vertex_buffers.has_changes()
    }
}

impl PipelineStage for InputAssemblerStage {
    fn kind(&self) -> StageKind {
        StageKind::InputAssembler
    }

    fn bind(&mut self, binder: &mut dyn NativeBinder, stats: &mut BindStats) -> bool {
        let mut issued = false;
        if let Some(topology) = self.topology.bind() {
            binder.set_topology(topology);
            stats.native_calls += 1;
            issued = true;
        }
        if self.index_buffer.bind(stats) {
            let binding = self.index_buffer.bound().and_then(|buffer| {
                buffer.index_format().map(|format| IndexBufferBinding {
                    buffer: buffer.native(),
                    format,
                })
            });
            binder.set_index_buffer(binding);
            stats.native_calls += 1;
            issued = true;
        }
        let scratch = &mut self.scratch;
        issued |= bind_group(&mut self.vertex_buffers, stats, |first, slots| {
            scratch.clear();
            scratch.extend(slots.iter().map(|slot| match slot.bound() {
                Some(buffer) => VertexBufferBinding {
                    buffer: Some(buffer.native()),
                    stride: buffer.vertex_format().map_or(0, |format| format.stride()),
                    offset: 0,
                },
                None => VertexBufferBinding::UNBOUND,
            }));
            binder.set_vertex_buffers(first, scratch);
        });
        issued
    }

    fn reset(&mut self) {
        self.topology.reset();
        self.index_buffer.reset();
        self.vertex_buffers.reset();
    }

    fn first_rejection(&self) -> Option<&BindRejected> {
        self.index_buffer
            .last_rejection()
            .or_else(|| self.vertex_buffers.first_rejection())
    }
}

/// A programmable stage: vertex, fragment or compute.
#[derive(Debug)]
pub struct ShaderStage {
    kind: StageKind,
    shader: BindSlot<Shader>,
    constant_buffers: BindSlotGroup<Buffer>,
    shader_resources: BindSlotGroup<Texture>,
    samplers: BindSlotGroup<Sampler>,
    handles: Vec<Option<NativeHandle>>,
    shader_changed: bool,
}

impl ShaderStage {
    pub(crate) fn new(kind: StageKind, pipeline: PipelineId, limits: &PipelineLimits, config: &BindConfig) -> Self {
        debug_assert!(kind.is_shader(), "{kind:?} is not a shader stage");
        let max = PipelineLimits::MAX;
        ShaderStage {
            kind,
            shader: single(pipeline, kind, SlotKind::Shader, config),
            constant_buffers: group(
                pipeline,
                kind,
                SlotKind::ConstantBuffer,
                limits.constant_buffers,
                max.constant_buffers,
                config,
            ),
            shader_resources: group(
                pipeline,
                kind,
                SlotKind::ShaderResource,
                limits.shader_resources,
                max.shader_resources,
                config,
            ),
            samplers: group(pipeline, kind, SlotKind::Sampler, limits.samplers, max.samplers, config),
            handles: Vec::new(),
            shader_changed: false,
        }
    }

    pub fn set_shader(&mut self, shader: Option<Arc<Shader>>) {
        self.shader.set(shader);
    }

    pub fn set_constant_buffer(&mut self, index: u32, buffer: Option<Arc<Buffer>>) {
        self.constant_buffers.set(index, buffer);
    }

    pub fn set_shader_resource(&mut self, index: u32, texture: Option<Arc<Texture>>) {
        self.shader_resources.set(index, texture);
    }

    pub fn set_sampler(&mut self, index: u32, sampler: Option<Arc<Sampler>>) {
        self.samplers.set(index, sampler);
    }

    pub fn shader(&self) -> &BindSlot<Shader> {
        &self.shader
    }

    pub fn constant_buffers(&self) -> &BindSlotGroup<Buffer> {
        &self.constant_buffers
    }

    pub fn shader_resources(&self) -> &BindSlotGroup<Texture> {
        &self.shader_resources
    }

    pub fn samplers(&self) -> &BindSlotGroup<Sampler> {
        &self.samplers
    }

    /// Whether the last bind pass changed the shader slot.
    pub fn shader_changed(&self) -> bool {
        self.shader_changed
    }

    /// The input signature of the bound shader.
    pub fn input_signature(&self) -> Option<&InputSignature> {
        self.shader.bound().and_then(|shader| shader.input_signature())
    }
}

impl PipelineStage for ShaderStage {
    fn kind(&self) -> StageKind {
        self.kind
    }

    fn bind(&mut self, binder: &mut dyn NativeBinder, stats: &mut BindStats) -> bool {
        let kind = self.kind;
        let mut issued = false;
        self.shader_changed = self.shader.bind(stats);
        if self.shader_changed {
            binder.set_shader(kind, handle(&self.shader));
            stats.native_calls += 1;
            issued = true;
        }
        let handles = &mut self.handles;
        issued |= bind_group(&mut self.constant_buffers, stats, |first, slots| {
            BindSlotGroup::handles(slots, handles);
            binder.set_constant_buffers(kind, first, handles);
        });
        issued |= bind_group(&mut self.shader_resources, stats, |first, slots| {
            BindSlotGroup::handles(slots, handles);
            binder.set_shader_resources(kind, first, handles);
        });
        issued |= bind_group(&mut self.samplers, stats, |first, slots| {
            BindSlotGroup::handles(slots, handles);
            binder.set_samplers(kind, first, handles);
        });
        issued
    }

    fn reset(&mut self) {
        self.shader.reset();
        self.constant_buffers.reset();
        self.shader_resources.reset();
        self.samplers.reset();
        self.shader_changed = false;
    }

    fn first_rejection(&self) -> Option<&BindRejected> {
        self.shader
            .last_rejection()
            .or_else(|| self.constant_buffers.first_rejection())
            .or_else(|| self.shader_resources.first_rejection())
            .or_else(|| self.samplers.first_rejection())
    }
}

/// Render targets, depth-stencil and blend state.
#[derive(Debug)]
pub struct OutputMergerStage {
    render_targets: BindSlotGroup<Texture>,
    depth_stencil: BindSlot<Texture>,
    blend_factor: ScalarState<[f32; 4]>,
    stencil_ref: ScalarState<u32>,
    handles: Vec<Option<NativeHandle>>,
}

impl OutputMergerStage {
    pub(crate) fn new(pipeline: PipelineId, limits: &PipelineLimits, config: &BindConfig) -> Self {
        let stage = StageKind::OutputMerger;
        OutputMergerStage {
            render_targets: group(
                pipeline,
                stage,
                SlotKind::RenderTarget,
                limits.render_targets,
                PipelineLimits::MAX.render_targets,
                config,
            ),
            depth_stencil: single(pipeline, stage, SlotKind::DepthStencil, config),
            blend_factor: ScalarState::new([1.0; 4]),
            stencil_ref: ScalarState::new(0),
            handles: Vec::new(),
        }
    }

    pub fn set_render_target(&mut self, index: u32, target: Option<Arc<Texture>>) {
        self.render_targets.set(index, target);
    }

    pub fn set_depth_stencil(&mut self, target: Option<Arc<Texture>>) {
        self.depth_stencil.set(target);
    }

    pub fn set_blend_factor(&mut self, factor: [f32; 4]) {
        self.blend_factor.set(factor);
    }

    pub fn set_stencil_ref(&mut self, reference: u32) {
        self.stencil_ref.set(reference);
    }

    pub fn render_targets(&self) -> &BindSlotGroup<Texture> {
        &self.render_targets
    }

    pub fn depth_stencil(&self) -> &BindSlot<Texture> {
        &self.depth_stencil
    }
}

impl PipelineStage for OutputMergerStage {
    fn kind(&self) -> StageKind {
        StageKind::OutputMerger
    }

    fn bind(&mut self, binder: &mut dyn NativeBinder, stats: &mut BindStats) -> bool {
        let handles = &mut self.handles;
        let mut issued = bind_group(&mut self.render_targets, stats, |first, slots| {
            BindSlotGroup::handles(slots, handles);
            binder.set_render_targets(first, handles);
        });
        if self.depth_stencil.bind(stats) {
            binder.set_depth_stencil(handle(&self.depth_stencil));
            stats.native_calls += 1;
            issued = true;
        }
        if let Some(factor) = self.blend_factor.bind() {
            binder.set_blend_factor(factor);
            stats.native_calls += 1;
            issued = true;
        }
        if let Some(reference) = self.stencil_ref.bind() {
            binder.set_stencil_ref(reference);
            stats.native_calls += 1;
            issued = true;
        }
        issued
    }

    fn reset(&mut self) {
        self.render_targets.reset();
        self.depth_stencil.reset();
        self.blend_factor.reset();
        self.stencil_ref.reset();
    }

    fn first_rejection(&self) -> Option<&BindRejected> {
        self.render_targets
            .first_rejection()
            .or_else(|| self.depth_stencil.last_rejection())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::sampler::SamplerDescription;
    use crate::bindings::slot_group::RangePolicy;
    use crate::native::{NativeCall, RecordingBinder};

    fn sampler(raw: u64) -> Arc<Sampler> {
        Arc::new(Sampler::new(NativeHandle::new(raw), SamplerDescription::default()))
    }

    #[test]
    fn shader_stage_binds_in_order_and_only_once() {
        let mut binder = RecordingBinder::new();
        let mut stats = BindStats::default();
        let mut stage = ShaderStage::new(
            StageKind::Fragment,
            PipelineId::next(),
            &PipelineLimits::default(),
            &BindConfig::default(),
        );
        stage.set_shader(Some(Arc::new(Shader::fragment("lit", NativeHandle::new(1)))));
        stage.set_constant_buffer(0, Some(Arc::new(Buffer::constant("material", NativeHandle::new(2), 64))));
        stage.set_sampler(1, Some(sampler(3)));

        assert!(stage.bind(&mut binder, &mut stats));
        assert_eq!(
            binder.take_calls(),
            vec![
                NativeCall::SetShader {
                    stage: StageKind::Fragment,
                    shader: Some(NativeHandle::new(1)),
                },
                NativeCall::SetConstantBuffers {
                    stage: StageKind::Fragment,
                    first: 0,
                    buffers: vec![Some(NativeHandle::new(2))],
                },
                NativeCall::SetSamplers {
                    stage: StageKind::Fragment,
                    first: 1,
                    samplers: vec![Some(NativeHandle::new(3))],
                },
            ]
        );

        assert!(!stage.bind(&mut binder, &mut stats));
        assert!(binder.calls().is_empty());
        assert_eq!(stats.native_calls, 3);
    }

    #[test]
    fn strict_policy_still_sends_single_slots() {
        let mut binder = RecordingBinder::new();
        let mut stats = BindStats::default();
        let config = BindConfig {
            range_policy: RangePolicy::StrictLegacy,
            log_rejections: true,
        };
        let mut stage = ShaderStage::new(StageKind::Vertex, PipelineId::next(), &PipelineLimits::default(), &config);
        stage.set_sampler(2, Some(sampler(9)));
        assert!(stage.bind(&mut binder, &mut stats));
        assert_eq!(
            binder.calls(),
            &[NativeCall::SetSamplers {
                stage: StageKind::Vertex,
                first: 2,
                samplers: vec![Some(NativeHandle::new(9))],
            }]
        );
    }

    #[test]
    fn wrong_stage_shader_is_left_unbound() {
        let mut binder = RecordingBinder::new();
        let mut stats = BindStats::default();
        let config = BindConfig {
            log_rejections: false,
            ..BindConfig::default()
        };
        let mut stage = ShaderStage::new(StageKind::Vertex, PipelineId::next(), &PipelineLimits::default(), &config);
        stage.set_shader(Some(Arc::new(Shader::compute("cull", NativeHandle::new(4)))));
        assert!(!stage.bind(&mut binder, &mut stats));
        assert!(stage.shader().bound().is_none());
        assert_eq!(stats.rejections, 1);
        assert!(binder.calls().is_empty());
    }

    #[test]
    fn output_merger_scalar_state() {
        let mut binder = RecordingBinder::new();
        let mut stats = BindStats::default();
        let mut stage = OutputMergerStage::new(PipelineId::next(), &PipelineLimits::default(), &BindConfig::default());
        stage.bind(&mut binder, &mut stats);
        assert_eq!(
            binder.take_calls(),
            vec![NativeCall::SetBlendFactor([1.0; 4]), NativeCall::SetStencilRef(0)]
        );

        stage.set_stencil_ref(0);
        stage.set_blend_factor([0.5; 4]);
        stage.bind(&mut binder, &mut stats);
        assert_eq!(binder.take_calls(), vec![NativeCall::SetBlendFactor([0.5; 4])]);
    }
}
