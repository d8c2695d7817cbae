// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The boundary to the native graphics API.
//!
//! The binding engine never talks to a driver itself.  Once a bind pass has worked out
//! which slots actually changed, it calls into a [`NativeBinder`] supplied by the graphics
//! layer: one call per changed singleton slot, and one *ranged* call per slot group.
//!
//! [`RecordingBinder`] is an in-process binder that records the calls it receives.  It
//! backs the tests and is handy for capturing what a frame would have bound.

use crate::bindings::visible_to::StageKind;
use crate::images::input_layout::InputLayoutDescriptor;
use crate::images::pipeline_stage::PrimitiveTopology;
use crate::images::vertex_layout::IndexFormat;

/// An opaque handle to a native GPU object, issued by the resource factory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NativeHandle(u64);

impl NativeHandle {
    pub const fn new(raw: u64) -> Self {
        NativeHandle(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// One entry of a ranged vertex-buffer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexBufferBinding {
    pub buffer: Option<NativeHandle>,
    pub stride: u32,
    pub offset: u32,
}

impl VertexBufferBinding {
    pub const UNBOUND: VertexBufferBinding = VertexBufferBinding {
        buffer: None,
        stride: 0,
        offset: 0,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IndexBufferBinding {
    pub buffer: NativeHandle,
    pub format: IndexFormat,
}

/// Native binding calls, as issued by the bind pass.
///
/// Ranged calls (`first` plus a slice) cover the inclusive changed range of a slot group.
/// `None` entries unbind the slot.
pub trait NativeBinder {
    fn set_topology(&mut self, topology: PrimitiveTopology);
    fn set_index_buffer(&mut self, binding: Option<IndexBufferBinding>);
    fn set_vertex_buffers(&mut self, first: u32, bindings: &[VertexBufferBinding]);
    /// Creates a native input layout.  Only called on an input layout cache miss.
    fn create_input_layout(&mut self, descriptor: &InputLayoutDescriptor) -> NativeHandle;
    fn set_input_layout(&mut self, layout: NativeHandle);
    fn set_shader(&mut self, stage: StageKind, shader: Option<NativeHandle>);
    fn set_constant_buffers(&mut self, stage: StageKind, first: u32, buffers: &[Option<NativeHandle>]);
    fn set_shader_resources(&mut self, stage: StageKind, first: u32, resources: &[Option<NativeHandle>]);
    fn set_samplers(&mut self, stage: StageKind, first: u32, samplers: &[Option<NativeHandle>]);
    fn set_render_targets(&mut self, first: u32, targets: &[Option<NativeHandle>]);
    fn set_depth_stencil(&mut self, target: Option<NativeHandle>);
    fn set_blend_factor(&mut self, factor: [f32; 4]);
    fn set_stencil_ref(&mut self, reference: u32);
}

/// A recorded native call.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    SetTopology(PrimitiveTopology),
    SetIndexBuffer(Option<IndexBufferBinding>),
    SetVertexBuffers {
        first: u32,
        bindings: Vec<VertexBufferBinding>,
    },
    CreateInputLayout {
        layout: NativeHandle,
        descriptor: InputLayoutDescriptor,
    },
    SetInputLayout(NativeHandle),
    SetShader {
        stage: StageKind,
        shader: Option<NativeHandle>,
    },
    SetConstantBuffers {
        stage: StageKind,
        first: u32,
        buffers: Vec<Option<NativeHandle>>,
    },
    SetShaderResources {
        stage: StageKind,
        first: u32,
        resources: Vec<Option<NativeHandle>>,
    },
    SetSamplers {
        stage: StageKind,
        first: u32,
        samplers: Vec<Option<NativeHandle>>,
    },
    SetRenderTargets {
        first: u32,
        targets: Vec<Option<NativeHandle>>,
    },
    SetDepthStencil(Option<NativeHandle>),
    SetBlendFactor([f32; 4]),
    SetStencilRef(u32),
}

/// Handles issued by [`RecordingBinder::create_input_layout`] start here, clear of
/// anything a test is likely to hand out for resources.
const RECORDED_LAYOUT_BASE: u64 = 1 << 48;

/// A [`NativeBinder`] that records every call.
#[derive(Debug, Default)]
pub struct RecordingBinder {
    calls: Vec<NativeCall>,
    layouts_created: u64,
}

impl RecordingBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[NativeCall] {
        &self.calls
    }

    /// Returns the calls recorded so far and starts a fresh recording.
    pub fn take_calls(&mut self) -> Vec<NativeCall> {
        std::mem::take(&mut self.calls)
    }

    pub fn count(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.calls.iter().filter(|c| predicate(c)).count()
    }
}

impl NativeBinder for RecordingBinder {
    fn set_topology(&mut self, topology: PrimitiveTopology) {
        self.calls.push(NativeCall::SetTopology(topology));
    }

    fn set_index_buffer(&mut self, binding: Option<IndexBufferBinding>) {
        self.calls.push(NativeCall::SetIndexBuffer(binding));
    }

    fn set_vertex_buffers(&mut self, first: u32, bindings: &[VertexBufferBinding]) {
        self.calls.push(NativeCall::SetVertexBuffers {
            first,
            bindings: bindings.to_vec(),
        });
    }

    fn create_input_layout(&mut self, descriptor: &InputLayoutDescriptor) -> NativeHandle {
        let layout = NativeHandle::new(RECORDED_LAYOUT_BASE + self.layouts_created);
        self.layouts_created += 1;
        self.calls.push(NativeCall::CreateInputLayout {
            layout,
            descriptor: descriptor.clone(),
        });
        layout
    }

    fn set_input_layout(&mut self, layout: NativeHandle) {
        self.calls.push(NativeCall::SetInputLayout(layout));
    }

    fn set_shader(&mut self, stage: StageKind, shader: Option<NativeHandle>) {
        self.calls.push(NativeCall::SetShader { stage, shader });
    }

    fn set_constant_buffers(&mut self, stage: StageKind, first: u32, buffers: &[Option<NativeHandle>]) {
        self.calls.push(NativeCall::SetConstantBuffers {
            stage,
            first,
            buffers: buffers.to_vec(),
        });
    }

    fn set_shader_resources(&mut self, stage: StageKind, first: u32, resources: &[Option<NativeHandle>]) {
        self.calls.push(NativeCall::SetShaderResources {
            stage,
            first,
            resources: resources.to_vec(),
        });
    }

    fn set_samplers(&mut self, stage: StageKind, first: u32, samplers: &[Option<NativeHandle>]) {
        self.calls.push(NativeCall::SetSamplers {
            stage,
            first,
            samplers: samplers.to_vec(),
        });
    }

    fn set_render_targets(&mut self, first: u32, targets: &[Option<NativeHandle>]) {
        self.calls.push(NativeCall::SetRenderTargets {
            first,
            targets: targets.to_vec(),
        });
    }

    fn set_depth_stencil(&mut self, target: Option<NativeHandle>) {
        self.calls.push(NativeCall::SetDepthStencil(target));
    }

    fn set_blend_factor(&mut self, factor: [f32; 4]) {
        self.calls.push(NativeCall::SetBlendFactor(factor));
    }

    fn set_stencil_ref(&mut self, reference: u32) {
        self.calls.push(NativeCall::SetStencilRef(reference));
    }
}
