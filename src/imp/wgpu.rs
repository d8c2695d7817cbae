// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Conversions into wgpu types.
//!
//! wgpu has no standalone input layout object; the vertex buffer layouts are part of the
//! render pipeline descriptor.  [`vertex_buffer_layouts`] turns an [`InputLayoutDescriptor`]
//! into the owned data those layouts borrow from, with shader locations numbered in the
//! shader's declaration order.

use crate::config::PipelineLimits;
use crate::images::input_layout::InputLayoutDescriptor;
use crate::images::pipeline_stage::PrimitiveTopology;
use crate::images::vertex_layout::{IndexFormat, StepMode, VertexElementFormat};

impl From<PrimitiveTopology> for wgpu::PrimitiveTopology {
    fn from(topology: PrimitiveTopology) -> Self {
        match topology {
            PrimitiveTopology::PointList => wgpu::PrimitiveTopology::PointList,
            PrimitiveTopology::LineList => wgpu::PrimitiveTopology::LineList,
            PrimitiveTopology::LineStrip => wgpu::PrimitiveTopology::LineStrip,
            PrimitiveTopology::TriangleList => wgpu::PrimitiveTopology::TriangleList,
            PrimitiveTopology::TriangleStrip => wgpu::PrimitiveTopology::TriangleStrip,
        }
    }
}

impl From<IndexFormat> for wgpu::IndexFormat {
    fn from(format: IndexFormat) -> Self {
        match format {
            IndexFormat::Uint16 => wgpu::IndexFormat::Uint16,
            IndexFormat::Uint32 => wgpu::IndexFormat::Uint32,
        }
    }
}

impl From<StepMode> for wgpu::VertexStepMode {
    fn from(step: StepMode) -> Self {
        match step {
            StepMode::Vertex => wgpu::VertexStepMode::Vertex,
            StepMode::Instance => wgpu::VertexStepMode::Instance,
        }
    }
}

impl From<VertexElementFormat> for wgpu::VertexFormat {
    fn from(format: VertexElementFormat) -> Self {
        match format {
            VertexElementFormat::F32 => wgpu::VertexFormat::Float32,
            VertexElementFormat::F32x2 => wgpu::VertexFormat::Float32x2,
            VertexElementFormat::F32x3 => wgpu::VertexFormat::Float32x3,
            VertexElementFormat::F32x4 => wgpu::VertexFormat::Float32x4,
            VertexElementFormat::U32 => wgpu::VertexFormat::Uint32,
            VertexElementFormat::U32x2 => wgpu::VertexFormat::Uint32x2,
            VertexElementFormat::U32x3 => wgpu::VertexFormat::Uint32x3,
            VertexElementFormat::U32x4 => wgpu::VertexFormat::Uint32x4,
            VertexElementFormat::I32 => wgpu::VertexFormat::Sint32,
            VertexElementFormat::U8x4 => wgpu::VertexFormat::Uint8x4,
            VertexElementFormat::Unorm8x4 => wgpu::VertexFormat::Unorm8x4,
            VertexElementFormat::U16x2 => wgpu::VertexFormat::Uint16x2,
            VertexElementFormat::F16x2 => wgpu::VertexFormat::Float16x2,
            VertexElementFormat::F16x4 => wgpu::VertexFormat::Float16x4,
        }
    }
}

/// Owned data for one `wgpu::VertexBufferLayout`.
#[derive(Debug, Clone, PartialEq)]
pub struct OwnedVertexBufferLayout {
    pub slot: u32,
    pub array_stride: u64,
    pub step_mode: wgpu::VertexStepMode,
    pub attributes: Vec<wgpu::VertexAttribute>,
}

impl OwnedVertexBufferLayout {
    #[must_use]
    pub fn as_wgpu(&self) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.array_stride,
            step_mode: self.step_mode,
            attributes: &self.attributes,
        }
    }
}

/// One layout per slot from 0 through the highest slot the descriptor uses.
///
/// wgpu addresses vertex buffers by their position in the layout list, so unused slots
/// in between get an empty layout.
#[must_use]
pub fn vertex_buffer_layouts(descriptor: &InputLayoutDescriptor) -> Vec<OwnedVertexBufferLayout> {
    let Some(highest) = descriptor.buffers.iter().map(|b| b.input_slot).max() else {
        return Vec::new();
    };
    (0..=highest)
        .map(|slot| {
            let buffer = descriptor.buffers.iter().find(|b| b.input_slot == slot);
            let attributes = descriptor
                .elements
                .iter()
                .enumerate()
                .filter(|(_, element)| element.input_slot == slot)
                .map(|(location, element)| wgpu::VertexAttribute {
                    format: element.format.into(),
                    offset: u64::from(element.offset),
                    shader_location: location as u32,
                })
                .collect();
            OwnedVertexBufferLayout {
                slot,
                array_stride: buffer.map_or(0, |b| u64::from(b.stride)),
                step_mode: buffer.map_or(StepMode::Vertex, |b| b.step).into(),
                attributes,
            }
        })
        .collect()
}

impl PipelineLimits {
    /// Slot counts supported by a wgpu device, capped at [`PipelineLimits::MAX`].
    pub fn from_wgpu(limits: &wgpu::Limits) -> Self {
        let max = PipelineLimits::MAX;
        PipelineLimits {
            vertex_buffers: limits.max_vertex_buffers.min(max.vertex_buffers),
            constant_buffers: limits
                .max_uniform_buffers_per_shader_stage
                .min(max.constant_buffers),
            shader_resources: limits
                .max_sampled_textures_per_shader_stage
                .min(max.shader_resources),
            samplers: limits.max_samplers_per_shader_stage.min(max.samplers),
            render_targets: limits.max_color_attachments.min(max.render_targets),
        }
    }
}
