// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Construction-time configuration of a pipeline.

use crate::bindings::slot_group::RangePolicy;
use crate::bindings::visible_to::SlotKind;
use crate::error::SlotOverflow;

/// Slot counts per stage.
///
/// Hardware slot counts are known when a pipeline is constructed and never change, so
/// every group is sized once from these values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineLimits {
    pub vertex_buffers: u32,
    /// Per shader stage.
    pub constant_buffers: u32,
    /// Per shader stage.
    pub shader_resources: u32,
    /// Per shader stage.
    pub samplers: u32,
    pub render_targets: u32,
}

impl Default for PipelineLimits {
    fn default() -> Self {
        PipelineLimits {
            vertex_buffers: 16,
            constant_buffers: 14,
            shader_resources: 128,
            samplers: 16,
            render_targets: 8,
        }
    }
}

impl PipelineLimits {
    /// The largest slot counts any supported device reports.
    pub const MAX: PipelineLimits = PipelineLimits {
        vertex_buffers: 32,
        constant_buffers: 15,
        shader_resources: 128,
        samplers: 16,
        render_targets: 8,
    };

    /// Checks every count against [`Self::MAX`].
    pub fn validate(&self) -> Result<(), SlotOverflow> {
        let checks = [
            (SlotKind::VertexBuffer, self.vertex_buffers, Self::MAX.vertex_buffers),
            (SlotKind::ConstantBuffer, self.constant_buffers, Self::MAX.constant_buffers),
            (SlotKind::ShaderResource, self.shader_resources, Self::MAX.shader_resources),
            (SlotKind::Sampler, self.samplers, Self::MAX.samplers),
            (SlotKind::RenderTarget, self.render_targets, Self::MAX.render_targets),
        ];
        for (kind, count, limit) in checks {
            if count > limit {
                return Err(SlotOverflow {
                    kind,
                    index: count - 1,
                    limit,
                });
            }
        }
        Ok(())
    }
}

/// Behavior switches for bind passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindConfig {
    pub range_policy: RangePolicy,
    /// Whether refused attachments are logged (once per episode).
    pub log_rejections: bool,
}

impl Default for BindConfig {
    fn default() -> Self {
        BindConfig {
            range_policy: RangePolicy::Inclusive,
            log_rejections: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert_eq!(PipelineLimits::default().validate(), Ok(()));
        assert_eq!(PipelineLimits::MAX.validate(), Ok(()));
    }

    #[test]
    fn oversized_group_is_rejected() {
        let limits = PipelineLimits {
            samplers: 17,
            ..PipelineLimits::default()
        };
        let overflow = limits.validate().expect_err("17 samplers");
        assert_eq!(overflow.kind, SlotKind::Sampler);
        assert_eq!(overflow.limit, 16);
    }
}
