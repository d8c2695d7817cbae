// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! GPU buffers: vertex, index and constant data.
//!
//! A buffer's usage and formats are fixed at creation.  Its byte length may change in
//! place (a dynamic buffer regrown by a loader thread, for example), which publishes a
//! new content version without changing the buffer's identity.

use crate::bindings::resource::Bindable;
use crate::bindings::resource_tracking::{MutationGuard, ResourceTracker, SlotRef};
use crate::bindings::visible_to::{BufferUsage, SlotKind};
use crate::error::RejectReason;
use crate::images::vertex_layout::{IndexFormat, VertexFormat};
use crate::native::NativeHandle;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Describes a buffer to be wrapped.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    pub label: &'a str,
    pub usage: BufferUsage,
    pub byte_len: u64,
    /// Required for [`BufferUsage::VERTEX`] buffers to be bound.
    pub vertex_format: Option<Arc<VertexFormat>>,
    /// Required for [`BufferUsage::INDEX`] buffers to be bound.
    pub index_format: Option<IndexFormat>,
}

/// A GPU buffer as seen by the binding engine.
///
/// Wraps the native handle with a [`ResourceTracker`], the usage the buffer was created
/// with, and the formats needed to bind it as vertex or index data.  Content writes go
/// through [`Buffer::write`], whose guard publishes a new version when dropped.
#[derive(Debug)]
pub struct Buffer {
    tracker: ResourceTracker,
    native: NativeHandle,
    usage: BufferUsage,
    vertex_format: Option<Arc<VertexFormat>>,
    index_format: Option<IndexFormat>,
    byte_len: AtomicU64,
}

impl Buffer {
    /// Wraps `native` as described by `descriptor`, starting at version 0.
    pub fn new(native: NativeHandle, descriptor: BufferDescriptor<'_>) -> Self {
        Buffer {
            tracker: ResourceTracker::new(descriptor.label),
            native,
            usage: descriptor.usage,
            vertex_format: descriptor.vertex_format,
            index_format: descriptor.index_format,
            byte_len: AtomicU64::new(descriptor.byte_len),
        }
    }

    /// A vertex buffer whose elements follow `format`.
    pub fn vertex(label: &str, native: NativeHandle, format: Arc<VertexFormat>, byte_len: u64) -> Self {
        Self::new(
            native,
            BufferDescriptor {
                label,
                usage: BufferUsage::VERTEX,
                byte_len,
                vertex_format: Some(format),
                index_format: None,
            },
        )
    }

    pub fn index(label: &str, native: NativeHandle, format: IndexFormat, byte_len: u64) -> Self {
        Self::new(
            native,
            BufferDescriptor {
                label,
                usage: BufferUsage::INDEX,
                byte_len,
                vertex_format: None,
                index_format: Some(format),
            },
        )
    }

    pub fn constant(label: &str, native: NativeHandle, byte_len: u64) -> Self {
        Self::new(
            native,
            BufferDescriptor {
                label,
                usage: BufferUsage::CONSTANT,
                byte_len,
                vertex_format: None,
                index_format: None,
            },
        )
    }

    /// The slot kinds this buffer may occupy.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// The interned layout of one vertex, for vertex buffers.
    pub fn vertex_format(&self) -> Option<&Arc<VertexFormat>> {
        self.vertex_format.as_ref()
    }

    pub fn index_format(&self) -> Option<IndexFormat> {
        self.index_format
    }

    /// The current storage length, as last set by [`Self::resize_in_place`].
    pub fn byte_len(&self) -> u64 {
        self.byte_len.load(Ordering::Acquire)
    }

    /// Begins a content write.  The new version is published when the guard drops.
    pub fn write(&self) -> MutationGuard<'_> {
        self.tracker.begin_mutation()
    }

    /// Changes the length of the buffer's storage without changing its identity, and
    /// publishes the change.  Returns the new version.
    pub fn resize_in_place(&self, byte_len: u64) -> u32 {
        {
            let _mutation = self.tracker.begin_mutation();
            self.byte_len.store(byte_len, Ordering::Relaxed);
        }
        self.tracker.version()
    }
}

impl Bindable for Buffer {
    fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    fn native(&self) -> NativeHandle {
        self.native
    }

    fn check_attach(&self, slot: SlotRef) -> Result<(), RejectReason> {
        match slot.kind {
            SlotKind::VertexBuffer | SlotKind::IndexBuffer | SlotKind::ConstantBuffer => {}
            _ => return Err(RejectReason::WrongKind),
        }
        if !self.usage.permits(slot.kind) {
            return Err(RejectReason::MissingUsage);
        }
        match slot.kind {
            SlotKind::VertexBuffer if self.vertex_format.is_none() => {
                Err(RejectReason::MissingVertexFormat)
            }
            SlotKind::IndexBuffer if self.index_format.is_none() => {
                Err(RejectReason::MissingIndexFormat)
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bindings::resource_tracking::PipelineId;
    use crate::bindings::visible_to::StageKind;

    fn slot(kind: SlotKind) -> SlotRef {
        SlotRef {
            pipeline: PipelineId::next(),
            stage: StageKind::InputAssembler,
            kind,
            index: 0,
        }
    }

    #[test]
    fn attachment_follows_usage() {
        let constants = Buffer::constant("constants", NativeHandle::new(1), 256);
        assert_eq!(constants.check_attach(slot(SlotKind::ConstantBuffer)), Ok(()));
        assert_eq!(
            constants.check_attach(slot(SlotKind::VertexBuffer)),
            Err(RejectReason::MissingUsage)
        );
        assert_eq!(
            constants.check_attach(slot(SlotKind::Sampler)),
            Err(RejectReason::WrongKind)
        );
    }

    #[test]
    fn vertex_usage_needs_a_format() {
        let unformatted = Buffer::new(
            NativeHandle::new(2),
            BufferDescriptor {
                label: "raw",
                usage: BufferUsage::VERTEX | BufferUsage::INDEX,
                byte_len: 64,
                vertex_format: None,
                index_format: None,
            },
        );
        assert_eq!(
            unformatted.check_attach(slot(SlotKind::VertexBuffer)),
            Err(RejectReason::MissingVertexFormat)
        );
        assert_eq!(
            unformatted.check_attach(slot(SlotKind::IndexBuffer)),
            Err(RejectReason::MissingIndexFormat)
        );
    }

    #[test]
    fn resize_publishes_after_the_store() {
        let buffer = Buffer::index("indices", NativeHandle::new(3), IndexFormat::Uint16, 64);
        assert_eq!(buffer.version(), 0);
        assert_eq!(buffer.resize_in_place(128), 1);
        assert_eq!(buffer.byte_len(), 128);
        drop(buffer.write());
        assert_eq!(buffer.version(), 2);
    }
}
