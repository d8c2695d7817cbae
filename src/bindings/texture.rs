// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Textures, as shader resources or as output attachments.

use crate::bindings::resource::Bindable;
use crate::bindings::resource_tracking::{MutationGuard, ResourceTracker, SlotRef};
use crate::bindings::visible_to::{SlotKind, TextureUsage};
use crate::error::RejectReason;
use crate::native::NativeHandle;

/// A GPU texture as seen by the binding engine.
///
/// The usage decides which slots it may occupy: shader-resource slots need
/// [`TextureUsage::SAMPLED`], render-target and depth-stencil slots need the matching
/// attachment usage.
#[derive(Debug)]
pub struct Texture {
    tracker: ResourceTracker,
    native: NativeHandle,
    usage: TextureUsage,
    width: u32,
    height: u32,
}

impl Texture {
    pub fn new(label: &str, native: NativeHandle, usage: TextureUsage, width: u32, height: u32) -> Self {
        Texture {
            tracker: ResourceTracker::new(label),
            native,
            usage,
            width,
            height,
        }
    }

    /// The usages the texture was created with.
    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Begins an upload.  The new version is published when the guard drops.
    pub fn write(&self) -> MutationGuard<'_> {
        self.tracker.begin_mutation()
    }
}

impl Bindable for Texture {
    fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    fn native(&self) -> NativeHandle {
        self.native
    }

    fn check_attach(&self, slot: SlotRef) -> Result<(), RejectReason> {
        match slot.kind {
            SlotKind::ShaderResource | SlotKind::RenderTarget | SlotKind::DepthStencil => {
                if self.usage.permits(slot.kind) {
                    Ok(())
                } else {
                    Err(RejectReason::MissingUsage)
                }
            }
            _ => Err(RejectReason::WrongKind),
        }
    }
}
