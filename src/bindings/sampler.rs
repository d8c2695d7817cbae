// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Samplers and the device-wide sampler cache.
//!
//! Sampler state is immutable and usually shared: two materials asking for "linear,
//! repeat" should get the same native object.  [`SamplerCache`] is the explicit bank that
//! deduplicates them.  It is owned by whoever owns the device and passed by reference.

use crate::bindings::resource::Bindable;
use crate::bindings::resource_tracking::{ResourceTracker, SlotRef};
use crate::bindings::visible_to::SlotKind;
use crate::error::RejectReason;
use crate::native::NativeHandle;
use rustc_hash::FxHashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
    /// Anisotropic filtering with the given maximum anisotropy.
    Anisotropic(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    Clamp,
    Repeat,
    Mirror,
}

/// The full description of a sampler; equal descriptions share one sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SamplerDescription {
    pub filter: FilterMode,
    pub address: AddressMode,
    /// Whether the sampler performs depth comparison.
    pub comparison: bool,
}

#[derive(Debug)]
pub struct Sampler {
    tracker: ResourceTracker,
    native: NativeHandle,
    description: SamplerDescription,
}

impl Sampler {
    pub fn new(native: NativeHandle, description: SamplerDescription) -> Self {
        Sampler {
            tracker: ResourceTracker::new(format!("{description:?}")),
            native,
            description,
        }
    }

    pub fn description(&self) -> SamplerDescription {
        self.description
    }
}

impl Bindable for Sampler {
    fn tracker(&self) -> &ResourceTracker {
        &self.tracker
    }

    fn native(&self) -> NativeHandle {
        self.native
    }

    fn check_attach(&self, slot: SlotRef) -> Result<(), RejectReason> {
        match slot.kind {
            SlotKind::Sampler => Ok(()),
            _ => Err(RejectReason::WrongKind),
        }
    }
}

/// Deduplicates samplers by description.
#[derive(Debug, Default)]
pub struct SamplerCache {
    samplers: FxHashMap<SamplerDescription, Arc<Sampler>>,
}

impl SamplerCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the sampler for `description`, calling `create` to make the native object
    /// only if no such sampler exists yet.
    pub fn get_or_create(
        &mut self,
        description: SamplerDescription,
        create: impl FnOnce(&SamplerDescription) -> NativeHandle,
    ) -> Arc<Sampler> {
        self.samplers
            .entry(description)
            .or_insert_with(|| {
                let native = create(&description);
                logwise::info_sync!(
                    "Created sampler {description}",
                    description = logwise::privacy::LogIt(&description)
                );
                Arc::new(Sampler::new(native, description))
            })
            .clone()
    }

    pub fn len(&self) -> usize {
        self.samplers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samplers.is_empty()
    }

    /// Drops the cache's references.  Samplers still held by slots stay alive.
    pub fn clear(&mut self) {
        self.samplers.clear();
    }
}
