// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! The common interface of everything that can occupy a slot.

use crate::bindings::resource_tracking::{ResourceTracker, SlotRef};
use crate::error::RejectReason;
use crate::native::NativeHandle;
use std::fmt::Debug;

/// A versioned GPU-visible object that can be attached to a slot.
///
/// Resources are created by the resource factory (outside this crate), shared through
/// `Arc`, and may be mutated from loader threads.  Slots hold them without owning them.
pub trait Bindable: Debug + Send + Sync + 'static {
    fn tracker(&self) -> &ResourceTracker;

    fn native(&self) -> NativeHandle;

    /// Validates an attachment request.  Called when the resource is first bound to
    /// `slot`, and again whenever its content version changes while bound.
    fn check_attach(&self, slot: SlotRef) -> Result<(), RejectReason>;

    fn version(&self) -> u32 {
        self.tracker().version()
    }

    fn label(&self) -> &str {
        self.tracker().label()
    }
}
