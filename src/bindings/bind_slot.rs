// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! A single pipeline attachment point.
//!
//! The renderer writes the *requested* resource with [`BindSlot::set`], which is cheap and
//! never reaches the driver.  Immediately before a draw, [`BindSlot::bind`] compares the
//! request against what was last bound:
//!
//! - a different resource (by `Arc` identity), or an unbind, is a change;
//! - the same resource with a different content version is a change;
//! - anything else is not, and costs no native call.
//!
//! A resource may refuse the slot ([`Bindable::check_attach`]).  The slot is then left
//! unbound and the refusal is retried on every pass, but only logged once until the slot
//! binds successfully or the request changes.  If the refusal displaced a bound resource,
//! the pass reports the slot as changed so the native slot is cleared too.

use crate::bindings::resource::Bindable;
use crate::bindings::resource_tracking::SlotRef;
use crate::bindings::visible_to::SlotDirection;
use crate::error::{BindRejected, RejectReason};
use std::sync::Arc;

/// Cumulative counters for bind passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BindStats {
    /// Slots whose bound state changed.
    pub slot_binds: u64,
    /// Native calls issued.
    pub native_calls: u64,
    /// Attachment requests refused by a resource.
    pub rejections: u64,
    /// Input layouts created on a cache miss.
    pub layouts_created: u64,
    /// Input layout consultations served from the cache.
    pub layouts_reused: u64,
}

fn same_identity<R>(a: Option<&Arc<R>>, b: Option<&Arc<R>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        (None, None) => true,
        _ => false,
    }
}

/// One attachment point of a pipeline stage, holding at most one resource of type `R`.
///
/// The slot keeps two values apart: the resource *requested* by the renderer and the
/// resource *bound* by the last pass, together with the content version it was bound at.
/// While a resource is bound, its tracker lists this slot among its attachments.  Slots
/// are created by their stage or [`crate::bindings::BindSlotGroup`]; they detach whatever
/// they hold when dropped.
#[derive(Debug)]
pub struct BindSlot<R: Bindable> {
    id: SlotRef,
    requested: Option<Arc<R>>,
    bound: Option<Arc<R>>,
    bound_version: u32,
    direction: SlotDirection,
    group_member: bool,
    rejection: Option<BindRejected>,
    log_rejections: bool,
}

impl<R: Bindable> BindSlot<R> {
    pub(crate) fn new(id: SlotRef, group_member: bool) -> Self {
        BindSlot {
            id,
            requested: None,
            bound: None,
            bound_version: 0,
            direction: id.kind.direction(),
            group_member,
            rejection: None,
            log_rejections: true,
        }
    }

    /// Where this slot lives: pipeline, stage, kind and index.
    pub fn id(&self) -> SlotRef {
        self.id
    }

    pub fn index(&self) -> u32 {
        self.id.index
    }

    /// Whether the slot is read by shaders or written as an output.
    pub fn direction(&self) -> SlotDirection {
        self.direction
    }

    /// Whether this slot is bound as part of a ranged group call.
    pub fn is_group_member(&self) -> bool {
        self.group_member
    }

    /// Requests `resource` for the next bind pass.  `None` requests an unbind.
    pub fn set(&mut self, resource: Option<Arc<R>>) {
        if !same_identity(self.requested.as_ref(), resource.as_ref()) {
            self.rejection = None;
        }
        self.requested = resource;
    }

    /// Requests a shared `resource`, cloning the `Arc`.
    pub fn request(&mut self, resource: &Arc<R>) {
        self.set(Some(Arc::clone(resource)));
    }

    /// Requests an unbind.
    pub fn clear(&mut self) {
        self.set(None);
    }

    pub fn requested(&self) -> Option<&Arc<R>> {
        self.requested.as_ref()
    }

    /// The resource the native slot holds after the last pass.
    pub fn bound(&self) -> Option<&Arc<R>> {
        self.bound.as_ref()
    }

    /// The content version observed when the bound resource was last bound.
    pub fn bound_version(&self) -> u32 {
        self.bound_version
    }

    /// The refusal of the current episode, if the requested resource refused this slot.
    pub fn last_rejection(&self) -> Option<&BindRejected> {
        self.rejection.as_ref()
    }

    /// Whether the next [`Self::bind`] would report a change (ignoring refusals).
    pub fn is_dirty(&self) -> bool {
        if !same_identity(self.requested.as_ref(), self.bound.as_ref()) {
            return true;
        }
        match &self.requested {
            Some(requested) => requested.version() != self.bound_version,
            None => false,
        }
    }

    pub(crate) fn set_log_rejections(&mut self, log: bool) {
        self.log_rejections = log;
    }

    /// Brings the bound state in line with the request.
    ///
    /// Returns true if the bound state changed and the slot needs a native call.  A
    /// refusal that displaces a bound resource is a change to unbound, so the native slot
    /// is cleared rather than left holding a handle its tracker no longer reports.
    pub fn bind(&mut self, stats: &mut BindStats) -> bool {
        if !same_identity(self.requested.as_ref(), self.bound.as_ref()) {
            let displaced = self.bound.take();
            if let Some(previous) = &displaced {
                previous.tracker().detach(self.id);
            }
            let Some(requested) = self.requested.clone() else {
                self.bound_version = 0;
                stats.slot_binds += 1;
                return true;
            };
            // Read the version before validating, so a publication racing with the
            // check is seen again on the next pass.
            let version = requested.version();
            if let Err(reason) = requested.check_attach(self.id) {
                self.bound_version = 0;
                self.reject(&requested, reason, stats);
                if displaced.is_none() {
                    return false;
                }
                stats.slot_binds += 1;
                return true;
            }
            requested.tracker().attach(self.id);
            self.bound = Some(requested);
            self.bound_version = version;
            self.rejection = None;
            stats.slot_binds += 1;
            true
        } else if let Some(requested) = &self.requested {
            let version = requested.version();
            if version == self.bound_version {
                return false;
            }
            let requested = Arc::clone(requested);
            if let Err(reason) = requested.check_attach(self.id) {
                requested.tracker().detach(self.id);
                self.bound = None;
                self.bound_version = 0;
                self.reject(&requested, reason, stats);
                stats.slot_binds += 1;
                return true;
            }
            self.bound_version = version;
            stats.slot_binds += 1;
            true
        } else {
            false
        }
    }

    fn reject(&mut self, resource: &Arc<R>, reason: RejectReason, stats: &mut BindStats) {
        stats.rejections += 1;
        if self.rejection.is_some() {
            return;
        }
        let rejected = BindRejected {
            slot: self.id,
            label: resource.label().to_owned(),
            reason,
        };
        if self.log_rejections {
            logwise::warn_sync!("{rejected}", rejected = logwise::privacy::LogIt(&rejected));
        }
        self.rejection = Some(rejected);
    }

    /// Forgets the bound state and the request, detaching the bound resource.
    pub(crate) fn reset(&mut self) {
        if let Some(bound) = self.bound.take() {
            bound.tracker().detach(self.id);
        }
        self.requested = None;
        self.bound_version = 0;
        self.rejection = None;
    }
}

impl<R: Bindable> Drop for BindSlot<R> {
    fn drop(&mut self) {
        if let Some(bound) = self.bound.take() {
            bound.tracker().detach(self.id);
        }
    }
}
