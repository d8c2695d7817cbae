// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Fixed-size arrays of same-kind slots, bound with one ranged native call.
//!
//! [`BindSlotGroup::bind_all`] binds every slot in increasing index order and folds the
//! per-slot results into two inclusive ranges: the slots that changed, and the slots that
//! are bound afterwards.  The changed range is handed to the caller's `on_changed`
//! callback, which issues the single native "set N starting at X" call.  Unchanged slots
//! inside the range are simply re-sent; that costs less than a second native call.
//!
//! # Single-slot changes
//!
//! [`RangePolicy`] decides whether a group with exactly one changed slot invokes
//! `on_changed`.  The default, [`RangePolicy::Inclusive`], does.  [`RangePolicy::StrictLegacy`]
//! only invokes it for ranges of two or more slots and leaves single-slot changes to the
//! caller, who can find them through [`BindSlotGroup::has_changes`] and
//! [`BindSlotGroup::changed_range`].

use crate::bindings::bind_slot::{BindSlot, BindStats};
use crate::bindings::resource::Bindable;
use crate::bindings::resource_tracking::{PipelineId, SlotRef};
use crate::bindings::visible_to::{SlotKind, StageKind};
use crate::error::{BindRejected, SlotOverflow};
use crate::native::NativeHandle;
use std::ops::Range;
use std::sync::Arc;

/// The "no slot" value of the range fields.
const NONE: u32 = u32::MAX;

/// When [`BindSlotGroup::bind_all`] invokes its callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RangePolicy {
    /// Invoke whenever at least one slot changed.
    #[default]
    Inclusive,
    /// Invoke only when two or more slots span the changed range.
    StrictLegacy,
}

/// An inclusive range of slot indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRange {
    pub first: u32,
    pub last: u32,
}

impl SlotRange {
    pub fn len(&self) -> u32 {
        self.last - self.first + 1
    }

    pub fn contains(&self, index: u32) -> bool {
        self.first <= index && index <= self.last
    }

    /// The range as a half-open `usize` range, for slicing.
    pub fn as_range(&self) -> Range<usize> {
        self.first as usize..self.last as usize + 1
    }
}

/// A fixed-size run of slots of one kind in one stage, bound with a single ranged call.
///
/// The group is sized once from [`crate::config::PipelineLimits`] and never grows.  After
/// each [`Self::bind_all`] it remembers which slots changed and which are bound, so a
/// stage (or a caller inspecting the pass) can see exactly what the native call covered.
#[derive(Debug)]
pub struct BindSlotGroup<R: Bindable> {
    kind: SlotKind,
    slots: Vec<BindSlot<R>>,
    first_changed: u32,
    last_changed: u32,
    first_bound: u32,
    last_bound: u32,
    policy: RangePolicy,
}

impl<R: Bindable> BindSlotGroup<R> {
    /// Creates `count` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if `count` exceeds `limit`, the hardware slot count for this kind.
    pub fn new(pipeline: PipelineId, stage: StageKind, kind: SlotKind, count: u32, limit: u32) -> Self {
        Self::try_new(pipeline, stage, kind, count, limit).unwrap_or_else(|overflow| panic!("{overflow}"))
    }

    /// Like [`Self::new`], but returns the overflow instead of panicking.
    pub fn try_new(
        pipeline: PipelineId,
        stage: StageKind,
        kind: SlotKind,
        count: u32,
        limit: u32,
    ) -> Result<Self, SlotOverflow> {
        if count > limit {
            return Err(SlotOverflow {
                kind,
                index: count - 1,
                limit,
            });
        }
        let slots = (0..count)
            .map(|index| {
                BindSlot::new(
                    SlotRef {
                        pipeline,
                        stage,
                        kind,
                        index,
                    },
                    true,
                )
            })
            .collect();
        Ok(BindSlotGroup {
            kind,
            slots,
            first_changed: NONE,
            last_changed: NONE,
            first_bound: NONE,
            last_bound: NONE,
            policy: RangePolicy::default(),
        })
    }

    /// Sets how a single changed slot is reported by [`Self::bind_all`].
    pub fn with_policy(mut self, policy: RangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RangePolicy {
        self.policy
    }

    /// The kind shared by every slot of the group.
    pub fn kind(&self) -> SlotKind {
        self.kind
    }

    /// The number of slots, fixed at construction.
    pub fn len(&self) -> u32 {
        self.slots.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[BindSlot<R>] {
        &self.slots
    }

    pub fn slot(&self, index: u32) -> Option<&BindSlot<R>> {
        self.slots.get(index as usize)
    }

    /// # Panics
    ///
    /// Panics if `index` is not below the group size.
    pub fn slot_mut(&mut self, index: u32) -> &mut BindSlot<R> {
        match self.try_slot_mut(index) {
            Ok(slot) => slot,
            Err(overflow) => panic!("{overflow}"),
        }
    }

    /// Like [`Self::slot_mut`], but returns the overflow instead of panicking.
    pub fn try_slot_mut(&mut self, index: u32) -> Result<&mut BindSlot<R>, SlotOverflow> {
        let limit = self.len();
        let kind = self.kind;
        self.slots
            .get_mut(index as usize)
            .ok_or(SlotOverflow { kind, index, limit })
    }

    /// Requests `resource` for slot `index`.  Panics like [`Self::slot_mut`].
    pub fn set(&mut self, index: u32, resource: Option<Arc<R>>) {
        self.slot_mut(index).set(resource);
    }

    /// Changed slots of the last [`Self::bind_all`], if any.
    pub fn changed_range(&self) -> Option<SlotRange> {
        Self::range(self.first_changed, self.last_changed)
    }

    /// Slots bound after the last [`Self::bind_all`], if any.
    pub fn bound_range(&self) -> Option<SlotRange> {
        Self::range(self.first_bound, self.last_bound)
    }

    fn range(first: u32, last: u32) -> Option<SlotRange> {
        (first != NONE).then_some(SlotRange { first, last })
    }

    pub fn first_changed(&self) -> u32 {
        self.first_changed
    }

    pub fn last_changed(&self) -> u32 {
        self.last_changed
    }

    pub fn first_bound(&self) -> u32 {
        self.first_bound
    }

    pub fn last_bound(&self) -> u32 {
        self.last_bound
    }

    /// Whether any slot changed in the last [`Self::bind_all`], whatever the policy.
    pub fn has_changes(&self) -> bool {
        self.first_changed != NONE
    }

    /// Binds every slot and reports the changed range through `on_changed`.
    ///
    /// `on_changed` receives the inclusive changed range and the slots it covers, and is
    /// invoked at most once.  Returns true if it was invoked.
    pub fn bind_all<F>(&mut self, stats: &mut BindStats, on_changed: F) -> bool
    where
        F: FnOnce(SlotRange, &[BindSlot<R>]),
    {
        self.first_changed = NONE;
        self.last_changed = NONE;
        self.first_bound = NONE;
        self.last_bound = NONE;

        for (index, slot) in self.slots.iter_mut().enumerate() {
            let index = index as u32;
            if slot.bind(stats) {
                if self.first_changed == NONE {
                    self.first_changed = index;
                }
                self.last_changed = index;
            }
            if slot.bound().is_some() {
                if self.first_bound == NONE {
                    self.first_bound = index;
                }
                self.last_bound = index;
            }
        }

        let Some(changed) = self.changed_range() else {
            return false;
        };
        let invoke = match self.policy {
            RangePolicy::Inclusive => changed.first <= changed.last,
            RangePolicy::StrictLegacy => changed.first < changed.last,
        };
        if !invoke {
            logwise::trace_sync!(
                "single changed slot {index} left to the caller",
                index = changed.first
            );
            return false;
        }
        on_changed(changed, &self.slots[changed.as_range()]);
        stats.native_calls += 1;
        true
    }

    /// The refusal recorded on the lowest slot that has one.
    pub fn first_rejection(&self) -> Option<&BindRejected> {
        self.slots.iter().find_map(BindSlot::last_rejection)
    }

    /// Native handles of the bound resources in `slots`, `None` for empty slots.
    pub fn handles(slots: &[BindSlot<R>], out: &mut Vec<Option<NativeHandle>>) {
        out.clear();
        out.extend(slots.iter().map(|s| s.bound().map(|r| r.native())));
    }

    pub(crate) fn set_log_rejections(&mut self, log: bool) {
        for slot in &mut self.slots {
            slot.set_log_rejections(log);
        }
    }

    /// Forgets all bound state and requests.
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            slot.reset();
        }
        self.first_changed = NONE;
        self.last_changed = NONE;
        self.first_bound = NONE;
        self.last_bound = NONE;
    }
}
