// SPDX-License-Identifier: Parity-7.0.0 OR PolyForm-Noncommercial-1.0.0
//! Version and attachment tracking for bindable resources
//!
//! Every bindable resource owns a [`ResourceTracker`].  The tracker carries two pieces of
//! state that the binding engine relies on:
//!
//! - a content **version**, bumped exactly once per GPU-visible mutation.  This is the only
//!   signal that crosses threads: a loader thread may mutate a resource and publish a new
//!   version while the render thread diffs slots against it.
//! - the list of **attachments**, the slots that currently hold the resource.  Slots do not
//!   own resources; the attachment list is the sole authority for "is anyone still using me",
//!   consulted by the destruction path before the GPU object is released.
//!
//! # Publication
//!
//! Writers make their changes first and bump the version last.  The bump uses `Release`
//! ordering and readers load the version with `Acquire` ordering, so a reader that observes
//! version `n` also observes every write that preceded the `n`th publication.
//!
//! ```
//! use binds_and_layouts::bindings::resource_tracking::ResourceTracker;
//!
//! let tracker = ResourceTracker::new("streamed mesh");
//! assert_eq!(tracker.version(), 0);
//! {
//!     let _mutation = tracker.begin_mutation();
//!     // write new content here
//! }
//! assert_eq!(tracker.version(), 1);
//! ```

use crate::bindings::dirty_tracking::SharedWake;
use crate::bindings::visible_to::{SlotKind, StageKind};
use std::fmt::{Debug, Display, Formatter};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

static NEXT_PIPELINE_ID: AtomicU32 = AtomicU32::new(1);

/// Identifies one pipeline instance, so that slot references from different
/// pipelines never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineId(u32);

impl PipelineId {
    pub(crate) fn next() -> Self {
        PipelineId(NEXT_PIPELINE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub const fn get(self) -> u32 {
        self.0
    }
}

/// A compact, non-owning reference to one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotRef {
    pub pipeline: PipelineId,
    pub stage: StageKind,
    pub kind: SlotKind,
    pub index: u32,
}

impl Display for SlotRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?}/{:?}[{}] of pipeline {}",
            self.stage,
            self.kind,
            self.index,
            self.pipeline.get()
        )
    }
}

/// Locks a tracker mutex.  The guarded lists stay consistent across a panic
/// (every mutation is a single push or remove), so poisoning is ignored.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks the content version and the attachments of one resource.
///
/// # Thread Safety
///
/// All methods take `&self`.  Version reads and publications may happen on any thread.
/// Attachment changes happen on the render thread during a bind pass.
pub struct ResourceTracker {
    label: String,
    version: AtomicU32,
    attachments: Mutex<Vec<SlotRef>>,
    waiters: Mutex<Vec<Arc<SharedWake>>>,
}

impl Debug for ResourceTracker {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourceTracker")
            .field("label", &self.label)
            .field("version", &self.version)
            .field("attachments", &lock(&self.attachments).len())
            .finish()
    }
}

impl ResourceTracker {
    /// Creates a tracker at version 0 with no attachments.
    pub fn new(label: impl Into<String>) -> Self {
        ResourceTracker {
            label: label.into(),
            version: AtomicU32::new(0),
            attachments: Mutex::new(Vec::new()),
            waiters: Mutex::new(Vec::new()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The most recently published content version.
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }

    /// Publishes a content change and returns the new version.
    ///
    /// Call this after the change is fully written.  Prefer [`Self::begin_mutation`],
    /// which publishes when its guard drops.
    ///
    /// # Panics
    ///
    /// Panics if the version counter would wrap, since versions never decrease.
    pub fn publish(&self) -> u32 {
        // stored only if the increment does not wrap
        let previous = match self
            .version
            .fetch_update(Ordering::Release, Ordering::Relaxed, |version| version.checked_add(1))
        {
            Ok(previous) => previous,
            Err(_) => panic!("version counter of {} overflowed", self.label),
        };
        self.wake_waiters();
        previous + 1
    }

    /// Starts a content mutation.  The version is bumped exactly once, when the
    /// returned guard is dropped.
    pub fn begin_mutation(&self) -> MutationGuard<'_> {
        MutationGuard { tracker: self }
    }

    pub(crate) fn attach(&self, slot: SlotRef) {
        let mut attachments = lock(&self.attachments);
        debug_assert!(
            !attachments.contains(&slot),
            "{} already attached to {slot}",
            self.label
        );
        attachments.push(slot);
    }

    /// Removes `slot` from the attachment list.  Returns false if it was not attached.
    pub(crate) fn detach(&self, slot: SlotRef) -> bool {
        let mut attachments = lock(&self.attachments);
        match attachments.iter().position(|s| *s == slot) {
            Some(position) => {
                attachments.swap_remove(position);
                true
            }
            None => false,
        }
    }

    /// A snapshot of the slots currently holding this resource.
    pub fn attachments(&self) -> Vec<SlotRef> {
        lock(&self.attachments).clone()
    }

    pub fn attachment_count(&self) -> usize {
        lock(&self.attachments).len()
    }

    /// Whether any slot still holds this resource.  The destruction path must not
    /// release the GPU object while this is true.
    pub fn is_attached(&self) -> bool {
        !lock(&self.attachments).is_empty()
    }

    pub fn is_attached_to(&self, slot: SlotRef) -> bool {
        lock(&self.attachments).contains(&slot)
    }

    /// Resolves once the published version differs from `observed`, returning the
    /// version seen at that point.
    pub async fn changed_since(&self, observed: u32) -> u32 {
        loop {
            //isolate lock to a scope
            let receiver = {
                let mut waiters = lock(&self.waiters);
                let current = self.version();
                if current != observed {
                    return current;
                }
                let (sender, receiver) = r#continue::continuation();
                waiters.push(SharedWake::new(sender));
                receiver
            };
            receiver.await;
        }
    }

    /// Registers `wake` to fire on the next publication.
    ///
    /// Returns true instead of registering if the version already differs from
    /// `observed`.  The check and the registration happen under the waiter lock, which
    /// [`Self::publish`] also takes after bumping, so no publication is missed.
    pub(crate) fn register_wake(&self, observed: u32, wake: &Arc<SharedWake>) -> bool {
        let mut waiters = lock(&self.waiters);
        if self.version() != observed {
            return true;
        }
        waiters.retain(|w| w.is_pending());
        waiters.push(Arc::clone(wake));
        false
    }

    fn wake_waiters(&self) {
        let take = lock(&self.waiters).drain(..).collect::<Vec<_>>();
        for wake in take {
            wake.wake();
        }
    }
}

/// Publishes a new version of its resource when dropped.
#[derive(Debug)]
#[must_use = "the version is published when the guard drops"]
pub struct MutationGuard<'a> {
    tracker: &'a ResourceTracker,
}

impl Drop for MutationGuard<'_> {
    fn drop(&mut self) {
        self.tracker.publish();
    }
}
