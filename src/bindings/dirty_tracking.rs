/*!
This module implements waiting on an aggregation of resources for a content change.

Resources publish new versions from whichever thread mutated them.  The render thread
usually just diffs versions on the next bind pass, but streaming code sometimes needs to
sleep until *something* it depends on has been republished.  [`ChangeAggregate`] does that
without polling.

A single one-shot continuation is shared by every resource in the aggregate; whichever
resource publishes first takes and fires it, the rest find it already spent.
*/

use crate::bindings::resource::Bindable;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

// This represents the shared state between the resources an aggregate waits on
pub(crate) struct SharedWake(Mutex<Option<r#continue::Sender<()>>>);

impl Debug for SharedWake {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SharedWake")
            .field(&self.is_pending())
            .finish()
    }
}

impl SharedWake {
    pub(crate) fn new(sender: r#continue::Sender<()>) -> Arc<Self> {
        Arc::new(SharedWake(Mutex::new(Some(sender))))
    }

    pub(crate) fn wake(&self) {
        let sender = self
            .0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            sender.send(());
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

/// Waits for any of several resources to publish a new version.
///
/// The aggregate remembers the version it last observed for each resource.  A wait
/// resolves as soon as any published version differs from its observation, then
/// re-observes all of them.
pub struct ChangeAggregate {
    watched: Vec<(Arc<dyn Bindable>, u32)>,
}

impl Debug for ChangeAggregate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.watched.iter().map(|(r, v)| (r.label(), *v)))
            .finish()
    }
}

impl Default for ChangeAggregate {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeAggregate {
    pub fn new() -> ChangeAggregate {
        ChangeAggregate {
            watched: Vec::new(),
        }
    }

    /// Adds `resource` to the aggregate, observing its current version.
    pub fn watch<R: Bindable>(&mut self, resource: Arc<R>) {
        let version = resource.version();
        let resource: Arc<dyn Bindable> = resource;
        self.watched.push((resource, version));
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }

    /// Re-observes the current version of every watched resource.
    pub fn observe(&mut self) {
        for (resource, observed) in &mut self.watched {
            *observed = resource.version();
        }
    }

    /// Waits for a content change, returning the index (in watch order) of the first
    /// resource found changed.
    ///
    /// # Panics
    ///
    /// Panics if nothing is watched, since such a wait could never resolve.
    pub async fn wait_for_change(&mut self) -> usize {
        assert!(
            !self.watched.is_empty(),
            "waiting for a change on an empty aggregate"
        );
        loop {
            let (sender, receiver) = r#continue::continuation();
            let wake = SharedWake::new(sender);
            //set continuation up first, checking versions under each tracker's lock
            let changed = self
                .watched
                .iter()
                .position(|(resource, observed)| resource.tracker().register_wake(*observed, &wake));
            if let Some(index) = changed {
                //spend the continuation so it is not left pending in other trackers
                wake.wake();
                self.observe();
                return index;
            }
            receiver.await;
        }
    }
}
