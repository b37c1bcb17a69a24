//! Synchronous fan-out of observed scores.

use std::sync::Arc;

use parking_lot::RwLock;
use tally_primitives::Score;

/// A score passed through ingestion.
#[derive(Debug, Clone)]
pub struct ScoreEvent {
    pub score: Score,
    /// The score was for the current challenge map.
    pub on_current_map: bool,
    /// The score changed the current map's leaderboard.
    pub accepted: bool,
}

/// Receives every observed score.
///
/// Called synchronously from the ingesting task; implementations must not
/// block.
pub trait ScoreListener: Send + Sync + 'static {
    fn on_score(&self, event: &ScoreEvent);
}

impl<F> ScoreListener for F
where
    F: Fn(&ScoreEvent) + Send + Sync + 'static,
{
    fn on_score(&self, event: &ScoreEvent) {
        self(event)
    }
}

/// Handle returned by [`ListenerSet::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Inner {
    next_id: u64,
    entries: Vec<(ListenerId, Arc<dyn ScoreListener>)>,
}

/// Registered listeners, invoked in registration order.
#[derive(Default)]
pub(crate) struct ListenerSet {
    inner: RwLock<Inner>,
}

impl ListenerSet {
    pub(crate) fn subscribe(&self, listener: Arc<dyn ScoreListener>) -> ListenerId {
        let mut inner = self.inner.write();
        let id = ListenerId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push((id, listener));
        id
    }

    /// Returns false if `id` was not registered.
    pub(crate) fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut inner = self.inner.write();
        let before = inner.entries.len();
        inner.entries.retain(|(entry, _)| *entry != id);
        inner.entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub(crate) fn emit(&self, event: &ScoreEvent) {
        // Snapshot so listeners may (un)subscribe from inside a callback.
        let listeners: Vec<Arc<dyn ScoreListener>> = self
            .inner
            .read()
            .entries
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener.on_score(event);
        }
    }
}
