//! Spawn counters.

use metrics::Counter;

/// Spawned and finished counts for one kind of task.
#[derive(Clone, Debug)]
pub struct KindCounters {
    spawned: Counter,
    finished: Counter,
}

impl KindCounters {
    fn new(kind: &'static str) -> Self {
        Self {
            spawned: metrics::counter!("tasks.spawned_total", "kind" => kind),
            finished: metrics::counter!("tasks.finished_total", "kind" => kind),
        }
    }

    /// Count a spawn. The returned guard counts the finish when dropped,
    /// including when the task panics or is aborted.
    pub(crate) fn spawned(&self) -> FinishGuard {
        self.spawned.increment(1);
        FinishGuard(self.finished.clone())
    }
}

/// Counters for every task spawned through a [`crate::TaskExecutor`],
/// labelled by `kind`.
#[derive(Clone, Debug)]
pub struct TaskExecutorMetrics {
    pub(crate) regular: KindCounters,
    pub(crate) critical: KindCounters,
    /// Tasks handed a graceful shutdown signal. They are also counted as
    /// regular tasks.
    pub(crate) graceful: KindCounters,
}

impl Default for TaskExecutorMetrics {
    fn default() -> Self {
        Self {
            regular: KindCounters::new("regular"),
            critical: KindCounters::new("critical"),
            graceful: KindCounters::new("graceful"),
        }
    }
}

/// Increments the finished counter of a task when dropped.
pub(crate) struct FinishGuard(Counter);

impl Drop for FinishGuard {
    fn drop(&mut self) {
        self.0.increment(1);
    }
}
