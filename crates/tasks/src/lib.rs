//! Named tokio tasks with a shared shutdown signal.
//!
//! [`TaskManager`] owns the shutdown signal; cloneable [`TaskExecutor`]s spawn
//! tasks that can wait on it. Tasks spawned through
//! [`TaskExecutor::spawn_with_graceful_shutdown_signal`] receive a
//! [`GracefulShutdown`] future and hold its guard while they finish their
//! current unit of work; [`TaskManager::graceful_shutdown_with_timeout`] waits
//! for every guard to drop.

mod metrics;

pub use crate::metrics::{KindCounters, TaskExecutorMetrics};

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error};

/// Counts tasks still holding a graceful shutdown token.
#[derive(Debug, Default)]
struct GracefulCounter {
    pending: AtomicUsize,
    drained: Notify,
}

/// Token held by a graceful task until it finishes.
#[derive(Debug)]
struct GracefulToken(Arc<GracefulCounter>);

impl GracefulToken {
    fn new(counter: Arc<GracefulCounter>) -> Self {
        counter.pending.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for GracefulToken {
    fn drop(&mut self) {
        if self.0.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.drained.notify_waiters();
        }
    }
}

/// Owns the shutdown signal for all executors created from it.
#[derive(Debug)]
pub struct TaskManager {
    handle: Handle,
    shutdown_tx: watch::Sender<bool>,
    graceful: Arc<GracefulCounter>,
    metrics: TaskExecutorMetrics,
}

impl TaskManager {
    /// Create a manager bound to the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    pub fn new(handle: Handle) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            handle,
            shutdown_tx,
            graceful: Arc::default(),
            metrics: TaskExecutorMetrics::default(),
        }
    }

    /// Returns a new executor that spawns onto this manager's runtime.
    pub fn executor(&self) -> TaskExecutor {
        TaskExecutor {
            handle: self.handle.clone(),
            shutdown_tx: self.shutdown_tx.clone(),
            graceful: Arc::clone(&self.graceful),
            metrics: self.metrics.clone(),
        }
    }

    /// Fire the shutdown signal without waiting.
    pub fn fire_shutdown_signal(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Fire the shutdown signal and wait until every graceful task has
    /// released its guard, or `timeout` elapses. Returns true if all tasks
    /// finished in time.
    pub async fn graceful_shutdown_with_timeout(self, timeout: Duration) -> bool {
        self.fire_shutdown_signal();

        let graceful = Arc::clone(&self.graceful);
        let drained = async move {
            loop {
                let notified = graceful.drained.notified();
                if graceful.pending.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        };

        match tokio::time::timeout(timeout, drained).await {
            Ok(()) => {
                debug!("All graceful tasks finished");
                true
            }
            Err(_) => {
                error!(
                    pending = self.graceful.pending.load(Ordering::SeqCst),
                    "Graceful shutdown timed out"
                );
                false
            }
        }
    }
}

/// Cloneable task spawner.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    handle: Handle,
    shutdown_tx: watch::Sender<bool>,
    graceful: Arc<GracefulCounter>,
    metrics: TaskExecutorMetrics,
}

impl TaskExecutor {
    /// Spawn a named task.
    pub fn spawn<F>(&self, name: &'static str, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let finished = self.metrics.regular.spawned();

        self.handle.spawn(
            async move {
                let _finished = finished;
                fut.await;
            }
            .instrument(tracing::debug_span!("task", name)),
        )
    }

    /// Spawn a task whose panic fires the shutdown signal.
    pub fn spawn_critical<F>(&self, name: &'static str, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let finished = self.metrics.critical.spawned();
        let shutdown_tx = self.shutdown_tx.clone();

        self.handle.spawn(
            async move {
                let _finished = finished;
                if AssertUnwindSafe(fut).catch_unwind().await.is_err() {
                    error!(task = name, "Critical task panicked, shutting down");
                    shutdown_tx.send_replace(true);
                }
            }
            .instrument(tracing::debug_span!("critical_task", name)),
        )
    }

    /// Spawn a task that is handed a [`GracefulShutdown`] future.
    ///
    /// The guard produced by the future must be held until the task has
    /// finished its in-flight work.
    pub fn spawn_with_graceful_shutdown_signal<F, Fut>(
        &self,
        name: &'static str,
        f: F,
    ) -> JoinHandle<()>
    where
        F: FnOnce(GracefulShutdown) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let finished = self.metrics.graceful.spawned();
        let shutdown = GracefulShutdown::new(
            self.shutdown_tx.subscribe(),
            GracefulToken::new(Arc::clone(&self.graceful)),
        );
        let fut = f(shutdown);
        self.spawn(name, async move {
            let _finished = finished;
            fut.await;
        })
    }

    /// Returns true once the shutdown signal has fired.
    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Resolves once the shutdown signal has fired, e.g. after a critical
    /// task panicked.
    pub async fn wait_for_shutdown(&self) {
        let mut rx = self.shutdown_tx.subscribe();
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

/// Resolves to a [`GracefulShutdownGuard`] once shutdown is signalled.
pub struct GracefulShutdown {
    wait: Pin<Box<dyn Future<Output = ()> + Send>>,
    token: Option<GracefulToken>,
}

impl std::fmt::Debug for GracefulShutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GracefulShutdown").finish_non_exhaustive()
    }
}

impl GracefulShutdown {
    fn new(mut rx: watch::Receiver<bool>, token: GracefulToken) -> Self {
        let wait = async move {
            // A closed channel means the manager is gone: treat as shutdown.
            let _ = rx.wait_for(|fired| *fired).await;
        };
        Self {
            wait: Box::pin(wait),
            token: Some(token),
        }
    }
}

impl Future for GracefulShutdown {
    type Output = GracefulShutdownGuard;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.wait.as_mut().poll(cx) {
            Poll::Ready(()) => Poll::Ready(GracefulShutdownGuard(self.token.take())),
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Held by a task while it finishes work after shutdown was signalled.
#[derive(Debug)]
#[must_use = "dropping the guard signals that the task has finished"]
pub struct GracefulShutdownGuard(#[allow(dead_code)] Option<GracefulToken>);

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use super::*;

    #[tokio::test]
    async fn test_graceful_task_stops_on_signal() {
        let manager = TaskManager::current();
        let executor = manager.executor();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        executor.spawn_with_graceful_shutdown_signal("test", |shutdown| async move {
            let guard = shutdown.await;
            tokio::time::sleep(Duration::from_millis(10)).await;
            flag.store(true, Ordering::SeqCst);
            drop(guard);
        });

        assert!(!executor.is_shutting_down());
        assert!(manager.graceful_shutdown_with_timeout(Duration::from_secs(5)).await);
        assert!(finished.load(Ordering::SeqCst));
        assert!(executor.is_shutting_down());
    }

    #[tokio::test]
    async fn test_finished_task_does_not_block_shutdown() {
        let manager = TaskManager::current();
        let executor = manager.executor();

        let handle = executor.spawn_with_graceful_shutdown_signal("short", |_shutdown| async {});
        handle.await.unwrap();

        assert!(manager.graceful_shutdown_with_timeout(Duration::from_millis(100)).await);
    }

    #[tokio::test]
    async fn test_critical_panic_fires_shutdown() {
        let manager = TaskManager::current();
        let executor = manager.executor();

        executor
            .spawn_critical("panics", async { panic!("boom") })
            .await
            .unwrap();

        assert!(executor.is_shutting_down());
        tokio::time::timeout(Duration::from_secs(1), executor.wait_for_shutdown())
            .await
            .unwrap();
    }
}
