//! Cancellable delayed tasks
//!
//! One pending task per key. Scheduling under an existing key replaces the
//! old task; cancelling is idempotent. A task that fails is logged at
//! `error` and counted, never retried.

use dashmap::DashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

struct ScheduledTask {
    generation: u64,
    token: CancellationToken,
}

#[derive(Default)]
struct Inner {
    tasks: DashMap<String, ScheduledTask>,
    generation: AtomicU64,
    failures: AtomicU64,
    completed: AtomicU64,
}

/// Delayed task queue keyed by order id
#[derive(Clone)]
pub struct TaskScheduler {
    inner: Arc<Inner>,
    /// Parent token: cancelling it cancels everything still pending
    shutdown: CancellationToken,
}

impl TaskScheduler {
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            inner: Arc::new(Inner::default()),
            shutdown,
        }
    }

    /// Run `task` after `delay` unless cancelled first
    pub fn schedule<F, Fut, E>(&self, key: &str, delay: Duration, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let token = self.shutdown.child_token();

        if let Some(previous) = self.inner.tasks.insert(
            key.to_string(),
            ScheduledTask {
                generation,
                token: token.clone(),
            },
        ) {
            previous.token.cancel();
        }

        let inner = self.inner.clone();
        let key = key.to_string();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(key = %key, "Scheduled task cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    match task().await {
                        Ok(()) => {
                            inner.completed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            inner.failures.fetch_add(1, Ordering::Relaxed);
                            tracing::error!(key = %key, error = %e, "Scheduled task failed");
                        }
                    }
                }
            }
            inner
                .tasks
                .remove_if(&key, |_, scheduled| scheduled.generation == generation);
        });
    }

    /// Cancel the pending task for `key`. Returns true if one was pending.
    pub fn cancel(&self, key: &str) -> bool {
        match self.inner.tasks.remove(key) {
            Some((_, scheduled)) => {
                scheduled.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, key: &str) -> bool {
        self.inner.tasks.contains_key(key)
    }

    pub fn pending(&self) -> usize {
        self.inner.tasks.len()
    }

    pub fn failures(&self) -> u64 {
        self.inner.failures.load(Ordering::Relaxed)
    }

    pub fn completed(&self) -> u64 {
        self.inner.completed.load(Ordering::Relaxed)
    }
}
