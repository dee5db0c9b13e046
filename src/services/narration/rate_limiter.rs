//! Narration Rate Limiter
//!
//! FIFO queue of async tasks drained by a single loop that enforces both a
//! sliding-window ceiling (`max_calls_per_minute` starts per `window`) and an
//! even spacing of `window / max_calls_per_minute` between consecutive starts.
//!
//! ## Concurrency
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! await. At most one drain loop runs at a time; the `processing` latch is set
//! and cleared under the same lock that guards the queue, so a task enqueued
//! while the loop is exiting is never stranded.
//!
//! Each task runs in its own spawned tokio task and is awaited before the next
//! one starts. A task that panics only aborts its own caller.

use futures_util::future::BoxFuture;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::Instant;

/// Default calls allowed per window.
pub const DEFAULT_MAX_CALLS_PER_MINUTE: u32 = 10;

/// Default sliding window.
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

/// Limiter-level failures. A task's own errors are returned inside `Ok`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RateLimiterError {
    #[error("Rate limiter queue is full ({capacity} pending)")]
    QueueFull { capacity: usize },

    /// The task panicked or was dropped before producing a value
    #[error("Rate-limited task aborted before completing")]
    TaskAborted,
}

/// Limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    pub max_calls_per_minute: u32,
    pub window: Duration,
    /// `None` leaves the queue unbounded
    pub max_queue_len: Option<usize>,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_calls_per_minute: DEFAULT_MAX_CALLS_PER_MINUTE,
            window: DEFAULT_WINDOW,
            max_queue_len: None,
        }
    }
}

impl RateLimiterConfig {
    /// Minimum spacing between two consecutive starts.
    pub fn min_interval(&self) -> Duration {
        self.window / self.max_calls_per_minute.max(1)
    }
}

type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

struct State {
    queue: VecDeque<Job>,
    /// Start times inside the current window, oldest first
    timestamps: VecDeque<Instant>,
    processing: bool,
}

impl State {
    fn purge(&mut self, now: Instant, window: Duration) {
        while let Some(&oldest) = self.timestamps.front() {
            if now.saturating_duration_since(oldest) >= window {
                self.timestamps.pop_front();
            } else {
                break;
            }
        }
    }
}

/// What the drain loop does next.
enum Next {
    Idle,
    Wait(Duration),
    Run(Job),
}

struct Inner {
    config: RateLimiterConfig,
    state: Mutex<State>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        // Jobs never run under the lock, so a poisoned guard still holds
        // consistent state.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next(&self) -> Next {
        let mut state = self.lock();
        let now = Instant::now();
        state.purge(now, self.config.window);

        if state.queue.is_empty() {
            state.processing = false;
            return Next::Idle;
        }

        let max = self.config.max_calls_per_minute.max(1) as usize;
        if state.timestamps.len() >= max {
            if let Some(&oldest) = state.timestamps.front() {
                let age = now.saturating_duration_since(oldest);
                return Next::Wait(self.config.window.saturating_sub(age));
            }
        }

        if let Some(&last) = state.timestamps.back() {
            let since_last = now.saturating_duration_since(last);
            let interval = self.config.min_interval();
            if since_last < interval {
                return Next::Wait(interval - since_last);
            }
        }

        match state.queue.pop_front() {
            Some(job) => {
                state.timestamps.push_back(now);
                Next::Run(job)
            }
            None => {
                state.processing = false;
                Next::Idle
            }
        }
    }

    async fn drain(self: Arc<Self>) {
        tracing::debug!("rate limiter: drain loop started");
        loop {
            match self.next() {
                Next::Idle => break,
                Next::Wait(delay) => {
                    tracing::debug!(delay_ms = delay.as_millis() as u64, "rate limiter: waiting");
                    tokio::time::sleep(delay).await;
                }
                Next::Run(job) => {
                    if let Err(e) = tokio::spawn(job()).await {
                        tracing::warn!(error = %e, "rate limiter: task aborted");
                    }
                }
            }
        }
        tracing::debug!("rate limiter: drain loop idle");
    }
}

/// Throttles async tasks to a per-window quota with FIFO fairness.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("config", &self.inner.config)
            .field("queue_length", &self.queue_length())
            .finish()
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(RateLimiterConfig::default())
    }
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    timestamps: VecDeque::new(),
                    processing: false,
                }),
            }),
        }
    }

    pub fn config(&self) -> &RateLimiterConfig {
        &self.inner.config
    }

    /// Enqueue `task` and return a future resolving to its output.
    ///
    /// The task is queued when `execute` is called, not when the returned
    /// future is first polled, so call order is start order. Must be called
    /// from within a tokio runtime.
    pub fn execute<F, Fut, T>(
        &self,
        task: F,
    ) -> impl Future<Output = Result<T, RateLimiterError>> + Send + 'static
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let enqueued = self.enqueue(task);
        async move {
            let rx = enqueued?;
            rx.await.map_err(|_| RateLimiterError::TaskAborted)
        }
    }

    fn enqueue<F, Fut, T>(&self, task: F) -> Result<oneshot::Receiver<T>, RateLimiterError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let output = task().await;
                // Caller may have stopped waiting
                let _ = tx.send(output);
            })
        });

        let start_drain = {
            let mut state = self.inner.lock();
            if let Some(capacity) = self.inner.config.max_queue_len {
                if state.queue.len() >= capacity {
                    tracing::warn!(capacity, "rate limiter: queue full, rejecting task");
                    return Err(RateLimiterError::QueueFull { capacity });
                }
            }
            state.queue.push_back(job);
            !std::mem::replace(&mut state.processing, true)
        };

        if start_drain {
            tokio::spawn(Arc::clone(&self.inner).drain());
        }

        Ok(rx)
    }

    /// Calls still available in the current window.
    pub fn remaining_calls(&self) -> u32 {
        let mut state = self.inner.lock();
        state.purge(Instant::now(), self.inner.config.window);
        let used = u32::try_from(state.timestamps.len()).unwrap_or(u32::MAX);
        self.inner.config.max_calls_per_minute.saturating_sub(used)
    }

    /// Tasks queued but not yet started.
    pub fn queue_length(&self) -> usize {
        self.inner.lock().queue.len()
    }
}
