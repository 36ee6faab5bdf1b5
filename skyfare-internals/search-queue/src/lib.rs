//! Skyfare Search Queue
//! Copyright (c) 2026 Mamy Ratsimbazafy
//! Licensed and distributed under either of
//!   * MIT license (license terms at the root of the package or at http://opensource.org/licenses/MIT).
//!   * Apache v2 license (license terms at the root of the package or at http://www.apache.org/licenses/LICENSE-2.0).
//! at your option. This file may not be copied, modified, or distributed except according to those terms.

//! skyfare-internals/search-queue
//! A work queue for calls to external flight services: concurrency and QPS
//! limiting, opt-in retries with backoff and jitter, and latest-wins
//! sequencing so a slow, superseded search never overwrites a newer one.

mod sequencer;

pub use sequencer::{SearchSequencer, SearchTicket};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::sync::{Mutex, Notify};
use tokio::time;

/// Errors surfaced by the queue
#[derive(Debug, Error)]
pub enum SearchQueueError {
    #[error("request failed after {attempts} attempt(s): {source}")]
    Failed {
        attempts: u32,
        #[source]
        source: anyhow::Error,
    },
    #[error("queue is closed")]
    QueueClosed,
    #[error("response for search #{ticket} superseded by search #{latest}")]
    Superseded { ticket: u64, latest: u64 },
}

/// Rate limiting mode
#[derive(Clone, Debug, Default)]
enum RateLimit {
    #[default]
    ConcurrencyOnly,
    Qps {
        limit: u64,
        tokens: Arc<AtomicU64>,
        last_refill: Arc<Mutex<Instant>>,
        refill_interval: Duration,
        notify: Arc<Notify>,
    },
}

/// A queue that limits concurrent requests to an external service.
///
/// Retries are off by default: a failed call is reported to the caller, who
/// decides whether to retry. `with_max_retries` enables exponential backoff
/// with jitter for services whose contract allows it.
///
/// # Examples
///
/// Concurrency only (4 concurrent requests):
/// ```ignore
/// let queue = SearchQueue::with_concurrency_limit(4);
/// ```
///
/// QPS limit (4 requests per second), two retries:
/// ```ignore
/// let queue = SearchQueue::with_qps_limit(4).with_max_retries(2);
/// ```
#[derive(Clone, Debug)]
pub struct SearchQueue {
    semaphore: Arc<Semaphore>,
    initial_delay: Duration,
    max_delay: Duration,
    jitter_factor: f64,
    max_retries: u32,
    exponential: bool,
    rate_limit: RateLimit,
}

impl Default for SearchQueue {
    fn default() -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(4)),
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(30000),
            jitter_factor: 0.5,
            max_retries: 0,
            exponential: true,
            rate_limit: RateLimit::ConcurrencyOnly,
        }
    }
}

impl SearchQueue {
    /// Create a queue with max concurrent requests
    pub fn with_concurrency_limit(max_concurrent: u64) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent as usize)),
            ..Default::default()
        }
    }

    /// Create a queue with a QPS limit
    pub fn with_qps_limit(qps_limit: u64) -> Self {
        let qps_limit = qps_limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(qps_limit as usize)),
            rate_limit: RateLimit::Qps {
                limit: qps_limit,
                tokens: Arc::new(AtomicU64::new(qps_limit)),
                last_refill: Arc::new(Mutex::new(Instant::now())),
                refill_interval: Duration::from_secs(1),
                notify: Arc::new(Notify::new()),
            },
            ..Default::default()
        }
    }

    /// Allow up to `max_retries` extra attempts after a failure
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Override the first backoff delay (doubles on every retry)
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Disable jitter, mostly for deterministic tests
    pub fn without_jitter(mut self) -> Self {
        self.jitter_factor = 0.0;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Refill tokens based on elapsed time
    async fn refill_tokens(&self) {
        match &self.rate_limit {
            RateLimit::ConcurrencyOnly => {}
            RateLimit::Qps {
                limit,
                tokens,
                last_refill,
                refill_interval,
                notify,
            } => {
                let mut last = last_refill.lock().await;
                let now = Instant::now();
                let elapsed = now.duration_since(*last);
                if elapsed >= *refill_interval {
                    let new_tokens = (elapsed.as_secs_f64() * *limit as f64) as u64;
                    if new_tokens > 0 {
                        let _ = tokens.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |cur| {
                            Some(cur.saturating_add(new_tokens).min(*limit))
                        });
                        notify.notify_waiters();
                    }
                    *last = now;
                }
            }
        }
    }

    // Take one token from the bucket, waiting on refills
    async fn acquire_token(&self) {
        match &self.rate_limit {
            RateLimit::ConcurrencyOnly => {}
            RateLimit::Qps { tokens, notify, .. } => loop {
                self.refill_tokens().await;
                let available = tokens.load(Ordering::SeqCst);
                if available > 0 {
                    if tokens
                        .compare_exchange(
                            available,
                            available - 1,
                            Ordering::SeqCst,
                            Ordering::SeqCst,
                        )
                        .is_ok()
                    {
                        return;
                    }
                } else {
                    let _ = time::timeout(Duration::from_millis(100), notify.notified()).await;
                }
            },
        }
    }

    /// Execute `f` under the queue's limits.
    ///
    /// With the default configuration `f` runs exactly once. When retries are
    /// enabled a failed attempt is retried with exponential backoff and jitter.
    pub async fn run<T, F, Fut>(&self, mut f: F) -> Result<T, SearchQueueError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, anyhow::Error>> + Send,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| SearchQueueError::QueueClosed)?;

        self.acquire_token().await;

        let mut attempts = 0;
        let mut delay = self.initial_delay;

        loop {
            attempts += 1;
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if attempts > self.max_retries {
                        return Err(SearchQueueError::Failed {
                            attempts,
                            source: e,
                        });
                    }

                    time::sleep(self.apply_jitter(delay)).await;

                    if self.exponential {
                        delay = std::cmp::min(delay * 2, self.max_delay);
                    }
                }
            }
        }
    }

    /// Execute `f` for `ticket` and drop the result if a newer search was
    /// issued on `sequencer` while it was in flight.
    pub async fn run_sequenced<T, F, Fut>(
        &self,
        sequencer: &SearchSequencer,
        ticket: SearchTicket,
        f: F,
    ) -> Result<T, SearchQueueError>
    where
        F: FnMut() -> Fut + Send,
        Fut: std::future::Future<Output = Result<T, anyhow::Error>> + Send,
    {
        let value = self.run(f).await?;
        sequencer.accept(ticket, value)
    }

    fn apply_jitter(&self, delay: Duration) -> Duration {
        if self.jitter_factor == 0.0 {
            return delay;
        }

        let jitter_ms = (delay.as_millis() as f64 * self.jitter_factor) as u64;
        let rand_jitter = rand::thread_rng().gen_range(0..=jitter_ms);

        Duration::from_millis(delay.as_millis() as u64 + rand_jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test]
    async fn test_single_attempt_by_default() {
        let queue = SearchQueue::with_concurrency_limit(2);
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result: Result<(), _> = queue
            .run(move || {
                let counter = counter.clone();
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Err(anyhow::anyhow!("service unavailable"))
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match result {
            Err(SearchQueueError::Failed { attempts, .. }) => assert_eq!(attempts, 1),
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let queue = SearchQueue::with_concurrency_limit(1)
            .with_max_retries(3)
            .with_initial_delay(Duration::from_millis(1))
            .without_jitter();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        let result = queue
            .run(move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 {
                        Err(anyhow::anyhow!("flaky"))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(result, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_qps_queue_runs() {
        let queue = SearchQueue::with_qps_limit(5);
        let value = queue.run(|| async { Ok::<_, anyhow::Error>(42) }).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn test_sequenced_run_drops_superseded_response() {
        let queue = SearchQueue::default();
        let sequencer = SearchSequencer::new();

        let first = sequencer.issue();
        let second = sequencer.issue();

        let stale = queue
            .run_sequenced(&sequencer, first, || async { Ok::<_, anyhow::Error>("old") })
            .await;
        assert!(matches!(
            stale,
            Err(SearchQueueError::Superseded { ticket: 1, latest: 2 })
        ));

        let fresh = queue
            .run_sequenced(&sequencer, second, || async { Ok::<_, anyhow::Error>("new") })
            .await
            .unwrap();
        assert_eq!(fresh, "new");
    }
}
