//! Single-page fetch with time-bounded retry

use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, warn};

use super::FetchError;
use crate::upstream::{FetchRequest, Page, TradeHistorySource};

pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_RETRY_BUDGET: Duration = Duration::from_secs(30);

/// Fixed backoff between attempts, bounded by wall-clock budget rather than count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub budget: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_RETRY_INTERVAL,
            budget: DEFAULT_RETRY_BUDGET,
        }
    }
}

struct RetryState {
    started: Instant,
    attempts: u32,
    last_error: Option<anyhow::Error>,
}

impl RetryState {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            attempts: 0,
            last_error: None,
        }
    }

    fn exhausted(&self, budget: Duration) -> bool {
        self.started.elapsed() >= budget
    }

    /// Time left in the budget, or `None` once it is spent.
    fn remaining(&self, budget: Duration) -> Option<Duration> {
        budget
            .checked_sub(self.started.elapsed())
            .filter(|left| !left.is_zero())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PageFetcher {
    policy: RetryPolicy,
}

impl PageFetcher {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch one page, retrying any failure until the budget is spent.
    ///
    /// At least one attempt is always made. Backoff is an async sleep on the
    /// calling task.
    pub async fn fetch(
        &self,
        source: &dyn TradeHistorySource,
        request: &FetchRequest,
    ) -> Result<Page, FetchError> {
        let mut state = RetryState::start();

        loop {
            state.attempts += 1;
            match source.order_history(request).await {
                Ok(page) => {
                    debug!(
                        offset = request.offset,
                        attempt = state.attempts,
                        records = page.len(),
                        "Page fetched"
                    );
                    return Ok(page);
                }
                Err(e) => {
                    warn!(
                        offset = request.offset,
                        limit = request.limit,
                        attempt = state.attempts,
                        elapsed_ms = state.started.elapsed().as_millis() as u64,
                        "Page fetch attempt failed: {:#}",
                        e
                    );
                    state.last_error = Some(e);
                }
            }

            let Some(remaining) = state.remaining(self.policy.budget) else {
                break;
            };
            // Never sleep past the budget.
            sleep(self.policy.interval.min(remaining)).await;
            if state.exhausted(self.policy.budget) {
                break;
            }
        }

        let elapsed = state.started.elapsed();
        error!(
            offset = request.offset,
            attempts = state.attempts,
            elapsed_ms = elapsed.as_millis() as u64,
            "Retry budget exhausted, abandoning page"
        );

        Err(FetchError {
            offset: request.offset,
            attempts: state.attempts,
            elapsed,
            last_error: state
                .last_error
                .unwrap_or_else(|| anyhow::anyhow!("no attempt recorded")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderRecord;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Fails the first `failures` calls, then returns one record.
    struct Flaky {
        failures: u32,
        calls: AtomicU32,
        latency: Duration,
    }

    impl Flaky {
        fn new(failures: u32) -> Self {
            Self {
                failures,
                calls: AtomicU32::new(0),
                latency: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl TradeHistorySource for Flaky {
        async fn order_history(&self, _request: &FetchRequest) -> Result<Page> {
            if !self.latency.is_zero() {
                sleep(self.latency).await;
            }
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                Err(anyhow!("upstream hiccup #{}", call))
            } else {
                Ok(vec![OrderRecord {
                    id: Some(call.to_string()),
                    amount: None,
                    volume: None,
                    buyer: None,
                    seller: None,
                    payment_details: None,
                    status: Some("COMPLETED".into()),
                    status_update_time: None,
                }])
            }
        }
    }

    fn request() -> FetchRequest {
        FetchRequest {
            offset: 0,
            limit: 100,
            status_filter: "COMPLETED_FOR_REQUESTER".into(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn returns_first_success_without_waiting() {
        let source = Flaky::new(0);
        let started = Instant::now();
        let page = PageFetcher::default().fetch(&source, &request()).await.unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn recovers_after_transient_failures() {
        let source = Flaky::new(3);
        let started = Instant::now();
        let page = PageFetcher::default().fetch(&source, &request()).await.unwrap();

        assert_eq!(page[0].id.as_deref(), Some("4"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_budget_with_last_error() {
        let source = Flaky::new(u32::MAX);
        let started = Instant::now();
        let err = PageFetcher::default()
            .fetch(&source, &request())
            .await
            .unwrap_err();

        assert_eq!(started.elapsed(), DEFAULT_RETRY_BUDGET);
        assert_eq!(err.attempts, 30);
        assert_eq!(source.calls.load(Ordering::SeqCst), 30);
        assert_eq!(err.last_error.to_string(), "upstream hiccup #30");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_attempts_overrun_budget_by_at_most_one_attempt() {
        let mut source = Flaky::new(u32::MAX);
        source.latency = Duration::from_secs(7);
        let started = Instant::now();
        let err = PageFetcher::default()
            .fetch(&source, &request())
            .await
            .unwrap_err();

        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_RETRY_BUDGET);
        assert!(elapsed <= DEFAULT_RETRY_BUDGET + source.latency);
        assert_eq!(err.elapsed, elapsed);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_clipped_to_remaining_budget() {
        // 1.4s per cycle: the 22nd attempt ends at 29.8s, leaving 200ms.
        let mut source = Flaky::new(u32::MAX);
        source.latency = Duration::from_millis(400);
        let started = Instant::now();
        let err = PageFetcher::default()
            .fetch(&source, &request())
            .await
            .unwrap_err();

        let elapsed = started.elapsed();
        assert!(elapsed >= DEFAULT_RETRY_BUDGET, "stopped early: {:?}", elapsed);
        assert!(
            elapsed <= DEFAULT_RETRY_BUDGET + source.latency,
            "overran: {:?}",
            elapsed
        );
        assert_eq!(err.attempts, 22);
        assert_eq!(source.calls.load(Ordering::SeqCst), 22);
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_ending_past_budget_stops_without_sleeping() {
        let mut source = Flaky::new(u32::MAX);
        source.latency = Duration::from_millis(700);
        let fetcher = PageFetcher::new(RetryPolicy {
            interval: Duration::from_secs(1),
            budget: Duration::from_secs(2),
        });
        let started = Instant::now();

        // Attempts end at 0.7s and 2.4s; the second ends past the budget.
        let err = fetcher.fetch(&source, &request()).await.unwrap_err();

        assert_eq!(err.attempts, 2);
        assert_eq!(started.elapsed(), Duration::from_millis(2_400));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_still_attempts_once() {
        let source = Flaky::new(u32::MAX);
        let fetcher = PageFetcher::new(RetryPolicy {
            interval: Duration::from_secs(1),
            budget: Duration::ZERO,
        });

        let err = fetcher.fetch(&source, &request()).await.unwrap_err();
        assert_eq!(err.attempts, 1);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }
}
