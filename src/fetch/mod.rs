//! Resilient paginated fetch engine
//!
//! - [`page`]: one page, retried at a fixed interval until a time budget runs out.
//! - [`aggregate`]: walks offsets page by page and stops at end-of-data or the cap.

pub mod aggregate;
pub mod page;

use std::time::Duration;

pub use aggregate::{AggregationLimits, AggregationState, PaginationAggregator, Progress};
pub use page::{PageFetcher, RetryPolicy};

/// A page exhausted its retry budget. Carries the last upstream failure.
#[derive(Debug, thiserror::Error)]
#[error(
    "Upstream fetch failed at offset {offset} after {attempts} attempts in {:.1}s: {last_error:#}",
    .elapsed.as_secs_f64()
)]
pub struct FetchError {
    pub offset: u32,
    pub attempts: u32,
    pub elapsed: Duration,
    pub last_error: anyhow::Error,
}
