//! Pagination with a total result cap
//!
//! The loop state lives in [`AggregationState`]; [`AggregationState::absorb`]
//! is the pure step that decides whether another page is needed, so every stop
//! condition is testable without an upstream.

use anyhow::{ensure, Result};
use tracing::{error, info};

use super::{FetchError, PageFetcher};
use crate::models::OrderRecord;
use crate::upstream::{FetchRequest, Page, TradeHistorySource};

pub const DEFAULT_PAGE_LIMIT: u32 = 100;
pub const DEFAULT_RESULT_CAP: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationLimits {
    page_limit: u32,
    cap: usize,
}

impl AggregationLimits {
    pub fn new(page_limit: u32, cap: usize) -> Result<Self> {
        ensure!(page_limit > 0, "page limit must be positive");
        ensure!(cap > 0, "result cap must be positive");
        Ok(Self { page_limit, cap })
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }

    pub fn cap(&self) -> usize {
        self.cap
    }
}

impl Default for AggregationLimits {
    fn default() -> Self {
        Self {
            page_limit: DEFAULT_PAGE_LIMIT,
            cap: DEFAULT_RESULT_CAP,
        }
    }
}

/// Outcome of folding one page into the state.
#[derive(Debug)]
pub enum Progress {
    Continue(AggregationState),
    Finished(Vec<OrderRecord>),
}

/// Records gathered so far and the offset of the next page to request.
#[derive(Debug, Default)]
pub struct AggregationState {
    collected: Vec<OrderRecord>,
    next_offset: u32,
}

impl AggregationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_offset(&self) -> u32 {
        self.next_offset
    }

    pub fn collected(&self) -> &[OrderRecord] {
        &self.collected
    }

    pub fn absorb(mut self, page: Page, limits: &AggregationLimits) -> Progress {
        if page.is_empty() {
            return Progress::Finished(self.collected);
        }

        let page_len = page.len();
        self.collected.extend(page);

        // Earliest-fetched records win when the cap cuts into a page.
        if self.collected.len() >= limits.cap {
            self.collected.truncate(limits.cap);
            return Progress::Finished(self.collected);
        }

        if page_len < limits.page_limit as usize {
            return Progress::Finished(self.collected);
        }

        match self.next_offset.checked_add(limits.page_limit) {
            Some(next) => {
                self.next_offset = next;
                Progress::Continue(self)
            }
            // Offset space exhausted.
            None => Progress::Finished(self.collected),
        }
    }
}

/// Drives a [`PageFetcher`] across offsets until end-of-data or the cap.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaginationAggregator {
    fetcher: PageFetcher,
    limits: AggregationLimits,
}

impl PaginationAggregator {
    pub fn new(fetcher: PageFetcher, limits: AggregationLimits) -> Self {
        Self { fetcher, limits }
    }

    pub fn limits(&self) -> AggregationLimits {
        self.limits
    }

    /// Collect up to `cap` records. Any page that exhausts its retry budget
    /// fails the whole collection; nothing partial is returned.
    pub async fn collect(
        &self,
        source: &dyn TradeHistorySource,
        status_filter: &str,
    ) -> Result<Vec<OrderRecord>, FetchError> {
        let mut state = AggregationState::new();
        let mut pages = 0u32;

        loop {
            let request = FetchRequest {
                offset: state.next_offset(),
                limit: self.limits.page_limit,
                status_filter: status_filter.to_string(),
            };

            let page = match self.fetcher.fetch(source, &request).await {
                Ok(page) => page,
                Err(e) => {
                    error!(
                        pages_completed = pages,
                        records_discarded = state.collected().len(),
                        "Aggregation aborted: {}",
                        e
                    );
                    return Err(e);
                }
            };
            pages += 1;

            match state.absorb(page, &self.limits) {
                Progress::Continue(next) => state = next,
                Progress::Finished(records) => {
                    info!(pages, records = records.len(), "📦 Order history collected");
                    return Ok(records);
                }
            }
        }
    }
}
