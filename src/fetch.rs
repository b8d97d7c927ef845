//! Windowed, paginated, rate-limited retrieval.
//!
//! [`FetchLoop`] walks a list of [`DateWindow`]s oldest first. For each window
//! it requests pages until the API stops returning a continuation cursor,
//! passing every article to a caller-supplied consumer as soon as its page
//! arrives.
//!
//! # Failure Handling
//!
//! | Failure | Outcome |
//! |---------|---------|
//! | Timeout / connection error | retried with backoff |
//! | Non-200, non-400 status | retried with backoff |
//! | HTTP 400 | window abandoned, no retry |
//! | Malformed 200 body | window abandoned, no retry |
//! | Retries exhausted | window abandoned |
//!
//! Abandoning a window keeps whatever was already emitted for it. Only an
//! error from the consumer itself stops the loop.

use crate::api::{FetchError, NewsSource, PageRequest};
use crate::clock::Clock;
use crate::models::{NewsPage, PageCursor, RawArticle};
use crate::rate_limit::RateBudget;
use crate::retry::RetryPolicy;
use crate::window::DateWindow;
use std::error::Error;
use tracing::{debug, error, info, instrument, warn};

/// Default page size requested from the API.
pub const DEFAULT_BATCH_SIZE: u32 = 30;

/// Counters describing one run of the loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub windows_visited: usize,
    pub windows_completed: usize,
    pub windows_abandoned: usize,
    pub pages_fetched: usize,
    pub articles_seen: usize,
}

/// How a single window ended.
#[derive(Debug)]
enum WindowOutcome {
    Exhausted,
    Abandoned(FetchError),
}

/// Drives paginated retrieval over a sequence of date windows.
#[derive(Debug)]
pub struct FetchLoop<S, C> {
    source: S,
    clock: C,
    budget: RateBudget,
    retry: RetryPolicy,
    batch_size: u32,
}

impl<S, C> FetchLoop<S, C>
where
    S: NewsSource,
    C: Clock,
{
    pub fn new(source: S, clock: C, budget: RateBudget, retry: RetryPolicy, batch_size: u32) -> Self {
        Self {
            source,
            clock,
            budget,
            retry,
            batch_size,
        }
    }

    pub fn budget(&self) -> &RateBudget {
        &self.budget
    }

    pub fn retry(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Fetch every window in order, handing each article to `emit`.
    ///
    /// # Arguments
    ///
    /// * `windows` - Date windows, visited in slice order
    /// * `emit` - Consumer called once per article, in the order received
    ///
    /// # Returns
    ///
    /// A [`FetchSummary`] counting windows, pages and articles.
    ///
    /// # Errors
    ///
    /// Only an error returned by `emit` is propagated. Fetch failures abandon
    /// the current window and the loop moves on.
    #[instrument(level = "info", skip_all, fields(windows = windows.len(), batch_size = self.batch_size))]
    pub async fn run<F>(
        &self,
        windows: &[DateWindow],
        mut emit: F,
    ) -> Result<FetchSummary, Box<dyn Error>>
    where
        F: FnMut(RawArticle) -> Result<(), Box<dyn Error>>,
    {
        let mut summary = FetchSummary::default();

        for (index, window) in windows.iter().enumerate() {
            summary.windows_visited += 1;
            info!(index, %window, days = window.days(), "Fetching window");

            match self.fetch_window(*window, &mut emit, &mut summary).await? {
                WindowOutcome::Exhausted => {
                    summary.windows_completed += 1;
                    debug!(%window, "Window exhausted");
                }
                WindowOutcome::Abandoned(e) => {
                    summary.windows_abandoned += 1;
                    match e {
                        FetchError::BadRequest { .. } => {
                            warn!(%window, error = %e, "Bad request; skipping this window")
                        }
                        _ => error!(%window, error = %e, "Giving up on window; moving to next"),
                    }
                }
            }
        }

        info!(
            windows = summary.windows_visited,
            completed = summary.windows_completed,
            abandoned = summary.windows_abandoned,
            pages = summary.pages_fetched,
            articles = summary.articles_seen,
            budget_used = self.budget.used(),
            "Fetch loop finished"
        );
        Ok(summary)
    }

    async fn fetch_window<F>(
        &self,
        window: DateWindow,
        emit: &mut F,
        summary: &mut FetchSummary,
    ) -> Result<WindowOutcome, Box<dyn Error>>
    where
        F: FnMut(RawArticle) -> Result<(), Box<dyn Error>>,
    {
        let mut cursor: Option<PageCursor> = None;

        loop {
            let request = PageRequest {
                window,
                cursor: cursor.take(),
                limit: self.batch_size,
            };

            let page = match self.fetch_with_retry(&request).await {
                Ok(page) => page,
                Err(e) => return Ok(WindowOutcome::Abandoned(e)),
            };
            summary.pages_fetched += 1;

            let next = page.next_cursor();
            debug!(
                %window,
                articles = page.news.len(),
                has_more = next.is_some(),
                "Page received"
            );
            for article in page.news {
                summary.articles_seen += 1;
                emit(article)?;
            }

            match next {
                Some(next) => cursor = Some(next),
                None => return Ok(WindowOutcome::Exhausted),
            }
        }
    }

    async fn fetch_with_retry(&self, request: &PageRequest) -> Result<NewsPage, FetchError> {
        let source = &self.source;
        let budget = &self.budget;
        let clock = &self.clock;
        self.retry
            .run(clock, move |attempt| async move {
                budget.acquire(clock).await;
                debug!(attempt = attempt + 1, "Requesting page");
                source.fetch_page(request).await
            })
            .await
    }
}
