//! Fetch, filter, write.
//!
//! Every article produced by the [`FetchLoop`] is checked against the active
//! [`RelevanceFilter`]; relevant ones are converted to [`FilteredArticle`]
//! rows and written to the [`CsvSink`] in the order they arrive.

use crate::api::NewsSource;
use crate::clock::Clock;
use crate::fetch::{FetchLoop, FetchSummary};
use crate::filter::RelevanceFilter;
use crate::models::{FilteredArticle, RawArticle};
use crate::output::CsvSink;
use crate::window::DateWindow;
use std::error::Error;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub fetch: FetchSummary,
    pub relevant: usize,
}

/// Run the fetch loop over `windows` and write relevant articles to `sink`.
///
/// # Arguments
///
/// * `fetch` - Configured fetch loop
/// * `windows` - Date windows to visit, oldest first
/// * `filter` - Relevance predicate applied to every article
/// * `sink` - Open CSV output; rows are flushed as they are written
///
/// # Returns
///
/// The fetch counters plus the number of rows written.
///
/// # Errors
///
/// A write failure stops the run and is returned.
#[instrument(level = "info", skip_all, fields(filter = filter.name(), output = %sink.path().display()))]
pub async fn collect_relevant_news<S, C>(
    fetch: &FetchLoop<S, C>,
    windows: &[DateWindow],
    filter: &RelevanceFilter,
    sink: &mut CsvSink,
) -> Result<PipelineSummary, Box<dyn Error>>
where
    S: NewsSource,
    C: Clock,
{
    let mut relevant = 0usize;

    let fetch_summary = fetch
        .run(windows, |article: RawArticle| {
            if !filter.is_relevant(&article) {
                return Ok(());
            }
            let row = FilteredArticle::from(&article);
            debug!(date = %row.date, headline = %row.headline, "Relevant article");
            sink.write(&row)?;
            relevant += 1;
            Ok(())
        })
        .await?;

    info!(
        seen = fetch_summary.articles_seen,
        relevant,
        "Relevant articles written"
    );
    Ok(PipelineSummary {
        fetch: fetch_summary,
        relevant,
    })
}
