//! Data models for fetched news and the rows written to disk.
//!
//! This module defines the core data structures used throughout the application:
//! - [`RawArticle`]: An article exactly as the news API returned it
//! - [`NewsPage`]: One decoded page of results plus its continuation cursor
//! - [`PageCursor`]: Opaque pagination token issued by the API
//! - [`FilteredArticle`]: A relevant article, shaped as an output CSV row
//! - [`LabeledExample`]: A row of the hand-labeled training dataset

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Output date format for the `Date` column (`MM/DD/YYYY`).
pub const OUTPUT_DATE_FORMAT: &str = "%m/%d/%Y";

/// A news article as returned by the upstream API.
///
/// Only the fields the pipeline consumes are decoded; everything else in the
/// payload (symbols, images, author, ...) is ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawArticle {
    /// Publication timestamp, kept with the offset the API reported.
    pub created_at: DateTime<FixedOffset>,
    /// The article headline.
    pub headline: String,
    /// The short summary the API ships alongside the headline.
    pub summary: String,
}

impl RawArticle {
    /// Headline and summary joined by a single space, as fed to the classifier.
    pub fn text(&self) -> String {
        format!("{} {}", self.headline, self.summary)
    }
}

/// Opaque continuation token for the next page of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor(String);

impl PageCursor {
    pub fn new<S: Into<String>>(token: S) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One page of the news search response.
#[derive(Debug, Deserialize)]
pub struct NewsPage {
    /// Articles in the order the API returned them.
    pub news: Vec<RawArticle>,
    /// Token for the next page; `null` or missing when the window is exhausted.
    #[serde(default)]
    pub next_page_token: Option<String>,
}

impl NewsPage {
    /// The cursor for the following page, if any.
    ///
    /// An empty token is treated the same as a missing one.
    pub fn next_cursor(&self) -> Option<PageCursor> {
        self.next_page_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(PageCursor::new)
    }
}

/// A relevant article as written to the output file.
///
/// Field order matches the CSV header: `Date, Headline, Content`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilteredArticle {
    #[serde(rename = "Date")]
    pub date: String,
    #[serde(rename = "Headline")]
    pub headline: String,
    #[serde(rename = "Content")]
    pub content: String,
}

impl From<&RawArticle> for FilteredArticle {
    fn from(article: &RawArticle) -> Self {
        Self {
            date: format_output_date(&article.created_at),
            headline: article.headline.clone(),
            content: article.summary.clone(),
        }
    }
}

/// Format a timestamp for the `Date` column, using the timestamp's own offset.
pub fn format_output_date(ts: &DateTime<FixedOffset>) -> String {
    ts.format(OUTPUT_DATE_FORMAT).to_string()
}

/// A row of the labeled dataset used to train the relevance classifier.
///
/// Missing headline or content cells deserialize to `None` and are treated as
/// empty text; the label is kept raw so unusable rows can be dropped later.
#[derive(Debug, Clone, Deserialize)]
pub struct LabeledRow {
    #[serde(rename = "Headline", default)]
    pub headline: Option<String>,
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
    #[serde(rename = "Relevant", default)]
    pub relevant: Option<String>,
}

/// A cleaned training example.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub text: String,
    pub relevant: bool,
}

impl LabeledRow {
    /// Convert to a training example, or `None` when the label is missing or unusable.
    pub fn into_example(self) -> Option<LabeledExample> {
        let relevant = parse_label(self.relevant.as_deref()?)?;
        let headline = self.headline.unwrap_or_default();
        let content = self.content.unwrap_or_default();
        Some(LabeledExample {
            text: format!("{} {}", headline, content),
            relevant,
        })
    }
}

/// Interpret a binary relevance label. Accepts `1`/`0`, `1.0`/`0.0` and `true`/`false`.
fn parse_label(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(b) = raw.to_ascii_lowercase().parse::<bool>() {
        return Some(b);
    }
    match raw.parse::<f64>() {
        Ok(v) if v == 1.0 => Some(true),
        Ok(v) if v == 0.0 => Some(false),
        _ => None,
    }
}
