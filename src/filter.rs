//! Relevance filtering for fetched articles.
//!
//! A [`RelevanceFilter`] is a predicate over a [`RawArticle`], chosen once at
//! startup. The fetch loop never sees which variant is active.
//!
//! | Variant | Rule |
//! |---------|------|
//! | [`KeywordFilter`] | any vocabulary term is a case-sensitive substring of the headline or summary |
//! | [`TextClassifier`] | the fitted classifier predicts the positive class for `headline + " " + summary` |

use crate::classifier::TextClassifier;
use crate::classifier::logistic::DECISION_THRESHOLD;
use crate::models::RawArticle;
use tracing::{debug, warn};

/// Macroeconomic indicator terms matched by the keyword filter.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "Gross Domestic Product",
    "GDP",
    "Unemployment Rate",
    "Inflation Rate",
    "Consumer Price Index",
    "CPI",
    "Producer Price Index",
    "PPI",
    "Interest Rates",
    "Balance of Trade",
    "Government Debt",
    "Budget Deficit",
    "Surplus",
    "Exchange Rates",
    "Money Supply",
    "Industrial Production",
    "Retail Sales",
    "Housing Starts",
];

/// Substring match against a fixed vocabulary. No tokenization, no case folding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordFilter {
    keywords: Vec<String>,
}

impl Default for KeywordFilter {
    fn default() -> Self {
        Self::new(DEFAULT_KEYWORDS.iter().map(|k| k.to_string()))
    }
}

impl KeywordFilter {
    /// Build from a vocabulary; empty terms are ignored since they would match everything.
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(Into::into)
                .filter(|k: &String| !k.is_empty())
                .collect(),
        }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    /// The first vocabulary term found in the article, if any.
    pub fn first_match(&self, article: &RawArticle) -> Option<&str> {
        self.keywords
            .iter()
            .find(|k| article.headline.contains(k.as_str()) || article.summary.contains(k.as_str()))
            .map(String::as_str)
    }

    pub fn is_relevant(&self, article: &RawArticle) -> bool {
        self.first_match(article).is_some()
    }
}

/// The relevance predicate selected at startup.
#[derive(Debug, Clone)]
pub enum RelevanceFilter {
    Keywords(KeywordFilter),
    Classifier(TextClassifier),
}

impl RelevanceFilter {
    pub fn name(&self) -> &'static str {
        match self {
            RelevanceFilter::Keywords(_) => "keywords",
            RelevanceFilter::Classifier(_) => "classifier",
        }
    }

    /// Decide whether `article` is written to the output.
    pub fn is_relevant(&self, article: &RawArticle) -> bool {
        match self {
            RelevanceFilter::Keywords(filter) => filter.is_relevant(article),
            RelevanceFilter::Classifier(classifier) => match classifier.predict_proba(&article.text()) {
                Ok(p) => {
                    debug!(probability = p, headline = %article.headline, "Classifier score");
                    p >= DECISION_THRESHOLD
                }
                Err(e) => {
                    warn!(error = %e, headline = %article.headline, "Classifier failed; treating article as not relevant");
                    false
                }
            },
        }
    }
}
