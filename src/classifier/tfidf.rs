//! Tokenization and TF-IDF vectorization.
//!
//! Documents are lowercased and split into runs of two or more word
//! characters. The vectorizer learns a sorted vocabulary and smoothed IDF
//! weights from the training corpus and produces L2-normalized sparse rows.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

static TOKEN_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Sparse feature vector: `(feature index, value)` pairs, sorted by index.
pub type SparseVector = Vec<(usize, f64)>;

/// Lowercase `text` and split it into tokens of at least two word characters.
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN_PATTERN
        .find_iter(&lower)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// TF-IDF vectorizer with smoothed IDF and L2 normalization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TfIdfVectorizer {
    /// Term -> feature index.
    vocabulary: HashMap<String, usize>,
    /// IDF weight per feature index.
    idf: Vec<f64>,
}

impl TfIdfVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of features (vocabulary size).
    pub fn n_features(&self) -> usize {
        self.idf.len()
    }

    pub fn is_fitted(&self) -> bool {
        !self.idf.is_empty()
    }

    /// Learn the vocabulary and IDF weights from `documents`.
    pub fn fit<S: AsRef<str>>(&mut self, documents: &[S]) {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d.as_ref())).collect();

        let terms: BTreeSet<&str> = tokenized
            .iter()
            .flat_map(|doc| doc.iter().map(String::as_str))
            .collect();
        self.vocabulary = terms
            .into_iter()
            .enumerate()
            .map(|(idx, term)| (term.to_string(), idx))
            .collect();

        let mut doc_freq = vec![0usize; self.vocabulary.len()];
        for doc in &tokenized {
            let unique: BTreeSet<usize> = doc.iter().filter_map(|t| self.vocabulary.get(t).copied()).collect();
            for idx in unique {
                doc_freq[idx] += 1;
            }
        }

        let n_docs = tokenized.len() as f64;
        self.idf = doc_freq
            .into_iter()
            .map(|df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();
    }

    /// Vectorize one document. Unknown terms are ignored.
    pub fn transform(&self, document: &str) -> SparseVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokenize(document) {
            if let Some(&idx) = self.vocabulary.get(&token) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseVector = counts
            .into_iter()
            .map(|(idx, tf)| (idx, tf * self.idf[idx]))
            .collect();
        row.sort_by_key(|&(idx, _)| idx);

        let norm = row.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, v) in row.iter_mut() {
                *v /= norm;
            }
        }
        row
    }

    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Vec<SparseVector> {
        self.fit(documents);
        documents.iter().map(|d| self.transform(d.as_ref())).collect()
    }

    /// A vocabulary entry whose feature index has no IDF weight, if any.
    ///
    /// A fitted vectorizer never has one; a hand-edited or truncated model
    /// file can.
    pub fn dangling_term(&self) -> Option<(&str, usize)> {
        self.vocabulary
            .iter()
            .find(|&(_, &idx)| idx >= self.idf.len())
            .map(|(term, &idx)| (term.as_str(), idx))
    }

    /// IDF weight of `term`, if it is in the vocabulary.
    #[cfg(test)]
    pub fn idf_of(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&idx| self.idf[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("U.S. GDP rose 2.4% in Q3"),
            vec!["gdp", "rose", "in", "q3"]
        );
        assert!(tokenize("a b c").is_empty());
    }

    #[test]
    fn test_idf_weights() {
        let docs = ["gdp growth", "gdp slows", "football final"];
        let mut v = TfIdfVectorizer::new();
        v.fit(&docs);

        assert_eq!(v.n_features(), 5);
        // ln((1+3)/(1+2)) + 1 for a term in 2 of 3 docs
        let common = v.idf_of("gdp").unwrap();
        assert!((common - ((4.0f64 / 3.0).ln() + 1.0)).abs() < 1e-12);
        // Rarer terms weigh more.
        assert!(v.idf_of("football").unwrap() > common);
        assert!(v.idf_of("missing").is_none());
    }

    #[test]
    fn test_transform_is_normalized_and_sorted() {
        let docs = ["inflation inflation rates", "rates cut"];
        let mut v = TfIdfVectorizer::new();
        let rows = v.fit_transform(&docs);

        for row in &rows {
            let norm: f64 = row.iter().map(|(_, x)| x * x).sum();
            assert!((norm - 1.0).abs() < 1e-12);
            assert!(row.windows(2).all(|p| p[0].0 < p[1].0));
        }
    }

    #[test]
    fn test_transform_unknown_terms_is_empty() {
        let mut v = TfIdfVectorizer::new();
        v.fit(&["cpi data"]);
        assert!(v.transform("nothing matches").is_empty());
    }

    #[test]
    fn test_dangling_term() {
        let mut v = TfIdfVectorizer::new();
        v.fit(&["cpi data"]);
        assert!(v.dangling_term().is_none());

        let broken: TfIdfVectorizer =
            serde_json::from_str(r#"{"vocabulary":{"gdp":5},"idf":[1.0]}"#).unwrap();
        assert_eq!(broken.dangling_term(), Some(("gdp", 5)));
    }
}
