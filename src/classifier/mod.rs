//! Text relevance classifier: TF-IDF features fed to logistic regression.
//!
//! # Submodules
//!
//! - [`tfidf`]: Tokenizer and TF-IDF vectorizer
//! - [`logistic`]: Binary logistic regression over sparse rows
//! - [`metrics`]: Accuracy and per-class precision/recall/F1 report
//! - [`training`]: Labeled dataset loading, seeded split, fit and evaluate
//!
//! A fitted [`TextClassifier`] can be saved as JSON and loaded back, so a
//! fetch run does not have to retrain.

pub mod logistic;
pub mod metrics;
pub mod tfidf;
pub mod training;

use logistic::{LogisticParams, LogisticRegression, LogisticRegressionError};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tfidf::TfIdfVectorizer;
use thiserror::Error;
use tracing::{error, info, instrument};

/// Reasons a saved classifier is refused at load time.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ModelFileError {
    #[error("saved classifier has not been fitted")]
    NotFitted,

    #[error("vocabulary term {term:?} maps to feature {index}, but only {features} features exist")]
    DanglingTerm {
        term: String,
        index: usize,
        features: usize,
    },

    #[error("model has {weights} weights but the vectorizer produces {features} features")]
    FeatureMismatch { weights: usize, features: usize },
}

/// Vectorizer plus linear model, fitted together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TextClassifier {
    vectorizer: TfIdfVectorizer,
    model: LogisticRegression,
}

impl TextClassifier {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            vectorizer: TfIdfVectorizer::new(),
            model: LogisticRegression::new(params),
        }
    }

    /// Fit the vectorizer and the model on `texts` with their labels.
    pub fn fit<S: AsRef<str>>(
        &mut self,
        texts: &[S],
        labels: &[bool],
    ) -> Result<(), LogisticRegressionError> {
        let rows = self.vectorizer.fit_transform(texts);
        self.model.fit(&rows, labels, self.vectorizer.n_features())
    }

    /// Probability that `text` is relevant.
    pub fn predict_proba(&self, text: &str) -> Result<f64, LogisticRegressionError> {
        self.model.predict_proba(&self.vectorizer.transform(text))
    }

    /// `true` if `text` is predicted relevant.
    pub fn predict(&self, text: &str) -> Result<bool, LogisticRegressionError> {
        self.model.predict(&self.vectorizer.transform(text))
    }

    pub fn is_fitted(&self) -> bool {
        self.vectorizer.is_fitted() && self.model.is_fitted()
    }

    /// Check that the vectorizer and the model agree on the feature space.
    ///
    /// # Errors
    ///
    /// [`ModelFileError`] describing the first inconsistency found.
    pub fn check_consistency(&self) -> Result<(), ModelFileError> {
        if !self.is_fitted() {
            return Err(ModelFileError::NotFitted);
        }
        let features = self.vectorizer.n_features();
        if let Some((term, index)) = self.vectorizer.dangling_term() {
            return Err(ModelFileError::DanglingTerm {
                term: term.to_string(),
                index,
                features,
            });
        }
        let weights = self.model.n_weights().unwrap_or_default();
        if weights != features {
            return Err(ModelFileError::FeatureMismatch { weights, features });
        }
        Ok(())
    }

    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn save(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        let writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer(writer, self)?;
        info!(features = self.vectorizer.n_features(), "Saved classifier");
        Ok(())
    }

    /// Load a classifier saved by [`TextClassifier::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// model fails [`TextClassifier::check_consistency`].
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let reader = BufReader::new(File::open(path)?);
        let classifier: Self = serde_json::from_reader(reader)?;
        if let Err(e) = classifier.check_consistency() {
            error!(error = %e, "Refusing inconsistent classifier file");
            return Err(Box::new(e));
        }
        info!(features = classifier.vectorizer.n_features(), "Loaded classifier");
        Ok(classifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn corpus() -> (Vec<&'static str>, Vec<bool>) {
        (
            vec![
                "GDP growth beats forecasts",
                "inflation rate climbs as CPI jumps",
                "central bank raises interest rates",
                "trade balance widens on weak exports",
                "tech giant unveils new phone",
                "star striker signs with rival club",
                "movie tops weekend box office",
                "company announces new CEO",
            ],
            vec![true, true, true, true, false, false, false, false],
        )
    }

    #[test]
    fn test_fit_and_predict() {
        let (texts, labels) = corpus();
        let mut clf = TextClassifier::default();
        clf.fit(&texts, &labels).unwrap();

        for (text, &label) in texts.iter().zip(&labels) {
            assert_eq!(clf.predict(text).unwrap(), label, "{}", text);
        }
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let clf = TextClassifier::default();
        assert!(clf.predict("gdp").is_err());
    }

    #[test]
    fn test_save_and_load() {
        let (texts, labels) = corpus();
        let mut clf = TextClassifier::default();
        clf.fit(&texts, &labels).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        clf.save(&path).unwrap();
        let loaded = TextClassifier::load(&path).unwrap();

        let text = "CPI and GDP data due";
        let a = clf.predict_proba(text).unwrap();
        let b = loaded.predict_proba(text).unwrap();
        assert!((a - b).abs() < 1e-12);
    }

    #[test]
    fn test_load_rejects_unfitted_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        TextClassifier::default().save(&path).unwrap();
        assert!(TextClassifier::load(&path).is_err());
    }

    #[test]
    fn test_load_rejects_dangling_vocabulary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edited.json");
        let model = json!({
            "vectorizer": {"vocabulary": {"gdp": 5}, "idf": [1.0]},
            "model": {
                "params": {"c": 1.0, "learning_rate": 1.0, "max_iter": 10, "tolerance": 1e-7},
                "weights": {"v": 1, "dim": [1], "data": [0.5]},
                "intercept": 0.0
            }
        });
        std::fs::write(&path, model.to_string()).unwrap();

        let err = TextClassifier::load(&path).unwrap_err();
        let err = err.downcast_ref::<ModelFileError>().unwrap();
        assert!(matches!(err, ModelFileError::DanglingTerm { index: 5, features: 1, .. }));
    }

    #[test]
    fn test_consistency_rejects_weight_count_mismatch() {
        let (texts, labels) = corpus();
        let mut clf = TextClassifier::default();
        clf.fit(&texts, &labels).unwrap();
        assert_eq!(clf.check_consistency(), Ok(()));

        let features = clf.vectorizer.n_features();
        clf.model
            .fit(&[vec![(0, 1.0)], vec![(1, 1.0)]], &[true, false], 2)
            .unwrap();
        assert_eq!(
            clf.check_consistency(),
            Err(ModelFileError::FeatureMismatch {
                weights: 2,
                features
            })
        );
    }
}
