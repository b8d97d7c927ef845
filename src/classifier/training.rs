//! One-shot training stage for the relevance classifier.
//!
//! Loads the labeled dataset, splits it with a seeded shuffle, fits a
//! [`TextClassifier`] on the training part and scores it on the held-out part.
//! The report is diagnostic output only.

use super::TextClassifier;
use super::logistic::{LogisticParams, LogisticRegressionError};
use super::metrics::ClassificationReport;
use crate::models::{LabeledExample, LabeledRow};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::path::Path;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Default fraction of examples held out for evaluation.
pub const DEFAULT_TEST_RATIO: f64 = 0.2;

/// Default shuffle seed, so repeated runs split identically.
pub const DEFAULT_SEED: u64 = 42;

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error("failed to read labeled dataset {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("labeled dataset has {0} usable rows; at least 2 are needed")]
    TooFewExamples(usize),

    #[error("test ratio must be in (0, 1), got {0}")]
    InvalidTestRatio(f64),

    #[error(transparent)]
    Model(#[from] LogisticRegressionError),
}

/// Split settings and model hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingConfig {
    pub test_ratio: f64,
    pub seed: u64,
    pub params: LogisticParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: DEFAULT_TEST_RATIO,
            seed: DEFAULT_SEED,
            params: LogisticParams::default(),
        }
    }
}

/// A fitted classifier with its held-out evaluation.
#[derive(Debug)]
pub struct TrainedClassifier {
    pub classifier: TextClassifier,
    pub report: ClassificationReport,
    pub train_size: usize,
    pub test_size: usize,
}

/// Read `Headline`, `Content`, `Relevant` rows, dropping rows without a usable label.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub fn load_labeled_dataset(path: &Path) -> Result<Vec<LabeledExample>, TrainingError> {
    let csv_err = |source| TrainingError::Csv {
        path: path.display().to_string(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(csv_err)?;

    let mut examples = Vec::new();
    let mut dropped = 0usize;
    for row in reader.deserialize::<LabeledRow>() {
        match row.map_err(csv_err)?.into_example() {
            Some(example) => examples.push(example),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        warn!(dropped, "Dropped rows without a usable relevance label");
    }
    info!(rows = examples.len(), "Loaded labeled dataset");
    Ok(examples)
}

/// Shuffle with `seed` and split off `ceil(n * test_ratio)` examples for testing.
///
/// # Returns
///
/// `(train, test)`, both guaranteed non-empty.
///
/// # Errors
///
/// [`TrainingError::InvalidTestRatio`] unless `0 < test_ratio < 1`, and
/// [`TrainingError::TooFewExamples`] for fewer than two examples.
pub fn train_test_split(
    mut examples: Vec<LabeledExample>,
    test_ratio: f64,
    seed: u64,
) -> Result<(Vec<LabeledExample>, Vec<LabeledExample>), TrainingError> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(TrainingError::InvalidTestRatio(test_ratio));
    }
    let n = examples.len();
    if n < 2 {
        return Err(TrainingError::TooFewExamples(n));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    examples.shuffle(&mut rng);

    let test_size = ((n as f64 * test_ratio).ceil() as usize).clamp(1, n - 1);
    let train = examples.split_off(test_size);
    Ok((train, examples))
}

/// Fit on the training split and evaluate on the test split.
///
/// # Arguments
///
/// * `examples` - Cleaned labeled examples
/// * `config` - Split ratio, seed and model hyperparameters
///
/// # Returns
///
/// The fitted classifier with its held-out [`ClassificationReport`].
#[instrument(level = "info", skip_all, fields(examples = examples.len()))]
pub fn train_and_evaluate(
    examples: Vec<LabeledExample>,
    config: &TrainingConfig,
) -> Result<TrainedClassifier, TrainingError> {
    let (train, test) = train_test_split(examples, config.test_ratio, config.seed)?;

    let texts: Vec<&str> = train.iter().map(|e| e.text.as_str()).collect();
    let labels: Vec<bool> = train.iter().map(|e| e.relevant).collect();
    let mut classifier = TextClassifier::new(config.params);
    classifier.fit(&texts, &labels)?;

    let y_true: Vec<bool> = test.iter().map(|e| e.relevant).collect();
    let y_pred = test
        .iter()
        .map(|e| classifier.predict(&e.text))
        .collect::<Result<Vec<bool>, _>>()?;
    let report = ClassificationReport::new(&y_true, &y_pred);

    info!(
        train = train.len(),
        test = test.len(),
        accuracy = report.accuracy,
        "Classifier trained"
    );

    Ok(TrainedClassifier {
        classifier,
        report,
        train_size: train.len(),
        test_size: test.len(),
    })
}

/// Load the dataset at `path`, then train and evaluate.
pub fn train_from_file(
    path: &Path,
    config: &TrainingConfig,
) -> Result<TrainedClassifier, TrainingError> {
    let examples = load_labeled_dataset(path)?;
    train_and_evaluate(examples, config)
}
