//! Evaluation metrics for the binary relevance classifier.
//!
//! Produces accuracy and a per-class precision / recall / F1 / support table
//! with macro and support-weighted averages. Undefined ratios (zero
//! denominators) are reported as 0.0.

use std::fmt;

/// Confusion counts with `true` as the positive class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    pub tp: usize,
    pub tn: usize,
    pub fp: usize,
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(y_true: &[bool], y_pred: &[bool]) -> Self {
        let mut cm = Self::default();
        for (&t, &p) in y_true.iter().zip(y_pred) {
            match (t, p) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

/// Scores for one class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

impl ClassScores {
    fn from_counts(tp: usize, fp: usize, fn_: usize) -> Self {
        let precision = ratio(tp, tp + fp);
        let recall = ratio(tp, tp + fn_);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            precision,
            recall,
            f1,
            support: tp + fn_,
        }
    }
}

fn ratio(num: usize, denom: usize) -> f64 {
    if denom == 0 {
        0.0
    } else {
        num as f64 / denom as f64
    }
}

/// Accuracy plus per-class scores for the negative (`0`) and positive (`1`) class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub confusion: ConfusionMatrix,
    pub accuracy: f64,
    pub negative: ClassScores,
    pub positive: ClassScores,
}

impl ClassificationReport {
    pub fn new(y_true: &[bool], y_pred: &[bool]) -> Self {
        let cm = ConfusionMatrix::from_predictions(y_true, y_pred);
        Self {
            confusion: cm,
            accuracy: ratio(cm.tp + cm.tn, cm.total()),
            // The negative class sees the matrix mirrored.
            negative: ClassScores::from_counts(cm.tn, cm.fn_, cm.fp),
            positive: ClassScores::from_counts(cm.tp, cm.fp, cm.fn_),
        }
    }

    /// Unweighted mean over both classes.
    pub fn macro_avg(&self) -> ClassScores {
        let (n, p) = (&self.negative, &self.positive);
        ClassScores {
            precision: (n.precision + p.precision) / 2.0,
            recall: (n.recall + p.recall) / 2.0,
            f1: (n.f1 + p.f1) / 2.0,
            support: n.support + p.support,
        }
    }

    /// Mean over both classes weighted by support.
    pub fn weighted_avg(&self) -> ClassScores {
        let (n, p) = (&self.negative, &self.positive);
        let total = n.support + p.support;
        let w = |a: f64, b: f64| {
            if total == 0 {
                0.0
            } else {
                (a * n.support as f64 + b * p.support as f64) / total as f64
            }
        };
        ClassScores {
            precision: w(n.precision, p.precision),
            recall: w(n.recall, p.recall),
            f1: w(n.f1, p.f1),
            support: total,
        }
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, label: &str, s: &ClassScores) -> fmt::Result {
    writeln!(
        f,
        "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        label, s.precision, s.recall, s.f1, s.support
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        write_row(f, "0", &self.negative)?;
        write_row(f, "1", &self.positive)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.confusion.total()
        )?;
        write_row(f, "macro avg", &self.macro_avg())?;
        write_row(f, "weighted avg", &self.weighted_avg())
    }
}
