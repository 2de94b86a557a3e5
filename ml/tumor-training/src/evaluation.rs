//! Held-out evaluation: loss, accuracy, confusion matrix and per-class report.

use serde::{Deserialize, Serialize};
use tracing::info;
use tumor_dataset::{BatchPipeline, Dataset, Subset};
use tumor_models::Classifier;
use tumor_types::{Label, Prediction};

use crate::error::{Result, TrainingError};

/// Probabilities are clipped to `[EPSILON, 1 - EPSILON]` before taking logs.
pub const EPSILON: f64 = 1e-7;

/// Mean binary cross-entropy of `probabilities` against `labels`.
///
/// Returns `NaN` for empty input.
///
/// # Example
///
/// ```
/// use tumor_training::binary_cross_entropy;
/// use tumor_types::Label;
///
/// let loss = binary_cross_entropy(&[0.5, 0.5], &[Label::NoTumor, Label::Tumor]);
/// assert!((loss - std::f32::consts::LN_2).abs() < 1e-6);
/// ```
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn binary_cross_entropy(probabilities: &[f32], labels: &[Label]) -> f32 {
    let n = probabilities.len().min(labels.len());
    if n == 0 {
        return f32::NAN;
    }
    let total: f64 = probabilities
        .iter()
        .zip(labels)
        .map(|(&p, &label)| {
            let p = f64::from(p).clamp(EPSILON, 1.0 - EPSILON);
            match label {
                Label::Tumor => -p.ln(),
                Label::NoTumor => -(1.0 - p).ln(),
            }
        })
        .sum();
    (total / n as f64) as f32
}

/// Fraction of thresholded predictions that match `labels`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn binary_accuracy(probabilities: &[f32], labels: &[Label]) -> f32 {
    let n = probabilities.len().min(labels.len());
    if n == 0 {
        return f32::NAN;
    }
    let correct = probabilities
        .iter()
        .zip(labels)
        .filter(|&(&p, &label)| Prediction::threshold(p) == label)
        .count();
    correct as f32 / n as f32
}

/// 2x2 confusion matrix, rows are actual labels and columns predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Actual no-tumor, predicted no-tumor.
    pub true_negative: usize,
    /// Actual no-tumor, predicted tumor.
    pub false_positive: usize,
    /// Actual tumor, predicted no-tumor.
    pub false_negative: usize,
    /// Actual tumor, predicted tumor.
    pub true_positive: usize,
}

impl ConfusionMatrix {
    /// Builds the matrix from paired actual and predicted labels.
    #[must_use]
    pub fn from_labels(actual: &[Label], predicted: &[Label]) -> Self {
        let mut matrix = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            matrix.record(a, p);
        }
        matrix
    }

    /// Adds one observation.
    pub const fn record(&mut self, actual: Label, predicted: Label) {
        match (actual, predicted) {
            (Label::NoTumor, Label::NoTumor) => self.true_negative += 1,
            (Label::NoTumor, Label::Tumor) => self.false_positive += 1,
            (Label::Tumor, Label::NoTumor) => self.false_negative += 1,
            (Label::Tumor, Label::Tumor) => self.true_positive += 1,
        }
    }

    /// Cell for `actual` row and `predicted` column.
    #[must_use]
    pub const fn get(&self, actual: Label, predicted: Label) -> usize {
        match (actual, predicted) {
            (Label::NoTumor, Label::NoTumor) => self.true_negative,
            (Label::NoTumor, Label::Tumor) => self.false_positive,
            (Label::Tumor, Label::NoTumor) => self.false_negative,
            (Label::Tumor, Label::Tumor) => self.true_positive,
        }
    }

    /// Rows as `[[tn, fp], [fn, tp]]`.
    #[must_use]
    pub const fn as_rows(&self) -> [[usize; 2]; 2] {
        [
            [self.true_negative, self.false_positive],
            [self.false_negative, self.true_positive],
        ]
    }

    /// Number of observations.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }

    /// Correct predictions over all predictions (0 when empty).
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_negative + self.true_positive, self.total())
    }

    /// Precision, recall, F1 and support for `label`.
    #[must_use]
    pub fn class_metrics(&self, label: Label) -> ClassMetrics {
        let other = label.other();
        let hits = self.get(label, label);
        let predicted = hits + self.get(other, label);
        let support = hits + self.get(label, other);
        let precision = ratio(hits, predicted);
        let recall = ratio(hits, support);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        ClassMetrics {
            precision,
            recall,
            f1,
            support,
        }
    }
}

impl std::fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "[[{} {}]", self.true_negative, self.false_positive)?;
        write!(f, " [{} {}]]", self.false_negative, self.true_positive)
    }
}

/// Zero when the denominator is zero.
#[allow(clippy::cast_precision_loss)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Per-class scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    /// Fraction of predictions of this class that were right.
    pub precision: f64,
    /// Fraction of this class that was found.
    pub recall: f64,
    /// Harmonic mean of precision and recall.
    pub f1: f64,
    /// Samples of this class.
    pub support: usize,
}

/// Per-class precision/recall/F1 plus accuracy and averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Scores for `NoTumor`.
    pub no_tumor: ClassMetrics,
    /// Scores for `Tumor`.
    pub tumor: ClassMetrics,
    /// Overall accuracy.
    pub accuracy: f64,
    /// Unweighted mean over the two classes.
    pub macro_avg: ClassMetrics,
    /// Support-weighted mean over the two classes.
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    /// Derives the report from a confusion matrix.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn from_confusion(matrix: &ConfusionMatrix) -> Self {
        let no_tumor = matrix.class_metrics(Label::NoTumor);
        let tumor = matrix.class_metrics(Label::Tumor);
        let total = matrix.total();

        let macro_avg = ClassMetrics {
            precision: (no_tumor.precision + tumor.precision) / 2.0,
            recall: (no_tumor.recall + tumor.recall) / 2.0,
            f1: (no_tumor.f1 + tumor.f1) / 2.0,
            support: total,
        };
        let weight = |a: f64, b: f64| {
            if total == 0 {
                0.0
            } else {
                (a * no_tumor.support as f64 + b * tumor.support as f64) / total as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weight(no_tumor.precision, tumor.precision),
            recall: weight(no_tumor.recall, tumor.recall),
            f1: weight(no_tumor.f1, tumor.f1),
            support: total,
        };

        Self {
            no_tumor,
            tumor,
            accuracy: matrix.accuracy(),
            macro_avg,
            weighted_avg,
        }
    }

    /// Scores for `label`.
    #[must_use]
    pub const fn class(&self, label: Label) -> &ClassMetrics {
        match label {
            Label::NoTumor => &self.no_tumor,
            Label::Tumor => &self.tumor,
        }
    }
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        for label in Label::ALL {
            let m = self.class(label);
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                label.display_name(),
                m.precision,
                m.recall,
                m.f1,
                m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}

/// Result of evaluating a model on a subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Mean binary cross-entropy.
    pub loss: f32,
    /// Fraction of correct thresholded predictions.
    pub accuracy: f32,
    /// Confusion matrix.
    pub confusion: ConfusionMatrix,
    /// Per-class report.
    pub report: ClassificationReport,
    /// Model output per sample, in subset order.
    pub probabilities: Vec<f32>,
}

impl Evaluation {
    /// Scores precomputed probabilities against their labels.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::EmptySubset`] for empty input and
    /// [`TrainingError::InvalidConfig`] when the lengths differ.
    pub fn from_probabilities(probabilities: Vec<f32>, labels: &[Label]) -> Result<Self> {
        if labels.is_empty() {
            return Err(TrainingError::empty_subset("nothing to evaluate"));
        }
        if probabilities.len() != labels.len() {
            return Err(TrainingError::invalid_config(format!(
                "{} probabilities for {} labels",
                probabilities.len(),
                labels.len()
            )));
        }
        let predicted: Vec<Label> = probabilities.iter().map(|&p| Prediction::threshold(p)).collect();
        let confusion = ConfusionMatrix::from_labels(labels, &predicted);
        Ok(Self {
            loss: binary_cross_entropy(&probabilities, labels),
            accuracy: binary_accuracy(&probabilities, labels),
            report: ClassificationReport::from_confusion(&confusion),
            confusion,
            probabilities,
        })
    }

    /// Loss and accuracy lines followed by the report.
    #[must_use]
    pub fn to_report(&self) -> String {
        format!(
            "Test Loss: {:.4}\nTest Accuracy: {:.4}\n\nClassification Report:\n{}\nConfusion Matrix:\n{}\n",
            self.loss, self.accuracy, self.report, self.confusion
        )
    }
}

/// Runs `model` over `subset` in unshuffled batches and scores it.
///
/// # Errors
///
/// Returns [`TrainingError::EmptySubset`] for an empty subset, or dataset
/// and model errors from batching and prediction.
pub fn evaluate<C: Classifier + ?Sized>(
    model: &C,
    dataset: &Dataset,
    subset: &Subset,
    batch_size: usize,
) -> Result<Evaluation> {
    if subset.is_empty() {
        return Err(TrainingError::empty_subset("evaluation subset"));
    }
    let pipeline = BatchPipeline::new(dataset, subset.indices().to_vec(), batch_size);
    let mut probabilities = Vec::with_capacity(subset.len());
    let mut labels = Vec::with_capacity(subset.len());
    for batch in pipeline.epoch(0) {
        let batch = batch?;
        probabilities.extend(model.predict(&batch)?);
        labels.extend_from_slice(batch.labels());
    }
    let evaluation = Evaluation::from_probabilities(probabilities, &labels)?;
    info!(
        samples = labels.len(),
        loss = evaluation.loss,
        accuracy = evaluation.accuracy,
        "evaluation complete"
    );
    Ok(evaluation)
}
