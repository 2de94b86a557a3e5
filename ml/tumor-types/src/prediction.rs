//! Single-image prediction result.

use serde::{Deserialize, Serialize};

use crate::label::Label;

/// Probability above which a scan is classified as [`Label::Tumor`].
///
/// The comparison is strict: a probability of exactly 0.5 maps to
/// [`Label::NoTumor`].
pub const DECISION_THRESHOLD: f32 = 0.5;

/// Result of classifying one image.
///
/// # Example
///
/// ```
/// use tumor_types::{Label, Prediction};
///
/// let prediction = Prediction::from_probability(0.2);
/// assert_eq!(prediction.label, Label::NoTumor);
/// assert!((prediction.confidence - 0.8).abs() < 1e-6);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Prediction {
    /// Thresholded label.
    pub label: Label,

    /// Probability of the predicted label (`p` for tumor, `1 - p` otherwise).
    pub confidence: f32,

    /// Raw model probability of [`Label::Tumor`].
    pub probability: f32,
}

impl Prediction {
    /// Thresholds a tumor probability at [`DECISION_THRESHOLD`].
    #[must_use]
    pub fn from_probability(probability: f32) -> Self {
        let label = Self::threshold(probability);
        let confidence = match label {
            Label::Tumor => probability,
            Label::NoTumor => 1.0 - probability,
        };
        Self {
            label,
            confidence,
            probability,
        }
    }

    /// Maps a probability to a label without building a full prediction.
    #[must_use]
    pub fn threshold(probability: f32) -> Label {
        if probability > DECISION_THRESHOLD {
            Label::Tumor
        } else {
            Label::NoTumor
        }
    }

    /// Returns `true` if a tumor was predicted.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.label == Label::Tumor
    }
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Prediction: {} (Confidence: {:.2})",
            self.label, self.confidence
        )
    }
}
