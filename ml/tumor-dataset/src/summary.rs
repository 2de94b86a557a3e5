//! Class distribution and dataset statistics.

use serde::{Deserialize, Serialize};
use tumor_types::Label;

/// Per-label sample counts.
///
/// # Example
///
/// ```
/// use tumor_dataset::ClassCounts;
/// use tumor_types::Label;
///
/// let counts = ClassCounts::from_labels([Label::NoTumor, Label::Tumor, Label::Tumor]);
/// assert_eq!(counts.total(), 3);
/// assert_eq!(counts.get(Label::Tumor), 2);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassCounts {
    /// Samples labeled [`Label::NoTumor`].
    pub no_tumor: usize,

    /// Samples labeled [`Label::Tumor`].
    pub tumor: usize,
}

impl ClassCounts {
    /// Counts labels from any iterator.
    pub fn from_labels(labels: impl IntoIterator<Item = Label>) -> Self {
        let mut counts = Self::default();
        for label in labels {
            counts.increment(label);
        }
        counts
    }

    /// Adds one sample of `label`.
    pub const fn increment(&mut self, label: Label) {
        match label {
            Label::NoTumor => self.no_tumor += 1,
            Label::Tumor => self.tumor += 1,
        }
    }

    /// Count for one label.
    #[must_use]
    pub const fn get(&self, label: Label) -> usize {
        match label {
            Label::NoTumor => self.no_tumor,
            Label::Tumor => self.tumor,
        }
    }

    /// Total samples.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.no_tumor + self.tumor
    }

    /// Fraction of tumor samples (0 when empty).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn positive_ratio(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        self.tumor as f64 / total as f64
    }

    /// Labels with zero samples.
    #[must_use]
    pub fn missing(&self) -> Vec<Label> {
        Label::ALL
            .into_iter()
            .filter(|&label| self.get(label) == 0)
            .collect()
    }
}

impl std::fmt::Display for ClassCounts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{0: {}, 1: {}}}", self.no_tumor, self.tumor)
    }
}

/// Summary statistics for an assembled dataset.
///
/// # Example
///
/// ```
/// use tumor_dataset::DatasetSummary;
/// use tumor_types::Label;
///
/// let labels = [Label::NoTumor, Label::NoTumor, Label::Tumor];
/// let summary = DatasetSummary::from_labels(labels, Some([128, 128, 3]));
/// assert_eq!(summary.total_samples, 3);
/// assert!(summary.is_imbalanced());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    /// Total number of samples.
    pub total_samples: usize,

    /// Per-label counts.
    pub counts: ClassCounts,

    /// Tumor ratio (0 to 1).
    pub positive_ratio: f64,

    /// Shape shared by every image, if any were loaded.
    pub image_shape: Option<[usize; 3]>,
}

impl DatasetSummary {
    /// Creates a summary from labels and the common image shape.
    pub fn from_labels(
        labels: impl IntoIterator<Item = Label>,
        image_shape: Option<[usize; 3]>,
    ) -> Self {
        let counts = ClassCounts::from_labels(labels);
        Self {
            total_samples: counts.total(),
            counts,
            positive_ratio: counts.positive_ratio(),
            image_shape,
        }
    }

    /// Returns true if the dataset is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.total_samples == 0
    }

    /// Returns true if both labels have at least one sample.
    #[must_use]
    pub const fn has_both_classes(&self) -> bool {
        self.counts.no_tumor > 0 && self.counts.tumor > 0
    }

    /// Returns true if both classes are present with unequal counts.
    #[must_use]
    pub const fn is_imbalanced(&self) -> bool {
        self.has_both_classes() && self.counts.no_tumor != self.counts.tumor
    }

    /// Checks if the positive ratio is within `tolerance` of 0.5.
    #[must_use]
    pub fn is_balanced(&self, tolerance: f64) -> bool {
        (self.positive_ratio - 0.5).abs() <= tolerance
    }

    /// Returns a human-readable summary string.
    #[must_use]
    #[allow(clippy::let_underscore_must_use)] // String::write_fmt is infallible
    pub fn to_report(&self) -> String {
        use std::fmt::Write;

        let mut report = String::new();
        let _ = writeln!(report, "Data Loading Summary");
        let _ = writeln!(report, "====================");
        let _ = writeln!(report, "Total images loaded: {}", self.total_samples);
        if let Some([h, w, c]) = self.image_shape {
            let _ = writeln!(
                report,
                "Shape of image data: ({}, {h}, {w}, {c})",
                self.total_samples
            );
        }
        let _ = writeln!(
            report,
            "Class Distribution (0: No Tumor, 1: Yes Tumor): {}",
            self.counts
        );
        let _ = writeln!(report, "Positive ratio: {:.1}%", self.positive_ratio * 100.0);
        if self.is_empty() {
            let _ = writeln!(report, "No images were loaded.");
        } else if !self.has_both_classes() {
            let _ = writeln!(report, "Warning: one or both classes are missing.");
        } else if self.is_imbalanced() {
            let _ = writeln!(report, "Note: the dataset is imbalanced.");
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_from_labels() {
        let counts = ClassCounts::from_labels([Label::Tumor, Label::Tumor, Label::NoTumor]);
        assert_eq!(counts.no_tumor, 1);
        assert_eq!(counts.tumor, 2);
        assert_eq!(counts.total(), 3);
        assert!((counts.positive_ratio() - 2.0 / 3.0).abs() < 1e-12);
        assert!(counts.missing().is_empty());
    }

    #[test]
    fn counts_missing() {
        let counts = ClassCounts::from_labels([Label::NoTumor]);
        assert_eq!(counts.missing(), vec![Label::Tumor]);
        assert_eq!(ClassCounts::default().missing().len(), 2);
    }

    #[test]
    fn counts_display() {
        let counts = ClassCounts {
            no_tumor: 98,
            tumor: 155,
        };
        assert_eq!(format!("{counts}"), "{0: 98, 1: 155}");
    }

    #[test]
    fn summary_empty() {
        let summary = DatasetSummary::from_labels([], None);
        assert!(summary.is_empty());
        assert!(!summary.is_imbalanced());
        assert!(summary.to_report().contains("No images were loaded"));
    }

    #[test]
    fn summary_balanced() {
        let labels = [Label::NoTumor, Label::Tumor, Label::NoTumor, Label::Tumor];
        let summary = DatasetSummary::from_labels(labels, Some([8, 8, 3]));
        assert!(summary.has_both_classes());
        assert!(!summary.is_imbalanced());
        assert!(summary.is_balanced(0.0));
        assert!(summary.to_report().contains("(4, 8, 8, 3)"));
    }

    #[test]
    fn summary_single_class() {
        let summary = DatasetSummary::from_labels([Label::Tumor, Label::Tumor], None);
        assert!(!summary.has_both_classes());
        assert!(!summary.is_imbalanced());
        assert!(summary.to_report().contains("missing"));
    }

    #[test]
    fn summary_imbalanced_report() {
        let labels = [Label::NoTumor, Label::Tumor, Label::Tumor];
        let summary = DatasetSummary::from_labels(labels, None);
        assert!(summary.is_imbalanced());
        assert!(summary.to_report().contains("imbalanced"));
    }

    #[test]
    fn summary_serialization() {
        let summary = DatasetSummary::from_labels([Label::Tumor], Some([4, 4, 3]));
        let json = serde_json::to_string(&summary).unwrap();
        let parsed: DatasetSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, summary);
    }
}
