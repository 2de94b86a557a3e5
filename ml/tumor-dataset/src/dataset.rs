//! Dataset assembly.
//!
//! Concatenates the samples of both labeled directories (no-tumor first)
//! without shuffling. Shuffling happens later, in the batch pipeline.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use tumor_types::{ImageBatch, ImageTensor, Label, ValidationError};

use crate::error::{DatasetError, Result};
use crate::ingest::{IngestReport, ingest_directory};
use crate::preprocess::Preprocessor;
use crate::sample::Sample;
use crate::summary::DatasetSummary;

/// All ingested samples, in assembly order.
///
/// Every image shares one shape.
///
/// # Example
///
/// ```
/// use tumor_dataset::{Dataset, Sample};
/// use tumor_types::{ImageTensor, Label, TargetSize};
///
/// let size = TargetSize::new(4, 4);
/// let dataset = Dataset::from_samples(vec![
///     Sample::new(ImageTensor::zeros(size), Label::NoTumor),
///     Sample::new(ImageTensor::filled(size, 1.0), Label::Tumor),
/// ])
/// .unwrap();
///
/// assert_eq!(dataset.len(), 2);
/// assert_eq!(dataset.labels(), vec![Label::NoTumor, Label::Tumor]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    samples: Vec<Sample>,
}

impl Dataset {
    /// Builds a dataset from samples.
    ///
    /// # Errors
    ///
    /// Returns a shape-mismatch type error if image shapes differ.
    pub fn from_samples(samples: Vec<Sample>) -> Result<Self> {
        if let Some(first) = samples.first() {
            let expected = first.shape();
            if let Some(odd) = samples.iter().find(|s| s.shape() != expected) {
                return Err(DatasetError::Types(
                    ValidationError::ShapeMismatch {
                        expected,
                        actual: odd.shape(),
                    }
                    .into(),
                ));
            }
        }
        Ok(Self { samples })
    }

    /// Concatenates two ingestion reports, `first` before `second`.
    ///
    /// Logs total and per-label counts, a warning when a class is missing and
    /// a note when the classes are imbalanced. No rebalancing is applied.
    ///
    /// # Errors
    ///
    /// Returns a shape-mismatch type error if the reports were produced with
    /// different target sizes.
    pub fn assemble(first: IngestReport, second: IngestReport) -> Result<Assembly> {
        let mut samples = Vec::with_capacity(first.loaded() + second.loaded());
        let mut failures = Vec::new();
        let mut missing_directories = Vec::new();
        let mut ignored = 0;

        for report in [first, second] {
            samples.extend(report.samples);
            failures.extend(report.failures);
            ignored += report.ignored;
            if let Some(err) = report.error {
                error!(
                    directory = %report.directory.display(),
                    error = %err,
                    "directory contributed no samples"
                );
                missing_directories.push(report.directory);
            }
        }

        let dataset = Self::from_samples(samples)?;
        let summary = dataset.summary();
        log_summary(&summary);

        Ok(Assembly {
            dataset,
            summary,
            failures,
            missing_directories,
            ignored,
        })
    }

    /// Ingests both labeled directories and assembles them.
    ///
    /// # Errors
    ///
    /// See [`Dataset::assemble`]. Missing directories and per-file failures
    /// are recorded on the [`Assembly`], not returned.
    pub fn load(no_tumor_dir: &Path, tumor_dir: &Path, preprocessor: &Preprocessor) -> Result<Assembly> {
        let no_tumor = ingest_directory(no_tumor_dir, Label::NoTumor, preprocessor);
        let tumor = ingest_directory(tumor_dir, Label::Tumor, preprocessor);
        Self::assemble(no_tumor, tumor)
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if no samples were assembled.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Returns [`DatasetError::EmptyDataset`] when nothing was loaded.
    ///
    /// # Errors
    ///
    /// Fails for an empty dataset.
    pub fn ensure_non_empty(&self) -> Result<()> {
        if self.is_empty() {
            return Err(DatasetError::EmptyDataset);
        }
        Ok(())
    }

    /// All samples.
    #[must_use]
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// Sample at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Sample> {
        self.samples.get(index)
    }

    /// Labels in dataset order.
    #[must_use]
    pub fn labels(&self) -> Vec<Label> {
        self.samples.iter().map(|s| s.label).collect()
    }

    /// Shared image shape, `None` when empty.
    #[must_use]
    pub fn image_shape(&self) -> Option<[usize; 3]> {
        self.samples.first().map(Sample::shape)
    }

    /// Class distribution and shape.
    #[must_use]
    pub fn summary(&self) -> DatasetSummary {
        DatasetSummary::from_labels(self.samples.iter().map(|s| s.label), self.image_shape())
    }

    /// Stacks the samples at `indices` into a labeled batch.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidConfig`] for an out-of-range index and
    /// a type error for an empty index list.
    pub fn batch(&self, indices: &[usize]) -> Result<ImageBatch> {
        let mut images: Vec<&ImageTensor> = Vec::with_capacity(indices.len());
        let mut labels = Vec::with_capacity(indices.len());
        for &index in indices {
            let sample = self.get(index).ok_or_else(|| {
                DatasetError::invalid_config(format!(
                    "sample index {index} out of range for dataset of {}",
                    self.len()
                ))
            })?;
            images.push(&sample.image);
            labels.push(sample.label);
        }
        Ok(ImageBatch::labeled(&images, labels)?)
    }
}

/// Assembled dataset plus what ingestion skipped.
#[derive(Debug)]
pub struct Assembly {
    /// Concatenated samples.
    pub dataset: Dataset,

    /// Class distribution at assembly time.
    pub summary: DatasetSummary,

    /// Per-file decode and shape failures from both directories.
    pub failures: Vec<DatasetError>,

    /// Labeled directories that could not be scanned.
    pub missing_directories: Vec<PathBuf>,

    /// Non-image entries skipped.
    pub ignored: usize,
}

impl Assembly {
    /// Returns `true` if every directory existed and every image loaded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.missing_directories.is_empty()
    }
}

fn log_summary(summary: &DatasetSummary) {
    info!(
        total = summary.total_samples,
        no_tumor = summary.counts.no_tumor,
        tumor = summary.counts.tumor,
        "class distribution"
    );

    if summary.is_empty() {
        error!("no images were loaded; check dataset paths and contents");
        return;
    }

    let missing = summary.counts.missing();
    if !missing.is_empty() {
        let names: Vec<&str> = missing.iter().map(|l| l.name()).collect();
        warn!(missing = ?names, "one or both classes have no samples");
    } else if summary.is_imbalanced() {
        info!(
            positive_ratio = summary.positive_ratio,
            "dataset is imbalanced; no rebalancing applied"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tumor_types::TargetSize;

    use super::*;

    fn sample(size: TargetSize, label: Label) -> Sample {
        Sample::new(ImageTensor::filled(size, 0.5), label)
    }

    fn report(label: Label, count: usize) -> IngestReport {
        IngestReport {
            directory: PathBuf::from(label.name()),
            label,
            samples: (0..count)
                .map(|_| sample(TargetSize::new(4, 4), label))
                .collect(),
            failures: Vec::new(),
            ignored: 0,
            error: None,
        }
    }

    #[test]
    fn from_samples_rejects_mixed_shapes() {
        let result = Dataset::from_samples(vec![
            sample(TargetSize::new(4, 4), Label::NoTumor),
            sample(TargetSize::new(4, 5), Label::Tumor),
        ]);
        assert!(matches!(result, Err(DatasetError::Types(_))));
    }

    #[test]
    fn assemble_concatenates_in_order() {
        let assembly = Dataset::assemble(report(Label::NoTumor, 2), report(Label::Tumor, 3)).unwrap();
        let dataset = &assembly.dataset;

        assert_eq!(dataset.len(), 5);
        assert_eq!(
            dataset.labels(),
            vec![
                Label::NoTumor,
                Label::NoTumor,
                Label::Tumor,
                Label::Tumor,
                Label::Tumor
            ]
        );
        assert_eq!(assembly.summary.counts.no_tumor, 2);
        assert_eq!(assembly.summary.counts.tumor, 3);
        assert!(assembly.is_clean());
    }

    #[test]
    fn assemble_records_missing_directory() {
        let missing = ingest_directory(Path::new("/nonexistent/no"), Label::NoTumor, &Preprocessor::default());
        let assembly = Dataset::assemble(missing, report(Label::Tumor, 1)).unwrap();

        assert_eq!(assembly.dataset.len(), 1);
        assert_eq!(assembly.missing_directories, vec![PathBuf::from("/nonexistent/no")]);
        assert!(!assembly.is_clean());
    }

    #[test]
    fn empty_dataset_detected() {
        let dataset = Dataset::default();
        assert!(matches!(
            dataset.ensure_non_empty(),
            Err(DatasetError::EmptyDataset)
        ));
        assert!(dataset.image_shape().is_none());
    }

    #[test]
    fn batch_from_indices() {
        let assembly = Dataset::assemble(report(Label::NoTumor, 2), report(Label::Tumor, 2)).unwrap();
        let batch = assembly.dataset.batch(&[3, 0]).unwrap();

        assert_eq!(batch.shape(), [2, 4, 4, 3]);
        assert_eq!(batch.labels(), &[Label::Tumor, Label::NoTumor]);
        assert!(assembly.dataset.batch(&[9]).is_err());
        assert!(assembly.dataset.batch(&[]).is_err());
    }
}
