//! Pipeline configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tumor_types::TargetSize;

use crate::error::{DatasetError, Result};
use crate::splits::SplitRatio;

/// Configuration for ingestion, partitioning and batching.
///
/// Defaults: 128x128 images, batches of 128, a 20% test split and 25% of
/// the remainder for validation.
///
/// # Example
///
/// ```
/// use tumor_dataset::PipelineConfig;
///
/// let config = PipelineConfig::default();
/// assert_eq!(config.batch_size, 128);
/// assert_eq!(config.shuffle_buffer, 1024);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Geometry every image is resized to.
    pub target_size: TargetSize,

    /// Samples per batch.
    pub batch_size: usize,

    /// Partitioner ratios and seeds.
    pub split: SplitConfig,

    /// Bounded shuffle buffer applied to the training subset.
    pub shuffle_buffer: usize,

    /// Seed for the training shuffle (`None` draws from entropy).
    pub shuffle_seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            target_size: TargetSize::SQUARE_128,
            batch_size: 128,
            split: SplitConfig::default(),
            shuffle_buffer: 1024,
            shuffle_seed: None,
        }
    }
}

impl PipelineConfig {
    /// Sets the target image size.
    #[must_use]
    pub const fn with_target_size(mut self, target_size: TargetSize) -> Self {
        self.target_size = target_size;
        self
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the split configuration.
    #[must_use]
    pub const fn with_split(mut self, split: SplitConfig) -> Self {
        self.split = split;
        self
    }

    /// Sets the shuffle buffer size.
    #[must_use]
    pub const fn with_shuffle_buffer(mut self, shuffle_buffer: usize) -> Self {
        self.shuffle_buffer = shuffle_buffer;
        self
    }

    /// Sets the training shuffle seed.
    #[must_use]
    pub const fn with_shuffle_seed(mut self, seed: u64) -> Self {
        self.shuffle_seed = Some(seed);
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidConfig`] or
    /// [`DatasetError::InvalidSplitRatio`] describing the first bad field.
    pub fn validate(&self) -> Result<()> {
        self.target_size
            .validate()
            .map_err(|e| DatasetError::invalid_config(e.to_string()))?;
        if self.batch_size == 0 {
            return Err(DatasetError::invalid_config("batch_size must be positive"));
        }
        if self.shuffle_buffer == 0 {
            return Err(DatasetError::invalid_config(
                "shuffle_buffer must be positive",
            ));
        }
        self.split.validate()
    }

    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns IO, serialization, or validation errors.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Writes the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns IO or serialization errors.
    pub fn to_json_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

/// Ratios and seeds for the two-stage stratified split.
///
/// Stage 1 holds out `test_ratio` of the full dataset; stage 2 holds out
/// `validation_ratio` of what remains. Each stage has its own seed, and a
/// config with `test_seed == validation_seed` is refused by
/// [`SplitConfig::validate`] and therefore by
/// [`Partitioner::partition`](crate::Partitioner::partition).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Fraction of the full dataset held out for testing.
    pub test_ratio: f64,

    /// Fraction of train+validation held out for validation.
    pub validation_ratio: f64,

    /// Seed for stage 1.
    pub test_seed: u64,

    /// Seed for stage 2. Equal to `test_seed` is an
    /// [`InvalidConfig`](crate::DatasetError::InvalidConfig) error.
    pub validation_seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            validation_ratio: 0.25,
            test_seed: 42,
            validation_seed: 49,
        }
    }
}

impl SplitConfig {
    /// Sets both seeds.
    #[must_use]
    pub const fn with_seeds(mut self, test_seed: u64, validation_seed: u64) -> Self {
        self.test_seed = test_seed;
        self.validation_seed = validation_seed;
        self
    }

    /// Sets both ratios.
    #[must_use]
    pub const fn with_ratios(mut self, test_ratio: f64, validation_ratio: f64) -> Self {
        self.test_ratio = test_ratio;
        self.validation_ratio = validation_ratio;
        self
    }

    /// Stage-1 held-out ratio.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidSplitRatio`] if out of `(0, 1)`.
    pub fn test_split(&self) -> Result<SplitRatio> {
        SplitRatio::try_new(self.test_ratio)
            .ok_or(DatasetError::InvalidSplitRatio(self.test_ratio))
    }

    /// Stage-2 held-out ratio.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidSplitRatio`] if out of `(0, 1)`.
    pub fn validation_split(&self) -> Result<SplitRatio> {
        SplitRatio::try_new(self.validation_ratio)
            .ok_or(DatasetError::InvalidSplitRatio(self.validation_ratio))
    }

    /// Validates ratios and seeds.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InvalidSplitRatio`] for a bad ratio and
    /// [`DatasetError::InvalidConfig`] when both stages share a seed.
    pub fn validate(&self) -> Result<()> {
        self.test_split()?;
        self.validation_split()?;
        if self.test_seed == self.validation_seed {
            return Err(DatasetError::invalid_config(
                "test_seed and validation_seed must differ",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_size, TargetSize::new(128, 128));
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.shuffle_buffer, 1024);
        assert!(config.shuffle_seed.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn split_config_default() {
        let split = SplitConfig::default();
        assert_eq!(split.test_ratio, 0.2);
        assert_eq!(split.validation_ratio, 0.25);
        assert_eq!(split.test_seed, 42);
        assert_eq!(split.validation_seed, 49);
    }

    #[test]
    fn pipeline_config_builder() {
        let config = PipelineConfig::default()
            .with_target_size(TargetSize::new(64, 64))
            .with_batch_size(16)
            .with_shuffle_buffer(32)
            .with_shuffle_seed(7);

        assert_eq!(config.target_size.width, 64);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.shuffle_buffer, 32);
        assert_eq!(config.shuffle_seed, Some(7));
    }

    #[test]
    fn pipeline_config_invalid() {
        assert!(PipelineConfig::default().with_batch_size(0).validate().is_err());
        assert!(
            PipelineConfig::default()
                .with_target_size(TargetSize::new(0, 128))
                .validate()
                .is_err()
        );
        assert!(
            PipelineConfig::default()
                .with_shuffle_buffer(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn split_config_rejects_shared_seed() {
        let split = SplitConfig::default().with_seeds(42, 42);
        assert!(matches!(
            split.validate(),
            Err(DatasetError::InvalidConfig(_))
        ));
    }

    #[test]
    fn split_config_rejects_bad_ratio() {
        let split = SplitConfig::default().with_ratios(1.0, 0.25);
        assert!(matches!(
            split.validate(),
            Err(DatasetError::InvalidSplitRatio(_))
        ));
    }

    #[test]
    fn config_partial_json_uses_defaults() {
        let parsed: PipelineConfig =
            serde_json::from_str(r#"{ "batch_size": 32, "split": { "test_seed": 1 } }"#).unwrap();
        assert_eq!(parsed.batch_size, 32);
        assert_eq!(parsed.split.test_seed, 1);
        assert_eq!(parsed.split.validation_seed, 49);
        assert_eq!(parsed.shuffle_buffer, 1024);
    }

    #[test]
    fn config_json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let config = PipelineConfig::default().with_batch_size(8);

        config.to_json_file(&path).unwrap();
        let loaded = PipelineConfig::from_json_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn config_json_file_missing() {
        let result = PipelineConfig::from_json_file("/nonexistent/pipeline.json");
        assert!(matches!(result, Err(DatasetError::Io(_))));
    }
}
