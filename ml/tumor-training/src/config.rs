//! Training configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::augment::AugmentationConfig;
use crate::error::{Result, TrainingError};

/// Configuration for a training run.
///
/// # Example
///
/// ```
/// use tumor_training::TrainingConfig;
///
/// let config = TrainingConfig::default();
/// assert_eq!(config.epochs, 30);
/// assert_eq!(config.batch_size, 128);
/// assert!(config.is_valid());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Maximum number of epochs.
    pub epochs: usize,

    /// Batch size for training steps and evaluation.
    pub batch_size: usize,

    /// Optimizer configuration handed to the learner.
    pub optimizer: OptimizerConfig,

    /// Early stopping on validation loss.
    pub early_stopping: EarlyStoppingConfig,

    /// Learning-rate reduction on a validation-loss plateau.
    pub reduce_lr: ReduceLrConfig,

    /// Random transforms applied to training batches.
    pub augmentation: AugmentationConfig,

    /// Seed for epoch permutations and augmentation.
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self::new(30)
    }
}

impl TrainingConfig {
    /// Creates a config with the given epoch budget and default settings.
    #[must_use]
    pub const fn new(epochs: usize) -> Self {
        Self {
            epochs,
            batch_size: 128,
            optimizer: OptimizerConfig::adam(1e-3).with_weight_decay(0.01),
            early_stopping: EarlyStoppingConfig::new(10),
            reduce_lr: ReduceLrConfig::new(0.5, 5),
            augmentation: AugmentationConfig::standard(),
            seed: None,
        }
    }

    /// Sets the batch size.
    #[must_use]
    pub const fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the optimizer.
    #[must_use]
    pub const fn with_optimizer(mut self, optimizer: OptimizerConfig) -> Self {
        self.optimizer = optimizer;
        self
    }

    /// Sets early stopping.
    #[must_use]
    pub const fn with_early_stopping(mut self, early_stopping: EarlyStoppingConfig) -> Self {
        self.early_stopping = early_stopping;
        self
    }

    /// Sets the plateau schedule.
    #[must_use]
    pub const fn with_reduce_lr(mut self, reduce_lr: ReduceLrConfig) -> Self {
        self.reduce_lr = reduce_lr;
        self
    }

    /// Sets augmentation.
    #[must_use]
    pub const fn with_augmentation(mut self, augmentation: AugmentationConfig) -> Self {
        self.augmentation = augmentation;
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Returns `true` if all values are valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            return Err(TrainingError::invalid_config("epochs must be > 0"));
        }
        if self.batch_size == 0 {
            return Err(TrainingError::invalid_config("batch_size must be > 0"));
        }
        if !self.optimizer.is_valid() {
            return Err(TrainingError::invalid_config(format!(
                "optimizer: {:?}",
                self.optimizer
            )));
        }
        if !self.reduce_lr.is_valid() {
            return Err(TrainingError::invalid_config(format!(
                "reduce_lr: {:?}",
                self.reduce_lr
            )));
        }
        self.augmentation.validate()
    }

    /// Loads a configuration from a JSON file.
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
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Optimizer configuration.
///
/// The gradient step itself belongs to the [`Learner`](crate::Learner);
/// this only carries the hyperparameters it should use.
///
/// # Example
///
/// ```
/// use tumor_training::OptimizerConfig;
///
/// let adam = OptimizerConfig::adam(1e-3).with_weight_decay(0.01);
/// assert!(adam.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Initial learning rate.
    pub learning_rate: f32,

    /// L2 penalty on regularized kernels.
    pub weight_decay: f32,

    /// Optimizer type.
    pub optimizer_type: OptimizerType,

    /// Beta1 (Adam).
    pub beta1: f32,

    /// Beta2 (Adam).
    pub beta2: f32,

    /// Epsilon for numerical stability.
    pub epsilon: f32,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::adam(1e-3)
    }
}

impl OptimizerConfig {
    /// Creates an Adam optimizer config.
    #[must_use]
    pub const fn adam(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            optimizer_type: OptimizerType::Adam,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-7,
        }
    }

    /// Creates a plain SGD optimizer config.
    #[must_use]
    pub const fn sgd(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            weight_decay: 0.0,
            optimizer_type: OptimizerType::Sgd,
            beta1: 0.0,
            beta2: 0.0,
            epsilon: 1e-7,
        }
    }

    /// Sets the learning rate.
    #[must_use]
    pub const fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    /// Sets weight decay.
    #[must_use]
    pub const fn with_weight_decay(mut self, weight_decay: f32) -> Self {
        self.weight_decay = weight_decay;
        self
    }

    /// Returns `true` if the hyperparameters are usable.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.learning_rate > 0.0
            && self.weight_decay >= 0.0
            && (0.0..1.0).contains(&self.beta1)
            && (0.0..1.0).contains(&self.beta2)
            && self.epsilon > 0.0
    }
}

/// Optimizer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerType {
    /// Adam.
    #[default]
    Adam,
    /// Stochastic gradient descent.
    Sgd,
}

/// Early stopping on validation loss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyStoppingConfig {
    /// Epochs without improvement before stopping (0 disables).
    pub patience: usize,

    /// End training on the weights of the best validation epoch.
    pub restore_best_weights: bool,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        Self::new(10)
    }
}

impl EarlyStoppingConfig {
    /// Creates a config that restores the best weights.
    #[must_use]
    pub const fn new(patience: usize) -> Self {
        Self {
            patience,
            restore_best_weights: true,
        }
    }

    /// Disables early stopping.
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            patience: 0,
            restore_best_weights: false,
        }
    }

    /// Returns `true` when early stopping is active.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.patience > 0
    }
}

/// Learning-rate reduction when validation loss stops improving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReduceLrConfig {
    /// Multiplier applied on a plateau.
    pub factor: f32,

    /// Epochs without improvement before reducing (0 disables).
    pub patience: usize,

    /// Floor for the learning rate.
    pub min_lr: f32,

    /// Minimum decrease in validation loss that counts as improvement.
    pub min_delta: f32,
}

impl Default for ReduceLrConfig {
    fn default() -> Self {
        Self::new(0.5, 5)
    }
}

impl ReduceLrConfig {
    /// Creates a plateau schedule with `min_lr = 1e-6` and `min_delta = 1e-4`.
    #[must_use]
    pub const fn new(factor: f32, patience: usize) -> Self {
        Self {
            factor,
            patience,
            min_lr: 1e-6,
            min_delta: 1e-4,
        }
    }

    /// Sets the learning-rate floor.
    #[must_use]
    pub const fn with_min_lr(mut self, min_lr: f32) -> Self {
        self.min_lr = min_lr;
        self
    }

    /// Returns `true` if the factor is in `(0, 1)` and the rest is non-negative.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.factor > 0.0 && self.factor < 1.0 && self.min_lr >= 0.0 && self.min_delta >= 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TrainingConfig::default();
        assert_eq!(config.epochs, 30);
        assert_eq!(config.batch_size, 128);
        assert_eq!(config.optimizer.optimizer_type, OptimizerType::Adam);
        assert!((config.optimizer.learning_rate - 1e-3).abs() < 1e-9);
        assert!((config.optimizer.weight_decay - 0.01).abs() < 1e-9);
        assert_eq!(config.early_stopping.patience, 10);
        assert!(config.early_stopping.restore_best_weights);
        assert_eq!(config.reduce_lr.patience, 5);
        assert!((config.reduce_lr.factor - 0.5).abs() < 1e-9);
        assert!((config.reduce_lr.min_lr - 1e-6).abs() < 1e-12);
        assert!(config.seed.is_none());
    }

    #[test]
    fn builders() {
        let config = TrainingConfig::new(5)
            .with_batch_size(16)
            .with_seed(7)
            .with_optimizer(OptimizerConfig::sgd(0.1))
            .with_early_stopping(EarlyStoppingConfig::disabled());
        assert_eq!(config.epochs, 5);
        assert_eq!(config.batch_size, 16);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.optimizer.optimizer_type, OptimizerType::Sgd);
        assert!(!config.early_stopping.is_enabled());
    }

    #[test]
    fn invalid_configs() {
        assert!(!TrainingConfig::new(0).is_valid());
        assert!(!TrainingConfig::default().with_batch_size(0).is_valid());
        assert!(
            !TrainingConfig::default()
                .with_optimizer(OptimizerConfig::adam(0.0))
                .is_valid()
        );
        assert!(
            !TrainingConfig::default()
                .with_reduce_lr(ReduceLrConfig::new(1.5, 5))
                .is_valid()
        );
    }

    #[test]
    fn json_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("training.json");
        let config = TrainingConfig::new(12).with_seed(3);
        config.to_json_file(&path).unwrap();
        assert_eq!(TrainingConfig::from_json_file(&path).unwrap(), config);
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: TrainingConfig = serde_json::from_str(r#"{"epochs": 4}"#).unwrap();
        assert_eq!(config.epochs, 4);
        assert_eq!(config.batch_size, 128);
    }
}
