//! Epoch-end callbacks driven by validation loss.

use serde::{Deserialize, Serialize};

use crate::config::{EarlyStoppingConfig, ReduceLrConfig};

/// What [`EarlyStopping::update`] decided for an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopDecision {
    /// Validation loss reached a new minimum.
    Improved,
    /// No improvement for this many consecutive epochs.
    Waiting(usize),
    /// Patience exhausted.
    Stop,
}

/// Stops training once validation loss has not improved for `patience` epochs.
///
/// # Example
///
/// ```
/// use tumor_training::{EarlyStopping, EarlyStoppingConfig, StopDecision};
///
/// let mut stopper = EarlyStopping::new(EarlyStoppingConfig::new(2));
/// assert_eq!(stopper.update(0, 0.5), StopDecision::Improved);
/// assert_eq!(stopper.update(1, 0.6), StopDecision::Waiting(1));
/// assert_eq!(stopper.update(2, 0.7), StopDecision::Stop);
/// assert_eq!(stopper.best_epoch(), Some(0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopping {
    config: EarlyStoppingConfig,
    best: Option<f32>,
    best_epoch: Option<usize>,
    wait: usize,
}

impl EarlyStopping {
    /// Creates a fresh tracker.
    #[must_use]
    pub const fn new(config: EarlyStoppingConfig) -> Self {
        Self {
            config,
            best: None,
            best_epoch: None,
            wait: 0,
        }
    }

    /// Configuration.
    #[must_use]
    pub const fn config(&self) -> &EarlyStoppingConfig {
        &self.config
    }

    /// Lowest validation loss seen.
    #[must_use]
    pub const fn best(&self) -> Option<f32> {
        self.best
    }

    /// Epoch of the lowest validation loss.
    #[must_use]
    pub const fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    /// Consecutive epochs without improvement.
    #[must_use]
    pub const fn wait(&self) -> usize {
        self.wait
    }

    /// Records `val_loss` for `epoch`.
    ///
    /// Any strict decrease counts as improvement. A disabled tracker still
    /// follows the best epoch but never returns [`StopDecision::Stop`].
    pub fn update(&mut self, epoch: usize, val_loss: f32) -> StopDecision {
        if self.best.is_none_or(|best| val_loss < best) {
            self.best = Some(val_loss);
            self.best_epoch = Some(epoch);
            self.wait = 0;
            return StopDecision::Improved;
        }
        self.wait += 1;
        if self.config.is_enabled() && self.wait >= self.config.patience {
            StopDecision::Stop
        } else {
            StopDecision::Waiting(self.wait)
        }
    }
}

/// Multiplies the learning rate by `factor` after `patience` flat epochs.
///
/// # Example
///
/// ```
/// use tumor_training::{ReduceLrConfig, ReduceLrOnPlateau};
///
/// let mut plateau = ReduceLrOnPlateau::new(ReduceLrConfig::new(0.5, 1), 1e-3);
/// assert_eq!(plateau.update(0.5), None);
/// assert_eq!(plateau.update(0.5), Some(5e-4));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReduceLrOnPlateau {
    config: ReduceLrConfig,
    learning_rate: f32,
    best: Option<f32>,
    wait: usize,
}

impl ReduceLrOnPlateau {
    /// Creates a schedule starting at `learning_rate`.
    #[must_use]
    pub const fn new(config: ReduceLrConfig, learning_rate: f32) -> Self {
        Self {
            config,
            learning_rate,
            best: None,
            wait: 0,
        }
    }

    /// Current learning rate.
    #[must_use]
    pub const fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// Records `val_loss` and returns the new learning rate if it was reduced.
    ///
    /// Improvement must beat the best loss by more than `min_delta`. The
    /// rate never drops below `min_lr`; once it sits there, plateaus are
    /// ignored.
    pub fn update(&mut self, val_loss: f32) -> Option<f32> {
        if self.best.is_none_or(|best| val_loss < best - self.config.min_delta) {
            self.best = Some(val_loss);
            self.wait = 0;
            return None;
        }
        if self.config.patience == 0 {
            return None;
        }
        self.wait += 1;
        if self.wait < self.config.patience || self.learning_rate <= self.config.min_lr {
            return None;
        }
        self.learning_rate = (self.learning_rate * self.config.factor).max(self.config.min_lr);
        self.wait = 0;
        Some(self.learning_rate)
    }
}
