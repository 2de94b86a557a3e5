//! Per-epoch training history.

use serde::{Deserialize, Serialize};

/// Metrics recorded at the end of one epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpochRecord {
    /// Epoch number (0-indexed).
    pub epoch: usize,

    /// Mean training loss over the epoch's steps.
    pub loss: f32,

    /// Mean training accuracy over the epoch's steps.
    pub accuracy: f32,

    /// Validation binary cross-entropy.
    pub val_loss: f32,

    /// Validation accuracy.
    pub val_accuracy: f32,

    /// Learning rate used during the epoch.
    pub learning_rate: f32,
}

impl EpochRecord {
    /// Returns `true` if every value is finite.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        [self.loss, self.accuracy, self.val_loss, self.val_accuracy]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// History of a training run.
///
/// # Example
///
/// ```
/// use tumor_training::{EpochRecord, History};
///
/// let mut history = History::new();
/// history.push(EpochRecord { epoch: 0, loss: 0.7, accuracy: 0.5, val_loss: 0.6, val_accuracy: 0.6, learning_rate: 1e-3 });
/// history.push(EpochRecord { epoch: 1, loss: 0.5, accuracy: 0.7, val_loss: 0.65, val_accuracy: 0.6, learning_rate: 1e-3 });
///
/// assert_eq!(history.len(), 2);
/// assert_eq!(history.best_epoch(), Some(0));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    records: Vec<EpochRecord>,
    best_epoch: Option<usize>,
    stop_reason: Option<String>,
    restored_epoch: Option<usize>,
}

impl History {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an epoch, tracking the lowest validation loss.
    pub fn push(&mut self, record: EpochRecord) {
        let improved = self
            .best()
            .is_none_or(|best| record.val_loss < best.val_loss);
        if improved {
            self.best_epoch = Some(record.epoch);
        }
        self.records.push(record);
    }

    /// Number of recorded epochs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// All records in epoch order.
    #[must_use]
    pub fn records(&self) -> &[EpochRecord] {
        &self.records
    }

    /// Last record.
    #[must_use]
    pub fn last(&self) -> Option<&EpochRecord> {
        self.records.last()
    }

    /// Epoch with the lowest validation loss.
    #[must_use]
    pub const fn best_epoch(&self) -> Option<usize> {
        self.best_epoch
    }

    /// Record with the lowest validation loss.
    #[must_use]
    pub fn best(&self) -> Option<&EpochRecord> {
        self.best_epoch
            .and_then(|epoch| self.records.iter().find(|r| r.epoch == epoch))
    }

    /// Training loss per epoch.
    #[must_use]
    pub fn loss(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.loss).collect()
    }

    /// Training accuracy per epoch.
    #[must_use]
    pub fn accuracy(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.accuracy).collect()
    }

    /// Validation loss per epoch.
    #[must_use]
    pub fn val_loss(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.val_loss).collect()
    }

    /// Validation accuracy per epoch.
    #[must_use]
    pub fn val_accuracy(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.val_accuracy).collect()
    }

    /// Learning rate per epoch.
    #[must_use]
    pub fn learning_rate(&self) -> Vec<f32> {
        self.records.iter().map(|r| r.learning_rate).collect()
    }

    /// Returns `true` if training ended before the epoch budget.
    #[must_use]
    pub const fn stopped_early(&self) -> bool {
        self.stop_reason.is_some()
    }

    /// Why training stopped early, if it did.
    #[must_use]
    pub fn stop_reason(&self) -> Option<&str> {
        self.stop_reason.as_deref()
    }

    /// Epoch whose weights were restored at the end, if any.
    #[must_use]
    pub const fn restored_epoch(&self) -> Option<usize> {
        self.restored_epoch
    }

    /// Marks the run as stopped early.
    pub fn set_stopped(&mut self, reason: impl Into<String>) {
        self.stop_reason = Some(reason.into());
    }

    /// Records that the weights of `epoch` were restored.
    pub const fn set_restored(&mut self, epoch: usize) {
        self.restored_epoch = Some(epoch);
    }

    /// Returns a human-readable summary.
    #[must_use]
    #[allow(clippy::let_underscore_must_use)] // String::write_fmt is infallible
    pub fn summary(&self) -> String {
        use std::fmt::Write;

        let mut s = String::new();
        let _ = writeln!(s, "Training Summary");
        let _ = writeln!(s, "================");
        let _ = writeln!(s, "Epochs completed: {}", self.len());
        if let (Some(first), Some(last)) = (self.records.first(), self.last()) {
            let _ = writeln!(s, "Loss: {:.4} -> {:.4}", first.loss, last.loss);
            let _ = writeln!(s, "Accuracy: {:.4} -> {:.4}", first.accuracy, last.accuracy);
        }
        if let Some(best) = self.best() {
            let _ = writeln!(
                s,
                "Best val loss: {:.4} (epoch {}, val accuracy {:.4})",
                best.val_loss, best.epoch, best.val_accuracy
            );
        }
        if let Some(reason) = &self.stop_reason {
            let _ = writeln!(s, "Early stopped: {reason}");
        }
        if let Some(epoch) = self.restored_epoch {
            let _ = writeln!(s, "Restored weights from epoch {epoch}");
        }
        s
    }
}

/// Simple moving average in "valid" mode.
///
/// The output has `len - window + 1` points, each the mean of `window`
/// consecutive inputs. A series shorter than the window (or a window of
/// 0 or 1) is returned unchanged.
///
/// # Example
///
/// ```
/// use tumor_training::moving_average;
///
/// assert_eq!(moving_average(&[1.0, 2.0, 3.0, 4.0], 2), vec![1.5, 2.5, 3.5]);
/// assert_eq!(moving_average(&[1.0, 2.0], 3), vec![1.0, 2.0]);
/// ```
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn moving_average(series: &[f32], window: usize) -> Vec<f32> {
    if window <= 1 || series.len() < window {
        return series.to_vec();
    }
    series
        .windows(window)
        .map(|w| w.iter().sum::<f32>() / window as f32)
        .collect()
}
