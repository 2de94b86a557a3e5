//! Training loop over a [`Learner`].

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tumor_dataset::{Dataset, Subset};
use tumor_models::Classifier;
use tumor_types::ImageBatch;

use crate::augment::Augmenter;
use crate::callbacks::{EarlyStopping, ReduceLrOnPlateau, StopDecision};
use crate::config::{OptimizerConfig, TrainingConfig};
use crate::error::{Result, TrainingError};
use crate::evaluation::evaluate;
use crate::history::{EpochRecord, History};

/// Loss and accuracy of a single optimisation step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StepMetrics {
    /// Batch loss.
    pub loss: f32,
    /// Batch accuracy.
    pub accuracy: f32,
}

/// A model that can be trained one batch at a time.
///
/// Gradient computation and optimizer state live behind this trait. The
/// [`Trainer`] schedules batches and callbacks, and hands every step the
/// configured [`OptimizerConfig`] with the current scheduled learning rate.
pub trait Learner: Classifier {
    /// Copy of the trainable state, used to restore the best epoch.
    type Snapshot;

    /// Runs one optimisation step on a labeled batch.
    ///
    /// `optimizer.learning_rate` is the rate for this epoch, already reduced
    /// by the plateau schedule. `optimizer.weight_decay` is the L2
    /// coefficient for the regularized kernels.
    ///
    /// # Errors
    ///
    /// Implementations return [`TrainingError::Learner`] when the step fails.
    fn train_step(&mut self, batch: &ImageBatch, optimizer: &OptimizerConfig) -> Result<StepMetrics>;

    /// Captures the current weights.
    fn snapshot(&self) -> Self::Snapshot;

    /// Replaces the current weights.
    ///
    /// # Errors
    ///
    /// Implementations return [`TrainingError::Learner`] when the snapshot
    /// does not fit the model.
    fn restore(&mut self, snapshot: Self::Snapshot) -> Result<()>;
}

/// State of a training run.
///
/// # Example
///
/// ```
/// use tumor_training::{TrainingConfig, TrainingState};
///
/// let state = TrainingState::from_config(&TrainingConfig::new(10));
/// assert_eq!(state.epoch, 0);
/// assert!(!state.is_finished());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    /// Current epoch (0-indexed).
    pub epoch: usize,

    /// Epoch budget.
    pub total_epochs: usize,

    /// Whether training has finished.
    pub finished: bool,

    /// Early stopping tracker.
    pub early_stopping: EarlyStopping,

    /// Learning-rate schedule.
    pub plateau: ReduceLrOnPlateau,
}

impl TrainingState {
    /// Creates the initial state for `config`.
    #[must_use]
    pub const fn from_config(config: &TrainingConfig) -> Self {
        Self {
            epoch: 0,
            total_epochs: config.epochs,
            finished: config.epochs == 0,
            early_stopping: EarlyStopping::new(config.early_stopping),
            plateau: ReduceLrOnPlateau::new(config.reduce_lr, config.optimizer.learning_rate),
        }
    }

    /// Returns `true` if training is finished.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Learning rate for the current epoch.
    #[must_use]
    pub const fn learning_rate(&self) -> f32 {
        self.plateau.learning_rate()
    }

    /// Returns the progress as a fraction `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress(&self) -> f32 {
        if self.total_epochs == 0 {
            0.0
        } else {
            self.epoch as f32 / self.total_epochs as f32
        }
    }

    /// Advances to the next epoch.
    pub const fn next_epoch(&mut self) {
        self.epoch += 1;
        if self.epoch >= self.total_epochs {
            self.finished = true;
        }
    }
}

/// Output of [`Trainer::fit`].
#[derive(Debug)]
pub struct Trained<L> {
    /// The trained learner, holding the best weights if they were restored.
    pub model: L,
    /// Per-epoch metrics.
    pub history: History,
}

/// Trainer for running training loops.
///
/// # Example
///
/// ```
/// use tumor_training::{Trainer, TrainingConfig};
///
/// let trainer = Trainer::new(TrainingConfig::new(10).with_batch_size(32));
/// assert_eq!(trainer.steps_per_epoch(100), 3);
/// assert_eq!(trainer.steps_per_epoch(10), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    /// Creates a trainer with the given config.
    #[must_use]
    pub const fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    /// Returns the training configuration.
    #[must_use]
    pub const fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Full batches per epoch, at least one.
    ///
    /// The trailing partial batch is dropped, except when the training set is
    /// smaller than one batch.
    #[must_use]
    pub fn steps_per_epoch(&self, train_len: usize) -> usize {
        (train_len / self.config.batch_size.max(1)).max(1)
    }

    /// Sample order for `epoch`, a fresh permutation of `indices`.
    #[must_use]
    pub fn epoch_order(&self, indices: &[usize], epoch: usize) -> Vec<usize> {
        let mut order = indices.to_vec();
        let mut rng = match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(epoch as u64)),
            None => ChaCha8Rng::from_entropy(),
        };
        order.shuffle(&mut rng);
        order
    }

    /// Trains `learner` on `train`, validating on `validation` after every epoch.
    ///
    /// Each epoch draws [`Trainer::steps_per_epoch`] augmented batches from a
    /// fresh permutation, then evaluates the validation subset. Early stopping
    /// and the plateau schedule both watch validation loss. With
    /// `restore_best_weights` set, the learner ends on the weights of the
    /// best validation epoch, whether or not training stopped early.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] for a bad config,
    /// [`TrainingError::EmptySubset`] if either subset is empty,
    /// [`TrainingError::NumericalInstability`] if a loss is not finite, and
    /// any learner, dataset or model error.
    pub fn fit<L: Learner>(
        &self,
        mut learner: L,
        dataset: &Dataset,
        train: &Subset,
        validation: &Subset,
    ) -> Result<Trained<L>> {
        self.config.validate()?;
        if train.is_empty() {
            return Err(TrainingError::empty_subset("training subset"));
        }
        if validation.is_empty() {
            return Err(TrainingError::empty_subset("validation subset"));
        }

        let steps = self.steps_per_epoch(train.len());
        let batch_size = self.config.batch_size;
        let restore_best = self.config.early_stopping.is_enabled()
            && self.config.early_stopping.restore_best_weights;
        let mut augmenter = Augmenter::new(self.config.augmentation, self.config.seed);
        let mut state = TrainingState::from_config(&self.config);
        let mut history = History::new();
        let mut best_weights: Option<L::Snapshot> = None;

        info!(
            train = train.len(),
            validation = validation.len(),
            epochs = self.config.epochs,
            steps_per_epoch = steps,
            "starting training"
        );

        while !state.is_finished() {
            let epoch = state.epoch;
            let learning_rate = state.learning_rate();
            let optimizer = self.config.optimizer.with_learning_rate(learning_rate);
            let order = self.epoch_order(train.indices(), epoch);

            let mut loss_sum = 0.0f32;
            let mut accuracy_sum = 0.0f32;
            for (step, chunk) in order.chunks(batch_size).take(steps).enumerate() {
                let batch = augmenter.augment_batch(&dataset.batch(chunk)?)?;
                let metrics = learner.train_step(&batch, &optimizer)?;
                if !metrics.loss.is_finite() {
                    return Err(TrainingError::numerical_instability(format!(
                        "loss {} at epoch {epoch}, step {step}",
                        metrics.loss
                    )));
                }
                debug!(epoch, step, loss = metrics.loss, "train step");
                loss_sum += metrics.loss;
                accuracy_sum += metrics.accuracy;
            }

            let val = evaluate(&learner, dataset, validation, batch_size)?;
            #[allow(clippy::cast_precision_loss)]
            let record = EpochRecord {
                epoch,
                loss: loss_sum / steps as f32,
                accuracy: accuracy_sum / steps as f32,
                val_loss: val.loss,
                val_accuracy: val.accuracy,
                learning_rate,
            };
            if !record.is_finite() {
                return Err(TrainingError::numerical_instability(format!(
                    "non-finite metrics at epoch {epoch}: {record:?}"
                )));
            }
            history.push(record);
            info!(
                epoch = epoch + 1,
                loss = record.loss,
                accuracy = record.accuracy,
                val_loss = record.val_loss,
                val_accuracy = record.val_accuracy,
                learning_rate,
                "epoch complete"
            );

            match state.early_stopping.update(epoch, record.val_loss) {
                StopDecision::Improved => {
                    if restore_best {
                        best_weights = Some(learner.snapshot());
                    }
                }
                StopDecision::Waiting(_) => {}
                StopDecision::Stop => {
                    let patience = self.config.early_stopping.patience;
                    history.set_stopped(format!(
                        "val_loss did not improve for {patience} epochs"
                    ));
                    info!(epoch = epoch + 1, patience, "early stopping");
                    break;
                }
            }

            if let Some(reduced) = state.plateau.update(record.val_loss) {
                info!(epoch = epoch + 1, learning_rate = reduced, "reducing learning rate");
            }
            state.next_epoch();
        }

        let best_epoch = state.early_stopping.best_epoch();
        if let (Some(weights), Some(best)) = (best_weights.take(), best_epoch) {
            if history.last().is_some_and(|last| last.epoch != best) {
                learner.restore(weights)?;
                history.set_restored(best);
                info!(epoch = best + 1, "restored best weights");
            }
        }

        if let Some(last) = history.last() {
            if last.val_accuracy < 0.5 {
                warn!(val_accuracy = last.val_accuracy, "validation accuracy below chance");
            }
        }
        Ok(Trained {
            model: learner,
            history,
        })
    }
}
