//! Training orchestration and evaluation for tumor classification.
//!
//! # Training
//!
//! - [`Learner`] - A [`Classifier`](tumor_models::Classifier) that can take optimisation steps
//! - [`Trainer`] - Epoch loop with augmentation, validation and callbacks
//! - [`TrainingConfig`] - Epochs, batch size, optimizer and callback settings
//!
//! # Callbacks
//!
//! - [`EarlyStopping`] - Stops on a validation-loss plateau and restores the best weights
//! - [`ReduceLrOnPlateau`] - Halves the learning rate on a plateau
//!
//! # Augmentation
//!
//! - [`Augmenter`] - Seeded rotation, zoom, shift and flips
//!
//! # Evaluation
//!
//! - [`evaluate`] - Loss, accuracy, [`ConfusionMatrix`] and [`ClassificationReport`]
//! - [`History`] / [`moving_average`] - Per-epoch curves and smoothing
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tumor_dataset::{Dataset, Partitioner, Preprocessor};
//! use tumor_training::{Learner, Trainer, TrainingConfig, evaluate};
//!
//! fn run<L: Learner>(learner: L) -> Result<(), Box<dyn std::error::Error>> {
//!     let assembly = Dataset::load(Path::new("data/no"), Path::new("data/yes"), &Preprocessor::default())?;
//!     let split = Partitioner::default().partition(&assembly.dataset)?;
//!
//!     let trainer = Trainer::new(TrainingConfig::default().with_seed(42));
//!     let trained = trainer.fit(learner, &assembly.dataset, &split.train, split.require_validation()?)?;
//!     println!("{}", trained.history.summary());
//!
//!     let test = evaluate(&trained.model, &assembly.dataset, &split.test, 128)?;
//!     println!("{}", test.to_report());
//!     Ok(())
//! }
//! ```
//!
//! # Quality Standards
//!
//! - Zero clippy/doc warnings
//! - Zero `unwrap`/`expect` in library code

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod augment;
mod callbacks;
mod config;
mod error;
mod evaluation;
mod history;
mod trainer;

// Re-export configuration
pub use config::{EarlyStoppingConfig, OptimizerConfig, OptimizerType, ReduceLrConfig, TrainingConfig};

// Re-export augmentation
pub use augment::{AugmentationConfig, Augmenter, Transform};

// Re-export callbacks
pub use callbacks::{EarlyStopping, ReduceLrOnPlateau, StopDecision};

// Re-export training loop
pub use trainer::{Learner, StepMetrics, Trained, Trainer, TrainingState};

// Re-export history and evaluation
pub use evaluation::{
    ClassMetrics, ClassificationReport, ConfusionMatrix, EPSILON, Evaluation, binary_accuracy,
    binary_cross_entropy, evaluate,
};
pub use history::{EpochRecord, History, moving_average};

// Re-export error types
pub use error::{Result, TrainingError};
