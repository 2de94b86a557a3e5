//! Burn CNN, checkpoint persistence and inference for tumor classification.
//!
//! # Model
//!
//! - [`Classifier`] - Batch-to-probabilities seam used by evaluation and inference
//! - [`TumorCnn`] - Three conv/pool blocks, dense head, sigmoid output
//! - [`BurnClassifier`] - [`TumorCnn`] adapted to `[N, H, W, 3]` image batches
//!
//! # Checkpoint Persistence
//!
//! Weights are written with Burn's recorders (binary or JSON) next to a
//! [`ModelManifest`] that records the network configuration:
//! - [`save_checkpoint`] / [`load_checkpoint`]
//!
//! # Inference
//!
//! - [`Predictor`] - Model plus the ingestion preprocessor
//! - [`predict`] - Bytes in, [`Prediction`](tumor_types::Prediction) or [`InferenceError`] out
//!
//! # Backend Support
//!
//! Models are generic over Burn backends. [`CpuBackend`] (`burn-ndarray`)
//! is the default for the CLI and tests.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tumor_dataset::Preprocessor;
//! use tumor_models::{CpuBackend, Predictor, cpu_device, load_checkpoint};
//!
//! let model = load_checkpoint::<CpuBackend>(Path::new("tumor.bin"), &cpu_device())?;
//! let predictor = Predictor::new(&model, Preprocessor::default())?;
//! let prediction = predictor.predict_bytes(&std::fs::read("scan.jpg")?)?;
//! println!("{prediction}");
//! # Ok::<(), Box<dyn std::error::Error>>(())
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

mod backend;
mod checkpoint;
mod classifier;
mod cnn;
mod error;
mod inference;

// Re-export model types
pub use classifier::{Classifier, check_batch};
pub use cnn::{BurnClassifier, TumorCnn, TumorCnnConfig, batch_to_tensor};

// Re-export checkpoint utilities
pub use checkpoint::{ARCHITECTURE, CheckpointFormat, ModelManifest, load_checkpoint, save_checkpoint};

// Re-export inference adapter
pub use inference::{Predictor, predict};

// Re-export backend utilities
pub use backend::{CpuBackend, cpu_device};

// Re-export error types
pub use error::{InferenceError, ModelError, Result};

/// Prelude for convenient imports.
pub mod prelude {
    pub use super::{
        BurnClassifier, CheckpointFormat, Classifier, CpuBackend, InferenceError, ModelError,
        Predictor, TumorCnn, TumorCnnConfig, load_checkpoint, predict, save_checkpoint,
    };
}
