//! Value types for the tumor classification pipeline.
//!
//! This crate holds the data model shared by ingestion, partitioning,
//! training and inference:
//!
//! # Sample Types
//!
//! - [`Label`] - Binary class identifier (`NoTumor = 0`, `Tumor = 1`)
//! - [`TargetSize`] - Fixed image geometry every tensor is resized to
//! - [`ImageTensor`] - One normalized RGB image in HWC layout
//! - [`ImageBatch`] - Images and labels stacked along a leading batch axis
//!
//! # Inference Types
//!
//! - [`Prediction`] - Thresholded label plus the confidence of that label
//!
//! # Layer 0 Crate
//!
//! No image codecs and no ML framework are pulled in here, so the types can
//! be shared by the dataset tools, the model crate and the CLI alike.
//!
//! # Example
//!
//! ```
//! use tumor_types::{ImageTensor, Label, Prediction, TargetSize};
//!
//! let size = TargetSize::new(4, 4);
//! let image = ImageTensor::filled(size, 0.5);
//! assert_eq!(image.shape(), [4, 4, 3]);
//!
//! let prediction = Prediction::from_probability(0.9);
//! assert_eq!(prediction.label, Label::Tumor);
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

mod error;
mod label;
mod prediction;
mod tensor;
mod validation;

// Re-export sample types
pub use label::Label;
pub use tensor::{CHANNELS, ImageBatch, ImageTensor, TargetSize};

// Re-export inference types
pub use prediction::{DECISION_THRESHOLD, Prediction};

// Re-export validation
pub use validation::ValidationError;

// Re-export error types
pub use error::{Result, TypesError};
