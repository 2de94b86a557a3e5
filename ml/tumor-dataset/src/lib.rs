//! Dataset pipeline for brain MRI tumor classification.
//!
//! This crate turns two labeled image directories into batches:
//!
//! # Ingestion
//!
//! - [`Preprocessor`] - Decode, resize and normalize (shared with inference)
//! - [`ingest_directory`] - Load every image in one labeled directory
//! - [`IngestReport`] - Loaded samples plus per-file failures
//!
//! # Assembly
//!
//! - [`Dataset`] - Concatenated samples, no-tumor first
//! - [`DatasetSummary`] - Class distribution and imbalance report
//!
//! # Partitioning
//!
//! - [`Partitioner`] - Two-stage stratified train/validation/test split
//! - [`split_stratified`] - One stratified stage over an index set
//!
//! # Batching
//!
//! - [`BatchPipeline`] - Bounded shuffle (training only) and fixed-size batches
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use tumor_dataset::{BatchPipeline, Dataset, Partitioner, PipelineConfig, Preprocessor};
//!
//! let config = PipelineConfig::default();
//! let preprocessor = Preprocessor::new(config.target_size);
//! let assembly = Dataset::load(Path::new("data/no"), Path::new("data/yes"), &preprocessor)?;
//!
//! let split = Partitioner::new(config.split).partition(&assembly.dataset)?;
//! let train = BatchPipeline::training(&assembly.dataset, &split.train, &config);
//! for batch in train.epoch(0) {
//!     let batch = batch?;
//!     assert_eq!(batch.shape()[1..], [128, 128, 3]);
//! }
//! # Ok::<(), tumor_dataset::DatasetError>(())
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

mod batch;
mod config;
mod dataset;
mod error;
mod ingest;
mod preprocess;
mod sample;
mod splits;
mod summary;

// Re-export ingestion
pub use ingest::{IngestReport, ingest_directory};
pub use preprocess::{IMAGE_EXTENSIONS, Preprocessor, is_image_file};
pub use sample::Sample;

// Re-export assembly and statistics
pub use dataset::{Assembly, Dataset};
pub use summary::{ClassCounts, DatasetSummary};

// Re-export split utilities
pub use splits::{Partitioner, Split, SplitRatio, SplitSummary, Subset, split_stratified};

// Re-export batching
pub use batch::{BatchPipeline, Batches, ShuffleBuffer};

// Re-export configuration
pub use config::{PipelineConfig, SplitConfig};

// Re-export error types
pub use error::{DatasetError, Result, SplitStage};

// Re-export image filter selection for custom preprocessors
pub use image::imageops::FilterType;
