//! Error types for tumor-types crate.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors that can occur when constructing or combining pipeline types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TypesError {
    /// Validation failed.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Unknown label index.
    #[error("unknown label index: {0} (expected 0 or 1)")]
    UnknownLabel(u8),

    /// Tried to build a batch from zero images.
    #[error("cannot build a batch from zero images")]
    EmptyBatch,

    /// Images and labels have different lengths.
    #[error("image/label count mismatch: {images} images, {labels} labels")]
    LengthMismatch {
        /// Number of images supplied.
        images: usize,
        /// Number of labels supplied.
        labels: usize,
    },
}

impl TypesError {
    /// Creates a length mismatch error.
    #[must_use]
    pub const fn length_mismatch(images: usize, labels: usize) -> Self {
        Self::LengthMismatch { images, labels }
    }
}

/// Result type for tumor-types operations.
pub type Result<T> = std::result::Result<T, TypesError>;
