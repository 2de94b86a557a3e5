//! Error types for tumor-dataset crate.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tumor_types::TypesError;

/// Errors that can occur in tumor-dataset operations.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// A labeled source directory does not exist.
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// An image file could not be read or decoded.
    #[error("could not process image {}: {reason}", path.display())]
    Decode {
        /// Offending file.
        path: PathBuf,
        /// Underlying decoder message.
        reason: String,
    },

    /// A decoded image did not have the target shape after resizing.
    #[error("unexpected shape for {}: expected {expected:?}, got {actual:?}", path.display())]
    ShapeMismatch {
        /// Offending file.
        path: PathBuf,
        /// Expected `[height, width, channels]`.
        expected: [usize; 3],
        /// Actual `[height, width, channels]`.
        actual: [usize; 3],
    },

    /// No samples were ingested at all.
    #[error("dataset is empty")]
    EmptyDataset,

    /// Not enough samples for a split stage.
    #[error("insufficient data for {stage}: {available} sample(s), need at least 2")]
    InsufficientData {
        /// Which split stage was skipped.
        stage: SplitStage,
        /// Samples available to that stage.
        available: usize,
    },

    /// Invalid split ratio.
    #[error("invalid split ratio: {0} (must be in (0, 1))")]
    InvalidSplitRatio(f64),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Type-level validation failure.
    #[error(transparent)]
    Types(#[from] TypesError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// The two sequential stages of the partitioner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SplitStage {
    /// Full dataset into train+validation and test.
    Test,
    /// Train+validation into train and validation.
    Validation,
}

impl std::fmt::Display for SplitStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Test => write!(f, "train/test split"),
            Self::Validation => write!(f, "validation split"),
        }
    }
}

impl DatasetError {
    /// Creates a missing directory error.
    #[must_use]
    pub fn missing_directory(path: impl AsRef<Path>) -> Self {
        Self::MissingDirectory(path.as_ref().to_path_buf())
    }

    /// Creates a decode error.
    #[must_use]
    pub fn decode(path: impl AsRef<Path>, reason: impl Into<String>) -> Self {
        Self::Decode {
            path: path.as_ref().to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(path: impl AsRef<Path>, expected: [usize; 3], actual: [usize; 3]) -> Self {
        Self::ShapeMismatch {
            path: path.as_ref().to_path_buf(),
            expected,
            actual,
        }
    }

    /// Creates an insufficient data error.
    #[must_use]
    pub const fn insufficient_data(stage: SplitStage, available: usize) -> Self {
        Self::InsufficientData { stage, available }
    }

    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Returns `true` for errors that only affect a single file.
    #[must_use]
    pub const fn is_per_item(&self) -> bool {
        matches!(self, Self::Decode { .. } | Self::ShapeMismatch { .. })
    }
}

impl From<std::io::Error> for DatasetError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for DatasetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for tumor-dataset operations.
pub type Result<T> = std::result::Result<T, DatasetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_missing_directory() {
        let err = DatasetError::missing_directory("/data/no");
        assert!(err.to_string().contains("/data/no"));
        assert!(!err.is_per_item());
    }

    #[test]
    fn error_decode() {
        let err = DatasetError::decode("/data/yes/broken.jpg", "unexpected EOF");
        let msg = err.to_string();
        assert!(msg.contains("broken.jpg"));
        assert!(msg.contains("unexpected EOF"));
        assert!(err.is_per_item());
    }

    #[test]
    fn error_shape_mismatch() {
        let err = DatasetError::shape_mismatch("a.png", [128, 128, 3], [128, 127, 3]);
        assert!(err.to_string().contains("[128, 127, 3]"));
        assert!(err.is_per_item());
    }

    #[test]
    fn error_insufficient_data() {
        let err = DatasetError::insufficient_data(SplitStage::Validation, 1);
        let msg = err.to_string();
        assert!(msg.contains("validation split"));
        assert!(msg.contains("1 sample"));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: DatasetError = io_err.into();
        assert!(matches!(err, DatasetError::Io(_)));
    }

    #[test]
    fn error_from_serde_error() {
        let json_err = serde_json::from_str::<i32>("invalid").unwrap_err();
        let err: DatasetError = json_err.into();
        assert!(matches!(err, DatasetError::Serialization(_)));
    }
}
