//! Error types for tumor-models crate.

use thiserror::Error;
use tumor_dataset::DatasetError;
use tumor_types::TargetSize;

/// Errors that can occur in tumor-models operations.
#[derive(Debug, Error)]
pub enum ModelError {
    /// Failed to load checkpoint.
    #[error("failed to load checkpoint from {path}: {reason}")]
    LoadCheckpoint {
        /// Path to the checkpoint file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Failed to save checkpoint.
    #[error("failed to save checkpoint to {path}: {reason}")]
    SaveCheckpoint {
        /// Path to the checkpoint file.
        path: String,
        /// Reason for failure.
        reason: String,
    },

    /// Invalid model configuration.
    #[error("invalid model configuration: {0}")]
    InvalidConfig(String),

    /// Checkpoint file not found.
    #[error("checkpoint not found: {0}")]
    CheckpointNotFound(String),

    /// Unsupported checkpoint format.
    #[error("unsupported checkpoint format: {0}")]
    UnsupportedFormat(String),

    /// Input batch does not match the model geometry.
    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Expected shape.
        expected: String,
        /// Actual shape.
        actual: String,
    },

    /// Backend returned data that could not be read back.
    #[error("backend error: {0}")]
    Backend(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl ModelError {
    /// Creates a load checkpoint error.
    #[must_use]
    pub fn load_checkpoint(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::LoadCheckpoint {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates a save checkpoint error.
    #[must_use]
    pub fn save_checkpoint(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SaveCheckpoint {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Creates an invalid config error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a checkpoint not found error.
    #[must_use]
    pub fn checkpoint_not_found(path: impl Into<String>) -> Self {
        Self::CheckpointNotFound(path.into())
    }

    /// Creates an unsupported format error.
    #[must_use]
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat(format.into())
    }

    /// Creates a shape mismatch error.
    #[must_use]
    pub fn shape_mismatch(expected: impl std::fmt::Debug, actual: impl std::fmt::Debug) -> Self {
        Self::ShapeMismatch {
            expected: format!("{expected:?}"),
            actual: format!("{actual:?}"),
        }
    }

    /// Creates a backend error.
    #[must_use]
    pub fn backend(reason: impl Into<String>) -> Self {
        Self::Backend(reason.into())
    }
}

impl From<std::io::Error> for ModelError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for tumor-models operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Failure surfaced by the inference adapter.
///
/// Every variant is returned as a value; nothing in the prediction path
/// panics on bad input.
#[derive(Debug, Error)]
pub enum InferenceError {
    /// The upload contained no bytes.
    #[error("no image data was uploaded")]
    EmptyUpload,

    /// No trained model is loaded.
    #[error("model is not available; train or load a checkpoint first")]
    ModelUnavailable,

    /// The model expects a different input size than the preprocessor produces.
    #[error("model expects {model} input but the preprocessor produces {preprocessor}")]
    SizeMismatch {
        /// Size the model was trained at.
        model: TargetSize,
        /// Size the preprocessor resizes to.
        preprocessor: TargetSize,
    },

    /// Decoding or preprocessing failed.
    #[error("error processing image: {0}")]
    Preprocess(#[from] DatasetError),

    /// The model failed to run.
    #[error("error during prediction: {0}")]
    Model(#[from] ModelError),

    /// The model returned something that is not a single probability.
    #[error("invalid model output: {0}")]
    InvalidOutput(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_load_checkpoint() {
        let err = ModelError::load_checkpoint("model.bin", "file corrupted");
        assert!(err.to_string().contains("model.bin"));
        assert!(err.to_string().contains("file corrupted"));
    }

    #[test]
    fn error_save_checkpoint() {
        let err = ModelError::save_checkpoint("output.bin", "disk full");
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn error_shape_mismatch() {
        let err = ModelError::shape_mismatch([1, 128, 128, 3], [1, 64, 64, 3]);
        assert!(err.to_string().contains("[1, 128, 128, 3]"));
        assert!(err.to_string().contains("[1, 64, 64, 3]"));
    }

    #[test]
    fn error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: ModelError = io_err.into();
        assert!(matches!(err, ModelError::Io(_)));
    }

    #[test]
    fn error_from_serde_error() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let err: ModelError = json_err.into();
        assert!(matches!(err, ModelError::Serialization(_)));
    }

    #[test]
    fn inference_error_messages() {
        assert!(
            InferenceError::ModelUnavailable
                .to_string()
                .contains("not available")
        );
        let err = InferenceError::SizeMismatch {
            model: TargetSize::new(128, 128),
            preprocessor: TargetSize::new(64, 64),
        };
        assert!(err.to_string().contains("128x128"));
        assert!(err.to_string().contains("64x64"));

        let err: InferenceError = DatasetError::decode("<memory>", "bad header").into();
        assert!(err.to_string().starts_with("error processing image"));
    }
}
