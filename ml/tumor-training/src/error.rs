//! Error types for tumor-training crate.

use thiserror::Error;

/// Errors that can occur during training and evaluation.
#[derive(Debug, Error)]
pub enum TrainingError {
    /// Invalid training configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Dataset error.
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Model error.
    #[error("model error: {0}")]
    Model(String),

    /// The learner failed to take a step or restore weights.
    #[error("learner error: {0}")]
    Learner(String),

    /// Training or evaluation has nothing to work on.
    #[error("empty subset: {0}")]
    EmptySubset(String),

    /// Loss became NaN or infinite.
    #[error("numerical instability: {0}")]
    NumericalInstability(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl TrainingError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig(reason.into())
    }

    /// Creates a learner error.
    #[must_use]
    pub fn learner(reason: impl Into<String>) -> Self {
        Self::Learner(reason.into())
    }

    /// Creates an empty subset error.
    #[must_use]
    pub fn empty_subset(what: impl Into<String>) -> Self {
        Self::EmptySubset(what.into())
    }

    /// Creates a numerical instability error.
    #[must_use]
    pub fn numerical_instability(reason: impl Into<String>) -> Self {
        Self::NumericalInstability(reason.into())
    }
}

impl From<std::io::Error> for TrainingError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for TrainingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<tumor_dataset::DatasetError> for TrainingError {
    fn from(err: tumor_dataset::DatasetError) -> Self {
        Self::Dataset(err.to_string())
    }
}

impl From<tumor_types::TypesError> for TrainingError {
    fn from(err: tumor_types::TypesError) -> Self {
        Self::Dataset(err.to_string())
    }
}

impl From<tumor_models::ModelError> for TrainingError {
    fn from(err: tumor_models::ModelError) -> Self {
        Self::Model(err.to_string())
    }
}

/// Result type for training operations.
pub type Result<T> = std::result::Result<T, TrainingError>;
