//! Checkpoint persistence for model weights.
//!
//! Weights go through Burn's file recorders. Next to every checkpoint sits a
//! JSON manifest holding the architecture config, including the input size
//! the model was trained at, so a checkpoint can be rebuilt without
//! out-of-band knowledge.

use std::path::{Path, PathBuf};

use burn::module::Module;
use burn::prelude::Backend;
use burn::record::{BinFileRecorder, FullPrecisionSettings, PrettyJsonFileRecorder};
use serde::{Deserialize, Serialize};
use tracing::info;
use tumor_types::DECISION_THRESHOLD;

use crate::cnn::{BurnClassifier, TumorCnn, TumorCnnConfig};
use crate::error::{ModelError, Result};

/// Architecture tag written to every manifest.
pub const ARCHITECTURE: &str = "tumor-cnn";

/// Supported checkpoint file formats.
///
/// # Example
///
/// ```
/// use tumor_models::CheckpointFormat;
///
/// let format = CheckpointFormat::from_extension("bin");
/// assert_eq!(format, Some(CheckpointFormat::Binary));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointFormat {
    /// Compact full-precision binary.
    #[default]
    Binary,

    /// Pretty-printed JSON, for inspection.
    Json,
}

impl CheckpointFormat {
    /// Determines format from file extension.
    ///
    /// - `.bin` -> Binary
    /// - `.json` -> Json
    /// - Other -> None
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "bin" => Some(Self::Binary),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Determines format from file path.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Returns the default file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Binary => "bin",
            Self::Json => "json",
        }
    }

    /// Returns the format name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Binary => "binary",
            Self::Json => "json",
        }
    }
}

impl std::fmt::Display for CheckpointFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sidecar describing how to rebuild a checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    /// Always [`ARCHITECTURE`].
    pub architecture: String,

    /// Weight file format.
    pub format: CheckpointFormat,

    /// Network configuration, including the training input size.
    pub model: TumorCnnConfig,

    /// Decision threshold applied to the sigmoid output.
    pub threshold: f32,
}

impl ModelManifest {
    /// Creates a manifest for `model` saved as `format`.
    #[must_use]
    pub fn new(model: TumorCnnConfig, format: CheckpointFormat) -> Self {
        Self {
            architecture: ARCHITECTURE.to_string(),
            format,
            model,
            threshold: DECISION_THRESHOLD,
        }
    }

    /// Manifest path for a checkpoint: `model.bin` -> `model.manifest.json`.
    #[must_use]
    pub fn path_for(checkpoint: &Path) -> PathBuf {
        checkpoint.with_extension("manifest.json")
    }

    /// Reads and checks a manifest.
    ///
    /// # Errors
    ///
    /// Returns IO or serialization errors, or
    /// [`ModelError::UnsupportedFormat`] for a foreign architecture.
    pub fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let manifest: Self = serde_json::from_str(&text)?;
        if manifest.architecture != ARCHITECTURE {
            return Err(ModelError::unsupported_format(format!(
                "architecture {:?} in {}",
                manifest.architecture,
                path.display()
            )));
        }
        manifest.model.validate()?;
        Ok(manifest)
    }

    /// Writes the manifest as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns IO or serialization errors.
    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

/// Saves weights and manifest.
///
/// `path` may omit the extension; the format's extension is applied either
/// way. Returns the weight file path.
///
/// # Errors
///
/// Returns [`ModelError::SaveCheckpoint`] if the recorder fails, or an IO
/// error for the manifest.
pub fn save_checkpoint<B: Backend>(
    classifier: &BurnClassifier<B>,
    path: &Path,
    format: CheckpointFormat,
) -> Result<PathBuf> {
    let weights = path.with_extension(format.extension());
    let model = classifier.model().clone();
    let saved = match format {
        CheckpointFormat::Binary => {
            model.save_file(weights.clone(), &BinFileRecorder::<FullPrecisionSettings>::new())
        }
        CheckpointFormat::Json => model.save_file(
            weights.clone(),
            &PrettyJsonFileRecorder::<FullPrecisionSettings>::new(),
        ),
    };
    saved.map_err(|e| ModelError::save_checkpoint(weights.display().to_string(), e.to_string()))?;

    ModelManifest::new(*classifier.config(), format).write(&ModelManifest::path_for(&weights))?;
    info!(path = %weights.display(), format = %format, "saved checkpoint");
    Ok(weights)
}

/// Loads a checkpoint written by [`save_checkpoint`].
///
/// # Errors
///
/// Returns [`ModelError::CheckpointNotFound`] if the file is missing,
/// [`ModelError::UnsupportedFormat`] for an unknown extension, manifest
/// errors, or [`ModelError::LoadCheckpoint`] if the recorder fails.
pub fn load_checkpoint<B: Backend>(path: &Path, device: &B::Device) -> Result<BurnClassifier<B>> {
    if !path.exists() {
        return Err(ModelError::checkpoint_not_found(path.display().to_string()));
    }
    let format = CheckpointFormat::from_path(path)
        .ok_or_else(|| ModelError::unsupported_format(path.display().to_string()))?;

    let manifest = ModelManifest::read(&ModelManifest::path_for(path))?;
    let model = TumorCnn::<B>::new(&manifest.model, device)?;
    let loaded = match format {
        CheckpointFormat::Binary => model.load_file(
            path.to_path_buf(),
            &BinFileRecorder::<FullPrecisionSettings>::new(),
            device,
        ),
        CheckpointFormat::Json => model.load_file(
            path.to_path_buf(),
            &PrettyJsonFileRecorder::<FullPrecisionSettings>::new(),
            device,
        ),
    }
    .map_err(|e| ModelError::load_checkpoint(path.display().to_string(), e.to_string()))?;

    info!(
        path = %path.display(),
        input = %manifest.model.input,
        "loaded checkpoint"
    );
    Ok(BurnClassifier::from_parts(loaded, manifest.model, device.clone()))
}
