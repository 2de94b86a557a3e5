//! `tumor predict`: single-image inference.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::error;
use tumor_dataset::{PipelineConfig, Preprocessor};
use tumor_models::{Classifier, CpuBackend, cpu_device, load_checkpoint, predict};

/// Prints the prediction, or the error message when inference fails.
pub fn run(checkpoint: &Path, image: &Path) -> Result<ExitCode> {
    let bytes = std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;

    let model = match load_checkpoint::<CpuBackend>(checkpoint, &cpu_device()) {
        Ok(model) => Some(model),
        Err(err) => {
            error!(path = %checkpoint.display(), %err, "could not load checkpoint");
            None
        }
    };
    let target = model
        .as_ref()
        .map_or(PipelineConfig::default().target_size, Classifier::input_size);

    match predict(model.as_ref(), Preprocessor::new(target), &bytes) {
        Ok(prediction) => {
            println!("{prediction}");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            println!("Error: {err}");
            Ok(ExitCode::FAILURE)
        }
    }
}
