//! `tumor evaluate`: score a checkpoint on the test split.

use std::path::Path;
use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::warn;
use tumor_dataset::{Dataset, Partitioner, Preprocessor};
use tumor_models::{Classifier, CpuBackend, cpu_device, load_checkpoint};
use tumor_training::evaluate;

use crate::{DataArgs, pipeline_config};

pub fn run(checkpoint: &Path, data: &DataArgs, json: bool) -> Result<ExitCode> {
    let config = pipeline_config(data.config.as_deref())?;
    let model = load_checkpoint::<CpuBackend>(checkpoint, &cpu_device())
        .with_context(|| format!("loading checkpoint {}", checkpoint.display()))?;

    let target = model.input_size();
    if target != config.target_size {
        warn!(
            model = %target,
            config = %config.target_size,
            "using the checkpoint's input size"
        );
    }
    let assembly = Dataset::load(&data.no_tumor, &data.tumor, &Preprocessor::new(target))?;
    let split = Partitioner::new(config.split).partition(&assembly.dataset)?;

    let evaluation = evaluate(&model, &assembly.dataset, &split.test, config.batch_size)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&evaluation)?);
    } else {
        print!("{}", evaluation.to_report());
    }
    Ok(ExitCode::SUCCESS)
}
