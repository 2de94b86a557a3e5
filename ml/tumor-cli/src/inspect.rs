//! `tumor inspect`: ingestion, assembly and partitioning reports.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use serde::Serialize;
use tracing::error;
use tumor_dataset::{Dataset, DatasetSummary, Partitioner, Preprocessor, SplitSummary};

use crate::{DataArgs, pipeline_config};

#[derive(Debug, Serialize)]
struct InspectReport {
    summary: DatasetSummary,
    split: Option<SplitSummary>,
    split_error: Option<String>,
    failures: Vec<String>,
    missing_directories: Vec<PathBuf>,
    ignored: usize,
}

pub fn run(data: &DataArgs, json: bool) -> Result<ExitCode> {
    let config = pipeline_config(data.config.as_deref())?;
    let preprocessor = Preprocessor::new(config.target_size);
    let assembly = Dataset::load(&data.no_tumor, &data.tumor, &preprocessor)?;

    let split = Partitioner::new(config.split).partition(&assembly.dataset);
    if let Err(err) = &split {
        error!(%err, "partitioning failed");
    }

    let report = InspectReport {
        summary: assembly.summary.clone(),
        split: split.as_ref().ok().map(tumor_dataset::Split::summary),
        split_error: split.as_ref().err().map(ToString::to_string),
        failures: assembly.failures.iter().map(ToString::to_string).collect(),
        missing_directories: assembly.missing_directories.clone(),
        ignored: assembly.ignored,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report.summary.to_report());
        if !report.failures.is_empty() {
            println!("\nSkipped {} file(s):", report.failures.len());
            for failure in &report.failures {
                println!("  {failure}");
            }
        }
        match (&report.split, &report.split_error) {
            (Some(split), _) => print!("\n{}", split.to_report()),
            (None, Some(err)) => println!("\nSplit failed: {err}"),
            (None, None) => {}
        }
    }

    Ok(if report.split.is_some() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
