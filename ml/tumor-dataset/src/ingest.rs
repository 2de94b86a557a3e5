//! Labeled directory ingestion.
//!
//! A directory maps to exactly one label. Every recognized image inside it is
//! decoded, resized and normalized; files that fail are logged and skipped so
//! one corrupt scan never aborts the run.

use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};
use tumor_types::Label;

use crate::error::DatasetError;
use crate::preprocess::{Preprocessor, is_image_file};
use crate::sample::Sample;

/// Outcome of ingesting one labeled directory.
#[derive(Debug)]
pub struct IngestReport {
    /// Directory that was scanned.
    pub directory: PathBuf,

    /// Label assigned to every sample from this directory.
    pub label: Label,

    /// Successfully preprocessed samples, in directory-listing order.
    pub samples: Vec<Sample>,

    /// Per-file failures (decode, shape mismatch, unreadable entries).
    pub failures: Vec<DatasetError>,

    /// Entries skipped because they are not recognized image files.
    pub ignored: usize,

    /// Structural failure that prevented scanning (missing directory).
    pub error: Option<DatasetError>,
}

impl IngestReport {
    fn new(directory: &Path, label: Label) -> Self {
        Self {
            directory: directory.to_path_buf(),
            label,
            samples: Vec::new(),
            failures: Vec::new(),
            ignored: 0,
            error: None,
        }
    }

    /// Number of samples loaded.
    #[must_use]
    pub fn loaded(&self) -> usize {
        self.samples.len()
    }

    /// Number of image files that were attempted.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.samples.len() + self.failures.len()
    }

    /// Returns `true` if the directory was absent.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self.error, Some(DatasetError::MissingDirectory(_)))
    }

    /// Returns `true` if every attempted file loaded and the directory existed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.failures.is_empty()
    }
}

/// Ingests every recognized image in `directory` under a fixed label.
///
/// Never fails as a whole: a missing directory yields an empty report with
/// [`IngestReport::error`] set, and per-file problems are collected in
/// [`IngestReport::failures`].
#[must_use]
pub fn ingest_directory(directory: &Path, label: Label, preprocessor: &Preprocessor) -> IngestReport {
    let mut report = IngestReport::new(directory, label);
    info!(
        label = label.name(),
        directory = %directory.display(),
        "processing images"
    );

    if !directory.is_dir() {
        error!(
            label = label.name(),
            directory = %directory.display(),
            "labeled folder not found; check path and contents"
        );
        report.error = Some(DatasetError::missing_directory(directory));
        return report;
    }

    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            error!(directory = %directory.display(), error = %e, "could not list directory");
            report.error = Some(e.into());
            return report;
        }
    };

    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(directory = %directory.display(), error = %e, "unreadable directory entry");
                report.failures.push(e.into());
                continue;
            }
        };

        if !path.is_file() || !is_image_file(&path) {
            report.ignored += 1;
            continue;
        }

        match preprocessor.load_path(&path) {
            Ok(image) => {
                debug!(path = %path.display(), "loaded");
                report.samples.push(Sample::new(image, label));
            }
            Err(err @ DatasetError::ShapeMismatch { .. }) => {
                warn!(path = %path.display(), error = %err, "skipping image with unexpected shape");
                report.failures.push(err);
            }
            Err(err) => {
                error!(path = %path.display(), error = %err, "could not process image");
                report.failures.push(err);
            }
        }
    }

    info!(
        label = label.name(),
        directory = %directory.display(),
        loaded = report.loaded(),
        failed = report.failures.len(),
        "successfully loaded images"
    );
    report
}
