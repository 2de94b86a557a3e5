//! Two-stage stratified partitioning.
//!
//! Stage 1 holds out a test fraction of the full dataset; stage 2 holds out a
//! validation fraction of what remains. Both stages allocate held-out slots
//! per class by largest-remainder rounding, so each subset keeps the class
//! ratio of its parent as closely as integer counts allow.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use tumor_types::Label;

use crate::config::SplitConfig;
use crate::dataset::Dataset;
use crate::error::{DatasetError, Result, SplitStage};
use crate::summary::ClassCounts;

/// Fraction of a set that a split stage holds out.
///
/// # Example
///
/// ```
/// use tumor_dataset::SplitRatio;
///
/// let ratio = SplitRatio::new(0.2);
/// assert_eq!(ratio.held_out_count(100), 20);
/// assert_eq!(ratio.held_out_count(3), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitRatio {
    held_out: f64,
}

impl SplitRatio {
    /// Creates a new split ratio.
    ///
    /// # Panics
    ///
    /// Panics if `held_out` is not in `(0, 1)`.
    #[must_use]
    pub fn new(held_out: f64) -> Self {
        assert!(
            held_out > 0.0 && held_out < 1.0,
            "Split ratio must be in (0, 1), got {held_out}"
        );
        Self { held_out }
    }

    /// Creates a split ratio, returning `None` if invalid.
    #[must_use]
    pub fn try_new(held_out: f64) -> Option<Self> {
        (held_out > 0.0 && held_out < 1.0).then_some(Self { held_out })
    }

    /// Returns the held-out fraction.
    #[must_use]
    pub const fn held_out_ratio(&self) -> f64 {
        self.held_out
    }

    /// Returns the retained fraction.
    #[must_use]
    pub fn retained_ratio(&self) -> f64 {
        1.0 - self.held_out
    }

    /// Number of samples held out from a set of `total`.
    ///
    /// Rounds up and keeps at least one sample on each side once
    /// `total >= 2`.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn held_out_count(&self, total: usize) -> usize {
        if total < 2 {
            return 0;
        }
        let raw = (self.held_out * total as f64 - 1e-9).ceil() as usize;
        raw.clamp(1, total - 1)
    }
}

/// Splits `candidates` into `(retained, held_out)` preserving label ratios.
///
/// `labels` is indexed by the values in `candidates`. The result is a pure
/// function of its inputs: same candidates, labels, ratio and seed give the
/// same membership and order.
///
/// # Example
///
/// ```
/// use tumor_dataset::{SplitRatio, split_stratified};
/// use tumor_types::Label;
///
/// let labels: Vec<Label> = (0..10)
///     .map(|i| if i < 6 { Label::NoTumor } else { Label::Tumor })
///     .collect();
/// let all: Vec<usize> = (0..10).collect();
///
/// let (retained, held_out) = split_stratified(&labels, &all, SplitRatio::new(0.5), 7);
/// assert_eq!(retained.len(), 5);
/// assert_eq!(held_out.len(), 5);
/// ```
#[must_use]
pub fn split_stratified(
    labels: &[Label],
    candidates: &[usize],
    ratio: SplitRatio,
    seed: u64,
) -> (Vec<usize>, Vec<usize>) {
    let total = candidates.len();
    let held_out_total = ratio.held_out_count(total);

    let mut groups: [Vec<usize>; 2] = [Vec::new(), Vec::new()];
    for &index in candidates {
        groups[usize::from(labels[index].index())].push(index);
    }

    let quotas = allocate(held_out_total, [groups[0].len(), groups[1].len()]);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut retained = Vec::with_capacity(total - held_out_total);
    let mut held_out = Vec::with_capacity(held_out_total);

    for (group, quota) in groups.iter_mut().zip(quotas) {
        group.shuffle(&mut rng);
        held_out.extend_from_slice(&group[..quota]);
        retained.extend_from_slice(&group[quota..]);
    }

    retained.shuffle(&mut rng);
    held_out.shuffle(&mut rng);
    (retained, held_out)
}

/// Distributes `n` held-out slots over classes proportionally to `counts`.
///
/// Floors the exact share per class, then hands leftover slots to the
/// largest fractional remainders (ties go to the larger class, then to
/// the lower label).
#[allow(clippy::cast_precision_loss)]
fn allocate(n: usize, counts: [usize; 2]) -> [usize; 2] {
    let total: usize = counts.iter().sum();
    if total == 0 || n == 0 {
        return [0, 0];
    }

    let mut quotas = [0usize; 2];
    let mut remainders = [0f64; 2];
    for (class, &count) in counts.iter().enumerate() {
        let exact = n as f64 * count as f64 / total as f64;
        quotas[class] = (n * count) / total;
        remainders[class] = exact - quotas[class] as f64;
    }

    let mut order = [0usize, 1];
    order.sort_by(|&a, &b| {
        remainders[b]
            .total_cmp(&remainders[a])
            .then(counts[b].cmp(&counts[a]))
            .then(a.cmp(&b))
    });

    let mut leftover = n - quotas.iter().sum::<usize>();
    for class in order {
        if leftover == 0 {
            break;
        }
        if quotas[class] < counts[class] {
            quotas[class] += 1;
            leftover -= 1;
        }
    }
    quotas
}

/// Indices of one subset plus its class distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subset {
    indices: Vec<usize>,
    counts: ClassCounts,
}

impl Subset {
    fn new(indices: Vec<usize>, labels: &[Label]) -> Self {
        let counts = ClassCounts::from_labels(indices.iter().map(|&i| labels[i]));
        Self { indices, counts }
    }

    /// Dataset indices in subset order.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Per-label counts.
    #[must_use]
    pub const fn counts(&self) -> ClassCounts {
        self.counts
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Returns `true` if the subset holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Train/validation/test partition of a [`Dataset`].
///
/// `validation` is `None` when stage 2 had fewer than two samples to work
/// with; the test subset from stage 1 stays valid either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// Remaining samples used for fitting.
    pub train: Subset,

    /// Held out from train+validation, if stage 2 ran.
    pub validation: Option<Subset>,

    /// Held out from the full dataset.
    pub test: Subset,
}

impl Split {
    /// Returns the validation subset or the stage-2 insufficient-data error.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InsufficientData`] for
    /// [`SplitStage::Validation`] when stage 2 was skipped.
    pub fn require_validation(&self) -> Result<&Subset> {
        self.validation
            .as_ref()
            .ok_or(DatasetError::insufficient_data(
                SplitStage::Validation,
                self.train.len(),
            ))
    }

    /// Total samples across every subset.
    #[must_use]
    pub fn total(&self) -> usize {
        self.train.len() + self.validation.as_ref().map_or(0, Subset::len) + self.test.len()
    }

    /// Per-subset class counts.
    #[must_use]
    pub fn summary(&self) -> SplitSummary {
        SplitSummary {
            train: self.train.counts(),
            validation: self.validation.as_ref().map(Subset::counts),
            test: self.test.counts(),
        }
    }
}

/// Class counts of every subset of a [`Split`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitSummary {
    /// Train counts.
    pub train: ClassCounts,
    /// Validation counts, if stage 2 ran.
    pub validation: Option<ClassCounts>,
    /// Test counts.
    pub test: ClassCounts,
}

impl SplitSummary {
    /// Returns a human-readable report.
    #[must_use]
    #[allow(clippy::let_underscore_must_use)] // String::write_fmt is infallible
    pub fn to_report(&self) -> String {
        use std::fmt::Write;

        let mut report = String::new();
        let _ = writeln!(report, "Data Splitting");
        let _ = writeln!(report, "==============");
        let _ = writeln!(report, "Training set:   {:>5} {}", self.train.total(), self.train);
        match self.validation {
            Some(validation) => {
                let _ = writeln!(report, "Validation set: {:>5} {validation}", validation.total());
            }
            None => {
                let _ = writeln!(report, "Validation set: insufficient data");
            }
        }
        let _ = writeln!(report, "Test set:       {:>5} {}", self.test.total(), self.test);
        report
    }
}

/// Runs the two-stage stratified split with configured ratios and seeds.
///
/// # Example
///
/// ```
/// use tumor_dataset::{Partitioner, SplitConfig};
/// use tumor_types::Label;
///
/// let labels: Vec<Label> = (0..100)
///     .map(|i| if i < 60 { Label::NoTumor } else { Label::Tumor })
///     .collect();
///
/// let split = Partitioner::new(SplitConfig::default())
///     .partition_labels(&labels)
///     .unwrap();
/// assert_eq!(split.test.len(), 20);
/// assert_eq!(split.validation.as_ref().map(|v| v.len()), Some(20));
/// assert_eq!(split.train.len(), 60);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Partitioner {
    config: SplitConfig,
}

impl Partitioner {
    /// Creates a partitioner.
    #[must_use]
    pub const fn new(config: SplitConfig) -> Self {
        Self { config }
    }

    /// Returns the split configuration.
    #[must_use]
    pub const fn config(&self) -> &SplitConfig {
        &self.config
    }

    /// Partitions an assembled dataset.
    ///
    /// # Errors
    ///
    /// See [`Partitioner::partition_labels`].
    pub fn partition(&self, dataset: &Dataset) -> Result<Split> {
        self.partition_labels(&dataset.labels())
    }

    /// Partitions a label sequence; subset indices refer to positions in
    /// `labels`.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::InsufficientData`] for [`SplitStage::Test`]
    /// when fewer than two samples are available, or a ratio/seed error
    /// from [`SplitConfig::validate`].
    pub fn partition_labels(&self, labels: &[Label]) -> Result<Split> {
        self.config.validate()?;
        if labels.len() < 2 {
            warn!(
                available = labels.len(),
                "insufficient data for train/test split; no split produced"
            );
            return Err(DatasetError::insufficient_data(
                SplitStage::Test,
                labels.len(),
            ));
        }

        let all: Vec<usize> = (0..labels.len()).collect();
        let (train_val, test) = split_stratified(
            labels,
            &all,
            self.config.test_split()?,
            self.config.test_seed,
        );
        info!(
            train_val = train_val.len(),
            test = test.len(),
            seed = self.config.test_seed,
            "stage 1 split"
        );

        let (train, validation) = if train_val.len() < 2 {
            warn!(
                available = train_val.len(),
                "insufficient data for validation split; stage 2 skipped"
            );
            (train_val, None)
        } else {
            let (train, validation) = split_stratified(
                labels,
                &train_val,
                self.config.validation_split()?,
                self.config.validation_seed,
            );
            info!(
                train = train.len(),
                validation = validation.len(),
                seed = self.config.validation_seed,
                "stage 2 split"
            );
            (train, Some(validation))
        };

        Ok(Split {
            train: Subset::new(train, labels),
            validation: validation.map(|v| Subset::new(v, labels)),
            test: Subset::new(test, labels),
        })
    }
}
