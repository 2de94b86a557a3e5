//! Batch pipeline over a dataset subset.
//!
//! The training subset goes through a bounded shuffle buffer before
//! batching; evaluation subsets are batched in subset order. The trailing
//! partial batch is always emitted.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tumor_types::ImageBatch;

use crate::config::PipelineConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::splits::Subset;

/// Bounded shuffle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShuffleBuffer {
    /// Maximum number of pending samples to draw from.
    pub capacity: usize,

    /// Base seed; `None` draws fresh entropy every epoch.
    pub seed: Option<u64>,
}

impl ShuffleBuffer {
    /// Reorders `indices` through a buffer of at most `capacity` items.
    ///
    /// The buffer starts with the first `capacity` items. Each step emits a
    /// uniformly chosen buffered item and refills its slot from the input, so
    /// an item can move at most `capacity - 1` positions earlier. With
    /// `capacity >= indices.len()` this is a uniform shuffle.
    #[must_use]
    pub fn apply<R: Rng>(&self, indices: &[usize], rng: &mut R) -> Vec<usize> {
        let capacity = self.capacity.max(1);
        let mut incoming = indices.iter().copied();
        let mut buffer: Vec<usize> = incoming.by_ref().take(capacity).collect();
        let mut order = Vec::with_capacity(indices.len());

        for next in incoming {
            let slot = rng.gen_range(0..buffer.len());
            order.push(std::mem::replace(&mut buffer[slot], next));
        }
        while !buffer.is_empty() {
            let slot = rng.gen_range(0..buffer.len());
            order.push(buffer.swap_remove(slot));
        }
        order
    }

    fn rng(&self, epoch: u64) -> ChaCha8Rng {
        self.seed.map_or_else(ChaCha8Rng::from_entropy, |seed| {
            ChaCha8Rng::seed_from_u64(seed.wrapping_add(epoch))
        })
    }
}

/// Produces fixed-size labeled batches from one subset.
///
/// A pipeline is cheap to keep around; every call to
/// [`BatchPipeline::epoch`] yields a new pass with its own shuffle.
///
/// # Example
///
/// ```
/// use tumor_dataset::{BatchPipeline, Dataset, Sample};
/// use tumor_types::{ImageTensor, Label, TargetSize};
///
/// let size = TargetSize::new(2, 2);
/// let samples = (0..5)
///     .map(|_| Sample::new(ImageTensor::zeros(size), Label::NoTumor))
///     .collect();
/// let dataset = Dataset::from_samples(samples).unwrap();
///
/// let pipeline = BatchPipeline::new(&dataset, (0..5).collect(), 2);
/// let sizes: Vec<usize> = pipeline.epoch(0).map(|b| b.unwrap().len()).collect();
/// assert_eq!(sizes, vec![2, 2, 1]);
/// ```
#[derive(Debug, Clone)]
pub struct BatchPipeline<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
    batch_size: usize,
    shuffle: Option<ShuffleBuffer>,
}

impl<'a> BatchPipeline<'a> {
    /// Creates an unshuffled pipeline over `indices`.
    ///
    /// A `batch_size` of zero is treated as one.
    #[must_use]
    pub fn new(dataset: &'a Dataset, indices: Vec<usize>, batch_size: usize) -> Self {
        Self {
            dataset,
            indices,
            batch_size: batch_size.max(1),
            shuffle: None,
        }
    }

    /// Training pipeline: shuffled through the configured buffer.
    #[must_use]
    pub fn training(dataset: &'a Dataset, subset: &Subset, config: &PipelineConfig) -> Self {
        Self::new(dataset, subset.indices().to_vec(), config.batch_size).with_shuffle(ShuffleBuffer {
            capacity: config.shuffle_buffer,
            seed: config.shuffle_seed,
        })
    }

    /// Evaluation pipeline: subset order, no shuffle.
    #[must_use]
    pub fn evaluation(dataset: &'a Dataset, subset: &Subset, config: &PipelineConfig) -> Self {
        Self::new(dataset, subset.indices().to_vec(), config.batch_size)
    }

    /// Enables the bounded shuffle.
    #[must_use]
    pub const fn with_shuffle(mut self, shuffle: ShuffleBuffer) -> Self {
        self.shuffle = Some(shuffle);
        self
    }

    /// Samples per full batch.
    #[must_use]
    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Samples per epoch.
    #[must_use]
    pub fn num_samples(&self) -> usize {
        self.indices.len()
    }

    /// Batches per epoch, counting the trailing partial batch.
    #[must_use]
    pub fn num_batches(&self) -> usize {
        self.indices.len().div_ceil(self.batch_size)
    }

    /// Returns `true` if the shuffle buffer is enabled.
    #[must_use]
    pub const fn is_shuffled(&self) -> bool {
        self.shuffle.is_some()
    }

    /// Sample order for `epoch`.
    #[must_use]
    pub fn epoch_order(&self, epoch: u64) -> Vec<usize> {
        match &self.shuffle {
            Some(shuffle) => shuffle.apply(&self.indices, &mut shuffle.rng(epoch)),
            None => self.indices.clone(),
        }
    }

    /// Iterates one pass over the subset.
    #[must_use]
    pub fn epoch(&self, epoch: u64) -> Batches<'a> {
        Batches {
            dataset: self.dataset,
            order: self.epoch_order(epoch),
            batch_size: self.batch_size,
            cursor: 0,
        }
    }
}

/// One pass of batches. Created by [`BatchPipeline::epoch`].
#[derive(Debug)]
pub struct Batches<'a> {
    dataset: &'a Dataset,
    order: Vec<usize>,
    batch_size: usize,
    cursor: usize,
}

impl Iterator for Batches<'_> {
    type Item = Result<ImageBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor >= self.order.len() {
            return None;
        }
        let end = (self.cursor + self.batch_size).min(self.order.len());
        let batch = self.dataset.batch(&self.order[self.cursor..end]);
        self.cursor = end;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.order.len() - self.cursor).div_ceil(self.batch_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}
