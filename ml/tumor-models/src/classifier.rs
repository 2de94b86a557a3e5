//! The model seam shared by training, evaluation and inference.

use tumor_types::{ImageBatch, TargetSize};

use crate::error::{ModelError, Result};

/// Anything that maps an image batch to per-image tumor probabilities.
///
/// Implemented by [`BurnClassifier`](crate::BurnClassifier) and by any
/// external training runtime that wants to plug into evaluation and the
/// inference adapter.
///
/// # Example
///
/// ```
/// use tumor_models::{Classifier, Result};
/// use tumor_types::{ImageBatch, TargetSize};
///
/// struct Constant(f32);
///
/// impl Classifier for Constant {
///     fn input_size(&self) -> TargetSize {
///         TargetSize::new(4, 4)
///     }
///
///     fn predict(&self, batch: &ImageBatch) -> Result<Vec<f32>> {
///         Ok(vec![self.0; batch.len()])
///     }
/// }
/// ```
pub trait Classifier {
    /// Image size the model was built for.
    fn input_size(&self) -> TargetSize;

    /// Returns one probability in `[0, 1]` per image in `batch`.
    ///
    /// # Errors
    ///
    /// Implementations fail on shape mismatches or backend errors.
    fn predict(&self, batch: &ImageBatch) -> Result<Vec<f32>>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn input_size(&self) -> TargetSize {
        (**self).input_size()
    }

    fn predict(&self, batch: &ImageBatch) -> Result<Vec<f32>> {
        (**self).predict(batch)
    }
}

/// Checks that `batch` is `[N, H, W, 3]` with `H`/`W` matching `size`.
///
/// # Errors
///
/// Returns [`ModelError::ShapeMismatch`] otherwise.
pub fn check_batch(size: TargetSize, batch: &ImageBatch) -> Result<()> {
    let [n, h, w, c] = batch.shape();
    let [eh, ew, ec] = size.shape();
    if n == 0 || (h, w, c) != (eh, ew, ec) {
        return Err(ModelError::shape_mismatch([n.max(1), eh, ew, ec], [n, h, w, c]));
    }
    Ok(())
}
