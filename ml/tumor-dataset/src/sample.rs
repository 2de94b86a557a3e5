//! Dataset sample type.

use serde::{Deserialize, Serialize};
use tumor_types::{ImageTensor, Label};

/// One labeled image.
///
/// # Example
///
/// ```
/// use tumor_dataset::Sample;
/// use tumor_types::{ImageTensor, Label, TargetSize};
///
/// let sample = Sample::new(ImageTensor::zeros(TargetSize::new(4, 4)), Label::Tumor);
/// assert_eq!(sample.label, Label::Tumor);
/// assert_eq!(sample.shape(), [4, 4, 3]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Normalized HWC image.
    pub image: ImageTensor,

    /// Label inherited from the source directory.
    pub label: Label,
}

impl Sample {
    /// Creates a new sample.
    #[must_use]
    pub const fn new(image: ImageTensor, label: Label) -> Self {
        Self { image, label }
    }

    /// Returns the image shape `[height, width, channels]`.
    #[must_use]
    pub const fn shape(&self) -> [usize; 3] {
        self.image.shape()
    }
}
