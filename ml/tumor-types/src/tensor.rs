//! Image tensors and batches.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypesError};
use crate::label::Label;
use crate::validation::ValidationError;

/// Number of color channels every tensor carries (RGB).
pub const CHANNELS: usize = 3;

/// Fixed geometry that every decoded image is resized to.
///
/// # Example
///
/// ```
/// use tumor_types::TargetSize;
///
/// let size = TargetSize::default();
/// assert_eq!(size.shape(), [128, 128, 3]);
/// assert_eq!(size.len(), 128 * 128 * 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetSize {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,
}

impl Default for TargetSize {
    fn default() -> Self {
        Self::SQUARE_128
    }
}

impl TargetSize {
    /// The 128×128 geometry used by the default pipeline.
    pub const SQUARE_128: Self = Self {
        width: 128,
        height: 128,
    };

    /// Creates a new target size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Returns the tensor shape `[height, width, channels]`.
    #[must_use]
    pub const fn shape(&self) -> [usize; 3] {
        [self.height as usize, self.width as usize, CHANNELS]
    }

    /// Returns the number of elements in one tensor of this size.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.height as usize * self.width as usize * CHANNELS
    }

    /// Returns `true` if either dimension is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Checks that both dimensions are positive.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ZeroTargetSize`] if either dimension is zero.
    pub const fn validate(&self) -> std::result::Result<(), ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::ZeroTargetSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

impl std::fmt::Display for TargetSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A single RGB image, HWC row-major, values normalized to `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageTensor {
    height: usize,
    width: usize,
    data: Vec<f32>,
}

impl ImageTensor {
    /// Wraps a flat HWC buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BufferLength`] if `data.len()` is not
    /// `height * width * 3`, or [`ValidationError::NonFiniteValue`] if any
    /// element is `NaN` or infinite.
    pub fn from_raw(height: usize, width: usize, data: Vec<f32>) -> Result<Self> {
        let expected = height * width * CHANNELS;
        if data.len() != expected {
            return Err(ValidationError::BufferLength {
                expected,
                actual: data.len(),
            }
            .into());
        }
        if let Some(index) = data.iter().position(|v| !v.is_finite()) {
            return Err(ValidationError::NonFiniteValue(index).into());
        }
        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Builds a normalized tensor from interleaved 8-bit RGB pixels.
    ///
    /// Each byte is divided by 255.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BufferLength`] if the pixel buffer does not
    /// match the given dimensions.
    pub fn from_rgb8(height: usize, width: usize, pixels: &[u8]) -> Result<Self> {
        let data = pixels.iter().map(|&p| f32::from(p) / 255.0).collect();
        Self::from_raw(height, width, data)
    }

    /// Creates a tensor of the given size with every element set to `value`.
    #[must_use]
    pub fn filled(size: TargetSize, value: f32) -> Self {
        let [height, width, _] = size.shape();
        Self {
            height,
            width,
            data: vec![value; size.len()],
        }
    }

    /// Creates an all-black tensor of the given size.
    #[must_use]
    pub fn zeros(size: TargetSize) -> Self {
        Self::filled(size, 0.0)
    }

    /// Returns the tensor shape `[height, width, channels]`.
    #[must_use]
    pub const fn shape(&self) -> [usize; 3] {
        [self.height, self.width, CHANNELS]
    }

    /// Image height in pixels.
    #[must_use]
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Image width in pixels.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Flat HWC view of the data.
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable flat HWC view of the data.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Consumes the tensor, returning the flat HWC buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Returns the value at `(row, col, channel)`, or `None` out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<f32> {
        if row >= self.height || col >= self.width || channel >= CHANNELS {
            return None;
        }
        self.data
            .get((row * self.width + col) * CHANNELS + channel)
            .copied()
    }

    /// Returns the mean of all elements (0 for an empty tensor).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().sum::<f32>() / self.data.len() as f32
    }

    /// Checks the tensor shape against a target size.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::ShapeMismatch`] on any difference.
    pub fn validate_shape(&self, size: TargetSize) -> std::result::Result<(), ValidationError> {
        let expected = size.shape();
        let actual = self.shape();
        if expected != actual {
            return Err(ValidationError::ShapeMismatch { expected, actual });
        }
        Ok(())
    }

    /// Checks that every element lies in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::OutOfRange`] for the first offending element.
    pub fn validate_range(&self) -> std::result::Result<(), ValidationError> {
        match self
            .data
            .iter()
            .enumerate()
            .find(|(_, v)| !(0.0..=1.0).contains(*v))
        {
            Some((index, &value)) => Err(ValidationError::OutOfRange { index, value }),
            None => Ok(()),
        }
    }

    /// Returns `true` if every element lies in `[0, 1]`.
    #[must_use]
    pub fn is_normalized(&self) -> bool {
        self.validate_range().is_ok()
    }

    /// Adds a leading singleton batch dimension.
    #[must_use]
    pub fn into_batch(self) -> ImageBatch {
        ImageBatch {
            len: 1,
            height: self.height,
            width: self.width,
            images: self.data,
            labels: Vec::new(),
        }
    }
}

/// Images stacked along a leading batch axis (`[N, H, W, 3]`).
///
/// Labels are present for training/evaluation batches and empty for
/// inference batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBatch {
    len: usize,
    height: usize,
    width: usize,
    images: Vec<f32>,
    labels: Vec<Label>,
}

impl ImageBatch {
    /// Stacks unlabeled images.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::EmptyBatch`] for an empty slice and
    /// [`ValidationError::ShapeMismatch`] if shapes differ.
    pub fn stack(images: &[&ImageTensor]) -> Result<Self> {
        Self::build(images, Vec::new())
    }

    /// Stacks images with their labels.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::LengthMismatch`] when counts differ, plus the
    /// errors of [`ImageBatch::stack`].
    pub fn labeled(images: &[&ImageTensor], labels: Vec<Label>) -> Result<Self> {
        if images.len() != labels.len() {
            return Err(TypesError::length_mismatch(images.len(), labels.len()));
        }
        Self::build(images, labels)
    }

    fn build(images: &[&ImageTensor], labels: Vec<Label>) -> Result<Self> {
        let first = images.first().ok_or(TypesError::EmptyBatch)?;
        let shape = first.shape();
        let mut data = Vec::with_capacity(images.len() * first.data.len());
        for image in images {
            if image.shape() != shape {
                return Err(ValidationError::ShapeMismatch {
                    expected: shape,
                    actual: image.shape(),
                }
                .into());
            }
            data.extend_from_slice(&image.data);
        }
        Ok(Self {
            len: images.len(),
            height: shape[0],
            width: shape[1],
            images: data,
            labels,
        })
    }

    /// Number of images in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the batch holds no images.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the batch shape `[N, H, W, 3]`.
    #[must_use]
    pub const fn shape(&self) -> [usize; 4] {
        [self.len, self.height, self.width, CHANNELS]
    }

    /// Flat `[N, H, W, 3]` image data.
    #[must_use]
    pub fn images(&self) -> &[f32] {
        &self.images
    }

    /// Flat data of the `index`-th image, if present.
    #[must_use]
    pub fn image(&self, index: usize) -> Option<&[f32]> {
        let stride = self.height * self.width * CHANNELS;
        self.images.get(index * stride..(index + 1) * stride)
    }

    /// Labels, empty for inference batches.
    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Returns `true` if every image carries a label.
    #[must_use]
    pub fn is_labeled(&self) -> bool {
        self.len > 0 && self.labels.len() == self.len
    }

    /// Labels as float training targets.
    #[must_use]
    pub fn targets(&self) -> Vec<f32> {
        self.labels.iter().map(|l| l.target()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_size_shape() {
        let size = TargetSize::new(64, 32);
        assert_eq!(size.shape(), [32, 64, 3]);
        assert_eq!(size.len(), 32 * 64 * 3);
        assert_eq!(format!("{size}"), "64x32");
    }

    #[test]
    fn target_size_validate() {
        assert!(TargetSize::default().validate().is_ok());
        assert!(TargetSize::new(0, 10).validate().is_err());
    }

    #[test]
    fn tensor_from_raw_length() {
        assert!(ImageTensor::from_raw(2, 2, vec![0.0; 12]).is_ok());
        assert!(matches!(
            ImageTensor::from_raw(2, 2, vec![0.0; 11]),
            Err(TypesError::Validation(ValidationError::BufferLength { .. }))
        ));
    }

    #[test]
    fn tensor_from_raw_non_finite() {
        let mut data = vec![0.0; 12];
        data[3] = f32::NAN;
        assert_eq!(
            ImageTensor::from_raw(2, 2, data),
            Err(TypesError::Validation(ValidationError::NonFiniteValue(3)))
        );
    }

    #[test]
    fn tensor_from_rgb8_normalizes() {
        let tensor = ImageTensor::from_rgb8(1, 1, &[0, 51, 255]).unwrap();
        assert_eq!(tensor.as_slice(), &[0.0, 0.2, 1.0]);
        assert!(tensor.is_normalized());
    }

    #[test]
    fn tensor_get() {
        let data: Vec<f32> = (0..12u8).map(|v| f32::from(v) / 12.0).collect();
        let tensor = ImageTensor::from_raw(2, 2, data).unwrap();
        // (row 1, col 0, channel 2) -> flat index (1*2 + 0)*3 + 2 = 8
        assert_eq!(tensor.get(1, 0, 2), Some(8.0 / 12.0));
        assert_eq!(tensor.get(2, 0, 0), None);
        assert_eq!(tensor.get(0, 0, 3), None);
    }

    #[test]
    fn tensor_validate_shape() {
        let tensor = ImageTensor::zeros(TargetSize::new(4, 4));
        assert!(tensor.validate_shape(TargetSize::new(4, 4)).is_ok());
        assert_eq!(
            tensor.validate_shape(TargetSize::new(8, 4)),
            Err(ValidationError::ShapeMismatch {
                expected: [4, 8, 3],
                actual: [4, 4, 3],
            })
        );
    }

    #[test]
    fn tensor_validate_range() {
        let mut tensor = ImageTensor::filled(TargetSize::new(2, 2), 0.5);
        assert!(tensor.is_normalized());
        tensor.as_mut_slice()[1] = 1.5;
        assert!(matches!(
            tensor.validate_range(),
            Err(ValidationError::OutOfRange { index: 1, .. })
        ));
    }

    #[test]
    fn tensor_into_batch() {
        let batch = ImageTensor::filled(TargetSize::new(3, 2), 0.25).into_batch();
        assert_eq!(batch.shape(), [1, 2, 3, 3]);
        assert!(!batch.is_labeled());
        assert_eq!(batch.image(0).map(<[f32]>::len), Some(18));
    }

    #[test]
    fn batch_labeled() {
        let a = ImageTensor::filled(TargetSize::new(2, 2), 0.0);
        let b = ImageTensor::filled(TargetSize::new(2, 2), 1.0);
        let batch = ImageBatch::labeled(&[&a, &b], vec![Label::NoTumor, Label::Tumor]).unwrap();

        assert_eq!(batch.len(), 2);
        assert!(batch.is_labeled());
        assert_eq!(batch.targets(), vec![0.0, 1.0]);
        assert_eq!(batch.image(1).map(|s| s[0]), Some(1.0));
        assert_eq!(batch.image(2), None);
    }

    #[test]
    fn batch_rejects_mixed_shapes() {
        let a = ImageTensor::zeros(TargetSize::new(2, 2));
        let b = ImageTensor::zeros(TargetSize::new(3, 2));
        assert!(matches!(
            ImageBatch::stack(&[&a, &b]),
            Err(TypesError::Validation(ValidationError::ShapeMismatch { .. }))
        ));
    }

    #[test]
    fn batch_rejects_empty_and_mismatched() {
        assert_eq!(ImageBatch::stack(&[]), Err(TypesError::EmptyBatch));

        let a = ImageTensor::zeros(TargetSize::new(2, 2));
        assert_eq!(
            ImageBatch::labeled(&[&a], vec![]),
            Err(TypesError::length_mismatch(1, 0))
        );
    }
}
