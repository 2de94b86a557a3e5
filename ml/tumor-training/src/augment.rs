//! Random geometric augmentation of training images.
//!
//! Each image gets an independent affine transform (rotation, zoom and
//! shift about the image centre) followed by optional flips. Sampling is
//! nearest-neighbour and out-of-bounds reads clamp to the nearest edge
//! pixel, so every output value is copied from the input: shape and value
//! range never change.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tumor_types::{CHANNELS, ImageBatch, ImageTensor};

use crate::error::{Result, TrainingError};

/// Ranges for the random transforms.
///
/// # Example
///
/// ```
/// use tumor_training::AugmentationConfig;
///
/// let config = AugmentationConfig::default();
/// assert!((config.rotation_degrees - 15.0).abs() < 1e-6);
/// assert!(config.horizontal_flip);
/// assert!(!config.vertical_flip);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AugmentationConfig {
    /// Maximum absolute rotation in degrees.
    pub rotation_degrees: f32,

    /// Zoom factors are drawn from `[1 - zoom_range, 1 + zoom_range]` per axis.
    pub zoom_range: f32,

    /// Maximum horizontal shift as a fraction of the width.
    pub width_shift: f32,

    /// Maximum vertical shift as a fraction of the height.
    pub height_shift: f32,

    /// Mirror left/right with probability 0.5.
    pub horizontal_flip: bool,

    /// Mirror top/bottom with probability 0.5.
    pub vertical_flip: bool,
}

impl Default for AugmentationConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl AugmentationConfig {
    /// Settings used for the tumor scans.
    #[must_use]
    pub const fn standard() -> Self {
        Self {
            rotation_degrees: 15.0,
            zoom_range: 0.1,
            width_shift: 0.1,
            height_shift: 0.1,
            horizontal_flip: true,
            vertical_flip: false,
        }
    }

    /// No augmentation at all.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            rotation_degrees: 0.0,
            zoom_range: 0.0,
            width_shift: 0.0,
            height_shift: 0.0,
            horizontal_flip: false,
            vertical_flip: false,
        }
    }

    /// Returns `true` if no transform can change an image.
    #[must_use]
    pub fn is_identity(&self) -> bool {
        self.rotation_degrees == 0.0
            && self.zoom_range == 0.0
            && self.width_shift == 0.0
            && self.height_shift == 0.0
            && !self.horizontal_flip
            && !self.vertical_flip
    }

    /// Validates the ranges.
    ///
    /// # Errors
    ///
    /// Returns [`TrainingError::InvalidConfig`] for negative or oversized ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=180.0).contains(&self.rotation_degrees) {
            return Err(TrainingError::invalid_config(format!(
                "rotation_degrees must be in [0, 180], got {}",
                self.rotation_degrees
            )));
        }
        for (name, value) in [
            ("zoom_range", self.zoom_range),
            ("width_shift", self.width_shift),
            ("height_shift", self.height_shift),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(TrainingError::invalid_config(format!(
                    "{name} must be in [0, 1), got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// One concrete draw of the random transforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Rotation in degrees, counter-clockwise.
    pub rotation_degrees: f32,
    /// Zoom factors `[vertical, horizontal]`; above 1 zooms out.
    pub zoom: [f32; 2],
    /// Shift in pixels `[rows, cols]`.
    pub shift: [f32; 2],
    /// Mirror left/right.
    pub flip_horizontal: bool,
    /// Mirror top/bottom.
    pub flip_vertical: bool,
}

impl Transform {
    /// The transform that leaves images untouched.
    pub const IDENTITY: Self = Self {
        rotation_degrees: 0.0,
        zoom: [1.0, 1.0],
        shift: [0.0, 0.0],
        flip_horizontal: false,
        flip_vertical: false,
    };

    /// Applies the transform to `image`.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply(&self, image: &ImageTensor) -> ImageTensor {
        let [height, width, _] = image.shape();
        let mut out = image.clone();
        if height == 0 || width == 0 {
            return out;
        }

        let (sin, cos) = self.rotation_degrees.to_radians().sin_cos();
        let cy = (height as f32 - 1.0) / 2.0;
        let cx = (width as f32 - 1.0) / 2.0;
        let max_row = (height - 1) as f32;
        let max_col = (width - 1) as f32;
        let source = image.as_slice();
        let target = out.as_mut_slice();

        for row in 0..height {
            for col in 0..width {
                let dy = row as f32 - cy;
                let dx = col as f32 - cx;
                let sy = (cos * dy - sin * dx).mul_add(self.zoom[0], cy + self.shift[0]);
                let sx = (sin * dy + cos * dx).mul_add(self.zoom[1], cx + self.shift[1]);
                let mut src_row = sy.round().clamp(0.0, max_row) as usize;
                let mut src_col = sx.round().clamp(0.0, max_col) as usize;
                if self.flip_vertical {
                    src_row = height - 1 - src_row;
                }
                if self.flip_horizontal {
                    src_col = width - 1 - src_col;
                }
                let from = (src_row * width + src_col) * CHANNELS;
                let to = (row * width + col) * CHANNELS;
                target[to..to + CHANNELS].copy_from_slice(&source[from..from + CHANNELS]);
            }
        }
        out
    }
}

/// Seeded source of random transforms.
///
/// # Example
///
/// ```
/// use tumor_training::{AugmentationConfig, Augmenter};
/// use tumor_types::{ImageTensor, TargetSize};
///
/// let mut augmenter = Augmenter::new(AugmentationConfig::default(), Some(42));
/// let image = ImageTensor::filled(TargetSize::new(16, 16), 0.3);
/// let augmented = augmenter.augment(&image);
/// assert_eq!(augmented.shape(), image.shape());
/// ```
#[derive(Debug, Clone)]
pub struct Augmenter {
    config: AugmentationConfig,
    rng: ChaCha8Rng,
}

impl Augmenter {
    /// Creates an augmenter. `None` seeds from entropy.
    #[must_use]
    pub fn new(config: AugmentationConfig, seed: Option<u64>) -> Self {
        let rng = seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        Self { config, rng }
    }

    /// Returns the configured ranges.
    #[must_use]
    pub const fn config(&self) -> &AugmentationConfig {
        &self.config
    }

    /// Draws the next transform for an image of `height` x `width`.
    #[allow(clippy::cast_precision_loss)]
    pub fn sample(&mut self, height: usize, width: usize) -> Transform {
        let c = self.config;
        let rotation = self.symmetric(c.rotation_degrees);
        let zoom = [1.0 + self.symmetric(c.zoom_range), 1.0 + self.symmetric(c.zoom_range)];
        let shift = [
            self.symmetric(c.height_shift) * height as f32,
            self.symmetric(c.width_shift) * width as f32,
        ];
        let flip_horizontal = c.horizontal_flip && self.rng.gen_bool(0.5);
        let flip_vertical = c.vertical_flip && self.rng.gen_bool(0.5);
        Transform {
            rotation_degrees: rotation,
            zoom,
            shift,
            flip_horizontal,
            flip_vertical,
        }
    }

    fn symmetric(&mut self, limit: f32) -> f32 {
        if limit > 0.0 {
            self.rng.gen_range(-limit..=limit)
        } else {
            0.0
        }
    }

    /// Returns a randomly transformed copy of `image`.
    pub fn augment(&mut self, image: &ImageTensor) -> ImageTensor {
        if self.config.is_identity() {
            return image.clone();
        }
        let transform = self.sample(image.height(), image.width());
        transform.apply(image)
    }

    /// Augments every image of a batch, keeping labels.
    ///
    /// # Errors
    ///
    /// Returns a dataset error if the batch cannot be rebuilt.
    pub fn augment_batch(&mut self, batch: &ImageBatch) -> Result<ImageBatch> {
        let [len, height, width, _] = batch.shape();
        let mut images = Vec::with_capacity(len);
        for index in 0..len {
            let data = batch.image(index).unwrap_or_default().to_vec();
            let image = ImageTensor::from_raw(height, width, data)?;
            images.push(self.augment(&image));
        }
        let refs: Vec<&ImageTensor> = images.iter().collect();
        let rebuilt = if batch.is_labeled() {
            ImageBatch::labeled(&refs, batch.labels().to_vec())?
        } else {
            ImageBatch::stack(&refs)?
        };
        Ok(rebuilt)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use tumor_types::{Label, TargetSize};

    use super::*;

    /// Each pixel encodes its own position so moves are observable.
    fn ramp(size: usize) -> ImageTensor {
        let mut data = Vec::with_capacity(size * size * CHANNELS);
        for row in 0..size {
            for col in 0..size {
                #[allow(clippy::cast_precision_loss)]
                let v = (row * size + col) as f32 / (size * size) as f32;
                data.extend_from_slice(&[v, v, v]);
            }
        }
        ImageTensor::from_raw(size, size, data).unwrap()
    }

    #[test]
    fn identity_transform_is_noop() {
        let image = ramp(9);
        assert_eq!(Transform::IDENTITY.apply(&image), image);
    }

    #[test]
    fn horizontal_flip_mirrors_columns() {
        let image = ramp(4);
        let flipped = Transform {
            flip_horizontal: true,
            ..Transform::IDENTITY
        }
        .apply(&image);
        for row in 0..4 {
            for col in 0..4 {
                assert_eq!(flipped.get(row, col, 0), image.get(row, 3 - col, 0));
            }
        }
    }

    #[test]
    fn quarter_turn_moves_corners() {
        let image = ramp(5);
        let turned = Transform {
            rotation_degrees: 90.0,
            ..Transform::IDENTITY
        }
        .apply(&image);
        assert_ne!(turned, image);
        // Centre pixel is the rotation pivot.
        assert_eq!(turned.get(2, 2, 0), image.get(2, 2, 0));
    }

    #[test]
    fn shift_clamps_to_edge() {
        let image = ramp(4);
        let shifted = Transform {
            shift: [0.0, 10.0],
            ..Transform::IDENTITY
        }
        .apply(&image);
        for row in 0..4 {
            for col in 0..4 {
                assert_eq!(shifted.get(row, col, 0), image.get(row, 3, 0));
            }
        }
    }

    #[test]
    fn augmentation_preserves_shape_and_range() {
        let mut augmenter = Augmenter::new(AugmentationConfig::default(), Some(1));
        let image = ramp(12);
        for _ in 0..20 {
            let out = augmenter.augment(&image);
            assert_eq!(out.shape(), image.shape());
            assert!(out.is_normalized());
            let min = image.as_slice().iter().copied().fold(f32::MAX, f32::min);
            let max = image.as_slice().iter().copied().fold(f32::MIN, f32::max);
            assert!(out.as_slice().iter().all(|v| (min..=max).contains(v)));
        }
    }

    #[test]
    fn seeded_augmenters_agree() {
        let image = ramp(10);
        let mut a = Augmenter::new(AugmentationConfig::default(), Some(9));
        let mut b = Augmenter::new(AugmentationConfig::default(), Some(9));
        for _ in 0..5 {
            assert_eq!(a.augment(&image), b.augment(&image));
        }
    }

    #[test]
    fn sample_stays_in_range() {
        let mut augmenter = Augmenter::new(AugmentationConfig::default(), Some(5));
        for _ in 0..100 {
            let t = augmenter.sample(128, 128);
            assert!(t.rotation_degrees.abs() <= 15.0);
            assert!(t.zoom.iter().all(|z| (0.9..=1.1).contains(z)));
            assert!(t.shift.iter().all(|s| s.abs() <= 12.8 + 1e-4));
            assert!(!t.flip_vertical);
        }
    }

    #[test]
    fn disabled_config_returns_input() {
        let mut augmenter = Augmenter::new(AugmentationConfig::none(), None);
        let image = ramp(6);
        assert_eq!(augmenter.augment(&image), image);
    }

    #[test]
    fn batch_keeps_labels() {
        let size = TargetSize::new(6, 6);
        let a = ImageTensor::filled(size, 0.2);
        let b = ImageTensor::filled(size, 0.8);
        let batch = ImageBatch::labeled(&[&a, &b], vec![Label::NoTumor, Label::Tumor]).unwrap();
        let mut augmenter = Augmenter::new(AugmentationConfig::default(), Some(2));
        let out = augmenter.augment_batch(&batch).unwrap();
        assert_eq!(out.shape(), batch.shape());
        assert_eq!(out.labels(), batch.labels());
        // Uniform images stay uniform under any geometric transform.
        assert_relative_eq!(out.image(1).unwrap()[0], 0.8);
    }

    #[test]
    fn invalid_ranges() {
        let mut config = AugmentationConfig::default();
        config.zoom_range = 1.5;
        assert!(config.validate().is_err());
        config = AugmentationConfig::default();
        config.rotation_degrees = -1.0;
        assert!(config.validate().is_err());
        assert!(AugmentationConfig::default().validate().is_ok());
    }
}
