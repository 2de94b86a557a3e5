//! Single-image inference adapter.
//!
//! Decodes uploaded bytes with the same [`Preprocessor`] used at ingestion,
//! adds the batch axis, runs the model and thresholds the probability.

use tracing::{debug, warn};
use tumor_dataset::Preprocessor;
use tumor_types::{ImageTensor, Prediction};

use crate::classifier::Classifier;
use crate::error::InferenceError;

/// Binds a model to the preprocessor it was trained with.
///
/// # Example
///
/// ```
/// use tumor_dataset::Preprocessor;
/// use tumor_models::{Classifier, Predictor, Result};
/// use tumor_types::{ImageBatch, Label, TargetSize};
///
/// struct AlwaysTumor;
///
/// impl Classifier for AlwaysTumor {
///     fn input_size(&self) -> TargetSize {
///         TargetSize::new(8, 8)
///     }
///     fn predict(&self, batch: &ImageBatch) -> Result<Vec<f32>> {
///         Ok(vec![0.9; batch.len()])
///     }
/// }
///
/// let predictor = Predictor::new(&AlwaysTumor, Preprocessor::new(TargetSize::new(8, 8))).unwrap();
/// let image = image::RgbImage::new(8, 8);
/// let prediction = predictor.predict_tensor(predictor.preprocessor().preprocess_rgb(&image).unwrap());
/// assert_eq!(prediction.unwrap().label, Label::Tumor);
/// ```
#[derive(Debug)]
pub struct Predictor<'m, C: Classifier + ?Sized> {
    model: &'m C,
    preprocessor: Preprocessor,
}

impl<'m, C: Classifier + ?Sized> Predictor<'m, C> {
    /// Creates a predictor.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::SizeMismatch`] when the preprocessor does not
    /// produce the model's input size.
    pub fn new(model: &'m C, preprocessor: Preprocessor) -> Result<Self, InferenceError> {
        let expected = model.input_size();
        if preprocessor.target() != expected {
            return Err(InferenceError::SizeMismatch {
                model: expected,
                preprocessor: preprocessor.target(),
            });
        }
        Ok(Self {
            model,
            preprocessor,
        })
    }

    /// Preprocessor shared with ingestion.
    #[must_use]
    pub const fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    /// Classifies raw image bytes.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError`] for empty or undecodable uploads, model
    /// failures, or a malformed model output.
    pub fn predict_bytes(&self, bytes: &[u8]) -> Result<Prediction, InferenceError> {
        if bytes.is_empty() {
            return Err(InferenceError::EmptyUpload);
        }
        let tensor = self.preprocessor.decode_bytes(bytes)?;
        self.predict_tensor(tensor)
    }

    /// Classifies an already preprocessed image.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError`] for model failures or a malformed output.
    pub fn predict_tensor(&self, tensor: ImageTensor) -> Result<Prediction, InferenceError> {
        let batch = tensor.into_batch();
        let output = self.model.predict(&batch)?;
        let probability = match output.as_slice() {
            [p] if p.is_finite() && (0.0..=1.0).contains(p) => *p,
            [p] => {
                warn!(probability = p, "model returned an out-of-range probability");
                return Err(InferenceError::InvalidOutput(format!(
                    "probability {p} is not in [0, 1]"
                )));
            }
            other => {
                return Err(InferenceError::InvalidOutput(format!(
                    "expected 1 output, got {}",
                    other.len()
                )));
            }
        };
        let prediction = Prediction::from_probability(probability);
        debug!(
            label = prediction.label.name(),
            confidence = prediction.confidence,
            "prediction"
        );
        Ok(prediction)
    }
}

/// Classifies `bytes` with an optional model.
///
/// A `None` model yields [`InferenceError::ModelUnavailable`] instead of a
/// crash.
///
/// # Errors
///
/// See [`Predictor::new`] and [`Predictor::predict_bytes`].
pub fn predict<C: Classifier + ?Sized>(
    model: Option<&C>,
    preprocessor: Preprocessor,
    bytes: &[u8],
) -> Result<Prediction, InferenceError> {
    let model = model.ok_or(InferenceError::ModelUnavailable)?;
    Predictor::new(model, preprocessor)?.predict_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use approx::assert_relative_eq;
    use image::{ImageFormat, Rgb, RgbImage};
    use tumor_types::{ImageBatch, Label, TargetSize};

    use super::*;
    use crate::error::{ModelError, Result};

    /// Returns mean pixel intensity as the tumor probability.
    #[derive(Debug)]
    struct Brightness {
        size: TargetSize,
    }

    impl Classifier for Brightness {
        fn input_size(&self) -> TargetSize {
            self.size
        }

        fn predict(&self, batch: &ImageBatch) -> Result<Vec<f32>> {
            #[allow(clippy::cast_precision_loss)]
            let per_image = (batch.images().len() / batch.len()) as f32;
            Ok((0..batch.len())
                .map(|i| batch.image(i).map_or(0.0, |img| img.iter().sum::<f32>() / per_image))
                .collect())
        }
    }

    struct Broken(Vec<f32>);

    impl Classifier for Broken {
        fn input_size(&self) -> TargetSize {
            TargetSize::new(4, 4)
        }

        fn predict(&self, _batch: &ImageBatch) -> Result<Vec<f32>> {
            if self.0.is_empty() {
                return Err(ModelError::backend("device lost"));
            }
            Ok(self.0.clone())
        }
    }

    fn png(shade: u8) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        RgbImage::from_pixel(10, 10, Rgb([shade; 3]))
            .write_to(&mut bytes, ImageFormat::Png)
            .unwrap();
        bytes.into_inner()
    }

    fn brightness() -> Brightness {
        Brightness {
            size: TargetSize::new(4, 4),
        }
    }

    #[test]
    fn bright_scan_is_tumor() {
        let model = brightness();
        let pre = Preprocessor::new(TargetSize::new(4, 4));
        let prediction = predict(Some(&model), pre, &png(255)).unwrap();
        assert_eq!(prediction.label, Label::Tumor);
        assert_relative_eq!(prediction.confidence, 1.0);
    }

    #[test]
    fn dark_scan_confidence_is_complement() {
        let model = brightness();
        let pre = Preprocessor::new(TargetSize::new(4, 4));
        let prediction = predict(Some(&model), pre, &png(51)).unwrap();
        assert_eq!(prediction.label, Label::NoTumor);
        assert_relative_eq!(prediction.probability, 0.2, epsilon = 1e-6);
        assert_relative_eq!(prediction.confidence, 0.8, epsilon = 1e-6);
    }

    #[test]
    fn missing_model_is_reported() {
        let err = predict::<Brightness>(None, Preprocessor::default(), &png(0)).unwrap_err();
        assert!(matches!(err, InferenceError::ModelUnavailable));
    }

    #[test]
    fn empty_and_garbage_uploads() {
        let model = brightness();
        let pre = Preprocessor::new(TargetSize::new(4, 4));
        assert!(matches!(
            predict(Some(&model), pre, &[]),
            Err(InferenceError::EmptyUpload)
        ));
        assert!(matches!(
            predict(Some(&model), pre, b"GIF89a nope"),
            Err(InferenceError::Preprocess(_))
        ));
    }

    #[test]
    fn size_mismatch_rejected() {
        let model = brightness();
        let err = Predictor::new(&model, Preprocessor::default()).unwrap_err();
        assert!(matches!(err, InferenceError::SizeMismatch { .. }));
    }

    #[test]
    fn model_failures_become_errors() {
        let pre = Preprocessor::new(TargetSize::new(4, 4));
        let failing = Broken(Vec::new());
        assert!(matches!(
            predict(Some(&failing), pre, &png(0)),
            Err(InferenceError::Model(_))
        ));

        let too_many = Broken(vec![0.1, 0.2]);
        assert!(matches!(
            predict(Some(&too_many), pre, &png(0)),
            Err(InferenceError::InvalidOutput(_))
        ));

        let out_of_range = Broken(vec![1.5]);
        assert!(matches!(
            predict(Some(&out_of_range), pre, &png(0)),
            Err(InferenceError::InvalidOutput(_))
        ));
    }
}
