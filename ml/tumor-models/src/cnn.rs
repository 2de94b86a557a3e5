//! Convolutional tumor classifier.

use burn::module::Module;
use burn::nn::conv::{Conv2d, Conv2dConfig};
use burn::nn::pool::{MaxPool2d, MaxPool2dConfig};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu};
use burn::prelude::Backend;
use burn::tensor::activation::sigmoid;
use burn::tensor::{Tensor, TensorData};
use serde::{Deserialize, Serialize};
use tumor_types::{CHANNELS, ImageBatch, TargetSize};

use crate::classifier::{Classifier, check_batch};
use crate::error::{ModelError, Result};

/// Configuration for [`TumorCnn`].
///
/// Three `conv 3x3 (valid) -> ReLU -> max-pool 2x2` blocks, then
/// `flatten -> dense + ReLU -> dropout -> dense(1) -> sigmoid`.
///
/// # Example
///
/// ```
/// use tumor_models::TumorCnnConfig;
///
/// let config = TumorCnnConfig::default();
/// assert_eq!(config.filters, [32, 64, 128]);
/// assert_eq!(config.feature_map(), Some([14, 14]));
/// assert_eq!(config.flattened_features(), Some(14 * 14 * 128));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TumorCnnConfig {
    /// Input image size.
    pub input: TargetSize,

    /// Output channels of the three convolution blocks.
    pub filters: [usize; 3],

    /// Units in the hidden dense layer.
    pub hidden: usize,

    /// Dropout probability after the hidden layer.
    pub dropout: f64,

    /// L2 coefficient on the first convolution kernel and the hidden
    /// dense kernel. Applied by [`BurnClassifier::loss`].
    pub l2: f32,
}

impl Default for TumorCnnConfig {
    fn default() -> Self {
        Self {
            input: TargetSize::SQUARE_128,
            filters: [32, 64, 128],
            hidden: 128,
            dropout: 0.6,
            l2: 0.01,
        }
    }
}

impl TumorCnnConfig {
    /// Sets the input size.
    #[must_use]
    pub const fn with_input(mut self, input: TargetSize) -> Self {
        self.input = input;
        self
    }

    /// Sets the convolution widths.
    #[must_use]
    pub const fn with_filters(mut self, filters: [usize; 3]) -> Self {
        self.filters = filters;
        self
    }

    /// Sets the hidden layer width.
    #[must_use]
    pub const fn with_hidden(mut self, hidden: usize) -> Self {
        self.hidden = hidden;
        self
    }

    /// Sets the dropout probability.
    #[must_use]
    pub const fn with_dropout(mut self, dropout: f64) -> Self {
        self.dropout = dropout;
        self
    }

    /// Sets the L2 coefficient.
    #[must_use]
    pub const fn with_l2(mut self, l2: f32) -> Self {
        self.l2 = l2;
        self
    }

    /// Spatial size `[height, width]` after the last pooling layer, or
    /// `None` if the input is too small for three blocks.
    #[must_use]
    pub fn feature_map(&self) -> Option<[usize; 2]> {
        let shrink = |mut side: usize| {
            for _ in 0..3 {
                side = side.checked_sub(2)? / 2;
                if side == 0 {
                    return None;
                }
            }
            Some(side)
        };
        let [height, width, _] = self.input.shape();
        Some([shrink(height)?, shrink(width)?])
    }

    /// Length of the flattened feature vector.
    #[must_use]
    pub fn flattened_features(&self) -> Option<usize> {
        self.feature_map().map(|[h, w]| h * w * self.filters[2])
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] describing the first problem.
    pub fn validate(&self) -> Result<()> {
        if self.filters.contains(&0) || self.hidden == 0 {
            return Err(ModelError::invalid_config("layer widths must be positive"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ModelError::invalid_config(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if !(self.l2 >= 0.0 && self.l2.is_finite()) {
            return Err(ModelError::invalid_config("l2 must be non-negative"));
        }
        if self.feature_map().is_none() {
            return Err(ModelError::invalid_config(format!(
                "input {} is too small for three conv/pool blocks",
                self.input
            )));
        }
        Ok(())
    }
}

/// CNN producing one tumor logit per image.
///
/// Takes `[N, 3, H, W]` input. Use [`BurnClassifier`] to feed it
/// [`ImageBatch`]es in `[N, H, W, 3]` layout.
#[derive(Debug, Module)]
pub struct TumorCnn<B: Backend> {
    conv1: Conv2d<B>,
    conv2: Conv2d<B>,
    conv3: Conv2d<B>,
    pool: MaxPool2d,
    dense: Linear<B>,
    dropout: Dropout,
    output: Linear<B>,
    activation: Relu,
}

impl<B: Backend> TumorCnn<B> {
    /// Creates a randomly initialized network.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: &TumorCnnConfig, device: &B::Device) -> Result<Self> {
        config.validate()?;
        let flattened = config
            .flattened_features()
            .ok_or_else(|| ModelError::invalid_config("input too small"))?;
        let [f1, f2, f3] = config.filters;

        Ok(Self {
            conv1: Conv2dConfig::new([CHANNELS, f1], [3, 3]).init(device),
            conv2: Conv2dConfig::new([f1, f2], [3, 3]).init(device),
            conv3: Conv2dConfig::new([f2, f3], [3, 3]).init(device),
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            dense: LinearConfig::new(flattened, config.hidden).init(device),
            dropout: DropoutConfig::new(config.dropout).init(),
            output: LinearConfig::new(config.hidden, 1).init(device),
            activation: Relu::new(),
        })
    }

    /// Returns logits of shape `[N, 1]` for `[N, 3, H, W]` input.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.pool.forward(self.activation.forward(self.conv1.forward(images)));
        let x = self.pool.forward(self.activation.forward(self.conv2.forward(x)));
        let x = self.pool.forward(self.activation.forward(self.conv3.forward(x)));
        let x = x.flatten::<2>(1, 3);
        let x = self.dropout.forward(self.activation.forward(self.dense.forward(x)));
        self.output.forward(x)
    }

    /// Returns probabilities of shape `[N, 1]`.
    pub fn forward_probabilities(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        sigmoid(self.forward(images))
    }

    /// L2 penalty `l2 * sum(w^2)` over the first convolution kernel and
    /// the hidden dense kernel.
    pub fn l2_penalty(&self, l2: f32) -> Tensor<B, 1> {
        let conv = self.conv1.weight.val().powf_scalar(2.0).sum();
        let dense = self.dense.weight.val().powf_scalar(2.0).sum();
        conv.add(dense).mul_scalar(l2)
    }
}

const PROBABILITY_EPSILON: f32 = 1e-7;

/// Converts a `[N, H, W, 3]` batch into an `[N, 3, H, W]` tensor.
pub fn batch_to_tensor<B: Backend>(batch: &ImageBatch, device: &B::Device) -> Tensor<B, 4> {
    let data = TensorData::new(batch.images().to_vec(), batch.shape());
    Tensor::<B, 4>::from_data(data, device).permute([0, 3, 1, 2])
}

/// [`TumorCnn`] bound to its configuration and device.
///
/// # Example
///
/// ```
/// use tumor_models::{BurnClassifier, Classifier, CpuBackend, TumorCnnConfig};
/// use tumor_types::{ImageBatch, ImageTensor, TargetSize};
///
/// let size = TargetSize::new(24, 24);
/// let config = TumorCnnConfig::default()
///     .with_input(size)
///     .with_filters([2, 2, 2])
///     .with_hidden(4);
/// let classifier = BurnClassifier::<CpuBackend>::new(config, Default::default()).unwrap();
///
/// let image = ImageTensor::filled(size, 0.5);
/// let batch = ImageBatch::stack(&[&image]).unwrap();
/// let probabilities = classifier.predict(&batch).unwrap();
/// assert_eq!(probabilities.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct BurnClassifier<B: Backend> {
    model: TumorCnn<B>,
    config: TumorCnnConfig,
    device: B::Device,
}

impl<B: Backend> BurnClassifier<B> {
    /// Creates a classifier with fresh weights.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::InvalidConfig`] for a bad configuration.
    pub fn new(config: TumorCnnConfig, device: B::Device) -> Result<Self> {
        let model = TumorCnn::new(&config, &device)?;
        Ok(Self {
            model,
            config,
            device,
        })
    }

    /// Wraps an existing network.
    #[must_use]
    pub const fn from_parts(model: TumorCnn<B>, config: TumorCnnConfig, device: B::Device) -> Self {
        Self {
            model,
            config,
            device,
        }
    }

    /// Underlying network.
    #[must_use]
    pub const fn model(&self) -> &TumorCnn<B> {
        &self.model
    }

    /// Consumes the wrapper, returning the network.
    #[must_use]
    pub fn into_model(self) -> TumorCnn<B> {
        self.model
    }

    /// Model configuration.
    #[must_use]
    pub const fn config(&self) -> &TumorCnnConfig {
        &self.config
    }

    /// Device the weights live on.
    #[must_use]
    pub const fn device(&self) -> &B::Device {
        &self.device
    }

    /// Training objective for a labeled batch: mean binary cross-entropy
    /// plus [`TumorCnn::l2_penalty`] at the configured `l2`.
    ///
    /// Learner implementations backpropagate through the returned scalar.
    /// Probabilities are clamped to `[1e-7, 1 - 1e-7]` before the log.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ShapeMismatch`] for a wrong image size and
    /// [`ModelError::InvalidConfig`] for an unlabeled batch.
    pub fn loss(&self, batch: &ImageBatch) -> Result<Tensor<B, 1>> {
        check_batch(self.config.input, batch)?;
        if !batch.is_labeled() {
            return Err(ModelError::invalid_config("loss requires a labeled batch"));
        }
        let input = batch_to_tensor::<B>(batch, &self.device);
        let probabilities = self
            .model
            .forward_probabilities(input)
            .clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
        let targets = Tensor::<B, 2>::from_data(
            TensorData::new(batch.targets(), [batch.len(), 1]),
            &self.device,
        );
        let positive = targets.clone().mul(probabilities.clone().log());
        let negative = targets.neg().add_scalar(1.0).mul(probabilities.neg().add_scalar(1.0).log());
        let cross_entropy = positive.add(negative).neg().mean();
        Ok(cross_entropy.add(self.model.l2_penalty(self.config.l2)))
    }
}

impl<B: Backend> Classifier for BurnClassifier<B> {
    fn input_size(&self) -> TargetSize {
        self.config.input
    }

    fn predict(&self, batch: &ImageBatch) -> Result<Vec<f32>> {
        check_batch(self.config.input, batch)?;
        let input = batch_to_tensor::<B>(batch, &self.device);
        let output = self.model.forward_probabilities(input);
        output
            .into_data()
            .to_vec::<f32>()
            .map_err(|e| ModelError::backend(format!("{e:?}")))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use burn_ndarray::NdArray;
    use tumor_types::{ImageTensor, Label};

    use super::*;

    type TestBackend = NdArray<f32>;

    fn small_config() -> TumorCnnConfig {
        TumorCnnConfig::default()
            .with_input(TargetSize::new(24, 24))
            .with_filters([2, 3, 4])
            .with_hidden(5)
    }

    #[test]
    fn config_default_matches_reference_architecture() {
        let config = TumorCnnConfig::default();
        assert_eq!(config.hidden, 128);
        assert_relative_eq!(config.dropout, 0.6);
        assert_relative_eq!(config.l2, 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn feature_map_sizes() {
        assert_eq!(small_config().feature_map(), Some([1, 1]));
        assert_eq!(small_config().flattened_features(), Some(4));
        let tall = TumorCnnConfig::default().with_input(TargetSize::new(64, 128));
        assert_eq!(tall.feature_map(), Some([14, 6]));
    }

    #[test]
    fn config_rejects_tiny_input() {
        let config = TumorCnnConfig::default().with_input(TargetSize::new(16, 16));
        assert!(config.feature_map().is_none());
        assert!(matches!(config.validate(), Err(ModelError::InvalidConfig(_))));
    }

    #[test]
    fn config_rejects_bad_dropout() {
        assert!(TumorCnnConfig::default().with_dropout(1.0).validate().is_err());
        assert!(TumorCnnConfig::default().with_dropout(-0.1).validate().is_err());
    }

    #[test]
    fn config_serialization() {
        let config = small_config();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TumorCnnConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn forward_shapes() {
        let device = Default::default();
        let model = TumorCnn::<TestBackend>::new(&small_config(), &device).unwrap();
        let input = Tensor::<TestBackend, 4>::zeros([3, 3, 24, 24], &device);
        assert_eq!(model.forward(input).dims(), [3, 1]);
    }

    #[test]
    fn batch_to_tensor_is_channels_first() {
        let device = Default::default();
        let image = ImageTensor::from_raw(1, 2, vec![0.1, 0.2, 0.3, 0.4, 0.5, 0.6]).unwrap();
        let batch = ImageBatch::stack(&[&image]).unwrap();
        assert_eq!(batch.shape(), [1, 1, 2, 3]);

        let tensor = batch_to_tensor::<TestBackend>(&batch, &device);
        assert_eq!(tensor.dims(), [1, 3, 1, 2]);
        let values = tensor.into_data().to_vec::<f32>().unwrap();
        assert_eq!(values, vec![0.1, 0.4, 0.2, 0.5, 0.3, 0.6]);
    }

    #[test]
    fn classifier_probabilities_in_range() {
        let classifier = BurnClassifier::<TestBackend>::new(small_config(), Default::default()).unwrap();
        let a = ImageTensor::filled(TargetSize::new(24, 24), 0.0);
        let b = ImageTensor::filled(TargetSize::new(24, 24), 1.0);
        let batch = ImageBatch::stack(&[&a, &b]).unwrap();

        let probabilities = classifier.predict(&batch).unwrap();
        assert_eq!(probabilities.len(), 2);
        assert!(probabilities.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn classifier_rejects_wrong_size() {
        let classifier = BurnClassifier::<TestBackend>::new(small_config(), Default::default()).unwrap();
        let image = ImageTensor::zeros(TargetSize::new(32, 32));
        let batch = ImageBatch::stack(&[&image]).unwrap();
        assert!(matches!(
            classifier.predict(&batch),
            Err(ModelError::ShapeMismatch { .. })
        ));
    }

    fn squared_sum<const D: usize>(tensor: Tensor<TestBackend, D>) -> f32 {
        tensor.into_data().to_vec::<f32>().unwrap().iter().map(|w| w * w).sum()
    }

    #[test]
    fn l2_penalty_covers_conv_and_dense_kernels() {
        let device = Default::default();
        let model = TumorCnn::<TestBackend>::new(&small_config(), &device).unwrap();
        let conv = squared_sum(model.conv1.weight.val());
        let dense = squared_sum(model.dense.weight.val());

        assert!(conv > 0.0);
        assert_relative_eq!(model.l2_penalty(0.0).into_scalar(), 0.0);
        assert_relative_eq!(
            model.l2_penalty(0.01).into_scalar(),
            0.01 * (conv + dense),
            max_relative = 1e-4
        );
    }

    #[test]
    fn loss_adds_l2_to_cross_entropy() {
        let size = TargetSize::new(24, 24);
        let dark = ImageTensor::filled(size, 0.1);
        let bright = ImageTensor::filled(size, 0.9);
        let batch =
            ImageBatch::labeled(&[&dark, &bright], vec![Label::NoTumor, Label::Tumor]).unwrap();

        let device = Default::default();
        let model = TumorCnn::<TestBackend>::new(&small_config(), &device).unwrap();
        let plain = BurnClassifier::from_parts(model.clone(), small_config().with_l2(0.0), device);
        let regularized = BurnClassifier::from_parts(model, small_config().with_l2(0.5), device);

        let base = plain.loss(&batch).unwrap().into_scalar();
        let probabilities = plain.predict(&batch).unwrap();
        let expected = -(1.0 - probabilities[0]).ln() - probabilities[1].ln();
        assert_relative_eq!(base, expected / 2.0, max_relative = 1e-4);

        let penalty = regularized.model().l2_penalty(0.5).into_scalar();
        assert_relative_eq!(
            regularized.loss(&batch).unwrap().into_scalar(),
            base + penalty,
            max_relative = 1e-4
        );
    }

    #[test]
    fn loss_requires_labels() {
        let classifier = BurnClassifier::<TestBackend>::new(small_config(), Default::default()).unwrap();
        let image = ImageTensor::zeros(TargetSize::new(24, 24));
        let batch = ImageBatch::stack(&[&image]).unwrap();
        assert!(matches!(classifier.loss(&batch), Err(ModelError::InvalidConfig(_))));
    }
}
