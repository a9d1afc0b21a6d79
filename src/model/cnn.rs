//! CNN Model Architecture for Plant Disease Classification
//!
//! Three convolutional blocks followed by a flattening classifier head.
//! Channel depth doubles at each block (3 -> 16 -> 32 -> 64) while each max
//! pool halves the spatial resolution, so a 224x224 input reaches the head as
//! a 64x28x28 feature map.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d, Relu,
    },
    tensor::{backend::Backend, Tensor},
};

// The crate's one-parameter `Result` alias must stay out of scope here:
// `#[derive(Config)]` expands to serde code that names `Result<T, E>`.
use crate::utils::error::{self, PlantDocError};

/// Number of max-pool stages between the input and the classifier head
const DOWNSAMPLE_STAGES: u32 = 3;

/// Configuration for the PlantCnn model
#[derive(Config, Debug)]
pub struct ImageModelConfig {
    /// Number of output classes
    #[config(default = "15")]
    pub num_classes: usize,

    /// Input image size (assumes square images)
    #[config(default = "224")]
    pub input_size: usize,

    /// Dropout rate for regularization (training only)
    #[config(default = "0.5")]
    pub dropout_rate: f64,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Filters in the first block, doubled in each following block
    #[config(default = "16")]
    pub base_filters: usize,

    /// Units in the hidden dense layer
    #[config(default = "512")]
    pub hidden_units: usize,
}

impl ImageModelConfig {
    /// Side length of the feature map entering the classifier head
    pub fn feature_map_size(&self) -> usize {
        self.input_size >> DOWNSAMPLE_STAGES
    }

    /// Number of flattened features entering the classifier head
    pub fn flattened_features(&self) -> usize {
        let side = self.feature_map_size();
        self.base_filters * 4 * side * side
    }

    /// Validate the configuration
    pub fn validate(&self) -> error::Result<()> {
        if self.num_classes == 0 {
            return Err(PlantDocError::Config(
                "num_classes must be greater than 0".to_string(),
            ));
        }
        if self.feature_map_size() == 0 {
            return Err(PlantDocError::Config(format!(
                "input_size must be at least {}, got {}",
                1 << DOWNSAMPLE_STAGES,
                self.input_size
            )));
        }
        if !(0.0..1.0).contains(&self.dropout_rate) {
            return Err(PlantDocError::Config(format!(
                "dropout_rate must be in [0, 1), got {}",
                self.dropout_rate
            )));
        }
        Ok(())
    }
}

/// Conv2d (3x3, stride 1, padding 1) -> ReLU -> MaxPool (2x2, stride 2)
#[derive(Module, Debug)]
pub struct ConvBlock<B: Backend> {
    pub conv: Conv2d<B>,
    pub relu: Relu,
    pub pool: MaxPool2d,
}

impl<B: Backend> ConvBlock<B> {
    /// Create a new convolutional block
    pub fn new(in_channels: usize, out_channels: usize, device: &B::Device) -> Self {
        let conv = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_stride([1, 1])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        let pool = MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init();

        Self {
            conv,
            relu: Relu::new(),
            pool,
        }
    }

    /// Forward pass through the block
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv.forward(x);
        let x = self.relu.forward(x);
        self.pool.forward(x)
    }
}

/// Plant disease image classifier
///
/// Architecture:
/// - 3 convolutional blocks (conv -> ReLU -> max pool)
/// - Flatten
/// - Dense (-> 512) -> ReLU -> Dropout -> Dense (-> num_classes)
#[derive(Module, Debug)]
pub struct PlantCnn<B: Backend> {
    // Feature extractor
    pub block1: ConvBlock<B>,
    pub block2: ConvBlock<B>,
    pub block3: ConvBlock<B>,

    // Classifier head
    pub fc1: Linear<B>,
    pub relu: Relu,
    pub dropout: Dropout,
    pub fc2: Linear<B>,

    num_classes: usize,
}

impl<B: Backend> PlantCnn<B> {
    /// Create a new, randomly initialised PlantCnn from configuration
    pub fn new(config: &ImageModelConfig, device: &B::Device) -> Self {
        let base = config.base_filters;

        let block1 = ConvBlock::new(config.in_channels, base, device); // 224 -> 112
        let block2 = ConvBlock::new(base, base * 2, device); // 112 -> 56
        let block3 = ConvBlock::new(base * 2, base * 4, device); // 56 -> 28

        let fc1 = LinearConfig::new(config.flattened_features(), config.hidden_units).init(device);
        let dropout = DropoutConfig::new(config.dropout_rate).init();
        let fc2 = LinearConfig::new(config.hidden_units, config.num_classes).init(device);

        Self {
            block1,
            block2,
            block3,
            fc1,
            relu: Relu::new(),
            dropout,
            fc2,
            num_classes: config.num_classes,
        }
    }

    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, height, width]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.block1.forward(x);
        let x = self.block2.forward(x);
        let x = self.block3.forward(x);

        // Flatten: [B, C, H, W] -> [B, C * H * W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Forward pass with softmax for inference
    pub fn forward_softmax(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let logits = self.forward(x);
        burn::tensor::activation::softmax(logits, 1)
    }

    /// Get the number of output classes
    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}
