//! Model module for the classifiers served by PlantDoc, built with Burn
//!
//! This module provides:
//! - `cnn`: the three-block convolutional plant disease image classifier
//! - `text`: the BERT-style sequence classifier for free-text symptom reports
//! - `record`: loading and saving trained weights, including PyTorch checkpoint import

pub mod cnn;
pub mod record;
pub mod text;

// Re-export main types for convenience
pub use cnn::{ImageModelConfig, PlantCnn};
pub use record::{
    load_image_model, load_text_model, save_image_model, save_text_model, TextModelFiles,
    WeightsFile,
};
pub use text::{TextBatch, TextClassifier, TextModelConfig};
