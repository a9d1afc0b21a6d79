//! Inference module: the image and text prediction pipelines
//!
//! This module provides:
//! - Image decoding and normalization
//! - Image and text predictors wrapping the loaded networks
//! - The prediction result shared by both pipelines
//!
//! Predictors are built once at startup and shared read-only; every buffer
//! created for a request is owned by that call and dropped when it returns.

pub mod image_pipeline;
pub mod prediction;
pub mod preprocess;
pub mod text_pipeline;

// Re-export main types for convenience
pub use image_pipeline::ImagePredictor;
pub use prediction::Prediction;
pub use preprocess::{decode_image, normalize_image, resize_image, PLANT_MEAN, PLANT_STD};
pub use text_pipeline::{load_tokenizer, EncodedText, TextPredictor};
