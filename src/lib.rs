//! # PlantDoc
//!
//! Plant disease classification from leaf images and free-text symptom
//! descriptions, with a treatment recommendation for every prediction.
//! Built on the Burn framework.
//!
//! ## Modules
//!
//! - `classes`: the 15 plant/disease classes, their recommendations and label spaces
//! - `model`: the CNN image classifier and the transformer text classifier
//! - `inference`: preprocessing and the image/text prediction pipelines
//! - `backend`: compile-time backend selection (CPU or CUDA)
//! - `utils`: logging and error types
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use plantdoc::backend::{default_device, InferenceBackend};
//! use plantdoc::inference::ImagePredictor;
//! use plantdoc::model::ImageModelConfig;
//!
//! let predictor = ImagePredictor::<InferenceBackend>::load(
//!     ImageModelConfig::new(),
//!     "models/plantvillage_rgb.mpk".as_ref(),
//!     default_device(),
//! )?;
//! let prediction = predictor.predict(&std::fs::read("leaf.jpg")?)?;
//! println!("{} -> {}", prediction.label(), prediction.recommendation());
//! ```

pub mod backend;
pub mod classes;
pub mod inference;
pub mod model;
pub mod utils;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

// Re-export commonly used items for convenience
pub use classes::{recommendation_for, LabelSpace, PlantClass, NO_RECOMMENDATION, UNKNOWN_CLASS_NAME};
pub use inference::{ImagePredictor, Prediction, TextPredictor};
pub use model::{ImageModelConfig, PlantCnn, TextClassifier, TextModelConfig};
pub use utils::error::{PlantDocError, Result};

/// Number of plant disease classes
pub use classes::NUM_CLASSES;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
