//! Error Handling Module
//!
//! Defines the error type shared by the image and text pipelines.
//! Uses thiserror for ergonomic error definitions.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for PlantDoc operations
#[derive(Error, Debug)]
pub enum PlantDocError {
    /// Bytes could not be decoded into an image
    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    /// Text could not be turned into model input ids
    #[error("Tokenization error: {0}")]
    Tokenization(String),

    /// Failure while running a model forward pass or reading its output
    #[error("Inference error: {0}")]
    Inference(String),

    /// A model artifact could not be loaded at startup
    #[error("Failed to load model from '{path}': {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PlantDocError {
    /// Build a model load error for the given artifact path
    pub fn model_load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        PlantDocError::ModelLoad {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error was caused by the request payload rather than the service
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            PlantDocError::ImageDecode(_)
                | PlantDocError::Tokenization(_)
                | PlantDocError::InvalidInput(_)
        )
    }
}

impl From<image::ImageError> for PlantDocError {
    fn from(err: image::ImageError) -> Self {
        PlantDocError::ImageDecode(err.to_string())
    }
}

impl From<serde_json::Error> for PlantDocError {
    fn from(err: serde_json::Error) -> Self {
        PlantDocError::Serialization(err.to_string())
    }
}

/// Convenience Result type for PlantDoc operations
pub type Result<T> = std::result::Result<T, PlantDocError>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| PlantDocError::InvalidInput(format!("{}: {}", msg, e)))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| PlantDocError::InvalidInput(format!("{}: {}", f(), e)))
    }
}

impl<T> ResultExt<T> for Option<T> {
    fn context(self, msg: &str) -> Result<T> {
        self.ok_or_else(|| PlantDocError::InvalidInput(msg.to_string()))
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.ok_or_else(|| PlantDocError::InvalidInput(f()))
    }
}
