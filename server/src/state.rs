//! Application state for the PlantDoc server
//!
//! Holds the loaded predictors. Everything here is built once before the
//! server binds and is read-only afterwards.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use plantdoc::backend::{default_device, InferenceBackend};
use plantdoc::model::TextModelFiles;
use plantdoc::{ImageModelConfig, ImagePredictor, LabelSpace, TextPredictor};

/// Server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Image classifier weights (Burn record)
    pub image_model_path: PathBuf,
    /// Directory holding the text model config, weights and tokenizer
    pub text_model_dir: PathBuf,
    /// Explicit label file for the text model
    pub text_labels: Option<PathBuf>,
    /// Origins allowed to call the API from a browser
    pub cors_origins: Vec<String>,
    /// Largest accepted request body in bytes
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_models_dir(PathBuf::from("models"))
    }
}

impl ServerConfig {
    /// Default layout rooted at a models directory
    pub fn with_models_dir(models_dir: PathBuf) -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            image_model_path: models_dir.join("plantvillage_rgb.mpk"),
            text_model_dir: models_dir.join("text-model"),
            text_labels: None,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "localhost:3000".to_string(),
            ],
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

/// Shared application state
pub struct AppState {
    /// Server configuration
    pub config: ServerConfig,
    /// Plant disease image classifier
    pub image: ImagePredictor<InferenceBackend>,
    /// Symptom text classifier
    pub text: TextPredictor<InferenceBackend>,
    /// Server start time
    pub started_at: Instant,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        image: ImagePredictor<InferenceBackend>,
        text: TextPredictor<InferenceBackend>,
    ) -> Self {
        Self {
            config,
            image,
            text,
            started_at: Instant::now(),
        }
    }

    /// Load both models; any failure here must stop the server from starting
    pub fn load(config: ServerConfig) -> anyhow::Result<Self> {
        let device = default_device();

        let image = ImagePredictor::load(
            ImageModelConfig::new(),
            &config.image_model_path,
            device.clone(),
        )
        .context("Failed to load image model")?;

        let labels = resolve_text_labels(&config).context("Failed to load text labels")?;
        let text = TextPredictor::load(&config.text_model_dir, labels, device)
            .context("Failed to load text model")?;

        Ok(Self::new(config, image, text))
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Pick the text model's label space
///
/// Order: explicit `--text-labels` file, `labels.json` in the model directory,
/// `id2label` inside the model's `config.json`, and finally the image label
/// set with a warning.
pub fn resolve_text_labels(config: &ServerConfig) -> plantdoc::Result<LabelSpace> {
    if let Some(path) = &config.text_labels {
        info!("Text labels from {:?}", path);
        return LabelSpace::from_json_file(path);
    }

    let files = TextModelFiles::in_dir(&config.text_model_dir);
    if files.labels.exists() {
        info!("Text labels from {:?}", files.labels);
        return LabelSpace::from_json_file(&files.labels);
    }

    if files.config.exists() {
        let value: Value = serde_json::from_str(&fs::read_to_string(&files.config)?)?;
        if value.get("id2label").is_some() {
            info!("Text labels from id2label in {:?}", files.config);
            return LabelSpace::from_json(&value);
        }
    }

    warn!(
        "No label file for the text model in {:?}; assuming it shares the image model's classes",
        config.text_model_dir
    );
    Ok(LabelSpace::plant_village())
}

pub type SharedState = Arc<AppState>;
