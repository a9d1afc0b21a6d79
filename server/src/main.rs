//! PlantDoc Server
//!
//! HTTP API serving plant disease predictions from leaf images and from
//! free-text symptom descriptions, each with a treatment recommendation.

mod error;
mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use plantdoc::utils::logging::{init_logging, LogConfig, LogLevel};

use crate::state::{AppState, ServerConfig};

/// PlantDoc Server
#[derive(Parser, Debug)]
#[command(name = "plantdoc-server")]
#[command(version)]
#[command(about = "Plant disease and text classification API with recommendations")]
struct Cli {
    /// Port to listen on
    #[arg(short, long, env = "PLANTDOC_PORT", default_value = "8000")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "PLANTDOC_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Models directory (expects plantvillage_rgb.mpk and text-model/)
    #[arg(long, env = "PLANTDOC_MODELS_DIR")]
    models_dir: Option<PathBuf>,

    /// Image classifier weights (.mpk, or .pth with the `import` feature),
    /// overrides the models directory layout
    #[arg(long, env = "PLANTDOC_IMAGE_MODEL")]
    image_model: Option<PathBuf>,

    /// Text model directory, overrides the models directory layout
    #[arg(long, env = "PLANTDOC_TEXT_MODEL_DIR")]
    text_model_dir: Option<PathBuf>,

    /// JSON label file for the text model (array of names or id2label map)
    #[arg(long, env = "PLANTDOC_TEXT_LABELS")]
    text_labels: Option<PathBuf>,

    /// Allowed CORS origins (comma separated)
    #[arg(long, env = "PLANTDOC_CORS_ORIGINS", value_delimiter = ',')]
    cors_origins: Option<Vec<String>>,

    /// Largest accepted request body in bytes
    #[arg(long, env = "PLANTDOC_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides it
    #[arg(long, env = "PLANTDOC_LOG_LEVEL", default_value = "info")]
    log_level: LogLevel,

    /// Log every HTTP request and response
    #[arg(long, env = "PLANTDOC_TRACE_REQUESTS")]
    trace_requests: bool,
}

impl Cli {
    fn into_config(self) -> ServerConfig {
        let mut config = match self.models_dir {
            Some(dir) => ServerConfig::with_models_dir(dir),
            None => ServerConfig::default(),
        };

        config.host = self.host;
        config.port = self.port;

        if let Some(image_model) = self.image_model {
            config.image_model_path = image_model;
        }
        if let Some(text_model_dir) = self.text_model_dir {
            config.text_model_dir = text_model_dir;
        }
        if self.text_labels.is_some() {
            config.text_labels = self.text_labels;
        }
        if let Some(origins) = self.cors_origins {
            config.cors_origins = origins;
        }
        if let Some(max_upload_bytes) = self.max_upload_bytes {
            config.max_upload_bytes = max_upload_bytes;
        }

        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    let log_config = LogConfig {
        request_traces: cli.trace_requests,
        ..LogConfig::with_level(cli.log_level)
    };
    init_logging(&log_config).map_err(anyhow::Error::msg)?;

    let config = cli.into_config();

    info!("PlantDoc Server v{}", plantdoc::VERSION);
    info!("Configuration:");
    info!("  Backend:      {}", plantdoc::backend::backend_name());
    info!("  Image model:  {:?}", config.image_model_path);
    info!("  Text model:   {:?}", config.text_model_dir);
    info!("  CORS origins: {:?}", config.cors_origins);

    // Models are loaded before binding; a missing or corrupt artifact is fatal
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let state = Arc::new(AppState::load(config)?);

    let app = routes::router(state);

    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let config = Cli::parse_from(["plantdoc-server"]).into_config();
        assert_eq!(config.port, 8000);
        assert_eq!(config.image_model_path, PathBuf::from("models/plantvillage_rgb.mpk"));
    }

    #[test]
    fn test_cli_rejects_unknown_log_level() {
        assert!(Cli::try_parse_from(["plantdoc-server", "--log-level", "loud"]).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let config = Cli::parse_from([
            "plantdoc-server",
            "--models-dir",
            "/srv/models",
            "--text-model-dir",
            "/srv/bert",
            "--cors-origins",
            "http://a.test,http://b.test",
            "-p",
            "9000",
        ])
        .into_config();

        assert_eq!(config.port, 9000);
        assert_eq!(config.image_model_path, PathBuf::from("/srv/models/plantvillage_rgb.mpk"));
        assert_eq!(config.text_model_dir, PathBuf::from("/srv/bert"));
        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
    }
}
