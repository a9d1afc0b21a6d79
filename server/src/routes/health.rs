//! Health check endpoint

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct ImageModelInfo {
    pub classes: usize,
    pub input_size: usize,
}

#[derive(Serialize)]
pub struct TextModelInfo {
    pub labels: usize,
    pub max_tokens: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub backend: &'static str,
    pub uptime_seconds: u64,
    pub image_model: ImageModelInfo,
    pub text_model: TextModelInfo,
}

/// GET /health - Liveness plus a summary of the loaded models
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: plantdoc::VERSION,
        backend: plantdoc::backend::backend_name(),
        uptime_seconds: state.uptime_seconds(),
        image_model: ImageModelInfo {
            classes: state.image.labels().len(),
            input_size: state.image.config().input_size,
        },
        text_model: TextModelInfo {
            labels: state.text.labels().len(),
            max_tokens: state.text.config().max_position_embeddings,
        },
    })
}
