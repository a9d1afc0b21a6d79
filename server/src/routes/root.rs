//! Root endpoint

use axum::Json;
use serde::Serialize;

pub const WELCOME_MESSAGE: &str = "Welcome to the Multi-Modal API. POST an image to /image-prediction/ or text to /text-prediction/.";

#[derive(Serialize)]
pub struct RootResponse {
    pub message: &'static str,
}

/// GET / - Static welcome payload
pub async fn read_root() -> Json<RootResponse> {
    Json(RootResponse {
        message: WELCOME_MESSAGE,
    })
}
