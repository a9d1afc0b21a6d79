//! Prediction endpoints - image upload and free-text classification

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use plantdoc::utils::format_millis;
use plantdoc::{PlantDocError, Prediction};

use crate::error::ApiError;
use crate::state::SharedState;

/// Multipart field carrying the uploaded image
pub const FILE_FIELD: &str = "file";

/// Request body for text prediction
#[derive(Debug, Deserialize)]
pub struct TextItem {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ImagePredictionResponse {
    pub filename: String,
    pub predicted_class: String,
    pub confidence: f32,
    pub recommendation: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TextPredictionResponse {
    pub input_text: String,
    pub predicted_class: String,
    pub confidence: f32,
    pub recommendation: String,
}

/// Run a prediction off the async runtime
///
/// A panic inside the model is reported as an inference error so one bad
/// request cannot take the server down.
async fn run_blocking<F>(job: F) -> Result<Prediction, PlantDocError>
where
    F: FnOnce() -> Result<Prediction, PlantDocError> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(PlantDocError::Inference(
            "model panicked while processing the input".to_string(),
        )),
        Err(e) => Err(PlantDocError::Inference(e.to_string())),
    }
}

/// POST /image-prediction/ - Predict disease from an uploaded image file
pub async fn predict_image(
    State(state): State<SharedState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImagePredictionResponse>, ApiError> {
    let mut multipart = multipart?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(FILE_FIELD) {
            let filename = field.file_name().unwrap_or_default().to_string();
            let bytes = field.bytes().await?;
            upload = Some((filename, bytes));
            break;
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| {
        ApiError::Unprocessable(format!("Missing required form field '{}'", FILE_FIELD))
    })?;

    let worker = state.clone();
    let prediction = run_blocking(move || worker.image.predict(&bytes))
        .await
        .map_err(|e| ApiError::processing("image", e))?;

    info!(
        "Image '{}' -> {} ({:.4}) in {}",
        filename,
        prediction.label(),
        prediction.confidence,
        format_millis(prediction.inference_time)
    );

    Ok(Json(ImagePredictionResponse {
        filename,
        predicted_class: prediction.label().to_string(),
        confidence: prediction.confidence,
        recommendation: prediction.recommendation().to_string(),
    }))
}

/// POST /text-prediction/ - Predict the class of a given text
pub async fn predict_text(
    State(state): State<SharedState>,
    payload: Result<Json<TextItem>, JsonRejection>,
) -> Result<Json<TextPredictionResponse>, ApiError> {
    let Json(item) = payload?;

    let worker = state.clone();
    let text = item.text.clone();
    let prediction = run_blocking(move || worker.text.predict(&text))
        .await
        .map_err(|e| ApiError::processing("text", e))?;

    info!(
        "Text ({} chars) -> {} ({:.4}) in {}",
        item.text.chars().count(),
        prediction.label(),
        prediction.confidence,
        format_millis(prediction.inference_time)
    );

    Ok(Json(TextPredictionResponse {
        input_text: item.text,
        predicted_class: prediction.label().to_string(),
        confidence: prediction.confidence,
        recommendation: prediction.recommendation().to_string(),
    }))
}
