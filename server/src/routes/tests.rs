use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use plantdoc::backend::default_device;
use plantdoc::test_support::{png_bytes, small_image_config, tiny_text_config, word_level_tokenizer};
use plantdoc::{
    ImagePredictor, LabelSpace, PlantCnn, PlantClass, TextClassifier, TextPredictor,
    NO_RECOMMENDATION,
};

use super::predict::{ImagePredictionResponse, TextPredictionResponse};
use super::root::WELCOME_MESSAGE;
use super::router;
use crate::state::{AppState, ServerConfig};

const BOUNDARY: &str = "plantdoc-test-boundary";
const LEAF_GREEN: [u8; 3] = [60, 140, 50];

fn test_state(max_upload_bytes: usize) -> AppState {
    let device = default_device();

    let image_config = small_image_config();
    let cnn = PlantCnn::new(&image_config, &device);
    let image =
        ImagePredictor::new(cnn, image_config, LabelSpace::plant_village(), device.clone()).unwrap();

    let text_config = tiny_text_config();
    let classifier = TextClassifier::new(&text_config, &device);
    let text = TextPredictor::new(
        classifier,
        word_level_tokenizer(),
        text_config,
        LabelSpace::plant_village(),
        device,
    )
    .unwrap();

    let config = ServerConfig {
        max_upload_bytes,
        ..ServerConfig::default()
    };
    AppState::new(config, image, text)
}

fn app() -> Router {
    router(Arc::new(test_state(10 * 1024 * 1024)))
}

fn multipart_body(field: &str, filename: &str, content: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            field, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

fn image_request(uri: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

fn text_request(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/text-prediction/")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn assert_consistent(predicted_class: &str, confidence: f32, recommendation: &str) {
    assert!((0.0..=1.0).contains(&confidence));
    let class = PlantClass::from_name(predicted_class);
    assert_eq!(recommendation, class.recommendation());
    if class.is_known() {
        assert_ne!(recommendation, NO_RECOMMENDATION);
    }
}

#[tokio::test]
async fn test_root_returns_welcome() {
    let request = Request::get("/").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], WELCOME_MESSAGE);
}

#[tokio::test]
async fn test_health() {
    let request = Request::get("/health").body(Body::empty()).unwrap();
    let (status, body) = send(app(), request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], plantdoc::VERSION);
    assert_eq!(body["image_model"]["classes"], 15);
    assert_eq!(body["image_model"]["input_size"], 32);
    assert_eq!(body["text_model"]["max_tokens"], 16);
}

#[tokio::test]
async fn test_image_prediction() {
    let body = multipart_body("file", "leaf.png", &png_bytes(48, 40, LEAF_GREEN));
    let (status, json) = send(app(), image_request("/image-prediction/", body)).await;

    assert_eq!(status, StatusCode::OK);
    let response: ImagePredictionResponse = serde_json::from_value(json).unwrap();
    assert_eq!(response.filename, "leaf.png");
    assert_consistent(
        &response.predicted_class,
        response.confidence,
        &response.recommendation,
    );
}

#[tokio::test]
async fn test_image_prediction_is_repeatable() {
    let app = app();
    let upload = png_bytes(32, 32, LEAF_GREEN);

    let (_, first) = send(
        app.clone(),
        image_request("/image-prediction/", multipart_body("file", "a.png", &upload)),
    )
    .await;
    let (_, second) = send(
        app,
        image_request("/image-prediction", multipart_body("file", "a.png", &upload)),
    )
    .await;

    assert_eq!(first["predicted_class"], second["predicted_class"]);
    assert_eq!(first["confidence"], second["confidence"]);
}

#[tokio::test]
async fn test_image_prediction_rejects_garbage() {
    let body = multipart_body("file", "notes.txt", b"definitely not an image");
    let (status, json) = send(app(), image_request("/image-prediction/", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let detail = json["detail"].as_str().unwrap();
    assert!(detail.starts_with("Error processing image"), "{}", detail);
}

#[tokio::test]
async fn test_image_prediction_rejects_truncated_png() {
    let png = png_bytes(32, 32, LEAF_GREEN);
    let body = multipart_body("file", "cut.png", &png[..png.len() / 2]);
    let (status, json) = send(app(), image_request("/image-prediction/", body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["detail"].as_str().unwrap().starts_with("Error processing image"));
}

#[tokio::test]
async fn test_image_prediction_rejects_empty_upload() {
    let body = multipart_body("file", "empty.png", b"");
    let (status, _) = send(app(), image_request("/image-prediction/", body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_prediction_requires_file_field() {
    let body = multipart_body("upload", "leaf.png", &png_bytes(32, 32, LEAF_GREEN));
    let (status, json) = send(app(), image_request("/image-prediction/", body)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].as_str().unwrap().contains("file"));
}

#[tokio::test]
async fn test_image_prediction_rejects_oversized_upload() {
    let app = router(Arc::new(test_state(1024)));
    let body = multipart_body("file", "big.png", &vec![0u8; 8 * 1024]);
    let (status, _) = send(app, image_request("/image-prediction/", body)).await;

    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_text_prediction() {
    let (status, json) = send(app(), text_request(r#"{"text": "leaves are healthy"}"#)).await;

    assert_eq!(status, StatusCode::OK);
    let response: TextPredictionResponse = serde_json::from_value(json).unwrap();
    assert_eq!(response.input_text, "leaves are healthy");
    assert_consistent(
        &response.predicted_class,
        response.confidence,
        &response.recommendation,
    );
}

#[tokio::test]
async fn test_text_prediction_accepts_empty_text() {
    let (status, json) = send(app(), text_request(r#"{"text": ""}"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["input_text"], "");
    assert!(json["predicted_class"].is_string());
}

#[tokio::test]
async fn test_text_prediction_truncates_long_input() {
    let text = "yellow spots on tomato ".repeat(50);
    let body = json!({ "text": text }).to_string();
    let (status, json) = send(app(), text_request(&body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["input_text"], text.as_str());
}

#[tokio::test]
async fn test_text_prediction_requires_text() {
    let (status, json) = send(app(), text_request(r#"{"message": "hi"}"#)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(json["detail"].is_string());

    let (status, _) = send(app(), text_request("{not json")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_cors_preflight() {
    let preflight = |origin: &str| {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/text-prediction/")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    };

    let allowed = app().oneshot(preflight("http://localhost:3000")).await.unwrap();
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
    assert_eq!(
        allowed.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS],
        "true"
    );

    let denied = app().oneshot(preflight("http://evil.test")).await.unwrap();
    assert!(denied
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
