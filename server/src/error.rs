//! Boundary error type: maps pipeline failures and rejected requests to
//! HTTP status codes with a `{"detail": ...}` body

use axum::{
    extract::multipart::{MultipartError, MultipartRejection},
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use plantdoc::PlantDocError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

#[derive(Debug)]
pub enum ApiError {
    /// The input reached a pipeline and could not be processed (400)
    BadRequest(String),
    /// The request did not carry the required input (422)
    Unprocessable(String),
    /// The request body exceeded the upload limit (413)
    PayloadTooLarge(String),
}

impl ApiError {
    /// Wrap a pipeline failure, e.g. `processing("image", err)`
    pub fn processing(what: &str, err: PlantDocError) -> Self {
        if !err.is_input_error() {
            error!("Pipeline failure on valid {} input: {}", what, err);
        }
        ApiError::BadRequest(format!("Error processing {}: {}", what, err))
    }

    fn from_status(status: StatusCode, detail: String) -> Self {
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(detail)
        } else {
            ApiError::Unprocessable(detail)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
        }
    }

    pub fn detail(&self) -> &str {
        match self {
            ApiError::BadRequest(detail)
            | ApiError::Unprocessable(detail)
            | ApiError::PayloadTooLarge(detail) => detail,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::from_status(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        ApiError::from_status(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::from_status(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("{} {}", status.as_u16(), self.detail());

        let body = ErrorBody {
            detail: match self {
                ApiError::BadRequest(detail)
                | ApiError::Unprocessable(detail)
                | ApiError::PayloadTooLarge(detail) => detail,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processing_error_is_bad_request() {
        let err = ApiError::processing("image", PlantDocError::ImageDecode("bad magic".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.detail(), "Error processing image: Failed to decode image: bad magic");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from_status(StatusCode::PAYLOAD_TOO_LARGE, "big".into()).status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ApiError::from_status(StatusCode::BAD_REQUEST, "syntax".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
