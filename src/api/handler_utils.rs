use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use crate::api::error::ErrorKind;
use crate::segment::SegmentError;
use crate::storage::AssetStoreError;

pub type ApiObject<T> = (StatusCode, Json<T>);

#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    ok: bool,
    error: String,
    error_kind: ErrorKind,
    error_code: String,
}

pub fn error_response(
    status: StatusCode,
    kind: ErrorKind,
    code: impl Into<String>,
    message: impl Into<String>,
) -> ApiObject<Value> {
    (
        status,
        into_json(ErrorResponse {
            ok: false,
            error: message.into(),
            error_kind: kind,
            error_code: code.into(),
        }),
    )
}

pub fn internal_error(message: impl Into<String>) -> ApiObject<Value> {
    let detail = message.into();
    error!(detail = %detail, "internal api error");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Infra,
        "internal_error",
        "Internal server error",
    )
}

pub fn map_segment_error(error: SegmentError) -> ApiObject<Value> {
    match error {
        error @ SegmentError::InsufficientStorage { .. } => error_response(
            StatusCode::INSUFFICIENT_STORAGE,
            ErrorKind::Storage,
            "insufficient_storage",
            error.to_string(),
        ),
        error @ (SegmentError::EmptyUpload | SegmentError::Decode(_)) => error_response(
            StatusCode::BAD_REQUEST,
            ErrorKind::Validation,
            "invalid_image",
            error.to_string(),
        ),
        error @ SegmentError::Removal(_) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Segmentation,
            "segmentation_failed",
            error.to_string(),
        ),
        SegmentError::Encode(source) => internal_error(format!("cutout encode failed: {source}")),
    }
}

pub fn map_store_error(error: AssetStoreError, not_found_message: &str) -> ApiObject<Value> {
    match error {
        AssetStoreError::NotFound => error_response(
            StatusCode::NOT_FOUND,
            ErrorKind::Validation,
            "not_found",
            not_found_message,
        ),
        error @ AssetStoreError::InvalidId => error_response(
            StatusCode::BAD_REQUEST,
            ErrorKind::Validation,
            "invalid_image_id",
            error.to_string(),
        ),
        // The save contract reports decode failures as 500; the taxonomy
        // fields still name the cause.
        error @ (AssetStoreError::MalformedDataUri | AssetStoreError::InvalidBase64(_)) => {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorKind::Validation,
                "invalid_base64",
                error.to_string(),
            )
        }
        AssetStoreError::Io(source) => internal_error(format!("asset store io error: {source}")),
    }
}

pub fn into_json(payload: impl Serialize) -> Json<Value> {
    Json(serde_json::to_value(payload).expect("api payload should serialize"))
}
