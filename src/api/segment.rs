use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::api::error::ErrorKind;
use crate::api::handler_utils::{
    error_response, internal_error, into_json, map_segment_error, ApiObject,
};
use crate::api::server::AppState;

const UPLOAD_FIELD: &str = "image";

#[derive(Debug, Clone, Serialize)]
struct SegmentResponse {
    cutout: String,
    width: u32,
    height: u32,
}

pub async fn segment_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiObject<Value> {
    let upload = match read_upload(multipart).await {
        Ok(bytes) => bytes,
        Err(response) => return response,
    };
    info!(size = upload.len(), "received segment upload");

    let pipeline = state.pipeline.clone();
    let result = tokio::task::spawn_blocking(move || pipeline.cut(upload.as_ref())).await;

    match result {
        Ok(Ok(cutout)) => (
            StatusCode::OK,
            into_json(SegmentResponse {
                cutout: format!("data:image/png;base64,{}", cutout.png_base64),
                width: cutout.width,
                height: cutout.height,
            }),
        ),
        Ok(Err(error)) => map_segment_error(error),
        Err(join_error) => internal_error(format!("segmentation task failed: {join_error}")),
    }
}

async fn read_upload(mut multipart: Multipart) -> Result<Bytes, ApiObject<Value>> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(error) => {
                return Err(error_response(
                    StatusCode::BAD_REQUEST,
                    ErrorKind::Validation,
                    "invalid_multipart",
                    error.to_string(),
                ))
            }
        };
        if field.name() == Some(UPLOAD_FIELD) {
            return field.bytes().await.map_err(|error| {
                error_response(
                    StatusCode::BAD_REQUEST,
                    ErrorKind::Validation,
                    "invalid_multipart",
                    error.to_string(),
                )
            });
        }
    }
    Err(error_response(
        StatusCode::BAD_REQUEST,
        ErrorKind::Validation,
        "missing_image_field",
        format!("multipart field '{UPLOAD_FIELD}' is required"),
    ))
}
