use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::handler_utils::{internal_error, into_json, map_store_error, ApiObject};
use crate::api::server::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct SaveAssetInput {
    pub image_id: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
struct SaveAssetResponse {
    id: String,
    path: String,
}

#[derive(Debug, Clone, Serialize)]
struct DeleteAssetResponse {
    deleted: String,
}

pub async fn save_asset_handler(
    State(state): State<AppState>,
    Json(input): Json<SaveAssetInput>,
) -> ApiObject<Value> {
    let store = state.assets.clone();
    let result = tokio::task::spawn_blocking(move || {
        store
            .save(input.image_id.as_str(), input.data.as_str())
            .map(|path| (input.image_id, path))
    })
    .await;

    match result {
        Ok(Ok((id, path))) => (
            StatusCode::OK,
            into_json(SaveAssetResponse {
                id,
                path: path.to_string_lossy().into_owned(),
            }),
        ),
        Ok(Err(error)) => map_store_error(error, "Image not found"),
        Err(join_error) => internal_error(format!("asset save task failed: {join_error}")),
    }
}

pub async fn get_asset_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> Response {
    let store = state.assets.clone();
    let result = tokio::task::spawn_blocking(move || store.get(image_id.as_str())).await;

    match result {
        Ok(Ok(bytes)) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Ok(Err(error)) => map_store_error(error, "Image not found").into_response(),
        Err(join_error) => {
            internal_error(format!("asset read task failed: {join_error}")).into_response()
        }
    }
}

pub async fn delete_asset_handler(
    State(state): State<AppState>,
    Path(image_id): Path<String>,
) -> ApiObject<Value> {
    let store = state.assets.clone();
    let id = image_id.clone();
    let result = tokio::task::spawn_blocking(move || store.delete(id.as_str())).await;

    match result {
        Ok(Ok(())) => (
            StatusCode::OK,
            into_json(DeleteAssetResponse { deleted: image_id }),
        ),
        Ok(Err(error)) => map_store_error(error, "Image not found"),
        Err(join_error) => internal_error(format!("asset delete task failed: {join_error}")),
    }
}
