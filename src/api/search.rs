use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::api::error::ErrorKind;
use crate::api::handler_utils::{error_response, into_json, ApiObject};
use crate::api::server::AppState;
use crate::proxy::ProxyError;
use crate::search::{SearchResult, DEFAULT_RESULT_COUNT};

#[derive(Debug, Clone, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default)]
    pub count: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
struct SearchResponse {
    results: Vec<SearchResult>,
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiObject<Value> {
    let count = query.count.unwrap_or(DEFAULT_RESULT_COUNT);
    match state.search.search(query.q.as_str(), count).await {
        Ok(results) => {
            info!(query = %query.q, count = results.len(), "image search completed");
            (StatusCode::OK, into_json(SearchResponse { results }))
        }
        Err(error) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Upstream,
            "search_failed",
            error.to_string(),
        ),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProxyQuery {
    pub url: String,
}

pub async fn proxy_image_handler(
    State(state): State<AppState>,
    Query(query): Query<ProxyQuery>,
) -> Response {
    match state.proxy.fetch(query.url.as_str()).await {
        Ok(fetched) => {
            ([(header::CONTENT_TYPE, fetched.content_type)], fetched.bytes).into_response()
        }
        Err(error @ ProxyError::InvalidUrl) => error_response(
            StatusCode::BAD_REQUEST,
            ErrorKind::Validation,
            "invalid_url",
            error.to_string(),
        )
        .into_response(),
        Err(error) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Upstream,
            "fetch_failed",
            error.to_string(),
        )
        .into_response(),
    }
}
