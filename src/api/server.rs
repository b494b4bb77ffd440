use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::proxy::ImageProxy;
use crate::search::{BingImageProvider, ImageSearchAggregator};
use crate::segment::{CutoutPipeline, RemoteSegmenter};
use crate::storage::disk::{DiskGuard, TempVolumeProbe};
use crate::storage::AssetStore;

const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub service_name: &'static str,
    pub service_version: &'static str,
    pub started_unix_ms: u128,
    pub assets: Arc<AssetStore>,
    pub search: Arc<ImageSearchAggregator>,
    pub proxy: Arc<ImageProxy>,
    pub pipeline: Arc<CutoutPipeline>,
    pub disk_guard: DiskGuard,
}

impl AppState {
    pub fn new(
        assets: Arc<AssetStore>,
        search: Arc<ImageSearchAggregator>,
        proxy: Arc<ImageProxy>,
        pipeline: Arc<CutoutPipeline>,
        disk_guard: DiskGuard,
    ) -> Self {
        Self {
            service_name: "cutout-backend-core",
            service_version: env!("CARGO_PKG_VERSION"),
            started_unix_ms: now_unix_ms(),
            assets,
            search,
            proxy,
            pipeline,
            disk_guard,
        }
    }
}

pub fn build_router() -> Router {
    let assets_dir = std::env::var("CUTOUT_ASSETS_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| crate::default_assets_dir());
    let assets = Arc::new(AssetStore::new(assets_dir));
    assets
        .initialize()
        .expect("asset store root should be creatable");

    let disk_guard = DiskGuard::new(Arc::new(TempVolumeProbe));
    let search = Arc::new(ImageSearchAggregator::new(Arc::new(
        BingImageProvider::new(),
    )));
    let proxy = Arc::new(ImageProxy::new());
    let pipeline = Arc::new(CutoutPipeline::new(
        Arc::new(RemoteSegmenter::from_env()),
        disk_guard.clone(),
    ));

    build_router_with_state(AppState::new(assets, search, proxy, pipeline, disk_guard))
}

pub fn build_router_with_state(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/search", get(crate::api::search::search_handler))
        .route("/proxy-image", get(crate::api::search::proxy_image_handler))
        .route("/segment", post(crate::api::segment::segment_handler))
        .route("/assets/save", post(crate::api::assets::save_asset_handler))
        .route(
            "/assets/{image_id}",
            get(crate::api::assets::get_asset_handler)
                .delete(crate::api::assets::delete_asset_handler),
        )
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let app = build_router();
    info!(bind = %addr, "starting cutout-backend-core HTTP surface");
    axum::serve(listener, app).await
}

async fn health_handler(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let disk = state.disk_guard.check();
    (
        StatusCode::OK,
        Json(json!({
            "status": if disk.sufficient { "ok" } else { "warning" },
            "disk_space_mb": disk.free_mb,
            "disk_space_ok": disk.sufficient,
            "min_required_mb": state.disk_guard.min_required_mb(),
            "service": state.service_name,
            "version": state.service_version,
            "started_unix_ms": state.started_unix_ms,
        })),
    )
}

fn now_unix_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_millis())
}
