pub mod api;
pub mod proxy;
pub mod search;
pub mod segment;
pub mod storage;

use std::path::PathBuf;

pub fn default_assets_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets")
}
