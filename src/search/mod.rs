pub mod bing;

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::warn;

pub use bing::BingImageProvider;

const PAGE_OFFSETS: [u32; 9] = [1, 35, 70, 105, 140, 175, 210, 245, 280];
const PAGES_PER_QUERY: usize = 5;
pub const DEFAULT_RESULT_COUNT: usize = 20;

// The provider never reports real dimensions; clients get a fixed
// placeholder until they fetch the image itself.
const PLACEHOLDER_WIDTH: u32 = 800;
const PLACEHOLDER_HEIGHT: u32 = 600;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("image search request failed: {0}")]
    Upstream(#[source] reqwest::Error),
    #[error("image search provider returned status {0}")]
    UpstreamStatus(u16),
    #[error("image search task failed: {0}")]
    Join(#[source] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub url: String,
    pub thumbnail: String,
    pub title: String,
    pub width: u32,
    pub height: u32,
}

// One provider page: fetch plus provider-specific URL extraction. The
// markup coupling lives behind this trait; the aggregator stays pure
// dedup/sample logic.
#[async_trait]
pub trait ImageSearchProvider: Send + Sync {
    async fn page_urls(&self, query: &str, offset: u32) -> Result<Vec<String>, SearchError>;
}

pub type SharedImageSearchProvider = Arc<dyn ImageSearchProvider>;

pub struct ImageSearchAggregator {
    provider: SharedImageSearchProvider,
}

impl ImageSearchAggregator {
    pub fn new(provider: SharedImageSearchProvider) -> Self {
        Self { provider }
    }

    // Samples random pages, pools unique URLs, returns a shuffled prefix of
    // at most `count`. A failed page is skipped; its siblings keep going.
    pub async fn search(
        &self,
        query: &str,
        count: usize,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let mut offsets = PAGE_OFFSETS.to_vec();
        offsets.shuffle(&mut rand::rng());
        offsets.truncate(PAGES_PER_QUERY);

        let mut pages = JoinSet::new();
        for offset in offsets {
            let provider = self.provider.clone();
            let query = query.to_string();
            pages.spawn(async move { (offset, provider.page_urls(query.as_str(), offset).await) });
        }

        let mut pool = HashSet::new();
        while let Some(joined) = pages.join_next().await {
            let (offset, page) = joined.map_err(SearchError::Join)?;
            match page {
                Ok(urls) => pool.extend(urls),
                Err(error) => warn!(offset, %error, "image search page failed, skipping"),
            }
        }

        let mut urls: Vec<String> = pool.into_iter().collect();
        urls.shuffle(&mut rand::rng());
        urls.truncate(count);

        Ok(urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| SearchResult {
                thumbnail: url.clone(),
                title: format!("{query} - {}", index + 1),
                width: PLACEHOLDER_WIDTH,
                height: PLACEHOLDER_HEIGHT,
                url,
            })
            .collect())
    }
}
