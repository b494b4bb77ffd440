use std::time::Duration;

use axum::body::Bytes;
use reqwest::header::{CONTENT_TYPE, REFERER, USER_AGENT};
use thiserror::Error;
use url::Url;

const PROXY_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("proxy target must be an absolute http(s) URL")]
    InvalidUrl,
    #[error("image fetch failed: {0}")]
    Fetch(#[source] reqwest::Error),
    #[error("image fetch returned status {0}")]
    UpstreamStatus(u16),
}

#[derive(Debug)]
pub struct FetchedImage {
    pub bytes: Bytes,
    pub content_type: String,
}

// Raw passthrough for externally hosted images: browser User-Agent plus a
// self-Referer for hotlink checks, redirects followed, payload never
// inspected.
pub struct ImageProxy {
    client: reqwest::Client,
}

impl ImageProxy {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .expect("http client should build");
        Self { client }
    }

    pub async fn fetch(&self, raw_url: &str) -> Result<FetchedImage, ProxyError> {
        let url = Url::parse(raw_url).map_err(|_| ProxyError::InvalidUrl)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProxyError::InvalidUrl);
        }

        let response = self
            .client
            .get(url.clone())
            .header(USER_AGENT, PROXY_USER_AGENT)
            .header(REFERER, url.as_str())
            .send()
            .await
            .map_err(ProxyError::Fetch)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProxyError::UpstreamStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = response.bytes().await.map_err(ProxyError::Fetch)?;
        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

impl Default for ImageProxy {
    fn default() -> Self {
        Self::new()
    }
}
