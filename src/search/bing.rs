use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::header::USER_AGENT;

use super::{ImageSearchProvider, SearchError};

const SEARCH_ENDPOINT: &str = "https://www.bing.com/images/search";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const PAGE_TIMEOUT: Duration = Duration::from_secs(10);

// Media URLs sit in entity-escaped JSON islands inside the result markup.
fn media_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"murl&quot;:&quot;(https?://[^&]+?)&quot;")
            .expect("media URL pattern should compile")
    })
}

pub struct BingImageProvider {
    client: reqwest::Client,
}

impl BingImageProvider {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(PAGE_TIMEOUT)
            .build()
            .expect("http client should build");
        Self { client }
    }
}

impl Default for BingImageProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ImageSearchProvider for BingImageProvider {
    async fn page_urls(&self, query: &str, offset: u32) -> Result<Vec<String>, SearchError> {
        let response = self
            .client
            .get(SEARCH_ENDPOINT)
            .query(&[
                ("q", query),
                ("form", "HDRSC2"),
                ("first", offset.to_string().as_str()),
            ])
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(SearchError::Upstream)?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::UpstreamStatus(status.as_u16()));
        }
        let body = response.text().await.map_err(SearchError::Upstream)?;
        Ok(extract_media_urls(body.as_str()))
    }
}

pub(crate) fn extract_media_urls(body: &str) -> Vec<String> {
    media_url_pattern()
        .captures_iter(body)
        .map(|capture| capture[1].replace("\\u0026", "&"))
        .collect()
}
