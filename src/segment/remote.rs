use std::io::Cursor;
use std::time::Duration;

use image::{DynamicImage, ImageFormat};
use reqwest::blocking::{multipart, Client};

use super::{SegmentError, Segmenter};

const DEFAULT_ENDPOINT: &str = "https://api.remove.bg/v1.0/removebg";
const DEFAULT_API_KEY_ENV: &str = "REMOVE_BG_API_KEY";
const AUTH_HEADER: &str = "X-Api-Key";
const REMOVAL_TIMEOUT: Duration = Duration::from_secs(120);

// Remove.bg-style HTTP backend: posts the frame as multipart `image_file`
// and expects an alpha PNG back. Blocking client; the pipeline already runs
// on the blocking pool.
pub struct RemoteSegmenter {
    endpoint: String,
    api_key_env: String,
}

impl RemoteSegmenter {
    pub fn new(endpoint: impl Into<String>, api_key_env: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key_env: api_key_env.into(),
        }
    }

    pub fn from_env() -> Self {
        let endpoint = std::env::var("CUTOUT_SEGMENT_ENDPOINT")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_ENDPOINT));
        let api_key_env = std::env::var("CUTOUT_SEGMENT_API_KEY_ENV")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| String::from(DEFAULT_API_KEY_ENV));
        Self::new(endpoint, api_key_env)
    }
}

impl Segmenter for RemoteSegmenter {
    fn remove(&self, image: DynamicImage) -> Result<DynamicImage, SegmentError> {
        let api_key = std::env::var(self.api_key_env.as_str())
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| {
                SegmentError::Removal(format!(
                    "missing {} for background removal",
                    self.api_key_env
                ))
            })?;

        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(SegmentError::Encode)?;
        let part = multipart::Part::bytes(png)
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| SegmentError::Removal(format!("invalid mime: {e}")))?;
        let form = multipart::Form::new()
            .part("image_file", part)
            .text("size", "auto")
            .text("format", "png");

        let client = Client::builder()
            .timeout(REMOVAL_TIMEOUT)
            .build()
            .map_err(|e| SegmentError::Removal(format!("http client init failed: {e}")))?;
        let response = client
            .post(self.endpoint.as_str())
            .header(AUTH_HEADER, api_key)
            .multipart(form)
            .send()
            .map_err(|e| SegmentError::Removal(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(SegmentError::Removal(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body
            )));
        }
        let bytes = response
            .bytes()
            .map_err(|e| SegmentError::Removal(format!("HTTP body read failed: {e}")))?;
        image::load_from_memory(bytes.as_ref()).map_err(|e| {
            SegmentError::Removal(format!("removal backend returned undecodable image: {e}"))
        })
    }
}
