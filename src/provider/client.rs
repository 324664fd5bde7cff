use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use super::ImageSource;

const ERROR_BODY_LOG_LIMIT: usize = 200;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("invalid response from {url}: {reason}")]
    Malformed {
        url: String,
        reason: String,
        transient: bool,
    },
    #[error("no images in response from {url}")]
    Empty { url: String },
    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: usize,
        last: Box<ProviderError>,
    },
}

fn should_retry_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

impl ProviderError {
    /// Whether another request to the same URL has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Request { source, .. } => !source.is_builder(),
            ProviderError::Status { status, .. } => should_retry_status(*status),
            ProviderError::Malformed { transient, .. } => *transient,
            ProviderError::Empty { .. } | ProviderError::Exhausted { .. } => false,
        }
    }
}

/// Metadata of one image returned by the search API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResult {
    pub source_url: String,
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,
    pub tags: Vec<String>,
}

impl ImageResult {
    /// Tag names rendered for captions: `#MAID, #SMILE`.
    pub fn tag_line(&self) -> String {
        self.tags
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(", ")
            .to_uppercase()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    images: Vec<SearchImage>,
}

#[derive(Debug, Deserialize)]
struct SearchImage {
    url: String,
    byte_size: u64,
    width: u32,
    height: u32,
    #[serde(default)]
    tags: Vec<SearchTag>,
}

#[derive(Debug, Deserialize)]
struct SearchTag {
    name: String,
}

fn truncate_for_log(value: &str, limit: usize) -> String {
    if value.chars().count() <= limit {
        return value.to_string();
    }
    let truncated: String = value.chars().take(limit).collect();
    format!("{truncated}... (truncated)")
}

pub fn parse_search_response(search_url: &str, body: &str) -> Result<ImageResult, ProviderError> {
    let malformed = |reason: String, transient: bool| ProviderError::Malformed {
        url: search_url.to_string(),
        reason,
        transient,
    };

    // A body that is not JSON at all is usually an upstream hiccup (HTML error page).
    let value: Value = serde_json::from_str(body).map_err(|err| {
        malformed(
            format!("{err}; body: {}", truncate_for_log(body, ERROR_BODY_LOG_LIMIT)),
            true,
        )
    })?;
    let response: SearchResponse =
        serde_json::from_value(value).map_err(|err| malformed(err.to_string(), false))?;

    let first = response
        .images
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::Empty {
            url: search_url.to_string(),
        })?;

    if first.url.trim().is_empty() {
        return Err(malformed("image url is empty".to_string(), false));
    }
    if first.width == 0 || first.height == 0 {
        return Err(malformed(
            format!("invalid dimensions {}x{}", first.width, first.height),
            false,
        ));
    }

    Ok(ImageResult {
        source_url: first.url,
        byte_size: first.byte_size,
        width: first.width,
        height: first.height,
        tags: first.tags.into_iter().map(|tag| tag.name).collect(),
    })
}

#[derive(Clone)]
pub struct ProviderClient {
    http: Client,
}

impl ProviderClient {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageSource for ProviderClient {
    async fn fetch_random_image(&self, search_url: &str) -> Result<ImageResult, ProviderError> {
        debug!(search_url, "Requesting random image");
        let request_error = |source: reqwest::Error| ProviderError::Request {
            url: search_url.to_string(),
            source,
        };

        let response = self
            .http
            .get(search_url)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status {
                url: search_url.to_string(),
                status,
            });
        }

        let body = response.text().await.map_err(request_error)?;
        let image = parse_search_response(search_url, &body)?;
        info!(
            url = %image.source_url,
            byte_size = image.byte_size,
            width = image.width,
            height = image.height,
            tags = %image.tag_line(),
            "Fetched image info"
        );
        Ok(image)
    }
}
