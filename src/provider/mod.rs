pub mod client;
pub mod retry;

use async_trait::async_trait;

pub use client::{ImageResult, ProviderClient, ProviderError};
pub use retry::{fetch_with_retry, RetryPolicy};

/// Source of random images for a search URL.
#[async_trait]
pub trait ImageSource: Send + Sync {
    async fn fetch_random_image(&self, search_url: &str) -> Result<ImageResult, ProviderError>;
}
