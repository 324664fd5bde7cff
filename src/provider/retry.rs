use std::time::Duration;

use tracing::warn;

use super::{ImageResult, ImageSource, ProviderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (0-based): `base << retry`, capped at `max_delay`.
    pub fn delay_for(&self, retry: usize) -> Duration {
        let factor = u32::try_from(retry)
            .ok()
            .and_then(|shift| 1u32.checked_shl(shift))
            .unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Fetches an image, retrying transient provider failures with exponential backoff.
///
/// Permanent failures are returned immediately. Once `max_attempts` requests have
/// failed the last error is wrapped in [`ProviderError::Exhausted`].
pub async fn fetch_with_retry(
    source: &dyn ImageSource,
    search_url: &str,
    policy: &RetryPolicy,
) -> Result<ImageResult, ProviderError> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let err = match source.fetch_random_image(search_url).await {
            Ok(image) => return Ok(image),
            Err(err) => err,
        };

        if !err.is_transient() {
            return Err(err);
        }
        if attempt >= max_attempts {
            return Err(ProviderError::Exhausted {
                attempts: attempt,
                last: Box::new(err),
            });
        }

        let delay = policy.delay_for(attempt - 1);
        warn!(
            search_url,
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Image provider request failed: {err}"
        );
        tokio::time::sleep(delay).await;
    }
}
