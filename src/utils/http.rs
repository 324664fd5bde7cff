use std::time::Duration;

use reqwest::Client;

const USER_AGENT: &str = concat!("anime_image_bot/", env!("CARGO_PKG_VERSION"));

/// Shared client for the image API and image downloads.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT)
        .build()
}
