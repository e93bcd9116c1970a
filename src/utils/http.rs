// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::ScraperConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &ScraperConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Fetch a page body as text. Non-2xx statuses are errors carrying the URL.
///
/// Parsing is left to the caller; `scraper::Html` is not `Send` and must
/// not be held across an await.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| AppError::fetch(url, e))?;
    let text = response.text().await.map_err(|e| AppError::fetch(url, e))?;
    Ok(text)
}
