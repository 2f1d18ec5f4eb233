//! HTTP client creation and request handling for RSS feeds.

use anyhow::{anyhow, Result};
use reqwest::{cookie::Jar, header};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use super::types::{FEED_ACCEPT, USER_AGENT};
use crate::TARGET_WEB_REQUEST;

/// Raw feed response, before decompression and charset decoding.
#[derive(Debug)]
pub struct FetchedBody {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
}

pub fn create_http_client() -> Result<reqwest::Client> {
    let cookie_store = Jar::default();
    reqwest::Client::builder()
        .cookie_store(true)
        .cookie_provider(Arc::new(cookie_store))
        .gzip(true)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))
}

/// Issues exactly one GET for a feed. Timeouts and non-2xx statuses are errors.
pub async fn fetch_feed_body(
    client: &reqwest::Client,
    url: &str,
    request_timeout: Duration,
) -> Result<FetchedBody> {
    debug!(target: TARGET_WEB_REQUEST, "Requesting feed {}", url);

    let request = client
        .get(url)
        .header(header::USER_AGENT, USER_AGENT)
        .header(header::ACCEPT, FEED_ACCEPT)
        .send();

    let response = match timeout(request_timeout, request).await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => return Err(anyhow!("Request to {} failed: {}", url, err)),
        Err(_) => {
            return Err(anyhow!(
                "Request to {} timed out after {} seconds",
                url,
                request_timeout.as_secs()
            ))
        }
    };

    let status = response.status();
    if !status.is_success() {
        return Err(anyhow!("Non-success status {} from {}", status, url));
    }

    let header_value = |name: header::HeaderName| {
        response
            .headers()
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(|s| s.to_lowercase())
    };
    let content_type = header_value(header::CONTENT_TYPE);
    let content_encoding = header_value(header::CONTENT_ENCODING);

    debug!(target: TARGET_WEB_REQUEST, "Response Content-Type from {}: {:?}", url, content_type);

    // the body read is bounded separately from the request
    let bytes = match timeout(request_timeout, response.bytes()).await {
        Ok(Ok(bytes)) => bytes.to_vec(),
        Ok(Err(err)) => return Err(anyhow!("Failed to read response body from {}: {}", url, err)),
        Err(_) => return Err(anyhow!("Reading body from {} timed out", url)),
    };

    Ok(FetchedBody {
        bytes,
        content_type,
        content_encoding,
    })
}
