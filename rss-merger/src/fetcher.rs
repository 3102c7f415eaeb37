use crate::rss_utils::url::{extract_domain, parse_feed_url};
use crate::types::{FetchConfig, FetchError, FetchedBody, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Issues exactly one GET per call. Retrying is left to the caller.
pub struct Fetcher {
    client: Client,
    config: FetchConfig,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    pub async fn fetch(&self, url: &str, timeout: Duration) -> std::result::Result<FetchedBody, FetchError> {
        let parsed = parse_feed_url(url)?;
        let start_time = Instant::now();

        debug!(
            "Fetching feed: {} (host: {})",
            url,
            extract_domain(url).unwrap_or_default()
        );

        let result = tokio::time::timeout(timeout, self.get(parsed, timeout)).await;
        let body = match result {
            Ok(inner) => inner,
            Err(_) => Err(FetchError::Timeout(timeout)),
        };

        match &body {
            Ok(body) => debug!(
                "Fetched {} ({} bytes in {}ms)",
                url,
                body.bytes.len(),
                start_time.elapsed().as_millis()
            ),
            Err(e) => warn!("Fetch failed for {}: {}", url, e),
        }

        body
    }

    async fn get(&self, url: url::Url, timeout: Duration) -> std::result::Result<FetchedBody, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        if let Some(content_length) = response.content_length() {
            let size_mb = content_length as usize / (1024 * 1024);
            if size_mb > self.config.max_feed_size_mb {
                return Err(FetchError::Network(format!("feed too large: {}MB", size_mb)));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let bytes = response.bytes().await.map_err(|e| classify(e, timeout))?;

        Ok(FetchedBody {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Network(error.to_string())
    }
}
