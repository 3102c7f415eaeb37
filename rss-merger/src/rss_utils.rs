//! RSS-specific utility functions for the merger

/// URL utilities for feed sources
pub mod url {
    use crate::types::FetchError;
    use url::Url;

    /// Extract domain from URL
    pub fn extract_domain(url_str: &str) -> Option<String> {
        Url::parse(url_str)
            .ok()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
    }

    /// Parse an absolute http(s) URL with a host, the only kind a source may use
    pub fn parse_feed_url(url_str: &str) -> Result<Url, FetchError> {
        let url = Url::parse(url_str)
            .map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url_str, e)))?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(FetchError::InvalidUrl(format!(
                "{}: unsupported scheme '{}'",
                url_str,
                url.scheme()
            )));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(FetchError::InvalidUrl(format!("{}: missing host", url_str)));
        }

        Ok(url)
    }
}
