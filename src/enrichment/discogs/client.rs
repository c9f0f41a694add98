//! Discogs HTTP client
//!
//! Handles communication with the Discogs database search endpoint.
//! See: https://www.discogs.com/developers
//!
//! IMPORTANT: Discogs requires a User-Agent header and limits authenticated
//! clients to 60 requests per rolling minute. Every request made here first
//! passes through the shared [`RateBudget`] - acquiring a slot is the only
//! suspension point on this path besides network I/O.

use std::sync::Arc;
use std::time::Duration;

use super::{adapter, dto};
use crate::enrichment::domain::{CoverArt, EnrichmentError, ReleaseCandidate, SearchQuery};
use crate::enrichment::rate_limit::RateBudget;

/// User agent string - Discogs rejects requests without one
const USER_AGENT: &str = concat!("Phonodex/", env!("CARGO_PKG_VERSION"));

/// Discogs API client
pub struct DiscogsClient {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
    budget: Arc<RateBudget>,
}

impl DiscogsClient {
    /// Create a new client.
    ///
    /// The client is configured to:
    /// - Accept gzip-compressed responses (reduces bandwidth)
    /// - Send a User-Agent header identifying the application
    /// - Fail requests after `timeout` instead of hanging (a hung request
    ///   would starve both the rate limiter and the worker pool)
    pub fn new(
        token: impl Into<String>,
        timeout: Duration,
        budget: Arc<RateBudget>,
    ) -> Result<Self, EnrichmentError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| EnrichmentError::RemoteUnavailable(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: "https://api.discogs.com/database/search".to_string(),
            token: token.into(),
            budget,
        })
    }

    /// Create a client for testing with custom base URL
    #[cfg(test)]
    pub fn with_base_url(
        token: impl Into<String>,
        base_url: impl Into<String>,
        budget: Arc<RateBudget>,
    ) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            budget,
        }
    }

    /// Look up release candidates for a track, in provider relevance order.
    ///
    /// Tries progressively looser query strings: a quoted exact search
    /// first, then an unquoted one, then artist + title when the title
    /// differs from the album. Each variant is a separate lookup and
    /// consumes its own rate-limit slot. An empty final result set is
    /// not an error.
    pub async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<ReleaseCandidate>, EnrichmentError> {
        for variant in query_variants(query) {
            let response = self.send_search_request(&variant).await?;
            let candidates = adapter::to_candidates(response);
            if !candidates.is_empty() {
                return Ok(candidates);
            }
            tracing::debug!(query = %variant, "no matches, trying broader search");
        }
        Ok(Vec::new())
    }

    /// Download cover image bytes. Counts toward the same rate budget as
    /// searches - Discogs meters all authenticated requests together.
    pub async fn fetch_cover(&self, url: &str) -> Result<CoverArt, EnrichmentError> {
        self.budget.acquire().await;

        let response = self
            .http_client
            .get(url)
            .header(reqwest::header::REFERER, "https://www.discogs.com/")
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(EnrichmentError::AuthInvalid);
        }
        if !status.is_success() {
            return Err(EnrichmentError::RemoteUnavailable(format!(
                "cover download failed: HTTP {status}"
            )));
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();

        let data = response
            .bytes()
            .await
            .map_err(classify_transport_error)?
            .to_vec();

        Ok(CoverArt {
            data,
            mime_type,
            url: url.to_string(),
        })
    }

    /// Send one search request and parse the response page
    async fn send_search_request(&self, q: &str) -> Result<dto::SearchResponse, EnrichmentError> {
        self.budget.acquire().await;

        // Built manually so the quoted-phrase syntax survives encoding intact
        let url = format!(
            "{}?q={}&type=release&per_page=50&token={}",
            self.base_url,
            urlencoding::encode(q),
            urlencoding::encode(&self.token)
        );

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(EnrichmentError::AuthInvalid);
        }

        if !status.is_success() {
            // Try to surface the API's own error message
            if let Ok(error) = response.json::<dto::ApiError>().await {
                return Err(EnrichmentError::RemoteUnavailable(error.message));
            }
            return Err(EnrichmentError::RemoteUnavailable(format!(
                "HTTP {}: {}",
                status,
                status.canonical_reason().unwrap_or("Unknown")
            )));
        }

        response
            .json::<dto::SearchResponse>()
            .await
            .map_err(|e| EnrichmentError::RemoteUnavailable(format!("malformed response: {e}")))
    }
}

/// Timeouts and connection failures both mean "remote unavailable"
fn classify_transport_error(e: reqwest::Error) -> EnrichmentError {
    if e.is_timeout() {
        EnrichmentError::RemoteUnavailable("request timed out".to_string())
    } else {
        EnrichmentError::RemoteUnavailable(e.to_string())
    }
}

/// Query strings to try, strictest first.
fn query_variants(query: &SearchQuery) -> Vec<String> {
    let mut variants = Vec::new();
    if query.album.is_empty() {
        variants.push(format!("{} {}", query.artist, query.title));
    } else {
        variants.push(format!("\"{}\" \"{}\"", query.artist, query.album));
        variants.push(format!("{} {}", query.artist, query.album));
        if !query.title.eq_ignore_ascii_case(&query.album) {
            variants.push(format!("{} {}", query.artist, query.title));
        }
    }
    variants
}
