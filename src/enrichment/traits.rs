//! Trait definition for the remote metadata source.
//!
//! The orchestrator is generic over [`MetadataSource`] so tests can
//! substitute deterministic mock implementations for the real Discogs
//! client - no network, no rate limiter, full control over failures.

use async_trait::async_trait;

use super::discogs::DiscogsClient;
use super::domain::{CoverArt, EnrichmentError, ReleaseCandidate, SearchQuery};

/// A remote catalog that can look up release candidates for a track and
/// serve cover images.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Look up release candidates, best match first. An empty vec means
    /// "no match" and is not an error.
    async fn search(&self, query: &SearchQuery)
    -> Result<Vec<ReleaseCandidate>, EnrichmentError>;

    /// Download cover image bytes.
    async fn fetch_cover(&self, url: &str) -> Result<CoverArt, EnrichmentError>;
}

#[async_trait]
impl MetadataSource for DiscogsClient {
    async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<ReleaseCandidate>, EnrichmentError> {
        self.search(query).await
    }

    async fn fetch_cover(&self, url: &str) -> Result<CoverArt, EnrichmentError> {
        self.fetch_cover(url).await
    }
}
