//! Discogs API Data Transfer Objects
//!
//! These types match EXACTLY what the Discogs database search endpoint
//! returns. DO NOT add fields that aren't in the API response.
//! DO NOT use these types outside the discogs module - convert to domain types.
//!
//! API Reference: https://www.discogs.com/developers#page:database,header:database-search

use serde::{Deserialize, Serialize};

/// `/database/search` response (one page)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

/// Pagination block attached to every search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Pagination {
    pub page: Option<u32>,
    pub pages: Option<u32>,
    pub per_page: Option<u32>,
    pub items: Option<u64>,
}

/// One release in the search results.
///
/// Discogs formats `title` as "Artist - Album" and returns `year` as a
/// string. `catno` may be empty or the literal "none".
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResult {
    pub id: Option<u64>,
    pub title: String,
    pub year: Option<String>,
    pub catno: Option<String>,
    pub cover_image: Option<String>,
    pub thumb: Option<String>,
    pub country: Option<String>,
}

/// Error response body (e.g. on 401)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    pub message: String,
}

// ============================================================================
// CONTRACT TESTS
// These verify our DTOs match what the real API returns.
// If these fail, the API has changed and we need to update our DTOs.
// ============================================================================
