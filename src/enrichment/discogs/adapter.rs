//! Adapter layer: Convert Discogs DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.
//! This isolates API changes - if Discogs changes their response format,
//! only this file and dto.rs need to change.

use super::dto;
use crate::enrichment::domain::ReleaseCandidate;

/// Convert a search response page into ranked candidates.
///
/// Rank preserves the provider's relevance ordering.
pub fn to_candidates(response: dto::SearchResponse) -> Vec<ReleaseCandidate> {
    response
        .results
        .into_iter()
        .enumerate()
        .map(|(rank, result)| to_candidate(result, rank))
        .collect()
}

fn to_candidate(result: dto::SearchResult, rank: usize) -> ReleaseCandidate {
    let (artist, album) = split_release_title(&result.title);

    ReleaseCandidate {
        artist,
        album,
        year: result.year.as_deref().and_then(parse_year),
        catalog_number: result.catno.as_deref().and_then(normalize_catalog),
        cover_url: pick_cover_url(result.cover_image, result.thumb),
        rank,
    }
}

/// Discogs release titles are "Artist - Album". Titles without the
/// separator are treated as album-only.
fn split_release_title(title: &str) -> (Option<String>, Option<String>) {
    match title.split_once(" - ") {
        Some((artist, album)) => {
            let artist = artist.trim();
            let album = album.trim();
            (
                (!artist.is_empty()).then(|| artist.to_string()),
                (!album.is_empty()).then(|| album.to_string()),
            )
        }
        None => {
            let title = title.trim();
            (None, (!title.is_empty()).then(|| title.to_string()))
        }
    }
}

fn parse_year(year: &str) -> Option<u32> {
    let year: u32 = year.trim().parse().ok()?;
    (year > 0).then_some(year)
}

/// Uppercase, strip interior spaces, and reject the placeholder values
/// Discogs uses for releases without a catalog number.
fn normalize_catalog(catno: &str) -> Option<String> {
    let normalized: String = catno
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_uppercase();
    if normalized.is_empty() || normalized == "NONE" {
        return None;
    }
    Some(normalized)
}

/// Prefer the full-size image, fall back to the thumbnail.
fn pick_cover_url(cover_image: Option<String>, thumb: Option<String>) -> Option<String> {
    cover_image
        .filter(|url| !url.trim().is_empty())
        .or(thumb.filter(|url| !url.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_result(title: &str, year: Option<&str>, catno: Option<&str>) -> dto::SearchResult {
        dto::SearchResult {
            id: Some(1),
            title: title.to_string(),
            year: year.map(String::from),
            catno: catno.map(String::from),
            cover_image: None,
            thumb: None,
            country: None,
        }
    }

    #[test]
    fn test_split_artist_and_album() {
        let candidate = to_candidate(
            make_result("Orbital - Snivilisation", Some("1994"), Some("internal828404.2")),
            0,
        );
        assert_eq!(candidate.artist.as_deref(), Some("Orbital"));
        assert_eq!(candidate.album.as_deref(), Some("Snivilisation"));
        assert_eq!(candidate.year, Some(1994));
        assert_eq!(candidate.catalog_number.as_deref(), Some("INTERNAL828404.2"));
    }

    #[test]
    fn test_title_without_separator_is_album_only() {
        let candidate = to_candidate(make_result("Snivilisation", None, None), 0);
        assert!(candidate.artist.is_none());
        assert_eq!(candidate.album.as_deref(), Some("Snivilisation"));
    }

    #[test]
    fn test_album_keeps_dashes_after_first_separator() {
        let candidate = to_candidate(make_result("Artist - Album - Deluxe", None, None), 0);
        assert_eq!(candidate.artist.as_deref(), Some("Artist"));
        assert_eq!(candidate.album.as_deref(), Some("Album - Deluxe"));
    }

    #[test]
    fn test_catalog_normalization() {
        assert_eq!(normalize_catalog("pb 41447"), Some("PB41447".to_string()));
        assert_eq!(normalize_catalog("  "), None);
        assert_eq!(normalize_catalog("none"), None);
        assert_eq!(normalize_catalog("NONE"), None);
    }

    #[test]
    fn test_invalid_year_is_dropped() {
        assert_eq!(parse_year("1987"), Some(1987));
        assert_eq!(parse_year("0"), None);
        assert_eq!(parse_year("unknown"), None);
    }

    #[test]
    fn test_cover_prefers_full_image() {
        assert_eq!(
            pick_cover_url(Some("full.jpg".into()), Some("thumb.jpg".into())),
            Some("full.jpg".to_string())
        );
        assert_eq!(
            pick_cover_url(Some("".into()), Some("thumb.jpg".into())),
            Some("thumb.jpg".to_string())
        );
        assert_eq!(pick_cover_url(None, None), None);
    }

    #[test]
    fn test_rank_preserves_provider_order() {
        let response = dto::SearchResponse {
            pagination: None,
            results: vec![
                make_result("A - First", None, None),
                make_result("A - Second", None, None),
            ],
        };
        let candidates = to_candidates(response);
        assert_eq!(candidates[0].rank, 0);
        assert_eq!(candidates[0].album.as_deref(), Some("First"));
        assert_eq!(candidates[1].rank, 1);
    }
}
