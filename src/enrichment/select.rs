//! Candidate selection strategies.
//!
//! Which of the returned candidates gets merged is deliberately pluggable:
//! the provider's rank-0 match is a sensible default, but collectors often
//! prefer the original pressing (oldest release with a real catalog number).

use std::collections::HashMap;

use crate::enrichment::domain::{ReleaseCandidate, SearchQuery};

/// Strategy seam for picking the candidate to merge.
pub trait SelectCandidate: Send + Sync {
    fn select<'a>(
        &self,
        query: &SearchQuery,
        candidates: &'a [ReleaseCandidate],
    ) -> Option<&'a ReleaseCandidate>;
}

/// Take the provider's best match (rank 0).
#[derive(Debug, Clone, Copy, Default)]
pub struct BestRanked;

impl SelectCandidate for BestRanked {
    fn select<'a>(
        &self,
        _query: &SearchQuery,
        candidates: &'a [ReleaseCandidate],
    ) -> Option<&'a ReleaseCandidate> {
        candidates.first()
    }
}

/// Prefer the oldest matching release that carries a usable catalog number.
///
/// Candidates whose artist/album fuzzily match the query are considered
/// first; among those with a year, the oldest wins. Without any dated
/// candidate, falls back to the most frequent catalog number across the
/// result page (repeated catalog numbers across editions are a strong
/// signal for the canonical pressing).
#[derive(Debug, Clone, Copy, Default)]
pub struct OldestRelease;

impl SelectCandidate for OldestRelease {
    fn select<'a>(
        &self,
        query: &SearchQuery,
        candidates: &'a [ReleaseCandidate],
    ) -> Option<&'a ReleaseCandidate> {
        let mut pool: Vec<&ReleaseCandidate> = candidates
            .iter()
            .filter(|c| matches_query(query, c))
            .collect();
        if pool.is_empty() {
            pool = candidates.iter().collect();
        }

        let oldest_with_catalog = pool
            .iter()
            .filter(|c| c.year.is_some() && c.catalog_number.is_some())
            .min_by_key(|c| c.year)
            .copied();
        if oldest_with_catalog.is_some() {
            return oldest_with_catalog;
        }

        select_by_catalog_frequency(&pool).or_else(|| pool.first().copied())
    }
}

/// Fuzzy artist/album match: equality or containment either way, case
/// insensitive. Accommodates credited-name variations like "Orb" vs
/// "The Orb".
fn matches_query(query: &SearchQuery, candidate: &ReleaseCandidate) -> bool {
    let artist_ok = candidate
        .artist
        .as_deref()
        .map(|a| fuzzy_eq(a, &query.artist))
        .unwrap_or(false);
    if !artist_ok {
        return false;
    }
    if query.album.is_empty() {
        return true;
    }
    candidate
        .album
        .as_deref()
        .map(|a| fuzzy_eq(a, &query.album))
        .unwrap_or(false)
}

fn fuzzy_eq(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    a == b || a.contains(&b) || b.contains(&a)
}

/// Pick the candidate bearing the catalog number that occurs most often.
fn select_by_catalog_frequency<'a>(
    candidates: &[&'a ReleaseCandidate],
) -> Option<&'a ReleaseCandidate> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for candidate in candidates {
        if let Some(ref catno) = candidate.catalog_number {
            *counts.entry(catno.as_str()).or_insert(0) += 1;
        }
    }

    // Ties break toward the better-ranked catalog number
    let most_common = counts
        .into_iter()
        .max_by_key(|(catno, count)| {
            let best_rank = candidates
                .iter()
                .filter(|c| c.catalog_number.as_deref() == Some(catno))
                .map(|c| c.rank)
                .min()
                .unwrap_or(usize::MAX);
            (*count, std::cmp::Reverse(best_rank))
        })
        .map(|(catno, _)| catno.to_string())?;

    candidates
        .iter()
        .find(|c| c.catalog_number.as_deref() == Some(most_common.as_str()))
        .copied()
}
