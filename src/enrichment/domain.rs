//! Internal domain models for metadata enrichment.
//!
//! These types are OUR types - they don't change when the Discogs API changes.
//! All external API responses get converted into these types via the adapter.

use std::path::PathBuf;

bitflags::bitflags! {
    /// Which track fields a batch run is allowed to overwrite.
    ///
    /// Everything outside this set (artist, title, album, genre, ...) is
    /// user-owned and never touched by the enrichment path.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EnrichmentFields: u8 {
        /// Embedded front cover art
        const ART = 1;
        /// Release year
        const YEAR = 1 << 1;
        /// Catalog number
        const CATALOG = 1 << 2;
    }
}

impl Default for EnrichmentFields {
    fn default() -> Self {
        Self::all()
    }
}

/// The search terms derived from a track's existing tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub artist: String,
    pub title: String,
    /// Optional - improves ranking when present
    pub album: String,
}

impl SearchQuery {
    /// Build a query from tag values. Returns `None` when the minimum
    /// required fields (artist + title) are missing - such tracks are
    /// skipped without ever reaching the rate limiter.
    pub fn new(artist: &str, title: &str, album: &str) -> Option<Self> {
        let artist = artist.trim();
        let title = title.trim();
        if artist.is_empty() || title.is_empty() {
            return None;
        }
        Some(Self {
            artist: artist.to_string(),
            title: title.to_string(),
            album: album.trim().to_string(),
        })
    }
}

/// A single release match returned by the catalog lookup.
///
/// Transient and read-only: lives for one lookup call, discarded after
/// reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseCandidate {
    /// Artist part of the release title, when the provider uses
    /// "Artist - Album" formatting
    pub artist: Option<String>,
    /// Album title
    pub album: Option<String>,
    /// Release year
    pub year: Option<u32>,
    /// Normalized catalog number (uppercased, spaces stripped)
    pub catalog_number: Option<String>,
    /// URL of the full-size cover image (thumbnail as fallback)
    pub cover_url: Option<String>,
    /// Position in the provider's relevance ordering (0 = best match)
    pub rank: usize,
}

/// Downloaded cover art
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverArt {
    /// Image data (JPEG or PNG)
    pub data: Vec<u8>,
    /// MIME type (image/jpeg or image/png)
    pub mime_type: String,
    /// Source URL
    pub url: String,
}

/// A track field the reconciler wrote during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangedField {
    Art,
    Year,
    Catalog,
}

impl ChangedField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Art => "art",
            Self::Year => "year",
            Self::Catalog => "catalog",
        }
    }
}

/// Why a job terminated without attempting (or completing) a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Track lacks artist or title - nothing to search for
    InsufficientQuery,
    /// The batch was cancelled before this job started
    Cancelled,
    /// An earlier job hit an auth failure; every later call would fail too
    AuthFailed,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InsufficientQuery => "missing artist/title",
            Self::Cancelled => "cancelled",
            Self::AuthFailed => "authentication failed",
        }
    }
}

/// Job state machine: pending -> in-flight -> {succeeded | failed | skipped}.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    InFlight,
    Succeeded { changed: Vec<ChangedField> },
    Failed { reason: String },
    Skipped { reason: SkipReason },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded { .. } | Self::Failed { .. } | Self::Skipped { .. }
        )
    }
}

/// Progress event emitted once per state transition.
///
/// Completion order is not guaranteed - consumers must key results by
/// track path, not by arrival order.
#[derive(Debug, Clone)]
pub struct JobEvent {
    /// Enqueue position within the batch
    pub job: usize,
    /// Track identity
    pub path: PathBuf,
    pub state: JobState,
}

/// Terminal-state counts for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchSummary {
    pub fn record(&mut self, state: &JobState) {
        match state {
            JobState::Succeeded { .. } => self.succeeded += 1,
            JobState::Failed { .. } => self.failed += 1,
            JobState::Skipped { .. } => self.skipped += 1,
            JobState::Pending | JobState::InFlight => {}
        }
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.skipped
    }
}

/// Errors that can occur during enrichment
#[derive(Debug, Clone, thiserror::Error)]
pub enum EnrichmentError {
    /// 401/403 - the API token was rejected. Fatal for the whole run:
    /// every subsequent call would fail the same way.
    #[error("Discogs rejected the API token")]
    AuthInvalid,

    /// Network failure, timeout, malformed body, or 5xx from the remote
    /// service. Transient; the job fails but the batch continues.
    #[error("remote service unavailable: {0}")]
    RemoteUnavailable(String),
}
