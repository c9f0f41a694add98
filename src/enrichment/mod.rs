//! Metadata enrichment from the Discogs catalog.
//!
//! The pipeline: build a [`SearchQuery`] from a track's tags, search the
//! catalog through a rate-limited client, pick one [`ReleaseCandidate`]
//! with a selection strategy, and merge its fields into the track under
//! the caller's [`EnrichmentFields`] mask. The [`EnrichmentService`]
//! orchestrates this per-file over a worker pool and reports progress as
//! [`JobEvent`]s.

pub mod discogs;
pub mod domain;
pub mod rate_limit;
pub mod reconcile;
pub mod select;
pub mod service;
pub mod traits;

pub use discogs::DiscogsClient;
pub use domain::{
    BatchSummary, ChangedField, CoverArt, EnrichmentError, EnrichmentFields, JobEvent,
    JobState, ReleaseCandidate, SearchQuery, SkipReason,
};
pub use rate_limit::RateBudget;
pub use reconcile::merge;
pub use select::{BestRanked, OldestRelease, SelectCandidate};
pub use service::{BatchHandle, BatchOutcome, EnrichmentConfig, EnrichmentService};
pub use traits::MetadataSource;
