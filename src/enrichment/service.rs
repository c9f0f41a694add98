//! Enrichment orchestrator - drives a batch of per-track lookup jobs.
//!
//! A bounded pool of workers drains a shared FIFO queue, so jobs start in
//! enqueue order while completions may arrive out of order. Every worker
//! shares one rate budget (inside the Discogs client) and one event channel.
//! Per-job failures are converted into terminal job states at the job
//! boundary - one bad file never aborts the batch. The single exception is
//! an auth failure: every later call would fail identically, so the first
//! one trips a shared flag, remaining jobs are skipped without network
//! calls, and the error is surfaced once on the batch outcome.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::enrichment::discogs::DiscogsClient;
use crate::enrichment::domain::{
    BatchSummary, ChangedField, EnrichmentError, EnrichmentFields, JobEvent, JobState,
    SearchQuery, SkipReason,
};
use crate::enrichment::rate_limit::RateBudget;
use crate::enrichment::reconcile;
use crate::enrichment::select::{BestRanked, SelectCandidate};
use crate::enrichment::traits::MetadataSource;
use crate::metadata::TrackRecord;

/// Configuration for the enrichment service, normally read from the
/// config file. Defaults follow the Discogs published limits.
#[derive(Debug, Clone)]
pub struct EnrichmentConfig {
    /// Discogs personal access token
    pub token: String,
    /// Max lookup calls per rolling window (Discogs allows 60)
    pub rate_ceiling: u32,
    /// Rolling window duration
    pub rate_window: Duration,
    /// Per-request network timeout
    pub timeout: Duration,
    /// Worker pool size - bounds in-flight requests, independent of the
    /// rate limit (which bounds call *rate*)
    pub concurrency: usize,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            rate_ceiling: 60,
            rate_window: Duration::from_secs(60),
            timeout: Duration::from_secs(10),
            concurrency: 4,
        }
    }
}

/// Orchestrates one or more batch runs against a metadata source.
pub struct EnrichmentService<S: MetadataSource + 'static> {
    source: Arc<S>,
    concurrency: usize,
    selector: Arc<dyn SelectCandidate>,
}

impl EnrichmentService<DiscogsClient> {
    /// Create a service backed by the real Discogs client.
    ///
    /// Each service carries its own fresh [`RateBudget`]; construct one
    /// service per batch run so windows never leak across runs.
    pub fn new(config: &EnrichmentConfig) -> Result<Self, EnrichmentError> {
        let budget = Arc::new(RateBudget::new(config.rate_ceiling, config.rate_window));
        let client = DiscogsClient::new(config.token.clone(), config.timeout, budget)?;
        Ok(Self::with_source(Arc::new(client), config.concurrency))
    }
}

impl<S: MetadataSource + 'static> EnrichmentService<S> {
    /// Create a service over any metadata source (tests inject mocks here).
    pub fn with_source(source: Arc<S>, concurrency: usize) -> Self {
        Self {
            source,
            concurrency: concurrency.max(1),
            selector: Arc::new(BestRanked),
        }
    }

    /// Override the candidate selection strategy.
    pub fn with_selector(mut self, selector: Arc<dyn SelectCandidate>) -> Self {
        self.selector = selector;
        self
    }

    /// Start a batch run over the given tracks.
    ///
    /// Returns a handle (await the outcome, or cancel) and the stream of
    /// per-job progress events. Exactly one terminal event is emitted per
    /// enqueued track.
    pub fn start_batch(
        &self,
        tracks: Vec<TrackRecord>,
        fields: EnrichmentFields,
    ) -> (BatchHandle, mpsc::UnboundedReceiver<JobEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let auth_failed = Arc::new(AtomicBool::new(false));
        let auth_error: Arc<Mutex<Option<EnrichmentError>>> = Arc::new(Mutex::new(None));

        let job_count = tracks.len();
        let queue: Arc<Mutex<VecDeque<(usize, TrackRecord)>>> =
            Arc::new(Mutex::new(tracks.into_iter().enumerate().collect()));
        let finished: Arc<Mutex<Vec<(usize, TrackRecord, JobState)>>> =
            Arc::new(Mutex::new(Vec::with_capacity(job_count)));

        let workers: Vec<JoinHandle<()>> = (0..self.concurrency.min(job_count.max(1)))
            .map(|_| {
                let ctx = WorkerContext {
                    source: Arc::clone(&self.source),
                    selector: Arc::clone(&self.selector),
                    fields,
                    queue: Arc::clone(&queue),
                    finished: Arc::clone(&finished),
                    event_tx: event_tx.clone(),
                    cancelled: Arc::clone(&cancelled),
                    auth_failed: Arc::clone(&auth_failed),
                    auth_error: Arc::clone(&auth_error),
                };
                tokio::spawn(worker_loop(ctx))
            })
            .collect();

        let join = tokio::spawn(async move {
            futures::future::join_all(workers).await;

            let mut results = std::mem::take(&mut *finished.lock().await);
            // Workers complete out of order - restore enqueue order
            results.sort_by_key(|(id, _, _)| *id);

            let mut summary = BatchSummary::default();
            let mut tracks = Vec::with_capacity(results.len());
            for (_, track, state) in results {
                summary.record(&state);
                tracks.push(track);
            }

            BatchOutcome {
                tracks,
                summary,
                auth_error: auth_error.lock().await.take(),
            }
        });

        (BatchHandle { cancelled, join }, event_rx)
    }
}

/// Handle to a running batch.
pub struct BatchHandle {
    cancelled: Arc<AtomicBool>,
    join: JoinHandle<BatchOutcome>,
}

impl BatchHandle {
    /// Cooperative stop: in-flight jobs finish naturally, queued jobs
    /// terminate as skipped.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Wait for every job to reach a terminal state.
    pub async fn wait(self) -> BatchOutcome {
        self.join.await.expect("batch driver task panicked")
    }
}

/// Final result of a batch run.
#[derive(Debug)]
pub struct BatchOutcome {
    /// The (possibly mutated) track records, in enqueue order
    pub tracks: Vec<TrackRecord>,
    pub summary: BatchSummary,
    /// Set once when the run was aborted by an auth failure
    pub auth_error: Option<EnrichmentError>,
}

struct WorkerContext<S: MetadataSource> {
    source: Arc<S>,
    selector: Arc<dyn SelectCandidate>,
    fields: EnrichmentFields,
    queue: Arc<Mutex<VecDeque<(usize, TrackRecord)>>>,
    finished: Arc<Mutex<Vec<(usize, TrackRecord, JobState)>>>,
    event_tx: mpsc::UnboundedSender<JobEvent>,
    cancelled: Arc<AtomicBool>,
    auth_failed: Arc<AtomicBool>,
    auth_error: Arc<Mutex<Option<EnrichmentError>>>,
}

async fn worker_loop<S: MetadataSource>(ctx: WorkerContext<S>) {
    loop {
        let job = ctx.queue.lock().await.pop_front();
        let Some((id, track)) = job else {
            return;
        };

        let (track, state) = if ctx.cancelled.load(Ordering::SeqCst) {
            (
                track,
                JobState::Skipped {
                    reason: SkipReason::Cancelled,
                },
            )
        } else if ctx.auth_failed.load(Ordering::SeqCst) {
            (
                track,
                JobState::Skipped {
                    reason: SkipReason::AuthFailed,
                },
            )
        } else {
            process_job(&ctx, id, track).await
        };

        // Receiver may already be gone (UI stopped listening) - fine
        let _ = ctx.event_tx.send(JobEvent {
            job: id,
            path: track.path.clone(),
            state: state.clone(),
        });

        ctx.finished.lock().await.push((id, track, state));
    }
}

/// Run one job to a terminal state. All lookup errors are absorbed here.
async fn process_job<S: MetadataSource>(
    ctx: &WorkerContext<S>,
    id: usize,
    mut track: TrackRecord,
) -> (TrackRecord, JobState) {
    // Tracks we cannot build a query for are skipped before the rate
    // limiter ever sees them
    let Some(query) = SearchQuery::new(&track.artist, &track.title, &track.album) else {
        return (
            track,
            JobState::Skipped {
                reason: SkipReason::InsufficientQuery,
            },
        );
    };

    let _ = ctx.event_tx.send(JobEvent {
        job: id,
        path: track.path.clone(),
        state: JobState::InFlight,
    });

    let candidates = match ctx.source.search(&query).await {
        Ok(candidates) => candidates,
        Err(EnrichmentError::AuthInvalid) => {
            ctx.auth_failed.store(true, Ordering::SeqCst);
            ctx.auth_error
                .lock()
                .await
                .get_or_insert(EnrichmentError::AuthInvalid);
            return (
                track,
                JobState::Failed {
                    reason: EnrichmentError::AuthInvalid.to_string(),
                },
            );
        }
        Err(e) => {
            tracing::warn!(path = ?track.path, error = %e, "lookup failed");
            return (
                track,
                JobState::Failed {
                    reason: e.to_string(),
                },
            );
        }
    };

    // No match is a successful job with nothing to change
    let Some(candidate) = ctx.selector.select(&query, &candidates) else {
        return (track, JobState::Succeeded { changed: vec![] });
    };

    let was_dirty = track.dirty;
    let mut changed = reconcile::merge(&mut track, candidate, ctx.fields);

    if changed.contains(&ChangedField::Art)
        && let Some(url) = track.cover_source.clone()
    {
        match ctx.source.fetch_cover(&url).await {
            Ok(art) => track.set_cover(art),
            Err(e) => {
                // Keep the year/catalog updates; just drop the art change
                tracing::warn!(path = ?track.path, error = %e, "cover download failed");
                track.cover_source = None;
                changed.retain(|f| *f != ChangedField::Art);
                if changed.is_empty() {
                    track.dirty = was_dirty;
                }
            }
        }
    }

    (track, JobState::Succeeded { changed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::domain::ReleaseCandidate;
    use crate::enrichment::traits::mocks::MockSource;
    use std::path::PathBuf;

    fn make_track(name: &str, artist: &str, title: &str) -> TrackRecord {
        TrackRecord {
            path: PathBuf::from(format!("/music/{name}")),
            artist: artist.to_string(),
            title: title.to_string(),
            album: String::new(),
            album_artist: String::new(),
            genre: "Electronic".to_string(),
            year: None,
            catalog_number: String::new(),
            cover_source: None,
            cover_art: None,
            dirty: false,
        }
    }

    fn candidate() -> ReleaseCandidate {
        ReleaseCandidate {
            artist: Some("Artist A".to_string()),
            album: Some("Album".to_string()),
            year: Some(1999),
            catalog_number: Some("CAT001".to_string()),
            cover_url: Some("https://img/full.jpg".to_string()),
            rank: 0,
        }
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<JobEvent>) -> Vec<JobEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_one_terminal_event_per_job() {
        let source = Arc::new(MockSource::single_match(candidate()));
        let service = EnrichmentService::with_source(source, 3);

        let tracks = vec![
            make_track("a.mp3", "Artist A", "Song 1"),
            make_track("b.mp3", "", ""), // skipped
            make_track("c.mp3", "Artist A", "Song 3"),
        ];
        let (handle, rx) = service.start_batch(tracks, EnrichmentFields::all());
        let outcome = handle.wait().await;
        let events = drain(rx).await;

        let terminal = events.iter().filter(|e| e.state.is_terminal()).count();
        assert_eq!(terminal, 3);
        assert_eq!(outcome.summary.total(), 3);
        assert_eq!(outcome.summary.skipped, 1);
        assert_eq!(outcome.summary.succeeded, 2);
    }

    #[tokio::test]
    async fn test_insufficient_query_consumes_no_lookup() {
        let source = Arc::new(MockSource::single_match(candidate()));
        let service = EnrichmentService::with_source(Arc::clone(&source), 2);

        let tracks = vec![make_track("a.mp3", "", "Only Title")];
        let (handle, rx) = service.start_batch(tracks, EnrichmentFields::all());
        let outcome = handle.wait().await;
        drop(rx);

        assert_eq!(outcome.summary.skipped, 1);
        assert_eq!(source.searches(), 0, "skipped job must not hit the source");
    }

    #[tokio::test]
    async fn test_merges_year_and_downloads_art() {
        let source = Arc::new(MockSource::single_match(ReleaseCandidate {
            catalog_number: None,
            ..candidate()
        }));
        let service = EnrichmentService::with_source(Arc::clone(&source), 1);

        let tracks = vec![make_track("a.mp3", "Artist A", "Song B")];
        let (handle, rx) = service.start_batch(
            tracks,
            EnrichmentFields::YEAR | EnrichmentFields::ART,
        );
        let outcome = handle.wait().await;
        let events = drain(rx).await;

        let track = &outcome.tracks[0];
        assert_eq!(track.year, Some(1999));
        assert!(track.cover_art.is_some(), "art bytes attached");
        assert!(track.catalog_number.is_empty());
        assert_eq!(source.cover_downloads(), 1);

        let terminal = events.iter().find(|e| e.state.is_terminal()).unwrap();
        match &terminal.state {
            JobState::Succeeded { changed } => {
                assert_eq!(changed, &[ChangedField::Year, ChangedField::Art]);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_no_match_succeeds_with_no_changes() {
        let source = Arc::new(MockSource::no_matches());
        let service = EnrichmentService::with_source(source, 1);

        let tracks = vec![make_track("a.mp3", "Artist A", "Song B")];
        let (handle, rx) = service.start_batch(tracks, EnrichmentFields::all());
        let outcome = handle.wait().await;
        drop(rx);

        assert_eq!(outcome.summary.succeeded, 1);
        assert!(!outcome.tracks[0].dirty);
    }

    #[tokio::test]
    async fn test_remote_failure_isolates_to_one_job() {
        let source = Arc::new(MockSource::with_error(
            EnrichmentError::RemoteUnavailable("503".to_string()),
        ));
        let service = EnrichmentService::with_source(source, 2);

        let tracks = vec![
            make_track("a.mp3", "Artist A", "Song 1"),
            make_track("b.mp3", "Artist A", "Song 2"),
        ];
        let (handle, rx) = service.start_batch(tracks, EnrichmentFields::all());
        let outcome = handle.wait().await;
        drop(rx);

        // Both jobs ran to a terminal state despite both failing
        assert_eq!(outcome.summary.failed, 2);
        assert!(outcome.auth_error.is_none());
    }

    #[tokio::test]
    async fn test_auth_failure_stops_remaining_lookups() {
        let source = Arc::new(MockSource::with_error(EnrichmentError::AuthInvalid));
        // Single worker makes ordering deterministic
        let service = EnrichmentService::with_source(Arc::clone(&source), 1);

        let tracks = vec![
            make_track("a.mp3", "Artist A", "Song 1"),
            make_track("b.mp3", "Artist A", "Song 2"),
            make_track("c.mp3", "Artist A", "Song 3"),
        ];
        let (handle, rx) = service.start_batch(tracks, EnrichmentFields::all());
        let outcome = handle.wait().await;
        drop(rx);

        assert_eq!(source.searches(), 1, "only the first job hits the network");
        assert_eq!(outcome.summary.failed, 1);
        assert_eq!(outcome.summary.skipped, 2);
        assert!(matches!(
            outcome.auth_error,
            Some(EnrichmentError::AuthInvalid)
        ));
    }

    #[tokio::test]
    async fn test_cancel_skips_queued_jobs() {
        let source = Arc::new(MockSource {
            delay: Some(Duration::from_millis(50)),
            ..MockSource::single_match(candidate())
        });
        let service = EnrichmentService::with_source(source, 1);

        let tracks = (0..5)
            .map(|i| make_track(&format!("{i}.mp3"), "Artist A", "Song"))
            .collect();
        let (handle, mut rx) = service.start_batch(tracks, EnrichmentFields::all());

        // Wait until the first job is in flight, then cancel; with one
        // worker the remaining four are still queued
        let first = rx.recv().await.expect("in-flight event");
        assert_eq!(first.state, JobState::InFlight);
        handle.cancel();

        let outcome = handle.wait().await;
        assert_eq!(outcome.summary.total(), 5);
        assert_eq!(outcome.summary.succeeded, 1);
        assert_eq!(outcome.summary.skipped, 4);
    }

    #[tokio::test]
    async fn test_jobs_start_in_enqueue_order() {
        let source = Arc::new(MockSource::single_match(candidate()));
        let service = EnrichmentService::with_source(source, 1);

        let tracks = (0..4)
            .map(|i| make_track(&format!("{i}.mp3"), "Artist A", "Song"))
            .collect();
        let (handle, rx) = service.start_batch(tracks, EnrichmentFields::all());
        handle.wait().await;
        let events = drain(rx).await;

        let starts: Vec<usize> = events
            .iter()
            .filter(|e| e.state == JobState::InFlight)
            .map(|e| e.job)
            .collect();
        assert_eq!(starts, vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_cover_failure_keeps_other_changes() {
        let source = Arc::new(MockSource {
            cover_error: Some(EnrichmentError::RemoteUnavailable("410".to_string())),
            ..MockSource::single_match(candidate())
        });
        let service = EnrichmentService::with_source(source, 1);

        let tracks = vec![make_track("a.mp3", "Artist A", "Song B")];
        let (handle, rx) = service.start_batch(tracks, EnrichmentFields::all());
        let outcome = handle.wait().await;
        let events = drain(rx).await;

        let track = &outcome.tracks[0];
        assert_eq!(track.year, Some(1999));
        assert!(track.cover_art.is_none());
        assert!(track.dirty, "year/catalog changes still need saving");

        let terminal = events.iter().find(|e| e.state.is_terminal()).unwrap();
        match &terminal.state {
            JobState::Succeeded { changed } => {
                assert!(!changed.contains(&ChangedField::Art));
                assert!(changed.contains(&ChangedField::Year));
            }
            other => panic!("expected success, got {other:?}"),
        }
    }
}
