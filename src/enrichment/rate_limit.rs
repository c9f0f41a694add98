//! Rolling-window rate limiter for Discogs API calls.
//!
//! Discogs allows 60 authenticated requests per rolling minute. Every worker
//! in a batch shares one [`RateBudget`]; a fresh budget is created per run so
//! one batch never contaminates the next.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Default Discogs ceiling: 60 calls per 60 second window.
pub const DEFAULT_CEILING: u32 = 60;
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Window {
    started: Instant,
    used: u32,
}

/// Shared call budget over a rolling time window.
///
/// `acquire` never errors - it only delays. Callers are served in FIFO
/// order: the window state is guarded by a `tokio::sync::Mutex` (which
/// queues waiters fairly) and held across the wait, so a burst of callers
/// can never start more than `ceiling` calls inside one window.
#[derive(Debug)]
pub struct RateBudget {
    ceiling: u32,
    window: Duration,
    state: Mutex<Window>,
}

impl RateBudget {
    pub fn new(ceiling: u32, window: Duration) -> Self {
        // A zero ceiling would deadlock every caller
        let ceiling = ceiling.max(1);
        Self {
            ceiling,
            window,
            state: Mutex::new(Window {
                started: Instant::now(),
                used: 0,
            }),
        }
    }

    /// Budget with Discogs defaults (60 calls / minute).
    pub fn discogs_default() -> Self {
        Self::new(DEFAULT_CEILING, DEFAULT_WINDOW)
    }

    /// Block until a call slot is available, then consume it.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;
        loop {
            let elapsed = state.started.elapsed();
            if elapsed >= self.window {
                state.started = Instant::now();
                state.used = 0;
            }
            if state.used < self.ceiling {
                state.used += 1;
                return;
            }
            let wait = self.window - elapsed;
            tracing::debug!(?wait, "rate limit reached, waiting for window reset");
            sleep(wait).await;
        }
    }

    /// Slots consumed in the current window.
    pub async fn used(&self) -> u32 {
        self.state.lock().await.used
    }
}
