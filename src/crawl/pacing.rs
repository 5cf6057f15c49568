//! Polite, per-host request pacing.
//!
//! Before every fetch the caller waits a random delay drawn from a
//! [`DelayRange`]. The wait happens while holding a per-host lock, so workers
//! targeting the same host queue behind one another instead of bursting.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use rand::Rng;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use url::Url;

use crate::config::DelayRange;

/// Shared politeness gate.
#[derive(Debug, Default)]
pub struct Pacer {
    hosts: DashMap<String, Arc<Mutex<()>>>,
}

impl Pacer {
    /// Creates a pacer with no hosts seen yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits a random delay from `range` before a request to `url`'s host.
    #[instrument(skip(self), fields(host))]
    pub async fn wait(&self, url: &str, range: DelayRange) {
        if range.is_zero() {
            return;
        }

        let host = host_key(url);
        tracing::Span::current().record("host", host.as_str());

        // Clone the Arc so the DashMap shard lock is released before awaiting.
        let gate = self
            .hosts
            .entry(host)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _turn = gate.lock().await;

        let delay = random_delay(range);
        debug!(delay_ms = delay.as_millis(), "polite delay");
        tokio::time::sleep(delay).await;
    }
}

/// Draws a delay uniformly from `range`.
#[must_use]
pub fn random_delay(range: DelayRange) -> Duration {
    if range.min >= range.max {
        return range.min;
    }
    let millis = rand::thread_rng().gen_range(range.min.as_millis()..=range.max.as_millis());
    Duration::from_millis(u64::try_from(millis).unwrap_or(u64::MAX))
}

/// Lower-cased host of `url`, or `"unknown"` so malformed URLs still queue.
#[must_use]
pub fn host_key(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .unwrap_or_else(|| "unknown".to_string())
}
