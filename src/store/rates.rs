use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::{RateFetcher, RateSnapshot};

/// Process-wide holder of the current rate table.
///
/// Readers get the latest committed snapshot without waiting on the network.
/// Refreshes run as background tasks and replace the snapshot wholesale, so a
/// reader sees either the old table or the new one, never a mix.
pub struct RateStore {
    fetcher: Arc<dyn RateFetcher>,
    ttl: Duration,
    snapshot: RwLock<Option<Arc<RateSnapshot>>>,
    last_attempt: Mutex<Option<Instant>>,
}

impl RateStore {
    pub fn new(fetcher: Arc<dyn RateFetcher>, ttl: Duration) -> Self {
        Self {
            fetcher,
            ttl,
            snapshot: RwLock::new(None),
            last_attempt: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Kicks off the initial load. Must be called from within a Tokio runtime.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        info!(ttl_secs = self.ttl.as_secs(), "Starting rate store");
        self.trigger_refresh_if_expired(Instant::now())
    }

    /// True when no refresh was ever attempted or the last attempt is at
    /// least one TTL old.
    pub fn is_expired(&self, now: Instant) -> bool {
        let last_attempt = self
            .last_attempt
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Self::expired_since(*last_attempt, now, self.ttl)
    }

    fn expired_since(last_attempt: Option<Instant>, now: Instant, ttl: Duration) -> bool {
        match last_attempt {
            None => true,
            Some(at) => now.saturating_duration_since(at) >= ttl,
        }
    }

    /// Spawns a background refresh when the store is expired and returns its
    /// handle; returns `None` when the current data is still within its TTL.
    ///
    /// The attempt time is claimed before the fetch starts, so concurrent
    /// callers see the store as fresh and at most one refresh is in flight.
    /// A failed refresh is not retried until another TTL has elapsed.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn trigger_refresh_if_expired(self: &Arc<Self>, now: Instant) -> Option<JoinHandle<()>> {
        {
            let mut last_attempt = self
                .last_attempt
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !Self::expired_since(*last_attempt, now, self.ttl) {
                return None;
            }
            *last_attempt = Some(now);
        }

        debug!("Rates expired, refreshing in background");
        let store = Arc::clone(self);
        Some(tokio::spawn(async move { store.refresh().await }))
    }

    async fn refresh(&self) {
        match self.fetcher.fetch_rates().await {
            Ok(snapshot) => {
                info!(
                    date = %snapshot.date(),
                    currencies = snapshot.len(),
                    "Rates refreshed"
                );
                let mut current = self.snapshot.write().unwrap_or_else(PoisonError::into_inner);
                *current = Some(Arc::new(snapshot));
            }
            Err(e) => {
                warn!(error = %e, "Rate refresh failed, keeping previous rates");
            }
        }
    }

    /// Latest committed snapshot, or `None` before the first successful fetch.
    pub fn current_snapshot(&self) -> Option<Arc<RateSnapshot>> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
