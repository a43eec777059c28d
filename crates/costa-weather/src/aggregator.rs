//! Concurrent rain-peak resolution for a set of cities.
//!
//! Each call to [`RainAggregator::resolve_all`] with a new set of names
//! starts a resolution pass and cancels the previous one. Results are
//! published through a `watch` channel, complete or not at all.

use futures::future::join_all;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::cache::RainCache;
use crate::provider::WeatherProvider;
use crate::types::{HourFormat, RainPeak, WeatherError};

/// Peak per city; `None` marks a city that could not be resolved.
pub type ResultSet = BTreeMap<String, Option<RainPeak>>;

/// What callers observe: the last published results and whether a pass is
/// still running.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RainSnapshot {
    pub result: ResultSet,
    pub pending: bool,
}

#[derive(Debug, Default)]
struct PassState {
    /// Sorted city list of the live pass
    cities: Option<Vec<String>>,
    token: Option<CancellationToken>,
    generation: u64,
}

pub struct RainAggregator {
    provider: Arc<WeatherProvider>,
    cache: Arc<RainCache>,
    state: Arc<Mutex<PassState>>,
    snapshot_tx: Arc<watch::Sender<RainSnapshot>>,
}

impl RainAggregator {
    pub fn new(provider: Arc<WeatherProvider>, ttl: Duration) -> Self {
        Self::with_cache(provider, Arc::new(RainCache::new(ttl)))
    }

    pub fn with_cache(provider: Arc<WeatherProvider>, cache: Arc<RainCache>) -> Self {
        let (snapshot_tx, _) = watch::channel(RainSnapshot::default());
        Self {
            provider,
            cache,
            state: Arc::new(Mutex::new(PassState::default())),
            snapshot_tx: Arc::new(snapshot_tx),
        }
    }

    pub fn cache(&self) -> &Arc<RainCache> {
        &self.cache
    }

    /// Ask for peaks for `cities` and return the current snapshot.
    ///
    /// The list is compared as a set of names: calling again with any
    /// permutation of the live list is a no-op. A different list cancels
    /// the live pass and spawns a new one, so this must be called from
    /// within a Tokio runtime.
    pub fn resolve_all<S: AsRef<str>>(&self, cities: &[S]) -> RainSnapshot {
        let mut sorted: Vec<String> = cities.iter().map(|c| c.as_ref().to_string()).collect();
        sorted.sort();

        let mut state = self.state.lock();
        if state.cities.as_ref() == Some(&sorted) {
            return self.snapshot();
        }

        if let Some(previous) = state.token.take() {
            previous.cancel();
            tracing::debug!("Superseded rain pass {}", state.generation);
        }

        state.generation += 1;
        let generation = state.generation;
        state.cities = Some(sorted.clone());

        if sorted.is_empty() {
            self.snapshot_tx.send_replace(RainSnapshot::default());
            return self.snapshot();
        }

        let token = CancellationToken::new();
        state.token = Some(token.clone());
        self.snapshot_tx.send_modify(|s| s.pending = true);
        drop(state);

        tracing::info!("Starting rain pass {} for {} cities", generation, sorted.len());

        let pass = run_pass(
            self.provider.clone(),
            self.cache.clone(),
            self.state.clone(),
            sorted.clone(),
            token.clone(),
        );
        let supervisor = supervise_pass(
            pass,
            sorted,
            generation,
            token,
            self.state.clone(),
            self.snapshot_tx.clone(),
        );
        tokio::spawn(supervisor);

        self.snapshot()
    }

    pub fn snapshot(&self) -> RainSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<RainSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Wait until no pass is pending and return that snapshot.
    pub async fn settled(&self) -> RainSnapshot {
        let mut rx = self.snapshot_tx.subscribe();
        let settled = match rx.wait_for(|s| !s.pending).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        settled
    }

    /// Number of passes started so far.
    pub fn pass_count(&self) -> u64 {
        self.state.lock().generation
    }

    /// Abort the live pass, if any. Its results are discarded, the previous
    /// snapshot stays visible and the next `resolve_all` always starts fresh.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.cities = None;
        if let Some(token) = state.token.take() {
            token.cancel();
            self.snapshot_tx.send_modify(|s| s.pending = false);
            tracing::info!("Rain pass {} cancelled", state.generation);
        }
    }
}

impl Drop for RainAggregator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Run `pass` on its own task and publish its outcome if it is still the
/// live generation. A panicking pass still settles: every city becomes
/// `None`.
async fn supervise_pass<F>(
    pass: F,
    cities: Vec<String>,
    generation: u64,
    token: CancellationToken,
    state: Arc<Mutex<PassState>>,
    snapshot_tx: Arc<watch::Sender<RainSnapshot>>,
) where
    F: Future<Output = Option<ResultSet>> + Send + 'static,
{
    let result = match tokio::spawn(pass).await {
        Ok(Some(result)) => result,
        Ok(None) => {
            tracing::debug!("Rain pass {} discarded after cancellation", generation);
            return;
        }
        Err(e) => {
            tracing::error!("Rain pass {} failed: {}", generation, e);
            cities.into_iter().map(|city| (city, None)).collect()
        }
    };

    let mut guard = state.lock();
    if guard.generation != generation || token.is_cancelled() {
        tracing::debug!("Rain pass {} finished after being superseded", generation);
        return;
    }
    // nothing left to cancel once published
    guard.token = None;
    snapshot_tx.send_replace(RainSnapshot {
        result,
        pending: false,
    });
    drop(guard);

    tracing::info!("Rain pass {} published", generation);
}

/// Resolve every city concurrently. `None` if the pass was cancelled.
async fn run_pass(
    provider: Arc<WeatherProvider>,
    cache: Arc<RainCache>,
    state: Arc<Mutex<PassState>>,
    cities: Vec<String>,
    token: CancellationToken,
) -> Option<ResultSet> {
    if token.is_cancelled() {
        return None;
    }

    let lookups = cities
        .iter()
        .map(|city| resolve_city(&provider, &cache, &state, city, &token));
    let outcomes = join_all(lookups).await;

    if token.is_cancelled() {
        return None;
    }

    let mut result = ResultSet::new();
    for (city, outcome) in cities.iter().zip(outcomes) {
        let peak = match outcome {
            Ok(peak) => Some(peak),
            Err(WeatherError::Cancelled) => return None,
            Err(e) => {
                tracing::warn!("Rain lookup for {} failed: {}", city, e);
                None
            }
        };
        result.insert(city.clone(), peak);
    }
    Some(result)
}

async fn resolve_city(
    provider: &WeatherProvider,
    cache: &RainCache,
    state: &Mutex<PassState>,
    city: &str,
    token: &CancellationToken,
) -> Result<RainPeak, WeatherError> {
    if let Some(probability) = cache.get(city) {
        return Ok(RainPeak::cached(probability));
    }

    let conditions = until_cancelled(token, provider.current_by_name(city)).await?;
    let series = until_cancelled(token, provider.hourly_rain(conditions.point)).await?;
    let peak = series.peak(HourFormat::TwentyFourHour);

    if !store_unless_cancelled(cache, state, token, city, peak.probability) {
        return Err(WeatherError::Cancelled);
    }

    Ok(peak)
}

/// Write a fresh peak to the cache unless the pass has been cancelled.
///
/// Tokens are only cancelled while `state` is held, so checking under the
/// same lock leaves no gap between the check and the write.
fn store_unless_cancelled(
    cache: &RainCache,
    state: &Mutex<PassState>,
    token: &CancellationToken,
    city: &str,
    probability: u8,
) -> bool {
    let _live = state.lock();
    if token.is_cancelled() {
        return false;
    }
    cache.insert(city, probability);
    true
}

/// Race `call` against cancellation, and re-check the token once it resolves.
async fn until_cancelled<T, F>(token: &CancellationToken, call: F) -> Result<T, WeatherError>
where
    F: Future<Output = Result<T, WeatherError>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(WeatherError::Cancelled),
        result = call => {
            if token.is_cancelled() {
                Err(WeatherError::Cancelled)
            } else {
                result
            }
        }
    }
}
