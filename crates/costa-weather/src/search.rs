//! Single-city search: one fresh lookup, merged into a flat record.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::provider::WeatherProvider;
use crate::types::{HourFormat, RainPeak, SearchRecord, WeatherError};

/// Result of one `search` call
#[derive(Debug)]
pub enum SearchOutcome {
    /// Blank input; nothing was requested
    Skipped,
    Found(SearchRecord),
    Failed(WeatherError),
    /// A newer search was issued while this one was in flight
    Superseded,
}

/// What a search box shows: the latest search's record or error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub record: Option<SearchRecord>,
    pub error: Option<String>,
    pub loading: bool,
}

pub struct CitySearch {
    provider: Arc<WeatherProvider>,
    hour_format: HourFormat,
    latest: AtomicU64,
    state: RwLock<SearchState>,
}

impl CitySearch {
    pub fn new(provider: Arc<WeatherProvider>, hour_format: HourFormat) -> Self {
        Self {
            provider,
            hour_format,
            latest: AtomicU64::new(0),
            state: RwLock::new(SearchState::default()),
        }
    }

    pub fn state(&self) -> SearchState {
        self.state.read().clone()
    }

    /// Look up `name` without the cache.
    ///
    /// Searches are never cancelled. Each call takes a sequence number and
    /// only the most recently issued one may update [`CitySearch::state`];
    /// older ones come back as [`SearchOutcome::Superseded`].
    pub async fn search(&self, name: &str) -> SearchOutcome {
        let name = name.trim();
        if name.is_empty() {
            return SearchOutcome::Skipped;
        }

        let seq = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        *self.state.write() = SearchState {
            record: None,
            error: None,
            loading: true,
        };
        tracing::debug!("Search #{} for {}", seq, name);

        let result = self.lookup(name).await;

        let mut state = self.state.write();
        if self.latest.load(Ordering::SeqCst) != seq {
            tracing::debug!("Search #{} for {} superseded", seq, name);
            return SearchOutcome::Superseded;
        }

        match result {
            Ok(record) => {
                tracing::info!("Found {} ({}% rain)", record.name, record.rain_probability);
                *state = SearchState {
                    record: Some(record.clone()),
                    error: None,
                    loading: false,
                };
                SearchOutcome::Found(record)
            }
            Err(e) => {
                tracing::warn!("Search for {} failed: {}", name, e);
                *state = SearchState {
                    record: None,
                    error: Some(e.to_string()),
                    loading: false,
                };
                SearchOutcome::Failed(e)
            }
        }
    }

    async fn lookup(&self, name: &str) -> Result<SearchRecord, WeatherError> {
        let conditions = self.provider.current_by_name(name).await?;

        let peak = match self.provider.hourly_rain(conditions.point).await {
            Ok(series) => series.peak(self.hour_format),
            Err(e) => {
                tracing::warn!("Rain forecast for {} unavailable: {}", name, e);
                RainPeak::default()
            }
        };

        Ok(SearchRecord::merge(
            name,
            conditions,
            peak,
            &self.provider.settings().country,
        ))
    }
}
