//! Rain outlook service for Costa
//!
//! Resolves city names through OpenWeather, reads the day's hourly rain
//! probabilities from Open-Meteo, and keeps the peak per city in a short-lived
//! cache. Current conditions for the dashboard towns are fetched alongside.

pub mod aggregator;
pub mod cache;
pub mod conditions;
mod forecast;
mod geocode;
pub mod peak;
pub mod provider;
pub mod search;
pub mod types;

pub use aggregator::{RainAggregator, RainSnapshot, ResultSet};
pub use cache::{Clock, ManualClock, RainCache, SystemClock, DEFAULT_TTL};
pub use conditions::{current_for_towns, ConditionsSet};
pub use peak::format_hour;
pub use provider::{ProviderSettings, WeatherProvider};
pub use search::{CitySearch, SearchOutcome, SearchState};
pub use types::*;
