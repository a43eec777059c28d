use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{CurrentConditions, GeoPoint, RainSeries, WeatherError};
use crate::{forecast, geocode};

const DEFAULT_CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = "Costa/0.1.0";

/// Endpoints and credentials for the two upstream services
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: String,
    /// Country qualifier appended to city queries, e.g. `mx`
    pub country: String,
    pub language: String,
    pub current_weather_url: String,
    pub forecast_url: String,
    pub timeout: Duration,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            country: "mx".to_string(),
            language: "es".to_string(),
            current_weather_url: DEFAULT_CURRENT_WEATHER_URL.to_string(),
            forecast_url: DEFAULT_FORECAST_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

/// Shared HTTP access to the current-weather and forecast services.
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    settings: Arc<ProviderSettings>,
}

impl WeatherProvider {
    pub fn new(settings: ProviderSettings) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            settings: Arc::new(settings),
        })
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// Resolve `city` to coordinates and current conditions.
    pub async fn current_by_name(&self, city: &str) -> Result<CurrentConditions, WeatherError> {
        geocode::current_by_name(&self.client, &self.settings, city).await
    }

    /// Today's hourly rain probabilities at `point`.
    pub async fn hourly_rain(&self, point: GeoPoint) -> Result<RainSeries, WeatherError> {
        forecast::hourly_rain(&self.client, &self.settings, point).await
    }
}
