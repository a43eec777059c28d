//! Hourly precipitation probability from Open-Meteo.

use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::provider::ProviderSettings;
use crate::types::{GeoPoint, RainSeries, WeatherError};

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    hourly: Option<HourlyBlock>,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    precipitation_probability: Vec<Option<u8>>,
}

/// Fetch today's hourly rain probabilities at `point`.
///
/// A missing `hourly` block yields an empty series. Non-2xx answers are
/// reported as [`WeatherError::PartialData`].
#[instrument(skip(client, settings), level = "debug")]
pub(crate) async fn hourly_rain(
    client: &Client,
    settings: &ProviderSettings,
    point: GeoPoint,
) -> Result<RainSeries, WeatherError> {
    let latitude = point.latitude.to_string();
    let longitude = point.longitude.to_string();

    let response = client
        .get(&settings.forecast_url)
        .query(&[
            ("latitude", latitude.as_str()),
            ("longitude", longitude.as_str()),
            ("hourly", "precipitation_probability"),
            ("forecast_days", "1"),
            ("timezone", "auto"),
        ])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(WeatherError::PartialData(format!(
            "forecast at {},{} returned {}",
            latitude, longitude, status
        )));
    }

    let body: ForecastResponse = response
        .json()
        .await
        .map_err(|e| WeatherError::Parse(format!("forecast: {}", e)))?;

    Ok(match body.hourly {
        Some(hourly) => RainSeries::new(hourly.time, hourly.precipitation_probability),
        None => RainSeries::default(),
    })
}
