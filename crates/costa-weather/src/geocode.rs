//! Forward geocoding through the OpenWeather current-weather endpoint.
//!
//! The call resolves a city name to coordinates and, as a side effect,
//! returns the current conditions used by city search.

use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

use crate::provider::ProviderSettings;
use crate::types::{CurrentConditions, GeoPoint, WeatherError};

#[derive(Debug, Deserialize)]
struct CurrentWeatherResponse {
    coord: Coord,
    name: Option<String>,
    main: Option<MainBlock>,
    #[serde(default)]
    weather: Vec<ConditionBlock>,
    wind: Option<WindBlock>,
    sys: Option<SysBlock>,
}

#[derive(Debug, Deserialize)]
struct Coord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct MainBlock {
    temp: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ConditionBlock {
    description: Option<String>,
    icon: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WindBlock {
    speed: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct SysBlock {
    country: Option<String>,
}

impl From<CurrentWeatherResponse> for CurrentConditions {
    fn from(resp: CurrentWeatherResponse) -> Self {
        let first = resp.weather.into_iter().next();
        let (description, icon_code) = match first {
            Some(c) => (c.description, c.icon),
            None => (None, None),
        };

        Self {
            name: resp.name,
            point: GeoPoint {
                latitude: resp.coord.lat,
                longitude: resp.coord.lon,
            },
            temperature_c: resp.main.and_then(|m| m.temp),
            description,
            icon_code,
            wind_speed_ms: resp.wind.and_then(|w| w.speed),
            country_code: resp.sys.and_then(|s| s.country),
        }
    }
}

/// Look up current conditions (and coordinates) for `city`.
///
/// Any non-2xx answer is reported as [`WeatherError::NotFound`].
#[instrument(skip(client, settings), level = "debug")]
pub(crate) async fn current_by_name(
    client: &Client,
    settings: &ProviderSettings,
    city: &str,
) -> Result<CurrentConditions, WeatherError> {
    let query = format!("{},{}", city, settings.country);

    let response = client
        .get(&settings.current_weather_url)
        .query(&[
            ("q", query.as_str()),
            ("appid", settings.api_key.as_str()),
            ("units", "metric"),
            ("lang", settings.language.as_str()),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        tracing::debug!("Current weather for {} returned status {}", city, response.status());
        return Err(WeatherError::NotFound(city.to_string()));
    }

    let body: CurrentWeatherResponse = response
        .json()
        .await
        .map_err(|e| WeatherError::Parse(format!("current weather for {}: {}", city, e)))?;

    Ok(body.into())
}
