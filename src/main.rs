use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

use costa_core::{AppError, Config, ReqwestErrorExt};
use costa_weather::{
    current_for_towns, CitySearch, ProviderSettings, RainAggregator, RainPeak, SearchOutcome,
    SearchRecord, TownConditions, WeatherError, WeatherProvider,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    costa_core::init()?;

    let (config, _) = Config::load_validated()?;
    tracing::debug!("Config directory: {}", config.config_dir.display());

    let provider = Arc::new(WeatherProvider::new(provider_settings(&config))?);

    let ttl = Duration::from_secs(u64::from(config.weather.cache_minutes) * 60);
    let aggregator = RainAggregator::new(provider.clone(), ttl);
    aggregator.resolve_all(&config.dashboard.cities);

    println!("Cargando datos meteorológicos...");
    let conditions = current_for_towns(&provider, &config.dashboard.cities).await;
    let snapshot = aggregator.settled().await;

    println!("\n{}", config.dashboard.title);
    for city in &config.dashboard.cities {
        let current = conditions.get(city).and_then(|c| c.as_ref().ok());
        let peak = snapshot.result.get(city).and_then(Option::as_ref);
        for line in card_lines(city, current, peak) {
            println!("{}", line);
        }
    }

    if let Some(term) = std::env::args().nth(1) {
        let search = CitySearch::new(provider, config.weather.search_hour_format);
        match search.search(&term).await {
            SearchOutcome::Found(record) => {
                for line in search_lines(&record) {
                    println!("{}", line);
                }
            }
            SearchOutcome::Failed(e) => {
                let err = into_app_error(e);
                tracing::error!("Search failed: {}", err);
                println!("\n{}\n  {}", err.user_message(), err);
            }
            SearchOutcome::Skipped | SearchOutcome::Superseded => {}
        }
    }

    Ok(())
}

fn provider_settings(config: &Config) -> ProviderSettings {
    let weather = &config.weather;
    ProviderSettings {
        api_key: weather.api_key.clone(),
        country: weather.country.clone(),
        language: weather.language.clone(),
        current_weather_url: weather.current_weather_url.clone(),
        forecast_url: weather.forecast_url.clone(),
        timeout: Duration::from_secs(weather.request_timeout_secs),
    }
}

fn card_lines(
    city: &str,
    current: Option<&TownConditions>,
    peak: Option<&RainPeak>,
) -> Vec<String> {
    let mut lines = vec![format!("\n  {}", city)];

    match current {
        Some(c) => {
            let temp = c
                .temperature_c
                .map(|t| format!("{:.0} °C", t))
                .unwrap_or_else(|| "-- °C".to_string());
            lines.push(format!(
                "    {}  {}",
                c.description.as_deref().unwrap_or_default(),
                temp
            ));
            if let Some(wind) = c.wind_speed_kmh {
                lines.push(format!("    Viento: {:.0} km/h", wind));
            }
        }
        None => lines.push("    Clima actual no disponible".to_string()),
    }

    match peak {
        Some(peak) => {
            let hour = peak
                .hour_label
                .as_deref()
                .map(|h| format!(" a las {}", h))
                .unwrap_or_default();
            lines.push(format!(
                "    Probabilidad de lluvia max.: {}%{}",
                peak.probability, hour
            ));
            lines.push(format!("    {}", peak.outlook().card_message()));
        }
        None => lines.push("    Probabilidad de lluvia: N/A".to_string()),
    }

    lines
}

fn search_lines(record: &SearchRecord) -> Vec<String> {
    let mut lines = vec![format!("\n{} ({})", record.name, record.country_code)];
    if let Some(temp) = record.temperature_c {
        lines.push(format!(
            "  {:.0}°C  {}",
            temp,
            record.description.as_deref().unwrap_or_default()
        ));
    }
    if let Some(wind) = record.wind_speed_kmh {
        lines.push(format!("  Viento: {:.0} km/h", wind));
    }
    lines.push(format!("  Lluvia: {}%", record.rain_probability));
    lines.push(format!("  {}", record.outlook().message()));
    lines
}

fn into_app_error(err: WeatherError) -> AppError {
    match err {
        WeatherError::Network(e) => AppError::Network(e.into_network_error()),
        other => AppError::Weather(other.to_string()),
    }
}
