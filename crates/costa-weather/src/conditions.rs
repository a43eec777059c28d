//! Current conditions for every dashboard town.
//!
//! Fetched independently of the rain peaks: a town whose conditions fail
//! can still show its rain outlook, and the other way round.

use futures::future::join_all;
use std::collections::BTreeMap;

use crate::provider::WeatherProvider;
use crate::types::{TownConditions, WeatherError};

/// Conditions per configured town, with the failure kept for each one
pub type ConditionsSet = BTreeMap<String, Result<TownConditions, WeatherError>>;

/// One current-weather call per town, all in flight at once. Never cached.
pub async fn current_for_towns<S: AsRef<str>>(
    provider: &WeatherProvider,
    towns: &[S],
) -> ConditionsSet {
    let lookups = towns.iter().map(|town| async move {
        let town = town.as_ref();
        let conditions = provider
            .current_by_name(town)
            .await
            .map(|c| TownConditions::from_conditions(town, c));
        if let Err(e) = &conditions {
            tracing::warn!("Current conditions for {} unavailable: {}", town, e);
        }
        (town.to_string(), conditions)
    });

    join_all(lookups).await.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderSettings;
    use std::time::Duration;

    #[tokio::test]
    async fn test_empty_town_list_makes_no_calls() {
        let settings = ProviderSettings {
            current_weather_url: "http://127.0.0.1:9/weather".to_string(),
            timeout: Duration::from_secs(2),
            ..ProviderSettings::default()
        };
        let provider = WeatherProvider::new(settings).unwrap();
        let set = current_for_towns::<&str>(&provider, &[]).await;
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_service_keeps_error_per_town() {
        let settings = ProviderSettings {
            current_weather_url: "http://127.0.0.1:9/weather".to_string(),
            timeout: Duration::from_secs(2),
            ..ProviderSettings::default()
        };
        let provider = WeatherProvider::new(settings).unwrap();
        let set = current_for_towns(&provider, &["Sisal", "Chelem"]).await;
        assert_eq!(set.len(), 2);
        assert!(matches!(set["Sisal"], Err(WeatherError::Network(_))));
        assert!(set["Chelem"].is_err());
    }
}
