use serde::{Deserialize, Serialize};

const ICON_BASE_URL: &str = "https://openweathermap.org/img/wn";

/// Probability above which a day is flagged as rainy
pub const RAIN_ALERT_THRESHOLD: u8 = 50;

/// Clock style used when labelling the peak-rain hour.
///
/// Dashboard cards use the default; search results follow configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HourFormat {
    /// `14:00`
    #[default]
    TwentyFourHour,
    /// `02:00 p.m.`
    TwelveHour,
}

/// Geographic coordinates resolved from a city name
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions for a city, as reported by the current-weather call.
///
/// Only `point` is guaranteed; every other field is whatever the provider
/// chose to include.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub name: Option<String>,
    pub point: GeoPoint,
    pub temperature_c: Option<f64>,
    pub description: Option<String>,
    pub icon_code: Option<String>,
    pub wind_speed_ms: Option<f64>,
    pub country_code: Option<String>,
}

/// One day of hourly precipitation probabilities, in provider order.
///
/// Timestamps and probabilities are kept as the provider's parallel arrays;
/// a missing timestamp or a `null` probability is preserved as-is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RainSeries {
    pub times: Vec<String>,
    pub probabilities: Vec<Option<u8>>,
}

impl RainSeries {
    pub fn new(times: Vec<String>, probabilities: Vec<Option<u8>>) -> Self {
        Self {
            times,
            probabilities,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }
}

/// Highest rain probability of the day and the hour it occurs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RainPeak {
    pub probability: u8,
    pub hour_label: Option<String>,
}

impl RainPeak {
    /// Peak rebuilt from a cache hit. The cache only keeps the probability,
    /// so the hour is never available here.
    pub fn cached(probability: u8) -> Self {
        Self {
            probability,
            hour_label: None,
        }
    }

    pub fn outlook(&self) -> RainOutlook {
        RainOutlook::from_peak(self.probability, self.hour_label.as_deref())
    }
}

/// Short verdict shown under a forecast
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RainOutlook {
    PossibleRain { at: Option<String> },
    Clear,
}

impl RainOutlook {
    pub fn from_peak(probability: u8, hour: Option<&str>) -> Self {
        if probability > RAIN_ALERT_THRESHOLD {
            Self::PossibleRain {
                at: hour.map(str::to_string),
            }
        } else {
            Self::Clear
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::PossibleRain { at: Some(hour) } => format!("Posible lluvia a las {}", hour),
            Self::PossibleRain { at: None } => "Posible lluvia".to_string(),
            Self::Clear => "Día despejado".to_string(),
        }
    }

    /// Wording used on the per-town dashboard cards
    pub fn card_message(&self) -> String {
        match self {
            Self::Clear => "No lloverá".to_string(),
            rain => rain.message(),
        }
    }
}

/// Current conditions shown on a dashboard card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TownConditions {
    pub town: String,
    pub temperature_c: Option<f64>,
    pub description: Option<String>,
    pub wind_speed_kmh: Option<f64>,
    pub icon_code: Option<String>,
}

impl TownConditions {
    /// Cards are titled with the configured town, not the provider's name.
    pub fn from_conditions(town: &str, conditions: CurrentConditions) -> Self {
        Self {
            town: town.to_string(),
            temperature_c: conditions.temperature_c,
            description: conditions.description,
            wind_speed_kmh: conditions.wind_speed_ms.map(|ms| ms * 3.6),
            icon_code: conditions.icon_code,
        }
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon_code.as_deref().map(icon_url)
    }
}

fn icon_url(icon: &str) -> String {
    format!("{}/{}@4x.png", ICON_BASE_URL, icon)
}

/// Flattened result of a single-city search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub name: String,
    pub temperature_c: Option<f64>,
    pub description: Option<String>,
    pub wind_speed_kmh: Option<f64>,
    pub icon_code: Option<String>,
    pub rain_probability: u8,
    pub rain_hour: Option<String>,
    pub country_code: String,
}

impl SearchRecord {
    /// Merge current conditions with the day's rain peak.
    ///
    /// `queried` and `default_country` fill in what the provider left out.
    pub fn merge(
        queried: &str,
        conditions: CurrentConditions,
        peak: RainPeak,
        default_country: &str,
    ) -> Self {
        Self {
            name: conditions.name.unwrap_or_else(|| queried.to_string()),
            temperature_c: conditions.temperature_c,
            description: conditions.description,
            // m/s -> km/h
            wind_speed_kmh: conditions.wind_speed_ms.map(|ms| ms * 3.6),
            icon_code: conditions.icon_code,
            rain_probability: peak.probability,
            rain_hour: peak.hour_label,
            country_code: conditions
                .country_code
                .unwrap_or_else(|| default_country.to_uppercase()),
        }
    }

    pub fn icon_url(&self) -> Option<String> {
        self.icon_code.as_deref().map(icon_url)
    }

    pub fn outlook(&self) -> RainOutlook {
        RainOutlook::from_peak(self.rain_probability, self.rain_hour.as_deref())
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("city not found: {0}")]
    NotFound(String),
    #[error("Forecast unavailable: {0}")]
    PartialData(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Request cancelled")]
    Cancelled,
}

impl WeatherError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => "Network error. Check your connection.".to_string(),
            Self::NotFound(city) => format!("City \"{}\" not found", city),
            Self::PartialData(_) => "Rain forecast unavailable".to_string(),
            Self::Parse(_) => "Unexpected response from the weather service".to_string(),
            Self::Cancelled => "Request cancelled".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conditions() -> CurrentConditions {
        CurrentConditions {
            name: Some("Progreso".to_string()),
            point: GeoPoint {
                latitude: 21.28,
                longitude: -89.66,
            },
            temperature_c: Some(29.4),
            description: Some("nubes dispersas".to_string()),
            icon_code: Some("03d".to_string()),
            wind_speed_ms: Some(5.0),
            country_code: None,
        }
    }

    #[test]
    fn test_outlook_threshold_is_exclusive() {
        assert_eq!(RainOutlook::from_peak(50, Some("14:00")), RainOutlook::Clear);
        assert_eq!(
            RainOutlook::from_peak(51, Some("14:00")),
            RainOutlook::PossibleRain {
                at: Some("14:00".to_string())
            }
        );
    }

    #[test]
    fn test_outlook_messages() {
        assert_eq!(
            RainOutlook::from_peak(90, Some("02:00")).message(),
            "Posible lluvia a las 02:00"
        );
        assert_eq!(RainOutlook::from_peak(90, None).message(), "Posible lluvia");
        assert_eq!(RainOutlook::Clear.message(), "Día despejado");
    }

    #[test]
    fn test_cached_peak_has_no_hour() {
        let peak = RainPeak::cached(70);
        assert_eq!(peak.probability, 70);
        assert_eq!(peak.hour_label, None);
    }

    #[test]
    fn test_merge_converts_wind_and_defaults_country() {
        let peak = RainPeak {
            probability: 60,
            hour_label: Some("03:00 p.m.".to_string()),
        };
        let record = SearchRecord::merge("progreso", conditions(), peak, "mx");

        assert_eq!(record.name, "Progreso");
        assert_eq!(record.wind_speed_kmh, Some(18.0));
        assert_eq!(record.country_code, "MX");
        assert_eq!(record.rain_probability, 60);
        assert_eq!(
            record.icon_url().as_deref(),
            Some("https://openweathermap.org/img/wn/03d@4x.png")
        );
    }

    #[test]
    fn test_merge_falls_back_to_queried_name() {
        let mut c = conditions();
        c.name = None;
        c.icon_code = None;
        let record = SearchRecord::merge("Sisal", c, RainPeak::default(), "mx");
        assert_eq!(record.name, "Sisal");
        assert_eq!(record.icon_url(), None);
        assert_eq!(record.outlook(), RainOutlook::Clear);
    }

    #[test]
    fn test_card_wording_for_clear_day() {
        assert_eq!(RainOutlook::from_peak(20, None).card_message(), "No lloverá");
        assert_eq!(
            RainOutlook::from_peak(75, Some("16:00")).card_message(),
            "Posible lluvia a las 16:00"
        );
    }

    #[test]
    fn test_town_conditions_keep_configured_name() {
        let card = TownConditions::from_conditions("Puerto Progreso", conditions());
        assert_eq!(card.town, "Puerto Progreso");
        assert_eq!(card.wind_speed_kmh, Some(18.0));
        assert_eq!(card.description.as_deref(), Some("nubes dispersas"));
        assert_eq!(
            card.icon_url().as_deref(),
            Some("https://openweathermap.org/img/wn/03d@4x.png")
        );
    }

    #[test]
    fn test_not_found_message_names_city() {
        let err = WeatherError::NotFound("Merida".to_string());
        assert_eq!(err.to_string(), "city not found: Merida");
        assert!(err.user_message().contains("Merida"));
    }
}
