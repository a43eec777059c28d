use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

pub use costa_weather::HourFormat;

use crate::error::ConfigError;

/// Environment variable that overrides `weather.api_key`.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    #[serde(skip, default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Upstream weather providers
    #[serde(default)]
    pub weather: WeatherConfig,

    /// Towns shown on the dashboard
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherConfig {
    /// OpenWeather API key. `OPENWEATHER_API_KEY` takes precedence.
    #[serde(default)]
    pub api_key: String,

    /// Country qualifier appended to every city query (ISO 3166 alpha-2)
    #[serde(default = "default_country")]
    pub country: String,

    /// Language for weather descriptions
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_current_weather_url")]
    pub current_weather_url: String,

    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// How long a resolved rain peak stays fresh
    #[serde(default = "default_cache_minutes")]
    pub cache_minutes: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Clock style for the peak-rain hour in search results. Dashboard
    /// cards always use `HourFormat::default()` (24-hour).
    #[serde(default = "default_search_hour_format")]
    pub search_hour_format: HourFormat,
}

fn default_country() -> String {
    "mx".to_string()
}

fn default_language() -> String {
    "es".to_string()
}

fn default_current_weather_url() -> String {
    "https://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".to_string()
}

fn default_cache_minutes() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_search_hour_format() -> HourFormat {
    HourFormat::TwelveHour
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            country: default_country(),
            language: default_language(),
            current_weather_url: default_current_weather_url(),
            forecast_url: default_forecast_url(),
            cache_minutes: default_cache_minutes(),
            request_timeout_secs: default_request_timeout_secs(),
            search_hour_format: default_search_hour_format(),
        }
    }
}

impl WeatherConfig {
    /// Check if an API key is present (not a placeholder)
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty() && !self.api_key.starts_with("YOUR_")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_cities")]
    pub cities: Vec<String>,
}

fn default_title() -> String {
    "Climas en Puertos Yucatecos".to_string()
}

fn default_cities() -> Vec<String> {
    ["Celestun", "Chelem", "Progreso", "Chicxulub", "Telchac"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            cities: default_cities(),
        }
    }
}

fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("costa")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            weather: WeatherConfig::default(),
            dashboard: DashboardConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the user config directory, creating a default
    /// file if it doesn't exist. Environment overrides are applied afterwards.
    pub fn load() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| ConfigError::MissingSetting("user config directory".to_string()))?
            .join("costa");
        let mut config = Self::load_from(&config_dir)?;
        config.apply_env();
        Ok(config)
    }

    /// Load configuration from `<config_dir>/config.toml`.
    pub fn load_from(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join("config.toml");

        if !config_path.exists() {
            let config = Self {
                config_dir: config_dir.to_path_buf(),
                ..Self::default()
            };
            config.save()?;
            return Ok(config);
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", config_path.display(), e)))?;
        config.config_dir = config_dir.to_path_buf();

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns an error if validation fails with critical errors; warnings
    /// are logged.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()).into());
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Replace file settings with values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_api_key(std::env::var(API_KEY_ENV).ok());
    }

    fn apply_api_key(&mut self, key: Option<String>) {
        if let Some(key) = key.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using API key from {}", API_KEY_ENV);
            self.weather.api_key = key;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        self.validate_url(
            &self.weather.current_weather_url,
            "weather.current_weather_url",
            &mut result,
        );
        self.validate_url(&self.weather.forecast_url, "weather.forecast_url", &mut result);

        if !self.weather.has_api_key() {
            result.add_warning(
                "weather.api_key",
                format!(
                    "No OpenWeather API key configured (set {}); lookups will fail",
                    API_KEY_ENV
                ),
            );
        }

        if self.weather.country.trim().is_empty() {
            result.add_error("weather.country", "Country qualifier must not be empty");
        }

        if self.weather.cache_minutes == 0 {
            result.add_warning(
                "weather.cache_minutes",
                "Rain cache disabled (0 minutes)",
            );
        } else if self.weather.cache_minutes > 1440 {
            result.add_warning(
                "weather.cache_minutes",
                "Rain cache window is more than 24 hours",
            );
        }

        if self.weather.request_timeout_secs == 0 {
            result.add_error(
                "weather.request_timeout_secs",
                "Request timeout must be greater than 0",
            );
        }

        if self.dashboard.cities.is_empty() {
            result.add_warning("dashboard.cities", "No cities configured");
        } else if self.dashboard.cities.iter().any(|c| c.trim().is_empty()) {
            result.add_error("dashboard.cities", "City names must not be blank");
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to `<config_dir>/config.toml`
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.config_dir).context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(self.config_dir.join("config.toml"), contents)
            .context("Failed to write config file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyed() -> Config {
        let mut config = Config::default();
        config.weather.api_key = "abc123".to_string();
        config
    }

    #[test]
    fn test_valid_default_config() {
        let result = keyed().validate();
        assert!(result.is_valid(), "Default config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_missing_api_key_is_warning() {
        let result = Config::default().validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "weather.api_key"));
    }

    #[test]
    fn test_invalid_url() {
        let mut config = keyed();
        config.weather.forecast_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "weather.forecast_url"));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = keyed();
        config.weather.current_weather_url = "ftp://localhost:8080".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_timeout_is_error() {
        let mut config = keyed();
        config.weather.request_timeout_secs = 0;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_blank_city_is_error() {
        let mut config = keyed();
        config.dashboard.cities.push("  ".to_string());
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "dashboard.cities"));
    }

    #[test]
    fn test_env_key_overrides_file() {
        let mut config = keyed();
        config.apply_api_key(Some("from-env".to_string()));
        assert_eq!(config.weather.api_key, "from-env");

        config.apply_api_key(Some("   ".to_string()));
        assert_eq!(config.weather.api_key, "from-env");
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path()).unwrap();
        assert!(dir.path().join("config.toml").exists());
        assert_eq!(config.weather.cache_minutes, 10);
        assert_eq!(config.dashboard.cities.len(), 5);
        assert_eq!(config.weather.search_hour_format, HourFormat::TwelveHour);
    }

    #[test]
    fn test_search_format_default_differs_from_cards() {
        let weather = WeatherConfig::default();
        assert_eq!(weather.search_hour_format, HourFormat::TwelveHour);
        assert_eq!(HourFormat::default(), HourFormat::TwentyFourHour);

        let saved = toml::to_string(&weather).unwrap();
        assert!(saved.contains("search_hour_format = \"twelve_hour\""));
    }

    #[test]
    fn test_load_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.toml"),
            "[weather]\ncountry = \"us\"\nsearch_hour_format = \"twenty_four_hour\"\n",
        )
        .unwrap();

        let config = Config::load_from(dir.path()).unwrap();
        assert_eq!(config.weather.country, "us");
        assert_eq!(config.weather.language, "es");
        assert_eq!(config.weather.search_hour_format, HourFormat::TwentyFourHour);
        assert_eq!(config.dashboard.cities[2], "Progreso");
        assert_eq!(config.config_dir, dir.path());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.toml"), "[weather\ncountry = ").unwrap();

        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConfigError>(),
            Some(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
