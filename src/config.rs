//! Configuration management for the `Where2Meet` engine
//!
//! Handles loading configuration from files, environment variables,
//! and provides validation for all configuration settings.

use crate::Where2MeetError;
use crate::models::GeoPoint;
use crate::providers::{RouteType, TravelMode};
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable read when no key is configured under `azure`
pub const SUBSCRIPTION_KEY_ENV: &str = "AZURE_MAPS_KEY";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Where2MeetConfig {
    /// Azure Maps provider settings
    #[serde(default)]
    pub azure: AzureConfig,
    /// Time budget policy
    #[serde(default)]
    pub budget: BudgetConfig,
    /// Routing preferences
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Settlement search settings
    #[serde(default)]
    pub search: SearchConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Azure Maps API configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureConfig {
    /// Subscription key shared by the route and search services
    pub subscription_key: Option<String>,
    /// Base URL for the Azure Maps REST API
    #[serde(default = "default_azure_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Timeout for each provider call in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u32,
}

/// Isochrone time budget policy.
///
/// Each side gets `ceil(travel_time * travel_fraction) + buffer_seconds`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_travel_fraction")]
    pub travel_fraction: f64,
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub travel_mode: TravelMode,
    #[serde(default)]
    pub route_type: RouteType,
}

/// Settlement search configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Place categories, queried in this order
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    /// Result cap per category
    #[serde(default = "default_search_limit")]
    pub limit: u32,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (pretty or json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Map center when no location is known
    #[serde(default = "default_fallback_center")]
    pub fallback_center: GeoPoint,
}

// Default value functions
fn default_azure_base_url() -> String {
    "https://atlas.microsoft.com".to_string()
}

fn default_api_version() -> String {
    "1.0".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_travel_fraction() -> f64 {
    0.5
}

fn default_buffer_seconds() -> u64 {
    900
}

fn default_categories() -> Vec<String> {
    ["city", "town", "village", "populated place"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_search_limit() -> u32 {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_fallback_center() -> GeoPoint {
    GeoPoint::new(37.7749, -122.4194)
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            subscription_key: None,
            base_url: default_azure_base_url(),
            api_version: default_api_version(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            travel_fraction: default_travel_fraction(),
            buffer_seconds: default_buffer_seconds(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            categories: default_categories(),
            limit: default_search_limit(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            fallback_center: default_fallback_center(),
        }
    }
}

impl Where2MeetConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path(None)
    }

    /// Load configuration from specified path
    pub fn load_from_path(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| {
            Self::get_config_path().unwrap_or_else(|| PathBuf::from("config.toml"))
        });

        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        // WHERE2MEET_AZURE__SUBSCRIPTION_KEY and friends
        builder = builder.add_source(
            Environment::with_prefix("WHERE2MEET")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let mut config: Where2MeetConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.apply_defaults();
        config.validate()?;

        Ok(config)
    }

    /// Get the default configuration file path
    #[must_use]
    pub fn get_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("where2meet").join("config.toml"))
    }

    /// Apply default values to missing configuration fields
    pub fn apply_defaults(&mut self) {
        if self.azure.subscription_key.is_none() {
            self.azure.subscription_key = std::env::var(SUBSCRIPTION_KEY_ENV)
                .ok()
                .filter(|key| !key.trim().is_empty());
        }
        if self.azure.base_url.is_empty() {
            self.azure.base_url = default_azure_base_url();
        }
        if self.azure.api_version.is_empty() {
            self.azure.api_version = default_api_version();
        }
        if self.azure.timeout_seconds == 0 {
            self.azure.timeout_seconds = default_timeout();
        }
        if self.search.categories.is_empty() {
            self.search.categories = default_categories();
        }
        if self.search.limit == 0 {
            self.search.limit = default_search_limit();
        }
        if self.logging.level.is_empty() {
            self.logging.level = default_log_level();
        }
        if self.logging.format.is_empty() {
            self.logging.format = default_log_format();
        }
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.validate_api_keys()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// A missing key is allowed here; provider calls reject it later
    pub fn validate_api_keys(&self) -> Result<()> {
        if let Some(key) = &self.azure.subscription_key
            && key.trim().is_empty()
        {
            return Err(Where2MeetError::config(
                "Azure Maps subscription key cannot be empty if provided. Either remove it or provide a valid key.",
            )
            .into());
        }
        Ok(())
    }

    fn validate_numeric_ranges(&self) -> Result<()> {
        if self.azure.timeout_seconds > 300 {
            return Err(
                Where2MeetError::config("Provider timeout cannot exceed 300 seconds").into(),
            );
        }

        let fraction = self.budget.travel_fraction;
        if !fraction.is_finite() || fraction <= 0.0 || fraction > 4.0 {
            return Err(Where2MeetError::config(format!(
                "Budget travel fraction must be in (0, 4], got {fraction}"
            ))
            .into());
        }

        if self.budget.buffer_seconds > 86_400 {
            return Err(
                Where2MeetError::config("Budget buffer cannot exceed 86400 seconds").into(),
            );
        }

        if !(1..=100).contains(&self.search.limit) {
            return Err(
                Where2MeetError::config("Search limit must be between 1 and 100").into(),
            );
        }

        if !self.defaults.fallback_center.is_valid() {
            return Err(Where2MeetError::config(format!(
                "Fallback center {} is not a valid coordinate",
                self.defaults.fallback_center
            ))
            .into());
        }

        Ok(())
    }

    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.logging.level.as_str()) {
            return Err(Where2MeetError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "json"];
        if !valid_log_formats.contains(&self.logging.format.as_str()) {
            return Err(Where2MeetError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.logging.format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        if !self.azure.base_url.starts_with("http://")
            && !self.azure.base_url.starts_with("https://")
        {
            return Err(Where2MeetError::config(
                "Azure Maps base URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        if self.search.categories.iter().any(|c| c.trim().is_empty()) {
            return Err(Where2MeetError::config("Search categories cannot be blank").into());
        }

        Ok(())
    }
}
