//! YAML configuration for the pipeline (`config/config.yaml` under the data root).

use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    Parse(PathBuf, #[source] serde_yaml::Error),
}

/// A weather observation point to ingest, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WeatherPoint {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeatherConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub points: Vec<WeatherPoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GridConfig {
    #[serde(default = "default_cell_size_m")]
    pub cell_size_m: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size_m: default_cell_size_m(),
        }
    }
}

/// Outbound HTTP timeouts, threaded into the clients at construction time.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_weather_timeout_secs")]
    pub weather_timeout_secs: u64,
    #[serde(default = "default_geodata_timeout_secs")]
    pub geodata_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            weather_timeout_secs: default_weather_timeout_secs(),
            geodata_timeout_secs: default_geodata_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Place name passed to the geocoder. District-level names are more
    /// likely to resolve to a polygon than city names.
    pub place: String,
    pub weather: WeatherConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

impl Config {
    /// Loads `config/config.yaml` relative to `root`.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join("config").join("config.yaml");
        let raw =
            std::fs::read_to_string(&path).map_err(|e| ConfigError::Read(path.clone(), e))?;
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::Parse(path, e))
    }
}

fn default_cell_size_m() -> f64 {
    500.0
}

fn default_weather_timeout_secs() -> u64 {
    60
}

fn default_geodata_timeout_secs() -> u64 {
    180
}
