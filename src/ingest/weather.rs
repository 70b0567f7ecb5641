//! Hourly precipitation ingestion from the Open-Meteo archive API.

use crate::config::Config;
use crate::ingest::error::IngestError;
use crate::layout::{DataLayout, WEATHER_FILE};
use crate::snapshots::{new_snapshot, today_snapshot_id};
use chrono::{NaiveDate, NaiveDateTime};
use log::info;
use polars::prelude::*;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
const TIMEZONE: &str = "Asia/Kolkata";

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    #[serde(default)]
    hourly: Option<HourlyBlock>,
}

/// Parallel arrays as returned by the archive endpoint.
#[derive(Debug, Default, Deserialize)]
struct HourlyBlock {
    #[serde(default)]
    time: Vec<String>,
    #[serde(default)]
    precipitation: Vec<Option<f64>>,
}

/// Open-Meteo client. The request timeout is an explicit constructor
/// argument; there is no process-global setting.
pub struct WeatherClient {
    client: reqwest::Client,
}

impl WeatherClient {
    pub fn new(timeout: Duration) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IngestError::ClientBuild)?;
        Ok(Self { client })
    }

    /// Fetches the hourly precipitation series for one point as a DataFrame
    /// with columns `timestamp`, `lat`, `lon`, `rain_mm`. An empty response
    /// is fatal.
    pub async fn fetch_point(
        &self,
        lat: f64,
        lon: f64,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DataFrame, IngestError> {
        let response = self
            .client
            .get(ARCHIVE_URL)
            .query(&[
                ("latitude", lat.to_string()),
                ("longitude", lon.to_string()),
                ("start_date", start.format("%Y-%m-%d").to_string()),
                ("end_date", end.format("%Y-%m-%d").to_string()),
                ("hourly", "precipitation".to_string()),
                ("timezone", TIMEZONE.to_string()),
            ])
            .send()
            .await
            .map_err(|e| IngestError::NetworkRequest(ARCHIVE_URL.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(if let Some(status) = e.status() {
                    IngestError::HttpStatus {
                        url: ARCHIVE_URL.to_string(),
                        status,
                        source: e,
                    }
                } else {
                    IngestError::NetworkRequest(ARCHIVE_URL.to_string(), e)
                });
            }
        };

        let body: ArchiveResponse = response
            .json()
            .await
            .map_err(|e| IngestError::JsonDecode(ARCHIVE_URL.to_string(), e))?;
        hourly_to_frame(lat, lon, body.hourly.unwrap_or_default())
    }
}

/// Builds the per-point DataFrame. Timestamps parse to timezone-naive
/// datetimes. The time and precipitation arrays are parallel; a length
/// mismatch means a malformed response and aborts before anything is
/// persisted.
fn hourly_to_frame(lat: f64, lon: f64, hourly: HourlyBlock) -> Result<DataFrame, IngestError> {
    if hourly.time.is_empty() {
        return Err(IngestError::EmptyWeather { lat, lon });
    }
    if hourly.precipitation.len() != hourly.time.len() {
        return Err(IngestError::MismatchedHourlyArrays {
            lat,
            lon,
            times: hourly.time.len(),
            values: hourly.precipitation.len(),
        });
    }

    let mut timestamps = Vec::with_capacity(hourly.time.len());
    for value in &hourly.time {
        let parsed = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M").map_err(|e| {
            IngestError::TimestampParse {
                value: value.clone(),
                source: e,
            }
        })?;
        timestamps.push(parsed.and_utc().timestamp_millis());
    }

    let n = timestamps.len();
    let rain = hourly.precipitation;

    let timestamp = Column::new("timestamp".into(), timestamps)
        .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))?;
    DataFrame::new(vec![
        timestamp,
        Column::new("lat".into(), vec![lat; n]),
        Column::new("lon".into(), vec![lon; n]),
        Column::new("rain_mm".into(), rain),
    ])
    .map_err(IngestError::from)
}

/// Fetches every configured point, concatenates, and writes one
/// `weather.parquet` into a new dated snapshot.
pub async fn run_ingest_weather(root: &Path, config: &Config) -> Result<(), IngestError> {
    if config.weather.points.is_empty() {
        return Err(IngestError::NoPointsConfigured);
    }
    let client = WeatherClient::new(Duration::from_secs(config.http.weather_timeout_secs))?;

    let mut combined: Option<DataFrame> = None;
    for point in &config.weather.points {
        info!("Fetching weather for ({}, {})", point.lat, point.lon);
        let frame = client
            .fetch_point(point.lat, point.lon, config.weather.start, config.weather.end)
            .await?;
        combined = Some(match combined {
            Some(acc) => acc.vstack(&frame)?,
            None => frame,
        });
    }
    // The points list was checked above, so at least one frame exists.
    let Some(mut out) = combined else {
        return Err(IngestError::NoPointsConfigured);
    };

    let layout = DataLayout::new(root);
    let snapshot_dir = new_snapshot(&layout.weather_base(), &today_snapshot_id())?;
    let outpath = snapshot_dir.join(WEATHER_FILE);
    let file = std::fs::File::create(&outpath)
        .map_err(|e| IngestError::ParquetWriteIo(outpath.clone(), e))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut out)
        .map_err(|e| IngestError::ParquetWritePolars(outpath.clone(), e))?;

    info!("Saved: {}", outpath.display());
    info!("Rows: {}", out.height());
    info!("Columns: {:?}", out.get_column_names());
    Ok(())
}
