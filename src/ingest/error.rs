use crate::snapshots::SnapshotError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Failed to build HTTP client")]
    ClientBuild(#[source] reqwest::Error),

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to decode JSON response from {0}")]
    JsonDecode(String, #[source] reqwest::Error),

    #[error("Failed to parse timestamp '{value}' from weather response")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("Weather API returned no hourly data for point ({lat}, {lon})")]
    EmptyWeather { lat: f64, lon: f64 },

    #[error("Weather API returned {times} timestamps but {values} precipitation values for point ({lat}, {lon})")]
    MismatchedHourlyArrays {
        lat: f64,
        lon: f64,
        times: usize,
        values: usize,
    },

    #[error("No weather points configured; nothing to ingest")]
    NoPointsConfigured,

    #[error("Geocoder returned no result for place '{0}'")]
    PlaceNotFound(String),

    #[error("Expected Polygon/MultiPolygon for place '{place}', got {geometry_type}")]
    UnexpectedGeometry {
        place: String,
        geometry_type: String,
    },

    #[error("Failed to convert geocoder geometry: {0}")]
    GeometryConversion(String),

    #[error("Road network query returned no ways, even with the unrestricted filter")]
    EmptyRoadNetwork,

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("I/O error writing parquet file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing parquet file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to write file '{0}'")]
    FileWrite(PathBuf, #[source] std::io::Error),
}
