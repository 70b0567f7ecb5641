use crate::snapshots::SnapshotError;
use polars::error::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Failed to read grid file '{0}'")]
    GridRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse grid GeoJSON '{0}'")]
    GridParse(PathBuf, #[source] geojson::Error),

    #[error("Grid feature {index} in '{path}' is missing grid_id/centroid properties")]
    GridProperties { path: PathBuf, index: usize },

    #[error("Failed to scan parquet file '{0}'")]
    ParquetScan(PathBuf, #[source] PolarsError),

    #[error("I/O error writing parquet file '{0}'")]
    ParquetWriteIo(PathBuf, #[source] std::io::Error),

    #[error("Encoding error writing parquet file '{0}'")]
    ParquetWritePolars(PathBuf, #[source] PolarsError),

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Weather table contains no observation points")]
    NoStations,

    #[error("Weather row {row} has a null station coordinate")]
    NullStationCoordinate { row: usize },

    #[error("Grid row {row} has a null centroid coordinate")]
    NullCellCentroid { row: usize },

    #[error("Weather row {row} does not match any discovered station")]
    StationLookup { row: usize },

    #[error("Found {count} rows with missing rain_mm after the join. Sample:\n{sample}")]
    MissingRain { count: usize, sample: String },
}
