mod config;
mod error;
mod grid;
mod ingest;
mod layout;
mod snapshots;
mod table;

pub use error::PipelineError;

pub use config::{Config, ConfigError, GridConfig, HttpConfig, WeatherConfig, WeatherPoint};
pub use layout::DataLayout;
pub use snapshots::{latest_snapshot, new_snapshot, today_snapshot_id, SnapshotError};

pub use grid::builder::{build_grid, GridCell};
pub use grid::error::GridError;
pub use grid::mercator;
pub use grid::{load_boundary, run_build_grid, write_grid};

pub use ingest::error::IngestError;
pub use ingest::geodata::{run_ingest_geodata, GeodataClient};
pub use ingest::weather::{run_ingest_weather, WeatherClient};

pub use table::error::TableError;
pub use table::join::join_grid_weather;
pub use table::run_build_table;
pub use table::stations::{discover_stations, StationIndex, StationPoint};
