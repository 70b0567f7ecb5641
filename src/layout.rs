//! Filesystem layout of raw snapshots and processed artifacts, all relative
//! to a single data root directory.

use std::path::{Path, PathBuf};

pub const BOUNDARY_FILE: &str = "boundary.geojson";
pub const ROADS_FILE: &str = "roads.graphml";
pub const WEATHER_FILE: &str = "weather.parquet";
pub const GRID_HOUR_FILE: &str = "grid_hour.parquet";

/// Resolves every path the pipeline reads or writes.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Base directory holding dated geodata snapshots.
    pub fn geodata_base(&self) -> PathBuf {
        self.root.join("data").join("raw").join("geodata")
    }

    /// Base directory holding dated weather snapshots.
    pub fn weather_base(&self) -> PathBuf {
        self.root.join("data").join("raw").join("weather")
    }

    pub fn grids_dir(&self) -> PathBuf {
        self.root.join("data").join("processed").join("grids")
    }

    pub fn tables_dir(&self) -> PathBuf {
        self.root.join("data").join("processed").join("tables")
    }

    /// Grid artifact for a given cell size, e.g. `grid_500m.geojson`.
    /// Fractional sizes round to the nearest meter rather than truncating.
    pub fn grid_file(&self, cell_size_m: f64) -> PathBuf {
        self.grids_dir()
            .join(format!("grid_{}m.geojson", cell_size_m.round() as u64))
    }

    pub fn grid_hour_file(&self) -> PathBuf {
        self.tables_dir().join(GRID_HOUR_FILE)
    }
}
