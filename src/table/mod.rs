//! Grid-hour table stage: loads the grid and the latest weather snapshot,
//! runs the nearest-station join, and persists the result as parquet.

pub mod error;
pub mod join;
pub mod stations;

use crate::config::Config;
use crate::layout::{DataLayout, WEATHER_FILE};
use crate::snapshots::latest_snapshot;
use error::TableError;
use geojson::GeoJson;
use join::join_grid_weather;
use log::info;
use polars::prelude::*;
use std::path::Path;

/// Reads the grid GeoJSON back as a minimal DataFrame of
/// (`grid_id`, `centroid_lat`, `centroid_lon`), all the join needs.
pub fn load_grid_sites(path: &Path) -> Result<DataFrame, TableError> {
    let raw =
        std::fs::read_to_string(path).map_err(|e| TableError::GridRead(path.to_path_buf(), e))?;
    let geojson: GeoJson = raw
        .parse()
        .map_err(|e| TableError::GridParse(path.to_path_buf(), e))?;
    let GeoJson::FeatureCollection(collection) = geojson else {
        return Err(TableError::GridProperties {
            path: path.to_path_buf(),
            index: 0,
        });
    };

    let mut ids = Vec::with_capacity(collection.features.len());
    let mut lats = Vec::with_capacity(collection.features.len());
    let mut lons = Vec::with_capacity(collection.features.len());
    for (index, feature) in collection.features.iter().enumerate() {
        let properties = feature.properties.as_ref();
        let grid_id = properties
            .and_then(|p| p.get("grid_id"))
            .and_then(|v| v.as_str());
        let lat = properties
            .and_then(|p| p.get("centroid_lat"))
            .and_then(|v| v.as_f64());
        let lon = properties
            .and_then(|p| p.get("centroid_lon"))
            .and_then(|v| v.as_f64());
        let (Some(grid_id), Some(lat), Some(lon)) = (grid_id, lat, lon) else {
            return Err(TableError::GridProperties {
                path: path.to_path_buf(),
                index,
            });
        };
        ids.push(grid_id.to_string());
        lats.push(lat);
        lons.push(lon);
    }

    DataFrame::new(vec![
        Column::new("grid_id".into(), ids),
        Column::new("centroid_lat".into(), lats),
        Column::new("centroid_lon".into(), lons),
    ])
    .map_err(TableError::from)
}

/// Builds `grid_hour.parquet` from the grid artifact and the latest weather
/// snapshot.
pub fn run_build_table(root: &Path, config: &Config) -> Result<(), TableError> {
    let layout = DataLayout::new(root);

    let grid_path = layout.grid_file(config.grid.cell_size_m);
    let grid = load_grid_sites(&grid_path)?;

    let weather_dir = latest_snapshot(&layout.weather_base())?;
    let weather_path = weather_dir.join(WEATHER_FILE);
    let weather = LazyFrame::scan_parquet(&weather_path, Default::default())
        .map_err(|e| TableError::ParquetScan(weather_path.clone(), e))?
        .sort(["timestamp"], SortMultipleOptions::default())
        .collect()?;

    let mut out = join_grid_weather(&grid, &weather)?;

    let outdir = layout.tables_dir();
    std::fs::create_dir_all(&outdir)
        .map_err(|e| TableError::OutputDirCreation(outdir.clone(), e))?;
    let outpath = layout.grid_hour_file();
    let file = std::fs::File::create(&outpath)
        .map_err(|e| TableError::ParquetWriteIo(outpath.clone(), e))?;
    ParquetWriter::new(file)
        .with_compression(ParquetCompression::Snappy)
        .finish(&mut out)
        .map_err(|e| TableError::ParquetWritePolars(outpath.clone(), e))?;

    info!("Loaded grid: {}", grid_path.display());
    info!("Loaded weather: {}", weather_path.display());
    info!("Saved table: {}", outpath.display());
    info!("Rows: {}", out.height());
    info!(
        "Unique grids: {}",
        out.column("grid_id")?.as_materialized_series().n_unique()?
    );
    info!(
        "Unique hours: {}",
        out.column("timestamp")?
            .as_materialized_series()
            .n_unique()?
    );
    Ok(())
}
