//! The grid-hour join: assign each grid cell to its nearest weather station
//! and broadcast that station's hourly series onto the cell.

use crate::table::error::TableError;
use crate::table::stations::{discover_stations, station_ids_for, StationIndex};
use polars::prelude::*;

/// Joins a grid (columns `grid_id`, `centroid_lat`, `centroid_lon`) with a
/// weather table (columns `timestamp`, `lat`, `lon`, `rain_mm`).
///
/// Stations are the distinct coordinate pairs in the weather table. Every
/// cell is assigned the station nearest to its centroid (planar degree
/// distance), then receives one output row per hour of that station's
/// series. The station id, not its float coordinates, is the join key.
///
/// Output columns: `grid_id`, `timestamp`, `centroid_lat`, `centroid_lon`,
/// `lat`, `lon`, `rain_mm`, sorted by (grid_id, timestamp). Any null
/// `rain_mm` after the join is a fatal error carrying a sample of the
/// offending rows.
pub fn join_grid_weather(grid: &DataFrame, weather: &DataFrame) -> Result<DataFrame, TableError> {
    let stations = discover_stations(weather)?;
    let index = StationIndex::new(&stations);

    let cell_lat = grid.column("centroid_lat")?.as_materialized_series().f64()?;
    let cell_lon = grid.column("centroid_lon")?.as_materialized_series().f64()?;
    let mut assigned = Vec::with_capacity(grid.height());
    for (row, (la, lo)) in cell_lat.into_iter().zip(cell_lon).enumerate() {
        let (Some(la), Some(lo)) = (la, lo) else {
            return Err(TableError::NullCellCentroid { row });
        };
        let station = index.assign(la, lo).ok_or(TableError::NoStations)?;
        assigned.push(station.id);
    }

    let mut grid_keyed = grid.clone();
    grid_keyed.with_column(Column::new("station_id".into(), assigned))?;

    let mut weather_keyed = weather.clone();
    let weather_ids = station_ids_for(weather, &stations)?;
    weather_keyed.with_column(Column::new("station_id".into(), weather_ids))?;

    let out = grid_keyed
        .lazy()
        .join(
            weather_keyed.lazy(),
            [col("station_id")],
            [col("station_id")],
            JoinArgs::new(JoinType::Left),
        )
        .select([
            col("grid_id"),
            col("timestamp"),
            col("centroid_lat"),
            col("centroid_lon"),
            col("lat"),
            col("lon"),
            col("rain_mm"),
        ])
        .sort(["grid_id", "timestamp"], SortMultipleOptions::default())
        .collect()?;

    validate_rain(&out)?;
    Ok(out)
}

/// Null rain after the join signals broken input (typically a null in the
/// ingested precipitation series). Fatal, with up to 5 offending rows.
fn validate_rain(out: &DataFrame) -> Result<(), TableError> {
    let nulls = out.column("rain_mm")?.null_count();
    if nulls == 0 {
        return Ok(());
    }
    let sample = out
        .clone()
        .lazy()
        .filter(col("rain_mm").is_null())
        .limit(5)
        .collect()?;
    Err(TableError::MissingRain {
        count: nulls,
        sample: format!("{sample}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::builder::build_grid;
    use geo::polygon;

    fn hour_ms(hour: i64) -> i64 {
        hour * 3_600_000
    }

    /// Weather table with one row per (station, hour).
    fn weather_df(stations: &[(f64, f64)], hours: i64, rain: Option<f64>) -> DataFrame {
        let mut ts = Vec::new();
        let mut lat = Vec::new();
        let mut lon = Vec::new();
        let mut rain_mm = Vec::new();
        for &(la, lo) in stations {
            for h in 0..hours {
                ts.push(hour_ms(h));
                lat.push(la);
                lon.push(lo);
                rain_mm.push(rain);
            }
        }
        let timestamp = Column::new("timestamp".into(), ts)
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .unwrap();
        DataFrame::new(vec![
            timestamp,
            Column::new("lat".into(), lat),
            Column::new("lon".into(), lon),
            Column::new("rain_mm".into(), rain_mm),
        ])
        .unwrap()
    }

    fn grid_df(cells: &[(&str, f64, f64)]) -> DataFrame {
        let ids: Vec<&str> = cells.iter().map(|c| c.0).collect();
        let lat: Vec<f64> = cells.iter().map(|c| c.1).collect();
        let lon: Vec<f64> = cells.iter().map(|c| c.2).collect();
        df!(
            "grid_id" => ids,
            "centroid_lat" => lat,
            "centroid_lon" => lon,
        )
        .unwrap()
    }

    #[test]
    fn row_count_is_cells_times_station_hours() {
        let cells: Vec<(String, f64, f64)> = (0..10)
            .map(|i| (format!("g{i:06}"), 19.0 + 0.01 * i as f64, 72.9))
            .collect();
        let refs: Vec<(&str, f64, f64)> =
            cells.iter().map(|c| (c.0.as_str(), c.1, c.2)).collect();
        let grid = grid_df(&refs);
        let weather = weather_df(&[(19.05, 72.9)], 24, Some(1.5));

        let out = join_grid_weather(&grid, &weather).unwrap();
        assert_eq!(out.height(), 240);
        assert_eq!(out.column("rain_mm").unwrap().null_count(), 0);
    }

    #[test]
    fn cells_go_to_the_nearest_station() {
        let grid = grid_df(&[("g000000", 1.0, 1.0)]);
        let weather = weather_df(&[(0.0, 0.0), (10.0, 10.0)], 2, Some(0.0));

        let out = join_grid_weather(&grid, &weather).unwrap();
        assert_eq!(out.height(), 2);
        let lat = out
            .column("lat")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap();
        assert!(lat.into_iter().all(|v| v == Some(0.0)));
    }

    #[test]
    fn two_stations_split_the_grid() {
        let grid = grid_df(&[
            ("g000000", 0.1, 0.1),
            ("g000001", 0.2, 0.0),
            ("g000002", 9.9, 9.9),
        ]);
        let weather = weather_df(&[(0.0, 0.0), (10.0, 10.0)], 3, Some(2.0));

        let out = join_grid_weather(&grid, &weather).unwrap();
        // 3 cells x 3 hours each, regardless of which station they landed on.
        assert_eq!(out.height(), 9);
        let by_station = out
            .clone()
            .lazy()
            .filter(col("lat").eq(lit(10.0)))
            .collect()
            .unwrap();
        assert_eq!(by_station.height(), 3);
    }

    #[test]
    fn float_shifted_centroids_still_join_cleanly() {
        // Centroids nudged by 1e-9 relative to the station coordinates. The
        // assignment is distance-based and the join key is the station id,
        // so no rows may go missing.
        let grid = grid_df(&[
            ("g000000", 19.08 + 1e-9, 72.88 - 1e-9),
            ("g000001", 19.2 - 1e-9, 72.85 + 1e-9),
        ]);
        let weather = weather_df(&[(19.08, 72.88), (19.2, 72.85)], 4, Some(0.4));

        let out = join_grid_weather(&grid, &weather).unwrap();
        assert_eq!(out.height(), 8);
        assert_eq!(out.column("rain_mm").unwrap().null_count(), 0);
    }

    #[test]
    fn null_rain_is_fatal_with_sample() {
        let grid = grid_df(&[("g000000", 1.0, 1.0)]);
        let weather = weather_df(&[(0.0, 0.0)], 3, None);

        let err = join_grid_weather(&grid, &weather).unwrap_err();
        match err {
            TableError::MissingRain { count, sample } => {
                assert_eq!(count, 3);
                assert!(sample.contains("g000000"));
            }
            other => panic!("expected MissingRain, got {other:?}"),
        }
    }

    #[test]
    fn output_is_sorted_by_grid_and_time() {
        let grid = grid_df(&[("g000001", 0.2, 0.2), ("g000000", 0.1, 0.1)]);
        let weather = weather_df(&[(0.0, 0.0)], 2, Some(1.0));

        let out = join_grid_weather(&grid, &weather).unwrap();
        let ids: Vec<&str> = out
            .column("grid_id")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .flatten()
            .collect();
        assert_eq!(ids, vec!["g000000", "g000000", "g000001", "g000001"]);
    }

    #[test]
    fn end_to_end_square_boundary_single_station() {
        // A 2x2-degree boundary tiled into exactly 4 cells, one station at
        // its centroid with 3 hourly readings: 12 rows, all cells present.
        let boundary = geo::MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 2.0, y: 2.0),
            (x: 0.0, y: 2.0),
            (x: 0.0, y: 0.0),
        ]]);
        let cells = build_grid(&boundary, 120_000.0);
        assert_eq!(cells.len(), 4);

        let refs: Vec<(&str, f64, f64)> = cells
            .iter()
            .map(|c| (c.grid_id.as_str(), c.centroid_lat, c.centroid_lon))
            .collect();
        let grid = grid_df(&refs);
        let weather = weather_df(&[(1.0, 1.0)], 3, Some(5.0));

        let out = join_grid_weather(&grid, &weather).unwrap();
        assert_eq!(out.height(), 12);
        assert_eq!(
            out.column("grid_id")
                .unwrap()
                .as_materialized_series()
                .n_unique()
                .unwrap(),
            4
        );
        assert_eq!(out.column("rain_mm").unwrap().null_count(), 0);
        let lat = out
            .column("lat")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap();
        assert!(lat.into_iter().all(|v| v == Some(1.0)));
    }
}
