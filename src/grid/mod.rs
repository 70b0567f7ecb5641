//! Grid construction stage: loads the latest boundary snapshot, tiles it into
//! square cells, and persists the grid as GeoJSON.

pub mod builder;
pub mod error;
pub mod mercator;

use crate::config::Config;
use crate::layout::{DataLayout, BOUNDARY_FILE};
use crate::snapshots::latest_snapshot;
use builder::{build_grid, GridCell};
use error::GridError;
use geo::MultiPolygon;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry};
use log::info;
use std::path::Path;

/// Reads a boundary GeoJSON file into a [`MultiPolygon`].
///
/// Accepts a bare geometry, a feature, or a feature collection (first
/// feature); anything that is not Polygon/MultiPolygon is a fatal error.
pub fn load_boundary(path: &Path) -> Result<MultiPolygon<f64>, GridError> {
    let raw =
        std::fs::read_to_string(path).map_err(|e| GridError::BoundaryRead(path.to_path_buf(), e))?;
    let geojson: GeoJson = raw
        .parse()
        .map_err(|e| GridError::BoundaryParse(path.to_path_buf(), e))?;

    let geometry = match geojson {
        GeoJson::Geometry(g) => Some(g),
        GeoJson::Feature(f) => f.geometry,
        GeoJson::FeatureCollection(fc) => fc.features.into_iter().next().and_then(|f| f.geometry),
    };
    let Some(geometry) = geometry else {
        return Err(GridError::BoundaryNotPolygonal(path.to_path_buf()));
    };

    match geo::Geometry::<f64>::try_from(geometry) {
        Ok(geo::Geometry::Polygon(p)) => Ok(MultiPolygon(vec![p])),
        Ok(geo::Geometry::MultiPolygon(mp)) => Ok(mp),
        _ => Err(GridError::BoundaryNotPolygonal(path.to_path_buf())),
    }
}

/// Writes the grid as a FeatureCollection with `grid_id`, `centroid_lon` and
/// `centroid_lat` properties per cell.
pub fn write_grid(cells: &[GridCell], path: &Path) -> Result<(), GridError> {
    let features = cells
        .iter()
        .map(|cell| {
            let mut properties = serde_json::Map::new();
            properties.insert("grid_id".into(), cell.grid_id.clone().into());
            properties.insert("centroid_lon".into(), cell.centroid_lon.into());
            properties.insert("centroid_lat".into(), cell.centroid_lat.into());
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(geojson::Value::from(&cell.geometry))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();

    let collection = GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    });
    std::fs::write(path, collection.to_string())
        .map_err(|e| GridError::GridWrite(path.to_path_buf(), e))
}

/// Builds the grid from the latest geodata snapshot and persists it.
pub fn run_build_grid(root: &Path, config: &Config) -> Result<(), GridError> {
    let layout = DataLayout::new(root);
    let geodata_dir = latest_snapshot(&layout.geodata_base())?;
    let boundary_path = geodata_dir.join(BOUNDARY_FILE);

    let boundary = load_boundary(&boundary_path)?;
    let cells = build_grid(&boundary, config.grid.cell_size_m);

    let outdir = layout.grids_dir();
    std::fs::create_dir_all(&outdir).map_err(|e| GridError::OutputDirCreation(outdir.clone(), e))?;
    let outpath = layout.grid_file(config.grid.cell_size_m);
    write_grid(&cells, &outpath)?;

    info!("Loaded boundary: {}", boundary_path.display());
    info!("Saved grid: {}", outpath.display());
    info!("Cells: {}", cells.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn boundary_cells() -> Vec<GridCell> {
        let boundary = MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 0.02, y: 0.0),
            (x: 0.02, y: 0.02),
            (x: 0.0, y: 0.02),
            (x: 0.0, y: 0.0),
        ]]);
        build_grid(&boundary, 500.0)
    }

    #[test]
    fn grid_round_trips_through_geojson() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("grid_500m.geojson");
        let cells = boundary_cells();
        write_grid(&cells, &path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: GeoJson = raw.parse().unwrap();
        let GeoJson::FeatureCollection(fc) = parsed else {
            panic!("expected a FeatureCollection");
        };
        assert_eq!(fc.features.len(), cells.len());
        let first = &fc.features[0];
        let props = first.properties.as_ref().unwrap();
        assert_eq!(props["grid_id"], "g000000");
        assert!(props["centroid_lat"].as_f64().is_some());
    }

    #[test]
    fn load_boundary_accepts_polygon_feature_collection() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("boundary.geojson");
        std::fs::write(
            &path,
            r#"{"type":"FeatureCollection","features":[{"type":"Feature","properties":{},
                "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,1],[0,0]]]}}]}"#,
        )
        .unwrap();
        let mp = load_boundary(&path).unwrap();
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn load_boundary_rejects_point_geometry() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("boundary.geojson");
        std::fs::write(
            &path,
            r#"{"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[72.9,19.1]}}"#,
        )
        .unwrap();
        assert!(matches!(
            load_boundary(&path),
            Err(GridError::BoundaryNotPolygonal(_))
        ));
    }

    #[test]
    fn load_boundary_reports_missing_file() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_boundary(&tmp.path().join("absent.geojson")),
            Err(GridError::BoundaryRead(_, _))
        ));
    }
}
