//! Weather observation points ("stations") recovered from the weather table,
//! and the spatial index used to assign grid cells to their nearest station.

use crate::table::error::TableError;
use polars::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// A distinct observation point from the weather table. The id is the
/// position in first-appearance order and is the join key carried through
/// the pipeline, so the join never depends on float equality of coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationPoint {
    pub id: u32,
    pub lat: f64,
    pub lon: f64,
}

impl RTreeObject for StationPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lon])
    }
}

impl PointDistance for StationPoint {
    /// Squared Euclidean distance in raw degrees. Valid only for small study
    /// areas; no great-circle correction is applied.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.lat - point[0];
        let dy = self.lon - point[1];
        dx * dx + dy * dy
    }
}

/// Scans the weather table's `lat`/`lon` columns and returns the distinct
/// coordinate pairs in first-appearance order, each with a stable id.
pub fn discover_stations(weather: &DataFrame) -> Result<Vec<StationPoint>, TableError> {
    let lat = weather.column("lat")?.as_materialized_series().f64()?;
    let lon = weather.column("lon")?.as_materialized_series().f64()?;

    let mut stations: Vec<StationPoint> = Vec::new();
    for (row, (la, lo)) in lat.into_iter().zip(lon).enumerate() {
        let (Some(la), Some(lo)) = (la, lo) else {
            return Err(TableError::NullStationCoordinate { row });
        };
        if !stations.iter().any(|s| s.lat == la && s.lon == lo) {
            stations.push(StationPoint {
                id: stations.len() as u32,
                lat: la,
                lon: lo,
            });
        }
    }
    if stations.is_empty() {
        return Err(TableError::NoStations);
    }
    Ok(stations)
}

/// Maps every weather row back to its station id. Coordinates come from the
/// same table the stations were discovered in, so the lookup is exact.
pub(crate) fn station_ids_for(
    weather: &DataFrame,
    stations: &[StationPoint],
) -> Result<Vec<u32>, TableError> {
    let lat = weather.column("lat")?.as_materialized_series().f64()?;
    let lon = weather.column("lon")?.as_materialized_series().f64()?;

    let mut ids = Vec::with_capacity(weather.height());
    for (row, (la, lo)) in lat.into_iter().zip(lon).enumerate() {
        let (Some(la), Some(lo)) = (la, lo) else {
            return Err(TableError::NullStationCoordinate { row });
        };
        let station = stations
            .iter()
            .find(|s| s.lat == la && s.lon == lo)
            .ok_or(TableError::StationLookup { row })?;
        ids.push(station.id);
    }
    Ok(ids)
}

/// R-tree over station coordinates, queried once per grid cell.
pub struct StationIndex {
    rtree: RTree<StationPoint>,
}

impl StationIndex {
    pub fn new(stations: &[StationPoint]) -> Self {
        Self {
            rtree: RTree::bulk_load(stations.to_vec()),
        }
    }

    /// Nearest station to a cell centroid by planar degree distance.
    /// Exact-distance ties resolve arbitrarily but deterministically.
    pub fn assign(&self, lat: f64, lon: f64) -> Option<&StationPoint> {
        self.rtree.nearest_neighbor(&[lat, lon])
    }
}
