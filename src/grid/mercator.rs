//! Web-Mercator (EPSG:3857) projection.
//!
//! The grid is constructed in a meters-based plane so a 500 m cell size means
//! 500 meters. Spherical Mercator is closed-form, which is all the pipeline
//! needs; nothing here is valid near the poles.

use geo::{coord, Coord, MapCoords, MultiPolygon, Polygon};
use std::f64::consts::PI;

const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Projects a lon/lat degree coordinate to Mercator meters.
pub fn project(c: Coord<f64>) -> Coord<f64> {
    let x = EARTH_RADIUS_M * c.x.to_radians();
    let y = EARTH_RADIUS_M * (PI / 4.0 + c.y.to_radians() / 2.0).tan().ln();
    coord! { x: x, y: y }
}

/// Inverse of [`project`]: Mercator meters back to lon/lat degrees.
pub fn unproject(c: Coord<f64>) -> Coord<f64> {
    let lon = (c.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (c.y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    coord! { x: lon, y: lat }
}

pub fn multi_polygon_to_mercator(mp: &MultiPolygon<f64>) -> MultiPolygon<f64> {
    mp.map_coords(project)
}

pub fn polygon_to_lonlat(p: &Polygon<f64>) -> Polygon<f64> {
    p.map_coords(unproject)
}
