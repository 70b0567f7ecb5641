//! Rasterizes a boundary polygon into a regular grid of square cells.

use crate::grid::mercator;
use geo::{coord, Area, BooleanOps, BoundingRect, Centroid, Intersects, MultiPolygon, Polygon, Rect};

/// One retained grid cell. Geometry and centroid are stored in geographic
/// coordinates; construction happens in Mercator meters.
#[derive(Debug, Clone)]
pub struct GridCell {
    /// Stable zero-padded id assigned in creation order, e.g. `g000042`.
    pub grid_id: String,
    pub geometry: Polygon<f64>,
    pub centroid_lon: f64,
    pub centroid_lat: f64,
}

/// Tiles the boundary's bounding box with `cell_size_m` squares and keeps the
/// cells that overlap the boundary with nonzero area.
///
/// The lattice walk is outer-x inner-y in increasing coordinate order, and is
/// half-open at the maximum bound, so the last column/row of cells may extend
/// past it. Ids are assigned sequentially in that order; rebuilding from the
/// same boundary and cell size reproduces the grid exactly. A degenerate
/// boundary yields an empty grid.
pub fn build_grid(boundary: &MultiPolygon<f64>, cell_size_m: f64) -> Vec<GridCell> {
    let boundary_m = mercator::multi_polygon_to_mercator(boundary);

    let mut cells = Vec::new();
    for (idx, cell_m) in tile_boundary(&boundary_m, cell_size_m).into_iter().enumerate() {
        // A lattice square always has a centroid.
        let Some(centroid_m) = cell_m.centroid() else {
            continue;
        };
        let centroid = mercator::unproject(centroid_m.0);
        cells.push(GridCell {
            grid_id: format!("g{idx:06}"),
            geometry: mercator::polygon_to_lonlat(&cell_m),
            centroid_lon: centroid.x,
            centroid_lat: centroid.y,
        });
    }
    cells
}

/// Planar tiling in Mercator meters. Touching the boundary without any area
/// of overlap does not retain a cell.
fn tile_boundary(boundary_m: &MultiPolygon<f64>, cell_size_m: f64) -> Vec<Polygon<f64>> {
    let Some(bounds) = boundary_m.bounding_rect() else {
        return Vec::new();
    };
    let (min, max) = (bounds.min(), bounds.max());

    let mut cells = Vec::new();
    let mut x = min.x;
    while x < max.x {
        let mut y = min.y;
        while y < max.y {
            let cell = Rect::new(
                coord! { x: x, y: y },
                coord! { x: x + cell_size_m, y: y + cell_size_m },
            )
            .to_polygon();
            // Bounding-box check first; the boolean op is the expensive part.
            if cell.intersects(boundary_m)
                && boundary_m.intersection(&cell).unsigned_area() > 0.0
            {
                cells.push(cell);
            }
            y += cell_size_m;
        }
        x += cell_size_m;
    }
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::polygon;

    fn square_boundary(size_deg: f64) -> MultiPolygon<f64> {
        MultiPolygon(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: size_deg, y: 0.0),
            (x: size_deg, y: size_deg),
            (x: 0.0, y: size_deg),
            (x: 0.0, y: 0.0),
        ]])
    }

    #[test]
    fn two_degree_square_with_large_cells_yields_four_cells() {
        // 2 degrees of longitude at the equator is ~222.6 km in Mercator, so
        // 120 km cells give a 2x2 lattice.
        let grid = build_grid(&square_boundary(2.0), 120_000.0);
        assert_eq!(grid.len(), 4);
        assert_eq!(grid[0].grid_id, "g000000");
        assert_eq!(grid[3].grid_id, "g000003");
    }

    #[test]
    fn every_cell_overlaps_the_boundary() {
        let boundary = square_boundary(0.02);
        let boundary_m = mercator::multi_polygon_to_mercator(&boundary);
        for cell in tile_boundary(&boundary_m, 500.0) {
            assert!(boundary_m.intersection(&cell).unsigned_area() > 0.0);
        }
    }

    #[test]
    fn rebuild_is_deterministic() {
        let boundary = square_boundary(0.02);
        let a = build_grid(&boundary, 500.0);
        let b = build_grid(&boundary, 500.0);
        assert_eq!(a.len(), b.len());
        for (ca, cb) in a.iter().zip(&b) {
            assert_eq!(ca.grid_id, cb.grid_id);
            assert_eq!(ca.geometry, cb.geometry);
            assert_eq!(ca.centroid_lat, cb.centroid_lat);
            assert_eq!(ca.centroid_lon, cb.centroid_lon);
        }
    }

    #[test]
    fn ids_follow_column_major_creation_order() {
        let grid = build_grid(&square_boundary(2.0), 120_000.0);
        // Outer loop over x, inner over y: the second cell sits above the
        // first, not beside it.
        assert!((grid[1].centroid_lon - grid[0].centroid_lon).abs() < 1e-9);
        assert!(grid[1].centroid_lat > grid[0].centroid_lat);
        // The third cell starts the next column.
        assert!(grid[2].centroid_lon > grid[0].centroid_lon);
    }

    #[test]
    fn half_open_walk_lets_cells_extend_past_the_bound() {
        // 1.5-cell-wide boundary: two columns, the second sticking out.
        let boundary = square_boundary(2.0);
        let grid = build_grid(&boundary, 150_000.0);
        assert_eq!(grid.len(), 4);
        let max_lon = grid
            .iter()
            .flat_map(|c| c.geometry.exterior().coords())
            .map(|c| c.x)
            .fold(f64::NEG_INFINITY, f64::max);
        assert!(max_lon > 2.0);
    }

    #[test]
    fn stored_centroid_matches_geometry_centroid() {
        let grid = build_grid(&square_boundary(0.02), 500.0);
        assert!(!grid.is_empty());
        for cell in &grid {
            let c = cell.geometry.centroid().unwrap();
            assert!((c.x() - cell.centroid_lon).abs() < 1e-5);
            assert!((c.y() - cell.centroid_lat).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_boundary_yields_empty_grid() {
        let grid = build_grid(&MultiPolygon(vec![]), 500.0);
        assert!(grid.is_empty());
    }

    #[test]
    fn touching_without_overlap_is_not_retained() {
        // Two planar squares meeting at a single corner. The off-diagonal
        // lattice cells share an edge or corner with them but have zero
        // overlapping area and must be dropped.
        let a = polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0),
            (x: 0.0, y: 0.0),
        ];
        let b = polygon![
            (x: 100.0, y: 100.0),
            (x: 200.0, y: 100.0),
            (x: 200.0, y: 200.0),
            (x: 100.0, y: 200.0),
            (x: 100.0, y: 100.0),
        ];
        let boundary_m = MultiPolygon(vec![a, b]);
        let cells = tile_boundary(&boundary_m, 100.0);
        assert_eq!(cells.len(), 2);
    }
}
