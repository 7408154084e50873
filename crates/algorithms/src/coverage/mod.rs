//! Exact cell coverage
//!
//! Computes, for every cell of a grid, the exact fraction of the cell's
//! area covered by a polygon. Boundary cells are resolved geometrically by
//! walking the polygon's rings across the grid-line lattice; interior cells
//! are resolved by even-odd parity. Exterior rings add coverage, holes
//! subtract it.

mod areas;
mod cell;
mod fill;
mod segment;
mod traverse;

use areal_core::{BoundedExtent, Bounds, Error, Grid, Raster, Result};
use geo_types::{Coord, Geometry, LineString, Polygon};
use ndarray::Array2;

use crate::coverage::areas::ring_area;
use crate::coverage::fill::fill_interior;
use crate::coverage::traverse::process_ring;

/// A ring prepared for traversal: closed, counter-clockwise, with the sign
/// of its contribution (+1 for shells, -1 for holes).
struct PreparedRing {
    coords: Vec<Coord<f64>>,
    sign: f64,
    bounds: Bounds,
}

/// Compute the coverage fraction raster of `geometry` over `grid`.
///
/// The result lives on `grid` with values in `[0, 1]`; the sum of all
/// fractions times the cell area equals the area of the polygon clipped to
/// the grid extent (to floating-point tolerance). Accepts `Polygon`,
/// `MultiPolygon` and `Rect` geometries; polygons may extend beyond the
/// grid.
pub fn coverage_fraction(
    grid: &Grid<BoundedExtent>,
    geometry: &Geometry<f64>,
) -> Result<Raster<f32>> {
    let rings = prepare_rings(geometry)?;

    let mut acc = Array2::<f64>::zeros((grid.rows(), grid.cols()));

    for ring in &rings {
        // A ring whose bounding box misses the extent cannot cover any
        // cell and cannot contain the grid either.
        if !ring.bounds.intersects(grid.extent()) {
            continue;
        }

        let mut fractions = process_ring(grid, &ring.coords)?;
        fill_interior(grid, &ring.coords, &mut fractions);

        for ((row, col), fraction) in fractions {
            acc[(row, col)] += ring.sign * fraction;
        }
    }

    let coverage = acc.mapv(|f| f.clamp(0.0, 1.0) as f32);
    Raster::from_array(grid.as_bounded(), coverage)
}

fn prepare_rings(geometry: &Geometry<f64>) -> Result<Vec<PreparedRing>> {
    let mut rings = Vec::new();
    match geometry {
        Geometry::Polygon(polygon) => collect_polygon(polygon, &mut rings)?,
        Geometry::MultiPolygon(multi) => {
            for polygon in &multi.0 {
                collect_polygon(polygon, &mut rings)?;
            }
        }
        Geometry::Rect(rect) => collect_polygon(&rect.to_polygon(), &mut rings)?,
        other => {
            return Err(Error::InvalidGeometry(format!(
                "unsupported geometry type: {}",
                geometry_name(other)
            )))
        }
    }
    Ok(rings)
}

fn collect_polygon(polygon: &Polygon<f64>, rings: &mut Vec<PreparedRing>) -> Result<()> {
    if let Some(ring) = prepare_ring(polygon.exterior(), 1.0)? {
        rings.push(ring);
    }
    for interior in polygon.interiors() {
        if let Some(ring) = prepare_ring(interior, -1.0)? {
            rings.push(ring);
        }
    }
    Ok(())
}

fn prepare_ring(ring: &LineString<f64>, sign: f64) -> Result<Option<PreparedRing>> {
    if ring.0.is_empty() {
        return Ok(None);
    }

    let mut coords: Vec<Coord<f64>> = ring.0.clone();
    for c in &coords {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(Error::InvalidGeometry(
                "ring contains a non-finite coordinate".to_string(),
            ));
        }
    }

    if coords.first() != coords.last() {
        coords.push(coords[0]);
    }
    if coords.len() < 4 {
        return Err(Error::InvalidGeometry(format!(
            "ring has only {} distinct points",
            coords.len() - 1
        )));
    }

    let area = ring_area(&coords);
    if area == 0.0 {
        return Ok(None);
    }
    if area < 0.0 {
        coords.reverse();
    }

    let mut xmin = f64::INFINITY;
    let mut xmax = f64::NEG_INFINITY;
    let mut ymin = f64::INFINITY;
    let mut ymax = f64::NEG_INFINITY;
    for c in &coords {
        xmin = xmin.min(c.x);
        xmax = xmax.max(c.x);
        ymin = ymin.min(c.y);
        ymax = ymax.max(c.y);
    }

    Ok(Some(PreparedRing {
        coords,
        sign,
        bounds: Bounds::new(xmin, ymin, xmax, ymax),
    }))
}

fn geometry_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;
    use geo_types::{coord, polygon, MultiPolygon};

    fn grid_10() -> Grid<BoundedExtent> {
        Grid::new(Bounds::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0).unwrap()
    }

    fn coverage_sum(raster: &Raster<f32>) -> f64 {
        raster.data().iter().map(|&f| f as f64).sum()
    }

    #[test]
    fn test_single_cell_square() {
        let grid = grid_10();
        let square = polygon![
            (x: 4.0, y: 4.0),
            (x: 5.0, y: 4.0),
            (x: 5.0, y: 5.0),
            (x: 4.0, y: 5.0),
            (x: 4.0, y: 4.0),
        ];

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(square)).unwrap();

        assert_eq!(coverage.rows(), 10);
        assert_eq!(coverage.cols(), 10);
        assert!((coverage.get(5, 4).unwrap() - 1.0).abs() < 1e-6);
        assert!((coverage_sum(&coverage) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_half_cell_polygon() {
        let grid = grid_10();
        let half = polygon![
            (x: 4.0, y: 4.0),
            (x: 4.5, y: 4.0),
            (x: 4.5, y: 5.0),
            (x: 4.0, y: 5.0),
            (x: 4.0, y: 4.0),
        ];

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(half)).unwrap();

        assert!((coverage.get(5, 4).unwrap() - 0.5).abs() < 1e-6);
        assert!((coverage_sum(&coverage) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_multi_cell_square_interior_filled() {
        let grid = grid_10();
        let square = polygon![
            (x: 2.0, y: 2.0),
            (x: 8.0, y: 2.0),
            (x: 8.0, y: 8.0),
            (x: 2.0, y: 8.0),
            (x: 2.0, y: 2.0),
        ];

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(square)).unwrap();

        // 6x6 block fully covered.
        for row in 2..8 {
            for col in 2..8 {
                assert!(
                    (coverage.get(row, col).unwrap() - 1.0).abs() < 1e-6,
                    "cell ({row}, {col})"
                );
            }
        }
        assert!((coverage_sum(&coverage) - 36.0).abs() < 1e-6);
        assert_eq!(coverage.get(0, 0).unwrap(), 0.0);
    }

    #[test]
    fn test_offset_square_partial_cells() {
        let grid = grid_10();
        // Square shifted by half a cell in both axes: 3x3 cell footprint
        // with corners 0.25, edges 0.5, center 1.0.
        let square = polygon![
            (x: 2.5, y: 2.5),
            (x: 4.5, y: 2.5),
            (x: 4.5, y: 4.5),
            (x: 2.5, y: 4.5),
            (x: 2.5, y: 2.5),
        ];

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(square)).unwrap();

        assert!((coverage.get(6, 3).unwrap() - 1.0).abs() < 1e-6); // center
        assert!((coverage.get(5, 2).unwrap() - 0.25).abs() < 1e-6); // corner
        assert!((coverage.get(7, 2).unwrap() - 0.25).abs() < 1e-6); // corner
        assert!((coverage.get(6, 2).unwrap() - 0.5).abs() < 1e-6); // edge
        assert!((coverage.get(5, 3).unwrap() - 0.5).abs() < 1e-6); // edge
        assert!((coverage_sum(&coverage) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_triangle_area_invariant() {
        let grid = grid_10();
        let triangle = polygon![
            (x: 0.7, y: 0.3),
            (x: 9.1, y: 1.9),
            (x: 4.3, y: 8.2),
            (x: 0.7, y: 0.3),
        ];
        let expected_area = triangle.unsigned_area();

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(triangle)).unwrap();

        let total = coverage_sum(&coverage) * grid.dx() * grid.dy();
        assert!(
            (total - expected_area).abs() < 1e-6 * grid.size() as f64,
            "covered {total}, expected {expected_area}"
        );
        for &f in coverage.data() {
            assert!((0.0..=1.0).contains(&f));
        }
    }

    #[test]
    fn test_polygon_with_hole() {
        let grid = grid_10();
        let polygon = Polygon::new(
            LineString::from(vec![
                (1.0, 1.0),
                (6.0, 1.0),
                (6.0, 6.0),
                (1.0, 6.0),
                (1.0, 1.0),
            ]),
            vec![LineString::from(vec![
                (2.0, 2.0),
                (3.0, 2.0),
                (3.0, 3.0),
                (2.0, 3.0),
                (2.0, 2.0),
            ])],
        );
        let expected_area = polygon.unsigned_area(); // 25 - 1

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(polygon)).unwrap();

        // The hole exactly covers one cell.
        assert!(coverage.get(7, 2).unwrap().abs() < 1e-6);
        assert!((coverage.get(6, 2).unwrap() - 1.0).abs() < 1e-6);
        assert!((coverage_sum(&coverage) - expected_area).abs() < 1e-6);
    }

    #[test]
    fn test_multipolygon() {
        let grid = grid_10();
        let a = polygon![
            (x: 1.0, y: 1.0),
            (x: 2.0, y: 1.0),
            (x: 2.0, y: 2.0),
            (x: 1.0, y: 2.0),
            (x: 1.0, y: 1.0),
        ];
        let b = polygon![
            (x: 7.0, y: 7.0),
            (x: 8.0, y: 7.0),
            (x: 8.0, y: 8.0),
            (x: 7.0, y: 8.0),
            (x: 7.0, y: 7.0),
        ];

        let coverage =
            coverage_fraction(&grid, &Geometry::MultiPolygon(MultiPolygon(vec![a, b]))).unwrap();

        assert!((coverage.get(8, 1).unwrap() - 1.0).abs() < 1e-6);
        assert!((coverage.get(2, 7).unwrap() - 1.0).abs() < 1e-6);
        assert!((coverage_sum(&coverage) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_polygon_larger_than_grid() {
        let grid = grid_10();
        let huge = polygon![
            (x: -100.0, y: -100.0),
            (x: 100.0, y: -100.0),
            (x: 100.0, y: 100.0),
            (x: -100.0, y: 100.0),
            (x: -100.0, y: -100.0),
        ];

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(huge)).unwrap();

        assert!((coverage_sum(&coverage) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_polygon_partially_outside() {
        let grid = grid_10();
        // Half in, half out across the west edge.
        let square = polygon![
            (x: -2.0, y: 4.0),
            (x: 2.0, y: 4.0),
            (x: 2.0, y: 6.0),
            (x: -2.0, y: 6.0),
            (x: -2.0, y: 4.0),
        ];

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(square)).unwrap();

        // Clipped area: x in [0, 2], y in [4, 6].
        assert!((coverage_sum(&coverage) - 4.0).abs() < 1e-6);
        assert!((coverage.get(4, 0).unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_polygon_outside_grid() {
        let grid = grid_10();
        let far = polygon![
            (x: 100.0, y: 100.0),
            (x: 101.0, y: 100.0),
            (x: 101.0, y: 101.0),
            (x: 100.0, y: 101.0),
            (x: 100.0, y: 100.0),
        ];

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(far)).unwrap();
        assert_eq!(coverage_sum(&coverage), 0.0);
    }

    #[test]
    fn test_rect_geometry() {
        let grid = grid_10();
        let rect = geo_types::Rect::new(
            coord! { x: 1.0, y: 1.0 },
            coord! { x: 3.0, y: 3.0 },
        );

        let coverage = coverage_fraction(&grid, &Geometry::Rect(rect)).unwrap();
        assert!((coverage_sum(&coverage) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_coordinate_rejected() {
        let grid = grid_10();
        let bad = polygon![
            (x: 0.0, y: 0.0),
            (x: f64::NAN, y: 1.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ];

        let result = coverage_fraction(&grid, &Geometry::Polygon(bad));
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_unsupported_geometry_rejected() {
        let grid = grid_10();
        let line = Geometry::LineString(LineString::from(vec![(0.0, 0.0), (5.0, 5.0)]));

        let result = coverage_fraction(&grid, &line);
        assert!(matches!(result, Err(Error::InvalidGeometry(_))));
    }

    #[test]
    fn test_finer_grid_quarter_cells() {
        // Same polygon on a 2x finer grid: the boundary now follows grid
        // lines and every covered fine cell is either full or empty.
        let grid: Grid<BoundedExtent> =
            Grid::new(Bounds::new(0.0, 0.0, 10.0, 10.0), 0.5, 0.5).unwrap();
        let square = polygon![
            (x: 4.0, y: 4.0),
            (x: 5.0, y: 4.0),
            (x: 5.0, y: 5.0),
            (x: 4.0, y: 5.0),
            (x: 4.0, y: 4.0),
        ];

        let coverage = coverage_fraction(&grid, &Geometry::Polygon(square)).unwrap();

        assert!((coverage_sum(&coverage) - 4.0).abs() < 1e-6);
        for &f in coverage.data() {
            assert!(f == 0.0 || (f - 1.0).abs() < 1e-6);
        }
    }
}
