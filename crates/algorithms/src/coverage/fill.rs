//! Interior fill
//!
//! After the boundary walk classifies every touched cell, the remaining
//! cells are fully inside or fully outside the ring. Each row of cells is
//! resolved with an even-odd parity count of the ring's crossings with the
//! row's center line; cells the boundary touched keep their computed
//! fraction.

use std::collections::HashMap;

use areal_core::{BoundedExtent, Grid};
use geo_types::Coord;

/// Insert coverage 1.0 for every untouched cell whose center lies inside
/// the ring.
pub(crate) fn fill_interior(
    grid: &Grid<BoundedExtent>,
    ring: &[Coord<f64>],
    fractions: &mut HashMap<(usize, usize), f64>,
) {
    if grid.is_empty() || ring.len() < 4 {
        return;
    }

    let mut xmin = f64::INFINITY;
    let mut xmax = f64::NEG_INFINITY;
    let mut ymin = f64::INFINITY;
    let mut ymax = f64::NEG_INFINITY;
    for c in ring {
        xmin = xmin.min(c.x);
        xmax = xmax.max(c.x);
        ymin = ymin.min(c.y);
        ymax = ymax.max(c.y);
    }

    let mut crossings: Vec<f64> = Vec::new();

    for row in 0..grid.rows() {
        let yc = grid.y_for_row(row);
        if yc < ymin || yc > ymax {
            continue;
        }

        // Half-open rule: a vertex counts for the edge it starts, never the
        // one it ends; horizontal edges never cross.
        crossings.clear();
        for window in ring.windows(2) {
            let (p, q) = (window[0], window[1]);
            if (p.y <= yc && q.y > yc) || (q.y <= yc && p.y > yc) {
                let t = (yc - p.y) / (q.y - p.y);
                crossings.push(p.x + t * (q.x - p.x));
            }
        }
        if crossings.is_empty() {
            continue;
        }
        crossings.sort_by(f64::total_cmp);

        let mut passed = 0;
        for col in 0..grid.cols() {
            let xc = grid.x_for_col(col);
            if xc < xmin || xc > xmax {
                continue;
            }
            while passed < crossings.len() && crossings[passed] < xc {
                passed += 1;
            }
            if passed % 2 == 1 {
                fractions.entry((row, col)).or_insert(1.0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use areal_core::Bounds;
    use geo_types::coord;

    fn grid_10() -> Grid<BoundedExtent> {
        Grid::new(Bounds::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0).unwrap()
    }

    fn ring(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| coord! { x: x, y: y }).collect()
    }

    #[test]
    fn test_fill_square_interior() {
        let grid = grid_10();
        // Square spanning cells (4..6, 2..5) exactly.
        let ring = ring(&[
            (2.0, 4.0),
            (5.0, 4.0),
            (5.0, 6.0),
            (2.0, 6.0),
            (2.0, 4.0),
        ]);

        let mut fractions = HashMap::new();
        fill_interior(&grid, &ring, &mut fractions);

        // Rows 4..6 (y in [4, 6]) and columns 2..5 are inside.
        assert_eq!(fractions.len(), 6);
        for row in 4..6 {
            for col in 2..5 {
                assert_eq!(fractions[&(row, col)], 1.0);
            }
        }
    }

    #[test]
    fn test_fill_respects_boundary_cells() {
        let grid = grid_10();
        let ring = ring(&[
            (2.0, 4.0),
            (5.0, 4.0),
            (5.0, 6.0),
            (2.0, 6.0),
            (2.0, 4.0),
        ]);

        let mut fractions = HashMap::new();
        fractions.insert((4, 2), 0.25);
        fill_interior(&grid, &ring, &mut fractions);

        // The boundary cell's fraction is untouched.
        assert_eq!(fractions[&(4, 2)], 0.25);
        assert_eq!(fractions[&(5, 4)], 1.0);
    }

    #[test]
    fn test_fill_outside_ring_untouched() {
        let grid = grid_10();
        let ring = ring(&[
            (2.0, 4.0),
            (5.0, 4.0),
            (5.0, 6.0),
            (2.0, 6.0),
            (2.0, 4.0),
        ]);

        let mut fractions = HashMap::new();
        fill_interior(&grid, &ring, &mut fractions);

        assert!(!fractions.contains_key(&(0, 0)));
        assert!(!fractions.contains_key(&(4, 5)));
        assert!(!fractions.contains_key(&(3, 3)));
    }

    #[test]
    fn test_fill_ring_larger_than_grid() {
        let grid = grid_10();
        let ring = ring(&[
            (-100.0, -100.0),
            (100.0, -100.0),
            (100.0, 100.0),
            (-100.0, 100.0),
            (-100.0, -100.0),
        ]);

        let mut fractions = HashMap::new();
        fill_interior(&grid, &ring, &mut fractions);

        assert_eq!(fractions.len(), 100);
        assert!(fractions.values().all(|&f| f == 1.0));
    }

    #[test]
    fn test_fill_triangle() {
        let grid = grid_10();
        // Large triangle; cell centers below the hypotenuse are inside.
        let ring = ring(&[(0.0, 0.0), (10.0, 0.0), (0.0, 10.0), (0.0, 0.0)]);

        let mut fractions = HashMap::new();
        fill_interior(&grid, &ring, &mut fractions);

        // Center (0.5, 0.5) is inside; (9.5, 9.5) is not.
        assert_eq!(fractions.get(&(9, 0)), Some(&1.0));
        assert_eq!(fractions.get(&(0, 9)), None);
        // Center (4.5, 4.5) lies below the hypotenuse.
        assert_eq!(fractions.get(&(5, 4)), Some(&1.0));
    }
}
