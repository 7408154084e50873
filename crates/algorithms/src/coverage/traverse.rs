//! Ring boundary traversal across the grid-line lattice
//!
//! Walks a closed ring (counter-clockwise, interior on the left) across a
//! grid, splitting each segment at the grid lines it crosses and recording
//! one [`Traversal`] per continuous piece inside each cell. The current
//! cell is carried in the padded (ghost) index space of the infinite grid,
//! so boundary pieces outside the extent are tracked for correct re-entry
//! but never recorded.

use std::collections::HashMap;

use areal_core::{BoundedExtent, Grid, InfiniteExtent, Result};
use geo_types::{coord, Coord};

use crate::coverage::areas::ring_area;
use crate::coverage::cell::{Cell, Traversal};
use crate::coverage::segment::SegmentOrientation;

/// Two crossing parameters closer than this along a segment are treated as
/// one pass through a cell corner.
const CORNER_T_TOL: f64 = 1e-12;

/// A grid-line crossing along a segment: parameter, exact crossing point,
/// and the cell index step it causes.
struct Crossing {
    t: f64,
    coord: Coord<f64>,
    drow: i64,
    dcol: i64,
}

/// Boundary coverage fractions of one ring, keyed by bounded cell index.
pub(crate) fn process_ring(
    grid: &Grid<BoundedExtent>,
    ring: &[Coord<f64>],
) -> Result<HashMap<(usize, usize), f64>> {
    let mut fractions = HashMap::new();
    if grid.is_empty() || ring.len() < 2 {
        return Ok(fractions);
    }

    let igrid = grid.as_infinite();
    let rows = grid.rows() as i64;
    let cols = grid.cols() as i64;

    let mut cells: HashMap<(usize, usize), Cell> = HashMap::new();

    // Padded indices: 0 and rows + 1 (cols + 1) are the ghost band.
    let mut cur_row = igrid.get_row(ring[0].y) as i64;
    let mut cur_col = igrid.get_column(ring[0].x) as i64;

    let mut chain: Vec<Coord<f64>> = vec![ring[0]];
    let mut chain_cell = (cur_row, cur_col);
    let mut start_chain: Option<((i64, i64), Vec<Coord<f64>>)> = None;
    let mut crossed_any = false;

    let store = |cells: &mut HashMap<(usize, usize), Cell>,
                 cell: (i64, i64),
                 coords: Vec<Coord<f64>>| {
        let (r, c) = cell;
        if r < 1 || r > rows || c < 1 || c > cols {
            return; // ghost band
        }
        let traversal = Traversal::new(coords);
        if traversal.is_degenerate() {
            return;
        }
        let (row, col) = ((r - 1) as usize, (c - 1) as usize);
        cells
            .entry((row, col))
            .or_insert_with(|| Cell::new(grid.cell(row, col)))
            .add_traversal(traversal);
    };

    for window in ring.windows(2) {
        let (a, b) = (window[0], window[1]);
        if a == b {
            continue;
        }
        let orientation = SegmentOrientation::of(&a, &b);

        let col_events = if orientation.is_vertical() {
            Vec::new()
        } else {
            column_crossings(&igrid, cur_col, &a, &b)
        };
        let row_events = if orientation.is_horizontal() {
            Vec::new()
        } else {
            row_crossings(&igrid, cur_row, &a, &b)
        };

        for crossing in merge_crossings(col_events, row_events) {
            if chain.last() != Some(&crossing.coord) {
                chain.push(crossing.coord);
            }

            // Close the current chain at the crossing point; the first
            // chain is held back until the ring closes.
            let finished = std::mem::replace(&mut chain, vec![crossing.coord]);
            if start_chain.is_none() && !crossed_any {
                start_chain = Some((chain_cell, finished));
            } else {
                store(&mut cells, chain_cell, finished);
            }
            crossed_any = true;

            cur_row += crossing.drow;
            cur_col += crossing.dcol;
            chain_cell = (cur_row, cur_col);
        }

        if chain.last() != Some(&b) {
            chain.push(b);
        }
    }

    if !crossed_any {
        // The ring never met a grid line: it lies inside a single cell.
        let (r, c) = chain_cell;
        if r >= 1 && r <= rows && c >= 1 && c <= cols {
            let (row, col) = ((r - 1) as usize, (c - 1) as usize);
            let cell_area = grid.cell(row, col).area();
            if cell_area > 0.0 {
                let fraction = (ring_area(ring).abs() / cell_area).clamp(0.0, 1.0);
                fractions.insert((row, col), fraction);
            }
        }
        return Ok(fractions);
    }

    // Ring closure: the open tail ends at the ring start. When it ends in
    // the same cell the first chain began in, the two are one continuous
    // traversal; otherwise the start point sits on the cell boundary and
    // both pieces stand on their own.
    let (first_cell, first_coords) = start_chain.expect("a crossing closed the first chain");
    if chain_cell == first_cell {
        let mut merged = chain;
        merged.extend_from_slice(&first_coords[1..]);
        store(&mut cells, chain_cell, merged);
    } else {
        store(&mut cells, chain_cell, chain);
        store(&mut cells, first_cell, first_coords);
    }

    for ((row, col), cell) in cells {
        fractions.insert((row, col), cell.covered_fraction()?);
    }

    Ok(fractions)
}

/// Vertical grid lines crossed between the current padded column and the
/// column containing `b`, in parametric order along the segment.
fn column_crossings(
    igrid: &Grid<InfiniteExtent>,
    cur_col: i64,
    a: &Coord<f64>,
    b: &Coord<f64>,
) -> Vec<Crossing> {
    let target = igrid.get_column(b.x) as i64;
    let mut crossings = Vec::new();
    let inv = 1.0 / (b.x - a.x);

    if target > cur_col {
        // Heading east: cross the east boundary of each column passed.
        for line in cur_col..target {
            crossings.push(column_crossing(igrid, line, a, b, inv, 1));
        }
    } else if target < cur_col {
        // Heading west: cross west boundaries, highest line first.
        for line in (target..cur_col).rev() {
            crossings.push(column_crossing(igrid, line, a, b, inv, -1));
        }
    }

    crossings
}

fn column_crossing(
    igrid: &Grid<InfiniteExtent>,
    line: i64,
    a: &Coord<f64>,
    b: &Coord<f64>,
    inv: f64,
    dcol: i64,
) -> Crossing {
    let x = igrid.xmin() + line as f64 * igrid.dx();
    let t = ((x - a.x) * inv).clamp(0.0, 1.0);
    Crossing {
        t,
        coord: coord! { x: x, y: a.y + t * (b.y - a.y) },
        drow: 0,
        dcol,
    }
}

/// Horizontal grid lines crossed between the current padded row and the row
/// containing `b`, in parametric order along the segment.
fn row_crossings(
    igrid: &Grid<InfiniteExtent>,
    cur_row: i64,
    a: &Coord<f64>,
    b: &Coord<f64>,
) -> Vec<Crossing> {
    let target = igrid.get_row(b.y) as i64;
    let mut crossings = Vec::new();
    let inv = 1.0 / (b.y - a.y);

    if target > cur_row {
        // Heading south (rows grow downward): cross south boundaries.
        for line in cur_row..target {
            crossings.push(row_crossing(igrid, line, a, b, inv, 1));
        }
    } else if target < cur_row {
        // Heading north: cross north boundaries, lowest line first.
        for line in (target..cur_row).rev() {
            crossings.push(row_crossing(igrid, line, a, b, inv, -1));
        }
    }

    crossings
}

fn row_crossing(
    igrid: &Grid<InfiniteExtent>,
    line: i64,
    a: &Coord<f64>,
    b: &Coord<f64>,
    inv: f64,
    drow: i64,
) -> Crossing {
    let y = igrid.ymax() - line as f64 * igrid.dy();
    let t = ((y - a.y) * inv).clamp(0.0, 1.0);
    Crossing {
        t,
        coord: coord! { x: a.x + t * (b.x - a.x), y: y },
        drow,
        dcol: 0,
    }
}

/// Merge the two (individually ordered) crossing sequences by parameter.
/// A column and a row crossing at the same parameter are one pass through a
/// cell corner: a single diagonal step at the exact corner point.
fn merge_crossings(cols: Vec<Crossing>, rows: Vec<Crossing>) -> Vec<Crossing> {
    if cols.is_empty() {
        return rows;
    }
    if rows.is_empty() {
        return cols;
    }

    let mut merged = Vec::with_capacity(cols.len() + rows.len());
    let mut ci = cols.into_iter().peekable();
    let mut ri = rows.into_iter().peekable();

    loop {
        match (ci.peek(), ri.peek()) {
            (Some(c), Some(r)) => {
                if (c.t - r.t).abs() <= CORNER_T_TOL {
                    let c = ci.next().expect("peeked");
                    let r = ri.next().expect("peeked");
                    merged.push(Crossing {
                        t: c.t,
                        coord: coord! { x: c.coord.x, y: r.coord.y },
                        drow: r.drow,
                        dcol: c.dcol,
                    });
                } else if c.t < r.t {
                    merged.push(ci.next().expect("peeked"));
                } else {
                    merged.push(ri.next().expect("peeked"));
                }
            }
            (Some(_), None) => merged.push(ci.next().expect("peeked")),
            (None, Some(_)) => merged.push(ri.next().expect("peeked")),
            (None, None) => break,
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use areal_core::Bounds;

    fn unit_grid() -> Grid<BoundedExtent> {
        Grid::new(Bounds::new(0.0, 0.0, 10.0, 10.0), 1.0, 1.0).unwrap()
    }

    fn ring(points: &[(f64, f64)]) -> Vec<Coord<f64>> {
        points.iter().map(|&(x, y)| coord! { x: x, y: y }).collect()
    }

    #[test]
    fn test_ring_within_one_cell() {
        let grid = unit_grid();
        // A 0.5 x 0.5 square inside cell (7, 2), counter-clockwise.
        let ring = ring(&[
            (2.25, 2.25),
            (2.75, 2.25),
            (2.75, 2.75),
            (2.25, 2.75),
            (2.25, 2.25),
        ]);

        let fractions = process_ring(&grid, &ring).unwrap();
        assert_eq!(fractions.len(), 1);
        assert!((fractions[&(7, 2)] - 0.25).abs() < 1e-12);
    }

    #[test]
    fn test_cell_aligned_square() {
        let grid = unit_grid();
        // A square tracing cell (5, 4) exactly. The boundary runs along
        // grid lines: the traced cell encloses its own full area, the
        // neighbors see zero-coverage traversals.
        let ring = ring(&[
            (4.0, 4.0),
            (5.0, 4.0),
            (5.0, 5.0),
            (4.0, 5.0),
            (4.0, 4.0),
        ]);

        let fractions = process_ring(&grid, &ring).unwrap();
        for (&(r, c), &f) in &fractions {
            if (r, c) == (5, 4) {
                continue;
            }
            assert!(
                f.abs() < 1e-12,
                "cell ({r}, {c}) should have no coverage, got {f}"
            );
        }
        assert!((fractions[&(5, 4)] - 1.0).abs() < 1e-12);

        let total: f64 = fractions.values().sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_half_cell_rectangle() {
        let grid = unit_grid();
        // Left half of cell (5, 4): x in [4, 4.5], y in [4, 5].
        let ring = ring(&[
            (4.0, 4.0),
            (4.5, 4.0),
            (4.5, 5.0),
            (4.0, 5.0),
            (4.0, 4.0),
        ]);

        let fractions = process_ring(&grid, &ring).unwrap();
        assert!((fractions[&(5, 4)] - 0.5).abs() < 1e-12);

        let total: f64 = fractions.values().sum();
        assert!((total - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_straddling_rectangle() {
        let grid = unit_grid();
        // 2 x 1 rectangle straddling two cells horizontally, half of each:
        // x in [3.5, 5.5], y in [2, 3] covers halves of (7, 3) and (7, 5)
        // and all of (7, 4).
        let ring = ring(&[
            (3.5, 2.0),
            (5.5, 2.0),
            (5.5, 3.0),
            (3.5, 3.0),
            (3.5, 2.0),
        ]);

        let fractions = process_ring(&grid, &ring).unwrap();
        assert!((fractions[&(7, 3)] - 0.5).abs() < 1e-12);
        assert!((fractions[&(7, 5)] - 0.5).abs() < 1e-12);
        // The middle cell's top-edge traversal encloses the whole cell.
        assert!((fractions[&(7, 4)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_diagonal_half_cell() {
        let grid = unit_grid();
        // Triangle covering half of cell (9, 0): (0,0) (1,0) (1,1).
        let ring = ring(&[(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]);

        let fractions = process_ring(&grid, &ring).unwrap();
        let total: f64 = fractions.values().sum();
        assert!((total - 0.5).abs() < 1e-12);
        assert!((fractions[&(9, 0)] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_outside_grid_is_ignored() {
        let grid = unit_grid();
        // Rectangle extending far west of the grid; only the in-grid part
        // contributes: x in [-5, 0.5] clips to half of column 0.
        let ring = ring(&[
            (-5.0, 3.0),
            (0.5, 3.0),
            (0.5, 4.0),
            (-5.0, 4.0),
            (-5.0, 3.0),
        ]);

        let fractions = process_ring(&grid, &ring).unwrap();
        assert!((fractions[&(6, 0)] - 0.5).abs() < 1e-12);
        let total: f64 = fractions.values().sum();
        assert!((total - 0.5).abs() < 1e-12);
    }
}
