//! Fragment areas from boundary traversals
//!
//! Given the pieces of a ring boundary crossing one cell, computes the area
//! of the cell lying to the left of them: each traversal is followed from
//! entry to exit, then the walk continues counter-clockwise along the cell
//! perimeter to the nearest traversal entry, collecting any corners passed,
//! until the loop closes. The signed loop areas sum to the covered area.

use areal_core::{Bounds, Error, Result};
use geo_types::{coord, Coord};

use crate::coverage::cell::Traversal;

/// Signed area of a closed ring (last edge implied), positive for
/// counter-clockwise winding.
pub(crate) fn ring_area(coords: &[Coord<f64>]) -> f64 {
    let n = coords.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..n {
        let p = coords[i];
        let q = coords[(i + 1) % n];
        twice_area += p.x * q.y - q.x * p.y;
    }
    twice_area / 2.0
}

/// Distance along the cell perimeter, walking counter-clockwise from the
/// bottom-left corner. Points slightly off the perimeter (round-off on
/// crossing coordinates, or a ring endpoint snapped to a boundary) are
/// measured on the nearest edge.
fn perimeter_distance(bounds: &Bounds, p: &Coord<f64>) -> f64 {
    let w = bounds.width();
    let h = bounds.height();

    let d_bottom = (p.y - bounds.ymin).abs();
    let d_right = (bounds.xmax - p.x).abs();
    let d_top = (bounds.ymax - p.y).abs();
    let d_left = (p.x - bounds.xmin).abs();
    let nearest = d_bottom.min(d_right).min(d_top).min(d_left);

    if nearest == d_bottom {
        (p.x - bounds.xmin).clamp(0.0, w)
    } else if nearest == d_right {
        w + (p.y - bounds.ymin).clamp(0.0, h)
    } else if nearest == d_top {
        w + h + (bounds.xmax - p.x).clamp(0.0, w)
    } else {
        2.0 * w + h + (bounds.ymax - p.y).clamp(0.0, h)
    }
}

/// Area of the portion of `bounds` to the left of the traversals.
///
/// Fails with [`Error::InvalidGeometry`] when the traversals describe a
/// boundary that crosses itself inside the cell (a materially negative
/// loop).
pub(crate) fn left_hand_area(bounds: &Bounds, traversals: &[Traversal]) -> Result<f64> {
    if traversals.is_empty() {
        return Ok(0.0);
    }

    let w = bounds.width();
    let h = bounds.height();
    let perimeter = 2.0 * (w + h);
    if perimeter == 0.0 {
        return Ok(0.0);
    }

    let corners = [
        (0.0, coord! { x: bounds.xmin, y: bounds.ymin }),
        (w, coord! { x: bounds.xmax, y: bounds.ymin }),
        (w + h, coord! { x: bounds.xmax, y: bounds.ymax }),
        (2.0 * w + h, coord! { x: bounds.xmin, y: bounds.ymax }),
    ];

    let entries: Vec<f64> = traversals
        .iter()
        .map(|t| perimeter_distance(bounds, &t.entry()))
        .collect();
    let exits: Vec<f64> = traversals
        .iter()
        .map(|t| perimeter_distance(bounds, &t.exit()))
        .collect();

    let n = traversals.len();
    let mut used = vec![false; n];
    let mut total = 0.0;

    for start in 0..n {
        if used[start] {
            continue;
        }

        let mut ring: Vec<Coord<f64>> = Vec::new();
        let mut current = start;
        let mut steps = 0;

        loop {
            steps += 1;
            if steps > n + 1 {
                return Err(Error::InvalidGeometry(
                    "boundary traversals do not close within the cell".to_string(),
                ));
            }

            used[current] = true;
            ring.extend_from_slice(&traversals[current].coords);
            let exit_d = exits[current];

            // Nearest entry counter-clockwise from this exit. The starting
            // traversal's entry closes the loop; an unused traversal at the
            // same distance continues the chain and wins the tie.
            let mut next: Option<(f64, usize)> = None;
            for i in 0..n {
                if used[i] && i != start {
                    continue;
                }
                let delta = (entries[i] - exit_d).rem_euclid(perimeter);
                let better = match next {
                    None => true,
                    Some((best_delta, best_i)) => {
                        delta < best_delta || (delta == best_delta && best_i == start && i != start)
                    }
                };
                if better {
                    next = Some((delta, i));
                }
            }
            let Some((delta, next)) = next else {
                return Err(Error::InvalidGeometry(
                    "boundary traversals do not close within the cell".to_string(),
                ));
            };

            // Corners passed while walking the perimeter to the next entry.
            let mut passed: Vec<(f64, Coord<f64>)> = corners
                .iter()
                .filter_map(|&(corner_d, corner)| {
                    let rel = (corner_d - exit_d).rem_euclid(perimeter);
                    (rel > 0.0 && rel < delta).then_some((rel, corner))
                })
                .collect();
            passed.sort_by(|a, b| a.0.total_cmp(&b.0));
            ring.extend(passed.into_iter().map(|(_, corner)| corner));

            if next == start {
                break;
            }
            current = next;
        }

        total += ring_area(&ring);
    }

    let cell_area = w * h;
    if total < -1e-6 * cell_area {
        return Err(Error::InvalidGeometry(
            "boundary crosses itself within a cell".to_string(),
        ));
    }

    Ok(total.max(0.0))
}
