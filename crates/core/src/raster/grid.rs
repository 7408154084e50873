//! Regular grid algebra
//!
//! A [`Grid`] describes an axis-aligned regular grid by its extent and cell
//! size. Row 0 is the top row (largest y), column 0 the leftmost.
//!
//! Two flavors exist, selected by a zero-sized tag: [`BoundedExtent`] grids
//! have finite indices and reject coordinates outside the extent, while
//! [`InfiniteExtent`] grids carry one ghost row/column on each side so that
//! boundary traversals can index one past the extent without branching.

use std::fmt::Debug;
use std::marker::PhantomData;

use crate::bounds::Bounds;
use crate::error::{Error, Result};

/// Relative tolerance absorbing floating-point error in an extent when
/// deriving row/column counts and when testing grid compatibility.
const DIMENSION_RTOL: f64 = 1e-6;

/// Relative tolerance snapping a scaled coordinate offset to an integer in
/// row/column lookups. Coordinates exactly on an interior cell boundary land
/// in the cell below / to the right of it.
const INDEX_SNAP_RTOL: f64 = 1e-8;

/// Extent flavor of a [`Grid`]: zero or one ghost cells of padding per side.
pub trait GridExtent: Copy + Clone + Debug + PartialEq + 'static {
    const PADDING: usize;
}

/// Finite row/column indices; out-of-extent coordinates are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedExtent;

/// One ghost row/column on each side; out-of-extent coordinates resolve to
/// the ghost indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InfiniteExtent;

impl GridExtent for BoundedExtent {
    const PADDING: usize = 0;
}

impl GridExtent for InfiniteExtent {
    const PADDING: usize = 1;
}

/// An axis-aligned regular grid: extent plus cell size.
///
/// Immutable value type. Interior cell `(r, c)` covers
/// `[xmin + c·dx, xmin + (c+1)·dx] × [ymax − (r+1)·dy, ymax − r·dy]`
/// (indices shifted by one for [`InfiniteExtent`] grids).
#[derive(Debug, Clone)]
pub struct Grid<E: GridExtent = BoundedExtent> {
    extent: Bounds,
    dx: f64,
    dy: f64,
    /// Interior row count, excluding padding.
    num_rows: usize,
    /// Interior column count, excluding padding.
    num_cols: usize,
    _extent_kind: PhantomData<E>,
}

impl<E: GridExtent> PartialEq for Grid<E> {
    fn eq(&self, other: &Self) -> bool {
        self.extent == other.extent && self.dx == other.dx && self.dy == other.dy
    }
}

fn dimension(span: f64, resolution: f64) -> usize {
    if span <= 0.0 {
        0
    } else {
        (span / resolution).round() as usize
    }
}

/// Floor of `t`, after snapping values within [`INDEX_SNAP_RTOL`] of an
/// integer onto that integer.
fn snapped_floor(t: f64) -> f64 {
    let nearest = t.round();
    if (t - nearest).abs() <= INDEX_SNAP_RTOL * nearest.abs().max(1.0) {
        nearest
    } else {
        t.floor()
    }
}

fn is_integral(v: f64) -> bool {
    (v - v.round()).abs() <= DIMENSION_RTOL * v.abs().max(1.0)
}

/// Whether one resolution is an integer multiple of the other (either way).
fn resolution_compatible(a: f64, b: f64) -> bool {
    let ratio = if a > b { a / b } else { b / a };
    is_integral(ratio)
}

impl<E: GridExtent> Grid<E> {
    /// Create a grid over `extent` with cell size `dx × dy`.
    pub fn new(extent: Bounds, dx: f64, dy: f64) -> Result<Self> {
        if !(dx > 0.0) || !(dy > 0.0) || !dx.is_finite() || !dy.is_finite() {
            return Err(Error::InvalidResolution { dx, dy });
        }
        let num_rows = dimension(extent.height(), dy);
        let num_cols = dimension(extent.width(), dx);
        Ok(Self {
            extent,
            dx,
            dy,
            num_rows,
            num_cols,
            _extent_kind: PhantomData,
        })
    }

    /// Internal constructor for grids whose dimensions were derived by
    /// integer cell arithmetic rather than extent rounding.
    fn from_parts(extent: Bounds, dx: f64, dy: f64, num_rows: usize, num_cols: usize) -> Self {
        Self {
            extent,
            dx,
            dy,
            num_rows,
            num_cols,
            _extent_kind: PhantomData,
        }
    }

    pub fn extent(&self) -> &Bounds {
        &self.extent
    }

    pub fn xmin(&self) -> f64 {
        self.extent.xmin
    }

    pub fn xmax(&self) -> f64 {
        self.extent.xmax
    }

    pub fn ymin(&self) -> f64 {
        self.extent.ymin
    }

    pub fn ymax(&self) -> f64 {
        self.extent.ymax
    }

    pub fn dx(&self) -> f64 {
        self.dx
    }

    pub fn dy(&self) -> f64 {
        self.dy
    }

    /// Row count, including any ghost padding.
    pub fn rows(&self) -> usize {
        self.num_rows + 2 * E::PADDING
    }

    /// Column count, including any ghost padding.
    pub fn cols(&self) -> usize {
        self.num_cols + 2 * E::PADDING
    }

    /// Total cell count, including any ghost padding.
    pub fn size(&self) -> usize {
        self.rows() * self.cols()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0 || self.num_cols == 0
    }

    /// X coordinate of the center of column `col`.
    pub fn x_for_col(&self, col: usize) -> f64 {
        self.extent.xmin + (col as f64 - E::PADDING as f64 + 0.5) * self.dx
    }

    /// Y coordinate of the center of row `row`.
    pub fn y_for_row(&self, row: usize) -> f64 {
        self.extent.ymax - (row as f64 - E::PADDING as f64 + 0.5) * self.dy
    }

    /// Reinterpret as a bounded grid over the same extent.
    pub fn as_bounded(&self) -> Grid<BoundedExtent> {
        Grid::from_parts(self.extent, self.dx, self.dy, self.num_rows, self.num_cols)
    }

    /// Reinterpret as an infinite grid over the same extent.
    pub fn as_infinite(&self) -> Grid<InfiniteExtent> {
        Grid::from_parts(self.extent, self.dx, self.dy, self.num_rows, self.num_cols)
    }

    /// The smallest grid aligned with `self` that contains `box_`,
    /// preserving cell size.
    ///
    /// The box corners are snapped outward onto the grid lattice through the
    /// index lookups; each edge is then corrected by one further cell when
    /// floating-point round-off left the box sticking out. Idempotent.
    pub fn shrink_to_fit(&self, box_: &Bounds) -> Result<Grid<E>> {
        if !self.extent.contains_box(box_) {
            return Err(Error::BoxOutOfExtent {
                xmin: box_.xmin,
                ymin: box_.ymin,
                xmax: box_.xmax,
                ymax: box_.ymax,
            });
        }

        let inner = self.as_bounded();

        let mut col0 = inner.get_column(box_.xmin)? as i64;
        let mut snapped_xmin = self.extent.xmin + col0 as f64 * self.dx;
        if box_.xmin < snapped_xmin {
            snapped_xmin -= self.dx;
            col0 -= 1;
        }

        let mut row0 = inner.get_row(box_.ymax)? as i64;
        let mut snapped_ymax = self.extent.ymax - row0 as f64 * self.dy;
        if box_.ymax > snapped_ymax {
            snapped_ymax += self.dy;
            row0 -= 1;
        }

        let col1 = inner.get_column(box_.xmax)? as i64;
        let row1 = inner.get_row(box_.ymin)? as i64;

        let mut num_cols = (1 + col1 - col0).max(1);
        let mut num_rows = (1 + row1 - row0).max(1);

        let mut snapped_xmax = snapped_xmin + num_cols as f64 * self.dx;
        if snapped_xmax < box_.xmax {
            snapped_xmax += self.dx;
            num_cols += 1;
        }

        let mut snapped_ymin = snapped_ymax - num_rows as f64 * self.dy;
        if snapped_ymin > box_.ymin {
            snapped_ymin -= self.dy;
            num_rows += 1;
        }

        Ok(Grid::from_parts(
            Bounds::new(snapped_xmin, snapped_ymin, snapped_xmax, snapped_ymax),
            self.dx,
            self.dy,
            num_rows as usize,
            num_cols as usize,
        ))
    }

    /// Whether the two grids can be overlaid exactly: each axis resolution
    /// is an integer multiple of the other's (within tolerance) and the
    /// origins are aligned on the finer resolution.
    pub fn compatible_with<E2: GridExtent>(&self, other: &Grid<E2>) -> bool {
        if !resolution_compatible(self.dx, other.dx()) || !resolution_compatible(self.dy, other.dy())
        {
            return false;
        }
        let fine_dx = self.dx.min(other.dx());
        let fine_dy = self.dy.min(other.dy());
        is_integral((self.extent.xmin - other.xmin()) / fine_dx)
            && is_integral((self.extent.ymin - other.ymin()) / fine_dy)
    }

    /// The grid with the finer cell size in each axis whose extent is the
    /// union of the two extents. Requires [`Grid::compatible_with`].
    pub fn common_grid<E2: GridExtent>(&self, other: &Grid<E2>) -> Result<Grid<E>> {
        if !self.compatible_with(other) {
            return Err(Error::incompatible(
                (self.extent.xmin, self.extent.ymin, self.dx, self.dy),
                (other.xmin(), other.ymin(), other.dx(), other.dy()),
            ));
        }
        // Compatibility puts both origins on the finer lattice, so the union
        // extent is already aligned and needs no snapping.
        let extent = self.extent.union(other.extent());
        Grid::new(extent, self.dx.min(other.dx()), self.dy.min(other.dy()))
    }

    /// Absolute row offset between the two grids' origins, in cells of the
    /// finer vertical resolution. Symmetric; requires compatible grids.
    pub fn row_offset<E2: GridExtent>(&self, other: &Grid<E2>) -> usize {
        let fine_dy = self.dy.min(other.dy());
        ((self.extent.ymax - other.ymax()).abs() / fine_dy).round() as usize
    }

    /// Absolute column offset between the two grids' origins, in cells of
    /// the finer horizontal resolution. Symmetric; requires compatible grids.
    pub fn col_offset<E2: GridExtent>(&self, other: &Grid<E2>) -> usize {
        let fine_dx = self.dx.min(other.dx());
        ((self.extent.xmin - other.xmin()).abs() / fine_dx).round() as usize
    }
}

impl Grid<BoundedExtent> {
    /// Row index of the cell containing `y`, failing for coordinates
    /// outside the extent.
    pub fn get_row(&self, y: f64) -> Result<usize> {
        if y < self.extent.ymin || y > self.extent.ymax || self.num_rows == 0 {
            return Err(Error::OutOfExtent {
                value: y,
                min: self.extent.ymin,
                max: self.extent.ymax,
            });
        }
        let t = snapped_floor((self.extent.ymax - y) / self.dy);
        Ok((t as i64).clamp(0, self.num_rows as i64 - 1) as usize)
    }

    /// Column index of the cell containing `x`, failing for coordinates
    /// outside the extent.
    pub fn get_column(&self, x: f64) -> Result<usize> {
        if x < self.extent.xmin || x > self.extent.xmax || self.num_cols == 0 {
            return Err(Error::OutOfExtent {
                value: x,
                min: self.extent.xmin,
                max: self.extent.xmax,
            });
        }
        let t = snapped_floor((x - self.extent.xmin) / self.dx);
        Ok((t as i64).clamp(0, self.num_cols as i64 - 1) as usize)
    }

    /// The rectangle covered by cell `(row, col)`.
    pub fn cell(&self, row: usize, col: usize) -> Bounds {
        let x0 = self.extent.xmin + col as f64 * self.dx;
        let y1 = self.extent.ymax - row as f64 * self.dy;
        Bounds::new(x0, y1 - self.dy, x0 + self.dx, y1)
    }

    /// Lazy row-major subdivision into aligned sub-grids of at most
    /// `max_cells` cells each. Tiles span whole rows unless a single row
    /// exceeds `max_cells`.
    pub fn subdivide(&self, max_cells: usize) -> SubGrids {
        let max_cells = max_cells.max(1);
        let tile_cols = self.num_cols.min(max_cells).max(1);
        let tile_rows = (max_cells / tile_cols).clamp(1, self.num_rows.max(1));
        SubGrids {
            grid: self.clone(),
            tile_rows,
            tile_cols,
            row0: 0,
            col0: 0,
        }
    }
}

impl Grid<InfiniteExtent> {
    /// Row index of the cell containing `y`. Coordinates above the extent
    /// resolve to the top ghost row (0), below it to the bottom ghost row.
    pub fn get_row(&self, y: f64) -> usize {
        if y > self.extent.ymax {
            return 0;
        }
        if y < self.extent.ymin {
            return self.num_rows + 1;
        }
        let t = snapped_floor((self.extent.ymax - y) / self.dy);
        1 + (t as i64).clamp(0, self.num_rows.max(1) as i64 - 1) as usize
    }

    /// Column index of the cell containing `x`. Coordinates left of the
    /// extent resolve to the left ghost column (0), right of it to the
    /// right ghost column.
    pub fn get_column(&self, x: f64) -> usize {
        if x < self.extent.xmin {
            return 0;
        }
        if x > self.extent.xmax {
            return self.num_cols + 1;
        }
        let t = snapped_floor((x - self.extent.xmin) / self.dx);
        1 + (t as i64).clamp(0, self.num_cols.max(1) as i64 - 1) as usize
    }
}

/// Iterator over the tiles of [`Grid::subdivide`].
#[derive(Debug, Clone)]
pub struct SubGrids {
    grid: Grid<BoundedExtent>,
    tile_rows: usize,
    tile_cols: usize,
    row0: usize,
    col0: usize,
}

impl Iterator for SubGrids {
    type Item = Grid<BoundedExtent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.grid.is_empty() || self.row0 >= self.grid.num_rows {
            return None;
        }

        let row1 = (self.row0 + self.tile_rows).min(self.grid.num_rows);
        let col1 = (self.col0 + self.tile_cols).min(self.grid.num_cols);

        let xmin = self.grid.extent.xmin + self.col0 as f64 * self.grid.dx;
        let xmax = self.grid.extent.xmin + col1 as f64 * self.grid.dx;
        let ymax = self.grid.extent.ymax - self.row0 as f64 * self.grid.dy;
        let ymin = self.grid.extent.ymax - row1 as f64 * self.grid.dy;

        let tile = Grid::from_parts(
            Bounds::new(xmin, ymin, xmax, ymax),
            self.grid.dx,
            self.grid.dy,
            row1 - self.row0,
            col1 - self.col0,
        );

        self.col0 = col1;
        if self.col0 >= self.grid.num_cols {
            self.col0 = 0;
            self.row0 = row1;
        }

        Some(tile)
    }
}
