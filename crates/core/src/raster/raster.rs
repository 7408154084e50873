//! Dense rasters and read-only raster views

use ndarray::{Array2, ArrayView2, ArrayViewMut2};

use crate::bounds::Bounds;
use crate::error::{Error, Result};
use crate::raster::{BoundedExtent, Grid, RasterElement};

/// Read seam shared by [`Raster`] and [`RasterView`].
///
/// Lets consumers zip an owned raster with a view of another raster without
/// caring which is which, as long as both live on the same grid.
pub trait RasterValues<T: RasterElement> {
    /// The grid the values are addressed on.
    fn grid(&self) -> &Grid<BoundedExtent>;

    /// Value at `(row, col)`. Callers must stay within the grid.
    fn value(&self, row: usize, col: usize) -> T;

    /// Whether `value` is this source's no-data marker.
    fn is_nodata_value(&self, value: T) -> bool;
}

/// A dense 2D array of cell values tagged with a grid.
///
/// Cells are indexed `(row, col)` with row 0 on top. Ownership of the
/// buffer is exclusive; rasters are created for one zone's processing and
/// dropped afterwards.
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    grid: Grid<BoundedExtent>,
    data: Array2<T>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a raster over `grid` filled with zeros.
    pub fn zeros(grid: Grid<BoundedExtent>) -> Self {
        let data = Array2::zeros((grid.rows(), grid.cols()));
        Self {
            grid,
            data,
            nodata: None,
        }
    }

    /// Create a raster over `grid` filled with `value`.
    pub fn filled(grid: Grid<BoundedExtent>, value: T) -> Self {
        let data = Array2::from_elem((grid.rows(), grid.cols()), value);
        Self {
            grid,
            data,
            nodata: None,
        }
    }

    /// Create a raster from an existing array. The array shape must match
    /// the grid dimensions.
    pub fn from_array(grid: Grid<BoundedExtent>, data: Array2<T>) -> Result<Self> {
        if data.dim() != (grid.rows(), grid.cols()) {
            return Err(Error::InvalidDimensions {
                rows: data.nrows(),
                cols: data.ncols(),
            });
        }
        Ok(Self {
            grid,
            data,
            nodata: None,
        })
    }

    /// Create a raster from a row-major buffer.
    pub fn from_vec(grid: Grid<BoundedExtent>, data: Vec<T>) -> Result<Self> {
        if data.len() != grid.rows() * grid.cols() {
            return Err(Error::InvalidDimensions {
                rows: grid.rows(),
                cols: grid.cols(),
            });
        }
        let array = Array2::from_shape_vec((grid.rows(), grid.cols()), data)
            .map_err(|e| Error::Source(e.to_string()))?;
        Ok(Self {
            grid,
            data: array,
            nodata: None,
        })
    }

    /// Set the no-data marker, builder style.
    pub fn with_nodata(mut self, nodata: T) -> Self {
        self.nodata = Some(nodata);
        self
    }

    // Dimensions and georeferencing

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn xmin(&self) -> f64 {
        self.grid.xmin()
    }

    pub fn xmax(&self) -> f64 {
        self.grid.xmax()
    }

    pub fn ymin(&self) -> f64 {
        self.grid.ymin()
    }

    pub fn ymax(&self) -> f64 {
        self.grid.ymax()
    }

    pub fn xres(&self) -> f64 {
        self.grid.dx()
    }

    pub fn yres(&self) -> f64 {
        self.grid.dy()
    }

    pub fn extent(&self) -> &Bounds {
        self.grid.extent()
    }

    pub fn grid(&self) -> &Grid<BoundedExtent> {
        &self.grid
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, T> {
        self.data.view_mut()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }
}

impl<T: RasterElement> RasterValues<T> for Raster<T> {
    fn grid(&self) -> &Grid<BoundedExtent> {
        &self.grid
    }

    fn value(&self, row: usize, col: usize) -> T {
        self.data[(row, col)]
    }

    fn is_nodata_value(&self, value: T) -> bool {
        self.is_nodata(value)
    }
}

/// Same grid, same cell size, element-wise equal.
impl<T: RasterElement> PartialEq for Raster<T> {
    fn eq(&self, other: &Self) -> bool {
        self.grid == other.grid && self.data == other.data
    }
}

/// A read-only view of a source raster reinterpreted onto a finer, possibly
/// offset grid.
///
/// The target grid must be compatible with the source's, with the same or
/// finer resolution in each axis. Lookups map a target cell to the source
/// cell containing its center by integer floor division; target cells
/// outside the source yield the configured no-data value.
#[derive(Debug)]
pub struct RasterView<'a, T: RasterElement> {
    source: &'a Raster<T>,
    grid: Grid<BoundedExtent>,
    /// Refinement factor per axis: source resolution / target resolution.
    kx: i64,
    ky: i64,
    /// Offset of the target origin from the source origin, in target cells.
    col_offset: i64,
    row_offset: i64,
    nodata: T,
}

impl<'a, T: RasterElement> RasterView<'a, T> {
    /// Reinterpret `source` onto `grid`, yielding `nodata` outside it.
    pub fn new(source: &'a Raster<T>, grid: Grid<BoundedExtent>, nodata: T) -> Result<Self> {
        let sgrid = source.grid();
        if !sgrid.compatible_with(&grid) {
            return Err(Error::incompatible(
                (sgrid.xmin(), sgrid.ymin(), sgrid.dx(), sgrid.dy()),
                (grid.xmin(), grid.ymin(), grid.dx(), grid.dy()),
            ));
        }

        let kx = (sgrid.dx() / grid.dx()).round() as i64;
        let ky = (sgrid.dy() / grid.dy()).round() as i64;
        if kx < 1 || ky < 1 {
            // The view can only refine, never coarsen.
            return Err(Error::incompatible(
                (sgrid.xmin(), sgrid.ymin(), sgrid.dx(), sgrid.dy()),
                (grid.xmin(), grid.ymin(), grid.dx(), grid.dy()),
            ));
        }

        let col_offset = ((grid.xmin() - sgrid.xmin()) / grid.dx()).round() as i64;
        let row_offset = ((sgrid.ymax() - grid.ymax()) / grid.dy()).round() as i64;

        Ok(Self {
            source,
            grid,
            kx,
            ky,
            col_offset,
            row_offset,
            nodata,
        })
    }

    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    pub fn cols(&self) -> usize {
        self.grid.cols()
    }

    pub fn xmin(&self) -> f64 {
        self.grid.xmin()
    }

    pub fn xmax(&self) -> f64 {
        self.grid.xmax()
    }

    pub fn ymin(&self) -> f64 {
        self.grid.ymin()
    }

    pub fn ymax(&self) -> f64 {
        self.grid.ymax()
    }

    pub fn xres(&self) -> f64 {
        self.grid.dx()
    }

    pub fn yres(&self) -> f64 {
        self.grid.dy()
    }

    pub fn grid(&self) -> &Grid<BoundedExtent> {
        &self.grid
    }

    /// Value of the target cell `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> T {
        let src_row = (row as i64 + self.row_offset).div_euclid(self.ky);
        let src_col = (col as i64 + self.col_offset).div_euclid(self.kx);

        if src_row < 0
            || src_col < 0
            || src_row >= self.source.rows() as i64
            || src_col >= self.source.cols() as i64
        {
            return self.nodata;
        }

        self.source.data[(src_row as usize, src_col as usize)]
    }

    /// Materialize the view into an owned raster.
    pub fn to_raster(&self) -> Raster<T> {
        let mut out = Raster::zeros(self.grid.clone());
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                out.data[(row, col)] = self.get(row, col);
            }
        }
        out.nodata = Some(self.nodata);
        out
    }
}

impl<T: RasterElement> RasterValues<T> for RasterView<'_, T> {
    fn grid(&self) -> &Grid<BoundedExtent> {
        &self.grid
    }

    fn value(&self, row: usize, col: usize) -> T {
        self.get(row, col)
    }

    fn is_nodata_value(&self, value: T) -> bool {
        value.is_nodata(Some(self.nodata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(xmin: f64, ymin: f64, xmax: f64, ymax: f64, dx: f64, dy: f64) -> Grid<BoundedExtent> {
        Grid::new(Bounds::new(xmin, ymin, xmax, ymax), dx, dy).unwrap()
    }

    fn fill_with_products(r: &mut Raster<f32>) {
        for i in 0..r.rows() {
            for j in 0..r.cols() {
                r.set(i, j, (i * j) as f32).unwrap();
            }
        }
    }

    #[test]
    fn test_raster_construction() {
        let mut r = Raster::<f32>::zeros(grid(-180.0, -90.0, 180.0, 90.0, 1.0, 1.0));
        fill_with_products(&mut r);

        assert_eq!(r.rows(), 180);
        assert_eq!(r.cols(), 360);
        assert_eq!(r.xres(), 1.0);
        assert_eq!(r.yres(), 1.0);
        assert_eq!(r.xmin(), -180.0);
        assert_eq!(r.xmax(), 180.0);
        assert_eq!(r.ymin(), -90.0);
        assert_eq!(r.ymax(), 90.0);

        for i in 0..r.rows() {
            for j in 0..r.cols() {
                assert_eq!(r.get(i, j).unwrap(), (i * j) as f32);
            }
        }
    }

    #[test]
    fn test_raster_get_set_bounds() {
        let mut r = Raster::<f64>::zeros(grid(0.0, 0.0, 10.0, 10.0, 1.0, 1.0));
        r.set(5, 5, 42.0).unwrap();
        assert_eq!(r.get(5, 5).unwrap(), 42.0);
        assert!(r.get(10, 0).is_err());
        assert!(r.set(0, 10, 1.0).is_err());
    }

    #[test]
    fn test_scaled_view() {
        let mut r = Raster::<f32>::zeros(grid(0.0, 0.0, 10.0, 10.0, 1.0, 1.0));
        fill_with_products(&mut r);

        let view = RasterView::new(&r, grid(0.0, 0.0, 10.0, 10.0, 0.1, 0.1), f32::NAN).unwrap();

        assert_eq!(view.xmin(), 0.0);
        assert_eq!(view.ymin(), 0.0);
        assert_eq!(view.xmax(), 10.0);
        assert_eq!(view.ymax(), 10.0);
        assert_eq!(view.rows(), 100);
        assert_eq!(view.cols(), 100);

        for i in 0..view.rows() {
            for j in 0..view.cols() {
                assert_eq!(view.get(i, j), ((i / 10) * (j / 10)) as f32);
            }
        }
    }

    #[test]
    fn test_shifted_view() {
        let mut r = Raster::<f32>::zeros(grid(0.0, 0.0, 10.0, 10.0, 1.0, 1.0));
        fill_with_products(&mut r);

        let view = RasterView::new(&r, grid(2.0, 3.0, 5.0, 8.0, 1.0, 1.0), f32::NAN).unwrap();

        assert_eq!(view.rows(), 5);
        assert_eq!(view.cols(), 3);
        assert_eq!(view.xres(), 1.0);
        assert_eq!(view.yres(), 1.0);

        let expected = Raster::from_array(
            grid(2.0, 3.0, 5.0, 8.0, 1.0, 1.0),
            ndarray::array![
                [4.0, 6.0, 8.0],
                [6.0, 9.0, 12.0],
                [8.0, 12.0, 16.0],
                [10.0, 15.0, 20.0],
                [12.0, 18.0, 24.0]
            ],
        )
        .unwrap();

        assert_eq!(view.to_raster(), expected);
    }

    #[test]
    fn test_scaled_and_shifted_view() {
        let mut r = Raster::<f32>::zeros(grid(0.0, 0.0, 10.0, 10.0, 1.0, 1.0));
        fill_with_products(&mut r);

        let view = RasterView::new(&r, grid(2.5, 3.0, 5.0, 8.5, 0.5, 0.5), f32::NAN).unwrap();

        assert_eq!(view.rows(), 11);
        assert_eq!(view.cols(), 5);
        assert_eq!(view.xres(), 0.5);
        assert_eq!(view.yres(), 0.5);

        let expected = Raster::from_array(
            grid(2.5, 3.0, 5.0, 8.5, 0.5, 0.5),
            ndarray::array![
                [2.0, 3.0, 3.0, 4.0, 4.0],
                [4.0, 6.0, 6.0, 8.0, 8.0],
                [4.0, 6.0, 6.0, 8.0, 8.0],
                [6.0, 9.0, 9.0, 12.0, 12.0],
                [6.0, 9.0, 9.0, 12.0, 12.0],
                [8.0, 12.0, 12.0, 16.0, 16.0],
                [8.0, 12.0, 12.0, 16.0, 16.0],
                [10.0, 15.0, 15.0, 20.0, 20.0],
                [10.0, 15.0, 15.0, 20.0, 20.0],
                [12.0, 18.0, 18.0, 24.0, 24.0],
                [12.0, 18.0, 18.0, 24.0, 24.0]
            ],
        )
        .unwrap();

        assert_eq!(view.to_raster(), expected);
    }

    #[test]
    fn test_view_outside_source_is_nodata() {
        let mut r = Raster::<f64>::zeros(grid(0.0, 0.0, 10.0, 10.0, 1.0, 1.0));
        for i in 0..10 {
            for j in 0..10 {
                r.set(i, j, 1.0).unwrap();
            }
        }

        // Target extends one cell beyond the source on every side.
        let view = RasterView::new(&r, grid(-1.0, -1.0, 11.0, 11.0, 1.0, 1.0), -999.0).unwrap();
        assert_eq!(view.rows(), 12);
        assert_eq!(view.cols(), 12);

        assert_eq!(view.get(0, 0), -999.0);
        assert_eq!(view.get(11, 11), -999.0);
        assert_eq!(view.get(0, 5), -999.0);
        assert_eq!(view.get(5, 5), 1.0);
        assert!(view.is_nodata_value(view.get(0, 0)));
    }

    #[test]
    fn test_view_rejects_incompatible_grid() {
        let r = Raster::<f64>::zeros(grid(0.0, 0.0, 10.0, 10.0, 1.0, 1.0));

        // Misaligned origin
        assert!(RasterView::new(&r, grid(0.25, 0.0, 5.25, 5.0, 1.0, 1.0), f64::NAN).is_err());
        // Coarser than the source
        assert!(RasterView::new(&r, grid(0.0, 0.0, 10.0, 10.0, 2.0, 2.0), f64::NAN).is_err());
    }

    #[test]
    fn test_raster_equality() {
        let a = Raster::<f64>::filled(grid(0.0, 0.0, 5.0, 5.0, 1.0, 1.0), 3.0);
        let b = Raster::<f64>::filled(grid(0.0, 0.0, 5.0, 5.0, 1.0, 1.0), 3.0);
        let c = Raster::<f64>::filled(grid(0.0, 0.0, 10.0, 5.0, 1.0, 1.0), 3.0);

        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
