//! Error types for Areal

use thiserror::Error;

/// Main error type for Areal operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("coordinate {value} is outside of extent [{min}, {max}]")]
    OutOfExtent { value: f64, min: f64, max: f64 },

    #[error("box ({xmin}, {ymin}, {xmax}, {ymax}) is not contained in the grid extent")]
    BoxOutOfExtent {
        xmin: f64,
        ymin: f64,
        xmax: f64,
        ymax: f64,
    },

    #[error("grids are not compatible: origin ({xmin_a}, {ymin_a}) resolution ({dx_a}, {dy_a}) vs origin ({xmin_b}, {ymin_b}) resolution ({dx_b}, {dy_b})")]
    IncompatibleGrids {
        xmin_a: f64,
        ymin_a: f64,
        dx_a: f64,
        dy_a: f64,
        xmin_b: f64,
        ymin_b: f64,
        dx_b: f64,
        dy_b: f64,
    },

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("unknown statistic: {0}")]
    UnknownStatistic(String),

    #[error("statistic '{stat}' has no value: every cell was empty or nodata")]
    NodataAllCells { stat: &'static str },

    #[error("invalid raster dimensions: {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    #[error("invalid cell size: ({dx}, {dy})")]
    InvalidResolution { dx: f64, dy: f64 },

    #[error("index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("source error: {0}")]
    Source(String),
}

impl Error {
    /// Build an [`Error::IncompatibleGrids`] from two (xmin, ymin, dx, dy) tuples.
    pub fn incompatible(a: (f64, f64, f64, f64), b: (f64, f64, f64, f64)) -> Self {
        Error::IncompatibleGrids {
            xmin_a: a.0,
            ymin_a: a.1,
            dx_a: a.2,
            dy_a: a.3,
            xmin_b: b.0,
            ymin_b: b.1,
            dx_b: b.2,
            dy_b: b.3,
        }
    }
}

/// Result type alias for Areal operations
pub type Result<T> = std::result::Result<T, Error>;
