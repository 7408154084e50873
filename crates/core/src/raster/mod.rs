//! Grids, rasters and raster views

mod element;
mod grid;
#[allow(clippy::module_inception)]
mod raster;

pub use element::RasterElement;
pub use grid::{BoundedExtent, Grid, GridExtent, InfiniteExtent, SubGrids};
pub use raster::{Raster, RasterValues, RasterView};
