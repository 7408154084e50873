//! # Areal Core
//!
//! Core types for the Areal zonal statistics library.
//!
//! This crate provides:
//! - [`Bounds`]: axis-aligned boxes for extents and bounding boxes
//! - [`Grid`]: regular grid algebra (index lookups, shrink-to-fit,
//!   compatibility, common refinement, subdivision)
//! - [`Raster<T>`]: dense cell buffers tagged with a grid
//! - [`RasterView<T>`]: read-only reinterpretation of a raster onto a
//!   finer aligned grid

pub mod bounds;
pub mod error;
pub mod raster;

pub use bounds::Bounds;
pub use error::{Error, Result};
pub use raster::{
    BoundedExtent, Grid, GridExtent, InfiniteExtent, Raster, RasterElement, RasterValues,
    RasterView, SubGrids,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bounds::Bounds;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{
        BoundedExtent, Grid, InfiniteExtent, Raster, RasterElement, RasterValues, RasterView,
    };
}
