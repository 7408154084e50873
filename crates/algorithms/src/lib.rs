//! # Areal Algorithms
//!
//! Zonal statistics with exact sub-cell coverage accounting.
//!
//! - **coverage**: the raster/polygon cell-intersection engine; computes
//!   the exact fraction of every grid cell covered by a polygon
//! - **stats**: the streaming statistics accumulator over
//!   `(coverage, value, weight)` cell triples
//! - **zonal**: the per-zone pipeline wiring coverage and statistics to
//!   pluggable feature, raster and output interfaces

pub mod coverage;
pub mod stats;
pub mod zonal;

pub use coverage::coverage_fraction;
pub use stats::{RasterStats, Stat};
pub use zonal::{
    zonal_statistics, CollectSink, FeatureSource, MemoryRaster, OutputSink, RasterSource,
    VecFeatures, ZonalOptions, ZonalReport,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::coverage::coverage_fraction;
    pub use crate::stats::{RasterStats, Stat};
    pub use crate::zonal::{
        zonal_statistics, FeatureSource, OutputSink, RasterSource, ZonalOptions, ZonalReport,
    };
    pub use areal_core::prelude::*;
}
