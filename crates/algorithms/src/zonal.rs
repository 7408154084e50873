//! Zonal statistics pipeline
//!
//! Drives the full per-zone flow: bounding box, grid shrink, optional
//! common refinement with a weighting raster, memory-bounded subdivision,
//! exact coverage, accumulation and output. Data access goes through the
//! [`FeatureSource`], [`RasterSource`] and [`OutputSink`] traits so that
//! file formats stay outside the core.

use std::collections::BTreeMap;

use areal_core::{BoundedExtent, Bounds, Error, Grid, Raster, RasterView, Result};
use geo::BoundingRect;
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coverage::coverage_fraction;
use crate::stats::{RasterStats, Stat};

/// A stream of zones: string identifier plus polygon geometry in the
/// common planar coordinate space.
pub trait FeatureSource {
    /// Move to the next zone; `false` when the stream is exhausted.
    fn advance(&mut self) -> Result<bool>;

    /// Identifier of the current zone. Only valid after [`advance`]
    /// returned `true`.
    ///
    /// [`advance`]: FeatureSource::advance
    fn id(&self) -> &str;

    /// Geometry of the current zone. Only valid after [`advance`]
    /// returned `true`.
    ///
    /// [`advance`]: FeatureSource::advance
    fn geometry(&self) -> &Geometry<f64>;
}

/// A gridded raster that can be read window by window.
pub trait RasterSource {
    /// The full grid of the raster.
    fn grid(&self) -> &Grid<BoundedExtent>;

    /// Read a raster covering at least `bounds`, aligned with
    /// [`grid`](RasterSource::grid), with a nodata marker for unknown
    /// cells.
    fn read(&mut self, bounds: &Bounds) -> Result<Raster<f64>>;
}

/// Receives one row of named statistics per zone.
pub trait OutputSink {
    fn write(&mut self, id: &str, results: &BTreeMap<String, f64>) -> Result<()>;
}

/// Options for a zonal statistics run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZonalOptions {
    /// Statistics to compute. The output always carries `count` as well.
    pub stats: Vec<Stat>,
    /// Peak number of raster cells held in memory per raster; larger zones
    /// are streamed tile by tile.
    pub max_cells_in_memory: usize,
}

impl Default for ZonalOptions {
    fn default() -> Self {
        Self {
            stats: vec![Stat::Mean],
            max_cells_in_memory: 30_000_000,
        }
    }
}

/// Outcome of a run: how many zones produced output and which failed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZonalReport {
    pub processed: usize,
    pub failures: Vec<String>,
}

/// Compute zonal statistics for every zone of `features` over `values`,
/// optionally weighted by a second raster on a compatible grid.
///
/// A zone that fails (bad geometry, unreadable window) is reported and
/// skipped; the run continues with the next zone. Zones whose bounding box
/// does not intersect the value grid produce no output row. Errors from
/// the sink are fatal.
pub fn zonal_statistics(
    features: &mut dyn FeatureSource,
    values: &mut dyn RasterSource,
    mut weights: Option<&mut dyn RasterSource>,
    sink: &mut dyn OutputSink,
    options: &ZonalOptions,
) -> Result<ZonalReport> {
    if let Some(w) = weights.as_mut() {
        let vgrid = values.grid();
        let wgrid = w.grid();
        if !vgrid.compatible_with(wgrid) {
            return Err(Error::incompatible(
                (vgrid.xmin(), vgrid.ymin(), vgrid.dx(), vgrid.dy()),
                (wgrid.xmin(), wgrid.ymin(), wgrid.dx(), wgrid.dy()),
            ));
        }
    }

    let store_values = Stat::any_requires_stored_values(&options.stats);
    let mut report = ZonalReport::default();

    while features.advance()? {
        let id = features.id().to_string();
        let weights: Option<&mut dyn RasterSource> = match weights {
            Some(ref mut w) => Some(&mut **w),
            None => None,
        };

        match process_zone(features.geometry(), values, weights, options, store_values) {
            Ok(Some(summary)) => {
                sink.write(&id, &summary)?;
                report.processed += 1;
            }
            Ok(None) => {
                debug!(zone = %id, "zone does not intersect the value raster");
            }
            Err(e) => {
                warn!(zone = %id, error = %e, "failed to process zone");
                report.failures.push(id);
            }
        }
    }

    Ok(report)
}

fn process_zone(
    geometry: &Geometry<f64>,
    values: &mut dyn RasterSource,
    weights: Option<&mut dyn RasterSource>,
    options: &ZonalOptions,
    store_values: bool,
) -> Result<Option<BTreeMap<String, f64>>> {
    let bbox: Bounds = geometry
        .bounding_rect()
        .ok_or_else(|| Error::InvalidGeometry("zone geometry is empty".to_string()))?
        .into();
    if !bbox.xmin.is_finite() || !bbox.ymin.is_finite() || !bbox.xmax.is_finite()
        || !bbox.ymax.is_finite()
    {
        return Err(Error::InvalidGeometry(
            "zone geometry has a non-finite bounding box".to_string(),
        ));
    }

    let Some(clipped) = bbox.intersection(values.grid().extent()) else {
        return Ok(None);
    };

    let cropped_values_grid = values.grid().shrink_to_fit(&clipped)?;
    let mut stats = RasterStats::new(store_values);

    match weights {
        None => {
            for tile in cropped_values_grid.subdivide(options.max_cells_in_memory) {
                debug!(
                    rows = tile.rows(),
                    cols = tile.cols(),
                    "processing subgrid"
                );
                let coverage = coverage_fraction(&tile, geometry)?;
                let values_window = values.read(tile.extent())?;
                let nodata = values_window.nodata().unwrap_or(f64::NAN);
                let values_view = RasterView::new(&values_window, tile, nodata)?;
                stats.process(&coverage, &values_view)?;
            }
        }
        Some(weights) => {
            let cropped_weights_grid = weights.grid().shrink_to_fit(&clipped)?;
            let common_grid = cropped_values_grid.common_grid(&cropped_weights_grid)?;

            for tile in common_grid.subdivide(options.max_cells_in_memory) {
                debug!(
                    rows = tile.rows(),
                    cols = tile.cols(),
                    "processing weighted subgrid"
                );
                let coverage = coverage_fraction(&tile, geometry)?;

                let values_window = values.read(tile.extent())?;
                let nodata = values_window.nodata().unwrap_or(f64::NAN);
                let values_view = RasterView::new(&values_window, tile.clone(), nodata)?;

                let weights_window = weights.read(tile.extent())?;
                let wnodata = weights_window.nodata().unwrap_or(f64::NAN);
                let weights_view = RasterView::new(&weights_window, tile, wnodata)?;

                stats.process_weighted(&coverage, &values_view, &weights_view)?;
            }
        }
    }

    Ok(Some(stats.summary(&options.stats)))
}

/// In-memory [`FeatureSource`] over a vector of `(id, geometry)` pairs.
///
/// The reference implementation for external adapters, and the source used
/// by the tests.
pub struct VecFeatures {
    features: Vec<(String, Geometry<f64>)>,
    current: Option<usize>,
}

impl VecFeatures {
    pub fn new(features: Vec<(String, Geometry<f64>)>) -> Self {
        Self {
            features,
            current: None,
        }
    }
}

impl FeatureSource for VecFeatures {
    fn advance(&mut self) -> Result<bool> {
        let next = self.current.map_or(0, |i| i + 1);
        if next < self.features.len() {
            self.current = Some(next);
            Ok(true)
        } else {
            self.current = None;
            Ok(false)
        }
    }

    fn id(&self) -> &str {
        let i = self.current.expect("advance() must return true first");
        &self.features[i].0
    }

    fn geometry(&self) -> &Geometry<f64> {
        let i = self.current.expect("advance() must return true first");
        &self.features[i].1
    }
}

/// In-memory [`RasterSource`] over an owned raster.
pub struct MemoryRaster {
    raster: Raster<f64>,
}

impl MemoryRaster {
    pub fn new(raster: Raster<f64>) -> Self {
        Self { raster }
    }
}

impl RasterSource for MemoryRaster {
    fn grid(&self) -> &Grid<BoundedExtent> {
        self.raster.grid()
    }

    fn read(&mut self, bounds: &Bounds) -> Result<Raster<f64>> {
        // Snap the window outward onto this raster's grid without clamping
        // to its extent; the view fills unknown cells with nodata.
        let grid = self.raster.grid();
        let col0 = ((bounds.xmin - grid.xmin()) / grid.dx()).floor();
        let col1 = ((bounds.xmax - grid.xmin()) / grid.dx()).ceil().max(col0 + 1.0);
        let row0 = ((grid.ymax() - bounds.ymax) / grid.dy()).floor();
        let row1 = ((grid.ymax() - bounds.ymin) / grid.dy()).ceil().max(row0 + 1.0);

        let window = Grid::new(
            Bounds::new(
                grid.xmin() + col0 * grid.dx(),
                grid.ymax() - row1 * grid.dy(),
                grid.xmin() + col1 * grid.dx(),
                grid.ymax() - row0 * grid.dy(),
            ),
            grid.dx(),
            grid.dy(),
        )?;

        let nodata = self.raster.nodata().unwrap_or(f64::NAN);
        Ok(RasterView::new(&self.raster, window, nodata)?.to_raster())
    }
}

/// [`OutputSink`] collecting rows in memory.
#[derive(Debug, Default)]
pub struct CollectSink {
    pub rows: Vec<(String, BTreeMap<String, f64>)>,
}

impl CollectSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&BTreeMap<String, f64>> {
        self.rows.iter().find(|(i, _)| i == id).map(|(_, r)| r)
    }
}

impl OutputSink for CollectSink {
    fn write(&mut self, id: &str, results: &BTreeMap<String, f64>) -> Result<()> {
        self.rows.push((id.to_string(), results.clone()));
        Ok(())
    }
}
