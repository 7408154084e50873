//! Streaming zonal statistics
//!
//! [`RasterStats`] consumes `(coverage, value, weight)` cell triples tile by
//! tile and answers queries for the named statistics of [`Stat`]. Moment
//! statistics are O(1) running sums; frequency statistics (mode, minority,
//! variety, weighted fraction per value) need the value store, which is
//! only allocated when requested.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use areal_core::{BoundedExtent, Error, Grid, Raster, RasterValues, Result};
use serde::{Deserialize, Serialize};

/// A zonal statistic kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stat {
    /// Fractional number of covered cells (sum of coverage fractions).
    Count,
    /// Coverage-weighted sum of values.
    Sum,
    /// Coverage-weighted mean of values.
    Mean,
    /// Smallest value among covered cells.
    Min,
    /// Largest value among covered cells.
    Max,
    /// Most frequent value by accumulated coverage; ties break low.
    Mode,
    /// Alias of [`Stat::Mode`].
    Majority,
    /// Least frequent value by accumulated coverage; ties break low.
    Minority,
    /// Number of distinct values among covered cells.
    Variety,
    /// Sum of coverage times weight.
    WeightedCount,
    /// Sum of coverage times value times weight.
    WeightedSum,
    /// Weighted mean of values.
    WeightedMean,
    /// Ratio of weighted to unweighted count.
    WeightedFraction,
}

impl Stat {
    /// Canonical name, as written in output columns.
    pub fn name(&self) -> &'static str {
        match self {
            Stat::Count => "count",
            Stat::Sum => "sum",
            Stat::Mean => "mean",
            Stat::Min => "min",
            Stat::Max => "max",
            Stat::Mode => "mode",
            Stat::Majority => "majority",
            Stat::Minority => "minority",
            Stat::Variety => "variety",
            Stat::WeightedCount => "weighted count",
            Stat::WeightedSum => "weighted sum",
            Stat::WeightedMean => "weighted mean",
            Stat::WeightedFraction => "weighted fraction",
        }
    }

    /// Whether computing this statistic requires the per-value store.
    pub fn requires_stored_values(&self) -> bool {
        matches!(
            self,
            Stat::Mode | Stat::Majority | Stat::Minority | Stat::Variety
        )
    }

    /// Whether any of the requested statistics requires the value store.
    pub fn any_requires_stored_values(stats: &[Stat]) -> bool {
        stats.iter().any(Stat::requires_stored_values)
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Stat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.replace('_', " ").as_str() {
            "count" => Ok(Stat::Count),
            "sum" => Ok(Stat::Sum),
            "mean" => Ok(Stat::Mean),
            "min" => Ok(Stat::Min),
            "max" => Ok(Stat::Max),
            "mode" => Ok(Stat::Mode),
            "majority" => Ok(Stat::Majority),
            "minority" => Ok(Stat::Minority),
            "variety" => Ok(Stat::Variety),
            "weighted count" => Ok(Stat::WeightedCount),
            "weighted sum" => Ok(Stat::WeightedSum),
            "weighted mean" => Ok(Stat::WeightedMean),
            "weighted fraction" => Ok(Stat::WeightedFraction),
            _ => Err(Error::UnknownStatistic(s.to_string())),
        }
    }
}

/// Accumulated coverage for one distinct cell value.
#[derive(Debug, Clone, Copy, Default)]
struct ValueCoverage {
    value: f64,
    coverage: f64,
    weighted: f64,
}

/// Streaming accumulator for the statistics of one zone.
///
/// Feed it one or more tiles with [`RasterStats::process`] or
/// [`RasterStats::process_weighted`]; tiles are additive, so disjoint tiles
/// of a zone can be processed in any order. Cells with zero coverage or
/// nodata values are skipped.
#[derive(Debug, Clone)]
pub struct RasterStats {
    /// Sum of coverage over contributing cells.
    sum_cov: f64,
    /// Sum of coverage x value.
    sum_cov_val: f64,
    /// Sum of coverage x weight.
    sum_cov_weight: f64,
    /// Sum of coverage x value x weight.
    sum_cov_val_weight: f64,
    min: Option<f64>,
    max: Option<f64>,
    /// Per-value accumulated coverage, keyed by the value's bit pattern.
    /// Allocated only when a frequency statistic was requested.
    freq: Option<HashMap<u64, ValueCoverage>>,
}

impl RasterStats {
    /// Create an accumulator; `store_values` enables the per-value store
    /// needed by mode, majority, minority and variety.
    pub fn new(store_values: bool) -> Self {
        Self {
            sum_cov: 0.0,
            sum_cov_val: 0.0,
            sum_cov_weight: 0.0,
            sum_cov_val_weight: 0.0,
            min: None,
            max: None,
            freq: store_values.then(HashMap::new),
        }
    }

    /// Create an accumulator sized for the given statistics.
    pub fn for_stats(stats: &[Stat]) -> Self {
        Self::new(Stat::any_requires_stored_values(stats))
    }

    /// Accumulate one tile without weights (weight = 1 everywhere).
    ///
    /// `coverage` and `values` must live on the same grid.
    pub fn process<V>(&mut self, coverage: &Raster<f32>, values: &V) -> Result<()>
    where
        V: RasterValues<f64>,
    {
        self.check_grids(coverage, values.grid())?;

        for row in 0..coverage.rows() {
            for col in 0..coverage.cols() {
                let cov = unsafe { coverage.get_unchecked(row, col) } as f64;
                if cov <= 0.0 || !cov.is_finite() {
                    continue;
                }
                let val = values.value(row, col);
                if values.is_nodata_value(val) {
                    continue;
                }
                self.accumulate(cov, val, 1.0);
            }
        }
        Ok(())
    }

    /// Accumulate one tile with weights.
    ///
    /// All three rasters must live on the same grid. Cells whose weight is
    /// nodata are skipped entirely.
    pub fn process_weighted<V, W>(
        &mut self,
        coverage: &Raster<f32>,
        values: &V,
        weights: &W,
    ) -> Result<()>
    where
        V: RasterValues<f64>,
        W: RasterValues<f64>,
    {
        self.check_grids(coverage, values.grid())?;
        self.check_grids(coverage, weights.grid())?;

        for row in 0..coverage.rows() {
            for col in 0..coverage.cols() {
                let cov = unsafe { coverage.get_unchecked(row, col) } as f64;
                if cov <= 0.0 || !cov.is_finite() {
                    continue;
                }
                let val = values.value(row, col);
                if values.is_nodata_value(val) {
                    continue;
                }
                let weight = weights.value(row, col);
                if weights.is_nodata_value(weight) {
                    continue;
                }
                self.accumulate(cov, val, weight);
            }
        }
        Ok(())
    }

    fn check_grids(&self, coverage: &Raster<f32>, other: &Grid<BoundedExtent>) -> Result<()> {
        let cgrid = coverage.grid();
        if cgrid != other {
            return Err(Error::incompatible(
                (cgrid.xmin(), cgrid.ymin(), cgrid.dx(), cgrid.dy()),
                (other.xmin(), other.ymin(), other.dx(), other.dy()),
            ));
        }
        Ok(())
    }

    fn accumulate(&mut self, cov: f64, val: f64, weight: f64) {
        self.sum_cov += cov;
        self.sum_cov_val += cov * val;
        self.sum_cov_weight += cov * weight;
        self.sum_cov_val_weight += cov * val * weight;

        self.min = Some(match self.min {
            Some(m) => m.min(val),
            None => val,
        });
        self.max = Some(match self.max {
            Some(m) => m.max(val),
            None => val,
        });

        if let Some(freq) = &mut self.freq {
            let entry = freq.entry(val.to_bits()).or_insert(ValueCoverage {
                value: val,
                coverage: 0.0,
                weighted: 0.0,
            });
            entry.coverage += cov;
            entry.weighted += cov * weight;
        }
    }

    /// Fractional number of covered cells.
    pub fn count(&self) -> f64 {
        self.sum_cov
    }

    /// Coverage-weighted sum of values.
    pub fn sum(&self) -> f64 {
        self.sum_cov_val
    }

    /// Coverage-weighted mean; NaN when nothing was accumulated.
    pub fn mean(&self) -> f64 {
        self.sum_cov_val / self.sum_cov
    }

    pub fn min(&self) -> Option<f64> {
        self.min
    }

    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Sum of coverage x weight.
    pub fn weighted_count(&self) -> f64 {
        self.sum_cov_weight
    }

    /// Sum of coverage x value x weight.
    pub fn weighted_sum(&self) -> f64 {
        self.sum_cov_val_weight
    }

    /// Weighted mean; NaN when nothing was accumulated.
    pub fn weighted_mean(&self) -> f64 {
        self.sum_cov_val_weight / self.sum_cov_weight
    }

    /// Ratio of weighted count to count; NaN when nothing was accumulated.
    pub fn weighted_fraction(&self) -> f64 {
        self.sum_cov_weight / self.sum_cov
    }

    /// Number of distinct values among covered cells. Requires the value
    /// store; 0 otherwise.
    pub fn variety(&self) -> usize {
        self.freq.as_ref().map_or(0, |f| f.len())
    }

    /// Value with the largest accumulated coverage; ties break toward the
    /// smaller value. `None` when empty or the store is disabled.
    pub fn mode(&self) -> Option<f64> {
        self.freq.as_ref().and_then(|freq| {
            freq.values()
                .fold(None::<ValueCoverage>, |best, &vc| match best {
                    None => Some(vc),
                    Some(b) => {
                        if vc.coverage > b.coverage
                            || (vc.coverage == b.coverage && vc.value < b.value)
                        {
                            Some(vc)
                        } else {
                            Some(b)
                        }
                    }
                })
                .map(|vc| vc.value)
        })
    }

    /// Value with the smallest accumulated coverage; ties break toward the
    /// smaller value. `None` when empty or the store is disabled.
    pub fn minority(&self) -> Option<f64> {
        self.freq.as_ref().and_then(|freq| {
            freq.values()
                .fold(None::<ValueCoverage>, |best, &vc| match best {
                    None => Some(vc),
                    Some(b) => {
                        if vc.coverage < b.coverage
                            || (vc.coverage == b.coverage && vc.value < b.value)
                        {
                            Some(vc)
                        } else {
                            Some(b)
                        }
                    }
                })
                .map(|vc| vc.value)
        })
    }

    /// Value of one statistic; sentinel statistics of an empty accumulator
    /// yield NaN.
    pub fn value(&self, stat: Stat) -> f64 {
        match stat {
            Stat::Count => self.count(),
            Stat::Sum => self.sum(),
            Stat::Mean => self.mean(),
            Stat::Min => self.min().unwrap_or(f64::NAN),
            Stat::Max => self.max().unwrap_or(f64::NAN),
            Stat::Mode | Stat::Majority => self.mode().unwrap_or(f64::NAN),
            Stat::Minority => self.minority().unwrap_or(f64::NAN),
            Stat::Variety => self.variety() as f64,
            Stat::WeightedCount => self.weighted_count(),
            Stat::WeightedSum => self.weighted_sum(),
            Stat::WeightedMean => self.weighted_mean(),
            Stat::WeightedFraction => self.weighted_fraction(),
        }
    }

    /// Strict form of [`RasterStats::value`]: sentinel statistics of an
    /// empty accumulator fail with [`Error::NodataAllCells`] instead of
    /// yielding NaN.
    pub fn try_value(&self, stat: Stat) -> Result<f64> {
        match stat {
            Stat::Min | Stat::Max | Stat::Mode | Stat::Majority | Stat::Minority
                if self.sum_cov == 0.0 =>
            {
                Err(Error::NodataAllCells { stat: stat.name() })
            }
            _ => Ok(self.value(stat)),
        }
    }

    /// The requested statistics as a name -> value map. A `"count"` entry
    /// is always present.
    pub fn summary(&self, stats: &[Stat]) -> BTreeMap<String, f64> {
        let mut out = BTreeMap::new();
        out.insert(Stat::Count.name().to_string(), self.count());
        for &stat in stats {
            out.insert(stat.name().to_string(), self.value(stat));
        }
        out
    }
}
