// Aggregate results handed to the renderer. Every type here serializes so an
// external renderer can consume the output as JSON.

use serde::Serialize;

// =============================================================================
// Univariate distributions
// =============================================================================

/// One histogram bin, `[lower_bound, upper_bound)` except the last bin which is
/// closed at the domain maximum.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bin {
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinnedGroup {
    pub key: String,
    pub bins: Vec<Bin>,
}

/// Histogram bins per group, all sharing one domain so they line up.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub domain: Option<(f64, f64)>,
    pub groups: Vec<BinnedGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoxplotSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
}

impl BoxplotSummary {
    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Sorted values of a group plus its box-plot summary. An empty group has no
/// summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionGroup {
    pub key: String,
    pub values: Vec<f64>,
    pub summary: Option<BoxplotSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DensitySample {
    pub x: f64,
    pub density: f64,
}

/// Kernel density curve for one group. `bandwidth` is per group, so widths are
/// not comparable across groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityGroup {
    pub key: String,
    pub bandwidth: Option<f64>,
    pub samples: Vec<DensitySample>,
    pub max_density: Option<f64>,
}

// =============================================================================
// Rollups
// =============================================================================

/// Mean of one leaf group. `key` is the grouping path (one entry per level).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeanRow {
    pub key: Vec<String>,
    pub mean: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesPoint {
    pub x: String,
    pub mean: Option<f64>,
}

/// One line of a line chart: means at each x category, in x order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub key: String,
    pub points: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSlice {
    pub key: String,
    pub value: f64,
    pub start_angle: f64,
    pub end_angle: f64,
}

// =============================================================================
// Stacking
// =============================================================================

/// A `[low, high]` band for one category in one group. `value` is absent when
/// the category has no data in that group (zero-height band).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackBand {
    pub group: String,
    pub low: f64,
    pub high: f64,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackLayer {
    pub category: String,
    pub bands: Vec<StackBand>,
}

/// Stacked series: one layer per category (stacking order), each with a band
/// per group in `groups` order.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StackedSeries {
    pub groups: Vec<String>,
    pub layers: Vec<StackLayer>,
}

// =============================================================================
// Two-dimensional
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub category: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HexBin {
    pub x: f64,
    pub y: f64,
    pub count: usize,
}

/// Plot frame the spatial aggregations work in, `[0, width] x [0, height]`
/// with y growing upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrameMapping {
    pub width: f64,
    pub height: f64,
    pub x_domain: (f64, f64),
    pub y_domain: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hexbins {
    pub frame: Option<FrameMapping>,
    pub radius: f64,
    pub bins: Vec<HexBin>,
    pub max_count: usize,
}

/// Density values at grid nodes; node `(i, j)` sits at
/// `(i * cell_size, j * cell_size)` and is stored at `j * cols + i`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityGrid {
    pub cols: usize,
    pub rows: usize,
    pub cell_size: f64,
    pub values: Vec<f64>,
}

impl DensityGrid {
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[j * self.cols + i]
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(0.0, f64::max)
    }
}

/// Isoline for one density threshold, as unordered line segments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Isoline {
    pub value: f64,
    pub segments: Vec<[(f64, f64); 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContourDensity {
    pub frame: Option<FrameMapping>,
    pub bandwidth: f64,
    pub grid: Option<DensityGrid>,
    pub isolines: Vec<Isoline>,
}

// =============================================================================
// Dispatch output
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum AggregateResult {
    Histogram(Histogram),
    Distribution(Vec<DistributionGroup>),
    Density(Vec<DensityGroup>),
    Means(Vec<MeanRow>),
    Series(Vec<Series>),
    Pie(Vec<PieSlice>),
    Points(Vec<Point>),
    Hexbin(Hexbins),
    Contour(ContourDensity),
    Stacked(StackedSeries),
}

impl AggregateResult {
    /// Number of top-level marks the renderer would draw; zero means nothing to
    /// draw.
    pub fn mark_count(&self) -> usize {
        match self {
            AggregateResult::Histogram(h) => h.groups.iter().map(|g| g.bins.len()).sum(),
            AggregateResult::Distribution(groups) => {
                groups.iter().filter(|g| g.summary.is_some()).count()
            }
            AggregateResult::Density(groups) => {
                groups.iter().filter(|g| !g.samples.is_empty()).count()
            }
            AggregateResult::Means(rows) => rows.iter().filter(|r| r.mean.is_some()).count(),
            AggregateResult::Series(series) => series
                .iter()
                .map(|s| s.points.iter().filter(|p| p.mean.is_some()).count())
                .sum(),
            AggregateResult::Pie(slices) => slices.len(),
            AggregateResult::Points(points) => points.len(),
            AggregateResult::Hexbin(h) => h.bins.len(),
            AggregateResult::Contour(c) => c.isolines.iter().map(|i| i.segments.len()).sum(),
            AggregateResult::Stacked(s) => s
                .layers
                .iter()
                .map(|l| l.bands.iter().filter(|b| b.value.is_some()).count())
                .sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mark_count() == 0
    }
}
