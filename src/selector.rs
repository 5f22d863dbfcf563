// Chart selector: the enumerated (panel, chart kind) table and the aggregation
// each entry runs
//
// Selections are validated against the table before any dataset exists; once
// a `Selection` is in hand, aggregating it cannot fail.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use log::debug;
use serde::Serialize;

use crate::coerce::{as_category, as_number, format_number, numeric_pairs, numeric_values};
use crate::data::Record;
use crate::config::{Config, StatOptions};
use crate::data::Dataset;
use crate::error::ConfigError;
use crate::ir::{
    AggregateResult, BinnedGroup, ContourDensity, DensityGroup, DistributionGroup, FrameMapping,
    Hexbins, Histogram, MeanRow, Point, Series, SeriesPoint,
};
use crate::layout::pie_layout;
use crate::palette::{CategoryRegistry, ColorAssignment, ColorPalette};
use crate::scale::{extent, nice_domain, LinearMap};
use crate::spatial::{contour_density, spatial_bin, ContourOptions, Extent};
use crate::stats::{boxplot_summary, histogram_bins, sorted, violin_density};
use crate::transform::{distinct, group_by, natural_cmp, rollup_mean, rollup_mean_nested, stack_series};

/// Tick count used to nice shared axes, independent of threshold counts.
const AXIS_TICKS: usize = 10;

// =============================================================================
// Panels and chart kinds
// =============================================================================

/// Dashboard panel, numbered 1 to 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Panel(u8);

impl Panel {
    pub const ALL: [Panel; 4] = [Panel(1), Panel(2), Panel(3), Panel(4)];

    pub fn new(id: u8) -> Result<Self, ConfigError> {
        if (1..=4).contains(&id) {
            Ok(Panel(id))
        } else {
            Err(ConfigError::UnknownPanel(id.to_string()))
        }
    }

    pub fn id(&self) -> u8 {
        self.0
    }
}

impl FromStr for Panel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id: u8 = s
            .trim()
            .parse()
            .map_err(|_| ConfigError::UnknownPanel(s.to_string()))?;
        Panel::new(id)
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Histogram,
    Boxplot,
    Violin,
    Bar,
    Line,
    Pie,
    Scatter,
    Hexbin,
    Contour,
    GroupedBar,
    StackedBar,
    Area,
}

impl ChartKind {
    pub const ALL: [ChartKind; 12] = [
        ChartKind::Histogram,
        ChartKind::Boxplot,
        ChartKind::Violin,
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Scatter,
        ChartKind::Hexbin,
        ChartKind::Contour,
        ChartKind::GroupedBar,
        ChartKind::StackedBar,
        ChartKind::Area,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Histogram => "histogram",
            ChartKind::Boxplot => "boxplot",
            ChartKind::Violin => "violin",
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Scatter => "scatter",
            ChartKind::Hexbin => "hexbin",
            ChartKind::Contour => "contour",
            ChartKind::GroupedBar => "grouped-bar",
            ChartKind::StackedBar => "stacked-bar",
            ChartKind::Area => "area",
        }
    }
}

impl FromStr for ChartKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ChartKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownChartKind(s.to_string()))
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Aggregations
// =============================================================================

/// What a table entry computes, parameterized by field names.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Histogram of `value` per `group`, bins shared across groups.
    Histogram { value: String, group: String },
    /// Sorted values and box-plot summary of `value` per `group`.
    Boxplot { value: String, group: String },
    /// Kernel density of `value` per `group`.
    Violin { value: String, group: String },
    /// Mean of `value` keyed by the `(outer, inner)` pair, first-seen order.
    PairMean { outer: String, inner: String, value: String },
    /// One series per `series` category of mean `value` over the ascending
    /// numeric values of `x`.
    SeriesMean { series: String, x: String, value: String },
    /// Mean of `value` per numeric `key`, laid out as a pie.
    PieMean { key: String, value: String },
    Scatter { x: String, y: String, category: String },
    Hexbin { x: String, y: String },
    Contour { x: String, y: String },
    /// Mean of `value` by `outer` then `inner`.
    NestedMean { outer: String, inner: String, value: String },
    /// Mean of `value` per `category` stacked within each `group`, groups
    /// sorted ascending.
    Stack { group: String, category: String, value: String },
}

impl Aggregation {
    fn fields(&self) -> Vec<(&'static str, &str)> {
        match self {
            Aggregation::Histogram { value, group }
            | Aggregation::Boxplot { value, group }
            | Aggregation::Violin { value, group } => vec![("value", value.as_str()), ("group", group.as_str())],
            Aggregation::PairMean { outer, inner, value }
            | Aggregation::NestedMean { outer, inner, value } => {
                vec![("outer", outer.as_str()), ("inner", inner.as_str()), ("value", value.as_str())]
            }
            Aggregation::SeriesMean { series, x, value } => {
                vec![("series", series.as_str()), ("x", x.as_str()), ("value", value.as_str())]
            }
            Aggregation::PieMean { key, value } => vec![("key", key.as_str()), ("value", value.as_str())],
            Aggregation::Scatter { x, y, category } => {
                vec![("x", x.as_str()), ("y", y.as_str()), ("category", category.as_str())]
            }
            Aggregation::Hexbin { x, y } | Aggregation::Contour { x, y } => vec![("x", x.as_str()), ("y", y.as_str())],
            Aggregation::Stack { group, category, value } => {
                vec![("group", group.as_str()), ("category", category.as_str()), ("value", value.as_str())]
            }
        }
    }

    /// Field whose categories the renderer colors by, if any.
    pub fn color_field(&self) -> Option<&str> {
        match self {
            Aggregation::Histogram { group, .. }
            | Aggregation::Boxplot { group, .. }
            | Aggregation::Violin { group, .. } => Some(group.as_str()),
            Aggregation::PairMean { inner, .. } | Aggregation::NestedMean { inner, .. } => Some(inner.as_str()),
            Aggregation::SeriesMean { series, .. } => Some(series.as_str()),
            Aggregation::PieMean { key, .. } => Some(key.as_str()),
            Aggregation::Scatter { category, .. } => Some(category.as_str()),
            Aggregation::Stack { category, .. } => Some(category.as_str()),
            Aggregation::Hexbin { .. } | Aggregation::Contour { .. } => None,
        }
    }

    /// Categories this aggregation colors by, keyed exactly as they appear in
    /// its result, in first-seen order. Pie keys are the normalized numeric
    /// keys of its slices, so `"4.0"` and `4` register once as `"4"`.
    pub fn color_categories(&self, dataset: &Dataset) -> Option<CategoryRegistry> {
        match self {
            Aggregation::PieMean { key, .. } => {
                let mut registry = CategoryRegistry::new();
                for record in dataset {
                    if let Some(k) = numeric_key(record, key) {
                        registry.register(&k);
                    }
                }
                Some(registry)
            }
            _ => self
                .color_field()
                .map(|field| CategoryRegistry::from_dataset(dataset, field)),
        }
    }

    pub fn color_assignment(&self, dataset: &Dataset, palette: &ColorPalette) -> Option<ColorAssignment> {
        self.color_categories(dataset)
            .map(|registry| ColorAssignment::new(&registry, palette))
    }
}

/// Group key of a numeric field: the shortest decimal form, absent when the
/// cell is not numeric.
fn numeric_key(record: &Record, field: &str) -> Option<String> {
    as_number(record, field).map(format_number)
}

/// A validated table entry, ready to aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    panel: Panel,
    kind: ChartKind,
    aggregation: Aggregation,
}

impl Selection {
    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn aggregation(&self) -> &Aggregation {
        &self.aggregation
    }
}

// =============================================================================
// Table
// =============================================================================

#[derive(Debug, Clone)]
pub struct ChartTable {
    entries: IndexMap<(Panel, ChartKind), Aggregation>,
    options: StatOptions,
}

impl ChartTable {
    /// Build a table, rejecting duplicate entries, empty field names and
    /// invalid options.
    pub fn new<I>(entries: I, options: StatOptions) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (Panel, ChartKind, Aggregation)>,
    {
        options.validate()?;

        let mut table = IndexMap::new();
        for (panel, kind, aggregation) in entries {
            for (name, field) in aggregation.fields() {
                if field.trim().is_empty() {
                    return Err(ConfigError::EmptyField(name));
                }
            }
            if table.insert((panel, kind), aggregation).is_some() {
                return Err(ConfigError::DuplicateEntry {
                    panel: panel.id(),
                    kind: kind.to_string(),
                });
            }
        }

        Ok(Self {
            entries: table,
            options,
        })
    }

    /// The four-panel dashboard over the configured field names.
    pub fn standard(config: &Config) -> Result<Self, ConfigError> {
        let f = &config.fields;
        let origin = f.origin.clone();
        let mpg = f.mpg.clone();
        let entries = vec![
            (Panel(1), ChartKind::Histogram, Aggregation::Histogram { value: mpg.clone(), group: origin.clone() }),
            (Panel(1), ChartKind::Boxplot, Aggregation::Boxplot { value: mpg.clone(), group: origin.clone() }),
            (Panel(1), ChartKind::Violin, Aggregation::Violin { value: mpg, group: origin.clone() }),
            (
                Panel(2),
                ChartKind::Bar,
                Aggregation::PairMean {
                    outer: f.cylinders.clone(),
                    inner: origin.clone(),
                    value: f.horsepower.clone(),
                },
            ),
            (
                Panel(2),
                ChartKind::Line,
                Aggregation::SeriesMean {
                    series: origin.clone(),
                    x: f.cylinders.clone(),
                    value: f.horsepower.clone(),
                },
            ),
            (
                Panel(2),
                ChartKind::Pie,
                Aggregation::PieMean {
                    key: f.cylinders.clone(),
                    value: f.horsepower.clone(),
                },
            ),
            (
                Panel(3),
                ChartKind::Scatter,
                Aggregation::Scatter {
                    x: f.displacement.clone(),
                    y: f.horsepower.clone(),
                    category: origin.clone(),
                },
            ),
            (
                Panel(3),
                ChartKind::Hexbin,
                Aggregation::Hexbin {
                    x: f.displacement.clone(),
                    y: f.horsepower.clone(),
                },
            ),
            (
                Panel(3),
                ChartKind::Contour,
                Aggregation::Contour {
                    x: f.displacement.clone(),
                    y: f.horsepower.clone(),
                },
            ),
            (
                Panel(4),
                ChartKind::GroupedBar,
                Aggregation::NestedMean {
                    outer: f.model_year.clone(),
                    inner: origin.clone(),
                    value: f.acceleration.clone(),
                },
            ),
            (
                Panel(4),
                ChartKind::StackedBar,
                Aggregation::Stack {
                    group: f.model_year.clone(),
                    category: origin.clone(),
                    value: f.acceleration.clone(),
                },
            ),
            (
                Panel(4),
                ChartKind::Area,
                Aggregation::Stack {
                    group: f.model_year.clone(),
                    category: origin,
                    value: f.acceleration.clone(),
                },
            ),
        ];

        Self::new(entries, config.stats.clone())
    }

    pub fn options(&self) -> &StatOptions {
        &self.options
    }

    /// Chart kinds available on `panel`, in table order.
    pub fn kinds(&self, panel: Panel) -> Vec<ChartKind> {
        self.entries
            .keys()
            .filter(|(p, _)| *p == panel)
            .map(|(_, k)| *k)
            .collect()
    }

    /// The kind a panel shows before the user picks one.
    pub fn default_kind(&self, panel: Panel) -> Option<ChartKind> {
        self.kinds(panel).into_iter().next()
    }

    pub fn select(&self, panel: Panel, kind: ChartKind) -> Result<Selection, ConfigError> {
        let aggregation = self
            .entries
            .get(&(panel, kind))
            .ok_or_else(|| ConfigError::UnsupportedSelection {
                panel: panel.id(),
                kind: kind.to_string(),
            })?;

        debug!("Selected {} on panel {}", kind, panel);
        Ok(Selection {
            panel,
            kind,
            aggregation: aggregation.clone(),
        })
    }

    /// Run the selection's aggregation. Empty or all-absent data gives an empty
    /// result, never an error.
    pub fn aggregate(&self, selection: &Selection, dataset: &Dataset) -> AggregateResult {
        let result = aggregate_with(&selection.aggregation, &self.options, dataset);
        debug!(
            "Aggregated {} on panel {}: {} rows in, {} marks out",
            selection.kind,
            selection.panel,
            dataset.len(),
            result.mark_count()
        );
        result
    }

    pub fn select_and_aggregate(
        &self,
        panel: Panel,
        kind: ChartKind,
        dataset: &Dataset,
    ) -> Result<AggregateResult, ConfigError> {
        let selection = self.select(panel, kind)?;
        Ok(self.aggregate(&selection, dataset))
    }
}

// =============================================================================
// Dispatch
// =============================================================================

fn aggregate_with(aggregation: &Aggregation, options: &StatOptions, dataset: &Dataset) -> AggregateResult {
    match aggregation {
        Aggregation::Histogram { value, group } => {
            AggregateResult::Histogram(histogram(dataset, value, group, options))
        }
        Aggregation::Boxplot { value, group } => {
            let groups = group_by(dataset, |r| as_category(r, group))
                .into_iter()
                .map(|(key, records)| {
                    let values = sorted(&numeric_values(records, value));
                    let summary = boxplot_summary(&values);
                    DistributionGroup { key, values, summary }
                })
                .collect();
            AggregateResult::Distribution(groups)
        }
        Aggregation::Violin { value, group } => {
            let groups = group_by(dataset, |r| as_category(r, group))
                .into_iter()
                .map(|(key, records)| {
                    let values = numeric_values(records, value);
                    let (bandwidth, samples) =
                        violin_density(&values, options.kde_bandwidth_factor, options.kde_samples);
                    let max_density = samples.iter().map(|s| s.density).reduce(f64::max);
                    DensityGroup {
                        key,
                        bandwidth,
                        samples,
                        max_density,
                    }
                })
                .collect();
            AggregateResult::Density(groups)
        }
        Aggregation::PairMean { outer, inner, value } => {
            let rows = rollup_mean(
                dataset,
                |r| vec![as_category(r, outer), as_category(r, inner)],
                |r| as_number(r, value),
            )
            .into_iter()
            .map(|(key, mean)| MeanRow { key, mean })
            .collect();
            AggregateResult::Means(rows)
        }
        Aggregation::SeriesMean { series, x, value } => {
            AggregateResult::Series(series_means(dataset, series, x, value))
        }
        Aggregation::PieMean { key, value } => {
            let entries: Vec<(String, f64)> = rollup_mean(
                dataset,
                |r| numeric_key(r, key),
                |r| as_number(r, value),
            )
            .into_iter()
            .filter_map(|(k, mean)| Some((k?, mean?)))
            .collect();
            AggregateResult::Pie(pie_layout(&entries))
        }
        Aggregation::Scatter { x, y, category } => {
            let points = dataset
                .iter()
                .filter_map(|r| {
                    Some(Point {
                        x: as_number(r, x)?,
                        y: as_number(r, y)?,
                        category: as_category(r, category),
                    })
                })
                .collect();
            AggregateResult::Points(points)
        }
        Aggregation::Hexbin { x, y } => AggregateResult::Hexbin(hexbins(dataset, x, y, options)),
        Aggregation::Contour { x, y } => AggregateResult::Contour(contours(dataset, x, y, options)),
        Aggregation::NestedMean { outer, inner, value } => {
            let rows = rollup_mean_nested(
                dataset,
                |r| as_category(r, outer),
                |r| as_category(r, inner),
                |r| as_number(r, value),
            )
            .into_iter()
            .flat_map(|(o, leaves)| {
                leaves.into_iter().map(move |(i, mean)| MeanRow {
                    key: vec![o.clone(), i],
                    mean,
                })
            })
            .collect();
            AggregateResult::Means(rows)
        }
        Aggregation::Stack { group, category, value } => {
            let categories = distinct(dataset, |r| as_category(r, category));
            let mut stacked = stack_series(
                dataset,
                &categories,
                |r| as_category(r, group),
                |r| as_category(r, category),
                |r| as_number(r, value),
            );
            stacked.sort_groups();
            AggregateResult::Stacked(stacked)
        }
    }
}

fn histogram(dataset: &Dataset, value: &str, group: &str, options: &StatOptions) -> Histogram {
    let all = numeric_values(dataset, value);
    let Some(domain) = extent(&all).map(|e| nice_domain(e, AXIS_TICKS)) else {
        return Histogram {
            domain: None,
            groups: Vec::new(),
        };
    };

    let groups = group_by(dataset, |r| as_category(r, group))
        .into_iter()
        .map(|(key, records)| {
            let values = numeric_values(records, value);
            BinnedGroup {
                key,
                bins: histogram_bins(&values, domain, options.histogram_thresholds),
            }
        })
        .collect();

    Histogram {
        domain: Some(domain),
        groups,
    }
}

fn series_means(dataset: &Dataset, series: &str, x: &str, value: &str) -> Vec<Series> {
    let mut xs = distinct(dataset, |r| numeric_key(r, x))
        .into_iter()
        .flatten()
        .collect::<Vec<String>>();
    xs.sort_by(|a, b| natural_cmp(a, b));

    rollup_mean_nested(
        dataset,
        |r| as_category(r, series),
        |r| numeric_key(r, x),
        |r| as_number(r, value),
    )
    .into_iter()
    .map(|(key, leaves)| {
        let means: IndexMap<String, Option<f64>> = leaves
            .into_iter()
            .filter_map(|(k, m)| Some((k?, m)))
            .collect();
        let points = xs
            .iter()
            .map(|xv| SeriesPoint {
                x: xv.clone(),
                mean: means.get(xv).copied().flatten(),
            })
            .collect();
        Series { key, points }
    })
    .collect()
}

/// Project the numeric pairs into the plot frame through the nice'd extents of
/// each axis.
fn project(dataset: &Dataset, x: &str, y: &str, options: &StatOptions) -> Option<(FrameMapping, Vec<(f64, f64)>)> {
    let pairs = numeric_pairs(dataset, x, y);
    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let x_domain = nice_domain(extent(&xs)?, AXIS_TICKS);
    let y_domain = nice_domain(extent(&ys)?, AXIS_TICKS);

    let frame = FrameMapping {
        width: options.frame.width,
        height: options.frame.height,
        x_domain,
        y_domain,
    };
    let sx = LinearMap::new(x_domain, (0.0, frame.width));
    let sy = LinearMap::new(y_domain, (0.0, frame.height));
    let projected = pairs.iter().map(|&(px, py)| (sx.apply(px), sy.apply(py))).collect();
    Some((frame, projected))
}

fn hexbins(dataset: &Dataset, x: &str, y: &str, options: &StatOptions) -> Hexbins {
    let radius = options.hex_radius;
    let Some((frame, points)) = project(dataset, x, y, options) else {
        return Hexbins {
            frame: None,
            radius,
            bins: Vec::new(),
            max_count: 0,
        };
    };

    let bins = spatial_bin(&points, radius, Extent::sized(frame.width, frame.height));
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0);
    Hexbins {
        frame: Some(frame),
        radius,
        bins,
        max_count,
    }
}

fn contours(dataset: &Dataset, x: &str, y: &str, options: &StatOptions) -> ContourDensity {
    let bandwidth = options.contour_bandwidth;
    let Some((frame, points)) = project(dataset, x, y, options) else {
        return ContourDensity {
            frame: None,
            bandwidth,
            grid: None,
            isolines: Vec::new(),
        };
    };

    let contour_options = ContourOptions {
        bandwidth,
        cell_size: options.contour_cell_size,
        thresholds: options.contour_thresholds,
    };
    let (grid, isolines) = contour_density(&points, Extent::sized(frame.width, frame.height), &contour_options);
    ContourDensity {
        frame: Some(frame),
        bandwidth,
        grid,
        isolines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CellValue, Record};
    use approx::assert_relative_eq;

    fn car(mpg: f64, cyl: f64, origin: &str, hp: Option<f64>, disp: f64, acc: f64, year: f64) -> Record {
        [
            ("MPG", CellValue::Number(mpg)),
            ("Cylinders", CellValue::Number(cyl)),
            ("Origin", CellValue::Text(origin.to_string())),
            ("Horsepower", hp.map(CellValue::Number).unwrap_or(CellValue::Empty)),
            ("Displacement", CellValue::Number(disp)),
            ("Acceleration", CellValue::Number(acc)),
            ("Model Year", CellValue::Number(year)),
        ]
        .into_iter()
        .collect()
    }

    fn cars() -> Dataset {
        Dataset::new(vec![
            car(18.0, 8.0, "USA", Some(130.0), 307.0, 12.0, 70.0),
            car(15.0, 8.0, "USA", Some(165.0), 350.0, 11.5, 70.0),
            car(24.0, 4.0, "Japan", Some(95.0), 113.0, 15.0, 70.0),
            car(26.0, 4.0, "Europe", Some(46.0), 97.0, 20.5, 71.0),
            car(27.0, 4.0, "Japan", Some(88.0), 97.0, 14.5, 71.0),
            car(25.0, 4.0, "USA", None, 98.0, 19.0, 71.0),
            car(22.0, 6.0, "USA", Some(100.0), 198.0, 15.5, 72.0),
        ])
    }

    fn table() -> ChartTable {
        ChartTable::standard(&Config::default()).unwrap()
    }

    fn run(kind: ChartKind, panel: u8) -> AggregateResult {
        table()
            .select_and_aggregate(Panel::new(panel).unwrap(), kind, &cars())
            .unwrap()
    }

    #[test]
    fn test_parse_panel_and_kind() {
        assert_eq!("2".parse::<Panel>().unwrap().id(), 2);
        assert!(matches!("5".parse::<Panel>(), Err(ConfigError::UnknownPanel(_))));
        assert!(matches!("x".parse::<Panel>(), Err(ConfigError::UnknownPanel(_))));
        assert_eq!("grouped-bar".parse::<ChartKind>().unwrap(), ChartKind::GroupedBar);
        assert_eq!("Hexbin".parse::<ChartKind>().unwrap(), ChartKind::Hexbin);
        assert!(matches!("radar".parse::<ChartKind>(), Err(ConfigError::UnknownChartKind(_))));
        for kind in ChartKind::ALL {
            assert_eq!(kind.to_string().parse::<ChartKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_standard_table_kinds() {
        let table = table();
        let p = |id| Panel::new(id).unwrap();
        assert_eq!(
            table.kinds(p(1)),
            vec![ChartKind::Histogram, ChartKind::Boxplot, ChartKind::Violin]
        );
        assert_eq!(table.kinds(p(3)), vec![ChartKind::Scatter, ChartKind::Hexbin, ChartKind::Contour]);
        assert_eq!(table.default_kind(p(2)), Some(ChartKind::Bar));
        assert_eq!(table.default_kind(p(4)), Some(ChartKind::GroupedBar));
    }

    #[test]
    fn test_select_rejects_unsupported_pair() {
        let err = table().select(Panel::new(1).unwrap(), ChartKind::Pie).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedSelection { panel: 1, .. }));
    }

    #[test]
    fn test_new_rejects_duplicates_and_empty_fields() {
        let agg = Aggregation::Hexbin {
            x: "a".to_string(),
            y: "b".to_string(),
        };
        let p = Panel::new(3).unwrap();
        let err = ChartTable::new(
            vec![(p, ChartKind::Hexbin, agg.clone()), (p, ChartKind::Hexbin, agg)],
            StatOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEntry { panel: 3, .. }));

        let empty = Aggregation::Hexbin {
            x: "".to_string(),
            y: "b".to_string(),
        };
        let err = ChartTable::new(vec![(p, ChartKind::Hexbin, empty)], StatOptions::default()).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyField("x")));
    }

    #[test]
    fn test_histogram_shares_domain() {
        let AggregateResult::Histogram(h) = run(ChartKind::Histogram, 1) else {
            panic!("expected histogram");
        };
        assert_eq!(h.domain, Some((15.0, 27.0)));
        let keys: Vec<&str> = h.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["USA", "Japan", "Europe"]);
        let total: usize = h.groups.iter().flat_map(|g| g.bins.iter()).map(|b| b.count).sum();
        assert_eq!(total, 7);
        let usa = &h.groups[0].bins;
        let japan = &h.groups[1].bins;
        assert_eq!(usa.len(), japan.len());
        assert_eq!(usa[0].lower_bound, japan[0].lower_bound);
    }

    #[test]
    fn test_boxplot_groups() {
        let AggregateResult::Distribution(groups) = run(ChartKind::Boxplot, 1) else {
            panic!("expected distribution");
        };
        assert_eq!(groups[0].key, "USA");
        assert_eq!(groups[0].values, vec![15.0, 18.0, 22.0, 25.0]);
        assert_relative_eq!(groups[0].summary.unwrap().median, 20.0);
        assert_eq!(groups[2].values, vec![26.0]);
    }

    #[test]
    fn test_violin_single_value_group_has_no_curve() {
        let AggregateResult::Density(groups) = run(ChartKind::Violin, 1) else {
            panic!("expected density");
        };
        assert_eq!(groups[0].samples.len(), 100);
        assert!(groups[0].max_density.unwrap() > 0.0);
        assert!(groups[2].bandwidth.is_none());
        assert!(groups[2].max_density.is_none());
    }

    #[test]
    fn test_bar_pair_means_skip_absent() {
        let AggregateResult::Means(rows) = run(ChartKind::Bar, 2) else {
            panic!("expected means");
        };
        assert_eq!(rows[0].key, vec!["8", "USA"]);
        assert_relative_eq!(rows[0].mean.unwrap(), 147.5);
        let usa4 = rows.iter().find(|r| r.key == vec!["4", "USA"]).unwrap();
        assert_eq!(usa4.mean, None);
    }

    #[test]
    fn test_line_series_over_sorted_cylinders() {
        let AggregateResult::Series(series) = run(ChartKind::Line, 2) else {
            panic!("expected series");
        };
        assert_eq!(series[0].key, "USA");
        let xs: Vec<&str> = series[0].points.iter().map(|p| p.x.as_str()).collect();
        assert_eq!(xs, vec!["4", "6", "8"]);
        assert_eq!(series[0].points[0].mean, None);
        assert_relative_eq!(series[0].points[1].mean.unwrap(), 100.0);
        let japan = &series[1];
        assert_relative_eq!(japan.points[0].mean.unwrap(), 91.5);
        assert_eq!(japan.points[2].mean, None);
    }

    #[test]
    fn test_pie_over_numeric_cylinders() {
        let AggregateResult::Pie(slices) = run(ChartKind::Pie, 2) else {
            panic!("expected pie");
        };
        let keys: Vec<&str> = slices.iter().map(|s| s.key.as_str()).collect();
        assert_eq!(keys, vec!["8", "4", "6"]);
        assert_relative_eq!(slices[2].end_angle, std::f64::consts::TAU);
    }

    #[test]
    fn test_scatter_points() {
        let AggregateResult::Points(points) = run(ChartKind::Scatter, 3) else {
            panic!("expected points");
        };
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].category, "USA");
    }

    #[test]
    fn test_hexbin_counts_every_point() {
        let AggregateResult::Hexbin(h) = run(ChartKind::Hexbin, 3) else {
            panic!("expected hexbin");
        };
        let frame = h.frame.unwrap();
        assert_eq!(frame.x_domain, (80.0, 360.0));
        assert_eq!(h.bins.iter().map(|b| b.count).sum::<usize>(), 6);
        assert!(h.max_count >= 1);
    }

    #[test]
    fn test_contour_has_isolines() {
        let AggregateResult::Contour(c) = run(ChartKind::Contour, 3) else {
            panic!("expected contour");
        };
        assert!(c.grid.is_some());
        assert!(!c.isolines.is_empty());
    }

    #[test]
    fn test_grouped_bar_year_then_origin() {
        let AggregateResult::Means(rows) = run(ChartKind::GroupedBar, 4) else {
            panic!("expected means");
        };
        assert_eq!(rows[0].key, vec!["70", "USA"]);
        assert_relative_eq!(rows[0].mean.unwrap(), 11.75);
        assert_eq!(rows[1].key, vec!["70", "Japan"]);
        assert_eq!(rows.len(), 6);
    }

    #[test]
    fn test_stacked_and_area_agree() {
        let stacked = run(ChartKind::StackedBar, 4);
        let area = run(ChartKind::Area, 4);
        assert_eq!(stacked, area);
        let AggregateResult::Stacked(s) = stacked else {
            panic!("expected stacked");
        };
        assert_eq!(s.groups, vec!["70", "71", "72"]);
        let cats: Vec<&str> = s.layers.iter().map(|l| l.category.as_str()).collect();
        assert_eq!(cats, vec!["USA", "Japan", "Europe"]);
        assert_relative_eq!(s.totals()[0], 11.75 + 15.0);
    }

    #[test]
    fn test_empty_dataset_gives_empty_results() {
        let table = table();
        let empty = Dataset::new(vec![]);
        for panel in Panel::ALL {
            for kind in table.kinds(panel) {
                let result = table.select_and_aggregate(panel, kind, &empty).unwrap();
                assert!(result.is_empty(), "{} on panel {} not empty", kind, panel);
            }
        }
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let table = table();
        let data = cars();
        for panel in Panel::ALL {
            for kind in table.kinds(panel) {
                let selection = table.select(panel, kind).unwrap();
                assert_eq!(table.aggregate(&selection, &data), table.aggregate(&selection, &data));
            }
        }
    }

    #[test]
    fn test_histogram_domain_ignores_threshold_count() {
        let mut config = Config::default();
        config.stats.histogram_thresholds = 3;
        let table = ChartTable::standard(&config).unwrap();
        let result = table
            .select_and_aggregate(Panel::new(1).unwrap(), ChartKind::Histogram, &cars())
            .unwrap();
        let AggregateResult::Histogram(h) = result else {
            panic!("expected histogram");
        };
        assert_eq!(h.domain, Some((15.0, 27.0)));
    }

    #[test]
    fn test_new_rejects_oversized_contour_grid() {
        let options = StatOptions {
            contour_cell_size: 0.0001,
            ..StatOptions::default()
        };
        let contour = Aggregation::Contour {
            x: "Displacement".to_string(),
            y: "Horsepower".to_string(),
        };
        let err = ChartTable::new(vec![(Panel::new(3).unwrap(), ChartKind::Contour, contour)], options).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOption { name: "contour_cell_size", .. }));
    }

    /// Category keys in a result that the renderer looks up a color for.
    fn colored_keys(result: &AggregateResult) -> Vec<String> {
        match result {
            AggregateResult::Histogram(h) => h.groups.iter().map(|g| g.key.clone()).collect(),
            AggregateResult::Distribution(groups) => groups.iter().map(|g| g.key.clone()).collect(),
            AggregateResult::Density(groups) => groups.iter().map(|g| g.key.clone()).collect(),
            AggregateResult::Means(rows) => rows.iter().filter_map(|r| r.key.last().cloned()).collect(),
            AggregateResult::Series(series) => series.iter().map(|s| s.key.clone()).collect(),
            AggregateResult::Pie(slices) => slices.iter().map(|s| s.key.clone()).collect(),
            AggregateResult::Points(points) => points.iter().map(|p| p.category.clone()).collect(),
            AggregateResult::Stacked(s) => s.layers.iter().map(|l| l.category.clone()).collect(),
            AggregateResult::Hexbin(_) | AggregateResult::Contour(_) => Vec::new(),
        }
    }

    #[test]
    fn test_every_result_key_has_a_color() {
        let mut data = cars().records().to_vec();
        let mut unnormalized = car(30.0, 4.0, "Japan", Some(70.0), 90.0, 16.0, 72.0);
        unnormalized.insert("Cylinders", CellValue::Text("4.0".to_string()));
        data.push(unnormalized);
        let data = Dataset::new(data);

        let table = table();
        let palette = ColorPalette::category10();
        for panel in Panel::ALL {
            for kind in table.kinds(panel) {
                let selection = table.select(panel, kind).unwrap();
                let result = table.aggregate(&selection, &data);
                let keys = colored_keys(&result);
                let Some(colors) = selection.aggregation().color_assignment(&data, &palette) else {
                    assert!(keys.is_empty(), "{} has keys but no colors", kind);
                    continue;
                };
                for key in keys {
                    assert!(colors.color_of(&key).is_some(), "{}: no color for '{}'", kind, key);
                }
            }
        }
    }

    #[test]
    fn test_pie_colors_use_numeric_keys() {
        let data = Dataset::new(vec![
            [("Cylinders", CellValue::Text("4.0".to_string())), ("Horsepower", CellValue::Number(90.0))]
                .into_iter()
                .collect(),
            [("Cylinders", CellValue::Number(8.0)), ("Horsepower", CellValue::Number(150.0))]
                .into_iter()
                .collect(),
            [("Cylinders", CellValue::Text("n/a".to_string())), ("Horsepower", CellValue::Number(10.0))]
                .into_iter()
                .collect(),
        ]);
        let selection = table().select(Panel::new(2).unwrap(), ChartKind::Pie).unwrap();
        let registry = selection.aggregation().color_categories(&data).unwrap();
        assert_eq!(registry.categories().collect::<Vec<_>>(), vec!["4", "8"]);
    }

    #[test]
    fn test_color_field() {
        let selection = table().select(Panel::new(3).unwrap(), ChartKind::Hexbin).unwrap();
        assert_eq!(selection.aggregation().color_field(), None);
        let selection = table().select(Panel::new(4).unwrap(), ChartKind::Area).unwrap();
        assert_eq!(selection.aggregation().color_field(), Some("Origin"));
    }
}
