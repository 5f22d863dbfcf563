// Univariate statistics: mean, quantiles, box-plot summary, binning, KDE

use crate::ir::{Bin, BoxplotSummary, DensitySample};
use crate::scale::{extent, ticks};

/// Arithmetic mean. `None` for an empty slice so callers never plot a phantom
/// zero.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Ascending copy of the values.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(f64::total_cmp);
    out
}

/// Linear-interpolation quantile of already sorted data: rank `p * (n - 1)`,
/// interpolated between the floor and ceil elements.
pub fn quantile(sorted_data: &[f64], p: f64) -> Option<f64> {
    let n = sorted_data.len();
    if n == 0 || p.is_nan() {
        return None;
    }
    if n == 1 {
        return Some(sorted_data[0]);
    }

    let rank = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = rank.ceil() as usize;

    if lower_idx == upper_idx {
        Some(sorted_data[lower_idx])
    } else {
        let weight = rank - lower_idx as f64;
        let lo = sorted_data[lower_idx];
        let hi = sorted_data[upper_idx];
        Some(lo + (hi - lo) * weight)
    }
}

/// Quartiles and Tukey whiskers. Whiskers stop at the data range, so values
/// beyond them are folded into the whisker bound rather than reported.
pub fn boxplot_summary(values: &[f64]) -> Option<BoxplotSummary> {
    let ys = sorted(values);
    let q1 = quantile(&ys, 0.25)?;
    let median = quantile(&ys, 0.5)?;
    let q3 = quantile(&ys, 0.75)?;
    let iqr = q3 - q1;

    let min = ys[0];
    let max = ys[ys.len() - 1];

    Some(BoxplotSummary {
        q1,
        median,
        q3,
        lower_whisker: min.max(q1 - 1.5 * iqr),
        upper_whisker: max.min(q3 + 1.5 * iqr),
    })
}

/// Bin values over `domain` using the round tick values of the domain as
/// thresholds (about `threshold_count` of them).
///
/// A value equal to a threshold lands in the bin above it. Values outside the
/// domain are clamped into the edge bins, so the counts always add up to
/// `values.len()`.
pub fn histogram_bins(values: &[f64], domain: (f64, f64), threshold_count: usize) -> Vec<Bin> {
    let (x0, x1) = domain;
    if values.is_empty() || !x0.is_finite() || !x1.is_finite() || x1 < x0 {
        return Vec::new();
    }

    let thresholds: Vec<f64> = ticks(x0, x1, threshold_count)
        .into_iter()
        .filter(|&t| t > x0 && t < x1)
        .collect();
    let m = thresholds.len();

    let mut bins: Vec<Bin> = (0..=m)
        .map(|i| Bin {
            lower_bound: if i == 0 { x0 } else { thresholds[i - 1] },
            upper_bound: if i < m { thresholds[i] } else { x1 },
            count: 0,
        })
        .collect();

    for &v in values {
        let idx = thresholds.partition_point(|&t| t <= v);
        bins[idx].count += 1;
    }

    bins
}

/// Epanechnikov kernel scaled by `bandwidth`.
pub fn epanechnikov(bandwidth: f64) -> impl Fn(f64) -> f64 {
    move |u| {
        let v = u / bandwidth;
        if v.abs() <= 1.0 {
            0.75 * (1.0 - v * v) / bandwidth
        } else {
            0.0
        }
    }
}

/// Density at each sample point: the mean kernel contribution of all values.
pub fn kernel_density_estimate(
    values: &[f64],
    bandwidth: f64,
    sample_points: &[f64],
) -> Vec<DensitySample> {
    if values.is_empty() || !bandwidth.is_finite() || bandwidth <= 0.0 {
        return Vec::new();
    }

    let kernel = epanechnikov(bandwidth);
    let n = values.len() as f64;
    sample_points
        .iter()
        .map(|&x| DensitySample {
            x,
            density: values.iter().map(|&v| kernel(x - v)).sum::<f64>() / n,
        })
        .collect()
}

/// `count` evenly spaced points from `min` (inclusive) toward `max`
/// (exclusive).
pub fn sample_points(min: f64, max: f64, count: usize) -> Vec<f64> {
    if count == 0 || !min.is_finite() || !max.is_finite() || max <= min {
        return Vec::new();
    }
    let step = (max - min) / count as f64;
    (0..count).map(|i| min + i as f64 * step).collect()
}

/// Bandwidth proportional to the spread of this group's own values.
pub fn adaptive_bandwidth(values: &[f64], factor: f64) -> Option<f64> {
    let (lo, hi) = extent(values)?;
    let bw = factor * (hi - lo);
    (bw > 0.0 && bw.is_finite()).then_some(bw)
}

/// Violin curve for one group: adaptive bandwidth, samples across the group's
/// own range.
pub fn violin_density(values: &[f64], factor: f64, samples: usize) -> (Option<f64>, Vec<DensitySample>) {
    let Some(bandwidth) = adaptive_bandwidth(values, factor) else {
        return (None, Vec::new());
    };
    let (lo, hi) = match extent(values) {
        Some(e) => e,
        None => return (None, Vec::new()),
    };
    let points = sample_points(lo, hi, samples);
    (Some(bandwidth), kernel_density_estimate(values, bandwidth, &points))
}
