// Two-dimensional density: hexagonal binning and contour density estimation

use std::f64::consts::PI;

use indexmap::IndexMap;
use log::warn;

use crate::ir::{DensityGrid, HexBin, Isoline};
use crate::scale::ticks;

/// Axis-aligned rectangle `[x0, x1] x [y0, y1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl Extent {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Extent anchored at the origin.
    pub fn sized(width: f64, height: f64) -> Self {
        Self::new(0.0, 0.0, width, height)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x0 && x <= self.x1 && y >= self.y0 && y <= self.y1
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Bin points into pointy-top hexagons of the given radius.
///
/// Columns are `2 r sin(pi/3)` apart, rows `1.5 r` apart and odd rows shift by
/// half a column. Points outside `extent` (or non-finite) are dropped. Bins are
/// returned in the order their first point was seen; empty bins never appear.
pub fn spatial_bin(points: &[(f64, f64)], radius: f64, extent: Extent) -> Vec<HexBin> {
    if !radius.is_finite() || radius <= 0.0 {
        return Vec::new();
    }

    let dx = radius * 2.0 * (PI / 3.0).sin();
    let dy = radius * 1.5;
    let mut bins: IndexMap<(i64, i64), HexBin> = IndexMap::new();

    for &(x, y) in points {
        if !x.is_finite() || !y.is_finite() || !extent.contains(x, y) {
            continue;
        }

        let py = y / dy;
        let mut pj = round_half_up(py);
        let px = x / dx - odd(pj) / 2.0;
        let mut pi = round_half_up(px);
        let py1 = py - pj;

        // Near the row boundary the nearest center may be in the adjacent row.
        if py1.abs() * 3.0 > 1.0 {
            let px1 = px - pi;
            let pi2 = pi + if px < pi { -0.5 } else { 0.5 };
            let pj2 = pj + if py < pj { -1.0 } else { 1.0 };
            let px2 = px - pi2;
            let py2 = py - pj2;
            if px1 * px1 + py1 * py1 > px2 * px2 + py2 * py2 {
                pi = pi2 + if odd(pj) == 1.0 { 0.5 } else { -0.5 };
                pj = pj2;
            }
        }

        let key = (pi as i64, pj as i64);
        let bin = bins.entry(key).or_insert_with(|| HexBin {
            x: (pi + odd(pj) / 2.0) * dx,
            y: pj * dy,
            count: 0,
        });
        bin.count += 1;
    }

    bins.into_values().collect()
}

/// 1.0 for odd rows (negative rows included), else 0.0.
fn odd(j: f64) -> f64 {
    ((j as i64) & 1) as f64
}

/// Parameters of the contour density estimate, in frame units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContourOptions {
    pub bandwidth: f64,
    pub cell_size: f64,
    pub thresholds: usize,
}

/// Largest grid `density_grid` will allocate.
pub const MAX_GRID_NODES: usize = 4_000_000;

/// Nodes needed to cover `extent` at `cell_size` spacing. Returned as `f64` so
/// oversized grids are caught before any cast or allocation.
pub fn grid_node_count(extent: Extent, cell_size: f64) -> f64 {
    ((extent.width() / cell_size).ceil() + 1.0) * ((extent.height() / cell_size).ceil() + 1.0)
}

/// Gaussian kernel density of the points, evaluated at grid nodes spaced
/// `cell_size` apart across `extent`. Density is in points per square frame
/// unit (it integrates to the point count).
pub fn density_grid(points: &[(f64, f64)], extent: Extent, bandwidth: f64, cell_size: f64) -> Option<DensityGrid> {
    if points.is_empty()
        || !bandwidth.is_finite()
        || bandwidth <= 0.0
        || !cell_size.is_finite()
        || cell_size <= 0.0
        || !(extent.width() > 0.0)
        || !(extent.height() > 0.0)
    {
        return None;
    }

    let nodes = grid_node_count(extent, cell_size);
    if !(nodes <= MAX_GRID_NODES as f64) {
        warn!("density grid of {} nodes exceeds the limit of {}", nodes, MAX_GRID_NODES);
        return None;
    }

    let cols = (extent.width() / cell_size).ceil() as usize + 1;
    let rows = (extent.height() / cell_size).ceil() as usize + 1;
    let two_var = 2.0 * bandwidth * bandwidth;
    let norm = 1.0 / (PI * two_var);
    let cutoff = (4.0 * bandwidth).powi(2);

    let mut values = vec![0.0; cols * rows];
    for &(px, py) in points {
        if !px.is_finite() || !py.is_finite() {
            continue;
        }
        for j in 0..rows {
            let gy = extent.y0 + j as f64 * cell_size;
            let dy2 = (gy - py).powi(2);
            if dy2 > cutoff {
                continue;
            }
            for i in 0..cols {
                let gx = extent.x0 + i as f64 * cell_size;
                let d2 = (gx - px).powi(2) + dy2;
                if d2 <= cutoff {
                    values[j * cols + i] += norm * (-d2 / two_var).exp();
                }
            }
        }
    }

    Some(DensityGrid {
        cols,
        rows,
        cell_size,
        values,
    })
}

/// Density grid plus isolines at round threshold values between zero
/// (exclusive) and the grid maximum.
pub fn contour_density(
    points: &[(f64, f64)],
    extent: Extent,
    options: &ContourOptions,
) -> (Option<DensityGrid>, Vec<Isoline>) {
    let Some(grid) = density_grid(points, extent, options.bandwidth, options.cell_size) else {
        return (None, Vec::new());
    };

    let max = grid.max();
    let isolines = if max > 0.0 {
        ticks(f64::MIN_POSITIVE, max, options.thresholds)
            .into_iter()
            .filter(|&t| t > 0.0)
            .map(|value| Isoline {
                value,
                segments: isoline_segments(&grid, extent, value),
            })
            .collect()
    } else {
        Vec::new()
    };

    (Some(grid), isolines)
}

/// Edges of a grid cell: 0 bottom (a-b), 1 right (b-c), 2 top (c-d),
/// 3 left (d-a), with corners a=(i,j) b=(i+1,j) c=(i+1,j+1) d=(i,j+1).
const CASES: [&[(usize, usize)]; 16] = [
    &[],
    &[(3, 0)],
    &[(0, 1)],
    &[(3, 1)],
    &[(1, 2)],
    &[(3, 0), (1, 2)],
    &[(0, 2)],
    &[(3, 2)],
    &[(2, 3)],
    &[(0, 2)],
    &[(0, 1), (2, 3)],
    &[(1, 2)],
    &[(1, 3)],
    &[(0, 1)],
    &[(3, 0)],
    &[],
];

/// Marching squares over the grid for one threshold. Crossing points are
/// linearly interpolated along cell edges.
pub fn isoline_segments(grid: &DensityGrid, extent: Extent, threshold: f64) -> Vec<[(f64, f64); 2]> {
    let mut segments = Vec::new();
    if grid.cols < 2 || grid.rows < 2 {
        return segments;
    }

    let node = |i: usize, j: usize| {
        (
            extent.x0 + i as f64 * grid.cell_size,
            extent.y0 + j as f64 * grid.cell_size,
        )
    };

    for j in 0..grid.rows - 1 {
        for i in 0..grid.cols - 1 {
            let corners = [
                (node(i, j), grid.get(i, j)),
                (node(i + 1, j), grid.get(i + 1, j)),
                (node(i + 1, j + 1), grid.get(i + 1, j + 1)),
                (node(i, j + 1), grid.get(i, j + 1)),
            ];

            let case = corners
                .iter()
                .enumerate()
                .fold(0usize, |acc, (bit, (_, v))| if *v >= threshold { acc | (1 << bit) } else { acc });

            for &(e1, e2) in CASES[case] {
                segments.push([
                    edge_crossing(&corners, e1, threshold),
                    edge_crossing(&corners, e2, threshold),
                ]);
            }
        }
    }

    segments
}

fn edge_crossing(corners: &[((f64, f64), f64); 4], edge: usize, threshold: f64) -> (f64, f64) {
    let ((p, vp), (q, vq)) = (corners[edge], corners[(edge + 1) % 4]);
    let t = if vq == vp { 0.5 } else { (threshold - vp) / (vq - vp) };
    (p.0 + t * (q.0 - p.0), p.1 + t * (q.1 - p.1))
}
