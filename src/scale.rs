// Domain helpers: extents, "nice" rounding, tick thresholds, frame projection

const E10: f64 = 7.0710678118654755; // sqrt(50)
const E5: f64 = 3.1622776601683795; // sqrt(10)
const E2: f64 = 1.4142135623730951; // sqrt(2)

/// Min and max of the values, or `None` when there are none.
pub fn extent(values: &[f64]) -> Option<(f64, f64)> {
    let mut iter = values.iter().copied().filter(|v| !v.is_nan());
    let first = iter.next()?;
    Some(iter.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
}

/// Half-up rounding, so negative halves round toward positive infinity.
fn round_half_up(x: f64) -> f64 {
    (x + 0.5).floor()
}

/// Integer tick range `[i1, i2]` and signed increment for a span. A negative
/// increment means the tick value is `i / -inc` (used for sub-unit steps so
/// that 0.1-style ticks stay exact).
fn tick_spec(start: f64, stop: f64, count: f64) -> (f64, f64, f64) {
    let step = (stop - start) / count.max(0.0);
    let power = step.log10().floor();
    let error = step / 10f64.powf(power);
    let factor = if error >= E10 {
        10.0
    } else if error >= E5 {
        5.0
    } else if error >= E2 {
        2.0
    } else {
        1.0
    };

    let (mut i1, mut i2, inc);
    if power < 0.0 {
        let inv = 10f64.powf(-power) / factor;
        i1 = round_half_up(start * inv);
        i2 = round_half_up(stop * inv);
        if i1 / inv < start {
            i1 += 1.0;
        }
        if i2 / inv > stop {
            i2 -= 1.0;
        }
        inc = -inv;
    } else {
        inc = 10f64.powf(power) * factor;
        i1 = round_half_up(start / inc);
        i2 = round_half_up(stop / inc);
        if i1 * inc < start {
            i1 += 1.0;
        }
        if i2 * inc > stop {
            i2 -= 1.0;
        }
    }

    if i2 < i1 && (0.5..2.0).contains(&count) {
        return tick_spec(start, stop, count * 2.0);
    }
    (i1, i2, inc)
}

/// Signed tick increment (see [`tick_spec`]).
pub fn tick_increment(start: f64, stop: f64, count: usize) -> f64 {
    tick_spec(start, stop, count as f64).2
}

/// Roughly `count` round-numbered ticks covering `[start, stop]`, always
/// inside the span.
pub fn ticks(start: f64, stop: f64, count: usize) -> Vec<f64> {
    if count == 0 || !start.is_finite() || !stop.is_finite() {
        return Vec::new();
    }
    if start == stop {
        return vec![start];
    }

    let reverse = stop < start;
    let (lo, hi) = if reverse { (stop, start) } else { (start, stop) };
    let (i1, i2, inc) = tick_spec(lo, hi, count as f64);
    if !(i2 >= i1) {
        return Vec::new();
    }

    let n = (i2 - i1) as usize + 1;
    let mut out: Vec<f64> = (0..n)
        .map(|i| {
            let k = i1 + i as f64;
            if inc < 0.0 {
                k / -inc
            } else {
                k * inc
            }
        })
        .collect();
    if reverse {
        out.reverse();
    }
    out
}

/// Extend a domain outward to round tick values. Degenerate or non-finite
/// domains come back unchanged.
pub fn nice_domain(domain: (f64, f64), count: usize) -> (f64, f64) {
    let (mut start, mut stop) = domain;
    if !start.is_finite() || !stop.is_finite() || start == stop || count == 0 {
        return domain;
    }
    let reverse = stop < start;
    if reverse {
        std::mem::swap(&mut start, &mut stop);
    }

    let mut prestep = f64::NAN;
    for _ in 0..10 {
        let step = tick_increment(start, stop, count);
        if step == prestep {
            return if reverse { (stop, start) } else { (start, stop) };
        } else if step > 0.0 {
            start = (start / step).floor() * step;
            stop = (stop / step).ceil() * step;
        } else if step < 0.0 {
            start = (start * step).ceil() / step;
            stop = (stop * step).floor() / step;
        } else {
            break;
        }
        prestep = step;
    }
    domain
}

/// Linear mapping from a data domain onto a frame range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearMap {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearMap {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    /// Degenerate domains map everything to the middle of the range.
    pub fn apply(&self, x: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        let span = d1 - d0;
        let t = if span == 0.0 { 0.5 } else { (x - d0) / span };
        r0 + t * (r1 - r0)
    }

    pub fn invert(&self, y: f64) -> f64 {
        LinearMap::new(self.range, self.domain).apply(y)
    }
}
