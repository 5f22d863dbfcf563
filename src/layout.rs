use std::f64::consts::TAU;

use crate::ir::PieSlice;

/// Angles for a pie, keeping the input order. Slices run clockwise from 0 to
/// 2π proportionally to their value; non-positive values get a zero-width
/// slice at the current angle.
pub fn pie_layout(entries: &[(String, f64)]) -> Vec<PieSlice> {
    let total: f64 = entries
        .iter()
        .map(|(_, v)| *v)
        .filter(|v| *v > 0.0 && v.is_finite())
        .sum();
    let k = if total > 0.0 { TAU / total } else { 0.0 };

    let mut angle = 0.0;
    entries
        .iter()
        .map(|(key, value)| {
            let span = if *value > 0.0 && value.is_finite() { value * k } else { 0.0 };
            let slice = PieSlice {
                key: key.clone(),
                value: *value,
                start_angle: angle,
                end_angle: angle + span,
            };
            angle += span;
            slice
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn entries(values: &[f64]) -> Vec<(String, f64)> {
        values.iter().enumerate().map(|(i, v)| (i.to_string(), *v)).collect()
    }

    #[test]
    fn test_pie_layout_contiguous() {
        let slices = pie_layout(&entries(&[1.0, 2.0, 1.0]));
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0].start_angle, 0.0);
        assert_relative_eq!(slices[0].end_angle, TAU / 4.0);
        assert_relative_eq!(slices[1].end_angle, TAU * 3.0 / 4.0);
        for w in slices.windows(2) {
            assert_eq!(w[0].end_angle, w[1].start_angle);
        }
        assert_relative_eq!(slices[2].end_angle, TAU);
    }

    #[test]
    fn test_pie_layout_keeps_order_and_skips_negative() {
        let slices = pie_layout(&entries(&[3.0, -1.0, 1.0]));
        assert_eq!(slices[1].key, "1");
        assert_eq!(slices[1].start_angle, slices[1].end_angle);
        assert_relative_eq!(slices[2].end_angle, TAU);
    }

    #[test]
    fn test_pie_layout_all_zero() {
        let slices = pie_layout(&entries(&[0.0, 0.0]));
        assert!(slices.iter().all(|s| s.start_angle == 0.0 && s.end_angle == 0.0));
        assert!(pie_layout(&[]).is_empty());
    }
}
