//! Terminal plot of one profile.
//!
//! A fixed character grid: measured concentrations as `o`, the fitted erfc
//! profile as `-`. Output is deterministic so it can be compared verbatim in
//! tests.

use crate::domain::{DiffusionParams, ProfileSeries};
use crate::models::predict;

/// Vertical headroom as a fraction of the concentration span.
const MARGIN: f64 = 0.05;

/// Render observed points and, if given, the fitted profile.
pub fn render_profile_plot(
    series: &ProfileSeries,
    params: Option<&DiffusionParams>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = x_range(series).unwrap_or((0.0, 1.0));
    let curve: Option<Vec<(f64, f64)>> = params.map(|p| sample_curve(p, x_min, x_max, width));

    let (c_lo, c_hi) = c_range(series, curve.as_deref()).unwrap_or((0.0, 1.0));
    let margin = ((c_hi - c_lo) * MARGIN).max(1e-12);
    let (c_min, c_max) = (c_lo - margin, c_hi + margin);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    if let Some(curve) = &curve {
        draw_curve(&mut grid, curve, x_min, x_max, c_min, c_max);
    }

    for (&x, &c) in series.x.iter().zip(&series.c) {
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(c, c_min, c_max, height);
        grid[row][col] = 'o';
    }

    let header = format!("Plot: x=[{x_min:.3}, {x_max:.3}] | c=[{c_min:.2}, {c_max:.2}]\n");
    grid.into_iter().fold(header, |mut out, row| {
        out.extend(row);
        out.push('\n');
        out
    })
}

fn x_range(series: &ProfileSeries) -> Option<(f64, f64)> {
    let min = series.x.iter().copied().fold(f64::INFINITY, f64::min);
    let max = series.x.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if min.is_finite() && max.is_finite() && max > min {
        Some((min, max))
    } else {
        None
    }
}

fn sample_curve(params: &DiffusionParams, x_min: f64, x_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    (0..n)
        .map(|i| {
            let u = i as f64 / (n as f64 - 1.0);
            let x = x_min + u * (x_max - x_min);
            (x, predict(x, params))
        })
        .collect()
}

fn c_range(series: &ProfileSeries, curve: Option<&[(f64, f64)]>) -> Option<(f64, f64)> {
    let mut min_c = f64::INFINITY;
    let mut max_c = f64::NEG_INFINITY;

    for &c in &series.c {
        min_c = min_c.min(c);
        max_c = max_c.max(c);
    }
    if let Some(curve) = curve {
        for &(_, c) in curve {
            if c.is_finite() {
                min_c = min_c.min(c);
                max_c = max_c.max(c);
            }
        }
    }

    if min_c.is_finite() && max_c.is_finite() && max_c > min_c {
        Some((min_c, max_c))
    } else {
        None
    }
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(c: f64, c_min: f64, c_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((c - c_min) / (c_max - c_min)).clamp(0.0, 1.0);
    // c_max maps to row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

/// One curve sample per column; vertical gaps between neighbours are bridged
/// so steep parts of the profile stay connected.
fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, c_min: f64, c_max: f64) {
    let Some(width) = grid.first().map(Vec::len) else {
        return;
    };
    let height = grid.len();

    let mut last_row: Option<usize> = None;
    for &(x, c) in curve {
        if !c.is_finite() {
            last_row = None;
            continue;
        }
        let col = map_x(x, x_min, x_max, width);
        let row = map_y(c, c_min, c_max, height);
        let (top, bottom) = match last_row {
            Some(prev) if prev < row => (prev + 1, row),
            Some(prev) if prev > row => (row, prev - 1),
            _ => (row, row),
        };
        for line in grid.iter_mut().take(bottom + 1).skip(top) {
            line[col] = '-';
        }
        last_row = Some(row);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plot_golden_snapshot_small() {
        let series = ProfileSeries {
            x: vec![1.0, 10.0],
            c: vec![100.0, 110.0],
        };
        // slope = 0 is a flat profile at c0.
        let flat = DiffusionParams { slope: 0.0, c0: 100.0 };

        let txt = render_profile_plot(&series, Some(&flat), 10, 5);
        let expected = concat!(
            "Plot: x=[1.000, 10.000] | c=[99.50, 110.50]\n",
            "         o\n",
            "          \n",
            "          \n",
            "          \n",
            "o---------\n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn points_only_without_params() {
        let series = ProfileSeries {
            x: vec![0.0, 4.0],
            c: vec![2.0, 0.0],
        };
        let txt = render_profile_plot(&series, None, 10, 5);
        // The header carries the axis ranges, which may be negative.
        assert!(txt.lines().skip(1).all(|l| !l.contains('-')), "{txt}");
        assert_eq!(txt.matches('o').count(), 2);
    }

    #[test]
    fn fitted_curve_covers_every_column() {
        let params = DiffusionParams { slope: 0.5, c0: 2.0 };
        let mut series = ProfileSeries::with_capacity(5);
        for i in 0..5 {
            let x = i as f64;
            series.push(x, predict(x, &params));
        }

        let txt = render_profile_plot(&series, Some(&params), 20, 8);
        let rows: Vec<Vec<char>> = txt.lines().skip(1).map(|l| l.chars().collect()).collect();
        assert_eq!(rows.len(), 8);
        for col in 0..20 {
            assert!(rows.iter().any(|r| r[col] != ' '), "empty column {col}");
        }
        // Highest concentration sits at x = 0, top-left.
        assert_eq!(rows[0][0], 'o');
    }
}
