pub mod convolution;

pub use convolution::{
    ConvolutionError, FluxSample, FwhmConvolutionInput, ResolutionConvolution,
    ResolutionConvolutionInput, convolve_by_fwhm, convolve_by_resolution, fill_invalid,
    flag_non_finite, gaussian_kernel,
};

fn kahan_add(sum: &mut f64, correction: &mut f64, value: f64) {
    let corrected = value - *correction;
    let next = *sum + corrected;
    *correction = (next - *sum) - corrected;
    *sum = next;
}

pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut correction = 0.0;

    for &value in values {
        kahan_add(&mut sum, &mut correction, value);
    }

    sum
}

/// Sum over finite values only, the `nansum` of the windowed convolver.
pub fn finite_sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut sum = 0.0;
    let mut correction = 0.0;
    for value in values.into_iter().filter(|value| value.is_finite()) {
        kahan_add(&mut sum, &mut correction, value);
    }
    sum
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() || values.iter().any(|value| value.is_nan()) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let middle = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some(0.5 * (sorted[middle - 1] + sorted[middle]))
    } else {
        Some(sorted[middle])
    }
}

pub fn min_spacing(grid: &[f64]) -> Option<f64> {
    grid.windows(2)
        .map(|window| (window[1] - window[0]).abs())
        .min_by(f64::total_cmp)
}

pub fn is_strictly_increasing(grid: &[f64]) -> bool {
    grid.windows(2).all(|window| window[0] < window[1])
}

/// `count` points spaced evenly in log10 between `start` and `end`, both inclusive.
pub fn log_grid(start: f64, end: f64, count: usize) -> Option<Vec<f64>> {
    if count < 2 || !start.is_finite() || !end.is_finite() || start <= 0.0 || end <= 0.0 {
        return None;
    }

    let log_start = start.log10();
    let step = (end.log10() - log_start) / ((count - 1) as f64);
    let mut grid: Vec<f64> = (0..count)
        .map(|index| 10.0_f64.powf(log_start + step * index as f64))
        .collect();

    grid[0] = start;
    if let Some(last) = grid.last_mut() {
        *last = end;
    }

    Some(grid)
}

pub fn interpolate_linear(x: f64, x_grid: &[f64], y_grid: &[f64]) -> Option<f64> {
    if x_grid.len() < 2 || x_grid.len() != y_grid.len() {
        return None;
    }

    if !x_grid.windows(2).all(|window| window[0] <= window[1]) {
        return None;
    }

    Some(interpolate_unchecked(x, x_grid, y_grid))
}

pub fn interpolate_many(queries: &[f64], x_grid: &[f64], y_grid: &[f64]) -> Option<Vec<f64>> {
    if x_grid.len() < 2 || x_grid.len() != y_grid.len() {
        return None;
    }

    if !x_grid.windows(2).all(|window| window[0] <= window[1]) {
        return None;
    }

    Some(
        queries
            .iter()
            .map(|&x| interpolate_unchecked(x, x_grid, y_grid))
            .collect(),
    )
}

/// Fractional position of `x` within an increasing grid, clamped to `[0, len - 1]`.
///
/// This is the inverse of interpolating the grid against its own indices.
pub fn fractional_index(x: f64, grid: &[f64]) -> Option<f64> {
    if grid.len() < 2 {
        return None;
    }

    let last = grid.len() - 1;
    if x <= grid[0] {
        return Some(0.0);
    }
    if x >= grid[last] {
        return Some(last as f64);
    }

    let upper = grid.partition_point(|probe| *probe < x);
    let lower = upper - 1;
    let span = grid[upper] - grid[lower];
    if span == 0.0 {
        return Some(upper as f64);
    }
    Some(lower as f64 + (x - grid[lower]) / span)
}

pub(crate) fn interpolate_unchecked(x: f64, x_grid: &[f64], y_grid: &[f64]) -> f64 {
    let last = x_grid.len() - 1;
    if x.is_nan() {
        return f64::NAN;
    }
    if x <= x_grid[0] {
        return y_grid[0];
    }
    if x >= x_grid[last] {
        return y_grid[last];
    }

    let upper = x_grid.partition_point(|probe| *probe < x);
    let lower = upper - 1;
    let x0 = x_grid[lower];
    let x1 = x_grid[upper];
    if x1 == x0 {
        return y_grid[upper];
    }

    let fraction = (x - x0) / (x1 - x0);
    y_grid[lower] + fraction * (y_grid[upper] - y_grid[lower])
}
