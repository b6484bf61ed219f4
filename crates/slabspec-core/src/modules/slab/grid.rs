use crate::common::constants::SPEED_OF_LIGHT;
use crate::domain::{ComputeResult, SlabError};
use crate::numerics::{fractional_index, log_grid};
use std::ops::Range;

pub const VELOCITY_HALF_WIDTH_IN_SIGMA: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct VelocityGrid {
    step: f64,
    offsets: Vec<f64>,
}

impl VelocityGrid {
    /// `10 * oversample + 1` points spaced `sigma / oversample` apart, centred on zero.
    pub fn new(sigma: f64, oversample: usize) -> Self {
        let oversample = oversample.max(1);
        let step = sigma / oversample as f64;
        let half = VELOCITY_HALF_WIDTH_IN_SIGMA * oversample;
        let offsets = (0..=2 * half)
            .map(|index| step * (index as f64 - half as f64))
            .collect();
        Self { step, offsets }
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets_kms(&self) -> Vec<f64> {
        self.offsets.iter().map(|offset| offset * 1.0e-3).collect()
    }

    pub fn wavelengths(&self, centre_micron: f64) -> Vec<f64> {
        self.offsets
            .iter()
            .map(|offset| centre_micron * (1.0 + offset / SPEED_OF_LIGHT))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WavelengthGrid {
    points: Vec<f64>,
}

impl WavelengthGrid {
    /// Grid over `[wmin, wmax]` with `floor(oversample * wmax / (wmax - wmin) * c / sigma)` points.
    pub fn logarithmic(wmin: f64, wmax: f64, sigma: f64, oversample: usize) -> ComputeResult<Self> {
        let count = (oversample as f64 * wmax / (wmax - wmin) * (SPEED_OF_LIGHT / sigma)).floor();
        if !count.is_finite() || count < 2.0 {
            return Err(SlabError::input_validation(
                "INPUT.WAVELENGTH_GRID",
                format!(
                    "wavelength grid over [{wmin}, {wmax}] micron with sigma={sigma} m/s has {count} points, need at least 2"
                ),
            ));
        }

        let points = log_grid(wmin, wmax, count as usize).ok_or_else(|| {
            SlabError::input_validation(
                "INPUT.WAVELENGTH_GRID",
                format!("cannot build a logarithmic grid over [{wmin}, {wmax}] micron"),
            )
        })?;
        Ok(Self { points })
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<f64> {
        self.points
    }

    /// Grid indices covered by `[min_wave, max_wave]`.
    ///
    /// Both ends are mapped to fractional grid positions (clamped to the grid)
    /// and truncated, giving the half-open range `[floor(lo), floor(hi))`.
    /// A line entirely outside the grid yields an empty range.
    pub fn window(&self, min_wave: f64, max_wave: f64) -> Range<usize> {
        let start = fractional_index(min_wave, &self.points).unwrap_or(0.0) as usize;
        let end = fractional_index(max_wave, &self.points).unwrap_or(0.0) as usize;
        start..end.max(start)
    }
}
