use super::{
    finite_sum, interpolate_many, interpolate_unchecked, is_strictly_increasing, median,
    min_spacing,
};
use crate::common::constants::{GAUSSIAN_FWHM_PER_SIGMA, SPEED_OF_LIGHT, SPEED_OF_LIGHT_KMS};
use num_complex::Complex64;
use realfft::RealFftPlanner;
use std::f64::consts::PI;

const NYQUIST_SAMPLING: f64 = 2.0;
const KERNEL_EXTENT_IN_SIGMA: f64 = 8.0;
const WINDOW_HALF_WIDTH_IN_SIGMA: f64 = 4.0;
const MIN_WINDOW_HALF_WIDTH: usize = 10;
const MAX_WINDOW_HALF_WIDTH: usize = 1 << 20;
const MIN_WINDOWED_POINTS: usize = 3;
const LOCAL_VELOCITY_STEP_IN_SIGMA: f64 = 0.2;
const LOCAL_VELOCITY_EXTRA_STEPS: f64 = 3.0;

/// A flux sample that may be missing; `None` marks an invalid pixel.
pub type FluxSample = Option<f64>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionConvolutionInput<'a> {
    pub wave: &'a [f64],
    pub flux: &'a [f64],
    /// Velocity resolution element in km/s, R = c / dv.
    pub dv_kms: f64,
}

impl<'a> ResolutionConvolutionInput<'a> {
    pub fn new(wave: &'a [f64], flux: &'a [f64], dv_kms: f64) -> Self {
        Self { wave, flux, dv_kms }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FwhmConvolutionInput<'a> {
    pub wave: &'a [f64],
    pub flux: &'a [FluxSample],
    pub fwhm_kms: f64,
}

impl<'a> FwhmConvolutionInput<'a> {
    pub fn new(wave: &'a [f64], flux: &'a [FluxSample], fwhm_kms: f64) -> Self {
        Self {
            wave,
            flux,
            fwhm_kms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConvolutionError {
    #[error("spectral convolution requires at least 2 wavelength points, got {actual}")]
    InsufficientPoints { actual: usize },
    #[error("spectral input length mismatch: wave={wave}, flux={flux}")]
    LengthMismatch { wave: usize, flux: usize },
    #[error("wavelength entry must be finite and > 0 at index {index}, got {value}")]
    InvalidWavelength { index: usize, value: f64 },
    #[error(
        "wavelength grid must be strictly increasing, index {index} has {current} after {previous}"
    )]
    NonIncreasingWavelength {
        index: usize,
        previous: f64,
        current: f64,
    },
    #[error("{field} must be finite and > 0 km/s, got {value}")]
    InvalidVelocity { field: &'static str, value: f64 },
    #[error(
        "wavelength range is too small for the kernel: half window of {half_width} samples leaves {points} points"
    )]
    KernelWiderThanRange { half_width: usize, points: usize },
    #[error("kernel half window of {half_width} samples exceeds the limit of {limit}")]
    WindowTooLarge { half_width: f64, limit: usize },
    #[error("resolution element of {dv_kms} km/s is below floating point precision of the grid")]
    StepBelowPrecision { dv_kms: f64 },
    #[error("fft convolution failed: {0}")]
    Fft(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionConvolution {
    pub flux: Vec<f64>,
    sampling: f64,
    resampled_points: usize,
}

impl ResolutionConvolution {
    /// Samples per resolution element on the intermediate grid, never below 2.
    pub fn sampling(&self) -> f64 {
        self.sampling
    }

    pub fn resampled_points(&self) -> usize {
        self.resampled_points
    }

    pub fn into_flux(self) -> Vec<f64> {
        self.flux
    }
}

/// Convolves a spectrum to a constant resolving power `R = c / dv`.
///
/// The flux is resampled onto a grid with a fixed number of samples per
/// resolution element, convolved there with a single Gaussian by FFT, and
/// interpolated back onto the input grid.
pub fn convolve_by_resolution(
    input: ResolutionConvolutionInput<'_>,
) -> Result<ResolutionConvolution, ConvolutionError> {
    validate_wavelength_grid(input.wave, input.flux.len())?;
    validate_velocity("dv_kms", input.dv_kms)?;

    let wave = input.wave;
    let resolving_power = SPEED_OF_LIGHT / (input.dv_kms * 1.0e3);
    let min_step = min_spacing(wave).ok_or(ConvolutionError::InsufficientPoints {
        actual: wave.len(),
    })?;

    let fwhm: Vec<f64> = wave.iter().map(|value| value / resolving_power).collect();
    let sampling = fwhm
        .iter()
        .map(|width| width / min_step)
        .fold(f64::INFINITY, f64::min)
        .max(NYQUIST_SAMPLING);
    let steps: Vec<f64> = fwhm.iter().map(|width| width / sampling).collect();

    let resampled_wave = cumulative_grid(wave[0], &steps);
    if !is_strictly_increasing(&resampled_wave) {
        return Err(ConvolutionError::StepBelowPrecision {
            dv_kms: input.dv_kms,
        });
    }
    let resampled_flux = interpolate_many(&resampled_wave, wave, input.flux).ok_or(
        ConvolutionError::InsufficientPoints {
            actual: wave.len(),
        },
    )?;

    let kernel = gaussian_kernel(sampling / GAUSSIAN_FWHM_PER_SIGMA);
    let convolved = fft_convolve_extended(&resampled_flux, &kernel)?;

    let flux = interpolate_many(wave, &resampled_wave, &convolved).ok_or(
        ConvolutionError::InsufficientPoints {
            actual: resampled_wave.len(),
        },
    )?;

    Ok(ResolutionConvolution {
        flux,
        sampling,
        resampled_points: resampled_wave.len(),
    })
}

/// Convolves a near-uniformly sampled spectrum with a Gaussian of fixed FWHM
/// in velocity, evaluated pixel by pixel on a local window.
///
/// Invalid samples are excluded from each window's normalization and stay
/// invalid in the output.
pub fn convolve_by_fwhm(
    input: FwhmConvolutionInput<'_>,
) -> Result<Vec<FluxSample>, ConvolutionError> {
    validate_wavelength_grid(input.wave, input.flux.len())?;
    validate_velocity("fwhm_kms", input.fwhm_kms)?;

    let wave = input.wave;
    let point_count = wave.len();
    let sigma = input.fwhm_kms / GAUSSIAN_FWHM_PER_SIGMA;
    let step = wave[1] - wave[0];
    let centre = median(wave).ok_or(ConvolutionError::InsufficientPoints {
        actual: point_count,
    })?;

    let half_width = ((WINDOW_HALF_WIDTH_IN_SIGMA * sigma / SPEED_OF_LIGHT_KMS) * centre / step)
        .round()
        .max(MIN_WINDOW_HALF_WIDTH as f64);
    if !half_width.is_finite() || half_width > MAX_WINDOW_HALF_WIDTH as f64 {
        return Err(ConvolutionError::WindowTooLarge {
            half_width,
            limit: MAX_WINDOW_HALF_WIDTH,
        });
    }
    let half_width = half_width as usize;

    // Every original sample gets a full window from the zero padding; the
    // window only degrades once it reaches past half of the padded array.
    let padded_len = point_count + 2 * half_width;
    if 2 * half_width + MIN_WINDOWED_POINTS > padded_len {
        tracing::warn!(
            half_width,
            point_count,
            "wavelength range is too small for the convolution kernel"
        );
        return Err(ConvolutionError::KernelWiderThanRange {
            half_width,
            points: point_count,
        });
    }

    let padded_wave: Vec<f64> = (0..half_width)
        .map(|offset| wave[0] - step * (half_width - offset) as f64)
        .chain(wave.iter().copied())
        .chain((1..=half_width).map(|offset| wave[point_count - 1] + step * offset as f64))
        .collect();
    let padding = std::iter::repeat_n(Some(0.0), half_width);
    let padded_flux: Vec<FluxSample> = padding
        .clone()
        .chain(input.flux.iter().copied())
        .chain(padding)
        .collect();
    let original_mask: Vec<bool> = std::iter::repeat_n(false, half_width)
        .chain(std::iter::repeat_n(true, point_count))
        .chain(std::iter::repeat_n(false, half_width))
        .collect();

    let mut convolved = padded_flux.clone();
    for centre_index in half_width..half_width + point_count {
        let window = centre_index - half_width..=centre_index + half_width;
        let centre_wave = padded_wave[centre_index];
        let offsets: Vec<f64> = padded_wave[window.clone()]
            .iter()
            .map(|value| (value - centre_wave) / centre_wave * SPEED_OF_LIGHT_KMS)
            .collect();
        let weights = window_kernel(&offsets, sigma);
        convolved[centre_index] = weighted_average(&padded_flux[window], &weights);
    }

    for (output, original) in convolved.iter_mut().zip(&padded_flux) {
        if !is_valid(*original) {
            *output = None;
        }
    }

    Ok(convolved
        .into_iter()
        .zip(original_mask)
        .filter_map(|(sample, original)| original.then_some(sample))
        .collect())
}

pub fn flag_non_finite(flux: &[f64]) -> Vec<FluxSample> {
    flux.iter()
        .map(|value| value.is_finite().then_some(*value))
        .collect()
}

pub fn fill_invalid(flux: &[FluxSample], fill: f64) -> Vec<f64> {
    flux.iter().map(|sample| sample.unwrap_or(fill)).collect()
}

/// Unit-sum Gaussian sampled at integer offsets, `ceil(8 sigma)` rounded up to odd.
pub fn gaussian_kernel(sigma_samples: f64) -> Vec<f64> {
    let mut size = (KERNEL_EXTENT_IN_SIGMA * sigma_samples).ceil().max(1.0) as usize;
    if size % 2 == 0 {
        size += 1;
    }
    let half = (size / 2) as f64;
    let mut kernel: Vec<f64> = (0..size)
        .map(|index| {
            let x = (index as f64 - half) / sigma_samples;
            (-0.5 * x * x).exp()
        })
        .collect();
    let total: f64 = kernel.iter().sum();
    for weight in &mut kernel {
        *weight /= total;
    }
    kernel
}

pub fn gaussian_profile(x: f64, mean: f64, sigma: f64, area: f64) -> f64 {
    let z = (x - mean) / sigma;
    area / (sigma * (2.0 * PI).sqrt()) * (-0.5 * z * z).exp()
}

fn is_valid(sample: FluxSample) -> bool {
    sample.is_some_and(f64::is_finite)
}

fn cumulative_grid(start: f64, steps: &[f64]) -> Vec<f64> {
    steps
        .iter()
        .scan(start, |current, step| {
            *current += step;
            Some(*current)
        })
        .collect()
}

/// Linear convolution of `signal` with an odd-length `kernel`, extending the
/// signal with its edge values so the output keeps the signal length.
fn fft_convolve_extended(signal: &[f64], kernel: &[f64]) -> Result<Vec<f64>, ConvolutionError> {
    let half = kernel.len() / 2;
    let first = signal[0];
    let last = signal[signal.len() - 1];
    let extended: Vec<f64> = std::iter::repeat_n(first, half)
        .chain(signal.iter().copied())
        .chain(std::iter::repeat_n(last, half))
        .collect();

    let fft_len = extended.len() + kernel.len() - 1;
    let mut planner = RealFftPlanner::<f64>::new();
    let forward = planner.plan_fft_forward(fft_len);
    let inverse = planner.plan_fft_inverse(fft_len);

    let mut signal_buffer = forward.make_input_vec();
    signal_buffer[..extended.len()].copy_from_slice(&extended);
    let mut kernel_buffer = forward.make_input_vec();
    kernel_buffer[..kernel.len()].copy_from_slice(kernel);

    let mut signal_spectrum = forward.make_output_vec();
    let mut kernel_spectrum = forward.make_output_vec();
    forward
        .process(&mut signal_buffer, &mut signal_spectrum)
        .map_err(|error| ConvolutionError::Fft(error.to_string()))?;
    forward
        .process(&mut kernel_buffer, &mut kernel_spectrum)
        .map_err(|error| ConvolutionError::Fft(error.to_string()))?;

    multiply_spectra(&mut signal_spectrum, &kernel_spectrum, fft_len);

    let mut full = inverse.make_output_vec();
    inverse
        .process(&mut signal_spectrum, &mut full)
        .map_err(|error| ConvolutionError::Fft(error.to_string()))?;

    let scale = 1.0 / fft_len as f64;
    Ok(full[2 * half..2 * half + signal.len()]
        .iter()
        .map(|value| value * scale)
        .collect())
}

fn multiply_spectra(lhs: &mut [Complex64], rhs: &[Complex64], fft_len: usize) {
    for (left, right) in lhs.iter_mut().zip(rhs) {
        *left *= *right;
    }
    // The inverse real transform requires purely real DC and Nyquist bins.
    lhs[0].im = 0.0;
    if fft_len % 2 == 0
        && let Some(nyquist) = lhs.last_mut()
    {
        nyquist.im = 0.0;
    }
}

fn window_kernel(offsets: &[f64], sigma: f64) -> Vec<f64> {
    let (low, high) = offsets
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(low, high), value| {
            (low.min(*value), high.max(*value))
        });
    let step = LOCAL_VELOCITY_STEP_IN_SIGMA * sigma;
    let count = ((high - low) / step + LOCAL_VELOCITY_EXTRA_STEPS).ceil() as usize;
    let middle = (count - 1) as f64 / 2.0;
    let velocity: Vec<f64> = (0..count)
        .map(|index| step * (index as f64 - middle))
        .collect();
    let profile: Vec<f64> = velocity
        .iter()
        .map(|value| gaussian_profile(*value, 0.0, sigma, 1.0))
        .collect();

    let mut weights: Vec<f64> = offsets
        .iter()
        .map(|offset| interpolate_unchecked(*offset, &velocity, &profile))
        .collect();
    let total = finite_sum(weights.iter().copied());
    if total > 0.0 {
        for weight in &mut weights {
            *weight /= total;
        }
    }
    weights
}

fn weighted_average(flux: &[FluxSample], weights: &[f64]) -> FluxSample {
    let mut numerator = 0.0;
    let mut norm = 0.0;
    for (sample, weight) in flux.iter().zip(weights) {
        if let Some(value) = sample.filter(|value| value.is_finite()) {
            numerator += value * weight;
            norm += weight;
        }
    }

    let average = numerator / norm;
    (norm > 0.0 && average.is_finite()).then_some(average)
}

fn validate_velocity(field: &'static str, value: f64) -> Result<(), ConvolutionError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConvolutionError::InvalidVelocity { field, value })
    }
}

fn validate_wavelength_grid(wave: &[f64], flux_len: usize) -> Result<(), ConvolutionError> {
    if wave.len() < 2 {
        return Err(ConvolutionError::InsufficientPoints { actual: wave.len() });
    }
    if wave.len() != flux_len {
        return Err(ConvolutionError::LengthMismatch {
            wave: wave.len(),
            flux: flux_len,
        });
    }

    for (index, value) in wave.iter().copied().enumerate() {
        if !value.is_finite() || value <= 0.0 {
            return Err(ConvolutionError::InvalidWavelength { index, value });
        }

        if index > 0 {
            let previous = wave[index - 1];
            if value <= previous {
                return Err(ConvolutionError::NonIncreasingWavelength {
                    index,
                    previous,
                    current: value,
                });
            }
        }
    }

    Ok(())
}
