//! Slab-model spectral synthesis.
//!
//! A slab is a homogeneous layer of gas at one temperature and column
//! density. Every transition is given a Gaussian optical depth profile on a
//! shared velocity grid, the profiles are summed on a logarithmic wavelength
//! grid and the emergent flux is the Planck function attenuated by
//! `1 - exp(-tau)` and diluted by the solid angle of the emitting area.

mod grid;
mod model;

pub use grid::{VELOCITY_HALF_WIDTH_IN_SIGMA, VelocityGrid, WavelengthGrid};
pub use model::{
    LineParameters, LineProfiles, LineRecord, ModelParameters, SlabResult, Spectrum,
    SpectrumRecord,
};

use crate::common::constants::{
    BOLTZMANN, HC_OVER_K_CM, PARSEC, PLANCK, SI_TO_JANSKY, SPEED_OF_LIGHT,
};
use crate::domain::{ComputeResult, LineList, SlabError, SlabParameters, Transition};
use crate::numerics::{ResolutionConvolutionInput, convolve_by_resolution, interpolate_unchecked};
use crate::providers::{
    LineListProvider, MolecularMassVelocity, PartitionFunctionProvider, ThermalVelocityEstimator,
};
use std::f64::consts::PI;

pub const VELOCITY_OVERSAMPLING: usize = 3;

pub struct SlabSynthesizer<L, P, V = MolecularMassVelocity> {
    line_list: L,
    partition: P,
    velocity: V,
}

impl<L, P> SlabSynthesizer<L, P, MolecularMassVelocity>
where
    L: LineListProvider,
    P: PartitionFunctionProvider,
{
    pub fn new(line_list: L, partition: P) -> Self {
        Self {
            line_list,
            partition,
            velocity: MolecularMassVelocity,
        }
    }
}

impl<L, P, V> SlabSynthesizer<L, P, V>
where
    L: LineListProvider,
    P: PartitionFunctionProvider,
    V: ThermalVelocityEstimator,
{
    pub fn with_velocity_estimator<W>(self, velocity: W) -> SlabSynthesizer<L, P, W>
    where
        W: ThermalVelocityEstimator,
    {
        SlabSynthesizer {
            line_list: self.line_list,
            partition: self.partition,
            velocity,
        }
    }

    pub fn synthesize(&self, parameters: &SlabParameters) -> ComputeResult<SlabResult> {
        parameters.validate()?;

        let sigma = self.resolve_local_velocity(parameters)?;
        let resolving_power = VELOCITY_OVERSAMPLING as f64 * SPEED_OF_LIGHT / sigma;

        let transitions = self.line_list.line_list(&parameters.line_list_query())?;
        let transitions = select_upper_vibrational_state(transitions, parameters.vup);

        let q = self.partition.partition_function(
            &parameters.molecule_name,
            parameters.isotopologue_number,
            parameters.temperature,
        )?;
        if !q.is_finite() || q <= 0.0 {
            return Err(SlabError::computation(
                "RUN.PARTITION_FUNCTION",
                format!(
                    "partition function of {} at {} K must be finite and > 0, got {}",
                    parameters.molecule_name, parameters.temperature, q
                ),
            ));
        }

        let slab = SlabConditions::new(parameters, sigma, q);
        let velocity_grid = VelocityGrid::new(sigma, VELOCITY_OVERSAMPLING);
        let wavelength_grid = WavelengthGrid::logarithmic(
            parameters.wmin,
            parameters.wmax,
            sigma,
            VELOCITY_OVERSAMPLING,
        )?;
        tracing::debug!(
            lines = transitions.len(),
            velocity_points = velocity_grid.len(),
            wavelength_points = wavelength_grid.len(),
            sigma,
            partition_function = q,
            "slab grids prepared"
        );

        let mut total_tau = vec![0.0; wavelength_grid.len()];
        let mut line_parameters = LineParameters {
            transitions: Vec::with_capacity(transitions.len()),
            lineflux: Vec::with_capacity(transitions.len()),
            tau_peak: Vec::with_capacity(transitions.len()),
            fthin: Vec::with_capacity(transitions.len()),
        };
        let mut line_profiles = LineProfiles {
            velocity_kms: velocity_grid.offsets_kms(),
            centres_micron: Vec::with_capacity(transitions.len()),
            flux: Vec::with_capacity(transitions.len()),
        };

        for transition in transitions {
            let tau0 = slab.peak_optical_depth(&transition);
            let tau: Vec<f64> = velocity_grid
                .offsets()
                .iter()
                .map(|velocity| tau0 * (-velocity * velocity / (2.0 * sigma * sigma)).exp())
                .collect();
            let centre = transition.wavelength_micron();
            let wave = velocity_grid.wavelengths(centre);

            let window = wavelength_grid.window(wave[0], wave[wave.len() - 1]);
            let (flux_row, lineflux) = if window.is_empty() {
                (vec![0.0; velocity_grid.len()], 0.0)
            } else {
                for index in window {
                    total_tau[index] +=
                        interpolate_unchecked(wavelength_grid.points()[index], &wave, &tau);
                }
                let row = slab.line_flux_profile(&transition, &tau);
                let wn0 = transition.wavenumber_m();
                let lineflux = crate::numerics::stable_sum(&row)
                    * (velocity_grid.step() / SPEED_OF_LIGHT)
                    * (SPEED_OF_LIGHT * wn0);
                (row, lineflux)
            };

            line_parameters.lineflux.push(lineflux);
            line_parameters.tau_peak.push(tau0);
            line_parameters.fthin.push(slab.thin_line_flux(&transition));
            line_parameters.transitions.push(transition);
            line_profiles.centres_micron.push(centre);
            line_profiles.flux.push(flux_row);
        }

        let wave = wavelength_grid.into_points();
        let flux: Vec<f64> = wave
            .iter()
            .zip(&total_tau)
            .map(|(&wavelength, &tau)| slab.continuum_flux_jy(wavelength, tau))
            .collect();
        let convolved_flux = match parameters.convolution_fwhm {
            Some(fwhm_kms) => convolve_by_resolution(ResolutionConvolutionInput::new(
                &wave, &flux, fwhm_kms,
            ))
            .map_err(|error| SlabError::computation("RUN.CONVOLUTION", error.to_string()))?
            .into_flux(),
            None => flux.clone(),
        };

        tracing::info!(
            molecule = %parameters.molecule_name,
            temperature = parameters.temperature,
            lines = line_parameters.len(),
            points = wave.len(),
            convolved = parameters.convolution_fwhm.is_some(),
            "slab spectrum synthesized"
        );

        Ok(SlabResult {
            spectrum: Spectrum {
                wave,
                flux,
                convolved_flux,
                total_tau,
            },
            line_parameters,
            line_profiles,
            model: ModelParameters {
                parameters: parameters.clone(),
                resolved_local_velocity: sigma,
                resolving_power,
                partition_function: q,
            },
        })
    }

    fn resolve_local_velocity(&self, parameters: &SlabParameters) -> ComputeResult<f64> {
        let sigma = match parameters.local_velocity {
            Some(sigma) => sigma,
            None => self
                .velocity
                .thermal_velocity(&parameters.molecule_name, parameters.temperature)?,
        };
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(SlabError::input_validation(
                "INPUT.LOCAL_VELOCITY",
                format!("local velocity dispersion must be finite and > 0 m/s, got {sigma}"),
            ));
        }
        Ok(sigma)
    }
}

/// Keeps lines whose upper vibrational level is `vup`.
///
/// The restriction only applies when every upper-level label is an integer;
/// otherwise the full list is returned with a warning.
fn select_upper_vibrational_state(transitions: LineList, vup: Option<i64>) -> LineList {
    let Some(vup) = vup else {
        return transitions;
    };

    let levels: Option<Vec<i64>> = transitions
        .iter()
        .map(Transition::upper_vibrational_state)
        .collect();
    let Some(levels) = levels else {
        tracing::warn!(
            vup,
            "upper vibrational labels are not integers, ignoring the vup selection"
        );
        return transitions;
    };

    transitions
        .into_iter()
        .zip(levels)
        .filter_map(|(transition, level)| (level == vup).then_some(transition))
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct SlabConditions {
    temperature: f64,
    column_density: f64,
    sigma: f64,
    partition_function: f64,
    solid_angle: f64,
}

impl SlabConditions {
    fn new(parameters: &SlabParameters, sigma: f64, partition_function: f64) -> Self {
        let distance = parameters.distance_pc * PARSEC;
        Self {
            temperature: parameters.temperature,
            column_density: parameters.column_density,
            sigma,
            partition_function,
            solid_angle: parameters.area / (distance * distance),
        }
    }

    /// Line-centre optical depth.
    ///
    /// The stimulated-emission correction is written as a difference of two
    /// Boltzmann factors so that it does not underflow to `0 * inf` at low T.
    fn peak_optical_depth(&self, transition: &Transition) -> f64 {
        let wn0 = transition.wavenumber_m();
        let afactor = transition.einstein_a * transition.g_up * self.column_density
            / (self.partition_function * 8.0 * PI * wn0.powi(3));
        let lower = (-transition.elower * HC_OVER_K_CM / self.temperature).exp();
        let upper = (-transition.eup_k / self.temperature).exp();
        let phi = 1.0 / (self.sigma * (2.0 * PI).sqrt());
        afactor * (lower - upper) * phi
    }

    fn thin_line_flux(&self, transition: &Transition) -> f64 {
        let wn0 = transition.wavenumber_m();
        let boltzmann = (-PLANCK * SPEED_OF_LIGHT * transition.upper_energy_m()
            / (BOLTZMANN * self.temperature))
            .exp();
        transition.einstein_a * transition.g_up * self.column_density * PLANCK * SPEED_OF_LIGHT
            * wn0
            / (self.partition_function * 4.0 * PI)
            * boltzmann
            * self.solid_angle
    }

    fn line_flux_profile(&self, transition: &Transition, tau: &[f64]) -> Vec<f64> {
        let source = self.planck(transition.wavenumber_m());
        tau.iter()
            .map(|&tau| source * -(-tau).exp_m1() * self.solid_angle)
            .collect()
    }

    fn continuum_flux_jy(&self, wavelength_micron: f64, tau: f64) -> f64 {
        let wn = 1.0e6 / wavelength_micron;
        self.planck(wn) * -(-tau).exp_m1() * SI_TO_JANSKY * self.solid_angle
    }

    fn planck(&self, wn: f64) -> f64 {
        let x = PLANCK * SPEED_OF_LIGHT * wn / (BOLTZMANN * self.temperature);
        2.0 * PLANCK * SPEED_OF_LIGHT * wn.powi(3) / x.exp_m1()
    }
}
