use crate::common::constants::SPEED_OF_LIGHT_KMS;
use crate::domain::{LineList, SlabParameters, Transition};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectrumRecord {
    pub wave: f64,
    pub flux: f64,
    pub convolved_flux: f64,
    pub total_tau: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Spectrum {
    pub wave: Vec<f64>,
    pub flux: Vec<f64>,
    pub convolved_flux: Vec<f64>,
    pub total_tau: Vec<f64>,
}

impl Spectrum {
    pub fn len(&self) -> usize {
        self.wave.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wave.is_empty()
    }

    pub fn record(&self, index: usize) -> Option<SpectrumRecord> {
        Some(SpectrumRecord {
            wave: *self.wave.get(index)?,
            flux: *self.flux.get(index)?,
            convolved_flux: *self.convolved_flux.get(index)?,
            total_tau: *self.total_tau.get(index)?,
        })
    }

    pub fn records(&self) -> impl Iterator<Item = SpectrumRecord> + '_ {
        (0..self.len()).filter_map(|index| self.record(index))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineParameters {
    pub transitions: LineList,
    /// Integrated line flux, W/m².
    pub lineflux: Vec<f64>,
    pub tau_peak: Vec<f64>,
    /// Optically thin line flux, W/m².
    pub fthin: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineRecord<'a> {
    pub transition: &'a Transition,
    pub lineflux: f64,
    pub tau_peak: f64,
    pub fthin: f64,
}

impl LineParameters {
    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = LineRecord<'_>> + '_ {
        self.transitions
            .iter()
            .zip(&self.lineflux)
            .zip(&self.tau_peak)
            .zip(&self.fthin)
            .map(|(((transition, &lineflux), &tau_peak), &fthin)| LineRecord {
                transition,
                lineflux,
                tau_peak,
                fthin,
            })
    }

    pub fn nearest(&self, wavelength_micron: f64) -> Option<LineRecord<'_>> {
        self.iter().min_by(|left, right| {
            let left = (left.transition.wavelength_micron() - wavelength_micron).abs();
            let right = (right.transition.wavelength_micron() - wavelength_micron).abs();
            left.total_cmp(&right)
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineProfiles {
    pub velocity_kms: Vec<f64>,
    pub centres_micron: Vec<f64>,
    /// One flux row (W m⁻² Hz⁻¹ scaled by the solid angle) per line.
    pub flux: Vec<Vec<f64>>,
}

impl LineProfiles {
    pub fn len(&self) -> usize {
        self.flux.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flux.is_empty()
    }

    pub fn wavelengths(&self, index: usize) -> Option<Vec<f64>> {
        let centre = *self.centres_micron.get(index)?;
        Some(
            self.velocity_kms
                .iter()
                .map(|velocity| centre * (1.0 + velocity / SPEED_OF_LIGHT_KMS))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelParameters {
    #[serde(flatten)]
    pub parameters: SlabParameters,
    /// Local velocity dispersion actually used, m/s.
    pub resolved_local_velocity: f64,
    pub resolving_power: f64,
    pub partition_function: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlabResult {
    pub spectrum: Spectrum,
    pub line_parameters: LineParameters,
    pub line_profiles: LineProfiles,
    pub model: ModelParameters,
}

impl SlabResult {
    pub fn total_line_flux(&self) -> f64 {
        crate::numerics::stable_sum(&self.line_parameters.lineflux)
    }
}
