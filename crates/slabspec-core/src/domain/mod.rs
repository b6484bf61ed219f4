pub mod errors;

pub use errors::{ComputeResult, SlabError, SlabErrorCategory};

use crate::common::constants::HC_OVER_K_CM;
use serde::{Deserialize, Serialize};

pub const DEFAULT_WMIN_MICRON: f64 = 1.0;
pub const DEFAULT_WMAX_MICRON: f64 = 40.0;
pub const DEFAULT_DISTANCE_PC: f64 = 1.0;
pub const DEFAULT_ISOTOPOLOGUE: u32 = 1;

/// One molecular transition as stored in a HITRAN-style line list.
///
/// Energies and the line position keep the line-list units (cm⁻¹); the
/// accessor methods convert to SI where the synthesis needs it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub molecule_id: u32,
    pub isotopologue: u32,
    pub wavenumber: f64,
    /// Line intensity at 296 K, cm⁻¹/(molecule·cm⁻²).
    pub line_strength: f64,
    pub einstein_a: f64,
    pub elower: f64,
    pub g_up: f64,
    pub g_low: f64,
    pub eup_k: f64,
    /// Global upper quanta label (upper vibrational state).
    pub vp: String,
    pub vpp: String,
}

impl Transition {
    pub fn new(
        molecule_id: u32,
        isotopologue: u32,
        wavenumber: f64,
        einstein_a: f64,
        elower: f64,
        g_up: f64,
    ) -> Self {
        Self {
            molecule_id,
            isotopologue,
            wavenumber,
            line_strength: 0.0,
            einstein_a,
            elower,
            g_up,
            g_low: 0.0,
            eup_k: upper_energy_kelvin(elower, wavenumber),
            vp: String::new(),
            vpp: String::new(),
        }
    }

    pub fn with_line_strength(mut self, line_strength: f64) -> Self {
        self.line_strength = line_strength;
        self
    }

    pub fn with_lower_weight(mut self, g_low: f64) -> Self {
        self.g_low = g_low;
        self
    }

    pub fn with_quanta(mut self, vp: impl Into<String>, vpp: impl Into<String>) -> Self {
        self.vp = vp.into();
        self.vpp = vpp.into();
        self
    }

    pub fn wavenumber_m(&self) -> f64 {
        self.wavenumber * 1.0e2
    }

    pub fn wavelength_micron(&self) -> f64 {
        1.0e4 / self.wavenumber
    }

    pub fn upper_energy_m(&self) -> f64 {
        (self.elower + self.wavenumber) * 1.0e2
    }

    pub fn lower_energy_m(&self) -> f64 {
        self.elower * 1.0e2
    }

    pub fn upper_vibrational_state(&self) -> Option<i64> {
        self.vp.trim().parse().ok()
    }
}

pub fn upper_energy_kelvin(elower_cm: f64, wavenumber_cm: f64) -> f64 {
    (elower_cm + wavenumber_cm) * HC_OVER_K_CM
}

pub type LineList = Vec<Transition>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionFilters {
    #[serde(default)]
    pub eup_max: Option<f64>,
    #[serde(default)]
    pub aup_min: Option<f64>,
    #[serde(default)]
    pub sw_min: Option<f64>,
}

impl TransitionFilters {
    pub fn accepts(&self, transition: &Transition) -> bool {
        if let Some(eup_max) = self.eup_max
            && transition.eup_k >= eup_max
        {
            return false;
        }
        if let Some(aup_min) = self.aup_min
            && transition.einstein_a <= aup_min
        {
            return false;
        }
        if let Some(sw_min) = self.sw_min
            && transition.line_strength <= sw_min
        {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineListQuery {
    pub molecule_name: String,
    pub isotopologue: u32,
    pub wmin: f64,
    pub wmax: f64,
    pub filters: TransitionFilters,
}

impl LineListQuery {
    /// Wavenumber bounds (cm⁻¹) that correspond to the wavelength bounds in microns.
    pub fn wavenumber_bounds(&self) -> (f64, f64) {
        (1.0e4 / self.wmax, 1.0e4 / self.wmin)
    }

    pub fn accepts(&self, transition: &Transition) -> bool {
        let (wn_min, wn_max) = self.wavenumber_bounds();
        transition.isotopologue == self.isotopologue
            && transition.wavenumber >= wn_min
            && transition.wavenumber <= wn_max
            && self.filters.accepts(transition)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlabParameters {
    pub molecule_name: String,
    /// Column density, m⁻².
    pub column_density: f64,
    pub temperature: f64,
    pub area: f64,
    #[serde(default = "default_wmin")]
    pub wmin: f64,
    #[serde(default = "default_wmax")]
    pub wmax: f64,
    #[serde(default = "default_distance")]
    pub distance_pc: f64,
    #[serde(default = "default_isotopologue")]
    pub isotopologue_number: u32,
    /// Local velocity dispersion (sigma), m/s.
    #[serde(default)]
    pub local_velocity: Option<f64>,
    /// FWHM of the instrumental kernel, km/s.
    #[serde(default)]
    pub convolution_fwhm: Option<f64>,
    #[serde(default)]
    pub vup: Option<i64>,
    #[serde(default)]
    pub filters: TransitionFilters,
}

fn default_wmin() -> f64 {
    DEFAULT_WMIN_MICRON
}

fn default_wmax() -> f64 {
    DEFAULT_WMAX_MICRON
}

fn default_distance() -> f64 {
    DEFAULT_DISTANCE_PC
}

fn default_isotopologue() -> u32 {
    DEFAULT_ISOTOPOLOGUE
}

impl SlabParameters {
    pub fn new(
        molecule_name: impl Into<String>,
        column_density: f64,
        temperature: f64,
        area: f64,
    ) -> Self {
        Self {
            molecule_name: molecule_name.into(),
            column_density,
            temperature,
            area,
            wmin: DEFAULT_WMIN_MICRON,
            wmax: DEFAULT_WMAX_MICRON,
            distance_pc: DEFAULT_DISTANCE_PC,
            isotopologue_number: DEFAULT_ISOTOPOLOGUE,
            local_velocity: None,
            convolution_fwhm: None,
            vup: None,
            filters: TransitionFilters::default(),
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_column_density(mut self, column_density: f64) -> Self {
        self.column_density = column_density;
        self
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = area;
        self
    }

    pub fn with_wavelength_range(mut self, wmin: f64, wmax: f64) -> Self {
        self.wmin = wmin;
        self.wmax = wmax;
        self
    }

    pub fn with_distance(mut self, distance_pc: f64) -> Self {
        self.distance_pc = distance_pc;
        self
    }

    pub fn with_isotopologue(mut self, isotopologue_number: u32) -> Self {
        self.isotopologue_number = isotopologue_number;
        self
    }

    pub fn with_local_velocity(mut self, local_velocity: f64) -> Self {
        self.local_velocity = Some(local_velocity);
        self
    }

    pub fn with_convolution_fwhm(mut self, fwhm_kms: f64) -> Self {
        self.convolution_fwhm = Some(fwhm_kms);
        self
    }

    pub fn with_vup(mut self, vup: i64) -> Self {
        self.vup = Some(vup);
        self
    }

    pub fn with_filters(mut self, filters: TransitionFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn line_list_query(&self) -> LineListQuery {
        LineListQuery {
            molecule_name: self.molecule_name.clone(),
            isotopologue: self.isotopologue_number,
            wmin: self.wmin,
            wmax: self.wmax,
            filters: self.filters,
        }
    }

    pub fn validate(&self) -> ComputeResult<()> {
        if self.molecule_name.trim().is_empty() {
            return Err(SlabError::input_validation(
                "INPUT.MOLECULE",
                "molecule name must not be empty",
            ));
        }

        let positive_fields = [
            ("INPUT.COLUMN_DENSITY", "column density", self.column_density),
            ("INPUT.TEMPERATURE", "temperature", self.temperature),
            ("INPUT.AREA", "area", self.area),
            ("INPUT.DISTANCE", "distance", self.distance_pc),
            ("INPUT.WAVELENGTH_RANGE", "wmin", self.wmin),
            ("INPUT.WAVELENGTH_RANGE", "wmax", self.wmax),
        ];
        for (placeholder, field, value) in positive_fields {
            require_positive(placeholder, field, value)?;
        }
        if let Some(local_velocity) = self.local_velocity {
            require_positive("INPUT.LOCAL_VELOCITY", "local velocity", local_velocity)?;
        }
        if let Some(fwhm) = self.convolution_fwhm {
            require_positive("INPUT.CONVOLUTION_FWHM", "convolution FWHM", fwhm)?;
        }

        if self.wmin >= self.wmax {
            return Err(SlabError::input_validation(
                "INPUT.WAVELENGTH_RANGE",
                format!(
                    "wmin must be smaller than wmax, got wmin={} wmax={}",
                    self.wmin, self.wmax
                ),
            ));
        }

        if self.isotopologue_number == 0 {
            return Err(SlabError::input_validation(
                "INPUT.ISOTOPOLOGUE",
                "isotopologue number starts at 1",
            ));
        }

        Ok(())
    }
}

fn require_positive(placeholder: &'static str, field: &str, value: f64) -> ComputeResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SlabError::input_validation(
            placeholder,
            format!("{field} must be finite and > 0, got {value}"),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{SlabParameters, Transition, TransitionFilters};
    use crate::domain::SlabErrorCategory;

    fn co_r0() -> Transition {
        Transition::new(5, 1, 2147.081139, 7.2, 0.0, 3.0).with_line_strength(4.3e-20)
    }

    #[test]
    fn transition_derives_upper_energy_in_kelvin() {
        let line = co_r0();
        assert!((line.eup_k - 3089.1).abs() < 0.5, "eup_k={}", line.eup_k);
        assert!((line.wavelength_micron() - 4.6575).abs() < 1.0e-3);
        assert!((line.wavenumber_m() - 214_708.1139).abs() < 1.0e-6);
    }

    #[test]
    fn upper_vibrational_state_requires_integer_label() {
        let plain = co_r0().with_quanta("             1", "             0");
        assert_eq!(plain.upper_vibrational_state(), Some(1));

        let water = co_r0().with_quanta("          0 0 1", "          0 0 0");
        assert_eq!(water.upper_vibrational_state(), None);
    }

    #[test]
    fn filters_reject_by_energy_einstein_a_and_strength() {
        let line = co_r0();
        assert!(TransitionFilters::default().accepts(&line));

        let eup = TransitionFilters {
            eup_max: Some(1000.0),
            ..TransitionFilters::default()
        };
        assert!(!eup.accepts(&line));

        let aup = TransitionFilters {
            aup_min: Some(10.0),
            ..TransitionFilters::default()
        };
        assert!(!aup.accepts(&line));

        let sw = TransitionFilters {
            sw_min: Some(1.0e-19),
            ..TransitionFilters::default()
        };
        assert!(!sw.accepts(&line));
    }

    #[test]
    fn query_selects_by_wavelength_and_isotopologue() {
        let query = SlabParameters::new("CO", 1.0e16, 300.0, 1.0e18)
            .with_wavelength_range(4.0, 5.0)
            .line_list_query();
        let (wn_min, wn_max) = query.wavenumber_bounds();
        assert_eq!(wn_min, 2000.0);
        assert_eq!(wn_max, 2500.0);
        assert!(query.accepts(&co_r0()));

        let other_isotope = Transition { isotopologue: 2, ..co_r0() };
        assert!(!query.accepts(&other_isotope));
    }

    #[test]
    fn parameters_validate_physical_inputs() {
        let valid = SlabParameters::new("CO", 1.0e16, 300.0, 1.0e18).with_wavelength_range(4.0, 5.0);
        assert!(valid.validate().is_ok());

        let cold = SlabParameters { temperature: 0.0, ..valid.clone() };
        let error = cold.validate().expect_err("zero temperature should fail");
        assert_eq!(error.category(), SlabErrorCategory::InputValidationError);
        assert_eq!(error.placeholder(), "INPUT.TEMPERATURE");

        let inverted = valid.clone().with_wavelength_range(5.0, 4.0);
        let error = inverted.validate().expect_err("inverted range should fail");
        assert_eq!(error.placeholder(), "INPUT.WAVELENGTH_RANGE");

        let nan_velocity = valid.with_local_velocity(f64::NAN);
        assert_eq!(
            nan_velocity.validate().expect_err("nan velocity").placeholder(),
            "INPUT.LOCAL_VELOCITY"
        );
    }

    #[test]
    fn parameters_deserialize_with_defaults() {
        let parameters: SlabParameters = serde_json::from_str(
            r#"{"molecule_name":"H2O","column_density":1e18,"temperature":800,"area":1e22}"#,
        )
        .expect("parameters should parse");
        assert_eq!(parameters.wmin, 1.0);
        assert_eq!(parameters.wmax, 40.0);
        assert_eq!(parameters.distance_pc, 1.0);
        assert_eq!(parameters.isotopologue_number, 1);
        assert_eq!(parameters.local_velocity, None);
        assert_eq!(parameters.filters, TransitionFilters::default());
    }
}
