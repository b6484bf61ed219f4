//! SI physical constants (CODATA 2018) and unit conversions used by the slab model.

pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;
pub const SPEED_OF_LIGHT_KMS: f64 = SPEED_OF_LIGHT * 1.0e-3;
pub const PLANCK: f64 = 6.626_070_15e-34;
pub const BOLTZMANN: f64 = 1.380_649e-23;
pub const ATOMIC_MASS_UNIT: f64 = 1.660_539_066_60e-27;
pub const PARSEC: f64 = 3.085_677_581_491_367_3e16;
/// Second radiation constant h c / k expressed in cm K.
pub const HC_OVER_K_CM: f64 = PLANCK * SPEED_OF_LIGHT / BOLTZMANN * 1.0e2;
pub const SI_TO_JANSKY: f64 = 1.0e26;
/// FWHM of a Gaussian in units of its standard deviation, 2 sqrt(2 ln 2).
pub const GAUSSIAN_FWHM_PER_SIGMA: f64 = 2.354_820_045_030_949_3;

pub fn fwhm_to_sigma(fwhm: f64) -> f64 {
    fwhm / GAUSSIAN_FWHM_PER_SIGMA
}

pub fn sigma_to_fwhm(sigma: f64) -> f64 {
    sigma * GAUSSIAN_FWHM_PER_SIGMA
}
