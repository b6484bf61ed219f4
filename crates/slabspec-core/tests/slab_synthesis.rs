use slabspec_core::domain::{SlabErrorCategory, SlabParameters, TransitionFilters};
use slabspec_core::modules::serialization::{
    FITS_BLOCK, LINES_FILE, MODEL_PARAMETERS_FILE, ROTATION_FILE, SLAB_FITS_FILE,
    SPECTRUM_FILE, write_slab_artifacts,
};
use slabspec_core::modules::{SlabSynthesizer, rotation_diagram};
use slabspec_core::numerics::{FwhmConvolutionInput, convolve_by_fwhm, flag_non_finite};
use slabspec_core::providers::{HitranParFile, QTableDirectory};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}

fn synthesizer() -> SlabSynthesizer<HitranParFile, QTableDirectory> {
    SlabSynthesizer::new(
        HitranParFile::new(fixtures_dir().join("co_fundamental.par")),
        QTableDirectory::new(fixtures_dir()),
    )
}

fn co_slab() -> SlabParameters {
    SlabParameters::new("CO", 1.0e16, 300.0, 1.0e18)
        .with_wavelength_range(4.0, 5.0)
        .with_distance(1.0)
}

#[test]
fn co_fundamental_at_thermal_width_spans_the_requested_range() {
    let result = synthesizer().synthesize(&co_slab()).expect("synthesis should succeed");

    let wave = &result.spectrum.wave;
    assert_eq!(wave[0], 4.0);
    assert_eq!(wave[wave.len() - 1], 5.0);
    assert!(wave.windows(2).all(|pair| pair[0] < pair[1]));
    assert!(wave.len() > 10_000_000);

    let sigma = result.model.resolved_local_velocity;
    assert!((sigma - 298.5).abs() < 0.5, "sigma={sigma}");
    assert!((result.model.partition_function - 108.8).abs() < 0.5);

    assert_eq!(result.line_parameters.len(), 149);
    let nearest = result
        .line_parameters
        .nearest(4.6)
        .expect("line table is not empty");
    assert!((nearest.transition.wavelength_micron() - 4.6).abs() < 0.01);
    assert_eq!(nearest.transition.vp, "1");

    assert!(result.spectrum.total_tau.iter().all(|tau| *tau >= 0.0));
    assert!(result.spectrum.flux.iter().all(|flux| flux.is_finite() && *flux >= 0.0));
    for line in result.line_parameters.iter() {
        assert!(line.lineflux.is_finite() && line.lineflux >= 0.0);
        assert!(line.tau_peak >= 0.0);
    }
    assert!(result.total_line_flux() > 0.0);
}

#[test]
fn vup_and_energy_filters_narrow_the_line_table() {
    let base = co_slab().with_local_velocity(20_000.0);

    let hot_band = synthesizer()
        .synthesize(&base.clone().with_vup(2))
        .expect("synthesis should succeed");
    assert_eq!(hot_band.line_parameters.len(), 71);
    assert!(hot_band.line_parameters.transitions.iter().all(|line| line.vp == "2"));

    let low_energy = synthesizer()
        .synthesize(&base.with_filters(TransitionFilters {
            eup_max: Some(3500.0),
            ..TransitionFilters::default()
        }))
        .expect("synthesis should succeed");
    assert!(!low_energy.line_parameters.is_empty());
    assert!(low_energy.line_parameters.transitions.iter().all(|line| line.eup_k < 3500.0));
}

#[test]
fn thin_fundamental_band_recovers_the_slab_temperature() {
    let parameters = SlabParameters::new("CO", 1.0e12, 700.0, 1.0e18)
        .with_wavelength_range(4.0, 5.0)
        .with_local_velocity(20_000.0)
        .with_vup(1);
    let result = synthesizer().synthesize(&parameters).expect("synthesis should succeed");

    let fit = rotation_diagram(&result.line_parameters)
        .fit()
        .expect("band has many lines");
    assert_eq!(fit.points_used, result.line_parameters.len());
    assert!((fit.temperature - 700.0).abs() < 7.0, "T={}", fit.temperature);
}

#[test]
fn cold_slab_keeps_optical_depths_finite_and_non_negative() {
    let parameters = SlabParameters::new("CO", 1.0e20, 12.0, 1.0e18)
        .with_wavelength_range(4.0, 5.0)
        .with_local_velocity(20_000.0);
    let result = synthesizer().synthesize(&parameters).expect("synthesis should succeed");

    assert_eq!(result.line_parameters.len(), 149);
    for line in result.line_parameters.iter() {
        assert!(line.tau_peak.is_finite() && line.tau_peak >= 0.0, "tau={}", line.tau_peak);
        assert!(line.lineflux.is_finite() && line.lineflux >= 0.0, "flux={}", line.lineflux);
        assert!(line.fthin.is_finite() && line.fthin >= 0.0);
    }
    assert!(result.spectrum.total_tau.iter().all(|tau| !tau.is_nan() && *tau >= 0.0));
    assert!(result.spectrum.flux.iter().all(|flux| flux.is_finite()));

    let ground_state = result
        .line_parameters
        .iter()
        .find(|line| line.transition.vp == "1" && line.transition.elower == 0.0)
        .expect("R(0) of the fundamental is in range");
    assert!(ground_state.tau_peak > 0.0);
}

#[test]
fn optically_thick_slab_saturates_at_the_planck_limit() {
    let thin = synthesizer()
        .synthesize(&co_slab().with_local_velocity(20_000.0))
        .expect("synthesis should succeed");
    let thick = synthesizer()
        .synthesize(&co_slab().with_local_velocity(20_000.0).with_column_density(1.0e24))
        .expect("synthesis should succeed");

    let ratio = thick.total_line_flux() / thin.total_line_flux();
    assert!(ratio > 1.0);
    assert!(ratio < 1.0e8, "ratio={ratio}");
    let peak_tau = thick.spectrum.total_tau.iter().cloned().fold(0.0, f64::max);
    assert!(peak_tau > 10.0);
}

#[test]
fn windowed_convolution_keeps_the_synthesized_length() {
    let result = synthesizer()
        .synthesize(&co_slab().with_local_velocity(20_000.0))
        .expect("synthesis should succeed");
    let flux = flag_non_finite(&result.spectrum.flux);
    let convolved = convolve_by_fwhm(FwhmConvolutionInput::new(
        &result.spectrum.wave,
        &flux,
        20.0,
    ))
    .expect("kernel fits the range");
    assert_eq!(convolved.len(), result.spectrum.len());
    assert!(convolved.iter().all(Option::is_some));
}

#[test]
fn artifacts_are_written_for_a_synthesized_slab() {
    let result = synthesizer()
        .synthesize(&co_slab().with_local_velocity(20_000.0).with_convolution_fwhm(50.0))
        .expect("synthesis should succeed");
    let diagram = rotation_diagram(&result.line_parameters);
    let temp = TempDir::new().expect("tempdir should be created");

    let written = write_slab_artifacts(&result, &diagram, temp.path()).expect("artifacts");
    assert_eq!(written.len(), 5);

    let fits = fs::read(temp.path().join(SLAB_FITS_FILE)).expect("fits should exist");
    assert_eq!(fits.len() % FITS_BLOCK, 0);
    let header = String::from_utf8_lossy(&fits[FITS_BLOCK..2 * FITS_BLOCK]).to_string();
    assert!(header.starts_with("XTENSION= 'BINTABLE'"));
    assert!(header.contains(&format!("NAXIS2  = {:>20}", result.spectrum.len())));

    let spectrum = fs::read_to_string(temp.path().join(SPECTRUM_FILE)).expect("spectrum");
    assert_eq!(spectrum.lines().count(), result.spectrum.len() + 1);
    let lines = fs::read_to_string(temp.path().join(LINES_FILE)).expect("lines");
    assert_eq!(lines.lines().count(), result.line_parameters.len() + 1);
    let rotation = fs::read_to_string(temp.path().join(ROTATION_FILE)).expect("rotation");
    assert_eq!(rotation.lines().count(), diagram.len() + 1);

    let parameters: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(temp.path().join(MODEL_PARAMETERS_FILE)).expect("json"),
    )
    .expect("json should parse");
    assert_eq!(parameters["molecule_name"], "CO");
    assert_eq!(parameters["resolved_local_velocity"], 20_000.0);
    assert_eq!(parameters["convolution_fwhm"], 50.0);
}

#[test]
fn missing_partition_table_is_an_io_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let synthesizer = SlabSynthesizer::new(
        HitranParFile::new(fixtures_dir().join("co_fundamental.par")),
        QTableDirectory::new(temp.path()),
    );
    let error = synthesizer
        .synthesize(&co_slab().with_local_velocity(20_000.0))
        .expect_err("q26.txt is absent");
    assert_eq!(error.category(), SlabErrorCategory::IoSystemError);
    assert_eq!(error.exit_code(), 3);
}
