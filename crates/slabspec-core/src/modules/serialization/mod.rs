pub mod fits;

pub use fits::{BinaryTable, ColumnData, FITS_BLOCK, FitsColumn, FitsError, encode_fits};

use super::rotation::RotationDiagram;
use super::slab::{LineParameters, SlabResult};
use crate::domain::{ComputeResult, SlabError, Transition};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const SLAB_FITS_FILE: &str = "slabmodel.fits";
pub const SPECTRUM_FILE: &str = "spectrum.dat";
pub const LINES_FILE: &str = "lines.dat";
pub const ROTATION_FILE: &str = "rotation.dat";
pub const MODEL_PARAMETERS_FILE: &str = "modelparams.json";

pub fn format_fixed_f64(value: f64, width: usize, precision: usize) -> String {
    format!(
        "{value:>width$.precision$}",
        width = width,
        precision = precision
    )
}

pub fn format_scientific_f64(value: f64, width: usize, precision: usize) -> String {
    format!(
        "{value:>width$.precision$e}",
        width = width,
        precision = precision
    )
}

pub fn normalize_text_artifact(content: &str) -> String {
    let mut normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    if !normalized.is_empty() && !normalized.ends_with('\n') {
        normalized.push('\n');
    }
    normalized
}

pub fn write_text_artifact(path: &Path, content: &str) -> std::io::Result<()> {
    fs::write(path, normalize_text_artifact(content))
}

pub fn write_binary_artifact(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::write(path, bytes)
}

pub fn write_json_artifact<T: Serialize>(path: &Path, value: &T) -> ComputeResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(|source| {
        SlabError::internal(
            "RUN.JSON_SERIALIZE",
            format!("failed to serialize '{}': {}", path.display(), source),
        )
    })?;
    write_text_artifact(path, &json).map_err(|source| write_error(path, source))
}

/// The three-HDU slab file: primary, spectrum (wave, convolved flux) and line table.
pub fn slab_fits_tables(result: &SlabResult) -> Vec<BinaryTable> {
    let spectrum = BinaryTable::new(vec![
        FitsColumn::float64("wave", result.spectrum.wave.clone()).with_unit("micron"),
        FitsColumn::float64("flux", result.spectrum.convolved_flux.clone()).with_unit("Jy"),
    ])
    .with_name("SPECTRUM");

    vec![spectrum, line_table(&result.line_parameters).with_name("LINES")]
}

fn line_table(lines: &LineParameters) -> BinaryTable {
    let transitions = &lines.transitions;
    let text = |value: fn(&Transition) -> &str| -> Vec<String> {
        transitions.iter().map(|line| value(line).to_string()).collect()
    };

    BinaryTable::new(vec![
        FitsColumn::float64(
            "molec_id",
            transition_values(transitions, |line| f64::from(line.molecule_id)),
        ),
        FitsColumn::float64(
            "local_iso_id",
            transition_values(transitions, |line| f64::from(line.isotopologue)),
        ),
        FitsColumn::float64("wn", transition_values(transitions, |line| line.wavenumber))
            .with_unit("cm-1"),
        FitsColumn::float64("wave", transition_values(transitions, Transition::wavelength_micron))
            .with_unit("micron"),
        FitsColumn::float64("sw", transition_values(transitions, |line| line.line_strength)),
        FitsColumn::float64("a", transition_values(transitions, |line| line.einstein_a))
            .with_unit("s-1"),
        FitsColumn::float64("elower", transition_values(transitions, |line| line.elower))
            .with_unit("cm-1"),
        FitsColumn::float64("gp", transition_values(transitions, |line| line.g_up)),
        FitsColumn::float64("gpp", transition_values(transitions, |line| line.g_low)),
        FitsColumn::float64("eup_k", transition_values(transitions, |line| line.eup_k))
            .with_unit("K"),
        FitsColumn::text("Vp", text(|line| line.vp.as_str())),
        FitsColumn::text("Vpp", text(|line| line.vpp.as_str())),
        FitsColumn::float64("lineflux", lines.lineflux.clone()).with_unit("W m-2"),
        FitsColumn::float64("tau_peak", lines.tau_peak.clone()),
        FitsColumn::float64("fthin", lines.fthin.clone()).with_unit("W m-2"),
    ])
}

fn transition_values(transitions: &[Transition], value: fn(&Transition) -> f64) -> Vec<f64> {
    transitions.iter().map(value).collect()
}

pub fn write_slab_fits(result: &SlabResult, path: &Path) -> ComputeResult<()> {
    let bytes = encode_fits(&slab_fits_tables(result)).map_err(|source| {
        SlabError::internal(
            "RUN.FITS_ENCODE",
            format!("failed to encode '{}': {}", path.display(), source),
        )
    })?;
    write_binary_artifact(path, &bytes).map_err(|source| write_error(path, source))
}

pub fn spectrum_text(result: &SlabResult) -> String {
    let mut content = String::from("# wave(micron) flux(Jy) convolflux(Jy) totaltau\n");
    for record in result.spectrum.records() {
        content.push_str(&format!(
            "{}{}{}{}\n",
            format_fixed_f64(record.wave, 14, 8),
            format_scientific_f64(record.flux, 16, 6),
            format_scientific_f64(record.convolved_flux, 16, 6),
            format_scientific_f64(record.total_tau, 16, 6),
        ));
    }
    content
}

pub fn lines_text(lines: &LineParameters) -> String {
    let mut content = String::from(
        "# wave(micron) wn(cm-1) a(s-1) gp eup_k(K) Vp Vpp lineflux(W/m2) tau_peak fthin(W/m2)\n",
    );
    for line in lines.iter() {
        let transition = line.transition;
        content.push_str(&format!(
            "{}{}{}{}{} {:>6} {:>6}{}{}{}\n",
            format_fixed_f64(transition.wavelength_micron(), 14, 8),
            format_fixed_f64(transition.wavenumber, 14, 6),
            format_scientific_f64(transition.einstein_a, 13, 4),
            format_fixed_f64(transition.g_up, 7, 1),
            format_fixed_f64(transition.eup_k, 11, 2),
            transition.vp,
            transition.vpp,
            format_scientific_f64(line.lineflux, 14, 5),
            format_scientific_f64(line.tau_peak, 14, 5),
            format_scientific_f64(line.fthin, 14, 5),
        ));
    }
    content
}

pub fn rotation_text(diagram: &RotationDiagram) -> String {
    let mut content = String::from("# x=eup_k(K) y=ln(lineflux/(wn*gp*a))\n");
    for point in &diagram.points {
        content.push_str(&format!(
            "{}{}\n",
            format_fixed_f64(point.x, 12, 3),
            format_fixed_f64(point.y, 16, 6)
        ));
    }
    content
}

/// Writes every slab artifact into `output_dir` and returns the written paths.
pub fn write_slab_artifacts(
    result: &SlabResult,
    diagram: &RotationDiagram,
    output_dir: &Path,
) -> ComputeResult<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).map_err(|source| {
        SlabError::io_system(
            "IO.OUTPUT_DIRECTORY",
            format!(
                "failed to create output directory '{}': {}",
                output_dir.display(),
                source
            ),
        )
    })?;

    let fits_path = output_dir.join(SLAB_FITS_FILE);
    write_slab_fits(result, &fits_path)?;

    let mut written = vec![fits_path];
    for (name, content) in [
        (SPECTRUM_FILE, spectrum_text(result)),
        (LINES_FILE, lines_text(&result.line_parameters)),
        (ROTATION_FILE, rotation_text(diagram)),
    ] {
        let path = output_dir.join(name);
        write_text_artifact(&path, &content).map_err(|source| write_error(&path, source))?;
        written.push(path);
    }

    let parameters_path = output_dir.join(MODEL_PARAMETERS_FILE);
    write_json_artifact(&parameters_path, &result.model)?;
    written.push(parameters_path);

    tracing::debug!(
        output_dir = %output_dir.display(),
        artifacts = written.len(),
        "slab artifacts written"
    );
    Ok(written)
}

fn write_error(path: &Path, source: std::io::Error) -> SlabError {
    SlabError::io_system(
        "IO.ARTIFACT_WRITE",
        format!("failed to write artifact '{}': {}", path.display(), source),
    )
}
