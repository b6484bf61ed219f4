use super::CliError;
use anyhow::Context;
use serde_json::{Map, Value};
use slabspec_core::domain::SlabError;
use slabspec_core::modules::serialization::{format_fixed_f64, format_scientific_f64, write_text_artifact};
use slabspec_core::numerics::FluxSample;
use std::fs;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "warn";

/// Logs go to stderr so that command output on stdout stays machine-readable.
pub(super) fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // A subscriber may already be installed when running under a test harness.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

pub(super) fn read_json_object(path: &Path) -> Result<Map<String, Value>, CliError> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read parameter file '{}'", path.display()))?;
    match serde_json::from_str::<Value>(&source) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(SlabError::input_validation(
            "INPUT.PARAMETERS",
            format!("parameter file '{}' must hold a JSON object", path.display()),
        )
        .into()),
        Err(source) => Err(SlabError::input_validation(
            "INPUT.PARAMETERS",
            format!("invalid JSON in '{}': {}", path.display(), source),
        )
        .into()),
    }
}

/// Reads a whitespace-separated (wave, flux) table. Blank lines and `#`
/// comments are skipped, extra columns are ignored.
pub(super) fn read_two_column(path: &Path) -> Result<(Vec<f64>, Vec<f64>), CliError> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read spectrum '{}'", path.display()))?;

    let mut wave = Vec::new();
    let mut flux = Vec::new();
    for (index, line) in source.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let mut fields = trimmed.split_whitespace();
        let (Some(first), Some(second)) = (fields.next(), fields.next()) else {
            return Err(malformed_row(path, index, "expected two columns"));
        };
        let parse = |token: &str| {
            token
                .parse::<f64>()
                .map_err(|_| malformed_row(path, index, &format!("'{token}' is not a number")))
        };
        wave.push(parse(first)?);
        flux.push(parse(second)?);
    }
    Ok((wave, flux))
}

fn malformed_row(path: &Path, index: usize, reason: &str) -> CliError {
    SlabError::input_validation(
        "INPUT.SPECTRUM_FILE",
        format!("{}:{}: {}", path.display(), index + 1, reason),
    )
    .into()
}

/// Invalid samples are rendered as NaN.
pub(super) fn two_column_text(wave: &[f64], flux: &[FluxSample]) -> String {
    let mut content = String::from("# wave(micron) flux\n");
    for (wave, sample) in wave.iter().zip(flux) {
        content.push_str(&format_fixed_f64(*wave, 14, 8));
        content.push_str(&format_scientific_f64(sample.unwrap_or(f64::NAN), 16, 6));
        content.push('\n');
    }
    content
}

pub(super) fn write_output(path: &Path, content: &str) -> Result<(), CliError> {
    write_text_artifact(path, content)
        .with_context(|| format!("failed to write '{}'", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{read_json_object, read_two_column, two_column_text};
    use crate::cli::CliError;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn two_column_reader_skips_comments_and_keeps_nan() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("spectrum.txt");
        fs::write(&path, "# wave flux\n4.0 1.5\n\n4.1 nan extra\n").expect("write input");

        let (wave, flux) = read_two_column(&path).expect("input should parse");
        assert_eq!(wave, vec![4.0, 4.1]);
        assert_eq!(flux[0], 1.5);
        assert!(flux[1].is_nan());
    }

    #[test]
    fn malformed_rows_report_their_line_number() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("spectrum.txt");
        fs::write(&path, "4.0 1.0\n4.1\n").expect("write input");

        let Err(CliError::Compute(error)) = read_two_column(&path) else {
            panic!("a one-column row should be rejected");
        };
        assert_eq!(error.placeholder(), "INPUT.SPECTRUM_FILE");
        assert!(error.message().ends_with(":2: expected two columns"));
    }

    #[test]
    fn parameter_file_must_be_an_object() {
        let temp = TempDir::new().expect("tempdir should be created");
        let path = temp.path().join("params.json");
        fs::write(&path, "[1, 2]").expect("write input");
        assert!(matches!(read_json_object(&path), Err(CliError::Compute(_))));

        let missing = temp.path().join("absent.json");
        assert!(matches!(read_json_object(&missing), Err(CliError::Internal(_))));
    }

    #[test]
    fn invalid_samples_are_written_as_nan() {
        let text = two_column_text(&[4.0, 4.1], &[Some(2.0), None]);
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1], "    4.00000000      2.000000e0");
        assert!(rows[2].ends_with("NaN"));
    }
}
