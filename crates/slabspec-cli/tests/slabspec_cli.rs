use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .expect("crate lives two levels below the workspace root")
        .to_path_buf()
}

fn fixtures_dir() -> PathBuf {
    workspace_root()
        .join("crates")
        .join("slabspec-core")
        .join("tests")
        .join("fixtures")
}

fn slabspec(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_slabspec"))
        .args(args)
        .env("RUST_LOG", "off")
        .output()
        .expect("slabspec binary should run")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn line_list() -> String {
    fixtures_dir().join("co_fundamental.par").display().to_string()
}

fn partition_dir() -> String {
    fixtures_dir().display().to_string()
}

#[test]
fn synth_writes_every_artifact() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output_dir = temp.path().join("co");
    let output = slabspec(&[
        "synth",
        "--molecule",
        "CO",
        "--column-density",
        "1e16",
        "--temperature",
        "300",
        "--area",
        "1e18",
        "--wmin",
        "4.0",
        "--wmax",
        "5.0",
        "--local-velocity",
        "20000",
        "--line-list",
        &line_list(),
        "--partition-dir",
        &partition_dir(),
        "--output-dir",
        output_dir.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success(), "synth failed, stderr: {}", stderr(&output));

    for name in [
        "slabmodel.fits",
        "spectrum.dat",
        "lines.dat",
        "rotation.dat",
        "modelparams.json",
    ] {
        assert!(output_dir.join(name).is_file(), "{name} should be written");
    }
    let summary = stdout(&output);
    assert!(summary.contains("lines = 149"), "stdout: {summary}");
    assert_eq!(summary.matches("wrote ").count(), 5);
}

#[test]
fn flags_override_the_parameter_file() {
    let temp = TempDir::new().expect("tempdir should be created");
    let params = temp.path().join("params.json");
    fs::write(
        &params,
        r#"{
  "molecule_name": "CO",
  "column_density": 1e16,
  "temperature": 300.0,
  "area": 1e18,
  "wmin": 4.0,
  "wmax": 5.0,
  "local_velocity": 20000.0,
  "filters": { "aup_min": 1e-3 }
}"#,
    )
    .expect("parameter file should be written");
    let output_dir = temp.path().join("out");

    let output = slabspec(&[
        "synth",
        "--params",
        params.to_str().expect("utf-8 path"),
        "--temperature",
        "900",
        "--eup-max",
        "4000",
        "--line-list",
        &line_list(),
        "--partition-dir",
        &partition_dir(),
        "--output-dir",
        output_dir.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success(), "synth failed, stderr: {}", stderr(&output));

    let echoed: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(output_dir.join("modelparams.json")).expect("json should exist"),
    )
    .expect("json should parse");
    assert_eq!(echoed["temperature"], 900.0);
    assert_eq!(echoed["column_density"], 1e16);
    assert_eq!(echoed["filters"]["eup_max"], 4000.0);
    assert_eq!(echoed["filters"]["aup_min"], 1e-3);
}

#[test]
fn missing_slab_parameters_are_usage_errors() {
    let output = slabspec(&[
        "synth",
        "--molecule",
        "CO",
        "--area",
        "1e18",
        "--line-list",
        &line_list(),
        "--partition-dir",
        &partition_dir(),
    ]);
    assert_eq!(output.status.code(), Some(2));
    let diagnostics = stderr(&output);
    assert!(diagnostics.contains("ERROR: [INPUT.CLI_USAGE]"), "stderr: {diagnostics}");
    assert!(diagnostics.contains("--column-density, --temperature"));
    assert!(diagnostics.contains("FATAL EXIT CODE: 2"));
}

#[test]
fn invalid_parameter_values_are_input_errors() {
    let output = slabspec(&[
        "synth",
        "--molecule",
        "CO",
        "--column-density",
        "1e16",
        "--temperature=-5",
        "--area",
        "1e18",
        "--line-list",
        &line_list(),
        "--partition-dir",
        &partition_dir(),
    ]);
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("FATAL EXIT CODE: 2"));
}

#[test]
fn missing_line_list_is_an_io_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let absent = temp.path().join("absent.par");
    let output = slabspec(&[
        "synth",
        "--molecule",
        "CO",
        "--column-density",
        "1e16",
        "--temperature",
        "300",
        "--area",
        "1e18",
        "--local-velocity",
        "20000",
        "--line-list",
        absent.to_str().expect("utf-8 path"),
        "--partition-dir",
        &partition_dir(),
        "--output-dir",
        temp.path().join("out").to_str().expect("utf-8 path"),
    ]);
    assert_eq!(output.status.code(), Some(3));
    assert!(stderr(&output).contains("[IO.LINE_LIST_READ]"), "stderr: {}", stderr(&output));
}

fn write_spectrum(path: &Path, points: usize, nan_at: Option<usize>) {
    let mut content = String::from("# wave flux\n");
    for index in 0..points {
        let wave = 4.0 + 1.0e-4 * index as f64;
        let flux = if Some(index) == nan_at {
            "nan".to_string()
        } else {
            format!("{}", 1.0 + (-((index as f64 - 200.0) / 5.0).powi(2)).exp())
        };
        content.push_str(&format!("{wave:.6} {flux}\n"));
    }
    fs::write(path, content).expect("spectrum should be written");
}

#[test]
fn fwhm_convolution_keeps_invalid_pixels_invalid() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("spectrum.txt");
    let convolved = temp.path().join("convolved.txt");
    write_spectrum(&input, 400, Some(50));

    let output = slabspec(&[
        "convolve",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--output",
        convolved.to_str().expect("utf-8 path"),
        "--method",
        "fwhm",
        "--velocity",
        "20",
    ]);
    assert!(output.status.success(), "convolve failed, stderr: {}", stderr(&output));

    let content = fs::read_to_string(&convolved).expect("output should exist");
    let rows: Vec<&str> = content.lines().skip(1).collect();
    assert_eq!(rows.len(), 400);
    assert!(rows[50].ends_with("NaN"));
    let peak: f64 = rows[200]
        .split_whitespace()
        .nth(1)
        .and_then(|value| value.parse().ok())
        .expect("flux column");
    assert!(peak > 1.0 && peak < 2.0, "peak={peak}");
}

#[test]
fn resolution_convolution_prints_to_stdout() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("spectrum.txt");
    write_spectrum(&input, 400, None);

    let output = slabspec(&[
        "convolve",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--method",
        "resolution",
        "--velocity",
        "30",
    ]);
    assert!(output.status.success(), "convolve failed, stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).lines().count(), 401);
}

#[test]
fn short_spectra_still_convolve() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("spectrum.txt");
    write_spectrum(&input, 5, None);

    let output = slabspec(&[
        "convolve",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--velocity",
        "20",
    ]);
    assert!(output.status.success(), "convolve failed, stderr: {}", stderr(&output));
    assert_eq!(stdout(&output).lines().count(), 6);
}

#[test]
fn two_point_spectra_are_a_computation_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("spectrum.txt");
    write_spectrum(&input, 2, None);

    let output = slabspec(&[
        "convolve",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--velocity",
        "20",
    ]);
    assert_eq!(output.status.code(), Some(4));
    let diagnostics = stderr(&output);
    assert!(diagnostics.contains("[RUN.CONVOLUTION]"), "stderr: {diagnostics}");
    assert!(diagnostics.contains("FATAL EXIT CODE: 4"));
}

#[test]
fn resolution_convolution_rejects_invalid_flux() {
    let temp = TempDir::new().expect("tempdir should be created");
    let input = temp.path().join("spectrum.txt");
    write_spectrum(&input, 400, Some(50));

    let output = slabspec(&[
        "convolve",
        "--input",
        input.to_str().expect("utf-8 path"),
        "--method",
        "resolution",
        "--velocity",
        "30",
    ]);
    assert_eq!(output.status.code(), Some(2));
    let diagnostics = stderr(&output);
    assert!(diagnostics.contains("[INPUT.NON_FINITE_FLUX]"), "stderr: {diagnostics}");
    assert!(diagnostics.contains("row 51"));
}

#[test]
fn rotation_fit_recovers_a_thin_slab_temperature() {
    let output = slabspec(&[
        "rotation",
        "--molecule",
        "CO",
        "--column-density",
        "1e12",
        "--temperature",
        "700",
        "--area",
        "1e18",
        "--wmin",
        "4.0",
        "--wmax",
        "5.0",
        "--local-velocity",
        "20000",
        "--vup",
        "1",
        "--line-list",
        &line_list(),
        "--partition-dir",
        &partition_dir(),
        "--json",
    ]);
    assert!(output.status.success(), "rotation failed, stderr: {}", stderr(&output));

    let summary: serde_json::Value =
        serde_json::from_str(&stdout(&output)).expect("summary should be JSON");
    assert_eq!(summary["molecule_name"], "CO");
    let temperature = summary["temperature"].as_f64().expect("fit temperature");
    assert!((temperature - 700.0).abs() < 7.0, "T={temperature}");
    assert_eq!(summary["points_used"], summary["lines"]);
}

#[test]
fn rotation_diagram_text_ends_with_the_fit() {
    let temp = TempDir::new().expect("tempdir should be created");
    let diagram = temp.path().join("rotation.dat");
    let output = slabspec(&[
        "rotation",
        "--molecule",
        "CO",
        "--column-density",
        "1e12",
        "--temperature",
        "700",
        "--area",
        "1e18",
        "--wmin",
        "4.0",
        "--wmax",
        "5.0",
        "--local-velocity",
        "20000",
        "--vup",
        "1",
        "--line-list",
        &line_list(),
        "--partition-dir",
        &partition_dir(),
        "--output",
        diagram.to_str().expect("utf-8 path"),
    ]);
    assert!(output.status.success(), "rotation failed, stderr: {}", stderr(&output));
    assert!(stdout(&output).starts_with("# fit: T_rot = "));
    let rows = fs::read_to_string(&diagram).expect("diagram should exist");
    assert!(rows.starts_with("# x=eup_k(K)"));
    assert!(rows.lines().count() > 2);
}
