use super::CliError;
use super::helpers::{read_json_object, read_two_column, two_column_text, write_output};
use serde::Serialize;
use serde_json::{Map, Value};
use slabspec_core::domain::{SlabError, SlabParameters};
use slabspec_core::modules::serialization::{rotation_text, write_slab_artifacts};
use slabspec_core::modules::{RotationFit, SlabSynthesizer, rotation_diagram};
use slabspec_core::numerics::{
    ConvolutionError, FluxSample, FwhmConvolutionInput, ResolutionConvolutionInput,
    convolve_by_fwhm, convolve_by_resolution, flag_non_finite,
};
use slabspec_core::providers::{HitranParFile, QTableDirectory};
use std::path::PathBuf;

/// Parameter fields that must come from either `--params` or a flag.
const REQUIRED_PARAMETERS: [(&str, &str); 4] = [
    ("molecule_name", "--molecule"),
    ("column_density", "--column-density"),
    ("temperature", "--temperature"),
    ("area", "--area"),
];

#[derive(Debug, clap::Args)]
pub(super) struct ModelArgs {
    /// JSON file with slab parameters; flags below override its fields
    #[arg(long)]
    params: Option<PathBuf>,
    /// Molecule name, e.g. CO
    #[arg(long)]
    molecule: Option<String>,
    /// Column density, m^-2
    #[arg(long)]
    column_density: Option<f64>,
    /// Slab temperature, K
    #[arg(long)]
    temperature: Option<f64>,
    /// Emitting area, m^2
    #[arg(long)]
    area: Option<f64>,
    /// Lower wavelength bound, micron
    #[arg(long)]
    wmin: Option<f64>,
    /// Upper wavelength bound, micron
    #[arg(long)]
    wmax: Option<f64>,
    /// Distance, pc
    #[arg(long)]
    distance: Option<f64>,
    /// Local isotopologue number
    #[arg(long)]
    isotopologue: Option<u32>,
    /// Local velocity dispersion (sigma), m/s; thermal width when omitted
    #[arg(long)]
    local_velocity: Option<f64>,
    /// FWHM of the instrumental kernel, km/s
    #[arg(long)]
    convolution_fwhm: Option<f64>,
    /// Keep only lines from this upper vibrational level
    #[arg(long)]
    vup: Option<i64>,
    /// Drop lines with upper-level energy at or above this value, K
    #[arg(long)]
    eup_max: Option<f64>,
    /// Drop lines with Einstein A below this value, s^-1
    #[arg(long)]
    aup_min: Option<f64>,
    /// Drop lines with line strength below this value
    #[arg(long)]
    sw_min: Option<f64>,
    /// HITRAN fixed-width (.par) line list
    #[arg(long)]
    line_list: PathBuf,
    /// Directory holding q<N>.txt partition function tables
    #[arg(long)]
    partition_dir: PathBuf,
}

impl ModelArgs {
    fn synthesizer(&self) -> SlabSynthesizer<HitranParFile, QTableDirectory> {
        SlabSynthesizer::new(
            HitranParFile::new(self.line_list.clone()),
            QTableDirectory::new(self.partition_dir.clone()),
        )
    }

    fn slab_parameters(&self) -> Result<SlabParameters, CliError> {
        let mut fields = match &self.params {
            Some(path) => read_json_object(path)?,
            None => Map::new(),
        };

        let overrides = [
            ("molecule_name", self.molecule.clone().map(Value::from)),
            ("column_density", self.column_density.map(Value::from)),
            ("temperature", self.temperature.map(Value::from)),
            ("area", self.area.map(Value::from)),
            ("wmin", self.wmin.map(Value::from)),
            ("wmax", self.wmax.map(Value::from)),
            ("distance_pc", self.distance.map(Value::from)),
            ("isotopologue_number", self.isotopologue.map(Value::from)),
            ("local_velocity", self.local_velocity.map(Value::from)),
            ("convolution_fwhm", self.convolution_fwhm.map(Value::from)),
            ("vup", self.vup.map(Value::from)),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                fields.insert(key.to_string(), value);
            }
        }

        let filter_overrides = [
            ("eup_max", self.eup_max),
            ("aup_min", self.aup_min),
            ("sw_min", self.sw_min),
        ];
        if filter_overrides.iter().any(|(_, value)| value.is_some()) {
            let filters = fields
                .entry("filters")
                .or_insert_with(|| Value::Object(Map::new()));
            let Value::Object(filters) = filters else {
                return Err(SlabError::input_validation(
                    "INPUT.PARAMETERS",
                    "'filters' must be a JSON object",
                )
                .into());
            };
            for (key, value) in filter_overrides {
                if let Some(value) = value {
                    filters.insert(key.to_string(), Value::from(value));
                }
            }
        }

        let missing: Vec<&str> = REQUIRED_PARAMETERS
            .iter()
            .filter(|(key, _)| !fields.contains_key(*key))
            .map(|(_, flag)| *flag)
            .collect();
        if !missing.is_empty() {
            return Err(CliError::Usage(format!(
                "missing required slab parameters: {}",
                missing.join(", ")
            )));
        }

        serde_json::from_value(Value::Object(fields)).map_err(|source| {
            SlabError::input_validation(
                "INPUT.PARAMETERS",
                format!("invalid slab parameters: {source}"),
            )
            .into()
        })
    }
}

#[derive(Debug, clap::Args)]
pub(super) struct SynthArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Directory receiving the FITS, text and JSON artifacts
    #[arg(long, default_value = "slab-output")]
    output_dir: PathBuf,
}

pub(super) fn run_synth_command(args: SynthArgs) -> Result<i32, CliError> {
    let parameters = args.model.slab_parameters()?;
    tracing::debug!(
        line_list = %args.model.line_list.display(),
        partition_dir = %args.model.partition_dir.display(),
        output_dir = %args.output_dir.display(),
        "starting slab synthesis"
    );
    let result = args.model.synthesizer().synthesize(&parameters)?;
    let diagram = rotation_diagram(&result.line_parameters);
    let written = write_slab_artifacts(&result, &diagram, &args.output_dir)?;

    println!(
        "{} slab: T = {} K, N = {:e} m^-2, sigma = {:.1} m/s",
        parameters.molecule_name,
        parameters.temperature,
        parameters.column_density,
        result.model.resolved_local_velocity
    );
    println!(
        "lines = {}, grid points = {}, total line flux = {:e} W m^-2",
        result.line_parameters.len(),
        result.spectrum.len(),
        result.total_line_flux()
    );
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(0)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(super) enum ConvolutionMethod {
    /// Constant resolving power R = c / dv
    Resolution,
    /// Windowed Gaussian of fixed FWHM
    Fwhm,
}

#[derive(Debug, clap::Args)]
pub(super) struct ConvolveArgs {
    /// Two-column (wave in micron, flux) text file
    #[arg(long)]
    input: PathBuf,
    /// Output file; stdout when omitted
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = ConvolutionMethod::Fwhm)]
    method: ConvolutionMethod,
    /// Resolution element (resolution) or kernel FWHM (fwhm), km/s
    #[arg(long)]
    velocity: f64,
}

pub(super) fn run_convolve_command(args: ConvolveArgs) -> Result<i32, CliError> {
    let (wave, flux) = read_two_column(&args.input)?;
    tracing::debug!(
        points = wave.len(),
        method = ?args.method,
        velocity = args.velocity,
        "convolving spectrum"
    );
    let convolved: Vec<FluxSample> = match args.method {
        ConvolutionMethod::Resolution => {
            if let Some(index) = flux.iter().position(|value| !value.is_finite()) {
                tracing::warn!(
                    index,
                    "resolution convolution cannot resample invalid flux, rejecting input"
                );
                return Err(SlabError::input_validation(
                    "INPUT.NON_FINITE_FLUX",
                    format!(
                        "flux at row {} of '{}' is not finite; use --method fwhm for spectra with gaps",
                        index + 1,
                        args.input.display()
                    ),
                )
                .into());
            }
            convolve_by_resolution(ResolutionConvolutionInput::new(&wave, &flux, args.velocity))
                .map_err(convolution_error)?
                .into_flux()
                .into_iter()
                .map(Some)
                .collect()
        }
        ConvolutionMethod::Fwhm => {
            let samples = flag_non_finite(&flux);
            convolve_by_fwhm(FwhmConvolutionInput::new(&wave, &samples, args.velocity))
                .map_err(convolution_error)?
        }
    };

    let content = two_column_text(&wave, &convolved);
    match &args.output {
        Some(path) => {
            write_output(path, &content)?;
            println!("wrote {} points to {}", wave.len(), path.display());
        }
        None => print!("{content}"),
    }
    Ok(0)
}

fn convolution_error(source: ConvolutionError) -> SlabError {
    SlabError::computation("RUN.CONVOLUTION", source.to_string())
}

#[derive(Debug, clap::Args)]
pub(super) struct RotationArgs {
    #[command(flatten)]
    model: ModelArgs,
    /// Write the diagram to this file instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    /// Print the fit as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct RotationSummary {
    molecule_name: String,
    lines: usize,
    #[serde(flatten)]
    fit: Option<FitSummary>,
}

#[derive(Debug, Serialize)]
struct FitSummary {
    temperature: f64,
    slope: f64,
    intercept: f64,
    points_used: usize,
}

impl From<RotationFit> for FitSummary {
    fn from(fit: RotationFit) -> Self {
        Self {
            temperature: fit.temperature,
            slope: fit.slope,
            intercept: fit.intercept,
            points_used: fit.points_used,
        }
    }
}

pub(super) fn run_rotation_command(args: RotationArgs) -> Result<i32, CliError> {
    let parameters = args.model.slab_parameters()?;
    let result = args.model.synthesizer().synthesize(&parameters)?;
    let diagram = rotation_diagram(&result.line_parameters);
    let fit = diagram.fit();

    if let Some(path) = &args.output {
        write_output(path, &rotation_text(&diagram))?;
    } else if !args.json {
        print!("{}", rotation_text(&diagram));
    }

    if args.json {
        let summary = RotationSummary {
            molecule_name: parameters.molecule_name.clone(),
            lines: diagram.len(),
            fit: fit.map(FitSummary::from),
        };
        let json = serde_json::to_string_pretty(&summary).map_err(|source| {
            SlabError::internal("RUN.JSON_SERIALIZE", source.to_string())
        })?;
        println!("{json}");
        return Ok(0);
    }

    match fit {
        Some(fit) => println!(
            "# fit: T_rot = {:.2} K, slope = {:e}, intercept = {:.6}, points = {}",
            fit.temperature, fit.slope, fit.intercept, fit.points_used
        ),
        None => println!("# fit: fewer than two usable points"),
    }
    Ok(0)
}
