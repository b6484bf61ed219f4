mod commands;
mod helpers;

use clap::Parser;
use slabspec_core::domain::SlabError;

pub fn run_from_env() -> i32 {
    helpers::init_tracing();
    let args: Vec<String> = std::env::args().skip(1).collect();

    match run(args) {
        Ok(code) => code,
        Err(error) => {
            let slab_error = error.as_slab_error();
            eprintln!("{}", slab_error.diagnostic_line());
            eprintln!("{}", slab_error.fatal_exit_line());
            slab_error.exit_code()
        }
    }
}

pub fn run<I, S>(args: I) -> Result<i32, CliError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let full_args = std::iter::once("slabspec".to_string())
        .chain(args.into_iter().map(Into::into))
        .collect::<Vec<_>>();
    parse_and_dispatch(full_args)
}

fn parse_and_dispatch(args: Vec<String>) -> Result<i32, CliError> {
    match Cli::try_parse_from(&args) {
        Ok(cli) => dispatch_parsed(cli.command),
        Err(err) => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                print!("{}", err);
                Ok(0)
            }
            _ => Err(CliError::Usage(err.to_string())),
        },
    }
}

#[derive(Parser)]
#[command(name = "slabspec", version, about = "Slab-model molecular emission spectra")]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(clap::Subcommand)]
enum CliCommand {
    /// Synthesize a slab spectrum and write its artifacts
    Synth(commands::SynthArgs),
    /// Convolve a two-column (wave, flux) spectrum
    Convolve(commands::ConvolveArgs),
    /// Build the rotation diagram of a slab model
    Rotation(commands::RotationArgs),
}

fn dispatch_parsed(command: CliCommand) -> Result<i32, CliError> {
    match command {
        CliCommand::Synth(args) => commands::run_synth_command(args),
        CliCommand::Convolve(args) => commands::run_convolve_command(args),
        CliCommand::Rotation(args) => commands::run_rotation_command(args),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("{0}")]
    Usage(String),
    #[error("{0}")]
    Compute(SlabError),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<SlabError> for CliError {
    fn from(error: SlabError) -> Self {
        Self::Compute(error)
    }
}

impl CliError {
    fn as_slab_error(&self) -> SlabError {
        match self {
            Self::Usage(message) => SlabError::input_validation("INPUT.CLI_USAGE", message.clone()),
            Self::Compute(error) => error.clone(),
            Self::Internal(error) => SlabError::io_system("IO.CLI", format!("{error:#}")),
        }
    }
}
