//! Reader for the HITRAN 160-character `.par` line format.

use super::{LineListProvider, resolve_molecule_id};
use crate::domain::{
    ComputeResult, LineList, LineListQuery, SlabError, Transition, upper_energy_kelvin,
};
use std::fs;
use std::path::{Path, PathBuf};

pub const PAR_RECORD_WIDTH: usize = 160;

#[derive(Debug, Clone, Copy)]
struct ParField {
    name: &'static str,
    start: usize,
    end: usize,
}

const fn field(name: &'static str, start: usize, width: usize) -> ParField {
    ParField {
        name,
        start,
        end: start + width,
    }
}

const MOLEC_ID: ParField = field("molec_id", 0, 2);
const LOCAL_ISO_ID: ParField = field("local_iso_id", 2, 1);
const NU: ParField = field("nu", 3, 12);
const SW: ParField = field("sw", 15, 10);
const EINSTEIN_A: ParField = field("a", 25, 10);
const ELOWER: ParField = field("elower", 45, 10);
const GLOBAL_UPPER_QUANTA: ParField = field("global_upper_quanta", 67, 15);
const GLOBAL_LOWER_QUANTA: ParField = field("global_lower_quanta", 82, 15);
const GP: ParField = field("gp", 146, 7);
const GPP: ParField = field("gpp", 153, 7);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParLineError {
    #[error("record has {actual} characters, expected at least {PAR_RECORD_WIDTH}")]
    TooShort { actual: usize },
    #[error("record contains non-ASCII characters")]
    NonAscii,
    #[error("field '{field}' has invalid value '{value}'")]
    InvalidField { field: &'static str, value: String },
}

/// Parses one `.par` record into a [`Transition`].
pub fn parse_par_line(line: &str) -> Result<Transition, ParLineError> {
    if !line.is_ascii() {
        return Err(ParLineError::NonAscii);
    }
    if line.len() < PAR_RECORD_WIDTH {
        return Err(ParLineError::TooShort { actual: line.len() });
    }

    let molecule_id = parse_number::<u32>(line, MOLEC_ID)?;
    let isotopologue = parse_isotopologue(line)?;
    let wavenumber = parse_number::<f64>(line, NU)?;
    let line_strength = parse_number::<f64>(line, SW)?;
    let einstein_a = parse_number::<f64>(line, EINSTEIN_A)?;
    let elower = parse_number::<f64>(line, ELOWER)?;
    let g_up = parse_number::<f64>(line, GP)?;
    let g_low = parse_number::<f64>(line, GPP)?;

    Ok(Transition {
        molecule_id,
        isotopologue,
        wavenumber,
        line_strength,
        einstein_a,
        elower,
        g_up,
        g_low,
        eup_k: upper_energy_kelvin(elower, wavenumber),
        vp: slice(line, GLOBAL_UPPER_QUANTA).trim().to_string(),
        vpp: slice(line, GLOBAL_LOWER_QUANTA).trim().to_string(),
    })
}

fn slice(line: &str, field: ParField) -> &str {
    &line[field.start..field.end]
}

fn parse_number<T: std::str::FromStr>(line: &str, field: ParField) -> Result<T, ParLineError> {
    let raw = slice(line, field).trim();
    raw.parse().map_err(|_| ParLineError::InvalidField {
        field: field.name,
        value: raw.to_string(),
    })
}

/// HITRAN numbers isotopologues 1-9, then `0` for the tenth and letters beyond.
fn parse_isotopologue(line: &str) -> Result<u32, ParLineError> {
    let raw = slice(line, LOCAL_ISO_ID);
    match raw.as_bytes()[0] {
        digit @ b'1'..=b'9' => Ok(u32::from(digit - b'0')),
        b'0' => Ok(10),
        letter @ b'A'..=b'Z' => Ok(11 + u32::from(letter - b'A')),
        _ => Err(ParLineError::InvalidField {
            field: LOCAL_ISO_ID.name,
            value: raw.to_string(),
        }),
    }
}

/// Line list backed by a local `.par` file, typically one HITRAN download per molecule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitranParFile {
    path: PathBuf,
}

impl HitranParFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_all(&self) -> ComputeResult<LineList> {
        let source = fs::read_to_string(&self.path).map_err(|source| {
            SlabError::io_system(
                "IO.LINE_LIST_READ",
                format!(
                    "failed to read line list '{}': {}",
                    self.path.display(),
                    source
                ),
            )
        })?;

        source
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(index, line)| {
                parse_par_line(line).map_err(|error| {
                    SlabError::input_validation(
                        "INPUT.LINE_LIST_RECORD",
                        format!(
                            "line list '{}' line {}: {}",
                            self.path.display(),
                            index + 1,
                            error
                        ),
                    )
                })
            })
            .collect()
    }
}

impl LineListProvider for HitranParFile {
    fn line_list(&self, query: &LineListQuery) -> ComputeResult<LineList> {
        let molecule_id = resolve_molecule_id(&query.molecule_name)?;
        let transitions = self.read_all()?;
        let selected: LineList = transitions
            .into_iter()
            .filter(|transition| transition.molecule_id == molecule_id && query.accepts(transition))
            .collect();

        tracing::debug!(
            path = %self.path.display(),
            molecule = %query.molecule_name,
            lines = selected.len(),
            "selected transitions from line list"
        );
        Ok(selected)
    }
}
