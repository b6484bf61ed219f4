//! Seams to the data sources a slab run depends on.
//!
//! Line lists and partition functions traditionally come from the HITRAN web
//! service; here they sit behind traits so that local files, in-memory
//! fixtures or a caching network client can be plugged in by the caller.

pub mod hitran;
pub mod partition;

pub use hitran::{HitranParFile, parse_par_line};
pub use partition::{PartitionTable, QTableDirectory};

use crate::common::molecules::{molecular_mass_amu, molecule_identifier, thermal_velocity};
use crate::domain::{ComputeResult, LineList, LineListQuery, SlabError, Transition};

pub trait LineListProvider {
    fn line_list(&self, query: &LineListQuery) -> ComputeResult<LineList>;
}

pub trait PartitionFunctionProvider {
    fn partition_function(
        &self,
        molecule_name: &str,
        isotopologue_number: u32,
        temperature: f64,
    ) -> ComputeResult<f64>;
}

pub trait ThermalVelocityEstimator {
    /// Local velocity dispersion (sigma) in m/s.
    fn thermal_velocity(&self, molecule_name: &str, temperature: f64) -> ComputeResult<f64>;
}

impl<T> LineListProvider for &T
where
    T: LineListProvider + ?Sized,
{
    fn line_list(&self, query: &LineListQuery) -> ComputeResult<LineList> {
        (**self).line_list(query)
    }
}

impl<T> PartitionFunctionProvider for &T
where
    T: PartitionFunctionProvider + ?Sized,
{
    fn partition_function(
        &self,
        molecule_name: &str,
        isotopologue_number: u32,
        temperature: f64,
    ) -> ComputeResult<f64> {
        (**self).partition_function(molecule_name, isotopologue_number, temperature)
    }
}

/// Thermal speed sqrt(kT/m) of the principal isotopologue.
#[derive(Debug, Clone, Copy, Default)]
pub struct MolecularMassVelocity;

impl ThermalVelocityEstimator for MolecularMassVelocity {
    fn thermal_velocity(&self, molecule_name: &str, temperature: f64) -> ComputeResult<f64> {
        let mass = molecular_mass_amu(molecule_name, 1).ok_or_else(|| {
            SlabError::input_validation(
                "INPUT.MOLECULE",
                format!("no molecular mass known for molecule '{molecule_name}'"),
            )
        })?;
        Ok(thermal_velocity(mass, temperature))
    }
}

/// A line list held in memory, filtered with the same rules as a file source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryLineList {
    transitions: LineList,
}

impl InMemoryLineList {
    pub fn new(transitions: LineList) -> Self {
        Self { transitions }
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }
}

impl LineListProvider for InMemoryLineList {
    fn line_list(&self, query: &LineListQuery) -> ComputeResult<LineList> {
        let molecule_id = resolve_molecule_id(&query.molecule_name)?;
        Ok(self
            .transitions
            .iter()
            .filter(|transition| transition.molecule_id == molecule_id && query.accepts(transition))
            .cloned()
            .collect())
    }
}

pub(crate) fn resolve_molecule_id(molecule_name: &str) -> ComputeResult<u32> {
    molecule_identifier(molecule_name).ok_or_else(|| {
        SlabError::input_validation(
            "INPUT.MOLECULE",
            format!("unknown HITRAN molecule '{molecule_name}'"),
        )
    })
}
