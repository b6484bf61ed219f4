//! Tabulated total internal partition sums.

use super::PartitionFunctionProvider;
use crate::common::molecules::global_identifier;
use crate::domain::{ComputeResult, SlabError};
use crate::numerics::{interpolate_linear, is_strictly_increasing};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct PartitionTable {
    temperatures: Vec<f64>,
    values: Vec<f64>,
}

impl PartitionTable {
    pub fn new(temperatures: Vec<f64>, values: Vec<f64>) -> ComputeResult<Self> {
        if temperatures.len() < 2 || temperatures.len() != values.len() {
            return Err(SlabError::input_validation(
                "INPUT.PARTITION_TABLE",
                format!(
                    "partition table needs at least two (T, Q) pairs, got {} temperatures and {} values",
                    temperatures.len(),
                    values.len()
                ),
            ));
        }
        if !is_strictly_increasing(&temperatures) {
            return Err(SlabError::input_validation(
                "INPUT.PARTITION_TABLE",
                "partition table temperatures must be strictly increasing",
            ));
        }
        if values.iter().any(|value| !value.is_finite() || *value <= 0.0) {
            return Err(SlabError::input_validation(
                "INPUT.PARTITION_TABLE",
                "partition function values must be finite and positive",
            ));
        }

        Ok(Self {
            temperatures,
            values,
        })
    }

    /// Parses the two-column text layout of the HITRAN `q<N>.txt` files.
    ///
    /// Blank lines and lines starting with `#` are skipped; any further
    /// columns are ignored.
    pub fn parse(source: &str, origin: &str) -> ComputeResult<Self> {
        let mut temperatures = Vec::new();
        let mut values = Vec::new();

        for (index, raw) in source.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut columns = line.split_whitespace();
            let (Some(temperature), Some(value)) = (columns.next(), columns.next()) else {
                return Err(malformed_row(origin, index + 1, line));
            };
            let temperature: f64 = temperature
                .parse()
                .map_err(|_| malformed_row(origin, index + 1, line))?;
            let value: f64 = value
                .parse()
                .map_err(|_| malformed_row(origin, index + 1, line))?;
            temperatures.push(temperature);
            values.push(value);
        }

        Self::new(temperatures, values)
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn value_at(&self, temperature: f64) -> f64 {
        let first = self.temperatures[0];
        let last = self.temperatures[self.temperatures.len() - 1];
        if temperature < first || temperature > last {
            tracing::debug!(
                temperature,
                first,
                last,
                "temperature outside partition table, clamping"
            );
        }
        interpolate_linear(temperature, &self.temperatures, &self.values)
            .unwrap_or(self.values[0])
    }
}

fn malformed_row(origin: &str, line_number: usize, line: &str) -> SlabError {
    SlabError::input_validation(
        "INPUT.PARTITION_TABLE",
        format!("partition table '{origin}' line {line_number} is not a (T, Q) pair: '{line}'"),
    )
}

impl PartitionFunctionProvider for PartitionTable {
    fn partition_function(
        &self,
        _molecule_name: &str,
        _isotopologue_number: u32,
        temperature: f64,
    ) -> ComputeResult<f64> {
        Ok(self.value_at(temperature))
    }
}

/// Directory of `q<global id>.txt` tables, loaded lazily and kept for the
/// lifetime of the provider.
#[derive(Debug)]
pub struct QTableDirectory {
    root: PathBuf,
    cache: Mutex<HashMap<u32, Arc<PartitionTable>>>,
}

impl QTableDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table_path(&self, global_id: u32) -> PathBuf {
        self.root.join(format!("q{global_id}.txt"))
    }

    pub fn table(&self, molecule_name: &str, isotopologue_number: u32) -> ComputeResult<Arc<PartitionTable>> {
        let global_id = global_identifier(molecule_name, isotopologue_number).ok_or_else(|| {
            SlabError::input_validation(
                "INPUT.ISOTOPOLOGUE",
                format!(
                    "no HITRAN isotopologue {isotopologue_number} known for molecule '{molecule_name}'"
                ),
            )
        })?;

        let mut cache = self.cache.lock().map_err(|_| {
            SlabError::internal(
                "RUN.PARTITION_CACHE",
                "partition table cache lock was poisoned",
            )
        })?;
        if let Some(table) = cache.get(&global_id) {
            return Ok(Arc::clone(table));
        }

        let path = self.table_path(global_id);
        let source = fs::read_to_string(&path).map_err(|source| {
            SlabError::io_system(
                "IO.PARTITION_TABLE_READ",
                format!(
                    "failed to read partition table '{}': {}",
                    path.display(),
                    source
                ),
            )
        })?;
        let table = Arc::new(PartitionTable::parse(
            &source,
            &path.display().to_string(),
        )?);
        tracing::debug!(
            path = %path.display(),
            rows = table.temperatures().len(),
            "loaded partition table"
        );
        cache.insert(global_id, Arc::clone(&table));
        Ok(table)
    }

    pub fn cached_tables(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl PartitionFunctionProvider for QTableDirectory {
    fn partition_function(
        &self,
        molecule_name: &str,
        isotopologue_number: u32,
        temperature: f64,
    ) -> ComputeResult<f64> {
        Ok(self
            .table(molecule_name, isotopologue_number)?
            .value_at(temperature))
    }
}

#[cfg(test)]
mod tests {
    use super::{PartitionTable, QTableDirectory};
    use crate::domain::SlabErrorCategory;
    use crate::providers::PartitionFunctionProvider;
    use std::fs;
    use tempfile::TempDir;

    const CO_TABLE: &str = "\
# T  Q
     100.0    36.5
     200.0    72.6
     300.0   108.6
";

    #[test]
    fn table_interpolates_and_clamps() {
        let table = PartitionTable::parse(CO_TABLE, "inline").expect("table should parse");
        assert_eq!(table.temperatures(), &[100.0, 200.0, 300.0]);
        assert!((table.value_at(150.0) - 54.55).abs() < 1.0e-9);
        assert_eq!(table.value_at(300.0), 108.6);
        assert_eq!(table.value_at(50.0), 36.5);
        assert_eq!(table.value_at(5000.0), 108.6);
    }

    #[test]
    fn malformed_tables_are_rejected() {
        let error = PartitionTable::parse("100 36.5\n200 abc\n", "inline").expect_err("bad value");
        assert_eq!(error.category(), SlabErrorCategory::InputValidationError);
        assert!(error.message().contains("line 2"));

        assert!(PartitionTable::parse("100 36.5\n", "inline").is_err());
        assert!(PartitionTable::new(vec![200.0, 100.0], vec![1.0, 2.0]).is_err());
        assert!(PartitionTable::new(vec![100.0, 200.0], vec![1.0, 0.0]).is_err());
    }

    #[test]
    fn directory_resolves_global_ids_and_caches() {
        let temp = TempDir::new().expect("tempdir should be created");
        fs::write(temp.path().join("q26.txt"), CO_TABLE).expect("table should be written");
        let provider = QTableDirectory::new(temp.path());

        let q = provider
            .partition_function("CO", 1, 250.0)
            .expect("CO table should load");
        assert!((q - 90.6).abs() < 1.0e-9);
        assert_eq!(provider.cached_tables(), 1);

        fs::remove_file(temp.path().join("q26.txt")).expect("table should be removed");
        let cached = provider
            .partition_function("CO", 1, 100.0)
            .expect("cached table should be reused");
        assert_eq!(cached, 36.5);
    }

    #[test]
    fn directory_reports_missing_tables_and_unknown_isotopologues() {
        let temp = TempDir::new().expect("tempdir should be created");
        let provider = QTableDirectory::new(temp.path());

        let missing = provider
            .partition_function("CO", 2, 300.0)
            .expect_err("q27.txt is absent");
        assert_eq!(missing.category(), SlabErrorCategory::IoSystemError);
        assert!(missing.message().contains("q27.txt"));

        let unknown = provider
            .partition_function("CO", 42, 300.0)
            .expect_err("no such isotopologue");
        assert_eq!(unknown.category(), SlabErrorCategory::InputValidationError);
    }
}
