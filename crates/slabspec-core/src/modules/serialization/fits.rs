//! Minimal FITS writer: an empty primary HDU followed by binary tables.
//!
//! Only what slab outputs need is supported: 64-bit float columns (`D`) and
//! fixed-width character columns (`nA`). Headers and data units are padded to
//! 2880-byte blocks, numbers are stored big-endian.

use std::fmt;

pub const FITS_BLOCK: usize = 2880;
const CARD_WIDTH: usize = 80;

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Float64(Vec<f64>),
    Text(Vec<String>),
}

impl ColumnData {
    fn len(&self) -> usize {
        match self {
            Self::Float64(values) => values.len(),
            Self::Text(values) => values.len(),
        }
    }

    /// Bytes per cell and the matching TFORM code.
    fn layout(&self) -> (usize, String) {
        match self {
            Self::Float64(_) => (8, "D".to_string()),
            Self::Text(values) => {
                let width = values.iter().map(String::len).max().unwrap_or(0).max(1);
                (width, format!("{width}A"))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitsColumn {
    pub name: String,
    pub unit: Option<String>,
    pub data: ColumnData,
}

impl FitsColumn {
    pub fn float64(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            data: ColumnData::Float64(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            unit: None,
            data: ColumnData::Text(values),
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitsError {
    #[error("column '{column}' has {actual} rows, expected {expected}")]
    RaggedColumns {
        column: String,
        expected: usize,
        actual: usize,
    },
    #[error("header value for {keyword} does not fit in a card: '{value}'")]
    CardOverflow { keyword: String, value: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BinaryTable {
    pub name: Option<String>,
    pub columns: Vec<FitsColumn>,
}

impl BinaryTable {
    pub fn new(columns: Vec<FitsColumn>) -> Self {
        Self {
            name: None,
            columns,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, |column| column.data.len())
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), FitsError> {
        let rows = self.rows();
        for column in &self.columns {
            if column.data.len() != rows {
                return Err(FitsError::RaggedColumns {
                    column: column.name.clone(),
                    expected: rows,
                    actual: column.data.len(),
                });
            }
        }

        let layouts: Vec<(usize, String)> =
            self.columns.iter().map(|column| column.data.layout()).collect();
        let row_width: usize = layouts.iter().map(|(width, _)| width).sum();

        let mut header = Header::default();
        header.string("XTENSION", "BINTABLE")?;
        header.integer("BITPIX", 8);
        header.integer("NAXIS", 2);
        header.integer("NAXIS1", row_width as i64);
        header.integer("NAXIS2", rows as i64);
        header.integer("PCOUNT", 0);
        header.integer("GCOUNT", 1);
        header.integer("TFIELDS", self.columns.len() as i64);
        for (index, (column, (_, tform))) in self.columns.iter().zip(&layouts).enumerate() {
            let position = index + 1;
            header.string(&format!("TTYPE{position}"), &column.name)?;
            header.string(&format!("TFORM{position}"), tform)?;
            if let Some(unit) = &column.unit {
                header.string(&format!("TUNIT{position}"), unit)?;
            }
        }
        if let Some(name) = &self.name {
            header.string("EXTNAME", name)?;
        }
        header.finish(out);

        let data_start = out.len();
        for row in 0..rows {
            for (column, (width, _)) in self.columns.iter().zip(&layouts) {
                match &column.data {
                    ColumnData::Float64(values) => out.extend_from_slice(&values[row].to_be_bytes()),
                    ColumnData::Text(values) => {
                        let bytes = values[row].as_bytes();
                        out.extend_from_slice(bytes);
                        out.resize(out.len() + (width - bytes.len()), b' ');
                    }
                }
            }
        }
        pad_block(out, data_start, 0);
        Ok(())
    }
}

/// Encodes an empty primary HDU followed by `tables` as one FITS file.
pub fn encode_fits(tables: &[BinaryTable]) -> Result<Vec<u8>, FitsError> {
    let mut out = Vec::new();

    let mut primary = Header::default();
    primary.logical("SIMPLE", true);
    primary.integer("BITPIX", 8);
    primary.integer("NAXIS", 0);
    primary.logical("EXTEND", true);
    primary.finish(&mut out);

    for table in tables {
        table.encode(&mut out)?;
    }
    Ok(out)
}

#[derive(Debug, Default)]
struct Header {
    cards: Vec<String>,
}

impl Header {
    fn logical(&mut self, keyword: &str, value: bool) {
        self.fixed(keyword, if value { "T" } else { "F" });
    }

    fn integer(&mut self, keyword: &str, value: i64) {
        self.fixed(keyword, value);
    }

    fn fixed(&mut self, keyword: &str, value: impl fmt::Display) {
        self.cards.push(format!("{keyword:<8}= {value:>20}"));
    }

    fn string(&mut self, keyword: &str, value: &str) -> Result<(), FitsError> {
        let escaped = value.replace('\'', "''");
        let card = format!("{keyword:<8}= '{escaped:<8}'");
        if card.len() > CARD_WIDTH || !card.is_ascii() {
            return Err(FitsError::CardOverflow {
                keyword: keyword.to_string(),
                value: value.to_string(),
            });
        }
        self.cards.push(card);
        Ok(())
    }

    fn finish(mut self, out: &mut Vec<u8>) {
        self.cards.push("END".to_string());
        let start = out.len();
        for card in &self.cards {
            out.extend_from_slice(format!("{card:<width$}", width = CARD_WIDTH).as_bytes());
        }
        pad_block(out, start, b' ');
    }
}

fn pad_block(out: &mut Vec<u8>, start: usize, fill: u8) {
    let written = out.len() - start;
    let remainder = written % FITS_BLOCK;
    if remainder != 0 {
        out.resize(out.len() + FITS_BLOCK - remainder, fill);
    }
}
