// 📂 Dataset Loader - Census CSV → immutable Region Records
//
// Required columns (looked up by name, order does not matter):
//   ENTIDAD, NOM_ENT, MUN, NOM_MUN, POBTOT
// Any other column is ignored. A missing column is a SchemaError and the
// process must not start. Names and codes are kept byte-for-byte (only
// decoded), so lookups match them exactly, surrounding spaces included.

use crate::error::{CensusError, Result};
use csv::{ByteRecord, ReaderBuilder};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const COL_ENTITY_CODE: &str = "ENTIDAD";
pub const COL_ENTITY_NAME: &str = "NOM_ENT";
pub const COL_MUNICIPALITY_CODE: &str = "MUN";
pub const COL_MUNICIPALITY_NAME: &str = "NOM_MUN";
pub const COL_TOTAL_POPULATION: &str = "POBTOT";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_ENTITY_CODE,
    COL_ENTITY_NAME,
    COL_MUNICIPALITY_CODE,
    COL_MUNICIPALITY_NAME,
    COL_TOTAL_POPULATION,
];

// ============================================================================
// REGION RECORD
// ============================================================================

/// One row of the census dataset (a municipality or one of its localities)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionRecord {
    pub entity_code: String,
    pub entity_name: String,
    pub municipality_code: String,
    pub municipality_name: String,
    pub total_population: u64,
}

impl RegionRecord {
    pub fn new(
        entity_code: &str,
        entity_name: &str,
        municipality_code: &str,
        municipality_name: &str,
        total_population: u64,
    ) -> Self {
        RegionRecord {
            entity_code: entity_code.to_string(),
            entity_name: entity_name.to_string(),
            municipality_code: municipality_code.to_string(),
            municipality_name: municipality_name.to_string(),
            total_population,
        }
    }
}

// ============================================================================
// COLUMN LAYOUT
// ============================================================================

/// Positions of the required columns within the header row
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    entity_code: usize,
    entity_name: usize,
    municipality_code: usize,
    municipality_name: usize,
    total_population: usize,
}

impl ColumnLayout {
    fn from_headers(headers: &ByteRecord) -> Result<Self> {
        let names: Vec<String> = headers.iter().map(|h| decode_field(h).trim().to_string()).collect();

        let find = |column: &str| -> Result<usize> {
            names
                .iter()
                // Exports often start with a UTF-8 BOM
                .position(|name| name.trim_start_matches('\u{feff}') == column)
                .ok_or_else(|| CensusError::Schema {
                    column: column.to_string(),
                })
        };

        let mut positions = [0usize; REQUIRED_COLUMNS.len()];
        for (slot, column) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = find(column)?;
        }

        let [entity_code, entity_name, municipality_code, municipality_name, total_population] = positions;
        Ok(ColumnLayout {
            entity_code,
            entity_name,
            municipality_code,
            municipality_name,
            total_population,
        })
    }
}

// ============================================================================
// LOADING
// ============================================================================

/// Load every record from a CSV file on disk
pub fn load_csv(csv_path: &Path) -> Result<Vec<RegionRecord>> {
    let file = File::open(csv_path)?;
    let records = load_from_reader(file)?;

    log::info!(
        "Loaded {} census records from {}",
        records.len(),
        csv_path.display()
    );

    Ok(records)
}

/// Load every record from any CSV source
pub fn load_from_reader<R: Read>(reader: R) -> Result<Vec<RegionRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let layout = ColumnLayout::from_headers(rdr.byte_headers()?)?;

    let mut records = Vec::new();
    let mut row = ByteRecord::new();

    while rdr.read_byte_record(&mut row)? {
        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let field = |idx: usize| decode_field(row.get(idx).unwrap_or_default());

        let raw_population = field(layout.total_population);
        let total_population = parse_population(&raw_population).ok_or_else(|| CensusError::Parse {
            line,
            column: COL_TOTAL_POPULATION.to_string(),
            value: raw_population.clone(),
        })?;

        records.push(RegionRecord {
            entity_code: field(layout.entity_code),
            entity_name: field(layout.entity_name),
            municipality_code: field(layout.municipality_code),
            municipality_name: field(layout.municipality_name),
            total_population,
        });
    }

    Ok(records)
}

/// UTF-8 when valid, otherwise Latin-1 (one byte per char)
fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn parse_population(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<u64>() {
        return Some(value);
    }

    // Spreadsheet exports sometimes write integers as "1234.0"
    let value = trimmed.parse::<f64>().ok()?;
    if value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}
