// 📊 Tabular Aggregator - read-only queries over the loaded census dataset
//
// The store is built once at startup and shared (Arc) by every handler.
// Nothing mutates it afterwards, so no locking is needed.
//
// Unknown entity behaviour is intentionally asymmetric:
//   total_population      → None (unknown ≠ zero population)
//   list_municipalities   → empty Vec (not an error)
//   municipality_population → Err(NotFound)
//
// Construction rejects any entity whose POBTOT sum overflows u64, so every
// sum taken by the queries below fits (municipality sums are sub-sums).

use crate::dataset::{load_csv, RegionRecord};
use crate::error::{CensusError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

// ============================================================================
// DATASET INFO
// ============================================================================

/// Provenance of the loaded dataset
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub source: Option<PathBuf>,
    pub record_count: usize,
    pub entity_count: usize,
    pub loaded_at: DateTime<Utc>,
}

// ============================================================================
// CENSUS STORE
// ============================================================================

#[derive(Debug, Clone)]
pub struct CensusStore {
    records: Vec<RegionRecord>,
    info: DatasetInfo,
}

impl CensusStore {
    /// Build a store from already-loaded records
    pub fn from_records(records: Vec<RegionRecord>) -> Result<Self> {
        Self::with_source(records, None)
    }

    /// Load the dataset from disk. Fails with `Schema` if a required column is
    /// missing, `PopulationOverflow` if an entity total does not fit in a u64.
    pub fn load(csv_path: &Path) -> Result<Self> {
        let records = load_csv(csv_path)?;
        let store = Self::with_source(records, Some(csv_path.to_path_buf()))?;

        log::info!(
            "Census store ready: {} records, {} entities",
            store.info.record_count,
            store.info.entity_count
        );

        Ok(store)
    }

    fn with_source(records: Vec<RegionRecord>, source: Option<PathBuf>) -> Result<Self> {
        let entity_count = {
            let mut entity_totals: HashMap<&str, u64> = HashMap::new();
            for record in &records {
                let total = entity_totals.entry(record.entity_name.as_str()).or_insert(0);
                *total = total
                    .checked_add(record.total_population)
                    .ok_or_else(|| CensusError::PopulationOverflow {
                        entity: record.entity_name.clone(),
                    })?;
            }
            entity_totals.len()
        };

        let info = DatasetInfo {
            source,
            record_count: records.len(),
            entity_count,
            loaded_at: Utc::now(),
        };

        Ok(CensusStore { records, info })
    }

    pub fn info(&self) -> &DatasetInfo {
        &self.info
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Distinct entity names, sorted
    pub fn list_entities(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.entity_name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Sum of POBTOT over every row of the entity; None when the entity is unknown
    pub fn total_population(&self, entity: &str) -> Option<u64> {
        let mut rows = self.entity_rows(entity).peekable();
        rows.peek()?;
        Some(rows.map(|r| r.total_population).sum())
    }

    /// Distinct municipality names of the entity, sorted; empty for an unknown entity
    pub fn list_municipalities(&self, entity: &str) -> Vec<String> {
        self.entity_rows(entity)
            .map(|r| r.municipality_name.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Sum of POBTOT over every row (locality) of the municipality
    pub fn municipality_population(&self, entity: &str, municipality: &str) -> Result<u64> {
        let mut rows = self
            .entity_rows(entity)
            .filter(|r| r.municipality_name == municipality)
            .peekable();

        if rows.peek().is_none() {
            return Err(CensusError::municipality_not_found(entity, municipality));
        }

        Ok(rows.map(|r| r.total_population).sum())
    }

    fn entity_rows<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a RegionRecord> + 'a {
        self.records.iter().filter(move |r| r.entity_name == entity)
    }
}
