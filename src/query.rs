// 🔎 Query Dispatcher - the request surface shared by the API, CLI and TUI
//
//   {"type": "entity", "entity": ...}
//   {"type": "municipality", "entity": ..., "municipality": ..., "ageMin": ..., "ageMax": ...}
//
// Every outcome is explicit: Ok(response), Err(NotFound), Err(InvalidRange)
// or Err(TooLarge) when a valid range exceeds the configured table size.

use crate::aggregator::CensusStore;
use crate::chart::{build_bar_chart, BarChart};
use crate::error::{CensusError, Result};
use crate::synthesizer::{synthesize, AgeBucket};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Census round the dataset comes from
pub const CENSUS_YEAR: u16 = 2020;

/// Most ages a single table may cover when no limit is configured.
/// Far above any real age range; only bounds the allocation per request.
pub const DEFAULT_MAX_AGE_SPAN: u32 = 10_000;

// ============================================================================
// REQUESTS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Query {
    Entity {
        entity: String,
    },
    #[serde(rename_all = "camelCase")]
    Municipality {
        entity: String,
        municipality: String,
        age_min: i32,
        age_max: i32,
    },
}

// ============================================================================
// RESPONSES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPopulation {
    pub entity: String,
    pub total_population: u64,
    pub census_year: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityAgeTable {
    pub entity: String,
    pub municipality: String,
    pub age_range: (i32, i32),
    pub census_year: u16,
    pub table: Vec<AgeBucket>,
}

impl MunicipalityAgeTable {
    pub fn total_persons(&self) -> u64 {
        self.table.iter().map(|b| b.persons).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryResponse {
    Entity(EntityPopulation),
    Municipality(MunicipalityAgeTable),
}

// ============================================================================
// QUERY ENGINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct QueryEngine {
    store: Arc<CensusStore>,
    max_age_span: u32,
}

impl QueryEngine {
    pub fn new(store: Arc<CensusStore>) -> Self {
        Self::with_max_age_span(store, DEFAULT_MAX_AGE_SPAN)
    }

    pub fn with_max_age_span(store: Arc<CensusStore>, max_age_span: u32) -> Self {
        QueryEngine { store, max_age_span }
    }

    pub fn store(&self) -> &CensusStore {
        &self.store
    }

    pub fn entities(&self) -> Vec<String> {
        self.store.list_entities()
    }

    pub fn municipalities(&self, entity: &str) -> Vec<String> {
        self.store.list_municipalities(entity)
    }

    pub fn chart(&self, entity: &str) -> Option<BarChart> {
        build_bar_chart(&self.store, entity)
    }

    pub fn execute(&self, query: &Query) -> Result<QueryResponse> {
        let result = match query {
            Query::Entity { entity } => self.entity_population(entity).map(QueryResponse::Entity),
            Query::Municipality {
                entity,
                municipality,
                age_min,
                age_max,
            } => self
                .municipality_table(entity, municipality, *age_min, *age_max)
                .map(QueryResponse::Municipality),
        };

        if let Err(e) = &result {
            log::debug!("query {:?} failed: {}", query, e);
        }

        result
    }

    pub fn entity_population(&self, entity: &str) -> Result<EntityPopulation> {
        let total_population = self
            .store
            .total_population(entity)
            .ok_or_else(|| CensusError::entity_not_found(entity))?;

        Ok(EntityPopulation {
            entity: entity.to_string(),
            total_population,
            census_year: CENSUS_YEAR,
        })
    }

    /// Region lookup runs before range validation, so an unknown
    /// municipality is reported even when the range is also bad
    pub fn municipality_table(
        &self,
        entity: &str,
        municipality: &str,
        age_min: i32,
        age_max: i32,
    ) -> Result<MunicipalityAgeTable> {
        let total = self.store.municipality_population(entity, municipality)?;

        let span = i64::from(age_max) - i64::from(age_min) + 1;
        if span > i64::from(self.max_age_span) {
            return Err(CensusError::TooLarge {
                age_min,
                age_max,
                span,
                limit: self.max_age_span,
            });
        }

        let table = synthesize(total, age_min, age_max)?;

        Ok(MunicipalityAgeTable {
            entity: entity.to_string(),
            municipality: municipality.to_string(),
            age_range: (age_min, age_max),
            census_year: CENSUS_YEAR,
            table,
        })
    }
}
