// ⚠️ Error Taxonomy
// Every failure is a deterministic function of its inputs - nothing here is retried.
//
//   Schema        → fatal, startup only (dataset is missing a required column)
//   NotFound      → recoverable, reported to the caller
//   InvalidRange  → recoverable, reported to the caller (age_max < age_min)
//   TooLarge      → recoverable, the age range exceeds the configured table size
//   Decode        → image bytes carry no readable metadata

use thiserror::Error;

/// Result type alias for census operations
pub type Result<T> = std::result::Result<T, CensusError>;

#[derive(Error, Debug)]
pub enum CensusError {
    /// Dataset header lacks one of the required columns
    #[error("dataset is missing required column: {column}")]
    Schema { column: String },

    /// Unknown entity, or unknown municipality within an entity
    #[error("{}", not_found_message(entity, municipality.as_deref()))]
    NotFound {
        entity: String,
        municipality: Option<String>,
    },

    /// Age range is empty (age_max < age_min)
    #[error("invalid age range {age_min}..={age_max}: {reason}")]
    InvalidRange {
        age_min: i32,
        age_max: i32,
        reason: String,
    },

    /// Age range is valid but covers more ages than the server will tabulate
    #[error("age range {age_min}..={age_max} covers {span} ages, limit is {limit}")]
    TooLarge {
        age_min: i32,
        age_max: i32,
        span: i64,
        limit: u32,
    },

    /// Summed POBTOT of an entity does not fit in a u64
    #[error("population of entity {entity:?} overflows")]
    PopulationOverflow { entity: String },

    /// Image metadata could not be decoded
    #[error("could not decode image metadata: {0}")]
    Decode(String),

    /// Malformed value in the dataset
    #[error("line {line}: invalid {column} value {value:?}")]
    Parse {
        line: u64,
        column: String,
        value: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

fn not_found_message(entity: &str, municipality: Option<&str>) -> String {
    match municipality {
        Some(municipality) => format!(
            "municipality {:?} not found in entity {:?}",
            municipality, entity
        ),
        None => format!("entity {:?} not found", entity),
    }
}

impl CensusError {
    pub fn entity_not_found(entity: impl Into<String>) -> Self {
        CensusError::NotFound {
            entity: entity.into(),
            municipality: None,
        }
    }

    pub fn municipality_not_found(entity: impl Into<String>, municipality: impl Into<String>) -> Self {
        CensusError::NotFound {
            entity: entity.into(),
            municipality: Some(municipality.into()),
        }
    }

    pub fn invalid_range(age_min: i32, age_max: i32, reason: impl Into<String>) -> Self {
        CensusError::InvalidRange {
            age_min,
            age_max,
            reason: reason.into(),
        }
    }

    /// Errors the caller can fix by changing the request
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CensusError::NotFound { .. }
                | CensusError::InvalidRange { .. }
                | CensusError::TooLarge { .. }
        )
    }

    /// Short machine-readable code used by the HTTP layer
    pub fn code(&self) -> &'static str {
        match self {
            CensusError::Schema { .. } => "schema_error",
            CensusError::NotFound { .. } => "not_found",
            CensusError::InvalidRange { .. } => "invalid_range",
            CensusError::TooLarge { .. } => "range_too_large",
            CensusError::PopulationOverflow { .. } => "population_overflow",
            CensusError::Decode(_) => "decode_error",
            CensusError::Parse { .. } => "parse_error",
            CensusError::Io(_) => "io_error",
            CensusError::Csv(_) => "csv_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_messages_name_the_region() {
        let err = CensusError::entity_not_found("Atlantis");
        assert_eq!(err.to_string(), "entity \"Atlantis\" not found");

        let err = CensusError::municipality_not_found("Puebla", "Gotham");
        assert_eq!(
            err.to_string(),
            "municipality \"Gotham\" not found in entity \"Puebla\""
        );
    }

    #[test]
    fn test_invalid_range_message() {
        let err = CensusError::invalid_range(10, 5, "age_max is below age_min");
        assert_eq!(
            err.to_string(),
            "invalid age range 10..=5: age_max is below age_min"
        );
        assert_eq!(err.code(), "invalid_range");
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(CensusError::entity_not_found("X").is_recoverable());
        assert!(CensusError::invalid_range(1, 0, "empty").is_recoverable());
        assert!(!CensusError::Schema { column: "POBTOT".into() }.is_recoverable());
        assert!(!CensusError::Decode("no exif".into()).is_recoverable());
        assert!(!CensusError::PopulationOverflow { entity: "A".into() }.is_recoverable());
    }
}
