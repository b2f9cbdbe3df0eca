// Census Query - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod error;
pub mod config;
pub mod dataset;
pub mod aggregator;
pub mod synthesizer;
pub mod chart;
pub mod query;
pub mod metadata;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use error::{CensusError, Result};
pub use config::AppConfig;
pub use dataset::{load_csv, load_from_reader, RegionRecord, REQUIRED_COLUMNS};
pub use aggregator::{CensusStore, DatasetInfo};
pub use synthesizer::{synthesize, triangular_weights, AgeBucket};
pub use chart::{build_bar_chart, BarChart, ChartPoint, ChartType};
pub use query::{
    EntityPopulation, MunicipalityAgeTable, Query, QueryEngine, QueryResponse,
    CENSUS_YEAR, DEFAULT_MAX_AGE_SPAN,
};
pub use metadata::{ExifDecoder, GpsPosition, ImageMetadata, MetadataDecoder};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
