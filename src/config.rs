// ⚙️ Configuration - defaults overridden by environment variables
//
//   CENSUS_DATA          path to the census CSV        (default: censo.csv)
//   CENSUS_BIND          server listen address         (default: 0.0.0.0:5000)
//   CENSUS_MAX_AGE_SPAN  most ages one table may cover (default: 10000)

use crate::query::DEFAULT_MAX_AGE_SPAN;
use anyhow::{Context, Result};
use std::path::PathBuf;

pub const ENV_DATA: &str = "CENSUS_DATA";
pub const ENV_BIND: &str = "CENSUS_BIND";
pub const ENV_MAX_AGE_SPAN: &str = "CENSUS_MAX_AGE_SPAN";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub data_path: PathBuf,
    pub bind_addr: String,
    pub max_age_span: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("censo.csv"),
            bind_addr: "0.0.0.0:5000".to_string(),
            max_age_span: DEFAULT_MAX_AGE_SPAN,
        }
    }
}

impl AppConfig {
    /// Defaults, overridden by whatever is set in the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` but with an injectable variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = lookup(ENV_DATA) {
            config.data_path = PathBuf::from(path);
        }

        if let Some(addr) = lookup(ENV_BIND) {
            config.bind_addr = addr;
        }

        if let Some(span) = lookup(ENV_MAX_AGE_SPAN) {
            config.max_age_span = span
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer, got {:?}", ENV_MAX_AGE_SPAN, span))?;
            anyhow::ensure!(config.max_age_span > 0, "{} must be greater than zero", ENV_MAX_AGE_SPAN);
        }

        Ok(config)
    }
}
