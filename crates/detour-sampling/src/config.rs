//! Sampling configuration loaded from JSON
//!
//! ```json
//! { "seed": 7, "count": 100, "filter": { "include_flags": 1, "exclude_flags": 16 } }
//! ```
//!
//! Missing fields take their defaults.

use std::path::Path;

use detour::{PolyFlags, QueryFilter};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Polygon flag filter as raw bit masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// A polygon needs at least one of these flags
    pub include_flags: u16,
    /// A polygon with any of these flags is rejected
    pub exclude_flags: u16,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            include_flags: 0xffff,
            exclude_flags: 0,
        }
    }
}

impl FilterConfig {
    /// Rejects filters that can never pass a polygon
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.include_flags == 0 {
            return Err(ConfigError::invalid("include_flags is empty"));
        }

        if self.include_flags & !self.exclude_flags == 0 {
            return Err(ConfigError::invalid(format!(
                "exclude_flags {:#06x} cover every include flag {:#06x}",
                self.exclude_flags, self.include_flags
            )));
        }

        Ok(())
    }

    pub fn to_query_filter(&self) -> QueryFilter {
        QueryFilter::new(
            PolyFlags::from_bits_retain(self.include_flags),
            PolyFlags::from_bits_retain(self.exclude_flags),
        )
    }
}

impl From<&FilterConfig> for QueryFilter {
    fn from(config: &FilterConfig) -> Self {
        config.to_query_filter()
    }
}

/// Settings for a batch of random point samples
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Seed of the random number generator
    pub seed: u64,
    /// Number of points to sample
    pub count: usize,
    /// Polygon filter
    pub filter: FilterConfig,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            count: 1,
            filter: FilterConfig::default(),
        }
    }
}

impl SampleConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::invalid("count must be at least 1"));
        }
        self.filter.validate()
    }

    /// Parses and validates a configuration from a JSON string
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: SampleConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a configuration from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        log::debug!("Loaded sample configuration from {}", path.as_ref().display());
        Self::from_json_str(&json)
    }
}
