//! Configuration management for Tierlimit.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::{Result, TierlimitError};
use crate::ratelimit::Limits;

/// Prefix for environment variable overrides, e.g. `TIERLIMIT__RESERVE=4`.
const ENV_PREFIX: &str = "TIERLIMIT";

/// Limiter configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimiterConfig {
    /// Tokens added to each bucket per second
    #[serde(default = "default_rate")]
    pub rate: f64,

    /// Maximum tokens a bucket may hold
    #[serde(default = "default_capacity")]
    pub capacity: f64,

    /// Minimum token level for admitting low-priority requests
    #[serde(default)]
    pub reserve: f64,

    /// Number of independently locked partitions of the key space
    #[serde(default)]
    pub shards: Option<usize>,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            rate: default_rate(),
            capacity: default_capacity(),
            reserve: 0.0,
            shards: None,
        }
    }
}

fn default_rate() -> f64 {
    10.0
}

fn default_capacity() -> f64 {
    10.0
}

impl LimiterConfig {
    /// Load configuration from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading limiter configuration");

        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| TierlimitError::Config(format!("Failed to parse limiter config: {}", e)))
    }

    /// Load configuration from a YAML file with environment overrides.
    ///
    /// Variables prefixed with `TIERLIMIT__` take precedence over values in
    /// the file, e.g. `TIERLIMIT__CAPACITY=50`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading layered limiter configuration");

        let config = ::config::Config::builder()
            .add_source(::config::File::from(path).format(::config::FileFormat::Yaml))
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Get the effective limits, with the reserve clamped to capacity.
    pub fn limits(&self) -> Limits {
        Limits::new(self.rate, self.capacity, self.reserve)
    }
}
