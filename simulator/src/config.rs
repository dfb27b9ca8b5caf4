use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

use crate::{Simulator, DEFAULT_FAULT_CAPACITY};

/// Simulator configuration (from a YAML file, overridable on the command line).
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Fixed seed for reproducible runs; fresh entropy when absent.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default = "default_fault_capacity")]
    pub fault_capacity: usize,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_fault_capacity() -> usize {
    DEFAULT_FAULT_CAPACITY.get()
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            seed: None,
            fault_capacity: default_fault_capacity(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub log_level: Level,
    pub seed: Option<u64>,
    pub fault_capacity: NonZeroUsize,
}

impl SimulatorConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<ValidatedConfig, ConfigError> {
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        let fault_capacity =
            NonZeroUsize::new(self.fault_capacity).ok_or(ConfigError::InvalidNonZero {
                field: "fault_capacity",
                value: self.fault_capacity,
            })?;
        Ok(ValidatedConfig {
            log_level,
            seed: self.seed,
            fault_capacity,
        })
    }
}

impl ValidatedConfig {
    /// Dice generator for this configuration.
    pub fn rng(&self) -> ChaCha20Rng {
        match self.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_entropy(),
        }
    }

    pub fn build(&self) -> Simulator<ChaCha20Rng> {
        Simulator::with_fault_capacity(self.rng(), self.fault_capacity)
    }
}
