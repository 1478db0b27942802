//! `ngramdb` Configuration Module
//!
//! Provides configuration file support via `ngramdb.toml`, environment variables,
//! and runtime overrides.
//!
//! # Priority (highest to lowest)
//!
//! 1. Runtime overrides (CLI flags)
//! 2. Environment variables (`NGRAMDB_<SECTION>__<KEY>`, e.g. `NGRAMDB_PIPELINE__WORKERS`)
//! 3. Configuration file (`ngramdb.toml`)
//! 4. Default values

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::edge_map::DEFAULT_LINEAR_EDGE_LIMIT;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to parse configuration.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Invalid configuration value.
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue {
        /// Configuration key that failed validation.
        key: String,
        /// Validation error message.
        message: String,
    },
}

/// What a repeated Add of an identical pattern text does to the terminal node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Every Add attaches its own temporal record; a Delete closes the oldest
    /// record still open (default).
    #[default]
    Independent,
    /// A node keeps a single open record; a later Add closes it at its own
    /// timestamp and opens a new one. Closed windows are kept.
    Overwrite,
}

/// Token dictionary configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Number of hash buckets. Must be a power of two; fixed for the process lifetime.
    pub bucket_count: usize,
    /// Maximum number of distinct tokens. Exceeding it is fatal.
    pub max_tokens: usize,
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            bucket_count: 1 << 16,
            max_tokens: 1 << 24,
        }
    }
}

/// Pattern automaton configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutomatonConfig {
    /// Maximum number of trie nodes, root included. Exceeding it is fatal.
    pub max_nodes: usize,
    /// Fan-out above which a node's edges move from a linear array to a hash map.
    pub linear_edge_limit: usize,
    /// Duplicate pattern handling.
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for AutomatonConfig {
    fn default() -> Self {
        Self {
            max_nodes: 1 << 24,
            linear_edge_limit: DEFAULT_LINEAR_EDGE_LIMIT,
            duplicate_policy: DuplicatePolicy::Independent,
        }
    }
}

/// Batch pipeline configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Number of matching worker threads (0 = available parallelism).
    pub workers: usize,
    /// Number of buffered queries handed to a worker as one job.
    pub queries_per_job: usize,
    /// Buffer adds until the next flush instead of applying them on arrival.
    pub defer_adds: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: 0, // Auto
            queries_per_job: 1,
            defer_adds: false,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace.
    pub level: String,
    /// Log format: text or json.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
        }
    }
}

/// Main `ngramdb` configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NgramConfig {
    /// Token dictionary configuration.
    pub dictionary: DictionaryConfig,
    /// Pattern automaton configuration.
    pub automaton: AutomatonConfig,
    /// Batch pipeline configuration.
    pub pipeline: PipelineConfig,
    /// Logging configuration.
    pub logging: LoggingConfig,
}

impl NgramConfig {
    /// Loads configuration from `path` (usually `ngramdb.toml`).
    ///
    /// Priority: defaults < file < environment variables. A missing file is
    /// not an error: defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration parsing fails.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("NGRAMDB_").split("__"));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Creates a configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Toml::string(toml_str));

        figment
            .extract()
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Compact configuration for tests, examples and small corpora.
    #[must_use]
    pub fn small() -> Self {
        Self {
            dictionary: DictionaryConfig {
                bucket_count: 1 << 10,
                max_tokens: 1 << 16,
            },
            automaton: AutomatonConfig {
                max_nodes: 1 << 16,
                ..AutomatonConfig::default()
            },
            pipeline: PipelineConfig {
                workers: 2,
                ..PipelineConfig::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let buckets = self.dictionary.bucket_count;
        if buckets == 0 || !buckets.is_power_of_two() {
            return Err(ConfigError::InvalidValue {
                key: "dictionary.bucket_count".to_string(),
                message: format!("value {buckets} must be a non-zero power of two"),
            });
        }

        if self.dictionary.max_tokens == 0 || self.dictionary.max_tokens > u32::MAX as usize {
            return Err(ConfigError::InvalidValue {
                key: "dictionary.max_tokens".to_string(),
                message: format!(
                    "value {} is out of range [1, {}]",
                    self.dictionary.max_tokens,
                    u32::MAX
                ),
            });
        }

        // The root occupies one slot, so a usable automaton needs at least two.
        if self.automaton.max_nodes < 2 || self.automaton.max_nodes > u32::MAX as usize {
            return Err(ConfigError::InvalidValue {
                key: "automaton.max_nodes".to_string(),
                message: format!(
                    "value {} is out of range [2, {}]",
                    self.automaton.max_nodes,
                    u32::MAX
                ),
            });
        }

        if self.automaton.linear_edge_limit == 0 {
            return Err(ConfigError::InvalidValue {
                key: "automaton.linear_edge_limit".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        if self.pipeline.queries_per_job == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pipeline.queries_per_job".to_string(),
                message: "value must be >= 1".to_string(),
            });
        }

        let valid_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.level".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.level, valid_levels
                ),
            });
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::InvalidValue {
                key: "logging.format".to_string(),
                message: format!(
                    "value '{}' is invalid, expected one of: {:?}",
                    self.logging.format, valid_formats
                ),
            });
        }

        Ok(())
    }

    /// Returns the number of matching workers to spawn.
    ///
    /// Resolves `workers = 0` to the machine's available parallelism.
    #[must_use]
    pub fn effective_workers(&self) -> usize {
        if self.pipeline.workers > 0 {
            return self.pipeline.workers;
        }
        std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
    }

    /// Serializes the configuration to TOML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}
