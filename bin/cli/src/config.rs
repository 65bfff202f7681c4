//! CLI configuration.
//!
//! Composed from the engine's configuration and loaded via the `config`
//! crate: an optional file first, then `FLOWSMITH_*` environment variables
//! with `__` between nested keys (e.g. `FLOWSMITH_LAYOUT__NODE_WIDTH=200`).

use flowsmith_workflow::{ConnectionPolicy, DEFAULT_FILE_NAME, EngineConfig, LayoutConfig, SimulationConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI configuration composed from engine configs.
#[derive(Debug, Clone, Deserialize)]
pub struct CliConfig {
    /// Document used when `--file` is not given.
    #[serde(default = "default_document")]
    pub document: PathBuf,

    /// Layered layout settings.
    #[serde(default)]
    pub layout: LayoutConfig,

    /// Connection rules.
    #[serde(default)]
    pub connection: ConnectionPolicy,

    /// Validator and simulator settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
}

fn default_document() -> PathBuf {
    PathBuf::from(DEFAULT_FILE_NAME)
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            document: default_document(),
            layout: LayoutConfig::default(),
            connection: ConnectionPolicy::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl CliConfig {
    /// Loads configuration from an optional file and the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or a value is invalid.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(file) = file {
            builder = builder.add_source(config::File::from(file));
        }
        builder
            .add_source(
                config::Environment::with_prefix("FLOWSMITH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the engine's share of the configuration.
    #[must_use]
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            layout: self.layout.clone(),
            connection: self.connection.clone(),
            simulation: self.simulation.clone(),
        }
    }
}
