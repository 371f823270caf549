//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/heritage/heritage.toml`
//! 3. Local config: `<dir>/.heritage.toml`
//! 4. Environment variables: `HERITAGE_*` prefix
//!
//! Command line flags are applied on top by the CLI.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::application::ApplicationError;
use crate::domain::{expand_env_vars, AgentId, ChildSlotPolicy};

/// Ledger file used when nothing else is configured.
pub const DEFAULT_DATABASE: &str = "out.sqlite";

/// Raw settings for intermediate parsing (None → not specified, inherit).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub database: Option<PathBuf>,
    pub agent: Option<AgentId>,
    pub slot_policy: Option<ChildSlotPolicy>,
    pub create_indexes: Option<bool>,
}

/// Unified configuration for heritage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Simulation output database holding the ledger
    pub database: PathBuf,
    /// Participant for bounded-agent trees; None builds the whole population
    pub agent: Option<AgentId>,
    /// Assignment of discovered children to left/right slots
    pub slot_policy: ChildSlotPolicy,
    /// Create parent/transfer lookup indexes before building
    pub create_indexes: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: PathBuf::from(DEFAULT_DATABASE),
            agent: None,
            slot_policy: ChildSlotPolicy::default(),
            create_indexes: true,
        }
    }
}

/// Get the XDG config directory for heritage.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "heritage").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("heritage.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".heritage.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        let expanded = expand_env_vars(self.database.to_string_lossy().as_ref());
        self.database = PathBuf::from(expanded);
    }

    /// Overlay wins where it specifies a value.
    pub fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            database: overlay
                .database
                .clone()
                .unwrap_or_else(|| self.database.clone()),
            agent: overlay.agent.or(self.agent),
            slot_policy: overlay.slot_policy.unwrap_or(self.slot_policy),
            create_indexes: overlay.create_indexes.unwrap_or(self.create_indexes),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local_dir` - Optional directory holding a `.heritage.toml`
    pub fn load(local_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                let raw = load_raw_settings(&global_path)?;
                current = current.merge_with(&raw);
            }
        }

        if let Some(dir) = local_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply HERITAGE_* environment variables as explicit overrides.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        // Use config crate just for env var parsing
        let config = Config::builder()
            .add_source(Environment::with_prefix("HERITAGE").separator("__"))
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("database") {
            settings.database = PathBuf::from(val);
        }
        if let Ok(val) = config.get_int("agent") {
            settings.agent = Some(val);
        }
        if let Ok(val) = config.get_string("slot_policy") {
            settings.slot_policy = val
                .parse()
                .map_err(|message| ApplicationError::Config { message })?;
        }
        if let Ok(val) = config.get_bool("create_indexes") {
            settings.create_indexes = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# heritage configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/heritage/heritage.toml
#   Local:  ./.heritage.toml
#   Env:    HERITAGE_* environment variables (explicit overrides)

# Simulation output database
# database = "out.sqlite"

# Build trees for one participant instead of the whole population
# agent = 5

# Child slot assignment: "discovery-order" or "parent-field"
# slot_policy = "discovery-order"

# Create lookup indexes on the ledger before building
# create_indexes = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
