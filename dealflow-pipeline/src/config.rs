//! Pipeline configuration loaded with Figment.
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. User config: `<config dir>/dealflow/pipeline.{toml,yaml,json}`
//! 3. Project config: `<project>/.dealflow/pipeline.{toml,yaml,json}`
//! 4. Environment variables prefixed `DEALFLOW_` (e.g. `DEALFLOW_REMOTE_TIMEOUT_MS`)

use crate::defaults::{default_stages, DEFAULT_EVENT_CAPACITY};
use crate::error::{PipelineError, Result};
use crate::types::StageDef;
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, trace};

/// Directory under the user config dir
pub const USER_CONFIG_DIR_NAME: &str = "dealflow";
/// Directory under a project root
pub const PROJECT_CONFIG_DIR_NAME: &str = ".dealflow";
const CONFIG_FILE_STEM: &str = "pipeline";
const ENV_PREFIX: &str = "DEALFLOW_";

/// Everything the engine needs to know that is not runtime data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Stage sequence, in pipeline order
    #[serde(default = "default_stages")]
    pub stages: Vec<StageDef>,

    /// Deadline for one remote stage update. Unset means the remote client's
    /// own timeout applies.
    #[serde(default)]
    pub remote_timeout_ms: Option<u64>,

    /// Capacity of the board event channel
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_event_capacity() -> usize {
    DEFAULT_EVENT_CAPACITY
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: default_stages(),
            remote_timeout_ms: None,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl PipelineConfig {
    /// Load configuration for a project from every source
    pub fn load(project_dir: impl AsRef<Path>) -> Result<Self> {
        let user_dir = dirs::config_dir().map(|dir| dir.join(USER_CONFIG_DIR_NAME));
        Self::from_figment(Self::figment(user_dir.as_deref(), project_dir.as_ref()))
    }

    /// Build the layered figment without extracting it
    pub fn figment(user_config_dir: Option<&Path>, project_dir: &Path) -> Figment {
        debug!("Building pipeline configuration");

        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dir) = user_config_dir {
            figment = merge_config_files(figment, dir);
        }
        figment = merge_config_files(figment, &project_dir.join(PROJECT_CONFIG_DIR_NAME));
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Extract and validate a configuration
    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        debug!(
            stages = config.stages.len(),
            remote_timeout_ms = ?config.remote_timeout_ms,
            "Loaded pipeline configuration"
        );
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(PipelineError::invalid_config("at least one stage is required"));
        }
        let mut seen = HashSet::new();
        for stage in &self.stages {
            if stage.id.as_str().trim().is_empty() {
                return Err(PipelineError::invalid_config("stage id must not be empty"));
            }
            if !seen.insert(&stage.id) {
                return Err(PipelineError::duplicate_id("stage", stage.id.as_str()));
            }
        }
        if self.event_capacity == 0 {
            return Err(PipelineError::invalid_config("event_capacity must be positive"));
        }
        Ok(())
    }

    pub fn remote_timeout(&self) -> Option<Duration> {
        self.remote_timeout_ms.map(Duration::from_millis)
    }
}

fn merge_config_files(figment: Figment, dir: &Path) -> Figment {
    trace!("Looking for pipeline config in {}", dir.display());
    figment
        .merge(Toml::file(dir.join(format!("{CONFIG_FILE_STEM}.toml"))))
        .merge(Yaml::file(dir.join(format!("{CONFIG_FILE_STEM}.yaml"))))
        .merge(Json::file(dir.join(format!("{CONFIG_FILE_STEM}.json"))))
}
