//! Configuration system for the researcher.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! project config file -> environment. Configuration is loaded from
//! `~/.config/researcher/config.toml` and/or `.researcher/config.toml` in the
//! target project directory. Environment overrides use the `RESEARCHER_`
//! prefix with `__` as the nesting separator (e.g.
//! `RESEARCHER_POLLING__INTERVAL_SECS=10`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Top-level configuration for the researcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearcherConfig {
    pub models: ModelsConfig,
    pub polling: PollingConfig,
    pub project: ProjectConfig,
}

/// Model identifiers for each call the pipeline makes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// OpenAI deep research model (Responses API, background mode).
    pub openai_deep_research: String,
    /// Gemini deep research agent (Interactions API).
    pub gemini_deep_research: String,
    /// Model for the cross-provider synthesis call.
    pub synthesis: String,
    /// Model for research query generation.
    pub query_generation: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            openai_deep_research: "o3-deep-research".to_string(),
            gemini_deep_research: "deep-research-pro-preview".to_string(),
            synthesis: "gpt-4o".to_string(),
            query_generation: "gpt-4o".to_string(),
        }
    }
}

/// Polling cadence and bound for background research jobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Seconds between status polls.
    pub interval_secs: u64,
    /// Maximum seconds a single provider job may keep polling before it is
    /// failed. Deep research jobs regularly run for tens of minutes.
    pub max_duration_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            max_duration_secs: 7200,
        }
    }
}

/// Target project layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project root override. Auto-detected when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
    /// Playgrounds directory, relative to the project root.
    pub playgrounds_dir: String,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            root: None,
            playgrounds_dir: "app/playgrounds".to_string(),
        }
    }
}

/// Path to the user-level configuration file, if a home directory exists.
pub fn user_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "researcher", "researcher")
        .map(|d| d.config_dir().join("config.toml"))
}

/// Path to the project-level configuration file.
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".researcher").join("config.toml")
}

/// Check whether any researcher configuration file exists.
pub fn config_exists(project_root: Option<&Path>) -> bool {
    if let Some(path) = user_config_path()
        && path.exists()
    {
        return true;
    }
    if let Some(root) = project_root
        && project_config_path(root).exists()
    {
        return true;
    }
    false
}

/// Load configuration with the standard layering.
///
/// Later layers win: defaults, then the user config file, then the project
/// config file, then `RESEARCHER_`-prefixed environment variables, then any
/// explicit overrides.
pub fn load_config(
    project_root: Option<&Path>,
    overrides: Option<&ResearcherConfig>,
) -> Result<ResearcherConfig, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(ResearcherConfig::default()));

    if let Some(user_config) = user_config_path()
        && user_config.exists()
    {
        figment = figment.merge(Toml::file(&user_config));
    }

    if let Some(root) = project_root {
        let project_config = project_config_path(root);
        if project_config.exists() {
            figment = figment.merge(Toml::file(&project_config));
        }
    }

    figment = figment.merge(Env::prefixed("RESEARCHER_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: ResearcherConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ResearcherConfig) -> Result<(), ConfigError> {
    if config.polling.interval_secs == 0 {
        return Err(ConfigError::Invalid {
            message: "polling.interval_secs must be at least 1".to_string(),
        });
    }
    if config.polling.max_duration_secs < config.polling.interval_secs {
        return Err(ConfigError::Invalid {
            message: format!(
                "polling.max_duration_secs ({}) is shorter than polling.interval_secs ({})",
                config.polling.max_duration_secs, config.polling.interval_secs
            ),
        });
    }
    Ok(())
}
