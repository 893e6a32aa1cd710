//! Configuration Loader
//!
//! Finds `cwalk.toml`, resolves it against the defaults and applies
//! environment overrides:
//! 1. Defaults - lowest priority
//! 2. Project config (./cwalk.toml) - overrides defaults
//! 3. Environment variables (CWALK_*) - overrides project

use crate::evaluator::{EvaluatorConfig, ProjectConfig, Strategy};
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the project configuration file
pub const CONFIG_FILE_NAME: &str = "cwalk.toml";

/// Configuration loader
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Skip `CWALK_*` overrides (used by tools that want file-only config)
    ignore_env: bool,
}

/// Merged configuration result
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration as parsed
    pub project: ProjectConfig,

    /// Effective evaluator settings
    pub evaluator: EvaluatorConfig,

    /// Directory where cwalk.toml was found
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Loader that does not consult environment variables
    pub fn without_env() -> Self {
        Self { ignore_env: true }
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find cwalk.toml. A missing file is not
    /// an error; defaults are used instead.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, project) = self.find_project_config(start_dir)?;
        self.resolve(project, project_root)
    }

    /// Load configuration from a specific config file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        let project = ProjectConfig::load_from_file(config_path)?;
        let project_root = config_path.parent().map(|p| p.to_path_buf());
        self.resolve(project, project_root)
    }

    fn resolve(&self, project: ProjectConfig, project_root: Option<PathBuf>) -> ConfigResult<Config> {
        let mut evaluator = project.evaluator();
        if !self.ignore_env {
            evaluator = apply_env_overrides(evaluator)?;
        }
        evaluator.validate()?;

        Ok(Config {
            project,
            evaluator,
            project_root,
        })
    }

    /// Find project configuration by walking up directory tree
    fn find_project_config(
        &self,
        start_dir: &Path,
    ) -> ConfigResult<(Option<PathBuf>, ProjectConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                let project = ProjectConfig::load_from_file(&config_path)?;
                return Ok((Some(current), project));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, ProjectConfig::default())),
            }
        }
    }
}

/// Apply environment variable overrides
///
/// Recognised: CWALK_STRATEGY, CWALK_MAX_CALL_DEPTH, CWALK_MAX_STEPS.
fn apply_env_overrides(mut config: EvaluatorConfig) -> ConfigResult<EvaluatorConfig> {
    if let Ok(strategy) = env::var("CWALK_STRATEGY") {
        config.strategy = strategy.parse::<Strategy>()?;
    }

    if let Ok(depth) = env::var("CWALK_MAX_CALL_DEPTH") {
        config.max_call_depth = parse_number("CWALK_MAX_CALL_DEPTH", &depth)?;
    }

    if let Ok(steps) = env::var("CWALK_MAX_STEPS") {
        config.max_steps = Some(parse_number("CWALK_MAX_STEPS", &steps)?);
    }

    Ok(config)
}

fn parse_number<T: std::str::FromStr>(field: &str, raw: &str) -> ConfigResult<T> {
    raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        reason: format!("expected a non-negative integer, found \"{raw}\""),
    })
}

impl Config {
    /// Returns true if a cwalk.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }
}
