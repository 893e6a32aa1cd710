//! Evaluator configuration (`[evaluator]` in cwalk.toml)

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Default recursion limit for user function calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 256;

/// Default name of the function invoked after the top level has run.
pub const DEFAULT_ENTRY_POINT: &str = "main";

/// How variable initializers are evaluated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Initializers run when the declaration executes.
    #[default]
    Strict,
    /// Initializers become thunks forced on first read.
    Lazy,
}

impl FromStr for Strategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "strict" => Ok(Strategy::Strict),
            "lazy" => Ok(Strategy::Lazy),
            other => Err(ConfigError::InvalidValue {
                field: "evaluator.strategy".to_string(),
                reason: format!("expected \"strict\" or \"lazy\", found \"{other}\""),
            }),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Strict => write!(f, "strict"),
            Strategy::Lazy => write!(f, "lazy"),
        }
    }
}

/// Project configuration as written in cwalk.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Evaluator settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluator: Option<EvaluatorSection>,
}

/// The `[evaluator]` table. Every field is optional; missing fields fall
/// back to [`EvaluatorConfig::default`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct EvaluatorSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_call_depth: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,

    /// Function called after the top level; an empty string disables it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_point: Option<String>,
}

/// Fully resolved evaluator settings consumed by the runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluatorConfig {
    pub strategy: Strategy,
    pub max_call_depth: usize,
    /// Upper bound on suspension points per evaluation (`None` = unbounded).
    pub max_steps: Option<u64>,
    pub entry_point: Option<String>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Strict,
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_steps: None,
            entry_point: Some(DEFAULT_ENTRY_POINT.to_string()),
        }
    }
}

impl EvaluatorConfig {
    /// Builder-style strategy override, mostly for tests and embedders.
    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    pub fn without_entry_point(mut self) -> Self {
        self.entry_point = None;
        self
    }

    /// Overlay a parsed `[evaluator]` table on top of these settings.
    pub fn merge(mut self, section: &EvaluatorSection) -> Self {
        if let Some(strategy) = section.strategy {
            self.strategy = strategy;
        }
        if let Some(depth) = section.max_call_depth {
            self.max_call_depth = depth;
        }
        if let Some(steps) = section.max_steps {
            self.max_steps = Some(steps);
        }
        if let Some(entry) = &section.entry_point {
            self.entry_point = if entry.is_empty() {
                None
            } else {
                Some(entry.clone())
            };
        }
        self
    }

    /// Validate resolved settings
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_call_depth == 0 {
            return Err(ConfigError::InvalidValue {
                field: "evaluator.max_call_depth".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_steps == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "evaluator.max_steps".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl ProjectConfig {
    /// Load project configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        Self::parse(&content).map_err(|e| match e {
            ConfigError::TomlParseError { error, .. } => ConfigError::TomlParseError {
                file: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|error| ConfigError::TomlParseError {
            file: "<string>".into(),
            error,
        })
    }

    /// Resolve the `[evaluator]` table against the defaults
    pub fn evaluator(&self) -> EvaluatorConfig {
        match &self.evaluator {
            Some(section) => EvaluatorConfig::default().merge(section),
            None => EvaluatorConfig::default(),
        }
    }
}
