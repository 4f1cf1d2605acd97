//! Workbench configuration
//!
//! Loaded from TOML; every section and key is optional.
//!
//! ```toml
//! [analysis]
//! init_timeout_secs = 120
//! run_timeout_secs = 300
//!
//! [engine]
//! program = "Rscript"
//! args = ["engine/serve.R"]
//!
//! [export]
//! excluded_columns = ["authors"]
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkbenchConfig {
    /// Orchestrator limits
    pub analysis: AnalysisConfig,
    /// Engine process
    pub engine: EngineConfig,
    /// CSV export
    pub export: ExportConfig,
}

impl WorkbenchConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    ///
    /// # Errors
    /// `ConfigError::Parse` for bad TOML, `ConfigError::Invalid` for
    /// out-of-range values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    ///
    /// # Errors
    /// `ConfigError::Io` if unreadable, otherwise as [`from_toml_str`](Self::from_toml_str)
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io_error(path, e))?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// With analysis limits
    #[inline]
    #[must_use]
    pub fn with_analysis(mut self, analysis: AnalysisConfig) -> Self {
        self.analysis = analysis;
        self
    }

    /// With engine settings
    #[inline]
    #[must_use]
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// With export settings
    #[inline]
    #[must_use]
    pub fn with_export(mut self, export: ExportConfig) -> Self {
        self.export = export;
        self
    }

    /// Check value ranges
    ///
    /// # Errors
    /// `ConfigError::Invalid` for zero timeouts or an empty program name
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.init_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "analysis.init_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.analysis.run_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "analysis.run_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.engine.program.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "engine.program",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

/// Orchestrator limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Limit on engine boot, in seconds
    pub init_timeout_secs: u64,
    /// Limit on one evaluation, in seconds
    pub run_timeout_secs: u64,
}

impl AnalysisConfig {
    /// With boot limit
    #[inline]
    #[must_use]
    pub fn with_init_timeout_secs(mut self, secs: u64) -> Self {
        self.init_timeout_secs = secs;
        self
    }

    /// With evaluation limit
    #[inline]
    #[must_use]
    pub fn with_run_timeout_secs(mut self, secs: u64) -> Self {
        self.run_timeout_secs = secs;
        self
    }

    /// Boot limit as a duration
    #[inline]
    #[must_use]
    pub fn init_timeout(&self) -> Duration {
        Duration::from_secs(self.init_timeout_secs)
    }

    /// Evaluation limit as a duration
    #[inline]
    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            init_timeout_secs: 120,
            run_timeout_secs: 300,
        }
    }
}

/// Engine process settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Program to launch
    pub program: String,
    /// Program arguments
    pub args: Vec<String>,
    /// Working directory for the child
    pub working_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Engine launched as `program`
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    /// With an extra argument
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// With a working directory
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: "Rscript".to_string(),
            args: Vec::new(),
            working_dir: None,
        }
    }
}

/// CSV export settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Columns dropped from every export
    pub excluded_columns: Vec<String>,
}
