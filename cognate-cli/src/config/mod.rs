//! Configuration module

use crate::error::CliError;
use crate::output::OutputFormat;
use anyhow::{Context, Result};
use cognate_engine::{ChoicePolicy, EngineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// CLI configuration structure
#[derive(Debug, Deserialize, Serialize, Default, PartialEq)]
pub struct CliConfig {
    /// Tabulation configuration
    #[serde(default)]
    pub tabulation: TabulationConfig,

    /// Output configuration
    #[serde(default)]
    pub output: OutputConfig,
}

/// Tabulation-related configuration
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TabulationConfig {
    /// Minimum number of attested reflexes per column
    pub threshold: usize,

    /// Policy for varieties with several alignments in one group
    pub choice_policy: ChoicePolicy,

    /// Minimum number of entries before previews run in parallel
    pub parallel_threshold: usize,
}

impl Default for TabulationConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            threshold: engine.threshold,
            choice_policy: engine.choice_policy,
            parallel_threshold: engine.parallel_threshold,
        }
    }
}

/// Output-related configuration
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format
    pub default_format: String,

    /// Pretty print JSON output
    pub pretty_json: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "text".to_string(),
            pretty_json: true,
        }
    }
}

impl CliConfig {
    /// Load a configuration file, or the defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: CliConfig =
            toml::from_str(content).map_err(|e| CliError::ConfigError(e.to_string()))?;
        config.engine_config()?;
        config.default_format()?;
        Ok(config)
    }

    /// Output format named by `[output] default_format`
    pub fn default_format(&self) -> Result<OutputFormat> {
        OutputFormat::from_name(&self.output.default_format).ok_or_else(|| {
            CliError::ConfigError(format!(
                "unknown output format {:?}",
                self.output.default_format
            ))
            .into()
        })
    }

    /// Engine configuration described by the `[tabulation]` section
    pub fn engine_config(&self) -> Result<EngineConfig> {
        EngineConfig::builder()
            .threshold(self.tabulation.threshold)
            .choice_policy(self.tabulation.choice_policy)
            .parallel_threshold(self.tabulation.parallel_threshold)
            .build()
            .map_err(|e| CliError::ConfigError(e.to_string()).into())
    }

    /// Commented TOML template with the default values
    pub fn template() -> String {
        let defaults = Self::default();
        format!(
            r#"# cognate configuration

[tabulation]
# Columns need at least this many attested reflexes to become patterns
threshold = {}

# "first-candidate" uses the first of several alignments and reports it
# "strict" skips the group instead
choice_policy = "first-candidate"

# Previews of at least this many entries run in parallel
parallel_threshold = {}

[output]
# One of "text", "json", "markdown"
default_format = "{}"
pretty_json = {}
"#,
            defaults.tabulation.threshold,
            defaults.tabulation.parallel_threshold,
            defaults.output.default_format,
            defaults.output.pretty_json,
        )
    }
}
