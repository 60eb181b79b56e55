//! Configuration types for the engine

use crate::error::{EngineError, Result};
use cognate_core::{ChoicePolicy, ThresholdGrouper};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Engine configuration
///
/// Handed to a [`Workbench`](crate::Workbench) at construction; there is no
/// process-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Minimum number of attested reflexes for a column to become a pattern
    pub threshold: usize,
    /// What to do when a variety has several alignments in one group
    pub choice_policy: ChoicePolicy,
    /// Minimum number of entries before previews run in parallel
    pub parallel_threshold: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            choice_policy: ChoicePolicy::FirstCandidate,
            parallel_threshold: 64,
        }
    }
}

impl EngineConfig {
    /// Create a strict configuration that never guesses between alignments
    pub fn strict() -> Self {
        Self {
            choice_policy: ChoicePolicy::Strict,
            ..Self::default()
        }
    }

    /// Create an exploratory configuration that keeps singly attested columns
    pub fn exploratory() -> Self {
        Self {
            threshold: 1,
            ..Self::default()
        }
    }

    /// Create a balanced configuration
    pub fn balanced() -> Self {
        Self::default()
    }

    /// Create a builder
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)
            .map_err(|e| EngineError::ConfigError(format!("Failed to parse TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!(
                "Failed to read file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values no grouping run could use
    pub fn validate(&self) -> Result<()> {
        if self.parallel_threshold == 0 {
            return Err(EngineError::ConfigError(
                "parallel_threshold must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Grouper configured from these settings
    pub fn grouper(&self) -> ThresholdGrouper {
        ThresholdGrouper::new(self.threshold).with_policy(self.choice_policy)
    }
}

/// Configuration builder
#[derive(Debug, Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Set the attestation threshold
    pub fn threshold(mut self, threshold: usize) -> Self {
        self.config.threshold = threshold;
        self
    }

    /// Set the ambiguity policy
    pub fn choice_policy(mut self, policy: ChoicePolicy) -> Self {
        self.config.choice_policy = policy;
        self
    }

    /// Set the entry count above which previews run in parallel
    pub fn parallel_threshold(mut self, entries: usize) -> Self {
        self.config.parallel_threshold = entries;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.threshold, 2);
        assert_eq!(config.choice_policy, ChoicePolicy::FirstCandidate);
    }

    #[test]
    fn test_presets() {
        assert_eq!(EngineConfig::strict().choice_policy, ChoicePolicy::Strict);
        assert_eq!(EngineConfig::exploratory().threshold, 1);
        assert_eq!(EngineConfig::balanced(), EngineConfig::default());
    }

    #[test]
    fn test_builder() {
        let config = EngineConfig::builder()
            .threshold(3)
            .choice_policy(ChoicePolicy::Strict)
            .build()
            .unwrap();
        assert_eq!(config.threshold, 3);
        assert_eq!(config.grouper().threshold(), 3);
        assert_eq!(config.grouper().policy(), ChoicePolicy::Strict);
    }

    #[test]
    fn test_builder_rejects_zero_parallel_threshold() {
        let result = EngineConfig::builder().parallel_threshold(0).build();
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str("threshold = 3\n").unwrap();
        assert_eq!(config.threshold, 3);
        assert_eq!(config.choice_policy, ChoicePolicy::FirstCandidate);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "threshold = 1\nchoice_policy = \"strict\"\n").unwrap();
        let config = EngineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.threshold, 1);
        assert_eq!(config.choice_policy, ChoicePolicy::Strict);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = EngineConfig::from_file(Path::new("/nonexistent/cognate.toml"));
        assert!(matches!(result, Err(EngineError::ConfigError(_))));
    }
}
