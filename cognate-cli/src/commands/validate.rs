//! Validate command implementation

use super::RunContext;
use crate::config::CliConfig;
use crate::error::CliError;
use crate::project::ProjectFile;
use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the validate command
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Project file to check
    #[arg(short, long, value_name = "FILE")]
    pub project: Option<PathBuf>,

    /// Configuration file to check
    #[arg(long = "config-file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,
}

impl ValidateArgs {
    /// Execute the validate command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        if self.project.is_none() && self.config_file.is_none() {
            bail!("nothing to validate, pass --project or --config-file");
        }

        if let Some(path) = &self.config_file {
            println!("Validating configuration: {}", path.display());
            match CliConfig::load(Some(path)) {
                Ok(config) => {
                    println!("✓ Configuration is valid!");
                    println!("  Threshold: {}", config.tabulation.threshold);
                    println!("  Output format: {}", config.output.default_format);
                }
                Err(e) => {
                    println!("✗ Configuration is invalid!");
                    println!("  Error: {e:#}");
                    return Err(anyhow::anyhow!("Validation failed: {:#}", e));
                }
            }
        }

        if let Some(path) = &self.project {
            println!("Validating project: {}", path.display());
            let project = ProjectFile::open(path, context.config.engine_config()?)?;
            let problems = project.workbench().check_invariants();
            if problems.is_empty() {
                let totals = project.workbench().summary().totals;
                println!("✓ Project is valid!");
                println!(
                    "  {} protosegments, {} clusters, {} sets, {} citations",
                    totals.protosegments, totals.clusters, totals.sets, totals.citations
                );
            } else {
                println!("✗ Project is invalid!");
                for problem in &problems {
                    println!("  - {problem}");
                }
                return Err(CliError::InvalidProject(problems.len()).into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_validate_args_debug() {
        let args = ValidateArgs {
            project: Some(PathBuf::from("project.json")),
            config_file: None,
        };
        let debug_str = format!("{:?}", args);
        assert!(debug_str.contains("ValidateArgs"));
        assert!(debug_str.contains("project.json"));
    }

    #[test]
    fn test_validate_requires_a_target() {
        let args = ValidateArgs {
            project: None,
            config_file: None,
        };
        assert!(args.execute(&RunContext::default()).is_err());
    }

    #[test]
    fn test_validate_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", CliConfig::template()).unwrap();
        let args = ValidateArgs {
            project: None,
            config_file: Some(file.path().to_path_buf()),
        };
        assert!(args.execute(&RunContext::default()).is_ok());
    }

    #[test]
    fn test_validate_invalid_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[tabulation]\nchoice_policy = \"random\"\n").unwrap();
        let args = ValidateArgs {
            project: None,
            config_file: Some(file.path().to_path_buf()),
        };
        let err = args.execute(&RunContext::default()).unwrap_err();
        assert!(err.to_string().contains("Validation failed"));
    }
}
