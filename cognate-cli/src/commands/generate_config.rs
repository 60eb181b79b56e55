//! Generate config command implementation

use crate::config::CliConfig;
use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the generate-config command
#[derive(Debug, Args)]
pub struct GenerateConfigArgs {
    /// Output file path
    #[arg(short, long, value_name = "FILE", required = true)]
    pub output: PathBuf,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,
}

impl GenerateConfigArgs {
    /// Execute the generate-config command
    pub fn execute(&self) -> Result<()> {
        use std::fs;

        if self.output.exists() && !self.force {
            bail!(
                "{} already exists, pass --force to overwrite it",
                self.output.display()
            );
        }

        println!("Generating configuration template...");
        println!("  Output file: {}", self.output.display());

        fs::write(&self.output, CliConfig::template())
            .with_context(|| format!("Failed to write to {}", self.output.display()))?;

        println!("✓ Configuration template generated successfully!");
        println!();
        println!("Next steps:");
        println!("1. Edit the thresholds and output defaults");
        println!("2. Validate your configuration:");
        println!(
            "   cognate validate --config-file {}",
            self.output.display()
        );
        println!("3. Use it for tabulation:");
        println!(
            "   cognate --config {} tabulate -p project.json --view NAME --all",
            self.output.display()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_config_writes_template() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("cognate.toml");
        let args = GenerateConfigArgs {
            output: output.clone(),
            force: false,
        };
        args.execute().unwrap();
        let content = fs::read_to_string(&output).unwrap();
        assert!(content.contains("[tabulation]"));
        assert!(content.contains("[output]"));
        assert!(CliConfig::from_toml_str(&content).is_ok());
    }

    #[test]
    fn test_generate_config_keeps_existing_file() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("cognate.toml");
        fs::write(&output, "# mine").unwrap();
        let args = GenerateConfigArgs {
            output: output.clone(),
            force: false,
        };
        assert!(args.execute().is_err());
        assert_eq!(fs::read_to_string(&output).unwrap(), "# mine");
    }
}
