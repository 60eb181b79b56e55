//! Init command implementation

use super::RunContext;
use crate::project::ProjectFile;
use crate::wordlist::Wordlist;
use anyhow::{bail, Result};
use clap::Args;
use std::path::PathBuf;

/// Arguments for the init command
#[derive(Debug, Args)]
pub struct InitArgs {
    /// Wordlist to build the project from (TOML or JSON)
    #[arg(short, long, value_name = "FILE", required = true)]
    pub wordlist: PathBuf,

    /// Project file to create
    #[arg(short, long, value_name = "FILE", required = true)]
    pub output: PathBuf,

    /// Overwrite an existing project file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        if self.output.exists() && !self.force {
            bail!(
                "{} already exists, pass --force to overwrite it",
                self.output.display()
            );
        }

        let wordlist = Wordlist::from_file(&self.wordlist)?;
        let workbench = wordlist.build(context.config.engine_config()?)?;
        ProjectFile::create(&self.output, workbench).save(None)?;

        println!("✓ Project created: {}", self.output.display());
        println!(
            "  {} varieties, {} views, {} entries, {} forms",
            wordlist.varieties.len(),
            wordlist.views.len(),
            wordlist.entries.len(),
            wordlist.form_count()
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
    fn test_refuses_to_overwrite() {
        let dir = TempDir::new().unwrap();
        let output = dir.path().join("project.json");
        fs::write(&output, "{}").unwrap();
        let args = InitArgs {
            wordlist: dir.path().join("words.json"),
            output: output.clone(),
            force: false,
        };
        let err = args.execute(&RunContext::default()).unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(fs::read_to_string(&output).unwrap(), "{}");
    }

    #[test]
    fn test_creates_empty_project() {
        let dir = TempDir::new().unwrap();
        let wordlist = dir.path().join("words.json");
        fs::write(&wordlist, r#"{"zones": [{"name": "stops", "protosegments": ["*p"]}]}"#).unwrap();
        let output = dir.path().join("project.json");
        let args = InitArgs {
            wordlist,
            output: output.clone(),
            force: false,
        };
        args.execute(&RunContext::default()).unwrap();
        assert!(output.exists());
    }
}
