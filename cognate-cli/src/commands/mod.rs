//! CLI command implementations

use crate::config::CliConfig;
use crate::project::ProjectFile;
use anyhow::Result;
use clap::{Args, Subcommand};
use cognate_engine::Refresh;
use std::path::PathBuf;

pub mod generate_config;
pub mod init;
pub mod preview;
pub mod refine;
pub mod summary;
pub mod tabulate;
pub mod validate;

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a project from a wordlist
    Init(init::InitArgs),

    /// Tabulate grouped alignments into correspondence sets
    Tabulate(tabulate::TabulateArgs),

    /// Show what tabulation would produce without changing anything
    Preview(preview::PreviewArgs),

    /// Move a cluster to another protosegment
    MoveCluster(refine::MoveClusterArgs),

    /// Merge one cluster into another of the same protosegment
    MergeClusters(refine::MergeClustersArgs),

    /// Merge one protosegment into another
    MergeProtosegments(refine::MergeProtosegmentsArgs),

    /// Move a correspondence set to another protosegment and environment
    MoveSet(refine::MoveSetArgs),

    /// Put the clusters of a protosegment in a new order
    Reorder(refine::ReorderArgs),

    /// Discard and redo the tabulation of one group
    Retabulate(tabulate::RetabulateArgs),

    /// List the correspondence hierarchy
    Summary(summary::SummaryArgs),

    /// Check a project or configuration file
    Validate(validate::ValidateArgs),

    /// Write a configuration template
    GenerateConfig(generate_config::GenerateConfigArgs),
}

impl Commands {
    /// Execute the selected command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        match self {
            Commands::Init(args) => args.execute(context),
            Commands::Tabulate(args) => args.execute(context),
            Commands::Preview(args) => args.execute(context),
            Commands::MoveCluster(args) => args.execute(context),
            Commands::MergeClusters(args) => args.execute(context),
            Commands::MergeProtosegments(args) => args.execute(context),
            Commands::MoveSet(args) => args.execute(context),
            Commands::Reorder(args) => args.execute(context),
            Commands::Retabulate(args) => args.execute(context),
            Commands::Summary(args) => args.execute(context),
            Commands::Validate(args) => args.execute(context),
            Commands::GenerateConfig(args) => args.execute(),
        }
    }
}

/// Settings shared by every command of one invocation
#[derive(Debug, Default)]
pub struct RunContext {
    /// Loaded configuration file, or defaults
    pub config: CliConfig,
    /// Suppress progress output
    pub quiet: bool,
}

/// Project file selection
#[derive(Debug, Args)]
pub struct ProjectArgs {
    /// Project file
    #[arg(short, long, value_name = "FILE", env = "COGNATE_PROJECT")]
    pub project: PathBuf,
}

impl ProjectArgs {
    /// Open the project with the engine settings of `context`
    pub fn open(&self, context: &RunContext) -> Result<ProjectFile> {
        ProjectFile::open(&self.project, context.config.engine_config()?)
    }
}

/// Where a changed project goes
#[derive(Debug, Args)]
pub struct SaveArgs {
    /// Write the changed project here instead of in place
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Report what would change without writing the project
    #[arg(long)]
    pub dry_run: bool,
}

impl SaveArgs {
    /// Write `project` unless this is a dry run
    pub fn save(&self, project: &ProjectFile) -> Result<()> {
        if self.dry_run {
            log::info!("Dry run, project not written");
            return Ok(());
        }
        project.save(self.output.as_deref())
    }
}

/// Line printed after a refinement
pub(crate) fn refresh_note(refresh: Refresh) -> &'static str {
    match refresh {
        Refresh::Needed => "hierarchy changed",
        Refresh::Unchanged => "nothing to change",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_note() {
        assert_eq!(refresh_note(Refresh::Needed), "hierarchy changed");
        assert_eq!(refresh_note(Refresh::Unchanged), "nothing to change");
    }

    #[test]
    fn test_commands_debug_format() {
        let command = Commands::Summary(summary::SummaryArgs {
            project: ProjectArgs {
                project: PathBuf::from("project.json"),
            },
            format: None,
        });
        let debug_str = format!("{:?}", command);
        assert!(debug_str.contains("Summary"));
        assert!(debug_str.contains("project.json"));
    }
}
