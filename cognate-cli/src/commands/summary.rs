//! Summary command implementation

use super::{ProjectArgs, RunContext};
use crate::output::OutputFormat;
use anyhow::Result;
use clap::Args;
use std::io;

/// Arguments for the summary command
#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output format (default from configuration)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

impl SummaryArgs {
    /// Execute the summary command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        let project = self.project.open(context)?;
        let summary = project.workbench().summary();
        log::debug!("Summary totals: {:?}", summary.totals);

        let format = self.format.unwrap_or(context.config.default_format()?);
        let mut formatter = format.formatter(io::stdout(), context.config.output.pretty_json);
        formatter.format_summary(&summary)?;
        formatter.finish()
    }
}
