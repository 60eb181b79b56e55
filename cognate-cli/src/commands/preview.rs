//! Preview command implementation

use super::{ProjectArgs, RunContext};
use crate::output::{EntryPreview, OutputFormat};
use anyhow::Result;
use clap::Args;
use cognate_engine::EntryId;
use std::io;

/// Arguments for the preview command
#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// View whose alignments are grouped
    #[arg(long, value_name = "NAME", required = true)]
    pub view: String,

    /// Entry to preview, by gloss (repeatable; default: every entry)
    #[arg(short, long, value_name = "GLOSS")]
    pub entry: Vec<String>,

    /// Settle an ambiguous alignment: GROUP:VARIETY=DATUM (repeatable)
    #[arg(long, value_name = "CHOICE")]
    pub choose: Vec<String>,

    /// Output format (default from configuration)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

impl PreviewArgs {
    /// Execute the preview command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        let project = self.project.open(context)?;
        let view = project.view(&self.view)?;
        let choices = project.choices(&self.choose)?;
        let entries: Vec<EntryId> = if self.entry.is_empty() {
            project.workbench().lexicon().entries()
        } else {
            self.entry
                .iter()
                .map(|gloss| project.entry(gloss))
                .collect::<Result<_>>()?
        };
        log::info!("Previewing {} entries", entries.len());

        let outcomes = project
            .workbench()
            .preview_entries(view, &entries, &choices)?;

        let format = self.format.unwrap_or(context.config.default_format()?);
        let mut formatter = format.formatter(io::stdout(), context.config.output.pretty_json);
        for outcome in outcomes {
            let gloss = project
                .workbench()
                .lexicon()
                .entry(outcome.entry)
                .map(|e| e.gloss.clone())
                .unwrap_or_default();
            formatter.format_preview(&EntryPreview { gloss, outcome })?;
        }
        formatter.finish()
    }
}
