//! Tabulate and retabulate command implementations

use super::{ProjectArgs, RunContext, SaveArgs};
use crate::error::CliError;
use crate::progress::ProgressReporter;
use crate::project::ProjectFile;
use anyhow::Result;
use clap::Args;
use cognate_engine::{EntryId, GroupKey, TabulationReport, TabulationRequest};

/// Column assignments and alignment choices for a tabulation
#[derive(Debug, Args)]
pub struct RequestArgs {
    /// Assign a column: POSITION=PROTOSEGMENT@ENVIRONMENT (repeatable)
    #[arg(short, long, value_name = "COLUMN")]
    pub assign: Vec<String>,

    /// Assignment for columns not named by --assign: PROTOSEGMENT@ENVIRONMENT
    #[arg(short, long, value_name = "ASSIGNMENT")]
    pub rest: Option<String>,

    /// Settle an ambiguous alignment: GROUP:VARIETY=DATUM (repeatable)
    #[arg(long, value_name = "CHOICE")]
    pub choose: Vec<String>,
}

impl RequestArgs {
    /// Build the engine request, resolving names against `project`
    pub fn request(&self, project: &ProjectFile) -> Result<TabulationRequest> {
        let mut request = TabulationRequest::new().with_choices(project.choices(&self.choose)?);
        for spec in &self.assign {
            let (position, assignment) = project.column_assignment(spec)?;
            request = request.assign(position, assignment);
        }
        if let Some(rest) = &self.rest {
            request = request.assign_rest(project.assignment(rest)?);
        }
        Ok(request)
    }
}

/// Arguments for the tabulate command
#[derive(Debug, Args)]
pub struct TabulateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub save: SaveArgs,

    /// View whose alignments are tabulated
    #[arg(long, value_name = "NAME", required = true)]
    pub view: String,

    /// Entry to tabulate, by gloss (repeatable)
    #[arg(short, long, value_name = "GLOSS", required_unless_present = "all")]
    pub entry: Vec<String>,

    /// Tabulate every entry that still has untabulated groups
    #[arg(long, conflicts_with = "entry")]
    pub all: bool,

    #[command(flatten)]
    pub request: RequestArgs,
}

impl TabulateArgs {
    /// Execute the tabulate command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        let mut project = self.project.open(context)?;
        let view = project.view(&self.view)?;
        let request = self.request.request(&project)?;

        let entries: Vec<EntryId> = if self.all {
            pending_entries(&project, view)
        } else {
            self.entry
                .iter()
                .map(|gloss| project.entry(gloss))
                .collect::<Result<_>>()?
        };
        log::info!("Tabulating {} entries", entries.len());

        let mut progress = ProgressReporter::new(context.quiet || entries.len() < 2);
        progress.init_entries(entries.len() as u64);

        let mut failures = 0usize;
        for entry in entries {
            let gloss = gloss_of(&project, entry);
            match project.workbench_mut().tabulate(entry, view, &request) {
                Ok(report) => print_report(&gloss, &report),
                Err(e) => {
                    failures += 1;
                    log::error!("Entry {gloss}: {e}");
                    println!("✗ {gloss}: {e}");
                }
            }
            progress.entry_completed(&gloss);
        }
        progress.finish();

        self.save.save(&project)?;
        if failures > 0 {
            return Err(CliError::TabulationFailed(failures).into());
        }
        Ok(())
    }
}

/// Arguments for the retabulate command
#[derive(Debug, Args)]
pub struct RetabulateArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub save: SaveArgs,

    /// View the group belongs to
    #[arg(long, value_name = "NAME", required = true)]
    pub view: String,

    /// Entry the group belongs to, by gloss
    #[arg(short, long, value_name = "GLOSS", required = true)]
    pub entry: String,

    /// Group tag
    #[arg(short, long, value_name = "TAG", required = true)]
    pub group: String,

    #[command(flatten)]
    pub request: RequestArgs,
}

impl RetabulateArgs {
    /// Execute the retabulate command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        let mut project = self.project.open(context)?;
        let key = GroupKey {
            view: project.view(&self.view)?,
            entry: project.entry(&self.entry)?,
            tag: self.group.clone(),
        };
        let request = self.request.request(&project)?;
        let result = project.workbench_mut().retabulate_group(&key, &request);
        // Committed steps stay even when the operation fails
        self.save.save(&project)?;
        print_report(&self.entry, &result?);
        Ok(())
    }
}

fn pending_entries(project: &ProjectFile, view: cognate_engine::ViewId) -> Vec<EntryId> {
    let lexicon = project.workbench().lexicon();
    lexicon
        .entries()
        .into_iter()
        .filter(|entry| {
            lexicon
                .groups_of(view, *entry)
                .into_iter()
                .any(|g| lexicon.group(g).is_some_and(|g| !g.done))
        })
        .collect()
}

fn gloss_of(project: &ProjectFile, entry: EntryId) -> String {
    project
        .workbench()
        .lexicon()
        .entry(entry)
        .map(|e| e.gloss.clone())
        .unwrap_or_else(|| entry.to_string())
}

fn print_report(gloss: &str, report: &TabulationReport) {
    let Some(group) = report.outcome.group else {
        println!("- {gloss}: no group yields patterns");
        return;
    };
    let created = report.placements.iter().filter(|p| p.created).count();
    println!(
        "✓ {gloss} (group {group}): {} columns, {created} new sets",
        report.placements.len()
    );
    for placement in &report.placements {
        println!(
            "  column {} -> cluster {}, set {}{}",
            placement.position,
            placement.cluster,
            placement.set,
            if placement.created { " (new)" } else { "" }
        );
    }
    for pending in &report.outcome.pending {
        println!(
            "  pending: group {} variety {} used datum {}",
            pending.group, pending.variety, pending.used
        );
    }
}
