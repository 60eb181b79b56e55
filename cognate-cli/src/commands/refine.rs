//! Refinement command implementations

use super::{refresh_note, ProjectArgs, RunContext, SaveArgs};
use crate::error::CliError;
use crate::project::ProjectFile;
use anyhow::Result;
use clap::Args;
use cognate_engine::{ClusterId, MoveOutcome, Refresh};

/// Write the project after an operation, then report its outcome
///
/// Steps committed before a failure stay in the hierarchy, so the project is
/// saved whether or not the operation succeeded.
fn commit(
    save: &SaveArgs,
    project: &ProjectFile,
    result: cognate_engine::Result<Refresh>,
    done: String,
) -> Result<()> {
    save.save(project)?;
    let refresh = result?;
    println!("✓ {done} ({})", refresh_note(refresh));
    Ok(())
}

/// Arguments for the move-cluster command
#[derive(Debug, Args)]
pub struct MoveClusterArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub save: SaveArgs,

    /// Cluster to move
    #[arg(long, value_name = "ID", required = true)]
    pub cluster: u32,

    /// Destination protosegment: LABEL or ZONE/LABEL
    #[arg(long, value_name = "PROTOSEGMENT", required = true)]
    pub to: String,
}

impl MoveClusterArgs {
    /// Execute the move-cluster command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        let mut project = self.project.open(context)?;
        let cluster = project.cluster(self.cluster)?;
        let target = project.protosegment(&self.to)?;
        let result = project.workbench_mut().move_cluster(cluster, target);
        commit(
            &self.save,
            &project,
            result,
            format!("Moved cluster {cluster} to {}", self.to),
        )
    }
}

/// Arguments for the merge-clusters command
#[derive(Debug, Args)]
pub struct MergeClustersArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub save: SaveArgs,

    /// Cluster whose sets are merged away
    #[arg(long, value_name = "ID", required = true)]
    pub from: u32,

    /// Cluster receiving the sets
    #[arg(long, value_name = "ID", required = true)]
    pub into: u32,
}

impl MergeClustersArgs {
    /// Execute the merge-clusters command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        let mut project = self.project.open(context)?;
        let from = project.cluster(self.from)?;
        let into = project.cluster(self.into)?;
        let result = project.workbench_mut().merge_clusters(from, into);
        commit(
            &self.save,
            &project,
            result,
            format!("Merged cluster {from} into {into}"),
        )
    }
}

/// Arguments for the merge-protosegments command
#[derive(Debug, Args)]
pub struct MergeProtosegmentsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub save: SaveArgs,

    /// Protosegment merged away: LABEL or ZONE/LABEL
    #[arg(long, value_name = "PROTOSEGMENT", required = true)]
    pub from: String,

    /// Protosegment receiving the clusters: LABEL or ZONE/LABEL
    #[arg(long, value_name = "PROTOSEGMENT", required = true)]
    pub into: String,
}

impl MergeProtosegmentsArgs {
    /// Execute the merge-protosegments command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        let mut project = self.project.open(context)?;
        let from = project.protosegment(&self.from)?;
        let into = project.protosegment(&self.into)?;
        let result = project.workbench_mut().merge_protosegments(from, into);
        commit(
            &self.save,
            &project,
            result,
            format!("Merged {} into {}", self.from, self.into),
        )
    }
}

/// Arguments for the move-set command
#[derive(Debug, Args)]
pub struct MoveSetArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub save: SaveArgs,

    /// Correspondence set to move
    #[arg(long, value_name = "ID", required = true)]
    pub set: u32,

    /// Destination protosegment: LABEL or ZONE/LABEL
    #[arg(long, value_name = "PROTOSEGMENT", required = true)]
    pub to: String,

    /// Destination environment, e.g. `#_a`
    #[arg(long, value_name = "ENV", required = true, allow_hyphen_values = true)]
    pub environment: String,

    /// Cluster to use when several qualify
    #[arg(long, value_name = "ID")]
    pub choose: Option<u32>,
}

impl MoveSetArgs {
    /// Execute the move-set command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        let mut project = self.project.open(context)?;
        let set = project.set(self.set)?;
        let target = project.protosegment(&self.to)?;
        let choice = self.choose.map(ClusterId);
        let result = project
            .workbench_mut()
            .move_correspondence_set(set, target, &self.environment, choice);

        match result {
            Ok(MoveOutcome::NeedsChoice { candidates }) => {
                let listed: Vec<String> = candidates.iter().map(ToString::to_string).collect();
                Err(CliError::ChoiceRequired(listed.join(", ")).into())
            }
            Ok(MoveOutcome::Moved { cluster, refresh }) => commit(
                &self.save,
                &project,
                Ok(refresh),
                format!("Moved set {set} to cluster {cluster}"),
            ),
            Err(e) => {
                self.save.save(&project)?;
                Err(e.into())
            }
        }
    }
}

/// Arguments for the reorder command
#[derive(Debug, Args)]
pub struct ReorderArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(flatten)]
    pub save: SaveArgs,

    /// Protosegment whose clusters are reordered: LABEL or ZONE/LABEL
    #[arg(long, value_name = "PROTOSEGMENT", required = true)]
    pub protosegment: String,

    /// Every cluster id of the protosegment in the new order
    #[arg(long, value_name = "IDS", required = true, value_delimiter = ',')]
    pub order: Vec<u32>,
}

impl ReorderArgs {
    /// Execute the reorder command
    pub fn execute(&self, context: &RunContext) -> Result<()> {
        let mut project = self.project.open(context)?;
        let protosegment = project.protosegment(&self.protosegment)?;
        let order: Vec<ClusterId> = self.order.iter().copied().map(ClusterId).collect();
        let result = project
            .workbench_mut()
            .reorder_clusters(protosegment, &order);
        commit(
            &self.save,
            &project,
            result,
            format!("Reordered clusters of {}", self.protosegment),
        )
    }
}
