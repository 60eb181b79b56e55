//! Project files and name resolution for command-line references

use crate::error::CliError;
use anyhow::{Context, Result};
use cognate_engine::{
    AlignmentChoices, Assignment, ClusterId, DatumId, EngineConfig, EntryId, GroupId,
    HierarchyQueries, Project, ProtosegmentId, SetId, ViewId, Workbench,
};
use std::path::{Path, PathBuf};

/// A workbench opened from a project file
#[derive(Debug)]
pub struct ProjectFile {
    path: PathBuf,
    workbench: Workbench,
}

impl ProjectFile {
    /// Open the project stored at `path`
    pub fn open(path: &Path, config: EngineConfig) -> Result<Self> {
        if !path.exists() {
            return Err(CliError::FileNotFound(path.display().to_string()).into());
        }
        let project = Project::load(path)
            .with_context(|| format!("Failed to load project {}", path.display()))?;
        log::debug!("Loaded project {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            workbench: Workbench::from_project(project, config),
        })
    }

    /// Wrap a freshly built workbench that will be written to `path`
    pub fn create(path: &Path, workbench: Workbench) -> Self {
        Self {
            path: path.to_path_buf(),
            workbench,
        }
    }

    /// The open workbench
    pub fn workbench(&self) -> &Workbench {
        &self.workbench
    }

    /// Mutable access to the open workbench
    pub fn workbench_mut(&mut self) -> &mut Workbench {
        &mut self.workbench
    }

    /// Write the project back, to `output` when given
    pub fn save(&self, output: Option<&Path>) -> Result<()> {
        let target = output.unwrap_or(&self.path);
        self.workbench
            .to_project()
            .store(target)
            .with_context(|| format!("Failed to write project {}", target.display()))?;
        log::info!("Saved project {}", target.display());
        Ok(())
    }

    /// Resolve a view by name
    pub fn view(&self, name: &str) -> Result<ViewId> {
        self.workbench
            .lexicon()
            .view_named(name)
            .ok_or_else(|| CliError::UnknownReference(format!("view {name}")).into())
    }

    /// Resolve an entry by gloss
    pub fn entry(&self, gloss: &str) -> Result<EntryId> {
        self.workbench
            .lexicon()
            .entry_glossed(gloss)
            .ok_or_else(|| CliError::UnknownReference(format!("entry {gloss}")).into())
    }

    /// Resolve a protosegment given as `label` or `zone/label`
    pub fn protosegment(&self, reference: &str) -> Result<ProtosegmentId> {
        let hierarchy = self.workbench.hierarchy();
        let found = match reference.split_once('/') {
            Some((zone, label)) => hierarchy
                .zone_named(zone)
                .and_then(|z| hierarchy.protosegments_labelled(z, label, None).first().copied()),
            None => hierarchy.protosegment_labelled(reference),
        };
        found.ok_or_else(|| CliError::UnknownReference(format!("protosegment {reference}")).into())
    }

    /// Check that a cluster id names a live cluster
    pub fn cluster(&self, id: u32) -> Result<ClusterId> {
        let cluster = ClusterId(id);
        match self.workbench.hierarchy().cluster(cluster) {
            Some(_) => Ok(cluster),
            None => Err(CliError::UnknownReference(format!("cluster {id}")).into()),
        }
    }

    /// Check that a set id names a live correspondence set
    pub fn set(&self, id: u32) -> Result<SetId> {
        let set = SetId(id);
        match self.workbench.hierarchy().set(set) {
            Some(_) => Ok(set),
            None => Err(CliError::UnknownReference(format!("set {id}")).into()),
        }
    }

    /// Parse `POSITION=PROTOSEGMENT@ENVIRONMENT`
    pub fn column_assignment(&self, arg: &str) -> Result<(usize, Assignment)> {
        let (position, rest) = arg
            .split_once('=')
            .ok_or_else(|| CliError::InvalidArgument(format!("expected POSITION=SEGMENT@ENV, got {arg}")))?;
        let position = position
            .trim()
            .parse::<usize>()
            .map_err(|_| CliError::InvalidArgument(format!("bad column position in {arg}")))?;
        Ok((position, self.assignment(rest)?))
    }

    /// Parse `PROTOSEGMENT@ENVIRONMENT`
    pub fn assignment(&self, arg: &str) -> Result<Assignment> {
        let (segment, environment) = arg
            .rsplit_once('@')
            .ok_or_else(|| CliError::InvalidArgument(format!("expected SEGMENT@ENV, got {arg}")))?;
        Ok(Assignment::new(self.protosegment(segment)?, environment))
    }

    /// Parse `GROUP:VARIETY=DATUM` choices, the variety by name or abbreviation
    pub fn choices(&self, args: &[String]) -> Result<AlignmentChoices> {
        let mut choices = AlignmentChoices::new();
        for arg in args {
            let invalid = || CliError::InvalidArgument(format!("expected GROUP:VARIETY=DATUM, got {arg}"));
            let (group, rest) = arg.split_once(':').ok_or_else(invalid)?;
            let (variety, datum) = rest.split_once('=').ok_or_else(invalid)?;
            let group: u32 = group.trim().parse().map_err(|_| invalid())?;
            let datum: u32 = datum.trim().parse().map_err(|_| invalid())?;
            let variety = self
                .workbench
                .lexicon()
                .variety_named(variety.trim())
                .ok_or_else(|| CliError::UnknownReference(format!("variety {variety}")))?;
            choices.choose(GroupId(group), variety, DatumId(datum));
        }
        Ok(choices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> ProjectFile {
        let mut workbench = Workbench::new(EngineConfig::default());
        let lexicon = workbench.lexicon_mut();
        let lat = lexicon.add_variety("Latin", "LAT").unwrap();
        let grk = lexicon.add_variety("Greek", "GRK").unwrap();
        lexicon.add_view("Indo-European", &[lat, grk]).unwrap();
        lexicon.add_entry("father").unwrap();
        let stops = workbench.create_zone("stops").unwrap();
        let rest = workbench.create_zone("rest").unwrap();
        workbench.create_protosegment(stops, "*p").unwrap();
        workbench.create_protosegment(rest, "*p").unwrap();
        ProjectFile::create(Path::new("unused.json"), workbench)
    }

    #[test]
    fn test_resolves_names() {
        let project = sample();
        assert_eq!(project.view("Indo-European").unwrap(), ViewId(1));
        assert_eq!(project.entry("father").unwrap(), EntryId(1));
        assert!(project.view("Uralic").is_err());
    }

    #[test]
    fn test_zone_qualified_protosegment() {
        let project = sample();
        assert_eq!(project.protosegment("*p").unwrap(), ProtosegmentId(1));
        assert_eq!(project.protosegment("rest/*p").unwrap(), ProtosegmentId(2));
        assert!(project.protosegment("rest/*t").is_err());
    }

    #[test]
    fn test_column_assignment_syntax() {
        let project = sample();
        let (position, assignment) = project.column_assignment("2=stops/*p@#_a").unwrap();
        assert_eq!(position, 2);
        assert_eq!(assignment.protosegment, ProtosegmentId(1));
        assert_eq!(assignment.environment, "#_a");
        assert!(project.column_assignment("x=*p@#_").is_err());
        assert!(project.column_assignment("0=*p").is_err());
    }

    #[test]
    fn test_choices_syntax() {
        let project = sample();
        let choices = project.choices(&["3:GRK=7".to_string()]).unwrap();
        assert_eq!(choices.get(GroupId(3), cognate_engine::VarietyId(2)), Some(DatumId(7)));
        assert!(project.choices(&["3:XX=7".to_string()]).is_err());
        assert!(project.choices(&["3-GRK".to_string()]).is_err());
    }

    #[test]
    fn test_missing_file_reported() {
        let err = ProjectFile::open(Path::new("/nonexistent/p.json"), EngineConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("File not found"));
    }

    #[test]
    fn test_save_and_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("project.json");
        sample().save(Some(&path)).unwrap();
        let reopened = ProjectFile::open(&path, EngineConfig::default()).unwrap();
        assert_eq!(reopened.entry("father").unwrap(), EntryId(1));
    }
}
