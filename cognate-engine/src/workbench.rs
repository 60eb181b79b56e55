//! Caller-facing operation surface
//!
//! A [`Workbench`] owns the lexicon, the hierarchy, the persistence backend
//! and the configuration of one project. Mutation goes through `&mut self`;
//! previews and summaries only borrow, so no background reader can observe a
//! half-applied refinement.

use crate::arena::{ClusterId, ProtosegmentId, SetId, ViewId};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::hierarchy::Hierarchy;
use crate::lexicon::{Datum, Lexicon};
use crate::persistence::{EntityKey, EntityRecord, MemoryStore, PersistenceBackend};
use crate::summary::Summary;
use cognate_core::{
    AlignmentChoices, AlignmentRecord, DatumId, EntryId, GroupId, GroupingOutcome,
    ThresholdGrouper, VarietyId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Whether derived listings must be rebuilt after an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Refresh {
    /// Something changed
    Needed,
    /// Nothing changed
    Unchanged,
}

impl Refresh {
    /// Whether listings must be rebuilt
    pub fn is_needed(self) -> bool {
        self == Refresh::Needed
    }
}

/// Result of moving a correspondence set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum MoveOutcome {
    /// The set now lives under `cluster`
    Moved {
        /// Destination cluster
        cluster: ClusterId,
        /// Refresh signal
        refresh: Refresh,
    },
    /// Several clusters qualify; call again with one of them as the choice
    NeedsChoice {
        /// Qualifying clusters by order
        candidates: Vec<ClusterId>,
    },
}

/// Protosegment and environment a tabulated column is filed under
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// Target protosegment
    pub protosegment: ProtosegmentId,
    /// Conditioning environment
    pub environment: String,
}

impl Assignment {
    /// Create an assignment
    pub fn new(protosegment: ProtosegmentId, environment: impl Into<String>) -> Self {
        Self {
            protosegment,
            environment: environment.into(),
        }
    }
}

/// Everything the analyst supplies for one tabulation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabulationRequest {
    /// Assignments by column position
    #[serde(default)]
    pub assignments: BTreeMap<usize, Assignment>,
    /// Assignment for columns without an explicit one
    #[serde(default)]
    pub fallback: Option<Assignment>,
    /// Pre-resolved ambiguous alignments
    #[serde(default)]
    pub choices: AlignmentChoices,
}

impl TabulationRequest {
    /// Create an empty request
    pub fn new() -> Self {
        Self::default()
    }

    /// File column `position` under `assignment`
    pub fn assign(mut self, position: usize, assignment: Assignment) -> Self {
        self.assignments.insert(position, assignment);
        self
    }

    /// File every otherwise unassigned column under `assignment`
    pub fn assign_rest(mut self, assignment: Assignment) -> Self {
        self.fallback = Some(assignment);
        self
    }

    /// Use `choices` for ambiguous alignments
    pub fn with_choices(mut self, choices: AlignmentChoices) -> Self {
        self.choices = choices;
        self
    }

    /// Assignment in effect for a column
    pub fn assignment_for(&self, position: usize) -> Option<&Assignment> {
        self.assignments.get(&position).or(self.fallback.as_ref())
    }
}

/// Where one tabulated column ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Column position
    pub position: usize,
    /// Cluster holding the set
    pub cluster: ClusterId,
    /// Set the new citation supports
    pub set: SetId,
    /// Whether a new cluster had to be created
    pub created: bool,
}

/// Result of a tabulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabulationReport {
    /// Grouper output the tabulation was based on
    pub outcome: GroupingOutcome,
    /// Placement of every tabulated column
    pub placements: Vec<Placement>,
    /// Refresh signal
    pub refresh: Refresh,
}

/// Serialized state of a project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    /// Lexical data and alignments
    #[serde(default)]
    pub lexicon: Lexicon,
    /// Correspondence hierarchy
    #[serde(default)]
    pub hierarchy: Hierarchy,
}

impl Project {
    /// Read a project file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::IoError(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            EngineError::IoError(format!("Failed to parse '{}': {}", path.display(), e))
        })
    }

    /// Write a project file
    pub fn store(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::IoError(format!("Failed to serialize project: {e}")))?;
        std::fs::write(path, content).map_err(|e| {
            EngineError::IoError(format!("Failed to write '{}': {}", path.display(), e))
        })
    }
}

/// The project under analysis and the operations on it
pub struct Workbench {
    pub(crate) config: EngineConfig,
    pub(crate) lexicon: Lexicon,
    pub(crate) hierarchy: Hierarchy,
    pub(crate) backend: Box<dyn PersistenceBackend>,
}

impl std::fmt::Debug for Workbench {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbench")
            .field("config", &self.config)
            .field("lexicon", &self.lexicon)
            .field("hierarchy", &self.hierarchy)
            .finish_non_exhaustive()
    }
}

impl Workbench {
    /// Create an empty project backed by a [`MemoryStore`]
    pub fn new(config: EngineConfig) -> Self {
        Self::from_project(Project::default(), config)
    }

    /// Open a project backed by a [`MemoryStore`]
    pub fn from_project(project: Project, config: EngineConfig) -> Self {
        Self::with_backend(project, config, MemoryStore::new())
    }

    /// Open a project with a custom backend
    pub fn with_backend<B>(project: Project, config: EngineConfig, backend: B) -> Self
    where
        B: PersistenceBackend + 'static,
    {
        Self {
            config,
            lexicon: project.lexicon,
            hierarchy: project.hierarchy,
            backend: Box::new(backend),
        }
    }

    /// Snapshot of the project
    pub fn to_project(&self) -> Project {
        Project {
            lexicon: self.lexicon.clone(),
            hierarchy: self.hierarchy.clone(),
        }
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Lexical data
    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Lexical data, for adding varieties, entries, data and views
    pub fn lexicon_mut(&mut self) -> &mut Lexicon {
        &mut self.lexicon
    }

    /// Correspondence hierarchy
    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Align a datum in a view and persist the new record
    pub fn align(&mut self, view: ViewId, datum: DatumId) -> Result<()> {
        if self.lexicon.alignment(view, datum).is_some() {
            return Ok(());
        }
        self.lexicon.align(view, datum)?;
        if let Err(e) = self.save_alignment(view, datum) {
            self.lexicon.remove_alignment(view, datum);
            return Err(e);
        }
        Ok(())
    }

    /// Edit one alignment and persist it
    ///
    /// The edit runs on a copy; the stored record changes only if both the
    /// edit and the save succeed.
    pub fn edit_alignment<T, F>(&mut self, view: ViewId, datum: DatumId, edit: F) -> Result<T>
    where
        F: FnOnce(&mut AlignmentRecord) -> cognate_core::Result<T>,
    {
        let original = self
            .lexicon
            .alignment(view, datum)
            .cloned()
            .ok_or_else(|| EngineError::not_found("alignment", datum.0))?;
        let mut edited = original.clone();
        let value = edit(&mut edited)?;
        if edited == original {
            return Ok(value);
        }
        self.lexicon.put_alignment(view, edited)?;
        if let Err(e) = self.save_alignment(view, datum) {
            self.lexicon.put_alignment(view, original)?;
            return Err(e);
        }
        debug!(%view, %datum, "alignment edited");
        Ok(value)
    }

    /// Tag an alignment with a group of the same entry and view
    pub fn assign_group(&mut self, view: ViewId, datum: DatumId, group: Option<GroupId>) -> Result<()> {
        let entry = self.lexicon.require_datum(datum)?.entry;
        if let Some(group) = group {
            let g = self.lexicon.require_group(group)?;
            if g.view != view || g.entry != entry {
                return Err(EngineError::validation(format!(
                    "group {group} belongs to entry {} in view {}, not entry {entry} in view {view}",
                    g.entry, g.view
                )));
            }
        }
        self.edit_alignment(view, datum, |record| {
            record.set_group(group);
            Ok(())
        })
    }

    /// Create a group tag for `entry` in `view` and persist it
    pub fn add_group(&mut self, view: ViewId, entry: EntryId, tag: &str) -> Result<GroupId> {
        let group = self.lexicon.add_group(view, entry, tag)?;
        if let Err(e) = self.save_group(group) {
            self.lexicon.remove_group(group);
            return Err(e);
        }
        debug!(%view, %entry, tag, "group created");
        Ok(group)
    }

    /// Insert text into a datum and persist every alignment of it
    pub fn insert_text(&mut self, datum: DatumId, char_offset: usize, text: &str) -> Result<()> {
        self.edit_text(datum, |lexicon| lexicon.insert_text(datum, char_offset, text))
    }

    /// Delete `len` characters from a datum and persist every alignment of it
    pub fn delete_text(&mut self, datum: DatumId, char_offset: usize, len: usize) -> Result<String> {
        self.edit_text(datum, |lexicon| lexicon.delete_text(datum, char_offset, len))
    }

    /// Delete a datum together with its alignments, view by view
    ///
    /// Alignments already deleted stay deleted when a later one fails. The
    /// datum itself goes once none of its alignments is left.
    pub fn remove_datum(&mut self, datum: DatumId) -> Result<Datum> {
        self.lexicon.require_datum(datum)?;
        for (view, _) in self.lexicon.alignments_of(datum) {
            self.backend.delete(EntityKey::Alignment(view, datum))?;
            self.lexicon.remove_alignment(view, datum);
        }
        let removed = self.lexicon.remove_datum(datum)?;
        info!(%datum, "datum removed");
        Ok(removed)
    }

    /// Apply a text edit, then save each touched alignment
    ///
    /// A failed save puts the datum and all of its alignments back.
    fn edit_text<T, F>(&mut self, datum: DatumId, edit: F) -> Result<T>
    where
        F: FnOnce(&mut Lexicon) -> Result<T>,
    {
        let text = self.lexicon.require_datum(datum)?.text.clone();
        let originals = self.lexicon.alignments_of(datum);
        let views: Vec<ViewId> = originals.iter().map(|(view, _)| *view).collect();
        let value = edit(&mut self.lexicon)?;

        for (i, view) in views.iter().enumerate() {
            if let Err(e) = self.save_alignment(*view, datum) {
                for (saved, record) in &originals[..i] {
                    let undo = EntityRecord::Alignment {
                        view: *saved,
                        record: record.clone(),
                    };
                    if let Err(undo_error) = self.backend.save(&undo) {
                        warn!(view = %saved, %datum, error = %undo_error, "could not restore alignment");
                    }
                }
                self.lexicon.restore_datum(datum, text, originals);
                return Err(e);
            }
        }
        debug!(%datum, views = views.len(), "datum text edited");
        Ok(value)
    }

    fn save_group(&mut self, group: GroupId) -> Result<()> {
        let record = EntityRecord::Group {
            id: group,
            group: self.lexicon.require_group(group)?.clone(),
        };
        self.backend.save(&record)?;
        Ok(())
    }

    fn save_alignment(&mut self, view: ViewId, datum: DatumId) -> Result<()> {
        let record = self
            .lexicon
            .alignment(view, datum)
            .cloned()
            .ok_or_else(|| EngineError::not_found("alignment", datum.0))?;
        self.backend
            .save(&EntityRecord::Alignment { view, record })?;
        Ok(())
    }

    /// Set a group's done flag and persist it; reverted on failure
    pub(crate) fn set_group_done(&mut self, group: GroupId, done: bool) -> Result<()> {
        let previous = self.lexicon.require_group(group)?.done;
        if previous == done {
            return Ok(());
        }
        let Some(g) = self.lexicon.group_mut(group) else {
            return Err(EngineError::not_found("group", group.0));
        };
        g.done = done;
        if let Err(e) = self.save_group(group) {
            if let Some(g) = self.lexicon.group_mut(group) {
                g.done = previous;
            }
            return Err(e);
        }
        Ok(())
    }

    /// Group an entry without changing anything
    ///
    /// Only groups not yet tabulated are considered, exactly as
    /// [`Workbench::tabulate`] would see them.
    pub fn preview(
        &self,
        entry: EntryId,
        view: ViewId,
        choices: &AlignmentChoices,
    ) -> Result<GroupingOutcome> {
        self.lexicon.require_entry(entry)?;
        self.lexicon.require_view(view)?;
        Ok(group_entry(
            &self.lexicon,
            &self.config.grouper(),
            view,
            entry,
            choices,
        ))
    }

    /// Preview many entries; runs in parallel for large batches
    pub fn preview_entries(
        &self,
        view: ViewId,
        entries: &[EntryId],
        choices: &AlignmentChoices,
    ) -> Result<Vec<GroupingOutcome>> {
        self.lexicon.require_view(view)?;
        for entry in entries {
            self.lexicon.require_entry(*entry)?;
        }
        let grouper = self.config.grouper();
        let lexicon = &self.lexicon;
        let run = |entry: &EntryId| group_entry(lexicon, &grouper, view, *entry, choices);

        #[cfg(feature = "parallel")]
        {
            if entries.len() >= self.config.parallel_threshold {
                debug!(entries = entries.len(), "previewing in parallel");
                return Ok(entries.par_iter().map(run).collect());
            }
        }

        Ok(entries.iter().map(run).collect())
    }

    /// Read-only listing of the hierarchy
    pub fn summary(&self) -> Summary {
        Summary::build(&self.hierarchy, self.config.parallel_threshold)
    }

    /// Structural problems in the hierarchy and lexicon
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = self.hierarchy.check_invariants();
        for (_, citation) in self.hierarchy.citations.iter() {
            let group = citation.current().group;
            if self.lexicon.group(group).is_none() {
                problems.push(format!("citation refers to missing group {group}"));
            }
        }
        if !problems.is_empty() {
            info!(problems = problems.len(), "invariant check found problems");
        }
        problems
    }
}

/// Undone groups of `entry` in `view`, run through `grouper`
pub(crate) fn group_entry(
    lexicon: &Lexicon,
    grouper: &ThresholdGrouper,
    view: ViewId,
    entry: EntryId,
    choices: &AlignmentChoices,
) -> GroupingOutcome {
    let groups: Vec<GroupId> = lexicon
        .groups_of(view, entry)
        .into_iter()
        .filter(|g| lexicon.group(*g).is_some_and(|g| !g.done))
        .collect();
    group_entry_in(lexicon, grouper, view, entry, &groups, choices)
}

/// Run `grouper` over the given groups of `entry` in `view`
pub(crate) fn group_entry_in(
    lexicon: &Lexicon,
    grouper: &ThresholdGrouper,
    view: ViewId,
    entry: EntryId,
    groups: &[GroupId],
    choices: &AlignmentChoices,
) -> GroupingOutcome {
    let members: &[VarietyId] = lexicon.view(view).map_or(&[], |v| v.members.as_slice());
    let records = lexicon.records_for(view, entry);
    grouper.group(entry, members, groups, &records, choices)
}
