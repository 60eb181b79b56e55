//! Varieties, entries, data, views and alignment groups
//!
//! A view is an ordered selection of varieties; it owns the alignment record
//! of every datum aligned in it. Groups tag records of one entry in one view
//! and form the priority list the grouper walks.

use crate::arena::{Arena, ViewId};
use crate::error::{EngineError, Result};
use crate::schema::{validate, FieldCheck, Rule};
use cognate_core::alignment;
use cognate_core::{AlignmentRecord, DatumId, EntryId, GroupId, VarietyId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const NAME: &[Rule] = &[Rule::Required, Rule::NoSurroundingSpace];
const TAG: &[Rule] = &[
    Rule::Required,
    Rule::Pattern {
        regex: r"^\S+$",
        description: "may not contain whitespace",
    },
];

/// A language variety (a column of every correspondence pattern)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variety {
    /// Full name
    pub name: String,
    /// Short label used in listings
    #[serde(default)]
    pub abbreviation: String,
}

/// A lexical entry (a cognate set under one gloss)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Meaning shared by the entry's data
    pub gloss: String,
}

/// One attested form of an entry in one variety
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datum {
    /// Owning entry
    pub entry: EntryId,
    /// Attesting variety
    pub variety: VarietyId,
    /// Transcription
    pub text: String,
}

/// Ordered selection of varieties with the alignments made in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// Display name
    pub name: String,
    /// Member varieties; fixes the column order of patterns
    pub members: Vec<VarietyId>,
    #[serde(default)]
    alignments: BTreeMap<DatumId, AlignmentRecord>,
}

impl View {
    /// Alignment of `datum`, if it has been aligned in this view
    pub fn alignment(&self, datum: DatumId) -> Option<&AlignmentRecord> {
        self.alignments.get(&datum)
    }

    /// All alignments by datum
    pub fn alignments(&self) -> impl Iterator<Item = &AlignmentRecord> + '_ {
        self.alignments.values()
    }
}

/// Tag shared by alignments of one entry in one view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// View the group lives in
    pub view: ViewId,
    /// Entry whose alignments it tags
    pub entry: EntryId,
    /// Tag, unique per (view, entry)
    pub tag: String,
    /// Set once the group has been tabulated
    #[serde(default)]
    pub done: bool,
}

impl Group {
    /// Key identifying this group
    pub fn key(&self) -> GroupKey {
        GroupKey {
            view: self.view,
            entry: self.entry,
            tag: self.tag.clone(),
        }
    }
}

/// Natural key of a group
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    /// View
    pub view: ViewId,
    /// Entry
    pub entry: EntryId,
    /// Tag
    pub tag: String,
}

/// All lexical data of a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lexicon {
    #[serde(default)]
    varieties: Arena<VarietyId, Variety>,
    #[serde(default)]
    entries: Arena<EntryId, Entry>,
    #[serde(default)]
    data: Arena<DatumId, Datum>,
    #[serde(default)]
    views: Arena<ViewId, View>,
    #[serde(default)]
    groups: Arena<GroupId, Group>,
}

fn check(entity: &str, fields: &[FieldCheck<'_>]) -> Result<()> {
    match validate(entity, fields) {
        Some(problem) => Err(EngineError::Validation(problem)),
        None => Ok(()),
    }
}

fn check_text(text: &str) -> Result<()> {
    Ok(alignment::check_text(text)?)
}

impl Lexicon {
    /// Create an empty lexicon
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a variety
    pub fn add_variety(&mut self, name: &str, abbreviation: &str) -> Result<VarietyId> {
        check("variety", &[FieldCheck::text("name", name, NAME)])?;
        if self.variety_named(name).is_some() {
            return Err(EngineError::validation(format!(
                "variety.name: {name:?} is already in use"
            )));
        }
        Ok(self.varieties.insert(Variety {
            name: name.to_string(),
            abbreviation: abbreviation.to_string(),
        }))
    }

    /// Register an entry
    pub fn add_entry(&mut self, gloss: &str) -> Result<EntryId> {
        check("entry", &[FieldCheck::text("gloss", gloss, NAME)])?;
        Ok(self.entries.insert(Entry {
            gloss: gloss.to_string(),
        }))
    }

    /// Record a form of `entry` in `variety`
    pub fn add_datum(&mut self, entry: EntryId, variety: VarietyId, text: &str) -> Result<DatumId> {
        self.require_entry(entry)?;
        self.require_variety(variety)?;
        check_text(text)?;
        Ok(self.data.insert(Datum {
            entry,
            variety,
            text: text.to_string(),
        }))
    }

    /// Create a view over `members` in column order
    pub fn add_view(&mut self, name: &str, members: &[VarietyId]) -> Result<ViewId> {
        check("view", &[FieldCheck::text("name", name, NAME)])?;
        if members.is_empty() {
            return Err(EngineError::validation("view.members: is required"));
        }
        for (i, member) in members.iter().enumerate() {
            self.require_variety(*member)?;
            if members[..i].contains(member) {
                return Err(EngineError::validation(format!(
                    "view.members: variety {member} is listed twice"
                )));
            }
        }
        Ok(self.views.insert(View {
            name: name.to_string(),
            members: members.to_vec(),
            alignments: BTreeMap::new(),
        }))
    }

    /// Align `datum` in `view` with an all-held vector, unless already aligned
    pub fn align(&mut self, view: ViewId, datum: DatumId) -> Result<()> {
        let Datum { variety, text, .. } = self.require_datum(datum)?.clone();
        let members = &self.require_view(view)?.members;
        if !members.contains(&variety) {
            return Err(EngineError::validation(format!(
                "variety {variety} of datum {datum} is not a member of view {view}"
            )));
        }
        let record = AlignmentRecord::new(datum, variety, text)?;
        if let Some(v) = self.views.get_mut(view) {
            v.alignments.entry(datum).or_insert_with(|| {
                debug!(%view, %datum, "aligned");
                record
            });
        }
        Ok(())
    }

    /// Replace a stored alignment
    pub(crate) fn put_alignment(&mut self, view: ViewId, record: AlignmentRecord) -> Result<()> {
        let v = self
            .views
            .get_mut(view)
            .ok_or_else(|| EngineError::not_found("view", view.0))?;
        v.alignments.insert(record.datum(), record);
        Ok(())
    }

    pub(crate) fn remove_alignment(&mut self, view: ViewId, datum: DatumId) -> Option<AlignmentRecord> {
        self.views.get_mut(view)?.alignments.remove(&datum)
    }

    /// Create a group tag for `entry` in `view`
    pub(crate) fn add_group(&mut self, view: ViewId, entry: EntryId, tag: &str) -> Result<GroupId> {
        self.require_view(view)?;
        self.require_entry(entry)?;
        check("group", &[FieldCheck::text("tag", tag, TAG)])?;
        let key = GroupKey {
            view,
            entry,
            tag: tag.to_string(),
        };
        if self.find_group(&key).is_some() {
            return Err(EngineError::validation(format!(
                "group.tag: {tag:?} already exists for entry {entry} in view {view}"
            )));
        }
        Ok(self.groups.insert(Group {
            view,
            entry,
            tag: key.tag,
            done: false,
        }))
    }

    pub(crate) fn remove_group(&mut self, id: GroupId) -> Option<Group> {
        self.groups.remove(id)
    }

    pub(crate) fn group_mut(&mut self, id: GroupId) -> Option<&mut Group> {
        self.groups.get_mut(id)
    }

    /// Look up a group by key
    pub fn find_group(&self, key: &GroupKey) -> Option<GroupId> {
        self.groups
            .iter()
            .find(|(_, g)| g.view == key.view && g.entry == key.entry && g.tag == key.tag)
            .map(|(id, _)| id)
    }

    /// Groups of `entry` in `view`, in priority (creation) order
    pub fn groups_of(&self, view: ViewId, entry: EntryId) -> Vec<GroupId> {
        self.groups
            .iter()
            .filter(|(_, g)| g.view == view && g.entry == entry)
            .map(|(id, _)| id)
            .collect()
    }

    /// Copies of every alignment of `entry` in `view`, by datum
    pub fn records_for(&self, view: ViewId, entry: EntryId) -> Vec<AlignmentRecord> {
        let Some(v) = self.views.get(view) else {
            return Vec::new();
        };
        v.alignments
            .values()
            .filter(|r| self.data.get(r.datum()).is_some_and(|d| d.entry == entry))
            .cloned()
            .collect()
    }

    /// Data of an entry, in creation order
    pub fn data_of(&self, entry: EntryId) -> Vec<DatumId> {
        self.data
            .iter()
            .filter(|(_, d)| d.entry == entry)
            .map(|(id, _)| id)
            .collect()
    }

    /// Delete a datum and its alignment in every view
    pub(crate) fn remove_datum(&mut self, datum: DatumId) -> Result<Datum> {
        let removed = self
            .data
            .remove(datum)
            .ok_or_else(|| EngineError::not_found("datum", datum.0))?;
        for (_, view) in self.views.iter_mut() {
            view.alignments.remove(&datum);
        }
        Ok(removed)
    }

    /// Insert text into a datum, keeping all of its alignments in step
    ///
    /// Every alignment is edited on a copy first; nothing changes unless all
    /// edits succeed.
    pub(crate) fn insert_text(&mut self, datum: DatumId, char_offset: usize, text: &str) -> Result<()> {
        check_text(text)?;
        let chars = self.require_datum(datum)?.text.chars().count();
        if char_offset > chars {
            return Err(EngineError::validation(format!(
                "datum {datum}: cannot insert at {char_offset} of {chars} characters"
            )));
        }
        let edited = self.edit_alignments(datum, |record| record.insert_text(char_offset, text))?;
        if let Some(d) = self.data.get_mut(datum) {
            let byte = d
                .text
                .char_indices()
                .nth(char_offset)
                .map_or(d.text.len(), |(b, _)| b);
            d.text.insert_str(byte, text);
        }
        self.store_alignments(edited);
        Ok(())
    }

    /// Delete `len` characters from a datum, keeping its alignments in step
    pub(crate) fn delete_text(&mut self, datum: DatumId, char_offset: usize, len: usize) -> Result<String> {
        let current = self.require_datum(datum)?.text.clone();
        let chars = current.chars().count();
        if char_offset + len > chars {
            return Err(EngineError::validation(format!(
                "datum {datum}: cannot delete {len} characters at {char_offset} of {chars}"
            )));
        }
        let edited = self.edit_alignments(datum, |record| {
            record.delete_text(char_offset, len).map(|_| ())
        })?;
        let removed: String = current.chars().skip(char_offset).take(len).collect();
        if let Some(d) = self.data.get_mut(datum) {
            d.text = current
                .chars()
                .take(char_offset)
                .chain(current.chars().skip(char_offset + len))
                .collect();
        }
        self.store_alignments(edited);
        Ok(removed)
    }

    /// Every alignment of `datum`, by view
    pub(crate) fn alignments_of(&self, datum: DatumId) -> Vec<(ViewId, AlignmentRecord)> {
        self.views
            .iter()
            .filter_map(|(view, v)| v.alignments.get(&datum).map(|r| (view, r.clone())))
            .collect()
    }

    /// Put back a datum's text and alignments as they were before an edit
    pub(crate) fn restore_datum(&mut self, datum: DatumId, text: String, records: Vec<(ViewId, AlignmentRecord)>) {
        if let Some(d) = self.data.get_mut(datum) {
            d.text = text;
        }
        self.store_alignments(records);
    }

    fn edit_alignments<F>(&self, datum: DatumId, mut edit: F) -> Result<Vec<(ViewId, AlignmentRecord)>>
    where
        F: FnMut(&mut AlignmentRecord) -> cognate_core::Result<()>,
    {
        let mut edited = Vec::new();
        for (view, v) in self.views.iter() {
            if let Some(record) = v.alignments.get(&datum) {
                let mut copy = record.clone();
                edit(&mut copy)?;
                edited.push((view, copy));
            }
        }
        Ok(edited)
    }

    fn store_alignments(&mut self, edited: Vec<(ViewId, AlignmentRecord)>) {
        for (view, record) in edited {
            if let Some(v) = self.views.get_mut(view) {
                v.alignments.insert(record.datum(), record);
            }
        }
    }

    /// Find a variety by name or abbreviation
    pub fn variety_named(&self, name: &str) -> Option<VarietyId> {
        self.varieties
            .iter()
            .find(|(_, v)| v.name == name || (!v.abbreviation.is_empty() && v.abbreviation == name))
            .map(|(id, _)| id)
    }

    /// Find a view by name
    pub fn view_named(&self, name: &str) -> Option<ViewId> {
        self.views
            .iter()
            .find(|(_, v)| v.name == name)
            .map(|(id, _)| id)
    }

    /// Find an entry by gloss
    pub fn entry_glossed(&self, gloss: &str) -> Option<EntryId> {
        self.entries
            .iter()
            .find(|(_, e)| e.gloss == gloss)
            .map(|(id, _)| id)
    }

    /// Look up a variety
    pub fn variety(&self, id: VarietyId) -> Option<&Variety> {
        self.varieties.get(id)
    }

    /// Look up an entry
    pub fn entry(&self, id: EntryId) -> Option<&Entry> {
        self.entries.get(id)
    }

    /// Look up a datum
    pub fn datum(&self, id: DatumId) -> Option<&Datum> {
        self.data.get(id)
    }

    /// Look up a view
    pub fn view(&self, id: ViewId) -> Option<&View> {
        self.views.get(id)
    }

    /// Look up a group
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.get(id)
    }

    /// Alignment of `datum` in `view`
    pub fn alignment(&self, view: ViewId, datum: DatumId) -> Option<&AlignmentRecord> {
        self.views.get(view)?.alignment(datum)
    }

    /// All entries in creation order
    pub fn entries(&self) -> Vec<EntryId> {
        self.entries.ids()
    }

    /// All views in creation order
    pub fn views(&self) -> Vec<ViewId> {
        self.views.ids()
    }

    /// All varieties in creation order
    pub fn varieties(&self) -> Vec<VarietyId> {
        self.varieties.ids()
    }

    /// Fetch a view or fail with `NotFound`
    pub fn require_view(&self, id: ViewId) -> Result<&View> {
        self.views
            .get(id)
            .ok_or_else(|| EngineError::not_found("view", id.0))
    }

    /// Fetch an entry or fail with `NotFound`
    pub fn require_entry(&self, id: EntryId) -> Result<&Entry> {
        self.entries
            .get(id)
            .ok_or_else(|| EngineError::not_found("entry", id.0))
    }

    /// Fetch a datum or fail with `NotFound`
    pub fn require_datum(&self, id: DatumId) -> Result<&Datum> {
        self.data
            .get(id)
            .ok_or_else(|| EngineError::not_found("datum", id.0))
    }

    /// Fetch a variety or fail with `NotFound`
    pub fn require_variety(&self, id: VarietyId) -> Result<&Variety> {
        self.varieties
            .get(id)
            .ok_or_else(|| EngineError::not_found("variety", id.0))
    }

    /// Fetch a group or fail with `NotFound`
    pub fn require_group(&self, id: GroupId) -> Result<&Group> {
        self.groups
            .get(id)
            .ok_or_else(|| EngineError::not_found("group", id.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cognate_core::VectorError;

    fn sample() -> (Lexicon, ViewId, EntryId, DatumId) {
        let mut lexicon = Lexicon::new();
        let latin = lexicon.add_variety("Latin", "Lat").unwrap();
        let oscan = lexicon.add_variety("Oscan", "Osc").unwrap();
        let view = lexicon.add_view("Italic", &[latin, oscan]).unwrap();
        let entry = lexicon.add_entry("who").unwrap();
        let datum = lexicon.add_datum(entry, latin, "kʷis").unwrap();
        lexicon.add_datum(entry, oscan, "pis").unwrap();
        (lexicon, view, entry, datum)
    }

    #[test]
    fn test_align_creates_all_hold_record() {
        let (mut lexicon, view, _, datum) = sample();
        lexicon.align(view, datum).unwrap();
        let record = lexicon.alignment(view, datum).unwrap();
        assert_eq!(record.vector().to_string(), "====");
    }

    #[test]
    fn test_align_rejects_non_member() {
        let (mut lexicon, _, entry, _) = sample();
        let umbrian = lexicon.add_variety("Umbrian", "Umb").unwrap();
        let only_umbrian = lexicon.add_view("Umbrian", &[umbrian]).unwrap();
        let datum = lexicon.data_of(entry)[0];
        assert!(matches!(
            lexicon.align(only_umbrian, datum),
            Err(EngineError::Validation(_))
        ));
    }

    #[test]
    fn test_structural_text_rejected() {
        let (mut lexicon, _, entry, _) = sample();
        let latin = lexicon.variety_named("Lat").unwrap();
        assert!(matches!(
            lexicon.add_datum(entry, latin, "k=s"),
            Err(EngineError::Vector(VectorError::IllegalVectorCharacter { ch: '=', .. }))
        ));
    }

    #[test]
    fn test_pattern_characters_rejected() {
        let (mut lexicon, view, entry, datum) = sample();
        let latin = lexicon.variety_named("Lat").unwrap();
        for text in [".", "pa b", "a,b"] {
            assert!(matches!(
                lexicon.add_datum(entry, latin, text),
                Err(EngineError::Vector(VectorError::IllegalVectorCharacter { .. }))
            ));
        }
        lexicon.align(view, datum).unwrap();
        assert!(lexicon.insert_text(datum, 1, " ").is_err());
        assert_eq!(lexicon.datum(datum).unwrap().text, "kʷis");
    }

    #[test]
    fn test_insert_past_end_rejected() {
        let (mut lexicon, _, entry, _) = sample();
        let unaligned = lexicon.data_of(entry)[1];
        assert!(matches!(
            lexicon.insert_text(unaligned, 4, "s"),
            Err(EngineError::Validation(_))
        ));
        lexicon.insert_text(unaligned, 3, "s").unwrap();
        assert_eq!(lexicon.datum(unaligned).unwrap().text, "piss");
    }

    #[test]
    fn test_group_tags_unique_per_entry() {
        let (mut lexicon, view, entry, _) = sample();
        let first = lexicon.add_group(view, entry, "1").unwrap();
        assert!(lexicon.add_group(view, entry, "1").is_err());
        let second = lexicon.add_group(view, entry, "2").unwrap();
        assert_eq!(lexicon.groups_of(view, entry), vec![first, second]);
    }

    #[test]
    fn test_text_edits_follow_alignments() {
        let (mut lexicon, view, _, datum) = sample();
        lexicon.align(view, datum).unwrap();
        lexicon.insert_text(datum, 4, "que").unwrap();
        assert_eq!(lexicon.datum(datum).unwrap().text, "kʷisque");
        assert_eq!(lexicon.alignment(view, datum).unwrap().source(), "kʷisque");

        let removed = lexicon.delete_text(datum, 4, 3).unwrap();
        assert_eq!(removed, "que");
        assert_eq!(
            lexicon.alignment(view, datum).unwrap().vector().to_string(),
            "===="
        );
    }

    #[test]
    fn test_failed_text_edit_changes_nothing() {
        let (mut lexicon, view, _, datum) = sample();
        lexicon.align(view, datum).unwrap();
        let mut record = lexicon.alignment(view, datum).unwrap().clone();
        record.define_cluster(0, 2).unwrap();
        lexicon.put_alignment(view, record).unwrap();

        assert!(lexicon.insert_text(datum, 1, "x").is_err());
        assert_eq!(lexicon.datum(datum).unwrap().text, "kʷis");
    }

    #[test]
    fn test_remove_datum_drops_alignments() {
        let (mut lexicon, view, entry, datum) = sample();
        lexicon.align(view, datum).unwrap();
        lexicon.remove_datum(datum).unwrap();
        assert!(lexicon.alignment(view, datum).is_none());
        assert!(lexicon.records_for(view, entry).is_empty());
    }
}
