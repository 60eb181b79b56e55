//! Threshold grouping of aligned data into correspondence patterns
//!
//! For one entry, each correspondence group is read column by column across
//! the member varieties of the view. Columns attested by too few varieties are
//! dropped. Groups form a priority list: the first group that keeps at least
//! one column wins, and groups that fail are reported, not fatal.

use crate::{
    alignment::AlignmentRecord,
    error::GroupingError,
    pattern::{Pattern, IGNORE},
    types::{DatumId, EntryId, GroupId, VarietyId},
    vector::{Tokens, EXCLUDE, INDEL},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// What to do when a (group, variety) slot has several alignments and the
/// caller supplied no choice for it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChoicePolicy {
    /// Use the first candidate and report the decision as pending
    #[default]
    FirstCandidate,
    /// Skip the group with an ambiguity error
    Strict,
}

/// Pre-resolved answers for ambiguous (group, variety) slots
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentChoices {
    chosen: BTreeMap<GroupId, BTreeMap<VarietyId, DatumId>>,
}

impl AlignmentChoices {
    /// No choices made
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `datum` is the alignment to use for (`group`, `variety`)
    pub fn choose(&mut self, group: GroupId, variety: VarietyId, datum: DatumId) -> &mut Self {
        self.chosen.entry(group).or_default().insert(variety, datum);
        self
    }

    /// The chosen datum, if any
    pub fn get(&self, group: GroupId, variety: VarietyId) -> Option<DatumId> {
        self.chosen.get(&group)?.get(&variety).copied()
    }

    /// Whether no choice was recorded
    pub fn is_empty(&self) -> bool {
        self.chosen.is_empty()
    }
}

/// A surviving column of a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidatePattern {
    /// Column index inside the group's alignment
    pub position: usize,
    /// One token per member variety
    pub pattern: Pattern,
}

/// An ambiguity settled by falling back to the first candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChoice {
    /// Group with the ambiguous slot
    pub group: GroupId,
    /// Variety with several alignments
    pub variety: VarietyId,
    /// Competing data, in record order
    pub candidates: Vec<DatumId>,
    /// The datum that was used
    pub used: DatumId,
}

/// Result of grouping one entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupingOutcome {
    /// Entry that was grouped
    pub entry: EntryId,
    /// Group whose columns survived, if any did
    pub group: Option<GroupId>,
    /// Surviving columns in position order
    pub patterns: Vec<CandidatePattern>,
    /// Groups skipped on the way, with the reason
    pub skipped: Vec<GroupingError>,
    /// Ambiguities the caller still has to confirm
    pub pending: Vec<PendingChoice>,
}

impl GroupingOutcome {
    fn empty(entry: EntryId) -> Self {
        Self {
            entry,
            group: None,
            patterns: Vec::new(),
            skipped: Vec::new(),
            pending: Vec::new(),
        }
    }

    /// Whether any pattern survived
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Column grouper with an attestation threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThresholdGrouper {
    threshold: usize,
    policy: ChoicePolicy,
}

impl ThresholdGrouper {
    /// Create a grouper keeping columns with at least `threshold` attested outcomes
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            policy: ChoicePolicy::default(),
        }
    }

    /// Set the ambiguity policy
    pub fn with_policy(mut self, policy: ChoicePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Minimum number of attested outcomes per column
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Ambiguity policy in use
    pub fn policy(&self) -> ChoicePolicy {
        self.policy
    }

    /// Group all alignments of one entry
    ///
    /// `members` is the ordered variety list of the view, `groups` the
    /// priority order of the entry's groups, `records` every alignment of the
    /// entry in the view. Records without a group are ignored.
    pub fn group(
        &self,
        entry: EntryId,
        members: &[VarietyId],
        groups: &[GroupId],
        records: &[AlignmentRecord],
        choices: &AlignmentChoices,
    ) -> GroupingOutcome {
        let mut outcome = GroupingOutcome::empty(entry);

        if records.len() < 2 {
            debug!(%entry, alignments = records.len(), "nothing to compare");
            return outcome;
        }

        for &group in groups {
            match self.group_columns(entry, group, members, records, choices) {
                Ok((patterns, pending)) if !patterns.is_empty() => {
                    debug!(%entry, %group, columns = patterns.len(), "group grouped");
                    outcome.group = Some(group);
                    outcome.patterns = patterns;
                    outcome.pending = pending;
                    return outcome;
                }
                Ok(_) => {
                    debug!(%entry, %group, threshold = self.threshold, "no column reached the threshold");
                }
                Err(err) => {
                    warn!(%entry, %group, "skipping group: {err}");
                    outcome.skipped.push(err);
                }
            }
        }

        outcome
    }

    fn group_columns(
        &self,
        entry: EntryId,
        group: GroupId,
        members: &[VarietyId],
        records: &[AlignmentRecord],
        choices: &AlignmentChoices,
    ) -> Result<(Vec<CandidatePattern>, Vec<PendingChoice>), GroupingError> {
        let mut pending = Vec::new();
        let mut rows: Vec<Option<Tokens>> = Vec::with_capacity(members.len());
        let mut len: Option<usize> = None;

        for &variety in members {
            let candidates: Vec<&AlignmentRecord> = records
                .iter()
                .filter(|r| r.group() == Some(group) && r.variety() == variety)
                .collect();

            let chosen = match candidates.as_slice() {
                [] => None,
                [only] => Some(*only),
                [first, ..] => {
                    let picked = choices
                        .get(group, variety)
                        .and_then(|datum| candidates.iter().find(|r| r.datum() == datum));
                    match (picked, self.policy) {
                        (Some(record), _) => Some(*record),
                        (None, ChoicePolicy::FirstCandidate) => {
                            pending.push(PendingChoice {
                                group,
                                variety,
                                candidates: candidates.iter().map(|r| r.datum()).collect(),
                                used: first.datum(),
                            });
                            Some(*first)
                        }
                        (None, ChoicePolicy::Strict) => {
                            return Err(GroupingError::AmbiguousAlignment {
                                entry,
                                group,
                                variety,
                                candidates: candidates.iter().map(|r| r.datum()).collect(),
                            });
                        }
                    }
                }
            };

            let Some(record) = chosen else {
                rows.push(None);
                continue;
            };

            let tokens = record
                .tokens()
                .map_err(|source| GroupingError::Vector {
                    entry,
                    group,
                    source,
                })?;

            match len {
                None => len = Some(tokens.len()),
                Some(expected) if expected != tokens.len() => {
                    return Err(GroupingError::LengthMismatch {
                        entry,
                        group,
                        datum: record.datum(),
                        expected,
                        found: tokens.len(),
                    });
                }
                Some(_) => {}
            }
            rows.push(Some(tokens));
        }

        let Some(len) = len else {
            return Ok((Vec::new(), pending));
        };

        let patterns = (0..len)
            .filter_map(|position| {
                let pattern = Pattern::new(rows.iter().map(|row| column_token(row, position)));
                let attested = pattern
                    .tokens()
                    .iter()
                    .filter(|t| t.as_str() != IGNORE && !is_indel(t))
                    .count();
                (attested >= self.threshold).then_some(CandidatePattern { position, pattern })
            })
            .collect();

        Ok((patterns, pending))
    }
}

fn is_indel(token: &str) -> bool {
    let mut chars = token.chars();
    chars.next() == Some(INDEL) && chars.next().is_none()
}

fn column_token(row: &Option<Tokens>, position: usize) -> String {
    match row.as_ref().and_then(|tokens| tokens.get(position)) {
        Some(token) if token.chars().eq(std::iter::once(EXCLUDE)) => IGNORE.to_string(),
        Some(token) => token.clone(),
        None => IGNORE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: VarietyId = VarietyId(1);
    const B: VarietyId = VarietyId(2);
    const C: VarietyId = VarietyId(3);

    fn aligned(datum: u32, variety: VarietyId, text: &str, group: u32) -> AlignmentRecord {
        let mut record = AlignmentRecord::new(DatumId(datum), variety, text).unwrap();
        record.set_group(Some(GroupId(group)));
        record
    }

    #[test]
    fn test_single_alignment_yields_nothing() {
        let records = vec![aligned(1, A, "pa", 1)];
        let outcome = ThresholdGrouper::new(1).group(
            EntryId(1),
            &[A, B],
            &[GroupId(1)],
            &records,
            &AlignmentChoices::new(),
        );
        assert!(outcome.is_empty());
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_missing_variety_is_ignored_column() {
        let records = vec![aligned(1, A, "pa", 1), aligned(2, C, "ba", 1)];
        let outcome = ThresholdGrouper::new(2).group(
            EntryId(1),
            &[A, B, C],
            &[GroupId(1)],
            &records,
            &AlignmentChoices::new(),
        );
        assert_eq!(outcome.group, Some(GroupId(1)));
        let rendered: Vec<String> = outcome
            .patterns
            .iter()
            .map(|c| c.pattern.to_string())
            .collect();
        assert_eq!(rendered, ["p,.,b", "a,.,a"]);
    }

    #[test]
    fn test_indel_does_not_count_towards_threshold() {
        let mut b = aligned(2, B, "a", 1);
        b.insert_gap(0, INDEL).unwrap();
        let records = vec![aligned(1, A, "pa", 1), b];
        let outcome = ThresholdGrouper::new(2).group(
            EntryId(1),
            &[A, B],
            &[GroupId(1)],
            &records,
            &AlignmentChoices::new(),
        );
        assert_eq!(outcome.patterns.len(), 1);
        assert_eq!(outcome.patterns[0].position, 1);
        assert_eq!(outcome.patterns[0].pattern.to_string(), "a,a");
    }

    #[test]
    fn test_excluded_position_becomes_wildcard() {
        let mut b = aligned(2, B, "a", 1);
        b.insert_gap(0, EXCLUDE).unwrap();
        let records = vec![aligned(1, A, "pa", 1), b];
        let outcome = ThresholdGrouper::new(1).group(
            EntryId(1),
            &[A, B],
            &[GroupId(1)],
            &records,
            &AlignmentChoices::new(),
        );
        assert_eq!(outcome.patterns[0].pattern.to_string(), "p,.");
    }

    #[test]
    fn test_ambiguity_falls_back_to_first_candidate() {
        let records = vec![
            aligned(1, A, "pa", 1),
            aligned(2, B, "ba", 1),
            aligned(3, B, "va", 1),
        ];
        let outcome = ThresholdGrouper::new(2).group(
            EntryId(1),
            &[A, B],
            &[GroupId(1)],
            &records,
            &AlignmentChoices::new(),
        );
        assert_eq!(outcome.patterns[0].pattern.to_string(), "p,b");
        assert_eq!(outcome.pending.len(), 1);
        assert_eq!(outcome.pending[0].candidates, vec![DatumId(2), DatumId(3)]);
    }

    #[test]
    fn test_ambiguity_uses_explicit_choice() {
        let records = vec![
            aligned(1, A, "pa", 1),
            aligned(2, B, "ba", 1),
            aligned(3, B, "va", 1),
        ];
        let mut choices = AlignmentChoices::new();
        choices.choose(GroupId(1), B, DatumId(3));
        let outcome = ThresholdGrouper::new(2).group(
            EntryId(1),
            &[A, B],
            &[GroupId(1)],
            &records,
            &choices,
        );
        assert_eq!(outcome.patterns[0].pattern.to_string(), "p,v");
        assert!(outcome.pending.is_empty());
    }

    #[test]
    fn test_strict_policy_skips_ambiguous_group() {
        let records = vec![
            aligned(1, A, "pa", 1),
            aligned(2, B, "ba", 1),
            aligned(3, B, "va", 1),
        ];
        let outcome = ThresholdGrouper::new(2)
            .with_policy(ChoicePolicy::Strict)
            .group(
                EntryId(1),
                &[A, B],
                &[GroupId(1)],
                &records,
                &AlignmentChoices::new(),
            );
        assert!(outcome.is_empty());
        assert!(matches!(
            outcome.skipped[0],
            GroupingError::AmbiguousAlignment { variety: B, .. }
        ));
    }

    #[test]
    fn test_group_without_survivors_falls_through_to_next() {
        let mut lost = AlignmentRecord::new(DatumId(2), B, "").unwrap();
        lost.insert_gap(0, INDEL).unwrap();
        lost.set_group(Some(GroupId(1)));
        let records = vec![
            aligned(1, A, "p", 1),
            lost,
            aligned(3, A, "pa", 2),
            aligned(4, B, "pa", 2),
        ];

        let outcome = ThresholdGrouper::new(2).group(
            EntryId(1),
            &[A, B],
            &[GroupId(1), GroupId(2)],
            &records,
            &AlignmentChoices::new(),
        );
        assert_eq!(outcome.group, Some(GroupId(2)));
        assert_eq!(outcome.patterns.len(), 2);

        let outcome = ThresholdGrouper::new(3).group(
            EntryId(1),
            &[A, B],
            &[GroupId(1), GroupId(2)],
            &records,
            &AlignmentChoices::new(),
        );
        assert_eq!(outcome.group, None);
        assert!(outcome.skipped.is_empty());
    }

    #[test]
    fn test_length_mismatch_skips_only_that_group() {
        let records = vec![
            aligned(1, A, "pa", 1),
            aligned(2, B, "pat", 1),
            aligned(3, A, "pa", 2),
            aligned(4, B, "ba", 2),
        ];
        let outcome = ThresholdGrouper::new(2).group(
            EntryId(9),
            &[A, B],
            &[GroupId(1), GroupId(2)],
            &records,
            &AlignmentChoices::new(),
        );
        assert_eq!(outcome.group, Some(GroupId(2)));
        assert!(matches!(
            outcome.skipped.as_slice(),
            [GroupingError::LengthMismatch {
                entry: EntryId(9),
                group: GroupId(1),
                expected: 2,
                found: 3,
                ..
            }]
        ));
    }
}
