//! Core error types (deterministic only)

use crate::types::{DatumId, EntryId, GroupId, VarietyId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while decoding or editing an alignment vector.
///
/// Every operation returning one of these leaves its input untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum VectorError {
    /// Cluster markers are unbalanced or the vector does not match its text
    #[error("malformed vector: {reason}")]
    MalformedVector {
        /// What was wrong with the vector
        reason: String,
    },

    /// A new cluster intersects an existing one
    #[error("cluster [{start}, {end}) overlaps existing cluster [{existing_start}, {existing_end})")]
    Overlap {
        /// Start of the rejected span
        start: usize,
        /// End of the rejected span
        end: usize,
        /// Start of the span it collides with
        existing_start: usize,
        /// End of the span it collides with
        existing_end: usize,
    },

    /// An edit targets the interior of a cluster
    #[error("edit at position {position} would split cluster [{start}, {end})")]
    ClusterViolation {
        /// Offending position
        position: usize,
        /// Start of the protected span
        start: usize,
        /// End of the protected span
        end: usize,
    },

    /// A character that may not be typed into (or removed from) a vector
    #[error("illegal vector character {ch:?} at position {position}")]
    IllegalVectorCharacter {
        /// The rejected character
        ch: char,
        /// Where it was typed or found
        position: usize,
    },
}

impl VectorError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        VectorError::MalformedVector {
            reason: reason.into(),
        }
    }
}

/// Per-group failures reported by the threshold grouper.
///
/// These never abort the whole entry; the grouper collects them and moves on
/// to the next group.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GroupingError {
    /// One alignment of the group has a different number of positions
    #[error(
        "entry {entry} group {group}: datum {datum} has {found} positions, expected {expected}"
    )]
    LengthMismatch {
        /// Entry being tabulated
        entry: EntryId,
        /// Group that was skipped
        group: GroupId,
        /// Datum whose alignment disagreed
        datum: DatumId,
        /// Token count fixed by the first variety
        expected: usize,
        /// Token count of the offending alignment
        found: usize,
    },

    /// Several alignments compete for one (group, variety) slot
    #[error(
        "entry {} group {}: variety {} has {} candidate alignments",
        .entry,
        .group,
        .variety,
        .candidates.len()
    )]
    AmbiguousAlignment {
        /// Entry being tabulated
        entry: EntryId,
        /// Group the candidates belong to
        group: GroupId,
        /// Variety with more than one alignment
        variety: VarietyId,
        /// Competing data, in record order
        candidates: Vec<DatumId>,
    },

    /// A stored display string could not be tokenized
    #[error("entry {entry} group {group}: {source}")]
    Vector {
        /// Entry being tabulated
        entry: EntryId,
        /// Group that was skipped
        group: GroupId,
        /// Underlying codec failure
        #[source]
        source: VectorError,
    },
}

/// Result type for vector operations
pub type Result<T> = std::result::Result<T, VectorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlap_display() {
        let error = VectorError::Overlap {
            start: 1,
            end: 3,
            existing_start: 2,
            existing_end: 4,
        };
        assert_eq!(
            error.to_string(),
            "cluster [1, 3) overlaps existing cluster [2, 4)"
        );
    }

    #[test]
    fn test_length_mismatch_names_entry_and_group() {
        let error = GroupingError::LengthMismatch {
            entry: EntryId(7),
            group: GroupId(2),
            datum: DatumId(11),
            expected: 3,
            found: 4,
        };
        let message = error.to_string();
        assert!(message.contains("entry 7"));
        assert!(message.contains("group 2"));
        assert!(message.contains("expected"));
    }
}
