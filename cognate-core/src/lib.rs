//! Alignment vectors and threshold grouping for the comparative method
//!
//! This crate holds the deterministic core of cognate: the encoding of an
//! aligned datum as a vector over a five-symbol alphabet, the grapheme-cluster
//! spans layered on top of it, and the grouper that reads the aligned forms of
//! one lexical entry column by column into correspondence patterns.
//!
//! # Example
//!
//! ```rust
//! use cognate_core::{AlignmentRecord, AlignmentChoices, DatumId, EntryId, GroupId, ThresholdGrouper, VarietyId};
//!
//! let mut latin = AlignmentRecord::new(DatumId(1), VarietyId(1), "kʷis").unwrap();
//! latin.define_cluster(0, 2).unwrap();
//! latin.set_group(Some(GroupId(1)));
//!
//! let mut greek = AlignmentRecord::new(DatumId(2), VarietyId(2), "tis").unwrap();
//! greek.set_group(Some(GroupId(1)));
//!
//! let outcome = ThresholdGrouper::new(2).group(
//!     EntryId(1),
//!     &[VarietyId(1), VarietyId(2)],
//!     &[GroupId(1)],
//!     &[latin, greek],
//!     &AlignmentChoices::new(),
//! );
//! assert_eq!(outcome.patterns[0].pattern.to_string(), "kʷ,t");
//! ```

#![warn(missing_docs)]

pub mod alignment;
pub mod error;
pub mod grouper;
pub mod pattern;
pub mod types;
pub mod vector;

// Re-export key types
pub use alignment::{AlignmentData, AlignmentRecord};
pub use error::{GroupingError, Result, VectorError};
pub use grouper::{
    AlignmentChoices, CandidatePattern, ChoicePolicy, GroupingOutcome, PendingChoice,
    ThresholdGrouper,
};
pub use pattern::{conformable, identical, Pattern, IGNORE};
pub use types::{ClusterSpan, DatumId, Direction, EntryId, GroupId, VarietyId};
pub use vector::{AlignedVector, Slot, Tokens};
