//! Correspondence hierarchy, tabulation and refinement
//!
//! This crate turns grouped alignments into a hierarchy of zones,
//! protosegments, environment-conditioned clusters and correspondence sets,
//! and restructures that hierarchy while keeping sibling orders contiguous.
//! Every change is committed entity by entity through a pluggable
//! [`PersistenceBackend`].

#![warn(missing_docs)]

pub mod arena;
pub mod config;
pub mod error;
pub mod hierarchy;
pub mod lexicon;
pub mod persistence;
pub mod query;
mod refine;
pub mod schema;
pub mod summary;
pub mod workbench;

// Re-export key types
pub use arena::{Arena, ArenaId, CitationId, ClusterId, ProtosegmentId, SetId, ViewId, ZoneId};
pub use config::{EngineConfig, EngineConfigBuilder};
pub use error::{EngineError, PersistenceError, Result};
pub use hierarchy::{Citation, Cluster, CorrespondenceSet, Hierarchy, Protosegment, Tracked, Zone};
pub use lexicon::{Datum, Entry, Group, GroupKey, Lexicon, Variety, View};
pub use persistence::{EntityKey, EntityRecord, MemoryStore, PersistenceBackend, Persistent};
pub use query::HierarchyQueries;
pub use summary::Summary;
pub use workbench::{
    Assignment, MoveOutcome, Placement, Project, Refresh, TabulationReport, TabulationRequest,
    Workbench,
};

// Re-export from core for convenience
pub use cognate_core::{
    AlignmentChoices, AlignmentRecord, ChoicePolicy, DatumId, EntryId, GroupId, GroupingOutcome,
    Pattern, VarietyId,
};
