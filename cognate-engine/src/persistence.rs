//! Persistence collaborator
//!
//! The engine never decides where entities live. Every committed step hands a
//! typed [`EntityRecord`] to a [`PersistenceBackend`]; the in-memory
//! [`MemoryStore`] is the default and keeps `serde_json` snapshots.

use crate::arena::{Arena, ArenaId, CitationId, ClusterId, ProtosegmentId, SetId, ViewId, ZoneId};
use crate::error::PersistenceError;
use crate::hierarchy::{
    Citation, Cluster, CorrespondenceSet, Hierarchy, Protosegment, Tracked, Zone,
};
use crate::lexicon::Group;
use cognate_core::{AlignmentRecord, DatumId, GroupId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::trace;

/// Address of a persisted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum EntityKey {
    /// A zone
    Zone(ZoneId),
    /// A protosegment
    Protosegment(ProtosegmentId),
    /// A cluster
    Cluster(ClusterId),
    /// A correspondence set
    Set(SetId),
    /// A citation
    Citation(CitationId),
    /// A group of alignments
    Group(GroupId),
    /// The alignment of one datum in one view
    Alignment(ViewId, DatumId),
}

impl EntityKey {
    /// Entity kind as used in messages
    pub fn kind(&self) -> &'static str {
        match self {
            EntityKey::Zone(_) => "zone",
            EntityKey::Protosegment(_) => "protosegment",
            EntityKey::Cluster(_) => "cluster",
            EntityKey::Set(_) => "set",
            EntityKey::Citation(_) => "citation",
            EntityKey::Group(_) => "group",
            EntityKey::Alignment(..) => "alignment",
        }
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKey::Zone(id) => write!(f, "zone {id}"),
            EntityKey::Protosegment(id) => write!(f, "protosegment {id}"),
            EntityKey::Cluster(id) => write!(f, "cluster {id}"),
            EntityKey::Set(id) => write!(f, "set {id}"),
            EntityKey::Citation(id) => write!(f, "citation {id}"),
            EntityKey::Group(id) => write!(f, "group {id}"),
            EntityKey::Alignment(view, datum) => write!(f, "alignment {datum} in view {view}"),
        }
    }
}

/// Snapshot of one entity handed to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EntityRecord {
    /// A zone
    Zone {
        /// Handle
        id: ZoneId,
        /// Current state
        zone: Zone,
    },
    /// A protosegment
    Protosegment {
        /// Handle
        id: ProtosegmentId,
        /// Current state
        protosegment: Protosegment,
    },
    /// A cluster
    Cluster {
        /// Handle
        id: ClusterId,
        /// Current state
        cluster: Cluster,
    },
    /// A correspondence set
    Set {
        /// Handle
        id: SetId,
        /// Current state
        set: CorrespondenceSet,
    },
    /// A citation
    Citation {
        /// Handle
        id: CitationId,
        /// Current state
        citation: Citation,
    },
    /// A group
    Group {
        /// Handle
        id: GroupId,
        /// Current state
        group: Group,
    },
    /// An alignment
    Alignment {
        /// View holding the alignment
        view: ViewId,
        /// Current state
        record: AlignmentRecord,
    },
}

impl EntityRecord {
    /// Key the record is stored under
    pub fn key(&self) -> EntityKey {
        match self {
            EntityRecord::Zone { id, .. } => EntityKey::Zone(*id),
            EntityRecord::Protosegment { id, .. } => EntityKey::Protosegment(*id),
            EntityRecord::Cluster { id, .. } => EntityKey::Cluster(*id),
            EntityRecord::Set { id, .. } => EntityKey::Set(*id),
            EntityRecord::Citation { id, .. } => EntityKey::Citation(*id),
            EntityRecord::Group { id, .. } => EntityKey::Group(*id),
            EntityRecord::Alignment { view, record } => EntityKey::Alignment(*view, record.datum()),
        }
    }
}

/// Capabilities of an entity kept in the [`Hierarchy`]
pub trait Persistent: Clone + PartialEq + Sized {
    /// Handle type
    type Id: ArenaId;

    /// Kind name used in messages
    const KIND: &'static str;

    /// Storage key for `id`
    fn key(id: Self::Id) -> EntityKey;

    /// Snapshot handed to the backend
    fn to_record(&self, id: Self::Id) -> EntityRecord;

    /// First validation problem in the current state, if any
    fn check_validation(&self, id: Self::Id, hierarchy: &Hierarchy) -> Option<String>;

    /// Arena holding entities of this kind
    fn arena(hierarchy: &Hierarchy) -> &Arena<Self::Id, Tracked<Self>>;

    /// Mutable arena holding entities of this kind
    fn arena_mut(hierarchy: &mut Hierarchy) -> &mut Arena<Self::Id, Tracked<Self>>;
}

/// Storage the engine commits each step to
pub trait PersistenceBackend: Send {
    /// Store (insert or overwrite) a record
    fn save(&mut self, record: &EntityRecord) -> Result<(), PersistenceError>;

    /// Forget the record stored under `key`
    fn delete(&mut self, key: EntityKey) -> Result<(), PersistenceError>;
}

/// In-memory backend keeping JSON snapshots of every committed entity
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    records: BTreeMap<EntityKey, serde_json::Value>,
    writes: usize,
    fail_after: Option<usize>,
    fail_kind: Option<&'static str>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write after the first `writes` successful ones fail
    pub fn fail_after(mut self, writes: usize) -> Self {
        self.fail_after = Some(writes);
        self
    }

    /// Make every write to entities of `kind` fail
    pub fn fail_kind(mut self, kind: &'static str) -> Self {
        self.fail_kind = Some(kind);
        self
    }

    /// Stored snapshot for `key`
    pub fn get(&self, key: &EntityKey) -> Option<&serde_json::Value> {
        self.records.get(key)
    }

    /// Whether a snapshot is stored for `key`
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.records.contains_key(key)
    }

    /// Number of stored snapshots
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of successful writes (saves and deletes)
    pub fn writes(&self) -> usize {
        self.writes
    }

    fn check_write(&self, key: &EntityKey) -> Result<(), PersistenceError> {
        let exhausted = self.fail_after.is_some_and(|limit| self.writes >= limit);
        let blocked = self.fail_kind.is_some_and(|kind| kind == key.kind());
        if exhausted || blocked {
            return Err(PersistenceError::Rejected {
                key: key.to_string(),
                reason: "store is refusing writes".to_string(),
            });
        }
        Ok(())
    }
}

impl PersistenceBackend for MemoryStore {
    fn save(&mut self, record: &EntityRecord) -> Result<(), PersistenceError> {
        let key = record.key();
        self.check_write(&key)?;
        let value = serde_json::to_value(record).map_err(|e| PersistenceError::Serialization {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        trace!(%key, "saved");
        self.records.insert(key, value);
        self.writes += 1;
        Ok(())
    }

    fn delete(&mut self, key: EntityKey) -> Result<(), PersistenceError> {
        self.check_write(&key)?;
        trace!(%key, "deleted");
        self.records.remove(&key);
        self.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_record(id: u32) -> EntityRecord {
        EntityRecord::Zone {
            id: ZoneId(id),
            zone: Zone {
                name: "stops".to_string(),
            },
        }
    }

    #[test]
    fn test_save_and_delete() {
        let mut store = MemoryStore::new();
        store.save(&zone_record(1)).unwrap();
        assert!(store.contains(&EntityKey::Zone(ZoneId(1))));
        assert_eq!(
            store.get(&EntityKey::Zone(ZoneId(1))).unwrap()["kind"],
            "zone"
        );

        store.delete(EntityKey::Zone(ZoneId(1))).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn test_fail_after() {
        let mut store = MemoryStore::new().fail_after(1);
        store.save(&zone_record(1)).unwrap();
        let error = store.save(&zone_record(2)).unwrap_err();
        assert!(matches!(error, PersistenceError::Rejected { .. }));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_fail_kind() {
        let mut store = MemoryStore::new().fail_kind("cluster");
        store.save(&zone_record(1)).unwrap();
        assert!(store.delete(EntityKey::Cluster(ClusterId(1))).is_err());
    }

    #[test]
    fn test_key_display() {
        assert_eq!(
            EntityKey::Alignment(ViewId(1), DatumId(4)).to_string(),
            "alignment 4 in view 1"
        );
    }
}
