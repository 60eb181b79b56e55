//! The correspondence hierarchy
//!
//! Zones own protosegments, protosegments own ordered clusters, clusters own
//! ordered correspondence sets and sets own citations. Ownership is recorded
//! on the child only (a cluster knows its protosegment), so removing a child
//! never leaves a dangling list behind. Each node is wrapped in [`Tracked`]
//! and moves through save/revert/delete against a
//! [`PersistenceBackend`].

mod entities;
mod tracked;

pub use entities::{
    check_environment, check_pattern, Citation, Cluster, CorrespondenceSet, Protosegment, Zone,
};
pub use tracked::Tracked;

use crate::arena::{Arena, ArenaId, CitationId, ClusterId, ProtosegmentId, SetId, ZoneId};
use crate::error::{EngineError, Result};
use crate::persistence::{PersistenceBackend, Persistent};
use crate::query::HierarchyQueries;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Arena-backed hierarchy of zones down to citations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Hierarchy {
    #[serde(default)]
    pub(crate) zones: Arena<ZoneId, Tracked<Zone>>,
    #[serde(default)]
    pub(crate) protosegments: Arena<ProtosegmentId, Tracked<Protosegment>>,
    #[serde(default)]
    pub(crate) clusters: Arena<ClusterId, Tracked<Cluster>>,
    #[serde(default)]
    pub(crate) sets: Arena<SetId, Tracked<CorrespondenceSet>>,
    #[serde(default)]
    pub(crate) citations: Arena<CitationId, Tracked<Citation>>,
}

impl Hierarchy {
    /// Create an empty hierarchy
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of any entity
    pub fn get<T: Persistent>(&self, id: T::Id) -> Option<&T> {
        T::arena(self).get(id).map(Tracked::current)
    }

    /// Look up a zone
    pub fn zone(&self, id: ZoneId) -> Option<&Zone> {
        self.get(id)
    }

    /// Look up a protosegment
    pub fn protosegment(&self, id: ProtosegmentId) -> Option<&Protosegment> {
        self.get(id)
    }

    /// Look up a cluster
    pub fn cluster(&self, id: ClusterId) -> Option<&Cluster> {
        self.get(id)
    }

    /// Look up a correspondence set
    pub fn set(&self, id: SetId) -> Option<&CorrespondenceSet> {
        self.get(id)
    }

    /// Look up a citation
    pub fn citation(&self, id: CitationId) -> Option<&Citation> {
        self.get(id)
    }

    /// All zones in creation order
    pub fn zones(&self) -> Vec<ZoneId> {
        self.zones.ids()
    }

    /// Find a zone by name
    pub fn zone_named(&self, name: &str) -> Option<ZoneId> {
        self.zones
            .iter()
            .find(|(_, zone)| zone.current().name == name)
            .map(|(id, _)| id)
    }

    /// Find a protosegment by label in any zone
    pub fn protosegment_labelled(&self, label: &str) -> Option<ProtosegmentId> {
        self.protosegments
            .iter()
            .find(|(_, p)| p.current().label == label)
            .map(|(id, _)| id)
    }

    /// Number of live citations
    pub fn citation_count(&self) -> usize {
        self.citations.len()
    }

    /// Fetch an entity or fail with `NotFound`
    pub fn require<T: Persistent>(&self, id: T::Id) -> Result<&T> {
        self.get(id)
            .ok_or_else(|| EngineError::not_found(T::KIND, id_number(id)))
    }

    /// Whether the entity differs from its last saved state
    pub fn is_dirty<T: Persistent>(&self, id: T::Id) -> bool {
        T::arena(self).get(id).is_some_and(Tracked::is_dirty)
    }

    /// Validation problem of the entity's current state, if any
    pub fn check_validation<T: Persistent>(&self, id: T::Id) -> Option<String> {
        self.get::<T>(id)
            .and_then(|node| node.check_validation(id, self))
    }

    /// Add an unsaved node
    pub(crate) fn insert<T: Persistent>(&mut self, value: T) -> T::Id {
        T::arena_mut(self).insert(Tracked::unsaved(value))
    }

    /// Edit a node in memory; nothing is persisted until [`Hierarchy::save`]
    pub(crate) fn modify<T, F>(&mut self, id: T::Id, edit: F) -> Result<()>
    where
        T: Persistent,
        F: FnOnce(&mut T),
    {
        let node = T::arena_mut(self)
            .get_mut(id)
            .ok_or_else(|| EngineError::not_found(T::KIND, id_number(id)))?;
        edit(node.current_mut());
        Ok(())
    }

    /// Validate and persist one entity
    ///
    /// On a validation or backend failure the entity is reverted to its last
    /// saved state (or dropped if it was never saved) and the error returned.
    pub fn save<T: Persistent>(
        &mut self,
        id: T::Id,
        backend: &mut dyn PersistenceBackend,
    ) -> Result<()> {
        let node = T::arena(self)
            .get(id)
            .ok_or_else(|| EngineError::not_found(T::KIND, id_number(id)))?;
        let problem = node.current().check_validation(id, self);
        let pending = node.is_dirty().then(|| node.current().to_record(id));

        if let Some(problem) = problem {
            warn!(kind = T::KIND, %id, %problem, "validation failed, reverting");
            self.revert::<T>(id);
            return Err(EngineError::Validation(problem));
        }
        let Some(record) = pending else {
            return Ok(());
        };
        if let Err(e) = backend.save(&record) {
            warn!(kind = T::KIND, %id, error = %e, "save failed, reverting");
            self.revert::<T>(id);
            return Err(e.into());
        }
        if let Some(node) = T::arena_mut(self).get_mut(id) {
            node.mark_saved();
        }
        debug!(kind = T::KIND, %id, "saved");
        Ok(())
    }

    /// Discard unsaved changes; a never-saved node is dropped
    pub fn revert<T: Persistent>(&mut self, id: T::Id) {
        let arena = T::arena_mut(self);
        let keep = arena.get_mut(id).is_some_and(Tracked::revert);
        if !keep {
            arena.remove(id);
        }
    }

    /// Remove an entity from memory and from the backend
    ///
    /// If the backend refuses, the entity is restored in its last saved state.
    pub fn delete<T: Persistent>(
        &mut self,
        id: T::Id,
        backend: &mut dyn PersistenceBackend,
    ) -> Result<()> {
        let mut node = T::arena_mut(self)
            .remove(id)
            .ok_or_else(|| EngineError::not_found(T::KIND, id_number(id)))?;
        if node.is_new() {
            return Ok(());
        }
        if let Err(e) = backend.delete(T::key(id)) {
            warn!(kind = T::KIND, %id, error = %e, "delete failed, restoring");
            node.revert();
            T::arena_mut(self).restore(id, node);
            return Err(e.into());
        }
        debug!(kind = T::KIND, %id, "deleted");
        Ok(())
    }

    /// Structural problems: dangling references and order gaps
    pub fn check_invariants(&self) -> Vec<String> {
        let mut problems = Vec::new();

        for zone in self.zones() {
            for p in self.protosegments_in(zone) {
                let clusters = self.clusters_of(p);
                problems.extend(order_gaps(
                    &format!("protosegment {p}"),
                    clusters.iter().filter_map(|c| self.cluster(*c).map(|c| c.order)),
                ));
                for c in clusters {
                    let sets = self.sets_of(c);
                    if sets.is_empty() {
                        problems.push(format!("cluster {c} has no correspondence sets"));
                    }
                    problems.extend(order_gaps(
                        &format!("cluster {c}"),
                        sets.iter().filter_map(|s| self.set(*s).map(|s| s.order)),
                    ));
                }
            }
        }

        let zones = &self.zones;
        let protosegments = &self.protosegments;
        let clusters = &self.clusters;
        let sets = &self.sets;
        problems.extend(dangling("protosegment", protosegments, |p| zones.contains(p.zone)));
        problems.extend(dangling("cluster", clusters, |c| protosegments.contains(c.protosegment)));
        problems.extend(dangling("set", sets, |s| clusters.contains(s.cluster)));
        problems.extend(dangling("citation", &self.citations, |c| sets.contains(c.set)));

        for (id, node) in self.protosegments.iter() {
            let p = node.current();
            if !self.protosegments_labelled(p.zone, &p.label, Some(id)).is_empty() {
                problems.push(format!("protosegment {id} label {:?} is not unique", p.label));
            }
        }
        problems
    }
}

fn id_number<I: ArenaId>(id: I) -> u32 {
    id.index().wrapping_add(1) as u32
}

fn order_gaps(owner: &str, orders: impl Iterator<Item = u32>) -> Option<String> {
    let orders: Vec<u32> = orders.collect();
    let contiguous = orders.iter().zip(1u32..).all(|(order, want)| *order == want);
    (!contiguous).then(|| format!("{owner} has non-contiguous orders {orders:?}"))
}

fn dangling<I: ArenaId, T>(
    kind: &str,
    arena: &Arena<I, Tracked<T>>,
    parent_live: impl Fn(&T) -> bool,
) -> Vec<String>
where
    T: Clone + PartialEq,
{
    arena
        .iter()
        .filter(|(_, node)| !parent_live(node.current()))
        .map(|(id, _)| format!("{kind} {id} refers to a missing parent"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{EntityKey, MemoryStore};
    use cognate_core::Pattern;

    fn zone(h: &mut Hierarchy, store: &mut MemoryStore, name: &str) -> ZoneId {
        let id = h.insert(Zone {
            name: name.to_string(),
        });
        h.save::<Zone>(id, store).unwrap();
        id
    }

    #[test]
    fn test_save_marks_clean() {
        let mut h = Hierarchy::new();
        let mut store = MemoryStore::new();
        let z = h.insert(Zone {
            name: "stops".to_string(),
        });
        assert!(h.is_dirty::<Zone>(z));
        h.save::<Zone>(z, &mut store).unwrap();
        assert!(!h.is_dirty::<Zone>(z));
        assert!(store.contains(&EntityKey::Zone(z)));
    }

    #[test]
    fn test_clean_save_does_not_write() {
        let mut h = Hierarchy::new();
        let mut store = MemoryStore::new();
        let z = zone(&mut h, &mut store, "stops");
        h.save::<Zone>(z, &mut store).unwrap();
        assert_eq!(store.writes(), 1);
    }

    #[test]
    fn test_validation_failure_drops_new_node() {
        let mut h = Hierarchy::new();
        let mut store = MemoryStore::new();
        let z = h.insert(Zone {
            name: " stops".to_string(),
        });
        let error = h.save::<Zone>(z, &mut store).unwrap_err();
        assert!(matches!(error, EngineError::Validation(_)));
        assert!(h.zone(z).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_backend_failure_reverts_edit() {
        let mut h = Hierarchy::new();
        let mut store = MemoryStore::new();
        let z = zone(&mut h, &mut store, "stops");
        let mut failing = MemoryStore::new().fail_after(0);
        h.modify::<Zone, _>(z, |zone| zone.name = "vowels".to_string())
            .unwrap();
        let error = h.save::<Zone>(z, &mut failing).unwrap_err();
        assert!(matches!(error, EngineError::Persistence(_)));
        assert_eq!(h.zone(z).unwrap().name, "stops");
    }

    #[test]
    fn test_delete_failure_restores_node() {
        let mut h = Hierarchy::new();
        let mut store = MemoryStore::new();
        let z = zone(&mut h, &mut store, "stops");
        let mut failing = MemoryStore::new().fail_kind("zone");
        assert!(h.delete::<Zone>(z, &mut failing).is_err());
        assert_eq!(h.zone(z).unwrap().name, "stops");
        h.delete::<Zone>(z, &mut store).unwrap();
        assert!(h.zone(z).is_none());
        assert!(!store.contains(&EntityKey::Zone(z)));
    }

    #[test]
    fn test_duplicate_zone_name_rejected() {
        let mut h = Hierarchy::new();
        let mut store = MemoryStore::new();
        zone(&mut h, &mut store, "stops");
        let dup = h.insert(Zone {
            name: "stops".to_string(),
        });
        assert!(h.check_validation::<Zone>(dup).is_some());
    }

    #[test]
    fn test_invariants_report_gaps() {
        let mut h = Hierarchy::new();
        let mut store = MemoryStore::new();
        let z = zone(&mut h, &mut store, "stops");
        let p = h.insert(Protosegment {
            zone: z,
            label: "*p".to_string(),
            remarks: String::new(),
        });
        let c = h.insert(Cluster {
            protosegment: p,
            environment: "#_".to_string(),
            order: 2,
        });
        h.insert(CorrespondenceSet {
            cluster: c,
            pattern: Pattern::new(["p", "p"]),
            order: 1,
            remarks: String::new(),
        });
        let problems = h.check_invariants();
        assert_eq!(problems.len(), 1);
        assert!(problems[0].contains("non-contiguous"));
    }
}
