//! Named lookups over the hierarchy
//!
//! Refinement operations turn these rows into candidate lists. All results
//! are owned handles, sorted the way callers list them (by order where the
//! entity has one, otherwise by creation).

use crate::arena::{CitationId, ClusterId, ProtosegmentId, SetId, ZoneId};
use crate::hierarchy::Hierarchy;
use cognate_core::GroupId;

/// Typed query collaborator
pub trait HierarchyQueries {
    /// Protosegments of a zone, in creation order
    fn protosegments_in(&self, zone: ZoneId) -> Vec<ProtosegmentId>;

    /// Protosegments of `zone` labelled `label`, optionally excluding one
    fn protosegments_labelled(
        &self,
        zone: ZoneId,
        label: &str,
        excluding: Option<ProtosegmentId>,
    ) -> Vec<ProtosegmentId>;

    /// Clusters of a protosegment by order
    fn clusters_of(&self, protosegment: ProtosegmentId) -> Vec<ClusterId>;

    /// Clusters of a protosegment with the given environment, by order
    fn clusters_at(&self, protosegment: ProtosegmentId, environment: &str) -> Vec<ClusterId>;

    /// Correspondence sets of a cluster by order
    fn sets_of(&self, cluster: ClusterId) -> Vec<SetId>;

    /// Citations supporting a set
    fn citations_of_set(&self, set: SetId) -> Vec<CitationId>;

    /// Citations produced by tabulating a group
    fn citations_of_group(&self, group: GroupId) -> Vec<CitationId>;

    /// Highest cluster order under a protosegment (0 when it has none)
    fn max_cluster_order(&self, protosegment: ProtosegmentId) -> u32;

    /// Highest set order under a cluster (0 when it has none)
    fn max_set_order(&self, cluster: ClusterId) -> u32;
}

impl HierarchyQueries for Hierarchy {
    fn protosegments_in(&self, zone: ZoneId) -> Vec<ProtosegmentId> {
        self.protosegments
            .iter()
            .filter(|(_, p)| p.current().zone == zone)
            .map(|(id, _)| id)
            .collect()
    }

    fn protosegments_labelled(
        &self,
        zone: ZoneId,
        label: &str,
        excluding: Option<ProtosegmentId>,
    ) -> Vec<ProtosegmentId> {
        self.protosegments
            .iter()
            .filter(|(id, p)| {
                Some(*id) != excluding && p.current().zone == zone && p.current().label == label
            })
            .map(|(id, _)| id)
            .collect()
    }

    fn clusters_of(&self, protosegment: ProtosegmentId) -> Vec<ClusterId> {
        let mut rows: Vec<(u32, ClusterId)> = self
            .clusters
            .iter()
            .filter(|(_, c)| c.current().protosegment == protosegment)
            .map(|(id, c)| (c.current().order, id))
            .collect();
        rows.sort_unstable();
        rows.into_iter().map(|(_, id)| id).collect()
    }

    fn clusters_at(&self, protosegment: ProtosegmentId, environment: &str) -> Vec<ClusterId> {
        self.clusters_of(protosegment)
            .into_iter()
            .filter(|id| self.cluster(*id).is_some_and(|c| c.environment == environment))
            .collect()
    }

    fn sets_of(&self, cluster: ClusterId) -> Vec<SetId> {
        let mut rows: Vec<(u32, SetId)> = self
            .sets
            .iter()
            .filter(|(_, s)| s.current().cluster == cluster)
            .map(|(id, s)| (s.current().order, id))
            .collect();
        rows.sort_unstable();
        rows.into_iter().map(|(_, id)| id).collect()
    }

    fn citations_of_set(&self, set: SetId) -> Vec<CitationId> {
        self.citations
            .iter()
            .filter(|(_, c)| c.current().set == set)
            .map(|(id, _)| id)
            .collect()
    }

    fn citations_of_group(&self, group: GroupId) -> Vec<CitationId> {
        self.citations
            .iter()
            .filter(|(_, c)| c.current().group == group)
            .map(|(id, _)| id)
            .collect()
    }

    fn max_cluster_order(&self, protosegment: ProtosegmentId) -> u32 {
        self.clusters_of(protosegment)
            .iter()
            .filter_map(|id| self.cluster(*id).map(|c| c.order))
            .max()
            .unwrap_or(0)
    }

    fn max_set_order(&self, cluster: ClusterId) -> u32 {
        self.sets_of(cluster)
            .iter()
            .filter_map(|id| self.set(*id).map(|s| s.order))
            .max()
            .unwrap_or(0)
    }
}
