//! Read-only listing of the hierarchy

use crate::arena::{ClusterId, ProtosegmentId, SetId, ZoneId};
use crate::hierarchy::Hierarchy;
use crate::query::HierarchyQueries;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One correspondence set with its evidence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSummary {
    /// Handle
    pub id: SetId,
    /// Position within the cluster
    pub order: u32,
    /// Pattern in persisted form
    pub pattern: String,
    /// Number of citations
    pub citations: usize,
    /// Notes
    pub remarks: String,
}

/// One cluster with its sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterSummary {
    /// Handle
    pub id: ClusterId,
    /// Position within the protosegment
    pub order: u32,
    /// Conditioning environment
    pub environment: String,
    /// Sets by order
    pub sets: Vec<SetSummary>,
}

/// One protosegment with its clusters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtosegmentSummary {
    /// Handle
    pub id: ProtosegmentId,
    /// Label
    pub label: String,
    /// Notes
    pub remarks: String,
    /// Clusters by order
    pub clusters: Vec<ClusterSummary>,
}

/// One zone with its protosegments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSummary {
    /// Handle
    pub id: ZoneId,
    /// Name
    pub name: String,
    /// Protosegments in creation order
    pub protosegments: Vec<ProtosegmentSummary>,
}

/// Entity counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    /// Zones
    pub zones: usize,
    /// Protosegments
    pub protosegments: usize,
    /// Clusters
    pub clusters: usize,
    /// Correspondence sets
    pub sets: usize,
    /// Citations
    pub citations: usize,
}

/// The whole hierarchy as plain data
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Zones in creation order
    pub zones: Vec<ZoneSummary>,
    /// Entity counts
    pub totals: Totals,
}

impl Summary {
    /// List `hierarchy`; zones are summarized in parallel once there are at
    /// least `parallel_threshold` of them
    pub fn build(hierarchy: &Hierarchy, parallel_threshold: usize) -> Self {
        let zones = hierarchy.zones();

        #[cfg(feature = "parallel")]
        let zones: Vec<ZoneSummary> = if zones.len() >= parallel_threshold {
            zones
                .par_iter()
                .filter_map(|id| zone_summary(hierarchy, *id))
                .collect()
        } else {
            zones
                .iter()
                .filter_map(|id| zone_summary(hierarchy, *id))
                .collect()
        };

        #[cfg(not(feature = "parallel"))]
        let zones: Vec<ZoneSummary> = {
            let _ = parallel_threshold;
            zones
                .iter()
                .filter_map(|id| zone_summary(hierarchy, *id))
                .collect()
        };

        let mut totals = Totals {
            zones: zones.len(),
            citations: hierarchy.citation_count(),
            ..Totals::default()
        };
        for zone in &zones {
            totals.protosegments += zone.protosegments.len();
            for p in &zone.protosegments {
                totals.clusters += p.clusters.len();
                totals.sets += p.clusters.iter().map(|c| c.sets.len()).sum::<usize>();
            }
        }
        Self { zones, totals }
    }

    /// Find a protosegment by label
    pub fn protosegment(&self, label: &str) -> Option<&ProtosegmentSummary> {
        self.zones
            .iter()
            .flat_map(|z| z.protosegments.iter())
            .find(|p| p.label == label)
    }
}

fn zone_summary(hierarchy: &Hierarchy, id: ZoneId) -> Option<ZoneSummary> {
    let zone = hierarchy.zone(id)?;
    let protosegments = hierarchy
        .protosegments_in(id)
        .into_iter()
        .filter_map(|p| protosegment_summary(hierarchy, p))
        .collect();
    Some(ZoneSummary {
        id,
        name: zone.name.clone(),
        protosegments,
    })
}

fn protosegment_summary(hierarchy: &Hierarchy, id: ProtosegmentId) -> Option<ProtosegmentSummary> {
    let p = hierarchy.protosegment(id)?;
    let clusters = hierarchy
        .clusters_of(id)
        .into_iter()
        .filter_map(|c| {
            let cluster = hierarchy.cluster(c)?;
            let sets = hierarchy
                .sets_of(c)
                .into_iter()
                .filter_map(|s| {
                    let set = hierarchy.set(s)?;
                    Some(SetSummary {
                        id: s,
                        order: set.order,
                        pattern: set.pattern.to_string(),
                        citations: hierarchy.citations_of_set(s).len(),
                        remarks: set.remarks.clone(),
                    })
                })
                .collect();
            Some(ClusterSummary {
                id: c,
                order: cluster.order,
                environment: cluster.environment.clone(),
                sets,
            })
        })
        .collect();
    Some(ProtosegmentSummary {
        id,
        label: p.label.clone(),
        remarks: p.remarks.clone(),
        clusters,
    })
}
