//! Zones, protosegments, clusters, correspondence sets and citations

use super::{Hierarchy, Tracked};
use crate::arena::{Arena, CitationId, ClusterId, ProtosegmentId, SetId, ZoneId};
use crate::persistence::{EntityKey, EntityRecord, Persistent};
use crate::query::HierarchyQueries;
use crate::schema::{validate, FieldCheck, Rule};
use cognate_core::{GroupId, Pattern};
use serde::{Deserialize, Serialize};

const NAME: &[Rule] = &[Rule::Required, Rule::NoSurroundingSpace];
const ORDER: &[Rule] = &[Rule::Range {
    min: 1,
    max: u32::MAX as i64,
}];
const ENVIRONMENT: &[Rule] = &[
    Rule::Required,
    Rule::NoSurroundingSpace,
    Rule::Pattern {
        regex: r"^[^_]*_[^_]*$",
        description: "must mark the segment position with exactly one '_'",
    },
];
const PATTERN: &[Rule] = &[
    Rule::Required,
    Rule::Pattern {
        regex: r"^[^,\s]+(,[^,\s]+)*$",
        description: "must be comma-separated tokens",
    },
];
const POSITION: &[Rule] = &[Rule::Range {
    min: 0,
    max: u32::MAX as i64,
}];

/// Top-level bucket of protosegments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    /// Unique name
    pub name: String,
}

/// A reconstructed ancestral segment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protosegment {
    /// Owning zone
    pub zone: ZoneId,
    /// Label, unique within the zone
    pub label: String,
    /// Free-form notes
    #[serde(default)]
    pub remarks: String,
}

/// Environment-conditioned grouping of correspondence sets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    /// Owning protosegment
    pub protosegment: ProtosegmentId,
    /// Conditioning environment, e.g. `#_a`
    pub environment: String,
    /// Position among the protosegment's clusters, from 1
    pub order: u32,
}

/// A correspondence pattern attested by one or more citations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrespondenceSet {
    /// Owning cluster
    pub cluster: ClusterId,
    /// Pattern over the view's member varieties
    pub pattern: Pattern,
    /// Position among the cluster's sets, from 1
    pub order: u32,
    /// Free-form notes
    #[serde(default)]
    pub remarks: String,
}

/// Evidence linking a set to one column of a tabulated group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// Set the evidence supports
    pub set: SetId,
    /// Group the column came from
    pub group: GroupId,
    /// Column position within the group's alignments
    pub position: usize,
}

/// Validation problem of an environment string, if any
pub fn check_environment(environment: &str) -> Option<String> {
    validate(
        Cluster::KIND,
        &[FieldCheck::text("environment", environment, ENVIRONMENT)],
    )
}

/// Validation problem of a correspondence pattern, if any
pub fn check_pattern(pattern: &Pattern) -> Option<String> {
    let text = pattern.to_string();
    validate(
        CorrespondenceSet::KIND,
        &[FieldCheck::text("pattern", &text, PATTERN)],
    )
}

fn missing(kind: &str, id: impl std::fmt::Display) -> Option<String> {
    Some(format!("{kind} {id} does not exist"))
}

impl Persistent for Zone {
    type Id = ZoneId;
    const KIND: &'static str = "zone";

    fn key(id: ZoneId) -> EntityKey {
        EntityKey::Zone(id)
    }

    fn to_record(&self, id: ZoneId) -> EntityRecord {
        EntityRecord::Zone {
            id,
            zone: self.clone(),
        }
    }

    fn check_validation(&self, id: ZoneId, hierarchy: &Hierarchy) -> Option<String> {
        if let Some(problem) = validate(Self::KIND, &[FieldCheck::text("name", &self.name, NAME)]) {
            return Some(problem);
        }
        let taken = hierarchy
            .zones()
            .into_iter()
            .filter(|other| *other != id)
            .any(|other| hierarchy.zone(other).is_some_and(|z| z.name == self.name));
        taken.then(|| format!("zone.name: {:?} is already in use", self.name))
    }

    fn arena(hierarchy: &Hierarchy) -> &Arena<ZoneId, Tracked<Self>> {
        &hierarchy.zones
    }

    fn arena_mut(hierarchy: &mut Hierarchy) -> &mut Arena<ZoneId, Tracked<Self>> {
        &mut hierarchy.zones
    }
}

impl Persistent for Protosegment {
    type Id = ProtosegmentId;
    const KIND: &'static str = "protosegment";

    fn key(id: ProtosegmentId) -> EntityKey {
        EntityKey::Protosegment(id)
    }

    fn to_record(&self, id: ProtosegmentId) -> EntityRecord {
        EntityRecord::Protosegment {
            id,
            protosegment: self.clone(),
        }
    }

    fn check_validation(&self, id: ProtosegmentId, hierarchy: &Hierarchy) -> Option<String> {
        if hierarchy.zone(self.zone).is_none() {
            return missing("zone", self.zone);
        }
        if let Some(problem) =
            validate(Self::KIND, &[FieldCheck::text("label", &self.label, NAME)])
        {
            return Some(problem);
        }
        let clashes = hierarchy.protosegments_labelled(self.zone, &self.label, Some(id));
        (!clashes.is_empty()).then(|| {
            format!(
                "protosegment.label: {:?} is already used in zone {}",
                self.label, self.zone
            )
        })
    }

    fn arena(hierarchy: &Hierarchy) -> &Arena<ProtosegmentId, Tracked<Self>> {
        &hierarchy.protosegments
    }

    fn arena_mut(hierarchy: &mut Hierarchy) -> &mut Arena<ProtosegmentId, Tracked<Self>> {
        &mut hierarchy.protosegments
    }
}

impl Persistent for Cluster {
    type Id = ClusterId;
    const KIND: &'static str = "cluster";

    fn key(id: ClusterId) -> EntityKey {
        EntityKey::Cluster(id)
    }

    fn to_record(&self, id: ClusterId) -> EntityRecord {
        EntityRecord::Cluster {
            id,
            cluster: self.clone(),
        }
    }

    fn check_validation(&self, _id: ClusterId, hierarchy: &Hierarchy) -> Option<String> {
        if hierarchy.protosegment(self.protosegment).is_none() {
            return missing("protosegment", self.protosegment);
        }
        validate(
            Self::KIND,
            &[
                FieldCheck::text("environment", &self.environment, ENVIRONMENT),
                FieldCheck::number("order", i64::from(self.order), ORDER),
            ],
        )
    }

    fn arena(hierarchy: &Hierarchy) -> &Arena<ClusterId, Tracked<Self>> {
        &hierarchy.clusters
    }

    fn arena_mut(hierarchy: &mut Hierarchy) -> &mut Arena<ClusterId, Tracked<Self>> {
        &mut hierarchy.clusters
    }
}

impl Persistent for CorrespondenceSet {
    type Id = SetId;
    const KIND: &'static str = "set";

    fn key(id: SetId) -> EntityKey {
        EntityKey::Set(id)
    }

    fn to_record(&self, id: SetId) -> EntityRecord {
        EntityRecord::Set {
            id,
            set: self.clone(),
        }
    }

    fn check_validation(&self, _id: SetId, hierarchy: &Hierarchy) -> Option<String> {
        if hierarchy.cluster(self.cluster).is_none() {
            return missing("cluster", self.cluster);
        }
        let pattern = self.pattern.to_string();
        validate(
            Self::KIND,
            &[
                FieldCheck::text("pattern", &pattern, PATTERN),
                FieldCheck::number("order", i64::from(self.order), ORDER),
            ],
        )
    }

    fn arena(hierarchy: &Hierarchy) -> &Arena<SetId, Tracked<Self>> {
        &hierarchy.sets
    }

    fn arena_mut(hierarchy: &mut Hierarchy) -> &mut Arena<SetId, Tracked<Self>> {
        &mut hierarchy.sets
    }
}

impl Persistent for Citation {
    type Id = CitationId;
    const KIND: &'static str = "citation";

    fn key(id: CitationId) -> EntityKey {
        EntityKey::Citation(id)
    }

    fn to_record(&self, id: CitationId) -> EntityRecord {
        EntityRecord::Citation {
            id,
            citation: self.clone(),
        }
    }

    fn check_validation(&self, _id: CitationId, hierarchy: &Hierarchy) -> Option<String> {
        if hierarchy.set(self.set).is_none() {
            return missing("set", self.set);
        }
        let position = i64::try_from(self.position).unwrap_or(i64::MAX);
        validate(
            Self::KIND,
            &[FieldCheck::number("position", position, POSITION)],
        )
    }

    fn arena(hierarchy: &Hierarchy) -> &Arena<CitationId, Tracked<Self>> {
        &hierarchy.citations
    }

    fn arena_mut(hierarchy: &mut Hierarchy) -> &mut Arena<CitationId, Tracked<Self>> {
        &mut hierarchy.citations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_tokens_must_be_plain() {
        assert!(check_pattern(&"p,p,.".parse().unwrap()).is_none());
        assert!(check_pattern(&Pattern::new(["kʷ", "p"])).is_none());
        let problem = check_pattern(&Pattern::new(["pa b", "d"])).unwrap();
        assert!(problem.starts_with("set.pattern"));
        assert!(check_pattern(&Pattern::new(["", "d"])).is_some());
    }

    #[test]
    fn test_environment_needs_one_slot() {
        assert!(check_environment("#_a").is_none());
        assert!(check_environment("V__V").is_some());
        assert!(check_environment("#a").is_some());
    }
}
