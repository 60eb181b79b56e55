//! Tabulation and refinement of the hierarchy
//!
//! Every operation is a sequence of steps. A step edits one entity in memory
//! and commits it through the backend; if validation or the backend fails,
//! that entity is reverted and the operation stops. Steps already committed
//! stay committed, so callers re-query after an error.

use crate::arena::{CitationId, ClusterId, ProtosegmentId, SetId, ViewId, ZoneId};
use crate::error::{EngineError, Result};
use crate::hierarchy::{
    check_environment, check_pattern, Citation, Cluster, CorrespondenceSet, Protosegment, Zone,
};
use crate::lexicon::GroupKey;
use crate::persistence::Persistent;
use crate::query::HierarchyQueries;
use crate::workbench::{
    group_entry_in, Assignment, MoveOutcome, Placement, Refresh, TabulationReport,
    TabulationRequest, Workbench,
};
use cognate_core::{EntryId, GroupId, Pattern};
use tracing::{debug, info, warn};

impl Workbench {
    fn insert_step<T: Persistent>(&mut self, value: T) -> Result<T::Id> {
        let id = self.hierarchy.insert(value);
        self.hierarchy.save::<T>(id, self.backend.as_mut())?;
        Ok(id)
    }

    fn update_step<T, F>(&mut self, id: T::Id, edit: F) -> Result<()>
    where
        T: Persistent,
        F: FnOnce(&mut T),
    {
        self.hierarchy.modify::<T, F>(id, edit)?;
        self.hierarchy.save::<T>(id, self.backend.as_mut())
    }

    fn delete_step<T: Persistent>(&mut self, id: T::Id) -> Result<()> {
        self.hierarchy.delete::<T>(id, self.backend.as_mut())
    }

    fn set_pattern(&self, id: SetId) -> Result<Pattern> {
        Ok(self.hierarchy.require::<CorrespondenceSet>(id)?.pattern.clone())
    }

    fn first_set(&self, sets: &[SetId], accept: impl Fn(&Pattern) -> bool) -> Option<SetId> {
        sets.iter()
            .copied()
            .find(|id| self.hierarchy.set(*id).is_some_and(|s| accept(&s.pattern)))
    }

    /// Create a zone
    pub fn create_zone(&mut self, name: &str) -> Result<ZoneId> {
        let id = self.insert_step(Zone {
            name: name.to_string(),
        })?;
        info!(zone = %id, name, "zone created");
        Ok(id)
    }

    /// Create a protosegment; its label must be unique within the zone
    pub fn create_protosegment(&mut self, zone: ZoneId, label: &str) -> Result<ProtosegmentId> {
        self.hierarchy.require::<Zone>(zone)?;
        let id = self.insert_step(Protosegment {
            zone,
            label: label.to_string(),
            remarks: String::new(),
        })?;
        info!(protosegment = %id, label, "protosegment created");
        Ok(id)
    }

    /// Relabel a protosegment
    pub fn rename_protosegment(&mut self, protosegment: ProtosegmentId, label: &str) -> Result<Refresh> {
        if self.hierarchy.require::<Protosegment>(protosegment)?.label == label {
            return Ok(Refresh::Unchanged);
        }
        self.update_step::<Protosegment, _>(protosegment, |p| p.label = label.to_string())?;
        Ok(Refresh::Needed)
    }

    /// Replace the remarks of a correspondence set
    pub fn set_remarks(&mut self, set: SetId, remarks: &str) -> Result<Refresh> {
        if self.hierarchy.require::<CorrespondenceSet>(set)?.remarks == remarks {
            return Ok(Refresh::Unchanged);
        }
        self.update_step::<CorrespondenceSet, _>(set, |s| s.remarks = remarks.to_string())?;
        Ok(Refresh::Needed)
    }

    /// Tabulate the first group of `entry` in `view` that yields patterns
    ///
    /// Groups already tabulated are skipped. Every surviving column must have
    /// an assignment in `request`; otherwise nothing is written and a
    /// validation error names the first unassigned column.
    pub fn tabulate(
        &mut self,
        entry: EntryId,
        view: ViewId,
        request: &TabulationRequest,
    ) -> Result<TabulationReport> {
        self.lexicon.require_entry(entry)?;
        self.lexicon.require_view(view)?;
        let groups: Vec<GroupId> = self
            .lexicon
            .groups_of(view, entry)
            .into_iter()
            .filter(|g| self.lexicon.group(*g).is_some_and(|g| !g.done))
            .collect();
        self.tabulate_groups(entry, view, &groups, request)
    }

    fn tabulate_groups(
        &mut self,
        entry: EntryId,
        view: ViewId,
        groups: &[GroupId],
        request: &TabulationRequest,
    ) -> Result<TabulationReport> {
        let outcome = group_entry_in(
            &self.lexicon,
            &self.config.grouper(),
            view,
            entry,
            groups,
            &request.choices,
        );
        for skipped in &outcome.skipped {
            warn!(%entry, error = %skipped, "group skipped");
        }
        for pending in &outcome.pending {
            warn!(
                %entry,
                group = %pending.group,
                variety = %pending.variety,
                used = %pending.used,
                "ambiguous alignment resolved to first candidate"
            );
        }

        let Some(group) = outcome.group else {
            info!(%entry, %view, "no group yields patterns");
            return Ok(TabulationReport {
                outcome,
                placements: Vec::new(),
                refresh: Refresh::Unchanged,
            });
        };

        let mut plan = Vec::with_capacity(outcome.patterns.len());
        for candidate in &outcome.patterns {
            let assignment = request.assignment_for(candidate.position).ok_or_else(|| {
                EngineError::validation(format!(
                    "column {} of entry {entry} has no protosegment and environment",
                    candidate.position
                ))
            })?;
            self.hierarchy
                .require::<Protosegment>(assignment.protosegment)?;
            if let Some(problem) = check_environment(&assignment.environment)
                .or_else(|| check_pattern(&candidate.pattern))
            {
                return Err(EngineError::Validation(problem));
            }
            plan.push((candidate.position, candidate.pattern.clone(), assignment.clone()));
        }

        let mut placements = Vec::with_capacity(plan.len());
        for (position, pattern, assignment) in plan {
            placements.push(self.place(group, position, pattern, &assignment)?);
        }
        self.set_group_done(group, true)?;
        info!(%entry, %group, columns = placements.len(), "group tabulated");

        Ok(TabulationReport {
            outcome,
            placements,
            refresh: Refresh::Needed,
        })
    }

    fn place(
        &mut self,
        group: GroupId,
        position: usize,
        pattern: Pattern,
        assignment: &Assignment,
    ) -> Result<Placement> {
        let clusters = self
            .hierarchy
            .clusters_at(assignment.protosegment, &assignment.environment);
        for cluster in clusters {
            let sets = self.hierarchy.sets_of(cluster);
            if let Some(set) = self.first_set(&sets, |p| p.identical(&pattern)) {
                self.cite(set, group, position)?;
                debug!(%group, position, %set, "cited identical set");
                return Ok(Placement {
                    position,
                    cluster,
                    set,
                    created: false,
                });
            }
            if let Some(set) = self.first_set(&sets, |p| p.conformable(&pattern)) {
                let citation = self.add_correspondence_set(set, &pattern, group, position)?;
                let set = self
                    .hierarchy
                    .citation(citation)
                    .map_or(set, |c| c.set);
                debug!(%group, position, %set, "merged into conformable set");
                return Ok(Placement {
                    position,
                    cluster,
                    set,
                    created: false,
                });
            }
        }

        let order = self.hierarchy.max_cluster_order(assignment.protosegment) + 1;
        let cluster = self.insert_step(Cluster {
            protosegment: assignment.protosegment,
            environment: assignment.environment.clone(),
            order,
        })?;
        let set = self.insert_step(CorrespondenceSet {
            cluster,
            pattern,
            order: 1,
            remarks: String::new(),
        })?;
        self.cite(set, group, position)?;
        debug!(%group, position, %cluster, "created cluster");
        Ok(Placement {
            position,
            cluster,
            set,
            created: true,
        })
    }

    fn cite(&mut self, set: SetId, group: GroupId, position: usize) -> Result<CitationId> {
        self.insert_step(Citation {
            set,
            group,
            position,
        })
    }

    /// Add the evidence of `pattern` to a conformable set
    ///
    /// The set's pattern becomes the unification of both, a citation for
    /// (`group`, `position`) is added, and sets of the cluster that became
    /// identical are merged.
    pub fn add_correspondence_set(
        &mut self,
        set: SetId,
        pattern: &Pattern,
        group: GroupId,
        position: usize,
    ) -> Result<CitationId> {
        let current = self.hierarchy.require::<CorrespondenceSet>(set)?.clone();
        let unified = current.pattern.unify(pattern).ok_or_else(|| {
            EngineError::validation(format!(
                "pattern {pattern} is not conformable with set {set} ({})",
                current.pattern
            ))
        })?;
        if unified != current.pattern {
            self.update_step::<CorrespondenceSet, _>(set, |s| s.pattern = unified)?;
        }
        let citation = self.cite(set, group, position)?;
        self.coalesce(current.cluster)?;
        Ok(citation)
    }

    /// Fold `source` into `target`: unify patterns, join remarks, move
    /// citations, delete `source`
    fn absorb(&mut self, source: SetId, target: SetId) -> Result<()> {
        let from = self.hierarchy.require::<CorrespondenceSet>(source)?.clone();
        let into = self.hierarchy.require::<CorrespondenceSet>(target)?.clone();
        let unified = into.pattern.unify(&from.pattern).ok_or_else(|| {
            EngineError::validation(format!(
                "set {source} ({}) is not conformable with set {target} ({})",
                from.pattern, into.pattern
            ))
        })?;
        let remarks = join_remarks(&into.remarks, &from.remarks);
        self.update_step::<CorrespondenceSet, _>(target, |s| {
            s.pattern = unified;
            s.remarks = remarks;
        })?;
        for citation in self.hierarchy.citations_of_set(source) {
            self.update_step::<Citation, _>(citation, |c| c.set = target)?;
        }
        self.delete_step::<CorrespondenceSet>(source)?;
        debug!(%source, %target, "set absorbed");
        Ok(())
    }

    /// Merge sets of a cluster with identical patterns, then renumber
    fn coalesce(&mut self, cluster: ClusterId) -> Result<()> {
        loop {
            let sets = self.hierarchy.sets_of(cluster);
            let mut duplicate = None;
            'search: for (i, keep) in sets.iter().enumerate() {
                let pattern = self.set_pattern(*keep)?;
                for drop in &sets[i + 1..] {
                    if self.set_pattern(*drop)?.identical(&pattern) {
                        duplicate = Some((*drop, *keep));
                        break 'search;
                    }
                }
            }
            match duplicate {
                Some((drop, keep)) => self.absorb(drop, keep)?,
                None => break,
            }
        }
        self.renumber_sets(cluster)
    }

    fn reparent_set(&mut self, set: SetId, cluster: ClusterId) -> Result<()> {
        let order = self.hierarchy.max_set_order(cluster) + 1;
        self.update_step::<CorrespondenceSet, _>(set, |s| {
            s.cluster = cluster;
            s.order = order;
        })
    }

    fn renumber_sets(&mut self, cluster: ClusterId) -> Result<()> {
        for (order, set) in (1u32..).zip(self.hierarchy.sets_of(cluster)) {
            if self.hierarchy.set(set).is_some_and(|s| s.order != order) {
                self.update_step::<CorrespondenceSet, _>(set, |s| s.order = order)?;
            }
        }
        Ok(())
    }

    fn renumber_clusters(&mut self, protosegment: ProtosegmentId) -> Result<()> {
        for (order, cluster) in (1u32..).zip(self.hierarchy.clusters_of(protosegment)) {
            if self.hierarchy.cluster(cluster).is_some_and(|c| c.order != order) {
                self.update_step::<Cluster, _>(cluster, |c| c.order = order)?;
            }
        }
        Ok(())
    }

    /// Delete a cluster left without sets and close the gap it leaves
    fn drop_if_empty(&mut self, cluster: ClusterId) -> Result<bool> {
        if !self.hierarchy.sets_of(cluster).is_empty() {
            self.renumber_sets(cluster)?;
            return Ok(false);
        }
        let protosegment = self.hierarchy.require::<Cluster>(cluster)?.protosegment;
        self.delete_step::<Cluster>(cluster)?;
        self.renumber_clusters(protosegment)?;
        debug!(%cluster, "empty cluster deleted");
        Ok(true)
    }

    /// Move a cluster, with its sets, to the end of another protosegment
    pub fn move_cluster(&mut self, cluster: ClusterId, target: ProtosegmentId) -> Result<Refresh> {
        let source = self.hierarchy.require::<Cluster>(cluster)?.protosegment;
        self.hierarchy.require::<Protosegment>(target)?;
        if source == target {
            return Ok(Refresh::Unchanged);
        }
        let order = self.hierarchy.max_cluster_order(target) + 1;
        self.update_step::<Cluster, _>(cluster, |c| {
            c.protosegment = target;
            c.order = order;
        })?;
        self.renumber_clusters(source)?;
        info!(%cluster, from = %source, to = %target, "cluster moved");
        Ok(Refresh::Needed)
    }

    /// Merge the sets of cluster `from` into cluster `to`
    ///
    /// Both clusters must belong to the same protosegment. A source set joins
    /// an identical target set if there is one, otherwise a conformable one;
    /// sets fitting neither stay behind. An empty target takes every set.
    pub fn merge_clusters(&mut self, from: ClusterId, to: ClusterId) -> Result<Refresh> {
        if from == to {
            return Err(EngineError::validation(format!(
                "cannot merge cluster {from} into itself"
            )));
        }
        let source = self.hierarchy.require::<Cluster>(from)?.clone();
        let target = self.hierarchy.require::<Cluster>(to)?.clone();
        if source.protosegment != target.protosegment {
            return Err(EngineError::validation(format!(
                "clusters {from} and {to} belong to different protosegments"
            )));
        }

        let take_all = self.hierarchy.sets_of(to).is_empty();
        let mut moved = 0usize;
        for set in self.hierarchy.sets_of(from) {
            if take_all {
                self.reparent_set(set, to)?;
                moved += 1;
                continue;
            }
            let pattern = self.set_pattern(set)?;
            let candidates = self.hierarchy.sets_of(to);
            let destination = self
                .first_set(&candidates, |p| p.identical(&pattern))
                .or_else(|| self.first_set(&candidates, |p| p.conformable(&pattern)));
            if let Some(destination) = destination {
                self.absorb(set, destination)?;
                moved += 1;
            }
        }

        if moved == 0 {
            info!(%from, %to, "nothing conformable to merge");
            return Ok(Refresh::Unchanged);
        }
        self.coalesce(to)?;
        self.drop_if_empty(from)?;
        info!(%from, %to, sets = moved, "clusters merged");
        Ok(Refresh::Needed)
    }

    /// Change a cluster's environment
    ///
    /// If a sibling cluster already has the new environment, the cluster is
    /// merged into the first such sibling.
    pub fn change_environment(&mut self, cluster: ClusterId, environment: &str) -> Result<Refresh> {
        let current = self.hierarchy.require::<Cluster>(cluster)?.clone();
        if current.environment == environment {
            return Ok(Refresh::Unchanged);
        }
        let sibling = self
            .hierarchy
            .clusters_at(current.protosegment, environment)
            .into_iter()
            .find(|c| *c != cluster);
        self.update_step::<Cluster, _>(cluster, |c| c.environment = environment.to_string())?;
        if let Some(sibling) = sibling {
            self.merge_clusters(cluster, sibling)?;
        }
        Ok(Refresh::Needed)
    }

    /// Move every cluster of `from` to the end of `to`, then delete `from`
    ///
    /// Clusters are never merged with each other as a result.
    pub fn merge_protosegments(&mut self, from: ProtosegmentId, to: ProtosegmentId) -> Result<Refresh> {
        if from == to {
            return Err(EngineError::validation(format!(
                "cannot merge protosegment {from} into itself"
            )));
        }
        self.hierarchy.require::<Protosegment>(from)?;
        self.hierarchy.require::<Protosegment>(to)?;

        let base = self.hierarchy.max_cluster_order(to);
        let clusters = self.hierarchy.clusters_of(from);
        let count = clusters.len();
        for (order, cluster) in (base + 1..).zip(clusters) {
            self.update_step::<Cluster, _>(cluster, |c| {
                c.protosegment = to;
                c.order = order;
            })?;
        }
        self.delete_step::<Protosegment>(from)?;
        info!(%from, %to, clusters = count, "protosegments merged");
        Ok(Refresh::Needed)
    }

    /// Move a correspondence set to `environment` under `target`
    ///
    /// Candidate clusters are those at the target holding a set conformable
    /// with the moving one, other than the set's own cluster. With none a new
    /// cluster is created; with one the set moves there; with several the
    /// caller must pass one of them as `choice`.
    pub fn move_correspondence_set(
        &mut self,
        set: SetId,
        target: ProtosegmentId,
        environment: &str,
        choice: Option<ClusterId>,
    ) -> Result<MoveOutcome> {
        let moving = self.hierarchy.require::<CorrespondenceSet>(set)?.clone();
        self.hierarchy.require::<Protosegment>(target)?;
        let origin = moving.cluster;

        let candidates: Vec<ClusterId> = self
            .hierarchy
            .clusters_at(target, environment)
            .into_iter()
            .filter(|c| *c != origin)
            .filter(|c| {
                let sets = self.hierarchy.sets_of(*c);
                self.first_set(&sets, |p| p.conformable(&moving.pattern)).is_some()
            })
            .collect();

        let destination = match choice {
            Some(chosen) if candidates.contains(&chosen) => Some(chosen),
            Some(chosen) => {
                return Err(EngineError::validation(format!(
                    "cluster {chosen} is not a candidate for set {set}"
                )));
            }
            None if candidates.len() > 1 => {
                info!(%set, candidates = candidates.len(), "move needs a choice");
                return Ok(MoveOutcome::NeedsChoice { candidates });
            }
            None => candidates.first().copied(),
        };

        if destination.is_none() && self.sole_set_in_place(set, origin, target, environment) {
            debug!(%set, cluster = %origin, "set already where it was asked to go");
            return Ok(MoveOutcome::Moved {
                cluster: origin,
                refresh: Refresh::Unchanged,
            });
        }

        let cluster = match destination {
            Some(cluster) => {
                let sets = self.hierarchy.sets_of(cluster);
                let into = self
                    .first_set(&sets, |p| p.identical(&moving.pattern))
                    .or_else(|| self.first_set(&sets, |p| p.conformable(&moving.pattern)));
                match into {
                    Some(into) => self.absorb(set, into)?,
                    None => self.reparent_set(set, cluster)?,
                }
                self.coalesce(cluster)?;
                cluster
            }
            None => {
                let order = self.hierarchy.max_cluster_order(target) + 1;
                let cluster = self.insert_step(Cluster {
                    protosegment: target,
                    environment: environment.to_string(),
                    order,
                })?;
                self.reparent_set(set, cluster)?;
                cluster
            }
        };

        self.drop_if_empty(origin)?;
        info!(%set, to = %cluster, "set moved");
        Ok(MoveOutcome::Moved {
            cluster,
            refresh: Refresh::Needed,
        })
    }

    /// Whether `set` is alone in `cluster` and the cluster sits at `target`/`environment`
    fn sole_set_in_place(
        &self,
        set: SetId,
        cluster: ClusterId,
        target: ProtosegmentId,
        environment: &str,
    ) -> bool {
        let in_place = self
            .hierarchy
            .cluster(cluster)
            .is_some_and(|c| c.protosegment == target && c.environment == environment);
        in_place && self.hierarchy.sets_of(cluster) == [set]
    }

    /// Rewrite cluster orders of a protosegment to follow `order`
    ///
    /// `order` must list every cluster of the protosegment exactly once.
    pub fn reorder_clusters(&mut self, protosegment: ProtosegmentId, order: &[ClusterId]) -> Result<Refresh> {
        self.hierarchy.require::<Protosegment>(protosegment)?;
        let current = self.hierarchy.clusters_of(protosegment);

        let mut wanted = order.to_vec();
        wanted.sort_unstable();
        let mut have = current.clone();
        have.sort_unstable();
        if wanted != have {
            return Err(EngineError::validation(format!(
                "new order must list each cluster of protosegment {protosegment} exactly once"
            )));
        }
        if order == current.as_slice() {
            return Ok(Refresh::Unchanged);
        }

        for (position, cluster) in (1u32..).zip(order.iter().copied()) {
            if self.hierarchy.cluster(cluster).is_some_and(|c| c.order != position) {
                self.update_step::<Cluster, _>(cluster, |c| c.order = position)?;
            }
        }
        info!(%protosegment, "clusters reordered");
        Ok(Refresh::Needed)
    }

    /// Undo and redo the tabulation of one group
    ///
    /// The group's citations are removed; sets left without citations and
    /// clusters left without sets are deleted. The group is then tabulated
    /// again on its own.
    pub fn retabulate_group(&mut self, key: &GroupKey, request: &TabulationRequest) -> Result<TabulationReport> {
        let group = self.lexicon.find_group(key).ok_or_else(|| {
            EngineError::validation(format!(
                "no group {:?} for entry {} in view {}",
                key.tag, key.entry, key.view
            ))
        })?;
        self.set_group_done(group, false)?;
        self.remove_citations(group)?;
        info!(%group, tag = %key.tag, "retabulating group");
        self.tabulate_groups(key.entry, key.view, &[group], request)
    }

    fn remove_citations(&mut self, group: GroupId) -> Result<()> {
        let citations = self.hierarchy.citations_of_group(group);
        let mut sets: Vec<SetId> = citations
            .iter()
            .filter_map(|c| self.hierarchy.citation(*c).map(|c| c.set))
            .collect();
        sets.sort_unstable();
        sets.dedup();

        for citation in citations {
            self.delete_step::<Citation>(citation)?;
        }

        let mut clusters = Vec::new();
        for set in sets {
            let cluster = self.hierarchy.require::<CorrespondenceSet>(set)?.cluster;
            if self.hierarchy.citations_of_set(set).is_empty() {
                self.delete_step::<CorrespondenceSet>(set)?;
            }
            clusters.push(cluster);
        }
        clusters.sort_unstable();
        clusters.dedup();
        for cluster in clusters {
            self.drop_if_empty(cluster)?;
        }
        Ok(())
    }
}

fn join_remarks(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (_, true) => first.to_string(),
        (true, false) => second.to_string(),
        (false, false) if first == second => first.to_string(),
        (false, false) => format!("{first}; {second}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_remarks() {
        assert_eq!(join_remarks("", ""), "");
        assert_eq!(join_remarks("a", ""), "a");
        assert_eq!(join_remarks("", "b"), "b");
        assert_eq!(join_remarks("a", "a"), "a");
        assert_eq!(join_remarks("a", "b"), "a; b");
    }
}
