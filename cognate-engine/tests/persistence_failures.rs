//! Step-wise commit semantics against a failing backend

use cognate_engine::{
    Cluster, ClusterId, DatumId, EngineConfig, EngineError, EntityKey, EntityRecord, EntryId,
    HierarchyQueries, MemoryStore, PersistenceBackend, PersistenceError, Project, ProtosegmentId,
    SetId, ViewId, Workbench,
};
use serde_json::json;
use std::sync::{Arc, Mutex};

/// A [`MemoryStore`] the test can still inspect after handing it over
#[derive(Clone, Default)]
struct SharedStore(Arc<Mutex<MemoryStore>>);

impl SharedStore {
    fn new(store: MemoryStore) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    fn writes(&self) -> usize {
        self.0.lock().unwrap().writes()
    }

    fn contains(&self, key: &EntityKey) -> bool {
        self.0.lock().unwrap().contains(key)
    }

    fn get(&self, key: &EntityKey) -> Option<serde_json::Value> {
        self.0.lock().unwrap().get(key).cloned()
    }
}

impl PersistenceBackend for SharedStore {
    fn save(&mut self, record: &EntityRecord) -> Result<(), PersistenceError> {
        self.0.lock().unwrap().save(record)
    }

    fn delete(&mut self, key: EntityKey) -> Result<(), PersistenceError> {
        self.0.lock().unwrap().delete(key)
    }
}

fn project() -> Project {
    serde_json::from_value(json!({
        "hierarchy": {
            "zones": [{ "name": "vowels" }],
            "protosegments": [
                { "zone": 1, "label": "*a" },
                { "zone": 1, "label": "*e" }
            ],
            "clusters": [
                { "protosegment": 1, "environment": "#_a", "order": 1 },
                { "protosegment": 1, "environment": "#_a", "order": 2 },
                { "protosegment": 1, "environment": "#_i", "order": 3 }
            ],
            "sets": [
                { "cluster": 1, "pattern": "a,a,.", "order": 1 },
                { "cluster": 2, "pattern": "a,.,a", "order": 1 },
                { "cluster": 3, "pattern": "i,i,i", "order": 1 }
            ]
        }
    }))
    .unwrap()
}

fn workbench(store: MemoryStore) -> (Workbench, SharedStore) {
    let shared = SharedStore::new(store);
    let wb = Workbench::with_backend(project(), EngineConfig::default(), shared.clone());
    (wb, shared)
}

#[test]
fn test_failure_on_first_step_changes_nothing() {
    let (mut wb, store) = workbench(MemoryStore::new().fail_after(0));
    let error = wb.move_cluster(ClusterId(1), ProtosegmentId(2)).unwrap_err();
    assert!(matches!(error, EngineError::Persistence(_)));

    let cluster = wb.hierarchy().cluster(ClusterId(1)).unwrap();
    assert_eq!(cluster.protosegment, ProtosegmentId(1));
    assert_eq!(cluster.order, 1);
    assert!(!wb.hierarchy().is_dirty::<Cluster>(ClusterId(1)));
    assert_eq!(store.writes(), 0);
}

#[test]
fn test_failure_mid_operation_keeps_earlier_steps() {
    // moving cluster 1 away commits the cluster, then renumbering
    // cluster 2 fails
    let (mut wb, store) = workbench(MemoryStore::new().fail_after(1));
    let error = wb.move_cluster(ClusterId(1), ProtosegmentId(2)).unwrap_err();
    assert!(matches!(error, EngineError::Persistence(_)));
    assert_eq!(store.writes(), 1);
    assert!(store.contains(&EntityKey::Cluster(ClusterId(1))));

    let h = wb.hierarchy();
    assert_eq!(h.cluster(ClusterId(1)).unwrap().protosegment, ProtosegmentId(2));
    assert_eq!(h.cluster(ClusterId(2)).unwrap().order, 2);
    assert!(!h.is_dirty::<Cluster>(ClusterId(2)));
    assert!(!wb.check_invariants().is_empty());
}

#[test]
fn test_failed_set_save_aborts_merge() {
    let (mut wb, _) = workbench(MemoryStore::new().fail_kind("set"));
    // absorbing set 1 into set 2 must save set 2, which the store refuses
    let error = wb.merge_clusters(ClusterId(1), ClusterId(2)).unwrap_err();
    assert!(matches!(error, EngineError::Persistence(_)));
    assert_eq!(
        wb.hierarchy().set(SetId(2)).unwrap().pattern.to_string(),
        "a,.,a"
    );
    assert!(wb.hierarchy().set(SetId(1)).is_some());
    assert_eq!(wb.hierarchy().sets_of(ClusterId(1)), vec![SetId(1)]);
}

#[test]
fn test_validation_failure_is_blocking() {
    let (mut wb, store) = workbench(MemoryStore::new());
    let error = wb
        .move_correspondence_set(SetId(3), ProtosegmentId(2), "nowhere", None)
        .unwrap_err();
    assert!(matches!(error, EngineError::Validation(_)));
    assert_eq!(store.writes(), 0);
    assert_eq!(wb.hierarchy().set(SetId(3)).unwrap().cluster, ClusterId(3));
    assert!(wb.hierarchy().clusters_of(ProtosegmentId(2)).is_empty());
}

#[test]
fn test_successful_operations_reach_the_store() {
    let (mut wb, store) = workbench(MemoryStore::new());
    wb.merge_clusters(ClusterId(1), ClusterId(2)).unwrap();
    assert!(!store.contains(&EntityKey::Cluster(ClusterId(1))));
    assert!(store.contains(&EntityKey::Set(SetId(2))));
    assert!(store.contains(&EntityKey::Cluster(ClusterId(3))));
    assert!(wb.check_invariants().is_empty());
}

/// A project with one Latin datum aligned in two views
fn lexical_project() -> (Project, ViewId, ViewId, EntryId, DatumId) {
    let mut wb = Workbench::new(EngineConfig::default());
    let lexicon = wb.lexicon_mut();
    let lat = lexicon.add_variety("Latin", "Lat").unwrap();
    let italic = lexicon.add_view("Italic", &[lat]).unwrap();
    let latin_only = lexicon.add_view("Latin", &[lat]).unwrap();
    let entry = lexicon.add_entry("who").unwrap();
    let datum = lexicon.add_datum(entry, lat, "kʷis").unwrap();
    wb.align(italic, datum).unwrap();
    wb.align(latin_only, datum).unwrap();
    (wb.to_project(), italic, latin_only, entry, datum)
}

fn lexical_workbench(store: MemoryStore) -> (Workbench, SharedStore, ViewId, ViewId, EntryId, DatumId) {
    let (project, italic, latin_only, entry, datum) = lexical_project();
    let shared = SharedStore::new(store);
    let wb = Workbench::with_backend(project, EngineConfig::default(), shared.clone());
    (wb, shared, italic, latin_only, entry, datum)
}

#[test]
fn test_text_edit_saves_every_alignment() {
    let (mut wb, store, italic, latin_only, _, datum) = lexical_workbench(MemoryStore::new());
    wb.insert_text(datum, 4, "que").unwrap();
    for view in [italic, latin_only] {
        let saved = store.get(&EntityKey::Alignment(view, datum)).unwrap();
        assert_eq!(saved["record"]["source"], "kʷisque");
    }

    assert_eq!(wb.delete_text(datum, 4, 3).unwrap(), "que");
    let saved = store.get(&EntityKey::Alignment(italic, datum)).unwrap();
    assert_eq!(saved["record"]["source"], "kʷis");
    assert_eq!(store.writes(), 4);
}

#[test]
fn test_rejected_text_edit_restores_datum() {
    let (mut wb, store, italic, latin_only, _, datum) =
        lexical_workbench(MemoryStore::new().fail_kind("alignment"));
    let error = wb.insert_text(datum, 0, "s").unwrap_err();
    assert!(matches!(error, EngineError::Persistence(_)));
    assert_eq!(wb.lexicon().datum(datum).unwrap().text, "kʷis");
    for view in [italic, latin_only] {
        let record = wb.lexicon().alignment(view, datum).unwrap();
        assert_eq!(record.source(), "kʷis");
        assert_eq!(record.vector().to_string(), "====");
    }
    assert_eq!(store.writes(), 0);
}

#[test]
fn test_second_view_failure_restores_first() {
    let (mut wb, store, italic, _, _, datum) = lexical_workbench(MemoryStore::new().fail_after(1));
    assert!(wb.delete_text(datum, 3, 1).is_err());
    assert_eq!(wb.lexicon().datum(datum).unwrap().text, "kʷis");
    assert_eq!(wb.lexicon().alignment(italic, datum).unwrap().source(), "kʷis");
    assert_eq!(store.writes(), 1);
}

#[test]
fn test_remove_datum_deletes_alignments() {
    let (mut wb, store, italic, latin_only, _, datum) = lexical_workbench(MemoryStore::new());
    wb.insert_text(datum, 4, "que").unwrap();
    assert!(store.contains(&EntityKey::Alignment(italic, datum)));

    wb.remove_datum(datum).unwrap();
    assert!(wb.lexicon().datum(datum).is_none());
    assert!(!store.contains(&EntityKey::Alignment(italic, datum)));
    assert!(!store.contains(&EntityKey::Alignment(latin_only, datum)));
}

#[test]
fn test_rejected_datum_removal_keeps_datum() {
    let (mut wb, _, italic, latin_only, _, datum) =
        lexical_workbench(MemoryStore::new().fail_kind("alignment"));
    assert!(matches!(
        wb.remove_datum(datum),
        Err(EngineError::Persistence(_))
    ));
    assert!(wb.lexicon().datum(datum).is_some());
    assert!(wb.lexicon().alignment(italic, datum).is_some());
    assert!(wb.lexicon().alignment(latin_only, datum).is_some());
}

#[test]
fn test_new_group_is_saved() {
    let (mut wb, store, italic, _, entry, _) = lexical_workbench(MemoryStore::new());
    let group = wb.add_group(italic, entry, "1").unwrap();
    assert_eq!(store.get(&EntityKey::Group(group)).unwrap()["group"]["tag"], "1");
}

#[test]
fn test_rejected_group_is_not_kept() {
    let (mut wb, _, italic, _, entry, _) = lexical_workbench(MemoryStore::new().fail_kind("group"));
    assert!(wb.add_group(italic, entry, "1").is_err());
    assert!(wb.lexicon().groups_of(italic, entry).is_empty());
}
