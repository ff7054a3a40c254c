mod common;

use labbook_core::audit::{AuditAction, EntityKind};
use labbook_core::storage::{AuditFilter, EntryFilter, EntryPatch};
use labbook_core::{LabbookError, NotebookStore};

#[test]
fn test_revise_leaves_previous_row_untouched() {
    let mut fx = common::fixture();
    let original = fx.entry.clone();

    let revised = fx
        .notebook
        .revise_entry(original.id, &EntryPatch::new().body("Ramp 2 C/min"))
        .expect("revise should succeed");

    assert_ne!(revised.id, original.id);
    assert_eq!(revised.version, original.version + 1);
    assert_eq!(revised.parent_version_id, Some(original.id));
    assert_eq!(revised.title, original.title);
    assert_eq!(revised.body, "Ramp 2 C/min");
    assert_eq!(revised.created_at, original.created_at);

    let reread = fx
        .notebook
        .store()
        .get_entry(original.id)
        .expect("get should succeed")
        .expect("original row should remain");
    assert_eq!(reread, original);
}

#[test]
fn test_history_covers_multi_hop_chain_from_any_row() {
    let mut fx = common::fixture();
    let v1 = fx.entry.clone();
    let v2 = fx
        .notebook
        .revise_entry(v1.id, &EntryPatch::new().title("Plate 1 (rerun)"))
        .expect("second version");
    let v3 = fx
        .notebook
        .revise_entry(v2.id, &EntryPatch::new().tags(vec!["rerun".into()]))
        .expect("third version");

    for id in [v1.id, v2.id, v3.id] {
        let history = fx.notebook.entry_history(id).expect("history should load");
        let versions: Vec<i64> = history.iter().map(|e| e.version).collect();
        assert_eq!(versions, vec![1, 2, 3]);
    }

    let head = fx
        .notebook
        .store()
        .latest_version(v1.id)
        .expect("head should resolve");
    assert_eq!(head.id, v3.id);
    assert_eq!(head.tags, vec!["rerun".to_string()]);
}

#[test]
fn test_revise_missing_entry_is_not_found() {
    let mut fx = common::fixture();
    let err = fx
        .notebook
        .revise_entry(9999, &EntryPatch::new().body("x"))
        .expect_err("missing entry should fail");
    assert!(matches!(err, LabbookError::NotFound(_)));
}

#[test]
fn test_revise_records_update_with_diff() {
    let mut fx = common::fixture();
    let revised = fx
        .notebook
        .revise_entry(fx.entry.id, &EntryPatch::new().body("new body"))
        .expect("revise should succeed");

    let records = fx
        .notebook
        .store()
        .list_audit(
            &AuditFilter::new()
                .entity(EntityKind::Entry)
                .entity_id(revised.id),
        )
        .expect("audit should list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, AuditAction::Update);
    assert_eq!(records[0].actor_id, fx.user.id);
    assert_eq!(
        records[0].diff,
        Some(serde_json::json!({ "body_md": "new body" }))
    );
}

#[test]
fn test_list_entries_hides_superseded_rows_by_default() {
    let mut fx = common::fixture();
    let revised = fx
        .notebook
        .revise_entry(fx.entry.id, &EntryPatch::new().body("v2"))
        .expect("revise should succeed");

    let heads = fx
        .notebook
        .store()
        .list_entries(&EntryFilter::new().experiment(fx.experiment_id))
        .expect("list should succeed");
    assert_eq!(heads.len(), 1);
    assert_eq!(heads[0].id, revised.id);

    let all = fx
        .notebook
        .store()
        .list_entries(
            &EntryFilter::new()
                .experiment(fx.experiment_id)
                .include_superseded(true),
        )
        .expect("list should succeed");
    assert_eq!(all.len(), 2);
}
