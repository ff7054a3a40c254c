mod common;

use labbook_core::audit::{AuditAction, EntityKind};
use labbook_core::storage::AuditFilter;
use labbook_core::{LabbookError, NotebookStore};

#[test]
fn test_every_creation_is_audited() {
    let fx = common::fixture();
    let records = fx
        .notebook
        .store()
        .list_audit(&AuditFilter::new().action(AuditAction::Create))
        .expect("audit should list");

    let entities: Vec<EntityKind> = records.iter().map(|r| r.entity).collect();
    assert!(entities.contains(&EntityKind::Project));
    assert!(entities.contains(&EntityKind::Experiment));
    assert!(entities.contains(&EntityKind::Entry));
    assert!(records.iter().all(|r| r.actor_id == fx.user.id));
}

#[test]
fn test_audit_rows_cannot_be_changed() {
    let fx = common::fixture();

    let update = fx.notebook.store().with_connection(|conn| {
        conn.execute("UPDATE audit_log SET actor_id = 99", [])?;
        Ok(())
    });
    assert!(matches!(update, Err(LabbookError::Sqlite { .. })));

    let delete = fx.notebook.store().with_connection(|conn| {
        conn.execute("DELETE FROM audit_log", [])?;
        Ok(())
    });
    assert!(matches!(delete, Err(LabbookError::Sqlite { .. })));

    let count = fx
        .notebook
        .store()
        .list_audit(&AuditFilter::new())
        .expect("audit should list")
        .len();
    assert_eq!(count, 3);
}

#[test]
fn test_archive_is_audited_with_actor() {
    let mut fx = common::fixture();
    let project = fx
        .notebook
        .store_mut()
        .archive_project(fx.project_id, fx.user.id)
        .expect("archive should succeed");
    assert!(project.archived);

    let records = fx
        .notebook
        .store()
        .list_audit(
            &AuditFilter::new()
                .entity(EntityKind::Project)
                .action(AuditAction::Archive),
        )
        .expect("audit should list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].entity_id, fx.project_id);
}
