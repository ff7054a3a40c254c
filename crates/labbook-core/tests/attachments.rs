mod common;

use labbook_core::audit::{AuditAction, EntityKind};
use labbook_core::storage::{AttachmentFilter, AuditFilter, NewUser};
use labbook_core::{LabbookError, NotebookStore};

#[test]
fn test_duplicate_upload_conflicts_and_keeps_one_row() {
    let mut fx = common::fixture();
    let png = common::tiny_png();

    let first = fx
        .notebook
        .upload_attachment(fx.entry.id, "gel.png", &png, Some("gel"))
        .expect("first upload should succeed");

    let err = fx
        .notebook
        .upload_attachment(fx.entry.id, "gel-copy.png", &png, None)
        .expect_err("identical bytes should conflict");
    match err {
        LabbookError::Conflict(message) => {
            assert!(message.contains(&format!("ID: {}", first.id)), "{}", message)
        }
        other => panic!("expected conflict, got {:?}", other),
    }

    let rows = fx
        .notebook
        .list_attachments(&AttachmentFilter::new())
        .expect("list should succeed");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].sha256.len(), 64);
}

#[test]
fn test_size_ceiling_depends_on_extension() {
    let mut fx = common::fixture();

    let oversized_docx = vec![0u8; 21 * 1024 * 1024];
    let err = fx
        .notebook
        .upload_attachment(fx.entry.id, "protocol.docx", &oversized_docx, None)
        .expect_err("21 MiB docx should be rejected");
    assert!(matches!(err, LabbookError::Validation(_)));

    let mut large_png = common::tiny_png();
    large_png.resize(9 * 1024 * 1024, 0);
    let stored = fx
        .notebook
        .upload_attachment(fx.entry.id, "scan.png", &large_png, None)
        .expect("9 MiB png should be accepted");
    assert_eq!(stored.size_bytes, 9 * 1024 * 1024);
}

#[test]
fn test_unsupported_extension_is_rejected() {
    let mut fx = common::fixture();
    let err = fx
        .notebook
        .upload_attachment(fx.entry.id, "run.exe", b"MZ", None)
        .expect_err("exe should be rejected");
    match err {
        LabbookError::Validation(message) => assert!(message.contains("'exe'")),
        other => panic!("expected validation error, got {:?}", other),
    }
}

#[test]
fn test_upload_to_missing_entry_is_not_found() {
    let mut fx = common::fixture();
    let err = fx
        .notebook
        .upload_attachment(4242, "a.csv", b"a\n1\n", None)
        .expect_err("missing entry should fail");
    assert!(matches!(err, LabbookError::NotFound(_)));
}

#[test]
fn test_create_audit_is_attributed_to_entry_author() {
    let mut fx = common::fixture();
    let attachment = fx
        .notebook
        .upload_attachment(fx.entry.id, "notes.csv", b"a\n1\n", None)
        .expect("upload should succeed");

    let records = fx
        .notebook
        .store()
        .list_audit(
            &AuditFilter::new()
                .entity(EntityKind::Attachment)
                .entity_id(attachment.id),
        )
        .expect("audit should list");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, AuditAction::Create);
    assert_eq!(records[0].actor_id, fx.entry.author_id);
}

#[test]
fn test_delete_tolerates_missing_blob_and_audits() {
    let mut fx = common::fixture();
    let reviewer = fx
        .notebook
        .store_mut()
        .create_user(&NewUser::new("Rita", "rita@lab.test"))
        .expect("user should be created");
    let attachment = fx
        .notebook
        .upload_attachment(fx.entry.id, "notes.csv", b"a\n2\n", None)
        .expect("upload should succeed");

    std::fs::remove_file(fx.dir.path().join(&attachment.path)).expect("blob should exist");

    let read_err = fx
        .notebook
        .read_attachment(attachment.id)
        .expect_err("download of a missing blob should fail");
    assert!(matches!(read_err, LabbookError::NotFound(_)));

    fx.notebook
        .delete_attachment(attachment.id, reviewer.id)
        .expect("delete should succeed");
    assert!(fx
        .notebook
        .store()
        .get_attachment(attachment.id)
        .expect("get should succeed")
        .is_none());

    let deletes = fx
        .notebook
        .store()
        .list_audit(&AuditFilter::new().action(AuditAction::Delete))
        .expect("audit should list");
    assert_eq!(deletes.len(), 1);
    assert_eq!(deletes[0].actor_id, reviewer.id);
    assert_eq!(deletes[0].entity_id, attachment.id);
}
