mod common;

use labbook_core::storage::{NewTemplate, TemplateKind};
use labbook_core::{LabbookError, NotebookStore};

#[test]
fn test_one_default_per_kind() {
    let mut fx = common::fixture();
    let nb = &mut fx.notebook;

    let first = nb
        .create_template(
            NewTemplate::new(TemplateKind::Docx, "Standard", "").as_default(true),
            "standard.docx",
            b"PK-one",
        )
        .expect("template should be created");
    let sheet = nb
        .create_template(
            NewTemplate::new(TemplateKind::Xlsx, "Sheet", "").as_default(true),
            "sheet.xlsx",
            b"PK-xlsx",
        )
        .expect("template should be created");
    let second = nb
        .create_template(
            NewTemplate::new(TemplateKind::Docx, "Compact", "").as_default(true),
            "compact.docx",
            b"PK-two",
        )
        .expect("template should be created");

    let docx = nb
        .list_templates(Some(TemplateKind::Docx))
        .expect("list should succeed");
    let defaults: Vec<i64> = docx.iter().filter(|t| t.is_default).map(|t| t.id).collect();
    assert_eq!(defaults, vec![second.id]);
    assert_eq!(docx[0].id, second.id);

    let xlsx = nb
        .store()
        .get_template(sheet.id)
        .expect("get should succeed")
        .expect("template should exist");
    assert!(xlsx.is_default);

    nb.set_default_template(first.id)
        .expect("default should switch");
    let docx = nb
        .list_templates(Some(TemplateKind::Docx))
        .expect("list should succeed");
    let defaults: Vec<i64> = docx.iter().filter(|t| t.is_default).map(|t| t.id).collect();
    assert_eq!(defaults, vec![first.id]);

    nb.store().check_integrity().expect("store should be consistent");
}

#[test]
fn test_template_file_lives_under_templates_dir() {
    let mut fx = common::fixture();
    let template = fx
        .notebook
        .create_template(
            NewTemplate::new(TemplateKind::Html, "Plain", "").with_description("no styling"),
            "../../escape.html",
            b"<html></html>",
        )
        .expect("template should be created");
    assert_eq!(template.path, "templates/escape.html");
    let file = fx.dir.path().join("templates/escape.html");
    assert!(file.exists());

    fx.notebook
        .delete_template(template.id)
        .expect("delete should succeed");
    assert!(!file.exists());

    let err = fx
        .notebook
        .delete_template(template.id)
        .expect_err("second delete should fail");
    assert!(matches!(err, LabbookError::NotFound(_)));
}
