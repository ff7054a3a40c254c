mod common;

use labbook_core::chart::{ChartKind, ChartRequest};
use labbook_core::report::{self, Block, ReportKind, ReportOptions};
use labbook_core::storage::{EntryPatch, NewEntry};
use labbook_core::LabbookError;

#[test]
fn test_missing_image_becomes_marker_and_report_still_renders() {
    let mut fx = common::fixture();
    let kept = fx
        .notebook
        .upload_attachment(fx.entry.id, "kept.png", &common::tiny_png(), None)
        .expect("upload should succeed");

    let mut other = common::tiny_png();
    other.push(0);
    let lost = fx
        .notebook
        .upload_attachment(fx.entry.id, "lost.png", &other, Some("second gel"))
        .expect("upload should succeed");
    std::fs::remove_file(fx.dir.path().join(&lost.path)).expect("blob should exist");

    let source = fx
        .notebook
        .report_source(fx.entry.id)
        .expect("source should resolve");
    let doc = report::build_document(&source, &ReportOptions::default(), fx.notebook.layout());

    let markers = doc.markers();
    assert_eq!(markers.len(), 1);
    assert!(markers[0].starts_with("[Image could not be embedded:"));
    let images = doc
        .blocks
        .iter()
        .filter(|b| matches!(b, Block::Image { .. }))
        .count();
    assert_eq!(images, 1);
    assert!(doc.blocks.contains(&Block::Heading {
        level: 2,
        text: format!("Attachment 1: {}", kept.original_name),
    }));

    let report = fx
        .notebook
        .assemble_report(fx.entry.id, ReportKind::Document)
        .expect("report should assemble");
    assert!(report.bytes.starts_with(b"PK"));
    assert!(report.filename.starts_with(&format!("report_entry_{}_", fx.entry.id)));
    assert!(report.filename.ends_with(".docx"));
}

#[test]
fn test_report_uses_latest_version_and_gathers_chain_resources() {
    let mut fx = common::fixture();
    let dataset = fx
        .notebook
        .import_dataset(fx.entry.id, "melt", "melt.csv", &common::numeric_csv(20))
        .expect("import should succeed");
    fx.notebook
        .render_chart(
            dataset.id,
            &ChartRequest::new(ChartKind::Line, "time", "signal").with_title("Melt"),
            fx.user.id,
        )
        .expect("chart should render");

    let revised = fx
        .notebook
        .revise_entry(fx.entry.id, &EntryPatch::new().title("Plate 1 final"))
        .expect("revise should succeed");

    let source = fx
        .notebook
        .report_source(fx.entry.id)
        .expect("source should resolve");
    assert_eq!(source.entry.id, revised.id);
    assert_eq!(source.datasets.len(), 1);
    assert_eq!(source.datasets[0].charts.len(), 1);
    assert!(source.project.is_some());

    let doc = report::build_document(&source, &ReportOptions::default(), fx.notebook.layout());
    assert_eq!(doc.blocks[0], Block::Title("Plate 1 final".to_string()));
    assert!(doc.markers().is_empty());
    assert!(doc.blocks.contains(&Block::Centered("Melt".to_string())));
}

#[test]
fn test_spreadsheet_substitutes_error_sheet_for_missing_source() {
    let mut fx = common::fixture();
    let good = fx
        .notebook
        .import_dataset(fx.entry.id, "good", "good.csv", &common::numeric_csv(5))
        .expect("import should succeed");
    let bad = fx
        .notebook
        .import_dataset(fx.entry.id, "bad", "bad.csv", &common::numeric_csv(6))
        .expect("import should succeed");
    std::fs::remove_file(fx.dir.path().join(&bad.path)).expect("source should exist");

    let source = fx
        .notebook
        .report_source(fx.entry.id)
        .expect("source should resolve");
    let workbook =
        report::build_workbook(&source, &ReportOptions::default(), fx.notebook.layout());

    let names: Vec<&str> = workbook.sheets.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Summary", "1_good", "2_bad"]);
    assert_eq!(workbook.sheets[1].rows.len(), good.row_count as usize + 1);
    assert_eq!(workbook.sheets[2].rows.len(), 1);
    assert!(workbook.sheets[2].rows[0][0]
        .to_string()
        .starts_with("Dataset could not be loaded:"));

    let report = fx
        .notebook
        .assemble_report(fx.entry.id, ReportKind::Spreadsheet)
        .expect("report should assemble");
    assert!(report.bytes.starts_with(b"PK"));
}

#[test]
fn test_html_report_escapes_markup() {
    let mut fx = common::fixture();
    let entry = fx
        .notebook
        .create_entry(
            &NewEntry::new(fx.experiment_id, fx.user.id, "<b>pH</b> check")
                .with_body("a < b & c"),
        )
        .expect("entry should be created");

    let report = fx
        .notebook
        .assemble_report(entry.id, ReportKind::FlatHtml)
        .expect("report should assemble");
    let html = String::from_utf8(report.bytes).expect("html should be utf-8");
    assert!(html.contains("&lt;b&gt;pH&lt;/b&gt; check"));
    assert!(html.contains("a &lt; b &amp; c"));
    assert!(!html.contains("<b>pH</b>"));

    let path = fx
        .notebook
        .save_report(&labbook_core::report::Report {
            kind: ReportKind::FlatHtml,
            filename: "r.html".to_string(),
            bytes: html.into_bytes(),
        })
        .expect("report should save");
    assert_eq!(path, "storage/reports/r.html");
    assert!(fx.dir.path().join("storage/reports/r.html").exists());
}

#[test]
fn test_report_for_missing_entry_is_not_found() {
    let fx = common::fixture();
    let err = fx
        .notebook
        .assemble_report(31337, ReportKind::FlatHtml)
        .expect_err("missing entry should fail");
    assert!(matches!(err, LabbookError::NotFound(_)));
}
