mod common;

use labbook_core::report::bundle;
use labbook_core::storage::EntryPatch;
use labbook_core::LabbookError;

#[test]
fn test_bundle_contains_every_version_and_skips_lost_files() {
    let mut fx = common::fixture();
    fx.notebook
        .upload_attachment(fx.entry.id, "raw data.csv", b"a\n1\n", None)
        .expect("upload should succeed");
    let lost = fx
        .notebook
        .upload_attachment(fx.entry.id, "lost.csv", b"a\n2\n", None)
        .expect("upload should succeed");
    std::fs::remove_file(fx.dir.path().join(&lost.path)).expect("blob should exist");
    fx.notebook
        .import_dataset(fx.entry.id, "melt", "melt.csv", &common::numeric_csv(3))
        .expect("import should succeed");
    let revised = fx
        .notebook
        .revise_entry(fx.entry.id, &EntryPatch::new().body("final"))
        .expect("revise should succeed");

    let bytes = fx
        .notebook
        .export_bundle(fx.experiment_id)
        .expect("bundle should build");
    let files = bundle::unpack(&bytes).expect("bundle should unpack");
    let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();

    let first_dir = format!("entry_{}_Plate_1", fx.entry.id);
    let second_dir = format!("entry_{}_Plate_1", revised.id);
    assert_eq!(
        paths,
        vec![
            format!("{}/entry.txt", first_dir),
            format!("{}/attachments/raw_data.csv", first_dir),
            format!("{}/datasets/melt.csv", first_dir),
            format!("{}/entry.txt", second_dir),
        ]
    );
}

#[test]
fn test_bundle_for_missing_experiment_is_not_found() {
    let fx = common::fixture();
    let err = fx
        .notebook
        .export_bundle(404)
        .expect_err("missing experiment should fail");
    assert!(matches!(err, LabbookError::NotFound(_)));
}
