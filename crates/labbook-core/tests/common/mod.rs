#![allow(dead_code)]

use labbook_core::storage::{Entry, NewEntry, NewExperiment, NewProject, NewUser, User};
use labbook_core::{Notebook, NotebookStore};
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
    pub notebook: Notebook,
    pub user: User,
    pub project_id: i64,
    pub experiment_id: i64,
    pub entry: Entry,
}

/// A notebook in a scratch directory with one user, project, experiment
/// and entry.
pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let mut notebook = Notebook::open(dir.path()).expect("notebook should open");

    let user = notebook
        .store_mut()
        .create_user(&NewUser::new("Grace", "grace@lab.test"))
        .expect("user should be created");
    let project = notebook
        .store_mut()
        .create_project(
            &NewProject::new("Protein stability", user.id)
                .with_description("thermal shift assays")
                .with_tags(vec!["protein".into()]),
        )
        .expect("project should be created");
    let experiment = notebook
        .store_mut()
        .create_experiment(
            &NewExperiment::new(project.id, "Melt curves", user.id)
                .with_tags(vec!["dsf".into()]),
        )
        .expect("experiment should be created");
    let entry = notebook
        .create_entry(
            &NewEntry::new(experiment.id, user.id, "Plate 1")
                .with_body("# Setup\n- 96 wells\nRamp 1 C/min")
                .with_tags(vec!["plate".into()]),
        )
        .expect("entry should be created");

    Fixture {
        dir,
        notebook,
        user,
        project_id: project.id,
        experiment_id: experiment.id,
        entry,
    }
}

/// Minimal valid PNG (1x1, RGB).
pub fn tiny_png() -> Vec<u8> {
    let mut bytes = Vec::new();
    let image = image::RgbImage::from_pixel(1, 1, image::Rgb([10, 20, 30]));
    image::DynamicImage::ImageRgb8(image)
        .write_to(
            &mut std::io::Cursor::new(&mut bytes),
            image::ImageOutputFormat::Png,
        )
        .expect("png should encode");
    bytes
}

/// CSV with `rows` rows of two numeric columns.
pub fn numeric_csv(rows: usize) -> Vec<u8> {
    let mut out = String::from("time,signal\n");
    for i in 0..rows {
        out.push_str(&format!("{},{}\n", i, (i as f64) * 0.5 + 1.0));
    }
    out.into_bytes()
}
