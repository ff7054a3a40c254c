//! The notebook service: a store plus the blob layout under one data
//! directory.
//!
//! Store rows only hold relative paths; this type owns the files they point
//! at. A blob is written before its row is inserted and removed again if
//! the insert fails. Blob writes never replace an existing file, and only
//! a blob the failing call wrote itself is removed.

use std::io;
use std::path::Path;

use chrono::Utc;

use crate::attachment::{sha256_hex, validate_upload};
use crate::chart::{ChartRenderer, ChartRequest, PlotRenderer};
use crate::error::{LabbookError, Result};
use crate::fs::{remove_if_exists, write_atomic, write_new};
use crate::layout::{report_filename, StorageLayout};
use crate::report::bundle::{self, BundleEntry};
use crate::report::{self, DatasetSection, Report, ReportKind, ReportOptions, ReportSource};
use crate::storage::{
    Attachment, AttachmentFilter, Chart, Dataset, Entry, EntryFilter, EntryPatch, NewAttachment,
    NewChart, NewDataset, NewEntry, NewTemplate, NotebookStore, SqliteStore, Template,
    TemplateKind,
};
use crate::tabular::{Table, TableKind};

/// Upper bound on rows returned by a dataset preview.
pub const MAX_PREVIEW_ROWS: usize = 1000;

/// Disambiguated paths tried before a dataset or chart write gives up.
const MAX_PATH_ATTEMPTS: u32 = 100;

/// A dataset preview: the stored metadata plus the first rows.
#[derive(Debug, Clone)]
pub struct DatasetPreview {
    pub dataset: Dataset,
    pub rows: Vec<serde_json::Map<String, serde_json::Value>>,
}

pub struct Notebook<S: NotebookStore = SqliteStore> {
    store: S,
    layout: StorageLayout,
    renderer: Box<dyn ChartRenderer>,
    report_options: ReportOptions,
}

impl Notebook<SqliteStore> {
    /// Open (or create) the notebook rooted at `data_dir`.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let layout = StorageLayout::new(data_dir.as_ref());
        std::fs::create_dir_all(layout.root())?;
        let store = SqliteStore::open(&layout.database_path())?;
        Ok(Self::new(store, layout))
    }
}

impl<S: NotebookStore> Notebook<S> {
    pub fn new(store: S, layout: StorageLayout) -> Self {
        Self {
            store,
            layout,
            renderer: Box::new(PlotRenderer::default()),
            report_options: ReportOptions::default(),
        }
    }

    pub fn with_renderer(mut self, renderer: Box<dyn ChartRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_report_options(mut self, options: ReportOptions) -> Self {
        self.report_options = options;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    fn require_entry(&self, entry_id: i64) -> Result<Entry> {
        self.store
            .get_entry(entry_id)?
            .ok_or_else(|| LabbookError::not_found("Entry", entry_id))
    }

    fn require_dataset(&self, dataset_id: i64) -> Result<Dataset> {
        self.store
            .get_dataset(dataset_id)?
            .ok_or_else(|| LabbookError::not_found("Dataset", dataset_id))
    }

    /// Write `bytes` to the first free path among `candidates`. A path that
    /// already holds a file is skipped, never replaced.
    fn claim_blob(
        &self,
        candidates: impl IntoIterator<Item = String>,
        bytes: &[u8],
    ) -> Result<String> {
        let mut last = String::new();
        for path in candidates {
            match write_new(&self.layout.resolve(&path), bytes) {
                Ok(()) => return Ok(path),
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    tracing::debug!(path = %path, "storage path taken");
                    last = path;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Err(LabbookError::Conflict(format!(
            "No free storage path next to '{}'",
            last
        )))
    }

    /// Run `insert` for a blob this call wrote at `path`, removing the blob
    /// again if the insert fails.
    fn insert_claimed<T>(
        &mut self,
        path: &str,
        insert: impl FnOnce(&mut S) -> Result<T>,
    ) -> Result<T> {
        insert(&mut self.store).map_err(|err| {
            if let Err(cleanup) = remove_if_exists(&self.layout.resolve(path)) {
                tracing::warn!(path, error = %cleanup, "orphaned blob left behind");
            }
            err
        })
    }

    // --- Entries ---

    pub fn create_entry(&mut self, entry: &NewEntry) -> Result<Entry> {
        self.store.create_entry(entry)
    }

    pub fn revise_entry(&mut self, id: i64, patch: &EntryPatch) -> Result<Entry> {
        self.store.revise_entry(id, patch)
    }

    pub fn entry_history(&self, id: i64) -> Result<Vec<Entry>> {
        self.store.entry_history(id)
    }

    // --- Attachments ---

    /// Store an uploaded file against an entry row.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the entry does not exist
    /// - `Validation` for a disallowed extension or an oversized file
    /// - `Conflict` if identical bytes were uploaded before
    pub fn upload_attachment(
        &mut self,
        entry_id: i64,
        filename: &str,
        bytes: &[u8],
        caption: Option<&str>,
    ) -> Result<Attachment> {
        self.require_entry(entry_id)?;
        let ext = validate_upload(filename, bytes.len() as u64)?;
        let digest = sha256_hex(bytes);

        if let Some(existing) = self.store.find_attachment_by_digest(&digest)? {
            return Err(LabbookError::Conflict(format!(
                "This file has already been uploaded (ID: {})",
                existing.id
            )));
        }

        self.store_attachment(entry_id, filename, ext, digest, bytes, caption)
    }

    /// Write the blob for an upload that passed the digest check and record
    /// its row. A concurrent upload of the same bytes may already own the
    /// file; it is then reused and left in place if the insert conflicts.
    fn store_attachment(
        &mut self,
        entry_id: i64,
        filename: &str,
        ext: String,
        digest: String,
        bytes: &[u8],
        caption: Option<&str>,
    ) -> Result<Attachment> {
        let path = self.layout.attachment_path(Utc::now(), &digest, &ext);
        let absolute = self.layout.resolve(&path);
        let created = match write_new(&absolute, bytes) {
            Ok(()) => true,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                // Same digest means another upload of these bytes owns the file.
                if sha256_hex(&std::fs::read(&absolute)?) != digest {
                    return Err(LabbookError::Conflict(format!(
                        "Storage path '{}' holds different content",
                        path
                    )));
                }
                tracing::debug!(path = %path, "attachment blob already on disk");
                false
            }
            Err(err) => return Err(err.into()),
        };

        let new = NewAttachment {
            entry_id,
            path: path.clone(),
            file_type: ext,
            size_bytes: bytes.len() as i64,
            original_name: filename.to_string(),
            caption: caption.map(str::to_string),
            sha256: digest,
        };
        tracing::debug!(entry_id, path = %path, created, "recording attachment");
        if created {
            self.insert_claimed(&path, |store| store.insert_attachment(&new))
        } else {
            self.store.insert_attachment(&new)
        }
    }

    /// Fetch an attachment row and its bytes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the row or its blob is missing.
    pub fn read_attachment(&self, id: i64) -> Result<(Attachment, Vec<u8>)> {
        let attachment = self
            .store
            .get_attachment(id)?
            .ok_or_else(|| LabbookError::not_found("Attachment", id))?;
        let bytes = std::fs::read(self.layout.resolve(&attachment.path)).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LabbookError::NotFound(format!("File for attachment {} not found", id))
            } else {
                LabbookError::from(e)
            }
        })?;
        Ok((attachment, bytes))
    }

    pub fn list_attachments(&self, filter: &AttachmentFilter) -> Result<Vec<Attachment>> {
        self.store.list_attachments(filter)
    }

    /// Remove an attachment row and its blob. A blob that is already gone
    /// does not block the delete.
    pub fn delete_attachment(&mut self, id: i64, actor_id: i64) -> Result<Attachment> {
        let attachment = self
            .store
            .get_attachment(id)?
            .ok_or_else(|| LabbookError::not_found("Attachment", id))?;
        let removed = remove_if_exists(&self.layout.resolve(&attachment.path))?;
        if !removed {
            tracing::debug!(attachment_id = id, "attachment blob already missing");
        }
        self.store.delete_attachment(id, actor_id)
    }

    // --- Datasets ---

    /// Parse, profile and persist a tabular upload.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the entry does not exist
    /// - `Validation` for an unsupported format, a parse failure, or a
    ///   table without data rows
    pub fn import_dataset(
        &mut self,
        entry_id: i64,
        name: &str,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Dataset> {
        self.require_entry(entry_id)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(LabbookError::Validation(
                "dataset name must not be empty".to_string(),
            ));
        }

        let kind = TableKind::from_filename(filename)?;
        let table = Table::parse(bytes, kind)?;
        let profile = table.profile()?;

        let columns = profile.columns_json()?;
        let stats = profile.stats_json()?;

        let at = Utc::now();
        let path = self.claim_blob(
            (0..MAX_PATH_ATTEMPTS)
                .map(|seq| self.layout.dataset_path(at, name, kind.extension(), seq)),
            bytes,
        )?;
        let new = NewDataset {
            entry_id,
            name: name.to_string(),
            path: path.clone(),
            columns,
            stats,
            row_count: profile.row_count as i64,
        };
        tracing::debug!(entry_id, rows = profile.row_count, path = %path, "importing dataset");
        self.insert_claimed(&path, |store| store.insert_dataset(&new))
    }

    pub fn list_datasets(&self, entry_id: Option<i64>) -> Result<Vec<Dataset>> {
        self.store.list_datasets(entry_id)
    }

    /// First `rows` rows of a dataset, re-read from its source file.
    pub fn preview_dataset(&self, id: i64, rows: usize) -> Result<DatasetPreview> {
        if rows == 0 || rows > MAX_PREVIEW_ROWS {
            return Err(LabbookError::Validation(format!(
                "rows must be between 1 and {}",
                MAX_PREVIEW_ROWS
            )));
        }
        let dataset = self.require_dataset(id)?;
        let table = report::load_table(&self.layout, &dataset)?;
        Ok(DatasetPreview {
            rows: table.preview(rows),
            dataset,
        })
    }

    // --- Charts ---

    /// Render a chart from a stored dataset and persist the image.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the dataset or its source file is missing
    /// - `Validation` if either column is not in the dataset
    /// - `Render` if the renderer fails
    pub fn render_chart(
        &mut self,
        dataset_id: i64,
        request: &ChartRequest,
        actor_id: i64,
    ) -> Result<Chart> {
        let dataset = self.require_dataset(dataset_id)?;
        request.check_columns(&dataset.column_names())?;

        let table = report::load_table(&self.layout, &dataset)?;
        let png = self.renderer.render(&table, request)?;

        let at = Utc::now();
        let path = self.claim_blob(
            (0..MAX_PATH_ATTEMPTS).map(|seq| self.layout.chart_path(at, dataset_id, seq)),
            &png,
        )?;
        let new = NewChart {
            dataset_id,
            kind: request.kind,
            x_column: request.x_column.clone(),
            y_column: request.y_column.clone(),
            title: request.title.clone(),
            path: path.clone(),
            config: request.config.clone(),
            actor_id,
        };
        self.insert_claimed(&path, |store| store.insert_chart(&new))
    }

    pub fn list_charts(&self, dataset_id: i64) -> Result<Vec<Chart>> {
        self.require_dataset(dataset_id)?;
        self.store.list_charts(dataset_id)
    }

    // --- Templates ---

    /// Persist a template file under `templates/` and register it.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if a template file of the same name is already
    /// stored.
    pub fn create_template(
        &mut self,
        template: NewTemplate,
        filename: &str,
        bytes: &[u8],
    ) -> Result<Template> {
        let path = self.layout.template_path(filename)?;
        match write_new(&self.layout.resolve(&path), bytes) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                return Err(LabbookError::Conflict(format!(
                    "A template file named '{}' already exists",
                    path.trim_start_matches("templates/")
                )));
            }
            Err(err) => return Err(err.into()),
        }
        let new = NewTemplate { path: path.clone(), ..template };
        self.insert_claimed(&path, |store| store.insert_template(&new))
    }

    pub fn list_templates(&self, kind: Option<TemplateKind>) -> Result<Vec<Template>> {
        self.store.list_templates(kind)
    }

    pub fn set_default_template(&mut self, id: i64) -> Result<Template> {
        self.store.set_default_template(id)
    }

    /// Delete a template row, then its file if still present.
    pub fn delete_template(&mut self, id: i64) -> Result<Template> {
        let template = self.store.delete_template(id)?;
        if let Err(err) = remove_if_exists(&self.layout.resolve(&template.path)) {
            tracing::warn!(template_id = id, error = %err, "template file not removed");
        }
        Ok(template)
    }

    // --- Reports ---

    /// Gather everything a report of `entry_id` draws from.
    ///
    /// The entry is resolved to the head of its chain. Attachments and
    /// datasets are collected from every row of the chain, since they stay
    /// attached to the row they were uploaded against.
    pub fn report_source(&self, entry_id: i64) -> Result<ReportSource> {
        let entry = self.store.latest_version(entry_id)?;
        let experiment = self.store.get_experiment(entry.experiment_id)?;
        let project = match &experiment {
            Some(experiment) => self.store.get_project(experiment.project_id)?,
            None => None,
        };

        let mut attachments = Vec::new();
        let mut datasets = Vec::new();
        for row in self.store.entry_history(entry.id)? {
            attachments.extend(
                self.store
                    .list_attachments(&AttachmentFilter::new().entry(row.id))?,
            );
            for dataset in self.store.list_datasets(Some(row.id))? {
                let charts = self.store.list_charts(dataset.id)?;
                datasets.push(DatasetSection { dataset, charts });
            }
        }

        Ok(ReportSource {
            entry,
            experiment,
            project,
            attachments,
            datasets,
        })
    }

    /// Assemble a report for the latest version of `entry_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the entry does not exist. Missing or broken
    /// attachments, datasets and charts become inline markers instead.
    pub fn assemble_report(&self, entry_id: i64, kind: ReportKind) -> Result<Report> {
        let source = self.report_source(entry_id)?;
        let bytes = report::render(kind, &source, &self.report_options, &self.layout)?;
        let filename = report_filename(source.entry.id, Utc::now(), kind.extension());
        tracing::info!(entry_id = source.entry.id, kind = %kind, filename = %filename, "report assembled");
        Ok(Report {
            kind,
            filename,
            bytes,
        })
    }

    /// Write an assembled report under `storage/reports/` and return its
    /// relative path.
    pub fn save_report(&self, report: &Report) -> Result<String> {
        let path = self.layout.report_path(&report.filename);
        write_atomic(&self.layout.resolve(&path), &report.bytes)?;
        Ok(path)
    }

    /// Bundle every entry row of an experiment with its files.
    pub fn export_bundle(&self, experiment_id: i64) -> Result<Vec<u8>> {
        self.store
            .get_experiment(experiment_id)?
            .ok_or_else(|| LabbookError::not_found("Experiment", experiment_id))?;

        let mut entries = self.store.list_entries(
            &EntryFilter::new()
                .experiment(experiment_id)
                .include_superseded(true),
        )?;
        entries.sort_by_key(|e| e.id);

        let mut items = Vec::with_capacity(entries.len());
        for entry in entries {
            let attachments = self
                .store
                .list_attachments(&AttachmentFilter::new().entry(entry.id))?;
            let datasets = self.store.list_datasets(Some(entry.id))?;
            items.push(BundleEntry {
                entry,
                attachments,
                datasets,
            });
        }
        bundle::build(&self.layout, &items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartKind;
    use crate::storage::{NewExperiment, NewProject, NewUser};
    use tempfile::tempdir;

    fn seeded() -> (tempfile::TempDir, Notebook, Entry) {
        let dir = tempdir().unwrap();
        let mut nb = Notebook::open(dir.path()).unwrap();
        let user = nb
            .store_mut()
            .create_user(&NewUser::new("Ada", "ada@lab.test"))
            .unwrap();
        let project = nb
            .store_mut()
            .create_project(&NewProject::new("Enzymes", user.id))
            .unwrap();
        let experiment = nb
            .store_mut()
            .create_experiment(&NewExperiment::new(project.id, "Kinetics", user.id))
            .unwrap();
        let entry = nb
            .create_entry(&NewEntry::new(experiment.id, user.id, "Day 1").with_body("ok"))
            .unwrap();
        (dir, nb, entry)
    }

    #[test]
    fn test_upload_writes_blob_under_layout() {
        let (dir, mut nb, entry) = seeded();
        let att = nb
            .upload_attachment(entry.id, "raw.csv", b"a,b\n1,2\n", Some("raw"))
            .unwrap();
        assert!(att.path.starts_with("storage/attachments/"));
        assert!(dir.path().join(&att.path).exists());

        let (_, bytes) = nb.read_attachment(att.id).unwrap();
        assert_eq!(bytes, b"a,b\n1,2\n");
    }

    #[test]
    fn test_failed_insert_removes_blob() {
        let (dir, mut nb, _) = seeded();
        let err = nb
            .create_template(NewTemplate::new(TemplateKind::Docx, "  ", ""), "t.docx", b"PK")
            .unwrap_err();
        assert!(matches!(err, LabbookError::Validation(_)));
        assert!(!dir.path().join("templates/t.docx").exists());
    }

    #[test]
    fn test_preview_bounds() {
        let (_dir, mut nb, entry) = seeded();
        let ds = nb
            .import_dataset(entry.id, "runs", "runs.csv", b"x,y\n1,2\n3,4\n5,6\n")
            .unwrap();
        assert_eq!(nb.preview_dataset(ds.id, 2).unwrap().rows.len(), 2);
        assert!(nb.preview_dataset(ds.id, 0).is_err());
        assert!(nb.preview_dataset(ds.id, MAX_PREVIEW_ROWS + 1).is_err());
    }

    #[test]
    fn test_render_chart_records_png() {
        let (dir, mut nb, entry) = seeded();
        let ds = nb
            .import_dataset(entry.id, "runs", "runs.csv", b"x,y\n1,2\n2,4\n3,9\n")
            .unwrap();
        let chart = nb
            .render_chart(ds.id, &ChartRequest::new(ChartKind::Line, "x", "y"), entry.author_id)
            .unwrap();
        let png = std::fs::read(dir.path().join(&chart.path)).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
        assert_eq!(nb.list_charts(ds.id).unwrap().len(), 1);
    }

    #[test]
    fn test_back_to_back_datasets_and_charts_keep_their_own_blobs() {
        let (dir, mut nb, entry) = seeded();
        let first = nb
            .import_dataset(entry.id, "melt", "melt.csv", b"t,f\n1,0.1\n2,0.4\n3,0.9\n")
            .expect("first import should succeed");
        let second = nb
            .import_dataset(entry.id, "melt", "melt.csv", b"t,f\n1,0.2\n")
            .expect("second import should succeed");

        assert_ne!(first.path, second.path);
        assert!(second.path.starts_with("storage/datasets/"));
        assert_eq!(
            nb.preview_dataset(first.id, 10).unwrap().rows.len() as i64,
            first.row_count
        );
        assert_eq!(
            nb.preview_dataset(second.id, 10).unwrap().rows.len() as i64,
            second.row_count
        );

        let line = nb
            .render_chart(first.id, &ChartRequest::new(ChartKind::Line, "t", "f"), entry.author_id)
            .expect("line chart should succeed");
        let line_png = std::fs::read(dir.path().join(&line.path)).unwrap();
        let hist = nb
            .render_chart(
                first.id,
                &ChartRequest::new(ChartKind::Histogram, "t", "f"),
                entry.author_id,
            )
            .expect("histogram should succeed");

        assert_ne!(line.path, hist.path);
        assert_eq!(std::fs::read(dir.path().join(&line.path)).unwrap(), line_png);
        assert!(dir.path().join(&hist.path).exists());
    }

    #[test]
    fn test_claim_blob_skips_occupied_paths() {
        let (dir, nb, _) = seeded();
        let at = Utc::now();
        let taken = nb.layout().chart_path(at, 7, 0);
        crate::fs::write_new(&dir.path().join(&taken), b"existing").unwrap();

        let claimed = nb
            .claim_blob((0..3).map(|seq| nb.layout().chart_path(at, 7, seq)), b"fresh")
            .expect("claim should succeed");

        assert_eq!(claimed, nb.layout().chart_path(at, 7, 1));
        assert_eq!(std::fs::read(dir.path().join(&taken)).unwrap(), b"existing");

        let err = nb
            .claim_blob(std::iter::once(taken), b"fresh")
            .unwrap_err();
        assert!(matches!(err, LabbookError::Conflict(_)));
    }

    #[test]
    fn test_losing_duplicate_upload_leaves_winner_blob() {
        let (_dir, mut nb, entry) = seeded();
        let bytes: &[u8] = b"a,b\n1,2\n";
        let winner = nb
            .upload_attachment(entry.id, "raw.csv", bytes, None)
            .expect("first upload should succeed");

        // Same bytes arriving after the digest check already passed.
        let err = nb
            .store_attachment(
                entry.id,
                "copy.csv",
                "csv".to_string(),
                sha256_hex(bytes),
                bytes,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, LabbookError::Conflict(_)));

        let (_, stored) = nb
            .read_attachment(winner.id)
            .expect("winner blob should still be readable");
        assert_eq!(stored, bytes);
    }

    #[test]
    fn test_template_filename_collision_is_conflict() {
        let (dir, mut nb, _) = seeded();
        let first = nb
            .create_template(
                NewTemplate::new(TemplateKind::Docx, "Standard", ""),
                "standard.docx",
                b"PK-one",
            )
            .expect("first template should succeed");

        let err = nb
            .create_template(
                NewTemplate::new(TemplateKind::Docx, "Other", ""),
                "standard.docx",
                b"PK-two",
            )
            .unwrap_err();
        assert!(matches!(err, LabbookError::Conflict(ref msg) if msg.contains("standard.docx")));

        let err = nb
            .create_template(
                NewTemplate::new(TemplateKind::Docx, "  ", ""),
                "standard.docx",
                b"PK-three",
            )
            .unwrap_err();
        assert!(matches!(err, LabbookError::Conflict(_)));

        assert_eq!(
            std::fs::read(dir.path().join(&first.path)).unwrap(),
            b"PK-one"
        );
    }
}
