//! Report assembly.
//!
//! A report is built in two steps. The gathered records are first turned
//! into a format-neutral model ([`ReportDocument`] or [`ReportWorkbook`], or
//! an HTML string), then the model is encoded. Every attachment, chart and
//! dataset is loaded on its own: a failure becomes inline placeholder
//! content and the rest of the report still completes.

pub mod bundle;
mod docx;
mod html;
mod markdown;
mod xlsx;

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LabbookError, Result};
use crate::layout::StorageLayout;
use crate::storage::types::{Attachment, Chart, Dataset, Entry, Experiment, Project};
use crate::tabular::{Cell, Table, TableKind};

/// Excel's sheet name length limit.
pub const MAX_SHEET_NAME_CHARS: usize = 31;

const XLSX_MAX_ROWS: usize = 1_048_576;
const XLSX_MAX_COLS: usize = 16_384;

/// Output encoding of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportKind {
    /// Structured document (DOCX)
    Document,
    /// Spreadsheet workbook (XLSX)
    Spreadsheet,
    /// Single static HTML page, used in place of PDF
    FlatHtml,
}

impl ReportKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportKind::Document => "docx",
            ReportKind::Spreadsheet => "xlsx",
            ReportKind::FlatHtml => "html",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            ReportKind::Document => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            ReportKind::Spreadsheet => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ReportKind::FlatHtml => "text/html",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ReportKind {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" | "document" => Ok(ReportKind::Document),
            "xlsx" | "spreadsheet" => Ok(ReportKind::Spreadsheet),
            "html" | "pdf" | "flat-html" => Ok(ReportKind::FlatHtml),
            other => Err(LabbookError::Validation(format!(
                "Unknown report format '{}' (expected docx, xlsx or html)",
                other
            ))),
        }
    }
}

/// Rendering knobs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportOptions {
    pub attachment_width_inches: f64,
    pub chart_width_inches: f64,

    /// chrono format for the metadata date
    pub timestamp_format: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            attachment_width_inches: 5.0,
            chart_width_inches: 5.5,
            timestamp_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}

/// An assembled report.
#[derive(Debug, Clone)]
pub struct Report {
    pub kind: ReportKind,
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A dataset together with its charts.
#[derive(Debug, Clone)]
pub struct DatasetSection {
    pub dataset: Dataset,
    pub charts: Vec<Chart>,
}

/// Everything a report draws from, already resolved from the store.
#[derive(Debug, Clone)]
pub struct ReportSource {
    /// Latest version of the entry
    pub entry: Entry,
    pub experiment: Option<Experiment>,
    pub project: Option<Project>,
    pub attachments: Vec<Attachment>,
    pub datasets: Vec<DatasetSection>,
}

/// Key/value block shown at the top of every report.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportMetadata {
    pub project: String,
    pub experiment: String,
    pub entry: String,
    pub date: String,
    pub version: String,
    pub tags: String,
}

impl ReportMetadata {
    pub fn from_source(source: &ReportSource, options: &ReportOptions) -> Self {
        let entry = &source.entry;
        Self {
            project: source
                .project
                .as_ref()
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            experiment: source
                .experiment
                .as_ref()
                .map(|e| e.title.clone())
                .unwrap_or_else(|| "N/A".to_string()),
            entry: entry.title.clone(),
            date: entry
                .created_at
                .format(&options.timestamp_format)
                .to_string(),
            version: entry.version.to_string(),
            tags: if entry.tags.is_empty() {
                "-".to_string()
            } else {
                entry.tags.join(", ")
            },
        }
    }

    pub fn rows(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Project", self.project.clone()),
            ("Experiment", self.experiment.clone()),
            ("Entry", self.entry.clone()),
            ("Date", self.date.clone()),
            ("Version", self.version.clone()),
            ("Tags", self.tags.clone()),
        ]
    }
}

/// A decoded image ready for embedding, re-encoded as PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

/// Outcome of loading one sub-resource.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedded {
    Image(ImageData),
    Failed(String),
}

impl Embedded {
    /// Read and decode an image file.
    pub fn load(path: &Path) -> Self {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Embedded::Failed(format!("file not found: {}", path.display()))
            }
            Err(err) => return Embedded::Failed(err.to_string()),
        };
        match decode_image(&bytes) {
            Ok(data) => Embedded::Image(data),
            Err(err) => Embedded::Failed(err.to_string()),
        }
    }
}

fn decode_image(bytes: &[u8]) -> Result<ImageData> {
    let image =
        image::load_from_memory(bytes).map_err(|e| LabbookError::Render(e.to_string()))?;
    let mut png = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut png, image::ImageOutputFormat::Png)
        .map_err(|e| LabbookError::Render(e.to_string()))?;
    Ok(ImageData {
        png: png.into_inner(),
        width_px: image.width(),
        height_px: image.height(),
    })
}

/// One block of the document model.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Title(String),
    Heading { level: u8, text: String },
    Paragraph(String),
    Centered(String),
    Bullet(String),
    KeyValueTable(Vec<(String, String)>),
    Image { data: ImageData, width_inches: f64 },
    PageBreak,
}

const IMAGE_MARKER: &str = "[Image could not be embedded:";
const CHART_MARKER: &str = "[Chart could not be embedded:";

/// Format-neutral document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportDocument {
    pub blocks: Vec<Block>,
}

impl ReportDocument {
    fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Text of every image or chart placeholder in the document.
    pub fn markers(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(text)
                    if text.starts_with(IMAGE_MARKER) || text.starts_with(CHART_MARKER) =>
                {
                    Some(text.as_str())
                }
                _ => None,
            })
            .collect()
    }
}

/// One worksheet of the spreadsheet model.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

/// Format-neutral workbook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportWorkbook {
    pub sheets: Vec<Sheet>,
}

fn format_stat(value: Option<&serde_json::Value>) -> String {
    match value.and_then(serde_json::Value::as_f64) {
        Some(v) => format!("{:.2}", v),
        None => "N/A".to_string(),
    }
}

/// Re-read a dataset's source file.
pub fn load_table(layout: &StorageLayout, dataset: &Dataset) -> Result<Table> {
    let path = layout.resolve(&dataset.path);
    let bytes = std::fs::read(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LabbookError::NotFound(format!("Source file {} not found", dataset.path))
        } else {
            LabbookError::from(e)
        }
    })?;
    let kind: TableKind = dataset.extension().parse()?;
    Table::parse(&bytes, kind)
}

/// Build the document model for `source`.
pub fn build_document(
    source: &ReportSource,
    options: &ReportOptions,
    layout: &StorageLayout,
) -> ReportDocument {
    let mut doc = ReportDocument::default();
    let entry = &source.entry;

    doc.push(Block::Title(entry.title.clone()));
    doc.push(Block::Heading {
        level: 1,
        text: "Report info".to_string(),
    });
    let meta = ReportMetadata::from_source(source, options);
    doc.push(Block::KeyValueTable(
        meta.rows()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    ));

    doc.push(Block::Heading {
        level: 1,
        text: "Content".to_string(),
    });
    doc.blocks.extend(markdown::blocks(&entry.body));

    if !source.attachments.is_empty() {
        doc.push(Block::PageBreak);
        doc.push(Block::Heading {
            level: 1,
            text: "Attachments".to_string(),
        });
        for (i, attachment) in source.attachments.iter().enumerate() {
            doc.push(Block::Heading {
                level: 2,
                text: format!("Attachment {}: {}", i + 1, attachment.original_name),
            });
            if let Some(ref caption) = attachment.caption {
                doc.push(Block::Paragraph(caption.clone()));
            }
            if !attachment.is_image() {
                continue;
            }
            match Embedded::load(&layout.resolve(&attachment.path)) {
                Embedded::Image(data) => doc.push(Block::Image {
                    data,
                    width_inches: options.attachment_width_inches,
                }),
                Embedded::Failed(reason) => {
                    tracing::warn!(
                        attachment_id = attachment.id,
                        %reason,
                        "attachment replaced by placeholder"
                    );
                    doc.push(Block::Paragraph(format!("{} {}]", IMAGE_MARKER, reason)));
                }
            }
        }
    }

    if !source.datasets.is_empty() {
        doc.push(Block::PageBreak);
        doc.push(Block::Heading {
            level: 1,
            text: "Datasets and charts".to_string(),
        });
        for section in &source.datasets {
            let dataset = &section.dataset;
            doc.push(Block::Heading {
                level: 2,
                text: format!("Dataset: {}", dataset.name),
            });
            doc.push(Block::Paragraph(format!("Rows: {}", dataset.row_count)));

            if let Some(stats) = dataset.stats.as_object().filter(|m| !m.is_empty()) {
                doc.push(Block::Paragraph("Statistics:".to_string()));
                for (column, values) in stats {
                    doc.push(Block::Bullet(format!(
                        "{}: mean={}, std={}, min={}, max={}",
                        column,
                        format_stat(values.get("mean")),
                        format_stat(values.get("std")),
                        format_stat(values.get("min")),
                        format_stat(values.get("max")),
                    )));
                }
            }

            for chart in &section.charts {
                match Embedded::load(&layout.resolve(&chart.path)) {
                    Embedded::Image(data) => {
                        doc.push(Block::Image {
                            data,
                            width_inches: options.chart_width_inches,
                        });
                        if let Some(ref title) = chart.title {
                            doc.push(Block::Centered(title.clone()));
                        }
                    }
                    Embedded::Failed(reason) => {
                        tracing::warn!(chart_id = chart.id, %reason, "chart replaced by placeholder");
                        doc.push(Block::Paragraph(format!("{} {}]", CHART_MARKER, reason)));
                    }
                }
            }
        }
    }

    doc
}

/// Sheet name: index prefix plus dataset name, within Excel's limits.
pub fn sheet_name(index: usize, name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
            other => other,
        })
        .collect();
    let full = format!("{}_{}", index, cleaned.trim().trim_matches('\''));
    full.chars().take(MAX_SHEET_NAME_CHARS).collect()
}

/// Build the workbook model: a summary sheet plus one sheet per dataset.
pub fn build_workbook(
    source: &ReportSource,
    options: &ReportOptions,
    layout: &StorageLayout,
) -> ReportWorkbook {
    let meta = ReportMetadata::from_source(source, options);
    let mut summary = vec![vec![
        Cell::Text("Field".to_string()),
        Cell::Text("Value".to_string()),
    ]];
    summary.extend(
        meta.rows()
            .into_iter()
            .map(|(k, v)| vec![Cell::Text(k.to_string()), Cell::Text(v)]),
    );

    let mut workbook = ReportWorkbook {
        sheets: vec![Sheet {
            name: "Summary".to_string(),
            rows: summary,
        }],
    };

    for (i, section) in source.datasets.iter().enumerate() {
        let dataset = &section.dataset;
        let name = sheet_name(i + 1, &dataset.name);
        let loaded = load_table(layout, dataset).and_then(|table| {
            if table.row_count() + 1 > XLSX_MAX_ROWS || table.headers.len() > XLSX_MAX_COLS {
                return Err(LabbookError::Validation(
                    "table exceeds worksheet limits".to_string(),
                ));
            }
            Ok(table)
        });
        let rows = match loaded {
            Ok(table) => {
                let mut rows = vec![table
                    .headers
                    .iter()
                    .map(|h| Cell::Text(h.clone()))
                    .collect::<Vec<_>>()];
                rows.extend(table.rows);
                rows
            }
            Err(err) => {
                tracing::warn!(dataset_id = dataset.id, error = %err, "dataset replaced by error sheet");
                vec![vec![Cell::Text(format!(
                    "Dataset could not be loaded: {}",
                    err
                ))]]
            }
        };
        workbook.sheets.push(Sheet { name, rows });
    }

    workbook
}

/// Build the flat HTML page.
pub fn build_html(source: &ReportSource, options: &ReportOptions) -> String {
    let meta = ReportMetadata::from_source(source, options);
    html::render(&source.entry.title, &meta, &source.entry.body)
}

/// Encode `source` as `kind`.
///
/// # Errors
///
/// Returns `LabbookError::Render` if the document encoder fails. Missing or
/// unreadable sub-resources never fail the report.
pub fn render(
    kind: ReportKind,
    source: &ReportSource,
    options: &ReportOptions,
    layout: &StorageLayout,
) -> Result<Vec<u8>> {
    match kind {
        ReportKind::Document => docx::encode(&build_document(source, options, layout)),
        ReportKind::Spreadsheet => xlsx::encode(&build_workbook(source, options, layout)),
        ReportKind::FlatHtml => Ok(build_html(source, options).into_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn source() -> ReportSource {
        let at = Utc.with_ymd_and_hms(2026, 5, 4, 9, 30, 0).unwrap();
        ReportSource {
            entry: Entry {
                id: 3,
                experiment_id: 1,
                author_id: 1,
                title: "Buffer prep".into(),
                body: "# Steps\n- weigh\nstir".into(),
                tags: vec!["buffer".into(), "ph".into()],
                version: 2,
                parent_version_id: Some(1),
                created_at: at,
                updated_at: at,
            },
            experiment: None,
            project: None,
            attachments: Vec::new(),
            datasets: Vec::new(),
        }
    }

    #[test]
    fn test_metadata_uses_placeholders() {
        let meta = ReportMetadata::from_source(&source(), &ReportOptions::default());
        assert_eq!(meta.project, "N/A");
        assert_eq!(meta.experiment, "N/A");
        assert_eq!(meta.date, "2026-05-04 09:30");
        assert_eq!(meta.version, "2");
        assert_eq!(meta.tags, "buffer, ph");
    }

    #[test]
    fn test_document_section_order() {
        let layout = StorageLayout::new("/nonexistent");
        let doc = build_document(&source(), &ReportOptions::default(), &layout);
        assert_eq!(doc.blocks[0], Block::Title("Buffer prep".into()));
        assert!(matches!(doc.blocks[2], Block::KeyValueTable(ref rows) if rows.len() == 6));
        assert_eq!(
            doc.blocks[3],
            Block::Heading {
                level: 1,
                text: "Content".into()
            }
        );
        assert_eq!(doc.blocks[5], Block::Bullet("weigh".into()));
        assert!(!doc.blocks.contains(&Block::PageBreak));
    }

    #[test]
    fn test_markers_ignore_bracketed_body_text() {
        let mut src = source();
        src.entry.body = "[Smith et al. 2020]".into();
        src.attachments.push(Attachment {
            id: 1,
            entry_id: 3,
            path: "storage/attachments/2026/05/missing.png".into(),
            file_type: "png".into(),
            size_bytes: 10,
            original_name: "gel.png".into(),
            caption: None,
            sha256: "00".repeat(32),
            created_at: src.entry.created_at,
        });

        let layout = StorageLayout::new("/nonexistent");
        let doc = build_document(&src, &ReportOptions::default(), &layout);

        assert!(doc
            .blocks
            .contains(&Block::Paragraph("[Smith et al. 2020]".into())));
        let markers = doc.markers();
        assert_eq!(markers.len(), 1);
        assert!(markers[0].starts_with(IMAGE_MARKER));
    }

    #[test]
    fn test_sheet_name_is_truncated_and_cleaned() {
        let name = sheet_name(2, "growth/curve: replicate A with a long suffix");
        assert_eq!(name.chars().count(), MAX_SHEET_NAME_CHARS);
        assert!(name.starts_with("2_growth_curve_"));
    }

    #[test]
    fn test_report_kind_parse() {
        assert_eq!("pdf".parse::<ReportKind>().unwrap(), ReportKind::FlatHtml);
        assert_eq!("DOCX".parse::<ReportKind>().unwrap().extension(), "docx");
        assert!("odt".parse::<ReportKind>().is_err());
    }

    #[test]
    fn test_stat_formatting_marks_unavailable() {
        assert_eq!(format_stat(Some(&serde_json::json!(1.234))), "1.23");
        assert_eq!(format_stat(Some(&serde_json::Value::Null)), "N/A");
        assert_eq!(format_stat(None), "N/A");
    }
}
