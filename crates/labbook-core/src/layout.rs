//! On-disk blob layout under the notebook data directory.
//!
//! Every path handed to the store is relative and uses forward slashes, so
//! rows stay portable between data directories:
//!
//! ```text
//! storage/attachments/<yyyy>/<mm>/<digest[..16]>.<ext>
//! storage/datasets/<yyyy>/<mm>/<name>_<yyyyMMdd_HHmmss>[_<n>].<ext>
//! storage/charts/<yyyy>/<mm>/chart_<dataset_id>_<yyyyMMdd_HHmmss_SSS>[_<n>].png
//! storage/reports/<filename>
//! templates/<filename>
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::error::{LabbookError, Result};

/// File name of the SQLite database inside the data directory.
pub const DATABASE_FILE: &str = "labbook.db";

const STAMP: &str = "%Y%m%d_%H%M%S";
const CHART_STAMP: &str = "%Y%m%d_%H%M%S_%3f";

#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE)
    }

    /// Resolve a stored relative path against the data directory.
    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }

    pub fn attachment_path(&self, at: DateTime<Utc>, digest: &str, ext: &str) -> String {
        let prefix: String = digest.chars().take(16).collect();
        format!(
            "storage/attachments/{}/{}.{}",
            at.format("%Y/%m"),
            prefix,
            ext
        )
    }

    /// Dataset blob path. `seq` 0 is the plain name; later attempts for the
    /// same second append `_<seq>`.
    pub fn dataset_path(&self, at: DateTime<Utc>, name: &str, ext: &str, seq: u32) -> String {
        format!(
            "storage/datasets/{}/{}_{}{}.{}",
            at.format("%Y/%m"),
            sanitize_name(name),
            at.format(STAMP),
            suffix(seq),
            ext
        )
    }

    pub fn chart_path(&self, at: DateTime<Utc>, dataset_id: i64, seq: u32) -> String {
        format!(
            "storage/charts/{}/chart_{}_{}{}.png",
            at.format("%Y/%m"),
            dataset_id,
            at.format(CHART_STAMP),
            suffix(seq)
        )
    }

    pub fn report_path(&self, filename: &str) -> String {
        format!("storage/reports/{}", filename)
    }

    /// Path for an uploaded template file. Directory components in the
    /// supplied name are dropped.
    pub fn template_path(&self, filename: &str) -> Result<String> {
        let base = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::trim)
            .filter(|n| !n.is_empty() && *n != "." && *n != "..")
            .ok_or_else(|| {
                LabbookError::Validation(format!("Invalid template filename '{}'", filename))
            })?;
        Ok(format!("templates/{}", base))
    }
}

/// Report file name: `report_entry_<id>_<yyyyMMdd_HHmmss>.<ext>`.
pub fn report_filename(entry_id: i64, at: DateTime<Utc>, ext: &str) -> String {
    format!("report_entry_{}_{}.{}", entry_id, at.format(STAMP), ext)
}

fn suffix(seq: u32) -> String {
    if seq == 0 {
        String::new()
    } else {
        format!("_{}", seq)
    }
}

/// Replace characters that would split or escape a path component.
pub fn sanitize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '_',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 7, 14, 5, 9).unwrap() + chrono::Duration::milliseconds(42)
    }

    #[test]
    fn test_attachment_path_uses_digest_prefix() {
        let layout = StorageLayout::new("/data");
        let digest = "0123456789abcdef0123456789abcdef";
        assert_eq!(
            layout.attachment_path(at(), digest, "png"),
            "storage/attachments/2026/03/0123456789abcdef.png"
        );
    }

    #[test]
    fn test_dataset_and_chart_paths() {
        let layout = StorageLayout::new("/data");
        assert_eq!(
            layout.dataset_path(at(), "growth curve", "csv", 0),
            "storage/datasets/2026/03/growth_curve_20260307_140509.csv"
        );
        assert_eq!(
            layout.dataset_path(at(), "growth curve", "csv", 2),
            "storage/datasets/2026/03/growth_curve_20260307_140509_2.csv"
        );
        assert_eq!(
            layout.chart_path(at(), 12, 0),
            "storage/charts/2026/03/chart_12_20260307_140509_042.png"
        );
        assert_eq!(
            layout.chart_path(at(), 12, 1),
            "storage/charts/2026/03/chart_12_20260307_140509_042_1.png"
        );
        assert_eq!(
            report_filename(4, at(), "docx"),
            "report_entry_4_20260307_140509.docx"
        );
    }

    #[test]
    fn test_template_path_strips_directories() {
        let layout = StorageLayout::new("/data");
        assert_eq!(
            layout.template_path("../../etc/base.docx").unwrap(),
            "templates/base.docx"
        );
        assert!(layout.template_path("..").is_err());
    }

    #[test]
    fn test_resolve_joins_components() {
        let layout = StorageLayout::new("/data");
        let resolved = layout.resolve("storage/reports/r.html");
        assert_eq!(
            resolved,
            PathBuf::from("/data").join("storage").join("reports").join("r.html")
        );
    }
}
