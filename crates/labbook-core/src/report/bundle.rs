//! Experiment bundles: a zstd-compressed tar of every entry of an
//! experiment with its attachments and dataset source files.
//!
//! ```text
//! entry_<id>_<title[..20]>/entry.txt
//! entry_<id>_<title[..20]>/attachments/<original name>
//! entry_<id>_<title[..20]>/datasets/<dataset name>.<ext>
//! ```
//!
//! A blob that cannot be read or appended is skipped with a warning and
//! the archive continues.

use std::io::Cursor;

use chrono::Utc;

use crate::error::{LabbookError, Result};
use crate::layout::{sanitize_name, StorageLayout};
use crate::storage::types::{Attachment, Dataset, Entry};

/// zstd level used for bundles.
pub const COMPRESSION_LEVEL: i32 = 3;

/// One entry row and the files attached to it.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub entry: Entry,
    pub attachments: Vec<Attachment>,
    pub datasets: Vec<Dataset>,
}

pub fn entry_dir(entry: &Entry) -> String {
    let short: String = entry.title.chars().take(20).collect();
    format!("entry_{}_{}", entry.id, sanitize_name(&short))
}

pub fn entry_text(entry: &Entry) -> String {
    format!(
        "Entry: {}\nDate: {}\nVersion: {}\nTags: {}\n\n{}\n",
        entry.title,
        entry.created_at.to_rfc3339(),
        entry.version,
        entry.tags.join(", "),
        entry.body
    )
}

struct Archive {
    builder: tar::Builder<Vec<u8>>,
    mtime: u64,
}

impl Archive {
    fn new() -> Self {
        Self {
            builder: tar::Builder::new(Vec::new()),
            mtime: Utc::now().timestamp().max(0) as u64,
        }
    }

    fn append(&mut self, path: &str, bytes: &[u8]) -> std::io::Result<()> {
        let mut header = tar::Header::new_gnu();
        header.set_size(bytes.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(self.mtime);
        self.builder.append_data(&mut header, path, bytes)
    }

    fn finish(self) -> Result<Vec<u8>> {
        let tar_bytes = self.builder.into_inner()?;
        Ok(zstd::encode_all(Cursor::new(tar_bytes), COMPRESSION_LEVEL)?)
    }
}

/// Build the compressed archive for `entries`.
///
/// # Errors
///
/// Fails only when an `entry.txt` cannot be written or compression fails.
pub fn build(layout: &StorageLayout, entries: &[BundleEntry]) -> Result<Vec<u8>> {
    let mut archive = Archive::new();
    let mut skipped = 0usize;

    for item in entries {
        let dir = entry_dir(&item.entry);
        archive
            .append(&format!("{}/entry.txt", dir), entry_text(&item.entry).as_bytes())
            .map_err(|e| LabbookError::Storage(format!("Bundle write failed: {}", e)))?;

        for attachment in &item.attachments {
            let target = format!(
                "{}/attachments/{}",
                dir,
                sanitize_name(&attachment.original_name)
            );
            let result = std::fs::read(layout.resolve(&attachment.path))
                .and_then(|bytes| archive.append(&target, &bytes));
            if let Err(err) = result {
                skipped += 1;
                tracing::warn!(
                    attachment_id = attachment.id,
                    error = %err,
                    "attachment skipped in bundle"
                );
            }
        }

        for dataset in &item.datasets {
            let target = format!(
                "{}/datasets/{}.{}",
                dir,
                sanitize_name(&dataset.name),
                dataset.extension()
            );
            let result = std::fs::read(layout.resolve(&dataset.path))
                .and_then(|bytes| archive.append(&target, &bytes));
            if let Err(err) = result {
                skipped += 1;
                tracing::warn!(
                    dataset_id = dataset.id,
                    error = %err,
                    "dataset skipped in bundle"
                );
            }
        }
    }

    tracing::debug!(entries = entries.len(), skipped, "bundle built");
    archive.finish()
}

/// Paths and contents of a bundle, for inspection.
pub fn unpack(bytes: &[u8]) -> Result<Vec<(String, Vec<u8>)>> {
    use std::io::Read;

    let tar_bytes = zstd::decode_all(Cursor::new(bytes))?;
    let mut archive = tar::Archive::new(Cursor::new(tar_bytes));
    let mut files = Vec::new();
    for item in archive.entries()? {
        let mut item = item?;
        let path = item.path()?.to_string_lossy().into_owned();
        let mut contents = Vec::new();
        item.read_to_end(&mut contents)?;
        files.push((path, contents));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn entry(id: i64, title: &str) -> Entry {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 8, 0, 0).unwrap();
        Entry {
            id,
            experiment_id: 1,
            author_id: 1,
            title: title.into(),
            body: "stirred for 10 min".into(),
            tags: vec!["prep".into()],
            version: 1,
            parent_version_id: None,
            created_at: at,
            updated_at: at,
        }
    }

    fn attachment(path: &str, name: &str) -> Attachment {
        Attachment {
            id: 1,
            entry_id: 1,
            path: path.into(),
            file_type: "csv".into(),
            size_bytes: 3,
            original_name: name.into(),
            caption: None,
            sha256: "00".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_entry_dir_truncates_title() {
        let e = entry(7, "A very long title that keeps going");
        assert_eq!(entry_dir(&e), "entry_7_A_very_long_title_th");
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let dir = tempdir().unwrap();
        let layout = StorageLayout::new(dir.path());
        std::fs::create_dir_all(dir.path().join("storage")).unwrap();
        std::fs::write(dir.path().join("storage/present.csv"), b"a,b").unwrap();

        let bundle = build(
            &layout,
            &[BundleEntry {
                entry: entry(1, "Prep"),
                attachments: vec![
                    attachment("storage/present.csv", "raw.csv"),
                    attachment("storage/missing.csv", "gone.csv"),
                ],
                datasets: Vec::new(),
            }],
        )
        .unwrap();

        let files = unpack(&bundle).unwrap();
        let paths: Vec<&str> = files.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(
            paths,
            vec!["entry_1_Prep/entry.txt", "entry_1_Prep/attachments/raw.csv"]
        );
        let text = String::from_utf8(files[0].1.clone()).unwrap();
        assert!(text.starts_with("Entry: Prep\n"));
        assert!(text.contains("stirred for 10 min"));
    }
}
