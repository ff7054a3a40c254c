//! Filesystem helpers for blob storage under the data directory.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Write `bytes` to `destination` via a sibling temp file and a rename.
///
/// Missing parent directories are created. Readers never observe a
/// half-written blob at `destination`.
///
/// # Errors
///
/// Returns an error if the directory cannot be created, the temp file cannot
/// be written and synced, or the final rename fails.
pub fn write_atomic(destination: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = stage(destination, bytes)?;
    rename_with_fallback(&temp_path, destination)
}

/// Write `bytes` to `destination` only if nothing is there yet.
///
/// The blob is staged in a sibling temp file and hard-linked into place, so
/// the destination is either absent or complete. An existing destination is
/// left untouched and reported as [`io::ErrorKind::AlreadyExists`].
///
/// # Errors
///
/// Returns `AlreadyExists` if `destination` exists, or any error from
/// staging and linking.
pub fn write_new(destination: &Path, bytes: &[u8]) -> io::Result<()> {
    let temp_path = stage(destination, bytes)?;
    let linked = match fs::hard_link(&temp_path, destination) {
        // Filesystems without hard links report one of these.
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::Unsupported | io::ErrorKind::PermissionDenied
            ) =>
        {
            create_new_from(&temp_path, destination)
        }
        other => other,
    };
    let _ = fs::remove_file(&temp_path);
    linked
}

fn create_new_from(temp_path: &Path, destination: &Path) -> io::Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(destination)?;
    let bytes = fs::read(temp_path)?;
    if let Err(err) = file.write_all(&bytes).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(destination);
        return Err(err);
    }
    Ok(())
}

/// Write and sync `bytes` into a temp file next to `destination`.
fn stage(destination: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }
    let file_name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "blob".to_string());
    let temp_path =
        destination.with_file_name(format!(".{}.{}.tmp", file_name, std::process::id()));

    let mut file = fs::File::create(&temp_path)?;
    if let Err(err) = file.write_all(bytes).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&temp_path);
        return Err(err);
    }
    Ok(temp_path)
}

/// Rename a file, removing an existing destination and retrying if the
/// first attempt fails. The temp file is cleaned up on final failure.
///
/// # Errors
///
/// Returns an error if the rename fails even after the fallback attempt.
pub fn rename_with_fallback(temp_path: &Path, destination: &Path) -> io::Result<()> {
    if let Err(initial_err) = fs::rename(temp_path, destination) {
        let _ = fs::remove_file(destination);
        fs::rename(temp_path, destination).map_err(|retry_err| {
            let _ = fs::remove_file(temp_path);
            io::Error::new(
                retry_err.kind(),
                format!(
                    "Rename failed (initial: {}, retry: {})",
                    initial_err, retry_err
                ),
            )
        })?;
    }
    Ok(())
}

/// Remove a file, treating "already gone" as success.
///
/// Returns `true` if a file was removed.
pub fn remove_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_atomic_creates_parents() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("attachments/2026/10/abc.png");

        write_atomic(&dest, b"pixels").unwrap();

        assert_eq!(fs::read(&dest).unwrap(), b"pixels");
        let leftovers: Vec<_> = fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_write_new_refuses_existing_destination() {
        let dir = tempdir().unwrap();
        let dest = dir.path().join("charts/chart_1.png");

        write_new(&dest, b"first").expect("first write should succeed");
        let err = write_new(&dest, b"second").unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&dest).unwrap(), b"first");
        let leftovers = fs::read_dir(dest.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_rename_overwrites_existing() {
        let dir = tempdir().unwrap();
        let temp = dir.path().join("temp.txt");
        let dest = dir.path().join("dest.txt");

        fs::write(&dest, "old").unwrap();
        fs::write(&temp, "new").unwrap();

        rename_with_fallback(&temp, &dest).unwrap();

        assert!(!temp.exists());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "new");
    }

    #[test]
    fn test_remove_if_exists_tolerates_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gone.bin");
        assert!(!remove_if_exists(&path).unwrap());

        fs::write(&path, b"x").unwrap();
        assert!(remove_if_exists(&path).unwrap());
        assert!(!path.exists());
    }
}
