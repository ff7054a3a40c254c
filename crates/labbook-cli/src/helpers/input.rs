//! Reading file and body arguments, and delete confirmation.

use std::io::{IsTerminal, Read};
use std::path::Path;

use dialoguer::Confirm;

use crate::errors::CliError;

/// Read a file argument, keeping the path in the error.
pub fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CliError::not_found(
                format!("File not found: {}", path.display()),
                "Hint: Check the path and try again.",
            )
            .into()
        } else {
            anyhow::anyhow!("Failed to read {}: {}", path.display(), e)
        }
    })
}

/// File name component of a path argument.
pub fn file_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            CliError::invalid_input(format!("Not a file path: {}", path.display())).into()
        })
}

/// Resolve an entry body from `--body`, `--body-file` (`-` is stdin), or
/// piped stdin. Returns `None` when nothing was supplied.
pub fn read_body(body: Option<&str>, body_file: Option<&Path>) -> anyhow::Result<Option<String>> {
    if let Some(body) = body {
        return Ok(Some(body.to_string()));
    }
    if let Some(path) = body_file {
        if path == Path::new("-") {
            return read_stdin().map(Some);
        }
        let bytes = read_file(path)?;
        return String::from_utf8(bytes)
            .map(Some)
            .map_err(|_| CliError::invalid_input("Body file is not valid UTF-8").into());
    }
    Ok(None)
}

fn read_stdin() -> anyhow::Result<String> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

/// Ask before a destructive action unless `--force` was given.
///
/// Returns `false` when the user declines.
pub fn confirm_or_force(prompt: &str, force: bool) -> anyhow::Result<bool> {
    if force {
        return Ok(true);
    }
    if !std::io::stdin().is_terminal() {
        return Err(CliError::invalid_input(
            "Refusing to delete without confirmation.\nHint: Pass --force in non-interactive use.",
        )
        .into());
    }
    Ok(Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_body_wins() {
        assert_eq!(
            read_body(Some("hello"), None).unwrap(),
            Some("hello".to_string())
        );
        assert_eq!(read_body(None, None).unwrap(), None);
    }

    #[test]
    fn test_body_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("body.md");
        std::fs::write(&path, "# Notes\n").unwrap();
        assert_eq!(
            read_body(None, Some(&path)).unwrap(),
            Some("# Notes\n".to_string())
        );
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let err = read_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(err.downcast_ref::<CliError>().is_some());
    }

    #[test]
    fn test_force_skips_prompt() {
        assert!(confirm_or_force("Delete?", true).unwrap());
    }
}
