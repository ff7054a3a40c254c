//! Upload rules for attachments: allowed extensions, size ceilings, digests.

use sha2::{Digest, Sha256};

use crate::error::{LabbookError, Result};

const MIB: u64 = 1024 * 1024;

/// Allowed extensions and their byte ceilings, in display order.
pub const ALLOWED_EXTENSIONS: &[(&str, u64)] = &[
    ("png", 10 * MIB),
    ("jpg", 10 * MIB),
    ("jpeg", 10 * MIB),
    ("pdf", 20 * MIB),
    ("docx", 20 * MIB),
    ("xlsx", 20 * MIB),
    ("csv", 10 * MIB),
];

/// Lowercased text after the last '.', or an empty string.
pub fn file_extension(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) => ext.to_ascii_lowercase(),
        None => String::new(),
    }
}

/// Byte ceiling for an extension, if it is allowed.
pub fn size_limit(ext: &str) -> Option<u64> {
    ALLOWED_EXTENSIONS
        .iter()
        .find(|(allowed, _)| *allowed == ext)
        .map(|(_, limit)| *limit)
}

/// Check an upload against the extension table. Returns the extension.
///
/// # Errors
///
/// Returns `LabbookError::Validation` naming the extension and the allowed
/// set, or naming the ceiling in MB when the content is too large.
pub fn validate_upload(filename: &str, size: u64) -> Result<String> {
    let ext = file_extension(filename);
    let limit = size_limit(&ext).ok_or_else(|| {
        let allowed: Vec<&str> = ALLOWED_EXTENSIONS.iter().map(|(e, _)| *e).collect();
        LabbookError::Validation(format!(
            "Unsupported file type: '{}'. Allowed: {}",
            ext,
            allowed.join(", ")
        ))
    })?;
    if size > limit {
        return Err(LabbookError::Validation(format!(
            "File too large. Maximum size for .{} is {}MB",
            ext,
            limit / MIB
        )));
    }
    Ok(ext)
}

/// Hex SHA-256 of `bytes`.
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_lowercased_after_last_dot() {
        assert_eq!(file_extension("Gel.Scan.PNG"), "png");
        assert_eq!(file_extension("README"), "");
    }

    #[test]
    fn test_unknown_extension_names_allowed_set() {
        let err = validate_upload("notes.txt", 10).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'txt'"));
        assert!(msg.contains("png, jpg, jpeg, pdf, docx, xlsx, csv"));
    }

    #[test]
    fn test_size_ceilings() {
        assert_eq!(validate_upload("scan.png", 9 * MIB).unwrap(), "png");
        assert!(validate_upload("scan.png", 10 * MIB).is_ok());
        let err = validate_upload("scan.png", 10 * MIB + 1).unwrap_err();
        assert!(err.to_string().contains("10MB"));
        let err = validate_upload("thesis.docx", 21 * MIB).unwrap_err();
        assert!(err.to_string().contains("20MB"));
    }

    #[test]
    fn test_sha256_hex_known_value() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
