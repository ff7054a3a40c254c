//! Field validation shared by the SQLite store.

use std::collections::HashSet;

use crate::error::{LabbookError, Result};

/// Maximum bytes per tag.
pub const MAX_TAG_BYTES: usize = 128;

/// Maximum tags per record.
pub const MAX_TAGS: usize = 100;

pub const MAX_PROJECT_NAME_CHARS: usize = 200;
pub const MAX_EXPERIMENT_TITLE_CHARS: usize = 300;
pub const MAX_ENTRY_TITLE_CHARS: usize = 300;

/// Normalize and validate tags.
///
/// - Trims whitespace, keeps case
/// - Removes duplicates, keeping first-seen order
/// - Rejects empty tags and enforces length limits
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>> {
    if tags.len() > MAX_TAGS {
        return Err(LabbookError::Validation(format!(
            "Too many tags (max {})",
            MAX_TAGS
        )));
    }

    let mut seen = HashSet::with_capacity(tags.len());
    let mut normalized = Vec::with_capacity(tags.len());

    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            return Err(LabbookError::Validation(
                "Empty tag is not allowed".to_string(),
            ));
        }
        if trimmed.len() > MAX_TAG_BYTES {
            return Err(LabbookError::Validation(format!(
                "Tag too long (max {} bytes)",
                MAX_TAG_BYTES
            )));
        }
        if seen.insert(trimmed.to_string()) {
            normalized.push(trimmed.to_string());
        }
    }

    Ok(normalized)
}

/// Require a non-blank string of at most `max` characters.
pub fn require_text(field: &str, value: &str, max: usize) -> Result<()> {
    let count = value.trim().chars().count();
    if count == 0 {
        return Err(LabbookError::Validation(format!(
            "{} must not be empty",
            field
        )));
    }
    if value.chars().count() > max {
        return Err(LabbookError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    let trimmed = email.trim();
    match trimmed.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(LabbookError::Validation(format!(
            "Invalid email address '{}'",
            email
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tags_dedupes_in_order() {
        let tags = vec![
            " ph ".to_string(),
            "Buffer".to_string(),
            "ph".to_string(),
        ];
        assert_eq!(normalize_tags(&tags).unwrap(), vec!["ph", "Buffer"]);
    }

    #[test]
    fn test_normalize_tags_rejects_empty_and_long() {
        assert!(normalize_tags(&["  ".to_string()]).is_err());
        assert!(normalize_tags(&["x".repeat(MAX_TAG_BYTES + 1)]).is_err());
        let many: Vec<String> = (0..=MAX_TAGS).map(|i| format!("t{}", i)).collect();
        assert!(normalize_tags(&many).is_err());
    }

    #[test]
    fn test_require_text_limits() {
        assert!(require_text("Name", "Enzymes", 200).is_ok());
        let err = require_text("Name", "   ", 200).unwrap_err();
        assert!(err.to_string().contains("Name must not be empty"));
        let err = require_text("Title", &"a".repeat(301), 300).unwrap_err();
        assert!(err.to_string().contains("at most 300"));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("ada@lab.org").is_ok());
        assert!(validate_email("ada").is_err());
        assert!(validate_email("@lab.org").is_err());
    }
}
