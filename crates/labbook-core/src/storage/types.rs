//! Core data types for the storage layer.
//!
//! Identifiers are SQLite row ids. JSON sub-documents (column profiles,
//! statistics, chart configuration, audit diffs) are carried as
//! `serde_json::Value` so their contents round-trip without a fixed schema.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::audit::{AuditAction, EntityKind};
use crate::chart::ChartKind;
use crate::error::{LabbookError, Result};

/// Role of a notebook user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Researcher,
    Admin,
    Reviewer,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Researcher => "researcher",
            UserRole::Admin => "admin",
            UserRole::Reviewer => "reviewer",
        }
    }
}

impl FromStr for UserRole {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "researcher" => Ok(UserRole::Researcher),
            "admin" => Ok(UserRole::Admin),
            "reviewer" => Ok(UserRole::Reviewer),
            other => Err(LabbookError::Validation(format!(
                "Unknown role '{}' (expected researcher, admin or reviewer)",
                other
            ))),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output format a template is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Docx,
    Xlsx,
    Html,
    Pdf,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Docx => "docx",
            TemplateKind::Xlsx => "xlsx",
            TemplateKind::Html => "html",
            TemplateKind::Pdf => "pdf",
        }
    }
}

impl FromStr for TemplateKind {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "docx" => Ok(TemplateKind::Docx),
            "xlsx" => Ok(TemplateKind::Xlsx),
            "html" => Ok(TemplateKind::Html),
            "pdf" => Ok(TemplateKind::Pdf),
            other => Err(LabbookError::Validation(format!(
                "Unknown template type '{}' (expected docx, xlsx, html or pdf)",
                other
            ))),
        }
    }
}

impl fmt::Display for TemplateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// A research project. `archived` is its only mutable field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_by: i64,
    pub created_at: DateTime<Utc>,
    pub archived: bool,
}

/// An experiment inside a project. Not versioned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub archived: bool,
}

/// One immutable version of a journal entry.
///
/// A logical entry is the chain of rows linked through `parent_version_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub experiment_id: i64,
    pub author_id: i64,
    pub title: String,

    /// Markdown body
    pub body: String,

    pub tags: Vec<String>,

    /// Starts at 1, incremented on every revision
    pub version: i64,

    /// Row this version supersedes
    pub parent_version_id: Option<i64>,

    /// Copied from the first version on revision
    pub created_at: DateTime<Utc>,

    /// When this version was written
    pub updated_at: DateTime<Utc>,
}

/// A content-addressed file attached to an entry row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub entry_id: i64,

    /// Path relative to the data directory
    pub path: String,

    /// Lowercased extension (png, pdf, csv, ...)
    pub file_type: String,

    pub size_bytes: i64,
    pub original_name: String,
    pub caption: Option<String>,

    /// Hex SHA-256 of the content, unique across the store
    pub sha256: String,

    pub created_at: DateTime<Utc>,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        matches!(self.file_type.as_str(), "png" | "jpg" | "jpeg")
    }
}

/// An imported table plus its computed profile. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: i64,
    pub entry_id: i64,
    pub name: String,
    pub path: String,

    /// `{column: {dtype, non_null, unique}}`
    pub columns: serde_json::Value,

    /// `{numeric column: {mean, std, min, max}}`, unavailable values are null
    pub stats: serde_json::Value,

    pub row_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Dataset {
    /// Column names in stored order.
    pub fn column_names(&self) -> Vec<String> {
        match self.columns.as_object() {
            Some(map) => map.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Source file extension (csv or xlsx).
    pub fn extension(&self) -> &str {
        self.path.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("")
    }
}

/// A rendered plot of one dataset. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chart {
    pub id: i64,
    pub dataset_id: i64,
    pub kind: ChartKind,
    pub x_column: String,
    pub y_column: String,
    pub title: Option<String>,
    pub path: String,

    /// Opaque renderer configuration, stored verbatim
    pub config: serde_json::Value,

    pub created_at: DateTime<Utc>,
}

/// One append-only audit fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub entity: EntityKind,
    pub entity_id: i64,
    pub actor_id: i64,
    pub action: AuditAction,
    pub diff: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: i64,
    pub kind: TemplateKind,
    pub name: String,
    pub description: Option<String>,
    pub path: String,
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

// --- Builders ---

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub role: UserRole,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            role: UserRole::Researcher,
        }
    }

    pub fn with_role(mut self, role: UserRole) -> Self {
        self.role = role;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub created_by: i64,
}

impl NewProject {
    pub fn new(name: impl Into<String>, created_by: i64) -> Self {
        Self {
            name: name.into(),
            description: None,
            tags: Vec::new(),
            created_by,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

#[derive(Debug, Clone)]
pub struct NewExperiment {
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,

    /// User recorded as the audit actor
    pub actor_id: i64,
}

impl NewExperiment {
    pub fn new(project_id: i64, title: impl Into<String>, actor_id: i64) -> Self {
        Self {
            project_id,
            title: title.into(),
            description: None,
            tags: Vec::new(),
            start_at: None,
            end_at: None,
            actor_id,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_schedule(
        mut self,
        start_at: Option<DateTime<Utc>>,
        end_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_at = start_at;
        self.end_at = end_at;
        self
    }
}

/// Builder for the first version of an entry.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub experiment_id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub tags: Vec<String>,
}

impl NewEntry {
    pub fn new(experiment_id: i64, author_id: i64, title: impl Into<String>) -> Self {
        Self {
            experiment_id,
            author_id,
            title: title.into(),
            body: String::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }
}

/// Fields supplied to a revision.
///
/// `None` means "not supplied, keep the previous value". `Some` is applied
/// even when empty. The serialized form carries only supplied fields and is
/// stored as the audit diff, where the body is keyed `body_md`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntryPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(
        rename = "body_md",
        alias = "body",
        skip_serializing_if = "Option::is_none"
    )]
    pub body: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl EntryPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn tags(mut self, tags: Vec<String>) -> Self {
        self.tags = Some(tags);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none() && self.tags.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct NewAttachment {
    pub entry_id: i64,
    pub path: String,
    pub file_type: String,
    pub size_bytes: i64,
    pub original_name: String,
    pub caption: Option<String>,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct NewDataset {
    pub entry_id: i64,
    pub name: String,
    pub path: String,
    pub columns: serde_json::Value,
    pub stats: serde_json::Value,
    pub row_count: i64,
}

#[derive(Debug, Clone)]
pub struct NewChart {
    pub dataset_id: i64,
    pub kind: ChartKind,
    pub x_column: String,
    pub y_column: String,
    pub title: Option<String>,
    pub path: String,
    pub config: serde_json::Value,

    /// Caller-supplied audit actor
    pub actor_id: i64,
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub kind: TemplateKind,
    pub name: String,
    pub description: Option<String>,
    pub path: String,
    pub is_default: bool,
}

impl NewTemplate {
    pub fn new(kind: TemplateKind, name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: None,
            path: path.into(),
            is_default: false,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn as_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }
}

// --- Filters ---

#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Substring of name or description
    pub text: Option<String>,

    /// Every tag must be present
    pub tags: Vec<String>,

    pub archived: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ProjectFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExperimentFilter {
    pub project_id: Option<i64>,

    /// Substring of title or description
    pub text: Option<String>,

    /// Every tag must be present
    pub tags: Vec<String>,

    pub archived: Option<bool>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ExperimentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project(mut self, project_id: i64) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn archived(mut self, archived: bool) -> Self {
        self.archived = Some(archived);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Filter for querying entry rows.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub experiment_id: Option<i64>,

    /// Matches through the entry's experiment
    pub project_id: Option<i64>,

    pub author_id: Option<i64>,

    /// Substring of title or body
    pub text: Option<String>,

    /// Every tag must be present
    pub tags: Vec<String>,

    /// Created at or after (inclusive)
    pub since: Option<DateTime<Utc>>,

    /// Created at or before (inclusive)
    pub until: Option<DateTime<Utc>>,

    /// Include rows that a later version supersedes
    pub include_superseded: bool,

    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl EntryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn experiment(mut self, experiment_id: i64) -> Self {
        self.experiment_id = Some(experiment_id);
        self
    }

    pub fn project(mut self, project_id: i64) -> Self {
        self.project_id = Some(project_id);
        self
    }

    pub fn author(mut self, author_id: i64) -> Self {
        self.author_id = Some(author_id);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn since(mut self, date: DateTime<Utc>) -> Self {
        self.since = Some(date);
        self
    }

    pub fn until(mut self, date: DateTime<Utc>) -> Self {
        self.until = Some(date);
        self
    }

    pub fn include_superseded(mut self, include: bool) -> Self {
        self.include_superseded = include;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttachmentFilter {
    pub entry_id: Option<i64>,
    pub file_type: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl AttachmentFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(mut self, entry_id: i64) -> Self {
        self.entry_id = Some(entry_id);
        self
    }

    pub fn file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = Some(file_type.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub entity: Option<EntityKind>,
    pub entity_id: Option<i64>,
    pub actor_id: Option<i64>,
    pub action: Option<AuditAction>,
    pub limit: Option<usize>,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity: EntityKind) -> Self {
        self.entity = Some(entity);
        self
    }

    pub fn entity_id(mut self, entity_id: i64) -> Self {
        self.entity_id = Some(entity_id);
        self
    }

    pub fn actor(mut self, actor_id: i64) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    pub fn action(mut self, action: AuditAction) -> Self {
        self.action = Some(action);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_builder() {
        let entry = NewEntry::new(3, 1, "Calibration")
            .with_body("# Setup\n- pH meter")
            .with_tags(vec!["calibration".to_string()]);

        assert_eq!(entry.experiment_id, 3);
        assert_eq!(entry.author_id, 1);
        assert_eq!(entry.title, "Calibration");
        assert!(entry.body.starts_with("# Setup"));
        assert_eq!(entry.tags.len(), 1);
    }

    #[test]
    fn test_patch_serializes_only_supplied_fields() {
        let patch = EntryPatch::new().title("X").tags(Vec::new());
        let diff = serde_json::to_value(&patch).unwrap();
        assert_eq!(diff, serde_json::json!({"title": "X", "tags": []}));
        assert!(EntryPatch::new().is_empty());
    }

    #[test]
    fn test_entry_filter_builder() {
        let now = Utc::now();
        let filter = EntryFilter::new()
            .experiment(2)
            .tag("ph")
            .tag("buffer")
            .since(now)
            .limit(10);

        assert_eq!(filter.experiment_id, Some(2));
        assert_eq!(filter.tags, vec!["ph".to_string(), "buffer".to_string()]);
        assert_eq!(filter.since, Some(now));
        assert_eq!(filter.limit, Some(10));
        assert!(!filter.include_superseded);
    }

    #[test]
    fn test_template_kind_parse() {
        assert_eq!("DOCX".parse::<TemplateKind>().unwrap(), TemplateKind::Docx);
        let err = "odt".parse::<TemplateKind>().unwrap_err();
        assert!(err.to_string().contains("odt"));
    }

    #[test]
    fn test_dataset_column_names_keep_order() {
        let dataset = Dataset {
            id: 1,
            entry_id: 1,
            name: "growth".into(),
            path: "storage/datasets/2026/01/growth_20260101_000000.csv".into(),
            columns: serde_json::json!({"time": {}, "od600": {}}),
            stats: serde_json::json!({}),
            row_count: 0,
            created_at: Utc::now(),
        };
        assert_eq!(dataset.column_names(), vec!["time", "od600"]);
        assert_eq!(dataset.extension(), "csv");
    }
}
