//! Row types for database queries, before parsing into domain types.

use chrono::{DateTime, SecondsFormat, Utc};

use crate::audit::{AuditAction, EntityKind};
use crate::chart::ChartKind;
use crate::error::{LabbookError, Result};
use crate::storage::types::{
    Attachment, AuditRecord, Chart, Dataset, Entry, Experiment, Project, Template, User,
};

/// Fixed-width RFC 3339 UTC with microseconds, so lexical order is
/// chronological order.
pub fn encode_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .map_err(|e| LabbookError::Storage(format!("Invalid timestamp: {}", e)))?
        .with_timezone(&Utc))
}

fn parse_optional_timestamp(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(parse_timestamp).transpose()
}

fn parse_json(value: &str, what: &str) -> Result<serde_json::Value> {
    serde_json::from_str(value)
        .map_err(|e| LabbookError::Storage(format!("Invalid {} JSON: {}", what, e)))
}

fn parse_tags(value: &str) -> Result<Vec<String>> {
    serde_json::from_str(value)
        .map_err(|e| LabbookError::Storage(format!("Invalid tags JSON: {}", e)))
}

pub const USER_COLUMNS: &str = "id, name, email, role, created_at";

#[derive(Debug)]
pub struct UserRow {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: String,
}

impl UserRow {
    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            role: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

impl TryFrom<UserRow> for User {
    type Error = LabbookError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            role: row
                .role
                .parse()
                .map_err(|e| LabbookError::Storage(format!("Invalid role: {}", e)))?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

pub const PROJECT_COLUMNS: &str =
    "id, name, description, tags_json, created_by, created_at, archived";

#[derive(Debug)]
pub struct ProjectRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub tags_json: String,
    pub created_by: i64,
    pub created_at: String,
    pub archived: bool,
}

impl ProjectRow {
    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            tags_json: row.get(3)?,
            created_by: row.get(4)?,
            created_at: row.get(5)?,
            archived: row.get(6)?,
        })
    }
}

impl TryFrom<ProjectRow> for Project {
    type Error = LabbookError;

    fn try_from(row: ProjectRow) -> Result<Self> {
        Ok(Project {
            id: row.id,
            name: row.name,
            description: row.description,
            tags: parse_tags(&row.tags_json)?,
            created_by: row.created_by,
            created_at: parse_timestamp(&row.created_at)?,
            archived: row.archived,
        })
    }
}

pub const EXPERIMENT_COLUMNS: &str =
    "id, project_id, title, description, tags_json, start_at, end_at, created_at, archived";

#[derive(Debug)]
pub struct ExperimentRow {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub tags_json: String,
    pub start_at: Option<String>,
    pub end_at: Option<String>,
    pub created_at: String,
    pub archived: bool,
}

impl ExperimentRow {
    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            project_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            tags_json: row.get(4)?,
            start_at: row.get(5)?,
            end_at: row.get(6)?,
            created_at: row.get(7)?,
            archived: row.get(8)?,
        })
    }
}

impl TryFrom<ExperimentRow> for Experiment {
    type Error = LabbookError;

    fn try_from(row: ExperimentRow) -> Result<Self> {
        Ok(Experiment {
            id: row.id,
            project_id: row.project_id,
            title: row.title,
            description: row.description,
            tags: parse_tags(&row.tags_json)?,
            start_at: parse_optional_timestamp(row.start_at)?,
            end_at: parse_optional_timestamp(row.end_at)?,
            created_at: parse_timestamp(&row.created_at)?,
            archived: row.archived,
        })
    }
}

pub const ENTRY_COLUMNS: &str = "id, experiment_id, author_id, title, body, tags_json, version, parent_version_id, created_at, updated_at";

/// Raw row data from the entries table.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryRow {
    pub id: i64,
    pub experiment_id: i64,
    pub author_id: i64,
    pub title: String,
    pub body: String,
    pub tags_json: String,
    pub version: i64,
    pub parent_version_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

impl EntryRow {
    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            experiment_id: row.get(1)?,
            author_id: row.get(2)?,
            title: row.get(3)?,
            body: row.get(4)?,
            tags_json: row.get(5)?,
            version: row.get(6)?,
            parent_version_id: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl TryFrom<EntryRow> for Entry {
    type Error = LabbookError;

    fn try_from(row: EntryRow) -> Result<Self> {
        Ok(Entry {
            id: row.id,
            experiment_id: row.experiment_id,
            author_id: row.author_id,
            title: row.title,
            body: row.body,
            tags: parse_tags(&row.tags_json)?,
            version: row.version,
            parent_version_id: row.parent_version_id,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

pub const ATTACHMENT_COLUMNS: &str =
    "id, entry_id, path, file_type, size_bytes, original_name, caption, sha256, created_at";

#[derive(Debug)]
pub struct AttachmentRow {
    pub id: i64,
    pub entry_id: i64,
    pub path: String,
    pub file_type: String,
    pub size_bytes: i64,
    pub original_name: String,
    pub caption: Option<String>,
    pub sha256: String,
    pub created_at: String,
}

impl AttachmentRow {
    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entry_id: row.get(1)?,
            path: row.get(2)?,
            file_type: row.get(3)?,
            size_bytes: row.get(4)?,
            original_name: row.get(5)?,
            caption: row.get(6)?,
            sha256: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<AttachmentRow> for Attachment {
    type Error = LabbookError;

    fn try_from(row: AttachmentRow) -> Result<Self> {
        Ok(Attachment {
            id: row.id,
            entry_id: row.entry_id,
            path: row.path,
            file_type: row.file_type,
            size_bytes: row.size_bytes,
            original_name: row.original_name,
            caption: row.caption,
            sha256: row.sha256,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

pub const DATASET_COLUMNS: &str =
    "id, entry_id, name, path, columns_json, stats_json, row_count, created_at";

#[derive(Debug)]
pub struct DatasetRow {
    pub id: i64,
    pub entry_id: i64,
    pub name: String,
    pub path: String,
    pub columns_json: String,
    pub stats_json: String,
    pub row_count: i64,
    pub created_at: String,
}

impl DatasetRow {
    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entry_id: row.get(1)?,
            name: row.get(2)?,
            path: row.get(3)?,
            columns_json: row.get(4)?,
            stats_json: row.get(5)?,
            row_count: row.get(6)?,
            created_at: row.get(7)?,
        })
    }
}

impl TryFrom<DatasetRow> for Dataset {
    type Error = LabbookError;

    fn try_from(row: DatasetRow) -> Result<Self> {
        Ok(Dataset {
            id: row.id,
            entry_id: row.entry_id,
            name: row.name,
            path: row.path,
            columns: parse_json(&row.columns_json, "columns")?,
            stats: parse_json(&row.stats_json, "stats")?,
            row_count: row.row_count,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

pub const CHART_COLUMNS: &str =
    "id, dataset_id, kind, x_column, y_column, title, path, config_json, created_at";

#[derive(Debug)]
pub struct ChartRow {
    pub id: i64,
    pub dataset_id: i64,
    pub kind: String,
    pub x_column: String,
    pub y_column: String,
    pub title: Option<String>,
    pub path: String,
    pub config_json: String,
    pub created_at: String,
}

impl ChartRow {
    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            dataset_id: row.get(1)?,
            kind: row.get(2)?,
            x_column: row.get(3)?,
            y_column: row.get(4)?,
            title: row.get(5)?,
            path: row.get(6)?,
            config_json: row.get(7)?,
            created_at: row.get(8)?,
        })
    }
}

impl TryFrom<ChartRow> for Chart {
    type Error = LabbookError;

    fn try_from(row: ChartRow) -> Result<Self> {
        let kind: ChartKind = row
            .kind
            .parse()
            .map_err(|e| LabbookError::Storage(format!("Invalid chart kind: {}", e)))?;
        Ok(Chart {
            id: row.id,
            dataset_id: row.dataset_id,
            kind,
            x_column: row.x_column,
            y_column: row.y_column,
            title: row.title,
            path: row.path,
            config: parse_json(&row.config_json, "config")?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

pub const AUDIT_COLUMNS: &str = "id, entity, entity_id, actor_id, action, diff_json, created_at";

#[derive(Debug)]
pub struct AuditRow {
    pub id: i64,
    pub entity: String,
    pub entity_id: i64,
    pub actor_id: i64,
    pub action: String,
    pub diff_json: Option<String>,
    pub created_at: String,
}

impl AuditRow {
    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            entity: row.get(1)?,
            entity_id: row.get(2)?,
            actor_id: row.get(3)?,
            action: row.get(4)?,
            diff_json: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl TryFrom<AuditRow> for AuditRecord {
    type Error = LabbookError;

    fn try_from(row: AuditRow) -> Result<Self> {
        let entity: EntityKind = row
            .entity
            .parse()
            .map_err(|e| LabbookError::Storage(format!("Invalid audit entity: {}", e)))?;
        let action: AuditAction = row
            .action
            .parse()
            .map_err(|e| LabbookError::Storage(format!("Invalid audit action: {}", e)))?;
        Ok(AuditRecord {
            id: row.id,
            entity,
            entity_id: row.entity_id,
            actor_id: row.actor_id,
            action,
            diff: row
                .diff_json
                .as_deref()
                .map(|d| parse_json(d, "diff"))
                .transpose()?,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

pub const TEMPLATE_COLUMNS: &str = "id, kind, name, description, path, is_default, created_at";

#[derive(Debug)]
pub struct TemplateRow {
    pub id: i64,
    pub kind: String,
    pub name: String,
    pub description: Option<String>,
    pub path: String,
    pub is_default: bool,
    pub created_at: String,
}

impl TemplateRow {
    pub fn read(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            kind: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            path: row.get(4)?,
            is_default: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

impl TryFrom<TemplateRow> for Template {
    type Error = LabbookError;

    fn try_from(row: TemplateRow) -> Result<Self> {
        Ok(Template {
            id: row.id,
            kind: row
                .kind
                .parse()
                .map_err(|e| LabbookError::Storage(format!("Invalid template kind: {}", e)))?,
            name: row.name,
            description: row.description,
            path: row.path,
            is_default: row.is_default,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamp_is_fixed_width() {
        let a = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        let ea = encode_timestamp(a);
        let eb = encode_timestamp(b);
        assert_eq!(ea, "2026-01-02T03:04:05.000000Z");
        assert_eq!(ea.len(), eb.len());
        assert!(ea < eb);
        assert_eq!(parse_timestamp(&eb).unwrap(), b);
    }

    #[test]
    fn test_entry_row_rejects_bad_tags() {
        let row = EntryRow {
            id: 1,
            experiment_id: 1,
            author_id: 1,
            title: "t".into(),
            body: String::new(),
            tags_json: "not json".into(),
            version: 1,
            parent_version_id: None,
            created_at: "2026-01-02T03:04:05.000000Z".into(),
            updated_at: "2026-01-02T03:04:05.000000Z".into(),
        };
        let result: Result<Entry> = row.try_into();
        assert!(matches!(result, Err(LabbookError::Storage(_))));
    }
}
