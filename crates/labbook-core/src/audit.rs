//! Append-only audit recorder.
//!
//! Every mutating store operation calls [`record`] inside its own
//! transaction, so the audit row commits or rolls back together with the
//! change it describes. The `audit_log` table carries triggers that reject
//! UPDATE and DELETE.

use std::fmt;
use std::str::FromStr;

use chrono::Utc;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::error::{LabbookError, Result};
use crate::storage::sqlite::encode_timestamp;

/// Kind of entity an audit row describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Project,
    Experiment,
    Entry,
    Attachment,
    Dataset,
    Chart,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Project => "project",
            EntityKind::Experiment => "experiment",
            EntityKind::Entry => "entry",
            EntityKind::Attachment => "attachment",
            EntityKind::Dataset => "dataset",
            EntityKind::Chart => "chart",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "project" => Ok(EntityKind::Project),
            "experiment" => Ok(EntityKind::Experiment),
            "entry" => Ok(EntityKind::Entry),
            "attachment" => Ok(EntityKind::Attachment),
            "dataset" => Ok(EntityKind::Dataset),
            "chart" => Ok(EntityKind::Chart),
            other => Err(LabbookError::Validation(format!(
                "Unknown entity kind '{}' (expected project, experiment, entry, attachment, dataset or chart)",
                other
            ))),
        }
    }
}

/// Action tag of an audit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Archive,
    Delete,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Archive => "archive",
            AuditAction::Delete => "delete",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AuditAction {
    type Err = LabbookError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(AuditAction::Create),
            "update" => Ok(AuditAction::Update),
            "archive" => Ok(AuditAction::Archive),
            "delete" => Ok(AuditAction::Delete),
            other => Err(LabbookError::Validation(format!(
                "Unknown audit action '{}' (expected create, update, archive or delete)",
                other
            ))),
        }
    }
}

/// Append one audit row and return its id.
///
/// Callers pass their open transaction (a `Transaction` derefs to
/// `Connection`). Failure here is a storage failure and aborts the caller.
pub fn record(
    conn: &Connection,
    entity: EntityKind,
    entity_id: i64,
    actor_id: i64,
    action: AuditAction,
    diff: Option<&serde_json::Value>,
) -> Result<i64> {
    let diff_json = diff.map(serde_json::to_string).transpose()?;
    conn.execute(
        r#"
        INSERT INTO audit_log (entity, entity_id, actor_id, action, diff_json, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
        (
            entity.as_str(),
            entity_id,
            actor_id,
            action.as_str(),
            diff_json,
            encode_timestamp(Utc::now()),
        ),
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(
        entity = entity.as_str(),
        entity_id,
        actor_id,
        action = action.as_str(),
        "audit recorded"
    );
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_parse_round_trip() {
        for kind in [
            EntityKind::Project,
            EntityKind::Experiment,
            EntityKind::Entry,
            EntityKind::Attachment,
            EntityKind::Dataset,
            EntityKind::Chart,
        ] {
            assert_eq!(kind.as_str().parse::<EntityKind>().unwrap(), kind);
        }
        assert!("template".parse::<EntityKind>().is_err());
    }

    #[test]
    fn test_action_parse_is_case_insensitive() {
        assert_eq!("Archive".parse::<AuditAction>().unwrap(), AuditAction::Archive);
        let err = "purge".parse::<AuditAction>().unwrap_err();
        assert!(err.to_string().contains("purge"));
    }

    #[test]
    fn test_record_inserts_row() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(crate::storage::sqlite::SCHEMA).unwrap();

        let diff = serde_json::json!({"title": "X"});
        let id = record(&conn, EntityKind::Entry, 9, 2, AuditAction::Update, Some(&diff)).unwrap();

        let (entity, action, diff_json): (String, String, Option<String>) = conn
            .query_row(
                "SELECT entity, action, diff_json FROM audit_log WHERE id = ?",
                [id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .unwrap();
        assert_eq!(entity, "entry");
        assert_eq!(action, "update");
        assert_eq!(diff_json.as_deref(), Some(r#"{"title":"X"}"#));
    }
}
