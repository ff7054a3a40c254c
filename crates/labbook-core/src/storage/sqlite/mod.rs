//! SQLite storage backend.
//!
//! The database lives in a single file under the data directory. The
//! connection sits behind a `Mutex`; every mutating call opens one
//! transaction that covers the row change and its audit record.

mod row;
mod schema;
mod validation;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, ToSql};

use crate::audit::{self, AuditAction, EntityKind};
use crate::error::{LabbookError, Result};
use crate::storage::traits::NotebookStore;
use crate::storage::types::{
    Attachment, AttachmentFilter, AuditFilter, AuditRecord, Chart, Dataset, Entry, EntryFilter,
    EntryPatch, Experiment, ExperimentFilter, NewAttachment, NewChart, NewDataset, NewEntry,
    NewExperiment, NewProject, NewTemplate, NewUser, Project, ProjectFilter, Template,
    TemplateKind, User,
};

pub use row::{encode_timestamp, parse_timestamp};
pub use schema::{SCHEMA, SCHEMA_VERSION};
pub use validation::normalize_tags;

use row::{
    AttachmentRow, AuditRow, ChartRow, DatasetRow, EntryRow, ExperimentRow, ProjectRow,
    TemplateRow, UserRow, ATTACHMENT_COLUMNS, AUDIT_COLUMNS, CHART_COLUMNS, DATASET_COLUMNS,
    ENTRY_COLUMNS, EXPERIMENT_COLUMNS, PROJECT_COLUMNS, TEMPLATE_COLUMNS, USER_COLUMNS,
};
use validation::{
    require_text, validate_email, MAX_ENTRY_TITLE_CHARS, MAX_EXPERIMENT_TITLE_CHARS,
    MAX_PROJECT_NAME_CHARS,
};

type RowReader<R> = fn(&rusqlite::Row<'_>) -> rusqlite::Result<R>;
type SqlParams = Vec<Box<dyn ToSql>>;

/// SQLite-backed notebook store.
pub struct SqliteStore {
    path: Option<PathBuf>,
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply the schema.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent directory cannot be created or the
    /// database cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        let now = encode_timestamp(Utc::now());
        conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('schema_version', ?)",
            [SCHEMA_VERSION],
        )?;
        conn.execute(
            "INSERT OR IGNORE INTO meta (key, value) VALUES ('created_at', ?)",
            [&now],
        )?;
        tracing::debug!(path = ?path, "notebook database ready");
        Ok(Self {
            path,
            conn: Mutex::new(conn),
        })
    }

    /// Database file, or `None` for an in-memory store.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Lock the database connection, returning an error if the mutex is poisoned.
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LabbookError::Storage("SQLite connection poisoned".to_string()))
    }

    /// Run `f` with the raw connection. Meant for maintenance and tests.
    pub fn with_connection<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let conn = self.lock_conn()?;
        f(&conn)
    }
}

fn query_optional<R, T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    read: RowReader<R>,
) -> Result<Option<T>>
where
    T: TryFrom<R, Error = LabbookError>,
{
    match conn.query_row(sql, params, read) {
        Ok(row) => Ok(Some(T::try_from(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn query_all<R, T>(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
    read: RowReader<R>,
) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = LabbookError>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, read)?;
    let mut items = Vec::new();
    for row in rows {
        items.push(T::try_from(row?)?);
    }
    Ok(items)
}

fn require_row(conn: &Connection, table: &str, label: &str, id: i64) -> Result<()> {
    let exists: Option<i64> = conn
        .query_row(
            &format!("SELECT id FROM {} WHERE id = ?", table),
            [id],
            |row| row.get(0),
        )
        .optional()?;
    if exists.is_none() {
        return Err(LabbookError::not_found(label, id));
    }
    Ok(())
}

fn entry_author(conn: &Connection, entry_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT author_id FROM entries WHERE id = ?",
        [entry_id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| LabbookError::not_found("Entry", entry_id))
}

fn fetch_entry(conn: &Connection, id: i64) -> Result<Option<Entry>> {
    query_optional(
        conn,
        &format!("SELECT {} FROM entries WHERE id = ?", ENTRY_COLUMNS),
        [id],
        EntryRow::read,
    )
}

fn fetch_project(conn: &Connection, id: i64) -> Result<Option<Project>> {
    query_optional(
        conn,
        &format!("SELECT {} FROM projects WHERE id = ?", PROJECT_COLUMNS),
        [id],
        ProjectRow::read,
    )
}

fn fetch_experiment(conn: &Connection, id: i64) -> Result<Option<Experiment>> {
    query_optional(
        conn,
        &format!("SELECT {} FROM experiments WHERE id = ?", EXPERIMENT_COLUMNS),
        [id],
        ExperimentRow::read,
    )
}

fn fetch_attachment(conn: &Connection, id: i64) -> Result<Option<Attachment>> {
    query_optional(
        conn,
        &format!("SELECT {} FROM attachments WHERE id = ?", ATTACHMENT_COLUMNS),
        [id],
        AttachmentRow::read,
    )
}

fn fetch_template(conn: &Connection, id: i64) -> Result<Option<Template>> {
    query_optional(
        conn,
        &format!("SELECT {} FROM templates WHERE id = ?", TEMPLATE_COLUMNS),
        [id],
        TemplateRow::read,
    )
}

/// Root of the version chain `id` belongs to.
fn chain_root(conn: &Connection, id: i64) -> Result<i64> {
    conn.query_row(
        r#"
        WITH RECURSIVE up(id, parent) AS (
            SELECT id, parent_version_id FROM entries WHERE id = ?
            UNION ALL
            SELECT e.id, e.parent_version_id FROM entries e JOIN up ON e.id = up.parent
        )
        SELECT id FROM up WHERE parent IS NULL
        "#,
        [id],
        |row| row.get(0),
    )
    .optional()?
    .ok_or_else(|| LabbookError::not_found("Entry", id))
}

fn chain_rows(conn: &Connection, root: i64) -> Result<Vec<Entry>> {
    query_all(
        conn,
        &format!(
            r#"
            WITH RECURSIVE chain(id) AS (
                SELECT id FROM entries WHERE id = ?
                UNION ALL
                SELECT e.id FROM entries e JOIN chain c ON e.parent_version_id = c.id
            )
            SELECT {} FROM entries WHERE id IN (SELECT id FROM chain)
            ORDER BY version ASC, id ASC
            "#,
            ENTRY_COLUMNS
        ),
        [root],
        EntryRow::read,
    )
}

fn tags_json(tags: &[String]) -> Result<String> {
    let normalized = normalize_tags(tags)?;
    Ok(serde_json::to_string(&normalized)?)
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

/// Case-insensitive substring condition over one or more columns.
fn push_text_condition(
    conditions: &mut Vec<String>,
    params: &mut SqlParams,
    columns: &[&str],
    text: &str,
) {
    let clauses: Vec<String> = columns
        .iter()
        .map(|col| format!("instr(lower(COALESCE({}, '')), lower(?)) > 0", col))
        .collect();
    conditions.push(format!("({})", clauses.join(" OR ")));
    for _ in columns {
        params.push(Box::new(text.to_string()));
    }
}

fn push_tag_condition(conditions: &mut Vec<String>, params: &mut SqlParams, tag: &str) {
    conditions
        .push("EXISTS (SELECT 1 FROM json_each(tags_json) WHERE value = ?)".to_string());
    params.push(Box::new(tag.trim().to_string()));
}

fn finish_query(
    query: &mut String,
    conditions: &[String],
    params: &mut SqlParams,
    order: &str,
    limit: Option<usize>,
    offset: Option<usize>,
) {
    if !conditions.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&conditions.join(" AND "));
    }
    query.push_str(" ORDER BY ");
    query.push_str(order);

    match (limit, offset) {
        (Some(limit), offset) => {
            query.push_str(" LIMIT ? OFFSET ?");
            params.push(Box::new(limit as i64));
            params.push(Box::new(offset.unwrap_or(0) as i64));
        }
        (None, Some(offset)) => {
            query.push_str(" LIMIT -1 OFFSET ?");
            params.push(Box::new(offset as i64));
        }
        (None, None) => {}
    }
}

impl NotebookStore for SqliteStore {
    // --- Users ---

    fn create_user(&mut self, user: &NewUser) -> Result<User> {
        require_text("Name", &user.name, 200)?;
        validate_email(&user.email)?;

        let conn = self.lock_conn()?;
        let created_at = encode_timestamp(Utc::now());
        let result = conn.execute(
            "INSERT INTO users (name, email, role, created_at) VALUES (?, ?, ?, ?)",
            (
                user.name.trim(),
                user.email.trim(),
                user.role.as_str(),
                &created_at,
            ),
        );
        match result {
            Ok(_) => {}
            Err(ref e) if is_unique_violation(e) => {
                return Err(LabbookError::Conflict(format!(
                    "Email {} is already registered",
                    user.email.trim()
                )));
            }
            Err(e) => return Err(e.into()),
        }
        let id = conn.last_insert_rowid();
        tracing::info!(user_id = id, "user created");

        query_optional(
            &conn,
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            [id],
            UserRow::read,
        )?
        .ok_or_else(|| LabbookError::not_found("User", id))
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.lock_conn()?;
        query_optional(
            &conn,
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            [id],
            UserRow::read,
        )
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock_conn()?;
        query_all(
            &conn,
            &format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS),
            [],
            UserRow::read,
        )
    }

    // --- Projects ---

    fn create_project(&mut self, project: &NewProject) -> Result<Project> {
        require_text("Project name", &project.name, MAX_PROJECT_NAME_CHARS)?;
        let tags = tags_json(&project.tags)?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        require_row(&tx, "users", "User", project.created_by)?;

        tx.execute(
            r#"
            INSERT INTO projects (name, description, tags_json, created_by, created_at, archived)
            VALUES (?, ?, ?, ?, ?, 0)
            "#,
            (
                &project.name,
                &project.description,
                &tags,
                project.created_by,
                encode_timestamp(Utc::now()),
            ),
        )?;
        let id = tx.last_insert_rowid();
        audit::record(
            &tx,
            EntityKind::Project,
            id,
            project.created_by,
            AuditAction::Create,
            None,
        )?;
        let created = fetch_project(&tx, id)?.ok_or_else(|| LabbookError::not_found("Project", id))?;
        tx.commit()?;

        tracing::info!(project_id = id, actor_id = project.created_by, "project created");
        Ok(created)
    }

    fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let conn = self.lock_conn()?;
        fetch_project(&conn, id)
    }

    fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>> {
        let conn = self.lock_conn()?;

        let mut conditions: Vec<String> = Vec::new();
        let mut params: SqlParams = Vec::new();

        if let Some(ref text) = filter.text {
            push_text_condition(&mut conditions, &mut params, &["name", "description"], text);
        }
        for tag in &filter.tags {
            push_tag_condition(&mut conditions, &mut params, tag);
        }
        if let Some(archived) = filter.archived {
            conditions.push("archived = ?".to_string());
            params.push(Box::new(archived));
        }

        let mut query = format!("SELECT {} FROM projects", PROJECT_COLUMNS);
        finish_query(
            &mut query,
            &conditions,
            &mut params,
            "created_at DESC, id DESC",
            filter.limit,
            filter.offset,
        );
        query_all(
            &conn,
            &query,
            rusqlite::params_from_iter(params.iter()),
            ProjectRow::read,
        )
    }

    fn archive_project(&mut self, id: i64, actor_id: i64) -> Result<Project> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        require_row(&tx, "projects", "Project", id)?;

        tx.execute("UPDATE projects SET archived = 1 WHERE id = ?", [id])?;
        audit::record(&tx, EntityKind::Project, id, actor_id, AuditAction::Archive, None)?;
        let project = fetch_project(&tx, id)?.ok_or_else(|| LabbookError::not_found("Project", id))?;
        tx.commit()?;

        tracing::info!(project_id = id, actor_id, "project archived");
        Ok(project)
    }

    // --- Experiments ---

    fn create_experiment(&mut self, experiment: &NewExperiment) -> Result<Experiment> {
        require_text(
            "Experiment title",
            &experiment.title,
            MAX_EXPERIMENT_TITLE_CHARS,
        )?;
        if let (Some(start), Some(end)) = (experiment.start_at, experiment.end_at) {
            if end < start {
                return Err(LabbookError::Validation(
                    "Experiment end must not precede its start".to_string(),
                ));
            }
        }
        let tags = tags_json(&experiment.tags)?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        require_row(&tx, "projects", "Project", experiment.project_id)?;

        tx.execute(
            r#"
            INSERT INTO experiments (
                project_id, title, description, tags_json, start_at, end_at, created_at, archived
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, 0)
            "#,
            (
                experiment.project_id,
                &experiment.title,
                &experiment.description,
                &tags,
                experiment.start_at.map(encode_timestamp),
                experiment.end_at.map(encode_timestamp),
                encode_timestamp(Utc::now()),
            ),
        )?;
        let id = tx.last_insert_rowid();
        audit::record(
            &tx,
            EntityKind::Experiment,
            id,
            experiment.actor_id,
            AuditAction::Create,
            None,
        )?;
        let created =
            fetch_experiment(&tx, id)?.ok_or_else(|| LabbookError::not_found("Experiment", id))?;
        tx.commit()?;

        tracing::info!(
            experiment_id = id,
            project_id = experiment.project_id,
            "experiment created"
        );
        Ok(created)
    }

    fn get_experiment(&self, id: i64) -> Result<Option<Experiment>> {
        let conn = self.lock_conn()?;
        fetch_experiment(&conn, id)
    }

    fn list_experiments(&self, filter: &ExperimentFilter) -> Result<Vec<Experiment>> {
        let conn = self.lock_conn()?;

        let mut conditions: Vec<String> = Vec::new();
        let mut params: SqlParams = Vec::new();

        if let Some(project_id) = filter.project_id {
            conditions.push("project_id = ?".to_string());
            params.push(Box::new(project_id));
        }
        if let Some(ref text) = filter.text {
            push_text_condition(&mut conditions, &mut params, &["title", "description"], text);
        }
        for tag in &filter.tags {
            push_tag_condition(&mut conditions, &mut params, tag);
        }
        if let Some(archived) = filter.archived {
            conditions.push("archived = ?".to_string());
            params.push(Box::new(archived));
        }

        let mut query = format!("SELECT {} FROM experiments", EXPERIMENT_COLUMNS);
        finish_query(
            &mut query,
            &conditions,
            &mut params,
            "created_at DESC, id DESC",
            filter.limit,
            filter.offset,
        );
        query_all(
            &conn,
            &query,
            rusqlite::params_from_iter(params.iter()),
            ExperimentRow::read,
        )
    }

    fn archive_experiment(&mut self, id: i64, actor_id: i64) -> Result<Experiment> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        require_row(&tx, "experiments", "Experiment", id)?;

        tx.execute("UPDATE experiments SET archived = 1 WHERE id = ?", [id])?;
        audit::record(
            &tx,
            EntityKind::Experiment,
            id,
            actor_id,
            AuditAction::Archive,
            None,
        )?;
        let experiment =
            fetch_experiment(&tx, id)?.ok_or_else(|| LabbookError::not_found("Experiment", id))?;
        tx.commit()?;

        tracing::info!(experiment_id = id, actor_id, "experiment archived");
        Ok(experiment)
    }

    // --- Entries ---

    fn create_entry(&mut self, entry: &NewEntry) -> Result<Entry> {
        require_text("Entry title", &entry.title, MAX_ENTRY_TITLE_CHARS)?;
        let tags = tags_json(&entry.tags)?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        require_row(&tx, "experiments", "Experiment", entry.experiment_id)?;
        require_row(&tx, "users", "User", entry.author_id)?;

        let now = encode_timestamp(Utc::now());
        tx.execute(
            r#"
            INSERT INTO entries (
                experiment_id, author_id, title, body, tags_json,
                version, parent_version_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, 1, NULL, ?, ?)
            "#,
            (
                entry.experiment_id,
                entry.author_id,
                &entry.title,
                &entry.body,
                &tags,
                &now,
                &now,
            ),
        )?;
        let id = tx.last_insert_rowid();
        audit::record(
            &tx,
            EntityKind::Entry,
            id,
            entry.author_id,
            AuditAction::Create,
            None,
        )?;
        let created = fetch_entry(&tx, id)?.ok_or_else(|| LabbookError::not_found("Entry", id))?;
        tx.commit()?;

        tracing::info!(entry_id = id, experiment_id = entry.experiment_id, "entry created");
        Ok(created)
    }

    fn revise_entry(&mut self, id: i64, patch: &EntryPatch) -> Result<Entry> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let previous = fetch_entry(&tx, id)?.ok_or_else(|| LabbookError::not_found("Entry", id))?;

        let title = patch.title.clone().unwrap_or_else(|| previous.title.clone());
        if title.chars().count() > MAX_ENTRY_TITLE_CHARS {
            return Err(LabbookError::Validation(format!(
                "Entry title must be at most {} characters",
                MAX_ENTRY_TITLE_CHARS
            )));
        }
        let body = patch.body.clone().unwrap_or_else(|| previous.body.clone());
        let tags = match patch.tags {
            Some(ref tags) => tags_json(tags)?,
            None => serde_json::to_string(&previous.tags)?,
        };

        tx.execute(
            r#"
            INSERT INTO entries (
                experiment_id, author_id, title, body, tags_json,
                version, parent_version_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            (
                previous.experiment_id,
                previous.author_id,
                &title,
                &body,
                &tags,
                previous.version + 1,
                previous.id,
                encode_timestamp(previous.created_at),
                encode_timestamp(Utc::now()),
            ),
        )?;
        let new_id = tx.last_insert_rowid();

        let diff = serde_json::to_value(patch)?;
        audit::record(
            &tx,
            EntityKind::Entry,
            new_id,
            previous.author_id,
            AuditAction::Update,
            Some(&diff),
        )?;
        let revised =
            fetch_entry(&tx, new_id)?.ok_or_else(|| LabbookError::not_found("Entry", new_id))?;
        tx.commit()?;

        tracing::info!(
            entry_id = new_id,
            parent_version_id = id,
            version = revised.version,
            "entry revised"
        );
        Ok(revised)
    }

    fn get_entry(&self, id: i64) -> Result<Option<Entry>> {
        let conn = self.lock_conn()?;
        fetch_entry(&conn, id)
    }

    fn entry_history(&self, id: i64) -> Result<Vec<Entry>> {
        let conn = self.lock_conn()?;
        let root = chain_root(&conn, id)?;
        chain_rows(&conn, root)
    }

    fn latest_version(&self, id: i64) -> Result<Entry> {
        let conn = self.lock_conn()?;
        let root = chain_root(&conn, id)?;
        chain_rows(&conn, root)?
            .into_iter()
            .last()
            .ok_or_else(|| LabbookError::not_found("Entry", id))
    }

    fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>> {
        let conn = self.lock_conn()?;

        let mut conditions: Vec<String> = Vec::new();
        let mut params: SqlParams = Vec::new();

        if let Some(experiment_id) = filter.experiment_id {
            conditions.push("experiment_id = ?".to_string());
            params.push(Box::new(experiment_id));
        }
        if let Some(project_id) = filter.project_id {
            conditions.push(
                "experiment_id IN (SELECT id FROM experiments WHERE project_id = ?)".to_string(),
            );
            params.push(Box::new(project_id));
        }
        if let Some(author_id) = filter.author_id {
            conditions.push("author_id = ?".to_string());
            params.push(Box::new(author_id));
        }
        if let Some(ref text) = filter.text {
            push_text_condition(&mut conditions, &mut params, &["title", "body"], text);
        }
        for tag in &filter.tags {
            push_tag_condition(&mut conditions, &mut params, tag);
        }
        if let Some(since) = filter.since {
            conditions.push("created_at >= ?".to_string());
            params.push(Box::new(encode_timestamp(since)));
        }
        if let Some(until) = filter.until {
            conditions.push("created_at <= ?".to_string());
            params.push(Box::new(encode_timestamp(until)));
        }
        if !filter.include_superseded {
            conditions.push(
                "NOT EXISTS (SELECT 1 FROM entries c WHERE c.parent_version_id = entries.id)"
                    .to_string(),
            );
        }

        let mut query = format!("SELECT {} FROM entries", ENTRY_COLUMNS);
        finish_query(
            &mut query,
            &conditions,
            &mut params,
            "updated_at DESC, id DESC",
            filter.limit,
            filter.offset,
        );
        query_all(
            &conn,
            &query,
            rusqlite::params_from_iter(params.iter()),
            EntryRow::read,
        )
    }

    // --- Attachments ---

    fn insert_attachment(&mut self, attachment: &NewAttachment) -> Result<Attachment> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let author_id = entry_author(&tx, attachment.entry_id)?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM attachments WHERE sha256 = ?",
                [&attachment.sha256],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(existing) = existing {
            return Err(LabbookError::Conflict(format!(
                "This file has already been uploaded (ID: {})",
                existing
            )));
        }

        let result = tx.execute(
            r#"
            INSERT INTO attachments (
                entry_id, path, file_type, size_bytes, original_name, caption, sha256, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            (
                attachment.entry_id,
                &attachment.path,
                &attachment.file_type,
                attachment.size_bytes,
                &attachment.original_name,
                &attachment.caption,
                &attachment.sha256,
                encode_timestamp(Utc::now()),
            ),
        );
        match result {
            Ok(_) => {}
            Err(ref e) if is_unique_violation(e) => {
                return Err(LabbookError::Conflict(
                    "This file has already been uploaded".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }
        let id = tx.last_insert_rowid();
        audit::record(
            &tx,
            EntityKind::Attachment,
            id,
            author_id,
            AuditAction::Create,
            None,
        )?;
        let created =
            fetch_attachment(&tx, id)?.ok_or_else(|| LabbookError::not_found("Attachment", id))?;
        tx.commit()?;

        tracing::info!(attachment_id = id, entry_id = attachment.entry_id, "attachment stored");
        Ok(created)
    }

    fn get_attachment(&self, id: i64) -> Result<Option<Attachment>> {
        let conn = self.lock_conn()?;
        fetch_attachment(&conn, id)
    }

    fn find_attachment_by_digest(&self, sha256: &str) -> Result<Option<Attachment>> {
        let conn = self.lock_conn()?;
        query_optional(
            &conn,
            &format!(
                "SELECT {} FROM attachments WHERE sha256 = ?",
                ATTACHMENT_COLUMNS
            ),
            [sha256],
            AttachmentRow::read,
        )
    }

    fn list_attachments(&self, filter: &AttachmentFilter) -> Result<Vec<Attachment>> {
        let conn = self.lock_conn()?;

        let mut conditions: Vec<String> = Vec::new();
        let mut params: SqlParams = Vec::new();

        if let Some(entry_id) = filter.entry_id {
            conditions.push("entry_id = ?".to_string());
            params.push(Box::new(entry_id));
        }
        if let Some(ref file_type) = filter.file_type {
            conditions.push("file_type = ?".to_string());
            params.push(Box::new(file_type.trim().to_ascii_lowercase()));
        }

        let mut query = format!("SELECT {} FROM attachments", ATTACHMENT_COLUMNS);
        finish_query(
            &mut query,
            &conditions,
            &mut params,
            "created_at ASC, id ASC",
            filter.limit,
            filter.offset,
        );
        query_all(
            &conn,
            &query,
            rusqlite::params_from_iter(params.iter()),
            AttachmentRow::read,
        )
    }

    fn delete_attachment(&mut self, id: i64, actor_id: i64) -> Result<Attachment> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let attachment =
            fetch_attachment(&tx, id)?.ok_or_else(|| LabbookError::not_found("Attachment", id))?;

        audit::record(
            &tx,
            EntityKind::Attachment,
            id,
            actor_id,
            AuditAction::Delete,
            None,
        )?;
        tx.execute("DELETE FROM attachments WHERE id = ?", [id])?;
        tx.commit()?;

        tracing::info!(attachment_id = id, actor_id, "attachment deleted");
        Ok(attachment)
    }

    // --- Datasets ---

    fn insert_dataset(&mut self, dataset: &NewDataset) -> Result<Dataset> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let author_id = entry_author(&tx, dataset.entry_id)?;

        tx.execute(
            r#"
            INSERT INTO datasets (
                entry_id, name, path, columns_json, stats_json, row_count, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            (
                dataset.entry_id,
                &dataset.name,
                &dataset.path,
                serde_json::to_string(&dataset.columns)?,
                serde_json::to_string(&dataset.stats)?,
                dataset.row_count,
                encode_timestamp(Utc::now()),
            ),
        )?;
        let id = tx.last_insert_rowid();
        audit::record(
            &tx,
            EntityKind::Dataset,
            id,
            author_id,
            AuditAction::Create,
            None,
        )?;
        let created: Dataset = query_optional(
            &tx,
            &format!("SELECT {} FROM datasets WHERE id = ?", DATASET_COLUMNS),
            [id],
            DatasetRow::read,
        )?
        .ok_or_else(|| LabbookError::not_found("Dataset", id))?;
        tx.commit()?;

        tracing::info!(
            dataset_id = id,
            entry_id = dataset.entry_id,
            rows = dataset.row_count,
            "dataset imported"
        );
        Ok(created)
    }

    fn get_dataset(&self, id: i64) -> Result<Option<Dataset>> {
        let conn = self.lock_conn()?;
        query_optional(
            &conn,
            &format!("SELECT {} FROM datasets WHERE id = ?", DATASET_COLUMNS),
            [id],
            DatasetRow::read,
        )
    }

    fn list_datasets(&self, entry_id: Option<i64>) -> Result<Vec<Dataset>> {
        let conn = self.lock_conn()?;
        match entry_id {
            Some(entry_id) => query_all(
                &conn,
                &format!(
                    "SELECT {} FROM datasets WHERE entry_id = ? ORDER BY created_at ASC, id ASC",
                    DATASET_COLUMNS
                ),
                [entry_id],
                DatasetRow::read,
            ),
            None => query_all(
                &conn,
                &format!(
                    "SELECT {} FROM datasets ORDER BY created_at ASC, id ASC",
                    DATASET_COLUMNS
                ),
                [],
                DatasetRow::read,
            ),
        }
    }

    // --- Charts ---

    fn insert_chart(&mut self, chart: &NewChart) -> Result<Chart> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;
        require_row(&tx, "datasets", "Dataset", chart.dataset_id)?;

        tx.execute(
            r#"
            INSERT INTO charts (
                dataset_id, kind, x_column, y_column, title, path, config_json, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            (
                chart.dataset_id,
                chart.kind.as_str(),
                &chart.x_column,
                &chart.y_column,
                &chart.title,
                &chart.path,
                serde_json::to_string(&chart.config)?,
                encode_timestamp(Utc::now()),
            ),
        )?;
        let id = tx.last_insert_rowid();
        audit::record(
            &tx,
            EntityKind::Chart,
            id,
            chart.actor_id,
            AuditAction::Create,
            None,
        )?;
        let created: Chart = query_optional(
            &tx,
            &format!("SELECT {} FROM charts WHERE id = ?", CHART_COLUMNS),
            [id],
            ChartRow::read,
        )?
        .ok_or_else(|| LabbookError::not_found("Chart", id))?;
        tx.commit()?;

        tracing::info!(chart_id = id, dataset_id = chart.dataset_id, "chart created");
        Ok(created)
    }

    fn get_chart(&self, id: i64) -> Result<Option<Chart>> {
        let conn = self.lock_conn()?;
        query_optional(
            &conn,
            &format!("SELECT {} FROM charts WHERE id = ?", CHART_COLUMNS),
            [id],
            ChartRow::read,
        )
    }

    fn list_charts(&self, dataset_id: i64) -> Result<Vec<Chart>> {
        let conn = self.lock_conn()?;
        query_all(
            &conn,
            &format!(
                "SELECT {} FROM charts WHERE dataset_id = ? ORDER BY created_at ASC, id ASC",
                CHART_COLUMNS
            ),
            [dataset_id],
            ChartRow::read,
        )
    }

    // --- Audit ---

    fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>> {
        let conn = self.lock_conn()?;

        let mut conditions: Vec<String> = Vec::new();
        let mut params: SqlParams = Vec::new();

        if let Some(entity) = filter.entity {
            conditions.push("entity = ?".to_string());
            params.push(Box::new(entity.as_str()));
        }
        if let Some(entity_id) = filter.entity_id {
            conditions.push("entity_id = ?".to_string());
            params.push(Box::new(entity_id));
        }
        if let Some(actor_id) = filter.actor_id {
            conditions.push("actor_id = ?".to_string());
            params.push(Box::new(actor_id));
        }
        if let Some(action) = filter.action {
            conditions.push("action = ?".to_string());
            params.push(Box::new(action.as_str()));
        }

        let mut query = format!("SELECT {} FROM audit_log", AUDIT_COLUMNS);
        finish_query(
            &mut query,
            &conditions,
            &mut params,
            "created_at DESC, id DESC",
            filter.limit,
            None,
        );
        query_all(
            &conn,
            &query,
            rusqlite::params_from_iter(params.iter()),
            AuditRow::read,
        )
    }

    // --- Templates ---

    fn insert_template(&mut self, template: &NewTemplate) -> Result<Template> {
        require_text("Template name", &template.name, 200)?;

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        if template.is_default {
            tx.execute(
                "UPDATE templates SET is_default = 0 WHERE kind = ? AND is_default = 1",
                [template.kind.as_str()],
            )?;
        }
        tx.execute(
            r#"
            INSERT INTO templates (kind, name, description, path, is_default, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            (
                template.kind.as_str(),
                &template.name,
                &template.description,
                &template.path,
                template.is_default,
                encode_timestamp(Utc::now()),
            ),
        )?;
        let id = tx.last_insert_rowid();
        let created =
            fetch_template(&tx, id)?.ok_or_else(|| LabbookError::not_found("Template", id))?;
        tx.commit()?;

        tracing::info!(
            template_id = id,
            kind = template.kind.as_str(),
            is_default = template.is_default,
            "template created"
        );
        Ok(created)
    }

    fn get_template(&self, id: i64) -> Result<Option<Template>> {
        let conn = self.lock_conn()?;
        fetch_template(&conn, id)
    }

    fn list_templates(&self, kind: Option<TemplateKind>) -> Result<Vec<Template>> {
        let conn = self.lock_conn()?;
        let order = "ORDER BY is_default DESC, created_at DESC, id DESC";
        match kind {
            Some(kind) => query_all(
                &conn,
                &format!(
                    "SELECT {} FROM templates WHERE kind = ? {}",
                    TEMPLATE_COLUMNS, order
                ),
                [kind.as_str()],
                TemplateRow::read,
            ),
            None => query_all(
                &conn,
                &format!("SELECT {} FROM templates {}", TEMPLATE_COLUMNS, order),
                [],
                TemplateRow::read,
            ),
        }
    }

    fn set_default_template(&mut self, id: i64) -> Result<Template> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let template =
            fetch_template(&tx, id)?.ok_or_else(|| LabbookError::not_found("Template", id))?;

        // Clear first so the partial unique index never sees two defaults
        tx.execute(
            "UPDATE templates SET is_default = 0 WHERE kind = ? AND is_default = 1",
            [template.kind.as_str()],
        )?;
        tx.execute("UPDATE templates SET is_default = 1 WHERE id = ?", [id])?;
        let updated =
            fetch_template(&tx, id)?.ok_or_else(|| LabbookError::not_found("Template", id))?;
        tx.commit()?;

        tracing::info!(template_id = id, kind = template.kind.as_str(), "default template set");
        Ok(updated)
    }

    fn delete_template(&mut self, id: i64) -> Result<Template> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        let template =
            fetch_template(&tx, id)?.ok_or_else(|| LabbookError::not_found("Template", id))?;
        tx.execute("DELETE FROM templates WHERE id = ?", [id])?;
        tx.commit()?;

        tracing::info!(template_id = id, "template deleted");
        Ok(template)
    }

    // --- Maintenance ---

    fn check_integrity(&self) -> Result<()> {
        let conn = self.lock_conn()?;

        let mut stmt = conn.prepare("PRAGMA foreign_key_check")?;
        let mut rows = stmt.query([])?;
        if rows.next()?.is_some() {
            return Err(LabbookError::Storage(
                "Foreign key integrity check failed".to_string(),
            ));
        }

        let duplicate_defaults: i64 = conn.query_row(
            "SELECT COUNT(*) FROM (SELECT kind FROM templates WHERE is_default = 1 GROUP BY kind HAVING COUNT(*) > 1)",
            [],
            |row| row.get(0),
        )?;
        if duplicate_defaults > 0 {
            return Err(LabbookError::Storage(
                "More than one default template for a template type".to_string(),
            ));
        }

        let broken_chains: i64 = conn.query_row(
            r#"
            SELECT COUNT(*) FROM entries c
            JOIN entries p ON c.parent_version_id = p.id
            WHERE p.experiment_id != c.experiment_id OR p.version >= c.version
            "#,
            [],
            |row| row.get(0),
        )?;
        if broken_chains > 0 {
            return Err(LabbookError::Storage(
                "Entry version chain is inconsistent".to_string(),
            ));
        }

        let schema_version: Option<String> = conn
            .query_row(
                "SELECT value FROM meta WHERE key = 'schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        if schema_version.is_none() {
            return Err(LabbookError::Storage(
                "Metadata table missing schema version".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::UserRole;

    fn seeded() -> (SqliteStore, User, Experiment) {
        let mut store = SqliteStore::open_in_memory().unwrap();
        let user = store
            .create_user(&NewUser::new("Ada", "ada@lab.org"))
            .unwrap();
        let project = store
            .create_project(&NewProject::new("Enzymes", user.id))
            .unwrap();
        let experiment = store
            .create_experiment(&NewExperiment::new(project.id, "Kinetics", user.id))
            .unwrap();
        (store, user, experiment)
    }

    #[test]
    fn test_create_entry_starts_chain() {
        let (mut store, user, experiment) = seeded();
        let entry = store
            .create_entry(&NewEntry::new(experiment.id, user.id, "Day 1"))
            .unwrap();
        assert_eq!(entry.version, 1);
        assert_eq!(entry.parent_version_id, None);
        assert_eq!(entry.created_at, entry.updated_at);
    }

    #[test]
    fn test_create_entry_unknown_experiment() {
        let (mut store, user, _) = seeded();
        let err = store
            .create_entry(&NewEntry::new(999, user.id, "Day 1"))
            .unwrap_err();
        assert!(matches!(err, LabbookError::NotFound(ref m) if m.contains("Experiment 999")));
    }

    #[test]
    fn test_revise_applies_explicit_empty_values() {
        let (mut store, user, experiment) = seeded();
        let entry = store
            .create_entry(
                &NewEntry::new(experiment.id, user.id, "Day 1")
                    .with_body("pipetted")
                    .with_tags(vec!["wet".to_string()]),
            )
            .unwrap();

        let revised = store
            .revise_entry(entry.id, &EntryPatch::new().body("").tags(Vec::new()))
            .unwrap();
        assert_eq!(revised.title, "Day 1");
        assert_eq!(revised.body, "");
        assert!(revised.tags.is_empty());
        assert_eq!(revised.created_at, entry.created_at);
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let (mut store, _, _) = seeded();
        let err = store
            .create_user(&NewUser::new("Other", "ada@lab.org").with_role(UserRole::Admin))
            .unwrap_err();
        assert!(matches!(err, LabbookError::Conflict(_)));
    }

    #[test]
    fn test_archive_project_records_audit() {
        let (mut store, user, experiment) = seeded();
        let project = store.archive_project(experiment.project_id, user.id).unwrap();
        assert!(project.archived);

        let audit = store
            .list_audit(
                &AuditFilter::new()
                    .entity(EntityKind::Project)
                    .action(AuditAction::Archive),
            )
            .unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].actor_id, user.id);
    }

    #[test]
    fn test_offset_without_limit() {
        let (mut store, user, experiment) = seeded();
        for i in 0..3 {
            store
                .create_entry(&NewEntry::new(experiment.id, user.id, format!("E{}", i)))
                .unwrap();
        }
        let mut filter = EntryFilter::new();
        filter.offset = Some(1);
        assert_eq!(store.list_entries(&filter).unwrap().len(), 2);
    }

    #[test]
    fn test_check_integrity_on_fresh_store() {
        let (store, _, _) = seeded();
        store.check_integrity().unwrap();
    }
}
