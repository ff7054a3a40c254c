//! Output formatting for domain records.
//!
//! JSON output serializes the core records directly; text output goes
//! through the row builders here so list commands share column layouts.

use serde::Serialize;

use labbook_core::storage::{
    Attachment, AuditRecord, Chart, Dataset, Entry, Experiment, Project, Template, User,
};

use crate::ui::{table, UiContext};

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn date(value: &chrono::DateTime<chrono::Utc>) -> String {
    value.format("%Y-%m-%d %H:%M").to_string()
}

fn tags(values: &[String]) -> String {
    values.join(",")
}

/// Shorten text for a table cell.
pub fn truncate(text: &str, max: usize) -> String {
    let first_line = text.lines().next().unwrap_or("");
    if first_line.chars().count() <= max && !text.contains('\n') {
        return first_line.to_string();
    }
    let cut: String = first_line.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}

pub fn users_table(ctx: &UiContext, users: &[User]) -> String {
    let rows: Vec<Vec<String>> = users
        .iter()
        .map(|u| {
            vec![
                u.id.to_string(),
                u.name.clone(),
                u.email.clone(),
                u.role.to_string(),
            ]
        })
        .collect();
    table(ctx, &["ID", "Name", "Email", "Role"], &rows)
}

pub fn projects_table(ctx: &UiContext, projects: &[Project]) -> String {
    let rows: Vec<Vec<String>> = projects
        .iter()
        .map(|p| {
            vec![
                p.id.to_string(),
                p.name.clone(),
                tags(&p.tags),
                date(&p.created_at),
                if p.archived { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    table(ctx, &["ID", "Name", "Tags", "Created", "Archived"], &rows)
}

pub fn experiments_table(ctx: &UiContext, experiments: &[Experiment]) -> String {
    let rows: Vec<Vec<String>> = experiments
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                e.project_id.to_string(),
                e.title.clone(),
                tags(&e.tags),
                e.start_at.as_ref().map(date).unwrap_or_default(),
                if e.archived { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    table(ctx, &["ID", "Project", "Title", "Tags", "Start", "Archived"], &rows)
}

pub fn entries_table(ctx: &UiContext, entries: &[Entry]) -> String {
    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            vec![
                e.id.to_string(),
                e.experiment_id.to_string(),
                format!("v{}", e.version),
                truncate(&e.title, 40),
                tags(&e.tags),
                date(&e.updated_at),
            ]
        })
        .collect();
    table(ctx, &["ID", "Experiment", "Version", "Title", "Tags", "Updated"], &rows)
}

pub fn attachments_table(ctx: &UiContext, attachments: &[Attachment]) -> String {
    let rows: Vec<Vec<String>> = attachments
        .iter()
        .map(|a| {
            vec![
                a.id.to_string(),
                a.entry_id.to_string(),
                a.original_name.clone(),
                a.file_type.clone(),
                a.size_bytes.to_string(),
                a.sha256.chars().take(12).collect(),
            ]
        })
        .collect();
    table(ctx, &["ID", "Entry", "Name", "Type", "Bytes", "SHA-256"], &rows)
}

pub fn datasets_table(ctx: &UiContext, datasets: &[Dataset]) -> String {
    let rows: Vec<Vec<String>> = datasets
        .iter()
        .map(|d| {
            vec![
                d.id.to_string(),
                d.entry_id.to_string(),
                d.name.clone(),
                d.row_count.to_string(),
                d.column_names().join(","),
            ]
        })
        .collect();
    table(ctx, &["ID", "Entry", "Name", "Rows", "Columns"], &rows)
}

pub fn charts_table(ctx: &UiContext, charts: &[Chart]) -> String {
    let rows: Vec<Vec<String>> = charts
        .iter()
        .map(|c| {
            vec![
                c.id.to_string(),
                c.kind.to_string(),
                c.x_column.clone(),
                c.y_column.clone(),
                c.title.clone().unwrap_or_default(),
                c.path.clone(),
            ]
        })
        .collect();
    table(ctx, &["ID", "Kind", "X", "Y", "Title", "Path"], &rows)
}

pub fn templates_table(ctx: &UiContext, templates: &[Template]) -> String {
    let rows: Vec<Vec<String>> = templates
        .iter()
        .map(|t| {
            vec![
                t.id.to_string(),
                t.kind.to_string(),
                t.name.clone(),
                if t.is_default { "*" } else { "" }.to_string(),
                t.description.clone().unwrap_or_default(),
            ]
        })
        .collect();
    table(ctx, &["ID", "Kind", "Name", "Default", "Description"], &rows)
}

pub fn audit_table(ctx: &UiContext, records: &[AuditRecord]) -> String {
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|r| {
            vec![
                r.id.to_string(),
                date(&r.created_at),
                r.actor_id.to_string(),
                r.action.to_string(),
                format!("{} {}", r.entity, r.entity_id),
                r.diff.as_ref().map(|d| d.to_string()).unwrap_or_default(),
            ]
        })
        .collect();
    table(ctx, &["ID", "When", "Actor", "Action", "Target", "Diff"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a much longer title", 10), "a much ...");
        assert_eq!(truncate("line one\nline two", 20), "line one...");
    }
}
