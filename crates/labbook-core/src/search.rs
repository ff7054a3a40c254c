//! Read-only search over projects, experiments and entries.
//!
//! Everything here is a thin layer over the store's list filters: text is a
//! case-insensitive substring match, tags must all be present, and limits
//! are clamped.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{LabbookError, Result};
use crate::storage::{
    Entry, EntryFilter, Experiment, ExperimentFilter, NotebookStore, Project, ProjectFilter,
};

pub const DEFAULT_LIMIT: usize = 50;
pub const MAX_LIMIT: usize = 200;

pub const SEARCH_ALL_DEFAULT_LIMIT: usize = 20;
pub const SEARCH_ALL_MAX_LIMIT: usize = 100;
pub const SEARCH_ALL_MIN_TEXT_CHARS: usize = 2;

/// Split a comma-separated tag list, dropping blanks.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn clamp_limit(limit: Option<usize>, default: usize, max: usize) -> Result<usize> {
    match limit {
        None => Ok(default),
        Some(0) => Err(LabbookError::Validation(
            "limit must be at least 1".to_string(),
        )),
        Some(n) if n > max => Err(LabbookError::Validation(format!(
            "limit must be at most {}",
            max
        ))),
        Some(n) => Ok(n),
    }
}

fn non_blank(text: &Option<String>) -> Option<String> {
    text.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

/// Entry search criteria.
#[derive(Debug, Clone, Default)]
pub struct EntryQuery {
    pub text: Option<String>,
    pub project_id: Option<i64>,
    pub experiment_id: Option<i64>,
    pub tags: Vec<String>,
    pub author_id: Option<i64>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub include_superseded: bool,
    pub limit: Option<usize>,
    pub offset: usize,
}

pub fn search_entries(store: &dyn NotebookStore, query: &EntryQuery) -> Result<Vec<Entry>> {
    let limit = clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT)?;
    let filter = EntryFilter {
        experiment_id: query.experiment_id,
        // An experiment already pins the project
        project_id: query.experiment_id.map_or(query.project_id, |_| None),
        author_id: query.author_id,
        text: non_blank(&query.text),
        tags: query.tags.clone(),
        since: query.since,
        until: query.until,
        include_superseded: query.include_superseded,
        limit: Some(limit),
        offset: Some(query.offset),
    };
    store.list_entries(&filter)
}

/// Experiment search criteria.
#[derive(Debug, Clone, Default)]
pub struct ExperimentQuery {
    pub text: Option<String>,
    pub project_id: Option<i64>,
    pub tags: Vec<String>,
    pub limit: Option<usize>,
}

pub fn search_experiments(
    store: &dyn NotebookStore,
    query: &ExperimentQuery,
) -> Result<Vec<Experiment>> {
    let filter = ExperimentFilter {
        project_id: query.project_id,
        text: non_blank(&query.text),
        tags: query.tags.clone(),
        archived: None,
        limit: Some(clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT)?),
        offset: None,
    };
    store.list_experiments(&filter)
}

/// Project search criteria.
#[derive(Debug, Clone, Default)]
pub struct ProjectQuery {
    pub text: Option<String>,
    pub tags: Vec<String>,
    pub limit: Option<usize>,
}

pub fn search_projects(store: &dyn NotebookStore, query: &ProjectQuery) -> Result<Vec<Project>> {
    let filter = ProjectFilter {
        text: non_blank(&query.text),
        tags: query.tags.clone(),
        archived: None,
        limit: Some(clamp_limit(query.limit, DEFAULT_LIMIT, MAX_LIMIT)?),
        offset: None,
    };
    store.list_projects(&filter)
}

/// One hit of a grouped search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResults {
    pub query: String,
    pub projects: Vec<SearchHit>,
    pub experiments: Vec<SearchHit>,
    pub entries: Vec<SearchHit>,
    pub total: usize,
}

/// Search every kind at once, `limit` hits per kind.
///
/// # Errors
///
/// Returns `LabbookError::Validation` if `text` is shorter than two
/// characters or `limit` is out of range.
pub fn search_all(
    store: &dyn NotebookStore,
    text: &str,
    limit: Option<usize>,
) -> Result<SearchResults> {
    let text = text.trim();
    if text.chars().count() < SEARCH_ALL_MIN_TEXT_CHARS {
        return Err(LabbookError::Validation(format!(
            "search text must be at least {} characters",
            SEARCH_ALL_MIN_TEXT_CHARS
        )));
    }
    let limit = clamp_limit(limit, SEARCH_ALL_DEFAULT_LIMIT, SEARCH_ALL_MAX_LIMIT)?;

    let projects: Vec<SearchHit> = store
        .list_projects(&ProjectFilter::new().text(text).limit(limit))?
        .into_iter()
        .map(|p| SearchHit {
            id: p.id,
            title: p.name,
        })
        .collect();
    let experiments: Vec<SearchHit> = store
        .list_experiments(&ExperimentFilter::new().text(text).limit(limit))?
        .into_iter()
        .map(|e| SearchHit {
            id: e.id,
            title: e.title,
        })
        .collect();
    let entries: Vec<SearchHit> = store
        .list_entries(&EntryFilter::new().text(text).limit(limit))?
        .into_iter()
        .map(|e| SearchHit {
            id: e.id,
            title: e.title,
        })
        .collect();

    let total = projects.len() + experiments.len() + entries.len();
    Ok(SearchResults {
        query: text.to_string(),
        projects,
        experiments,
        entries,
        total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(" a, b ,,c "), vec!["a", "b", "c"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 50, 200).unwrap(), 50);
        assert_eq!(clamp_limit(Some(200), 50, 200).unwrap(), 200);
        assert!(clamp_limit(Some(201), 50, 200).is_err());
        assert!(clamp_limit(Some(0), 50, 200).is_err());
    }
}
