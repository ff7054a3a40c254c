//! Storage engine trait definition.
//!
//! The `NotebookStore` trait is the relational-store seam. Every mutating
//! method runs as one unit of work and appends its audit row inside that
//! same unit, so a change and its audit fact commit together.

use super::types::{
    Attachment, AttachmentFilter, AuditFilter, AuditRecord, Chart, Dataset, Entry, EntryFilter,
    EntryPatch, Experiment, ExperimentFilter, NewAttachment, NewChart, NewDataset, NewEntry,
    NewExperiment, NewProject, NewTemplate, NewUser, Project, ProjectFilter, Template,
    TemplateKind, User,
};
use crate::error::Result;

/// Relational store for notebook records.
///
/// All implementations must ensure:
/// - Entry rows are never updated in place
/// - Audit rows are never updated or deleted
/// - Attachment digests are unique across the store
/// - At most one default template exists per template kind
pub trait NotebookStore: Send + Sync {
    // --- Users ---

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::Validation` if the name is empty or the email
    /// is malformed, and `LabbookError::Conflict` if the email is taken.
    fn create_user(&mut self, user: &NewUser) -> Result<User>;

    /// Get a user by ID.
    fn get_user(&self, id: i64) -> Result<Option<User>>;

    /// List users ordered by ID.
    fn list_users(&self) -> Result<Vec<User>>;

    // --- Projects ---

    /// Create a project and record an audit "create" by its creator.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::Validation` if the name is empty or longer than
    /// 200 characters, `LabbookError::NotFound` if the creator does not exist.
    fn create_project(&mut self, project: &NewProject) -> Result<Project>;

    fn get_project(&self, id: i64) -> Result<Option<Project>>;

    /// List projects matching the filter, newest first.
    fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<Project>>;

    /// Set the archived flag and record an audit "archive" by `actor_id`.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if the project does not exist.
    fn archive_project(&mut self, id: i64, actor_id: i64) -> Result<Project>;

    // --- Experiments ---

    /// Create an experiment inside a project.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if the project does not exist and
    /// `LabbookError::Validation` if the title is empty or longer than 300
    /// characters.
    fn create_experiment(&mut self, experiment: &NewExperiment) -> Result<Experiment>;

    fn get_experiment(&self, id: i64) -> Result<Option<Experiment>>;

    /// List experiments matching the filter, newest first.
    fn list_experiments(&self, filter: &ExperimentFilter) -> Result<Vec<Experiment>>;

    /// Set the archived flag and record an audit "archive" by `actor_id`.
    fn archive_experiment(&mut self, id: i64, actor_id: i64) -> Result<Experiment>;

    // --- Entries ---

    /// Insert version 1 of a new entry and record an audit "create" by its
    /// author.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if the experiment or author does not
    /// exist, `LabbookError::Validation` if the title is empty or a tag is
    /// invalid.
    fn create_entry(&mut self, entry: &NewEntry) -> Result<Entry>;

    /// Append a new version derived from the row at `id`.
    ///
    /// Every field is copied from that row, then the supplied fields of
    /// `patch` overwrite it. The new row gets `version + 1` and
    /// `parent_version_id = id`; the row at `id` is left untouched. The audit
    /// "update" carries only the supplied fields.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if no row has this ID.
    fn revise_entry(&mut self, id: i64, patch: &EntryPatch) -> Result<Entry>;

    /// Get one entry row by ID.
    fn get_entry(&self, id: i64) -> Result<Option<Entry>>;

    /// Every version of the logical entry `id` belongs to, ordered by version.
    ///
    /// The chain is walked backward to its root and then forward through all
    /// descendants, so any row of the chain yields the same history.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if no row has this ID.
    fn entry_history(&self, id: i64) -> Result<Vec<Entry>>;

    /// Newest version of the chain `id` belongs to.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if no row has this ID.
    fn latest_version(&self, id: i64) -> Result<Entry>;

    /// List entry rows matching the filter, newest first.
    ///
    /// Superseded rows are skipped unless `include_superseded` is set.
    fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<Entry>>;

    // --- Attachments ---

    /// Insert an attachment row and record an audit "create" attributed to
    /// the entry's author.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if the entry does not exist and
    /// `LabbookError::Conflict` if the digest is already stored.
    fn insert_attachment(&mut self, attachment: &NewAttachment) -> Result<Attachment>;

    fn get_attachment(&self, id: i64) -> Result<Option<Attachment>>;

    /// Look up an attachment by content digest.
    fn find_attachment_by_digest(&self, sha256: &str) -> Result<Option<Attachment>>;

    /// List attachments matching the filter, oldest first.
    fn list_attachments(&self, filter: &AttachmentFilter) -> Result<Vec<Attachment>>;

    /// Record an audit "delete" by `actor_id` and remove the row, both in one
    /// transaction. Returns the removed row.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if the attachment does not exist.
    fn delete_attachment(&mut self, id: i64, actor_id: i64) -> Result<Attachment>;

    // --- Datasets ---

    /// Insert a dataset row and record an audit "create" attributed to the
    /// entry's author.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if the entry does not exist.
    fn insert_dataset(&mut self, dataset: &NewDataset) -> Result<Dataset>;

    fn get_dataset(&self, id: i64) -> Result<Option<Dataset>>;

    /// List datasets, optionally restricted to one entry row, oldest first.
    fn list_datasets(&self, entry_id: Option<i64>) -> Result<Vec<Dataset>>;

    // --- Charts ---

    /// Insert a chart row and record an audit "create" by the supplied actor.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if the dataset does not exist.
    fn insert_chart(&mut self, chart: &NewChart) -> Result<Chart>;

    fn get_chart(&self, id: i64) -> Result<Option<Chart>>;

    /// List charts of one dataset, oldest first.
    fn list_charts(&self, dataset_id: i64) -> Result<Vec<Chart>>;

    // --- Audit ---

    /// List audit rows matching the filter, newest first.
    fn list_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditRecord>>;

    // --- Templates ---

    /// Insert a template. When `is_default` is set, every other template of
    /// the same kind loses its default flag in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::Validation` if the name is empty.
    fn insert_template(&mut self, template: &NewTemplate) -> Result<Template>;

    fn get_template(&self, id: i64) -> Result<Option<Template>>;

    /// List templates, defaults first, then newest first.
    fn list_templates(&self, kind: Option<TemplateKind>) -> Result<Vec<Template>>;

    /// Make `id` the default of its kind, clearing the flag on the others.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if the template does not exist.
    fn set_default_template(&mut self, id: i64) -> Result<Template>;

    /// Remove a template row and return it.
    ///
    /// # Errors
    ///
    /// Returns `LabbookError::NotFound` if the template does not exist.
    fn delete_template(&mut self, id: i64) -> Result<Template>;

    // --- Maintenance ---

    /// Check store integrity.
    ///
    /// Verifies:
    /// - Foreign key relationships
    /// - At most one default template per kind
    /// - Each parent version belongs to the same experiment with a lower version
    fn check_integrity(&self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trait_is_object_safe() {
        fn _accepts_store(_store: &dyn NotebookStore) {}
    }
}
