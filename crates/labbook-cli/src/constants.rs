//! Process exit codes and command defaults.

/// Exit statuses. 2 stays reserved for clap's usage errors.
pub mod exit_codes {
    /// Storage failures and anything unclassified
    pub const GENERAL: i32 = 1;

    /// Missing notebook, file or record
    pub const NOT_FOUND: i32 = 3;

    /// Rejected input: bad flags, extensions, sizes, columns
    pub const INVALID_INPUT: i32 = 4;

    /// Duplicate attachment digest, second default template, duplicate email
    pub const CONFLICT: i32 = 5;

    pub const INTEGRITY_FAILED: i32 = 6;
}

/// Rows shown by `dataset preview` when `--rows` is omitted.
pub const DEFAULT_PREVIEW_ROWS: usize = 10;
