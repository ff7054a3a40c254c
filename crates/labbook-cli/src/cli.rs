use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use labbook_core::VERSION;

use crate::constants::DEFAULT_PREVIEW_ROWS;

/// Labbook - a laboratory notebook for projects, experiments and versioned entries
#[derive(Parser)]
#[command(name = "labbook")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Notebook data directory
    #[arg(short, long, global = true, env = "LABBOOK_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Acting user ID for mutations
    #[arg(long = "as", global = true, env = "LABBOOK_USER", value_name = "USER_ID")]
    pub acting_user: Option<i64>,

    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a notebook data directory and config file
    Init(InitArgs),

    /// Manage users
    #[command(subcommand)]
    User(UserCommand),

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage experiments
    #[command(subcommand)]
    Experiment(ExperimentCommand),

    /// Add, revise and browse entries
    #[command(subcommand)]
    Entry(EntryCommand),

    /// Manage entry attachments
    #[command(subcommand)]
    Attach(AttachCommand),

    /// Import and inspect datasets
    #[command(subcommand)]
    Dataset(DatasetCommand),

    /// Render charts from datasets
    #[command(subcommand)]
    Chart(ChartCommand),

    /// Manage report templates
    #[command(subcommand)]
    Template(TemplateCommand),

    /// Assemble a report for an entry
    Report(ReportArgs),

    /// Export an experiment as a compressed bundle
    Export(ExportArgs),

    /// Search projects, experiments and entries
    Search(SearchArgs),

    /// Show the audit log
    Audit(AuditArgs),

    /// Check notebook integrity
    Check,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Arguments for the `init` command
#[derive(Args)]
pub struct InitArgs {
    /// Create a first user with this name (requires --email)
    #[arg(long, requires = "email")]
    pub name: Option<String>,

    /// Email of the first user
    #[arg(long, requires = "name")]
    pub email: Option<String>,

    /// Overwrite an existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Subcommand)]
pub enum UserCommand {
    /// Add a user
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        /// researcher, admin or reviewer
        #[arg(long, default_value = "researcher")]
        role: String,
    },

    /// List users
    List {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ProjectCommand {
    /// Create a project
    Add {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(short, long, value_name = "TAG")]
        tag: Vec<String>,
    },

    /// List projects
    List(ProjectListArgs),

    /// Show a project
    Show {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Archive a project
    Archive {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(Args)]
pub struct ProjectListArgs {
    /// Substring of name or description
    #[arg(long)]
    pub text: Option<String>,

    /// Require this tag (repeatable)
    #[arg(long, value_name = "TAG")]
    pub tag: Vec<String>,

    /// Include archived projects
    #[arg(long)]
    pub archived: bool,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub offset: Option<usize>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum ExperimentCommand {
    /// Create an experiment under a project
    Add {
        #[arg(long)]
        project: i64,

        #[arg(value_name = "TITLE")]
        title: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(short, long, value_name = "TAG")]
        tag: Vec<String>,

        /// Start date (ISO-8601 or YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// End date (ISO-8601 or YYYY-MM-DD)
        #[arg(long)]
        end: Option<String>,
    },

    /// List experiments
    List(ExperimentListArgs),

    /// Show an experiment
    Show {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Archive an experiment
    Archive {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(Args)]
pub struct ExperimentListArgs {
    #[arg(long)]
    pub project: Option<i64>,

    /// Substring of title or description
    #[arg(long)]
    pub text: Option<String>,

    /// Require this tag (repeatable)
    #[arg(long, value_name = "TAG")]
    pub tag: Vec<String>,

    /// Include archived experiments
    #[arg(long)]
    pub archived: bool,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum EntryCommand {
    /// Add an entry to an experiment
    Add(EntryAddArgs),

    /// Revise an entry (creates a new version)
    Edit(EntryEditArgs),

    /// Show an entry row
    Show {
        #[arg(value_name = "ID")]
        id: i64,

        /// Show the latest version of the entry's chain instead
        #[arg(long)]
        latest: bool,

        #[arg(long)]
        json: bool,
    },

    /// Show every version of an entry
    History {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// List entries
    List(EntryListArgs),
}

#[derive(Args)]
pub struct EntryAddArgs {
    #[arg(long)]
    pub experiment: i64,

    #[arg(value_name = "TITLE")]
    pub title: String,

    /// Entry body (markdown)
    #[arg(long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the body from a file ("-" for stdin)
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,

    #[arg(short, long, value_name = "TAG")]
    pub tag: Vec<String>,
}

#[derive(Args)]
pub struct EntryEditArgs {
    #[arg(value_name = "ID")]
    pub id: i64,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long, conflicts_with = "body_file")]
    pub body: Option<String>,

    /// Read the body from a file ("-" for stdin)
    #[arg(long, value_name = "PATH")]
    pub body_file: Option<PathBuf>,

    /// Replace the tag set
    #[arg(short, long, value_name = "TAG")]
    pub tag: Vec<String>,

    /// Remove every tag
    #[arg(long, conflicts_with = "tag")]
    pub clear_tags: bool,
}

#[derive(Args)]
pub struct EntryListArgs {
    #[arg(long)]
    pub experiment: Option<i64>,

    #[arg(long)]
    pub project: Option<i64>,

    #[arg(long)]
    pub author: Option<i64>,

    #[arg(short, long, value_name = "TAG")]
    pub tag: Vec<String>,

    /// Start date (ISO-8601 or YYYY-MM-DD)
    #[arg(long)]
    pub since: Option<String>,

    /// End date (ISO-8601 or YYYY-MM-DD)
    #[arg(long)]
    pub until: Option<String>,

    /// Include superseded versions
    #[arg(long)]
    pub all_versions: bool,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long)]
    pub offset: Option<usize>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum AttachCommand {
    /// Upload a file to an entry
    Add {
        #[arg(long)]
        entry: i64,

        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long)]
        caption: Option<String>,
    },

    /// List attachments
    List {
        #[arg(long)]
        entry: Option<i64>,

        /// Filter by extension (png, pdf, ...)
        #[arg(long)]
        file_type: Option<String>,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Download an attachment
    Get {
        #[arg(value_name = "ID")]
        id: i64,

        /// Destination file (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Delete an attachment and its file
    Rm {
        #[arg(value_name = "ID")]
        id: i64,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
pub enum DatasetCommand {
    /// Import a CSV or XLSX file
    Import {
        #[arg(long)]
        entry: i64,

        #[arg(value_name = "FILE")]
        file: PathBuf,

        /// Dataset name (defaults to the file stem)
        #[arg(long)]
        name: Option<String>,
    },

    /// List datasets
    List {
        #[arg(long)]
        entry: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Show dataset metadata and statistics
    Show {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long)]
        json: bool,
    },

    /// Show the first rows of a dataset
    Preview {
        #[arg(value_name = "ID")]
        id: i64,

        #[arg(long, default_value_t = DEFAULT_PREVIEW_ROWS)]
        rows: usize,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum ChartCommand {
    /// Render a chart from a dataset
    Create {
        #[arg(long)]
        dataset: i64,

        /// line, scatter, bar or histogram
        #[arg(long, default_value = "line")]
        kind: String,

        #[arg(short, long)]
        x: String,

        #[arg(short, long)]
        y: String,

        #[arg(long)]
        title: Option<String>,

        /// Extra configuration stored with the chart (JSON object)
        #[arg(long, value_name = "JSON")]
        config: Option<String>,
    },

    /// List charts of a dataset
    List {
        #[arg(long)]
        dataset: i64,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
pub enum TemplateCommand {
    /// Register a template file
    Add {
        /// docx, xlsx, html or pdf
        #[arg(long)]
        kind: String,

        #[arg(long)]
        name: String,

        #[arg(value_name = "FILE")]
        file: PathBuf,

        #[arg(long)]
        description: Option<String>,

        /// Make this the default template of its kind
        #[arg(long)]
        default: bool,
    },

    /// List templates
    List {
        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Make a template the default of its kind
    SetDefault {
        #[arg(value_name = "ID")]
        id: i64,
    },

    /// Delete a template
    Rm {
        #[arg(value_name = "ID")]
        id: i64,

        /// Skip confirmation
        #[arg(long)]
        force: bool,
    },
}

/// Arguments for the `report` command
#[derive(Args)]
pub struct ReportArgs {
    /// Entry ID (any version of the entry)
    #[arg(value_name = "ENTRY_ID")]
    pub entry: i64,

    /// docx, xlsx or html
    #[arg(long, default_value = "docx")]
    pub format: String,

    /// Write here instead of the notebook's report directory
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `export` command
#[derive(Args)]
pub struct ExportArgs {
    #[arg(value_name = "EXPERIMENT_ID")]
    pub experiment: i64,

    /// Destination file (defaults to experiment_<id>.tar.zst)
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `search` command
#[derive(Args)]
pub struct SearchArgs {
    /// Text to look for in titles, names, descriptions and bodies
    #[arg(value_name = "TEXT")]
    pub text: Option<String>,

    /// What to search: entries, experiments, projects or all
    #[arg(long, default_value = "all")]
    pub scope: String,

    #[arg(long)]
    pub project: Option<i64>,

    #[arg(long)]
    pub experiment: Option<i64>,

    /// Comma-separated tags; all must match
    #[arg(long)]
    pub tags: Option<String>,

    #[arg(long)]
    pub author: Option<i64>,

    #[arg(long)]
    pub since: Option<String>,

    #[arg(long)]
    pub until: Option<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    #[arg(long, default_value_t = 0)]
    pub offset: usize,

    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `audit` command
#[derive(Args)]
pub struct AuditArgs {
    /// project, experiment, entry, attachment, dataset or chart
    #[arg(long)]
    pub entity: Option<String>,

    #[arg(long)]
    pub entity_id: Option<i64>,

    #[arg(long)]
    pub actor: Option<i64>,

    /// create, update, archive or delete
    #[arg(long)]
    pub action: Option<String>,

    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `completions` command
#[derive(Args)]
pub struct CompletionsArgs {
    #[arg(value_name = "SHELL")]
    pub shell: Shell,
}
