//! Application context for the Labbook CLI.
//!
//! Bundles the parsed arguments with the lazily-loaded config file, and
//! opens the notebook with the configured rendering options.

use std::path::PathBuf;

use once_cell::unsync::OnceCell;

use labbook_core::chart::PlotRenderer;
use labbook_core::layout::DATABASE_FILE;
use labbook_core::Notebook;

use crate::cli::Cli;
use crate::config::{read_config, LabbookConfig};
use crate::errors::CliError;
use crate::ui::UiContext;

use super::resolver::{missing_notebook_message, resolve_config_path, resolve_data_dir};

pub struct AppContext<'a> {
    cli: &'a Cli,
    config: OnceCell<LabbookConfig>,
}

impl<'a> AppContext<'a> {
    pub fn new(cli: &'a Cli) -> Self {
        Self {
            cli,
            config: OnceCell::new(),
        }
    }

    pub fn quiet(&self) -> bool {
        self.cli.quiet
    }

    /// The config file, or defaults when none exists yet.
    pub fn config(&self) -> anyhow::Result<&LabbookConfig> {
        self.config.get_or_try_init(|| {
            let path = resolve_config_path()?;
            if path.exists() {
                read_config(&path)
            } else {
                Ok(LabbookConfig::default())
            }
        })
    }

    pub fn data_dir(&self) -> anyhow::Result<PathBuf> {
        resolve_data_dir(self.cli, self.config()?)
    }

    /// Open an initialized notebook.
    pub fn open_notebook(&self) -> anyhow::Result<Notebook> {
        let data_dir = self.data_dir()?;
        if !data_dir.join(DATABASE_FILE).exists() {
            return Err(CliError::not_found(
                missing_notebook_message(&data_dir),
                "Hint: Run `labbook init` to create a notebook.",
            )
            .into());
        }
        tracing::debug!(data_dir = %data_dir.display(), "opening notebook");

        let config = self.config()?;
        let notebook = Notebook::open(&data_dir)?
            .with_renderer(Box::new(PlotRenderer::new(
                config.charts.width,
                config.charts.height,
            )))
            .with_report_options(config.report.options());
        Ok(notebook)
    }

    /// The user that mutations are attributed to.
    pub fn actor(&self) -> anyhow::Result<i64> {
        if let Some(id) = self.cli.acting_user {
            return Ok(id);
        }
        self.config()?.notebook.default_user.ok_or_else(|| {
            CliError::invalid_input(
                "No acting user.\nHint: Pass --as <USER_ID>, set LABBOOK_USER, or set notebook.default_user in the config file.",
            )
            .into()
        })
    }

    pub fn ui_context(&self, json: bool) -> UiContext {
        UiContext::from_env(json, self.cli.no_color)
    }
}
