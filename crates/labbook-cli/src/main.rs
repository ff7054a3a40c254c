//! Labbook CLI - a laboratory notebook for projects, experiments and
//! versioned entries
//!
//! This is the command-line interface for Labbook. It maps subcommands onto
//! the core notebook operations and formats their results.

mod app;
mod cli;
mod commands;
mod config;
mod constants;
mod errors;
mod helpers;
mod logging;
mod output;
mod ui;

use clap::Parser;
use labbook_core::VERSION;

use crate::app::AppContext;
use crate::cli::{Cli, Commands};
use crate::commands::{
    attachments, audit, charts, datasets, entries, experiments, init, maintenance, misc,
    projects, reports, search, templates, users,
};
use crate::ui::print_error;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let ctx = AppContext::new(&cli);

    if let Err(e) = run(&ctx, &cli) {
        let ui_ctx = ctx.ui_context(false);

        let error_msg = format!("{}", e);
        let hint = extract_error_hint(&error_msg);
        let message = match error_msg.find("\nHint:") {
            Some(idx) => &error_msg[..idx],
            None => error_msg.as_str(),
        };

        print_error(&ui_ctx, message, hint.as_deref());
        std::process::exit(errors::exit_code(&e));
    }
}

/// Extract a hint from an error message if it contains "Hint:", or provide
/// contextual hints for common error types.
fn extract_error_hint(error: &str) -> Option<String> {
    if let Some(idx) = error.find("\nHint:") {
        return Some(error[idx + 1..].to_string());
    }

    let error_lower = error.to_lowercase();

    if error_lower.contains("entry") && error_lower.contains("not found") {
        return Some("Hint: Run `labbook entry list` to find entry IDs.".to_string());
    }
    if error_lower.contains("experiment") && error_lower.contains("not found") {
        return Some("Hint: Run `labbook experiment list` to find experiment IDs.".to_string());
    }
    if error_lower.contains("project") && error_lower.contains("not found") {
        return Some("Hint: Run `labbook project list` to find project IDs.".to_string());
    }
    if error_lower.contains("dataset") && error_lower.contains("not found") {
        return Some("Hint: Run `labbook dataset list` to find dataset IDs.".to_string());
    }
    if error_lower.contains("template") && error_lower.contains("not found") {
        return Some("Hint: Run `labbook template list` to see registered templates.".to_string());
    }
    if error_lower.contains("already been uploaded") {
        return Some(
            "Hint: Run `labbook attach list` to find the existing attachment.".to_string(),
        );
    }
    if error_lower.contains("template file named") {
        return Some("Hint: Rename the file before adding it as a new template.".to_string());
    }
    if error_lower.contains("integrity") && error_lower.contains("failed") {
        return Some(
            "Hint: Export affected experiments with `labbook export` before repairing the database."
                .to_string(),
        );
    }

    None
}

fn run(ctx: &AppContext, cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Commands::Init(args)) => {
            init::handle_init(ctx, args)?;
        }
        Some(Commands::User(command)) => {
            users::handle_user(ctx, command)?;
        }
        Some(Commands::Project(command)) => {
            projects::handle_project(ctx, command)?;
        }
        Some(Commands::Experiment(command)) => {
            experiments::handle_experiment(ctx, command)?;
        }
        Some(Commands::Entry(command)) => {
            entries::handle_entry(ctx, command)?;
        }
        Some(Commands::Attach(command)) => {
            attachments::handle_attach(ctx, command)?;
        }
        Some(Commands::Dataset(command)) => {
            datasets::handle_dataset(ctx, command)?;
        }
        Some(Commands::Chart(command)) => {
            charts::handle_chart(ctx, command)?;
        }
        Some(Commands::Template(command)) => {
            templates::handle_template(ctx, command)?;
        }
        Some(Commands::Report(args)) => {
            reports::handle_report(ctx, args)?;
        }
        Some(Commands::Export(args)) => {
            reports::handle_export(ctx, args)?;
        }
        Some(Commands::Search(args)) => {
            search::handle_search(ctx, args)?;
        }
        Some(Commands::Audit(args)) => {
            audit::handle_audit(ctx, args)?;
        }
        Some(Commands::Check) => {
            maintenance::handle_check(ctx)?;
        }
        Some(Commands::Completions(args)) => {
            misc::handle_completions(args)?;
        }
        None => {
            println!("Labbook v{}", VERSION);
            println!("\nQuickstart:");
            println!("  labbook init --name \"Ada\" --email ada@lab.example");
            println!("  labbook project add \"Protein stability\"");
            println!("  labbook experiment add --project 1 \"Melt curves\"");
            println!("  labbook entry add --experiment 1 \"Plate 1\" --body \"Setup\"");
            println!("  labbook report 1 --format html");
            println!("\nRun `labbook --help` for full usage.");
        }
    }

    Ok(())
}
