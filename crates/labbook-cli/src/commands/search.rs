use labbook_core::search::{
    parse_tags, search_all, search_entries, search_experiments, search_projects, EntryQuery,
    ExperimentQuery, ProjectQuery, SearchHit,
};

use crate::app::AppContext;
use crate::cli::SearchArgs;
use crate::errors::CliError;
use crate::helpers::parsing::parse_optional_datetime;
use crate::output::{entries_table, experiments_table, print_json, projects_table};
use crate::ui::{table, title, UiContext};

pub fn handle_search(ctx: &AppContext, args: &SearchArgs) -> anyhow::Result<()> {
    let notebook = ctx.open_notebook()?;
    let store = notebook.store();
    let tags = args.tags.as_deref().map(parse_tags).unwrap_or_default();
    let ui = ctx.ui_context(false);

    match args.scope.as_str() {
        "entries" => {
            let query = EntryQuery {
                text: args.text.clone(),
                project_id: args.project,
                experiment_id: args.experiment,
                tags,
                author_id: args.author,
                since: parse_optional_datetime(args.since.as_deref())?,
                until: parse_optional_datetime(args.until.as_deref())?,
                include_superseded: false,
                limit: Some(limit(ctx, args)?),
                offset: args.offset,
            };
            let entries = search_entries(store, &query)?;
            if args.json {
                return print_json(&entries);
            }
            println!("{}", entries_table(&ui, &entries));
        }
        "experiments" => {
            let query = ExperimentQuery {
                text: args.text.clone(),
                project_id: args.project,
                tags,
                limit: Some(limit(ctx, args)?),
            };
            let experiments = search_experiments(store, &query)?;
            if args.json {
                return print_json(&experiments);
            }
            println!("{}", experiments_table(&ui, &experiments));
        }
        "projects" => {
            let query = ProjectQuery {
                text: args.text.clone(),
                tags,
                limit: Some(limit(ctx, args)?),
            };
            let projects = search_projects(store, &query)?;
            if args.json {
                return print_json(&projects);
            }
            println!("{}", projects_table(&ui, &projects));
        }
        "all" => {
            let text = args.text.as_deref().ok_or_else(|| {
                CliError::invalid_input(
                    "Search text is required.\nHint: labbook search <TEXT> [--scope entries|experiments|projects]",
                )
            })?;
            let results = search_all(store, text, args.limit)?;
            if args.json {
                return print_json(&results);
            }
            print_group(&ui, "Projects", "project", &results.projects);
            print_group(&ui, "Experiments", "experiment", &results.experiments);
            print_group(&ui, "Entries", "entry", &results.entries);
            if !ctx.quiet() && ui.mode.is_pretty() {
                println!("{} result(s)", results.total);
            }
        }
        other => {
            return Err(CliError::invalid_input(format!(
                "Unknown search scope '{}' (expected entries, experiments, projects or all)",
                other
            ))
            .into())
        }
    }
    Ok(())
}

// Explicit --limit wins; otherwise the configured default.
fn limit(ctx: &AppContext, args: &SearchArgs) -> anyhow::Result<usize> {
    match args.limit {
        Some(limit) => Ok(limit),
        None => Ok(ctx.config()?.search.limit()),
    }
}

fn print_group(ui: &UiContext, label: &str, kind: &str, hits: &[SearchHit]) {
    if hits.is_empty() {
        return;
    }
    if let Some(heading) = title(ui, label) {
        println!("{}", heading);
    }
    let rows: Vec<Vec<String>> = hits
        .iter()
        .map(|hit| vec![kind.to_string(), hit.id.to_string(), hit.title.clone()])
        .collect();
    println!("{}", table(ui, &["Type", "ID", "Title"], &rows));
}
