use labbook_core::storage::{ExperimentFilter, NewExperiment};
use labbook_core::{LabbookError, NotebookStore};

use crate::app::AppContext;
use crate::cli::{ExperimentCommand, ExperimentListArgs};
use crate::helpers::parsing::parse_optional_datetime;
use crate::output::{experiments_table, print_json};
use crate::ui::{kv, print, title};

use super::print_receipt;

pub fn handle_experiment(ctx: &AppContext, command: &ExperimentCommand) -> anyhow::Result<()> {
    match command {
        ExperimentCommand::Add {
            project,
            title,
            description,
            tag,
            start,
            end,
        } => {
            let actor = ctx.actor()?;
            let start = parse_optional_datetime(start.as_deref())?;
            let end = parse_optional_datetime(end.as_deref())?;
            let mut notebook = ctx.open_notebook()?;

            let mut new = NewExperiment::new(*project, title.as_str(), actor)
                .with_tags(tag.clone())
                .with_schedule(start, end);
            if let Some(description) = description {
                new = new.with_description(description.as_str());
            }
            let experiment = notebook.store_mut().create_experiment(&new)?;
            print_receipt(
                ctx,
                "Created experiment",
                &[
                    ("ID", experiment.id.to_string()),
                    ("Project", experiment.project_id.to_string()),
                ],
            );
        }
        ExperimentCommand::List(args) => handle_list(ctx, args)?,
        ExperimentCommand::Show { id, json } => {
            let notebook = ctx.open_notebook()?;
            let experiment = notebook
                .store()
                .get_experiment(*id)?
                .ok_or_else(|| LabbookError::not_found("Experiment", *id))?;
            if *json {
                return print_json(&experiment);
            }
            let ui = ctx.ui_context(false);
            if let Some(heading) = title(&ui, &experiment.title) {
                println!("{}", heading);
            }
            let fmt = |d: &Option<chrono::DateTime<chrono::Utc>>| {
                d.map(|d| d.to_rfc3339()).unwrap_or_default()
            };
            print(&ui, &kv(&ui, "ID", &experiment.id.to_string()));
            print(&ui, &kv(&ui, "Project", &experiment.project_id.to_string()));
            print(&ui, &kv(&ui, "Title", &experiment.title));
            print(
                &ui,
                &kv(
                    &ui,
                    "Description",
                    experiment.description.as_deref().unwrap_or(""),
                ),
            );
            print(&ui, &kv(&ui, "Tags", &experiment.tags.join(",")));
            print(&ui, &kv(&ui, "Start", &fmt(&experiment.start_at)));
            print(&ui, &kv(&ui, "End", &fmt(&experiment.end_at)));
            print(&ui, &kv(&ui, "Archived", &experiment.archived.to_string()));
        }
        ExperimentCommand::Archive { id } => {
            let actor = ctx.actor()?;
            let mut notebook = ctx.open_notebook()?;
            let experiment = notebook.store_mut().archive_experiment(*id, actor)?;
            print_receipt(
                ctx,
                "Archived experiment",
                &[("ID", experiment.id.to_string())],
            );
        }
    }
    Ok(())
}

fn handle_list(ctx: &AppContext, args: &ExperimentListArgs) -> anyhow::Result<()> {
    let notebook = ctx.open_notebook()?;
    let mut filter = ExperimentFilter::new();
    if let Some(project) = args.project {
        filter = filter.project(project);
    }
    if let Some(text) = &args.text {
        filter = filter.text(text.as_str());
    }
    for tag in &args.tag {
        filter = filter.tag(tag.as_str());
    }
    if !args.archived {
        filter = filter.archived(false);
    }
    if let Some(limit) = args.limit {
        filter = filter.limit(limit);
    }

    let experiments = notebook.store().list_experiments(&filter)?;
    if args.json {
        print_json(&experiments)?;
    } else if experiments.is_empty() {
        if !ctx.quiet() {
            println!("No experiments found.");
        }
    } else {
        println!("{}", experiments_table(&ctx.ui_context(false), &experiments));
    }
    Ok(())
}
