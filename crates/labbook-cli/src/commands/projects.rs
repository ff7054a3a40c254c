use labbook_core::storage::{NewProject, ProjectFilter};
use labbook_core::{LabbookError, NotebookStore};

use crate::app::AppContext;
use crate::cli::{ProjectCommand, ProjectListArgs};
use crate::output::{print_json, projects_table};
use crate::ui::{kv, print, title};

use super::print_receipt;

pub fn handle_project(ctx: &AppContext, command: &ProjectCommand) -> anyhow::Result<()> {
    match command {
        ProjectCommand::Add {
            name,
            description,
            tag,
        } => {
            let actor = ctx.actor()?;
            let mut notebook = ctx.open_notebook()?;
            let mut new = NewProject::new(name.as_str(), actor).with_tags(tag.clone());
            if let Some(description) = description {
                new = new.with_description(description.as_str());
            }
            let project = notebook.store_mut().create_project(&new)?;
            print_receipt(
                ctx,
                "Created project",
                &[("ID", project.id.to_string()), ("Name", project.name)],
            );
        }
        ProjectCommand::List(args) => handle_list(ctx, args)?,
        ProjectCommand::Show { id, json } => {
            let notebook = ctx.open_notebook()?;
            let project = notebook
                .store()
                .get_project(*id)?
                .ok_or_else(|| LabbookError::not_found("Project", *id))?;
            if *json {
                return print_json(&project);
            }
            let ui = ctx.ui_context(false);
            if let Some(heading) = title(&ui, &project.name) {
                println!("{}", heading);
            }
            print(&ui, &kv(&ui, "ID", &project.id.to_string()));
            print(&ui, &kv(&ui, "Name", &project.name));
            print(
                &ui,
                &kv(&ui, "Description", project.description.as_deref().unwrap_or("")),
            );
            print(&ui, &kv(&ui, "Tags", &project.tags.join(",")));
            print(&ui, &kv(&ui, "Created by", &project.created_by.to_string()));
            print(&ui, &kv(&ui, "Created", &project.created_at.to_rfc3339()));
            print(&ui, &kv(&ui, "Archived", &project.archived.to_string()));
        }
        ProjectCommand::Archive { id } => {
            let actor = ctx.actor()?;
            let mut notebook = ctx.open_notebook()?;
            let project = notebook.store_mut().archive_project(*id, actor)?;
            print_receipt(ctx, "Archived project", &[("ID", project.id.to_string())]);
        }
    }
    Ok(())
}

fn handle_list(ctx: &AppContext, args: &ProjectListArgs) -> anyhow::Result<()> {
    let notebook = ctx.open_notebook()?;
    let mut filter = ProjectFilter::new();
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
    if let Some(offset) = args.offset {
        filter = filter.offset(offset);
    }

    let projects = notebook.store().list_projects(&filter)?;
    if args.json {
        print_json(&projects)?;
    } else if projects.is_empty() {
        if !ctx.quiet() {
            println!("No projects found.");
        }
    } else {
        println!("{}", projects_table(&ctx.ui_context(false), &projects));
    }
    Ok(())
}
