use labbook_core::storage::{Entry, EntryFilter, EntryPatch, NewEntry};
use labbook_core::{LabbookError, NotebookStore};

use crate::app::AppContext;
use crate::cli::{EntryAddArgs, EntryCommand, EntryEditArgs, EntryListArgs};
use crate::errors::CliError;
use crate::helpers::parsing::parse_optional_datetime;
use crate::helpers::read_body;
use crate::output::{entries_table, print_json};
use crate::ui::{kv, print, title, UiContext};

use super::print_receipt;

pub fn handle_entry(ctx: &AppContext, command: &EntryCommand) -> anyhow::Result<()> {
    match command {
        EntryCommand::Add(args) => handle_add(ctx, args),
        EntryCommand::Edit(args) => handle_edit(ctx, args),
        EntryCommand::Show { id, latest, json } => {
            let notebook = ctx.open_notebook()?;
            let entry = if *latest {
                notebook.store().latest_version(*id)?
            } else {
                notebook
                    .store()
                    .get_entry(*id)?
                    .ok_or_else(|| LabbookError::not_found("Entry", *id))?
            };
            if *json {
                return print_json(&entry);
            }
            print_entry(&ctx.ui_context(false), &entry);
            Ok(())
        }
        EntryCommand::History { id, json } => {
            let notebook = ctx.open_notebook()?;
            let history = notebook.entry_history(*id)?;
            if *json {
                return print_json(&history);
            }
            println!("{}", entries_table(&ctx.ui_context(false), &history));
            Ok(())
        }
        EntryCommand::List(args) => handle_list(ctx, args),
    }
}

fn handle_add(ctx: &AppContext, args: &EntryAddArgs) -> anyhow::Result<()> {
    let actor = ctx.actor()?;
    let body = read_body(args.body.as_deref(), args.body_file.as_deref())?.unwrap_or_default();
    let mut notebook = ctx.open_notebook()?;

    let new = NewEntry::new(args.experiment, actor, args.title.as_str())
        .with_body(body)
        .with_tags(args.tag.clone());
    let entry = notebook.create_entry(&new)?;
    print_receipt(
        ctx,
        "Added entry",
        &[
            ("ID", entry.id.to_string()),
            ("Version", entry.version.to_string()),
        ],
    );
    Ok(())
}

fn handle_edit(ctx: &AppContext, args: &EntryEditArgs) -> anyhow::Result<()> {
    let mut patch = EntryPatch::new();
    if let Some(title) = &args.title {
        patch = patch.title(title.as_str());
    }
    if let Some(body) = read_body(args.body.as_deref(), args.body_file.as_deref())? {
        patch = patch.body(body);
    }
    if args.clear_tags {
        patch = patch.tags(Vec::new());
    } else if !args.tag.is_empty() {
        patch = patch.tags(args.tag.clone());
    }
    if patch.is_empty() {
        return Err(CliError::invalid_input(
            "Nothing to change.\nHint: Pass --title, --body, --body-file, --tag or --clear-tags.",
        )
        .into());
    }

    let mut notebook = ctx.open_notebook()?;
    let entry = notebook.revise_entry(args.id, &patch)?;
    print_receipt(
        ctx,
        "Revised entry",
        &[
            ("ID", entry.id.to_string()),
            ("Version", entry.version.to_string()),
            (
                "Supersedes",
                entry
                    .parent_version_id
                    .map(|id| id.to_string())
                    .unwrap_or_default(),
            ),
        ],
    );
    Ok(())
}

fn handle_list(ctx: &AppContext, args: &EntryListArgs) -> anyhow::Result<()> {
    let mut filter = EntryFilter::new().include_superseded(args.all_versions);
    if let Some(experiment) = args.experiment {
        filter = filter.experiment(experiment);
    }
    if let Some(project) = args.project {
        filter = filter.project(project);
    }
    if let Some(author) = args.author {
        filter = filter.author(author);
    }
    for tag in &args.tag {
        filter = filter.tag(tag.as_str());
    }
    if let Some(since) = parse_optional_datetime(args.since.as_deref())? {
        filter = filter.since(since);
    }
    if let Some(until) = parse_optional_datetime(args.until.as_deref())? {
        filter = filter.until(until);
    }
    if let Some(limit) = args.limit {
        filter = filter.limit(limit);
    }
    if let Some(offset) = args.offset {
        filter = filter.offset(offset);
    }

    let notebook = ctx.open_notebook()?;
    let entries = notebook.store().list_entries(&filter)?;
    if args.json {
        print_json(&entries)?;
    } else if entries.is_empty() {
        if !ctx.quiet() {
            println!("No entries found.");
        }
    } else {
        println!("{}", entries_table(&ctx.ui_context(false), &entries));
    }
    Ok(())
}

fn print_entry(ui: &UiContext, entry: &Entry) {
    if let Some(heading) = title(ui, &entry.title) {
        println!("{}", heading);
    }
    print(ui, &kv(ui, "ID", &entry.id.to_string()));
    print(ui, &kv(ui, "Experiment", &entry.experiment_id.to_string()));
    print(ui, &kv(ui, "Author", &entry.author_id.to_string()));
    print(ui, &kv(ui, "Version", &entry.version.to_string()));
    if let Some(parent) = entry.parent_version_id {
        print(ui, &kv(ui, "Supersedes", &parent.to_string()));
    }
    print(ui, &kv(ui, "Tags", &entry.tags.join(",")));
    print(ui, &kv(ui, "Created", &entry.created_at.to_rfc3339()));
    print(ui, &kv(ui, "Updated", &entry.updated_at.to_rfc3339()));
    println!();
    println!("{}", entry.body);
}
