use labbook_core::storage::{NewTemplate, TemplateKind};

use crate::app::AppContext;
use crate::cli::TemplateCommand;
use crate::helpers::input::file_name;
use crate::helpers::{confirm_or_force, read_file};
use crate::output::{print_json, templates_table};

use super::print_receipt;

pub fn handle_template(ctx: &AppContext, command: &TemplateCommand) -> anyhow::Result<()> {
    match command {
        TemplateCommand::Add {
            kind,
            name,
            file,
            description,
            default,
        } => {
            let kind: TemplateKind = kind.parse()?;
            let filename = file_name(file)?;
            let bytes = read_file(file)?;

            let mut new = NewTemplate::new(kind, name.as_str(), "").as_default(*default);
            if let Some(description) = description {
                new = new.with_description(description.as_str());
            }
            let mut notebook = ctx.open_notebook()?;
            let template = notebook.create_template(new, &filename, &bytes)?;
            print_receipt(
                ctx,
                "Registered template",
                &[
                    ("ID", template.id.to_string()),
                    ("Kind", template.kind.to_string()),
                    ("Default", template.is_default.to_string()),
                ],
            );
        }
        TemplateCommand::List { kind, json } => {
            let kind = kind
                .as_deref()
                .map(str::parse::<TemplateKind>)
                .transpose()?;
            let notebook = ctx.open_notebook()?;
            let templates = notebook.list_templates(kind)?;
            if *json {
                print_json(&templates)?;
            } else if templates.is_empty() {
                if !ctx.quiet() {
                    println!("No templates found.");
                }
            } else {
                println!("{}", templates_table(&ctx.ui_context(false), &templates));
            }
        }
        TemplateCommand::SetDefault { id } => {
            let mut notebook = ctx.open_notebook()?;
            let template = notebook.set_default_template(*id)?;
            print_receipt(
                ctx,
                "Default template set",
                &[
                    ("ID", template.id.to_string()),
                    ("Kind", template.kind.to_string()),
                ],
            );
        }
        TemplateCommand::Rm { id, force } => {
            if !confirm_or_force(&format!("Delete template {}?", id), *force)? {
                return Ok(());
            }
            let mut notebook = ctx.open_notebook()?;
            let template = notebook.delete_template(*id)?;
            print_receipt(ctx, "Deleted template", &[("ID", template.id.to_string())]);
        }
    }
    Ok(())
}
