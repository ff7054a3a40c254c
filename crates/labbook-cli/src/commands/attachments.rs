use std::io::Write;

use labbook_core::fs::write_atomic;
use labbook_core::storage::AttachmentFilter;

use crate::app::AppContext;
use crate::cli::AttachCommand;
use crate::helpers::input::file_name;
use crate::helpers::{confirm_or_force, read_file};
use crate::output::{attachments_table, print_json};

use super::print_receipt;

pub fn handle_attach(ctx: &AppContext, command: &AttachCommand) -> anyhow::Result<()> {
    match command {
        AttachCommand::Add {
            entry,
            file,
            caption,
        } => {
            let filename = file_name(file)?;
            let bytes = read_file(file)?;
            let mut notebook = ctx.open_notebook()?;
            let attachment =
                notebook.upload_attachment(*entry, &filename, &bytes, caption.as_deref())?;
            print_receipt(
                ctx,
                "Attached file",
                &[
                    ("ID", attachment.id.to_string()),
                    ("Path", attachment.path),
                    ("SHA256", attachment.sha256),
                ],
            );
        }
        AttachCommand::List {
            entry,
            file_type,
            limit,
            json,
        } => {
            let mut filter = AttachmentFilter::new();
            if let Some(entry) = entry {
                filter = filter.entry(*entry);
            }
            if let Some(file_type) = file_type {
                filter = filter.file_type(file_type.to_ascii_lowercase());
            }
            if let Some(limit) = limit {
                filter = filter.limit(*limit);
            }

            let notebook = ctx.open_notebook()?;
            let attachments = notebook.list_attachments(&filter)?;
            if *json {
                print_json(&attachments)?;
            } else if attachments.is_empty() {
                if !ctx.quiet() {
                    println!("No attachments found.");
                }
            } else {
                println!("{}", attachments_table(&ctx.ui_context(false), &attachments));
            }
        }
        AttachCommand::Get { id, output } => {
            let notebook = ctx.open_notebook()?;
            let (attachment, bytes) = notebook.read_attachment(*id)?;
            match output {
                Some(path) => {
                    write_atomic(path, &bytes)?;
                    print_receipt(
                        ctx,
                        "Saved attachment",
                        &[
                            ("ID", attachment.id.to_string()),
                            ("Path", path.display().to_string()),
                        ],
                    );
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(&bytes)?;
                    stdout.flush()?;
                }
            }
        }
        AttachCommand::Rm { id, force } => {
            let actor = ctx.actor()?;
            if !confirm_or_force(&format!("Delete attachment {}?", id), *force)? {
                return Ok(());
            }
            let mut notebook = ctx.open_notebook()?;
            let attachment = notebook.delete_attachment(*id, actor)?;
            print_receipt(
                ctx,
                "Deleted attachment",
                &[
                    ("ID", attachment.id.to_string()),
                    ("Name", attachment.original_name),
                ],
            );
        }
    }
    Ok(())
}
