use labbook_core::audit::{AuditAction, EntityKind};
use labbook_core::storage::AuditFilter;
use labbook_core::NotebookStore;

use crate::app::AppContext;
use crate::cli::AuditArgs;
use crate::output::{audit_table, print_json};

pub fn handle_audit(ctx: &AppContext, args: &AuditArgs) -> anyhow::Result<()> {
    let mut filter = AuditFilter::new().limit(args.limit);
    if let Some(entity) = &args.entity {
        filter = filter.entity(entity.parse::<EntityKind>()?);
    }
    if let Some(entity_id) = args.entity_id {
        filter = filter.entity_id(entity_id);
    }
    if let Some(actor) = args.actor {
        filter = filter.actor(actor);
    }
    if let Some(action) = &args.action {
        filter = filter.action(action.parse::<AuditAction>()?);
    }

    let notebook = ctx.open_notebook()?;
    let records = notebook.store().list_audit(&filter)?;
    if args.json {
        print_json(&records)?;
    } else if records.is_empty() {
        if !ctx.quiet() {
            println!("No audit records found.");
        }
    } else {
        println!("{}", audit_table(&ctx.ui_context(false), &records));
    }
    Ok(())
}
