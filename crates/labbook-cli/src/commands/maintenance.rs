use labbook_core::NotebookStore;

use crate::app::AppContext;
use crate::errors::CliError;
use crate::ui::{badge, print, Badge};

pub fn handle_check(ctx: &AppContext) -> anyhow::Result<()> {
    let notebook = ctx.open_notebook()?;
    notebook
        .store()
        .check_integrity()
        .map_err(|e| CliError::IntegrityFailed(e.to_string()))?;

    if !ctx.quiet() {
        let ui = ctx.ui_context(false);
        if ui.mode.is_pretty() {
            print(&ui, &badge(&ui, Badge::Ok, "Notebook integrity verified"));
        } else {
            println!("status=ok");
        }
    }
    Ok(())
}
