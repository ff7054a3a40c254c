pub mod attachments;
pub mod audit;
pub mod charts;
pub mod datasets;
pub mod entries;
pub mod experiments;
pub mod init;
pub mod maintenance;
pub mod misc;
pub mod projects;
pub mod reports;
pub mod search;
pub mod templates;
pub mod users;

use crate::app::AppContext;
use crate::ui::receipt;

/// Print the summary of a mutation unless `--quiet` is set.
pub(crate) fn print_receipt(ctx: &AppContext, title: &str, items: &[(&str, String)]) {
    if !ctx.quiet() {
        let ui = ctx.ui_context(false);
        println!("{}", receipt(&ui, title, items));
    }
}
