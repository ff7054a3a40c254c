use labbook_core::chart::{ChartKind, ChartRequest};

use crate::app::AppContext;
use crate::cli::ChartCommand;
use crate::helpers::parse_json_object;
use crate::output::{charts_table, print_json};

use super::print_receipt;

pub fn handle_chart(ctx: &AppContext, command: &ChartCommand) -> anyhow::Result<()> {
    match command {
        ChartCommand::Create {
            dataset,
            kind,
            x,
            y,
            title,
            config,
        } => {
            let actor = ctx.actor()?;
            let kind: ChartKind = kind.parse()?;
            let mut request = ChartRequest::new(kind, x.as_str(), y.as_str());
            if let Some(title) = title {
                request = request.with_title(title.as_str());
            }
            if let Some(config) = config {
                request = request.with_config(parse_json_object(config)?);
            }

            let mut notebook = ctx.open_notebook()?;
            let chart = notebook.render_chart(*dataset, &request, actor)?;
            print_receipt(
                ctx,
                "Rendered chart",
                &[("ID", chart.id.to_string()), ("Path", chart.path)],
            );
        }
        ChartCommand::List { dataset, json } => {
            let notebook = ctx.open_notebook()?;
            let charts = notebook.list_charts(*dataset)?;
            if *json {
                print_json(&charts)?;
            } else if charts.is_empty() {
                if !ctx.quiet() {
                    println!("No charts found.");
                }
            } else {
                println!("{}", charts_table(&ctx.ui_context(false), &charts));
            }
        }
    }
    Ok(())
}
