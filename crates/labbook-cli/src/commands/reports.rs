use std::path::PathBuf;

use labbook_core::fs::write_atomic;
use labbook_core::report::ReportKind;

use crate::app::AppContext;
use crate::cli::{ExportArgs, ReportArgs};

use super::print_receipt;

pub fn handle_report(ctx: &AppContext, args: &ReportArgs) -> anyhow::Result<()> {
    let kind: ReportKind = args.format.parse()?;
    let notebook = ctx.open_notebook()?;
    let report = notebook.assemble_report(args.entry, kind)?;

    let destination = match &args.output {
        Some(path) => {
            write_atomic(path, &report.bytes)?;
            path.display().to_string()
        }
        None => {
            let relative = notebook.save_report(&report)?;
            notebook.layout().resolve(&relative).display().to_string()
        }
    };
    print_receipt(
        ctx,
        "Report written",
        &[
            ("Path", destination),
            ("Format", kind.to_string()),
            ("Bytes", report.bytes.len().to_string()),
        ],
    );
    Ok(())
}

pub fn handle_export(ctx: &AppContext, args: &ExportArgs) -> anyhow::Result<()> {
    let notebook = ctx.open_notebook()?;
    let bundle = notebook.export_bundle(args.experiment)?;

    let destination = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("experiment_{}.tar.zst", args.experiment)));
    write_atomic(&destination, &bundle)?;
    tracing::info!(experiment_id = args.experiment, path = %destination.display(), "bundle exported");

    print_receipt(
        ctx,
        "Exported experiment",
        &[
            ("Path", destination.display().to_string()),
            ("Bytes", bundle.len().to_string()),
        ],
    );
    Ok(())
}
