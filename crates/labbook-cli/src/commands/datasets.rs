use std::path::Path;

use labbook_core::storage::Dataset;
use labbook_core::{LabbookError, NotebookStore};

use crate::app::AppContext;
use crate::cli::DatasetCommand;
use crate::helpers::input::file_name;
use crate::helpers::read_file;
use crate::output::{datasets_table, print_json};
use crate::ui::{kv, print, table, title, UiContext};

use super::print_receipt;

pub fn handle_dataset(ctx: &AppContext, command: &DatasetCommand) -> anyhow::Result<()> {
    match command {
        DatasetCommand::Import { entry, file, name } => {
            let filename = file_name(file)?;
            let name = match name {
                Some(name) => name.clone(),
                None => file_stem(file, &filename),
            };
            let bytes = read_file(file)?;
            let mut notebook = ctx.open_notebook()?;
            let dataset = notebook.import_dataset(*entry, &name, &filename, &bytes)?;
            print_receipt(
                ctx,
                "Imported dataset",
                &[
                    ("ID", dataset.id.to_string()),
                    ("Rows", dataset.row_count.to_string()),
                    ("Columns", dataset.column_names().join(",")),
                ],
            );
        }
        DatasetCommand::List { entry, json } => {
            let notebook = ctx.open_notebook()?;
            let datasets = notebook.list_datasets(*entry)?;
            if *json {
                print_json(&datasets)?;
            } else if datasets.is_empty() {
                if !ctx.quiet() {
                    println!("No datasets found.");
                }
            } else {
                println!("{}", datasets_table(&ctx.ui_context(false), &datasets));
            }
        }
        DatasetCommand::Show { id, json } => {
            let notebook = ctx.open_notebook()?;
            let dataset = notebook
                .store()
                .get_dataset(*id)?
                .ok_or_else(|| LabbookError::not_found("Dataset", *id))?;
            if *json {
                return print_json(&dataset);
            }
            print_dataset(&ctx.ui_context(false), &dataset);
        }
        DatasetCommand::Preview { id, rows, json } => {
            let notebook = ctx.open_notebook()?;
            let preview = notebook.preview_dataset(*id, *rows)?;
            if *json {
                return print_json(&preview.rows);
            }
            let names = preview.dataset.column_names();
            let cells: Vec<Vec<String>> = preview
                .rows
                .iter()
                .map(|row| {
                    names
                        .iter()
                        .map(|name| match row.get(name) {
                            Some(serde_json::Value::String(s)) => s.clone(),
                            Some(serde_json::Value::Null) | None => String::new(),
                            Some(other) => other.to_string(),
                        })
                        .collect()
                })
                .collect();
            let ui = ctx.ui_context(false);
            println!("{}", table(&ui, &names, &cells));
        }
    }
    Ok(())
}

fn file_stem(path: &Path, fallback: &str) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| fallback.to_string())
}

fn print_dataset(ui: &UiContext, dataset: &Dataset) {
    if let Some(heading) = title(ui, &dataset.name) {
        println!("{}", heading);
    }
    print(ui, &kv(ui, "ID", &dataset.id.to_string()));
    print(ui, &kv(ui, "Entry", &dataset.entry_id.to_string()));
    print(ui, &kv(ui, "Rows", &dataset.row_count.to_string()));
    print(ui, &kv(ui, "Path", &dataset.path));
    println!();

    let empty = serde_json::Map::new();
    let columns = dataset.columns.as_object().unwrap_or(&empty);
    let stats = dataset.stats.as_object().unwrap_or(&empty);
    let number = |value: Option<&serde_json::Value>| match value.and_then(|v| v.as_f64()) {
        Some(n) => format!("{:.4}", n),
        None => String::new(),
    };

    let rows: Vec<Vec<String>> = columns
        .iter()
        .map(|(name, profile)| {
            let stat = stats.get(name);
            vec![
                name.clone(),
                profile
                    .get("dtype")
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string(),
                profile
                    .get("non_null")
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                profile
                    .get("unique")
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
                number(stat.and_then(|s| s.get("mean"))),
                number(stat.and_then(|s| s.get("std"))),
                number(stat.and_then(|s| s.get("min"))),
                number(stat.and_then(|s| s.get("max"))),
            ]
        })
        .collect();
    println!(
        "{}",
        table(ui, &["Column", "Type", "Non-null", "Unique", "Mean", "Std", "Min", "Max"], &rows)
    );
}
