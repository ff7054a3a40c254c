//! Text builders for receipts, tables, key/value lines and errors.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, ContentArrangement, Table};

use super::terminal::UiContext;
use super::theme::{bold, dim, Badge};

pub fn badge(ctx: &UiContext, kind: Badge, message: &str) -> String {
    let painted = kind.paint(ctx.color);
    match message {
        "" => painted,
        _ => format!("{} {}", painted, message),
    }
}

/// `Key: value` in pretty mode, `key=value` otherwise. Plain keys are
/// lowercased with spaces turned into underscores.
pub fn kv(ctx: &UiContext, key: &str, value: &str) -> String {
    if ctx.mode.is_pretty() {
        format!("{} {}", dim(&format!("{}:", key), ctx.color), value)
    } else {
        format!("{}={}", plain_key(key), value)
    }
}

fn plain_key(key: &str) -> String {
    key.to_lowercase().replace(' ', "_")
}

/// Summary printed after a mutation. Plain output starts with `status=ok`.
pub fn receipt(ctx: &UiContext, title: &str, items: &[(&str, String)]) -> String {
    let (head, indent) = if ctx.mode.is_pretty() {
        (badge(ctx, Badge::Ok, title), "  ")
    } else {
        ("status=ok".to_string(), "")
    };
    std::iter::once(head)
        .chain(
            items
                .iter()
                .map(|(key, value)| format!("{}{}", indent, kv(ctx, key, value))),
        )
        .collect::<Vec<_>>()
        .join("\n")
}

/// Rows under a header: a bordered table in pretty mode, tab-separated
/// lines with a lowercased header otherwise.
pub fn table<S: AsRef<str>>(ctx: &UiContext, headers: &[S], rows: &[Vec<String>]) -> String {
    if !ctx.mode.is_pretty() {
        let header = headers
            .iter()
            .map(|h| h.as_ref().to_lowercase())
            .collect::<Vec<_>>()
            .join("\t");
        return std::iter::once(header)
            .chain(rows.iter().map(|row| row.join("\t")))
            .collect::<Vec<_>>()
            .join("\n");
    }

    let mut out = Table::new();
    out.load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    out.set_header(headers.iter().map(|h| {
        let cell = Cell::new(h.as_ref());
        if ctx.color {
            cell.add_attribute(Attribute::Bold)
        } else {
            cell
        }
    }));
    for row in rows {
        out.add_row(row);
    }
    out.to_string()
}

/// Section heading, shown only in pretty mode.
pub fn title(ctx: &UiContext, text: &str) -> Option<String> {
    ctx.mode.is_pretty().then(|| bold(text, ctx.color))
}

/// Println unless the command is in JSON mode.
pub fn print(ctx: &UiContext, message: &str) {
    if !ctx.mode.is_json() {
        println!("{}", message);
    }
}

fn error_message(ctx: &UiContext, message: &str, hint: Option<&str>) -> String {
    let mut lines = Vec::with_capacity(2);
    if ctx.mode.is_pretty() {
        lines.push(badge(ctx, Badge::Err, message));
        if let Some(hint) = hint {
            lines.push(dim(hint, ctx.color));
        }
    } else {
        lines.push(format!("error={}", message));
        if let Some(hint) = hint {
            lines.push(format!("hint={}", hint));
        }
    }
    lines.join("\n")
}

/// Error (and optional hint) on stderr.
pub fn print_error(ctx: &UiContext, message: &str, hint: Option<&str>) {
    eprintln!("{}", error_message(ctx, message, hint));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::terminal::OutputMode;

    fn ctx(mode: OutputMode) -> UiContext {
        UiContext { color: false, mode }
    }

    #[test]
    fn test_kv_keys_follow_mode() {
        assert_eq!(kv(&ctx(OutputMode::Plain), "Data dir", "/tmp/nb"), "data_dir=/tmp/nb");
        assert_eq!(kv(&ctx(OutputMode::Pretty), "Rows", "3"), "Rows: 3");
    }

    #[test]
    fn test_plain_table_is_tab_separated() {
        let out = table(
            &ctx(OutputMode::Plain),
            &["ID", "Title"],
            &[vec!["1".into(), "Plate 1".into()]],
        );
        assert_eq!(out, "id\ttitle\n1\tPlate 1");
    }

    #[test]
    fn test_pretty_table_accepts_runtime_headers() {
        let headers = vec!["time".to_string(), "signal".to_string()];
        let out = table(
            &ctx(OutputMode::Pretty),
            &headers,
            &[vec!["0".into(), "1.5".into()]],
        );
        assert!(out.contains("signal"));
        assert!(out.contains("1.5"));
    }

    #[test]
    fn test_receipts() {
        let items = [("ID", "7".to_string()), ("Version", "2".to_string())];
        assert_eq!(
            receipt(&ctx(OutputMode::Plain), "Revised entry", &items),
            "status=ok\nid=7\nversion=2"
        );
        assert_eq!(
            receipt(&ctx(OutputMode::Pretty), "Revised entry", &items),
            "[OK] Revised entry\n  ID: 7\n  Version: 2"
        );
    }

    #[test]
    fn test_plain_error_with_hint() {
        let out = error_message(
            &ctx(OutputMode::Plain),
            "Not found: Entry 3 not found",
            Some("Hint: Run `labbook entry list` to find entry IDs."),
        );
        assert_eq!(
            out,
            "error=Not found: Entry 3 not found\nhint=Hint: Run `labbook entry list` to find entry IDs."
        );
    }
}
